//! Emulated `FILE*` handles and `<stdio.h>`
//!
//! Every open file is an in-memory buffer: disk files are read in full when
//! opened and written back when closed (or when the program ends). Handles
//! `0`, `1` and `2` are `stdin`, `stdout` and `stderr`; writes to the latter
//! two go to the program's capped output.
//!
//! Relative paths resolve against the directory of the source file.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::value::Value;
use crate::parser::ast::{AstNode, SourceLocation};
use log::{debug, warn};
use std::fs;
use std::path::PathBuf;

pub(crate) const STDIN: usize = 0;
pub(crate) const STDOUT: usize = 1;
pub(crate) const STDERR: usize = 2;

#[derive(Debug)]
struct OpenFile {
    /// Backing file on disk; `None` for the standard streams.
    path: Option<PathBuf>,
    data: Vec<u8>,
    pos: usize,
    eof: bool,
    readable: bool,
    writable: bool,
    append: bool,
    dirty: bool,
}

impl OpenFile {
    fn stream(data: Vec<u8>, readable: bool, writable: bool) -> Self {
        OpenFile {
            path: None,
            data,
            pos: 0,
            eof: false,
            readable,
            writable,
            append: false,
            dirty: false,
        }
    }
}

/// The process file table.
#[derive(Debug)]
pub struct FileTable {
    files: Vec<Option<OpenFile>>,
    base_dir: PathBuf,
}

impl FileTable {
    pub fn new(stdin: Vec<u8>, base_dir: PathBuf) -> Self {
        FileTable {
            files: vec![
                Some(OpenFile::stream(stdin, true, false)),
                Some(OpenFile::stream(Vec::new(), false, true)),
                Some(OpenFile::stream(Vec::new(), false, true)),
            ],
            base_dir,
        }
    }

    fn get(&self, handle: usize) -> Option<&OpenFile> {
        self.files.get(handle).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, handle: usize) -> Option<&mut OpenFile> {
        self.files.get_mut(handle).and_then(Option::as_mut)
    }

    pub fn is_open(&self, handle: usize) -> bool {
        self.get(handle).is_some()
    }

    /// `fopen`. Returns `None` where C returns `NULL`.
    pub fn open(&mut self, path: &str, mode: &str) -> Option<usize> {
        let path = self.base_dir.join(path);
        let plus = mode.contains('+');
        let file = match mode.chars().next()? {
            'r' => OpenFile {
                data: fs::read(&path).ok()?,
                path: Some(path),
                pos: 0,
                eof: false,
                readable: true,
                writable: plus,
                append: false,
                dirty: false,
            },
            'w' => {
                fs::write(&path, b"").ok()?;
                OpenFile {
                    data: Vec::new(),
                    path: Some(path),
                    pos: 0,
                    eof: false,
                    readable: plus,
                    writable: true,
                    append: false,
                    dirty: false,
                }
            }
            'a' => {
                let data = match fs::read(&path) {
                    Ok(data) => data,
                    Err(_) => {
                        fs::write(&path, b"").ok()?;
                        Vec::new()
                    }
                };
                OpenFile {
                    pos: data.len(),
                    data,
                    path: Some(path),
                    eof: false,
                    readable: plus,
                    writable: true,
                    append: true,
                    dirty: false,
                }
            }
            _ => return None,
        };
        debug!("fopen {:?} ({mode})", file.path);
        let handle = match self.files.iter().skip(3).position(Option::is_none) {
            Some(free) => free + 3,
            None => {
                self.files.push(None);
                self.files.len() - 1
            }
        };
        self.files[handle] = Some(file);
        Some(handle)
    }

    /// `fclose`: flush and release. False for an unknown handle.
    pub fn close(&mut self, handle: usize) -> bool {
        if handle <= STDERR || !self.is_open(handle) {
            return false;
        }
        self.flush(handle);
        self.files[handle] = None;
        true
    }

    pub fn flush(&mut self, handle: usize) {
        let Some(file) = self.get_mut(handle) else { return };
        if !file.dirty {
            return;
        }
        if let Some(path) = &file.path {
            if let Err(err) = fs::write(path, &file.data) {
                warn!("could not write {}: {err}", path.display());
            }
        }
        file.dirty = false;
    }

    pub fn flush_all(&mut self) {
        for handle in 0..self.files.len() {
            self.flush(handle);
        }
    }

    /// Unread bytes of a readable handle.
    pub fn remaining(&self, handle: usize) -> &[u8] {
        match self.get(handle) {
            Some(file) if file.readable => &file.data[file.pos.min(file.data.len())..],
            _ => &[],
        }
    }

    /// Consume `n` bytes; `hit_end` marks end-of-file.
    pub fn advance(&mut self, handle: usize, n: usize, hit_end: bool) {
        if let Some(file) = self.get_mut(handle) {
            file.pos = (file.pos + n).min(file.data.len());
            if hit_end {
                file.eof = true;
            }
        }
    }

    pub fn read_byte(&mut self, handle: usize) -> Option<u8> {
        let file = self.get_mut(handle).filter(|f| f.readable)?;
        match file.data.get(file.pos) {
            Some(&b) => {
                file.pos += 1;
                Some(b)
            }
            None => {
                file.eof = true;
                None
            }
        }
    }

    pub fn peek_byte(&self, handle: usize) -> Option<u8> {
        let file = self.get(handle).filter(|f| f.readable)?;
        file.data.get(file.pos).copied()
    }

    /// `fgets`: up to `max` bytes, stopping after a newline.
    pub fn read_line(&mut self, handle: usize, max: usize) -> Option<Vec<u8>> {
        let mut line = Vec::new();
        while line.len() < max {
            match self.read_byte(handle) {
                Some(b) => {
                    line.push(b);
                    if b == b'\n' {
                        break;
                    }
                }
                None => break,
            }
        }
        (!line.is_empty()).then_some(line)
    }

    /// Write to a disk file. Console handles are written by the interpreter.
    pub fn write(&mut self, handle: usize, bytes: &[u8]) -> bool {
        let Some(file) = self.get_mut(handle).filter(|f| f.writable) else {
            return false;
        };
        if file.append {
            file.pos = file.data.len();
        }
        let end = file.pos + bytes.len();
        if end > file.data.len() {
            file.data.resize(end, 0);
        }
        file.data[file.pos..end].copy_from_slice(bytes);
        file.pos = end;
        file.dirty = true;
        true
    }

    /// `fseek`; `whence` is `SEEK_SET`, `SEEK_CUR` or `SEEK_END`.
    pub fn seek(&mut self, handle: usize, offset: i64, whence: i64) -> bool {
        let Some(file) = self.get_mut(handle).filter(|f| f.path.is_some()) else {
            return false;
        };
        let base = match whence {
            0 => 0,
            1 => file.pos as i64,
            2 => file.data.len() as i64,
            _ => return false,
        };
        let target = base + offset;
        if target < 0 {
            return false;
        }
        file.pos = target as usize;
        file.eof = false;
        true
    }

    pub fn tell(&self, handle: usize) -> Option<i64> {
        self.get(handle).map(|f| f.pos as i64)
    }

    pub fn rewind(&mut self, handle: usize) {
        if let Some(file) = self.get_mut(handle) {
            file.pos = 0;
            file.eof = false;
        }
    }

    pub fn eof(&self, handle: usize) -> bool {
        self.get(handle).is_some_and(|f| f.eof)
    }
}

impl Interpreter {
    /// Append program output, failing once the byte cap is crossed.
    pub(crate) fn emit(&mut self, bytes: &[u8]) -> Result<(), RuntimeError> {
        self.output
            .write(bytes)
            .map_err(|_| RuntimeError::OutputLimitExceeded {
                limit: self.output.cap(),
            })
    }

    fn write_handle(
        &mut self,
        handle: usize,
        bytes: &[u8],
        location: SourceLocation,
    ) -> Result<bool, RuntimeError> {
        match handle {
            STDOUT | STDERR => self.emit(bytes).map(|_| true),
            _ if self.files.is_open(handle) => Ok(self.files.write(handle, bytes)),
            _ => Err(RuntimeError::TypeError {
                message: "write to a closed FILE*".to_string(),
                location,
            }),
        }
    }

    /// Evaluate a `FILE*` argument.
    pub(crate) fn file_handle(
        &mut self,
        expr: &AstNode,
        location: SourceLocation,
    ) -> Result<usize, RuntimeError> {
        match self.evaluate_expr(expr)? {
            Value::File(handle) => Ok(handle),
            Value::Null => Err(RuntimeError::NullDereference { location }),
            other => Err(RuntimeError::TypeError {
                message: format!("expected FILE*, got {}", other.type_name()),
                location,
            }),
        }
    }

    fn arg_count(
        &self,
        name: &str,
        args: &[AstNode],
        expected: usize,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        if args.len() != expected {
            return Err(RuntimeError::ArgumentCountMismatch {
                function: name.to_string(),
                expected,
                got: args.len(),
                location,
            });
        }
        Ok(())
    }

    /// `<stdio.h>` functions. `None` when `name` is not one of them.
    pub(crate) fn call_stdio(
        &mut self,
        name: &str,
        args: &[AstNode],
        location: SourceLocation,
    ) -> Result<Option<Value>, RuntimeError> {
        let value = match name {
            "printf" => {
                let (fmt, rest) = args.split_first().ok_or_else(|| RuntimeError::InvalidFormat {
                    message: "printf requires a format string".to_string(),
                    location,
                })?;
                let budget = self.output_budget();
                let bytes = self.format_args(fmt, rest, budget, location)?;
                self.emit(&bytes)?;
                Value::Int(bytes.len() as i64)
            }
            "fprintf" => {
                if args.len() < 2 {
                    return Err(RuntimeError::InvalidFormat {
                        message: "fprintf requires a stream and a format string".to_string(),
                        location,
                    });
                }
                let handle = self.file_handle(&args[0], location)?;
                let bytes = match handle {
                    STDOUT | STDERR => {
                        let budget = self.output_budget();
                        self.format_args(&args[1], &args[2..], budget, location)?
                    }
                    _ => self.format_bounded(&args[1], &args[2..], location)?,
                };
                match self.write_handle(handle, &bytes, location)? {
                    true => Value::Int(bytes.len() as i64),
                    false => Value::Int(-1),
                }
            }
            "puts" => {
                self.arg_count(name, args, 1, location)?;
                let text = self.evaluate_expr(&args[0])?;
                let mut bytes = self.c_string(&text, location)?;
                bytes.push(b'\n');
                self.emit(&bytes)?;
                Value::Int(bytes.len() as i64)
            }
            "putchar" => {
                self.arg_count(name, args, 1, location)?;
                let c = self.int_arg(&args[0], location)? as u8;
                self.emit(&[c])?;
                Value::Int(c as i64)
            }
            "fputs" => {
                self.arg_count(name, args, 2, location)?;
                let text = self.evaluate_expr(&args[0])?;
                let bytes = self.c_string(&text, location)?;
                let handle = self.file_handle(&args[1], location)?;
                match self.write_handle(handle, &bytes, location)? {
                    true => Value::Int(1),
                    false => Value::Int(-1),
                }
            }
            "fputc" | "putc" => {
                self.arg_count(name, args, 2, location)?;
                let c = self.int_arg(&args[0], location)? as u8;
                let handle = self.file_handle(&args[1], location)?;
                match self.write_handle(handle, &[c], location)? {
                    true => Value::Int(c as i64),
                    false => Value::Int(-1),
                }
            }
            "getchar" => {
                self.arg_count(name, args, 0, location)?;
                Value::Int(self.files.read_byte(STDIN).map_or(-1, i64::from))
            }
            "fgetc" | "getc" => {
                self.arg_count(name, args, 1, location)?;
                let handle = self.file_handle(&args[0], location)?;
                Value::Int(self.files.read_byte(handle).map_or(-1, i64::from))
            }
            "fgets" => {
                self.arg_count(name, args, 3, location)?;
                let dest = self.evaluate_expr(&args[0])?;
                let size = self.int_arg(&args[1], location)?;
                let handle = self.file_handle(&args[2], location)?;
                if size <= 1 {
                    return Ok(Some(Value::Null));
                }
                match self.files.read_line(handle, size as usize - 1) {
                    Some(line) => {
                        self.write_c_string(&dest, &line, location)?;
                        dest
                    }
                    None => Value::Null,
                }
            }
            "fopen" => {
                self.arg_count(name, args, 2, location)?;
                let path = self.evaluate_expr(&args[0])?;
                let path = String::from_utf8_lossy(&self.c_string(&path, location)?).into_owned();
                let mode = self.evaluate_expr(&args[1])?;
                let mode = String::from_utf8_lossy(&self.c_string(&mode, location)?).into_owned();
                match self.files.open(&path, &mode) {
                    Some(handle) => Value::File(handle),
                    None => {
                        debug!("fopen failed for {path} ({mode})");
                        Value::Null
                    }
                }
            }
            "fclose" => {
                self.arg_count(name, args, 1, location)?;
                let handle = self.file_handle(&args[0], location)?;
                Value::Int(if self.files.close(handle) { 0 } else { -1 })
            }
            "fflush" => {
                if let Some(stream) = args.first() {
                    if let Value::File(handle) = self.evaluate_expr(stream)? {
                        self.files.flush(handle);
                    }
                }
                Value::Int(0)
            }
            "feof" => {
                self.arg_count(name, args, 1, location)?;
                let handle = self.file_handle(&args[0], location)?;
                Value::bool(self.files.eof(handle))
            }
            "fseek" => {
                self.arg_count(name, args, 3, location)?;
                let handle = self.file_handle(&args[0], location)?;
                let offset = self.int_arg(&args[1], location)?;
                let whence = self.int_arg(&args[2], location)?;
                Value::Int(if self.files.seek(handle, offset, whence) { 0 } else { -1 })
            }
            "ftell" => {
                self.arg_count(name, args, 1, location)?;
                let handle = self.file_handle(&args[0], location)?;
                Value::Int(self.files.tell(handle).unwrap_or(-1))
            }
            "rewind" => {
                self.arg_count(name, args, 1, location)?;
                let handle = self.file_handle(&args[0], location)?;
                self.files.rewind(handle);
                Value::Void
            }
            _ => return Ok(None),
        };
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_stdin_reads() {
        let mut files = FileTable::new(b"ab\ncd".to_vec(), PathBuf::from("."));
        assert_eq!(files.read_line(STDIN, 10), Some(b"ab\n".to_vec()));
        assert_eq!(files.remaining(STDIN), b"cd");
        assert_eq!(files.read_byte(STDIN), Some(b'c'));
        files.advance(STDIN, 1, false);
        assert_eq!(files.read_byte(STDIN), None);
        assert!(files.eof(STDIN));
    }

    #[test]
    fn test_write_then_read_back() {
        let dir = tempdir().unwrap();
        let mut files = FileTable::new(Vec::new(), dir.path().to_path_buf());

        let out = files.open("data.txt", "w").unwrap();
        assert!(files.write(out, b"hello\n"));
        assert!(files.close(out));
        assert_eq!(fs::read(dir.path().join("data.txt")).unwrap(), b"hello\n");

        let input = files.open("data.txt", "r").unwrap();
        assert!(files.seek(input, 0, 2));
        assert_eq!(files.tell(input), Some(6));
        files.rewind(input);
        assert_eq!(files.read_line(input, 100), Some(b"hello\n".to_vec()));
        assert!(files.close(input));
    }

    #[test]
    fn test_append_and_missing_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("log.txt"), b"a").unwrap();
        let mut files = FileTable::new(Vec::new(), dir.path().to_path_buf());

        let log = files.open("log.txt", "a").unwrap();
        files.write(log, b"b");
        files.flush_all();
        assert_eq!(fs::read(dir.path().join("log.txt")).unwrap(), b"ab");

        assert!(files.open("missing.txt", "r").is_none());
        assert!(!files.close(STDOUT));
    }
}
