//! `<string.h>` functions and `std::string`
//!
//! C strings are NUL-terminated `char` buffers; `std::string` is a
//! [`Value::Str`] held directly in its variable. Functions that return a
//! position inside their argument (`strchr`, `strstr`, ...) return a pointer
//! into the same buffer.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::format::{format_fixed, parse_float_prefix, parse_int_prefix};
use crate::interpreter::statements::is_assignable;
use crate::memory::buffer::Buffer;
use crate::memory::value::{Place, Pointer, Value};
use crate::parser::ast::{AstNode, BaseType, SourceLocation, Type};
use std::cmp::Ordering;

fn ordering_value(ordering: Ordering) -> Value {
    Value::Int(match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    })
}

fn find_bytes(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    if needle.is_empty() {
        return Some(from);
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

fn rfind_bytes(haystack: &[u8], needle: &[u8], until: usize) -> Option<usize> {
    let last_start = haystack.len().checked_sub(needle.len())?.min(until);
    (0..=last_start)
        .rev()
        .find(|&i| &haystack[i..i + needle.len()] == needle)
}

impl Interpreter {
    /// Text of a `char*`, a `std::string` or (for a reference to a `char`)
    /// that single character.
    pub(crate) fn c_string(
        &self,
        value: &Value,
        location: SourceLocation,
    ) -> Result<Vec<u8>, RuntimeError> {
        match value {
            Value::Ptr(ptr) => ptr
                .buf
                .borrow_mut()
                .read_c_string(ptr.offset)
                .map_err(|e| self.mem_error(e, location)),
            Value::Str(bytes) => Ok(bytes.clone()),
            Value::Null => Err(RuntimeError::NullDereference { location }),
            Value::Ref(place) => match self.read_place(place, location)? {
                Value::Str(bytes) => Ok(bytes),
                Value::Int(0) => Ok(Vec::new()),
                Value::Int(c) => Ok(vec![c as u8]),
                other => Err(RuntimeError::TypeError {
                    message: format!("expected a string, got {}", other.type_name()),
                    location,
                }),
            },
            other => Err(RuntimeError::TypeError {
                message: format!("expected a string, got {}", other.type_name()),
                location,
            }),
        }
    }

    /// Store `bytes` plus a NUL at the `char*` `dest`.
    pub(crate) fn write_c_string(
        &self,
        dest: &Value,
        bytes: &[u8],
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        match dest {
            Value::Ptr(ptr) => ptr
                .buf
                .borrow_mut()
                .write_c_string(ptr.offset, bytes)
                .map_err(|e| self.mem_error(e, location)),
            Value::Ref(place) if self.holds_text(place) => self
                .write_place(place, Value::Str(bytes.to_vec()), location)
                .map(|_| ()),
            Value::Null => Err(RuntimeError::NullDereference { location }),
            other => Err(RuntimeError::TypeError {
                message: format!("expected a char buffer, got {}", other.type_name()),
                location,
            }),
        }
    }

    fn pointer_arg(&mut self, arg: &AstNode, location: SourceLocation) -> Result<Pointer, RuntimeError> {
        match self.evaluate_expr(arg)? {
            Value::Ptr(ptr) => Ok(ptr),
            Value::Null => Err(RuntimeError::NullDereference { location }),
            other => Err(RuntimeError::TypeError {
                message: format!("expected a pointer, got {}", other.type_name()),
                location,
            }),
        }
    }

    pub(crate) fn text_arg(&mut self, arg: &AstNode, location: SourceLocation) -> Result<Vec<u8>, RuntimeError> {
        let value = self.evaluate_expr(arg)?;
        self.c_string(&value, location)
    }

    /// `<string.h>` and the other C string helpers. `None` when `name` is
    /// not one of them.
    pub(crate) fn call_string_function(
        &mut self,
        name: &str,
        args: &[AstNode],
        location: SourceLocation,
    ) -> Result<Option<Value>, RuntimeError> {
        let arity = |n: usize| -> Result<(), RuntimeError> {
            if args.len() != n {
                return Err(RuntimeError::ArgumentCountMismatch {
                    function: name.to_string(),
                    expected: n,
                    got: args.len(),
                    location,
                });
            }
            Ok(())
        };

        let value = match name {
            "strlen" => {
                arity(1)?;
                Value::Int(self.text_arg(&args[0], location)?.len() as i64)
            }
            "strcpy" => {
                arity(2)?;
                let dest = self.evaluate_expr(&args[0])?;
                let src = self.text_arg(&args[1], location)?;
                self.write_c_string(&dest, &src, location)?;
                dest
            }
            "strncpy" => {
                arity(3)?;
                let dest = self.pointer_arg(&args[0], location)?;
                let src = self.text_arg(&args[1], location)?;
                let n = self.int_arg(&args[2], location)?.max(0) as usize;
                for i in 0..n {
                    let byte = src.get(i).copied().unwrap_or(0);
                    self.write_place(
                        &Place::Elem(dest.offset_by(i as i64)),
                        Value::Int(byte as i8 as i64),
                        location,
                    )?;
                }
                Value::Ptr(dest)
            }
            "strcat" | "strncat" => {
                arity(if name == "strcat" { 2 } else { 3 })?;
                let dest = self.pointer_arg(&args[0], location)?;
                let mut src = self.text_arg(&args[1], location)?;
                if name == "strncat" {
                    let n = self.int_arg(&args[2], location)?.max(0) as usize;
                    src.truncate(n);
                }
                let existing = self.c_string(&Value::Ptr(dest.clone()), location)?;
                let end = Value::Ptr(dest.offset_by(existing.len() as i64));
                self.write_c_string(&end, &src, location)?;
                Value::Ptr(dest)
            }
            "strcmp" => {
                arity(2)?;
                let a = self.text_arg(&args[0], location)?;
                let b = self.text_arg(&args[1], location)?;
                ordering_value(a.cmp(&b))
            }
            "strncmp" => {
                arity(3)?;
                let mut a = self.text_arg(&args[0], location)?;
                let mut b = self.text_arg(&args[1], location)?;
                let n = self.int_arg(&args[2], location)?.max(0) as usize;
                a.truncate(n);
                b.truncate(n);
                ordering_value(a.cmp(&b))
            }
            "strchr" | "strrchr" => {
                arity(2)?;
                let start = self.pointer_arg(&args[0], location)?;
                let text = self.c_string(&Value::Ptr(start.clone()), location)?;
                let c = self.int_arg(&args[1], location)? as u8;
                let found = if c == 0 {
                    Some(text.len())
                } else if name == "strchr" {
                    text.iter().position(|b| *b == c)
                } else {
                    text.iter().rposition(|b| *b == c)
                };
                match found {
                    Some(i) => Value::Ptr(start.offset_by(i as i64)),
                    None => Value::Null,
                }
            }
            "strstr" => {
                arity(2)?;
                let start = self.pointer_arg(&args[0], location)?;
                let text = self.c_string(&Value::Ptr(start.clone()), location)?;
                let needle = self.text_arg(&args[1], location)?;
                match find_bytes(&text, &needle, 0) {
                    Some(i) => Value::Ptr(start.offset_by(i as i64)),
                    None => Value::Null,
                }
            }
            "strdup" => {
                arity(1)?;
                let text = self.text_arg(&args[0], location)?;
                self.check_allocation(text.len() + 1, location)?;
                Value::Ptr(Pointer::new(Buffer::c_string(&text).heap().into_ref(), 0))
            }
            "sprintf" => {
                if args.len() < 2 {
                    return Err(RuntimeError::InvalidFormat {
                        message: "sprintf requires a buffer and a format string".to_string(),
                        location,
                    });
                }
                let dest = self.evaluate_expr(&args[0])?;
                let bytes = self.format_bounded(&args[1], &args[2..], location)?;
                self.write_c_string(&dest, &bytes, location)?;
                Value::Int(bytes.len() as i64)
            }
            "snprintf" => {
                if args.len() < 3 {
                    return Err(RuntimeError::InvalidFormat {
                        message: "snprintf requires a buffer, a size and a format string".to_string(),
                        location,
                    });
                }
                let dest = self.evaluate_expr(&args[0])?;
                let size = self.int_arg(&args[1], location)?.max(0) as usize;
                let bytes = self.format_bounded(&args[2], &args[3..], location)?;
                if size > 0 {
                    let keep = bytes.len().min(size - 1);
                    self.write_c_string(&dest, &bytes[..keep], location)?;
                }
                Value::Int(bytes.len() as i64)
            }
            "atoi" | "atol" | "atoll" => {
                arity(1)?;
                let text = self.text_arg(&args[0], location)?;
                let (n, _) = parse_int_prefix(&text, 10);
                Value::Int(if name == "atoi" { n as i32 as i64 } else { n })
            }
            "atof" => {
                arity(1)?;
                let text = self.text_arg(&args[0], location)?;
                Value::Float(parse_float_prefix(&text).0)
            }
            "strtol" | "strtoul" | "strtoll" | "strtoull" | "strtod" | "strtof" => {
                let start = self.pointer_arg(&args[0], location)?;
                let text = self.c_string(&Value::Ptr(start.clone()), location)?;
                let (value, used) = if name.starts_with("strtod") || name == "strtof" {
                    let (v, used) = parse_float_prefix(&text);
                    (Value::Float(v), used)
                } else {
                    let base = match args.get(2) {
                        Some(base) => self.int_arg(base, location)? as u32,
                        None => 10,
                    };
                    if base == 1 || base > 36 {
                        return Err(RuntimeError::OutOfRange {
                            message: format!("{name}: invalid base {base}"),
                            location,
                        });
                    }
                    let (n, used) = parse_int_prefix(&text, base);
                    (Value::Int(n), used)
                };
                if let Some(end) = args.get(1) {
                    self.store_end_pointer(end, start.offset_by(used as i64), location)?;
                }
                value
            }

            // C++ <string>
            "to_string" => {
                arity(1)?;
                let text = match self.evaluate_expr(&args[0])? {
                    Value::Float(f) => format_fixed(f, 6),
                    Value::Int(n) => n.to_string(),
                    other => {
                        return Err(RuntimeError::TypeError {
                            message: format!("to_string of {}", other.type_name()),
                            location,
                        })
                    }
                };
                Value::Str(text.into_bytes())
            }
            "stoi" | "stol" | "stoll" | "stoul" | "stoull" => {
                let text = self.text_arg(&args[0], location)?;
                let base = match args.get(2) {
                    Some(base) => self.int_arg(base, location)? as u32,
                    None => 10,
                };
                let (n, used) = parse_int_prefix(&text, base);
                if used == 0 {
                    return Err(RuntimeError::OutOfRange {
                        message: format!("std::invalid_argument: {name}"),
                        location,
                    });
                }
                if name == "stoi" && i32::try_from(n).is_err() {
                    return Err(RuntimeError::OutOfRange {
                        message: format!("std::out_of_range: {name}"),
                        location,
                    });
                }
                if let Some(index) = args.get(1) {
                    match self.evaluate_expr(index)? {
                        Value::Null => {}
                        pointer => {
                            let place = self.element_place(pointer, 0, location)?;
                            self.write_place(&place, Value::Int(used as i64), location)?;
                        }
                    }
                }
                Value::Int(n)
            }
            "stod" | "stof" | "stold" => {
                let text = self.text_arg(&args[0], location)?;
                let (v, used) = parse_float_prefix(&text);
                if used == 0 {
                    return Err(RuntimeError::OutOfRange {
                        message: format!("std::invalid_argument: {name}"),
                        location,
                    });
                }
                Value::Float(v)
            }
            "string" => match args {
                [] => Value::Str(Vec::new()),
                [text] => Value::Str(self.text_arg(text, location)?),
                [count, c] => {
                    let count = self.int_arg(count, location)?.max(0) as usize;
                    let c = self.int_arg(c, location)? as u8;
                    Value::Str(vec![c; count])
                }
                _ => {
                    return Err(RuntimeError::ArgumentCountMismatch {
                        function: name.to_string(),
                        expected: 2,
                        got: args.len(),
                        location,
                    })
                }
            },
            _ => return Ok(None),
        };
        Ok(Some(value))
    }

    /// Store the end position of a `strto*` parse through its `char**`.
    fn store_end_pointer(
        &mut self,
        end: &AstNode,
        position: Pointer,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let place = match end {
            AstNode::OutParam { target, .. } => self.place_of(target)?,
            other => match self.evaluate_expr(other)? {
                Value::Null => return Ok(()),
                pointer => self.element_place(pointer, 0, location)?,
            },
        };
        self.write_place(&place, Value::Ptr(position), location)?;
        Ok(())
    }

    /// `s.method(args)` on a `std::string`.
    pub(crate) fn string_method(
        &mut self,
        object: &AstNode,
        method: &str,
        args: &[AstNode],
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let place = if is_assignable(object) {
            self.place_of(object)?
        } else {
            let value = self.evaluate_expr(object)?;
            Place::slot(value, Type::new(BaseType::Auto))
        };
        if !self.holds_text(&place) {
            return Err(RuntimeError::Unsupported {
                message: format!("method '{method}' on a value that is not a std::string"),
                location,
            });
        }
        let mut text = self.with_text(&place, location, |t| Ok(t.to_vec()))?;
        let len = text.len();

        let out_of_range = |what: &str| RuntimeError::OutOfRange {
            message: format!("std::out_of_range: basic_string::{what}"),
            location,
        };

        let value = match method {
            "size" | "length" => Value::Int(len as i64),
            "empty" => Value::bool(len == 0),
            "c_str" | "data" => Value::Ptr(Pointer::new(Buffer::c_string(&text).into_ref(), 0)),
            "at" => {
                let i = self.int_arg(self.single_arg(method, args, location)?, location)?;
                match usize::try_from(i).ok().and_then(|i| text.get(i)) {
                    Some(b) => Value::Int(*b as i8 as i64),
                    None => return Err(out_of_range("at")),
                }
            }
            "front" | "back" => {
                let b = if method == "front" { text.first() } else { text.last() };
                match b {
                    Some(b) => Value::Int(*b as i8 as i64),
                    None => return Err(out_of_range(method)),
                }
            }
            "substr" => {
                let pos = match args.first() {
                    Some(arg) => self.int_arg(arg, location)?,
                    None => 0,
                };
                if pos < 0 || pos as usize > len {
                    return Err(out_of_range("substr"));
                }
                let pos = pos as usize;
                let count = match args.get(1) {
                    Some(arg) => self.int_arg(arg, location)?,
                    None => -1,
                };
                let end = if count < 0 { len } else { (pos + count as usize).min(len) };
                Value::Str(text[pos..end].to_vec())
            }
            "find" | "rfind" => {
                let needle = match args.first() {
                    Some(arg) => match self.evaluate_expr(arg)? {
                        Value::Int(c) => vec![c as u8],
                        other => self.c_string(&other, location)?,
                    },
                    None => return Err(out_of_range(method)),
                };
                let from = match args.get(1) {
                    Some(arg) => Some(self.int_arg(arg, location)?),
                    None => None,
                };
                let found = if method == "find" {
                    find_bytes(&text, &needle, from.unwrap_or(0).max(0) as usize)
                } else {
                    let until = from.filter(|f| *f >= 0).map_or(usize::MAX, |f| f as usize);
                    rfind_bytes(&text, &needle, until)
                };
                Value::Int(found.map_or(-1, |i| i as i64))
            }
            "compare" => {
                let other = self.text_arg(self.single_arg(method, args, location)?, location)?;
                ordering_value(text.cmp(&other))
            }
            "push_back" => {
                let c = self.int_arg(self.single_arg(method, args, location)?, location)?;
                text.push(c as u8);
                self.write_place(&place, Value::Str(text), location)?;
                Value::Void
            }
            "pop_back" => {
                text.pop();
                self.write_place(&place, Value::Str(text), location)?;
                Value::Void
            }
            "clear" => {
                self.write_place(&place, Value::Str(Vec::new()), location)?;
                Value::Void
            }
            "append" => {
                let suffix = match args {
                    [count, c] => {
                        let count = self.int_arg(count, location)?.max(0) as usize;
                        vec![self.int_arg(c, location)? as u8; count]
                    }
                    _ => match self.evaluate_expr(self.single_arg(method, args, location)?)? {
                        Value::Int(c) => vec![c as u8],
                        other => self.c_string(&other, location)?,
                    },
                };
                text.extend_from_slice(&suffix);
                self.write_place(&place, Value::Str(text), location)?
            }
            "insert" => {
                let [pos, what] = args else {
                    return Err(RuntimeError::ArgumentCountMismatch {
                        function: method.to_string(),
                        expected: 2,
                        got: args.len(),
                        location,
                    });
                };
                let pos = self.int_arg(pos, location)?;
                if pos < 0 || pos as usize > len {
                    return Err(out_of_range("insert"));
                }
                let inserted = self.text_arg(what, location)?;
                text.splice(pos as usize..pos as usize, inserted);
                self.write_place(&place, Value::Str(text), location)?
            }
            "erase" => {
                let pos = match args.first() {
                    Some(arg) => self.int_arg(arg, location)?,
                    None => 0,
                };
                if pos < 0 || pos as usize > len {
                    return Err(out_of_range("erase"));
                }
                let pos = pos as usize;
                let count = match args.get(1) {
                    Some(arg) => self.int_arg(arg, location)?,
                    None => -1,
                };
                let end = if count < 0 { len } else { (pos + count as usize).min(len) };
                text.drain(pos..end);
                self.write_place(&place, Value::Str(text), location)?
            }
            "replace" => {
                let [pos, count, with] = args else {
                    return Err(RuntimeError::ArgumentCountMismatch {
                        function: method.to_string(),
                        expected: 3,
                        got: args.len(),
                        location,
                    });
                };
                let pos = self.int_arg(pos, location)?;
                if pos < 0 || pos as usize > len {
                    return Err(out_of_range("replace"));
                }
                let pos = pos as usize;
                let count = self.int_arg(count, location)?;
                let end = if count < 0 { len } else { (pos + count as usize).min(len) };
                let with = self.text_arg(with, location)?;
                text.splice(pos..end, with);
                self.write_place(&place, Value::Str(text), location)?
            }
            other => {
                return Err(RuntimeError::Unsupported {
                    message: format!("std::string::{other}"),
                    location,
                })
            }
        };
        Ok(value)
    }

    fn single_arg<'a>(
        &self,
        method: &str,
        args: &'a [AstNode],
        location: SourceLocation,
    ) -> Result<&'a AstNode, RuntimeError> {
        match args {
            [arg] => Ok(arg),
            _ => Err(RuntimeError::ArgumentCountMismatch {
                function: method.to_string(),
                expected: 1,
                got: args.len(),
                location,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_helpers() {
        assert_eq!(find_bytes(b"hello world", b"o", 0), Some(4));
        assert_eq!(find_bytes(b"hello world", b"o", 5), Some(7));
        assert_eq!(find_bytes(b"hello", b"", 2), Some(2));
        assert_eq!(find_bytes(b"hello", b"z", 0), None);
        assert_eq!(rfind_bytes(b"hello world", b"o", usize::MAX), Some(7));
        assert_eq!(rfind_bytes(b"hello world", b"o", 6), Some(4));
        assert_eq!(rfind_bytes(b"hi", b"long", usize::MAX), None);
    }
}
