//! Emulated arrays and heap blocks
//!
//! A [`Buffer`] is a dynamically sized container of [`Value`]s tagged with
//! its element type. Arrays, string literals and `malloc` blocks are all
//! buffers; pointers are `(buffer, offset)` pairs, so freeing a block can
//! never leave a dangling address behind.
//!
//! A block returned by `malloc` starts *untyped*: only its byte size is
//! known. It is given an element type the first time it is stored into a
//! typed pointer (see [`Buffer::retype`]).

use super::value::Value;
use super::zero_value;
use crate::parser::ast::{BaseType, Type};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub type BufferRef = Rc<RefCell<Buffer>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemError {
    OutOfBounds { index: isize, size: usize },
    Freed,
    Unterminated,
}

impl fmt::Display for MemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemError::OutOfBounds { index, size } => {
                write!(f, "index {index} out of bounds for size {size}")
            }
            MemError::Freed => write!(f, "use of freed memory"),
            MemError::Unterminated => write!(f, "string is not NUL-terminated"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Buffer {
    pub elems: Vec<Value>,
    pub elem: Type,
    /// False for a fresh `malloc` block whose element type is not known yet.
    pub typed: bool,
    /// Requested size of an untyped block.
    pub byte_len: usize,
    /// Elements are rows of a multi-dimensional array.
    pub nested: bool,
    pub heap: bool,
    pub freed: bool,
}

impl Buffer {
    pub fn zeroed(elem: Type, len: usize) -> Self {
        Buffer {
            elems: vec![zero_value(&elem); len],
            elem,
            typed: true,
            byte_len: len * elem.size(),
            nested: false,
            heap: false,
            freed: false,
        }
    }

    pub fn from_values(elem: Type, elems: Vec<Value>) -> Self {
        Buffer {
            byte_len: elems.len() * elem.size(),
            elems,
            elem,
            typed: true,
            nested: false,
            heap: false,
            freed: false,
        }
    }

    /// A `char` array holding `bytes` plus the terminating NUL.
    pub fn c_string(bytes: &[u8]) -> Self {
        let mut elems: Vec<Value> = bytes.iter().map(|b| Value::Int(*b as i8 as i64)).collect();
        elems.push(Value::Int(0));
        Self::from_values(Type::new(BaseType::Char), elems)
    }

    /// A heap block of `bytes` bytes with no element type yet.
    pub fn untyped(bytes: usize) -> Self {
        Buffer {
            elems: Vec::new(),
            elem: Type::new(BaseType::UChar),
            typed: false,
            byte_len: bytes,
            nested: false,
            heap: true,
            freed: false,
        }
    }

    pub fn into_ref(self) -> BufferRef {
        Rc::new(RefCell::new(self))
    }

    pub fn heap(mut self) -> Self {
        self.heap = true;
        self
    }

    pub fn elem_size(&self) -> usize {
        self.elem.size()
    }

    pub fn len(&self) -> usize {
        if self.typed {
            self.elems.len()
        } else {
            self.byte_len
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Give an untyped block its element type. Typed buffers are left alone;
    /// a `void*` or `char*` view never changes an established type.
    pub fn retype(&mut self, elem: Type) {
        if self.typed || elem.base == BaseType::Void && !elem.is_pointer() {
            return;
        }
        let size = elem.size().max(1);
        self.elems = vec![zero_value(&elem); self.byte_len / size];
        self.elem = elem;
        self.typed = true;
    }

    /// Resize a heap block to `bytes` bytes, keeping the common prefix.
    pub fn resize_bytes(&mut self, bytes: usize) {
        self.byte_len = bytes;
        if self.typed {
            let len = bytes / self.elem_size().max(1);
            let zero = zero_value(&self.elem);
            self.elems.resize(len, zero);
        }
    }

    /// Storage size in bytes, following rows of nested arrays.
    pub fn size_in_bytes(&self) -> usize {
        if !self.typed {
            return self.byte_len;
        }
        if self.nested {
            return self
                .elems
                .iter()
                .map(|row| match row {
                    Value::Ptr(p) => p.buf.borrow().size_in_bytes(),
                    _ => 0,
                })
                .sum();
        }
        self.elems.len() * self.elem_size()
    }

    fn ensure_typed(&mut self) {
        if !self.typed {
            self.elem = Type::new(BaseType::UChar);
            self.elems = vec![Value::Int(0); self.byte_len];
            self.typed = true;
        }
    }

    fn index(&self, offset: isize) -> Result<usize, MemError> {
        if self.freed {
            return Err(MemError::Freed);
        }
        if offset < 0 || offset as usize >= self.len() {
            return Err(MemError::OutOfBounds {
                index: offset,
                size: self.len(),
            });
        }
        Ok(offset as usize)
    }

    pub fn get(&mut self, offset: isize) -> Result<Value, MemError> {
        let i = self.index(offset)?;
        self.ensure_typed();
        Ok(self.elems[i].clone())
    }

    /// Store an already coerced value.
    pub fn set(&mut self, offset: isize, value: Value) -> Result<(), MemError> {
        let i = self.index(offset)?;
        self.ensure_typed();
        self.elems[i] = value;
        Ok(())
    }

    /// Bytes from `offset` up to (not including) the first NUL.
    pub fn read_c_string(&mut self, offset: isize) -> Result<Vec<u8>, MemError> {
        let start = self.index(offset)?;
        self.ensure_typed();
        let mut bytes = Vec::new();
        for value in &self.elems[start..] {
            match value {
                Value::Int(0) => return Ok(bytes),
                Value::Int(n) => bytes.push(*n as u8),
                Value::Float(f) => bytes.push(*f as u8),
                _ => return Ok(bytes),
            }
        }
        Err(MemError::Unterminated)
    }

    /// Write `bytes` and a NUL starting at `offset`.
    pub fn write_c_string(&mut self, offset: isize, bytes: &[u8]) -> Result<(), MemError> {
        let needed = offset.max(0) as usize + bytes.len() + 1;
        self.index(offset)?;
        self.ensure_typed();
        if needed > self.elems.len() {
            return Err(MemError::OutOfBounds {
                index: needed as isize - 1,
                size: self.elems.len(),
            });
        }
        let start = offset as usize;
        for (i, b) in bytes.iter().enumerate() {
            self.elems[start + i] = Value::Int(*b as i8 as i64);
        }
        self.elems[start + bytes.len()] = Value::Int(0);
        Ok(())
    }

    /// Raw byte view of `len` elements from `offset`, for `mem*` functions.
    pub fn bytes(&mut self, offset: isize, len: usize) -> Result<Vec<i64>, MemError> {
        if len == 0 {
            return Ok(Vec::new());
        }
        let start = self.index(offset)?;
        self.index(offset + len as isize - 1)?;
        self.ensure_typed();
        Ok(self.elems[start..start + len]
            .iter()
            .map(|v| v.as_int().unwrap_or(0))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_string_round_trip() {
        let mut buf = Buffer::c_string(b"hello");
        assert_eq!(buf.len(), 6);
        assert_eq!(buf.read_c_string(1).unwrap(), b"ello");
        buf.write_c_string(0, b"hi").unwrap();
        assert_eq!(buf.read_c_string(0).unwrap(), b"hi");
    }

    #[test]
    fn test_write_past_end_fails() {
        let mut buf = Buffer::zeroed(Type::new(BaseType::Char), 3);
        assert!(matches!(
            buf.write_c_string(0, b"abc"),
            Err(MemError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_untyped_block_retypes() {
        let mut buf = Buffer::untyped(40);
        assert_eq!(buf.len(), 40);
        buf.retype(Type::new(BaseType::Int));
        assert_eq!(buf.len(), 10);
        buf.resize_bytes(80);
        assert_eq!(buf.len(), 20);
        assert_eq!(buf.size_in_bytes(), 80);
    }

    #[test]
    fn test_freed_access() {
        let mut buf = Buffer::zeroed(Type::new(BaseType::Int), 2);
        buf.freed = true;
        assert!(matches!(buf.get(0), Err(MemError::Freed)));
    }
}
