//! Runtime value representation
//!
//! This module defines the [`Value`] enum, which represents all possible runtime values
//! in the inbuilt engines. Unlike C's raw memory model, values are tagged:
//!
//! - [`Value::Int`]: every integer type, `char` and `bool`, wrapped to the
//!   declared width when stored
//! - [`Value::Float`]: `float` and `double`
//! - [`Value::Ptr`]: a position inside a [`Buffer`](super::buffer::Buffer)
//! - [`Value::Ref`]: the address of a scalar (`&x`), usable through `*p`
//! - [`Value::Str`]: a C++ `std::string`
//! - [`Value::File`]: a handle into the emulated file table
//!
//! Storage locations are [`Place`]s. A variable binding is itself a place, so a
//! C++ reference is simply a second name for an existing place.

use super::buffer::BufferRef;
use crate::parser::ast::Type;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Runtime values in the interpreter
#[derive(Debug, Clone, Default)]
pub enum Value {
    Int(i64),
    Float(f64),
    Ptr(Pointer),
    Ref(Place),
    Null,
    Str(Vec<u8>),
    File(usize),
    #[default]
    Void,
}

/// An element position inside a buffer. The offset may point past either end;
/// only dereferencing checks bounds.
#[derive(Debug, Clone)]
pub struct Pointer {
    pub buf: BufferRef,
    pub offset: isize,
}

impl Pointer {
    pub fn new(buf: BufferRef, offset: isize) -> Self {
        Pointer { buf, offset }
    }

    pub fn offset_by(&self, delta: i64) -> Self {
        Pointer {
            buf: Rc::clone(&self.buf),
            offset: self.offset + delta as isize,
        }
    }

    pub fn same_buffer(&self, other: &Pointer) -> bool {
        Rc::ptr_eq(&self.buf, &other.buf)
    }

    /// Synthetic address used for ordering and `%p`.
    pub fn address(&self) -> usize {
        let base = Rc::as_ptr(&self.buf) as usize;
        let elem = self.buf.borrow().elem_size().max(1);
        base.wrapping_add((self.offset as usize).wrapping_mul(elem))
    }
}

/// A variable cell.
pub type Slot = Rc<RefCell<Value>>;

/// A storage location.
#[derive(Debug, Clone)]
pub enum Place {
    /// A variable with its declared type.
    Slot { cell: Slot, ty: Type },
    /// An element of a buffer.
    Elem(Pointer),
    /// One character of a `std::string` stored at `base`.
    TextChar { base: Box<Place>, index: usize },
}

impl Place {
    pub fn slot(value: Value, ty: Type) -> Self {
        Place::Slot {
            cell: Rc::new(RefCell::new(value)),
            ty,
        }
    }

    /// Whether both places name the same storage.
    pub fn same_as(&self, other: &Place) -> bool {
        match (self, other) {
            (Place::Slot { cell: a, .. }, Place::Slot { cell: b, .. }) => Rc::ptr_eq(a, b),
            (Place::Elem(a), Place::Elem(b)) => a.same_buffer(b) && a.offset == b.offset,
            (
                Place::TextChar { base: a, index: i },
                Place::TextChar { base: b, index: j },
            ) => i == j && a.same_as(b),
            _ => false,
        }
    }

    fn address(&self) -> usize {
        match self {
            Place::Slot { cell, .. } => Rc::as_ptr(cell) as usize,
            Place::Elem(ptr) => ptr.address(),
            Place::TextChar { base, index } => base.address().wrapping_add(*index),
        }
    }
}

impl Value {
    pub fn bool(b: bool) -> Self {
        Value::Int(b as i64)
    }

    /// C truthiness. Strings and files are always true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Null | Value::Void => false,
            Value::Ptr(_) | Value::Ref(_) | Value::Str(_) | Value::File(_) => true,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(f) => Some(*f as i64),
            Value::Null => Some(0),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Value::Ptr(_) | Value::Ref(_) | Value::Null)
    }

    /// Synthetic address, `0` for null and non-pointers.
    pub fn address(&self) -> usize {
        match self {
            Value::Ptr(ptr) => ptr.address(),
            Value::Ref(place) => place.address(),
            Value::File(handle) => 0x1000 + handle * 0x100,
            _ => 0,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "floating-point value",
            Value::Ptr(_) | Value::Ref(_) => "pointer",
            Value::Null => "null pointer",
            Value::Str(_) => "string",
            Value::File(_) => "FILE*",
            Value::Void => "void",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Ptr(_) | Value::Ref(_) | Value::File(_) => write!(f, "0x{:x}", self.address()),
            Value::Null => write!(f, "(nil)"),
            Value::Str(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
            Value::Void => write!(f, "void"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::buffer::Buffer;
    use crate::parser::ast::BaseType;

    #[test]
    fn test_truthiness() {
        assert!(Value::Int(3).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(Value::Str(Vec::new()).is_truthy());
    }

    #[test]
    fn test_pointer_identity() {
        let buf = Buffer::zeroed(Type::new(BaseType::Int), 4).into_ref();
        let a = Pointer::new(Rc::clone(&buf), 1);
        let b = a.offset_by(2);
        assert!(a.same_buffer(&b));
        assert!(b.address() > a.address());
        assert!(Place::Elem(a.offset_by(2)).same_as(&Place::Elem(b)));
    }
}
