//! Memory model for the inbuilt engines
//!
//! This module provides the core memory abstractions:
//! - [`value`]: tagged runtime values and storage places
//! - [`buffer`]: element-typed buffers backing arrays, strings and heap blocks
//! - [`output`]: the capped program-output accumulator
//!
//! # Type Sizes
//!
//! `sizeof` uses fixed, platform-independent sizes: `char` 1, `short` 2,
//! `int` 4, `long` 8, `float` 4, `double` 8, pointers 8. Values are wrapped to
//! the width of the type they are stored into, so `int` arithmetic overflows
//! the way it does on a typical 64-bit target.

pub mod buffer;
pub mod output;
pub mod value;

use crate::parser::ast::{BaseType, Type};
use buffer::Buffer;
use value::{Pointer, Value};

/// Default value of a declared but uninitialized object.
pub fn zero_value(ty: &Type) -> Value {
    if ty.is_pointer() {
        return Value::Null;
    }
    match ty.base {
        BaseType::Float | BaseType::Double => Value::Float(0.0),
        BaseType::Str => Value::Str(Vec::new()),
        BaseType::File => Value::Null,
        BaseType::Void | BaseType::Auto => Value::Void,
        _ => Value::Int(0),
    }
}

/// Wrap an integer to the width and signedness of `base`.
pub fn wrap_int(n: i64, base: BaseType) -> i64 {
    match base {
        BaseType::Bool => (n != 0) as i64,
        BaseType::Char => n as i8 as i64,
        BaseType::UChar => n as u8 as i64,
        BaseType::Short => n as i16 as i64,
        BaseType::UShort => n as u16 as i64,
        BaseType::Int => n as i32 as i64,
        BaseType::UInt => n as u32 as i64,
        _ => n,
    }
}

/// Convert `value` for storage into an object of type `ty`.
///
/// Storing a fresh heap block into a typed pointer gives the block its
/// element type, and storing a `char*` into a `string` copies the text.
pub fn coerce(value: Value, ty: &Type) -> Result<Value, String> {
    if ty.base == BaseType::Auto && !ty.is_pointer() {
        return Ok(value);
    }

    if ty.is_pointer() {
        return match value {
            Value::Ptr(ptr) => {
                ptr.buf.borrow_mut().retype(ty.pointee());
                Ok(Value::Ptr(ptr))
            }
            Value::Int(0) | Value::Null => Ok(Value::Null),
            Value::Ref(place) => Ok(Value::Ref(place)),
            Value::File(handle) => Ok(Value::File(handle)),
            Value::Str(bytes) if ty.pointee().is_char() => Ok(Value::Ptr(Pointer::new(
                Buffer::c_string(&bytes).into_ref(),
                0,
            ))),
            other => Err(format!(
                "cannot convert {} to a pointer",
                other.type_name()
            )),
        };
    }

    match ty.base {
        BaseType::Void => Ok(Value::Void),
        BaseType::Str => match value {
            Value::Str(bytes) => Ok(Value::Str(bytes)),
            Value::Ptr(ptr) => {
                let bytes = ptr
                    .buf
                    .borrow_mut()
                    .read_c_string(ptr.offset)
                    .map_err(|e| e.to_string())?;
                Ok(Value::Str(bytes))
            }
            Value::Int(c) => Ok(Value::Str(vec![c as u8])),
            other => Err(format!("cannot convert {} to a string", other.type_name())),
        },
        BaseType::Float => match value.as_float() {
            Some(f) => Ok(Value::Float(f as f32 as f64)),
            None => Err(format!("cannot convert {} to float", value.type_name())),
        },
        BaseType::Double => match value.as_float() {
            Some(f) => Ok(Value::Float(f)),
            None => Err(format!("cannot convert {} to double", value.type_name())),
        },
        BaseType::Bool => Ok(Value::bool(value.is_truthy())),
        BaseType::File => match value {
            Value::File(handle) => Ok(Value::File(handle)),
            Value::Null => Ok(Value::Null),
            other => Err(format!("cannot convert {} to FILE", other.type_name())),
        },
        base => match value {
            Value::Int(n) => Ok(Value::Int(wrap_int(n, base))),
            Value::Float(f) if base == BaseType::ULong => Ok(Value::Int(f as u64 as i64)),
            Value::Float(f) => Ok(Value::Int(wrap_int(f as i64, base))),
            Value::Null => Ok(Value::Int(0)),
            Value::Str(bytes) if bytes.len() == 1 => Ok(Value::Int(wrap_int(bytes[0] as i64, base))),
            other => Err(format!(
                "cannot convert {} to an integer",
                other.type_name()
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_wrapping() {
        let int = Type::new(BaseType::Int);
        assert!(matches!(coerce(Value::Int(2_147_483_648), &int), Ok(Value::Int(-2_147_483_648))));
        let uchar = Type::new(BaseType::UChar);
        assert!(matches!(coerce(Value::Int(-1), &uchar), Ok(Value::Int(255))));
        let char_ty = Type::new(BaseType::Char);
        assert!(matches!(coerce(Value::Int(200), &char_ty), Ok(Value::Int(-56))));
    }

    #[test]
    fn test_float_to_int_truncates() {
        let int = Type::new(BaseType::Int);
        assert!(matches!(coerce(Value::Float(-3.9), &int), Ok(Value::Int(-3))));
        let double = Type::new(BaseType::Double);
        assert!(matches!(coerce(Value::Int(2), &double), Ok(Value::Float(f)) if f == 2.0));
    }

    #[test]
    fn test_heap_block_typed_on_store() {
        let block = Buffer::untyped(12).into_ref();
        let ptr = Value::Ptr(Pointer::new(block.clone(), 0));
        let int_ptr = Type::new(BaseType::Int).with_pointer();
        coerce(ptr, &int_ptr).unwrap();
        assert_eq!(block.borrow().len(), 3);
    }

    #[test]
    fn test_char_pointer_to_string() {
        let ptr = Value::Ptr(Pointer::new(Buffer::c_string(b"abc").into_ref(), 1));
        let converted = coerce(ptr, &Type::new(BaseType::Str)).unwrap();
        assert!(matches!(converted, Value::Str(ref b) if b == b"bc"));
    }

    #[test]
    fn test_integer_to_pointer_rejected() {
        let int_ptr = Type::new(BaseType::Int).with_pointer();
        assert!(coerce(Value::Int(5), &int_ptr).is_err());
        assert!(matches!(coerce(Value::Int(0), &int_ptr), Ok(Value::Null)));
    }
}
