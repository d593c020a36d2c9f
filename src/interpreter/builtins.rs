//! Built-in function implementations
//!
//! This module provides the C standard library functions that are handled by
//! the interpreter rather than defined in user code. A user function with
//! the same name always wins.
//!
//! # Supported Built-ins
//!
//! - `<stdio.h>`: see [`super::files`]
//! - `<string.h>`, `atoi`/`strtol` family, `std::string` helpers: see
//!   [`super::strings`]
//! - `<stdlib.h>`: `malloc`, `calloc`, `realloc`, `free`, `rand`, `srand`,
//!   `abs`, `labs`, `exit`
//! - `<string.h>` memory functions: `memset`, `memcpy`, `memmove`, `memcmp`
//! - `<math.h>`: the usual one and two argument functions
//! - `<ctype.h>`: classification and case mapping
//! - `<time.h>`: `time`, `clock`, `difftime`
//! - `assert`, and the C++ utilities `swap`, `max`, `min`
//!
//! # Implementation Notes
//!
//! - `malloc` returns an untyped block that takes the element type of the
//!   first typed pointer it is stored in
//! - `free` marks the block freed; later access reports use after free
//! - `rand` is the portable linear congruential generator from the C
//!   standard, so runs are reproducible

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::buffer::Buffer;
use crate::memory::value::{Place, Pointer, Value};
use crate::memory::{wrap_int, zero_value};
use crate::parser::ast::{AstNode, BaseType, SourceLocation};
use std::time::{SystemTime, UNIX_EPOCH};

/// `RAND_MAX`
pub(crate) const RAND_MAX: i64 = 32767;

fn math1(name: &str) -> Option<fn(f64) -> f64> {
    Some(match name {
        "sqrt" => f64::sqrt,
        "cbrt" => f64::cbrt,
        "exp" => f64::exp,
        "log" => f64::ln,
        "log10" => f64::log10,
        "log2" => f64::log2,
        "sin" => f64::sin,
        "cos" => f64::cos,
        "tan" => f64::tan,
        "asin" => f64::asin,
        "acos" => f64::acos,
        "atan" => f64::atan,
        "sinh" => f64::sinh,
        "cosh" => f64::cosh,
        "tanh" => f64::tanh,
        "fabs" => f64::abs,
        "ceil" => f64::ceil,
        "floor" => f64::floor,
        "round" => f64::round,
        "trunc" => f64::trunc,
        _ => return None,
    })
}

fn math2(name: &str) -> Option<fn(f64, f64) -> f64> {
    Some(match name {
        "pow" => f64::powf,
        "atan2" => f64::atan2,
        "hypot" => f64::hypot,
        "fmod" => fmod,
        "fmin" => f64::min,
        "fmax" => f64::max,
        _ => return None,
    })
}

fn fmod(a: f64, b: f64) -> f64 {
    a % b
}

fn ctype(name: &str, c: i64) -> Option<i64> {
    let b = u8::try_from(c).ok();
    let test = |f: fn(&u8) -> bool| Some(b.is_some_and(|b| f(&b)) as i64);
    match name {
        "isalpha" => test(u8::is_ascii_alphabetic),
        "isdigit" => test(u8::is_ascii_digit),
        "isalnum" => test(u8::is_ascii_alphanumeric),
        "isspace" => test(|b| b.is_ascii_whitespace() || *b == 0x0b),
        "isupper" => test(u8::is_ascii_uppercase),
        "islower" => test(u8::is_ascii_lowercase),
        "ispunct" => test(u8::is_ascii_punctuation),
        "isxdigit" => test(u8::is_ascii_hexdigit),
        "isprint" => test(|b| (0x20..0x7f).contains(b)),
        "isgraph" => test(u8::is_ascii_graphic),
        "iscntrl" => test(u8::is_ascii_control),
        "toupper" => Some(b.map_or(c, |b| b.to_ascii_uppercase() as i64)),
        "tolower" => Some(b.map_or(c, |b| b.to_ascii_lowercase() as i64)),
        _ => None,
    }
}

impl Interpreter {
    pub(crate) fn int_arg(&mut self, arg: &AstNode, location: SourceLocation) -> Result<i64, RuntimeError> {
        let value = self.evaluate_expr(arg)?;
        value.as_int().ok_or_else(|| RuntimeError::TypeError {
            message: format!("expected an integer, got {}", value.type_name()),
            location,
        })
    }

    fn float_arg(&mut self, arg: &AstNode, location: SourceLocation) -> Result<f64, RuntimeError> {
        let value = self.evaluate_expr(arg)?;
        value.as_float().ok_or_else(|| RuntimeError::TypeError {
            message: format!("expected a number, got {}", value.type_name()),
            location,
        })
    }

    fn expect_args(
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

    /// Call a library function. `None` when `name` is not a builtin.
    pub(crate) fn call_builtin(
        &mut self,
        name: &str,
        args: &[AstNode],
        location: SourceLocation,
    ) -> Result<Option<Value>, RuntimeError> {
        if let Some(value) = self.call_stdio(name, args, location)? {
            return Ok(Some(value));
        }
        if let Some(value) = self.call_string_function(name, args, location)? {
            return Ok(Some(value));
        }

        if let Some(f) = math1(name) {
            self.expect_args(name, args, 1, location)?;
            return Ok(Some(Value::Float(f(self.float_arg(&args[0], location)?))));
        }
        if let Some(f) = math2(name) {
            self.expect_args(name, args, 2, location)?;
            let a = self.float_arg(&args[0], location)?;
            let b = self.float_arg(&args[1], location)?;
            return Ok(Some(Value::Float(f(a, b))));
        }
        if ctype(name, 0).is_some() {
            self.expect_args(name, args, 1, location)?;
            let c = self.int_arg(&args[0], location)?;
            return Ok(ctype(name, c).map(Value::Int));
        }

        let value = match name {
            "abs" | "labs" | "llabs" => {
                self.expect_args(name, args, 1, location)?;
                match self.evaluate_expr(&args[0])? {
                    Value::Float(f) => Value::Float(f.abs()),
                    Value::Int(n) => Value::Int(n.wrapping_abs()),
                    other => {
                        return Err(RuntimeError::TypeError {
                            message: format!("abs of {}", other.type_name()),
                            location,
                        })
                    }
                }
            }
            "max" | "min" => {
                self.expect_args(name, args, 2, location)?;
                let a = self.evaluate_expr(&args[0])?;
                let b = self.evaluate_expr(&args[1])?;
                let pick_b = match (&a, &b) {
                    (Value::Int(x), Value::Int(y)) => {
                        if name == "max" { y > x } else { y < x }
                    }
                    (Value::Str(x), Value::Str(y)) => {
                        if name == "max" { y > x } else { y < x }
                    }
                    _ => {
                        let (x, y) = match (a.as_float(), b.as_float()) {
                            (Some(x), Some(y)) => (x, y),
                            _ => {
                                return Err(RuntimeError::TypeError {
                                    message: format!("{name} of {} and {}", a.type_name(), b.type_name()),
                                    location,
                                })
                            }
                        };
                        if name == "max" { y > x } else { y < x }
                    }
                };
                if pick_b { b } else { a }
            }
            "swap" => {
                self.expect_args(name, args, 2, location)?;
                let a = self.place_of(&args[0])?;
                let b = self.place_of(&args[1])?;
                let va = self.read_place(&a, location)?;
                let vb = self.read_place(&b, location)?;
                self.write_place(&a, vb, location)?;
                self.write_place(&b, va, location)?;
                Value::Void
            }
            "sync_with_stdio" => Value::Int(1),

            "rand" => {
                self.rand_state = self.rand_state.wrapping_mul(1103515245).wrapping_add(12345);
                Value::Int(((self.rand_state / 65536) % 32768) as i64)
            }
            "srand" => {
                self.expect_args(name, args, 1, location)?;
                self.rand_state = self.int_arg(&args[0], location)? as u32 as u64;
                Value::Void
            }
            "time" => {
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map_or(0, |d| d.as_secs() as i64);
                if let Some(arg) = args.first() {
                    match self.evaluate_expr(arg)? {
                        Value::Null => {}
                        pointer => {
                            let place = self.element_place(pointer, 0, location)?;
                            self.write_place(&place, Value::Int(now), location)?;
                        }
                    }
                }
                Value::Int(now)
            }
            "clock" => Value::Int(self.started.elapsed().as_micros() as i64),
            "difftime" => {
                self.expect_args(name, args, 2, location)?;
                let a = self.float_arg(&args[0], location)?;
                let b = self.float_arg(&args[1], location)?;
                Value::Float(a - b)
            }
            "exit" => {
                self.expect_args(name, args, 1, location)?;
                let code = self.int_arg(&args[0], location)? as i32;
                return Err(RuntimeError::Exit { code });
            }
            "assert" => {
                self.expect_args(name, args, 1, location)?;
                if !self.evaluate_expr(&args[0])?.is_truthy() {
                    return Err(RuntimeError::AssertionFailed { location });
                }
                Value::Void
            }

            "malloc" => {
                self.expect_args(name, args, 1, location)?;
                let size = self.size_arg(&args[0], location)?;
                self.allocate(size, location)?
            }
            "calloc" => {
                self.expect_args(name, args, 2, location)?;
                let count = self.size_arg(&args[0], location)?;
                let size = self.size_arg(&args[1], location)?;
                let bytes = count.checked_mul(size).ok_or(RuntimeError::OutOfMemory {
                    requested: usize::MAX,
                    limit: self.max_buffer_elems,
                    location,
                })?;
                self.allocate(bytes, location)?
            }
            "realloc" => {
                self.expect_args(name, args, 2, location)?;
                let block = self.evaluate_expr(&args[0])?;
                let size = self.size_arg(&args[1], location)?;
                match block {
                    Value::Null => self.allocate(size, location)?,
                    Value::Ptr(ptr) => {
                        self.check_heap_block(&ptr, location)?;
                        if size == 0 {
                            ptr.buf.borrow_mut().freed = true;
                            Value::Null
                        } else {
                            self.check_allocation(size, location)?;
                            ptr.buf.borrow_mut().resize_bytes(size);
                            Value::Ptr(ptr)
                        }
                    }
                    _ => return Err(RuntimeError::InvalidFree { location }),
                }
            }
            "free" => {
                self.expect_args(name, args, 1, location)?;
                match self.evaluate_expr(&args[0])? {
                    Value::Null => {}
                    Value::Ptr(ptr) => {
                        self.check_heap_block(&ptr, location)?;
                        let mut buf = ptr.buf.borrow_mut();
                        buf.freed = true;
                        buf.elems = Vec::new();
                    }
                    _ => return Err(RuntimeError::InvalidFree { location }),
                }
                Value::Void
            }
            "memset" => {
                self.expect_args(name, args, 3, location)?;
                let dest = self.mem_pointer(&args[0], location)?;
                let byte = self.int_arg(&args[1], location)? as u8;
                let bytes = self.size_arg(&args[2], location)?;
                self.fill_bytes(&dest, byte, bytes, location)?;
                Value::Ptr(dest)
            }
            "memcpy" | "memmove" => {
                self.expect_args(name, args, 3, location)?;
                let dest = self.mem_pointer(&args[0], location)?;
                let src = self.mem_pointer(&args[1], location)?;
                let bytes = self.size_arg(&args[2], location)?;
                let count = bytes / dest.buf.borrow().elem_size().max(1);
                let mut values = Vec::with_capacity(count);
                for i in 0..count {
                    values.push(self.read_place(&Place::Elem(src.offset_by(i as i64)), location)?);
                }
                for (i, value) in values.into_iter().enumerate() {
                    self.write_place(&Place::Elem(dest.offset_by(i as i64)), value, location)?;
                }
                Value::Ptr(dest)
            }
            "memcmp" => {
                self.expect_args(name, args, 3, location)?;
                let a = self.mem_pointer(&args[0], location)?;
                let b = self.mem_pointer(&args[1], location)?;
                let bytes = self.size_arg(&args[2], location)?;
                let count = bytes / a.buf.borrow().elem_size().max(1);
                let mut result = 0;
                for i in 0..count {
                    let x = self.read_place(&Place::Elem(a.offset_by(i as i64)), location)?;
                    let y = self.read_place(&Place::Elem(b.offset_by(i as i64)), location)?;
                    let (x, y) = (x.as_float().unwrap_or(0.0), y.as_float().unwrap_or(0.0));
                    if x != y {
                        result = if x < y { -1 } else { 1 };
                        break;
                    }
                }
                Value::Int(result)
            }
            _ => return Ok(None),
        };
        Ok(Some(value))
    }

    fn size_arg(&mut self, arg: &AstNode, location: SourceLocation) -> Result<usize, RuntimeError> {
        let n = self.int_arg(arg, location)?;
        usize::try_from(n).map_err(|_| RuntimeError::OutOfMemory {
            requested: n as usize,
            limit: self.max_buffer_elems,
            location,
        })
    }

    fn allocate(&mut self, bytes: usize, location: SourceLocation) -> Result<Value, RuntimeError> {
        self.check_allocation(bytes, location)?;
        Ok(Value::Ptr(Pointer::new(Buffer::untyped(bytes).into_ref(), 0)))
    }

    /// A pointer that `free`/`realloc` may release.
    fn check_heap_block(&self, ptr: &Pointer, location: SourceLocation) -> Result<(), RuntimeError> {
        let buf = ptr.buf.borrow();
        if buf.freed {
            return Err(RuntimeError::DoubleFree { location });
        }
        if !buf.heap || ptr.offset != 0 {
            return Err(RuntimeError::InvalidFree { location });
        }
        Ok(())
    }

    fn mem_pointer(&mut self, arg: &AstNode, location: SourceLocation) -> Result<Pointer, RuntimeError> {
        match self.evaluate_expr(arg)? {
            Value::Ptr(ptr) => Ok(ptr),
            Value::Null => Err(RuntimeError::NullDereference { location }),
            other => Err(RuntimeError::TypeError {
                message: format!("expected a pointer, got {}", other.type_name()),
                location,
            }),
        }
    }

    /// `memset`: every element covered by `bytes` gets the value whose bytes
    /// all equal `byte`.
    fn fill_bytes(
        &mut self,
        dest: &Pointer,
        byte: u8,
        bytes: usize,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let (elem, size) = {
            let buf = dest.buf.borrow();
            (buf.elem, buf.elem_size().max(1))
        };
        let pattern = u64::from_ne_bytes([byte; 8]);
        let value = if elem.is_pointer() || matches!(elem.base, BaseType::Str | BaseType::File) {
            if byte != 0 {
                return Err(RuntimeError::Unsupported {
                    message: "memset of pointers to a non-zero byte".to_string(),
                    location,
                });
            }
            zero_value(&elem)
        } else {
            match elem.base {
                BaseType::Float => Value::Float(f32::from_bits(pattern as u32) as f64),
                BaseType::Double => Value::Float(f64::from_bits(pattern)),
                base => {
                    let bits = if size >= 8 { pattern } else { pattern & ((1u64 << (size * 8)) - 1) };
                    Value::Int(wrap_int(bits as i64, base))
                }
            }
        };
        for i in 0..bytes / size {
            self.write_place(&Place::Elem(dest.offset_by(i as i64)), value.clone(), location)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctype() {
        assert_eq!(ctype("isalpha", 'a' as i64), Some(1));
        assert_eq!(ctype("isdigit", 'a' as i64), Some(0));
        assert_eq!(ctype("toupper", 'q' as i64), Some('Q' as i64));
        assert_eq!(ctype("tolower", -1), Some(-1));
        assert_eq!(ctype("isspace", '\t' as i64), Some(1));
        assert_eq!(ctype("strlen", 0), None);
    }

    #[test]
    fn test_math_tables() {
        assert_eq!(math1("sqrt").map(|f| f(16.0)), Some(4.0));
        assert_eq!(math2("pow").map(|f| f(2.0, 10.0)), Some(1024.0));
        assert_eq!(math2("fmod").map(|f| f(7.5, 2.0)), Some(1.5));
        assert!(math1("printf").is_none());
    }
}
