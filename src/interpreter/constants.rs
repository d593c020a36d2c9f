// Library constants visible to programs without a declaration
//
// These stand in for the macros of <limits.h>, <stdlib.h>, <stdio.h>,
// <math.h>, <float.h> and <time.h>, plus `std::string::npos`.

use crate::interpreter::builtins::RAND_MAX;
use crate::interpreter::files::{STDERR, STDIN, STDOUT};
use crate::memory::value::Value;
use crate::parser::Dialect;

/// Value of a builtin constant. User declarations shadow these.
pub(crate) fn lookup(name: &str, dialect: Dialect) -> Option<Value> {
    let value = match name {
        "INT_MAX" => Value::Int(i32::MAX as i64),
        "INT_MIN" => Value::Int(i32::MIN as i64),
        "UINT_MAX" => Value::Int(u32::MAX as i64),
        "LONG_MAX" | "LLONG_MAX" => Value::Int(i64::MAX),
        "LONG_MIN" | "LLONG_MIN" => Value::Int(i64::MIN),
        "SHRT_MAX" => Value::Int(i16::MAX as i64),
        "SHRT_MIN" => Value::Int(i16::MIN as i64),
        "CHAR_MAX" | "SCHAR_MAX" => Value::Int(i8::MAX as i64),
        "CHAR_MIN" | "SCHAR_MIN" => Value::Int(i8::MIN as i64),
        "UCHAR_MAX" => Value::Int(u8::MAX as i64),
        "CHAR_BIT" => Value::Int(8),
        "SIZE_MAX" | "ULLONG_MAX" | "ULONG_MAX" => Value::Int(-1),
        "RAND_MAX" => Value::Int(RAND_MAX),
        "EOF" => Value::Int(-1),
        "SEEK_SET" => Value::Int(0),
        "SEEK_CUR" => Value::Int(1),
        "SEEK_END" => Value::Int(2),
        "EXIT_SUCCESS" => Value::Int(0),
        "EXIT_FAILURE" => Value::Int(1),
        "CLOCKS_PER_SEC" => Value::Int(1_000_000),
        "M_PI" => Value::Float(std::f64::consts::PI),
        "M_E" => Value::Float(std::f64::consts::E),
        "M_SQRT2" => Value::Float(std::f64::consts::SQRT_2),
        "INFINITY" | "HUGE_VAL" => Value::Float(f64::INFINITY),
        "NAN" => Value::Float(f64::NAN),
        "DBL_MAX" => Value::Float(f64::MAX),
        "DBL_MIN" => Value::Float(f64::MIN_POSITIVE),
        "DBL_EPSILON" => Value::Float(f64::EPSILON),
        "FLT_MAX" => Value::Float(f32::MAX as f64),
        "FLT_MIN" => Value::Float(f32::MIN_POSITIVE as f64),
        "FLT_EPSILON" => Value::Float(f32::EPSILON as f64),
        "true" => Value::Int(1),
        "false" => Value::Int(0),
        "stdin" => Value::File(STDIN),
        "stdout" => Value::File(STDOUT),
        "stderr" => Value::File(STDERR),
        "npos" if dialect == Dialect::Cpp => Value::Int(-1),
        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits() {
        assert!(matches!(lookup("INT_MAX", Dialect::C), Some(Value::Int(2147483647))));
        assert!(matches!(lookup("EOF", Dialect::C), Some(Value::Int(-1))));
        assert!(matches!(lookup("stdout", Dialect::C), Some(Value::File(1))));
        assert!(lookup("npos", Dialect::C).is_none());
        assert!(lookup("counter", Dialect::Cpp).is_none());
    }
}
