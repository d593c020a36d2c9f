//! Runtime error types for the inbuilt engines
//!
//! This module defines [`RuntimeError`], which represents everything that can
//! stop program execution (as opposed to compile errors from the front end).
//!
//! A few variants are control signals rather than faults: [`RuntimeError::Exit`]
//! carries the code passed to `exit()`, and [`RuntimeError::Timeout`],
//! [`RuntimeError::OutputLimitExceeded`] and [`RuntimeError::Cancelled`] report
//! that a limit stopped the run.

use crate::parser::ast::SourceLocation;
use std::fmt;

/// Runtime errors that can occur during execution
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// `exit(code)` was called
    Exit { code: i32 },

    /// Wall-clock deadline passed
    Timeout { timeout_ms: u64 },

    /// Program output crossed the byte cap
    OutputLimitExceeded { limit: usize },

    /// The host asked the engine to stop
    Cancelled,

    /// Call depth limit exceeded
    StackOverflow {
        limit: usize,
        location: SourceLocation,
    },

    /// Call to a function that is neither defined nor a known library function
    UndefinedFunction {
        name: String,
        location: SourceLocation,
    },

    /// Reference to an undeclared identifier
    UndefinedVariable {
        name: String,
        location: SourceLocation,
    },

    /// A construct that parsed but cannot be executed
    Unsupported {
        message: String,
        location: SourceLocation,
    },

    /// Integer division or modulo by zero
    DivisionByZero { location: SourceLocation },

    /// Null pointer dereference
    NullDereference { location: SourceLocation },

    /// Index outside the buffer
    BufferOverrun {
        index: isize,
        size: usize,
        location: SourceLocation,
    },

    /// Access to a freed heap block
    UseAfterFree { location: SourceLocation },

    /// Double free
    DoubleFree { location: SourceLocation },

    /// Freeing something that is not the start of a heap block
    InvalidFree { location: SourceLocation },

    /// Allocation larger than the heap element budget
    OutOfMemory {
        requested: usize,
        limit: usize,
        location: SourceLocation,
    },

    /// Value of the wrong kind for the operation
    TypeError {
        message: String,
        location: SourceLocation,
    },

    /// Function argument count mismatch
    ArgumentCountMismatch {
        function: String,
        expected: usize,
        got: usize,
        location: SourceLocation,
    },

    /// Bad `printf`/`scanf` format string or arguments
    InvalidFormat {
        message: String,
        location: SourceLocation,
    },

    /// Malformed string operand (e.g. missing terminator)
    InvalidString {
        message: String,
        location: SourceLocation,
    },

    /// C++ `std::out_of_range` / `std::invalid_argument`
    OutOfRange {
        message: String,
        location: SourceLocation,
    },

    /// `assert` failed
    AssertionFailed { location: SourceLocation },
}

impl RuntimeError {
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            RuntimeError::StackOverflow { location, .. }
            | RuntimeError::UndefinedFunction { location, .. }
            | RuntimeError::UndefinedVariable { location, .. }
            | RuntimeError::Unsupported { location, .. }
            | RuntimeError::DivisionByZero { location }
            | RuntimeError::NullDereference { location }
            | RuntimeError::BufferOverrun { location, .. }
            | RuntimeError::UseAfterFree { location }
            | RuntimeError::DoubleFree { location }
            | RuntimeError::InvalidFree { location }
            | RuntimeError::OutOfMemory { location, .. }
            | RuntimeError::TypeError { location, .. }
            | RuntimeError::ArgumentCountMismatch { location, .. }
            | RuntimeError::InvalidFormat { location, .. }
            | RuntimeError::InvalidString { location, .. }
            | RuntimeError::OutOfRange { location, .. }
            | RuntimeError::AssertionFailed { location } => Some(location),
            RuntimeError::Exit { .. }
            | RuntimeError::Timeout { .. }
            | RuntimeError::OutputLimitExceeded { .. }
            | RuntimeError::Cancelled => None,
        }
    }

    /// Failures a real compiler would have reported before running anything.
    pub fn is_compile_class(&self) -> bool {
        matches!(
            self,
            RuntimeError::UndefinedFunction { .. }
                | RuntimeError::UndefinedVariable { .. }
                | RuntimeError::Unsupported { .. }
                | RuntimeError::ArgumentCountMismatch { .. }
        )
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::Exit { code } => write!(f, "Program exited with code {code}"),
            RuntimeError::Timeout { timeout_ms } => {
                write!(f, "Program timed out after {timeout_ms} ms")
            }
            RuntimeError::OutputLimitExceeded { limit } => {
                write!(f, "Program output exceeded {limit} bytes and was truncated")
            }
            RuntimeError::Cancelled => write!(f, "Execution was cancelled"),
            RuntimeError::StackOverflow { limit, location } => write!(
                f,
                "Stack overflow (call depth limit {} exceeded) at line {}",
                limit, location.line
            ),
            RuntimeError::UndefinedFunction { name, location } => {
                write!(f, "Undefined function '{}' at line {}", name, location.line)
            }
            RuntimeError::UndefinedVariable { name, location } => {
                write!(f, "Undefined variable '{}' at line {}", name, location.line)
            }
            RuntimeError::Unsupported { message, location } => {
                write!(f, "Unsupported: {} at line {}", message, location.line)
            }
            RuntimeError::DivisionByZero { location } => {
                write!(f, "Division by zero at line {}", location.line)
            }
            RuntimeError::NullDereference { location } => {
                write!(f, "Null pointer dereference at line {}", location.line)
            }
            RuntimeError::BufferOverrun {
                index,
                size,
                location,
            } => write!(
                f,
                "Buffer overrun at line {}: index {} out of bounds for size {}",
                location.line, index, size
            ),
            RuntimeError::UseAfterFree { location } => {
                write!(f, "Use of freed memory at line {}", location.line)
            }
            RuntimeError::DoubleFree { location } => {
                write!(f, "Double free at line {}", location.line)
            }
            RuntimeError::InvalidFree { location } => write!(
                f,
                "Invalid free (not the start of a heap block) at line {}",
                location.line
            ),
            RuntimeError::OutOfMemory {
                requested,
                limit,
                location,
            } => write!(
                f,
                "Out of memory at line {}: requested {} elements, limit is {}",
                location.line, requested, limit
            ),
            RuntimeError::TypeError { message, location } => {
                write!(f, "Type error at line {}: {}", location.line, message)
            }
            RuntimeError::ArgumentCountMismatch {
                function,
                expected,
                got,
                location,
            } => write!(
                f,
                "Function '{}' expects {} argument{}, got {} at line {}",
                function,
                expected,
                if *expected == 1 { "" } else { "s" },
                got,
                location.line
            ),
            RuntimeError::InvalidFormat { message, location } => {
                write!(f, "Invalid format at line {}: {}", location.line, message)
            }
            RuntimeError::InvalidString { message, location } => {
                write!(f, "Invalid string at line {}: {}", location.line, message)
            }
            RuntimeError::OutOfRange { message, location } => {
                write!(f, "{} at line {}", message, location.line)
            }
            RuntimeError::AssertionFailed { location } => {
                write!(f, "Assertion failed at line {}", location.line)
            }
        }
    }
}

impl std::error::Error for RuntimeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_overflow_message() {
        let err = RuntimeError::StackOverflow {
            limit: 10_000,
            location: SourceLocation::new(4, 5),
        };
        assert!(err
            .to_string()
            .starts_with("Stack overflow (call depth limit 10000 exceeded)"));
        assert_eq!(err.location().map(|l| l.line), Some(4));
    }

    #[test]
    fn test_compile_class() {
        let loc = SourceLocation::new(1, 1);
        assert!(RuntimeError::UndefinedFunction {
            name: "foo".into(),
            location: loc
        }
        .is_compile_class());
        assert!(!RuntimeError::DivisionByZero { location: loc }.is_compile_class());
        assert!(RuntimeError::Timeout { timeout_ms: 5 }.location().is_none());
    }
}
