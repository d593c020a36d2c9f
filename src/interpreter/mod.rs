//! Tree-walking execution engine for the inbuilt C and C++ subsets
//!
//! This module provides the core execution logic:
//! - [`engine`]: the [`Interpreter`], scopes, places, calls and limits
//! - [`statements`] and [`loops`]: statement execution
//! - [`expressions`]: expression evaluation and pointer arithmetic
//! - [`builtins`], [`strings`], [`files`], [`format`], [`streams`]: the
//!   emulated C library and iostreams
//! - [`errors`]: runtime error types
//!
//! # Execution Model
//!
//! The interpreter walks a lowered [`Program`](crate::parser::ast::Program).
//! Every statement and loop iteration counts as one step; every few
//! thousand steps the wall-clock deadline and the host's control channel
//! are polled, so a runaway loop ends with [`RuntimeError::Timeout`] or
//! [`RuntimeError::Cancelled`] instead of hanging the host.
//!
//! Output is appended to a capped accumulator. Crossing the cap clips the
//! text on a UTF-8 boundary and stops the program.

pub mod builtins;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod expressions;
pub mod files;
pub mod format;
pub mod loops;
pub mod statements;
pub mod streams;
pub mod strings;

pub use engine::{Control, Interpreter, RunOptions};
pub use errors::RuntimeError;
