//! Front end of the inbuilt engines
//!
//! Source text goes through five line-preserving stages before it reaches the
//! interpreter:
//!
//! 1. [`comments::strip_comments`]
//! 2. [`preprocessor::Preprocessor::process`]
//! 3. [`lexer::Lexer::tokenize`] followed by [`gate::check`]
//! 4. [`parse::Parser::parse_program`] and [`lower::lower_program`]
//!
//! Any failure is a [`CompileError`] carrying the line and column of the
//! offending construct in the original source.

pub mod ast;
pub mod comments;
pub mod declarations;
pub mod expressions;
pub mod gate;
pub mod lexer;
pub mod lower;
pub mod parse;
pub mod preprocessor;
pub mod statements;

use ast::{Program, SourceLocation};
use lexer::{LexError, Lexer};
use std::fmt;

/// Source language accepted by an inbuilt engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    C,
    Cpp,
}

impl Dialect {
    pub fn language_name(self) -> &'static str {
        match self {
            Dialect::C => "C",
            Dialect::Cpp => "C++",
        }
    }
}

/// Error raised by any front-end stage.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub message: String,
    pub location: SourceLocation,
}

impl CompileError {
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        CompileError {
            message: message.into(),
            location,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Compile error at line {}, column {}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

impl std::error::Error for CompileError {}

impl From<LexError> for CompileError {
    fn from(err: LexError) -> Self {
        CompileError {
            message: err.message,
            location: err.location,
        }
    }
}

/// Run every front-end stage over `source`.
pub fn compile_program(source: &str, dialect: Dialect) -> Result<Program, CompileError> {
    let text = comments::strip_comments(source)?;
    let text = preprocessor::Preprocessor::new(dialect).process(&text)?;
    let tokens = Lexer::new(&text, dialect).tokenize()?;
    gate::check(&tokens, dialect)?;
    let tokens = match dialect {
        Dialect::C => tokens,
        Dialect::Cpp => gate::strip_std(tokens),
    };
    let program = parse::Parser::new(tokens, dialect).parse_program()?;
    lower::lower_program(program, dialect)
}
