//! # Introduction
//!
//! crustrun compiles and runs single-file C and C++ programs. When a system
//! toolchain is installed it drives that toolchain, retrying around common
//! build failures; when none is available, or when asked to, it runs the
//! program in a self-contained interpreter for a realistic subset of the
//! language under strict time and output limits.
//!
//! ## Request pipeline
//!
//! ```text
//! RunRequest → Engine → profile → locator → compile → run ─┐
//!                  │                                        ├→ CompileRunResult
//!                  └──→ inbuilt: parser → interpreter ──────┘
//! ```
//!
//! 1. [`orchestrator`]: [`Engine::run`] validates the request and routes it
//!    through the C or C++ pipeline.
//! 2. [`toolchain`]: profile resolution, executable lookup, bounded child
//!    processes and compiler diagnostic parsing.
//! 3. [`parser`]: the inbuilt front end (comment stripping, preprocessing,
//!    lexing, the syntax gate, parsing and lowering).
//! 4. [`interpreter`] and [`memory`]: the tree-walking runtime and its
//!    buffer-based memory model.
//! 5. [`inbuilt`]: runs the front end and interpreter as one job, optionally
//!    inside an isolation unit, and maps the outcome to a result.
//! 6. [`ui`]: terminal result viewer used by the CLI; not part of the stable
//!    library API.
//!
//! ## Inbuilt subset
//!
//! Types: `int`, `char`, `short`, `long`, `float`, `double`, `bool`, pointers,
//! fixed-size and multi-dimensional arrays, `std::string` in C++.
//! Control flow: `if/else`, `while`, `for`, `do-while`, `switch/case`,
//! `break`, `continue`, `return`.
//! Library: `stdio.h` with file emulation, `stdlib.h`, `string.h`, `ctype.h`,
//! `math.h`, `time.h`, and `cin`/`cout`/`cerr` with common manipulators.

pub mod config;
pub mod inbuilt;
pub mod interpreter;
pub mod memory;
pub mod model;
pub mod orchestrator;
pub mod parser;
pub mod toolchain;
pub mod ui;

pub use config::EngineConfig;
pub use model::{CompileRunResult, RunRequest};
pub use orchestrator::Engine;
