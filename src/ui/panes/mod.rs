//! TUI pane rendering modules
//!
//! # Pane Modules
//!
//! - [`source`]: source code with syntax highlighting and diagnostic markers
//! - [`diagnostics`]: the parsed compiler diagnostics
//! - [`console`]: program output, compiler output and the error message
//! - [`status`]: outcome summary and keybindings
//!
//! Each pane module exports a `render_*` function taking the frame, its
//! area, the data to show and, for scrollable panes, a scroll offset it
//! clamps in place.

pub mod console;
pub mod diagnostics;
pub mod source;
pub mod status;

pub use console::render_console_pane;
pub use diagnostics::render_diagnostics_pane;
pub use source::render_source_pane;
pub use status::render_status_bar;
