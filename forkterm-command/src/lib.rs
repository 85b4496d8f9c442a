//! # forkterm-command
//!
//! Renders a fork task into the command line a terminal's shell executes.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use forkterm_command::{CommandBuilder, CommandSpec, ShellFamily};
//! use forkterm_core::TaskKind;
//!
//! fn line_for(task: &str) -> Option<String> {
//!     let spec = CommandSpec::new(TaskKind::Claude, task).with_tier(Some("opus".into()));
//!     CommandBuilder::default()
//!         .render(&spec, ShellFamily::Posix)
//!         .ok()
//!         .map(|cmd| cmd.line)
//! }
//! ```

pub mod builder;
pub mod dialect;
pub mod error;

pub use builder::{default_title, CommandBuilder, CommandSpec, RenderedCommand};
pub use dialect::{native_argument, ShellDialect, ShellFamily};
pub use error::CommandError;
