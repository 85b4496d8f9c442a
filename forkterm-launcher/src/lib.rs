//! Terminal launching: picks a strategy, renders the command for its shell,
//! optionally tees output to a per-fork log, and spawns the terminal without
//! waiting for it.

mod error;
pub mod launcher;
pub mod logfile;
pub mod spawn;
pub mod wrap;

pub use error::LaunchError;
pub use launcher::{LaunchRequest, LaunchResult, TerminalLauncher};
pub use logfile::{log_file_name, log_path_in, summarize};
pub use spawn::{ProcessSpawner, RecordingSpawner, Spawner};
