//! The launch-strategy seam.
//!
//! A strategy knows one way of opening a terminal: which executables it
//! needs, which shell runs inside it, and how to pass a working directory,
//! title, keep-open behaviour and the command line to it. It produces an
//! [`Invocation`]; spawning that is the launcher's job.

use std::fmt;
use std::path::{Path, PathBuf};

use forkterm_command::{CommandError, ShellFamily};

use crate::probe::ExecutableProbe;

/// Titles longer than this are cut before reaching a terminal.
pub const MAX_TITLE_CHARS: usize = 50;

/// What the new terminal should run, independent of the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Shell source in the strategy's [`ShellFamily`].
    pub line: String,
    pub cwd: PathBuf,
    pub title: String,
    pub keep_open: bool,
    pub new_window: bool,
}

/// A concrete process to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Working directory for the spawned process itself.
    pub cwd: Option<PathBuf>,
    /// Detach into a fresh console window (Windows only).
    pub new_console: bool,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            new_console: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    pub fn in_new_console(mut self) -> Self {
        self.new_console = true;
        self
    }
}

pub trait LaunchStrategy: fmt::Debug + Send + Sync {
    /// Stable name reported in results and accepted as `preferred_terminal`.
    fn name(&self) -> &'static str;

    /// Shell that executes [`Session::line`].
    fn family(&self) -> ShellFamily;

    fn invocation(&self, session: &Session) -> Result<Invocation, CommandError>;
}

type DetectFn = fn(&dyn ExecutableProbe) -> Option<Box<dyn LaunchStrategy>>;

/// An entry in a platform's ordered candidate list.
#[derive(Clone, Copy)]
pub struct Candidate {
    pub name: &'static str,
    detect: DetectFn,
}

impl Candidate {
    pub const fn new(name: &'static str, detect: DetectFn) -> Self {
        Self { name, detect }
    }

    /// The strategy, if everything it needs is installed.
    pub fn detect(&self, probe: &dyn ExecutableProbe) -> Option<Box<dyn LaunchStrategy>> {
        (self.detect)(probe)
    }
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Candidate").field(&self.name).finish()
    }
}

/// `title` cut to [`MAX_TITLE_CHARS`] characters.
pub fn clip_title(title: &str) -> String {
    title.chars().take(MAX_TITLE_CHARS).collect()
}

/// Text form of a path for use as a command-line argument.
pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
