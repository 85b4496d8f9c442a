//! Executable lookup without running anything.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Resolves a program name (or an explicit path) to an executable.
pub trait ExecutableProbe: Send + Sync {
    fn find(&self, program: &str) -> Option<PathBuf>;
}

/// `PATH` lookup through the `which` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl ExecutableProbe for SystemProbe {
    fn find(&self, program: &str) -> Option<PathBuf> {
        let found = which::which(program).ok();
        tracing::trace!(program, found = found.is_some(), "probe");
        found
    }
}

/// A fixed set of executables, for hosts that do not exist.
#[derive(Debug, Clone, Default)]
pub struct KnownExecutables {
    paths: BTreeMap<String, PathBuf>,
}

impl KnownExecutables {
    /// Each name resolves to `/usr/bin/<name>`.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths = names
            .into_iter()
            .map(Into::into)
            .map(|name| {
                let path = PathBuf::from("/usr/bin").join(&name);
                (name, path)
            })
            .collect();
        Self { paths }
    }

    pub fn with(mut self, program: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.paths.insert(program.into(), path.into());
        self
    }
}

impl ExecutableProbe for KnownExecutables {
    fn find(&self, program: &str) -> Option<PathBuf> {
        self.paths.get(program).cloned()
    }
}
