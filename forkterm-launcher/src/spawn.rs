//! Starting processes without waiting for them.

use std::io;
use std::process::{Command, Stdio};
use std::sync::Mutex;

use forkterm_detector::Invocation;

/// Starts an [`Invocation`] and returns as soon as the OS accepts it.
pub trait Spawner: Send + Sync {
    /// Returns the child's pid.
    fn spawn(&self, invocation: &Invocation) -> io::Result<u32>;
}

/// Real process creation through `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessSpawner;

/// `CREATE_NEW_CONSOLE` from the Win32 process creation flags.
#[cfg(windows)]
const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;

impl Spawner for ProcessSpawner {
    fn spawn(&self, invocation: &Invocation) -> io::Result<u32> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }
        #[cfg(windows)]
        if invocation.new_console {
            use std::os::windows::process::CommandExt;
            cmd.creation_flags(CREATE_NEW_CONSOLE);
        }

        // The child is never waited on; dropping the handle detaches it.
        let child = cmd.spawn()?;
        Ok(child.id())
    }
}

/// Records invocations instead of running them.
#[derive(Debug, Default)]
pub struct RecordingSpawner {
    calls: Mutex<Vec<Invocation>>,
    fail_with: Option<io::ErrorKind>,
}

impl RecordingSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every spawn fails with `kind` (after being recorded).
    pub fn failing(kind: io::ErrorKind) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_with: Some(kind),
        }
    }

    pub fn calls(&self) -> Vec<Invocation> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Spawner for RecordingSpawner {
    fn spawn(&self, invocation: &Invocation) -> io::Result<u32> {
        match self.calls.lock() {
            Ok(mut calls) => calls.push(invocation.clone()),
            Err(poisoned) => poisoned.into_inner().push(invocation.clone()),
        }
        match self.fail_with {
            Some(kind) => Err(io::Error::new(kind, "spawn refused")),
            None => Ok(4242),
        }
    }
}

impl<S: Spawner + ?Sized> Spawner for std::sync::Arc<S> {
    fn spawn(&self, invocation: &Invocation) -> io::Result<u32> {
        (**self).spawn(invocation)
    }
}
