//! [`TerminalLauncher`]: detect → render → wrap → spawn, reported as one
//! [`LaunchResult`].

use std::path::PathBuf;

use serde::Serialize;

use forkterm_command::{default_title, CommandBuilder, CommandSpec};
use forkterm_core::{FailureKind, ForkConfig};
use forkterm_detector::{PlatformDetector, Session};

use crate::error::LaunchError;
use crate::logfile::ensure_parent;
use crate::spawn::{ProcessSpawner, Spawner};
use crate::wrap;

// ---------------------------------------------------------------------------
// Request / result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub spec: CommandSpec,
    pub cwd: PathBuf,
    /// Window title; derived from the payload when `None`.
    pub title: Option<String>,
    pub keep_open: bool,
    pub new_window: bool,
    /// Tee the session's output here.
    pub log_path: Option<PathBuf>,
    /// Do everything except start the process.
    pub dry_run: bool,
}

impl LaunchRequest {
    pub fn new(spec: CommandSpec, cwd: impl Into<PathBuf>) -> Self {
        Self {
            spec,
            cwd: cwd.into(),
            title: None,
            keep_open: true,
            new_window: false,
            log_path: None,
            dry_run: false,
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn with_log_path(mut self, path: Option<PathBuf>) -> Self {
        self.log_path = path;
        self
    }

    pub fn keep_open(mut self, keep_open: bool) -> Self {
        self.keep_open = keep_open;
        self
    }

    pub fn new_window(mut self, new_window: bool) -> Self {
        self.new_window = new_window;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Outcome of one launch attempt. Built incrementally, so a failure still
/// reports how far the launch got (strategy, command, log path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchResult {
    pub success: bool,
    pub platform: String,
    pub strategy: Option<String>,
    /// The exact line the terminal's shell runs, after tee wrapping.
    pub command_executed: Option<String>,
    pub output_log_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LaunchResult {
    fn started(platform: String) -> Self {
        Self {
            success: false,
            platform,
            strategy: None,
            command_executed: None,
            output_log_path: None,
            pid: None,
            message: String::new(),
            error: None,
            details: None,
        }
    }

    fn fail(mut self, err: LaunchError) -> Self {
        let kind = err.kind();
        self.success = false;
        self.message = format!("launch failed: {kind}");
        self.error = Some(kind);
        self.details = Some(err.to_string());
        self
    }
}

// ---------------------------------------------------------------------------
// TerminalLauncher
// ---------------------------------------------------------------------------

pub struct TerminalLauncher {
    detector: PlatformDetector,
    builder: CommandBuilder,
    spawner: Box<dyn Spawner>,
}

impl std::fmt::Debug for TerminalLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalLauncher")
            .field("detector", &self.detector)
            .field("builder", &self.builder)
            .finish_non_exhaustive()
    }
}

impl TerminalLauncher {
    pub fn new(
        detector: PlatformDetector,
        builder: CommandBuilder,
        spawner: impl Spawner + 'static,
    ) -> Self {
        Self {
            detector,
            builder,
            spawner: Box::new(spawner),
        }
    }

    /// The running host, configured from `config`.
    pub fn system(config: &ForkConfig) -> Self {
        Self::new(
            PlatformDetector::system().with_preferred(config.preferred_terminal.clone()),
            CommandBuilder::from_config(config),
            ProcessSpawner,
        )
    }

    pub fn builder(&self) -> &CommandBuilder {
        &self.builder
    }

    /// Open a terminal running `request`. Returns once the process has been
    /// started (or the attempt failed); never waits for the session.
    pub fn launch(&self, request: &LaunchRequest) -> LaunchResult {
        let mut result = LaunchResult::started(self.detector.os().to_string());
        match self.try_launch(request, &mut result) {
            Ok(()) => result,
            Err(err) => {
                tracing::warn!(error = %err, kind = %err.kind(), "launch failed");
                result.fail(err)
            }
        }
    }

    fn try_launch(
        &self,
        request: &LaunchRequest,
        result: &mut LaunchResult,
    ) -> Result<(), LaunchError> {
        // 1. Strategy
        let strategy = self.detector.select()?;
        result.strategy = Some(strategy.name().to_string());

        // 2. Command line in the strategy's shell
        let rendered = self.builder.render(&request.spec, strategy.family())?;
        let line = match &request.log_path {
            Some(log) => {
                result.output_log_path = Some(log.clone());
                wrap::tee(&rendered.line, strategy.family(), log)?
            }
            None => rendered.line,
        };
        result.command_executed = Some(line.clone());

        // 3. Terminal invocation
        let title = request
            .title
            .clone()
            .unwrap_or_else(|| default_title(request.spec.kind, &request.spec.payload));
        let session = Session {
            line,
            cwd: request.cwd.clone(),
            title,
            keep_open: request.keep_open,
            new_window: request.new_window,
        };
        let invocation = strategy.invocation(&session)?;
        tracing::debug!(
            program = %invocation.program.display(),
            args = ?invocation.args,
            "terminal invocation"
        );

        // 4. Spawn
        if request.dry_run {
            result.success = true;
            result.message = format!("dry run: would open {}", strategy.name());
            return Ok(());
        }
        if let Some(log) = &request.log_path {
            ensure_parent(log)?;
        }
        let pid = self
            .spawner
            .spawn(&invocation)
            .map_err(|source| LaunchError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;
        tracing::info!(strategy = strategy.name(), pid, "terminal launched");
        result.success = true;
        result.pid = Some(pid);
        result.message = format!("launched in {}", strategy.name());
        Ok(())
    }
}
