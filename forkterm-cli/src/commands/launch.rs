//! `forkterm launch`: open a new terminal running an agent or a command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;

use forkterm_command::CommandSpec;
use forkterm_core::{FailureKind, NewTask, TaskId, TaskKind};
use forkterm_launcher::{log_path_in, LaunchRequest, LaunchResult, TerminalLauncher};

use super::Env;
use crate::output::Outcome;

#[derive(Args, Debug)]
pub struct LaunchArgs {
    /// What to run: claude | gemini | raw.
    #[arg(long = "type", value_name = "TYPE")]
    pub kind: String,

    /// Prompt for an agent, or the command line for `raw`.
    #[arg(long)]
    pub task: String,

    /// Model tier (haiku | sonnet | opus for claude; passed through for gemini).
    #[arg(long)]
    pub model: Option<String>,

    /// Working directory of the new session. Defaults to the current directory.
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Context summary prepended to the agent prompt.
    #[arg(long = "with-context", value_name = "PATH")]
    pub with_context: Option<PathBuf>,

    /// Do not tee the session's output to a log file.
    #[arg(long)]
    pub no_output: bool,

    /// New window instead of a tab (Windows Terminal).
    #[arg(long)]
    pub new_window: bool,

    /// Let the agent skip permission prompts.
    #[arg(long)]
    pub skip_permissions: bool,

    /// Use this task id instead of generating one.
    #[arg(long)]
    pub task_id: Option<String>,

    /// Window title. Defaults to the kind and the start of the task.
    #[arg(long)]
    pub title: Option<String>,

    /// Close the window when the command exits.
    #[arg(long)]
    pub close_on_exit: bool,

    /// Record the fork in the task registry.
    #[arg(long)]
    pub register: bool,

    /// Resolve everything and report the command without opening a terminal.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
struct LaunchOutput {
    timestamp: DateTime<Utc>,
    task_id: TaskId,
    fork_type: TaskKind,
    task: String,
    tier: Option<String>,
    model: Option<String>,
    cwd: PathBuf,
    new_window: bool,
    registered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    registry_error: Option<String>,
    #[serde(flatten)]
    result: LaunchResult,
}

impl LaunchArgs {
    pub fn run(self, env: &Env) -> Result<Outcome> {
        let kind: TaskKind = match self.kind.parse() {
            Ok(kind) => kind,
            Err(err) => {
                return Ok(Outcome::failure(
                    FailureKind::CommandConstructionError,
                    err.to_string(),
                ))
            }
        };

        let cwd = resolve_cwd(self.cwd.as_deref())?;
        if !cwd.is_dir() {
            return Ok(Outcome::failure(
                FailureKind::InvalidArguments,
                format!("working directory {} does not exist", cwd.display()),
            ));
        }

        let task_id = match self.task_id.as_deref().map(str::parse::<TaskId>) {
            Some(Ok(id)) => id,
            Some(Err(err)) => {
                return Ok(Outcome::failure(FailureKind::InvalidArguments, err.to_string()))
            }
            None => TaskId::generate(),
        };

        let log_path = (!self.no_output)
            .then(|| log_path_in(&env.config.logs_dir(&env.root), &self.task, &task_id));

        let spec = CommandSpec::new(kind, self.task.clone())
            .with_tier(self.model.clone())
            .with_context_file(self.with_context.clone())
            .with_skip_permissions(self.skip_permissions);
        let request = LaunchRequest::new(spec, cwd.clone())
            .with_title(self.title.clone())
            .with_log_path(log_path.clone())
            .keep_open(env.config.keep_open && !self.close_on_exit)
            .new_window(self.new_window)
            .dry_run(self.dry_run);

        let launcher = TerminalLauncher::system(&env.config);
        let result = launcher.launch(&request);

        let tier = match kind {
            TaskKind::Claude => self.model.clone().or_else(|| Some(env.config.default_tier.clone())),
            _ => self.model.clone(),
        };
        let model = launcher.builder().model_arg(kind, self.model.as_deref());

        let (registered, registry_error) = if self.register && result.success && !self.dry_run {
            let task = NewTask::new(kind, self.task.clone(), cwd.clone())
                .with_id(task_id.clone())
                .with_tier(tier.clone())
                .with_output_file(log_path)
                .with_context_file(self.with_context.clone());
            match env.registry().add(task) {
                Ok(_) => (true, None),
                Err(err) => {
                    // The terminal is already open; report, do not fail.
                    tracing::warn!(error = %err, "launched but could not register task");
                    (false, Some(err.to_string()))
                }
            }
        } else {
            (false, None)
        };

        let output = LaunchOutput {
            timestamp: Utc::now(),
            task_id,
            fork_type: kind,
            task: self.task,
            tier,
            model,
            cwd,
            new_window: self.new_window,
            registered,
            registry_error,
            result,
        };

        match (output.result.success, output.result.error) {
            (true, _) => Outcome::success(&output),
            (false, error) => {
                let details = output.result.details.clone().unwrap_or_default();
                Outcome::failure_with(error.unwrap_or(FailureKind::LaunchFailure), details, &output)
            }
        }
    }
}

fn resolve_cwd(cwd: Option<&Path>) -> Result<PathBuf> {
    let current = std::env::current_dir().context("could not read the current directory")?;
    Ok(match cwd {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => current.join(path),
        None => current,
    })
}
