//! `forkterm registry ...`: the task lifecycle store.
//!
//! Statuses are advisory. `running` means "was launched"; nothing watches
//! the terminal, so records change only through these commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::json;

use forkterm_core::{
    ClearScope, FailureKind, NewTask, TaskId, TaskKind, TaskStatus, TaskUpdate,
};

use super::Env;
use crate::output::Outcome;

const ADVISORY_NOTE: &str =
    "statuses are advisory: running means launched, not alive; update them by hand";

#[derive(Subcommand, Debug)]
pub enum RegistryCommand {
    /// Record a new running task.
    Add(AddArgs),

    /// Counts per status plus the most recent records.
    Status,

    /// List tasks in insertion order.
    List(ListArgs),

    /// Show one task.
    Get(IdArgs),

    /// Change a task's status or notes.
    Update(UpdateArgs),

    /// Delete one task.
    Remove(IdArgs),

    /// Delete every task with a status (default: completed), or all.
    Clear(ClearArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Task id. Generated when omitted.
    #[arg(long)]
    pub id: Option<String>,

    #[arg(long)]
    pub task: String,

    /// claude | gemini | raw
    #[arg(long = "type", value_name = "TYPE")]
    pub kind: TaskKind,

    /// Defaults to the current directory.
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Model tier.
    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub output_file: Option<PathBuf>,

    #[arg(long)]
    pub context_file: Option<PathBuf>,

    #[arg(long)]
    pub preset: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// running | completed | failed
    #[arg(long)]
    pub filter: Option<TaskStatus>,

    /// Show at most this many of the most recent matches.
    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct IdArgs {
    #[arg(long)]
    pub id: String,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[arg(long)]
    pub id: String,

    /// running | completed | failed
    #[arg(long)]
    pub status: Option<TaskStatus>,

    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug)]
pub struct ClearArgs {
    /// completed | failed | running | all
    #[arg(long, default_value_t = ClearScope::default())]
    pub status: ClearScope,
}

pub fn run(cmd: RegistryCommand, env: &Env) -> Result<Outcome> {
    match cmd {
        RegistryCommand::Add(args) => add(args, env),
        RegistryCommand::Status => status(env),
        RegistryCommand::List(args) => list(args, env),
        RegistryCommand::Get(args) => get(args, env),
        RegistryCommand::Update(args) => update(args, env),
        RegistryCommand::Remove(args) => remove(args, env),
        RegistryCommand::Clear(args) => clear(args, env),
    }
}

fn add(args: AddArgs, env: &Env) -> Result<Outcome> {
    let cwd = match args.cwd {
        Some(cwd) => cwd,
        None => std::env::current_dir().context("could not read the current directory")?,
    };
    let mut task = NewTask::new(args.kind, args.task, cwd)
        .with_tier(args.model)
        .with_output_file(args.output_file)
        .with_context_file(args.context_file)
        .with_preset(args.preset);
    if let Some(id) = args.id.filter(|id| !id.trim().is_empty()) {
        task = task.with_id(TaskId::from(id.trim()));
    }

    let record = env.registry().add(task).context("failed to add task")?;
    Outcome::success(json!({
        "message": format!("task {} added", record.id),
        "task": record,
    }))
}

fn status(env: &Env) -> Result<Outcome> {
    let report = env.registry().status_report().context("failed to read registry")?;
    Outcome::success(json!({
        "summary": report.summary,
        "running_tasks": report.running_tasks,
        "recent_completed": report.recent_completed,
        "recent_failed": report.recent_failed,
        "note": ADVISORY_NOTE,
    }))
}

fn list(args: ListArgs, env: &Env) -> Result<Outcome> {
    let mut tasks = env
        .registry()
        .list(args.filter)
        .context("failed to read registry")?;
    let total = tasks.len();
    // Most recent `limit`, still in insertion order.
    tasks.drain(..total.saturating_sub(args.limit));
    Outcome::success(json!({
        "filter": args.filter,
        "count": tasks.len(),
        "total": total,
        "tasks": tasks,
    }))
}

fn get(args: IdArgs, env: &Env) -> Result<Outcome> {
    let record = env
        .registry()
        .get(&TaskId::from(args.id))
        .context("failed to get task")?;
    Outcome::success(json!({ "task": record }))
}

fn update(args: UpdateArgs, env: &Env) -> Result<Outcome> {
    if args.status.is_none() && args.notes.is_none() {
        return Ok(Outcome::failure(
            FailureKind::InvalidArguments,
            "nothing to update; pass --status and/or --notes",
        ));
    }
    let record = env
        .registry()
        .update(
            &TaskId::from(args.id),
            TaskUpdate {
                status: args.status,
                notes: args.notes,
            },
        )
        .context("failed to update task")?;
    Outcome::success(json!({
        "message": format!("task {} is {}", record.id, record.status),
        "task": record,
    }))
}

fn remove(args: IdArgs, env: &Env) -> Result<Outcome> {
    let id = TaskId::from(args.id);
    env.registry().remove(&id).context("failed to remove task")?;
    Outcome::success(json!({
        "message": format!("task {id} removed"),
        "removed": id,
    }))
}

fn clear(args: ClearArgs, env: &Env) -> Result<Outcome> {
    let removed = env
        .registry()
        .clear(args.status)
        .context("failed to clear tasks")?;
    Outcome::success(json!({
        "message": format!("cleared {removed} {} task(s)", args.status),
        "scope": args.status.to_string(),
        "cleared": removed,
    }))
}
