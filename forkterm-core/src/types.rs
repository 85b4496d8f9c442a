//! Domain types for the fork registry.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! All types round-trip through serde + serde_json, which is the on-disk format
//! of `forked-tasks.json`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::FailureKind;

/// Number of hex characters kept from a v4 UUID when generating a task id.
pub const TASK_ID_LEN: usize = 8;

/// Longest task id a caller may choose.
pub const TASK_ID_MAX_LEN: usize = 64;

/// Current on-disk registry document version.
pub const REGISTRY_VERSION: &str = "1.0";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed identifier for a forked task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Fresh short id: the first [`TASK_ID_LEN`] hex digits of a v4 UUID.
    pub fn generate() -> Self {
        let mut hex = Uuid::new_v4().simple().to_string();
        hex.truncate(TASK_ID_LEN);
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Ids become file names (`logs/<id>.log`), so only ASCII letters,
    /// digits, `-` and `_` are allowed.
    pub fn is_valid(&self) -> bool {
        (1..=TASK_ID_MAX_LEN).contains(&self.0.len())
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    }
}

/// A caller-supplied task id that fails [`TaskId::is_valid`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid task id '{0}': use 1-64 ASCII letters, digits, '-' or '_'")]
pub struct InvalidTaskId(pub String);

impl FromStr for TaskId {
    type Err = InvalidTaskId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = TaskId::from(s.trim());
        if id.is_valid() {
            Ok(id)
        } else {
            Err(InvalidTaskId(s.to_owned()))
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// What a forked session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Claude Code, interactive.
    Claude,
    /// Gemini CLI, interactive.
    Gemini,
    /// An arbitrary shell command line, run as written.
    Raw,
}

impl TaskKind {
    pub const ALL: [TaskKind; 3] = [TaskKind::Claude, TaskKind::Gemini, TaskKind::Raw];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Claude => "claude",
            TaskKind::Gemini => "gemini",
            TaskKind::Raw => "raw",
        }
    }

    /// Agent kinds receive their payload as one opaque argument.
    pub fn is_agent(self) -> bool {
        !matches!(self, TaskKind::Raw)
    }

    /// Executable invoked for agent kinds; `None` for raw commands.
    pub fn program(self) -> Option<&'static str> {
        match self {
            TaskKind::Claude => Some("claude"),
            TaskKind::Gemini => Some("gemini"),
            TaskKind::Raw => None,
        }
    }

    /// Prefix used for default window titles.
    pub fn title_prefix(self) -> &'static str {
        match self {
            TaskKind::Claude => "Claude",
            TaskKind::Gemini => "Gemini",
            TaskKind::Raw => "CLI",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task kind string that names none of [`TaskKind::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown task kind '{0}'; expected: claude, gemini, raw")]
pub struct UnknownTaskKind(pub String);

impl UnknownTaskKind {
    pub fn kind(&self) -> FailureKind {
        FailureKind::CommandConstructionError
    }
}

impl FromStr for TaskKind {
    type Err = UnknownTaskKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" => Ok(TaskKind::Claude),
            "gemini" => Ok(TaskKind::Gemini),
            "raw" => Ok(TaskKind::Raw),
            _ => Err(UnknownTaskKind(s.to_owned())),
        }
    }
}

/// Lifecycle status of a forked task.
///
/// `Running` means "was launched", not "is alive": nothing observes the
/// spawned session, so every status is advisory and changes only through
/// explicit registry updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::Running,
        TaskStatus::Completed,
        TaskStatus::Failed,
    ];

    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "running" => Ok(TaskStatus::Running),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(format!(
                "unknown status '{other}'; expected: running, completed, failed"
            )),
        }
    }
}

/// Which records `clear` removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearScope {
    Status(TaskStatus),
    All,
}

impl Default for ClearScope {
    fn default() -> Self {
        ClearScope::Status(TaskStatus::Completed)
    }
}

impl fmt::Display for ClearScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClearScope::Status(status) => status.fmt(f),
            ClearScope::All => f.write_str("all"),
        }
    }
}

impl FromStr for ClearScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(ClearScope::All);
        }
        s.parse::<TaskStatus>()
            .map(ClearScope::Status)
            .map_err(|_| format!("unknown clear scope '{s}'; expected: completed, failed, running, all"))
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One forked task as persisted in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub kind: TaskKind,
    pub payload: String,
    pub tier: Option<String>,
    pub working_directory: PathBuf,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    /// Set exactly once, on the transition out of `Running`.
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
}

/// Input to [`crate::TaskRegistry::add`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Caller-chosen id; generated when `None`.
    pub id: Option<TaskId>,
    pub kind: TaskKind,
    pub payload: String,
    pub tier: Option<String>,
    pub working_directory: PathBuf,
    pub output_file: Option<PathBuf>,
    pub context_file: Option<PathBuf>,
    pub preset: Option<String>,
}

impl NewTask {
    pub fn new(kind: TaskKind, payload: impl Into<String>, working_directory: PathBuf) -> Self {
        Self {
            id: None,
            kind,
            payload: payload.into(),
            tier: None,
            working_directory,
            output_file: None,
            context_file: None,
            preset: None,
        }
    }

    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_tier(mut self, tier: Option<String>) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_output_file(mut self, path: Option<PathBuf>) -> Self {
        self.output_file = path;
        self
    }

    pub fn with_context_file(mut self, path: Option<PathBuf>) -> Self {
        self.context_file = path;
        self
    }

    pub fn with_preset(mut self, preset: Option<String>) -> Self {
        self.preset = preset;
        self
    }
}

/// Input to [`crate::TaskRegistry::update`]. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub status: Option<TaskStatus>,
    pub notes: Option<String>,
}

/// Document-level metadata of the registry file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryMetadata {
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    REGISTRY_VERSION.to_string()
}

/// Root of `forked-tasks.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    /// Insertion order is preserved and meaningful.
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
    pub metadata: RegistryMetadata,
}

impl Registry {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            tasks: vec![],
            metadata: RegistryMetadata {
                created: now,
                updated: now,
                version: default_version(),
            },
        }
    }

    pub fn find(&self, id: &TaskId) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.find(id).is_some()
    }
}

/// Counts per status bucket. `running + completed + failed == total` always.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub total: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

impl StatusSummary {
    pub fn from_tasks(tasks: &[TaskRecord]) -> Self {
        tasks.iter().fold(
            StatusSummary {
                total: tasks.len(),
                ..Default::default()
            },
            |mut acc, task| {
                match task.status {
                    TaskStatus::Running => acc.running += 1,
                    TaskStatus::Completed => acc.completed += 1,
                    TaskStatus::Failed => acc.failed += 1,
                }
                acc
            },
        )
    }
}

/// Summary plus the most relevant records, for `registry status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub summary: StatusSummary,
    /// Newest first, at most [`StatusReport::RUNNING_LIMIT`].
    pub running_tasks: Vec<TaskRecord>,
    /// Most recently completed first, at most [`StatusReport::RECENT_LIMIT`].
    pub recent_completed: Vec<TaskRecord>,
    pub recent_failed: Vec<TaskRecord>,
}

impl StatusReport {
    pub const RUNNING_LIMIT: usize = 10;
    pub const RECENT_LIMIT: usize = 5;

    pub fn from_tasks(tasks: &[TaskRecord]) -> Self {
        let mut running: Vec<TaskRecord> = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Running)
            .cloned()
            .collect();
        running.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        running.truncate(Self::RUNNING_LIMIT);

        Self {
            summary: StatusSummary::from_tasks(tasks),
            running_tasks: running,
            recent_completed: recent_terminal(tasks, TaskStatus::Completed),
            recent_failed: recent_terminal(tasks, TaskStatus::Failed),
        }
    }
}

fn recent_terminal(tasks: &[TaskRecord], status: TaskStatus) -> Vec<TaskRecord> {
    let mut matching: Vec<TaskRecord> = tasks
        .iter()
        .filter(|t| t.status == status)
        .cloned()
        .collect();
    matching.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    matching.truncate(StatusReport::RECENT_LIMIT);
    matching
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
