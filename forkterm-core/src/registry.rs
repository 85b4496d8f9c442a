//! Durable task registry, `<root>/data/forked-tasks.json`.
//!
//! # Document
//!
//! ```text
//! { "tasks": [TaskRecord, ...], "metadata": { "created", "updated", "version" } }
//! ```
//!
//! # Persistence contract
//!
//! No registry lives in memory between calls. Every mutating operation:
//! 1. acquires `forked-tasks.json.lock` (see [`crate::lock`]),
//! 2. loads the whole document (missing file = empty registry),
//! 3. applies the change,
//! 4. serializes → `forked-tasks.json.tmp` → `chmod 0600` → `rename`.
//!
//! Operations that change nothing (unknown id, empty clear) never rewrite the
//! file, so a failed `update`/`remove` leaves it byte-for-byte unchanged.
//! Reads take no lock; the rename guarantees they observe a whole document.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;

use crate::config::DEFAULT_LOCK_TIMEOUT_MS;
use crate::error::{io_err, RegistryError};
use crate::lock::RegistryLock;
use crate::paths;
use crate::types::{
    ClearScope, InvalidTaskId, NewTask, Registry, StatusReport, StatusSummary, TaskId, TaskRecord,
    TaskStatus, TaskUpdate,
};

/// Result of a mutation closure: whether the document must be rewritten.
enum Mutation<T> {
    Changed(T),
    Unchanged(T),
}

/// Handle on a registry file. Cheap to construct; holds no registry state.
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    path: PathBuf,
    lock_timeout: Duration,
}

impl TaskRegistry {
    /// Registry stored under `root` (`<root>/data/forked-tasks.json`).
    pub fn at(root: &Path) -> Self {
        Self::with_path(paths::registry_path(root))
    }

    /// Registry stored at an explicit file path.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            lock_timeout: Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
        }
    }

    /// `at` convenience wrapper using [`paths::default_root`].
    pub fn open() -> Result<Self, RegistryError> {
        let root = paths::default_root().ok_or(RegistryError::HomeNotFound)?;
        Ok(Self::at(&root))
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // -----------------------------------------------------------------------
    // 1. Load / save
    // -----------------------------------------------------------------------

    /// Load the whole document. A missing file is an empty registry.
    ///
    /// Returns `RegistryError::Corrupt` (with path + serde_json context) if the
    /// file exists but is not a registry document.
    pub fn load(&self) -> Result<Registry, RegistryError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Ok(Registry::empty(Utc::now()));
            }
            Err(err) => return Err(io_err(&self.path, err)),
        };
        serde_json::from_str(&contents).map_err(|source| RegistryError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Atomically replace the document on disk.
    ///
    /// `.tmp` is always in the same directory as the target, so the rename
    /// never crosses filesystems.
    fn save(&self, registry: &mut Registry) -> Result<(), RegistryError> {
        registry.metadata.updated = Utc::now();

        let tmp_path = paths::tmp_path_for(&self.path);
        let mut json = serde_json::to_string_pretty(registry)?;
        json.push('\n');
        std::fs::write(&tmp_path, json).map_err(|e| io_err(&tmp_path, e))?;
        set_file_permissions(&tmp_path)?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| io_err(&self.path, e))?;
        Ok(())
    }

    /// Create the directory holding the store, owner-only, before anything
    /// (the lock included) is written into it.
    fn ensure_data_dir(&self) -> Result<(), RegistryError> {
        let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) else {
            return Ok(());
        };
        if !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
            set_dir_permissions(dir)?;
        }
        Ok(())
    }

    /// Run one locked load-mutate-save cycle.
    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut Registry) -> Result<Mutation<T>, RegistryError>,
    ) -> Result<T, RegistryError> {
        self.ensure_data_dir()?;
        let _lock = RegistryLock::acquire(&paths::lock_path_for(&self.path), self.lock_timeout)?;
        let mut registry = self.load()?;
        match apply(&mut registry)? {
            Mutation::Changed(value) => {
                self.save(&mut registry)?;
                Ok(value)
            }
            Mutation::Unchanged(value) => Ok(value),
        }
    }

    // -----------------------------------------------------------------------
    // 2. Mutations
    // -----------------------------------------------------------------------

    /// Append a new `Running` record and return it.
    ///
    /// A caller-supplied id that already exists is `RegistryError::DuplicateId`;
    /// generated ids are re-rolled until unique within the registry.
    pub fn add(&self, task: NewTask) -> Result<TaskRecord, RegistryError> {
        if let Some(id) = task.id.as_ref().filter(|id| !id.is_valid()) {
            return Err(InvalidTaskId(id.to_string()).into());
        }
        let record = self.mutate(|registry| {
            let id = match task.id {
                Some(id) if registry.contains(&id) => {
                    return Err(RegistryError::DuplicateId { id });
                }
                Some(id) => id,
                None => fresh_id(registry),
            };

            let record = TaskRecord {
                id,
                kind: task.kind,
                payload: task.payload,
                tier: task.tier,
                working_directory: task.working_directory,
                status: TaskStatus::Running,
                created_at: Utc::now(),
                completed_at: None,
                notes: None,
                output_file: task.output_file,
                context_file: task.context_file,
                preset: task.preset,
            };
            registry.tasks.push(record.clone());
            Ok(Mutation::Changed(record))
        })?;

        tracing::info!(id = %record.id, kind = %record.kind, "task registered");
        Ok(record)
    }

    /// Change status and/or notes of an existing record.
    ///
    /// A move from `Running` to a terminal status stamps `completed_at`.
    /// Terminal records accept note amendments and a repeat of their own
    /// status, but no status change (`RegistryError::InvalidTransition`).
    pub fn update(&self, id: &TaskId, update: TaskUpdate) -> Result<TaskRecord, RegistryError> {
        self.mutate(|registry| {
            let record = registry
                .tasks
                .iter_mut()
                .find(|t| &t.id == id)
                .ok_or_else(|| RegistryError::TaskNotFound { id: id.clone() })?;

            let mut changed = false;
            if let Some(next) = update.status {
                if next != record.status {
                    if record.status.is_terminal() {
                        return Err(RegistryError::InvalidTransition {
                            id: id.clone(),
                            from: record.status,
                            to: next,
                        });
                    }
                    record.status = next;
                    // Clock skew between processes must not break created_at <= completed_at.
                    record.completed_at = Some(Utc::now().max(record.created_at));
                    changed = true;
                }
            }
            if let Some(notes) = update.notes {
                if record.notes.as_deref() != Some(notes.as_str()) {
                    record.notes = Some(notes);
                    changed = true;
                }
            }

            let snapshot = record.clone();
            if changed {
                tracing::info!(id = %snapshot.id, status = %snapshot.status, "task updated");
                Ok(Mutation::Changed(snapshot))
            } else {
                Ok(Mutation::Unchanged(snapshot))
            }
        })
    }

    /// Delete one record.
    pub fn remove(&self, id: &TaskId) -> Result<(), RegistryError> {
        self.mutate(|registry| {
            let before = registry.tasks.len();
            registry.tasks.retain(|t| &t.id != id);
            if registry.tasks.len() == before {
                return Err(RegistryError::TaskNotFound { id: id.clone() });
            }
            tracing::info!(id = %id, "task removed");
            Ok(Mutation::Changed(()))
        })
    }

    /// Delete every record in `scope`; returns how many were removed.
    pub fn clear(&self, scope: ClearScope) -> Result<usize, RegistryError> {
        self.mutate(|registry| {
            let before = registry.tasks.len();
            match scope {
                ClearScope::All => registry.tasks.clear(),
                ClearScope::Status(status) => registry.tasks.retain(|t| t.status != status),
            }
            let removed = before - registry.tasks.len();
            if removed == 0 {
                return Ok(Mutation::Unchanged(0));
            }
            tracing::info!(%scope, removed, "tasks cleared");
            Ok(Mutation::Changed(removed))
        })
    }

    // -----------------------------------------------------------------------
    // 3. Queries
    // -----------------------------------------------------------------------

    pub fn get(&self, id: &TaskId) -> Result<TaskRecord, RegistryError> {
        self.load()?
            .find(id)
            .cloned()
            .ok_or_else(|| RegistryError::TaskNotFound { id: id.clone() })
    }

    /// Records in insertion order, optionally only those with `filter` status.
    pub fn list(&self, filter: Option<TaskStatus>) -> Result<Vec<TaskRecord>, RegistryError> {
        let mut tasks = self.load()?.tasks;
        if let Some(status) = filter {
            tasks.retain(|t| t.status == status);
        }
        Ok(tasks)
    }

    pub fn status_summary(&self) -> Result<StatusSummary, RegistryError> {
        Ok(StatusSummary::from_tasks(&self.load()?.tasks))
    }

    pub fn status_report(&self) -> Result<StatusReport, RegistryError> {
        Ok(StatusReport::from_tasks(&self.load()?.tasks))
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn fresh_id(registry: &Registry) -> TaskId {
    loop {
        let id = TaskId::generate();
        if !registry.contains(&id) {
            return id;
        }
    }
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
