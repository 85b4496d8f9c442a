//! forkterm core library: domain types, the task registry, configuration and
//! the failure taxonomy shared by every forkterm crate.
//!
//! - [`types`]: task records, kinds, statuses
//! - [`error`]: [`FailureKind`], [`RegistryError`], [`ConfigError`]
//! - [`registry`]: [`TaskRegistry`], the locked load-mutate-save store
//! - [`paths`] / [`config`]: on-disk layout and `config.yaml`

pub mod config;
pub mod error;
pub mod lock;
pub mod paths;
pub mod registry;
pub mod types;

pub use config::ForkConfig;
pub use error::{ConfigError, FailureKind, RegistryError};
pub use registry::TaskRegistry;
pub use types::{
    ClearScope, InvalidTaskId, NewTask, Registry, RegistryMetadata, StatusReport, StatusSummary,
    TaskId, TaskKind, TaskRecord, TaskStatus, TaskUpdate, UnknownTaskKind,
};
