//! Filesystem layout under the forkterm root.
//!
//! ```text
//! <root>/                      (~/.forkterm, or $FORKTERM_HOME)
//!   config.yaml                (optional)
//!   data/
//!     forked-tasks.json        (registry, mode 0600)
//!     forked-tasks.json.lock   (present only while a mutation runs)
//!   logs/
//!     forks/                   (one transcript per forked session)
//! ```
//!
//! Every function takes the root explicitly; only [`default_root`] consults
//! the environment.

use std::path::{Path, PathBuf};

pub const ROOT_DIR: &str = ".forkterm";
pub const ROOT_ENV: &str = "FORKTERM_HOME";

pub const CONFIG_FILE: &str = "config.yaml";
pub const REGISTRY_FILE: &str = "forked-tasks.json";
pub const LOCK_SUFFIX: &str = "lock";

/// `$FORKTERM_HOME` if set and non-empty, else `<home>/.forkterm`.
pub fn default_root() -> Option<PathBuf> {
    match std::env::var_os(ROOT_ENV) {
        Some(root) if !root.is_empty() => Some(PathBuf::from(root)),
        _ => dirs::home_dir().map(|home| root_in(&home)),
    }
}

/// `<home>/.forkterm`
pub fn root_in(home: &Path) -> PathBuf {
    home.join(ROOT_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn data_dir(root: &Path) -> PathBuf {
    root.join("data")
}

pub fn registry_path(root: &Path) -> PathBuf {
    data_dir(root).join(REGISTRY_FILE)
}

/// Lock file guarding read-modify-write cycles on `store`.
pub fn lock_path_for(store: &Path) -> PathBuf {
    sibling_with_suffix(store, LOCK_SUFFIX)
}

/// Temporary sibling used for atomic replacement of `store`.
pub fn tmp_path_for(store: &Path) -> PathBuf {
    sibling_with_suffix(store, "tmp")
}

pub fn logs_dir(root: &Path) -> PathBuf {
    root.join("logs").join("forks")
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| REGISTRY_FILE.to_string());
    path.with_file_name(format!("{name}.{suffix}"))
}
