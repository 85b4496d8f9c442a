//! Advisory lock file serializing registry read-modify-write cycles across
//! independent processes.
//!
//! The lock is a sibling file created with create-new semantics, so
//! acquisition is atomic on every platform. The holder writes its pid and the
//! creation time into it; dropping the guard removes it. A lock older than
//! [`STALE_AFTER`] is assumed to belong to a crashed process and is broken:
//! it is renamed aside, checked to still be the lock judged stale, and only
//! then deleted.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::{Duration, Instant, SystemTime};

use chrono::Utc;

use crate::error::{io_err, RegistryError};

pub const STALE_AFTER: Duration = Duration::from_secs(30);

const INITIAL_BACKOFF: Duration = Duration::from_millis(5);
const MAX_BACKOFF: Duration = Duration::from_millis(100);

/// Held for the duration of one load-mutate-save cycle.
#[derive(Debug)]
pub struct RegistryLock {
    path: PathBuf,
}

impl RegistryLock {
    /// Block until the lock at `path` is ours or `timeout` elapses.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self, RegistryError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }

        let started = Instant::now();
        let mut backoff = INITIAL_BACKOFF;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    // Owner info is diagnostic only; a failed write still holds the lock.
                    let _ = writeln!(file, "{} {}", std::process::id(), Utc::now().to_rfc3339());
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    if break_if_stale(path)? {
                        continue;
                    }
                    let waited = started.elapsed();
                    if waited >= timeout {
                        return Err(RegistryError::LockTimeout {
                            path: path.to_path_buf(),
                            waited,
                        });
                    }
                    tracing::debug!(path = %path.display(), "registry lock busy, retrying");
                    sleep(backoff);
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                Err(err) => return Err(io_err(path, err)),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RegistryLock {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to release registry lock");
            }
        }
    }
}

/// Break the lock at `path` when it is older than [`STALE_AFTER`].
/// Returns `true` if the caller should retry immediately.
fn break_if_stale(path: &Path) -> Result<bool, RegistryError> {
    let seen = match fs::read_to_string(path) {
        Ok(seen) => seen,
        // Released between our open attempt and the read.
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(true),
        Err(err) => return Err(io_err(path, err)),
    };
    match age_of(path)? {
        Some(age) if age < STALE_AFTER => return Ok(false),
        Some(age) => {
            tracing::warn!(path = %path.display(), age_secs = age.as_secs(), "breaking stale registry lock");
        }
        None => return Ok(true),
    }
    claim_stale(path, &seen)?;
    Ok(true)
}

/// Move the lock at `path` aside and delete it if it is still the stale lock
/// whose contents were `seen`. A lock that changed hands in the meantime is
/// linked back into place. Returns `true` if the stale lock was removed.
fn claim_stale(path: &Path, seen: &str) -> Result<bool, RegistryError> {
    let claimed = claim_path(path);
    match fs::rename(path, &claimed) {
        Ok(()) => {}
        // Another waiter broke it first.
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(io_err(path, err)),
    }

    let contents = fs::read_to_string(&claimed).map_err(|e| io_err(&claimed, e))?;
    let still_stale = contents == seen && age_of(&claimed)?.is_some_and(|age| age >= STALE_AFTER);
    if !still_stale {
        tracing::warn!(path = %path.display(), "registry lock changed hands while breaking it; restoring");
        match fs::hard_link(&claimed, path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                tracing::warn!(path = %path.display(), "registry lock re-created before restore");
            }
            Err(err) => return Err(io_err(path, err)),
        }
    }
    fs::remove_file(&claimed).map_err(|e| io_err(&claimed, e))?;
    Ok(still_stale)
}

/// Unique sibling a lock is renamed to while it is being broken.
fn claim_path(path: &Path) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".stale.{}.{nanos}", std::process::id()));
    path.with_file_name(name)
}

/// Age of the file at `path`, or `None` if it no longer exists.
fn age_of(path: &Path) -> Result<Option<Duration>, RegistryError> {
    match fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => Ok(Some(
            SystemTime::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO),
        )),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};
    use tempfile::TempDir;

    #[test]
    fn acquire_creates_and_drop_removes() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("data").join("store.json.lock");
        {
            let lock = RegistryLock::acquire(&path, Duration::from_millis(100)).expect("lock");
            assert!(lock.path().exists());
            let owner = fs::read_to_string(&path).expect("read lock");
            assert!(owner.starts_with(&std::process::id().to_string()));
        }
        assert!(!path.exists(), "lock file must be removed on drop");
    }

    #[test]
    fn held_lock_times_out() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("store.json.lock");
        let _held = RegistryLock::acquire(&path, Duration::from_millis(100)).expect("lock");
        let err = RegistryLock::acquire(&path, Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, RegistryError::LockTimeout { .. }), "got: {err}");
    }

    fn backdate(path: &Path, by: Duration) {
        let then = FileTime::from_system_time(SystemTime::now() - by);
        set_file_mtime(path, then).expect("set mtime");
    }

    fn leftovers(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .expect("read dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .filter(|name| name.contains(".stale."))
            .collect()
    }

    #[test]
    fn stale_lock_is_broken_and_acquired() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("store.json.lock");
        fs::write(&path, "999999 2020-01-01T00:00:00+00:00\n").expect("write lock");
        backdate(&path, STALE_AFTER + Duration::from_secs(1));

        let lock = RegistryLock::acquire(&path, Duration::from_millis(200)).expect("lock");
        let owner = fs::read_to_string(lock.path()).expect("read lock");
        assert!(owner.starts_with(&format!("{} ", std::process::id())), "{owner}");
        assert!(leftovers(dir.path()).is_empty());
    }

    #[test]
    fn fresh_lock_is_not_broken() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("store.json.lock");
        fs::write(&path, "999999 now\n").expect("write lock");
        backdate(&path, STALE_AFTER - Duration::from_secs(5));

        let err = RegistryLock::acquire(&path, Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, RegistryError::LockTimeout { .. }), "got: {err}");
        assert_eq!(fs::read_to_string(&path).expect("read"), "999999 now\n");
    }

    #[test]
    fn lock_that_changed_hands_is_restored() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("store.json.lock");
        fs::write(&path, "424242 new owner\n").expect("write lock");
        backdate(&path, STALE_AFTER + Duration::from_secs(1));

        let removed = claim_stale(&path, "999999 old owner\n").expect("claim");
        assert!(!removed);
        assert_eq!(fs::read_to_string(&path).expect("read"), "424242 new owner\n");
        assert!(leftovers(dir.path()).is_empty());
    }

    #[test]
    fn stale_lock_that_was_refreshed_is_restored() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("store.json.lock");
        fs::write(&path, "\n").expect("write lock");

        assert!(!claim_stale(&path, "\n").expect("claim"));
        assert!(path.exists());
    }

    #[test]
    fn lock_gone_before_claim_is_not_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("store.json.lock");
        assert!(!claim_stale(&path, "whatever\n").expect("claim"));
        assert!(!path.exists());
    }

    #[test]
    fn released_lock_can_be_reacquired() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("store.json.lock");
        drop(RegistryLock::acquire(&path, Duration::from_millis(100)).expect("first"));
        RegistryLock::acquire(&path, Duration::from_millis(100)).expect("second");
    }
}
