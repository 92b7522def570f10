//! Cross-process mutual exclusion built on atomic lock-file creation.
//!
//! Advisory byte-range locks are unreliable on some network filesystems, so
//! the marker is a file created with `create_new` (atomic, fails if present).
//! The guard removes the marker on drop, which covers success, error, and
//! panic exits alike.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

use thiserror::Error;

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum LockError {
    #[error("timed out acquiring lock {scope}")]
    Timeout { scope: PathBuf },
    #[error("failed to acquire lock {scope}: {source}")]
    Io {
        scope: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Tunables for lock acquisition.
///
/// `stale_after` trades crash recovery against double-run risk: a marker older
/// than this is treated as abandoned and reclaimed. There is no principled
/// derivation for the default; callers with tighter requirements should pass
/// their own value.
#[derive(Debug, Clone, Copy)]
pub struct LockOptions {
    pub timeout: Duration,
    pub stale_after: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            stale_after: Duration::from_secs(30),
        }
    }
}

/// Holds the lock marker; dropping the guard releases it.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Blocks until the marker at `path` is created, up to `options.timeout`.
pub fn acquire_lock(path: &Path, options: LockOptions) -> Result<LockGuard, LockError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| LockError::Io {
                scope: path.to_path_buf(),
                source,
            })?;
        }
    }

    let start = SystemTime::now();

    loop {
        match OpenOptions::new().create_new(true).write(true).open(path) {
            Ok(mut file) => {
                let pid = std::process::id();
                let _ = writeln!(file, "{pid}");
                tracing::debug!(lock = %path.display(), pid, "acquired lock");
                return Ok(LockGuard {
                    path: path.to_path_buf(),
                });
            }
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {
                if options.stale_after > Duration::ZERO && reclaim_stale_lock(path, options.stale_after)
                {
                    continue;
                }
                let elapsed = SystemTime::now().duration_since(start).unwrap_or_default();
                if elapsed >= options.timeout {
                    return Err(LockError::Timeout {
                        scope: path.to_path_buf(),
                    });
                }
                thread::sleep(LOCK_POLL_INTERVAL);
            }
            Err(source) => {
                return Err(LockError::Io {
                    scope: path.to_path_buf(),
                    source,
                });
            }
        }
    }
}

fn reclaim_stale_lock(path: &Path, stale_after: Duration) -> bool {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(_) => return false,
    };
    let modified = match metadata.modified() {
        Ok(modified) => modified,
        Err(_) => return false,
    };
    let age = match SystemTime::now().duration_since(modified) {
        Ok(age) => age,
        Err(_) => Duration::ZERO,
    };
    if age < stale_after {
        return false;
    }

    tracing::warn!(lock = %path.display(), "reclaiming stale lock marker");
    fs::remove_file(path).is_ok()
}
