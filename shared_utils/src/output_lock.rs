//! Advisory single-writer lock for an output video.
//!
//! Two runs growing the same output would race on its temp files and on the
//! final rename. Each writer therefore holds `<output>.lock`, created with
//! create-new semantics and holding a small JSON payload. A lock whose owner
//! is gone (dead pid on unix) or that is older than 24 hours is reclaimed.
//! The lock is advisory: tools that ignore it are not stopped.

use crate::errors::{Result, StitchError};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const LOCK_STALE_TIMEOUT_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct LockInfo {
    pid: u32,
    /// Unix epoch seconds.
    created_at: i64,
    hostname: String,
}

impl LockInfo {
    fn current() -> Self {
        Self {
            pid: std::process::id(),
            created_at: chrono::Utc::now().timestamp(),
            hostname: get_hostname(),
        }
    }

    fn is_stale(&self) -> bool {
        let age = chrono::Utc::now().timestamp() - self.created_at;
        if age > LOCK_STALE_TIMEOUT_SECS {
            return true;
        }
        self.hostname == get_hostname() && !process_alive(self.pid)
    }
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    use std::process::{Command, Stdio};
    Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(true)
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}

fn get_hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .or_else(|| {
            fs::read_to_string("/etc/hostname")
                .ok()
                .map(|s| s.trim().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Held lock. Released on drop.
#[derive(Debug)]
pub struct OutputLock {
    lock_file: PathBuf,
}

impl OutputLock {
    pub fn lock_path_for(output: &Path) -> PathBuf {
        let mut name = output
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "output".into());
        name.push(".lock");
        output.with_file_name(name)
    }

    /// Takes the lock for `output`, reclaiming it once if it is stale.
    pub fn acquire(output: &Path) -> Result<Self> {
        let lock_file = Self::lock_path_for(output);

        for attempt in 0..2 {
            match Self::try_create(&lock_file) {
                Ok(()) => {
                    debug!(lock = %lock_file.display(), "Acquired output lock");
                    return Ok(Self { lock_file });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && attempt == 0 => {
                    match Self::read_holder(&lock_file) {
                        Some(info) if !info.is_stale() => {
                            return Err(StitchError::OutputLocked {
                                path: output.to_path_buf(),
                                pid: info.pid,
                            });
                        }
                        holder => {
                            warn!(
                                lock = %lock_file.display(),
                                pid = holder.map(|h| h.pid),
                                "Removing stale or unreadable lock file"
                            );
                            match fs::remove_file(&lock_file) {
                                Ok(()) => {}
                                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                                Err(e) => return Err(e.into()),
                            }
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    let pid = Self::read_holder(&lock_file).map(|h| h.pid).unwrap_or(0);
                    return Err(StitchError::OutputLocked {
                        path: output.to_path_buf(),
                        pid,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
        unreachable!("lock acquisition loop always returns")
    }

    pub fn path(&self) -> &Path {
        &self.lock_file
    }

    fn try_create(lock_file: &Path) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(lock_file)?;
        let json = serde_json::to_string_pretty(&LockInfo::current())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        file.write_all(json.as_bytes())?;
        file.sync_all()
    }

    fn read_holder(lock_file: &Path) -> Option<LockInfo> {
        let content = fs::read_to_string(lock_file).ok()?;
        serde_json::from_str(&content).ok()
    }
}

impl Drop for OutputLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.lock_file) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(lock = %self.lock_file.display(), error = %e, "Failed to release output lock");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_path_for() {
        assert_eq!(
            OutputLock::lock_path_for(Path::new("/v/timelapse.mp4")),
            PathBuf::from("/v/timelapse.mp4.lock")
        );
    }

    #[test]
    fn test_acquire_and_release() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("timelapse.mp4");
        let lock_path = OutputLock::lock_path_for(&output);
        {
            let lock = OutputLock::acquire(&output).unwrap();
            assert!(lock.path().exists());
            let info: LockInfo =
                serde_json::from_str(&fs::read_to_string(lock.path()).unwrap()).unwrap();
            assert_eq!(info.pid, std::process::id());
        }
        assert!(!lock_path.exists());
    }

    #[test]
    fn test_second_acquire_is_refused_while_held() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("timelapse.mp4");
        let _held = OutputLock::acquire(&output).unwrap();
        match OutputLock::acquire(&output) {
            Err(StitchError::OutputLocked { pid, .. }) => assert_eq!(pid, std::process::id()),
            other => panic!("expected OutputLocked, got {:?}", other),
        }
    }

    #[test]
    fn test_expired_lock_is_reclaimed() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("timelapse.mp4");
        let old = LockInfo {
            pid: std::process::id(),
            created_at: chrono::Utc::now().timestamp() - LOCK_STALE_TIMEOUT_SECS - 10,
            hostname: "elsewhere".to_string(),
        };
        fs::write(
            OutputLock::lock_path_for(&output),
            serde_json::to_string(&old).unwrap(),
        )
        .unwrap();

        let lock = OutputLock::acquire(&output).unwrap();
        let info: LockInfo =
            serde_json::from_str(&fs::read_to_string(lock.path()).unwrap()).unwrap();
        assert!(info.created_at > old.created_at);
    }

    #[test]
    fn test_garbage_lock_is_reclaimed() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("timelapse.mp4");
        fs::write(OutputLock::lock_path_for(&output), "not json").unwrap();
        assert!(OutputLock::acquire(&output).is_ok());
    }
}
