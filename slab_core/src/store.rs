//! # Ledger Storage
//!
//! Handles ledger file operations with safety features:
//! - **Atomic saves**: Write to .tmp, verify, rename to prevent corruption
//! - **File locking**: Prevent concurrent edits on shared drives
//! - **Version validation**: Ensure schema compatibility
//!
//! ## File Format
//!
//! Ledgers are saved as `.slt` (SlabTally) files containing JSON.
//! Lock files use `.slt.lock` extension with metadata about who holds the lock.
//!
//! ## Example
//!
//! ```rust,no_run
//! use slab_core::store::{save_ledger, load_ledger, FileLock};
//! use slab_core::ledger::DispatchLedger;
//! use std::path::Path;
//!
//! let ledger = DispatchLedger::new("Shree Ganesh Granites");
//! let path = Path::new("dispatch.slt");
//!
//! // Acquire lock before saving
//! let lock = FileLock::acquire(path, "ops@yard").unwrap();
//!
//! // Save with atomic write
//! save_ledger(&ledger, path).unwrap();
//!
//! // Lock is released when dropped
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::errors::{DispatchError, DispatchResult};
use crate::ledger::{DispatchLedger, SCHEMA_VERSION};

/// Lock file metadata stored in .slt.lock files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// User identifier (email or username)
    pub user_id: String,
    /// Machine name where lock was acquired
    pub machine: String,
    /// Process ID that holds the lock
    pub pid: u32,
    /// When the lock was acquired
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    /// Create new lock info for the current process
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }
}

/// Get the hostname of the current machine
fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::env::var("HOST").ok())
    }
}

/// File lock guard that releases the lock when dropped.
///
/// Uses both:
/// 1. OS-level file locking (via fs2) for process safety
/// 2. .lock file with metadata for user visibility
pub struct FileLock {
    /// Path to the main ledger file
    ledger_path: PathBuf,
    /// Path to the lock file
    lock_path: PathBuf,
    /// The underlying file handle (keeps OS lock)
    _lock_file: File,
    /// Lock metadata
    pub info: LockInfo,
}

impl FileLock {
    /// Acquire an exclusive lock on a ledger file.
    ///
    /// A stale lock (holding process gone, or older than 24 hours) is taken
    /// over silently.
    ///
    /// # Returns
    ///
    /// * `Ok(FileLock)` - Lock acquired successfully
    /// * `Err(DispatchError::FileLocked)` - Another process holds the lock
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use slab_core::store::FileLock;
    /// use std::path::Path;
    ///
    /// let lock = FileLock::acquire(Path::new("dispatch.slt"), "ops@yard")?;
    /// // ... do work ...
    /// drop(lock); // releases lock
    /// # Ok::<(), slab_core::errors::DispatchError>(())
    /// ```
    pub fn acquire(path: &Path, user_id: impl Into<String>) -> DispatchResult<Self> {
        let lock_path = lock_path_for(path);
        let info = LockInfo::new(user_id);

        if lock_path.exists() {
            if let Ok(existing) = read_lock_info(&lock_path) {
                if !is_lock_stale(&existing) {
                    return Err(DispatchError::file_locked(
                        path.display().to_string(),
                        format!("{} ({})", existing.user_id, existing.machine),
                        existing.locked_at.to_rfc3339(),
                    ));
                }
                // Stale lock, take it over
            }
        }

        let mut lock_file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| {
                DispatchError::file_error("create lock", lock_path.display().to_string(), e.to_string())
            })?;

        // Exclusive OS-level lock, non-blocking
        lock_file.try_lock_exclusive().map_err(|_| {
            DispatchError::file_locked(
                path.display().to_string(),
                "another process".to_string(),
                "unknown".to_string(),
            )
        })?;

        let lock_json = serde_json::to_string_pretty(&info).map_err(|e| {
            DispatchError::SerializationError {
                reason: e.to_string(),
            }
        })?;

        lock_file.write_all(lock_json.as_bytes()).map_err(|e| {
            DispatchError::file_error("write lock", lock_path.display().to_string(), e.to_string())
        })?;

        lock_file.sync_all().map_err(|e| {
            DispatchError::file_error("sync lock", lock_path.display().to_string(), e.to_string())
        })?;

        Ok(FileLock {
            ledger_path: path.to_path_buf(),
            lock_path,
            _lock_file: lock_file,
            info,
        })
    }

    /// Check if a file is locked without acquiring the lock.
    ///
    /// Returns `Some(LockInfo)` if locked, `None` if available.
    pub fn check(path: &Path) -> Option<LockInfo> {
        let lock_path = lock_path_for(path);
        if lock_path.exists() {
            if let Ok(info) = read_lock_info(&lock_path) {
                if !is_lock_stale(&info) {
                    return Some(info);
                }
            }
        }
        None
    }

    /// Get the path to the ledger file
    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
        // OS lock is released when _lock_file is dropped
    }
}

/// Get the lock file path for a ledger file
fn lock_path_for(ledger_path: &Path) -> PathBuf {
    let mut lock_path = ledger_path.to_path_buf();
    let extension = lock_path
        .extension()
        .map(|e| format!("{}.lock", e.to_string_lossy()))
        .unwrap_or_else(|| "lock".to_string());
    lock_path.set_extension(extension);
    lock_path
}

/// Read lock info from a lock file
fn read_lock_info(lock_path: &Path) -> DispatchResult<LockInfo> {
    let mut file = File::open(lock_path).map_err(|e| {
        DispatchError::file_error("read lock", lock_path.display().to_string(), e.to_string())
    })?;

    let mut contents = String::new();
    file.read_to_string(&mut contents).map_err(|e| {
        DispatchError::file_error("read lock", lock_path.display().to_string(), e.to_string())
    })?;

    serde_json::from_str(&contents).map_err(|e| DispatchError::SerializationError {
        reason: e.to_string(),
    })
}

/// Check if a lock is stale (the process that created it is no longer running)
fn is_lock_stale(info: &LockInfo) -> bool {
    if let Some(our_machine) = hostname() {
        if info.machine == our_machine {
            #[cfg(windows)]
            {
                use std::process::Command;
                let output = Command::new("tasklist")
                    .args(["/FI", &format!("PID eq {}", info.pid), "/NH"])
                    .output();
                if let Ok(output) = output {
                    let stdout = String::from_utf8_lossy(&output.stdout);
                    if stdout.contains("No tasks") || !stdout.contains(&info.pid.to_string()) {
                        return true;
                    }
                }
            }
            #[cfg(unix)]
            {
                if fs::metadata(format!("/proc/{}", info.pid)).is_err() {
                    return true;
                }
            }
        }
    }

    // Locks older than 24 hours are treated as abandoned
    let age = Utc::now() - info.locked_at;
    if age.num_hours() > 24 {
        return true;
    }

    false
}

/// Save a ledger to a file with atomic write semantics.
///
/// The save process:
/// 1. Serialize ledger to JSON
/// 2. Write to a temporary file (.tmp)
/// 3. Sync to disk (fsync)
/// 4. Rename .tmp to .slt (atomic on most filesystems)
///
/// This prevents corruption if the process is interrupted during write.
pub fn save_ledger(ledger: &DispatchLedger, path: &Path) -> DispatchResult<()> {
    let json = serde_json::to_string_pretty(ledger).map_err(|e| DispatchError::SerializationError {
        reason: e.to_string(),
    })?;

    let tmp_path = path.with_extension("slt.tmp");

    let mut tmp_file = File::create(&tmp_path).map_err(|e| {
        DispatchError::file_error("create temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.write_all(json.as_bytes()).map_err(|e| {
        DispatchError::file_error("write temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.sync_all().map_err(|e| {
        DispatchError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        // Clean up temp file if rename fails
        let _ = fs::remove_file(&tmp_path);
        DispatchError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    Ok(())
}

/// Load a ledger from a file.
///
/// # Returns
///
/// * `Ok(DispatchLedger)` - Successfully loaded ledger
/// * `Err(DispatchError::VersionMismatch)` - File version is incompatible
/// * `Err(DispatchError::SerializationError)` - Invalid JSON
/// * `Err(DispatchError::FileError)` - I/O error
pub fn load_ledger(path: &Path) -> DispatchResult<DispatchLedger> {
    let mut file = File::open(path).map_err(|e| {
        DispatchError::file_error("open", path.display().to_string(), e.to_string())
    })?;

    let mut contents = String::new();
    file.read_to_string(&mut contents).map_err(|e| {
        DispatchError::file_error("read", path.display().to_string(), e.to_string())
    })?;

    let ledger: DispatchLedger =
        serde_json::from_str(&contents).map_err(|e| DispatchError::SerializationError {
            reason: format!("Invalid JSON in {}: {}", path.display(), e),
        })?;

    validate_version(&ledger.meta.version)?;

    Ok(ledger)
}

/// Load a ledger, creating a fresh one if the file does not exist yet.
///
/// First run on a new yard has no ledger file; every other load error is
/// still reported.
pub fn load_or_create_ledger(path: &Path, company: &str) -> DispatchResult<DispatchLedger> {
    if path.exists() {
        load_ledger(path)
    } else {
        Ok(DispatchLedger::new(company))
    }
}

/// Validate that a file version is compatible with the current schema.
fn validate_version(file_version: &str) -> DispatchResult<()> {
    let file_parts: Vec<u32> = file_version
        .split('.')
        .filter_map(|p| p.parse().ok())
        .collect();
    let current_parts: Vec<u32> = SCHEMA_VERSION
        .split('.')
        .filter_map(|p| p.parse().ok())
        .collect();

    if file_parts.is_empty() || current_parts.is_empty() {
        return Err(DispatchError::VersionMismatch {
            file_version: file_version.to_string(),
            expected_version: SCHEMA_VERSION.to_string(),
        });
    }

    // Major version must match
    if file_parts[0] != current_parts[0] {
        return Err(DispatchError::VersionMismatch {
            file_version: file_version.to_string(),
            expected_version: SCHEMA_VERSION.to_string(),
        });
    }

    // For 0.x versions, a newer minor version than ours is unreadable
    if current_parts[0] == 0 && file_parts.len() > 1 && current_parts.len() > 1 {
        if file_parts[1] > current_parts[1] {
            return Err(DispatchError::VersionMismatch {
                file_version: file_version.to_string(),
                expected_version: SCHEMA_VERSION.to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;

    fn temp_ledger_path(name: &str) -> PathBuf {
        temp_dir().join(format!("slabtally_test_{}.slt", name))
    }

    #[test]
    fn test_lock_path_generation() {
        let ledger_path = Path::new("/path/to/dispatch.slt");
        let lock_path = lock_path_for(ledger_path);
        assert_eq!(lock_path, Path::new("/path/to/dispatch.slt.lock"));
    }

    #[test]
    fn test_lock_info_creation() {
        let info = LockInfo::new("ops@yard");
        assert_eq!(info.user_id, "ops@yard");
        assert!(info.pid > 0);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = temp_ledger_path("roundtrip");

        let ledger = DispatchLedger::new("Shree Ganesh Granites");
        save_ledger(&ledger, &path).unwrap();

        let loaded = load_ledger(&path).unwrap();
        assert_eq!(loaded.meta.company, "Shree Ganesh Granites");
        assert_eq!(loaded.record_count(), 0);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_atomic_save_creates_no_tmp_file() {
        let path = temp_ledger_path("atomic");
        let tmp_path = path.with_extension("slt.tmp");

        let ledger = DispatchLedger::new("Test Yard");
        save_ledger(&ledger, &path).unwrap();

        // Temp file should not exist after successful save
        assert!(!tmp_path.exists());
        assert!(path.exists());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_file_lock_acquire_and_release() {
        let path = temp_ledger_path("lock_test");
        File::create(&path).unwrap();

        let lock = FileLock::acquire(&path, "ops@yard").unwrap();
        assert_eq!(lock.info.user_id, "ops@yard");
        assert_eq!(lock.ledger_path(), path);

        let lock_path = lock_path_for(&path);
        assert!(lock_path.exists());

        drop(lock);
        assert!(!lock_path.exists());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version(SCHEMA_VERSION).is_ok());
        assert!(validate_version("0.1.0").is_ok());
        assert!(validate_version("0.1.5").is_ok());

        // Different major should fail
        assert!(validate_version("1.0.0").is_err());

        // Newer minor (in 0.x) should fail
        assert!(validate_version("0.2.0").is_err());
    }

    #[test]
    fn test_load_or_create() {
        let path = temp_ledger_path("fresh");
        let _ = fs::remove_file(&path);

        let created = load_or_create_ledger(&path, "New Yard").unwrap();
        assert_eq!(created.meta.company, "New Yard");
        // Nothing written until an explicit save
        assert!(!path.exists());
    }

    #[test]
    fn test_check_reports_held_lock() {
        let path = temp_ledger_path("lock_check");
        File::create(&path).unwrap();

        assert!(FileLock::check(&path).is_none());

        let lock = FileLock::acquire(&path, "ops@yard").unwrap();
        let seen = FileLock::check(&path).expect("lock should be visible");
        assert_eq!(seen.user_id, "ops@yard");

        drop(lock);
        assert!(FileLock::check(&path).is_none());

        let _ = fs::remove_file(&path);
    }
}
