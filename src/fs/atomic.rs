//! Atomic write-then-rename primitives.
//!
//! All artifact writes follow the same pattern:
//! 1. Write content to a uniquely named temp file in the target directory
//! 2. Sync the file to disk (fsync)
//! 3. Rename over the target path
//!
//! Source and destination live in the same directory, so the rename stays on
//! one filesystem and is atomic on POSIX. On crash a stray
//! `.{filename}.tmp-{suffix}` file may remain; it is never read back.

use crate::error::{DelegatorError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically write bytes to a file, creating parent directories as needed.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| {
            DelegatorError::UserError(format!(
                "failed to create directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = temp_path_for(path)?;
    write_and_sync(&temp_path, content)?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        DelegatorError::UserError(format!(
            "failed to atomically replace '{}': {}",
            path.display(),
            e
        ))
    })?;

    // Sync the parent directory so the rename itself is durable.
    if let Some(parent) = path.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}

/// Atomically write a string to a file.
pub fn atomic_write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Build a unique temp path alongside the target.
///
/// A random suffix keeps concurrent writers of the same artifact (which
/// should not happen, but run directories are observable by other tools)
/// from clobbering each other's temp files.
fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            DelegatorError::UserError(format!("invalid file path '{}'", target.display()))
        })?;

    let suffix = uuid::Uuid::new_v4().simple().to_string();
    Ok(parent.join(format!(".{}.tmp-{}", filename, &suffix[..12])))
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        DelegatorError::UserError(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let write_result = file
        .write_all(content)
        .and_then(|()| file.sync_all())
        .map_err(|e| {
            DelegatorError::UserError(format!(
                "failed to write temporary file '{}': {}",
                path.display(),
                e
            ))
        });

    if write_result.is_err() {
        let _ = fs::remove_file(path);
    }
    write_result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_new_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("result.json");

        atomic_write(&path, b"{}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn atomic_write_replaces_existing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("result.json");

        fs::write(&path, "old").unwrap();
        atomic_write(&path, b"new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("subruns").join("scan").join("r.json");

        atomic_write(&path, b"nested").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "nested");
    }

    #[test]
    fn atomic_write_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.jsonl");

        atomic_write(&path, b"line\n").unwrap();

        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn concurrent_writes_to_distinct_files_are_safe() {
        let temp_dir = TempDir::new().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let path = temp_dir.path().join(format!("file_{}.txt", i));
                let content = format!("content {}", i);
                std::thread::spawn(move || {
                    atomic_write_file(&path, &content).unwrap();
                    (path, content)
                })
            })
            .collect();

        for handle in handles {
            let (path, expected) = handle.join().unwrap();
            assert_eq!(fs::read_to_string(&path).unwrap(), expected);
        }
    }
}
