//! Filesystem primitives shared by the storage operations

use crate::error::{Result, StorageError};
use chrono::{DateTime, Utc};
use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tokio::{fs, task};
use tracing::debug;

/// Answers whether a directory already exists before `ensure_dir` creates it.
///
/// The answer is only a shortcut. Creation still tolerates a directory that
/// appeared in the meantime, so a probe that always says `false` is correct,
/// just slower.
pub trait DirProbe: Send + Sync + fmt::Debug {
    /// Whether `path` is already a directory
    fn dir_exists(&self, path: &Path) -> bool;
}

/// Probe backed by the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDirProbe;

impl DirProbe for LocalDirProbe {
    fn dir_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

/// Make sure `path` is a directory, creating it and its parents if needed.
///
/// Losing a creation race against another writer counts as success.
pub async fn ensure_dir(probe: &dyn DirProbe, path: &Path) -> Result<()> {
    if probe.dir_exists(path) {
        return Ok(());
    }

    match fs::create_dir_all(path).await {
        Ok(()) => {
            debug!(path = ?path, "Created directory");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && is_dir(path).await => {
            debug!(path = ?path, "Directory created concurrently");
            Ok(())
        }
        Err(e) => Err(StorageError::io(path, e)),
    }
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}

/// Replace `path` with `data` through a temp file in the same directory, so
/// readers never see a partial write.
pub(crate) async fn write_atomic(path: &Path, data: Vec<u8>) -> Result<()> {
    let target = path.to_path_buf();
    let dir = match target.parent() {
        Some(dir) => dir.to_path_buf(),
        None => {
            return Err(StorageError::io(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "path has no parent directory"),
            ))
        }
    };

    let written = task::spawn_blocking(move || -> io::Result<()> {
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(&data)?;
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| StorageError::io(path, io::Error::other(e.to_string())))?;

    written.map_err(|e| StorageError::io(path, e))
}

/// Read a whole file, `None` if it does not exist
pub(crate) async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::io(path, e)),
    }
}

/// Remove a file, `false` if it was already gone
pub(crate) async fn remove_optional(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::io(path, e)),
    }
}

/// Last modification time, `None` if the file does not exist
pub(crate) async fn modified_at(path: &Path) -> Result<Option<DateTime<Utc>>> {
    let meta = match fs::metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::io(path, e)),
    };
    let modified = meta.modified().map_err(|e| StorageError::io(path, e))?;
    Ok(Some(DateTime::<Utc>::from(modified)))
}
