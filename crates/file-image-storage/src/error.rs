//! Error types for the file image storage

use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum StorageError {
    /// Storage settings that cannot be honored
    Config(String),
    /// Filesystem failure on a specific path
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A sidecar file exists but cannot be decoded
    Corrupt { path: PathBuf, reason: String },
    /// Detector data could not be serialized
    Serialize(serde_json::Error),
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn corrupt(path: &Path, reason: impl fmt::Display) -> Self {
        StorageError::Corrupt {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Config(msg) => write!(f, "{}", msg),
            StorageError::Io { path, source } => {
                write!(f, "IO error on {}: {}", path.display(), source)
            }
            StorageError::Corrupt { path, reason } => {
                write!(f, "Corrupt file {}: {}", path.display(), reason)
            }
            StorageError::Serialize(err) => write!(f, "Serialization error: {}", err),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io { source, .. } => Some(source),
            StorageError::Serialize(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialize(err)
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
