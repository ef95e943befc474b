//! Mapping from request keys to files under the storage root

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Suffix appended to the image file name for the crypto key sidecar
pub const CRYPTO_SUFFIX: &str = ".crypto";

/// Suffix appended to the image file name for the detector sidecar
pub const DETECTORS_SUFFIX: &str = ".detectors.json";

/// Every on-disk location belonging to one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPaths {
    /// Directory shared by keys with the same URL prefix
    pub dir: PathBuf,
    /// Raw image bytes
    pub image: PathBuf,
    /// Security key sidecar
    pub crypto: PathBuf,
    /// Detector output sidecar
    pub detectors: PathBuf,
}

impl EntryPaths {
    /// Derive the paths for `key` under `root`.
    ///
    /// The directory comes from the part of the key before its last `/`, so
    /// keys sharing a URL prefix share a directory. The file name comes from
    /// the whole key. Both are SHA-256 digests, which keeps any key inside
    /// `root`.
    pub fn derive(root: &Path, key: &str) -> Self {
        let prefix = key.rsplit_once('/').map(|(prefix, _)| prefix).unwrap_or("");
        let dir_digest = digest(prefix);
        let (shard, rest) = dir_digest.split_at(2);
        let dir = root.join(shard).join(rest);

        let name = digest(key);
        Self {
            image: dir.join(&name),
            crypto: dir.join(format!("{}{}", name, CRYPTO_SUFFIX)),
            detectors: dir.join(format!("{}{}", name, DETECTORS_SUFFIX)),
            dir,
        }
    }

    /// All files of the entry, image first
    pub fn files(&self) -> [&Path; 3] {
        [&self.image, &self.crypto, &self.detectors]
    }
}

fn digest(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}
