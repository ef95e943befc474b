//! Filesystem image storage with crypto and detector sidecars

use crate::config::StorageConfig;
use crate::error::{Result, StorageError};
use crate::fs::{self as store_fs, DirProbe, LocalDirProbe};
use crate::paths::EntryPaths;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Message returned when the crypto gate is on without a security key
pub const MISSING_SECURITY_KEY: &str =
    "STORES_CRYPTO_KEY_FOR_EACH_IMAGE can't be True if no SECURITY_KEY specified";

/// Stores images and their sidecars under a root directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    config: StorageConfig,
    probe: Arc<dyn DirProbe>,
}

impl FileStorage {
    /// Create a storage over `config`; nothing touches the disk until first use
    pub fn new(config: StorageConfig) -> Self {
        Self::with_probe(config, Arc::new(LocalDirProbe))
    }

    /// Create a storage that asks `probe` whether directories exist
    pub fn with_probe(config: StorageConfig, probe: Arc<dyn DirProbe>) -> Self {
        Self { config, probe }
    }

    /// Settings this storage was created with
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Directory every entry is stored under
    pub fn root_path(&self) -> &Path {
        &self.config.root_path
    }

    /// Initialize the storage by ensuring the root directory exists
    pub async fn init(&self) -> Result<()> {
        self.ensure_dir(&self.config.root_path).await?;
        info!(root_path = ?self.config.root_path, "File storage initialized");
        Ok(())
    }

    /// Check the crypto settings without writing anything
    pub fn validate(&self) -> Result<()> {
        self.crypto_key().map(|_| ())
    }

    /// Race-tolerant directory creation, see [`crate::ensure_dir`]
    pub async fn ensure_dir(&self, path: &Path) -> Result<()> {
        store_fs::ensure_dir(self.probe.as_ref(), path).await
    }

    /// Paths used for `key`
    pub fn paths(&self, key: &str) -> EntryPaths {
        EntryPaths::derive(&self.config.root_path, key)
    }

    /// Store image bytes for `key`, replacing any previous image
    pub async fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let paths = self.paths(key);
        self.ensure_dir(&paths.dir).await?;
        store_fs::write_atomic(&paths.image, bytes.to_vec()).await?;

        debug!(key = %key, path = ?paths.image, size = bytes.len(), "Stored image");
        Ok(())
    }

    /// Get the image bytes for `key`, `None` if missing or expired
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let paths = self.paths(key);

        if self.is_expired(&paths.image).await? {
            debug!(key = %key, "Image expired");
            return Ok(None);
        }

        let data = store_fs::read_optional(&paths.image).await?;
        match &data {
            Some(data) => debug!(key = %key, size = data.len(), "Image hit"),
            None => debug!(key = %key, "Image miss"),
        }
        Ok(data)
    }

    /// Whether an unexpired image is stored for `key`
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let paths = self.paths(key);
        match store_fs::modified_at(&paths.image).await? {
            Some(modified) => Ok(!self.expired_since(modified)),
            None => Ok(false),
        }
    }

    /// Delete the image and both sidecars for `key`; missing files are skipped
    pub async fn remove(&self, key: &str) -> Result<()> {
        let paths = self.paths(key);
        let mut removed = 0;
        for file in paths.files() {
            if store_fs::remove_optional(file).await? {
                removed += 1;
            }
        }

        debug!(key = %key, removed, "Removed entry");
        Ok(())
    }

    /// Store the configured security key beside the image for `key`.
    ///
    /// Does nothing when per-image crypto keys are disabled.
    pub async fn put_crypto(&self, key: &str) -> Result<()> {
        let Some(security_key) = self.crypto_key()? else {
            debug!(key = %key, "Crypto key storage disabled, skipping");
            return Ok(());
        };

        let paths = self.paths(key);
        self.ensure_dir(&paths.dir).await?;
        store_fs::write_atomic(&paths.crypto, security_key.as_bytes().to_vec()).await?;

        debug!(key = %key, path = ?paths.crypto, "Stored crypto key");
        Ok(())
    }

    /// Get the security key stored for `key`, `None` if never stored
    pub async fn get_crypto(&self, key: &str) -> Result<Option<String>> {
        let paths = self.paths(key);
        let Some(data) = store_fs::read_optional(&paths.crypto).await? else {
            return Ok(None);
        };

        String::from_utf8(data)
            .map(Some)
            .map_err(|e| StorageError::corrupt(&paths.crypto, e))
    }

    /// Store detector output for `key` as JSON
    pub async fn put_detector_data<T>(&self, key: &str, data: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let json = serde_json::to_vec(data)?;
        let paths = self.paths(key);
        self.ensure_dir(&paths.dir).await?;
        store_fs::write_atomic(&paths.detectors, json).await?;

        debug!(key = %key, path = ?paths.detectors, "Stored detector data");
        Ok(())
    }

    /// Get detector output for `key`, `None` if never stored
    pub async fn get_detector_data<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let paths = self.paths(key);
        let Some(data) = store_fs::read_optional(&paths.detectors).await? else {
            return Ok(None);
        };

        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| StorageError::corrupt(&paths.detectors, e))
    }

    /// The key to write per image, `None` when the gate is off
    fn crypto_key(&self) -> Result<Option<&str>> {
        if !self.config.store_crypto_key_for_each_image {
            return Ok(None);
        }

        match self.config.security_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(Some(key)),
            _ => {
                warn!("Per-image crypto keys enabled without a security key");
                Err(StorageError::Config(MISSING_SECURITY_KEY.to_string()))
            }
        }
    }

    async fn is_expired(&self, path: &Path) -> Result<bool> {
        if self.config.expiration_secs.is_none() {
            return Ok(false);
        }
        Ok(store_fs::modified_at(path)
            .await?
            .is_some_and(|modified| self.expired_since(modified)))
    }

    fn expired_since(&self, modified: chrono::DateTime<Utc>) -> bool {
        match self.config.expiration_secs {
            Some(ttl_secs) => {
                let age_secs = (Utc::now() - modified).num_seconds();
                age_secs > 0 && age_secs as u64 > ttl_secs
            }
            None => false,
        }
    }
}
