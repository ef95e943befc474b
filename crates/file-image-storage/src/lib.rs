//! Filesystem-backed image storage
//!
//! Persists image bytes under a path derived from the request URL, with two
//! optional sidecars stored beside each image: the security key active when
//! the image was stored, and JSON-encoded detector output.
//!
//! # Example
//!
//! ```no_run
//! use file_image_storage::{FileStorage, StorageConfig};
//!
//! # async fn example() -> file_image_storage::Result<()> {
//! let config = StorageConfig::new("/var/lib/images").with_crypto_key(true, Some("ACME-SEC"));
//! let storage = FileStorage::new(config);
//!
//! storage.put("example.com/photos/cat.jpg", b"...").await?;
//! storage.put_crypto("example.com/photos/cat.jpg").await?;
//! storage
//!     .put_detector_data("example.com/photos/cat.jpg", &["face"])
//!     .await?;
//!
//! let image = storage.get("example.com/photos/cat.jpg").await?;
//! let key = storage.get_crypto("example.com/photos/cat.jpg").await?;
//! let faces: Option<Vec<String>> = storage
//!     .get_detector_data("example.com/photos/cat.jpg")
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod fs;
mod paths;
mod storage;

pub use config::StorageConfig;
pub use error::{Result, StorageError};
pub use fs::{ensure_dir, DirProbe, LocalDirProbe};
pub use paths::{EntryPaths, CRYPTO_SUFFIX, DETECTORS_SUFFIX};
pub use storage::{FileStorage, MISSING_SECURITY_KEY};
