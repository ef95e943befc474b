use std::env;
use std::path::PathBuf;

/// Settings consumed by [`crate::FileStorage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Base directory for every stored entry
    pub root_path: PathBuf,
    /// Persist the security key beside each image
    pub store_crypto_key_for_each_image: bool,
    /// Key written by `put_crypto`; required when the option above is on
    pub security_key: Option<String>,
    /// Images older than this are reported as missing
    pub expiration_secs: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("/tmp/thumbor/storage"),
            store_crypto_key_for_each_image: false,
            security_key: None,
            expiration_secs: None,
        }
    }
}

impl StorageConfig {
    /// Storage rooted at `root_path` with every optional behavior off
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            ..Self::default()
        }
    }

    /// Turn per-image crypto key storage on or off with the key to store
    pub fn with_crypto_key(mut self, enabled: bool, security_key: Option<&str>) -> Self {
        self.store_crypto_key_for_each_image = enabled;
        self.security_key = security_key.map(str::to_string);
        self
    }

    /// Report images older than `secs` as missing
    pub fn with_expiration(mut self, secs: u64) -> Self {
        self.expiration_secs = Some(secs);
        self
    }

    /// Parse configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Parse configuration from an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let root_path = lookup("FILE_STORAGE_ROOT_PATH")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.root_path);

        let store_crypto_key_for_each_image = lookup("STORES_CRYPTO_KEY_FOR_EACH_IMAGE")
            .map(|s| parse_flag(&s))
            .unwrap_or(defaults.store_crypto_key_for_each_image);

        let security_key = lookup("SECURITY_KEY");

        // 0 disables expiration
        let expiration_secs = lookup("STORAGE_EXPIRATION_SECONDS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0);

        Self {
            root_path,
            store_crypto_key_for_each_image,
            security_key,
            expiration_secs,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = StorageConfig::default();
        assert_eq!(config.root_path, PathBuf::from("/tmp/thumbor/storage"));
        assert!(!config.store_crypto_key_for_each_image);
        assert!(config.security_key.is_none());
        assert!(config.expiration_secs.is_none());
    }

    #[test]
    fn test_from_vars_empty_uses_defaults() {
        let config = StorageConfig::from_vars(vars(&[]));
        assert_eq!(config, StorageConfig::default());
    }

    #[test]
    fn test_from_vars_reads_all_options() {
        let config = StorageConfig::from_vars(vars(&[
            ("FILE_STORAGE_ROOT_PATH", "/var/lib/images"),
            ("STORES_CRYPTO_KEY_FOR_EACH_IMAGE", "True"),
            ("SECURITY_KEY", "ACME-SEC"),
            ("STORAGE_EXPIRATION_SECONDS", "3600"),
        ]));
        assert_eq!(config.root_path, PathBuf::from("/var/lib/images"));
        assert!(config.store_crypto_key_for_each_image);
        assert_eq!(config.security_key.as_deref(), Some("ACME-SEC"));
        assert_eq!(config.expiration_secs, Some(3600));
    }

    #[test]
    fn test_zero_expiration_means_never() {
        let config = StorageConfig::from_vars(vars(&[("STORAGE_EXPIRATION_SECONDS", "0")]));
        assert!(config.expiration_secs.is_none());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag(" yes "));
        assert!(parse_flag("TRUE"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_builders() {
        let config = StorageConfig::new("/data")
            .with_crypto_key(true, Some("k"))
            .with_expiration(10);
        assert_eq!(config.root_path, PathBuf::from("/data"));
        assert!(config.store_crypto_key_for_each_image);
        assert_eq!(config.security_key.as_deref(), Some("k"));
        assert_eq!(config.expiration_secs, Some(10));
    }
}
