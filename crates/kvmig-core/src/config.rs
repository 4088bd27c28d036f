//! Converter configuration

use std::path::Path;

use kvmig_flat::{FlatKey, KeyScheme, DEFAULT_ROOT};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Conversion settings
///
/// Loadable from TOML; every key is optional.
///
/// ```toml
/// key_root = "/calico/v1"
/// parallel = true
/// strict_unrecognized = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    /// Root of all flat keys
    pub key_root: String,
    /// Fan batch work out across the rayon pool
    pub parallel: bool,
    /// Count unrecognized entries as failures in reports
    pub strict_unrecognized: bool,
}

impl ConverterConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With key root
    #[inline]
    #[must_use]
    pub fn with_key_root(mut self, root: impl Into<String>) -> Self {
        self.key_root = root.into();
        self
    }

    /// With parallel batch processing
    #[inline]
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// With strict handling of unrecognized entries
    #[inline]
    #[must_use]
    pub fn with_strict_unrecognized(mut self, strict: bool) -> Self {
        self.strict_unrecognized = strict;
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns error if the TOML is invalid or has unknown keys
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Key scheme rooted at `key_root`
    ///
    /// # Errors
    /// Returns `InvalidKeyRoot` if the root is not an absolute key
    pub fn key_scheme(&self) -> Result<KeyScheme, ConfigError> {
        let root: FlatKey = self
            .key_root
            .parse()
            .map_err(|source| ConfigError::InvalidKeyRoot {
                root: self.key_root.clone(),
                source,
            })?;
        Ok(KeyScheme::new(root))
    }
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            key_root: DEFAULT_ROOT.to_string(),
            parallel: false,
            strict_unrecognized: false,
        }
    }
}
