//! Runtime configuration
//!
//! Stored as JSON. Every field has a default, so an empty object (or a file
//! written by an older version) loads cleanly:
//!
//! ```json
//! {
//!   "unpacked_suffix": "_unpacked",
//!   "default_password": "VelvetSweatshop",
//!   "max_name_length": 240,
//!   "log_filter": "docid=info"
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DocIdError, DocIdResult};
use crate::lineage::{LineageResolver, UNPACKED_SUFFIX};
use crate::naming::{NameSanitizer, MAX_NAME_LENGTH};
use crate::office::{EncryptionDetector, DEFAULT_PASSWORD};

/// Settings shared by the detector, resolver and sanitizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocIdConfig {
    /// Suffix naming an archive's extraction directory
    pub unpacked_suffix: String,
    /// Password tried before declaring a protected document encrypted
    pub default_password: String,
    /// Character cap applied by name sanitizing
    pub max_name_length: usize,
    /// `tracing` filter directives used by `logging::init_from_config`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

impl Default for DocIdConfig {
    fn default() -> Self {
        Self {
            unpacked_suffix: UNPACKED_SUFFIX.to_string(),
            default_password: DEFAULT_PASSWORD.to_string(),
            max_name_length: MAX_NAME_LENGTH,
            log_filter: None,
        }
    }
}

impl DocIdConfig {
    /// Load and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> DocIdResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> DocIdResult<Self> {
        let config: DocIdConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> DocIdResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    pub fn validate(&self) -> DocIdResult<()> {
        if self.unpacked_suffix.is_empty() {
            return Err(DocIdError::Config("unpacked_suffix must not be empty".into()));
        }
        if self.unpacked_suffix.chars().any(std::path::is_separator) {
            return Err(DocIdError::Config(format!(
                "unpacked_suffix contains a path separator: {:?}",
                self.unpacked_suffix
            )));
        }
        if self.max_name_length == 0 {
            return Err(DocIdError::Config("max_name_length must be at least 1".into()));
        }
        if let Some(filter) = &self.log_filter {
            tracing_subscriber::EnvFilter::try_new(filter)
                .map_err(|e| DocIdError::Config(format!("Invalid log_filter {:?}: {}", filter, e)))?;
        }
        Ok(())
    }

    pub fn encryption_detector(&self) -> EncryptionDetector {
        EncryptionDetector::new(self.default_password.clone())
    }

    pub fn lineage_resolver(&self) -> LineageResolver {
        LineageResolver::with_suffix(self.unpacked_suffix.clone())
    }

    pub fn name_sanitizer(&self) -> NameSanitizer {
        NameSanitizer::new(self.max_name_length)
    }
}
