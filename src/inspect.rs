//! One-shot inspection of a single file
//!
//! Runs the full preprocessing pass and collects the answers in a
//! serialisable report:
//!
//! ```text
//! path ──► classify ──► [encryption check] ──► identifier ──► lineage
//!              │          OLE2, or ZIP with an OOXML extension
//!              └──► empty ZIP entry scan (ZIP only)
//! ```

use std::path::Path;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::archive::{has_empty_zip_entry, is_ooxml_extension};
use crate::common::magic::{try_classify, FormatKind};
use crate::config::DocIdConfig;
use crate::error::{DocIdError, DocIdResult};
use crate::identity::{path_identifier, Identifier};
use crate::lineage::LineageResolver;
use crate::naming::file_extension;
use crate::office::{EncryptionDetector, EncryptionStatus};

/// Everything the preprocessing pass learns about one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    /// Absolute path the identifiers were derived from
    pub path: String,
    pub size: u64,
    pub extension: String,
    pub format: FormatKind,
    /// Present only for office containers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionStatus>,
    /// Present only for ZIP containers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_empty_zip_entry: Option<bool>,
    pub identifier: Identifier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_identifier: Option<Identifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_identifier: Option<Identifier>,
}

impl FileReport {
    /// True when the file came out of an extracted archive
    pub fn is_extracted(&self) -> bool {
        self.parent_identifier.is_some()
    }
}

/// Runs the preprocessing pass with a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct Inspector {
    detector: EncryptionDetector,
    resolver: LineageResolver,
}

impl Inspector {
    pub fn new(detector: EncryptionDetector, resolver: LineageResolver) -> Self {
        Self { detector, resolver }
    }

    pub fn from_config(config: &DocIdConfig) -> Self {
        Self::new(config.encryption_detector(), config.lineage_resolver())
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn inspect(&self, path: impl AsRef<Path>) -> DocIdResult<FileReport> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(DocIdError::InvalidInput(format!(
                "Not a regular file: {}",
                path.display()
            )));
        }

        let absolute = std::path::absolute(path)?;
        let absolute = absolute.to_str().ok_or_else(|| {
            DocIdError::InvalidInput(format!("Path is not valid UTF-8: {}", absolute.display()))
        })?;

        let extension = file_extension(path);
        let format = try_classify(path)?;

        let encryption = match format {
            FormatKind::Ole2 => Some(self.detector.check(path)),
            FormatKind::Zip if is_ooxml_extension(&extension) => Some(self.detector.check(path)),
            _ => None,
        };
        let has_empty_entry = match format {
            FormatKind::Zip => Some(has_empty_zip_entry(path)),
            _ => None,
        };

        let report = FileReport {
            path: absolute.to_string(),
            size: metadata.len(),
            extension,
            format,
            encryption,
            has_empty_zip_entry: has_empty_entry,
            identifier: path_identifier(absolute),
            parent_identifier: self.resolver.immediate_parent_identifier(absolute),
            root_identifier: self.resolver.root_ancestor_identifier(absolute),
        };
        debug!(format = %report.format, identifier = %report.identifier, "File inspected");
        Ok(report)
    }
}

/// Inspect `path` with default settings
pub fn inspect(path: impl AsRef<Path>) -> DocIdResult<FileReport> {
    Inspector::default().inspect(path)
}
