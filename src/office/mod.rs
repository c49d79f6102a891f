//! Office document encryption detection
//!
//! Answers "does this document need a password to open?" for legacy
//! compound-file documents (.doc/.xls/.ppt), password-protected OOXML (which
//! is stored as a compound file too) and plain OOXML packages.
//!
//! ## Decision table
//! | Container | Observation                               | Status         |
//! |-----------|-------------------------------------------|----------------|
//! | OLE2      | cannot be opened as a compound file       | Indeterminate  |
//! | OLE2      | no `EncryptionInfo` stream                | NotEncrypted   |
//! | OLE2      | default password verifies                 | NotEncrypted   |
//! | OLE2      | default password rejected                 | Encrypted      |
//! | OLE2      | `EncryptionInfo` unreadable / unsupported | Encrypted      |
//! | other     | not a ZIP / not an OPC package            | Indeterminate  |
//! | other     | any part flagged encrypted                | Encrypted      |
//! | other     | package opens                             | NotEncrypted   |
//! | any       | missing / not a regular file              | NotEncrypted (logged) |
//!
//! ## Module Structure
//! ```text
//! office/
//! ├── mod.rs             - EncryptionStatus, EncryptionDetector
//! ├── encryption_info.rs - EncryptionInfo stream parsing (Standard, Agile)
//! └── verify.rs          - Key derivation and verifier checks
//! ```

pub mod encryption_info;
pub mod verify;

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::archive::{scan_package, PackageScan};
use crate::common::magic::{try_classify, FormatKind};
use crate::error::{DocIdError, DocIdResult};

/// Password Office applies when a document is "protected" without a user secret
pub const DEFAULT_PASSWORD: &str = "VelvetSweatshop";

/// Compound file stream holding the encryption parameters
pub const ENCRYPTION_INFO_STREAM: &str = "/EncryptionInfo";

// =============================================================================
// Encryption Status
// =============================================================================

/// Outcome of an encryption check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncryptionStatus {
    /// A real password is required
    Encrypted,
    /// Opens without a password (or with the Office default)
    NotEncrypted,
    /// Container could not be opened for reasons unrelated to encryption
    Indeterminate,
}

impl EncryptionStatus {
    pub fn name(&self) -> &'static str {
        match self {
            EncryptionStatus::Encrypted => "ENCRYPTED",
            EncryptionStatus::NotEncrypted => "NOT_ENCRYPTED",
            EncryptionStatus::Indeterminate => "INDETERMINATE",
        }
    }

    /// True only for a verified password requirement
    pub fn is_encrypted(&self) -> bool {
        matches!(self, EncryptionStatus::Encrypted)
    }

    /// True unless the document was verified to open without a secret
    pub fn may_be_encrypted(&self) -> bool {
        !matches!(self, EncryptionStatus::NotEncrypted)
    }
}

impl std::fmt::Display for EncryptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Detector
// =============================================================================

/// Encryption detector configured with the password tried on protected documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionDetector {
    default_password: String,
}

impl Default for EncryptionDetector {
    fn default() -> Self {
        Self::new(DEFAULT_PASSWORD)
    }
}

impl EncryptionDetector {
    pub fn new(default_password: impl Into<String>) -> Self {
        Self {
            default_password: default_password.into(),
        }
    }

    pub fn default_password(&self) -> &str {
        &self.default_password
    }

    /// Check `path`; missing or non-regular input is an error
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn try_check(&self, path: impl AsRef<Path>) -> DocIdResult<EncryptionStatus> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|e| {
            DocIdError::InvalidInput(format!("Cannot stat {}: {}", path.display(), e))
        })?;
        if !metadata.is_file() {
            return Err(DocIdError::InvalidInput(format!(
                "Not a regular file: {}",
                path.display()
            )));
        }

        let status = match try_classify(path)? {
            FormatKind::Ole2 => self.check_compound_file(path),
            _ => check_package(path),
        };
        debug!(status = %status, "Encryption check finished");
        Ok(status)
    }

    /// Check `path`; invalid input is logged and reported as `NotEncrypted`
    pub fn check(&self, path: impl AsRef<Path>) -> EncryptionStatus {
        let path = path.as_ref();
        match self.try_check(path) {
            Ok(status) => status,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Office encryption check failed");
                EncryptionStatus::NotEncrypted
            }
        }
    }

    fn check_compound_file(&self, path: &Path) -> EncryptionStatus {
        let mut compound = match cfb::open(path) {
            Ok(compound) => compound,
            Err(e) => {
                debug!(error = %e, "Not a readable compound file");
                return EncryptionStatus::Indeterminate;
            }
        };

        if !compound.is_stream(ENCRYPTION_INFO_STREAM) {
            debug!("No EncryptionInfo stream");
            return EncryptionStatus::NotEncrypted;
        }

        let mut data = Vec::new();
        let read = compound
            .open_stream(ENCRYPTION_INFO_STREAM)
            .and_then(|mut stream| stream.read_to_end(&mut data));
        if let Err(e) = read {
            debug!(error = %e, "EncryptionInfo stream unreadable, treating as encrypted");
            return EncryptionStatus::Encrypted;
        }

        let verified = encryption_info::parse(&data)
            .and_then(|info| verify::verify_password(&info, &self.default_password));
        match verified {
            Ok(true) => EncryptionStatus::NotEncrypted,
            Ok(false) => EncryptionStatus::Encrypted,
            Err(e) => {
                debug!(error = %e, "EncryptionInfo rejected, treating as encrypted");
                EncryptionStatus::Encrypted
            }
        }
    }
}

fn check_package(path: &Path) -> EncryptionStatus {
    match scan_package(path) {
        Ok(PackageScan::Plain) => EncryptionStatus::NotEncrypted,
        Ok(PackageScan::EncryptedParts(_)) => EncryptionStatus::Encrypted,
        Ok(PackageScan::NotAPackage) => EncryptionStatus::Indeterminate,
        Err(e) => {
            debug!(error = %e, "Package could not be opened");
            EncryptionStatus::Indeterminate
        }
    }
}

// =============================================================================
// Free Functions
// =============================================================================

/// Check with the Office default password
pub fn check_encryption(path: impl AsRef<Path>) -> EncryptionStatus {
    EncryptionDetector::default().check(path)
}

/// Check with the Office default password, surfacing invalid input
pub fn try_check_encryption(path: impl AsRef<Path>) -> DocIdResult<EncryptionStatus> {
    EncryptionDetector::default().try_check(path)
}

/// Lenient boolean answer: `Indeterminate` collapses to `false`
pub fn is_office_file_encrypted(path: impl AsRef<Path>) -> bool {
    check_encryption(path).is_encrypted()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::office::verify::tests::{agile_stream_for, standard_stream_for};
    use crate::test_support::{build_zip, minimal_docx_entries, write_file, FixtureEntry};
    use std::io::Write;
    use std::path::PathBuf;

    fn compound_file(dir: &Path, name: &str, streams: &[(&str, &[u8])]) -> PathBuf {
        let path = dir.join(name);
        let mut compound = cfb::create(&path).unwrap();
        for (stream_name, bytes) in streams {
            let mut stream = compound.create_stream(stream_name).unwrap();
            stream.write_all(bytes).unwrap();
        }
        compound.flush().unwrap();
        path
    }

    #[test]
    fn test_plain_ooxml_is_not_encrypted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "report.docx", &build_zip(&minimal_docx_entries()));

        assert_eq!(check_encryption(&path), EncryptionStatus::NotEncrypted);
        assert!(!is_office_file_encrypted(&path));
    }

    #[test]
    fn test_password_protected_ooxml_is_encrypted() {
        // Saved with a password, an OOXML document becomes a compound file
        let dir = tempfile::tempdir().unwrap();
        let stream = agile_stream_for("correct horse", "SHA512", 1000);
        let path = compound_file(
            dir.path(),
            "report.docx",
            &[("/EncryptionInfo", stream.as_slice()), ("/EncryptedPackage", &[0u8; 64][..])],
        );

        assert_eq!(check_encryption(&path), EncryptionStatus::Encrypted);
        assert!(is_office_file_encrypted(&path));
    }

    #[test]
    fn test_default_password_document_is_not_encrypted() {
        let dir = tempfile::tempdir().unwrap();
        let stream = standard_stream_for(DEFAULT_PASSWORD);
        let path = compound_file(dir.path(), "readonly.xlsx", &[("/EncryptionInfo", stream.as_slice())]);

        assert_eq!(check_encryption(&path), EncryptionStatus::NotEncrypted);

        // A detector trying another password sees it as locked
        let strict = EncryptionDetector::new("something else");
        assert_eq!(strict.check(&path), EncryptionStatus::Encrypted);
    }

    #[test]
    fn test_legacy_document_without_encryption_info() {
        let dir = tempfile::tempdir().unwrap();
        let path = compound_file(dir.path(), "legacy.doc", &[("/WordDocument", &b"\xEC\xA5 body"[..])]);

        assert_eq!(check_encryption(&path), EncryptionStatus::NotEncrypted);
    }

    #[test]
    fn test_garbled_encryption_info_counts_as_encrypted() {
        let dir = tempfile::tempdir().unwrap();
        let path = compound_file(dir.path(), "odd.xls", &[("/EncryptionInfo", &b"\x09\x00\x09\x00junk"[..])]);

        assert_eq!(check_encryption(&path), EncryptionStatus::Encrypted);
    }

    #[test]
    fn test_oversized_spin_count_counts_as_encrypted() {
        let dir = tempfile::tempdir().unwrap();
        let stream = crate::office::encryption_info::tests::agile_stream(
            u32::MAX,
            "SHA512",
            64,
            256,
            &[9u8; 16],
            &[1u8; 16],
            &[2u8; 64],
        );
        let path = compound_file(dir.path(), "slow.docx", &[("/EncryptionInfo", stream.as_slice())]);

        assert_eq!(check_encryption(&path), EncryptionStatus::Encrypted);
    }

    #[test]
    fn test_broken_containers_are_indeterminate() {
        let dir = tempfile::tempdir().unwrap();

        let ole_header_only = write_file(dir.path(), "broken.doc", &[crate::common::magic::OLE2_MAGIC, &[0u8; 24][..]].concat());
        assert_eq!(check_encryption(&ole_header_only), EncryptionStatus::Indeterminate);

        let plain_zip = write_file(dir.path(), "data.zip", &build_zip(&[FixtureEntry::new("a.txt", b"a")]));
        assert_eq!(check_encryption(&plain_zip), EncryptionStatus::Indeterminate);

        let text = write_file(dir.path(), "notes.txt", b"just text");
        let status = check_encryption(&text);
        assert_eq!(status, EncryptionStatus::Indeterminate);
        assert!(status.may_be_encrypted());
        // The lenient shim collapses it
        assert!(!is_office_file_encrypted(&text));
    }

    #[test]
    fn test_invalid_input_defaults_to_not_encrypted() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.docx");

        assert_eq!(check_encryption(&missing), EncryptionStatus::NotEncrypted);
        assert!(matches!(try_check_encryption(&missing), Err(DocIdError::InvalidInput(_))));
        assert!(matches!(try_check_encryption(dir.path()), Err(DocIdError::InvalidInput(_))));
        assert_eq!(check_encryption(dir.path()), EncryptionStatus::NotEncrypted);
    }

    #[test]
    fn test_status_helpers() {
        assert!(EncryptionStatus::Encrypted.is_encrypted());
        assert!(!EncryptionStatus::Indeterminate.is_encrypted());
        assert!(EncryptionStatus::Indeterminate.may_be_encrypted());
        assert!(!EncryptionStatus::NotEncrypted.may_be_encrypted());
        assert_eq!(EncryptionStatus::NotEncrypted.to_string(), "NOT_ENCRYPTED");
    }
}
