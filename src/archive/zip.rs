//! ZIP central directory inspection
//!
//! Two questions are asked of ZIP containers:
//! - does any central directory entry carry an empty (or whitespace-only)
//!   name? Well-formed archives never do; it signals corruption or a crafted file.
//! - is the archive an OPC package (`[Content_Types].xml` present) and are any
//!   of its parts flagged encrypted?
//!
//! ## Central Directory Entry (subset)
//! | Offset | Size | Field                    |
//! |--------|------|--------------------------|
//! | 0x00   | 4    | Signature (PK\x01\x02)   |
//! | 0x08   | 2    | General purpose flags    |
//! | 0x1C   | 2    | File name length         |
//! | 0x2E   | n    | File name                |
//!
//! Flag bit 0 marks the entry data as encrypted.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::{debug, instrument, warn};

use crate::error::{DocIdError, DocIdResult};

/// OPC packages always carry this part at the archive root
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

// =============================================================================
// Empty Entry Detection
// =============================================================================

/// Check for an empty-name entry, surfacing open/parse failures
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn try_has_empty_zip_entry(path: impl AsRef<Path>) -> DocIdResult<bool> {
    let file = File::open(path.as_ref())?;
    let archive = zip::ZipArchive::new(BufReader::new(file))?;

    let found = archive.file_names().any(|name| name.trim().is_empty());
    if found {
        debug!(entries = archive.len(), "Archive has an entry with an empty name");
    }
    Ok(found)
}

/// Check whether any ZIP entry name is empty or whitespace-only.
///
/// Only meaningful for files already classified as ZIP; anything that cannot
/// be parsed as a ZIP archive yields `false`.
pub fn has_empty_zip_entry(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    match try_has_empty_zip_entry(path) {
        Ok(found) => found,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ZIP entry check failed");
            false
        }
    }
}

// =============================================================================
// OPC Package Scan
// =============================================================================

/// What opening a ZIP as an OPC package revealed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageScan {
    /// Opened as a package, no part flagged encrypted
    Plain,
    /// At least one part carries the encryption flag
    EncryptedParts(Vec<String>),
    /// Valid ZIP but no `[Content_Types].xml`; not a package
    NotAPackage,
}

/// Open `path` as an OPC (OOXML) package.
///
/// ZIP parse failures are returned as errors; callers decide what an
/// unopenable package means.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn scan_package(path: impl AsRef<Path>) -> DocIdResult<PackageScan> {
    let file = File::open(path.as_ref())?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))?;

    if !archive.file_names().any(|name| name == CONTENT_TYPES_PART) {
        debug!(entries = archive.len(), "ZIP has no content types part");
        return Ok(PackageScan::NotAPackage);
    }

    let mut encrypted = Vec::new();
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i).map_err(DocIdError::Zip)?;
        if entry.encrypted() {
            encrypted.push(entry.name().to_string());
        }
    }

    if encrypted.is_empty() {
        Ok(PackageScan::Plain)
    } else {
        debug!(parts = ?encrypted, "Package parts flagged encrypted");
        Ok(PackageScan::EncryptedParts(encrypted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{build_zip, minimal_docx_entries, write_file, FixtureEntry};

    #[test]
    fn test_empty_entry_name_detected() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = build_zip(&[
            FixtureEntry::new("readme.txt", b"hello"),
            FixtureEntry::new("", b"payload"),
        ]);
        let path = write_file(dir.path(), "odd.zip", &bytes);

        assert!(has_empty_zip_entry(&path));
    }

    #[test]
    fn test_whitespace_entry_name_detected() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = build_zip(&[FixtureEntry::new("   ", b"x")]);
        let path = write_file(dir.path(), "blank.zip", &bytes);

        assert!(has_empty_zip_entry(&path));
    }

    #[test]
    fn test_repeated_empty_entry_names_detected() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = build_zip(&[FixtureEntry::new("", b"one"), FixtureEntry::new("", b"two")]);
        let path = write_file(dir.path(), "twice.zip", &bytes);

        assert!(try_has_empty_zip_entry(&path).unwrap());
        assert!(has_empty_zip_entry(&path));
    }

    #[test]
    fn test_well_formed_zip_has_no_empty_entry() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = build_zip(&[
            FixtureEntry::new("a.txt", b"alpha"),
            FixtureEntry::new("nested/b.txt", b"beta"),
        ]);
        let path = write_file(dir.path(), "ok.zip", &bytes);

        assert!(!has_empty_zip_entry(&path));
        assert!(!try_has_empty_zip_entry(&path).unwrap());
    }

    #[test]
    fn test_non_zip_is_false_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "fake.zip", b"PK\x03\x04 but nothing else");

        assert!(!has_empty_zip_entry(&path));
        assert!(matches!(try_has_empty_zip_entry(&path), Err(DocIdError::Zip(_))));
        assert!(!has_empty_zip_entry(dir.path().join("missing.zip")));
    }

    #[test]
    fn test_scan_plain_package() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "doc.docx", &build_zip(&minimal_docx_entries()));

        assert_eq!(scan_package(&path).unwrap(), PackageScan::Plain);
    }

    #[test]
    fn test_scan_encrypted_parts() {
        let dir = tempfile::tempdir().unwrap();
        let mut entries = minimal_docx_entries();
        entries.push(FixtureEntry::new("word/secret.xml", b"\x01\x02\x03\x04").encrypted());
        let path = write_file(dir.path(), "locked.docx", &build_zip(&entries));

        assert_eq!(
            scan_package(&path).unwrap(),
            PackageScan::EncryptedParts(vec!["word/secret.xml".to_string()])
        );
    }

    #[test]
    fn test_scan_plain_zip_is_not_a_package() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "data.zip", &build_zip(&[FixtureEntry::new("a.csv", b"1,2")]));

        assert_eq!(scan_package(&path).unwrap(), PackageScan::NotAPackage);
    }
}
