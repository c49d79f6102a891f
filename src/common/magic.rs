//! Container type detection via magic signatures
//!
//! Classifies a file as OLE2, PDF or ZIP from its leading bytes, without
//! relying on the file extension. Extensions in an ingestion batch are
//! frequently wrong or missing.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace, warn};

use crate::error::{DocIdError, DocIdResult};

// =============================================================================
// Magic Signatures Reference
// =============================================================================
// Format  | Magic Bytes              | Hex                      | Location
// --------|--------------------------|--------------------------|----------
// OLE2    | \xd0\xcf\x11\xe0...      | D0 CF 11 E0 A1 B1 1A E1  | Offset 0
// PDF     | %PDF-                    | 25 50 44 46 2D           | Offset 0
// ZIP     | PK\x03\x04               | 50 4B 03 04              | Offset 0
// ZIP     | PK\x05\x06 (empty)       | 50 4B 05 06              | Offset 0
// ZIP     | PK\x07\x08 (spanned)     | 50 4B 07 08              | Offset 0
// =============================================================================

/// Microsoft Compound File Binary header (legacy .doc/.xls/.ppt, encrypted OOXML)
pub const OLE2_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// PDF header, including the version dash
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// ZIP signature prefix; followed by one byte of `ZIP_THIRD_BYTES` and one of `ZIP_FOURTH_BYTES`
pub const ZIP_MAGIC_PREFIX: &[u8] = b"PK";
const ZIP_THIRD_BYTES: [u8; 3] = [0x03, 0x05, 0x07];
const ZIP_FOURTH_BYTES: [u8; 3] = [0x04, 0x06, 0x08];
const ZIP_SIGNATURE_LEN: usize = 4;

/// Bytes needed to test every known signature
pub const MAX_SIGNATURE_LEN: usize = 8;

// =============================================================================
// Format Kind
// =============================================================================

/// Container format derived from the leading byte signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatKind {
    /// Compound File Binary (legacy Office, encrypted OOXML)
    Ole2,
    /// Portable Document Format
    Pdf,
    /// ZIP local header, empty archive or spanned archive marker
    Zip,
    /// No signature matched, file too short, or unreadable
    Unknown,
}

impl FormatKind {
    pub fn name(&self) -> &'static str {
        match self {
            FormatKind::Ole2 => "OLE2",
            FormatKind::Pdf => "PDF",
            FormatKind::Zip => "ZIP",
            FormatKind::Unknown => "UNKNOWN",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, FormatKind::Unknown)
    }
}

impl std::fmt::Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Magic Detection
// =============================================================================

/// Classify header bytes.
///
/// Signatures are tested OLE2, then PDF, then ZIP; the first match wins.
/// A header shorter than a signature never matches that signature.
pub fn detect_format(header: &[u8]) -> FormatKind {
    if header.starts_with(OLE2_MAGIC) {
        return FormatKind::Ole2;
    }

    if header.starts_with(PDF_MAGIC) {
        return FormatKind::Pdf;
    }

    if is_zip_signature(header) {
        return FormatKind::Zip;
    }

    FormatKind::Unknown
}

fn is_zip_signature(header: &[u8]) -> bool {
    header.len() >= ZIP_SIGNATURE_LEN
        && header.starts_with(ZIP_MAGIC_PREFIX)
        && ZIP_THIRD_BYTES.contains(&header[2])
        && ZIP_FOURTH_BYTES.contains(&header[3])
}

/// Read at most `MAX_SIGNATURE_LEN` bytes from a reader and classify them
pub fn sniff_reader<R: Read>(reader: R) -> io::Result<FormatKind> {
    let mut header = Vec::with_capacity(MAX_SIGNATURE_LEN);
    reader
        .take(MAX_SIGNATURE_LEN as u64)
        .read_to_end(&mut header)?;
    Ok(detect_format(&header))
}

/// Classify a file, surfacing open/read failures
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn try_classify(path: impl AsRef<Path>) -> DocIdResult<FormatKind> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut header = Vec::with_capacity(MAX_SIGNATURE_LEN);
    file.take(MAX_SIGNATURE_LEN as u64)
        .read_to_end(&mut header)
        .map_err(DocIdError::Io)?;

    let kind = detect_format(&header);
    if kind.is_known() {
        debug!(format = %kind, "Detected container signature");
    } else {
        trace!(header = %hex::encode(&header), "No known signature");
    }
    Ok(kind)
}

/// Classify a file; I/O failures are logged and reported as `Unknown`
pub fn classify(path: impl AsRef<Path>) -> FormatKind {
    let path = path.as_ref();
    match try_classify(path) {
        Ok(kind) => kind,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Signature check failed");
            FormatKind::Unknown
        }
    }
}

/// Check if a file carries the OLE2 compound file signature
pub fn is_ole2_file(path: impl AsRef<Path>) -> bool {
    classify(path) == FormatKind::Ole2
}

/// Check if an existing regular file carries the PDF signature
pub fn is_pdf_file(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    path.is_file() && classify(path) == FormatKind::Pdf
}

/// Check if an existing regular file carries a ZIP signature
pub fn is_zip_file(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    path.is_file() && classify(path) == FormatKind::Zip
}

// =============================================================================
// Tests
// =============================================================================
