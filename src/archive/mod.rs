//! ZIP container support
//!
//! ## ZIP Format
//! - Layout: [Local Headers][Data][Central Directory][EOCD]
//! - Metadata authority: Central Directory (not Local File Headers)
//! - Signatures: PK\x03\x04 (Local), PK\x01\x02 (Central), PK\x05\x06 (EOCD)
//!
//! OOXML documents (.docx/.xlsx/.pptx) are ZIP archives following the Open
//! Packaging Conventions. Password-protected OOXML documents are *not* ZIP
//! archives at all: they are wrapped in an OLE2 compound file and handled by
//! `office`.

pub mod zip;

pub use self::zip::{has_empty_zip_entry, scan_package, try_has_empty_zip_entry, PackageScan};

/// Extensions of ZIP-packaged office formats
pub const OOXML_EXTENSIONS: &[&str] = &[
    "docx", "docm", "dotx", "dotm", "xlsx", "xlsm", "xltx", "xltm", "xlsb", "pptx", "pptm",
    "potx", "potm", "ppsx", "ppsm",
];

/// Check if a (lowercase) extension belongs to an OOXML format
pub fn is_ooxml_extension(extension: &str) -> bool {
    OOXML_EXTENSIONS.contains(&extension)
}
