//! docid: document sniffing, encryption detection and stable identity
//!
//! Preprocessing stage for a document-ingestion pipeline:
//! - classify files by binary signature (OLE2, PDF, ZIP)
//! - flag ZIP archives with empty entry names
//! - decide whether an office document needs a password
//! - derive a deterministic 22-character identifier from a path
//! - trace extracted files back through `_unpacked` directories to their
//!   parent and root archives
//! - clean extracted text and time batch work
//!
//! ```rust,no_run
//! let report = docid::inspect("/data/in/batch.zip_unpacked/memo.docx")?;
//! println!("{} {:?}", report.identifier, report.root_identifier);
//! # Ok::<(), docid::DocIdError>(())
//! ```

pub mod archive;
pub mod common;
pub mod config;
pub mod error;
pub mod identity;
pub mod inspect;
pub mod lineage;
pub mod logging;
pub mod naming;
pub mod office;
pub mod text;
pub mod timing;

#[cfg(test)]
mod test_support;

pub use archive::{has_empty_zip_entry, try_has_empty_zip_entry};
pub use common::{
    classify, detect_format, is_ole2_file, is_pdf_file, is_zip_file, sniff_reader, try_classify,
    FormatKind,
};
pub use config::DocIdConfig;
pub use error::{DocIdError, DocIdResult};
pub use identity::{file_identifier, path_identifier, random_identifier, Identifier};
pub use inspect::{inspect, FileReport, Inspector};
pub use lineage::{immediate_parent_identifier, root_ancestor_identifier, LineageResolver};
pub use naming::{resolve_duplicate_name, sanitize_name, NameSanitizer};
pub use office::{
    check_encryption, is_office_file_encrypted, try_check_encryption, EncryptionDetector,
    EncryptionStatus,
};
pub use text::{
    clean_html_text, clean_text, looks_like_base64, murmur_hash_hex, sanitize_email_address,
};
pub use timing::{format_date, format_elapsed, show_work_time, WorkTimer};
