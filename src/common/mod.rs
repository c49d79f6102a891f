// Common utilities shared across the sniffing and detection modules

pub mod binary;
pub mod magic;

// Re-exports for convenience
pub use magic::{
    classify, detect_format, is_ole2_file, is_pdf_file, is_zip_file, sniff_reader, try_classify,
    FormatKind,
};
