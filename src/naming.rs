//! File name hygiene
//!
//! Names of extracted entries come from untrusted archives. Before the
//! pipeline writes them to disk (and appends `_unpacked` to build an
//! extraction directory) they are made portable:
//! - characters reserved on Windows are replaced with `_`
//! - reserved device names (`CON`, `LPT1`, ...) get a leading `_`
//! - names are cut to a length that leaves room for the suffix
//! - control characters and surrounding whitespace are removed
//!
//! Collisions are resolved with a `name(n).ext` counter.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

/// Longest name `sanitize_name` produces, in characters
pub const MAX_NAME_LENGTH: usize = 240;

const RESERVED_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

const RESERVED_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

// =============================================================================
// Sanitizing
// =============================================================================

/// Name sanitizer with a configurable length cap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameSanitizer {
    max_len: usize,
}

impl Default for NameSanitizer {
    fn default() -> Self {
        Self::new(MAX_NAME_LENGTH)
    }
}

impl NameSanitizer {
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn sanitize_name(&self, name: &str) -> String {
        let replaced: String = name
            .chars()
            .map(|c| if RESERVED_CHARS.contains(&c) { '_' } else { c })
            .collect();

        let upper = replaced.to_uppercase();
        let prefixed = if RESERVED_DEVICE_NAMES.contains(&upper.as_str()) {
            format!("_{}", replaced)
        } else {
            replaced
        };

        let truncated: String = prefixed.chars().take(self.max_len).collect();

        let visible: String = truncated.chars().filter(|c| !c.is_control()).collect();
        visible.trim().to_string()
    }

    pub fn sanitize_path(&self, path: &Path) -> PathBuf {
        path.components()
            .map(|component| match component {
                Component::Normal(part) => {
                    PathBuf::from(self.sanitize_name(&part.to_string_lossy()))
                }
                other => PathBuf::from(other.as_os_str()),
            })
            .collect()
    }
}

/// Make a single path component safe to create on any common file system
pub fn sanitize_name(name: &str) -> String {
    NameSanitizer::default().sanitize_name(name)
}

/// Sanitize every normal component of `path`, keeping root and prefix
pub fn sanitize_path(path: &Path) -> PathBuf {
    NameSanitizer::default().sanitize_path(path)
}

// =============================================================================
// Collisions
// =============================================================================

/// Return `name` if `dir` has no entry with that name, else the first free
/// `base(n)ext`.
///
/// The split happens at the last dot, so `archive.tar.gz` becomes
/// `archive.tar(1).gz` and `.profile` becomes `(1).profile`. Another writer
/// can take the name between this check and its use.
pub fn resolve_duplicate_name(dir: &Path, name: &str) -> String {
    if !dir.join(name).exists() {
        return name.to_string();
    }

    let (base, extension) = match name.rfind('.') {
        Some(dot) => name.split_at(dot),
        None => (name, ""),
    };

    let mut counter: u64 = 1;
    loop {
        let candidate = format!("{}({}){}", base, counter, extension);
        if !dir.join(&candidate).exists() {
            debug!(dir = %dir.display(), name, candidate = %candidate, "Resolved name collision");
            return candidate;
        }
        counter += 1;
    }
}

/// `dir` joined with a non-colliding version of `name`
pub fn resolve_duplicate_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(resolve_duplicate_name(dir, name))
}

// =============================================================================
// Small Helpers
// =============================================================================

/// Lowercase extension of the file name, empty for dotfiles and names
/// ending in a dot
pub fn file_extension(path: impl AsRef<Path>) -> String {
    let name = match path.as_ref().file_name() {
        Some(name) => name.to_string_lossy(),
        None => return String::new(),
    };
    match name.rfind('.') {
        Some(dot) if dot > 0 && dot < name.len() - 1 => name[dot + 1..].to_lowercase(),
        _ => String::new(),
    }
}

/// Total size of all regular files below `dir`.
///
/// Entries that cannot be read are skipped. Symlinks are followed without
/// cycle detection.
pub fn folder_size(dir: impl AsRef<Path>) -> u64 {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return 0;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "Cannot list directory");
            return 0;
        }
    };

    let mut total = 0u64;
    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => total += folder_size(&path),
            Ok(meta) if meta.is_file() => total += meta.len(),
            Ok(_) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable entry"),
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_characters_replaced() {
        assert_eq!(sanitize_name("a:b*c"), "a_b_c");
        assert_eq!(sanitize_name(r#"x\y/z?"<>|"#), "x_y_z_____");
    }

    #[test]
    fn test_device_names_prefixed() {
        assert_eq!(sanitize_name("CON"), "_CON");
        assert_eq!(sanitize_name("lpt3"), "_lpt3");
        assert_eq!(sanitize_name("COM0"), "COM0");
        assert_eq!(sanitize_name("CON.txt"), "CON.txt");
    }

    #[test]
    fn test_long_names_truncated() {
        let long = "a".repeat(300);
        assert_eq!(sanitize_name(&long).chars().count(), MAX_NAME_LENGTH);

        let wide = "é".repeat(300);
        assert_eq!(sanitize_name(&wide).chars().count(), MAX_NAME_LENGTH);

        assert_eq!(NameSanitizer::new(4).sanitize_name("abcdef"), "abcd");
    }

    #[test]
    fn test_whitespace_and_control_characters_removed() {
        assert_eq!(sanitize_name("  report.pdf \t"), "report.pdf");
        assert_eq!(sanitize_name("re\u{0007}port\u{0000}.pdf"), "report.pdf");
        assert_eq!(sanitize_name(""), "");
    }

    #[test]
    fn test_whitespace_behind_control_characters_trimmed() {
        assert_eq!(sanitize_name("\u{0007} report.pdf \u{001B}"), "report.pdf");
        assert_eq!(sanitize_name("\u{0000}\t\r\n"), "");
    }

    #[test]
    fn test_sanitize_path_keeps_structure() {
        let clean = sanitize_path(Path::new("/data/a:b/CON/file?.txt"));
        assert_eq!(clean, PathBuf::from("/data/a_b/_CON/file_.txt"));
    }

    #[test]
    fn test_duplicate_names_get_counter() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve_duplicate_name(dir.path(), "report.pdf"), "report.pdf");

        fs::write(dir.path().join("report.pdf"), b"1").unwrap();
        assert_eq!(resolve_duplicate_name(dir.path(), "report.pdf"), "report(1).pdf");

        fs::write(dir.path().join("report(1).pdf"), b"2").unwrap();
        assert_eq!(
            resolve_duplicate_path(dir.path(), "report.pdf"),
            dir.path().join("report(2).pdf")
        );
    }

    #[test]
    fn test_duplicate_split_at_last_dot() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["archive.tar.gz", "README", ".profile"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        assert_eq!(resolve_duplicate_name(dir.path(), "archive.tar.gz"), "archive.tar(1).gz");
        assert_eq!(resolve_duplicate_name(dir.path(), "README"), "README(1)");
        assert_eq!(resolve_duplicate_name(dir.path(), ".profile"), "(1).profile");
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("/a/Report.DOCX"), "docx");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
        assert_eq!(file_extension(".bashrc"), "");
        assert_eq!(file_extension("name."), "");
        assert_eq!(file_extension("noext"), "");
    }

    #[test]
    fn test_folder_size() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.bin"), vec![0u8; 100]).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("b.bin"), vec![0u8; 23]).unwrap();

        assert_eq!(folder_size(dir.path()), 123);
        assert_eq!(folder_size(dir.path().join("a.bin")), 0);
        assert_eq!(folder_size(dir.path().join("missing")), 0);
    }
}
