//! Archive lineage from the `_unpacked` directory convention
//!
//! When the pipeline extracts `/in/a.zip` it writes the contents into
//! `/in/a.zip_unpacked/`. Extracting a nested archive repeats the pattern, so
//!
//! ```text
//! /in/a.zip_unpacked/b.zip_unpacked/c.txt
//!     ^^^^^^^^^^^^^^  ^^^^^^^^^^^^^^
//!     root ancestor   immediate parent
//! ```
//!
//! Recovering an ancestor is pure path arithmetic: cut the path text after
//! the matching component and drop the suffix. Neither the archive nor the
//! extraction directory has to exist.
//!
//! A component matches when it ends with the suffix and still has a name in
//! front of it. The last component is a candidate too, so the extraction
//! directory itself resolves the same with or without a trailing separator,
//! while a file such as `report_unpacked_final.txt` never matches.

use tracing::trace;

use crate::identity::{path_identifier, Identifier};

/// Suffix appended to an archive file name to name its extraction directory
pub const UNPACKED_SUFFIX: &str = "_unpacked";

/// Resolves ancestor archives for paths under extraction directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineageResolver {
    suffix: String,
}

impl Default for LineageResolver {
    fn default() -> Self {
        Self::with_suffix(UNPACKED_SUFFIX)
    }
}

impl LineageResolver {
    pub fn with_suffix(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Archive paths recovered from `path`, outermost first
    pub fn ancestor_paths<'a>(&self, path: &'a str) -> Vec<&'a str> {
        if self.suffix.is_empty() {
            return Vec::new();
        }

        let ancestors: Vec<&str> = component_ranges(path)
            .filter_map(|(start, end)| {
                let component = &path[start..end];
                let stripped_len = component.strip_suffix(self.suffix.as_str())?.len();
                if stripped_len == 0 {
                    return None;
                }
                Some(&path[..start + stripped_len])
            })
            .collect();

        trace!(path, count = ancestors.len(), "Resolved ancestor archives");
        ancestors
    }

    /// Identifiers of every ancestor archive, outermost first
    pub fn ancestor_identifiers(&self, path: &str) -> Vec<Identifier> {
        self.ancestor_paths(path)
            .into_iter()
            .map(path_identifier)
            .collect()
    }

    /// Identifier of the archive the file was extracted from directly
    pub fn immediate_parent_identifier(&self, path: &str) -> Option<Identifier> {
        self.ancestor_paths(path).last().map(|p| path_identifier(p))
    }

    /// Identifier of the outermost archive in the extraction chain
    pub fn root_ancestor_identifier(&self, path: &str) -> Option<Identifier> {
        self.ancestor_paths(path).first().map(|p| path_identifier(p))
    }
}

/// Byte ranges of every component, the last one included.
///
/// Ranges index into `path` directly so recovered prefixes keep the
/// original separators and spelling.
fn component_ranges(path: &str) -> impl Iterator<Item = (usize, usize)> {
    let ends: Vec<usize> = path
        .char_indices()
        .filter(|(_, c)| std::path::is_separator(*c))
        .map(|(i, _)| i)
        .chain(std::iter::once(path.len()))
        .collect();

    let mut start = 0;
    ends.into_iter().map(move |end| {
        let range = (start, end);
        // separators are ASCII on every platform
        start = end + 1;
        range
    })
}

// =============================================================================
// Free Functions
// =============================================================================

pub fn immediate_parent_identifier(path: &str) -> Option<Identifier> {
    LineageResolver::default().immediate_parent_identifier(path)
}

pub fn root_ancestor_identifier(path: &str) -> Option<Identifier> {
    LineageResolver::default().root_ancestor_identifier(path)
}

pub fn ancestor_paths(path: &str) -> Vec<&str> {
    LineageResolver::default().ancestor_paths(path)
}

pub fn ancestor_identifiers(path: &str) -> Vec<Identifier> {
    LineageResolver::default().ancestor_identifiers(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_level() {
        let path = "/data/in/a.zip_unpacked/b.txt";

        assert_eq!(
            immediate_parent_identifier(path),
            Some(path_identifier("/data/in/a.zip"))
        );
        assert_eq!(
            root_ancestor_identifier(path),
            Some(path_identifier("/data/in/a.zip"))
        );
    }

    #[test]
    fn test_nested_archives() {
        let path = "/data/in/a.zip_unpacked/b.zip_unpacked/c.txt";

        assert_eq!(
            ancestor_paths(path),
            vec!["/data/in/a.zip", "/data/in/a.zip_unpacked/b.zip"]
        );
        assert_eq!(
            immediate_parent_identifier(path),
            Some(path_identifier("/data/in/a.zip_unpacked/b.zip"))
        );
        assert_eq!(
            root_ancestor_identifier(path),
            Some(path_identifier("/data/in/a.zip"))
        );
        assert_eq!(ancestor_identifiers(path).len(), 2);
    }

    #[test]
    fn test_deep_file_inside_extraction() {
        let path = "/data/a.7z_unpacked/docs/2024/q1/report.pdf";
        assert_eq!(ancestor_paths(path), vec!["/data/a.7z"]);
    }

    #[test]
    fn test_no_marker_means_no_lineage() {
        let path = "/data/in/plain/report.pdf";

        assert_eq!(immediate_parent_identifier(path), None);
        assert_eq!(root_ancestor_identifier(path), None);
        assert!(ancestor_identifiers(path).is_empty());
    }

    #[test]
    fn test_marker_inside_file_name_is_ignored() {
        assert_eq!(immediate_parent_identifier("/data/report_unpacked_final.txt"), None);
        assert_eq!(immediate_parent_identifier("/data/_unpacked"), None);
    }

    #[test]
    fn test_extraction_directory_resolves_with_or_without_trailing_separator() {
        let archive_id = Some(path_identifier("/in/a.zip"));

        assert_eq!(immediate_parent_identifier("/in/a.zip_unpacked"), archive_id);
        assert_eq!(immediate_parent_identifier("/in/a.zip_unpacked/"), archive_id);
        assert_eq!(
            ancestor_paths("/in/a.zip_unpacked/b.zip_unpacked"),
            vec!["/in/a.zip", "/in/a.zip_unpacked/b.zip"]
        );
    }

    #[test]
    fn test_marker_mid_component_is_ignored() {
        assert!(ancestor_paths("/data/a_unpacked_old/b.txt").is_empty());
        assert!(ancestor_paths("/data/_unpacked/b.txt").is_empty());
    }

    #[test]
    fn test_relative_paths() {
        assert_eq!(ancestor_paths("a.zip_unpacked/b.txt"), vec!["a.zip"]);
    }

    #[test]
    fn test_custom_suffix() {
        let resolver = LineageResolver::with_suffix(".d");
        assert_eq!(resolver.ancestor_paths("/x/a.tar.d/f"), vec!["/x/a.tar"]);
        assert!(resolver.ancestor_paths("/x/a.zip_unpacked/f").is_empty());

        assert!(LineageResolver::with_suffix("").ancestor_paths("/x/a/f").is_empty());
    }
}
