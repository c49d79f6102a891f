//! Content-addressed file identifiers
//!
//! An identifier is the SHA-256 digest of an absolute path, encoded as
//! URL-safe base64 without padding and cut to 22 characters (132 bits).
//! The same path always yields the same identifier on every platform, so a
//! pipeline can recompute the id of an ancestor archive from its path alone.

use std::path::Path;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

/// Length of every identifier produced by this module
pub const IDENTIFIER_LEN: usize = 22;

/// Stable 22-character URL-safe document identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    fn from_digest(digest: &[u8]) -> Self {
        let mut encoded = URL_SAFE_NO_PAD.encode(digest);
        encoded.truncate(IDENTIFIER_LEN);
        Identifier(encoded)
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

/// Deterministic identifier of an absolute path string
pub fn path_identifier(absolute_path: &str) -> Identifier {
    let digest = Sha256::digest(absolute_path.as_bytes());
    Identifier::from_digest(&digest)
}

/// Identifier of `path` after making it absolute.
///
/// Relative paths are resolved against the current directory without
/// following symlinks. Returns `None` for paths that are not valid UTF-8.
pub fn file_identifier(path: &Path) -> Option<Identifier> {
    let absolute = match std::path::absolute(path) {
        Ok(absolute) => absolute,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot make path absolute");
            return None;
        }
    };
    match absolute.to_str() {
        Some(text) => Some(path_identifier(text)),
        None => {
            warn!(path = %absolute.display(), "Path is not valid UTF-8, no identifier");
            None
        }
    }
}

/// Fresh random identifier with the same shape as a path identifier
pub fn random_identifier() -> Identifier {
    let uuid = uuid::Uuid::new_v4();
    Identifier::from_digest(uuid.as_bytes())
}
