//! Storage keys derived from document paths

use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};

/// Stable identifier of a document's annotation store
///
/// Lowercase hex SHA-256 of the document's absolute path. Distinct paths
/// give distinct keys; the same path always gives the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey(String);

impl StorageKey {
    /// Key for the document at `doc_path`
    ///
    /// Relative paths are resolved against the current directory. The path
    /// does not need to exist.
    pub fn for_document(doc_path: &Path) -> Self {
        let absolute = absolute_path(doc_path);
        let mut hasher = Sha256::new();
        hasher.update(absolute.to_string_lossy().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the XFDF store
    pub fn xfdf_file_name(&self) -> String {
        format!("{}.xfdf", self.0)
    }

    /// File name of the legacy JSON store
    pub fn legacy_file_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Shorthand for [`StorageKey::for_document`]
pub fn storage_key(doc_path: impl AsRef<Path>) -> StorageKey {
    StorageKey::for_document(doc_path.as_ref())
}

fn absolute_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
