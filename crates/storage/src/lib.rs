//! Annotation storage
//!
//! Persists [`PageAnnotations`] per document as XFDF files named after the
//! document's [`StorageKey`]. Stores written by older releases as JSON are
//! migrated to XFDF the first time they are loaded.

pub mod config;
pub mod key;
pub mod legacy;
pub mod xfdf;

pub use config::{ConfigError, StorageConfig, ANNOTATIONS_DIR_ENV};
pub use key::{storage_key, StorageKey};
pub use legacy::LegacyError;
pub use xfdf::XfdfError;

use ink_core::PageAnnotations;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode annotations: {0}")]
    Encode(#[source] XfdfError),
    #[error("invalid XFDF document: {0}")]
    InvalidXfdf(#[source] XfdfError),
}

/// Outcome of [`AnnotationRepository::migrate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStatus {
    /// An XFDF store already exists; any legacy file is ignored
    AlreadyXfdf,
    /// No store of either kind exists
    NoLegacyStore,
    /// The legacy file could not be decoded and was left in place
    UnreadableLegacy,
    /// The legacy store was rewritten as XFDF and removed
    Migrated { strokes: usize },
}

enum LegacyStore {
    Missing,
    Unreadable,
    Decoded(PageAnnotations),
}

/// File-backed annotation store
///
/// Operations on one document are serialized; different documents proceed
/// in parallel. Clones share the same locks.
#[derive(Debug, Clone)]
pub struct AnnotationRepository {
    root: PathBuf,
    locks: Arc<Mutex<HashMap<StorageKey, Arc<Mutex<()>>>>>,
}

impl AnnotationRepository {
    pub fn from_default_project() -> Result<Self, StorageError> {
        let root = StorageConfig::default_root().ok_or(StorageError::NoDataDirectory)?;
        Ok(Self::with_root(root))
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), locks: Arc::default() }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::with_root(config.root.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn xfdf_path(&self, key: &StorageKey) -> PathBuf {
        self.root.join(key.xfdf_file_name())
    }

    pub fn legacy_path(&self, key: &StorageKey) -> PathBuf {
        self.root.join(key.legacy_file_name())
    }

    /// Whether a store of either format exists for the document
    pub fn has_annotations(&self, doc_path: impl AsRef<Path>) -> bool {
        let key = storage_key(doc_path);
        self.xfdf_path(&key).is_file() || self.legacy_path(&key).is_file()
    }

    /// Whether a not yet migrated JSON store exists for the document
    pub fn has_legacy_annotations(&self, doc_path: impl AsRef<Path>) -> bool {
        let key = storage_key(doc_path);
        !self.xfdf_path(&key).is_file() && self.legacy_path(&key).is_file()
    }

    /// Load the document's strokes
    ///
    /// A missing store yields an empty model. When only a legacy store
    /// exists it is decoded and migrated; if writing the XFDF file fails the
    /// legacy file is kept and the decoded strokes are still returned.
    pub fn load(&self, doc_path: impl AsRef<Path>) -> Result<PageAnnotations, StorageError> {
        let key = storage_key(doc_path);
        self.with_key_lock(&key, || -> Result<PageAnnotations, StorageError> {
            let xfdf_path = self.xfdf_path(&key);
            if xfdf_path.is_file() {
                let text = read_lossy(&xfdf_path)?;
                let annotations = xfdf::decode(&text);
                tracing::debug!(%key, strokes = annotations.stroke_count(), "loaded XFDF annotations");
                return Ok(annotations);
            }

            match self.read_legacy(&key)? {
                LegacyStore::Missing | LegacyStore::Unreadable => Ok(PageAnnotations::new()),
                LegacyStore::Decoded(annotations) => {
                    if let Err(err) = self.write_migrated(&key, &annotations) {
                        tracing::warn!(%key, %err, "legacy annotation migration failed, keeping JSON store");
                    }
                    Ok(annotations)
                }
            }
        })
    }

    /// Write the document's strokes as XFDF
    ///
    /// The model is encoded before any file is touched. The legacy store is
    /// left alone.
    pub fn save(
        &self,
        doc_path: impl AsRef<Path>,
        annotations: &PageAnnotations,
    ) -> Result<(), StorageError> {
        let text = encode_now(annotations)?;

        let key = storage_key(doc_path);
        self.with_key_lock(&key, || self.write_atomic(&self.xfdf_path(&key), &text))?;
        tracing::debug!(%key, strokes = annotations.stroke_count(), "saved annotations");
        Ok(())
    }

    /// Save, or delete the stores when the model is empty
    pub fn persist(
        &self,
        doc_path: impl AsRef<Path>,
        annotations: &PageAnnotations,
    ) -> Result<(), StorageError> {
        if annotations.has_any_strokes() {
            self.save(doc_path, annotations)
        } else {
            self.delete(doc_path)
        }
    }

    /// Remove both stores. Missing files are not an error.
    pub fn delete(&self, doc_path: impl AsRef<Path>) -> Result<(), StorageError> {
        let key = storage_key(doc_path);
        let (xfdf, legacy) = self.with_key_lock(&key, || {
            (remove_if_present(&self.xfdf_path(&key)), remove_if_present(&self.legacy_path(&key)))
        });
        xfdf?;
        legacy?;

        tracing::debug!(%key, "deleted annotations");
        Ok(())
    }

    /// XFDF text for `annotations`, or for the stored strokes when `None`
    pub fn export_as_string(
        &self,
        doc_path: impl AsRef<Path>,
        annotations: Option<&PageAnnotations>,
    ) -> Result<String, StorageError> {
        match annotations {
            Some(annotations) => encode_now(annotations),
            None => encode_now(&self.load(doc_path)?),
        }
    }

    /// Validate `text` and store it verbatim as the document's XFDF store
    ///
    /// Returns the strokes the document decodes to.
    pub fn import_from_string(
        &self,
        doc_path: impl AsRef<Path>,
        text: &str,
    ) -> Result<PageAnnotations, StorageError> {
        let annotations = xfdf::validate(text).map_err(StorageError::InvalidXfdf)?;

        let key = storage_key(doc_path);
        self.with_key_lock(&key, || self.write_atomic(&self.xfdf_path(&key), text))?;
        tracing::debug!(%key, strokes = annotations.stroke_count(), "imported annotations");
        Ok(annotations)
    }

    /// Migrate a legacy store without loading it
    ///
    /// Unlike [`load`](Self::load), a failed XFDF write is returned as an
    /// error.
    pub fn migrate(&self, doc_path: impl AsRef<Path>) -> Result<MigrationStatus, StorageError> {
        let key = storage_key(doc_path);
        self.with_key_lock(&key, || -> Result<MigrationStatus, StorageError> {
            if self.xfdf_path(&key).is_file() {
                return Ok(MigrationStatus::AlreadyXfdf);
            }

            match self.read_legacy(&key)? {
                LegacyStore::Missing => Ok(MigrationStatus::NoLegacyStore),
                LegacyStore::Unreadable => Ok(MigrationStatus::UnreadableLegacy),
                LegacyStore::Decoded(annotations) => {
                    self.write_migrated(&key, &annotations)?;
                    Ok(MigrationStatus::Migrated { strokes: annotations.stroke_count() })
                }
            }
        })
    }

    fn read_legacy(&self, key: &StorageKey) -> Result<LegacyStore, StorageError> {
        let path = self.legacy_path(key);
        if !path.is_file() {
            return Ok(LegacyStore::Missing);
        }

        let text = read_lossy(&path)?;
        match legacy::decode(&text) {
            Ok(annotations) => Ok(LegacyStore::Decoded(annotations)),
            Err(err) => {
                tracing::warn!(%key, %err, "unreadable legacy annotation store");
                Ok(LegacyStore::Unreadable)
            }
        }
    }

    /// Write `annotations` as XFDF, then drop the legacy file
    fn write_migrated(
        &self,
        key: &StorageKey,
        annotations: &PageAnnotations,
    ) -> Result<(), StorageError> {
        let text = encode_now(annotations)?;
        self.write_atomic(&self.xfdf_path(key), &text)?;

        if let Err(err) = remove_if_present(&self.legacy_path(key)) {
            // XFDF takes precedence over a leftover legacy file
            tracing::warn!(%key, %err, "failed to remove migrated legacy store");
        }
        tracing::info!(%key, strokes = annotations.stroke_count(), "migrated legacy annotations to XFDF");
        Ok(())
    }

    fn write_atomic(&self, path: &Path, contents: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, contents)?;
        if let Err(err) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(err.into());
        }
        Ok(())
    }

    /// Run `operation` while holding the document's lock
    ///
    /// The lock entry is dropped from the map once no other caller holds it.
    fn with_key_lock<T>(&self, key: &StorageKey, operation: impl FnOnce() -> T) -> T {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key.clone()).or_default())
        };

        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            operation()
        };

        // clones are only handed out under the map lock
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        drop(lock);
        if locks.get(key).is_some_and(|entry| Arc::strong_count(entry) == 1) {
            locks.remove(key);
        }
        result
    }
}

fn encode_now(annotations: &PageAnnotations) -> Result<String, StorageError> {
    xfdf::encode(annotations, chrono::Local::now().naive_local()).map_err(StorageError::Encode)
}

/// Read a store, replacing invalid UTF-8 rather than failing
fn read_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        result => result,
    }
}
