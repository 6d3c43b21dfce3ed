//! Per-document JSON sidecar files
//!
//! Layout under the user-data root:
//!
//! ```text
//! <root>/highlights/<doc_id>.json
//! <root>/bookmarks/<doc_id>.json
//! ```
//!
//! `save` and `load` never fail from the caller's point of view. Failures are
//! logged and queued so the session can surface them without interrupting
//! the reader. `try_save`/`try_load` return the error instead.

use chrono::{DateTime, SubsecRound, Utc};
use log::{debug, error};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::document::DocumentId;

/// Which sidecar a record lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidecarKind {
    Highlights,
    Bookmarks,
}

impl SidecarKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            SidecarKind::Highlights => "highlights",
            SidecarKind::Bookmarks => "bookmarks",
        }
    }
}

/// A top-level sidecar document
pub trait SidecarRecord: Serialize + DeserializeOwned + Default {
    const KIND: SidecarKind;
}

/// Current time at the millisecond precision sidecars store
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Opaque id for a new highlight or bookmark: creation millis plus 64 random bits
pub fn new_record_id(created: DateTime<Utc>) -> String {
    format!("{}-{:016x}", created.timestamp_millis(), rand::random::<u64>())
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to create directory {path:?}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to read {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("malformed sidecar {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to serialize {kind:?} record: {source}")]
    Serialize {
        kind: SidecarKind,
        source: serde_json::Error,
    },
}

/// Filesystem operations the gateway needs
pub trait FileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// The real filesystem. Writes go through a temp file in the target
/// directory and are renamed into place.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(contents)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }
}

pub struct SidecarStore {
    root: PathBuf,
    fs: Box<dyn FileSystem>,
    failures: RefCell<Vec<StorageError>>,
}

impl SidecarStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_file_system(root, LocalFileSystem)
    }

    pub fn with_file_system(root: impl Into<PathBuf>, fs: impl FileSystem + 'static) -> Self {
        Self {
            root: root.into(),
            fs: Box::new(fs),
            failures: RefCell::new(Vec::new()),
        }
    }

    pub fn path_for(&self, kind: SidecarKind, doc: &DocumentId) -> PathBuf {
        self.root
            .join(kind.dir_name())
            .join(format!("{}.json", doc.as_str()))
    }

    /// Write `record` as pretty-printed JSON, replacing the previous file
    pub fn try_save<R: SidecarRecord>(
        &self,
        doc: &DocumentId,
        record: &R,
    ) -> Result<PathBuf, StorageError> {
        let path = self.path_for(R::KIND, doc);
        if let Some(dir) = path.parent() {
            if !self.fs.exists(dir) {
                self.fs
                    .create_dir_all(dir)
                    .map_err(|source| StorageError::CreateDir {
                        path: dir.to_path_buf(),
                        source,
                    })?;
            }
        }

        let json = serde_json::to_vec_pretty(record).map_err(|source| {
            StorageError::Serialize {
                kind: R::KIND,
                source,
            }
        })?;

        self.fs
            .write(&path, &json)
            .map_err(|source| StorageError::Write {
                path: path.clone(),
                source,
            })?;

        Ok(path)
    }

    /// Returns `Ok(None)` when no sidecar exists yet
    pub fn try_load<R: SidecarRecord>(&self, doc: &DocumentId) -> Result<Option<R>, StorageError> {
        let path = self.path_for(R::KIND, doc);
        if !self.fs.exists(&path) {
            return Ok(None);
        }

        let bytes = self.fs.read(&path).map_err(|source| StorageError::Read {
            path: path.clone(),
            source,
        })?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Some(R::default()));
        }

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StorageError::Parse { path, source })
    }

    /// Save, logging and queueing any failure. Returns whether the write landed.
    pub fn save<R: SidecarRecord>(&self, doc: &DocumentId, record: &R) -> bool {
        match self.try_save(doc, record) {
            Ok(path) => {
                debug!("Saved {:?} for {doc} to {path:?}", R::KIND);
                true
            }
            Err(e) => {
                error!("Failed to save {:?} for {doc}: {e}", R::KIND);
                self.failures.borrow_mut().push(e);
                false
            }
        }
    }

    /// Load, treating a missing or unreadable sidecar as empty
    pub fn load<R: SidecarRecord>(&self, doc: &DocumentId) -> R {
        match self.try_load(doc) {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("No {:?} sidecar for {doc}", R::KIND);
                R::default()
            }
            Err(e) => {
                error!("Discarding unreadable {:?} sidecar for {doc}: {e}", R::KIND);
                self.failures.borrow_mut().push(e);
                R::default()
            }
        }
    }

    /// Drain failures swallowed by `save`/`load` since the last call
    pub fn take_failures(&self) -> Vec<StorageError> {
        std::mem::take(&mut *self.failures.borrow_mut())
    }
}


#[cfg(test)]
mod tests {
    use super::test_fs::ReadOnlyFileSystem;
    use super::*;
    use crate::document::DocumentIdentity;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct PagesRecord {
        document_name: String,
        pages: Vec<u32>,
    }

    impl SidecarRecord for PagesRecord {
        const KIND: SidecarKind = SidecarKind::Bookmarks;
    }

    fn doc(name: &str) -> DocumentId {
        DocumentId::derive(Path::new(name), DocumentIdentity::BaseName).unwrap()
    }

    #[test]
    fn test_save_creates_directories_and_round_trips() {
        let tmp = TempDir::new().unwrap();
        let store = SidecarStore::new(tmp.path().join("nested").join("data"));
        let record = PagesRecord {
            document_name: "book.pdf".to_string(),
            pages: vec![9, 1, 4],
        };

        assert!(store.save(&doc("book.pdf"), &record));

        let path = store.path_for(SidecarKind::Bookmarks, &doc("book.pdf"));
        assert!(path.ends_with("bookmarks/book.json"));
        let loaded: PagesRecord = store.load(&doc("book.pdf"));
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_written_json_is_pretty_printed() {
        let tmp = TempDir::new().unwrap();
        let store = SidecarStore::new(tmp.path());
        let record = PagesRecord {
            document_name: "a.pdf".to_string(),
            pages: vec![1],
        };
        let path = store.try_save(&doc("a.pdf"), &record).unwrap();

        let text = fs::read_to_string(path).unwrap();
        assert!(text.starts_with("{\n  \"documentName\": \"a.pdf\""));
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let store = SidecarStore::new(tmp.path());
        let loaded: PagesRecord = store.load(&doc("nonexistent"));
        assert_eq!(loaded, PagesRecord::default());
        assert!(store.take_failures().is_empty());
    }

    #[test]
    fn test_corrupt_file_loads_empty_and_reports() {
        let tmp = TempDir::new().unwrap();
        let store = SidecarStore::new(tmp.path());
        let path = store.path_for(SidecarKind::Bookmarks, &doc("broken"));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();

        let loaded: PagesRecord = store.load(&doc("broken"));
        assert_eq!(loaded, PagesRecord::default());

        let failures = store.take_failures();
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], StorageError::Parse { .. }));
        assert!(store.take_failures().is_empty());
    }

    #[test]
    fn test_blank_file_loads_empty_without_error() {
        let tmp = TempDir::new().unwrap();
        let store = SidecarStore::new(tmp.path());
        let path = store.path_for(SidecarKind::Bookmarks, &doc("blank"));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "  \n").unwrap();

        assert_eq!(
            store.try_load::<PagesRecord>(&doc("blank")).unwrap(),
            Some(PagesRecord::default())
        );
    }

    #[test]
    fn test_write_failure_is_swallowed_and_queued() {
        let tmp = TempDir::new().unwrap();
        let store = SidecarStore::with_file_system(tmp.path(), ReadOnlyFileSystem);

        assert!(!store.save(&doc("x"), &PagesRecord::default()));

        let failures = store.take_failures();
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], StorageError::Write { .. }));
    }
}
