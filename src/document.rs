use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// How a document path maps onto its sidecar file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocumentIdentity {
    /// File name without extension. Documents sharing a base name in
    /// different directories share sidecar files.
    #[default]
    BaseName,
    /// Hash of the canonical path plus a readable slug of the base name.
    PathHash,
}

/// Stable key of a document's sidecar files
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn derive(path: &Path, identity: DocumentIdentity) -> Result<Self> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .with_context(|| format!("Cannot derive a document id from {path:?}"))?;

        match identity {
            DocumentIdentity::BaseName => Ok(Self(stem.to_string())),
            DocumentIdentity::PathHash => {
                let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
                let digest = md5::compute(resolved.to_string_lossy().as_bytes());
                let hash_prefix = &format!("{digest:x}")[..12];
                Ok(Self(format!("{hash_prefix}_{}", slugify(stem))))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn slugify(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .to_lowercase()
}

/// An opened document as the annotation core sees it
#[derive(Debug, Clone)]
pub struct DocumentRef {
    pub path: PathBuf,
    pub id: DocumentId,
    /// File name including extension, written into sidecar files
    pub name: String,
}

impl DocumentRef {
    pub fn new(path: impl Into<PathBuf>, identity: DocumentIdentity) -> Result<Self> {
        let path = path.into();
        let id = DocumentId::derive(&path, identity)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| id.to_string());
        Ok(Self { path, id, name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name_strips_extension() {
        let id = DocumentId::derive(Path::new("/papers/thesis.pdf"), DocumentIdentity::BaseName)
            .unwrap();
        assert_eq!(id.as_str(), "thesis");
    }

    #[test]
    fn test_base_name_collides_across_directories() {
        let a = DocumentId::derive(Path::new("/a/notes.pdf"), DocumentIdentity::BaseName).unwrap();
        let b = DocumentId::derive(Path::new("/b/notes.pdf"), DocumentIdentity::BaseName).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_path_hash_separates_directories() {
        let a = DocumentId::derive(Path::new("/a/notes.pdf"), DocumentIdentity::PathHash).unwrap();
        let b = DocumentId::derive(Path::new("/b/notes.pdf"), DocumentIdentity::PathHash).unwrap();
        assert_ne!(a, b);
        assert!(a.as_str().ends_with("_notes"));
    }

    #[test]
    fn test_rejects_path_without_file_name() {
        assert!(DocumentId::derive(Path::new("/"), DocumentIdentity::BaseName).is_err());
    }

    #[test]
    fn test_document_ref_keeps_full_name() {
        let doc = DocumentRef::new("/tmp/Lecture 3.pdf", DocumentIdentity::BaseName).unwrap();
        assert_eq!(doc.name, "Lecture 3.pdf");
        assert_eq!(doc.id.as_str(), "Lecture 3");
    }
}
