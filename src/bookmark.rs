use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::rc::Rc;

use crate::document::DocumentRef;
use crate::storage::{SidecarKind, SidecarRecord, SidecarStore, new_record_id, now_millis};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    /// 1-based page number
    pub page: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created: DateTime<Utc>,
}

impl Bookmark {
    pub fn new(page: u32) -> Self {
        let created = now_millis();
        Self {
            id: new_record_id(created),
            page,
            created,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRecord {
    #[serde(default, alias = "pdfName")]
    pub document_name: String,
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
}

impl SidecarRecord for BookmarkRecord {
    const KIND: SidecarKind = SidecarKind::Bookmarks;
}

/// Bookmarked pages of the open document, ascending by page, one per page
pub struct BookmarkStore {
    document: DocumentRef,
    bookmarks: Vec<Bookmark>,
    gateway: Option<Rc<SidecarStore>>,
}

impl BookmarkStore {
    pub fn ephemeral(document: DocumentRef) -> Self {
        Self {
            document,
            bookmarks: Vec::new(),
            gateway: None,
        }
    }

    pub fn load(document: DocumentRef, gateway: Rc<SidecarStore>) -> Self {
        let record: BookmarkRecord = gateway.load(&document.id);
        let mut store = Self {
            document,
            bookmarks: Vec::new(),
            gateway: Some(gateway),
        };
        store.replace_all(record.bookmarks);
        debug!(
            "Loaded {} bookmarks for {}",
            store.bookmarks.len(),
            store.document.id
        );
        store
    }

    /// Add or remove the bookmark on `page`. Returns whether the page is
    /// bookmarked afterwards.
    pub fn toggle(&mut self, page: u32) -> bool {
        let bookmarked = match self.bookmarks.iter().position(|b| b.page == page) {
            Some(idx) => {
                self.bookmarks.remove(idx);
                false
            }
            None => {
                self.bookmarks.push(Bookmark::new(page));
                true
            }
        };
        self.bookmarks.sort_by_key(|b| b.page);
        self.persist();
        bookmarked
    }

    pub fn is_bookmarked(&self, page: u32) -> bool {
        self.bookmarks.iter().any(|b| b.page == page)
    }

    /// Load-time replacement. Restores ordering and drops repeated pages.
    pub fn replace_all(&mut self, bookmarks: Vec<Bookmark>) {
        let mut seen = HashSet::new();
        let mut bookmarks: Vec<Bookmark> = bookmarks
            .into_iter()
            .filter(|b| b.page >= 1 && seen.insert(b.page))
            .collect();
        bookmarks.sort_by_key(|b| b.page);
        self.bookmarks = bookmarks;
    }

    pub fn pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.bookmarks.iter().map(|b| b.page)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bookmark> {
        self.bookmarks.iter()
    }

    pub fn len(&self) -> usize {
        self.bookmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty()
    }

    fn persist(&self) {
        if let Some(gateway) = &self.gateway {
            let record = BookmarkRecord {
                document_name: self.document.name.clone(),
                bookmarks: self.bookmarks.clone(),
            };
            gateway.save(&self.document.id, &record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentIdentity;
    use tempfile::TempDir;

    fn document() -> DocumentRef {
        DocumentRef::new("/books/linear-algebra.pdf", DocumentIdentity::BaseName).unwrap()
    }

    fn pages(store: &BookmarkStore) -> Vec<u32> {
        store.pages().collect()
    }

    #[test]
    fn test_toggle_sequence() {
        let mut store = BookmarkStore::ephemeral(document());
        assert!(store.toggle(5));
        assert!(store.toggle(2));
        assert!(!store.toggle(5));
        assert_eq!(pages(&store), vec![2]);
    }

    #[test]
    fn test_double_toggle_restores_set() {
        let mut store = BookmarkStore::ephemeral(document());
        for page in [9, 3, 7] {
            store.toggle(page);
        }
        let before = pages(&store);

        store.toggle(4);
        store.toggle(4);
        assert_eq!(pages(&store), before);

        store.toggle(7);
        store.toggle(7);
        assert_eq!(pages(&store), before);
    }

    #[test]
    fn test_stays_sorted_and_unique() {
        let mut store = BookmarkStore::ephemeral(document());
        for page in [12, 1, 8, 1, 30, 8, 2, 12, 5] {
            store.toggle(page);
        }
        let result = pages(&store);
        let mut expected = result.clone();
        expected.sort_unstable();
        expected.dedup();
        assert_eq!(result, expected);
        assert_eq!(result, vec![2, 5, 30]);
    }

    #[test]
    fn test_is_bookmarked() {
        let mut store = BookmarkStore::ephemeral(document());
        store.toggle(3);
        assert!(store.is_bookmarked(3));
        assert!(!store.is_bookmarked(4));
    }

    #[test]
    fn test_replace_all_repairs_order() {
        let mut store = BookmarkStore::ephemeral(document());
        let first_three = Bookmark::new(3);
        store.replace_all(vec![
            Bookmark::new(10),
            first_three.clone(),
            Bookmark::new(3),
            Bookmark::new(0),
            Bookmark::new(1),
        ]);
        assert_eq!(pages(&store), vec![1, 3, 10]);
        assert_eq!(store.iter().nth(1).unwrap().id, first_three.id);
    }

    #[test]
    fn test_toggle_persists() {
        let tmp = TempDir::new().unwrap();
        let gateway = Rc::new(SidecarStore::new(tmp.path()));
        let mut store = BookmarkStore::load(document(), gateway.clone());
        store.toggle(4);
        store.toggle(1);

        let reloaded = BookmarkStore::load(document(), gateway);
        assert_eq!(pages(&reloaded), vec![1, 4]);
        assert!(tmp.path().join("bookmarks/linear-algebra.json").exists());
    }
}
