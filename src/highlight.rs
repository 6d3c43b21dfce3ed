use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::coords::Rect;
use crate::document::DocumentRef;
use crate::storage::{SidecarKind, SidecarRecord, SidecarStore, new_record_id, now_millis};

/// Highlight colour palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HighlightColor {
    #[default]
    Yellow,
    Green,
    Blue,
    Pink,
    Orange,
    Purple,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown highlight color {0:?}")]
pub struct UnknownColor(pub String);

impl HighlightColor {
    pub const ALL: [HighlightColor; 6] = [
        HighlightColor::Yellow,
        HighlightColor::Green,
        HighlightColor::Blue,
        HighlightColor::Pink,
        HighlightColor::Orange,
        HighlightColor::Purple,
    ];

    /// CSS colour as stored in sidecar files
    pub fn hex(self) -> &'static str {
        match self {
            HighlightColor::Yellow => "#FFFF00",
            HighlightColor::Green => "#90EE90",
            HighlightColor::Blue => "#87CEEB",
            HighlightColor::Pink => "#FFB6C1",
            HighlightColor::Orange => "#FFA500",
            HighlightColor::Purple => "#DDA0DD",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            HighlightColor::Yellow => "yellow",
            HighlightColor::Green => "green",
            HighlightColor::Blue => "blue",
            HighlightColor::Pink => "pink",
            HighlightColor::Orange => "orange",
            HighlightColor::Purple => "purple",
        }
    }
}

impl fmt::Display for HighlightColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HighlightColor {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        HighlightColor::ALL
            .into_iter()
            .find(|c| c.hex().eq_ignore_ascii_case(s) || c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownColor(s.to_string()))
    }
}

impl Serialize for HighlightColor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.hex())
    }
}

impl<'de> Deserialize<'de> for HighlightColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or_else(|e| {
            warn!("{e}, falling back to {}", HighlightColor::default());
            HighlightColor::default()
        }))
    }
}

/// A coloured rectangle on one page, in stable page coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub id: String,
    /// 1-based page number
    pub page: u32,
    #[serde(flatten)]
    pub rect: Rect,
    pub color: HighlightColor,
    #[serde(default)]
    pub note: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub modified: DateTime<Utc>,
}

impl Highlight {
    pub fn new(page: u32, rect: Rect, color: HighlightColor) -> Self {
        let now = now_millis();
        Self {
            id: new_record_id(now),
            page,
            rect,
            color,
            note: String::new(),
            created: now,
            modified: now,
        }
    }

    pub fn has_note(&self) -> bool {
        !self.note.is_empty()
    }

    fn is_valid(&self) -> bool {
        self.page >= 1 && self.rect.is_finite() && self.rect.width > 0.0 && self.rect.height > 0.0
    }
}

/// On-disk form of a document's highlights
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightRecord {
    #[serde(default, alias = "pdfName")]
    pub document_name: String,
    #[serde(default)]
    pub highlights: Vec<Highlight>,
}

impl SidecarRecord for HighlightRecord {
    const KIND: SidecarKind = SidecarKind::Highlights;
}

/// Highlights of the open document, in insertion order.
///
/// Every mutation is written through to the sidecar before returning.
pub struct AnnotationStore {
    document: DocumentRef,
    highlights: Vec<Highlight>,
    gateway: Option<Rc<SidecarStore>>,
}

impl AnnotationStore {
    /// Store that never touches disk
    pub fn ephemeral(document: DocumentRef) -> Self {
        Self {
            document,
            highlights: Vec::new(),
            gateway: None,
        }
    }

    /// Store backed by `gateway`, populated from the existing sidecar
    pub fn load(document: DocumentRef, gateway: Rc<SidecarStore>) -> Self {
        let record: HighlightRecord = gateway.load(&document.id);
        let mut store = Self {
            document,
            highlights: Vec::new(),
            gateway: Some(gateway),
        };
        store.replace_all(record.highlights);
        debug!(
            "Loaded {} highlights for {}",
            store.highlights.len(),
            store.document.id
        );
        store
    }

    pub fn document(&self) -> &DocumentRef {
        &self.document
    }

    /// Append a highlight. Ids must be unique; a duplicate or a highlight
    /// that could not be written back (page 0, non-finite or empty rect) is
    /// rejected.
    pub fn add(&mut self, highlight: Highlight) -> bool {
        if !highlight.is_valid() {
            warn!(
                "Rejecting invalid highlight {} on page {}: {:?}",
                highlight.id, highlight.page, highlight.rect
            );
            return false;
        }
        if self.get(&highlight.id).is_some() {
            warn!("Highlight {} already exists, not adding", highlight.id);
            return false;
        }
        self.highlights.push(highlight);
        self.persist();
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<Highlight> {
        let Some(idx) = self.highlights.iter().position(|h| h.id == id) else {
            warn!("Cannot remove highlight {id}: not found");
            return None;
        };
        let removed = self.highlights.remove(idx);
        self.persist();
        Some(removed)
    }

    /// Overwrite the note of `id` and bump its `modified` time
    pub fn set_note(&mut self, id: &str, text: impl Into<String>) -> bool {
        let Some(highlight) = self.highlights.iter_mut().find(|h| h.id == id) else {
            warn!("Cannot set note on highlight {id}: not found");
            return false;
        };
        highlight.note = text.into();
        highlight.modified = now_millis();
        self.persist();
        true
    }

    pub fn get(&self, id: &str) -> Option<&Highlight> {
        self.highlights.iter().find(|h| h.id == id)
    }

    /// Highlights on `page`, in insertion order
    pub fn for_page(&self, page: u32) -> impl Iterator<Item = &Highlight> {
        self.highlights.iter().filter(move |h| h.page == page)
    }

    /// Wholesale replacement for a freshly opened document. Does not persist.
    pub fn replace_all(&mut self, highlights: Vec<Highlight>) {
        let mut seen = HashSet::new();
        self.highlights = highlights
            .into_iter()
            .filter(|h| {
                if !h.is_valid() {
                    warn!("Dropping invalid highlight {} on page {}", h.id, h.page);
                    return false;
                }
                if !seen.insert(h.id.clone()) {
                    warn!("Dropping duplicate highlight {}", h.id);
                    return false;
                }
                true
            })
            .collect();
    }

    pub fn all(&self) -> &[Highlight] {
        &self.highlights
    }

    pub fn len(&self) -> usize {
        self.highlights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highlights.is_empty()
    }

    fn persist(&self) {
        let Some(gateway) = &self.gateway else {
            return;
        };
        let record = HighlightRecord {
            document_name: self.document.name.clone(),
            highlights: self.highlights.clone(),
        };
        gateway.save(&self.document.id, &record);
    }
}
