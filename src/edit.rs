//! Merge and split planning
//!
//! Page-level document editing is delegated to a [`DocumentEditor`]. This
//! module only decides which pages of which sources go into each output.

use anyhow::Context;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EditError {
    #[error("invalid page range {0:?}")]
    InvalidRange(String),

    #[error("pages {range} exceed the {page_count} pages of {path:?}")]
    OutOfBounds {
        path: PathBuf,
        range: PageRange,
        page_count: u32,
    },

    #[error("nothing to merge")]
    NoSources,

    #[error("no page ranges given")]
    NoRanges,
}

/// Inclusive, 1-based page range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Result<Self, EditError> {
        if start == 0 || end < start {
            return Err(EditError::InvalidRange(format!("{start}-{end}")));
        }
        Ok(Self { start, end })
    }

    pub fn all(page_count: u32) -> Result<Self, EditError> {
        Self::new(1, page_count)
    }

    pub fn pages(&self) -> RangeInclusive<u32> {
        self.start..=self.end
    }

    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

impl FromStr for PageRange {
    type Err = EditError;

    /// Accepts `"7"` or `"2-5"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EditError::InvalidRange(s.to_string());
        let parse = |part: &str| part.trim().parse::<u32>().map_err(|_| invalid());

        match s.split_once('-') {
            Some((start, end)) => Self::new(parse(start)?, parse(end)?),
            None => {
                let page = parse(s)?;
                Self::new(page, page)
            }
        }
    }
}

/// Parse a comma separated list such as `"1-3, 5, 8-10"`
pub fn parse_page_ranges(s: &str) -> Result<Vec<PageRange>, EditError> {
    let ranges = s
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect::<Result<Vec<PageRange>, _>>()?;
    if ranges.is_empty() {
        return Err(EditError::NoRanges);
    }
    Ok(ranges)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub page_count: u32,
}

/// A run of pages taken from one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePick {
    pub source: PathBuf,
    pub range: PageRange,
}

/// Every page of every source, sources in the given order
pub fn merge_plan(sources: &[SourceDocument]) -> Result<Vec<PagePick>, EditError> {
    if sources.is_empty() {
        return Err(EditError::NoSources);
    }
    sources
        .iter()
        .map(|source| {
            let range = PageRange::all(source.page_count)
                .map_err(|_| EditError::InvalidRange(format!("{:?} has no pages", source.path)))?;
            Ok(PagePick {
                source: source.path.clone(),
                range,
            })
        })
        .collect()
}

/// One output document per range
pub fn split_plan(
    source: &SourceDocument,
    ranges: &[PageRange],
) -> Result<Vec<PagePick>, EditError> {
    if ranges.is_empty() {
        return Err(EditError::NoRanges);
    }
    ranges
        .iter()
        .map(|&range| {
            if range.end > source.page_count {
                return Err(EditError::OutOfBounds {
                    path: source.path.clone(),
                    range,
                    page_count: source.page_count,
                });
            }
            Ok(PagePick {
                source: source.path.clone(),
                range,
            })
        })
        .collect()
}

/// Suggested file name for one split output, e.g. `thesis_p2-5.pdf`
pub fn split_output_name(source: &Path, range: PageRange) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let ext = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    format!("{stem}_p{range}{ext}")
}

/// External collaborator that assembles and serializes documents
pub trait DocumentEditor {
    type Document;

    /// New document made of `parts`, in order
    fn compose(&self, parts: &[PagePick]) -> anyhow::Result<Self::Document>;

    fn to_bytes(&self, document: &Self::Document) -> anyhow::Result<Vec<u8>>;
}

/// Compose `parts` and serialize the result
pub fn build<E: DocumentEditor>(editor: &E, parts: &[PagePick]) -> anyhow::Result<Vec<u8>> {
    let document = editor
        .compose(parts)
        .with_context(|| format!("Failed to compose {} page runs", parts.len()))?;
    editor
        .to_bytes(&document)
        .context("Failed to serialize composed document")
}
