//! Per-document annotation session
//!
//! One session per open document. The host feeds it [`Command`]s (pointer
//! events, navigation, render notifications, note-editor results) and
//! carries out the returned [`Effect`]s. Nothing here is global: two windows
//! with two sessions never share state.

use anyhow::Result;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::rc::Rc;

use crate::bookmark::BookmarkStore;
use crate::coords::{self, Point, Rect, Scale};
use crate::document::{DocumentIdentity, DocumentRef};
use crate::highlight::{AnnotationStore, Highlight, HighlightColor};
use crate::notification::NotificationManager;
use crate::selection::{DragEnd, MIN_HIGHLIGHT_SIZE, SelectionController, SelectionState};
use crate::settings::Settings;
use crate::storage::{SidecarStore, StorageError};
use crate::zoom::Zoom;

/// Per-session knobs, taken from [`Settings`]
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub identity: DocumentIdentity,
    pub default_scale: f64,
    pub default_color: HighlightColor,
    pub min_highlight_size: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            identity: DocumentIdentity::default(),
            default_scale: Zoom::DEFAULT_SCALE,
            default_color: HighlightColor::default(),
            min_highlight_size: MIN_HIGHLIGHT_SIZE,
        }
    }
}

impl From<&Settings> for SessionConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            identity: settings.document_identity,
            default_scale: settings.default_scale,
            default_color: settings.default_color,
            min_highlight_size: settings.min_highlight_size,
        }
    }
}

/// Events delivered to the session
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Page count reported by the renderer once the document is open
    SetPageCount(u32),
    /// The renderer finished drawing `page` at `scale`
    PageRendered { page: u32, scale: f64 },
    GoToPage(u32),
    NextPage,
    PrevPage,
    ZoomIn,
    ZoomOut,
    ToggleHighlightMode,
    SelectColor(HighlightColor),
    PointerDown(Point),
    PointerMove(Point),
    PointerUp(Point),
    /// Open the note editor for an existing highlight
    EditNote(String),
    /// Note editor confirmed with this text
    SaveNote(String),
    /// Note editor dismissed
    CancelNote,
    /// Delete a highlight (after the host's confirmation prompt)
    DeleteHighlight(String),
    /// Toggle the bookmark on the current page
    ToggleBookmark,
    /// Toggle the bookmark on a specific page, e.g. from the bookmark list
    ToggleBookmarkAt(u32),
}

/// Instructions for the host
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Ask the renderer to draw `page` at `scale`
    RenderPage { page: u32, scale: f64 },
    /// Replace the highlight overlay of `page`
    DrawOverlay { page: u32, items: Vec<OverlayItem> },
    /// Show the live drag rectangle, or hide it
    SelectionFeedback(Option<Rect>),
    OpenNoteEditor { highlight_id: String, note: String },
    CloseNoteEditor,
    HighlightMode(bool),
    /// Bookmark indicator for the displayed page
    BookmarkState { page: u32, bookmarked: bool },
    /// Bookmarked pages, ascending
    BookmarksChanged(Vec<u32>),
}

/// A highlight projected onto the rendered page
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayItem {
    pub highlight_id: String,
    /// Screen rectangle at the render scale
    pub rect: Rect,
    pub color: HighlightColor,
    /// Tooltip text, absent when the note is empty
    pub note: Option<String>,
}

pub struct DocumentSession {
    document: DocumentRef,
    gateway: Option<Rc<SidecarStore>>,
    highlights: AnnotationStore,
    bookmarks: BookmarkStore,
    selection: SelectionController,
    zoom: Zoom,
    current_page: u32,
    page_count: u32,
    highlight_mode: bool,
    color: HighlightColor,
    notifications: NotificationManager,
}

impl DocumentSession {
    /// Open a session whose highlights and bookmarks live in `gateway`
    pub fn open(
        path: impl Into<PathBuf>,
        gateway: Rc<SidecarStore>,
        config: &SessionConfig,
    ) -> Result<Self> {
        let document = DocumentRef::new(path, config.identity)?;
        let highlights = AnnotationStore::load(document.clone(), gateway.clone());
        let bookmarks = BookmarkStore::load(document.clone(), gateway.clone());
        info!(
            "Opened {} ({} highlights, {} bookmarks)",
            document.name,
            highlights.len(),
            bookmarks.len()
        );

        let mut session = Self::build(document, highlights, bookmarks, Some(gateway), config);
        session.report_storage_failures();
        Ok(session)
    }

    /// Session that keeps everything in memory
    pub fn ephemeral(path: impl Into<PathBuf>, config: &SessionConfig) -> Result<Self> {
        let document = DocumentRef::new(path, config.identity)?;
        let highlights = AnnotationStore::ephemeral(document.clone());
        let bookmarks = BookmarkStore::ephemeral(document.clone());
        Ok(Self::build(document, highlights, bookmarks, None, config))
    }

    fn build(
        document: DocumentRef,
        highlights: AnnotationStore,
        bookmarks: BookmarkStore,
        gateway: Option<Rc<SidecarStore>>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            document,
            gateway,
            highlights,
            bookmarks,
            selection: SelectionController::with_min_size(config.min_highlight_size),
            zoom: Zoom::new(config.default_scale),
            current_page: 1,
            page_count: 0,
            highlight_mode: false,
            color: config.default_color,
            notifications: NotificationManager::new(),
        }
    }

    pub fn document(&self) -> &DocumentRef {
        &self.document
    }

    pub fn highlights(&self) -> &AnnotationStore {
        &self.highlights
    }

    pub fn bookmarks(&self) -> &BookmarkStore {
        &self.bookmarks
    }

    pub fn selection_state(&self) -> &SelectionState {
        self.selection.state()
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn scale(&self) -> Scale {
        self.zoom.scale()
    }

    pub fn zoom_percent(&self) -> u32 {
        self.zoom.percent()
    }

    pub fn highlight_mode(&self) -> bool {
        self.highlight_mode
    }

    pub fn color(&self) -> HighlightColor {
        self.color
    }

    pub fn notifications(&self) -> &NotificationManager {
        &self.notifications
    }

    /// Apply a command and return resulting effects
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        self.notifications.update();
        let effects = match cmd {
            Command::SetPageCount(count) => {
                self.page_count = count;
                if count == 0 {
                    vec![]
                } else {
                    self.current_page = self.current_page.clamp(1, count);
                    vec![self.render_request(self.current_page, self.zoom.scale())]
                }
            }

            Command::PageRendered { page, scale } => self.page_rendered(page, scale),

            Command::GoToPage(page) => self.go_to(page),

            Command::NextPage => self.go_to(self.current_page.saturating_add(1)),

            Command::PrevPage => self.go_to(self.current_page.saturating_sub(1)),

            Command::ZoomIn => {
                let next = self.zoom.step_in();
                self.rescale(next)
            }

            Command::ZoomOut => {
                let next = self.zoom.step_out();
                self.rescale(next)
            }

            Command::ToggleHighlightMode => {
                self.highlight_mode = !self.highlight_mode;
                let mut effects = vec![];
                if !self.highlight_mode && self.selection.cancel_drag() {
                    effects.push(Effect::SelectionFeedback(None));
                }
                effects.push(Effect::HighlightMode(self.highlight_mode));
                effects
            }

            Command::SelectColor(color) => {
                self.color = color;
                vec![]
            }

            Command::PointerDown(point) => {
                if self.selection.pointer_down(point, self.highlight_mode) {
                    vec![Effect::SelectionFeedback(Some(Rect::new(
                        point.x, point.y, 0.0, 0.0,
                    )))]
                } else {
                    vec![]
                }
            }

            Command::PointerMove(point) => self
                .selection
                .pointer_move(point)
                .map(|rect| vec![Effect::SelectionFeedback(Some(rect))])
                .unwrap_or_default(),

            Command::PointerUp(point) => self.finish_drag(point),

            Command::EditNote(id) => self.edit_note(id),

            Command::SaveNote(text) => match self.selection.finish_note() {
                Some(id) => {
                    self.highlights.set_note(&id, text);
                    vec![Effect::CloseNoteEditor, self.overlay_effect()]
                }
                None => vec![],
            },

            Command::CancelNote => match self.selection.finish_note() {
                Some(_) => vec![Effect::CloseNoteEditor],
                None => vec![],
            },

            Command::DeleteHighlight(id) => self.delete_highlight(&id),

            Command::ToggleBookmark => self.toggle_bookmark(self.current_page),

            Command::ToggleBookmarkAt(page) => self.toggle_bookmark(page),
        };

        self.report_storage_failures();
        effects
    }

    /// Highlights of `page` projected to screen space at `scale`
    pub fn overlay(&self, page: u32, scale: Scale) -> Vec<OverlayItem> {
        self.highlights
            .for_page(page)
            .map(|h| OverlayItem {
                highlight_id: h.id.clone(),
                rect: coords::to_screen(h.rect, scale),
                color: h.color,
                note: h.has_note().then(|| h.note.clone()),
            })
            .collect()
    }

    fn overlay_effect(&self) -> Effect {
        Effect::DrawOverlay {
            page: self.current_page,
            items: self.overlay(self.current_page, self.zoom.scale()),
        }
    }

    fn render_request(&self, page: u32, scale: Scale) -> Effect {
        Effect::RenderPage {
            page,
            scale: scale.get(),
        }
    }

    fn page_rendered(&mut self, page: u32, scale: f64) -> Vec<Effect> {
        let Some(scale) = Scale::new(scale) else {
            warn!("Ignoring render of page {page} at invalid scale {scale}");
            return vec![];
        };
        if page == 0 {
            warn!("Ignoring render of page 0");
            return vec![];
        }

        let mut effects = vec![];
        let moved = page != self.current_page || scale != self.zoom.scale();
        if moved && self.selection.cancel_drag() {
            debug!("Drag cancelled by re-render of page {page}");
            effects.push(Effect::SelectionFeedback(None));
        }

        self.current_page = page;
        self.zoom.sync(scale);
        effects.push(self.overlay_effect());
        effects.push(Effect::BookmarkState {
            page,
            bookmarked: self.bookmarks.is_bookmarked(page),
        });
        effects
    }

    fn go_to(&mut self, page: u32) -> Vec<Effect> {
        if page < 1 || page > self.page_count {
            debug!("Page {page} outside 1..={}", self.page_count);
            return vec![];
        }
        if page == self.current_page {
            return vec![];
        }

        let mut effects = vec![];
        if self.selection.cancel_drag() {
            effects.push(Effect::SelectionFeedback(None));
        }
        effects.push(self.render_request(page, self.zoom.scale()));
        effects
    }

    fn rescale(&mut self, next: Option<Scale>) -> Vec<Effect> {
        let Some(scale) = next else {
            return vec![];
        };
        let mut effects = vec![];
        if self.selection.cancel_drag() {
            effects.push(Effect::SelectionFeedback(None));
        }
        effects.push(self.render_request(self.current_page, scale));
        effects
    }

    fn finish_drag(&mut self, point: Point) -> Vec<Effect> {
        match self.selection.pointer_up(point) {
            DragEnd::Ignored => vec![],
            DragEnd::Discarded => {
                debug!("Discarded drag below minimum size");
                vec![Effect::SelectionFeedback(None)]
            }
            DragEnd::Completed(screen_rect) => {
                let stable = coords::to_stable(screen_rect, self.zoom.scale());
                let highlight = Highlight::new(self.current_page, stable, self.color);
                let id = highlight.id.clone();
                if !self.highlights.add(highlight) {
                    return vec![Effect::SelectionFeedback(None)];
                }
                debug!("Created highlight {id} on page {}", self.current_page);

                self.selection.begin_note(id.clone());
                vec![
                    Effect::SelectionFeedback(None),
                    self.overlay_effect(),
                    Effect::OpenNoteEditor {
                        highlight_id: id,
                        note: String::new(),
                    },
                ]
            }
        }
    }

    fn edit_note(&mut self, id: String) -> Vec<Effect> {
        if self.selection.state() != &SelectionState::Idle {
            debug!("Ignoring note edit for {id}: selection busy");
            return vec![];
        }
        let Some(note) = self.highlights.get(&id).map(|h| h.note.clone()) else {
            warn!("Cannot edit note of highlight {id}: not found");
            return vec![];
        };
        self.selection.begin_note(id.clone());
        vec![Effect::OpenNoteEditor {
            highlight_id: id,
            note,
        }]
    }

    fn delete_highlight(&mut self, id: &str) -> Vec<Effect> {
        if self.highlights.remove(id).is_none() {
            return vec![];
        }
        let mut effects = vec![];
        if self.selection.note_target() == Some(id) {
            self.selection.finish_note();
            effects.push(Effect::CloseNoteEditor);
        }
        effects.push(self.overlay_effect());
        effects
    }

    fn toggle_bookmark(&mut self, page: u32) -> Vec<Effect> {
        if page < 1 || (self.page_count > 0 && page > self.page_count) {
            warn!("Cannot bookmark page {page} of {}", self.page_count);
            return vec![];
        }
        let bookmarked = self.bookmarks.toggle(page);
        let mut effects = vec![];
        if page == self.current_page {
            effects.push(Effect::BookmarkState { page, bookmarked });
        }
        effects.push(Effect::BookmarksChanged(self.bookmarks.pages().collect()));
        effects
    }

    fn report_storage_failures(&mut self) {
        let Some(gateway) = &self.gateway else {
            return;
        };
        for failure in gateway.take_failures() {
            match failure {
                StorageError::Parse { .. } | StorageError::Read { .. } => self
                    .notifications
                    .warn(format!("Saved annotations could not be read: {failure}")),
                _ => self
                    .notifications
                    .error(format!("Changes could not be saved: {failure}")),
            }
        }
    }
}
