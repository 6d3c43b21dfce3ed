// Export modules for use in tests
pub mod bookmark;
pub mod coords;
pub mod document;
pub mod edit;
pub mod highlight;
pub mod library;
pub mod notification;
pub mod selection;
pub mod session;
pub mod settings;
pub mod storage;
pub mod zoom;

// Re-export the session surface
pub use bookmark::{Bookmark, BookmarkStore};
pub use coords::{Point, Rect, Scale};
pub use document::{DocumentId, DocumentIdentity, DocumentRef};
pub use highlight::{AnnotationStore, Highlight, HighlightColor};
pub use session::{Command, DocumentSession, Effect, OverlayItem, SessionConfig};
pub use storage::{SidecarStore, StorageError};
