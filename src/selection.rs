//! Drag-to-highlight gesture state

use crate::coords::{Point, Rect};

/// Smallest width and height, in screen pixels, a drag must cover
pub const MIN_HIGHLIGHT_SIZE: f64 = 5.0;

#[derive(Clone, Debug, Default, PartialEq)]
pub enum SelectionState {
    #[default]
    Idle,
    /// Pointer is down; both points are in screen space
    Dragging { anchor: Point, current: Point },
    /// A highlight was created and its note flow is open
    Committing { highlight_id: String },
}

/// Result of releasing the pointer
#[derive(Clone, Debug, PartialEq)]
pub enum DragEnd {
    /// No drag was in progress
    Ignored,
    /// Drag was smaller than the minimum size
    Discarded,
    /// Drag spans this screen rectangle and should become a highlight
    Completed(Rect),
}

#[derive(Debug)]
pub struct SelectionController {
    state: SelectionState,
    min_size: f64,
}

impl Default for SelectionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionController {
    #[must_use]
    pub fn new() -> Self {
        Self::with_min_size(MIN_HIGHLIGHT_SIZE)
    }

    #[must_use]
    pub fn with_min_size(min_size: f64) -> Self {
        Self {
            state: SelectionState::Idle,
            min_size,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, SelectionState::Dragging { .. })
    }

    /// Highlight whose note flow is open, if any
    pub fn note_target(&self) -> Option<&str> {
        match &self.state {
            SelectionState::Committing { highlight_id } => Some(highlight_id),
            _ => None,
        }
    }

    /// Start a drag. Ignored outside highlight mode and while a note flow is open.
    pub fn pointer_down(&mut self, point: Point, highlight_mode: bool) -> bool {
        if !highlight_mode || self.note_target().is_some() {
            return false;
        }
        self.state = SelectionState::Dragging {
            anchor: point,
            current: point,
        };
        true
    }

    /// Update the drag and return the rectangle to show as feedback
    pub fn pointer_move(&mut self, point: Point) -> Option<Rect> {
        match &mut self.state {
            SelectionState::Dragging { anchor, current } => {
                *current = point;
                Some(Rect::from_corners(*anchor, point))
            }
            _ => None,
        }
    }

    /// Finish the drag. The controller is idle afterwards; call
    /// [`begin_note`](Self::begin_note) once the highlight exists.
    pub fn pointer_up(&mut self, point: Point) -> DragEnd {
        let SelectionState::Dragging { anchor, .. } = self.state else {
            return DragEnd::Ignored;
        };
        self.state = SelectionState::Idle;

        let rect = Rect::from_corners(anchor, point);
        if rect.meets_min_size(self.min_size) {
            DragEnd::Completed(rect)
        } else {
            DragEnd::Discarded
        }
    }

    /// Open the note flow for `highlight_id`. Cancels any drag.
    pub fn begin_note(&mut self, highlight_id: impl Into<String>) {
        self.state = SelectionState::Committing {
            highlight_id: highlight_id.into(),
        };
    }

    /// Close the note flow, saved or cancelled. Returns the highlight it targeted.
    pub fn finish_note(&mut self) -> Option<String> {
        match std::mem::take(&mut self.state) {
            SelectionState::Committing { highlight_id } => Some(highlight_id),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Drop an in-progress drag. Returns true if one was dropped.
    pub fn cancel_drag(&mut self) -> bool {
        if self.is_dragging() {
            self.state = SelectionState::Idle;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drag(controller: &mut SelectionController, from: (f64, f64), to: (f64, f64)) -> DragEnd {
        controller.pointer_down(Point::new(from.0, from.1), true);
        controller.pointer_move(Point::new(to.0, to.1));
        controller.pointer_up(Point::new(to.0, to.1))
    }

    #[test]
    fn test_ignored_outside_highlight_mode() {
        let mut controller = SelectionController::new();
        assert!(!controller.pointer_down(Point::new(1.0, 1.0), false));
        assert_eq!(controller.pointer_move(Point::new(50.0, 50.0)), None);
        assert_eq!(controller.pointer_up(Point::new(50.0, 50.0)), DragEnd::Ignored);
        assert_eq!(controller.state(), &SelectionState::Idle);
    }

    #[test]
    fn test_move_reports_normalized_feedback() {
        let mut controller = SelectionController::new();
        controller.pointer_down(Point::new(100.0, 80.0), true);
        let feedback = controller.pointer_move(Point::new(60.0, 120.0)).unwrap();
        assert_eq!(feedback, Rect::new(60.0, 80.0, 40.0, 40.0));
    }

    #[test]
    fn test_completed_drag() {
        let mut controller = SelectionController::new();
        let end = drag(&mut controller, (150.0, 130.0), (100.0, 100.0));
        assert_eq!(end, DragEnd::Completed(Rect::new(100.0, 100.0, 50.0, 30.0)));
        assert_eq!(controller.state(), &SelectionState::Idle);
    }

    #[test]
    fn test_small_drag_discarded() {
        let mut controller = SelectionController::new();
        assert_eq!(drag(&mut controller, (0.0, 0.0), (4.9, 100.0)), DragEnd::Discarded);
        assert_eq!(drag(&mut controller, (0.0, 0.0), (100.0, 4.0)), DragEnd::Discarded);
        assert_eq!(
            drag(&mut controller, (0.0, 0.0), (5.0, 5.0)),
            DragEnd::Completed(Rect::new(0.0, 0.0, 5.0, 5.0))
        );
    }

    #[test]
    fn test_note_flow_blocks_new_drags() {
        let mut controller = SelectionController::new();
        controller.begin_note("h1");
        assert!(!controller.pointer_down(Point::new(0.0, 0.0), true));
        assert_eq!(controller.note_target(), Some("h1"));

        assert_eq!(controller.finish_note(), Some("h1".to_string()));
        assert_eq!(controller.state(), &SelectionState::Idle);
        assert_eq!(controller.finish_note(), None);
    }

    #[test]
    fn test_cancel_drag() {
        let mut controller = SelectionController::new();
        controller.pointer_down(Point::new(0.0, 0.0), true);
        assert!(controller.cancel_drag());
        assert!(!controller.cancel_drag());
        assert_eq!(controller.pointer_up(Point::new(40.0, 40.0)), DragEnd::Ignored);
    }
}
