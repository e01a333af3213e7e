//! Interactive selection state machine

use crate::SelectionOutcome;
use capture_x11::{Point, Rect};

/// X11 button number of the primary (left) mouse button
pub const PRIMARY_BUTTON: u8 = 1;

/// What the user asked to capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// The dragged rectangle, or everything if nothing was dragged
    RectangleOrFull,
    FocusedWindow,
    CurrentMonitor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Confirmed,
    Cancelled,
}

/// Keyboard commands understood by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    Confirm,
    Cancel,
    Window,
    Screen,
}

/// Input already translated out of the window system's vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEvent {
    PointerMotion(Point),
    ButtonPress { button: u8, at: Point },
    ButtonRelease { button: u8, at: Point },
    Key(KeyAction),
    /// Window manager asked the overlay to close
    CloseRequested,
}

/// Drag/confirm/cancel state for one overlay run.
///
/// Bound to the captured buffer size; pointer positions are clamped into
/// `[0, width] x [0, height]` so the resolved rectangle always fits.
#[derive(Debug, Clone)]
pub struct SelectionSession {
    width: u32,
    height: u32,
    is_dragging: bool,
    anchor: Option<Point>,
    end: Point,
    current: Point,
    mode: SelectionMode,
    outcome: Outcome,
}

impl SelectionSession {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            is_dragging: false,
            anchor: None,
            end: Point::default(),
            current: Point::default(),
            mode: SelectionMode::RectangleOrFull,
            outcome: Outcome::Pending,
        }
    }

    /// Apply one input event. Returns true when the visible selection changed.
    pub fn handle(&mut self, event: SelectionEvent) -> bool {
        if self.is_finished() {
            log::debug!("Ignoring {:?} after {:?}", event, self.outcome);
            return false;
        }

        match event {
            SelectionEvent::PointerMotion(at) => {
                self.current = self.clamp(at);
                if self.is_dragging {
                    self.end = self.current;
                }
                self.is_dragging
            }
            SelectionEvent::ButtonPress { button, at } if button == PRIMARY_BUTTON => {
                if self.is_dragging {
                    return false;
                }
                self.current = self.clamp(at);
                self.anchor = Some(self.current);
                self.end = self.current;
                self.is_dragging = true;
                true
            }
            SelectionEvent::ButtonRelease { button, at } if button == PRIMARY_BUTTON => {
                if !self.is_dragging {
                    return false;
                }
                self.current = self.clamp(at);
                self.end = self.current;
                self.is_dragging = false;
                log::debug!("Selection frozen at {:?}", self.selection_rect());
                true
            }
            SelectionEvent::ButtonPress { .. } | SelectionEvent::ButtonRelease { .. } => false,
            SelectionEvent::Key(action) => {
                match action {
                    KeyAction::Confirm => self.confirm(SelectionMode::RectangleOrFull),
                    KeyAction::Window => self.confirm(SelectionMode::FocusedWindow),
                    KeyAction::Screen => self.confirm(SelectionMode::CurrentMonitor),
                    KeyAction::Cancel => self.outcome = Outcome::Cancelled,
                }
                true
            }
            SelectionEvent::CloseRequested => {
                self.outcome = Outcome::Cancelled;
                true
            }
        }
    }

    fn confirm(&mut self, mode: SelectionMode) {
        self.mode = mode;
        self.outcome = Outcome::Confirmed;
    }

    fn clamp(&self, at: Point) -> Point {
        Point::new(
            at.x.clamp(0, self.width as i32),
            at.y.clamp(0, self.height as i32),
        )
    }

    /// Live (while dragging) or frozen selection; `None` before the first press.
    pub fn selection_rect(&self) -> Option<Rect> {
        self.anchor.map(|anchor| Rect::from_corners(anchor, self.end))
    }

    pub fn is_dragging(&self) -> bool {
        self.is_dragging
    }

    #[cfg(test)]
    fn current(&self) -> Point {
        self.current
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_finished(&self) -> bool {
        self.outcome != Outcome::Pending
    }

    /// Final answer, once the session reached a terminal outcome.
    ///
    /// A rectangle confirmation without a usable drag falls back to the
    /// whole capture.
    pub fn resolve(&self) -> Option<SelectionOutcome> {
        match self.outcome {
            Outcome::Pending => None,
            Outcome::Cancelled => Some(SelectionOutcome::Cancelled),
            Outcome::Confirmed => Some(match self.mode {
                SelectionMode::RectangleOrFull => match self.selection_rect() {
                    Some(rect) if !rect.is_empty() => SelectionOutcome::Region(rect),
                    _ => SelectionOutcome::FullScreen,
                },
                SelectionMode::FocusedWindow => SelectionOutcome::FocusedWindow,
                SelectionMode::CurrentMonitor => SelectionOutcome::CurrentMonitor,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(x: i32, y: i32) -> SelectionEvent {
        SelectionEvent::ButtonPress {
            button: PRIMARY_BUTTON,
            at: Point::new(x, y),
        }
    }

    fn release(x: i32, y: i32) -> SelectionEvent {
        SelectionEvent::ButtonRelease {
            button: PRIMARY_BUTTON,
            at: Point::new(x, y),
        }
    }

    fn motion(x: i32, y: i32) -> SelectionEvent {
        SelectionEvent::PointerMotion(Point::new(x, y))
    }

    fn drag(session: &mut SelectionSession, from: (i32, i32), to: (i32, i32)) {
        session.handle(motion(from.0, from.1));
        session.handle(press(from.0, from.1));
        session.handle(motion(to.0, to.1));
        session.handle(release(to.0, to.1));
    }

    #[test]
    fn test_new_session_is_pending_without_selection() {
        let session = SelectionSession::new(1920, 1080);
        assert_eq!(session.outcome(), Outcome::Pending);
        assert_eq!(session.selection_rect(), None);
        assert_eq!(session.resolve(), None);
    }

    #[test]
    fn test_drag_up_left_then_confirm() {
        let mut session = SelectionSession::new(1920, 1080);
        drag(&mut session, (100, 50), (20, 80));
        session.handle(SelectionEvent::Key(KeyAction::Confirm));

        assert_eq!(
            session.resolve(),
            Some(SelectionOutcome::Region(Rect::new(20, 50, 80, 30)))
        );
    }

    #[test]
    fn test_drag_direction_does_not_matter() {
        let mut forward = SelectionSession::new(400, 400);
        drag(&mut forward, (20, 50), (100, 80));
        let mut backward = SelectionSession::new(400, 400);
        drag(&mut backward, (100, 80), (20, 50));

        assert_eq!(forward.selection_rect(), backward.selection_rect());
    }

    #[test]
    fn test_live_rectangle_follows_pointer_while_dragging() {
        let mut session = SelectionSession::new(400, 400);
        session.handle(press(10, 10));
        assert!(session.is_dragging());
        assert!(session.handle(motion(30, 40)));
        assert_eq!(session.selection_rect(), Some(Rect::new(10, 10, 20, 30)));
    }

    #[test]
    fn test_release_freezes_rectangle() {
        let mut session = SelectionSession::new(400, 400);
        drag(&mut session, (10, 10), (50, 60));

        assert!(!session.handle(motion(300, 300)));
        assert_eq!(session.current(), Point::new(300, 300));
        assert_eq!(session.selection_rect(), Some(Rect::new(10, 10, 40, 50)));
    }

    #[test]
    fn test_new_drag_replaces_frozen_rectangle() {
        let mut session = SelectionSession::new(400, 400);
        drag(&mut session, (10, 10), (50, 60));
        drag(&mut session, (200, 200), (220, 210));

        assert_eq!(session.selection_rect(), Some(Rect::new(200, 200, 20, 10)));
    }

    #[test]
    fn test_confirm_without_drag_is_full_screen() {
        let mut session = SelectionSession::new(640, 480);
        session.handle(SelectionEvent::Key(KeyAction::Confirm));
        assert_eq!(session.resolve(), Some(SelectionOutcome::FullScreen));
    }

    #[test]
    fn test_confirm_zero_width_drag_is_full_screen() {
        let mut session = SelectionSession::new(640, 480);
        drag(&mut session, (100, 100), (100, 300));
        session.handle(SelectionEvent::Key(KeyAction::Confirm));
        assert_eq!(session.resolve(), Some(SelectionOutcome::FullScreen));
    }

    #[test]
    fn test_pointer_is_clamped_to_buffer() {
        let mut session = SelectionSession::new(640, 480);
        drag(&mut session, (-30, 400), (900, 900));
        assert_eq!(session.selection_rect(), Some(Rect::new(0, 400, 640, 80)));
    }

    #[test]
    fn test_secondary_button_is_ignored() {
        let mut session = SelectionSession::new(640, 480);
        let changed = session.handle(SelectionEvent::ButtonPress {
            button: 3,
            at: Point::new(5, 5),
        });
        assert!(!changed);
        assert!(!session.is_dragging());
    }

    #[test]
    fn test_mode_shortcuts() {
        let mut window = SelectionSession::new(640, 480);
        window.handle(SelectionEvent::Key(KeyAction::Window));
        assert_eq!(window.mode(), SelectionMode::FocusedWindow);
        assert_eq!(window.resolve(), Some(SelectionOutcome::FocusedWindow));

        let mut screen = SelectionSession::new(640, 480);
        drag(&mut screen, (1, 1), (20, 20));
        screen.handle(SelectionEvent::Key(KeyAction::Screen));
        assert_eq!(screen.resolve(), Some(SelectionOutcome::CurrentMonitor));
    }

    #[test]
    fn test_cancel_and_close() {
        let mut session = SelectionSession::new(640, 480);
        session.handle(SelectionEvent::Key(KeyAction::Cancel));
        assert_eq!(session.outcome(), Outcome::Cancelled);
        assert_eq!(session.resolve(), Some(SelectionOutcome::Cancelled));

        let mut closed = SelectionSession::new(640, 480);
        closed.handle(SelectionEvent::CloseRequested);
        assert_eq!(closed.resolve(), Some(SelectionOutcome::Cancelled));
    }

    #[test]
    fn test_no_mutation_after_terminal_outcome() {
        let mut session = SelectionSession::new(640, 480);
        drag(&mut session, (10, 10), (20, 20));
        session.handle(SelectionEvent::Key(KeyAction::Confirm));

        assert!(!session.handle(SelectionEvent::Key(KeyAction::Cancel)));
        assert!(!session.handle(press(100, 100)));
        assert_eq!(session.outcome(), Outcome::Confirmed);
        assert_eq!(
            session.resolve(),
            Some(SelectionOutcome::Region(Rect::new(10, 10, 10, 10)))
        );
    }
}
