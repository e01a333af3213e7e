//! Overlay module for xsnip
//!
//! Shows the frozen capture full screen and lets the user drag a region,
//! or pick the focused window or current monitor from the keyboard.

pub mod keys;
pub mod render;
pub mod selection;
pub mod window;

pub use keys::{KeyBindings, KeyboardMap};
pub use render::{Color, OverlayRenderer, Quad, RasterTarget, RenderTarget};
pub use selection::{KeyAction, Outcome, SelectionEvent, SelectionMode, SelectionSession};
pub use window::{translate_event, OverlayConfig, OverlayWindow, WmAtoms};

use capture_x11::Rect;
use thiserror::Error;
use x11rb::errors::{ConnectionError, ParseError, ReplyError, ReplyOrIdError};
use x11rb::protocol::xproto::GrabStatus;

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("X11 connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("X11 request failed: {0}")]
    Reply(#[from] ReplyError),

    #[error("X11 resource id allocation failed: {0}")]
    ReplyOrId(#[from] ReplyOrIdError),

    #[error("Invalid frame image: {0}")]
    Image(#[from] ParseError),

    #[error("Could not grab the keyboard: {0:?}")]
    KeyboardGrab(GrabStatus),
}

impl OverlayError {
    /// Errors raised by the X server or the connection to it.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            OverlayError::Connection(_) | OverlayError::Reply(_) | OverlayError::ReplyOrId(_)
        )
    }
}

pub type OverlayResult<T> = Result<T, OverlayError>;

/// Selection outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// User dragged a region (buffer coordinates)
    Region(Rect),
    /// Confirmed without a usable drag
    FullScreen,
    /// Window shortcut
    FocusedWindow,
    /// Monitor shortcut
    CurrentMonitor,
    /// User cancelled
    Cancelled,
}
