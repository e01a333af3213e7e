//! X11 screen capture module for xsnip
//!
//! Provides the shared-memory framebuffer snapshot and the geometry queries
//! (focused window, monitor under the pointer) used to pick a crop target.

pub mod capture;
pub mod connection;
pub mod frame;
pub mod geometry;
pub mod shm;

pub use capture::ScreenCapturer;
pub use connection::DisplayConnection;
pub use frame::{FrameBuffer, Pixel, BYTES_PER_PIXEL};
pub use geometry::{clamp_to, DisplayQueries, GeometryResolver, MonitorInfo, X11Display};
pub use shm::ShmSegment;

use thiserror::Error;
use x11rb::errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError};

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to open display: {0}")]
    Connect(#[from] ConnectError),

    #[error("X11 connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("X11 request failed: {0}")]
    Reply(#[from] ReplyError),

    #[error("X11 resource id allocation failed: {0}")]
    ReplyOrId(#[from] ReplyOrIdError),

    #[error("MIT-SHM extension not available")]
    ShmUnavailable,

    #[error("Unsupported pixel format: {0}")]
    UnsupportedFormat(String),

    #[error("Geometry unavailable: {0}")]
    GeometryUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaptureError {
    /// Errors raised by the X server or the connection to it.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            CaptureError::Connect(_)
                | CaptureError::Connection(_)
                | CaptureError::Reply(_)
                | CaptureError::ReplyOrId(_)
        )
    }
}

pub type CaptureResult<T> = Result<T, CaptureError>;

/// Point in device pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Rectangle in device pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Normalized rectangle spanned by two corner points, in any drag direction.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: a.x.abs_diff(b.x),
            height: a.y.abs_diff(b.y),
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    /// Zero extent means "no selection"; such a rect is never a crop target.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Like `contains`, but the right and bottom edges count as inside.
    pub fn contains_inclusive(&self, x: i32, y: i32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        if !self.intersects(other) {
            return None;
        }
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        Some(Rect::new(x, y, (right - x) as u32, (bottom - y) as u32))
    }
}
