//! Geometry queries for the window and monitor capture modes

use crate::{CaptureError, CaptureResult, DisplayConnection, Point, Rect};
use x11rb::protocol::randr::ConnectionExt as _;
use x11rb::protocol::xproto::{ConnectionExt as _, InputFocus, Window};

/// Upper bound on the parent walk, in case the tree changes under us.
const MAX_TREE_DEPTH: usize = 64;

/// A physical monitor and where it sits in root coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorInfo {
    pub name: String,
    pub rect: Rect,
}

/// Raw questions asked of the display server.
pub trait DisplayQueries {
    fn root(&self) -> Window;

    /// Root window size, origin at (0, 0).
    fn root_rect(&self) -> CaptureResult<Rect>;

    /// Window holding the input focus, if it is a real window.
    fn input_focus(&self) -> CaptureResult<Option<Window>>;

    /// Parent of `window`; `None` for the root.
    fn parent_of(&self, window: Window) -> CaptureResult<Option<Window>>;

    /// Outer rectangle of `window` in root coordinates.
    fn window_rect(&self, window: Window) -> CaptureResult<Rect>;

    fn monitors(&self) -> CaptureResult<Vec<MonitorInfo>>;

    /// Pointer position in root coordinates.
    fn pointer(&self) -> CaptureResult<Point>;
}

/// Resolves the full-screen, focused-window and current-monitor rectangles.
///
/// Every rectangle it returns is non-empty and lies inside the root window,
/// so it can be handed to `FrameBuffer::crop` directly.
pub struct GeometryResolver<Q: DisplayQueries> {
    queries: Q,
    remembered_focus: Option<Window>,
}

impl<Q: DisplayQueries> GeometryResolver<Q> {
    pub fn new(queries: Q) -> Self {
        Self {
            queries,
            remembered_focus: None,
        }
    }

    /// Pin the currently focused window, before our own overlay takes focus.
    pub fn remember_focus(&mut self) -> CaptureResult<()> {
        self.remembered_focus = self.queries.input_focus()?;
        log::debug!("Remembered focus: {:?}", self.remembered_focus);
        Ok(())
    }

    pub fn full_screen_rect(&self) -> CaptureResult<Rect> {
        self.queries.root_rect()
    }

    /// Rectangle of the top-level window that holds (or held) the focus.
    pub fn focused_window_rect(&self) -> CaptureResult<Rect> {
        let focus = match self.remembered_focus {
            Some(window) => window,
            None => self
                .queries
                .input_focus()
                .map_err(unavailable)?
                .ok_or_else(|| CaptureError::GeometryUnavailable("no window has input focus".into()))?,
        };

        let top_level = self.top_level_of(focus)?;
        let rect = self.queries.window_rect(top_level).map_err(unavailable)?;
        log::debug!("Focused window {:#x} -> top-level {:#x} at {:?}", focus, top_level, rect);
        self.clamp_to_screen(rect)
    }

    /// Rectangle of the monitor under the pointer.
    pub fn current_monitor_rect(&self) -> CaptureResult<Rect> {
        let monitors = self.queries.monitors().map_err(unavailable)?;
        let pointer = self.queries.pointer().map_err(unavailable)?;

        let monitor = monitors
            .iter()
            .find(|m| m.rect.contains_inclusive(pointer.x, pointer.y))
            .ok_or_else(|| {
                CaptureError::GeometryUnavailable(format!(
                    "no monitor contains the pointer at ({}, {})",
                    pointer.x, pointer.y
                ))
            })?;

        log::debug!("Pointer at {:?} is on monitor {}", pointer, monitor.name);
        self.clamp_to_screen(monitor.rect)
    }

    /// Intersect with the root window; an empty result is an error.
    pub fn clamp_to_screen(&self, rect: Rect) -> CaptureResult<Rect> {
        clamp_to(rect, self.full_screen_rect()?)
    }

    /// Walk up from `window` to the direct child of the root (or the root).
    fn top_level_of(&self, window: Window) -> CaptureResult<Window> {
        let root = self.queries.root();
        let mut current = window;

        for _ in 0..MAX_TREE_DEPTH {
            if current == root {
                return Ok(current);
            }
            match self.queries.parent_of(current).map_err(unavailable)? {
                Some(parent) if parent == root => return Ok(current),
                Some(parent) => current = parent,
                None => {
                    return Err(CaptureError::GeometryUnavailable(format!(
                        "window {:#x} is detached from the root",
                        current
                    )))
                }
            }
        }

        Err(CaptureError::GeometryUnavailable(format!(
            "window tree deeper than {} levels",
            MAX_TREE_DEPTH
        )))
    }
}

/// Intersect `rect` with `bounds`; an empty result is an error.
pub fn clamp_to(rect: Rect, bounds: Rect) -> CaptureResult<Rect> {
    rect.intersection(&bounds)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| {
            CaptureError::GeometryUnavailable(format!("{:?} lies outside {:?}", rect, bounds))
        })
}

/// `None` and `PointerRoot` name no window.
fn real_focus(focus: Window) -> Option<Window> {
    if focus == x11rb::NONE || focus == u32::from(InputFocus::POINTER_ROOT) {
        None
    } else {
        Some(focus)
    }
}

fn unavailable(e: CaptureError) -> CaptureError {
    match e {
        CaptureError::GeometryUnavailable(_) => e,
        other => CaptureError::GeometryUnavailable(other.to_string()),
    }
}

/// `DisplayQueries` backed by the live X server
pub struct X11Display<'d> {
    display: &'d DisplayConnection,
}

impl<'d> X11Display<'d> {
    pub fn new(display: &'d DisplayConnection) -> Self {
        Self { display }
    }
}

impl DisplayQueries for X11Display<'_> {
    fn root(&self) -> Window {
        self.display.root()
    }

    fn root_rect(&self) -> CaptureResult<Rect> {
        let geometry = self.display.conn().get_geometry(self.root())?.reply()?;
        Ok(Rect::new(0, 0, u32::from(geometry.width), u32::from(geometry.height)))
    }

    fn input_focus(&self) -> CaptureResult<Option<Window>> {
        let focus = self.display.conn().get_input_focus()?.reply()?.focus;
        Ok(real_focus(focus))
    }

    fn parent_of(&self, window: Window) -> CaptureResult<Option<Window>> {
        let tree = self.display.conn().query_tree(window)?.reply()?;
        if tree.parent == x11rb::NONE {
            Ok(None)
        } else {
            Ok(Some(tree.parent))
        }
    }

    fn window_rect(&self, window: Window) -> CaptureResult<Rect> {
        let conn = self.display.conn();
        let geometry = conn.get_geometry(window)?.reply()?;
        let origin = conn.translate_coordinates(window, self.root(), 0, 0)?.reply()?;
        let border = i32::from(geometry.border_width);

        Ok(Rect::new(
            i32::from(origin.dst_x) - border,
            i32::from(origin.dst_y) - border,
            u32::from(geometry.width) + 2 * border as u32,
            u32::from(geometry.height) + 2 * border as u32,
        ))
    }

    fn monitors(&self) -> CaptureResult<Vec<MonitorInfo>> {
        let conn = self.display.conn();
        let reply = conn.randr_get_monitors(self.root(), true)?.reply()?;

        let mut monitors = Vec::with_capacity(reply.monitors.len());
        for monitor in &reply.monitors {
            let name = conn.get_atom_name(monitor.name)?.reply()?.name;
            monitors.push(MonitorInfo {
                name: String::from_utf8_lossy(&name).into_owned(),
                rect: Rect::new(
                    i32::from(monitor.x),
                    i32::from(monitor.y),
                    u32::from(monitor.width),
                    u32::from(monitor.height),
                ),
            });
        }
        Ok(monitors)
    }

    fn pointer(&self) -> CaptureResult<Point> {
        let reply = self.display.conn().query_pointer(self.root())?.reply()?;
        Ok(Point::new(i32::from(reply.root_x), i32::from(reply.root_y)))
    }
}
