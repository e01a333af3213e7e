//! Display connection ownership

use crate::{CaptureResult, Rect};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Screen, Window};
use x11rb::rust_connection::RustConnection;

/// The single connection to the X server.
///
/// Opened once by the top-level scope and borrowed by everything else; the
/// socket is closed when this value is dropped, on every exit path.
pub struct DisplayConnection {
    conn: RustConnection,
    screen_num: usize,
}

impl DisplayConnection {
    /// Connect to `name`, or to `$DISPLAY` when `None`.
    pub fn open(name: Option<&str>) -> CaptureResult<Self> {
        let (conn, screen_num) = x11rb::connect(name)?;
        log::debug!("Connected to X server, default screen {}", screen_num);
        Ok(Self { conn, screen_num })
    }

    pub fn conn(&self) -> &RustConnection {
        &self.conn
    }

    pub fn screen_num(&self) -> usize {
        self.screen_num
    }

    pub fn screen(&self) -> &Screen {
        &self.conn.setup().roots[self.screen_num]
    }

    pub fn root(&self) -> Window {
        self.screen().root
    }

    /// Root window rectangle from the connection setup.
    pub fn root_rect(&self) -> Rect {
        let screen = self.screen();
        Rect::new(
            0,
            0,
            u32::from(screen.width_in_pixels),
            u32::from(screen.height_in_pixels),
        )
    }
}

impl Drop for DisplayConnection {
    fn drop(&mut self) {
        log::debug!("Closing X server connection");
    }
}
