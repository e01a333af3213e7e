//! Overlay window implementation

use crate::{
    keys::{KeyBindings, KeyboardMap},
    render::{OverlayRenderer, RasterTarget},
    selection::{SelectionEvent, SelectionSession},
    OverlayError, OverlayResult, SelectionOutcome,
};
use capture_x11::{DisplayConnection, FrameBuffer, Point};
use std::borrow::Cow;
use std::time::{Duration, Instant};
use x11rb::connection::Connection;
use x11rb::errors::{ParseError, ReplyError};
use x11rb::image::{BitsPerPixel, Image, ImageOrder, ScanlinePad};
use x11rb::protocol::xproto::{
    Atom, AtomEnum, ConnectionExt as _, CreateGCAux, CreateWindowAux, Cursor, EventMask,
    Gcontext, GrabMode, GrabStatus, PropMode, Window, WindowClass,
};
use x11rb::protocol::Event;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::{COPY_DEPTH_FROM_PARENT, COPY_FROM_PARENT, CURRENT_TIME};

/// Keyboard grab attempts, `GRAB_RETRY_INTERVAL` apart
const GRAB_ATTEMPTS: u32 = 100;
const GRAB_RETRY_INTERVAL: Duration = Duration::from_millis(10);

const WINDOW_NAME: &[u8] = b"xsnip";
const WINDOW_CLASS: &[u8] = b"xsnip\0Xsnip\0";

/// `XC_crosshair` in the standard cursor font
const CROSSHAIR_GLYPH: u16 = 34;

#[derive(Debug, Clone)]
pub struct OverlayConfig {
    pub bindings: KeyBindings,
    /// Target duration of one poll/render iteration
    pub frame_interval: Duration,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            bindings: KeyBindings::default(),
            frame_interval: Duration::from_millis(16),
        }
    }
}

/// Atoms a window manager uses to ask the overlay to close
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WmAtoms {
    pub protocols: Atom,
    pub delete_window: Atom,
}

/// Full-screen, override-redirect window showing the frozen capture.
///
/// The window and its server resources are released when this value is
/// dropped, whichever way the selection loop ended.
pub struct OverlayWindow<'d> {
    display: &'d DisplayConnection,
    window: Window,
    gc: Gcontext,
    cursor: Cursor,
    wm_atoms: WmAtoms,
    keyboard: KeyboardMap,
    config: OverlayConfig,
    width: u16,
    height: u16,
}

impl<'d> OverlayWindow<'d> {
    /// Create and map an overlay of `width x height` at the root origin.
    pub fn open(
        display: &'d DisplayConnection,
        width: u32,
        height: u32,
        config: OverlayConfig,
    ) -> OverlayResult<Self> {
        let conn = display.conn();
        let screen = display.screen();
        let width = u16::try_from(width).map_err(|_| ParseError::InvalidValue)?;
        let height = u16::try_from(height).map_err(|_| ParseError::InvalidValue)?;

        let wm_protocols = conn.intern_atom(false, b"WM_PROTOCOLS")?;
        let wm_delete_window = conn.intern_atom(false, b"WM_DELETE_WINDOW")?;
        let wm_protocols = wm_protocols.reply()?.atom;
        let wm_delete_window = wm_delete_window.reply()?.atom;

        let keyboard = KeyboardMap::query(conn)?;

        let font = conn.generate_id()?;
        conn.open_font(font, b"cursor")?;
        let cursor = conn.generate_id()?;
        conn.create_glyph_cursor(
            cursor,
            font,
            font,
            CROSSHAIR_GLYPH,
            CROSSHAIR_GLYPH + 1,
            0,
            0,
            0,
            0xffff,
            0xffff,
            0xffff,
        )?;
        conn.close_font(font)?;

        let window = conn.generate_id()?;
        let aux = CreateWindowAux::new()
            .background_pixel(screen.black_pixel)
            .override_redirect(1u32)
            .save_under(1u32)
            .cursor(cursor)
            .event_mask(
                EventMask::EXPOSURE
                    | EventMask::STRUCTURE_NOTIFY
                    | EventMask::KEY_PRESS
                    | EventMask::BUTTON_PRESS
                    | EventMask::BUTTON_RELEASE
                    | EventMask::POINTER_MOTION,
            );
        conn.create_window(
            COPY_DEPTH_FROM_PARENT,
            window,
            screen.root,
            0,
            0,
            width,
            height,
            0,
            WindowClass::INPUT_OUTPUT,
            COPY_FROM_PARENT,
            &aux,
        )?;

        conn.change_property8(PropMode::REPLACE, window, AtomEnum::WM_NAME, AtomEnum::STRING, WINDOW_NAME)?;
        conn.change_property8(PropMode::REPLACE, window, AtomEnum::WM_CLASS, AtomEnum::STRING, WINDOW_CLASS)?;
        conn.change_property32(PropMode::REPLACE, window, wm_protocols, AtomEnum::ATOM, &[wm_delete_window])?;

        let gc = conn.generate_id()?;
        conn.create_gc(gc, window, &CreateGCAux::new().graphics_exposures(0u32))?;

        conn.map_window(window)?;
        conn.flush()?;
        log::debug!("Overlay window {:#x} mapped at {}x{}", window, width, height);

        Ok(Self {
            display,
            window,
            gc,
            cursor,
            wm_atoms: WmAtoms {
                protocols: wm_protocols,
                delete_window: wm_delete_window,
            },
            keyboard,
            config,
            width,
            height,
        })
    }

    /// Open an overlay sized to `frame` and run the selection loop on it.
    pub fn show(
        display: &'d DisplayConnection,
        frame: &FrameBuffer,
        config: OverlayConfig,
    ) -> OverlayResult<SelectionOutcome> {
        let mut overlay = Self::open(display, frame.width(), frame.height(), config)?;
        overlay.run(frame)
    }

    /// Poll, update and render until the session reaches a terminal outcome.
    pub fn run(&mut self, frame: &FrameBuffer) -> OverlayResult<SelectionOutcome> {
        let mut session = SelectionSession::new(frame.width(), frame.height());
        let mut target = RasterTarget::new(u32::from(self.width), u32::from(self.height));
        let renderer = OverlayRenderer::new();
        let mut mapped = false;
        let mut dirty = true;

        loop {
            let frame_start = Instant::now();

            if let Some(outcome) = session.resolve() {
                log::info!("Selection finished: {:?}", outcome);
                return Ok(outcome);
            }

            while let Some(event) = self.display.conn().poll_for_event()? {
                match event {
                    Event::MapNotify(_) => {
                        mapped = true;
                        dirty = true;
                        self.grab_keyboard()?;
                    }
                    Event::Expose(e) if e.count == 0 => dirty = true,
                    Event::Error(e) => return Err(ReplyError::X11Error(e).into()),
                    other => {
                        let input =
                            translate_event(&self.keyboard, &self.config.bindings, &self.wm_atoms, &other);
                        if let Some(input) = input {
                            dirty |= session.handle(input);
                        }
                    }
                }
            }

            if mapped && dirty && !session.is_finished() {
                renderer.render(&mut target, frame, session.selection_rect());
                self.present(&target)?;
                dirty = false;
            }
            self.display.conn().flush()?;

            if let Some(rest) = self.config.frame_interval.checked_sub(frame_start.elapsed()) {
                std::thread::sleep(rest);
            }
        }
    }

    /// Server-side id of the overlay window
    pub fn window(&self) -> Window {
        self.window
    }

    fn grab_keyboard(&self) -> OverlayResult<()> {
        let conn = self.display.conn();
        grab_with_retry(
            || {
                let status = conn
                    .grab_keyboard(false, self.window, CURRENT_TIME, GrabMode::ASYNC, GrabMode::ASYNC)?
                    .reply()?
                    .status;
                Ok(status)
            },
            GRAB_ATTEMPTS,
            GRAB_RETRY_INTERVAL,
        )
    }

    fn present(&self, target: &RasterTarget) -> OverlayResult<()> {
        let image = Image::new(
            self.width,
            self.height,
            ScanlinePad::Pad32,
            self.display.screen().root_depth,
            BitsPerPixel::B32,
            ImageOrder::LsbFirst,
            Cow::Borrowed(target.pixels()),
        )?;
        image.put(self.display.conn(), self.window, self.gc, 0, 0)?;
        Ok(())
    }
}

/// Map a raw X event to session input, dropping everything irrelevant.
pub fn translate_event(
    keyboard: &KeyboardMap,
    bindings: &KeyBindings,
    atoms: &WmAtoms,
    event: &Event,
) -> Option<SelectionEvent> {
    let at = |x: i16, y: i16| Point::new(i32::from(x), i32::from(y));
    match event {
        Event::MotionNotify(e) => Some(SelectionEvent::PointerMotion(at(e.event_x, e.event_y))),
        Event::ButtonPress(e) => Some(SelectionEvent::ButtonPress {
            button: e.detail,
            at: at(e.event_x, e.event_y),
        }),
        Event::ButtonRelease(e) => Some(SelectionEvent::ButtonRelease {
            button: e.detail,
            at: at(e.event_x, e.event_y),
        }),
        Event::KeyPress(e) => {
            let sym = keyboard.keysym(e.detail)?;
            let action = bindings.action_for(sym);
            log::trace!("Key {} -> keysym {:#x} -> {:?}", e.detail, sym, action);
            action.map(SelectionEvent::Key)
        }
        Event::ClientMessage(e)
            if e.type_ == atoms.protocols
                && e.format == 32
                && e.data.as_data32()[0] == atoms.delete_window =>
        {
            Some(SelectionEvent::CloseRequested)
        }
        _ => None,
    }
}

/// Call `attempt` until it reports a successful grab.
///
/// Another client may still hold the keyboard right after the overlay maps,
/// so a refused grab is retried up to `attempts` times, `interval` apart.
fn grab_with_retry(
    mut attempt: impl FnMut() -> OverlayResult<GrabStatus>,
    attempts: u32,
    interval: Duration,
) -> OverlayResult<()> {
    let mut status = GrabStatus::NOT_VIEWABLE;
    for n in 0..attempts {
        if n > 0 {
            std::thread::sleep(interval);
        }
        status = attempt()?;
        if status == GrabStatus::SUCCESS {
            log::debug!("Keyboard grabbed after {} attempt(s)", n + 1);
            return Ok(());
        }
        log::trace!("Keyboard grab refused: {:?}", status);
    }
    Err(OverlayError::KeyboardGrab(status))
}

impl Drop for OverlayWindow<'_> {
    fn drop(&mut self) {
        let conn = self.display.conn();
        let released = conn
            .ungrab_keyboard(CURRENT_TIME)
            .map(|cookie| cookie.ignore_error())
            .and_then(|_| conn.free_gc(self.gc).map(|cookie| cookie.ignore_error()))
            .and_then(|_| conn.destroy_window(self.window).map(|cookie| cookie.ignore_error()))
            .and_then(|_| conn.free_cursor(self.cursor).map(|cookie| cookie.ignore_error()))
            .and_then(|_| conn.flush());
        match released {
            Ok(()) => log::debug!("Overlay window {:#x} destroyed", self.window),
            Err(e) => log::warn!("Failed to release overlay window {:#x}: {}", self.window, e),
        }
    }
}
