//! Root window snapshot over MIT-SHM

use crate::{CaptureError, CaptureResult, DisplayConnection, FrameBuffer, ShmSegment, BYTES_PER_PIXEL};
use std::time::Instant;
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::shm::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{ConnectionExt as _, Format, ImageFormat};

/// Minimum MIT-SHM version with fd passing (`ShmAttachFd`)
const SHM_FD_VERSION: (u16, u16) = (1, 2);

/// Capture source for the whole root window
pub struct ScreenCapturer<'d> {
    display: &'d DisplayConnection,
}

impl<'d> ScreenCapturer<'d> {
    /// Create a capturer, failing early if the server cannot share memory.
    pub fn new(display: &'d DisplayConnection) -> CaptureResult<Self> {
        let conn = display.conn();
        if conn.extension_information(shm::X11_EXTENSION_NAME)?.is_none() {
            return Err(CaptureError::ShmUnavailable);
        }

        let version = conn.shm_query_version()?.reply()?;
        if (version.major_version, version.minor_version) < SHM_FD_VERSION {
            log::error!(
                "MIT-SHM {}.{} lacks fd passing",
                version.major_version,
                version.minor_version
            );
            return Err(CaptureError::ShmUnavailable);
        }

        Ok(Self { display })
    }

    /// Take one snapshot of the root window.
    ///
    /// Blocks until the server has written the pixels, copies them into an
    /// owned buffer and releases the shared segment before returning.
    pub fn capture(&self) -> CaptureResult<FrameBuffer> {
        let started = Instant::now();
        let conn = self.display.conn();
        let root = self.display.root();

        let geometry = conn.get_geometry(root)?.reply()?;
        let (width, height) = (geometry.width, geometry.height);
        let stride = server_stride(&conn.setup().pixmap_formats, geometry.depth, width)?;
        let size = stride * height as usize;

        let segment = ShmSegment::attach(conn, size)?;
        let reply = conn
            .shm_get_image(
                root,
                0,
                0,
                width,
                height,
                !0,
                ImageFormat::Z_PIXMAP.into(),
                segment.seg(),
                0,
            )?
            .reply()?;
        log::debug!("shm_get_image: depth {}, {} bytes", reply.depth, reply.size);

        let data = segment.as_slice()[..size].to_vec();
        let mut frame = FrameBuffer::from_raw(u32::from(width), u32::from(height), stride, data);
        frame.normalize_alpha();
        drop(segment);

        log::info!(
            "Captured {}x{} (stride {}) in {:?}",
            width,
            height,
            stride,
            started.elapsed()
        );
        Ok(frame)
    }
}

/// Bytes per scanline the server uses for a Z-pixmap of `depth` and `width`.
pub fn server_stride(formats: &[Format], depth: u8, width: u16) -> CaptureResult<usize> {
    let format = formats
        .iter()
        .find(|f| f.depth == depth)
        .ok_or_else(|| CaptureError::UnsupportedFormat(format!("no pixmap format for depth {}", depth)))?;

    if usize::from(format.bits_per_pixel) != BYTES_PER_PIXEL * 8 {
        return Err(CaptureError::UnsupportedFormat(format!(
            "{} bits per pixel at depth {}",
            format.bits_per_pixel, depth
        )));
    }

    let pad = usize::from(format.scanline_pad.max(8));
    let bits = usize::from(width) * usize::from(format.bits_per_pixel);
    Ok(bits.div_ceil(pad) * pad / 8)
}
