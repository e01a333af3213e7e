//! Scoped MIT-SHM segment

use crate::CaptureResult;
use memmap2::MmapMut;
use std::fs::File;
use tempfile::tempfile;
use x11rb::connection::Connection;
use x11rb::protocol::shm::{self, ConnectionExt as _};

/// Shared memory region attached to the X server.
///
/// Construction maps an anonymous file and attaches it; dropping the value
/// detaches it from the server and unmaps it, exactly once.
pub struct ShmSegment<'c, C: Connection> {
    conn: &'c C,
    seg: shm::Seg,
    map: MmapMut,
    _file: File,
}

impl<'c, C: Connection> ShmSegment<'c, C> {
    /// Allocate and attach `size` bytes.
    pub fn attach(conn: &'c C, size: usize) -> CaptureResult<Self> {
        let file = tempfile()?;
        file.set_len(size as u64)?;

        // SAFETY: the file is private to this process and only the X server
        // writes to it, while we block on the request that fills it.
        let map = unsafe { MmapMut::map_mut(&file)? };

        let seg = conn.generate_id()?;
        conn.shm_attach_fd(seg, file.try_clone()?, false)?.check()?;
        log::debug!("Attached shm segment {:#x} ({} bytes)", seg, size);

        Ok(Self {
            conn,
            seg,
            map,
            _file: file,
        })
    }

    /// Server-side segment id
    pub fn seg(&self) -> shm::Seg {
        self.seg
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.map
    }
}

impl<C: Connection> Drop for ShmSegment<'_, C> {
    fn drop(&mut self) {
        let detached = self
            .conn
            .shm_detach(self.seg)
            .map(|cookie| cookie.ignore_error())
            .and_then(|_| self.conn.flush());
        if let Err(e) = detached {
            log::warn!("Failed to detach shm segment {:#x}: {}", self.seg, e);
        }
    }
}
