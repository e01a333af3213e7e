//! Binary PPM (P6) export

use crate::{ensure_exportable, ExportError, ExportResult};
use capture_x11::FrameBuffer;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write `frame` as binary PPM: `P6\n<w>\n<h>\n255\n` then R,G,B triples.
pub fn write_ppm<W: Write>(frame: &FrameBuffer, out: &mut W) -> std::io::Result<()> {
    write!(out, "P6\n{}\n{}\n255\n", frame.width(), frame.height())?;
    out.write_all(&frame.to_rgb_bytes())?;
    out.flush()
}

/// PPM file exporter
pub struct PpmExporter;

impl PpmExporter {
    pub fn save(frame: &FrameBuffer, path: &Path) -> ExportResult<()> {
        ensure_exportable(frame)?;

        let file = File::create(path).map_err(|e| ExportError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        write_ppm(frame, &mut writer).map_err(|e| ExportError::io(path, e))?;

        log::debug!("Wrote PPM {}x{} to {}", frame.width(), frame.height(), path.display());
        Ok(())
    }
}
