//! PNG export

use crate::{ensure_exportable, ExportError, ExportResult};
use capture_x11::FrameBuffer;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Encode `frame` as an 8-bit RGB PNG into memory.
pub fn encode_png(frame: &FrameBuffer) -> ExportResult<Vec<u8>> {
    ensure_exportable(frame)?;
    let mut out = Vec::new();
    write_png(frame, &mut out)?;
    Ok(out)
}

fn write_png<W: Write>(frame: &FrameBuffer, out: W) -> ExportResult<()> {
    let rgb = frame.to_rgb_bytes();
    PngEncoder::new(out).write_image(&rgb, frame.width(), frame.height(), ExtendedColorType::Rgb8)?;
    Ok(())
}

/// PNG file exporter
pub struct PngExporter;

impl PngExporter {
    pub fn save(frame: &FrameBuffer, path: &Path) -> ExportResult<()> {
        ensure_exportable(frame)?;

        let file = File::create(path).map_err(|e| ExportError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        write_png(frame, &mut writer)?;
        writer.flush().map_err(|e| ExportError::io(path, e))?;

        log::debug!("Wrote PNG {}x{} to {}", frame.width(), frame.height(), path.display());
        Ok(())
    }
}
