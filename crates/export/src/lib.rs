//! Export module for xsnip
//!
//! Writes a cropped capture as PNG or PPM, names output files after the
//! capture time and hands PNG bytes to the clipboard.

mod clipboard;
mod naming;
mod png;
mod ppm;

pub use clipboard::{Clipboard, XclipClipboard};
pub use naming::{default_output_dir, output_path};
pub use png::{encode_png, PngExporter};
pub use ppm::{write_ppm, PpmExporter};

use capture_x11::FrameBuffer;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Nothing to export: frame buffer is empty")]
    EmptyFrame,

    #[error("Clipboard error: {0}")]
    Clipboard(String),
}

impl ExportError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        ExportError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Export format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Png,
    Ppm,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Ppm => "ppm",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Ppm => "image/x-portable-pixmap",
        }
    }

    /// Write `frame` to `path` in this format.
    pub fn save(self, frame: &FrameBuffer, path: &Path) -> ExportResult<()> {
        match self {
            ExportFormat::Png => PngExporter::save(frame, path),
            ExportFormat::Ppm => PpmExporter::save(frame, path),
        }
    }
}

pub(crate) fn ensure_exportable(frame: &FrameBuffer) -> ExportResult<()> {
    if frame.is_destroyed() || frame.width() == 0 || frame.height() == 0 {
        return Err(ExportError::EmptyFrame);
    }
    Ok(())
}
