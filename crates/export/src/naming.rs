//! Output file naming

use crate::{ExportError, ExportFormat, ExportResult};
use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H%M%S";

/// `<dir>/<YYYY-MM-DD-HHMMSS>.<ext>`, creating `dir` if it does not exist.
pub fn output_path<Tz>(dir: &Path, format: ExportFormat, now: &DateTime<Tz>) -> ExportResult<PathBuf>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    fs::create_dir_all(dir).map_err(|e| ExportError::io(dir, e))?;
    let stem = now.format(TIMESTAMP_FORMAT);
    Ok(dir.join(format!("{}.{}", stem, format.extension())))
}

/// The user's pictures directory, or the working directory when unknown.
pub fn default_output_dir() -> PathBuf {
    dirs::picture_dir().unwrap_or_else(|| PathBuf::from("."))
}
