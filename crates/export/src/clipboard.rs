//! Clipboard hand-off through `xclip`

use crate::{ExportError, ExportResult};
use std::io::Write;
use std::process::{Command, Stdio};

/// Something that can take ownership of image bytes for pasting elsewhere.
pub trait Clipboard {
    fn publish_image(&self, bytes: &[u8], mime_type: &str) -> ExportResult<()>;
}

/// Pipes the bytes into `xclip -selection clipboard -t <mime>`.
///
/// `xclip` forks into the background to serve paste requests, so the
/// clipboard content outlives this process.
#[derive(Debug, Clone)]
pub struct XclipClipboard {
    program: String,
}

impl Default for XclipClipboard {
    fn default() -> Self {
        Self {
            program: "xclip".into(),
        }
    }
}

#[cfg(test)]
impl XclipClipboard {
    fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Clipboard for XclipClipboard {
    fn publish_image(&self, bytes: &[u8], mime_type: &str) -> ExportResult<()> {
        let mut child = Command::new(&self.program)
            .args(["-selection", "clipboard", "-t", mime_type])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ExportError::Clipboard(format!("Failed to run {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(bytes)
                .map_err(|e| ExportError::Clipboard(format!("Failed to write to {}: {}", self.program, e)))?;
        }

        // stdin is closed by now; the foreground process exits once it has read everything
        let status = child
            .wait()
            .map_err(|e| ExportError::Clipboard(format!("{} did not finish: {}", self.program, e)))?;
        if !status.success() {
            return Err(ExportError::Clipboard(format!("{} exited with {}", self.program, status)));
        }

        log::info!("Copied {} bytes ({}) to clipboard", bytes.len(), mime_type);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_clipboard_error() {
        let clipboard = XclipClipboard::with_program("xsnip-no-such-clipboard-tool");
        assert!(matches!(
            clipboard.publish_image(b"data", "image/png"),
            Err(ExportError::Clipboard(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_program_is_clipboard_error() {
        let clipboard = XclipClipboard::with_program("false");
        assert!(clipboard.publish_image(b"", "image/png").is_err());
    }
}
