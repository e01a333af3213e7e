//! Command line and run configuration

use clap::{ArgAction, Parser, ValueEnum};
use export::{default_output_dir, ExportFormat};
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;

/// Longest accepted `--delay`, in seconds
pub const MAX_DELAY_SECS: u64 = 10;

#[derive(Parser, Debug)]
#[command(
    name = "xsnip",
    version,
    about = "Capture the X11 screen, pick a region and save it as PNG or PPM"
)]
pub struct Cli {
    /// Output image format
    #[arg(long, value_enum, default_value_t = FormatArg::Png)]
    pub format: FormatArg,

    /// Directory for saved screenshots (default: pictures directory)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Copy the result to the clipboard as PNG
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "no_clipboard")]
    pub clipboard: bool,

    /// Never touch the clipboard
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_clipboard: bool,

    /// Disable desktop notifications
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_notify: bool,

    /// Skip the overlay and capture this target directly
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Seconds to wait before capturing
    #[arg(long, value_name = "SECONDS", default_value_t = 0,
          value_parser = clap::value_parser!(u64).range(0..=MAX_DELAY_SECS))]
    pub delay: u64,

    /// X display to connect to (default: $DISPLAY)
    #[arg(long, value_name = "NAME")]
    pub display: Option<String>,

    /// More logging; repeat for trace output
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Png,
    Ppm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Interactive overlay (same as no --mode)
    Selection,
    /// Window that had focus when xsnip started
    Window,
    /// Monitor under the pointer
    Screen,
    /// Whole root window
    Full,
}

/// How the crop target is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    Interactive,
    FocusedWindow,
    CurrentMonitor,
    FullScreen,
}

/// Resolved settings for one run
#[derive(Debug, Clone)]
pub struct Config {
    pub format: ExportFormat,
    pub output_dir: PathBuf,
    pub copy_to_clipboard: bool,
    pub notify: bool,
    pub mode: CaptureMode,
    pub delay: Duration,
    pub display: Option<String>,
    pub log_level: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            format: ExportFormat::Png,
            output_dir: default_output_dir(),
            copy_to_clipboard: true,
            notify: true,
            mode: CaptureMode::Interactive,
            delay: Duration::ZERO,
            display: None,
            log_level: LevelFilter::Info,
        }
    }
}

impl Cli {
    pub fn into_config(self) -> Config {
        let format = match self.format {
            FormatArg::Png => ExportFormat::Png,
            FormatArg::Ppm => ExportFormat::Ppm,
        };

        let copy_to_clipboard = if self.no_clipboard {
            false
        } else {
            self.clipboard || format == ExportFormat::Png
        };

        let mode = match self.mode {
            None | Some(ModeArg::Selection) => CaptureMode::Interactive,
            Some(ModeArg::Window) => CaptureMode::FocusedWindow,
            Some(ModeArg::Screen) => CaptureMode::CurrentMonitor,
            Some(ModeArg::Full) => CaptureMode::FullScreen,
        };

        let log_level = match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        let defaults = Config::default();
        Config {
            format,
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            copy_to_clipboard,
            notify: !self.no_notify,
            mode,
            delay: Duration::from_secs(self.delay.min(MAX_DELAY_SECS)),
            display: self.display,
            log_level,
        }
    }
}
