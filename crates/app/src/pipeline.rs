//! Capture, select, crop and deliver

use crate::config::{CaptureMode, Config};
use crate::notify::Notifier;
use crate::state::StateMachine;
use anyhow::Context;
use capture_x11::{
    clamp_to, DisplayConnection, DisplayQueries, FrameBuffer, GeometryResolver, Rect, ScreenCapturer,
    X11Display,
};
use chrono::{DateTime, Local};
use export::{encode_png, output_path, Clipboard};
use overlay::{OverlayConfig, OverlayWindow, SelectionOutcome};
use std::path::PathBuf;

/// What the crop should cover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTarget {
    Region(Rect),
    FullScreen,
    FocusedWindow,
    CurrentMonitor,
}

impl CaptureTarget {
    /// `None` when the user cancelled.
    pub fn from_outcome(outcome: SelectionOutcome) -> Option<Self> {
        match outcome {
            SelectionOutcome::Region(rect) => Some(CaptureTarget::Region(rect)),
            SelectionOutcome::FullScreen => Some(CaptureTarget::FullScreen),
            SelectionOutcome::FocusedWindow => Some(CaptureTarget::FocusedWindow),
            SelectionOutcome::CurrentMonitor => Some(CaptureTarget::CurrentMonitor),
            SelectionOutcome::Cancelled => None,
        }
    }

    /// Target for a non-interactive `--mode`.
    pub fn from_mode(mode: CaptureMode) -> Option<Self> {
        match mode {
            CaptureMode::Interactive => None,
            CaptureMode::FocusedWindow => Some(CaptureTarget::FocusedWindow),
            CaptureMode::CurrentMonitor => Some(CaptureTarget::CurrentMonitor),
            CaptureMode::FullScreen => Some(CaptureTarget::FullScreen),
        }
    }
}

/// How a run ended, short of an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Saved(PathBuf),
    Cancelled,
}

/// Crop rectangle for `target` inside the captured `bounds`; `None` keeps
/// the whole capture.
pub fn resolve_target<Q: DisplayQueries>(
    target: CaptureTarget,
    resolver: &GeometryResolver<Q>,
    bounds: Rect,
) -> anyhow::Result<Option<Rect>> {
    let rect = match target {
        CaptureTarget::Region(rect) => rect,
        CaptureTarget::FullScreen => {
            log::info!("Capture target {:?} -> whole frame", target);
            return Ok(None);
        }
        CaptureTarget::FocusedWindow => resolver
            .focused_window_rect()
            .context("Cannot resolve the focused window")?,
        CaptureTarget::CurrentMonitor => resolver
            .current_monitor_rect()
            .context("Cannot resolve the current monitor")?,
    };
    let clamped = clamp_to(rect, bounds)
        .with_context(|| format!("{:?} is outside the captured frame", target))?;
    log::info!("Capture target {:?} -> {:?}", target, clamped);
    Ok(Some(clamped))
}

/// Crop `frame` to `rect` (if any) and write it out.
///
/// The clipboard is best effort: a failure there is logged and the saved
/// file still counts as success.
pub fn deliver(
    frame: &mut FrameBuffer,
    rect: Option<Rect>,
    config: &Config,
    clipboard: Option<&dyn Clipboard>,
    now: &DateTime<Local>,
) -> anyhow::Result<PathBuf> {
    if let Some(rect) = rect {
        frame.crop_rect(&rect);
    }

    let path = output_path(&config.output_dir, config.format, now)
        .context("Cannot prepare output directory")?;
    config
        .format
        .save(frame, &path)
        .with_context(|| format!("Cannot save screenshot to {}", path.display()))?;
    log::info!("Saved {}x{} screenshot to {}", frame.width(), frame.height(), path.display());

    if let Some(clipboard) = clipboard {
        let published = encode_png(frame)
            .and_then(|png| clipboard.publish_image(&png, export::ExportFormat::Png.mime_type()));
        if let Err(e) = published {
            log::warn!("Clipboard copy failed: {}", e);
        }
    }

    Ok(path)
}

/// One complete run against the X server.
pub fn run(
    config: &Config,
    machine: &mut StateMachine,
    clipboard: Option<&dyn Clipboard>,
    notifier: &dyn Notifier,
) -> anyhow::Result<RunOutcome> {
    let display = DisplayConnection::open(config.display.as_deref()).context("Cannot open X display")?;

    if !config.delay.is_zero() {
        log::info!("Waiting {:?} before capture", config.delay);
        std::thread::sleep(config.delay);
    }

    machine.start_capturing()?;
    let mut frame = ScreenCapturer::new(&display)
        .and_then(|capturer| capturer.capture())
        .context("Screen capture failed")?;

    let mut resolver = GeometryResolver::new(X11Display::new(&display));
    if let Err(e) = resolver.remember_focus() {
        log::warn!("Could not record the focused window: {}", e);
    }

    let target = match CaptureTarget::from_mode(config.mode) {
        Some(target) => target,
        None => {
            machine.start_selecting()?;
            let outcome = OverlayWindow::show(&display, &frame, OverlayConfig::default())
                .context("Selection overlay failed")?;
            match CaptureTarget::from_outcome(outcome) {
                Some(target) => target,
                None => {
                    machine.cancel()?;
                    frame.destroy();
                    return Ok(RunOutcome::Cancelled);
                }
            }
        }
    };

    machine.start_saving()?;
    let rect = match resolve_target(target, &resolver, frame.bounds()) {
        Ok(rect) => rect,
        Err(e) => {
            notifier.show("Screenshot failed", &format!("{:#}", e));
            return Err(e);
        }
    };

    let path = deliver(&mut frame, rect, config, clipboard, &Local::now())?;
    frame.destroy();
    machine.finish()?;

    notifier.show("Screenshot saved", &path.display().to_string());
    Ok(RunOutcome::Saved(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture_x11::{CaptureError, CaptureResult, MonitorInfo, Point};
    use chrono::TimeZone;
    use export::{ExportError, ExportFormat, ExportResult};
    use std::cell::RefCell;
    use std::time::Duration;

    #[derive(Default)]
    struct StaticDisplay {
        focus: Option<u32>,
        root: Option<Rect>,
        monitors: Vec<MonitorInfo>,
        pointer: Point,
    }

    impl DisplayQueries for StaticDisplay {
        fn root(&self) -> u32 {
            1
        }

        fn root_rect(&self) -> CaptureResult<Rect> {
            Ok(self.root.unwrap_or(Rect::new(0, 0, 200, 100)))
        }

        fn input_focus(&self) -> CaptureResult<Option<u32>> {
            Ok(self.focus)
        }

        fn parent_of(&self, window: u32) -> CaptureResult<Option<u32>> {
            Ok(if window == 1 { None } else { Some(1) })
        }

        fn window_rect(&self, _window: u32) -> CaptureResult<Rect> {
            Ok(Rect::new(150, 80, 100, 100))
        }

        fn monitors(&self) -> CaptureResult<Vec<MonitorInfo>> {
            if self.monitors.is_empty() {
                return Err(CaptureError::GeometryUnavailable("RandR missing".into()));
            }
            Ok(self.monitors.clone())
        }

        fn pointer(&self) -> CaptureResult<Point> {
            Ok(self.pointer)
        }
    }

    #[derive(Default)]
    struct RecordingClipboard {
        calls: RefCell<Vec<(usize, String)>>,
        fail: bool,
    }

    impl Clipboard for RecordingClipboard {
        fn publish_image(&self, bytes: &[u8], mime_type: &str) -> ExportResult<()> {
            self.calls.borrow_mut().push((bytes.len(), mime_type.to_string()));
            if self.fail {
                return Err(ExportError::Clipboard("no clipboard".into()));
            }
            Ok(())
        }
    }

    fn frame(width: u32, height: u32) -> FrameBuffer {
        let data = [10u8, 20, 30, 255].repeat((width * height) as usize);
        FrameBuffer::from_raw(width, height, width as usize * 4, data)
    }

    fn config(dir: &std::path::Path, format: ExportFormat) -> Config {
        Config {
            format,
            output_dir: dir.to_path_buf(),
            copy_to_clipboard: true,
            notify: false,
            mode: CaptureMode::Interactive,
            delay: Duration::ZERO,
            display: None,
            log_level: log::LevelFilter::Info,
        }
    }

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_cancel_maps_to_no_target() {
        assert_eq!(CaptureTarget::from_outcome(SelectionOutcome::Cancelled), None);
        assert_eq!(
            CaptureTarget::from_outcome(SelectionOutcome::FullScreen),
            Some(CaptureTarget::FullScreen)
        );
        assert_eq!(CaptureTarget::from_mode(CaptureMode::Interactive), None);
    }

    #[test]
    fn test_full_screen_is_uncropped() {
        let resolver = GeometryResolver::new(StaticDisplay::default());
        let bounds = Rect::new(0, 0, 200, 100);
        assert_eq!(resolve_target(CaptureTarget::FullScreen, &resolver, bounds).unwrap(), None);
    }

    #[test]
    fn test_focused_window_is_clamped() {
        let resolver = GeometryResolver::new(StaticDisplay {
            focus: Some(7),
            ..Default::default()
        });
        let bounds = Rect::new(0, 0, 200, 100);
        assert_eq!(
            resolve_target(CaptureTarget::FocusedWindow, &resolver, bounds).unwrap(),
            Some(Rect::new(150, 80, 50, 20))
        );
    }

    #[test]
    fn test_region_is_clamped_to_frame() {
        let resolver = GeometryResolver::new(StaticDisplay::default());
        let bounds = Rect::new(0, 0, 200, 100);
        assert_eq!(
            resolve_target(CaptureTarget::Region(Rect::new(180, 90, 50, 50)), &resolver, bounds)
                .unwrap(),
            Some(Rect::new(180, 90, 20, 10))
        );
    }

    #[test]
    fn test_geometry_failure_propagates() {
        let resolver = GeometryResolver::new(StaticDisplay::default());
        let bounds = Rect::new(0, 0, 200, 100);
        let err = resolve_target(CaptureTarget::CurrentMonitor, &resolver, bounds).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CaptureError>(),
            Some(CaptureError::GeometryUnavailable(_))
        ));
    }

    #[test]
    fn test_monitor_beyond_captured_frame_fails_cleanly() {
        // root reports two heads but the capture only covered the first
        let resolver = GeometryResolver::new(StaticDisplay {
            root: Some(Rect::new(0, 0, 3840, 1080)),
            monitors: vec![
                MonitorInfo {
                    name: "DP-1".into(),
                    rect: Rect::new(0, 0, 1920, 1080),
                },
                MonitorInfo {
                    name: "HDMI-1".into(),
                    rect: Rect::new(1920, 0, 1920, 1080),
                },
            ],
            pointer: Point::new(2500, 300),
            ..Default::default()
        });
        let shot = frame(1920, 1080);

        let err = resolve_target(CaptureTarget::CurrentMonitor, &resolver, shot.bounds())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CaptureError>(),
            Some(CaptureError::GeometryUnavailable(_))
        ));
        assert_eq!((shot.width(), shot.height()), (1920, 1080));
    }

    #[test]
    fn test_deliver_crops_saves_and_copies() {
        let dir = tempfile::tempdir().unwrap();
        let clipboard = RecordingClipboard::default();
        let mut shot = frame(200, 100);

        let path = deliver(
            &mut shot,
            Some(Rect::new(20, 50, 80, 30)),
            &config(dir.path(), ExportFormat::Ppm),
            Some(&clipboard as &dyn Clipboard),
            &noon(),
        )
        .unwrap();

        assert_eq!(path, dir.path().join("2024-06-01-120000.ppm"));
        assert_eq!((shot.width(), shot.height()), (80, 30));
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"P6\n80\n30\n255\n"));

        let calls = clipboard.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, "image/png");
    }

    #[test]
    fn test_clipboard_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let clipboard = RecordingClipboard {
            fail: true,
            ..Default::default()
        };
        let mut shot = frame(4, 4);

        let path = deliver(
            &mut shot,
            None,
            &config(dir.path(), ExportFormat::Png),
            Some(&clipboard as &dyn Clipboard),
            &noon(),
        );
        assert!(path.unwrap().exists());
    }
}
