//! Desktop notifications

use std::process::{Command, Stdio};

/// Milliseconds a notification stays on screen
pub const NOTIFY_TIMEOUT_MS: u32 = 5000;

/// Best-effort user notification; failures never abort a capture.
pub trait Notifier {
    fn show(&self, title: &str, message: &str);

    fn uninit(&self) {}
}

/// Shells out to `notify-send`.
pub struct NotifySend {
    app_name: String,
    timeout_ms: u32,
}

impl NotifySend {
    pub fn init(app_name: &str) -> Self {
        log::debug!("Notifications enabled for {}", app_name);
        Self {
            app_name: app_name.to_string(),
            timeout_ms: NOTIFY_TIMEOUT_MS,
        }
    }

    fn args<'a>(&'a self, timeout: &'a str, title: &'a str, message: &'a str) -> [&'a str; 6] {
        ["-a", self.app_name.as_str(), "-t", timeout, title, message]
    }
}

impl Notifier for NotifySend {
    fn show(&self, title: &str, message: &str) {
        let timeout = self.timeout_ms.to_string();
        let result = Command::new("notify-send")
            .args(self.args(&timeout, title, message))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match result {
            Ok(status) if status.success() => {}
            Ok(status) => log::warn!("notify-send exited with {}", status),
            Err(e) => log::warn!("Failed to run notify-send: {}", e),
        }
    }
}

/// Used with `--no-notify`
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn show(&self, title: &str, message: &str) {
        log::debug!("Notification suppressed: {}: {}", title, message);
    }
}
