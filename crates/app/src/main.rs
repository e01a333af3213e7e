//! xsnip - X11 screenshot tool with interactive region selection

mod config;
mod notify;
mod pipeline;
mod state;

use crate::config::{Cli, Config};
use crate::notify::{NotifySend, Notifier, NullNotifier};
use crate::pipeline::RunOutcome;
use crate::state::StateMachine;
use capture_x11::CaptureError;
use clap::Parser;
use export::{Clipboard, XclipClipboard};
use overlay::OverlayError;
use std::process::ExitCode;

const APP_NAME: &str = "xsnip";

/// Exit status for X protocol and connection failures
const EXIT_X_ERROR: u8 = 13;

fn main() -> ExitCode {
    let config = Cli::parse().into_config();
    init_logging(&config);

    let notifier: Box<dyn Notifier> = if config.notify {
        Box::new(NotifySend::init(APP_NAME))
    } else {
        Box::new(NullNotifier)
    };
    let xclip = XclipClipboard::default();
    let clipboard = config.copy_to_clipboard.then_some(&xclip as &dyn Clipboard);

    let mut machine = StateMachine::new();
    let code = match pipeline::run(&config, &mut machine, clipboard, notifier.as_ref()) {
        Ok(RunOutcome::Saved(path)) => {
            println!("Saved screenshot to \"{}\"", path.display());
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Cancelled) => {
            println!("Cancelled");
            ExitCode::SUCCESS
        }
        Err(e) => {
            if let Err(refused) = machine.fail() {
                log::debug!("{}", refused);
            }
            log::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code_for(&e))
        }
    };

    log::debug!("Finished in state {:?}", machine.state());
    notifier.uninit();
    code
}

fn init_logging(config: &Config) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level.as_str()))
        .format_timestamp_millis()
        .init();
}

/// 13 for anything the X server or its connection raised, 1 otherwise.
fn exit_code_for(error: &anyhow::Error) -> u8 {
    let is_x_error = error.chain().any(|cause| {
        if let Some(e) = cause.downcast_ref::<CaptureError>() {
            e.is_protocol_error()
        } else if let Some(e) = cause.downcast_ref::<OverlayError>() {
            e.is_protocol_error()
        } else {
            false
        }
    });

    if is_x_error {
        EXIT_X_ERROR
    } else {
        1
    }
}
