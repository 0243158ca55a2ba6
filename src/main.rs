//! uberkb - thin CLI driver for the keyboard remap engine.
//!
//! `uberkb <device-path|keyboard-name>`. Concrete profiles (the actual
//! key maps for specific hardware) and the `install` subcommand that
//! wires a service-manager unit file are out of scope for this binary;
//! it selects a single identity passthrough [`KeyMap`] and hands off to
//! the engine. A packaging layer on top of this crate is expected to
//! build richer `KeyMap`s per device and dispatch subcommands before
//! reaching this entry point.

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use uberkb::{DeviceSelector, EngineState, KeyMap};

fn main() -> ExitCode {
    let Some(target) = std::env::args().nth(1) else {
        eprintln!("usage: uberkb <device-path|keyboard-name>");
        return ExitCode::FAILURE;
    };

    let keymap = match KeyMap::builder().build() {
        Ok(keymap) => keymap,
        Err(e) => {
            eprintln!("uberkb: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(if keymap.debug() { Level::TRACE } else { Level::INFO })
        .with_target(false)
        .compact()
        .init();

    info!("uberkb starting against {target:?}");

    let mut engine = match EngineState::create(keymap, DeviceSelector::parse(&target)) {
        Ok(engine) => engine,
        Err(e) => {
            error!("failed to acquire device {target:?}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("shutdown signal received");
        running_clone.store(false, Ordering::SeqCst);
    }) {
        error!("failed to install signal handler: {e}");
        return ExitCode::FAILURE;
    }

    match engine.run(&running) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}
