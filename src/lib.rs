//! uberkb - Linux user-space keyboard remapper daemon
//!
//! Grabs exclusive control of a physical keyboard device, rewrites its
//! event stream according to a configured [`KeyMap`], and emits the
//! rewritten stream (plus a synthetic mouse) through kernel-provided
//! uinput virtual devices. See [`EngineState`] for the entry point.

pub mod config;
pub mod device;
pub mod engine;
pub mod keyboard_sink;
pub mod mouse_sink;
pub mod wire;

pub use config::{KeyMap, KeyMapBuilder};
pub use engine::{DeviceSelector, EngineState};

use thiserror::Error;

/// Error taxonomy for the remap engine (§7 of the design).
#[derive(Error, Debug)]
pub enum EngineError {
    /// Any failed syscall: open, ioctl, write, poll, or an evdev read
    /// returning an unrecognized negative status. Always fatal.
    #[error("I/O error: {0}")]
    Io(String),

    /// Device is not QWERTY, or a configuration value is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Name-search exhausted every `/dev/input/event*` entry with no match.
    #[error("not found: {0}")]
    NotFound(String),

    /// Internal invariant violation — a configuration or state bug, not a
    /// recoverable runtime condition.
    #[error("assertion failed: {0}")]
    Assertion(String),
}
