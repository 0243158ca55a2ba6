//! Device Acquirer (C1) — open the physical keyboard, verify it's QWERTY,
//! grab it exclusively.
//!
//! Modeled on the evdev enumeration pattern used elsewhere in this codebase's
//! neighboring platform-capture modules: `evdev::enumerate()` over
//! `/dev/input/event*`, filtered by supported key capability.

use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;

use evdev::{Device, Key};
use tracing::debug;

use crate::EngineError;

const QWERTY_PROBE_KEYS: &[Key] = &[
    Key::KEY_Q,
    Key::KEY_W,
    Key::KEY_E,
    Key::KEY_ESC,
    Key::KEY_CAPSLOCK,
];

/// An exclusively-grabbed physical input device. `Drop` ungrabs and closes
/// the fd, matching the teardown ordering the spec requires: handles are
/// either fully initialized or fully released, never partial.
pub struct PhysicalDevice {
    device: Device,
}

impl PhysicalDevice {
    /// Open by explicit path, e.g. `/dev/input/event3`.
    pub fn open_by_path(path: &Path) -> Result<Self, EngineError> {
        let mut device = open_nonblocking(path)?;
        if !is_qwerty(&device) {
            return Err(EngineError::InvalidArgument(format!(
                "{} is not a QWERTY keyboard",
                path.display()
            )));
        }
        device
            .grab()
            .map_err(|e| EngineError::Io(format!("grab {}: {e}", path.display())))?;
        Ok(Self { device })
    }

    /// Enumerate `/dev/input/event*`, selecting the first QWERTY device
    /// whose driver-reported name matches `target` exactly.
    pub fn open_by_name(target: &str) -> Result<Self, EngineError> {
        for (path, device) in evdev::enumerate() {
            let name = device.name().unwrap_or("<unnamed>").to_string();
            let phys = device.physical_path().unwrap_or("<no phys>").to_string();
            let qwerty = is_qwerty(&device);
            debug!(path = %path.display(), name, phys, qwerty, "candidate device");

            if qwerty && name == target {
                let mut device = device;
                device
                    .grab()
                    .map_err(|e| EngineError::Io(format!("grab {}: {e}", path.display())))?;
                set_nonblocking(device.as_raw_fd())?;
                return Ok(Self { device });
            }
            // Non-matches are dropped here, releasing their fds before the
            // next candidate is opened.
        }
        Err(EngineError::NotFound(format!(
            "no QWERTY keyboard named {target:?} found under /dev/input"
        )))
    }

    pub fn fd(&self) -> RawFd {
        self.device.as_raw_fd()
    }

    pub fn name(&self) -> &str {
        self.device.name().unwrap_or("<unnamed>")
    }

    pub fn phys(&self) -> &str {
        self.device.physical_path().unwrap_or("<no phys>")
    }
}

impl Drop for PhysicalDevice {
    fn drop(&mut self) {
        let _ = self.device.ungrab();
    }
}

fn open_nonblocking(path: &Path) -> Result<Device, EngineError> {
    let device =
        Device::open(path).map_err(|e| EngineError::Io(format!("open {}: {e}", path.display())))?;
    set_nonblocking(device.as_raw_fd())?;
    Ok(device)
}

fn set_nonblocking(fd: RawFd) -> Result<(), EngineError> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL, 0) };
    if flags < 0 {
        return Err(EngineError::Io(format!(
            "fcntl(F_GETFL): {}",
            std::io::Error::last_os_error()
        )));
    }
    let ret = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if ret < 0 {
        return Err(EngineError::Io(format!(
            "fcntl(F_SETFL, O_NONBLOCK): {}",
            std::io::Error::last_os_error()
        )));
    }
    Ok(())
}

/// A device qualifies iff it advertises key events and each of
/// {Q, W, E, Escape, Caps Lock}, and its physical path ends with `/input0` —
/// multi-input composite devices typically expose the keyboard on input0;
/// the others are consumer-control or HID device nodes that must not be
/// grabbed.
fn is_qwerty(device: &Device) -> bool {
    let Some(keys) = device.supported_keys() else {
        return false;
    };
    let has_probe_keys = QWERTY_PROBE_KEYS.iter().all(|k| keys.contains(*k));
    let input0 = device
        .physical_path()
        .map(|p| p.ends_with("/input0"))
        .unwrap_or(false);
    has_probe_keys && input0
}
