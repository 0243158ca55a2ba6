//! Virtual Keyboard Sink (C2) — a uinput device advertising every keycode
//! in `[0, KEY_MAX)`, with a single `emit` operation that writes the exact
//! wire-format record.

use std::os::unix::io::{AsRawFd, RawFd};

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, BusType, InputId, Key};
use tracing::info;

use crate::wire::{self, RawInputEvent};
use crate::EngineError;

const VENDOR_ID: u16 = 0x1234;
const PRODUCT_ID: u16 = 0x0001;
const DEVICE_NAME: &str = "UberKeyboardMappper";

pub struct KeyboardSink {
    // Kept alive for the process lifetime: dropping it destroys the uinput
    // device. The fd is cached separately since writes go straight to the
    // raw descriptor rather than through the high-level emit() API.
    _device: VirtualDevice,
    fd: RawFd,
}

impl KeyboardSink {
    pub fn create() -> Result<Self, EngineError> {
        let mut keys = AttributeSet::<Key>::new();
        for code in 0..wire::KEY_MAX {
            keys.insert(Key::new(code));
        }

        let id = InputId::new(BusType::BUS_USB, VENDOR_ID, PRODUCT_ID, 0);
        let device = VirtualDeviceBuilder::new()
            .map_err(|e| EngineError::Io(format!("uinput builder: {e}")))?
            .name(DEVICE_NAME)
            .input_id(id)
            .with_keys(&keys)
            .map_err(|e| EngineError::Io(format!("uinput with_keys: {e}")))?
            .build()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::PermissionDenied {
                    EngineError::Io(
                        "permission denied creating /dev/uinput device (need CAP_SYS_ADMIN or root)"
                            .into(),
                    )
                } else {
                    EngineError::Io(format!("uinput build: {e}"))
                }
            })?;

        let fd = device.as_raw_fd();
        info!(name = DEVICE_NAME, "virtual keyboard device ready");
        Ok(Self { _device: device, fd })
    }

    /// Direct write of the exact wire-format `InputEvent` struct. Callers
    /// must follow every semantic packet with a SYN_REPORT.
    pub fn emit(&self, event: RawInputEvent) -> Result<(), EngineError> {
        wire::emit(self.fd, event)
    }

    pub fn emit_syn(&self) -> Result<(), EngineError> {
        self.emit(RawInputEvent::syn_report())
    }

    /// Press or release `code`, followed by SYN_REPORT.
    pub fn emit_key(&self, code: u16, value: i32) -> Result<(), EngineError> {
        self.emit(RawInputEvent::key(code, value))?;
        self.emit_syn()
    }
}
