//! Virtual Mouse Sink (C3) — created only when `mouse_key_code != 0`.
//! A uinput device enabling relative X/Y/wheel axes and three buttons.

use std::os::unix::io::{AsRawFd, RawFd};

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, BusType, InputId, Key, RelativeAxisType};
use tracing::info;

use crate::wire::{self, RawInputEvent};
use crate::EngineError;

const VENDOR_ID: u16 = 0x1234;
const PRODUCT_ID: u16 = 0x0002;
const DEVICE_NAME: &str = "UberKeyboardMappperVirtualMouse";

pub struct MouseSink {
    _device: VirtualDevice,
    fd: RawFd,
}

impl MouseSink {
    pub fn create() -> Result<Self, EngineError> {
        let mut keys = AttributeSet::<Key>::new();
        keys.insert(Key::BTN_LEFT);
        keys.insert(Key::BTN_RIGHT);
        keys.insert(Key::BTN_MIDDLE);

        let mut axes = AttributeSet::<RelativeAxisType>::new();
        axes.insert(RelativeAxisType::REL_X);
        axes.insert(RelativeAxisType::REL_Y);
        axes.insert(RelativeAxisType::REL_WHEEL);
        axes.insert(RelativeAxisType::REL_HWHEEL);

        let id = InputId::new(BusType::BUS_USB, VENDOR_ID, PRODUCT_ID, 0);
        let device = VirtualDeviceBuilder::new()
            .map_err(|e| EngineError::Io(format!("uinput builder: {e}")))?
            .name(DEVICE_NAME)
            .input_id(id)
            .with_keys(&keys)
            .map_err(|e| EngineError::Io(format!("uinput with_keys: {e}")))?
            .with_relative_axes(&axes)
            .map_err(|e| EngineError::Io(format!("uinput with_relative_axes: {e}")))?
            .build()
            .map_err(|e| EngineError::Io(format!("uinput build: {e}")))?;

        let fd = device.as_raw_fd();
        info!(name = DEVICE_NAME, "virtual mouse device ready");
        Ok(Self { _device: device, fd })
    }

    /// Emit REL_X if nonzero, REL_Y if nonzero, then SYN_REPORT.
    pub fn move_by(&self, dx: i32, dy: i32) -> Result<(), EngineError> {
        if dx != 0 {
            wire::emit(self.fd, RawInputEvent::new(wire::EV_REL, wire::REL_X, dx))?;
        }
        if dy != 0 {
            wire::emit(self.fd, RawInputEvent::new(wire::EV_REL, wire::REL_Y, dy))?;
        }
        if dx != 0 || dy != 0 {
            wire::emit(self.fd, RawInputEvent::syn_report())?;
        }
        Ok(())
    }

    /// Press or release `button`, followed by SYN_REPORT.
    pub fn button(&self, button: u16, pressed: bool) -> Result<(), EngineError> {
        let value = if pressed { wire::KEY_PRESS } else { wire::KEY_RELEASE };
        wire::emit(self.fd, RawInputEvent::key(button, value))?;
        wire::emit(self.fd, RawInputEvent::syn_report())
    }

    /// Emit REL_WHEEL, then SYN_REPORT. `v` is typically ±1.
    pub fn wheel(&self, v: i32) -> Result<(), EngineError> {
        wire::emit(self.fd, RawInputEvent::new(wire::EV_REL, wire::REL_WHEEL, v))?;
        wire::emit(self.fd, RawInputEvent::syn_report())
    }
}
