//! Linux `input_event` wire format and the `EV_*`/`KEY_*`/`BTN_*` constants
//! the remap engine needs that aren't otherwise exposed as enum variants by
//! the `evdev` crate's high-level API.
//!
//! The engine writes this struct directly to device file descriptors with
//! `libc::write`, matching exactly how ydotool-style tools push events —
//! the same approach the virtual mouse in the teacher project used to avoid
//! going through a higher-level emit() API.

use std::os::unix::io::RawFd;

use crate::EngineError;

pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_REL: u16 = 0x02;
pub const EV_MSC: u16 = 0x04;

pub const SYN_REPORT: u16 = 0x00;
pub const SYN_DROPPED: u16 = 0x03;

pub const MSC_SCAN: u16 = 0x04;

pub const REL_X: u16 = 0x00;
pub const REL_Y: u16 = 0x01;
pub const REL_HWHEEL: u16 = 0x06;
pub const REL_WHEEL: u16 = 0x08;

pub const BTN_LEFT: u16 = 0x110;
pub const BTN_RIGHT: u16 = 0x111;
pub const BTN_MIDDLE: u16 = 0x112;
pub const BTN_GEAR_DOWN: u16 = 0x150;
pub const BTN_GEAR_UP: u16 = 0x151;

pub const KEY_LEFT: u16 = 105;
pub const KEY_RIGHT: u16 = 106;
pub const KEY_UP: u16 = 103;
pub const KEY_DOWN: u16 = 108;

/// One past the highest keycode the kernel reserves, per
/// `input-event-codes.h`. The keyboard sink advertises `[0, KEY_MAX)`.
pub const KEY_MAX: u16 = 0x2ff;

/// Value field for a key release, press, and autorepeat respectively.
pub const KEY_RELEASE: i32 = 0;
pub const KEY_PRESS: i32 = 1;
pub const KEY_REPEAT: i32 = 2;

/// The kernel's `struct input_event`, byte-for-byte: two `time_t`-sized
/// fields, then `type`/`code`/`value`. `repr(C)` pins the layout; anything
/// else risks the kernel reading garbage out of padding.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawInputEvent {
    tv_sec: libc::time_t,
    tv_usec: libc::suseconds_t,
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

impl RawInputEvent {
    pub fn new(kind: u16, code: u16, value: i32) -> Self {
        Self {
            tv_sec: 0,
            tv_usec: 0,
            kind,
            code,
            value,
        }
    }

    pub fn syn_report() -> Self {
        Self::new(EV_SYN, SYN_REPORT, 0)
    }

    pub fn key(code: u16, value: i32) -> Self {
        Self::new(EV_KEY, code, value)
    }

    pub fn msc_scan(scancode: u16) -> Self {
        Self::new(EV_MSC, MSC_SCAN, scancode as i32)
    }
}

/// Write one raw wire-format record to `fd`. Callers are responsible for
/// following every semantic packet with [`RawInputEvent::syn_report`].
pub fn emit(fd: RawFd, event: RawInputEvent) -> Result<(), EngineError> {
    let ptr = &event as *const RawInputEvent as *const libc::c_void;
    let size = std::mem::size_of::<RawInputEvent>();
    let ret = unsafe { libc::write(fd, ptr, size) };
    if ret < 0 {
        return Err(EngineError::Io(format!(
            "write({size} bytes): {}",
            std::io::Error::last_os_error()
        )));
    }
    Ok(())
}

/// Read one raw wire-format record from `fd`. Returns `Ok(None)` on
/// `EAGAIN`/`EWOULDBLOCK` (no data ready on a non-blocking fd) — this is not
/// an error, just an empty poll.
pub fn read_one(fd: RawFd) -> Result<Option<RawInputEvent>, EngineError> {
    let mut event = RawInputEvent::new(0, 0, 0);
    let size = std::mem::size_of::<RawInputEvent>();
    let ptr = &mut event as *mut RawInputEvent as *mut libc::c_void;
    let ret = unsafe { libc::read(fd, ptr, size) };
    if ret < 0 {
        let err = std::io::Error::last_os_error();
        if err.kind() == std::io::ErrorKind::WouldBlock {
            return Ok(None);
        }
        return Err(EngineError::Io(format!("read: {err}")));
    }
    if ret == 0 {
        return Err(EngineError::Io("read: device closed".into()));
    }
    if ret as usize != size {
        return Err(EngineError::Io(format!(
            "read: short read of {ret} bytes, expected {size}"
        )));
    }
    Ok(Some(event))
}

/// Drain every event currently queued on `fd` without blocking, discarding
/// them. Used to recover from a `SYN_DROPPED` notification: the kernel has
/// already compacted its internal event queue, so the simplest correct
/// recovery is to flush whatever is left and resume from a clean SYN
/// boundary on the next normal read.
pub fn drain_sync(fd: RawFd) -> Result<(), EngineError> {
    loop {
        match read_one(fd)? {
            Some(_) => continue,
            None => return Ok(()),
        }
    }
}
