//! The remap engine: owns the three device handles for the process
//! lifetime and ties together C4 (state machine), C5 (mouse motion), and
//! C6 (event loop).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::KeyMap;
use crate::device::PhysicalDevice;
use crate::keyboard_sink::KeyboardSink;
use crate::mouse_sink::MouseSink;
use crate::wire::{self, RawInputEvent};
use crate::EngineError;

/// Which physical device to acquire: by explicit `/dev/input/eventN` path,
/// or by exact driver-reported name (resolved via enumeration).
pub enum DeviceSelector {
    Path(PathBuf),
    Name(String),
}

impl DeviceSelector {
    pub fn parse(arg: &str) -> Self {
        if arg.starts_with("/dev/") {
            DeviceSelector::Path(PathBuf::from(arg))
        } else {
            DeviceSelector::Name(arg.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseDirs {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

/// The mutable half of the engine: everything [`handle_event`] and
/// [`drive_mouse_motion`] read and write. Kept as a free-standing value
/// (rather than buried in `EngineState`) so the state machine can be
/// exercised directly in tests with a fake sink and no real devices.
#[derive(Debug, Clone, Default)]
pub struct RemapState {
    pub mod_pressed: bool,
    pub mouse_pressed: bool,
    pub last_key_mod: u16,
    pub mouse_dirs: MouseDirs,
    pub mouse_last_press_ts: u128,
}

/// Everything C4/C5 need to emit wire events, abstracted so the decision
/// logic can run against a recording fake in tests instead of real uinput
/// file descriptors.
pub trait Emitter {
    fn kb_raw(&mut self, event: RawInputEvent) -> Result<(), EngineError>;
    fn kb_syn(&mut self) -> Result<(), EngineError>;
    fn kb_key(&mut self, code: u16, value: i32) -> Result<(), EngineError>;
    fn mouse_move(&mut self, dx: i32, dy: i32) -> Result<(), EngineError>;
    fn mouse_button(&mut self, button: u16, pressed: bool) -> Result<(), EngineError>;
    fn mouse_wheel(&mut self, v: i32) -> Result<(), EngineError>;
    /// The 20ms pause inside the click sequence (§4.4). Abstracted purely
    /// so unit tests don't pay it.
    fn sleep_click_gap(&mut self);
}

/// Production sinks: the real keyboard uinput device plus an optional
/// mouse uinput device, present iff `mouse_key_code != 0`.
struct Sinks {
    mouse: Option<MouseSink>,
    keyboard: KeyboardSink,
}

impl Emitter for Sinks {
    fn kb_raw(&mut self, event: RawInputEvent) -> Result<(), EngineError> {
        self.keyboard.emit(event)
    }

    fn kb_syn(&mut self) -> Result<(), EngineError> {
        self.keyboard.emit_syn()
    }

    fn kb_key(&mut self, code: u16, value: i32) -> Result<(), EngineError> {
        self.keyboard.emit_key(code, value)
    }

    fn mouse_move(&mut self, dx: i32, dy: i32) -> Result<(), EngineError> {
        self.mouse
            .as_ref()
            .ok_or_else(|| EngineError::Assertion("mouse sink not initialized".into()))?
            .move_by(dx, dy)
    }

    fn mouse_button(&mut self, button: u16, pressed: bool) -> Result<(), EngineError> {
        self.mouse
            .as_ref()
            .ok_or_else(|| EngineError::Assertion("mouse sink not initialized".into()))?
            .button(button, pressed)
    }

    fn mouse_wheel(&mut self, v: i32) -> Result<(), EngineError> {
        self.mouse
            .as_ref()
            .ok_or_else(|| EngineError::Assertion("mouse sink not initialized".into()))?
            .wheel(v)
    }

    fn sleep_click_gap(&mut self) {
        std::thread::sleep(std::time::Duration::from_millis(20));
    }
}

/// The engine: physical device, both virtual sinks, and the remap state,
/// held for the process lifetime.
///
/// Field order matters: Rust drops struct fields top-to-bottom, and
/// teardown must release resources in reverse order of acquisition —
/// sinks first, physical device (and its grab) last.
pub struct EngineState {
    sinks: Sinks,
    keymap: KeyMap,
    state: RemapState,
    start: Instant,
    input: PhysicalDevice,
}

impl EngineState {
    /// Acquire the physical device, build both virtual sinks, and return a
    /// fully-ready engine. On any failure, everything acquired so far is
    /// dropped before the error propagates — there is no reachable
    /// half-built `EngineState`, so invariant 5 (fully-initialized or
    /// fully-released) holds structurally rather than by runtime check.
    pub fn create(keymap: KeyMap, selector: DeviceSelector) -> Result<Self, EngineError> {
        let input = match selector {
            DeviceSelector::Path(path) => PhysicalDevice::open_by_path(&path)?,
            DeviceSelector::Name(name) => PhysicalDevice::open_by_name(&name)?,
        };
        info!(
            device = input.name(),
            phys = input.phys(),
            "physical device acquired and grabbed"
        );

        let keyboard = KeyboardSink::create()?;
        let mouse = if keymap.mouse_key_code() != 0 {
            Some(MouseSink::create()?)
        } else {
            None
        };

        Ok(Self {
            sinks: Sinks { mouse, keyboard },
            keymap,
            state: RemapState::default(),
            start: Instant::now(),
            input,
        })
    }

    /// Run the event loop (C6) until a fatal error or `running` is cleared
    /// (set false from a signal handler; see `main.rs`).
    pub fn run(&mut self, running: &AtomicBool) -> Result<(), EngineError> {
        while running.load(Ordering::SeqCst) {
            let timeout_ms = if self.state.mouse_pressed { 10 } else { -1 };
            let mut pfd = libc::pollfd {
                fd: self.input.fd(),
                events: libc::POLLIN,
                revents: 0,
            };
            let ret = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
            if ret < 0 {
                let err = std::io::Error::last_os_error();
                if err.kind() == std::io::ErrorKind::Interrupted {
                    // SIGTERM/SIGINT aborted the poll; let the `running`
                    // flag decide whether to loop again or exit cleanly.
                    continue;
                }
                return Err(EngineError::Io(format!("poll: {err}")));
            }

            let timed_out = ret == 0;
            let mut key_arrived = false;

            if !timed_out {
                if let Some(ev) = wire::read_one(self.input.fd())? {
                    if ev.kind == wire::EV_SYN && ev.code == wire::SYN_DROPPED {
                        warn!("sync drop on physical device, draining");
                        wire::drain_sync(self.input.fd())?;
                        debug!("sync drop recovered, resuming from clean SYN boundary");
                    } else {
                        key_arrived = handle_event(&mut self.state, &self.keymap, ev, &mut self.sinks)?;
                    }
                }
                // else: EAGAIN on an already-signaled fd — spurious wakeup,
                // not an error (§7).
            }

            if self.state.mouse_pressed && (timed_out || key_arrived) {
                let now_ms = self.start.elapsed().as_millis();
                drive_mouse_motion(&mut self.state, &self.keymap, now_ms, &mut self.sinks)?;
            }
        }
        info!("shutdown requested, tearing down");
        Ok(())
    }
}

/// Remap State Machine (C4). Consumes one physical `InputEvent`, decides
/// which overlay applies, and emits zero or more virtual events. Returns
/// whether the consumed event was a KEY event, which C6 uses to decide
/// whether to drive a mouse-motion tick on this iteration.
pub fn handle_event(
    state: &mut RemapState,
    keymap: &KeyMap,
    ev: RawInputEvent,
    sinks: &mut impl Emitter,
) -> Result<bool, EngineError> {
    let is_key = ev.kind == wire::EV_KEY;

    // Fallback path: codes the configured tables can't address are
    // forwarded untouched.
    if ev.code >= wire::KEY_MAX {
        sinks.kb_raw(ev)?;
        return Ok(is_key);
    }

    // 1. Mouse trigger bookkeeping. Always consumed; never forwarded.
    let is_mouse_trigger = keymap.mouse_key_code() != 0 && ev.code == keymap.mouse_key_code();
    if is_mouse_trigger {
        state.mouse_pressed = ev.value > 0;
        state.mouse_last_press_ts = 0;
        if !state.mouse_pressed {
            state.mouse_dirs = MouseDirs::default();
        }
    }

    // 2. Modifier bookkeeping with stuck-key rescue. Always consumed.
    let is_mod_trigger = keymap.mod_key_code() != 0 && ev.code == keymap.mod_key_code();
    if is_mod_trigger {
        if state.mod_pressed && ev.value == wire::KEY_RELEASE && state.last_key_mod != 0 {
            sinks.kb_raw(RawInputEvent::msc_scan(state.last_key_mod))?;
            sinks.kb_key(state.last_key_mod, wire::KEY_RELEASE)?;
        }
        state.mod_pressed = ev.value > 0;
        state.last_key_mod = 0;
    }

    if is_mouse_trigger || is_mod_trigger {
        return Ok(is_key);
    }

    // 3. Not a trigger key.
    //
    // The decision order in the spec latches `last_key_mod` unconditionally
    // on autorepeat, but invariant 2 ("last_key_mod != 0 only while
    // mod_pressed") only holds if the latch is gated on `mod_pressed` —
    // otherwise an autorepeat seen in mouse mode or passthrough would set
    // it while mod is not held. Gating here is what keeps the invariant,
    // not an independent design choice.
    if is_key && ev.value == wire::KEY_REPEAT && state.mod_pressed {
        state.last_key_mod = ev.code;
    }

    if state.mod_pressed {
        let mapped = keymap.modifier_raw(ev.code);
        if mapped != 0 {
            sinks.kb_key(mapped, ev.value)?;
        }
        // mapped == 0: modifier mode swallows unmapped keys.
        return Ok(is_key);
    }

    if state.mouse_pressed {
        let mapped = keymap.mouse_raw(ev.code);
        if mapped != 0 {
            dispatch_mouse(mapped, ev.value, keymap.mouse_key_code(), state, sinks)?;
        } else {
            sinks.kb_raw(ev)?;
        }
        return Ok(is_key);
    }

    let mut out = ev;
    out.code = keymap.direct(ev.code);
    sinks.kb_raw(out)?;
    Ok(is_key)
}

/// Dispatch a key mapped through `mouse_map` to the action its target code
/// names: a button click, a wheel tick, or a direction flag (emission for
/// direction flags is deferred to [`drive_mouse_motion`]).
fn dispatch_mouse(
    mapped: u16,
    value: i32,
    mouse_key_code: u16,
    state: &mut RemapState,
    sinks: &mut impl Emitter,
) -> Result<(), EngineError> {
    match mapped {
        wire::BTN_LEFT | wire::BTN_RIGHT | wire::BTN_MIDDLE => {
            if value != wire::KEY_REPEAT {
                click(mapped, value > 0, mouse_key_code, sinks)?;
            }
        }
        wire::BTN_GEAR_UP => {
            if value == wire::KEY_PRESS {
                sinks.mouse_wheel(1)?;
            }
        }
        wire::BTN_GEAR_DOWN => {
            if value == wire::KEY_PRESS {
                sinks.mouse_wheel(-1)?;
            }
        }
        wire::KEY_LEFT => state.mouse_dirs.left = value != wire::KEY_RELEASE,
        wire::KEY_RIGHT => state.mouse_dirs.right = value != wire::KEY_RELEASE,
        wire::KEY_UP => state.mouse_dirs.up = value != wire::KEY_RELEASE,
        wire::KEY_DOWN => state.mouse_dirs.down = value != wire::KEY_RELEASE,
        _ => {
            return Err(EngineError::Assertion(format!(
                "unsupported mouse-map target code {mapped}"
            )));
        }
    }
    Ok(())
}

/// §4.4 click sequence: simulate the user momentarily releasing and
/// re-pressing the mouse trigger around the button event, so downstream
/// software sees a standalone click rather than "trigger+button".
fn click(
    button: u16,
    pressed: bool,
    mouse_key_code: u16,
    sinks: &mut impl Emitter,
) -> Result<(), EngineError> {
    sinks.kb_raw(RawInputEvent::msc_scan(0))?;
    sinks.kb_key(mouse_key_code, wire::KEY_RELEASE)?;

    sinks.mouse_button(button, pressed)?;

    sinks.sleep_click_gap();

    sinks.kb_raw(RawInputEvent::msc_scan(0))?;
    sinks.kb_raw(RawInputEvent::key(mouse_key_code, wire::KEY_PRESS))?;
    sinks.kb_syn()?;
    sinks.kb_raw(RawInputEvent::key(mouse_key_code, wire::KEY_REPEAT))?;
    sinks.kb_syn()?;
    Ok(())
}

/// Mouse Motion Driver (C5). Folds held direction flags into an
/// accelerated relative-motion event. `now_ms` is the caller's monotonic
/// clock reading, threaded through explicitly so this stays pure and
/// testable without a real timer.
pub fn drive_mouse_motion(
    state: &mut RemapState,
    keymap: &KeyMap,
    now_ms: u128,
    sinks: &mut impl Emitter,
) -> Result<(), EngineError> {
    let mut dx = 0i32;
    let mut dy = 0i32;
    if state.mouse_dirs.left {
        dx -= 10;
    }
    if state.mouse_dirs.right {
        dx += 10;
    }
    if state.mouse_dirs.up {
        dy -= 10;
    }
    if state.mouse_dirs.down {
        dy += 10;
    }

    if dx == 0 && dy == 0 {
        state.mouse_last_press_ts = 0;
        return Ok(());
    }

    if state.mouse_last_press_ts == 0 {
        state.mouse_last_press_ts = now_ms;
    }

    let delta = now_ms.saturating_sub(state.mouse_last_press_ts);
    let window = keymap.mouse_speedup_ms() as u128;
    let speed = compute_speed(delta, window, keymap.mouse_sensitivity());

    let dx = (dx as f32 * speed).trunc() as i32;
    let dy = (dy as f32 * speed).trunc() as i32;
    sinks.mouse_move(dx, dy)
}

/// Acceleration ramp from §4.5: dead zone floor, linear ramp, full speed
/// past the window, always clamped to a visible minimum.
fn compute_speed(delta: u128, window: u128, sensitivity: f32) -> f32 {
    let speed = if window == 0 || delta >= window {
        sensitivity
    } else if delta < window / 10 {
        sensitivity * 0.1
    } else {
        sensitivity * (delta as f32 / window as f32)
    };
    speed.max(0.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Recorded {
        Kb(RawInputEvent),
        KbSyn,
        KbKey(u16, i32),
        MouseMove(i32, i32),
        MouseButton(u16, bool),
        MouseWheel(i32),
        Sleep,
    }

    #[derive(Default)]
    struct FakeEmitter {
        log: Vec<Recorded>,
    }

    impl Emitter for FakeEmitter {
        fn kb_raw(&mut self, event: RawInputEvent) -> Result<(), EngineError> {
            self.log.push(Recorded::Kb(event));
            Ok(())
        }
        fn kb_syn(&mut self) -> Result<(), EngineError> {
            self.log.push(Recorded::KbSyn);
            Ok(())
        }
        fn kb_key(&mut self, code: u16, value: i32) -> Result<(), EngineError> {
            self.log.push(Recorded::KbKey(code, value));
            Ok(())
        }
        fn mouse_move(&mut self, dx: i32, dy: i32) -> Result<(), EngineError> {
            self.log.push(Recorded::MouseMove(dx, dy));
            Ok(())
        }
        fn mouse_button(&mut self, button: u16, pressed: bool) -> Result<(), EngineError> {
            self.log.push(Recorded::MouseButton(button, pressed));
            Ok(())
        }
        fn mouse_wheel(&mut self, v: i32) -> Result<(), EngineError> {
            self.log.push(Recorded::MouseWheel(v));
            Ok(())
        }
        fn sleep_click_gap(&mut self) {
            self.log.push(Recorded::Sleep);
        }
    }

    const KEY_CAPSLOCK: u16 = 58;
    const KEY_ESC: u16 = 1;
    const LEFTALT: u16 = 56;
    const KEY_I: u16 = 23;
    const LEFTMETA: u16 = 125;
    const KEY_SPACE: u16 = 57;
    const KEY_J: u16 = 36;

    fn key(code: u16, value: i32) -> RawInputEvent {
        RawInputEvent::key(code, value)
    }

    // S1: direct_map[CAPSLOCK] = ESC, press + release forwards the mapped code.
    #[test]
    fn s1_direct_map_round_trip() {
        let keymap = KeyMap::builder().direct(KEY_CAPSLOCK, KEY_ESC).build().unwrap();
        let mut state = RemapState::default();
        let mut sinks = FakeEmitter::default();

        handle_event(&mut state, &keymap, key(KEY_CAPSLOCK, 1), &mut sinks).unwrap();
        handle_event(&mut state, &keymap, key(KEY_CAPSLOCK, 0), &mut sinks).unwrap();

        assert_eq!(
            sinks.log,
            vec![
                Recorded::Kb(key(KEY_ESC, 1)),
                Recorded::Kb(key(KEY_ESC, 0)),
            ]
        );
    }

    // Round-trip law: empty config forwards every event verbatim.
    #[test]
    fn passthrough_is_verbatim_with_empty_config() {
        let keymap = KeyMap::builder().build().unwrap();
        let mut state = RemapState::default();
        let mut sinks = FakeEmitter::default();

        let ev = key(30, 1);
        handle_event(&mut state, &keymap, ev, &mut sinks).unwrap();

        assert_eq!(sinks.log, vec![Recorded::Kb(ev)]);
    }

    // S2: modifier overlay rewrites I -> UP while LEFTALT is held, and both
    // LEFTALT transitions are consumed (no keyboard-sink output for them).
    #[test]
    fn s2_modifier_overlay_rewrite_and_consume() {
        let keymap = KeyMap::builder()
            .modifier(LEFTALT)
            .mod_map(KEY_I, wire::KEY_UP)
            .build()
            .unwrap();
        let mut state = RemapState::default();
        let mut sinks = FakeEmitter::default();

        handle_event(&mut state, &keymap, key(LEFTALT, 1), &mut sinks).unwrap();
        assert!(state.mod_pressed);
        handle_event(&mut state, &keymap, key(KEY_I, 1), &mut sinks).unwrap();
        handle_event(&mut state, &keymap, key(KEY_I, 0), &mut sinks).unwrap();
        handle_event(&mut state, &keymap, key(LEFTALT, 0), &mut sinks).unwrap();
        assert!(!state.mod_pressed);

        assert_eq!(
            sinks.log,
            vec![
                Recorded::KbKey(wire::KEY_UP, 1),
                Recorded::KbKey(wire::KEY_UP, 0),
            ]
        );
    }

    // Modifier mode drops unmapped keys entirely.
    #[test]
    fn modifier_overlay_swallows_unmapped_keys() {
        let keymap = KeyMap::builder().modifier(LEFTALT).build().unwrap();
        let mut state = RemapState::default();
        let mut sinks = FakeEmitter::default();

        handle_event(&mut state, &keymap, key(LEFTALT, 1), &mut sinks).unwrap();
        handle_event(&mut state, &keymap, key(KEY_SPACE, 1), &mut sinks).unwrap();
        handle_event(&mut state, &keymap, key(KEY_SPACE, 0), &mut sinks).unwrap();

        assert!(sinks.log.is_empty());
    }

    // S3: autorepeat while mod held latches last_key_mod; releasing mod
    // without releasing the mapped key first emits exactly one rescue
    // triple before the (consumed) mod release.
    #[test]
    fn s3_stuck_key_rescue_on_mod_release() {
        let keymap = KeyMap::builder()
            .modifier(LEFTALT)
            .mod_map(KEY_I, wire::KEY_UP)
            .build()
            .unwrap();
        let mut state = RemapState::default();
        let mut sinks = FakeEmitter::default();

        handle_event(&mut state, &keymap, key(LEFTALT, 1), &mut sinks).unwrap();
        handle_event(&mut state, &keymap, key(KEY_I, 1), &mut sinks).unwrap();
        handle_event(&mut state, &keymap, key(KEY_I, 2), &mut sinks).unwrap();
        assert_eq!(state.last_key_mod, KEY_I);

        handle_event(&mut state, &keymap, key(LEFTALT, 0), &mut sinks).unwrap();
        assert_eq!(state.last_key_mod, 0);

        assert_eq!(
            sinks.log,
            vec![
                Recorded::KbKey(wire::KEY_UP, 1),
                Recorded::KbKey(wire::KEY_UP, 2),
                Recorded::Kb(RawInputEvent::msc_scan(wire::KEY_UP)),
                Recorded::KbKey(wire::KEY_UP, 0),
            ]
        );
    }

    // Invariant 2: last_key_mod is never latched while mod isn't held.
    #[test]
    fn invariant_last_key_mod_only_while_mod_pressed() {
        let keymap = KeyMap::builder().build().unwrap();
        let mut state = RemapState::default();
        let mut sinks = FakeEmitter::default();

        handle_event(&mut state, &keymap, key(KEY_I, 1), &mut sinks).unwrap();
        handle_event(&mut state, &keymap, key(KEY_I, 2), &mut sinks).unwrap();
        assert_eq!(state.last_key_mod, 0);
    }

    // S4: mouse-mapped button click wraps the trigger release/re-press
    // dance around the mouse-sink button event, symmetrically on press and
    // release of the mapped physical key.
    #[test]
    fn s4_mouse_click_sequence() {
        let keymap = KeyMap::builder()
            .mouse_trigger(LEFTMETA)
            .mouse_map(KEY_SPACE, wire::BTN_LEFT)
            .build()
            .unwrap();
        let mut state = RemapState::default();
        let mut sinks = FakeEmitter::default();

        handle_event(&mut state, &keymap, key(LEFTMETA, 1), &mut sinks).unwrap();
        assert!(state.mouse_pressed);
        sinks.log.clear();

        handle_event(&mut state, &keymap, key(KEY_SPACE, 1), &mut sinks).unwrap();
        assert_eq!(
            sinks.log,
            vec![
                Recorded::Kb(RawInputEvent::msc_scan(0)),
                Recorded::KbKey(LEFTMETA, 0),
                Recorded::MouseButton(wire::BTN_LEFT, true),
                Recorded::Sleep,
                Recorded::Kb(RawInputEvent::msc_scan(0)),
                Recorded::Kb(RawInputEvent::key(LEFTMETA, 1)),
                Recorded::KbSyn,
                Recorded::Kb(RawInputEvent::key(LEFTMETA, 2)),
                Recorded::KbSyn,
            ]
        );
    }

    // Mouse overlay direction keys only set flags; emission is deferred to
    // drive_mouse_motion.
    #[test]
    fn mouse_direction_keys_set_flags_only() {
        let keymap = KeyMap::builder()
            .mouse_trigger(LEFTMETA)
            .mouse_map(KEY_J, wire::KEY_LEFT)
            .build()
            .unwrap();
        let mut state = RemapState::default();
        let mut sinks = FakeEmitter::default();

        handle_event(&mut state, &keymap, key(LEFTMETA, 1), &mut sinks).unwrap();
        handle_event(&mut state, &keymap, key(KEY_J, 1), &mut sinks).unwrap();

        assert!(state.mouse_dirs.left);
        assert!(sinks.log.is_empty());
    }

    // Mouse overlay forwards unmapped keys verbatim.
    #[test]
    fn mouse_overlay_forwards_unmapped_keys() {
        let keymap = KeyMap::builder().mouse_trigger(LEFTMETA).build().unwrap();
        let mut state = RemapState::default();
        let mut sinks = FakeEmitter::default();

        handle_event(&mut state, &keymap, key(LEFTMETA, 1), &mut sinks).unwrap();
        handle_event(&mut state, &keymap, key(KEY_SPACE, 1), &mut sinks).unwrap();

        assert_eq!(sinks.log, vec![Recorded::Kb(key(KEY_SPACE, 1))]);
    }

    // Invariant 4: direction flags always clear when mouse mode ends.
    #[test]
    fn mouse_dirs_clear_on_trigger_release() {
        let keymap = KeyMap::builder()
            .mouse_trigger(LEFTMETA)
            .mouse_map(KEY_J, wire::KEY_LEFT)
            .build()
            .unwrap();
        let mut state = RemapState::default();
        let mut sinks = FakeEmitter::default();

        handle_event(&mut state, &keymap, key(LEFTMETA, 1), &mut sinks).unwrap();
        handle_event(&mut state, &keymap, key(KEY_J, 1), &mut sinks).unwrap();
        assert!(state.mouse_dirs.left);
        handle_event(&mut state, &keymap, key(LEFTMETA, 0), &mut sinks).unwrap();

        assert_eq!(state.mouse_dirs, MouseDirs::default());
    }

    // Boundary: codes >= KEY_MAX always forward verbatim regardless of mode.
    #[test]
    fn codes_above_key_max_forward_verbatim() {
        let keymap = KeyMap::builder().modifier(LEFTALT).build().unwrap();
        let mut state = RemapState::default();
        state.mod_pressed = true;
        let mut sinks = FakeEmitter::default();

        let ev = key(wire::KEY_MAX, 1);
        handle_event(&mut state, &keymap, ev, &mut sinks).unwrap();

        assert_eq!(sinks.log, vec![Recorded::Kb(ev)]);
    }

    // (T,T) is unreachable: the trigger that arrives first consumes its own
    // event, so mod_pressed and mouse_pressed are never both driven true by
    // the *same* event, but can independently both be true afterward if the
    // two trigger keys are genuinely both held.
    #[test]
    fn both_triggers_independently_settable() {
        let keymap = KeyMap::builder().modifier(LEFTALT).mouse_trigger(LEFTMETA).build().unwrap();
        let mut state = RemapState::default();
        let mut sinks = FakeEmitter::default();

        handle_event(&mut state, &keymap, key(LEFTALT, 1), &mut sinks).unwrap();
        handle_event(&mut state, &keymap, key(LEFTMETA, 1), &mut sinks).unwrap();
        assert!(state.mod_pressed);
        assert!(state.mouse_pressed);
    }

    #[test]
    fn speed_reaches_sensitivity_at_window() {
        assert_eq!(compute_speed(400, 400, 1.0), 1.0);
        assert_eq!(compute_speed(1000, 400, 2.0), 2.0);
    }

    #[test]
    fn speed_floors_in_dead_zone() {
        let speed = compute_speed(10, 400, 1.0);
        assert!((speed - 0.1).abs() < 1e-6);
    }

    #[test]
    fn speed_never_below_point_one() {
        for delta in [0, 1, 39, 40, 100, 399, 400, 1000] {
            assert!(compute_speed(delta, 400, 0.15) >= 0.1);
        }
    }

    #[test]
    fn speed_ramps_linearly_mid_window() {
        let speed = compute_speed(200, 400, 1.0);
        assert!((speed - 0.5).abs() < 1e-6);
    }

    // S5 (shape): holding a direction produces steady REL motion once past
    // the speedup window.
    #[test]
    fn s5_motion_reaches_full_speed_past_window() {
        let keymap = KeyMap::builder()
            .mouse_trigger(LEFTMETA)
            .mouse_map(KEY_J, wire::KEY_LEFT)
            .speedup_ms(400)
            .sensitivity(1.0)
            .build()
            .unwrap();
        let mut state = RemapState::default();
        let mut sinks = FakeEmitter::default();

        handle_event(&mut state, &keymap, key(LEFTMETA, 1), &mut sinks).unwrap();
        handle_event(&mut state, &keymap, key(KEY_J, 1), &mut sinks).unwrap();
        sinks.log.clear();

        // Seed a non-zero burst start: 0 doubles as the "idle" sentinel, so
        // a real burst beginning exactly at t=0 would be indistinguishable
        // from "not yet started" on the very next tick.
        drive_mouse_motion(&mut state, &keymap, 1, &mut sinks).unwrap();
        drive_mouse_motion(&mut state, &keymap, 500, &mut sinks).unwrap();

        match &sinks.log[..] {
            [Recorded::MouseMove(dx0, 0), Recorded::MouseMove(dx1, 0)] => {
                assert!(dx0.abs() < dx1.abs());
                assert_eq!(*dx1, -10);
            }
            other => panic!("unexpected log: {other:?}"),
        }
    }

    #[test]
    fn motion_resets_timestamp_when_no_direction_held() {
        let keymap = KeyMap::builder().mouse_trigger(LEFTMETA).build().unwrap();
        let mut state = RemapState::default();
        state.mouse_pressed = true;
        state.mouse_last_press_ts = 123;
        let mut sinks = FakeEmitter::default();

        drive_mouse_motion(&mut state, &keymap, 999, &mut sinks).unwrap();

        assert_eq!(state.mouse_last_press_ts, 0);
        assert!(sinks.log.is_empty());
    }
}
