//! `KeyMap` configuration: the immutable mapping tables and tuning knobs the
//! remap engine is built from.

use crate::wire::KEY_MAX;
use crate::EngineError;

const DEFAULT_SENSITIVITY: f32 = 1.0;

/// Flat lookup tables plus the two overlay trigger keys and mouse tuning.
/// Immutable once built; construct through [`KeyMapBuilder`].
#[derive(Debug, Clone)]
pub struct KeyMap {
    direct_map: Vec<u16>,
    mod_map: Vec<u16>,
    mouse_map: Vec<u16>,
    mod_key_code: u16,
    mouse_key_code: u16,
    mouse_sensitivity: f32,
    mouse_speedup_ms: u32,
    debug: bool,
}

impl KeyMap {
    pub fn builder() -> KeyMapBuilder {
        KeyMapBuilder::default()
    }

    /// Rewrite `code` through the direct map. Zero in the table means
    /// identity, matching the spec's "zero means identity" rule.
    pub fn direct(&self, code: u16) -> u16 {
        lookup(&self.direct_map, code)
    }

    /// Raw `mod_map` entry for `code` — zero means "no mapping" (the
    /// modifier overlay swallows the key), unlike [`KeyMap::direct`]'s
    /// identity-on-zero convention.
    pub fn modifier_raw(&self, code: u16) -> u16 {
        self.mod_map.get(code as usize).copied().unwrap_or(0)
    }

    /// Raw `mouse_map` entry for `code` — zero means "no mapping" (the
    /// mouse overlay forwards the key verbatim).
    pub fn mouse_raw(&self, code: u16) -> u16 {
        self.mouse_map.get(code as usize).copied().unwrap_or(0)
    }

    pub fn mod_key_code(&self) -> u16 {
        self.mod_key_code
    }

    pub fn mouse_key_code(&self) -> u16 {
        self.mouse_key_code
    }

    pub fn mouse_sensitivity(&self) -> f32 {
        self.mouse_sensitivity
    }

    pub fn mouse_speedup_ms(&self) -> u32 {
        self.mouse_speedup_ms
    }

    pub fn debug(&self) -> bool {
        self.debug
    }
}

fn lookup(table: &[u16], code: u16) -> u16 {
    match table.get(code as usize) {
        Some(&0) | None => code,
        Some(&mapped) => mapped,
    }
}

/// Consuming builder in the style of the wider codebase's `Config` type —
/// chainable `with_*` setters, defaults that match "feature disabled", and
/// a single validating `build()` that performs the §3/§8 numeric checks.
pub struct KeyMapBuilder {
    direct_map: Vec<u16>,
    mod_map: Vec<u16>,
    mouse_map: Vec<u16>,
    mod_key_code: u16,
    mouse_key_code: u16,
    mouse_sensitivity: f32,
    mouse_speedup_ms: u32,
    debug: bool,
}

impl Default for KeyMapBuilder {
    fn default() -> Self {
        Self {
            direct_map: vec![0; KEY_MAX as usize],
            mod_map: vec![0; KEY_MAX as usize],
            mouse_map: vec![0; KEY_MAX as usize],
            mod_key_code: 0,
            mouse_key_code: 0,
            mouse_sensitivity: DEFAULT_SENSITIVITY,
            mouse_speedup_ms: 300,
            debug: false,
        }
    }
}

impl KeyMapBuilder {
    pub fn direct(mut self, from: u16, to: u16) -> Self {
        set(&mut self.direct_map, from, to);
        self
    }

    pub fn modifier(mut self, mod_key_code: u16) -> Self {
        self.mod_key_code = mod_key_code;
        self
    }

    pub fn mod_map(mut self, from: u16, to: u16) -> Self {
        set(&mut self.mod_map, from, to);
        self
    }

    pub fn mouse_trigger(mut self, mouse_key_code: u16) -> Self {
        self.mouse_key_code = mouse_key_code;
        self
    }

    pub fn mouse_map(mut self, from: u16, to: u16) -> Self {
        set(&mut self.mouse_map, from, to);
        self
    }

    pub fn sensitivity(mut self, sensitivity: f32) -> Self {
        self.mouse_sensitivity = sensitivity;
        self
    }

    pub fn speedup_ms(mut self, speedup_ms: u32) -> Self {
        self.mouse_speedup_ms = speedup_ms;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Validate and freeze the configuration.
    ///
    /// `mouse_sensitivity <= 0.0` is clamped to the default rather than
    /// rejected — a caller passing `0.0` almost always means "unset", not
    /// "disable". Anything else outside `(0.1, 10)` is a hard error: those
    /// values are deliberate and wrong, not placeholders.
    pub fn build(mut self) -> Result<KeyMap, EngineError> {
        if self.mouse_sensitivity <= 0.0 {
            self.mouse_sensitivity = DEFAULT_SENSITIVITY;
        } else if self.mouse_sensitivity <= 0.1 || self.mouse_sensitivity >= 10.0 {
            return Err(EngineError::InvalidArgument(format!(
                "mouse_sensitivity {} out of range (0.1, 10)",
                self.mouse_sensitivity
            )));
        }

        if self.mouse_key_code != 0
            && (self.mouse_speedup_ms == 0 || self.mouse_speedup_ms >= 10_000)
        {
            return Err(EngineError::InvalidArgument(format!(
                "mouse_speedup_ms {} out of range (0, 10000)",
                self.mouse_speedup_ms
            )));
        }

        Ok(KeyMap {
            direct_map: self.direct_map,
            mod_map: self.mod_map,
            mouse_map: self.mouse_map,
            mod_key_code: self.mod_key_code,
            mouse_key_code: self.mouse_key_code,
            mouse_sensitivity: self.mouse_sensitivity,
            mouse_speedup_ms: self.mouse_speedup_ms,
            debug: self.debug,
        })
    }
}

fn set(table: &mut [u16], from: u16, to: u16) {
    if let Some(slot) = table.get_mut(from as usize) {
        *slot = to;
    }
}
