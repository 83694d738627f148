//! Held-control bookkeeping
//!
//! Counted, per-device tracking of which modifiers and pointing buttons are
//! physically held. Counts are per `(device, control)` so two keyboards
//! holding shift keep shift active until both release it.

use std::collections::{HashMap, HashSet};

use enumflags2::BitFlags;

use crate::hid::{make_hid_report_modifier, DeviceId, HidModifier, ModifierFlag};

/// Read access to "is this modifier currently active"
///
/// Implemented by the counted [`ModifierFlagManager`] the input side keeps
/// and by a plain flag set, so the dispatcher can compare against either.
pub trait ModifierFlagState {
    /// Whether `flag` is active
    fn is_pressed(&self, flag: ModifierFlag) -> bool;
}

impl ModifierFlagState for BitFlags<ModifierFlag> {
    fn is_pressed(&self, flag: ModifierFlag) -> bool {
        self.contains(flag)
    }
}

/// One change to the modifier state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveModifierFlag {
    /// Key pressed
    Increase(ModifierFlag, DeviceId),
    /// Key released
    Decrease(ModifierFlag, DeviceId),
    /// Lock engaged (caps lock LED on)
    IncreaseLock(ModifierFlag, DeviceId),
    /// Lock released
    DecreaseLock(ModifierFlag, DeviceId),
}

/// Counted modifier state across devices
#[derive(Debug, Default)]
pub struct ModifierFlagManager {
    /// Net press count per device and flag. Zero entries are removed.
    held: HashMap<(DeviceId, ModifierFlag), u32>,
    /// Engaged locks per device
    locked: HashSet<(DeviceId, ModifierFlag)>,
}

impl ModifierFlagManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one change
    pub fn push_back_active_modifier_flag(&mut self, change: ActiveModifierFlag) {
        match change {
            ActiveModifierFlag::Increase(flag, device_id) => {
                *self.held.entry((device_id, flag)).or_insert(0) += 1;
            }
            ActiveModifierFlag::Decrease(flag, device_id) => {
                if let Some(count) = self.held.get_mut(&(device_id, flag)) {
                    *count -= 1;
                    if *count == 0 {
                        self.held.remove(&(device_id, flag));
                    }
                }
            }
            ActiveModifierFlag::IncreaseLock(flag, device_id) => {
                self.locked.insert((device_id, flag));
            }
            ActiveModifierFlag::DecreaseLock(flag, device_id) => {
                self.locked.remove(&(device_id, flag));
            }
        }
    }

    /// Forget everything one device contributed, locks included
    pub fn erase_all_active_modifier_flags(&mut self, device_id: DeviceId) {
        self.held.retain(|(d, _), _| *d != device_id);
        self.locked.retain(|(d, _)| *d != device_id);
    }

    /// Forget one device's held keys but keep its locks
    pub fn erase_all_active_modifier_flags_except_lock(&mut self, device_id: DeviceId) {
        self.held.retain(|(d, _), _| *d != device_id);
    }

    /// Forget all state
    pub fn reset(&mut self) {
        self.held.clear();
        self.locked.clear();
    }

    /// Active flags as a set
    pub fn make_modifier_flags(&self) -> BitFlags<ModifierFlag> {
        ModifierFlag::ALL
            .iter()
            .copied()
            .filter(|flag| self.is_pressed(*flag))
            .collect()
    }

    /// Active flags as a boot keyboard report modifier byte
    pub fn make_hid_report_modifiers(&self) -> BitFlags<HidModifier> {
        ModifierFlag::ALL
            .iter()
            .copied()
            .filter(|flag| self.is_pressed(*flag))
            .filter_map(make_hid_report_modifier)
            .collect()
    }
}

impl ModifierFlagState for ModifierFlagManager {
    fn is_pressed(&self, flag: ModifierFlag) -> bool {
        self.held.keys().any(|(_, f)| *f == flag) || self.locked.iter().any(|(_, f)| *f == flag)
    }
}

/// Counted pointing button state across devices
#[derive(Debug, Default)]
pub struct PointingButtonManager {
    held: HashMap<(DeviceId, u8), u32>,
}

impl PointingButtonManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a press of `button` on `device_id`
    pub fn increase(&mut self, device_id: DeviceId, button: u8) {
        *self.held.entry((device_id, button)).or_insert(0) += 1;
    }

    /// Record a release of `button` on `device_id`
    pub fn decrease(&mut self, device_id: DeviceId, button: u8) {
        if let Some(count) = self.held.get_mut(&(device_id, button)) {
            *count -= 1;
            if *count == 0 {
                self.held.remove(&(device_id, button));
            }
        }
    }

    /// Whether any device holds `button`
    pub fn is_pressed(&self, button: u8) -> bool {
        self.held.keys().any(|(_, b)| *b == button)
    }

    /// Held buttons as a bitmask, button `n` at bit `n - 1`
    pub fn make_buttons(&self) -> u32 {
        self.held
            .keys()
            .filter(|(_, b)| (1..=32).contains(b))
            .fold(0u32, |acc, (_, b)| acc | (1 << (b - 1)))
    }

    /// Forget everything one device contributed
    pub fn erase_all_active_pointing_buttons(&mut self, device_id: DeviceId) {
        self.held.retain(|(d, _), _| *d != device_id);
    }

    /// Forget all state
    pub fn reset(&mut self) {
        self.held.clear();
    }
}
