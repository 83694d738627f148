//! Virtual device report payloads
//!
//! Fixed-size accumulators mirroring the reports a virtual HID keyboard and
//! pointing device accept. Key reports hold up to [`KEY_SLOTS`] usages;
//! zero marks an empty slot.

use enumflags2::BitFlags;
use serde::{Deserialize, Serialize};

use crate::hid::usages::MAX_POINTING_BUTTON;
use crate::hid::HidModifier;

/// Key slots per report
pub const KEY_SLOTS: usize = 32;

/// Pressed usages of one report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<u16>", from = "Vec<u16>")]
pub struct Keys([u16; KEY_SLOTS]);

impl Keys {
    /// No keys pressed
    pub const fn new() -> Self {
        Self([0; KEY_SLOTS])
    }

    /// Add a usage to the first free slot. No-op if present, zero, or full.
    pub fn insert(&mut self, usage: u16) {
        if usage == 0 || self.exists(usage) {
            return;
        }
        if let Some(slot) = self.0.iter_mut().find(|slot| **slot == 0) {
            *slot = usage;
        }
    }

    /// Remove a usage
    pub fn erase(&mut self, usage: u16) {
        if usage == 0 {
            return;
        }
        for slot in self.0.iter_mut().filter(|slot| **slot == usage) {
            *slot = 0;
        }
    }

    /// Whether a usage is pressed
    pub fn exists(&self, usage: u16) -> bool {
        usage != 0 && self.0.contains(&usage)
    }

    /// Whether no usage is pressed
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|slot| *slot == 0)
    }

    /// Pressed usages in slot order
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.iter().copied().filter(|slot| *slot != 0)
    }

    /// Raw slots
    pub fn as_slots(&self) -> &[u16; KEY_SLOTS] {
        &self.0
    }
}

impl Default for Keys {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Keys> for Vec<u16> {
    fn from(keys: Keys) -> Self {
        keys.iter().collect()
    }
}

impl From<Vec<u16>> for Keys {
    fn from(usages: Vec<u16>) -> Self {
        let mut keys = Keys::new();
        for usage in usages {
            keys.insert(usage);
        }
        keys
    }
}

/// Pressed pointing buttons, button `n` at bit `n - 1`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Buttons(u32);

impl Buttons {
    /// Build from a raw bitmask
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bitmask
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Press a button (1..=32)
    pub fn insert(&mut self, button: u8) {
        if (1..=MAX_POINTING_BUTTON).contains(&button) {
            self.0 |= 1 << (button - 1);
        }
    }

    /// Release a button (1..=32)
    pub fn erase(&mut self, button: u8) {
        if (1..=MAX_POINTING_BUTTON).contains(&button) {
            self.0 &= !(1 << (button - 1));
        }
    }

    /// Whether a button is pressed
    pub fn exists(&self, button: u8) -> bool {
        (1..=MAX_POINTING_BUTTON).contains(&button) && self.0 & (1 << (button - 1)) != 0
    }

    /// Whether no button is pressed
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Boot keyboard report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyboardInput {
    /// Modifier byte
    pub modifiers: BitFlags<HidModifier>,
    /// Keyboard page usages
    pub keys: Keys,
}

/// Consumer page report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsumerInput {
    /// Consumer usages
    pub keys: Keys,
}

/// Apple vendor top case report (fn and brightness keys)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppleVendorTopCaseInput {
    /// Top case usages
    pub keys: Keys,
}

/// Apple vendor keyboard report (mission control, launchpad, ...)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppleVendorKeyboardInput {
    /// Vendor keyboard usages
    pub keys: Keys,
}

/// Generic desktop system-control report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenericDesktopInput {
    /// System control usages
    pub keys: Keys,
}

/// Relative pointing report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointingInput {
    /// Held buttons
    pub buttons: Buttons,
    /// X delta
    pub x: i8,
    /// Y delta
    pub y: i8,
    /// Vertical wheel delta
    pub vertical_wheel: i8,
    /// Horizontal wheel delta
    pub horizontal_wheel: i8,
}

/// Pointing state for the display-server injection path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InjectedPointingInput {
    /// Held buttons
    pub buttons: Buttons,
    /// X delta
    pub x: i32,
    /// Y delta
    pub y: i32,
    /// Vertical wheel delta
    pub vertical_wheel: i32,
    /// Horizontal wheel delta
    pub horizontal_wheel: i32,
}

impl From<PointingInput> for InjectedPointingInput {
    fn from(input: PointingInput) -> Self {
        Self {
            buttons: input.buttons,
            x: i32::from(input.x),
            y: i32::from(input.y),
            vertical_wheel: i32::from(input.vertical_wheel),
            horizontal_wheel: i32::from(input.horizontal_wheel),
        }
    }
}

/// A report for the virtual device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Report {
    /// Keyboard report
    Keyboard(KeyboardInput),
    /// Consumer report
    Consumer(ConsumerInput),
    /// Apple vendor top case report
    AppleVendorTopCase(AppleVendorTopCaseInput),
    /// Apple vendor keyboard report
    AppleVendorKeyboard(AppleVendorKeyboardInput),
    /// Generic desktop report
    GenericDesktop(GenericDesktopInput),
    /// Pointing report
    Pointing(PointingInput),
}

impl Report {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Report::Keyboard(_) => "keyboard",
            Report::Consumer(_) => "consumer",
            Report::AppleVendorTopCase(_) => "apple_vendor_top_case",
            Report::AppleVendorKeyboard(_) => "apple_vendor_keyboard",
            Report::GenericDesktop(_) => "generic_desktop",
            Report::Pointing(_) => "pointing",
        }
    }
}
