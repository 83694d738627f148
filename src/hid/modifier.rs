//! Modifier flags
//!
//! Two views of the same keys: [`ModifierFlag`] is the logical set the
//! pipeline tracks (including caps lock and fn), [`HidModifier`] is the
//! byte carried in a boot keyboard report.

use enumflags2::bitflags;
use serde::{Deserialize, Serialize};

use super::usages::{apple_vendor_top_case, keyboard, page};
use super::UsagePair;

/// Logical modifier keys
#[bitflags]
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierFlag {
    /// Caps lock
    CapsLock = 1 << 0,
    /// Left control
    LeftControl = 1 << 1,
    /// Left shift
    LeftShift = 1 << 2,
    /// Left option (alt)
    LeftOption = 1 << 3,
    /// Left command (super)
    LeftCommand = 1 << 4,
    /// Right control
    RightControl = 1 << 5,
    /// Right shift
    RightShift = 1 << 6,
    /// Right option (alt)
    RightOption = 1 << 7,
    /// Right command (super)
    RightCommand = 1 << 8,
    /// fn
    Fn = 1 << 9,
}

impl ModifierFlag {
    /// All flags in dispatch order. Caps lock comes first so its toggle
    /// pulse is emitted before any other modifier changes.
    pub const ALL: [ModifierFlag; 10] = [
        ModifierFlag::CapsLock,
        ModifierFlag::LeftControl,
        ModifierFlag::LeftShift,
        ModifierFlag::LeftOption,
        ModifierFlag::LeftCommand,
        ModifierFlag::RightControl,
        ModifierFlag::RightShift,
        ModifierFlag::RightOption,
        ModifierFlag::RightCommand,
        ModifierFlag::Fn,
    ];

    /// The key that produces this flag
    pub fn usage_pair(self) -> UsagePair {
        match self {
            ModifierFlag::CapsLock => UsagePair::keyboard(keyboard::CAPS_LOCK),
            ModifierFlag::LeftControl => UsagePair::keyboard(keyboard::LEFT_CONTROL),
            ModifierFlag::LeftShift => UsagePair::keyboard(keyboard::LEFT_SHIFT),
            ModifierFlag::LeftOption => UsagePair::keyboard(keyboard::LEFT_OPTION),
            ModifierFlag::LeftCommand => UsagePair::keyboard(keyboard::LEFT_COMMAND),
            ModifierFlag::RightControl => UsagePair::keyboard(keyboard::RIGHT_CONTROL),
            ModifierFlag::RightShift => UsagePair::keyboard(keyboard::RIGHT_SHIFT),
            ModifierFlag::RightOption => UsagePair::keyboard(keyboard::RIGHT_OPTION),
            ModifierFlag::RightCommand => UsagePair::keyboard(keyboard::RIGHT_COMMAND),
            ModifierFlag::Fn => {
                UsagePair::new(page::APPLE_VENDOR_TOP_CASE, apple_vendor_top_case::KEYBOARD_FN)
            }
        }
    }
}

/// Modifier bits of a boot keyboard report
#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HidModifier {
    /// Left control
    LeftControl = 0x01,
    /// Left shift
    LeftShift = 0x02,
    /// Left option
    LeftOption = 0x04,
    /// Left command
    LeftCommand = 0x08,
    /// Right control
    RightControl = 0x10,
    /// Right shift
    RightShift = 0x20,
    /// Right option
    RightOption = 0x40,
    /// Right command
    RightCommand = 0x80,
}

impl HidModifier {
    /// All report modifier bits in bit order
    pub const ALL: [HidModifier; 8] = [
        HidModifier::LeftControl,
        HidModifier::LeftShift,
        HidModifier::LeftOption,
        HidModifier::LeftCommand,
        HidModifier::RightControl,
        HidModifier::RightShift,
        HidModifier::RightOption,
        HidModifier::RightCommand,
    ];

    /// The logical flag this bit represents
    pub fn modifier_flag(self) -> ModifierFlag {
        match self {
            HidModifier::LeftControl => ModifierFlag::LeftControl,
            HidModifier::LeftShift => ModifierFlag::LeftShift,
            HidModifier::LeftOption => ModifierFlag::LeftOption,
            HidModifier::LeftCommand => ModifierFlag::LeftCommand,
            HidModifier::RightControl => ModifierFlag::RightControl,
            HidModifier::RightShift => ModifierFlag::RightShift,
            HidModifier::RightOption => ModifierFlag::RightOption,
            HidModifier::RightCommand => ModifierFlag::RightCommand,
        }
    }
}

/// Map a key to its modifier flag, if it is a modifier key
pub fn make_modifier_flag(pair: UsagePair) -> Option<ModifierFlag> {
    if pair.usage_page == page::KEYBOARD_OR_KEYPAD {
        match pair.usage {
            keyboard::CAPS_LOCK => Some(ModifierFlag::CapsLock),
            keyboard::LEFT_CONTROL => Some(ModifierFlag::LeftControl),
            keyboard::LEFT_SHIFT => Some(ModifierFlag::LeftShift),
            keyboard::LEFT_OPTION => Some(ModifierFlag::LeftOption),
            keyboard::LEFT_COMMAND => Some(ModifierFlag::LeftCommand),
            keyboard::RIGHT_CONTROL => Some(ModifierFlag::RightControl),
            keyboard::RIGHT_SHIFT => Some(ModifierFlag::RightShift),
            keyboard::RIGHT_OPTION => Some(ModifierFlag::RightOption),
            keyboard::RIGHT_COMMAND => Some(ModifierFlag::RightCommand),
            _ => None,
        }
    } else if pair.usage_page == page::APPLE_VENDOR_TOP_CASE
        && pair.usage == apple_vendor_top_case::KEYBOARD_FN
    {
        Some(ModifierFlag::Fn)
    } else {
        None
    }
}

/// Map a modifier flag to its report bit. Caps lock and fn have none.
pub fn make_hid_report_modifier(flag: ModifierFlag) -> Option<HidModifier> {
    match flag {
        ModifierFlag::LeftControl => Some(HidModifier::LeftControl),
        ModifierFlag::LeftShift => Some(HidModifier::LeftShift),
        ModifierFlag::LeftOption => Some(HidModifier::LeftOption),
        ModifierFlag::LeftCommand => Some(HidModifier::LeftCommand),
        ModifierFlag::RightControl => Some(HidModifier::RightControl),
        ModifierFlag::RightShift => Some(HidModifier::RightShift),
        ModifierFlag::RightOption => Some(HidModifier::RightOption),
        ModifierFlag::RightCommand => Some(HidModifier::RightCommand),
        ModifierFlag::CapsLock | ModifierFlag::Fn => None,
    }
}
