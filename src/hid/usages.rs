//! HID Usage Tables
//!
//! The subset of the USB HID usage tables the pipeline classifies. Values
//! follow HID Usage Tables 1.4 plus the two Apple vendor pages that
//! keyboards with an `fn` key report on.

use super::{Usage, UsagePage};

/// Usage pages
pub mod page {
    use super::UsagePage;

    pub const GENERIC_DESKTOP: UsagePage = UsagePage(0x01);
    pub const KEYBOARD_OR_KEYPAD: UsagePage = UsagePage(0x07);
    pub const LEDS: UsagePage = UsagePage(0x08);
    pub const BUTTON: UsagePage = UsagePage(0x09);
    pub const CONSUMER: UsagePage = UsagePage(0x0C);
    pub const APPLE_VENDOR_TOP_CASE: UsagePage = UsagePage(0x00FF);
    pub const APPLE_VENDOR_KEYBOARD: UsagePage = UsagePage(0xFF01);
}

/// Generic desktop page (0x01)
pub mod generic_desktop {
    use super::Usage;

    pub const X: Usage = Usage(0x30);
    pub const Y: Usage = Usage(0x31);
    pub const WHEEL: Usage = Usage(0x38);

    // System control keys
    pub const SYSTEM_POWER_DOWN: Usage = Usage(0x81);
    pub const SYSTEM_SLEEP: Usage = Usage(0x82);
    pub const SYSTEM_WAKE_UP: Usage = Usage(0x83);
    pub const SYSTEM_MENU_DOWN: Usage = Usage(0x8F);
    pub const DO_NOT_DISTURB: Usage = Usage(0x9B);
}

/// Keyboard/keypad page (0x07)
pub mod keyboard {
    use super::Usage;

    pub const A: Usage = Usage(0x04);
    pub const B: Usage = Usage(0x05);
    pub const C: Usage = Usage(0x06);
    pub const S: Usage = Usage(0x16);
    pub const Z: Usage = Usage(0x1D);
    pub const RETURN_OR_ENTER: Usage = Usage(0x28);
    pub const ESCAPE: Usage = Usage(0x29);
    pub const DELETE_OR_BACKSPACE: Usage = Usage(0x2A);
    pub const TAB: Usage = Usage(0x2B);
    pub const SPACEBAR: Usage = Usage(0x2C);
    pub const CAPS_LOCK: Usage = Usage(0x39);
    pub const F1: Usage = Usage(0x3A);
    pub const F12: Usage = Usage(0x45);
    pub const RIGHT_ARROW: Usage = Usage(0x4F);
    pub const LEFT_ARROW: Usage = Usage(0x50);
    pub const DOWN_ARROW: Usage = Usage(0x51);
    pub const UP_ARROW: Usage = Usage(0x52);

    pub const LEFT_CONTROL: Usage = Usage(0xE0);
    pub const LEFT_SHIFT: Usage = Usage(0xE1);
    pub const LEFT_OPTION: Usage = Usage(0xE2);
    pub const LEFT_COMMAND: Usage = Usage(0xE3);
    pub const RIGHT_CONTROL: Usage = Usage(0xE4);
    pub const RIGHT_SHIFT: Usage = Usage(0xE5);
    pub const RIGHT_OPTION: Usage = Usage(0xE6);
    pub const RIGHT_COMMAND: Usage = Usage(0xE7);

    /// First usage that is an actual key (0x01..=0x03 are error codes)
    pub(crate) const FIRST_KEY: Usage = A;
    /// Last usage that is an actual key
    pub(crate) const LAST_KEY: Usage = RIGHT_COMMAND;
}

/// LED page (0x08)
pub mod led {
    use super::Usage;

    pub const NUM_LOCK: Usage = Usage(0x01);
    pub const CAPS_LOCK: Usage = Usage(0x02);
}

/// Consumer page (0x0C)
pub mod consumer {
    use super::Usage;

    pub const POWER: Usage = Usage(0x30);
    pub const DISPLAY_BRIGHTNESS_INCREMENT: Usage = Usage(0x6F);
    pub const DISPLAY_BRIGHTNESS_DECREMENT: Usage = Usage(0x70);
    pub const FAST_FORWARD: Usage = Usage(0xB3);
    pub const REWIND: Usage = Usage(0xB4);
    pub const SCAN_NEXT_TRACK: Usage = Usage(0xB5);
    pub const SCAN_PREVIOUS_TRACK: Usage = Usage(0xB6);
    pub const EJECT: Usage = Usage(0xB8);
    pub const PLAY_OR_PAUSE: Usage = Usage(0xCD);
    pub const MUTE: Usage = Usage(0xE2);
    pub const VOLUME_INCREMENT: Usage = Usage(0xE9);
    pub const VOLUME_DECREMENT: Usage = Usage(0xEA);
    pub const AC_PAN: Usage = Usage(0x238);

    pub(crate) const FIRST_CONTROL: Usage = POWER;
    pub(crate) const LAST_CONTROL: Usage = Usage(0x29C);
}

/// Apple vendor top case page (0x00FF)
pub mod apple_vendor_top_case {
    use super::Usage;

    pub const KEYBOARD_FN: Usage = Usage(0x03);
    pub const BRIGHTNESS_UP: Usage = Usage(0x04);
    pub const BRIGHTNESS_DOWN: Usage = Usage(0x05);
    pub const ILLUMINATION_UP: Usage = Usage(0x08);
    pub const ILLUMINATION_DOWN: Usage = Usage(0x09);
}

/// Apple vendor keyboard page (0xFF01)
pub mod apple_vendor_keyboard {
    use super::Usage;

    pub const SPOTLIGHT: Usage = Usage(0x01);
    pub const DASHBOARD: Usage = Usage(0x02);
    pub const FUNCTION: Usage = Usage(0x03);
    pub const LAUNCHPAD: Usage = Usage(0x04);
    pub const EXPOSE_ALL: Usage = Usage(0x10);
    pub const EXPOSE_DESKTOP: Usage = Usage(0x11);
    pub const BRIGHTNESS_UP: Usage = Usage(0x20);
    pub const BRIGHTNESS_DOWN: Usage = Usage(0x21);
    pub const LANGUAGE: Usage = Usage(0x30);
}

/// Highest pointing button number the reports carry
pub const MAX_POINTING_BUTTON: u8 = 32;

/// Returns true if `(usage_page, usage)` names a key-like control that
/// produces down/up transitions.
pub fn is_key_usage(usage_page: UsagePage, usage: Usage) -> bool {
    match usage_page {
        page::KEYBOARD_OR_KEYPAD => {
            usage >= keyboard::FIRST_KEY && usage <= keyboard::LAST_KEY
        }
        page::CONSUMER => {
            usage != consumer::AC_PAN
                && usage >= consumer::FIRST_CONTROL
                && usage <= consumer::LAST_CONTROL
        }
        page::APPLE_VENDOR_TOP_CASE | page::APPLE_VENDOR_KEYBOARD => {
            usage.0 >= 0x01 && usage.0 <= 0xFF
        }
        page::GENERIC_DESKTOP => {
            (generic_desktop::SYSTEM_POWER_DOWN..=generic_desktop::SYSTEM_MENU_DOWN)
                .contains(&usage)
                || usage == generic_desktop::DO_NOT_DISTURB
        }
        _ => false,
    }
}

/// Returns the pointing button number (1-based) if the usage is on the
/// button page.
pub fn pointing_button(usage_page: UsagePage, usage: Usage) -> Option<u8> {
    if usage_page == page::BUTTON && usage.0 >= 1 && usage.0 <= MAX_POINTING_BUTTON as u16 {
        Some(usage.0 as u8)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard_range() {
        assert!(is_key_usage(page::KEYBOARD_OR_KEYPAD, keyboard::A));
        assert!(is_key_usage(page::KEYBOARD_OR_KEYPAD, keyboard::RIGHT_COMMAND));
        // Error roll-over and reserved codes are not keys
        assert!(!is_key_usage(page::KEYBOARD_OR_KEYPAD, Usage(0x01)));
        assert!(!is_key_usage(page::KEYBOARD_OR_KEYPAD, Usage(0xE8)));
    }

    #[test]
    fn test_consumer_excludes_pan_axis() {
        assert!(is_key_usage(page::CONSUMER, consumer::VOLUME_INCREMENT));
        assert!(!is_key_usage(page::CONSUMER, consumer::AC_PAN));
        assert!(!is_key_usage(page::CONSUMER, Usage(0x01)));
    }

    #[test]
    fn test_generic_desktop_keys() {
        assert!(is_key_usage(page::GENERIC_DESKTOP, generic_desktop::SYSTEM_SLEEP));
        assert!(is_key_usage(page::GENERIC_DESKTOP, generic_desktop::DO_NOT_DISTURB));
        assert!(!is_key_usage(page::GENERIC_DESKTOP, generic_desktop::X));
    }

    #[test]
    fn test_pointing_button() {
        assert_eq!(pointing_button(page::BUTTON, Usage(1)), Some(1));
        assert_eq!(pointing_button(page::BUTTON, Usage(32)), Some(32));
        assert_eq!(pointing_button(page::BUTTON, Usage(0)), None);
        assert_eq!(pointing_button(page::BUTTON, Usage(33)), None);
        assert_eq!(pointing_button(page::KEYBOARD_OR_KEYPAD, Usage(1)), None);
    }
}
