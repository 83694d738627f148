//! Keyboard repeat detection
//!
//! Tracks the single non-modifier key the OS would currently be
//! auto-repeating. Only the most recent key-down counts, matching how
//! hardware repeat behaves when a second key is pressed.

use crate::hid::{EventType, Usage, UsagePage, UsagePair};

/// Remembers which key, if any, is auto-repeating
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyboardRepeatDetector {
    repeating_key: Option<UsagePair>,
}

impl KeyboardRepeatDetector {
    /// Create a detector with no key held
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one key transition
    pub fn set(&mut self, usage_page: UsagePage, usage: Usage, event_type: EventType) {
        let pair = UsagePair::new(usage_page, usage);
        match event_type {
            EventType::KeyDown => {
                if !pair.is_modifier() {
                    self.repeating_key = Some(pair);
                }
            }
            EventType::KeyUp => {
                if self.repeating_key == Some(pair) {
                    self.repeating_key = None;
                }
            }
            EventType::Single => {}
        }
    }

    /// Whether a key is being repeated
    pub fn is_repeating(&self) -> bool {
        self.repeating_key.is_some()
    }

    /// The repeating key
    pub fn repeating_key(&self) -> Option<UsagePair> {
        self.repeating_key
    }

    /// Forget the repeating key
    pub fn clear(&mut self) {
        self.repeating_key = None;
    }
}
