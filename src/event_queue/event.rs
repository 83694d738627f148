//! Typed input events

use serde::{Deserialize, Serialize};

use crate::hid::{make_modifier_flag, AbsoluteTime, DeviceId, EventType, ModifierFlag, UsagePair};

/// Payload of an input event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Event {
    /// A key-like control (keyboard, consumer, vendor or system key)
    KeyCode(UsagePair),
    /// A pointing button, 1-based
    PointingButton(u8),
    /// Relative X motion
    PointingX(i32),
    /// Relative Y motion
    PointingY(i32),
    /// Vertical wheel delta
    PointingVerticalWheel(i32),
    /// Horizontal wheel delta
    PointingHorizontalWheel(i32),
    /// Caps lock LED state reported by the keyboard
    CapsLockStateChanged(bool),
}

impl Event {
    /// The key's usage pair, for key events
    pub fn key_code(&self) -> Option<UsagePair> {
        match self {
            Event::KeyCode(pair) => Some(*pair),
            _ => None,
        }
    }

    /// The modifier this event's key produces, if any
    pub fn modifier_flag(&self) -> Option<ModifierFlag> {
        self.key_code().and_then(make_modifier_flag)
    }

    /// The pointing button number, for button events
    pub fn pointing_button(&self) -> Option<u8> {
        match self {
            Event::PointingButton(button) => Some(*button),
            _ => None,
        }
    }

    /// The signed delta carried by axis events
    pub fn axis_value(&self) -> Option<i32> {
        match self {
            Event::PointingX(v)
            | Event::PointingY(v)
            | Event::PointingVerticalWheel(v)
            | Event::PointingHorizontalWheel(v) => Some(*v),
            _ => None,
        }
    }
}

/// An event as it sits in an [`EventQueue`](super::EventQueue)
///
/// Everything except `valid` and `lazy` is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEvent {
    device_id: DeviceId,
    time_stamp: AbsoluteTime,
    event: Event,
    event_type: EventType,
    /// The event as first observed, before any rewriting upstream
    original_event: Event,
    valid: bool,
    lazy: bool,
}

impl InputEvent {
    /// Create a valid, non-lazy event whose original is itself
    pub fn new(
        device_id: DeviceId,
        time_stamp: AbsoluteTime,
        event: Event,
        event_type: EventType,
    ) -> Self {
        Self {
            device_id,
            time_stamp,
            event,
            event_type,
            original_event: event,
            valid: true,
            lazy: false,
        }
    }

    /// Set the original event (builder style)
    pub fn with_original_event(mut self, original_event: Event) -> Self {
        self.original_event = original_event;
        self
    }

    /// Set the lazy flag (builder style)
    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    /// Source device
    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// Delivery timestamp
    pub fn time_stamp(&self) -> AbsoluteTime {
        self.time_stamp
    }

    /// Payload
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Direction
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Payload as first observed
    pub fn original_event(&self) -> &Event {
        &self.original_event
    }

    /// Whether downstream consumers should still act on this event
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Mark the event as consumed (or revive it)
    pub fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    /// Whether the event may be deferred by downstream consumers
    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    /// Set the lazy flag
    pub fn set_lazy(&mut self, lazy: bool) {
        self.lazy = lazy;
    }

    pub(super) fn delay_time_stamp(&mut self, delay: std::time::Duration) {
        self.time_stamp += delay;
    }
}
