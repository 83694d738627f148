//! Reordering input queue
//!
//! Some keyboards deliver a modifier and an ordinary key in one HID report,
//! and the input subsystem does not guarantee the value events of that
//! report arrive modifier-first. For control+up-arrow the raw order can be:
//!
//! ```text
//!   1. up_arrow  down   t=1000
//!   2. control   down   t=1000
//!   3. up_arrow  up     t=2000
//!   4. control   up     t=2000
//! ```
//!
//! which downstream consumers would read as a bare up-arrow. The queue
//! re-sorts after every insertion with a pairwise comparator
//! ([`needs_swap`]) so that at a shared timestamp a pressed modifier comes
//! before its companion key and a released modifier comes after it.

use std::time::Duration;

use tracing::trace;

use super::event::{Event, InputEvent};
use super::state::{ActiveModifierFlag, ModifierFlagManager, PointingButtonManager};
use crate::hid::usages::{self, consumer, generic_desktop, led, page};
use crate::hid::{
    make_modifier_flag, AbsoluteTime, DeviceId, EventType, ModifierFlag, Usage, UsagePage,
    UsagePair,
};

/// Whether `v2` must be moved in front of `v1`
///
/// An earlier timestamp always moves forward. At an equal timestamp only
/// pairs of keyboard keys where exactly one side is a modifier are
/// swapped; pointer, LED and consumer events keep insertion order.
pub fn needs_swap(v1: &InputEvent, v2: &InputEvent) -> bool {
    if v1.time_stamp() != v2.time_stamp() {
        return v2.time_stamp() < v1.time_stamp();
    }

    let (Some(key1), Some(key2)) = (keyboard_key(v1), keyboard_key(v2)) else {
        return false;
    };

    match (make_modifier_flag(key1).is_some(), make_modifier_flag(key2).is_some()) {
        // v2 is the modifier: pull it forward when it is being pressed
        (false, true) => v2.event_type() != EventType::KeyUp,
        // v1 is the modifier: push it back when it is being released
        (true, false) => v1.event_type() == EventType::KeyUp,
        _ => false,
    }
}

/// Key code on a keyboard or vendor key page
fn keyboard_key(event: &InputEvent) -> Option<UsagePair> {
    event
        .event()
        .key_code()
        .filter(|pair| {
            pair.usage_page != page::CONSUMER && pair.usage_page != page::GENERIC_DESKTOP
        })
}

/// Ordered queue of typed input events for one device or tap session
///
/// Not internally synchronized; one producer owns it.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<InputEvent>,
    modifier_flag_manager: ModifierFlagManager,
    pointing_button_manager: PointingButtonManager,
    /// Added to every inserted timestamp. Reset when the queue drains.
    time_stamp_delay: Duration,
}

impl EventQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a raw HID value and insert it
    ///
    /// Returns false if the usage is not one the pipeline handles; such
    /// values are dropped.
    pub fn push(
        &mut self,
        device_id: DeviceId,
        time_stamp: AbsoluteTime,
        usage_page: UsagePage,
        usage: Usage,
        integer_value: i64,
    ) -> bool {
        let Some((event, event_type)) = classify(usage_page, usage, integer_value) else {
            trace!(
                "Dropping unhandled usage {:#06x}/{:#06x} from {}",
                usage_page.0,
                usage.0,
                device_id
            );
            return false;
        };

        self.emplace_back_event(InputEvent::new(device_id, time_stamp, event, event_type));
        true
    }

    /// Insert an already typed event
    pub fn emplace_back_event(&mut self, mut event: InputEvent) {
        if !self.time_stamp_delay.is_zero() {
            event.delay_time_stamp(self.time_stamp_delay);
        }

        self.track_held_controls(&event);
        self.events.push(event);
        self.sort_events();
    }

    fn track_held_controls(&mut self, event: &InputEvent) {
        let device_id = event.device_id();

        match *event.event() {
            Event::KeyCode(_) => {
                if let Some(flag) = event.event().modifier_flag() {
                    let change = if event.event_type() == EventType::KeyDown {
                        ActiveModifierFlag::Increase(flag, device_id)
                    } else {
                        ActiveModifierFlag::Decrease(flag, device_id)
                    };
                    self.modifier_flag_manager.push_back_active_modifier_flag(change);
                }
            }
            Event::CapsLockStateChanged(on) => {
                let change = if on {
                    ActiveModifierFlag::IncreaseLock(ModifierFlag::CapsLock, device_id)
                } else {
                    ActiveModifierFlag::DecreaseLock(ModifierFlag::CapsLock, device_id)
                };
                self.modifier_flag_manager.push_back_active_modifier_flag(change);
            }
            Event::PointingButton(button) => {
                if event.event_type() == EventType::KeyDown {
                    self.pointing_button_manager.increase(device_id, button);
                } else {
                    self.pointing_button_manager.decrease(device_id, button);
                }
            }
            _ => {}
        }
    }

    /// Gnome sort with [`needs_swap`]. Equal-rank events never move, so the
    /// sort is stable.
    fn sort_events(&mut self) {
        let mut i = 0;
        while i + 1 < self.events.len() {
            if needs_swap(&self.events[i], &self.events[i + 1]) {
                self.events.swap(i, i + 1);
                i = i.saturating_sub(1);
            } else {
                i += 1;
            }
        }
    }

    /// Oldest event
    pub fn front(&self) -> Option<&InputEvent> {
        self.events.first()
    }

    /// Oldest event, mutably (for `valid`/`lazy`)
    pub fn front_mut(&mut self) -> Option<&mut InputEvent> {
        self.events.first_mut()
    }

    /// Remove the oldest event. Emptying the queue resets the delay.
    pub fn erase_front_event(&mut self) -> Option<InputEvent> {
        if self.events.is_empty() {
            return None;
        }
        let event = self.events.remove(0);
        if self.events.is_empty() {
            self.time_stamp_delay = Duration::ZERO;
        }
        Some(event)
    }

    /// Events in delivery order
    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }

    /// Number of queued events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop all events and reset the delay. Held-control state is kept.
    pub fn clear(&mut self) {
        self.events.clear();
        self.time_stamp_delay = Duration::ZERO;
    }

    /// Current insertion delay
    pub fn time_stamp_delay(&self) -> Duration {
        self.time_stamp_delay
    }

    /// Shift every later insertion by a further `delay`
    pub fn increase_time_stamp_delay(&mut self, delay: Duration) {
        self.time_stamp_delay += delay;
    }

    /// Modifier state accumulated from inserted events
    pub fn modifier_flag_manager(&self) -> &ModifierFlagManager {
        &self.modifier_flag_manager
    }

    /// Button state accumulated from inserted events
    pub fn pointing_button_manager(&self) -> &PointingButtonManager {
        &self.pointing_button_manager
    }

    /// Forget every modifier a removed device held, locks included
    pub fn erase_all_active_modifier_flags(&mut self, device_id: DeviceId) {
        self.modifier_flag_manager.erase_all_active_modifier_flags(device_id);
    }

    /// Forget every modifier a device held, keeping its locks
    pub fn erase_all_active_modifier_flags_except_lock(&mut self, device_id: DeviceId) {
        self.modifier_flag_manager
            .erase_all_active_modifier_flags_except_lock(device_id);
    }

    /// Forget every button a removed device held
    pub fn erase_all_active_pointing_buttons(&mut self, device_id: DeviceId) {
        self.pointing_button_manager
            .erase_all_active_pointing_buttons(device_id);
    }
}

fn classify(usage_page: UsagePage, usage: Usage, integer_value: i64) -> Option<(Event, EventType)> {
    let pressed = if integer_value != 0 {
        EventType::KeyDown
    } else {
        EventType::KeyUp
    };
    let axis = || integer_value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;

    if usages::is_key_usage(usage_page, usage) {
        return Some((Event::KeyCode(UsagePair::new(usage_page, usage)), pressed));
    }
    if let Some(button) = usages::pointing_button(usage_page, usage) {
        return Some((Event::PointingButton(button), pressed));
    }

    let event = match (usage_page, usage) {
        (page::GENERIC_DESKTOP, generic_desktop::X) => Event::PointingX(axis()),
        (page::GENERIC_DESKTOP, generic_desktop::Y) => Event::PointingY(axis()),
        (page::GENERIC_DESKTOP, generic_desktop::WHEEL) => Event::PointingVerticalWheel(axis()),
        (page::CONSUMER, consumer::AC_PAN) => Event::PointingHorizontalWheel(axis()),
        (page::LEDS, led::CAPS_LOCK) => Event::CapsLockStateChanged(integer_value != 0),
        _ => return None,
    };
    Some((event, EventType::Single))
}
