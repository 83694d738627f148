//! Per-device derivation of capture eligibility

use std::collections::BTreeSet;

use enumflags2::BitFlags;

use super::state::{GrabbableState, State, UngrabbableReason};
use crate::event_queue::{Event, InputEvent};
use crate::hid::{AbsoluteTime, DeviceId, EventType, ModifierFlag};
use crate::repeat::KeyboardRepeatDetector;

/// Tracks what one device holds and derives its [`GrabbableState`]
///
/// When several obstructions hold at once the reported reason is, in
/// order: key repeating, modifier pressed, pointing button pressed.
#[derive(Debug, Clone)]
pub struct GrabbableStateEntry {
    device_id: DeviceId,
    repeat_detector: KeyboardRepeatDetector,
    pressed_modifier_flags: BitFlags<ModifierFlag>,
    pressed_pointing_buttons: BTreeSet<u8>,
    time_stamp: AbsoluteTime,
}

impl GrabbableStateEntry {
    /// Create an entry with nothing held
    pub fn new(device_id: DeviceId) -> Self {
        Self {
            device_id,
            repeat_detector: KeyboardRepeatDetector::new(),
            pressed_modifier_flags: BitFlags::empty(),
            pressed_pointing_buttons: BTreeSet::new(),
            time_stamp: AbsoluteTime::ZERO,
        }
    }

    /// Device this entry tracks
    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// Apply one event and return the derived state
    pub fn update(&mut self, event: &InputEvent) -> GrabbableState {
        self.time_stamp = event.time_stamp();
        let event_type = event.event_type();

        match *event.event() {
            Event::KeyCode(pair) => {
                self.repeat_detector.set(pair.usage_page, pair.usage, event_type);

                if let Some(flag) = event.event().modifier_flag() {
                    match event_type {
                        EventType::KeyDown => self.pressed_modifier_flags.insert(flag),
                        EventType::KeyUp => self.pressed_modifier_flags.remove(flag),
                        EventType::Single => {}
                    }
                }
            }
            Event::PointingButton(button) => match event_type {
                EventType::KeyDown => {
                    self.pressed_pointing_buttons.insert(button);
                }
                EventType::KeyUp => {
                    self.pressed_pointing_buttons.remove(&button);
                }
                EventType::Single => {}
            },
            _ => {}
        }

        self.grabbable_state()
    }

    /// The state implied by what is currently held
    pub fn grabbable_state(&self) -> GrabbableState {
        let reason = if self.repeat_detector.is_repeating() {
            UngrabbableReason::KeyRepeating
        } else if !self.pressed_modifier_flags.is_empty() {
            UngrabbableReason::ModifierKeyPressed
        } else if !self.pressed_pointing_buttons.is_empty() {
            UngrabbableReason::PointingButtonPressed
        } else {
            UngrabbableReason::None
        };

        let state = if reason == UngrabbableReason::None {
            State::Grabbable
        } else {
            State::UngrabbableTemporarily
        };

        GrabbableState::new(self.device_id, state, reason, self.time_stamp)
    }

    /// Repeat tracking for this device
    pub fn repeat_detector(&self) -> &KeyboardRepeatDetector {
        &self.repeat_detector
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::usages::{consumer, keyboard};
    use crate::hid::UsagePair;

    const DEVICE: DeviceId = DeviceId(1);

    fn event(event: Event, event_type: EventType, ts: u64) -> InputEvent {
        InputEvent::new(DEVICE, AbsoluteTime::from_nanos(ts), event, event_type)
    }

    fn key(usage: crate::hid::Usage) -> Event {
        Event::KeyCode(UsagePair::keyboard(usage))
    }

    #[test]
    fn test_key_repeat() {
        let mut entry = GrabbableStateEntry::new(DEVICE);

        let state = entry.update(&event(key(keyboard::A), EventType::KeyUp, 1000));
        assert_eq!(state, GrabbableState::grabbable(DEVICE, AbsoluteTime::from_nanos(1000)));

        let state = entry.update(&event(key(keyboard::A), EventType::KeyDown, 2000));
        assert_eq!(state.state(), State::UngrabbableTemporarily);
        assert_eq!(state.reason(), UngrabbableReason::KeyRepeating);
        assert_eq!(state.time_stamp(), AbsoluteTime::from_nanos(2000));

        let state = entry.update(&event(key(keyboard::A), EventType::KeyUp, 3000));
        assert_eq!(state.state(), State::Grabbable);
    }

    #[test]
    fn test_consumer_key_repeat() {
        let mut entry = GrabbableStateEntry::new(DEVICE);
        let volume = Event::KeyCode(UsagePair::consumer(consumer::VOLUME_INCREMENT));

        let state = entry.update(&event(volume, EventType::KeyDown, 4000));
        assert_eq!(state.reason(), UngrabbableReason::KeyRepeating);

        let state = entry.update(&event(volume, EventType::KeyUp, 5000));
        assert_eq!(state.reason(), UngrabbableReason::None);
    }

    #[test]
    fn test_modifier_and_button() {
        let mut entry = GrabbableStateEntry::new(DEVICE);

        let state = entry.update(&event(key(keyboard::LEFT_SHIFT), EventType::KeyDown, 6000));
        assert_eq!(state.reason(), UngrabbableReason::ModifierKeyPressed);

        let state = entry.update(&event(Event::PointingButton(1), EventType::KeyDown, 7000));
        assert_eq!(state.reason(), UngrabbableReason::ModifierKeyPressed);

        let state = entry.update(&event(key(keyboard::LEFT_SHIFT), EventType::KeyUp, 8000));
        assert_eq!(state.reason(), UngrabbableReason::PointingButtonPressed);

        let state = entry.update(&event(Event::PointingButton(1), EventType::KeyUp, 9000));
        assert_eq!(state.state(), State::Grabbable);
    }

    #[test]
    fn test_repeat_outranks_modifier() {
        let mut entry = GrabbableStateEntry::new(DEVICE);
        entry.update(&event(key(keyboard::LEFT_CONTROL), EventType::KeyDown, 1));
        let state = entry.update(&event(key(keyboard::C), EventType::KeyDown, 2));
        assert_eq!(state.reason(), UngrabbableReason::KeyRepeating);
    }

    #[test]
    fn test_motion_keeps_state_and_advances_time() {
        let mut entry = GrabbableStateEntry::new(DEVICE);
        entry.update(&event(Event::PointingButton(2), EventType::KeyDown, 10));
        let state = entry.update(&event(Event::PointingX(5), EventType::Single, 20));
        assert_eq!(state.reason(), UngrabbableReason::PointingButtonPressed);
        assert_eq!(state.time_stamp(), AbsoluteTime::from_nanos(20));
    }
}
