//! Key event dispatcher
//!
//! Remembers what has already been sent downstream as pressed so that
//! duplicate downs and unmatched ups never reach the output queue.

use enumflags2::BitFlags;
use tracing::debug;

use super::queue::OutputEventQueue;
use crate::event_queue::ModifierFlagState;
use crate::hid::{AbsoluteTime, DeviceId, EventType, ModifierFlag, UsagePair};

/// Tracks keys and modifiers dispatched as pressed
#[derive(Debug, Clone, Default)]
pub struct KeyEventDispatcher {
    /// Pressed keys in dispatch order, with the device that pressed them
    pressed_keys: Vec<(DeviceId, UsagePair)>,
    pressed_modifier_flags: BitFlags<ModifierFlag>,
}

impl KeyEventDispatcher {
    /// Create a dispatcher with nothing pressed
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a key-down unless the key is already down
    pub fn dispatch_key_down_event(
        &mut self,
        device_id: DeviceId,
        usage_pair: UsagePair,
        queue: &mut OutputEventQueue,
        time_stamp: AbsoluteTime,
    ) {
        if self.key_event_exists(usage_pair) {
            return;
        }
        self.pressed_keys.push((device_id, usage_pair));
        queue.emplace_back_key_event(usage_pair, EventType::KeyDown, time_stamp);
    }

    /// Queue a key-up if the key is down
    pub fn dispatch_key_up_event(
        &mut self,
        usage_pair: UsagePair,
        queue: &mut OutputEventQueue,
        time_stamp: AbsoluteTime,
    ) {
        if !self.key_event_exists(usage_pair) {
            return;
        }
        self.pressed_keys.retain(|(_, pair)| *pair != usage_pair);
        queue.emplace_back_key_event(usage_pair, EventType::KeyUp, time_stamp);
    }

    /// Bring the dispatched modifiers in line with `modifier_flags`
    ///
    /// Caps lock is handled first and always as a down/up pulse, since it
    /// toggles rather than holds.
    pub fn dispatch_modifier_key_event<M: ModifierFlagState + ?Sized>(
        &mut self,
        modifier_flags: &M,
        queue: &mut OutputEventQueue,
        time_stamp: AbsoluteTime,
    ) {
        for flag in ModifierFlag::ALL {
            let dispatched = self.pressed_modifier_flags.contains(flag);
            let usage_pair = flag.usage_pair();

            if modifier_flags.is_pressed(flag) {
                if !dispatched {
                    queue.emplace_back_key_event(usage_pair, EventType::KeyDown, time_stamp);
                    if flag == ModifierFlag::CapsLock {
                        queue.emplace_back_key_event(usage_pair, EventType::KeyUp, time_stamp);
                    }
                    self.pressed_modifier_flags.insert(flag);
                }
            } else if dispatched {
                if flag == ModifierFlag::CapsLock {
                    queue.emplace_back_key_event(usage_pair, EventType::KeyDown, time_stamp);
                }
                queue.emplace_back_key_event(usage_pair, EventType::KeyUp, time_stamp);
                self.pressed_modifier_flags.remove(flag);
            }
        }
    }

    /// Release every key a device pressed
    pub fn dispatch_key_up_events_by_device_id(
        &mut self,
        device_id: DeviceId,
        queue: &mut OutputEventQueue,
        time_stamp: AbsoluteTime,
    ) {
        while let Some(usage_pair) = self
            .pressed_keys
            .iter()
            .find(|(device, _)| *device == device_id)
            .map(|(_, pair)| *pair)
        {
            debug!("Releasing {} held by {}", usage_pair, device_id);
            self.dispatch_key_up_event(usage_pair, queue, time_stamp);
        }
    }

    /// Keys dispatched as pressed
    pub fn pressed_keys(&self) -> &[(DeviceId, UsagePair)] {
        &self.pressed_keys
    }

    /// Modifiers dispatched as pressed
    pub fn pressed_modifier_flags(&self) -> BitFlags<ModifierFlag> {
        self.pressed_modifier_flags
    }

    /// Mark a modifier as already dispatched
    pub fn insert_pressed_modifier_flag(&mut self, flag: ModifierFlag) {
        self.pressed_modifier_flags.insert(flag);
    }

    /// Forget a dispatched modifier without queuing a release
    pub fn erase_pressed_modifier_flag(&mut self, flag: ModifierFlag) {
        self.pressed_modifier_flags.remove(flag);
    }

    // Matches on usage alone: a key pressed by one device and released by
    // another is still one key downstream.
    fn key_event_exists(&self, usage_pair: UsagePair) -> bool {
        self.pressed_keys.iter().any(|(_, pair)| *pair == usage_pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_queue::{ActiveModifierFlag, ModifierFlagManager};
    use crate::hid::usages::keyboard;
    use crate::output::{OutputPayload, Report};

    const D1: DeviceId = DeviceId(1);
    const D2: DeviceId = DeviceId(2);
    const A: UsagePair = UsagePair::keyboard(keyboard::A);
    const B: UsagePair = UsagePair::keyboard(keyboard::B);
    const CAPS: UsagePair = UsagePair::keyboard(keyboard::CAPS_LOCK);

    fn ts() -> AbsoluteTime {
        AbsoluteTime::from_millis(1000)
    }

    fn key_slots(queue: &OutputEventQueue) -> Vec<Vec<u16>> {
        queue
            .events()
            .iter()
            .map(|e| match &e.payload {
                OutputPayload::Report(Report::Keyboard(input)) => input.keys.iter().collect(),
                other => panic!("unexpected payload {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_key_down_idempotent() {
        let mut dispatcher = KeyEventDispatcher::new();
        let mut queue = OutputEventQueue::new();

        dispatcher.dispatch_key_down_event(D1, A, &mut queue, ts());
        dispatcher.dispatch_key_down_event(D1, A, &mut queue, ts());
        dispatcher.dispatch_key_down_event(D2, A, &mut queue, ts());
        assert_eq!(queue.len(), 1);
        assert_eq!(dispatcher.pressed_keys(), &[(D1, A)]);
    }

    #[test]
    fn test_key_up_idempotent() {
        let mut dispatcher = KeyEventDispatcher::new();
        let mut queue = OutputEventQueue::new();

        dispatcher.dispatch_key_up_event(A, &mut queue, ts());
        assert!(queue.is_empty());

        dispatcher.dispatch_key_down_event(D1, A, &mut queue, ts());
        dispatcher.dispatch_key_up_event(A, &mut queue, ts());
        dispatcher.dispatch_key_up_event(A, &mut queue, ts());
        assert_eq!(key_slots(&queue), vec![vec![keyboard::A.0], vec![]]);
        assert!(dispatcher.pressed_keys().is_empty());
    }

    #[test]
    fn test_key_up_events_by_device_id() {
        let mut dispatcher = KeyEventDispatcher::new();
        let mut queue = OutputEventQueue::new();

        dispatcher.dispatch_key_down_event(D1, A, &mut queue, ts());
        dispatcher.dispatch_key_down_event(D2, B, &mut queue, ts());
        dispatcher.dispatch_key_down_event(D1, UsagePair::keyboard(keyboard::C), &mut queue, ts());

        dispatcher.dispatch_key_up_events_by_device_id(D1, &mut queue, ts());
        assert_eq!(dispatcher.pressed_keys(), &[(D2, B)]);
        assert_eq!(key_slots(&queue).last(), Some(&vec![keyboard::B.0]));
    }

    #[test]
    fn test_modifier_transitions() {
        let mut dispatcher = KeyEventDispatcher::new();
        let mut queue = OutputEventQueue::new();
        let mut flags = BitFlags::<ModifierFlag>::empty();

        flags.insert(ModifierFlag::LeftShift);
        dispatcher.dispatch_modifier_key_event(&flags, &mut queue, ts());
        dispatcher.dispatch_modifier_key_event(&flags, &mut queue, ts());
        assert_eq!(queue.len(), 1);
        assert!(dispatcher.pressed_modifier_flags().contains(ModifierFlag::LeftShift));

        flags.remove(ModifierFlag::LeftShift);
        dispatcher.dispatch_modifier_key_event(&flags, &mut queue, ts());
        assert_eq!(queue.len(), 2);
        assert!(dispatcher.pressed_modifier_flags().is_empty());
    }

    #[test]
    fn test_caps_lock_pulse_first() {
        let mut dispatcher = KeyEventDispatcher::new();
        let mut queue = OutputEventQueue::new();

        let mut manager = ModifierFlagManager::new();
        manager.push_back_active_modifier_flag(ActiveModifierFlag::IncreaseLock(
            ModifierFlag::CapsLock,
            D1,
        ));
        manager.push_back_active_modifier_flag(ActiveModifierFlag::Increase(
            ModifierFlag::LeftControl,
            D1,
        ));

        dispatcher.dispatch_modifier_key_event(&manager, &mut queue, ts());

        // caps down, caps up, then control
        let slots = key_slots(&queue);
        assert_eq!(slots[0], vec![CAPS.usage.0]);
        assert!(slots[1].is_empty());
        match &queue.events()[2].payload {
            OutputPayload::Report(Report::Keyboard(input)) => {
                assert!(input.modifiers.contains(crate::hid::HidModifier::LeftControl))
            }
            other => panic!("unexpected payload {:?}", other),
        }
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_caps_lock_release_pulse() {
        let mut dispatcher = KeyEventDispatcher::new();
        let mut queue = OutputEventQueue::new();
        dispatcher.insert_pressed_modifier_flag(ModifierFlag::CapsLock);

        let released = BitFlags::<ModifierFlag>::empty();
        dispatcher.dispatch_modifier_key_event(&released, &mut queue, ts());
        assert_eq!(key_slots(&queue), vec![vec![CAPS.usage.0], vec![]]);
    }

    #[test]
    fn test_erase_pressed_modifier_flag_skips_release() {
        let mut dispatcher = KeyEventDispatcher::new();
        let mut queue = OutputEventQueue::new();
        dispatcher.insert_pressed_modifier_flag(ModifierFlag::LeftCommand);
        dispatcher.erase_pressed_modifier_flag(ModifierFlag::LeftCommand);

        let released = BitFlags::<ModifierFlag>::empty();
        dispatcher.dispatch_modifier_key_event(&released, &mut queue, ts());
        assert!(queue.is_empty());
    }
}
