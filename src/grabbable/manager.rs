//! Thread-safe fan-out across devices

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::entry::GrabbableStateEntry;
use super::queue::{GrabbableStateQueue, DEFAULT_HISTORY_LIMIT};
use super::state::GrabbableState;
use super::GrabbableStateEvent;
use crate::event_queue::EventQueue;
use crate::hid::{AbsoluteTime, DeviceId};

/// Derivation state and history of one device
#[derive(Debug)]
struct DeviceSlot {
    entry: GrabbableStateEntry,
    queue: GrabbableStateQueue,
}

/// Grabbable state for every connected device
///
/// All mutation happens under one lock. Notifications are queued on an
/// unbounded channel while the lock is held, so their order matches the
/// order of the mutations, and they are consumed on a single task (see
/// [`spawn_notification_task`]).
#[derive(Debug)]
pub struct GrabbableStateQueuesManager {
    slots: Mutex<HashMap<DeviceId, DeviceSlot>>,
    notifier: mpsc::UnboundedSender<GrabbableStateEvent>,
    history_limit: usize,
}

impl GrabbableStateQueuesManager {
    /// Create a manager with the default history limit
    pub fn new() -> (Self, mpsc::UnboundedReceiver<GrabbableStateEvent>) {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// Create a manager keeping `history_limit` states per device
    pub fn with_history_limit(
        history_limit: usize,
    ) -> (Self, mpsc::UnboundedReceiver<GrabbableStateEvent>) {
        let (notifier, receiver) = mpsc::unbounded_channel();
        let manager = Self {
            slots: Mutex::new(HashMap::new()),
            notifier,
            history_limit,
        };
        (manager, receiver)
    }

    fn new_slot(&self, device_id: DeviceId) -> DeviceSlot {
        DeviceSlot {
            entry: GrabbableStateEntry::new(device_id),
            queue: GrabbableStateQueue::new(device_id, self.history_limit, self.notifier.clone()),
        }
    }

    fn with_slot<R>(&self, device_id: DeviceId, f: impl FnOnce(&mut DeviceSlot) -> R) -> R {
        let mut slots = self.slots.lock();
        let slot = slots
            .entry(device_id)
            .or_insert_with(|| self.new_slot(device_id));
        f(slot)
    }

    /// Derive and record a state for every event in `event_queue`
    pub fn update(&self, event_queue: &EventQueue) {
        let mut slots = self.slots.lock();
        for event in event_queue.events() {
            let device_id = event.device_id();
            let slot = slots
                .entry(device_id)
                .or_insert_with(|| self.new_slot(device_id));
            let state = slot.entry.update(event);
            slot.queue.push_back_grabbable_state(state);
        }
    }

    /// Record an externally decided state
    pub fn update_grabbable_state(&self, state: GrabbableState) -> bool {
        self.with_slot(state.device_id(), |slot| slot.queue.push_back_grabbable_state(state))
    }

    /// Gate every device in `event_queue` at its first event
    ///
    /// Returns true if at least one device's gate was recorded.
    pub fn update_first_grabbed_event_time_stamp(&self, event_queue: &EventQueue) -> bool {
        let mut firsts: Vec<(DeviceId, AbsoluteTime)> = Vec::new();
        for event in event_queue.events() {
            match firsts.iter_mut().find(|(d, _)| *d == event.device_id()) {
                Some((_, ts)) => *ts = (*ts).min(event.time_stamp()),
                None => firsts.push((event.device_id(), event.time_stamp())),
            }
        }

        let mut result = false;
        for (device_id, time_stamp) in firsts {
            if self.set_first_grabbed_event_time_stamp(device_id, time_stamp) {
                result = true;
            }
        }
        result
    }

    /// Gate one device at `time_stamp`
    pub fn set_first_grabbed_event_time_stamp(
        &self,
        device_id: DeviceId,
        time_stamp: AbsoluteTime,
    ) -> bool {
        self.with_slot(device_id, |slot| {
            slot.queue.update_first_grabbed_event_time_stamp(time_stamp)
        })
    }

    /// Reopen a device's gate
    pub fn unset_first_grabbed_event_time_stamp(&self, device_id: DeviceId) {
        if let Some(slot) = self.slots.lock().get_mut(&device_id) {
            slot.queue.unset_first_grabbed_event_time_stamp();
        }
    }

    /// Most recent state of a device
    pub fn find_current_grabbable_state(&self, device_id: DeviceId) -> Option<GrabbableState> {
        self.slots
            .lock()
            .get(&device_id)
            .and_then(|slot| slot.queue.find_current_grabbable_state())
    }

    /// Forget a device
    pub fn erase(&self, device_id: DeviceId) {
        if let Some(mut slot) = self.slots.lock().remove(&device_id) {
            debug!("Erasing grabbable state for {}", device_id);
            slot.queue.clear();
        }
    }

    /// Forget every device
    pub fn clear(&self) {
        let mut slots = self.slots.lock();
        for slot in slots.values_mut() {
            slot.queue.clear();
        }
        slots.clear();
    }

    /// Number of tracked devices
    pub fn device_count(&self) -> usize {
        self.slots.lock().len()
    }
}

/// Consume notifications on one task, in order
///
/// The task ends when every sender (the manager and its queues) is dropped.
pub fn spawn_notification_task<F>(
    mut receiver: mpsc::UnboundedReceiver<GrabbableStateEvent>,
    mut handler: F,
) -> JoinHandle<()>
where
    F: FnMut(GrabbableStateEvent) + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            handler(event);
        }
        debug!("Grabbable state notification task finished");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_queue::{Event, InputEvent};
    use crate::grabbable::{State, UngrabbableReason};
    use crate::hid::usages::keyboard;
    use crate::hid::{EventType, UsagePair};
    use std::sync::Arc;

    const D1: DeviceId = DeviceId(1);
    const D2: DeviceId = DeviceId(2);

    fn key_event(
        device_id: DeviceId,
        usage: crate::hid::Usage,
        event_type: EventType,
        ts: u64,
    ) -> InputEvent {
        InputEvent::new(
            device_id,
            AbsoluteTime::from_nanos(ts),
            Event::KeyCode(UsagePair::keyboard(usage)),
            event_type,
        )
    }

    fn changes(rx: &mut mpsc::UnboundedReceiver<GrabbableStateEvent>) -> Vec<GrabbableStateEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if matches!(event, GrabbableStateEvent::Changed { .. }) {
                events.push(event);
            }
        }
        events
    }

    #[test]
    fn test_update_from_event_queue() {
        let (manager, mut rx) = GrabbableStateQueuesManager::new();
        assert!(manager.find_current_grabbable_state(D1).is_none());

        let mut queue = EventQueue::new();
        queue.emplace_back_event(key_event(D1, keyboard::A, EventType::KeyUp, 1000));
        queue.emplace_back_event(key_event(D2, keyboard::A, EventType::KeyUp, 1010));
        manager.update(&queue);

        assert_eq!(
            manager.find_current_grabbable_state(D1),
            Some(GrabbableState::grabbable(D1, AbsoluteTime::from_nanos(1000)))
        );
        assert_eq!(
            manager.find_current_grabbable_state(D2),
            Some(GrabbableState::grabbable(D2, AbsoluteTime::from_nanos(1010)))
        );

        queue.clear();
        queue.emplace_back_event(key_event(D1, keyboard::A, EventType::KeyDown, 2000));
        manager.update(&queue);

        let state = manager.find_current_grabbable_state(D1).unwrap();
        assert_eq!(state.state(), State::UngrabbableTemporarily);
        assert_eq!(state.reason(), UngrabbableReason::KeyRepeating);
        assert_eq!(
            manager.find_current_grabbable_state(D2).map(|s| s.time_stamp()),
            Some(AbsoluteTime::from_nanos(1010))
        );

        assert_eq!(changes(&mut rx).len(), 3);
    }

    #[test]
    fn test_first_grabbed_from_event_queue() {
        let (manager, mut rx) = GrabbableStateQueuesManager::new();

        for ts in (1000..10000).step_by(1000) {
            assert!(manager.update_grabbable_state(GrabbableState::grabbable(
                D1,
                AbsoluteTime::from_nanos(ts)
            )));
        }
        assert_eq!(changes(&mut rx).len(), 1);

        let mut queue = EventQueue::new();
        queue.emplace_back_event(key_event(D1, keyboard::A, EventType::KeyDown, 5000));
        assert!(manager.update_first_grabbed_event_time_stamp(&queue));
        assert_eq!(
            manager.find_current_grabbable_state(D1).map(|s| s.time_stamp()),
            Some(AbsoluteTime::from_nanos(4000))
        );
        assert!(manager.find_current_grabbable_state(D2).is_none());

        assert!(!manager.update_grabbable_state(GrabbableState::grabbable(
            D1,
            AbsoluteTime::from_nanos(6000)
        )));

        queue.clear();
        queue.emplace_back_event(key_event(D1, keyboard::A, EventType::KeyDown, 4000));
        assert!(!manager.update_first_grabbed_event_time_stamp(&queue));
        assert_eq!(
            manager.find_current_grabbable_state(D1).map(|s| s.time_stamp()),
            Some(AbsoluteTime::from_nanos(4000))
        );
        assert!(changes(&mut rx).is_empty());
    }

    #[test]
    fn test_erase_and_clear() {
        let (manager, mut rx) = GrabbableStateQueuesManager::new();
        manager.update_grabbable_state(GrabbableState::grabbable(D1, AbsoluteTime::from_nanos(1)));
        manager.update_grabbable_state(GrabbableState::grabbable(D2, AbsoluteTime::from_nanos(1)));
        changes(&mut rx);

        manager.erase(D1);
        assert!(manager.find_current_grabbable_state(D1).is_none());
        assert_eq!(
            changes(&mut rx),
            vec![GrabbableStateEvent::Changed {
                device_id: D1,
                state: None,
            }]
        );

        manager.clear();
        assert_eq!(manager.device_count(), 0);
        assert_eq!(changes(&mut rx).len(), 1);

        // Unknown devices are a no-op
        manager.erase(D1);
        manager.unset_first_grabbed_event_time_stamp(D1);
        assert!(changes(&mut rx).is_empty());
    }

    #[test]
    fn test_concurrent_updates() {
        let (manager, _rx) = GrabbableStateQueuesManager::new();
        let manager = Arc::new(manager);

        let handles: Vec<_> = (0..4u64)
            .map(|d| {
                let manager = Arc::clone(&manager);
                std::thread::spawn(move || {
                    for ts in 0..100u64 {
                        manager.update_grabbable_state(GrabbableState::grabbable(
                            DeviceId(d),
                            AbsoluteTime::from_nanos(ts),
                        ));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(manager.device_count(), 4);
        for d in 0..4u64 {
            assert_eq!(
                manager.find_current_grabbable_state(DeviceId(d)).map(|s| s.time_stamp()),
                Some(AbsoluteTime::from_nanos(99))
            );
        }
    }

    #[tokio::test]
    async fn test_notification_task_order() {
        let (manager, rx) = GrabbableStateQueuesManager::new();
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        let task = spawn_notification_task(rx, move |event| {
            let _ = seen_tx.send(event);
        });

        manager.update_grabbable_state(GrabbableState::grabbable(D1, AbsoluteTime::from_nanos(1)));
        manager.set_first_grabbed_event_time_stamp(D1, AbsoluteTime::from_nanos(5));
        drop(manager);
        task.await.unwrap();

        let first = seen_rx.recv().await.unwrap();
        assert!(matches!(first, GrabbableStateEvent::Changed { device_id: D1, .. }));
        let second = seen_rx.recv().await.unwrap();
        assert_eq!(
            second,
            GrabbableStateEvent::FirstGrabbedEventRecorded {
                device_id: D1,
                time_stamp: AbsoluteTime::from_nanos(5),
            }
        );
    }
}
