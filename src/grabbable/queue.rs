//! Per-device grabbable state history with a capture gate

use std::collections::VecDeque;

use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::state::{changed, GrabbableState};
use super::GrabbableStateEvent;
use crate::hid::{AbsoluteTime, DeviceId};

/// Default number of states kept per device
pub const DEFAULT_HISTORY_LIMIT: usize = 32;

/// Bounded history of one device's states
///
/// Once the first grabbed event's timestamp is recorded, no state at or
/// after it stays in or enters the history: those states describe input the
/// capture already owns.
#[derive(Debug)]
pub struct GrabbableStateQueue {
    device_id: DeviceId,
    history: VecDeque<GrabbableState>,
    history_limit: usize,
    first_grabbed_event_time_stamp: Option<AbsoluteTime>,
    notifier: mpsc::UnboundedSender<GrabbableStateEvent>,
}

impl GrabbableStateQueue {
    /// Create an empty queue that reports changes on `notifier`
    pub fn new(
        device_id: DeviceId,
        history_limit: usize,
        notifier: mpsc::UnboundedSender<GrabbableStateEvent>,
    ) -> Self {
        Self {
            device_id,
            history: VecDeque::with_capacity(history_limit),
            history_limit: history_limit.max(1),
            first_grabbed_event_time_stamp: None,
            notifier,
        }
    }

    /// Device this queue tracks
    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// Most recent buffered state
    pub fn find_current_grabbable_state(&self) -> Option<GrabbableState> {
        self.history.back().copied()
    }

    /// Recorded capture gate
    pub fn first_grabbed_event_time_stamp(&self) -> Option<AbsoluteTime> {
        self.first_grabbed_event_time_stamp
    }

    /// Number of buffered states
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether the history is empty
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Append a state. Rejected if the gate is set and the state is at or
    /// after it.
    pub fn push_back_grabbable_state(&mut self, state: GrabbableState) -> bool {
        if let Some(gate) = self.first_grabbed_event_time_stamp {
            if state.time_stamp() >= gate {
                trace!(
                    "Ignoring grabbable state for {} at {} (captured since {})",
                    self.device_id,
                    state.time_stamp(),
                    gate
                );
                return false;
            }
        }

        let old = self.find_current_grabbable_state();

        self.history.push_back(state);
        while self.history.len() > self.history_limit {
            if let Some(evicted) = self.history.pop_front() {
                trace!("Evicted grabbable state {}", evicted);
            }
        }

        if changed(old.as_ref(), Some(&state)) {
            self.notify_changed(Some(state));
        }

        true
    }

    /// Record the first grabbed event's timestamp and purge later states
    ///
    /// Rejected if a gate is already set, or if `time_stamp` precedes the
    /// oldest buffered state (some devices report garbage timestamps right
    /// after connecting).
    pub fn update_first_grabbed_event_time_stamp(&mut self, time_stamp: AbsoluteTime) -> bool {
        if let Some(existing) = self.first_grabbed_event_time_stamp {
            debug!(
                "Capture gate for {} already set at {}, ignoring {}",
                self.device_id, existing, time_stamp
            );
            return false;
        }

        if let Some(front) = self.history.front() {
            if time_stamp < front.time_stamp() {
                debug!(
                    "Capture gate {} for {} precedes buffered history ({})",
                    time_stamp,
                    self.device_id,
                    front.time_stamp()
                );
                return false;
            }
        }

        let old = self.find_current_grabbable_state();

        self.first_grabbed_event_time_stamp = Some(time_stamp);
        self.history.retain(|s| s.time_stamp() < time_stamp);

        self.send(GrabbableStateEvent::FirstGrabbedEventRecorded {
            device_id: self.device_id,
            time_stamp,
        });

        let new = self.find_current_grabbable_state();
        if changed(old.as_ref(), new.as_ref()) {
            self.notify_changed(new);
        }

        true
    }

    /// Reopen the gate (capture released)
    pub fn unset_first_grabbed_event_time_stamp(&mut self) {
        self.first_grabbed_event_time_stamp = None;
    }

    /// Drop history and gate. Notifies `None` if a state was buffered.
    pub fn clear(&mut self) {
        let old = self.find_current_grabbable_state();

        self.history.clear();
        self.first_grabbed_event_time_stamp = None;

        if old.is_some() {
            self.notify_changed(None);
        }
    }

    fn notify_changed(&self, state: Option<GrabbableState>) {
        match &state {
            Some(s) => debug!("Grabbable state changed: {}", s),
            None => debug!("Grabbable state cleared for {}", self.device_id),
        }
        self.send(GrabbableStateEvent::Changed {
            device_id: self.device_id,
            state,
        });
    }

    fn send(&self, event: GrabbableStateEvent) {
        if self.notifier.send(event).is_err() {
            trace!("Grabbable state receiver dropped for {}", self.device_id);
        }
    }
}
