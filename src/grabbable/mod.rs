//! Grabbable State Engine
//!
//! Decides, per physical device, whether exclusive capture is currently
//! safe. Capturing while a key repeats, a modifier is held or a button is
//! down would leave the virtual output out of step with the hardware.
//!
//! # Architecture
//!
//! ```text
//!   EventQueue ──> GrabbableStateQueuesManager (one lock)
//!                   │
//!                   ├─ device 1: GrabbableStateEntry ─> GrabbableStateQueue
//!                   ├─ device 2: GrabbableStateEntry ─> GrabbableStateQueue
//!                   │                                       │
//!                   │                        GrabbableStateEvent (mpsc)
//!                   ▼                                       ▼
//!        find_current_grabbable_state        notification task (serialized)
//! ```
//!
//! # Capture gate
//!
//! Once the capture collaborator records the timestamp of the first event
//! it grabbed, states at or after that timestamp are purged and refused:
//! the capture owns that input now, so only the state just before it is
//! meaningful.

mod entry;
mod manager;
mod queue;
mod state;

pub use entry::GrabbableStateEntry;
pub use manager::{spawn_notification_task, GrabbableStateQueuesManager};
pub use queue::{GrabbableStateQueue, DEFAULT_HISTORY_LIMIT};
pub use state::{GrabbableState, State, UngrabbableReason};

use crate::hid::{AbsoluteTime, DeviceId};

/// Notification emitted by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrabbableStateEvent {
    /// The device's current state changed (ignoring timestamps).
    /// `None` means the device's history was cleared.
    Changed {
        /// Device
        device_id: DeviceId,
        /// New current state
        state: Option<GrabbableState>,
    },
    /// A capture gate was recorded
    FirstGrabbedEventRecorded {
        /// Device
        device_id: DeviceId,
        /// Timestamp of the first grabbed event
        time_stamp: AbsoluteTime,
    },
}

impl GrabbableStateEvent {
    /// Device the notification concerns
    pub fn device_id(&self) -> DeviceId {
        match self {
            GrabbableStateEvent::Changed { device_id, .. }
            | GrabbableStateEvent::FirstGrabbedEventRecorded { device_id, .. } => *device_id,
        }
    }
}
