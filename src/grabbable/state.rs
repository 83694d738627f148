//! Grabbable state values

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hid::{AbsoluteTime, DeviceId};

/// Whether a device may be exclusively captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Nothing held; capture is safe
    Grabbable,
    /// Something is held; capture must wait
    UngrabbableTemporarily,
    /// Capture is never allowed (decided outside the pipeline)
    UngrabbablePermanently,
}

/// Why a device is temporarily ungrabbable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UngrabbableReason {
    /// No obstruction
    None,
    /// A non-modifier key is auto-repeating
    KeyRepeating,
    /// A modifier key is held
    ModifierKeyPressed,
    /// A pointing button is held
    PointingButtonPressed,
}

/// A device's capture eligibility at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrabbableState {
    device_id: DeviceId,
    state: State,
    reason: UngrabbableReason,
    time_stamp: AbsoluteTime,
}

impl GrabbableState {
    /// Create a state value
    pub fn new(
        device_id: DeviceId,
        state: State,
        reason: UngrabbableReason,
        time_stamp: AbsoluteTime,
    ) -> Self {
        Self {
            device_id,
            state,
            reason,
            time_stamp,
        }
    }

    /// Shorthand for a grabbable state
    pub fn grabbable(device_id: DeviceId, time_stamp: AbsoluteTime) -> Self {
        Self::new(device_id, State::Grabbable, UngrabbableReason::None, time_stamp)
    }

    /// Device this state belongs to
    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// Eligibility
    pub fn state(&self) -> State {
        self.state
    }

    /// Reason for temporary ineligibility
    pub fn reason(&self) -> UngrabbableReason {
        self.reason
    }

    /// When the state was observed
    pub fn time_stamp(&self) -> AbsoluteTime {
        self.time_stamp
    }

    /// Equality used for change detection
    pub fn equals_except_time_stamp(&self, other: &GrabbableState) -> bool {
        self.device_id == other.device_id
            && self.state == other.state
            && self.reason == other.reason
    }
}

impl fmt::Display for GrabbableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?}/{:?} @ {}",
            self.device_id, self.state, self.reason, self.time_stamp
        )
    }
}

/// Change-detection equality over optional states
pub(crate) fn changed(old: Option<&GrabbableState>, new: Option<&GrabbableState>) -> bool {
    match (old, new) {
        (None, None) => false,
        (Some(a), Some(b)) => !a.equals_except_time_stamp(b),
        _ => true,
    }
}
