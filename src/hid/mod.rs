//! HID Primitives
//!
//! Identifiers, timestamps and usage codes shared by every stage of the
//! pipeline.
//!
//! # Time
//!
//! [`AbsoluteTime`] is a monotonic nanosecond counter. Device timestamps,
//! queue pacing and the drain loop all compare values in this unit, so the
//! clock that feeds the drain must use the same origin as the input source
//! (see [`crate::clock`]).

use std::fmt;
use std::ops::{Add, AddAssign, Sub};
use std::time::Duration;

use serde::{Deserialize, Serialize};

mod modifier;
#[allow(missing_docs)]
pub mod usages;

pub use modifier::{make_hid_report_modifier, make_modifier_flag, HidModifier, ModifierFlag};

/// Opaque identifier of an input device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u64);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device:{}", self.0)
    }
}

/// Monotonic timestamp in nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbsoluteTime(u64);

impl AbsoluteTime {
    /// The zero point of the clock
    pub const ZERO: Self = Self(0);

    /// Create a timestamp from raw nanoseconds
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Create a timestamp from milliseconds
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    /// Raw nanoseconds
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Time elapsed from `earlier` to `self`, or zero if `earlier` is later
    pub fn saturating_duration_since(self, earlier: AbsoluteTime) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

impl From<u64> for AbsoluteTime {
    fn from(nanos: u64) -> Self {
        Self(nanos)
    }
}

impl Add<Duration> for AbsoluteTime {
    type Output = AbsoluteTime;

    fn add(self, rhs: Duration) -> AbsoluteTime {
        let nanos = u64::try_from(rhs.as_nanos()).unwrap_or(u64::MAX);
        AbsoluteTime(self.0.saturating_add(nanos))
    }
}

impl AddAssign<Duration> for AbsoluteTime {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl Sub<AbsoluteTime> for AbsoluteTime {
    type Output = Duration;

    fn sub(self, rhs: AbsoluteTime) -> Duration {
        self.saturating_duration_since(rhs)
    }
}

impl fmt::Display for AbsoluteTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

/// HID usage page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsagePage(pub u16);

/// HID usage within a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Usage(pub u16);

/// A usage qualified by its page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UsagePair {
    /// Usage page
    pub usage_page: UsagePage,
    /// Usage within the page
    pub usage: Usage,
}

impl UsagePair {
    /// Create a new usage pair
    pub const fn new(usage_page: UsagePage, usage: Usage) -> Self {
        Self { usage_page, usage }
    }

    /// Shorthand for a keyboard/keypad page usage
    pub const fn keyboard(usage: Usage) -> Self {
        Self::new(usages::page::KEYBOARD_OR_KEYPAD, usage)
    }

    /// Shorthand for a consumer page usage
    pub const fn consumer(usage: Usage) -> Self {
        Self::new(usages::page::CONSUMER, usage)
    }

    /// Whether this pair names a modifier key (including caps lock and fn)
    pub fn is_modifier(&self) -> bool {
        make_modifier_flag(*self).is_some()
    }
}

impl fmt::Display for UsagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}/{:#06x}", self.usage_page.0, self.usage.0)
    }
}

/// Direction of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Control pressed
    KeyDown,
    /// Control released
    KeyUp,
    /// Value change without press semantics (axis motion, LED state)
    Single,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_time_arithmetic() {
        let t = AbsoluteTime::from_millis(5);
        assert_eq!(t.as_nanos(), 5_000_000);
        assert_eq!(t + Duration::from_millis(1), AbsoluteTime::from_millis(6));
        assert_eq!(AbsoluteTime::from_millis(8) - t, Duration::from_millis(3));
        // Subtraction saturates instead of underflowing
        assert_eq!(t - AbsoluteTime::from_millis(8), Duration::ZERO);
    }

    #[test]
    fn test_absolute_time_add_saturates() {
        let t = AbsoluteTime::from_nanos(u64::MAX - 1);
        assert_eq!((t + Duration::from_secs(1)).as_nanos(), u64::MAX);
    }

    #[test]
    fn test_usage_pair_is_modifier() {
        assert!(UsagePair::keyboard(usages::keyboard::LEFT_SHIFT).is_modifier());
        assert!(UsagePair::keyboard(usages::keyboard::CAPS_LOCK).is_modifier());
        assert!(!UsagePair::keyboard(usages::keyboard::A).is_modifier());
        assert!(UsagePair::new(
            usages::page::APPLE_VENDOR_TOP_CASE,
            usages::apple_vendor_top_case::KEYBOARD_FN
        )
        .is_modifier());
    }

    #[test]
    fn test_event_type_serde() {
        let json = serde_json::to_string(&EventType::KeyDown).unwrap();
        assert_eq!(json, "\"key_down\"");
        let back: EventType = serde_json::from_str("\"single\"").unwrap();
        assert_eq!(back, EventType::Single);
    }
}
