//! # lamco-hid-pipeline
//!
//! Event-processing core of a keyboard/pointer remapping engine.
//!
//! Raw HID values from physical devices are normalized and reordered,
//! each device's capture eligibility is tracked, and decided output is
//! accumulated into report snapshots that are delivered to a virtual HID
//! device at a safe pace.
//!
//! # Architecture
//!
//! ```text
//! raw HID values
//!   │
//!   ▼
//! EventQueue (classify, reorder modifiers)
//!   │                         │
//!   │                         └─> GrabbableStateQueuesManager ─> grabbable notifications
//!   ▼
//! [rule engine, external]
//!   │
//!   ▼
//! KeyEventDispatcher ─> OutputEventQueue (accumulate, pace) ─> OutputSink
//! ```
//!
//! # Threading
//!
//! [`event_queue::EventQueue`] has a single writer. The grabbable engine
//! may be updated from any thread and reports changes on one channel
//! consumed by one task. The output queue lives inside an
//! [`output::OutputContext`] task and is only touched through it.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Delivery time source
pub mod clock;

/// Configuration
pub mod config;

/// Delivery error taxonomy
pub mod error;

/// Input event queue with modifier reordering
pub mod event_queue;

/// Per-device capture eligibility
pub mod grabbable;

/// HID identifiers, usage tables and modifier flags
pub mod hid;

/// Report accumulation, pacing and delivery
pub mod output;

/// Auto-repeat tracking
pub mod repeat;

/// Recorded input replay
pub mod replay;

pub use error::{OutputError, Result};
