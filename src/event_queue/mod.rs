//! Input Event Queue
//!
//! Normalizes raw HID values into typed [`InputEvent`]s and keeps them in a
//! delivery order that compensates for modifier/key ordering anomalies.
//!
//! # Data Flow
//!
//! ```text
//! (time_stamp, device, usage_page, usage, value)
//!        │
//!        ▼
//!   ┌─────────┐   classify    ┌──────────────┐   re-sort   ┌────────────┐
//!   │  push   │ ────────────> │  InputEvent  │ ──────────> │ EventQueue │
//!   └─────────┘               └──────────────┘             └────────────┘
//!                                    │
//!                                    ▼
//!                  ModifierFlagManager / PointingButtonManager
//! ```

mod event;
mod queue;
mod state;

pub use event::{Event, InputEvent};
pub use queue::{needs_swap, EventQueue};
pub use state::{ActiveModifierFlag, ModifierFlagManager, ModifierFlagState, PointingButtonManager};
