//! Output Pipeline
//!
//! Turns decided key, modifier and pointer actions into paced report
//! snapshots for a virtual HID device, or into display-server injection
//! events when the virtual device is not used.
//!
//! # Architecture
//!
//! ```text
//! rule engine ──> KeyEventDispatcher ──> OutputEventQueue ──> OutputSink
//!                 (dedupe downs/ups)     (accumulate, pace)   (post_report,
//!                                              │               post_injected_event,
//!                                              │               side channels)
//!                                              └─> VirtualKeyEvent observer
//! ```
//!
//! # Pacing
//!
//! Key-downs, and key-ups that do not directly follow another key-up, are
//! spaced at least `min_event_interval` (5 ms by default) after the
//! previous event. Some consumers reorder modifier and key events that
//! arrive together, so a modifier press followed at once by a key can be
//! seen as the key first. Side-channel actions are never paced.

mod context;
mod dispatcher;
mod event;
mod injection;
mod queue;
mod report;
mod sink;

pub use context::{OutputContext, OutputState};
pub use dispatcher::KeyEventDispatcher;
pub use event::{
    InputSourceSpecifier, OutputEvent, OutputPayload, SoftwareFunction, VirtualKeyEvent,
};
pub use injection::{
    InjectedEvent, MotionKind, MouseButton, PointerInjector, PointerLocation,
    DEFAULT_DOUBLE_CLICK_DISTANCE, DEFAULT_DOUBLE_CLICK_INTERVAL, MAX_CLICK_STATE,
};
pub use queue::{
    OutputEventQueue, OutputSettings, PostBackend, DEFAULT_MAX_DRAIN_WAIT,
    DEFAULT_MIN_EVENT_INTERVAL,
};
pub use report::{
    AppleVendorKeyboardInput, AppleVendorTopCaseInput, Buttons, ConsumerInput, GenericDesktopInput,
    InjectedPointingInput, KeyboardInput, Keys, PointingInput, Report, KEY_SLOTS,
};
pub use sink::OutputSink;
