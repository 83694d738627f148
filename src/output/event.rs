//! Queued output events

use serde::{Deserialize, Serialize};

use super::report::{InjectedPointingInput, Report};
use crate::hid::{AbsoluteTime, EventType, UsagePair};

/// Input source selection criteria; each set field is a pattern
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputSourceSpecifier {
    /// Language pattern (e.g. `^en$`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Input source id pattern
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_source_id: Option<String>,
    /// Input mode id pattern
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_mode_id: Option<String>,
}

/// Host-side functions the console user client performs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoftwareFunction {
    /// Synthesize a double click
    DoubleClick {
        /// Button number
        button: u8,
    },
    /// Put the system to sleep
    SleepSystem {
        /// Delay before sleeping
        delay_milliseconds: u64,
    },
    /// Launch or focus an application
    OpenApplication {
        /// Application identifier
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bundle_identifier: Option<String>,
        /// Application path
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_path: Option<String>,
    },
    /// Warp the cursor
    SetMouseCursorPosition {
        /// X coordinate
        x: i32,
        /// Y coordinate
        y: i32,
        /// Screen index
        #[serde(default, skip_serializing_if = "Option::is_none")]
        screen: Option<u32>,
    },
}

/// What an output event carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum OutputPayload {
    /// Accumulator snapshot for the virtual device
    Report(Report),
    /// Pointing state for display-server injection
    InjectedPointing(InjectedPointingInput),
    /// Shell command to run in the console user session
    ShellCommand(String),
    /// Opaque command forwarded to the user's command receiver
    SendUserCommand(serde_json::Value),
    /// Input source to select
    SelectInputSource(Vec<InputSourceSpecifier>),
    /// Host software function
    SoftwareFunction(SoftwareFunction),
}

impl OutputPayload {
    /// Short name for logs and error context
    pub fn kind(&self) -> &'static str {
        match self {
            OutputPayload::Report(report) => report.kind(),
            OutputPayload::InjectedPointing(_) => "injected_pointing",
            OutputPayload::ShellCommand(_) => "shell_command",
            OutputPayload::SendUserCommand(_) => "send_user_command",
            OutputPayload::SelectInputSource(_) => "select_input_source",
            OutputPayload::SoftwareFunction(_) => "software_function",
        }
    }

    /// Whether this is a side-channel action outside the key/pointer stream
    pub fn is_side_channel(&self) -> bool {
        matches!(
            self,
            OutputPayload::ShellCommand(_)
                | OutputPayload::SendUserCommand(_)
                | OutputPayload::SelectInputSource(_)
                | OutputPayload::SoftwareFunction(_)
        )
    }
}

/// A payload scheduled for delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputEvent {
    /// Delivery time
    pub time_stamp: AbsoluteTime,
    /// Payload
    pub payload: OutputPayload,
}

impl OutputEvent {
    /// Create an output event
    pub fn new(time_stamp: AbsoluteTime, payload: OutputPayload) -> Self {
        Self { time_stamp, payload }
    }
}

/// A key transition observed in posted reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualKeyEvent {
    /// Key
    pub usage_pair: UsagePair,
    /// `KeyDown` or `KeyUp`
    pub event_type: EventType,
}
