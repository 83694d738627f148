//! Output Delivery Error Types
//!
//! Errors raised by the downstream delivery collaborator. The pipeline never
//! retries a failed delivery itself: the drain loop classifies the error,
//! logs the advised recovery action and moves on to the next event. Acting
//! on the advice (for example re-grabbing a device) is up to the
//! supervisory layer.

use thiserror::Error;

use crate::hid::AbsoluteTime;

/// Result type for delivery operations
pub type Result<T> = std::result::Result<T, OutputError>;

/// Delivery error types
#[derive(Error, Debug)]
pub enum OutputError {
    /// The virtual HID device is not connected or not ready
    #[error("Virtual HID device unavailable: {0}")]
    VirtualDeviceUnavailable(String),

    /// The display server rejected an injected event
    #[error("Event injection failed: {0}")]
    InjectionFailed(String),

    /// No console user session is available for side-channel actions
    #[error("Console user client unavailable: {0}")]
    ConsoleClientUnavailable(String),

    /// The serialized output context has shut down
    #[error("Output channel closed")]
    ChannelClosed,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error classification for recovery strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Virtual device backend
    VirtualDevice,
    /// Display server injection backend
    Injection,
    /// Shell command, input source, software function, user command
    SideChannel,
    /// Output context plumbing
    Channel,
    /// IO errors
    Io,
}

/// Classify error for recovery strategy selection
pub fn classify_error(error: &OutputError) -> ErrorType {
    match error {
        OutputError::VirtualDeviceUnavailable(_) => ErrorType::VirtualDevice,
        OutputError::InjectionFailed(_) => ErrorType::Injection,
        OutputError::ConsoleClientUnavailable(_) => ErrorType::SideChannel,
        OutputError::ChannelClosed => ErrorType::Channel,
        OutputError::Io(_) => ErrorType::Io,
    }
}

/// What was being delivered when an error occurred
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Payload kind (`keyboard`, `pointing`, `shell_command`, ...)
    pub payload: Option<&'static str>,

    /// Delivery timestamp of the failed event
    pub time_stamp: Option<AbsoluteTime>,

    /// Additional context information
    pub details: String,
}

impl ErrorContext {
    /// Create new error context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set payload kind
    pub fn with_payload(mut self, payload: &'static str) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Set timestamp
    pub fn with_time_stamp(mut self, time_stamp: AbsoluteTime) -> Self {
        self.time_stamp = Some(time_stamp);
        self
    }

    /// Set details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }
}

/// Recovery action advised after a delivery error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Drop this event and continue draining
    Skip,

    /// Drop this event; the supervisor should release and re-grab devices
    /// once the virtual device is back
    RequestRegrab,

    /// The output context cannot continue
    Fail,
}

/// Determine recovery action for error
pub fn recovery_action(error: &OutputError, context: &ErrorContext) -> RecoveryAction {
    match classify_error(error) {
        ErrorType::VirtualDevice => match context.payload {
            // Side-channel payloads never touch the virtual device
            Some(
                "shell_command" | "select_input_source" | "software_function"
                | "send_user_command",
            ) => RecoveryAction::Skip,
            _ => RecoveryAction::RequestRegrab,
        },
        ErrorType::Injection | ErrorType::SideChannel | ErrorType::Io => RecoveryAction::Skip,
        ErrorType::Channel => RecoveryAction::Fail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let error = OutputError::VirtualDeviceUnavailable("not ready".to_string());
        assert_eq!(classify_error(&error), ErrorType::VirtualDevice);

        let error = OutputError::InjectionFailed("denied".to_string());
        assert_eq!(classify_error(&error), ErrorType::Injection);

        let error = OutputError::ConsoleClientUnavailable("no session".to_string());
        assert_eq!(classify_error(&error), ErrorType::SideChannel);

        assert_eq!(classify_error(&OutputError::ChannelClosed), ErrorType::Channel);

        let error = OutputError::from(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe"));
        assert_eq!(classify_error(&error), ErrorType::Io);
    }

    #[test]
    fn test_error_context() {
        let ctx = ErrorContext::new()
            .with_payload("keyboard")
            .with_time_stamp(AbsoluteTime::from_nanos(42))
            .with_details("test error");

        assert_eq!(ctx.payload, Some("keyboard"));
        assert_eq!(ctx.time_stamp, Some(AbsoluteTime::from_nanos(42)));
        assert_eq!(ctx.details, "test error");
    }

    #[test]
    fn test_recovery_actions() {
        let error = OutputError::VirtualDeviceUnavailable("gone".to_string());
        assert_eq!(
            recovery_action(&error, &ErrorContext::new().with_payload("keyboard")),
            RecoveryAction::RequestRegrab
        );
        assert_eq!(
            recovery_action(&error, &ErrorContext::new().with_payload("shell_command")),
            RecoveryAction::Skip
        );

        let error = OutputError::InjectionFailed("denied".to_string());
        assert_eq!(recovery_action(&error, &ErrorContext::new()), RecoveryAction::Skip);

        assert_eq!(
            recovery_action(&OutputError::ChannelClosed, &ErrorContext::new()),
            RecoveryAction::Fail
        );
    }

    #[test]
    fn test_error_display() {
        let error = OutputError::InjectionFailed("denied".to_string());
        assert_eq!(error.to_string(), "Event injection failed: denied");
    }
}
