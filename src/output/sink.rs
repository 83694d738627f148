//! Delivery collaborator contract

use super::event::{InputSourceSpecifier, SoftwareFunction};
use super::injection::{InjectedEvent, PointerLocation};
use super::report::Report;
use crate::error::Result;

/// Where due output events are delivered
///
/// Implementations wrap the virtual HID device client, the display
/// server's injection API and the console user session client. Every call
/// is made from the serialized output context, one at a time, in delivery
/// order.
#[cfg_attr(test, mockall::automock)]
pub trait OutputSink: Send {
    /// Post a report to the virtual HID device
    fn post_report(&mut self, report: &Report) -> Result<()>;

    /// Inject one event into the display server
    fn post_injected_event(&mut self, event: &InjectedEvent) -> Result<()>;

    /// Run a shell command in the console user session
    fn execute_shell_command(&mut self, command: &str) -> Result<()>;

    /// Select the first input source matching any specifier
    fn select_input_source(&mut self, specifiers: &[InputSourceSpecifier]) -> Result<()>;

    /// Perform a host software function
    fn execute_software_function(&mut self, function: &SoftwareFunction) -> Result<()>;

    /// Forward an opaque user command
    fn send_user_command(&mut self, command: &serde_json::Value) -> Result<()>;

    /// Current pointer location for injected events, if known
    fn pointer_location(&self) -> Option<PointerLocation> {
        None
    }
}
