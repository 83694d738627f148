//! Recorded input replay
//!
//! Plumbing for the replay binary: raw HID values recorded as JSON lines,
//! an identity remapper standing in for the rule engine, and a sink that
//! prints everything posted as JSON lines.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::event_queue::{ActiveModifierFlag, Event, EventQueue, InputEvent, ModifierFlagManager};
use crate::hid::{AbsoluteTime, DeviceId, EventType, ModifierFlag, Usage, UsagePage};
use crate::output::{
    InjectedEvent, InputSourceSpecifier, OutputEventQueue, OutputSink, OutputState, PointingInput,
    Report, SoftwareFunction,
};

/// One raw HID value as delivered by the input subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawValue {
    /// Monotonic nanoseconds
    pub time_stamp: u64,
    /// Source device
    pub device_id: u64,
    /// Usage page
    pub usage_page: u16,
    /// Usage
    pub usage: u16,
    /// Raw value (non-zero = pressed for buttons and keys)
    pub integer_value: i64,
}

/// Read JSON-lines raw values. Blank lines and `#` comments are skipped.
pub fn read_raw_values<R: BufRead>(reader: R) -> Result<Vec<RawValue>> {
    let mut values = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let value: RawValue =
            serde_json::from_str(line).context(format!("Invalid raw value on line {}", index + 1))?;
        values.push(value);
    }
    Ok(values)
}

/// Push raw values into an event queue; returns how many were recognized
pub fn push_raw_values(event_queue: &mut EventQueue, values: &[RawValue]) -> usize {
    values
        .iter()
        .filter(|v| {
            event_queue.push(
                DeviceId(v.device_id),
                AbsoluteTime::from_nanos(v.time_stamp),
                UsagePage(v.usage_page),
                Usage(v.usage),
                v.integer_value,
            )
        })
        .count()
}

/// Passes every input event through unchanged
///
/// Keys go through the dispatcher's key path, modifiers (except caps lock,
/// which toggles) through its modifier path, and pointer events become
/// pointing snapshots.
#[derive(Debug, Default)]
pub struct IdentityRemapper {
    modifier_flag_manager: ModifierFlagManager,
    pointing_input: PointingInput,
}

impl IdentityRemapper {
    /// Create a remapper with nothing held
    pub fn new() -> Self {
        Self::default()
    }

    /// Remap one input event into the output state
    pub fn remap(&mut self, event: &InputEvent, state: &mut OutputState) {
        let OutputState { queue, dispatcher } = state;
        let time_stamp = event.time_stamp();
        let event_type = event.event_type();

        match *event.event() {
            Event::KeyCode(usage_pair) => match event.event().modifier_flag() {
                Some(flag) if flag != ModifierFlag::CapsLock => {
                    let change = match event_type {
                        EventType::KeyDown => ActiveModifierFlag::Increase(flag, event.device_id()),
                        _ => ActiveModifierFlag::Decrease(flag, event.device_id()),
                    };
                    self.modifier_flag_manager.push_back_active_modifier_flag(change);
                    dispatcher.dispatch_modifier_key_event(
                        &self.modifier_flag_manager,
                        queue,
                        time_stamp,
                    );
                }
                _ => match event_type {
                    EventType::KeyDown => dispatcher.dispatch_key_down_event(
                        event.device_id(),
                        usage_pair,
                        queue,
                        time_stamp,
                    ),
                    EventType::KeyUp => {
                        dispatcher.dispatch_key_up_event(usage_pair, queue, time_stamp)
                    }
                    EventType::Single => {}
                },
            },
            Event::PointingButton(button) => {
                match event_type {
                    EventType::KeyDown => self.pointing_input.buttons.insert(button),
                    _ => self.pointing_input.buttons.erase(button),
                }
                self.emit_pointing(queue, event_type, time_stamp);
            }
            Event::PointingX(value) => {
                self.pointing_input.x = clamp_i8(value);
                self.emit_pointing(queue, event_type, time_stamp);
            }
            Event::PointingY(value) => {
                self.pointing_input.y = clamp_i8(value);
                self.emit_pointing(queue, event_type, time_stamp);
            }
            Event::PointingVerticalWheel(value) => {
                self.pointing_input.vertical_wheel = clamp_i8(value);
                self.emit_pointing(queue, event_type, time_stamp);
            }
            Event::PointingHorizontalWheel(value) => {
                self.pointing_input.horizontal_wheel = clamp_i8(value);
                self.emit_pointing(queue, event_type, time_stamp);
            }
            Event::CapsLockStateChanged(on) => {
                trace!("Caps lock LED {} on {}", if on { "on" } else { "off" }, event.device_id());
            }
        }
    }

    fn emit_pointing(
        &mut self,
        queue: &mut OutputEventQueue,
        event_type: EventType,
        time_stamp: AbsoluteTime,
    ) {
        queue.emplace_back_pointing_input(self.pointing_input, event_type, time_stamp);
        // Motion and wheel are deltas; only buttons persist between snapshots
        self.pointing_input = PointingInput {
            buttons: self.pointing_input.buttons,
            ..PointingInput::default()
        };
    }
}

fn clamp_i8(value: i32) -> i8 {
    value.clamp(i32::from(i8::MIN), i32::from(i8::MAX)) as i8
}

#[derive(Serialize)]
struct PostedRecord<'a, T: Serialize> {
    post: &'static str,
    value: &'a T,
}

/// Prints every delivery as one JSON line
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
    posted: u64,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer, posted: 0 }
    }

    /// Deliveries written so far
    pub fn posted(&self) -> u64 {
        self.posted
    }

    fn write<T: Serialize>(&mut self, post: &'static str, value: &T) -> crate::error::Result<()> {
        serde_json::to_writer(&mut self.writer, &PostedRecord { post, value })
            .map_err(std::io::Error::from)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        self.posted += 1;
        debug!("Posted {} #{}", post, self.posted);
        Ok(())
    }
}

impl<W: Write + Send> OutputSink for JsonLinesSink<W> {
    fn post_report(&mut self, report: &Report) -> crate::error::Result<()> {
        self.write("report", report)
    }

    fn post_injected_event(&mut self, event: &InjectedEvent) -> crate::error::Result<()> {
        self.write("injected_event", event)
    }

    fn execute_shell_command(&mut self, command: &str) -> crate::error::Result<()> {
        self.write("shell_command", &command)
    }

    fn select_input_source(
        &mut self,
        specifiers: &[InputSourceSpecifier],
    ) -> crate::error::Result<()> {
        self.write("select_input_source", &specifiers)
    }

    fn execute_software_function(
        &mut self,
        function: &SoftwareFunction,
    ) -> crate::error::Result<()> {
        self.write("software_function", function)
    }

    fn send_user_command(&mut self, command: &serde_json::Value) -> crate::error::Result<()> {
        self.write("send_user_command", command)
    }
}
