//! Output event queue
//!
//! Accumulates decided key and pointer state into one live report per
//! category and appends a full snapshot of that report for every change.
//! Snapshots are delivered in queue order once their timestamp arrives.

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{trace, warn};

use super::event::{
    InputSourceSpecifier, OutputEvent, OutputPayload, SoftwareFunction, VirtualKeyEvent,
};
use super::injection::{
    PointerInjector, DEFAULT_DOUBLE_CLICK_DISTANCE, DEFAULT_DOUBLE_CLICK_INTERVAL,
};
use super::report::{
    AppleVendorKeyboardInput, AppleVendorTopCaseInput, ConsumerInput, GenericDesktopInput,
    InjectedPointingInput, KeyboardInput, Keys, PointingInput, Report,
};
use super::sink::OutputSink;
use crate::error::{recovery_action, ErrorContext, OutputError};
use crate::hid::usages::page;
use crate::hid::{
    make_hid_report_modifier, make_modifier_flag, AbsoluteTime, EventType, HidModifier, Usage,
    UsagePage, UsagePair,
};
use crate::repeat::KeyboardRepeatDetector;

/// Default minimum spacing between paced events
pub const DEFAULT_MIN_EVENT_INTERVAL: Duration = Duration::from_millis(5);

/// Default cap on how long the drain sleeps before re-checking
pub const DEFAULT_MAX_DRAIN_WAIT: Duration = Duration::from_secs(3);

/// Where pointing snapshots go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostBackend {
    /// Reports to the virtual HID device
    #[default]
    VirtualHidDevice,
    /// Events injected into the display server
    DisplayServerInjection,
}

/// Tunables for an output queue
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    /// Pointing backend
    pub post_backend: PostBackend,
    /// Minimum spacing between paced events
    pub min_event_interval: Duration,
    /// Longest single drain sleep
    pub max_drain_wait: Duration,
    /// Double-click window (injection backend)
    pub double_click_interval: Duration,
    /// Double-click distance in pixels (injection backend)
    pub double_click_distance: f64,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            post_backend: PostBackend::default(),
            min_event_interval: DEFAULT_MIN_EVENT_INTERVAL,
            max_drain_wait: DEFAULT_MAX_DRAIN_WAIT,
            double_click_interval: DEFAULT_DOUBLE_CLICK_INTERVAL,
            double_click_distance: DEFAULT_DOUBLE_CLICK_DISTANCE,
        }
    }
}

/// Time-ordered queue of report snapshots and side-channel actions
///
/// Not internally locked. Drive it from one serialized context, normally
/// [`super::OutputContext`].
pub struct OutputEventQueue {
    events: VecDeque<OutputEvent>,
    keyboard_repeat_detector: KeyboardRepeatDetector,

    post_backend: PostBackend,
    min_event_interval: Duration,
    max_drain_wait: Duration,

    /// Type of the last paced event
    last_event_type: Option<EventType>,
    /// Latest timestamp handed out so far
    last_event_time_stamp: Option<AbsoluteTime>,

    keyboard_input: KeyboardInput,
    consumer_input: ConsumerInput,
    apple_vendor_top_case_input: AppleVendorTopCaseInput,
    apple_vendor_keyboard_input: AppleVendorKeyboardInput,
    generic_desktop_input: GenericDesktopInput,

    previous_posted_keyboard_input: KeyboardInput,
    previous_posted_consumer_input: ConsumerInput,
    previous_posted_apple_vendor_top_case_input: AppleVendorTopCaseInput,
    previous_posted_apple_vendor_keyboard_input: AppleVendorKeyboardInput,

    virtual_key_observer: Option<mpsc::UnboundedSender<VirtualKeyEvent>>,
    injector: PointerInjector,
}

impl OutputEventQueue {
    /// Create a queue with default settings
    pub fn new() -> Self {
        Self::with_settings(&OutputSettings::default())
    }

    /// Create a queue with explicit settings
    pub fn with_settings(settings: &OutputSettings) -> Self {
        let mut injector = PointerInjector::new();
        injector.set_double_click_settings(
            settings.double_click_interval.as_millis() as i64,
            settings.double_click_distance as i64,
        );

        Self {
            events: VecDeque::new(),
            keyboard_repeat_detector: KeyboardRepeatDetector::new(),
            post_backend: settings.post_backend,
            min_event_interval: settings.min_event_interval,
            max_drain_wait: settings.max_drain_wait,
            last_event_type: None,
            last_event_time_stamp: None,
            keyboard_input: KeyboardInput::default(),
            consumer_input: ConsumerInput::default(),
            apple_vendor_top_case_input: AppleVendorTopCaseInput::default(),
            apple_vendor_keyboard_input: AppleVendorKeyboardInput::default(),
            generic_desktop_input: GenericDesktopInput::default(),
            previous_posted_keyboard_input: KeyboardInput::default(),
            previous_posted_consumer_input: ConsumerInput::default(),
            previous_posted_apple_vendor_top_case_input: AppleVendorTopCaseInput::default(),
            previous_posted_apple_vendor_keyboard_input: AppleVendorKeyboardInput::default(),
            virtual_key_observer: None,
            injector,
        }
    }

    /// Select the pointing backend
    pub fn set_post_backend(&mut self, backend: PostBackend) {
        self.post_backend = backend;
    }

    /// Current pointing backend
    pub fn post_backend(&self) -> PostBackend {
        self.post_backend
    }

    /// Double-click window for the injection backend (floors: 1 ms, 0 px)
    pub fn set_double_click_settings(&mut self, interval_milliseconds: i64, distance: i64) {
        self.injector.set_double_click_settings(interval_milliseconds, distance);
    }

    /// Receive key transitions observed in posted keyboard-like reports
    pub fn set_virtual_key_observer(&mut self, observer: mpsc::UnboundedSender<VirtualKeyEvent>) {
        self.virtual_key_observer = Some(observer);
    }

    /// Queue a key transition
    ///
    /// Keyboard page modifiers set or clear the modifier byte; every other
    /// supported usage sets or clears a key slot in its page's report. The
    /// whole report is snapshotted. Usages on other pages queue nothing.
    pub fn emplace_back_key_event(
        &mut self,
        usage_pair: UsagePair,
        event_type: EventType,
        time_stamp: AbsoluteTime,
    ) {
        let time_stamp = self.adjust_time_stamp(time_stamp, event_type, usage_pair.is_modifier());
        let usage = usage_pair.usage.0;

        let report = match usage_pair.usage_page {
            page::KEYBOARD_OR_KEYPAD => {
                let modifier = make_modifier_flag(usage_pair).and_then(make_hid_report_modifier);
                let modifiers = &mut self.keyboard_input.modifiers;
                match (modifier, event_type) {
                    (Some(modifier), EventType::KeyDown) => modifiers.insert(modifier),
                    (Some(modifier), EventType::KeyUp) => modifiers.remove(modifier),
                    _ => apply_key(&mut self.keyboard_input.keys, usage, event_type),
                }
                Some(Report::Keyboard(self.keyboard_input))
            }
            page::CONSUMER => {
                apply_key(&mut self.consumer_input.keys, usage, event_type);
                Some(Report::Consumer(self.consumer_input))
            }
            page::APPLE_VENDOR_TOP_CASE => {
                apply_key(&mut self.apple_vendor_top_case_input.keys, usage, event_type);
                Some(Report::AppleVendorTopCase(self.apple_vendor_top_case_input))
            }
            page::APPLE_VENDOR_KEYBOARD => {
                apply_key(&mut self.apple_vendor_keyboard_input.keys, usage, event_type);
                Some(Report::AppleVendorKeyboard(self.apple_vendor_keyboard_input))
            }
            page::GENERIC_DESKTOP => {
                apply_key(&mut self.generic_desktop_input.keys, usage, event_type);
                Some(Report::GenericDesktop(self.generic_desktop_input))
            }
            _ => None,
        };

        match report {
            Some(report) => {
                let payload = OutputPayload::Report(report);
                self.events.push_back(OutputEvent::new(time_stamp, payload));
            }
            None => trace!("No report for {}, nothing queued", usage_pair),
        }

        self.keyboard_repeat_detector
            .set(usage_pair.usage_page, usage_pair.usage, event_type);
    }

    /// Queue a pointing snapshot for the selected backend
    pub fn emplace_back_pointing_input(
        &mut self,
        input: PointingInput,
        event_type: EventType,
        time_stamp: AbsoluteTime,
    ) {
        let time_stamp = self.adjust_time_stamp(time_stamp, event_type, false);
        let payload = match self.post_backend {
            PostBackend::VirtualHidDevice => OutputPayload::Report(Report::Pointing(input)),
            PostBackend::DisplayServerInjection => OutputPayload::InjectedPointing(input.into()),
        };
        self.events.push_back(OutputEvent::new(time_stamp, payload));
    }

    /// Queue a pointing report for the virtual device regardless of backend
    pub fn emplace_back_virtual_hid_pointing_input(
        &mut self,
        input: PointingInput,
        event_type: EventType,
        time_stamp: AbsoluteTime,
    ) {
        let time_stamp = self.adjust_time_stamp(time_stamp, event_type, false);
        let payload = OutputPayload::Report(Report::Pointing(input));
        self.events.push_back(OutputEvent::new(time_stamp, payload));
    }

    /// Queue a pointing snapshot for injection regardless of backend
    pub fn emplace_back_injected_pointing_input(
        &mut self,
        input: InjectedPointingInput,
        event_type: EventType,
        time_stamp: AbsoluteTime,
    ) {
        let time_stamp = self.adjust_time_stamp(time_stamp, event_type, false);
        self.events
            .push_back(OutputEvent::new(time_stamp, OutputPayload::InjectedPointing(input)));
    }

    /// Queue a shell command (not paced)
    pub fn push_back_shell_command_event(
        &mut self,
        command: impl Into<String>,
        time_stamp: AbsoluteTime,
    ) {
        self.events
            .push_back(OutputEvent::new(time_stamp, OutputPayload::ShellCommand(command.into())));
    }

    /// Queue a user command (not paced)
    pub fn push_back_send_user_command_event(
        &mut self,
        command: serde_json::Value,
        time_stamp: AbsoluteTime,
    ) {
        self.events
            .push_back(OutputEvent::new(time_stamp, OutputPayload::SendUserCommand(command)));
    }

    /// Queue an input source selection (not paced)
    pub fn push_back_select_input_source_event(
        &mut self,
        specifiers: Vec<InputSourceSpecifier>,
        time_stamp: AbsoluteTime,
    ) {
        self.events
            .push_back(OutputEvent::new(time_stamp, OutputPayload::SelectInputSource(specifiers)));
    }

    /// Queue a software function (not paced)
    pub fn push_back_software_function_event(
        &mut self,
        function: SoftwareFunction,
        time_stamp: AbsoluteTime,
    ) {
        self.events
            .push_back(OutputEvent::new(time_stamp, OutputPayload::SoftwareFunction(function)));
    }

    /// Pending events, front first
    pub fn events(&self) -> &VecDeque<OutputEvent> {
        &self.events
    }

    /// Number of pending events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Repeat state of the keys queued so far
    pub fn keyboard_repeat_detector(&self) -> &KeyboardRepeatDetector {
        &self.keyboard_repeat_detector
    }

    /// Drop pending events and repeat tracking
    ///
    /// Accumulators and pacing state are kept so later snapshots stay
    /// cumulative.
    pub fn clear(&mut self) {
        self.events.clear();
        self.keyboard_repeat_detector.clear();
    }

    /// Deliver every event due at `now`, in order
    ///
    /// Returns how long to wait before calling again, capped at the
    /// configured maximum, or `None` when the queue is drained. Delivery
    /// failures are logged and the event is dropped.
    pub fn post_ready_events<S: OutputSink + ?Sized>(
        &mut self,
        now: AbsoluteTime,
        sink: &mut S,
    ) -> Option<Duration> {
        while let Some(front) = self.events.front() {
            if front.time_stamp > now {
                let wait = (front.time_stamp - now).min(self.max_drain_wait);
                trace!("Next output event due in {:?}", wait);
                return Some(wait);
            }

            if let Some(event) = self.events.pop_front() {
                self.post_event(event, sink);
            }
        }
        None
    }

    fn post_event<S: OutputSink + ?Sized>(&mut self, event: OutputEvent, sink: &mut S) {
        let result = match &event.payload {
            OutputPayload::Report(report) => {
                let result = sink.post_report(report);
                // Only reports the device accepted count as posted
                if result.is_ok() {
                    self.emit_virtual_key_events(report);
                }
                result
            }
            OutputPayload::InjectedPointing(input) => {
                let location = sink.pointer_location().unwrap_or_default();
                let injected = self.injector.make_events(input, location, event.time_stamp);
                for injected_event in &injected {
                    if let Err(e) = sink.post_injected_event(injected_event) {
                        log_delivery_failure(&event, &e);
                    }
                }
                Ok(())
            }
            OutputPayload::ShellCommand(command) => sink.execute_shell_command(command),
            OutputPayload::SendUserCommand(command) => sink.send_user_command(command),
            OutputPayload::SelectInputSource(specifiers) => sink.select_input_source(specifiers),
            OutputPayload::SoftwareFunction(function) => sink.execute_software_function(function),
        };

        if let Err(e) = result {
            log_delivery_failure(&event, &e);
        }
    }

    /// Clamp `time_stamp` so paced events keep their minimum spacing
    ///
    /// Key-downs are paced, and key-ups too unless they directly follow
    /// another key-up (modifier key-ups are always paced). Single events
    /// are never delayed. The first event after construction is taken as
    /// is. Unpaced events are still kept from running backwards.
    fn adjust_time_stamp(
        &mut self,
        time_stamp: AbsoluteTime,
        event_type: EventType,
        is_modifier_key_event: bool,
    ) -> AbsoluteTime {
        let skip = match event_type {
            EventType::KeyDown => false,
            EventType::KeyUp => {
                self.last_event_type == Some(EventType::KeyUp) && !is_modifier_key_event
            }
            EventType::Single => true,
        };

        let mut adjusted = time_stamp;
        if let Some(last) = self.last_event_time_stamp {
            let earliest = if skip { last } else { last + self.min_event_interval };
            if adjusted < earliest {
                trace!("Output event paced: {} -> {}", time_stamp, earliest);
                adjusted = earliest;
            }
        }

        if !skip {
            self.last_event_type = Some(event_type);
        }
        if self.last_event_time_stamp.map_or(true, |last| last < adjusted) {
            self.last_event_time_stamp = Some(adjusted);
        }

        adjusted
    }

    fn emit_virtual_key_events(&mut self, report: &Report) {
        match report {
            Report::Keyboard(current) => {
                let previous =
                    std::mem::replace(&mut self.previous_posted_keyboard_input, *current);
                for modifier in HidModifier::ALL {
                    let was = previous.modifiers.contains(modifier);
                    let is = current.modifiers.contains(modifier);
                    if was != is {
                        let event_type = if is { EventType::KeyDown } else { EventType::KeyUp };
                        self.notify_virtual_key(modifier.modifier_flag().usage_pair(), event_type);
                    }
                }
                self.emit_key_diff(page::KEYBOARD_OR_KEYPAD, &previous.keys, &current.keys);
            }
            Report::Consumer(current) => {
                let previous =
                    std::mem::replace(&mut self.previous_posted_consumer_input, *current);
                self.emit_key_diff(page::CONSUMER, &previous.keys, &current.keys);
            }
            Report::AppleVendorTopCase(current) => {
                let previous = std::mem::replace(
                    &mut self.previous_posted_apple_vendor_top_case_input,
                    *current,
                );
                self.emit_key_diff(page::APPLE_VENDOR_TOP_CASE, &previous.keys, &current.keys);
            }
            Report::AppleVendorKeyboard(current) => {
                let previous = std::mem::replace(
                    &mut self.previous_posted_apple_vendor_keyboard_input,
                    *current,
                );
                self.emit_key_diff(page::APPLE_VENDOR_KEYBOARD, &previous.keys, &current.keys);
            }
            Report::GenericDesktop(_) | Report::Pointing(_) => {}
        }
    }

    /// Releases first, then presses
    fn emit_key_diff(&self, usage_page: UsagePage, previous: &Keys, current: &Keys) {
        for key in previous.iter().filter(|key| !current.exists(*key)) {
            self.notify_virtual_key(UsagePair::new(usage_page, Usage(key)), EventType::KeyUp);
        }
        for key in current.iter().filter(|key| !previous.exists(*key)) {
            self.notify_virtual_key(UsagePair::new(usage_page, Usage(key)), EventType::KeyDown);
        }
    }

    fn notify_virtual_key(&self, usage_pair: UsagePair, event_type: EventType) {
        if let Some(observer) = &self.virtual_key_observer {
            if observer.send(VirtualKeyEvent { usage_pair, event_type }).is_err() {
                trace!("Virtual key observer gone, dropping {} {:?}", usage_pair, event_type);
            }
        }
    }
}

impl Default for OutputEventQueue {
    fn default() -> Self {
        Self::new()
    }
}

fn log_delivery_failure(event: &OutputEvent, error: &OutputError) {
    let context = ErrorContext::new()
        .with_payload(event.payload.kind())
        .with_time_stamp(event.time_stamp);
    warn!(
        "Failed to deliver {} event at {}: {} (recovery: {:?})",
        event.payload.kind(),
        event.time_stamp,
        error,
        recovery_action(error, &context)
    );
}

fn apply_key(keys: &mut Keys, usage: u16, event_type: EventType) {
    match event_type {
        EventType::KeyDown => keys.insert(usage),
        EventType::KeyUp => keys.erase(usage),
        EventType::Single => {}
    }
}
