//! Pointer Event Injection
//!
//! Expands pointing snapshots into the discrete button, motion and scroll
//! events a display server's injection API expects. Tracks what genuine
//! hardware would carry along with each click: a multi-click counter (so
//! double and triple clicks are recognized) and a per-button event number
//! (so a down and its up are paired).
//!
//! Click series are timed with event timestamps, not wall-clock time, so
//! replayed or paced input yields the same click states.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::report::{Buttons, InjectedPointingInput};
use crate::hid::usages::MAX_POINTING_BUTTON;
use crate::hid::AbsoluteTime;

/// Highest click state reported (triple click)
pub const MAX_CLICK_STATE: i64 = 3;

/// Default double-click window
pub const DEFAULT_DOUBLE_CLICK_INTERVAL: Duration = Duration::from_millis(500);

/// Default double-click distance in pixels
pub const DEFAULT_DOUBLE_CLICK_DISTANCE: f64 = 4.0;

/// Pointer position in global display coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointerLocation {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl PointerLocation {
    /// Create a location
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Button identity on the injection path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    /// Button 1
    Left,
    /// Button 2
    Right,
    /// Buttons 3..=32, zero-based index
    Other(u8),
}

impl MouseButton {
    /// Map a report button number (1..=32)
    pub fn from_button_number(button: u8) -> Self {
        match button {
            1 => MouseButton::Left,
            2 => MouseButton::Right,
            n => MouseButton::Other(n.saturating_sub(1)),
        }
    }
}

/// Which motion event a pointer move becomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionKind {
    /// No button held
    Moved,
    /// Button 1 held
    LeftDragged,
    /// Button 2 held (button 1 not held)
    RightDragged,
    /// Some other button held
    OtherDragged,
}

impl MotionKind {
    /// Pick the motion kind from the held buttons
    pub fn from_buttons(buttons: Buttons) -> Self {
        if buttons.exists(1) {
            MotionKind::LeftDragged
        } else if buttons.exists(2) {
            MotionKind::RightDragged
        } else if (3..=MAX_POINTING_BUTTON).any(|button| buttons.exists(button)) {
            MotionKind::OtherDragged
        } else {
            MotionKind::Moved
        }
    }
}

/// One event for the display server
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InjectedEvent {
    /// Button transition
    Button {
        /// Report button number (1..=32)
        button: u8,
        /// Injection-path button identity
        mouse_button: MouseButton,
        /// Pressed or released
        down: bool,
        /// Pointer location
        location: PointerLocation,
        /// 1 = single, 2 = double, 3 = triple click
        click_state: i64,
        /// Event number shared by a down and its up
        event_number: i64,
    },
    /// Relative motion
    Motion {
        /// Moved or dragged
        kind: MotionKind,
        /// Pointer location before the motion
        location: PointerLocation,
        /// X delta
        dx: i32,
        /// Y delta
        dy: i32,
    },
    /// Line-based scroll
    Scroll {
        /// Vertical lines
        vertical: i32,
        /// Horizontal lines
        horizontal: i32,
    },
}

#[derive(Debug, Clone, Copy)]
struct LastClick {
    button: u8,
    time_stamp: AbsoluteTime,
    location: PointerLocation,
}

/// Click and event-number bookkeeping for the injection path
#[derive(Debug, Clone)]
pub struct PointerInjector {
    double_click_interval: Duration,
    double_click_distance: f64,

    /// Last snapshot expanded, used to find button transitions
    previous: InjectedPointingInput,

    last_click: Option<LastClick>,
    last_click_state: i64,
    next_event_number: i64,

    /// Indexed by button number; slot 0 unused
    button_event_numbers: [i64; MAX_POINTING_BUTTON as usize + 1],
    button_click_states: [i64; MAX_POINTING_BUTTON as usize + 1],
}

impl PointerInjector {
    /// Create an injector with default double-click settings
    pub fn new() -> Self {
        Self {
            double_click_interval: DEFAULT_DOUBLE_CLICK_INTERVAL,
            double_click_distance: DEFAULT_DOUBLE_CLICK_DISTANCE,
            previous: InjectedPointingInput::default(),
            last_click: None,
            last_click_state: 0,
            next_event_number: 0,
            button_event_numbers: [0; MAX_POINTING_BUTTON as usize + 1],
            button_click_states: [0; MAX_POINTING_BUTTON as usize + 1],
        }
    }

    /// Set the double-click window. The interval is floored at 1 ms and the
    /// distance at 0 pixels.
    pub fn set_double_click_settings(&mut self, interval_milliseconds: i64, distance: i64) {
        self.double_click_interval = Duration::from_millis(interval_milliseconds.max(1) as u64);
        self.double_click_distance = distance.max(0) as f64;
    }

    /// Current double-click interval
    pub fn double_click_interval(&self) -> Duration {
        self.double_click_interval
    }

    /// Current double-click distance
    pub fn double_click_distance(&self) -> f64 {
        self.double_click_distance
    }

    /// Expand a snapshot into injection events: button transitions first,
    /// then motion, then scroll.
    pub fn make_events(
        &mut self,
        input: &InjectedPointingInput,
        location: PointerLocation,
        time_stamp: AbsoluteTime,
    ) -> Vec<InjectedEvent> {
        let mut events = Vec::new();

        for button in 1..=MAX_POINTING_BUTTON {
            let current = input.buttons.exists(button);
            if current == self.previous.buttons.exists(button) {
                continue;
            }

            let click_state = self.make_click_state(button, location, current, time_stamp);
            events.push(InjectedEvent::Button {
                button,
                mouse_button: MouseButton::from_button_number(button),
                down: current,
                location,
                click_state,
                event_number: self.button_event_numbers[usize::from(button)],
            });
        }

        if input.x != 0 || input.y != 0 {
            events.push(InjectedEvent::Motion {
                kind: MotionKind::from_buttons(input.buttons),
                location,
                dx: input.x,
                dy: input.y,
            });
        }

        if input.vertical_wheel != 0 || input.horizontal_wheel != 0 {
            events.push(InjectedEvent::Scroll {
                vertical: input.vertical_wheel,
                horizontal: input.horizontal_wheel,
            });
        }

        self.previous = *input;
        events
    }

    fn make_click_state(
        &mut self,
        button: u8,
        location: PointerLocation,
        down: bool,
        time_stamp: AbsoluteTime,
    ) -> i64 {
        if button == 0 || button > MAX_POINTING_BUTTON {
            return 1;
        }
        let index = usize::from(button);

        if down {
            let same_series = self.last_click.is_some_and(|last| {
                last.button == button
                    && time_stamp.saturating_duration_since(last.time_stamp)
                        <= self.double_click_interval
                    && (location.x - last.location.x).abs() <= self.double_click_distance
                    && (location.y - last.location.y).abs() <= self.double_click_distance
            });

            self.last_click_state = if same_series {
                (self.last_click_state + 1).min(MAX_CLICK_STATE)
            } else {
                1
            };

            self.last_click = Some(LastClick {
                button,
                time_stamp,
                location,
            });

            self.next_event_number += 1;
            self.button_event_numbers[index] = self.next_event_number;
            self.button_click_states[index] = self.last_click_state;

            trace!(
                "Button {} down: click_state={} event_number={}",
                button,
                self.last_click_state,
                self.next_event_number
            );
            return self.last_click_state;
        }

        // Release without a recorded press (e.g. pressed before we started)
        if self.button_click_states[index] == 0 {
            self.button_click_states[index] = 1;
        }
        if self.button_event_numbers[index] == 0 {
            self.next_event_number += 1;
            self.button_event_numbers[index] = self.next_event_number;
        }
        self.button_click_states[index]
    }
}

impl Default for PointerInjector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buttons(list: &[u8]) -> InjectedPointingInput {
        let mut input = InjectedPointingInput::default();
        for button in list {
            input.buttons.insert(*button);
        }
        input
    }

    fn click(injector: &mut PointerInjector, at_ms: u64, location: PointerLocation) -> (i64, i64) {
        let down = injector.make_events(&buttons(&[1]), location, AbsoluteTime::from_millis(at_ms));
        let released_at = AbsoluteTime::from_millis(at_ms + 10);
        let up = injector.make_events(&buttons(&[]), location, released_at);
        let state = |events: &[InjectedEvent]| match events[0] {
            InjectedEvent::Button { click_state, .. } => click_state,
            _ => panic!("expected button event"),
        };
        assert_eq!(state(&down), state(&up));
        (state(&down), state(&up))
    }

    #[test]
    fn test_click_series_caps_at_triple() {
        let mut injector = PointerInjector::new();
        let here = PointerLocation::new(100.0, 100.0);

        assert_eq!(click(&mut injector, 0, here).0, 1);
        assert_eq!(click(&mut injector, 100, here).0, 2);
        assert_eq!(click(&mut injector, 200, here).0, 3);
        assert_eq!(click(&mut injector, 300, here).0, 3);
    }

    #[test]
    fn test_click_series_resets_after_interval() {
        let mut injector = PointerInjector::new();
        let here = PointerLocation::new(0.0, 0.0);

        click(&mut injector, 0, here);
        assert_eq!(click(&mut injector, 100, here).0, 2);
        assert_eq!(click(&mut injector, 1000, here).0, 1);
    }

    #[test]
    fn test_click_series_resets_after_distance() {
        let mut injector = PointerInjector::new();

        click(&mut injector, 0, PointerLocation::new(0.0, 0.0));
        assert_eq!(click(&mut injector, 50, PointerLocation::new(4.0, 4.0)).0, 2);
        assert_eq!(click(&mut injector, 100, PointerLocation::new(10.0, 4.0)).0, 1);
    }

    #[test]
    fn test_double_click_settings_floor() {
        let mut injector = PointerInjector::new();
        injector.set_double_click_settings(0, -3);
        assert_eq!(injector.double_click_interval(), Duration::from_millis(1));
        assert_eq!(injector.double_click_distance(), 0.0);
    }

    #[test]
    fn test_event_numbers_pair_down_and_up() {
        let mut injector = PointerInjector::new();
        let here = PointerLocation::default();

        let down = injector.make_events(&buttons(&[2]), here, AbsoluteTime::from_millis(0));
        let up = injector.make_events(&buttons(&[]), here, AbsoluteTime::from_millis(5));
        let number = |events: &[InjectedEvent]| match events[0] {
            InjectedEvent::Button {
                event_number,
                mouse_button,
                ..
            } => {
                assert_eq!(mouse_button, MouseButton::Right);
                event_number
            }
            _ => panic!("expected button event"),
        };
        assert_eq!(number(&down), 1);
        assert_eq!(number(&up), 1);

        let down = injector.make_events(&buttons(&[2]), here, AbsoluteTime::from_millis(10));
        assert_eq!(number(&down), 2);
    }

    #[test]
    fn test_release_without_press() {
        let mut injector = PointerInjector::new();
        injector.previous = buttons(&[3]);

        let events =
            injector.make_events(&buttons(&[]), PointerLocation::default(), AbsoluteTime::ZERO);
        assert_eq!(
            events,
            vec![InjectedEvent::Button {
                button: 3,
                mouse_button: MouseButton::Other(2),
                down: false,
                location: PointerLocation::default(),
                click_state: 1,
                event_number: 1,
            }]
        );
    }

    #[test]
    fn test_motion_kind_and_scroll() {
        let mut injector = PointerInjector::new();
        let mut input = buttons(&[1]);
        input.x = 3;
        input.y = -2;
        input.vertical_wheel = 1;

        let events = injector.make_events(&input, PointerLocation::default(), AbsoluteTime::ZERO);
        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[1],
            InjectedEvent::Motion {
                kind: MotionKind::LeftDragged,
                dx: 3,
                dy: -2,
                ..
            }
        ));
        assert_eq!(
            events[2],
            InjectedEvent::Scroll {
                vertical: 1,
                horizontal: 0
            }
        );

        assert_eq!(MotionKind::from_buttons(Buttons::default()), MotionKind::Moved);
        assert_eq!(MotionKind::from_buttons(Buttons::from_bits(0b10)), MotionKind::RightDragged);
        assert_eq!(MotionKind::from_buttons(Buttons::from_bits(0b100)), MotionKind::OtherDragged);
    }

    #[test]
    fn test_unchanged_buttons_emit_nothing() {
        let mut injector = PointerInjector::new();
        let input = buttons(&[1]);
        injector.make_events(&input, PointerLocation::default(), AbsoluteTime::ZERO);
        assert!(injector
            .make_events(&input, PointerLocation::default(), AbsoluteTime::from_millis(1))
            .is_empty());
    }
}
