//! # Input Normalization
//!
//! Every physical input (touch panel, analog joystick, push buttons, and text commands
//! on the host) is reduced to one [`InputEvent`] vocabulary before it reaches the
//! navigation state machine. Raw readings that cannot be interpreted become an
//! [`InputDecodeError`], which the run loop logs and drops.
//!
//! ## Touch Layout (320×480 portrait)
//!
//! ```text
//!   y = 0   ┌──────────────────────┐
//!           │ header               │
//!   y = 70  ├──────────────────────┤
//!           │ row 0  (36 px)       │
//!           │ row 1                │
//!           │ …                    │
//!   y = 420 ├───────┬──────┬───────┤
//!           │Prayer │Events│Setting│  tab bar, thirds of the width
//!   y = 480 └───────┴──────┴───────┘
//! ```

use crate::navigation::Tab;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use thiserror::Error;

/// The device-independent input vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputEvent {
    TabLeft,
    TabRight,
    TabSelect(Tab),
    FocusUp,
    FocusDown,
    Confirm,
    Back,
    /// Jump focus to a list row (touch)
    DirectSelect(usize),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputDecodeError {
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("invalid argument `{value}` for `{command}`")]
    InvalidArgument { command: &'static str, value: String },
    #[error("touch at ({x}, {y}) is outside the {width}x{height} panel")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    #[error("joystick deflected on both axes ({x:.2}, {y:.2})")]
    Contradictory { x: f32, y: f32 },
}

/// Input collaborator polled once per tick.
pub trait InputSource {
    /// Normalized events received since the last poll, oldest first.
    fn poll(&mut self) -> Vec<InputEvent>;
}

/// Screen geometry for hit-testing touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TouchLayout {
    pub width: i32,
    pub height: i32,
    pub tab_bar_height: i32,
    pub list_top: i32,
    pub row_height: i32,
}

impl Default for TouchLayout {
    fn default() -> Self {
        Self {
            width: 320,
            height: 480,
            tab_bar_height: 60,
            list_top: 70,
            row_height: 36,
        }
    }
}

impl TouchLayout {
    pub fn tab_bar_top(&self) -> i32 {
        self.height - self.tab_bar_height
    }

    /// Top edge of list row `index`.
    pub fn row_top(&self, index: usize) -> i32 {
        self.list_top + self.row_height * index as i32
    }

    /// Rows that fit between the header and the tab bar.
    pub fn visible_rows(&self) -> usize {
        ((self.tab_bar_top() - self.list_top) / self.row_height).max(0) as usize
    }

    /// Map a touch point to an event. Touches on the header hit nothing.
    pub fn hit_test(&self, x: i32, y: i32) -> Result<Option<InputEvent>, InputDecodeError> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return Err(InputDecodeError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        if y >= self.tab_bar_top() {
            let column = (x * Tab::ALL.len() as i32 / self.width) as usize;
            return Ok(Some(InputEvent::TabSelect(Tab::ALL[column.min(Tab::ALL.len() - 1)])));
        }
        if y >= self.list_top {
            let row = ((y - self.list_top) / self.row_height) as usize;
            return Ok(Some(InputEvent::DirectSelect(row)));
        }
        Ok(None)
    }
}

/// Decode one line of the host text protocol.
///
/// ```text
/// left | right | up | down | ok | confirm | back
/// tab prayer|events|settings
/// select <row>
/// touch <x> <y>
/// ```
///
/// Blank lines and touches that miss every control decode to `Ok(None)`.
pub fn decode_command(
    line: &str,
    layout: &TouchLayout,
) -> Result<Option<InputEvent>, InputDecodeError> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };

    let event = match command.to_ascii_lowercase().as_str() {
        "left" | "l" => InputEvent::TabLeft,
        "right" | "r" => InputEvent::TabRight,
        "up" | "u" => InputEvent::FocusUp,
        "down" | "d" => InputEvent::FocusDown,
        "ok" | "confirm" => InputEvent::Confirm,
        "back" | "b" => InputEvent::Back,
        "tab" => {
            let name = words.next().ok_or(InputDecodeError::MissingArgument("tab"))?;
            let tab = Tab::from_name(name).ok_or_else(|| InputDecodeError::InvalidArgument {
                command: "tab",
                value: name.to_string(),
            })?;
            InputEvent::TabSelect(tab)
        }
        "select" => {
            let row = words.next().ok_or(InputDecodeError::MissingArgument("select"))?;
            let index = row.parse().map_err(|_| InputDecodeError::InvalidArgument {
                command: "select",
                value: row.to_string(),
            })?;
            InputEvent::DirectSelect(index)
        }
        "touch" => {
            let x = parse_coordinate(words.next())?;
            let y = parse_coordinate(words.next())?;
            return layout.hit_test(x, y);
        }
        other => return Err(InputDecodeError::Unknown(other.to_string())),
    };
    Ok(Some(event))
}

fn parse_coordinate(word: Option<&str>) -> Result<i32, InputDecodeError> {
    let word = word.ok_or(InputDecodeError::MissingArgument("touch"))?;
    word.parse().map_err(|_| InputDecodeError::InvalidArgument {
        command: "touch",
        value: word.to_string(),
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn event(self) -> InputEvent {
        match self {
            Direction::Up => InputEvent::FocusUp,
            Direction::Down => InputEvent::FocusDown,
            Direction::Left => InputEvent::TabLeft,
            Direction::Right => InputEvent::TabRight,
        }
    }
}

/// Turns 16-bit analog joystick readings into edge-triggered events.
///
/// Holding a direction produces one event; the stick must return to center before the
/// same direction fires again.
#[derive(Clone, Debug)]
pub struct JoystickNormalizer {
    center_x: u16,
    center_y: u16,
    /// Raw counts around center treated as zero
    deadzone: u16,
    /// Normalized deflection (0–1) that counts as a direction
    threshold: f32,
    held: Option<Direction>,
}

impl Default for JoystickNormalizer {
    fn default() -> Self {
        Self {
            center_x: 32_768,
            center_y: 32_768,
            deadzone: 200,
            threshold: 0.5,
            held: None,
        }
    }
}

impl JoystickNormalizer {
    /// Center on the average of resting samples.
    pub fn calibrate(&mut self, samples: &[(u16, u16)]) {
        if samples.is_empty() {
            return;
        }
        let n = samples.len() as u64;
        let (sx, sy) = samples.iter().fold((0u64, 0u64), |(sx, sy), &(x, y)| {
            (sx + u64::from(x), sy + u64::from(y))
        });
        self.center_x = (sx / n) as u16;
        self.center_y = (sy / n) as u16;
        info!("Joystick calibrated: center=({}, {})", self.center_x, self.center_y);
    }

    fn normalize(&self, raw: u16, center: u16) -> f32 {
        let delta = i32::from(raw) - i32::from(center);
        if delta.unsigned_abs() < u32::from(self.deadzone) {
            return 0.0;
        }
        (delta as f32 / 32_768.0).clamp(-1.0, 1.0)
    }

    /// Feed one raw reading.
    ///
    /// Returns an event on the transition into a direction, `Ok(None)` while centered or
    /// held, and [`InputDecodeError::Contradictory`] when both axes are deflected.
    pub fn feed(&mut self, x: u16, y: u16) -> Result<Option<InputEvent>, InputDecodeError> {
        let nx = self.normalize(x, self.center_x);
        let ny = self.normalize(y, self.center_y);
        let horizontal = nx.abs() >= self.threshold;
        let vertical = ny.abs() >= self.threshold;

        let direction = match (horizontal, vertical) {
            (false, false) => {
                self.held = None;
                return Ok(None);
            }
            (true, true) => {
                self.held = None;
                return Err(InputDecodeError::Contradictory { x: nx, y: ny });
            }
            // Y axis reads low when pushed up
            (false, true) if ny < 0.0 => Direction::Up,
            (false, true) => Direction::Down,
            (true, false) if nx < 0.0 => Direction::Left,
            (true, false) => Direction::Right,
        };

        if self.held == Some(direction) {
            return Ok(None);
        }
        self.held = Some(direction);
        Ok(Some(direction.event()))
    }
}

/// Physical push buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Button {
    Select,
    Back,
    /// Joystick center press
    JoystickPress,
}

impl Button {
    pub fn event(self) -> InputEvent {
        match self {
            Button::Select => InputEvent::Confirm,
            Button::Back | Button::JoystickPress => InputEvent::Back,
        }
    }
}

/// Debounces one active-high button level sampled with a millisecond clock.
#[derive(Clone, Debug)]
pub struct ButtonDebouncer {
    button: Button,
    debounce_ms: u64,
    stable: bool,
    last_change_ms: Option<u64>,
}

impl ButtonDebouncer {
    pub fn new(button: Button) -> Self {
        Self {
            button,
            debounce_ms: 50,
            stable: false,
            last_change_ms: None,
        }
    }

    /// Feed the current level; returns the button's event on a debounced press.
    pub fn feed(&mut self, pressed: bool, now_ms: u64) -> Option<InputEvent> {
        if pressed == self.stable {
            return None;
        }
        if let Some(last) = self.last_change_ms {
            if now_ms.saturating_sub(last) < self.debounce_ms {
                return None;
            }
        }
        self.stable = pressed;
        self.last_change_ms = Some(now_ms);
        pressed.then(|| self.button.event())
    }
}

/// One reading of the front panel: joystick axes plus button levels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PanelSample {
    pub joystick: (u16, u16),
    pub select: bool,
    pub back: bool,
    pub joystick_press: bool,
    /// Monotonic milliseconds when the sample was taken
    pub at_ms: u64,
}

/// Hardware access for [`PanelInput`]: an ADC for the stick and GPIO levels for the
/// buttons.
pub trait PanelReader {
    fn sample(&mut self) -> io::Result<PanelSample>;
}

/// Joystick and push buttons as an [`InputSource`].
///
/// Each poll takes one sample; the stick goes through a [`JoystickNormalizer`] and each
/// button through its own [`ButtonDebouncer`].
pub struct PanelInput<R: PanelReader> {
    reader: R,
    stick: JoystickNormalizer,
    buttons: [(Button, ButtonDebouncer); 3],
}

impl<R: PanelReader> PanelInput<R> {
    pub fn new(reader: R) -> Self {
        let debounced = |button| (button, ButtonDebouncer::new(button));
        Self {
            reader,
            stick: JoystickNormalizer::default(),
            buttons: [
                debounced(Button::Select),
                debounced(Button::Back),
                debounced(Button::JoystickPress),
            ],
        }
    }

    /// Center the stick on `count` resting samples. Failed reads are skipped.
    pub fn calibrate(&mut self, count: usize) {
        let resting: Vec<(u16, u16)> = (0..count)
            .filter_map(|_| self.reader.sample().ok())
            .map(|sample| sample.joystick)
            .collect();
        self.stick.calibrate(&resting);
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }
}

impl<R: PanelReader> InputSource for PanelInput<R> {
    fn poll(&mut self) -> Vec<InputEvent> {
        let sample = match self.reader.sample() {
            Ok(sample) => sample,
            Err(e) => {
                warn!("panel read failed: {e}");
                return Vec::new();
            }
        };

        let mut events = Vec::new();
        let (x, y) = sample.joystick;
        match self.stick.feed(x, y) {
            Ok(Some(event)) => events.push(event),
            Ok(None) => {}
            Err(e) => debug!("dropped input: {e}"),
        }
        for (button, debouncer) in &mut self.buttons {
            let pressed = match button {
                Button::Select => sample.select,
                Button::Back => sample.back,
                Button::JoystickPress => sample.joystick_press,
            };
            events.extend(debouncer.feed(pressed, sample.at_ms));
        }
        events
    }
}

/// Text commands read from stdin on a background thread.
pub struct StdinInput {
    lines: Receiver<String>,
    layout: TouchLayout,
    closed: bool,
}

impl StdinInput {
    pub fn spawn(layout: TouchLayout) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("stdin read failed: {e}");
                        break;
                    }
                }
            }
        });
        Self {
            lines: rx,
            layout,
            closed: false,
        }
    }
}

impl InputSource for StdinInput {
    fn poll(&mut self) -> Vec<InputEvent> {
        let mut events = Vec::new();
        loop {
            match self.lines.try_recv() {
                Ok(line) => match decode_command(&line, &self.layout) {
                    Ok(Some(event)) => events.push(event),
                    Ok(None) => debug!("ignored input `{line}`"),
                    Err(e) => warn!("dropped input: {e}"),
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.closed {
                        info!("stdin closed; no further input");
                        self.closed = true;
                    }
                    break;
                }
            }
        }
        events
    }
}

/// Replays a fixed list of events, one per poll.
#[derive(Debug, Default, Clone)]
pub struct ScriptedInput {
    pending: std::collections::VecDeque<InputEvent>,
}

impl ScriptedInput {
    pub fn new(events: impl IntoIterator<Item = InputEvent>) -> Self {
        Self {
            pending: events.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> Vec<InputEvent> {
        self.pending.pop_front().into_iter().collect()
    }
}
