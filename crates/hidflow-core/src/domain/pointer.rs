//! Pointer tracking and absolute-to-relative translation.
//!
//! The server reports absolute cursor positions in the coordinate space of
//! our virtual screen. A HID mouse only speaks relative motion, so every move
//! is turned into a delta against the previous position.

use crate::domain::report::{BUTTON_LEFT, BUTTON_MIDDLE, BUTTON_RIGHT};
use crate::protocol::messages::MouseButton;

/// Largest magnitude a single report axis can carry.
pub const REPORT_AXIS_LIMIT: i32 = 127;

/// Wheel units per detent used by the wire protocol.
pub const WHEEL_UNITS_PER_NOTCH: i32 = 120;

/// Last known pointer state as reported by the server.
///
/// The wheel fields are transient: they hold the deltas of the wheel event
/// being dispatched and are zero otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerState {
    pub x: i16,
    pub y: i16,
    pub left: bool,
    pub middle: bool,
    pub right: bool,
    pub wheel_x: i16,
    pub wheel_y: i16,
}

impl PointerState {
    /// Records a press or release. Returns `false` for buttons the HID
    /// report cannot carry.
    pub fn set_button(&mut self, button: MouseButton, pressed: bool) -> bool {
        match button {
            MouseButton::Left => self.left = pressed,
            MouseButton::Middle => self.middle = pressed,
            MouseButton::Right => self.right = pressed,
            MouseButton::Other(_) => return false,
        }
        true
    }

    /// Buttons in HID boot mouse bit order.
    pub fn button_mask(&self) -> u8 {
        let mut mask = 0;
        if self.left {
            mask |= BUTTON_LEFT;
        }
        if self.right {
            mask |= BUTTON_RIGHT;
        }
        if self.middle {
            mask |= BUTTON_MIDDLE;
        }
        mask
    }

    pub fn release_buttons(&mut self) {
        self.left = false;
        self.middle = false;
        self.right = false;
    }
}

/// What caused a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEventKind {
    Move,
    Button,
    Wheel,
}

/// Translated pointer event, ready for the output coalescer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerMotion {
    pub dx: i8,
    pub dy: i8,
    pub wheel: i8,
    pub buttons: u8,
}

/// Converts absolute pointer states into relative motion.
///
/// The first move after construction or [`reset`](Self::reset) only
/// establishes the baseline and yields no motion.
#[derive(Debug, Clone, Default)]
pub struct PointerTranslator {
    baseline: Option<(i16, i16)>,
}

impl PointerTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets the baseline.
    pub fn reset(&mut self) {
        self.baseline = None;
    }

    pub fn baseline(&self) -> Option<(i16, i16)> {
        self.baseline
    }

    /// Translates `state` after an event of the given kind.
    ///
    /// Only moves produce motion; button and wheel events carry the
    /// current button mask and wheel notches with zero deltas.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hidflow_core::domain::pointer::{PointerEventKind, PointerState, PointerTranslator};
    ///
    /// let mut translator = PointerTranslator::new();
    /// let at = |x, y| PointerState { x, y, ..Default::default() };
    ///
    /// let first = translator.translate(PointerEventKind::Move, &at(100, 100));
    /// let second = translator.translate(PointerEventKind::Move, &at(105, 95));
    /// assert_eq!((first.dx, first.dy), (0, 0));
    /// assert_eq!((second.dx, second.dy), (5, -5));
    /// ```
    pub fn translate(&mut self, kind: PointerEventKind, state: &PointerState) -> PointerMotion {
        let (dx, dy) = match kind {
            PointerEventKind::Move => {
                let delta = match self.baseline {
                    Some((bx, by)) => (
                        clamp_axis(i32::from(state.x) - i32::from(bx)),
                        clamp_axis(i32::from(state.y) - i32::from(by)),
                    ),
                    None => (0, 0),
                };
                self.baseline = Some((state.x, state.y));
                delta
            }
            PointerEventKind::Button | PointerEventKind::Wheel => (0, 0),
        };

        PointerMotion {
            dx,
            dy,
            wheel: wheel_notches(state.wheel_y),
            buttons: state.button_mask(),
        }
    }
}

/// Clamps a delta to the signed 8-bit report range.
pub fn clamp_axis(value: i32) -> i8 {
    value.clamp(-REPORT_AXIS_LIMIT, REPORT_AXIS_LIMIT) as i8
}

/// Converts raw wheel units to notches.
///
/// Any non-zero value yields at least one notch in its direction, so slow
/// scrolling on high-resolution wheels is never lost.
pub fn wheel_notches(raw: i16) -> i8 {
    let raw = i32::from(raw);
    let notches = raw / WHEEL_UNITS_PER_NOTCH;
    let notches = if notches == 0 && raw != 0 { raw.signum() } else { notches };
    clamp_axis(notches)
}
