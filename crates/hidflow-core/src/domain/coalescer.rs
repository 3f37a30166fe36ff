//! Rate-limited pointer report coalescing.
//!
//! Pointer events arrive far faster than a Bluetooth or USB HID link should
//! carry reports. Motion is therefore summed into an accumulator and drained
//! on a fixed schedule, at most [`MOUSE_REPORT_INTERVAL`] apart. Each drained
//! report carries at most ±127 per axis; whatever does not fit stays in the
//! accumulator for the next report, so no motion is lost.
//!
//! Button changes bypass the schedule.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::domain::pointer::clamp_axis;
use crate::domain::report::MouseReport;

/// Minimum spacing between two motion reports.
pub const MOUSE_REPORT_INTERVAL: Duration = Duration::from_millis(8);

/// Accumulates pointer motion between reports.
#[derive(Debug, Clone)]
pub struct OutputCoalescer {
    interval: Duration,
    dx: i32,
    dy: i32,
    wheel: i32,
    buttons: u8,
    last_report: Option<Instant>,
}

impl Default for OutputCoalescer {
    fn default() -> Self {
        Self::new(MOUSE_REPORT_INTERVAL)
    }
}

impl OutputCoalescer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            dx: 0,
            dy: 0,
            wheel: 0,
            buttons: 0,
            last_report: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Adds motion to the accumulator.
    pub fn accumulate(&mut self, dx: i32, dy: i32, wheel: i32) {
        self.dx = self.dx.saturating_add(dx);
        self.dy = self.dy.saturating_add(dy);
        self.wheel = self.wheel.saturating_add(wheel);
    }

    /// Pending motion as `(dx, dy, wheel)`.
    pub fn pending(&self) -> (i32, i32, i32) {
        (self.dx, self.dy, self.wheel)
    }

    pub fn has_pending_motion(&self) -> bool {
        self.dx != 0 || self.dy != 0 || self.wheel != 0
    }

    pub fn buttons(&self) -> u8 {
        self.buttons
    }

    /// Records the current button mask.
    ///
    /// Returns a report to send right away if the mask changed. The report
    /// carries no motion; pending motion keeps waiting for [`poll`](Self::poll).
    pub fn set_buttons(&mut self, buttons: u8) -> Option<MouseReport> {
        if buttons == self.buttons {
            return None;
        }
        self.buttons = buttons;
        Some(MouseReport {
            buttons,
            ..MouseReport::RELEASED
        })
    }

    /// Drains up to one report's worth of motion if the interval has elapsed.
    ///
    /// Returns `None` when nothing is pending or the previous report is too
    /// recent.
    pub fn poll(&mut self, now: Instant) -> Option<MouseReport> {
        if !self.has_pending_motion() {
            return None;
        }
        if let Some(last) = self.last_report {
            if now.saturating_duration_since(last) < self.interval {
                return None;
            }
        }

        let report = MouseReport {
            buttons: self.buttons,
            dx: clamp_axis(self.dx),
            dy: clamp_axis(self.dy),
            wheel: clamp_axis(self.wheel),
        };
        self.dx -= i32::from(report.dx);
        self.dy -= i32::from(report.dy);
        self.wheel -= i32::from(report.wheel);
        self.last_report = Some(now);

        trace!(
            dx = report.dx,
            dy = report.dy,
            wheel = report.wheel,
            remaining_dx = self.dx,
            remaining_dy = self.dy,
            "pointer report"
        );
        Some(report)
    }

    /// Drops pending motion, keeping the button mask and schedule.
    pub fn discard_motion(&mut self) {
        self.dx = 0;
        self.dy = 0;
        self.wheel = 0;
    }

    /// Drops pending motion and forgets the button mask.
    pub fn clear(&mut self) {
        self.discard_motion();
        self.buttons = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_with_nothing_pending_returns_none() {
        let mut coalescer = OutputCoalescer::default();
        assert!(coalescer.poll(Instant::now()).is_none());
    }

    #[test]
    fn test_first_poll_emits_immediately() {
        // Arrange
        let mut coalescer = OutputCoalescer::default();
        coalescer.accumulate(3, -4, 1);

        // Act
        let report = coalescer.poll(Instant::now());

        // Assert
        assert_eq!(report, Some(MouseReport { buttons: 0, dx: 3, dy: -4, wheel: 1 }));
        assert!(!coalescer.has_pending_motion());
    }

    #[test]
    fn test_poll_within_interval_holds_motion_back() {
        // Arrange
        let start = Instant::now();
        let mut coalescer = OutputCoalescer::default();
        coalescer.accumulate(1, 0, 0);
        coalescer.poll(start);
        coalescer.accumulate(2, 0, 0);

        // Act
        let early = coalescer.poll(start + Duration::from_millis(3));
        let on_time = coalescer.poll(start + MOUSE_REPORT_INTERVAL);

        // Assert
        assert!(early.is_none());
        assert_eq!(on_time.map(|r| r.dx), Some(2));
    }

    #[test]
    fn test_excess_motion_is_carried_to_next_report() {
        // Arrange
        let start = Instant::now();
        let mut coalescer = OutputCoalescer::default();
        coalescer.accumulate(200, -300, 0);

        // Act
        let first = coalescer.poll(start).expect("first report");
        let second = coalescer.poll(start + MOUSE_REPORT_INTERVAL).expect("second report");
        let third = coalescer.poll(start + MOUSE_REPORT_INTERVAL * 2).expect("third report");

        // Assert
        assert_eq!((first.dx, first.dy), (127, -127));
        assert_eq!((second.dx, second.dy), (73, -127));
        assert_eq!((third.dx, third.dy), (0, -46));
        assert!(!coalescer.has_pending_motion());
    }

    #[test]
    fn test_many_small_events_are_never_lost() {
        // Arrange
        let start = Instant::now();
        let mut coalescer = OutputCoalescer::default();
        let mut emitted = 0i32;
        let mut now = start;

        // Act: 40 events of +5 with a poll after each, 1 ms apart
        for _ in 0..40 {
            coalescer.accumulate(5, 0, 0);
            now += Duration::from_millis(1);
            if let Some(report) = coalescer.poll(now) {
                assert!(report.dx.unsigned_abs() <= 127);
                emitted += i32::from(report.dx);
            }
        }
        for _ in 0..10 {
            now += MOUSE_REPORT_INTERVAL;
            if let Some(report) = coalescer.poll(now) {
                emitted += i32::from(report.dx);
            }
        }

        // Assert
        assert_eq!(emitted, 200);
    }

    #[test]
    fn test_button_change_is_reported_immediately_without_motion() {
        // Arrange
        let mut coalescer = OutputCoalescer::default();
        coalescer.accumulate(10, 10, 0);

        // Act
        let pressed = coalescer.set_buttons(0x01);
        let unchanged = coalescer.set_buttons(0x01);

        // Assert
        assert_eq!(pressed, Some(MouseReport { buttons: 0x01, dx: 0, dy: 0, wheel: 0 }));
        assert!(unchanged.is_none());
        assert_eq!(coalescer.pending(), (10, 10, 0));
    }

    #[test]
    fn test_motion_reports_carry_current_buttons() {
        // Arrange
        let mut coalescer = OutputCoalescer::default();
        coalescer.set_buttons(0x02);
        coalescer.accumulate(-7, 0, 0);

        // Act
        let report = coalescer.poll(Instant::now());

        // Assert
        assert_eq!(report.map(|r| r.buttons), Some(0x02));
    }

    #[test]
    fn test_clear_forgets_motion_and_buttons() {
        // Arrange
        let mut coalescer = OutputCoalescer::default();
        coalescer.set_buttons(0x01);
        coalescer.accumulate(50, 50, 1);

        // Act
        coalescer.clear();

        // Assert
        assert_eq!(coalescer.pending(), (0, 0, 0));
        assert_eq!(coalescer.buttons(), 0);
        assert_eq!(coalescer.set_buttons(0x01).map(|r| r.buttons), Some(0x01));
    }
}
