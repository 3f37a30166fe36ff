//! HID output implementations.
//!
//! - [`gadget::GadgetHidSink`] writes boot-protocol reports to Linux USB
//!   gadget device files (`/dev/hidg0`, `/dev/hidg1`).
//! - [`LogHidSink`] only logs reports; used for `--dry-run`.
//! - [`mock::RecordingHidSink`] records every report for tests.

pub mod gadget;
pub mod mock;

use hidflow_core::{KeyboardReport, MouseReport};
use tracing::info;

use crate::application::forward_input::{HidError, HidSink};

/// A sink that logs reports instead of sending them.
#[derive(Debug, Default)]
pub struct LogHidSink;

impl HidSink for LogHidSink {
    fn send_pointer_report(&self, report: MouseReport) -> Result<(), HidError> {
        info!(
            buttons = report.buttons,
            dx = report.dx,
            dy = report.dy,
            wheel = report.wheel,
            "pointer report (dry run)"
        );
        Ok(())
    }

    fn set_held_keys(&self, report: KeyboardReport) -> Result<(), HidError> {
        info!(modifiers = report.modifiers, keys = ?report.keys, "keyboard report (dry run)");
        Ok(())
    }

    fn is_host_connected(&self) -> bool {
        true
    }
}
