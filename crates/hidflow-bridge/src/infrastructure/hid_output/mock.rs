//! Recording HID sink for tests.
//!
//! The real sink writes to gadget device files, which only exist on a board
//! with a USB device controller and cannot be observed from test code. The
//! `RecordingHidSink` keeps every report in memory instead, in the order it
//! was sent, so assertions can check exactly what the host would have seen.
//!
//! # Usage in tests
//!
//! ```ignore
//! let sink = Arc::new(RecordingHidSink::new());
//! let input = ForwardInputUseCase::new(sink.clone(), OutputCoalescer::default());
//!
//! // ... drive the bridge ...
//!
//! assert_eq!(sink.keyboard_reports().last(), Some(&KeyboardReport::EMPTY));
//! ```
//!
//! Call [`RecordingHidSink::set_host_connected`] to simulate the host going
//! away, and set `should_fail` to make every report return an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use hidflow_core::{KeyboardReport, MouseReport};

use crate::application::forward_input::{HidError, HidSink};

/// A sink that records all reports without sending them anywhere.
#[derive(Debug)]
pub struct RecordingHidSink {
    pointer: Mutex<Vec<MouseReport>>,
    keyboard: Mutex<Vec<KeyboardReport>>,
    host_connected: AtomicBool,
    /// When `true`, every report is rejected with [`HidError::HostDisconnected`].
    pub should_fail: bool,
}

impl Default for RecordingHidSink {
    fn default() -> Self {
        Self {
            pointer: Mutex::new(Vec::new()),
            keyboard: Mutex::new(Vec::new()),
            host_connected: AtomicBool::new(true),
            should_fail: false,
        }
    }
}

impl RecordingHidSink {
    /// Creates a sink with a connected host and no recorded reports.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_host_connected(&self, connected: bool) {
        self.host_connected.store(connected, Ordering::Relaxed);
    }

    pub fn pointer_reports(&self) -> Vec<MouseReport> {
        self.pointer.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn keyboard_reports(&self) -> Vec<KeyboardReport> {
        self.keyboard.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.pointer.lock().unwrap_or_else(PoisonError::into_inner).clear();
        self.keyboard.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl HidSink for RecordingHidSink {
    fn send_pointer_report(&self, report: MouseReport) -> Result<(), HidError> {
        if self.should_fail {
            return Err(HidError::HostDisconnected);
        }
        self.pointer.lock().unwrap_or_else(PoisonError::into_inner).push(report);
        Ok(())
    }

    fn set_held_keys(&self, report: KeyboardReport) -> Result<(), HidError> {
        if self.should_fail {
            return Err(HidError::HostDisconnected);
        }
        self.keyboard.lock().unwrap_or_else(PoisonError::into_inner).push(report);
        Ok(())
    }

    fn is_host_connected(&self) -> bool {
        self.host_connected.load(Ordering::Relaxed)
    }
}
