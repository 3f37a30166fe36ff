//! ForwardInputUseCase: turns translated session input into HID reports.
//!
//! This use case sits at the application layer and delegates to a
//! [`HidSink`] trait object for report delivery. The gadget device writer
//! and the recording sink used by tests live in the infrastructure layer.
//!
//! Keyboard reports are sent whenever the held key set changes. Pointer
//! motion is accumulated and drained by [`ForwardInputUseCase::flush`] at
//! most once per report interval; button changes go out immediately.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use hidflow_core::domain::keys::KeyEvent;
use hidflow_core::domain::pointer::PointerMotion;
use hidflow_core::{InputEvents, KeyState, KeyboardReport, MouseReport, OutputCoalescer};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Error type for HID report delivery.
#[derive(Debug, Error)]
pub enum HidError {
    /// Writing a report to a device file failed.
    #[error("failed to write HID report to {device}: {source}")]
    Io {
        device: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// No host is attached, so the report had nowhere to go.
    #[error("HID host not connected")]
    HostDisconnected,
}

/// Destination for boot-protocol HID reports.
///
/// Implementations must tolerate being called from the driver loop at any
/// time; the use case only calls the report methods while
/// [`is_host_connected`](Self::is_host_connected) returns `true`.
#[cfg_attr(test, mockall::automock)]
pub trait HidSink: Send + Sync {
    /// Sends one relative pointer report.
    fn send_pointer_report(&self, report: MouseReport) -> Result<(), HidError>;

    /// Replaces the complete set of held keys and modifiers.
    fn set_held_keys(&self, report: KeyboardReport) -> Result<(), HidError>;

    /// Whether a host is attached and accepting reports.
    fn is_host_connected(&self) -> bool;
}

/// The Forward Input use case.
pub struct ForwardInputUseCase {
    sink: Arc<dyn HidSink>,
    coalescer: OutputCoalescer,
    keys: KeyState,
    host_connected: bool,
}

impl ForwardInputUseCase {
    pub fn new(sink: Arc<dyn HidSink>, coalescer: OutputCoalescer) -> Self {
        Self {
            sink,
            coalescer,
            keys: KeyState::new(),
            host_connected: false,
        }
    }

    /// Keys currently held on the host.
    pub fn key_state(&self) -> &KeyState {
        &self.keys
    }

    pub fn coalescer(&self) -> &OutputCoalescer {
        &self.coalescer
    }

    /// Host state as of the last [`flush`](Self::flush).
    pub fn host_connected(&self) -> bool {
        self.host_connected
    }

    /// Tracks host attach/detach and sends one coalesced pointer report if
    /// the report interval has elapsed.
    ///
    /// When the host goes away the accumulated motion, the button mask, and
    /// the held keys are forgotten, so nothing stale is replayed when it
    /// comes back.
    pub fn flush(&mut self, now: Instant) {
        if !self.sink.is_host_connected() {
            if self.host_connected {
                info!("HID host disconnected, dropping pending input");
                self.coalescer.clear();
                self.keys.release_all();
                self.host_connected = false;
            }
            return;
        }
        if !self.host_connected {
            info!("HID host connected");
            self.host_connected = true;
        }

        if let Some(report) = self.coalescer.poll(now) {
            self.send_pointer(report);
        }
    }

    /// Releases every key and button on the host and discards pending motion.
    ///
    /// Empty reports are sent even if nothing was held, so a release lost on
    /// an earlier report cannot leave a key stuck.
    pub fn release_all(&mut self) {
        self.keys.release_all();
        self.coalescer.discard_motion();
        self.coalescer.set_buttons(0);
        if !self.sink.is_host_connected() {
            return;
        }
        self.send_keys(KeyboardReport::EMPTY);
        self.send_pointer(MouseReport::RELEASED);
    }

    fn send_pointer(&self, report: MouseReport) {
        trace!(?report, "pointer report");
        if let Err(err) = self.sink.send_pointer_report(report) {
            warn!(error = %err, "failed to send pointer report");
        }
    }

    fn send_keys(&self, report: KeyboardReport) {
        debug!(modifiers = report.modifiers, keys = ?report.keys, "keyboard report");
        if let Err(err) = self.sink.set_held_keys(report) {
            warn!(error = %err, "failed to send keyboard report");
        }
    }
}

impl InputEvents for ForwardInputUseCase {
    fn on_pointer(&mut self, motion: PointerMotion) {
        if !self.sink.is_host_connected() {
            return;
        }
        self.coalescer.accumulate(
            i32::from(motion.dx),
            i32::from(motion.dy),
            i32::from(motion.wheel),
        );
        if let Some(report) = self.coalescer.set_buttons(motion.buttons) {
            self.send_pointer(report);
        }
    }

    fn on_key(&mut self, event: KeyEvent) {
        if !self.sink.is_host_connected() {
            return;
        }
        if self.keys.apply(&event) {
            self.send_keys(self.keys.report());
        }
    }

    fn on_screen_active(&mut self, active: bool) {
        if !active {
            self.release_all();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
