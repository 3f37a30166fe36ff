//! USB HID gadget output.
//!
//! With the Linux gadget framework (configfs `hid` functions set up for the
//! boot keyboard and boot mouse report descriptors) each function shows up
//! as a character device. Writing an 8-byte report to the keyboard device or
//! a 4-byte report to the mouse device sends it to the host.
//!
//! A write fails once the host detaches. The device is then closed and
//! reopened no more than once per [`REOPEN_INTERVAL`], which is how the
//! sink notices the host coming back.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use hidflow_core::{KeyboardReport, MouseReport};
use tracing::{debug, info, warn};

use crate::application::forward_input::{HidError, HidSink};

/// Default keyboard function device.
pub const DEFAULT_KEYBOARD_DEVICE: &str = "/dev/hidg0";

/// Default mouse function device.
pub const DEFAULT_MOUSE_DEVICE: &str = "/dev/hidg1";

/// Minimum spacing between attempts to reopen a closed device.
pub const REOPEN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct DeviceState {
    file: Option<File>,
    last_open_attempt: Option<Instant>,
}

/// One gadget character device.
#[derive(Debug)]
struct GadgetDevice {
    path: PathBuf,
    state: Mutex<DeviceState>,
}

impl GadgetDevice {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            state: Mutex::new(DeviceState::default()),
        }
    }

    /// Opens the device if it is closed and the reopen interval has passed.
    /// Returns whether it is open afterwards.
    fn ensure_open(&self, now: Instant) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.file.is_some() {
            return true;
        }
        if let Some(last) = state.last_open_attempt {
            if now.saturating_duration_since(last) < REOPEN_INTERVAL {
                return false;
            }
        }
        state.last_open_attempt = Some(now);
        match OpenOptions::new().write(true).open(&self.path) {
            Ok(file) => {
                info!(device = %self.path.display(), "HID device opened");
                state.file = Some(file);
                true
            }
            Err(err) => {
                debug!(device = %self.path.display(), error = %err, "HID device not available");
                false
            }
        }
    }

    fn write(&self, report: &[u8]) -> Result<(), HidError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(file) = state.file.as_mut() else {
            return Err(HidError::HostDisconnected);
        };
        if let Err(source) = file.write_all(report) {
            warn!(device = %self.path.display(), error = %source, "HID write failed, closing device");
            state.file = None;
            return Err(HidError::Io {
                device: self.path.clone(),
                source,
            });
        }
        Ok(())
    }
}

/// Sends reports to a keyboard and a mouse gadget function.
#[derive(Debug)]
pub struct GadgetHidSink {
    keyboard: GadgetDevice,
    mouse: GadgetDevice,
}

impl GadgetHidSink {
    pub fn new(keyboard: impl AsRef<Path>, mouse: impl AsRef<Path>) -> Self {
        Self {
            keyboard: GadgetDevice::new(keyboard.as_ref().to_path_buf()),
            mouse: GadgetDevice::new(mouse.as_ref().to_path_buf()),
        }
    }

    pub fn keyboard_path(&self) -> &Path {
        &self.keyboard.path
    }

    pub fn mouse_path(&self) -> &Path {
        &self.mouse.path
    }
}

impl Default for GadgetHidSink {
    fn default() -> Self {
        Self::new(DEFAULT_KEYBOARD_DEVICE, DEFAULT_MOUSE_DEVICE)
    }
}

impl HidSink for GadgetHidSink {
    fn send_pointer_report(&self, report: MouseReport) -> Result<(), HidError> {
        self.mouse.write(&report.to_bytes())
    }

    fn set_held_keys(&self, report: KeyboardReport) -> Result<(), HidError> {
        self.keyboard.write(&report.to_bytes())
    }

    fn is_host_connected(&self) -> bool {
        let now = Instant::now();
        // Both are evaluated so each device gets its reopen attempt.
        let keyboard = self.keyboard.ensure_open(now);
        let mouse = self.mouse.ensure_open(now);
        keyboard && mouse
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
