//! Infrastructure layer for the bridge.
//!
//! Contains the adapters the driver talks to: the TCP connection to the
//! server, HID report output, and configuration storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `hidflow_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`hid_output`** – `HidSink` implementations: the USB gadget device
//!   writer, a logging sink for dry runs, and a recording sink for tests.
//!
//! - **`network`** – Non-blocking TCP transport to the Synergy-compatible
//!   server, built on tokio.
//!
//! - **`storage`** – TOML configuration file loading and the file-backed
//!   `ConfigSource` that picks up edits while running.

pub mod hid_output;
pub mod network;
pub mod storage;
