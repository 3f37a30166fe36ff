//! hidflow-bridge library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the bridge do?
//!
//! The bridge joins a Synergy, Barrier, or Deskflow session as a client
//! screen. Whenever the server moves the cursor onto that screen, the
//! keyboard and mouse events it forwards are translated into boot-protocol
//! HID reports and written to a USB gadget, so whatever host the gadget is
//! plugged into sees an ordinary keyboard and mouse.
//!
//! 1. The [`application::reconnect`] policy keeps a TCP connection to the
//!    configured server, retrying on a fixed backoff.
//! 2. Bytes read from the connection are fed to a
//!    [`hidflow_core::Session`], which answers the handshake and keep-alives
//!    and emits translated input.
//! 3. [`application::forward_input`] turns that input into HID reports,
//!    rate-limiting pointer motion through the output coalescer.
//! 4. [`application::driver`] ties one tick of all of the above together.

/// Application layer: use cases and the per-tick driver.
pub mod application;

/// Infrastructure layer: TCP transport, HID output, and configuration.
pub mod infrastructure;
