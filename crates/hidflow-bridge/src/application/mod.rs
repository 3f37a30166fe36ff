//! Application layer use cases for the bridge.
//!
//! - **`forward_input`** – Receives translated input from the session and
//!   drives a [`forward_input::HidSink`]: keyboard reports whenever the held
//!   key set changes, pointer reports through the output coalescer.
//!
//! - **`reconnect`** – Parses the configured server URL and decides when a
//!   new connection attempt is due.
//!
//! - **`driver`** – One bounded unit of work per call: apply configuration,
//!   read what the transport has, dispatch frames, flush a pointer report.
//!   The transport and configuration source are traits so the whole loop can
//!   be exercised without a socket.

pub mod driver;
pub mod forward_input;
pub mod reconnect;
