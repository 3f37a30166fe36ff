//! Domain logic of the bridge.
//!
//! Pure state and arithmetic with no I/O: pointer translation, the output
//! coalescer, held-key tracking, and the HID report layouts they produce.
//! Everything here can be tested without a socket or a HID device.

pub mod coalescer;
pub mod keys;
pub mod pointer;
pub mod report;
