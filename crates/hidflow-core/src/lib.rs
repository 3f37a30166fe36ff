//! # hidflow-core
//!
//! Protocol and translation core for a bridge that receives keyboard and mouse
//! events from a Synergy, Barrier, or Deskflow server and replays them as HID
//! reports on a paired host.
//!
//! The crate has no dependencies on sockets, files, or OS input APIs. Time is
//! always passed in by the caller as an [`std::time::Instant`], so every piece
//! can be driven from a unit test.
//!
//! # Architecture overview
//!
//! ```text
//! bytes ─> protocol::frame::FrameDecoder ─> session::Session ─> InputEvents
//!                                             │  (hello, capture,        │
//!                                             │   command dispatch)      │
//!                                             └─> FrameWriter (replies)  │
//!                                                                        v
//!                     keymap (scancode/keysym -> HID) + domain::pointer (relative motion)
//!                                                                        │
//!                                                                        v
//!                             domain::coalescer / domain::keys ─> HID reports
//! ```
//!
//! - **`protocol`** – Length-prefixed framing over a fixed receive window, the
//!   wire command set, and reply encoding into a fixed reply buffer.
//! - **`session`** – The handshake state machine and the command dispatcher.
//! - **`keymap`** – Scancode and keysym translation into USB HID usage IDs.
//! - **`domain`** – Pointer tracking, rate-limited report coalescing, the
//!   held-key set, and boot-protocol report layouts.

pub mod domain;
pub mod keymap;
pub mod protocol;
pub mod session;

pub use domain::coalescer::OutputCoalescer;
pub use domain::keys::KeyState;
pub use domain::pointer::{PointerState, PointerTranslator};
pub use domain::report::{KeyboardReport, MouseReport};
pub use keymap::hid::HidKeyCode;
pub use protocol::codec::ProtocolError;
pub use protocol::frame::FrameDecoder;
pub use protocol::messages::{ProtocolName, ServerCommand};
pub use session::{FrameWriter, InputEvents, Session, SessionConfig, SessionState};
