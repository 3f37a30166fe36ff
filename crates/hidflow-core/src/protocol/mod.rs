//! Protocol module: framing, wire commands, and reply encoding.

pub mod codec;
pub mod frame;
pub mod messages;

pub use codec::{decode_command, decode_hello, encode_reply, read_tag, ProtocolError, ReplyBuffer, REPLY_BUFFER_SIZE};
pub use frame::{FrameDecoder, FrameStats, FRAME_HEADER_SIZE, RECV_BUFFER_SIZE};
pub use messages::*;
