//! Decoding of server frames and encoding of client replies.
//!
//! Decoding works on a frame body as returned by
//! [`FrameDecoder::next_frame`](crate::protocol::FrameDecoder::next_frame),
//! that is without the 4-byte length prefix. Encoding writes the prefix too,
//! into a fixed [`ReplyBuffer`].

use thiserror::Error;

use crate::protocol::frame::FRAME_HEADER_SIZE;
use crate::protocol::messages::{
    CommandTag, Hello, MouseButton, ProtocolName, Rejection, Reply, ServerCommand,
    ENTER_SEQUENCE_MIN_LEN, HELLO_MIN_LEN, PROTOCOL_MAJOR, PROTOCOL_MINOR, TAG_LEN,
};

/// Capacity of the reply buffer, length prefix included.
pub const REPLY_BUFFER_SIZE: usize = 256;

/// Errors that can occur while decoding a frame or encoding a reply.
///
/// None of these end a session on their own. The session logs them and drops
/// the frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The body is shorter than the layout of its command requires.
    #[error("{what}: need at least {needed} bytes, got {available}")]
    InsufficientData {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    /// The body does not start with a command tag this client knows.
    #[error("unknown command tag {}", String::from_utf8_lossy(.0))]
    UnknownCommand([u8; 4]),

    /// A hello was expected but the body names no recognized protocol.
    #[error("hello does not start with a recognized protocol name")]
    UnrecognizedHello,

    /// The encoded reply would not fit in the reply buffer.
    #[error("reply needs {needed} bytes, reply buffer holds {capacity}")]
    ReplyOverflow { needed: usize, capacity: usize },
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decodes the first frame of a session.
///
/// # Errors
///
/// [`ProtocolError::UnrecognizedHello`] if the body does not begin with
/// `Synergy`, `Barrier`, or `Deskflow`, and
/// [`ProtocolError::InsufficientData`] if the version fields are missing.
///
/// # Examples
///
/// ```rust
/// use hidflow_core::protocol::{decode_hello, ProtocolName};
///
/// let hello = decode_hello(b"Barrier\x00\x01\x00\x06").unwrap();
/// assert_eq!(hello.name, ProtocolName::Barrier);
/// assert_eq!((hello.major, hello.minor), (1, 6));
/// ```
pub fn decode_hello(body: &[u8]) -> Result<Hello, ProtocolError> {
    require_len(body, HELLO_MIN_LEN, "hello")?;
    let name = ProtocolName::detect(body).ok_or(ProtocolError::UnrecognizedHello)?;
    let offset = name.as_bytes().len();
    require_len(body, offset + 4, "hello")?;

    Ok(Hello {
        name,
        major: read_u16(body, offset)?,
        minor: read_u16(body, offset + 2)?,
    })
}

/// Decodes one command frame body.
///
/// # Errors
///
/// [`ProtocolError::UnknownCommand`] for tags outside the command table and
/// [`ProtocolError::InsufficientData`] when the body is shorter than the
/// command's minimum length.
pub fn decode_command(body: &[u8]) -> Result<ServerCommand, ProtocolError> {
    let tag = read_tag(body)?;
    let command = CommandTag::from_bytes(&tag).ok_or(ProtocolError::UnknownCommand(tag))?;
    require_len(body, command.min_len(), tag_name(command))?;

    let decoded = match command {
        CommandTag::QueryInfo => ServerCommand::QueryInfo,
        CommandTag::InfoAck => ServerCommand::InfoAck,
        CommandTag::ResetOptions => ServerCommand::ResetOptions,
        CommandTag::SetOptions => ServerCommand::SetOptions,
        CommandTag::KeepAlive => ServerCommand::KeepAlive,
        CommandTag::Enter => ServerCommand::Enter {
            sequence: if body.len() >= ENTER_SEQUENCE_MIN_LEN {
                Some(read_u32(body, 8)?)
            } else {
                None
            },
        },
        CommandTag::Leave => ServerCommand::Leave,
        CommandTag::MouseMove => ServerCommand::MouseMove {
            x: read_i16(body, 4)?,
            y: read_i16(body, 6)?,
        },
        CommandTag::MouseDown => ServerCommand::MouseDown {
            button: MouseButton::from_wire(body[4]),
        },
        CommandTag::MouseUp => ServerCommand::MouseUp {
            button: MouseButton::from_wire(body[4]),
        },
        CommandTag::MouseWheel => ServerCommand::MouseWheel {
            x: read_i16(body, 4)?,
            y: read_i16(body, 6)?,
        },
        CommandTag::KeyDown => ServerCommand::KeyDown {
            modifiers: read_u16(body, 6)?,
            key: read_u16(body, 8)?,
        },
        CommandTag::KeyUp => ServerCommand::KeyUp {
            modifiers: read_u16(body, 6)?,
            key: read_u16(body, 8)?,
        },
        CommandTag::KeyRepeat => ServerCommand::KeyRepeat {
            modifiers: read_u16(body, 6)?,
            key: read_u16(body, 10)?,
        },
        CommandTag::NoOp => ServerCommand::NoOp,
        CommandTag::UnknownClient => ServerCommand::Rejected(Rejection::UnknownClient),
        CommandTag::Busy => ServerCommand::Rejected(Rejection::Busy),
        CommandTag::BadVersion => ServerCommand::Rejected(Rejection::BadVersion),
        CommandTag::ClipboardData => ServerCommand::ClipboardData,
    };
    Ok(decoded)
}

/// Reads the 4-byte tag at the start of a command body.
pub fn read_tag(body: &[u8]) -> Result<[u8; 4], ProtocolError> {
    require_len(body, TAG_LEN, "command tag")?;
    Ok([body[0], body[1], body[2], body[3]])
}

fn tag_name(tag: CommandTag) -> &'static str {
    std::str::from_utf8(tag.as_bytes()).unwrap_or("command")
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Fixed-size scratch buffer for outgoing frames.
///
/// Each [`encode`](Self::encode) overwrites the previous reply. The returned
/// slice includes the big-endian length prefix and is ready to be written to
/// the transport as is.
#[derive(Debug, Clone)]
pub struct ReplyBuffer {
    buf: [u8; REPLY_BUFFER_SIZE],
    len: usize,
}

impl Default for ReplyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplyBuffer {
    pub fn new() -> Self {
        Self {
            buf: [0u8; REPLY_BUFFER_SIZE],
            len: 0,
        }
    }

    /// Encodes `reply` as a complete frame.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::ReplyOverflow`] if the frame does not fit in
    /// [`REPLY_BUFFER_SIZE`] bytes. Nothing usable is left in the buffer then.
    pub fn encode(&mut self, reply: &Reply<'_>) -> Result<&[u8], ProtocolError> {
        self.len = FRAME_HEADER_SIZE;
        match reply {
            Reply::Hello { name, client_name } => {
                self.put(name.as_bytes())?;
                self.put(&PROTOCOL_MAJOR.to_be_bytes())?;
                self.put(&PROTOCOL_MINOR.to_be_bytes())?;
                let name_bytes = client_name.as_bytes();
                self.put(&(name_bytes.len() as u32).to_be_bytes())?;
                self.put(name_bytes)?;
            }
            Reply::ScreenInfo { width, height } => {
                self.put(b"DINF")?;
                self.put(&0u16.to_be_bytes())?; // x origin
                self.put(&0u16.to_be_bytes())?; // y origin
                self.put(&width.to_be_bytes())?;
                self.put(&height.to_be_bytes())?;
                self.put(&0u16.to_be_bytes())?; // warp zone
                self.put(&0u16.to_be_bytes())?; // cursor x
                self.put(&0u16.to_be_bytes())?; // cursor y
            }
            Reply::KeepAlive => self.put(CommandTag::KeepAlive.as_bytes())?,
            Reply::NoOp => self.put(CommandTag::NoOp.as_bytes())?,
        }

        let body_len = (self.len - FRAME_HEADER_SIZE) as u32;
        self.buf[..FRAME_HEADER_SIZE].copy_from_slice(&body_len.to_be_bytes());
        Ok(&self.buf[..self.len])
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        let end = self.len + bytes.len();
        if end > REPLY_BUFFER_SIZE {
            self.len = 0;
            return Err(ProtocolError::ReplyOverflow {
                needed: end,
                capacity: REPLY_BUFFER_SIZE,
            });
        }
        self.buf[self.len..end].copy_from_slice(bytes);
        self.len = end;
        Ok(())
    }
}

/// Encodes `reply` into `buf`; shorthand for [`ReplyBuffer::encode`].
///
/// # Errors
///
/// See [`ReplyBuffer::encode`].
pub fn encode_reply<'b>(buf: &'b mut ReplyBuffer, reply: &Reply<'_>) -> Result<&'b [u8], ProtocolError> {
    buf.encode(reply)
}

// ── Field helpers ─────────────────────────────────────────────────────────────

fn require_len(buf: &[u8], needed: usize, what: &'static str) -> Result<(), ProtocolError> {
    if buf.len() < needed {
        Err(ProtocolError::InsufficientData {
            what,
            needed,
            available: buf.len(),
        })
    } else {
        Ok(())
    }
}

fn read_u16(buf: &[u8], offset: usize) -> Result<u16, ProtocolError> {
    require_len(buf, offset + 2, "u16 field")?;
    Ok(u16::from_be_bytes([buf[offset], buf[offset + 1]]))
}

fn read_i16(buf: &[u8], offset: usize) -> Result<i16, ProtocolError> {
    read_u16(buf, offset).map(|v| v as i16)
}

fn read_u32(buf: &[u8], offset: usize) -> Result<u32, ProtocolError> {
    require_len(buf, offset + 4, "u32 field")?;
    Ok(u32::from_be_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hello_reads_version_after_eight_byte_name() {
        // Arrange
        let body = b"Deskflow\x00\x01\x00\x08";

        // Act
        let hello = decode_hello(body).expect("decode");

        // Assert
        assert_eq!(hello.name, ProtocolName::Deskflow);
        assert_eq!(hello.major, 1);
        assert_eq!(hello.minor, 8);
    }

    #[test]
    fn test_decode_hello_rejects_body_below_minimum_length() {
        let result = decode_hello(b"Synergy\x00\x01");
        assert!(matches!(
            result,
            Err(ProtocolError::InsufficientData { needed: 11, available: 9, .. })
        ));
    }

    #[test]
    fn test_decode_hello_needs_twelve_bytes_for_deskflow() {
        let result = decode_hello(b"Deskflow\x00\x01\x00");
        assert!(matches!(
            result,
            Err(ProtocolError::InsufficientData { needed: 12, .. })
        ));
    }

    #[test]
    fn test_decode_hello_rejects_unknown_name() {
        assert_eq!(
            decode_hello(b"Teleport\x00\x01\x00\x06"),
            Err(ProtocolError::UnrecognizedHello)
        );
    }

    #[test]
    fn test_decode_mouse_move_reads_signed_coordinates() {
        // Arrange: x = -2, y = 300
        let body = b"DMMV\xFF\xFE\x01\x2C";

        // Act
        let cmd = decode_command(body).expect("decode");

        // Assert
        assert_eq!(cmd, ServerCommand::MouseMove { x: -2, y: 300 });
    }

    #[test]
    fn test_decode_key_down_reads_modifiers_then_key() {
        // Arrange: id=0x0061, modifiers=0x0002, key=0x001E
        let body = b"DKDN\x00\x61\x00\x02\x00\x1E";

        // Act / Assert
        assert_eq!(
            decode_command(body),
            Ok(ServerCommand::KeyDown { key: 0x1E, modifiers: 0x0002 })
        );
    }

    #[test]
    fn test_decode_key_repeat_reads_key_at_offset_ten() {
        // Arrange: id, modifiers=0x0001, count=0x0003, key=0x0030
        let body = b"DKRP\x00\x62\x00\x01\x00\x03\x00\x30";

        // Act / Assert
        assert_eq!(
            decode_command(body),
            Ok(ServerCommand::KeyRepeat { key: 0x30, modifiers: 0x0001 })
        );
    }

    #[test]
    fn test_decode_enter_records_sequence_only_when_present() {
        let full = b"CINN\x00\x10\x00\x20\x00\x00\x00\x2A\x00\x00";
        let short = b"CINN\x00\x10\x00\x20";

        assert_eq!(
            decode_command(full),
            Ok(ServerCommand::Enter { sequence: Some(42) })
        );
        assert_eq!(decode_command(short), Ok(ServerCommand::Enter { sequence: None }));
    }

    #[test]
    fn test_decode_rejects_frames_shorter_than_tag_minimum() {
        let result = decode_command(b"DKDN\x00\x61\x00\x02\x00");
        assert_eq!(
            result,
            Err(ProtocolError::InsufficientData {
                what: "DKDN",
                needed: 10,
                available: 9
            })
        );
    }

    #[test]
    fn test_decode_accepts_wire_size_bodies() {
        // Arrange: exact body sizes as sent by a Deskflow server
        let cases: &[(&[u8], ServerCommand)] = &[
            (&b"DMMV\x00\x64\x00\xC8"[..], ServerCommand::MouseMove { x: 100, y: 200 }),
            (&b"DMDN\x01"[..], ServerCommand::MouseDown { button: MouseButton::Left }),
            (&b"DMUP\x03"[..], ServerCommand::MouseUp { button: MouseButton::Right }),
            (&b"DMWM\x00\x00\x00\x78"[..], ServerCommand::MouseWheel { x: 0, y: 120 }),
            (&b"DKDN\x00\x61\x00\x00\x00\x1E"[..], ServerCommand::KeyDown { key: 0x1E, modifiers: 0 }),
            (&b"DKUP\x00\x61\x00\x00\x00\x1E"[..], ServerCommand::KeyUp { key: 0x1E, modifiers: 0 }),
            (
                &b"DKRP\x00\x61\x00\x00\x00\x02\x00\x1E"[..],
                ServerCommand::KeyRepeat { key: 0x1E, modifiers: 0 },
            ),
            (
                &b"CINN\x00\x10\x00\x20\x00\x00\x00\x05\x00\x00"[..],
                ServerCommand::Enter { sequence: Some(5) },
            ),
        ];

        for (body, expected) in cases {
            // Act / Assert
            assert_eq!(decode_command(body).as_ref(), Ok(expected), "{body:?}");
        }
    }

    #[test]
    fn test_decode_button_frame_without_button_byte_is_dropped() {
        assert!(matches!(
            decode_command(b"DMDN"),
            Err(ProtocolError::InsufficientData { needed: 5, available: 4, .. })
        ));
    }

    #[test]
    fn test_decode_unknown_tag_is_reported_with_tag_bytes() {
        // Act
        let err = decode_command(b"DFTR\x00\x00").unwrap_err();

        // Assert
        assert_eq!(err, ProtocolError::UnknownCommand(*b"DFTR"));
        assert_eq!(err.to_string(), "unknown command tag DFTR");
    }

    #[test]
    fn test_decode_server_errors_as_rejections() {
        assert_eq!(decode_command(b"EUNK"), Ok(ServerCommand::Rejected(Rejection::UnknownClient)));
        assert_eq!(decode_command(b"EBSY"), Ok(ServerCommand::Rejected(Rejection::Busy)));
        assert_eq!(decode_command(b"EBAD\x00\x01\x00\x06"), Ok(ServerCommand::Rejected(Rejection::BadVersion)));
    }

    #[test]
    fn test_encode_hello_reply_layout() {
        // Arrange
        let mut buf = ReplyBuffer::new();
        let reply = Reply::Hello {
            name: ProtocolName::Deskflow,
            client_name: "desk",
        };

        // Act
        let frame = buf.encode(&reply).expect("encode").to_vec();

        // Assert
        let mut expected = Vec::new();
        expected.extend_from_slice(&20u32.to_be_bytes());
        expected.extend_from_slice(b"Deskflow");
        expected.extend_from_slice(&[0, 1, 0, 6]);
        expected.extend_from_slice(&4u32.to_be_bytes());
        expected.extend_from_slice(b"desk");
        assert_eq!(frame, expected);
    }

    #[test]
    fn test_encode_screen_info_layout() {
        // Arrange
        let mut buf = ReplyBuffer::new();

        // Act
        let frame = encode_reply(&mut buf, &Reply::ScreenInfo { width: 1920, height: 1080 })
            .expect("encode")
            .to_vec();

        // Assert
        assert_eq!(
            frame,
            vec![
                0, 0, 0, 18, b'D', b'I', b'N', b'F', 0, 0, 0, 0, 0x07, 0x80, 0x04, 0x38, 0, 0, 0,
                0, 0, 0
            ]
        );
    }

    #[test]
    fn test_encode_overwrites_previous_reply() {
        // Arrange
        let mut buf = ReplyBuffer::new();
        buf.encode(&Reply::ScreenInfo { width: 1, height: 1 }).expect("encode");

        // Act
        let frame = buf.encode(&Reply::NoOp).expect("encode");

        // Assert
        assert_eq!(frame, b"\x00\x00\x00\x04CNOP");
    }

    #[test]
    fn test_encode_overflow_is_an_error() {
        // Arrange
        let mut buf = ReplyBuffer::new();
        let long_name = "n".repeat(REPLY_BUFFER_SIZE);

        // Act
        let result = buf.encode(&Reply::Hello {
            name: ProtocolName::Synergy,
            client_name: &long_name,
        });

        // Assert
        assert!(matches!(result, Err(ProtocolError::ReplyOverflow { capacity: 256, .. })));
    }
}
