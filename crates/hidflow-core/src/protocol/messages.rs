//! Synergy wire protocol vocabulary.
//!
//! Every frame body after the hello starts with a 4-byte ASCII command tag.
//! Multi-byte integers are big-endian throughout.

// ── Protocol constants ────────────────────────────────────────────────────────

/// Major protocol version this client announces in its hello reply.
pub const PROTOCOL_MAJOR: u16 = 1;

/// Minor protocol version this client announces in its hello reply.
pub const PROTOCOL_MINOR: u16 = 6;

/// Default TCP port of Synergy, Barrier, and Deskflow servers.
pub const DEFAULT_PORT: u16 = 24800;

/// Shortest hello body: a 7-byte protocol name plus two `u16` version fields.
pub const HELLO_MIN_LEN: usize = 11;

/// Length of the ASCII command tag at the start of every command body.
pub const TAG_LEN: usize = 4;

/// Longest client name sent in the hello reply, in bytes.
pub const MAX_CLIENT_NAME_LEN: usize = 63;

// ── Protocol names ────────────────────────────────────────────────────────────

/// The protocol name a server greets with. The reply echoes the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolName {
    Synergy,
    Barrier,
    Deskflow,
}

impl ProtocolName {
    /// Recognizes the protocol name at the start of a hello body.
    ///
    /// `"Deskflow"` is checked first because it is the only 8-byte name.
    pub fn detect(body: &[u8]) -> Option<Self> {
        [Self::Deskflow, Self::Synergy, Self::Barrier]
            .into_iter()
            .find(|name| body.starts_with(name.as_bytes()))
    }

    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Synergy => b"Synergy",
            Self::Barrier => b"Barrier",
            Self::Deskflow => b"Deskflow",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Synergy => "Synergy",
            Self::Barrier => "Barrier",
            Self::Deskflow => "Deskflow",
        }
    }
}

impl std::fmt::Display for ProtocolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded server hello.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hello {
    pub name: ProtocolName,
    pub major: u16,
    pub minor: u16,
}

// ── Command tags ──────────────────────────────────────────────────────────────

/// Every command tag this client understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandTag {
    /// `QINF`: server asks for screen geometry.
    QueryInfo,
    /// `CIAK`: server acknowledged our screen info.
    InfoAck,
    /// `CROP`: reset options.
    ResetOptions,
    /// `DSOP`: set options.
    SetOptions,
    /// `CALV`: keep-alive.
    KeepAlive,
    /// `CINN`: the cursor entered this screen.
    Enter,
    /// `COUT`: the cursor left this screen.
    Leave,
    /// `DMMV`: absolute pointer move.
    MouseMove,
    /// `DMDN`: pointer button press.
    MouseDown,
    /// `DMUP`: pointer button release.
    MouseUp,
    /// `DMWM`: wheel motion.
    MouseWheel,
    /// `DKDN`: key press.
    KeyDown,
    /// `DKUP`: key release.
    KeyUp,
    /// `DKRP`: key auto-repeat.
    KeyRepeat,
    /// `CNOP`: no-op.
    NoOp,
    /// `EUNK`: server does not know our client name.
    UnknownClient,
    /// `EBSY`: server already has a client with our name.
    Busy,
    /// `EBAD`: incompatible protocol version.
    BadVersion,
    /// `DCLP`: clipboard payload.
    ClipboardData,
}

impl CommandTag {
    /// Exact match of a 4-byte tag; no prefix matching.
    pub fn from_bytes(tag: &[u8; 4]) -> Option<Self> {
        Some(match tag {
            b"QINF" => Self::QueryInfo,
            b"CIAK" => Self::InfoAck,
            b"CROP" => Self::ResetOptions,
            b"DSOP" => Self::SetOptions,
            b"CALV" => Self::KeepAlive,
            b"CINN" => Self::Enter,
            b"COUT" => Self::Leave,
            b"DMMV" => Self::MouseMove,
            b"DMDN" => Self::MouseDown,
            b"DMUP" => Self::MouseUp,
            b"DMWM" => Self::MouseWheel,
            b"DKDN" => Self::KeyDown,
            b"DKUP" => Self::KeyUp,
            b"DKRP" => Self::KeyRepeat,
            b"CNOP" => Self::NoOp,
            b"EUNK" => Self::UnknownClient,
            b"EBSY" => Self::Busy,
            b"EBAD" => Self::BadVersion,
            b"DCLP" => Self::ClipboardData,
            _ => return None,
        })
    }

    pub fn as_bytes(self) -> &'static [u8; 4] {
        match self {
            Self::QueryInfo => b"QINF",
            Self::InfoAck => b"CIAK",
            Self::ResetOptions => b"CROP",
            Self::SetOptions => b"DSOP",
            Self::KeepAlive => b"CALV",
            Self::Enter => b"CINN",
            Self::Leave => b"COUT",
            Self::MouseMove => b"DMMV",
            Self::MouseDown => b"DMDN",
            Self::MouseUp => b"DMUP",
            Self::MouseWheel => b"DMWM",
            Self::KeyDown => b"DKDN",
            Self::KeyUp => b"DKUP",
            Self::KeyRepeat => b"DKRP",
            Self::NoOp => b"CNOP",
            Self::UnknownClient => b"EUNK",
            Self::Busy => b"EBSY",
            Self::BadVersion => b"EBAD",
            Self::ClipboardData => b"DCLP",
        }
    }

    /// Minimum body length, tag included, below which the frame is dropped.
    ///
    /// The body starts at the tag; the 4-byte length prefix is not counted.
    ///
    /// `CINN` is the exception: a shorter body still enters the screen, only
    /// the sequence number is missing. See [`ENTER_SEQUENCE_MIN_LEN`].
    pub fn min_len(self) -> usize {
        match self {
            Self::MouseMove | Self::MouseWheel => 8,
            Self::MouseDown | Self::MouseUp => 5,
            Self::KeyDown | Self::KeyUp => 10,
            Self::KeyRepeat => 12,
            _ => TAG_LEN,
        }
    }

    /// Server rejections that end the session.
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::UnknownClient | Self::Busy | Self::BadVersion)
    }
}

/// `CINN` bodies at least this long carry a sequence number at offset 8.
pub const ENTER_SEQUENCE_MIN_LEN: usize = 12;

// ── Decoded commands ──────────────────────────────────────────────────────────

/// A pointer button as numbered on the wire (`byte - 1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    /// Any other index; carried so it can be logged, never forwarded.
    Other(u8),
}

impl MouseButton {
    /// Maps the raw `DMDN`/`DMUP` button byte to a button.
    pub fn from_wire(raw: u8) -> Self {
        match raw.wrapping_sub(1) {
            0 => Self::Left,
            1 => Self::Middle,
            2 => Self::Right,
            other => Self::Other(other),
        }
    }
}

/// Why the server refused the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    UnknownClient,
    Busy,
    BadVersion,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::UnknownClient => "unknown client name",
            Self::Busy => "server busy",
            Self::BadVersion => "incompatible protocol version",
        })
    }
}

/// A fully decoded command frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerCommand {
    QueryInfo,
    InfoAck,
    ResetOptions,
    SetOptions,
    KeepAlive,
    Enter { sequence: Option<u32> },
    Leave,
    MouseMove { x: i16, y: i16 },
    MouseDown { button: MouseButton },
    MouseUp { button: MouseButton },
    MouseWheel { x: i16, y: i16 },
    KeyDown { key: u16, modifiers: u16 },
    KeyUp { key: u16, modifiers: u16 },
    KeyRepeat { key: u16, modifiers: u16 },
    NoOp,
    Rejected(Rejection),
    ClipboardData,
}

// ── Replies ───────────────────────────────────────────────────────────────────

/// Frames this client sends back to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply<'a> {
    /// Hello reply: protocol name, our version, and the client name.
    Hello {
        name: ProtocolName,
        client_name: &'a str,
    },
    /// `DINF`: screen geometry with origin, warp zone, and cursor all zero.
    ScreenInfo { width: u16, height: u16 },
    /// `CALV` echo.
    KeepAlive,
    /// `CNOP`.
    NoOp,
}
