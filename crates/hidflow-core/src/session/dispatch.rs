//! Per-frame handling: the hello exchange and the command table.

use std::collections::HashSet;

use tracing::{debug, info, trace, warn};

use crate::domain::keys::KeyEvent;
use crate::domain::pointer::{PointerEventKind, PointerState, PointerTranslator};
use crate::keymap::{translate_key, translate_modifiers};
use crate::protocol::codec::{decode_command, decode_hello, ProtocolError, ReplyBuffer};
use crate::protocol::messages::{ProtocolName, Reply, ServerCommand};

use super::{FrameWriter, InputEvents, SessionConfig, SessionState};

/// Distinct unknown tags remembered for log suppression.
const MAX_TRACKED_UNKNOWN_TAGS: usize = 32;

/// What the session must do after a frame was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Reset,
}

/// Everything a session owns apart from its receive window.
///
/// Kept separate from the frame decoder so a frame body borrowed from the
/// window can be dispatched against it.
#[derive(Debug)]
pub(crate) struct Dispatcher {
    pub(crate) config: SessionConfig,
    pub(crate) state: SessionState,
    pub(crate) protocol: Option<ProtocolName>,
    pub(crate) pointer: PointerState,
    pub(crate) sequence: Option<u32>,
    translator: PointerTranslator,
    replies: ReplyBuffer,
    unknown_tags: HashSet<[u8; 4]>,
}

impl Dispatcher {
    pub(crate) fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::Idle,
            protocol: None,
            pointer: PointerState::default(),
            sequence: None,
            translator: PointerTranslator::new(),
            replies: ReplyBuffer::new(),
            unknown_tags: HashSet::new(),
        }
    }

    /// Replaces all state with a fresh one, keeping only the configuration.
    pub(crate) fn reset(&mut self) {
        let config = std::mem::take(&mut self.config);
        *self = Self::new(config);
    }

    pub(crate) fn handle_frame(
        &mut self,
        body: &[u8],
        writer: &mut dyn FrameWriter,
        events: &mut dyn InputEvents,
    ) -> Flow {
        match self.state {
            SessionState::Active { captured } => self.handle_command(body, captured, writer, events),
            SessionState::Idle | SessionState::HandshakePending => self.handle_hello(body, writer),
        }
    }

    // ── Handshake ─────────────────────────────────────────────────────────────

    fn handle_hello(&mut self, body: &[u8], writer: &mut dyn FrameWriter) -> Flow {
        let hello = match decode_hello(body) {
            Ok(hello) => hello,
            Err(err) => {
                warn!(error = %err, len = body.len(), "first frame is not a valid hello, resetting session");
                return Flow::Reset;
            }
        };
        info!(
            protocol = %hello.name,
            major = hello.major,
            minor = hello.minor,
            "server hello"
        );

        let reply = Reply::Hello {
            name: hello.name,
            client_name: &self.config.client_name,
        };
        match self.replies.encode(&reply) {
            Ok(frame) => {
                if writer.write_frame(frame) {
                    self.state = SessionState::Active { captured: false };
                    self.protocol = Some(hello.name);
                    info!(client = %self.config.client_name, "handshake complete");
                } else {
                    warn!("failed to send hello reply, handshake stays pending");
                }
            }
            Err(err) => warn!(error = %err, "cannot encode hello reply"),
        }
        Flow::Continue
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    fn handle_command(
        &mut self,
        body: &[u8],
        captured: bool,
        writer: &mut dyn FrameWriter,
        events: &mut dyn InputEvents,
    ) -> Flow {
        let command = match decode_command(body) {
            Ok(command) => command,
            Err(ProtocolError::UnknownCommand(tag)) => {
                self.note_unknown_tag(tag);
                return Flow::Continue;
            }
            Err(err) => {
                debug!(error = %err, "dropping malformed frame");
                return Flow::Continue;
            }
        };

        match command {
            ServerCommand::QueryInfo => {
                debug!(width = self.config.screen_width, height = self.config.screen_height, "sending screen info");
                self.reply(
                    &Reply::ScreenInfo {
                        width: self.config.screen_width,
                        height: self.config.screen_height,
                    },
                    writer,
                );
            }
            ServerCommand::InfoAck
            | ServerCommand::ResetOptions
            | ServerCommand::SetOptions
            | ServerCommand::NoOp => {}
            ServerCommand::KeepAlive => {
                self.reply(&Reply::KeepAlive, writer);
                self.reply(&Reply::NoOp, writer);
            }
            ServerCommand::Enter { sequence } => {
                if sequence.is_some() {
                    self.sequence = sequence;
                }
                self.state = SessionState::Active { captured: true };
                self.translator.reset();
                info!(sequence = ?self.sequence, "screen entered");
                events.on_screen_active(true);
                self.reply(&Reply::NoOp, writer);
            }
            ServerCommand::Leave => {
                self.state = SessionState::Active { captured: false };
                self.pointer.release_buttons();
                info!("screen left");
                events.on_screen_active(false);
                self.reply(&Reply::NoOp, writer);
            }
            ServerCommand::Rejected(reason) => {
                warn!(%reason, client = %self.config.client_name, "server rejected session");
                return Flow::Reset;
            }
            ServerCommand::ClipboardData => trace!("ignoring clipboard data"),
            input if !captured => trace!(?input, "input while not captured, ignored"),
            ServerCommand::MouseMove { x, y } => {
                self.pointer.x = x;
                self.pointer.y = y;
                self.emit_pointer(PointerEventKind::Move, events);
            }
            ServerCommand::MouseDown { button } | ServerCommand::MouseUp { button } => {
                let pressed = matches!(command, ServerCommand::MouseDown { .. });
                if self.pointer.set_button(button, pressed) {
                    self.emit_pointer(PointerEventKind::Button, events);
                } else {
                    debug!(?button, "ignoring unsupported mouse button");
                }
            }
            ServerCommand::MouseWheel { x, y } => {
                self.pointer.wheel_x = x;
                self.pointer.wheel_y = y;
                self.emit_pointer(PointerEventKind::Wheel, events);
                self.pointer.wheel_x = 0;
                self.pointer.wheel_y = 0;
            }
            ServerCommand::KeyDown { key, modifiers } => self.emit_key(key, modifiers, true, false, events),
            ServerCommand::KeyUp { key, modifiers } => self.emit_key(key, modifiers, false, false, events),
            ServerCommand::KeyRepeat { key, modifiers } => self.emit_key(key, modifiers, true, true, events),
        }
        Flow::Continue
    }

    fn emit_pointer(&mut self, kind: PointerEventKind, events: &mut dyn InputEvents) {
        let motion = self.translator.translate(kind, &self.pointer);
        trace!(?kind, x = self.pointer.x, y = self.pointer.y, ?motion, "pointer event");
        events.on_pointer(motion);
    }

    fn emit_key(&mut self, key: u16, modifiers: u16, pressed: bool, repeat: bool, events: &mut dyn InputEvents) {
        let Some(hid) = translate_key(key) else {
            debug!(key, pressed, "no HID mapping for key, dropped");
            return;
        };
        let event = KeyEvent {
            key: hid,
            modifiers: translate_modifiers(modifiers),
            pressed,
            repeat,
        };
        debug!(key, ?hid, pressed, repeat, "key event");
        events.on_key(event);
    }

    fn reply(&mut self, reply: &Reply<'_>, writer: &mut dyn FrameWriter) {
        match self.replies.encode(reply) {
            Ok(frame) => {
                if !writer.write_frame(frame) {
                    debug!(?reply, "reply write failed");
                }
            }
            Err(err) => warn!(error = %err, "cannot encode reply"),
        }
    }

    fn note_unknown_tag(&mut self, tag: [u8; 4]) {
        if self.unknown_tags.contains(&tag) || self.unknown_tags.len() >= MAX_TRACKED_UNKNOWN_TAGS {
            return;
        }
        self.unknown_tags.insert(tag);
        info!(tag = %String::from_utf8_lossy(&tag), "ignoring unknown command");
    }

    #[cfg(test)]
    pub(crate) fn unknown_tag_count(&self) -> usize {
        self.unknown_tags.len()
    }
}
