//! Session state machine on top of the frame decoder.
//!
//! ```text
//! Idle ──bytes──> HandshakePending ──hello──> Active { captured: false }
//!                                               │  CINN ──> captured: true
//!                                               │  COUT ──> captured: false
//!  any state ──EUNK/EBSY/EBAD, bad hello, reset()──> Idle
//! ```
//!
//! A [`Session`] is driven by handing it whatever bytes the transport had
//! available. Replies go out through a [`FrameWriter`] and translated input
//! comes out through [`InputEvents`], both synchronously within the call.

mod dispatch;

use tracing::debug;

use crate::domain::keys::KeyEvent;
use crate::domain::pointer::{PointerMotion, PointerState};
use crate::protocol::frame::{FrameDecoder, FrameStats};
use crate::protocol::messages::{ProtocolName, MAX_CLIENT_NAME_LEN};

use dispatch::{Dispatcher, Flow};

/// Screen name announced when none is configured.
pub const DEFAULT_CLIENT_NAME: &str = "hidflow-bridge";

/// Virtual screen width announced when none is configured.
pub const DEFAULT_SCREEN_WIDTH: u16 = 1920;

/// Virtual screen height announced when none is configured.
pub const DEFAULT_SCREEN_HEIGHT: u16 = 1080;

// ── Collaborator traits ───────────────────────────────────────────────────────

/// Outgoing half of the transport.
pub trait FrameWriter {
    /// Writes one complete frame, length prefix included.
    ///
    /// Returns `false` if the frame could not be written in full. The session
    /// treats replies as best effort and carries on either way.
    fn write_frame(&mut self, frame: &[u8]) -> bool;
}

/// Collects written frames back to back. Useful in tests and benchmarks.
impl FrameWriter for Vec<u8> {
    fn write_frame(&mut self, frame: &[u8]) -> bool {
        self.extend_from_slice(frame);
        true
    }
}

/// Receiver of translated input.
pub trait InputEvents {
    /// Pointer moved, a button changed, or the wheel turned.
    fn on_pointer(&mut self, motion: PointerMotion);

    /// A key with a HID mapping was pressed, released, or repeated.
    fn on_key(&mut self, event: KeyEvent);

    /// The server moved the cursor onto (`true`) or off (`false`) this screen.
    fn on_screen_active(&mut self, active: bool);
}

// ── Configuration and state ───────────────────────────────────────────────────

/// Values this client announces to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Screen name; must match a screen configured on the server.
    pub client_name: String,
    pub screen_width: u16,
    pub screen_height: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            screen_width: DEFAULT_SCREEN_WIDTH,
            screen_height: DEFAULT_SCREEN_HEIGHT,
        }
    }
}

impl SessionConfig {
    /// Builds a configuration, truncating the client name to
    /// [`MAX_CLIENT_NAME_LEN`] bytes. An empty name falls back to
    /// [`DEFAULT_CLIENT_NAME`].
    pub fn new(client_name: &str, screen_width: u16, screen_height: u16) -> Self {
        let client_name = if client_name.trim().is_empty() {
            DEFAULT_CLIENT_NAME.to_string()
        } else {
            truncate_to_boundary(client_name.trim(), MAX_CLIENT_NAME_LEN).to_string()
        };
        Self {
            client_name,
            screen_width,
            screen_height,
        }
    }
}

fn truncate_to_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Handshake and capture state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing received since the last reset.
    #[default]
    Idle,
    /// Bytes received, but no hello has completed yet.
    HandshakePending,
    /// Hello answered. `captured` is `true` while the cursor is on this screen.
    Active { captured: bool },
}

// ── Session ───────────────────────────────────────────────────────────────────

/// One protocol session with a server.
///
/// # Examples
///
/// ```rust
/// use hidflow_core::domain::keys::KeyEvent;
/// use hidflow_core::domain::pointer::PointerMotion;
/// use hidflow_core::session::{InputEvents, Session, SessionConfig, SessionState};
///
/// struct Ignore;
/// impl InputEvents for Ignore {
///     fn on_pointer(&mut self, _: PointerMotion) {}
///     fn on_key(&mut self, _: KeyEvent) {}
///     fn on_screen_active(&mut self, _: bool) {}
/// }
///
/// let mut session = Session::new(SessionConfig::default());
/// let mut replies = Vec::new();
/// session.receive(b"\x00\x00\x00\x0BSynergy\x00\x01\x00\x06", &mut replies, &mut Ignore);
///
/// assert_eq!(session.state(), SessionState::Active { captured: false });
/// assert!(replies.starts_with(b"\x00\x00\x00\x1DSynergy\x00\x01\x00\x06"));
/// ```
#[derive(Debug)]
pub struct Session {
    decoder: FrameDecoder,
    dispatcher: Dispatcher,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_decoder(config, FrameDecoder::new())
    }

    /// Creates a session around a custom decoder (a smaller window in tests).
    pub fn with_decoder(config: SessionConfig, decoder: FrameDecoder) -> Self {
        Self {
            decoder,
            dispatcher: Dispatcher::new(config),
        }
    }

    pub fn state(&self) -> SessionState {
        self.dispatcher.state
    }

    pub fn is_captured(&self) -> bool {
        matches!(self.dispatcher.state, SessionState::Active { captured: true })
    }

    /// Protocol name the server greeted with, once the handshake completed.
    pub fn protocol(&self) -> Option<ProtocolName> {
        self.dispatcher.protocol
    }

    /// Sequence number from the most recent screen enter that carried one.
    pub fn sequence_number(&self) -> Option<u32> {
        self.dispatcher.sequence
    }

    pub fn pointer(&self) -> &PointerState {
        &self.dispatcher.pointer
    }

    pub fn config(&self) -> &SessionConfig {
        &self.dispatcher.config
    }

    /// Replaces the announced name and geometry.
    ///
    /// Takes effect at the next hello or screen info query.
    pub fn set_config(&mut self, config: SessionConfig) {
        self.dispatcher.config = config;
    }

    pub fn buffered(&self) -> usize {
        self.decoder.buffered()
    }

    pub fn frame_stats(&self) -> FrameStats {
        self.decoder.stats()
    }

    /// Feeds bytes read from the transport and handles every frame they
    /// complete.
    ///
    /// All bytes are consumed regardless of the window size: whenever the
    /// window fills, the frames in it are handled before more is ingested.
    /// If a frame resets the session, the rest of `bytes` is discarded along
    /// with the window.
    pub fn receive(&mut self, bytes: &[u8], writer: &mut dyn FrameWriter, events: &mut dyn InputEvents) {
        if bytes.is_empty() {
            return;
        }
        if self.dispatcher.state == SessionState::Idle {
            self.dispatcher.state = SessionState::HandshakePending;
        }

        let mut rest = bytes;
        while !rest.is_empty() {
            let taken = self.decoder.ingest(rest);
            rest = &rest[taken..];
            if self.drain(writer, events) == Flow::Reset {
                if !rest.is_empty() {
                    debug!(discarded = rest.len(), "session reset, discarding rest of read");
                }
                return;
            }
        }
    }

    fn drain(&mut self, writer: &mut dyn FrameWriter, events: &mut dyn InputEvents) -> Flow {
        while let Some(body) = self.decoder.next_frame() {
            if self.dispatcher.handle_frame(body, writer, events) == Flow::Reset {
                self.reset();
                return Flow::Reset;
            }
        }
        Flow::Continue
    }

    /// Returns to [`SessionState::Idle`], discarding buffered bytes, any
    /// partial frame, handshake progress, and the pointer baseline.
    ///
    /// Configuration and frame statistics survive.
    pub fn reset(&mut self) {
        self.decoder.clear();
        self.dispatcher.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::hid::HidKeyCode;

    #[derive(Default)]
    struct Recorder {
        pointer: Vec<PointerMotion>,
        keys: Vec<KeyEvent>,
        screen: Vec<bool>,
    }

    impl InputEvents for Recorder {
        fn on_pointer(&mut self, motion: PointerMotion) {
            self.pointer.push(motion);
        }
        fn on_key(&mut self, event: KeyEvent) {
            self.keys.push(event);
        }
        fn on_screen_active(&mut self, active: bool) {
            self.screen.push(active);
        }
    }

    struct FailingWriter;

    impl FrameWriter for FailingWriter {
        fn write_frame(&mut self, _frame: &[u8]) -> bool {
            false
        }
    }

    fn frame(body: &[u8]) -> Vec<u8> {
        let mut out = (body.len() as u32).to_be_bytes().to_vec();
        out.extend_from_slice(body);
        out
    }

    fn hello(name: &[u8]) -> Vec<u8> {
        let mut body = name.to_vec();
        body.extend_from_slice(&[0, 1, 0, 6]);
        frame(&body)
    }

    fn mouse_move(x: i16, y: i16) -> Vec<u8> {
        let mut body = b"DMMV".to_vec();
        body.extend_from_slice(&x.to_be_bytes());
        body.extend_from_slice(&y.to_be_bytes());
        frame(&body)
    }

    fn enter() -> Vec<u8> {
        frame(b"CINN\x00\x00\x00\x00\x00\x00\x00\x07\x00\x00")
    }

    fn active_session() -> (Session, Vec<u8>, Recorder) {
        let mut session = Session::new(SessionConfig::new("desk", 1920, 1080));
        let mut out = Vec::new();
        let mut rec = Recorder::default();
        session.receive(&hello(b"Synergy"), &mut out, &mut rec);
        out.clear();
        (session, out, rec)
    }

    #[test]
    fn test_new_session_is_idle() {
        assert_eq!(Session::default().state(), SessionState::Idle);
    }

    #[test]
    fn test_partial_hello_leaves_handshake_pending() {
        // Arrange
        let mut session = Session::default();
        let bytes = hello(b"Deskflow");

        // Act
        session.receive(&bytes[..6], &mut Vec::new(), &mut Recorder::default());

        // Assert
        assert_eq!(session.state(), SessionState::HandshakePending);
        assert_eq!(session.buffered(), 6);
    }

    #[test]
    fn test_deskflow_hello_is_answered_with_same_name() {
        // Arrange
        let mut session = Session::new(SessionConfig::new("desk", 1920, 1080));
        let mut out = Vec::new();

        // Act
        session.receive(&hello(b"Deskflow"), &mut out, &mut Recorder::default());

        // Assert
        let mut expected_body = b"Deskflow\x00\x01\x00\x06".to_vec();
        expected_body.extend_from_slice(&4u32.to_be_bytes());
        expected_body.extend_from_slice(b"desk");
        assert_eq!(out, frame(&expected_body));
        assert_eq!(session.state(), SessionState::Active { captured: false });
        assert_eq!(session.protocol(), Some(ProtocolName::Deskflow));
    }

    #[test]
    fn test_unrecognized_first_frame_resets_session() {
        // Arrange
        let mut session = Session::default();
        let mut out = Vec::new();

        // Act
        session.receive(&frame(b"Teleport\x00\x01\x00\x06"), &mut out, &mut Recorder::default());

        // Assert
        assert_eq!(session.state(), SessionState::Idle);
        assert!(out.is_empty());
        assert_eq!(session.buffered(), 0);
    }

    #[test]
    fn test_failed_hello_write_keeps_handshake_pending() {
        // Arrange
        let mut session = Session::default();

        // Act
        session.receive(&hello(b"Barrier"), &mut FailingWriter, &mut Recorder::default());

        // Assert
        assert_eq!(session.state(), SessionState::HandshakePending);
        assert_eq!(session.buffered(), 0);
    }

    #[test]
    fn test_query_info_is_answered_with_screen_geometry() {
        // Arrange
        let (mut session, mut out, mut rec) = active_session();

        // Act
        session.receive(&frame(b"QINF"), &mut out, &mut rec);

        // Assert
        assert_eq!(
            out,
            frame(b"DINF\x00\x00\x00\x00\x07\x80\x04\x38\x00\x00\x00\x00\x00\x00")
        );
    }

    #[test]
    fn test_keep_alive_is_echoed_then_followed_by_noop() {
        // Arrange
        let (mut session, mut out, mut rec) = active_session();

        // Act
        session.receive(&frame(b"CALV"), &mut out, &mut rec);

        // Assert
        let mut expected = frame(b"CALV");
        expected.extend(frame(b"CNOP"));
        assert_eq!(out, expected);
    }

    #[test]
    fn test_enter_and_leave_toggle_capture_and_reply_noop() {
        // Arrange
        let (mut session, mut out, mut rec) = active_session();

        // Act
        session.receive(&enter(), &mut out, &mut rec);
        let captured_after_enter = session.is_captured();
        session.receive(&frame(b"COUT"), &mut out, &mut rec);

        // Assert
        assert!(captured_after_enter);
        assert!(!session.is_captured());
        assert_eq!(session.sequence_number(), Some(7));
        assert_eq!(rec.screen, vec![true, false]);
        let mut expected = frame(b"CNOP");
        expected.extend(frame(b"CNOP"));
        assert_eq!(out, expected);
    }

    #[test]
    fn test_short_enter_still_captures_without_sequence() {
        // Arrange
        let (mut session, mut out, mut rec) = active_session();

        // Act
        session.receive(&frame(b"CINN\x00\x01\x00\x02"), &mut out, &mut rec);

        // Assert
        assert!(session.is_captured());
        assert_eq!(session.sequence_number(), None);
    }

    #[test]
    fn test_mouse_moves_yield_relative_motion_after_enter() {
        // Arrange
        let (mut session, mut out, mut rec) = active_session();
        session.receive(&enter(), &mut out, &mut rec);

        // Act
        session.receive(&mouse_move(100, 100), &mut out, &mut rec);
        session.receive(&mouse_move(105, 95), &mut out, &mut rec);

        // Assert
        let deltas: Vec<(i8, i8)> = rec.pointer.iter().map(|m| (m.dx, m.dy)).collect();
        assert_eq!(deltas, vec![(0, 0), (5, -5)]);
    }

    #[test]
    fn test_input_before_enter_is_ignored() {
        // Arrange
        let (mut session, mut out, mut rec) = active_session();

        // Act
        session.receive(&mouse_move(10, 10), &mut out, &mut rec);
        session.receive(&frame(b"DKDN\x00\x61\x00\x00\x00\x1E"), &mut out, &mut rec);

        // Assert
        assert!(rec.pointer.is_empty());
        assert!(rec.keys.is_empty());
    }

    #[test]
    fn test_button_press_reports_hid_mask() {
        // Arrange
        let (mut session, mut out, mut rec) = active_session();
        session.receive(&enter(), &mut out, &mut rec);

        // Act: wire button 3 is the right button
        session.receive(&frame(b"DMDN\x03"), &mut out, &mut rec);
        session.receive(&frame(b"DMUP\x03"), &mut out, &mut rec);

        // Assert
        let masks: Vec<u8> = rec.pointer.iter().map(|m| m.buttons).collect();
        assert_eq!(masks, vec![0x02, 0x00]);
    }

    #[test]
    fn test_unknown_button_index_is_ignored() {
        let (mut session, mut out, mut rec) = active_session();
        session.receive(&enter(), &mut out, &mut rec);
        session.receive(&frame(b"DMDN\x09"), &mut out, &mut rec);
        assert!(rec.pointer.is_empty());
    }

    #[test]
    fn test_wheel_is_converted_and_does_not_leak_into_next_move() {
        // Arrange
        let (mut session, mut out, mut rec) = active_session();
        session.receive(&enter(), &mut out, &mut rec);

        // Act: wheel y = 240, then a move
        session.receive(&frame(b"DMWM\x00\x00\x00\xF0"), &mut out, &mut rec);
        session.receive(&mouse_move(1, 1), &mut out, &mut rec);

        // Assert
        let wheels: Vec<i8> = rec.pointer.iter().map(|m| m.wheel).collect();
        assert_eq!(wheels, vec![2, 0]);
        assert_eq!(session.pointer().wheel_y, 0);
    }

    #[test]
    fn test_key_events_are_translated() {
        // Arrange
        let (mut session, mut out, mut rec) = active_session();
        session.receive(&enter(), &mut out, &mut rec);

        // Act: 'a' down with shift, repeat, up
        session.receive(&frame(b"DKDN\x00\x41\x00\x01\x00\x1E"), &mut out, &mut rec);
        session.receive(&frame(b"DKRP\x00\x41\x00\x01\x00\x02\x00\x1E"), &mut out, &mut rec);
        session.receive(&frame(b"DKUP\x00\x41\x00\x01\x00\x1E"), &mut out, &mut rec);

        // Assert
        assert_eq!(
            rec.keys,
            vec![
                KeyEvent { key: HidKeyCode::KeyA, modifiers: 0x02, pressed: true, repeat: false },
                KeyEvent { key: HidKeyCode::KeyA, modifiers: 0x02, pressed: true, repeat: true },
                KeyEvent { key: HidKeyCode::KeyA, modifiers: 0x02, pressed: false, repeat: false },
            ]
        );
    }

    #[test]
    fn test_untranslatable_key_produces_no_event() {
        let (mut session, mut out, mut rec) = active_session();
        session.receive(&enter(), &mut out, &mut rec);
        session.receive(&frame(b"DKDN\x00\x00\x00\x00\x00\x54"), &mut out, &mut rec);
        assert!(rec.keys.is_empty());
    }

    #[test]
    fn test_short_frames_are_dropped_silently() {
        // Arrange
        let (mut session, mut out, mut rec) = active_session();
        session.receive(&enter(), &mut out, &mut rec);
        out.clear();

        // Act: DMMV needs 8 bytes, DKRP needs 12
        session.receive(&frame(b"DMMV\x00\x01"), &mut out, &mut rec);
        session.receive(&frame(b"DKRP\x00\x00\x00\x00\x00\x1E"), &mut out, &mut rec);

        // Assert
        assert!(rec.pointer.is_empty());
        assert!(rec.keys.is_empty());
        assert!(out.is_empty());
        assert!(session.is_captured());
    }

    #[test]
    fn test_unknown_tags_are_remembered_once() {
        // Arrange
        let (mut session, mut out, mut rec) = active_session();

        // Act
        for _ in 0..3 {
            session.receive(&frame(b"DFTR\x00\x00"), &mut out, &mut rec);
        }
        session.receive(&frame(b"LSYN"), &mut out, &mut rec);

        // Assert
        assert_eq!(session.dispatcher.unknown_tag_count(), 2);
        assert_eq!(session.state(), SessionState::Active { captured: false });
    }

    #[test]
    fn test_server_rejection_resets_and_next_hello_is_accepted() {
        // Arrange
        let (mut session, mut out, mut rec) = active_session();
        session.receive(&enter(), &mut out, &mut rec);
        let mut bytes = frame(b"EUNK");
        bytes.extend_from_slice(&[0, 0, 0, 9, b'D']);

        // Act
        session.receive(&bytes, &mut out, &mut rec);
        let state_after_reject = session.state();
        let buffered_after_reject = session.buffered();
        out.clear();
        session.receive(&hello(b"Barrier"), &mut out, &mut rec);

        // Assert
        assert_eq!(state_after_reject, SessionState::Idle);
        assert_eq!(buffered_after_reject, 0);
        assert_eq!(session.state(), SessionState::Active { captured: false });
        assert_eq!(session.protocol(), Some(ProtocolName::Barrier));
        assert!(out.starts_with(&frame(b"Barrier\x00\x01\x00\x06\x00\x00\x00\x04desk")));
    }

    #[test]
    fn test_reset_clears_pointer_baseline() {
        // Arrange
        let (mut session, mut out, mut rec) = active_session();
        session.receive(&enter(), &mut out, &mut rec);
        session.receive(&mouse_move(10, 10), &mut out, &mut rec);

        // Act
        session.reset();
        session.receive(&hello(b"Synergy"), &mut out, &mut rec);
        session.receive(&enter(), &mut out, &mut rec);
        session.receive(&mouse_move(400, 400), &mut out, &mut rec);

        // Assert
        assert_eq!(rec.pointer.last().map(|m| (m.dx, m.dy)), Some((0, 0)));
    }

    #[test]
    fn test_clipboard_frames_are_ignored() {
        let (mut session, mut out, mut rec) = active_session();
        session.receive(&frame(b"DCLP\x00\x00\x00\x00\x00\x00\x00\x03abc"), &mut out, &mut rec);
        assert!(out.is_empty());
        assert_eq!(session.state(), SessionState::Active { captured: false });
    }

    #[test]
    fn test_client_name_is_truncated_to_63_bytes() {
        // Arrange
        let long = "x".repeat(100);

        // Act
        let config = SessionConfig::new(&long, 800, 600);

        // Assert
        assert_eq!(config.client_name.len(), 63);
        assert_eq!(SessionConfig::new("  ", 1, 1).client_name, DEFAULT_CLIENT_NAME);
    }

    #[test]
    fn test_truncation_respects_utf8_boundaries() {
        // 62 ASCII bytes followed by a 2-byte character straddling the limit
        let name = format!("{}é", "a".repeat(62));
        assert_eq!(SessionConfig::new(&name, 1, 1).client_name, "a".repeat(62));
    }
}
