//! The per-tick driver.
//!
//! [`Bridge::tick`] performs one bounded unit of work and returns without
//! waiting on I/O:
//!
//! ```text
//! tick(now, settings)
//!  ├─ apply settings      (endpoint change drops the connection)
//!  ├─ connection lost?    -> reset session, release HID state
//!  ├─ not connected?      -> ReconnectManager::poll -> TickOutcome::Connect
//!  ├─ read available      -> Session::receive -> replies + ForwardInputUseCase
//!  └─ flush               -> at most one coalesced pointer report
//! ```
//!
//! Connecting is the only step that has to wait, so it is left to the
//! caller: a [`TickOutcome::Connect`] asks for a connection, and the
//! resulting transport is handed back with [`Bridge::attach`].

use std::time::Instant;

use hidflow_core::protocol::{FrameStats, RECV_BUFFER_SIZE};
use hidflow_core::{FrameWriter, Session, SessionConfig, SessionState};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::forward_input::ForwardInputUseCase;
use crate::application::reconnect::{Endpoint, ReconnectManager};

/// Upper bound on transport reads in one tick.
pub const MAX_READS_PER_TICK: usize = 16;

/// Errors raised by a [`Transport`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The TCP connection could not be established.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
    /// The connection attempt did not finish in time.
    #[error("timed out connecting to {endpoint}")]
    Timeout { endpoint: String },
    /// An I/O error occurred on the established connection.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The connection was closed by the server.
    #[error("connection closed by server")]
    Closed,
}

/// A connected byte stream to the server.
///
/// Replies are written through the [`FrameWriter`] supertrait.
pub trait Transport: FrameWriter {
    /// Copies whatever bytes are available into `buf` without waiting.
    ///
    /// Returns `Ok(0)` when nothing is available.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    fn is_connected(&self) -> bool;

    /// Stops using the connection. Further reads and writes fail.
    fn close(&mut self);
}

/// Values the driver re-reads every tick.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuntimeSettings {
    /// `None` disables the remote connection.
    pub endpoint: Option<Endpoint>,
    pub session: SessionConfig,
}

/// Supplies [`RuntimeSettings`], which may change between any two ticks.
pub trait ConfigSource {
    fn current(&mut self) -> &RuntimeSettings;
}

/// What a tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to read and nothing to connect.
    Idle,
    /// Bytes were read and dispatched.
    Processed { bytes: usize },
    /// The connection was lost or dropped during this tick.
    Disconnected,
    /// A connection attempt to this endpoint is due.
    Connect(Endpoint),
}

/// Snapshot for the periodic status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeStatus {
    pub endpoint: Option<Endpoint>,
    pub connected: bool,
    pub session: SessionState,
    pub host_connected: bool,
    pub frames: FrameStats,
}

/// Owns all bridge state and drives it one tick at a time.
pub struct Bridge<T> {
    session: Session,
    input: ForwardInputUseCase,
    reconnect: ReconnectManager,
    transport: Option<T>,
    read_buf: Box<[u8]>,
}

impl<T: Transport> Bridge<T> {
    pub fn new(input: ForwardInputUseCase, reconnect: ReconnectManager) -> Self {
        Self {
            session: Session::default(),
            input,
            reconnect,
            transport: None,
            read_buf: vec![0u8; RECV_BUFFER_SIZE].into_boxed_slice(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn input(&self) -> &ForwardInputUseCase {
        &self.input
    }

    pub fn is_connected(&self) -> bool {
        self.transport.as_ref().is_some_and(|t| t.is_connected())
    }

    pub fn status(&self) -> BridgeStatus {
        BridgeStatus {
            endpoint: self.reconnect.endpoint().cloned(),
            connected: self.is_connected(),
            session: self.session.state(),
            host_connected: self.input.host_connected(),
            frames: self.session.frame_stats(),
        }
    }

    /// Hands over a freshly connected transport.
    ///
    /// Any previous connection is closed and the session starts over.
    pub fn attach(&mut self, transport: T) {
        if let Some(mut old) = self.transport.take() {
            old.close();
        }
        self.session.reset();
        info!("connected to server");
        self.transport = Some(transport);
    }

    /// Runs one tick. See the module documentation for the order of steps.
    pub fn tick(&mut self, now: Instant, settings: &RuntimeSettings) -> TickOutcome {
        let mut outcome = TickOutcome::Idle;

        if self.apply_settings(settings) {
            outcome = TickOutcome::Disconnected;
        }

        if self.transport.as_ref().is_some_and(|t| !t.is_connected()) {
            self.disconnect("connection lost");
            outcome = TickOutcome::Disconnected;
        }

        if self.transport.is_some() {
            if let Some(pumped) = self.pump() {
                outcome = pumped;
            }
        } else if let Some(endpoint) = self.reconnect.poll(now, false) {
            self.session.reset();
            info!(%endpoint, "connecting to server");
            outcome = TickOutcome::Connect(endpoint);
        }

        self.input.flush(now);
        outcome
    }

    /// Closes the connection and releases everything held on the host.
    pub fn shutdown(&mut self) {
        self.disconnect("shutting down");
    }

    /// Returns `true` if the connection was dropped.
    fn apply_settings(&mut self, settings: &RuntimeSettings) -> bool {
        if self.session.config() != &settings.session {
            debug!(client = %settings.session.client_name, "session settings changed");
            self.session.set_config(settings.session.clone());
        }

        if self.reconnect.endpoint() == settings.endpoint.as_ref() {
            return false;
        }
        self.reconnect.update_endpoint(settings.endpoint.clone());
        if self.transport.is_some() {
            self.disconnect("endpoint changed");
            return true;
        }
        false
    }

    fn pump(&mut self) -> Option<TickOutcome> {
        let transport = self.transport.as_mut()?;
        let mut total = 0usize;
        let mut failure = None;

        for _ in 0..MAX_READS_PER_TICK {
            match transport.read_available(&mut self.read_buf) {
                Ok(0) => break,
                Ok(n) => {
                    let n = n.min(self.read_buf.len());
                    total += n;
                    self.session.receive(&self.read_buf[..n], transport, &mut self.input);
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        if let Some(err) = failure {
            warn!(error = %err, "server connection failed");
            self.disconnect("read failed");
            return Some(TickOutcome::Disconnected);
        }
        (total > 0).then_some(TickOutcome::Processed { bytes: total })
    }

    fn disconnect(&mut self, reason: &'static str) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
            info!(reason, "disconnected from server");
        }
        self.session.reset();
        self.input.release_all();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
