//! Network infrastructure for the bridge.
//!
//! [`TcpTransport`] is the [`Transport`] used in production. Connecting is
//! async; afterwards every read and write uses tokio's non-blocking
//! `try_read`/`try_write`, so a tick never waits on the socket.
//!
//! Replies are small, but a write can still be cut short by a full send
//! buffer. The unsent tail is kept in a bounded outbound queue and flushed
//! before anything else is written, so frames are never interleaved.
//!
//! [`until_shutdown`] lets the driver loop abandon a pending connect as soon
//! as shutdown is requested.

use std::future::Future;
use std::io::ErrorKind;
use std::time::Duration;

use hidflow_core::FrameWriter;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, info, warn};

use crate::application::driver::{Transport, TransportError};
use crate::application::reconnect::Endpoint;

/// Default time allowed for a TCP connect.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Unsent reply bytes tolerated before the connection is considered stuck.
pub const MAX_PENDING_OUTBOUND: usize = 16 * 1024;

/// TCP connection to a Synergy/Barrier/Deskflow server.
pub struct TcpTransport {
    stream: TcpStream,
    peer: String,
    pending: Vec<u8>,
    connected: bool,
}

impl TcpTransport {
    /// Connects to `endpoint`, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Timeout`] if the connect does not finish in
    /// time, or [`TransportError::Connect`] if it fails.
    pub async fn connect(endpoint: &Endpoint, timeout: Duration) -> Result<Self, TransportError> {
        let peer = endpoint.to_string();
        let stream = match time::timeout(timeout, TcpStream::connect((endpoint.host.as_str(), endpoint.port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(TransportError::Connect { endpoint: peer, source }),
            Err(_) => return Err(TransportError::Timeout { endpoint: peer }),
        };
        if let Err(err) = stream.set_nodelay(true) {
            debug!(error = %err, "could not disable Nagle's algorithm");
        }
        info!(%peer, "TCP connection established");
        Ok(Self::from_stream(stream, peer))
    }

    /// Wraps an already connected stream.
    pub fn from_stream(stream: TcpStream, peer: String) -> Self {
        Self {
            stream,
            peer,
            pending: Vec::new(),
            connected: true,
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Bytes accepted by [`write_frame`](FrameWriter::write_frame) but not yet sent.
    pub fn pending_outbound(&self) -> usize {
        self.pending.len()
    }

    /// Sends as much of the outbound queue as the socket takes right now.
    fn flush_pending(&mut self) -> Result<(), TransportError> {
        while !self.pending.is_empty() {
            match self.stream.try_write(&self.pending) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => {
                    self.pending.drain(..n);
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(())
    }

    fn fail(&mut self, err: &TransportError) {
        if self.connected {
            warn!(peer = %self.peer, error = %err, "connection failed");
        }
        self.connected = false;
        self.pending.clear();
    }
}

impl FrameWriter for TcpTransport {
    fn write_frame(&mut self, frame: &[u8]) -> bool {
        if !self.connected {
            return false;
        }
        if self.pending.len() + frame.len() > MAX_PENDING_OUTBOUND {
            self.fail(&TransportError::Io(ErrorKind::WriteZero.into()));
            return false;
        }
        self.pending.extend_from_slice(frame);
        match self.flush_pending() {
            Ok(()) => true,
            Err(err) => {
                self.fail(&err);
                false
            }
        }
    }
}

impl Transport for TcpTransport {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if !self.connected {
            return Err(TransportError::Closed);
        }
        if let Err(err) = self.flush_pending() {
            self.fail(&err);
            return Err(err);
        }
        match self.stream.try_read(buf) {
            Ok(0) => {
                info!(peer = %self.peer, "server closed the connection");
                self.connected = false;
                Err(TransportError::Closed)
            }
            Ok(n) => Ok(n),
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(0),
            Err(err) => {
                let err = TransportError::Io(err);
                self.fail(&err);
                Err(err)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn close(&mut self) {
        self.connected = false;
        self.pending.clear();
    }
}

/// Runs `operation` unless `shutdown` becomes `true` first.
///
/// Returns `None` if shutdown was requested, including before the call. A
/// dropped sender never counts as a shutdown request.
pub async fn until_shutdown<F: Future>(
    operation: F,
    shutdown: &mut watch::Receiver<bool>,
) -> Option<F::Output> {
    tokio::select! {
        biased;
        Ok(_) = shutdown.wait_for(|stop| *stop) => None,
        output = operation => Some(output),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
