//! Streaming frame decoder over a fixed receive window.
//!
//! Wire format of every frame:
//! ```text
//! [length:4 BE][body:length]
//! ```
//!
//! The decoder never grows its buffer. A frame whose declared length does not
//! fit in the window is skipped byte for byte and framing resumes right after
//! it, so a peer announcing a huge payload (clipboard data, typically) costs
//! bandwidth but never memory.

use tracing::{trace, warn};

/// Capacity of the receive window in bytes.
pub const RECV_BUFFER_SIZE: usize = 4096;

/// Size of the big-endian length prefix in front of every frame body.
pub const FRAME_HEADER_SIZE: usize = 4;

/// Counters kept by a [`FrameDecoder`] for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Complete frames handed out by [`FrameDecoder::next_frame`].
    pub frames: u64,
    /// Frames whose declared length exceeded the window and were skipped.
    pub oversized_frames: u64,
    /// Bytes discarded while skipping oversized frames.
    pub skipped_bytes: u64,
}

/// Turns a byte stream into length-prefixed frames.
///
/// Bytes go in through [`ingest`](Self::ingest) and complete frame bodies come
/// out of [`next_frame`](Self::next_frame). Both are cheap and non-blocking and
/// may be called in any interleaving.
///
/// The body returned by `next_frame` borrows the window directly. The space it
/// occupies is reclaimed (the remainder shifted to offset 0) on the next call
/// to either method.
///
/// # Examples
///
/// ```rust
/// use hidflow_core::protocol::FrameDecoder;
///
/// let mut decoder = FrameDecoder::new();
/// decoder.ingest(&[0, 0, 0, 4, b'C', b'N']);
/// assert!(decoder.next_frame().is_none());
///
/// decoder.ingest(&[b'O', b'P']);
/// assert_eq!(decoder.next_frame(), Some(&b"CNOP"[..]));
/// ```
#[derive(Debug)]
pub struct FrameDecoder {
    buf: Box<[u8]>,
    len: usize,
    consumed: usize,
    skip_remaining: u64,
    stats: FrameStats,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Creates a decoder with a [`RECV_BUFFER_SIZE`]-byte window.
    pub fn new() -> Self {
        Self::with_capacity(RECV_BUFFER_SIZE)
    }

    /// Creates a decoder with a custom window size.
    ///
    /// The capacity is raised to at least [`FRAME_HEADER_SIZE`] so a length
    /// prefix always fits.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity.max(FRAME_HEADER_SIZE)].into_boxed_slice(),
            len: 0,
            consumed: 0,
            skip_remaining: 0,
            stats: FrameStats::default(),
        }
    }

    /// Window capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of valid bytes currently buffered, including a frame that was
    /// just returned but not yet reclaimed.
    pub fn buffered(&self) -> usize {
        self.len - self.consumed
    }

    /// Bytes still to be discarded from an oversized frame.
    pub fn skip_remaining(&self) -> u64 {
        self.skip_remaining
    }

    /// Returns `true` while an oversized frame is being skipped.
    pub fn is_skipping(&self) -> bool {
        self.skip_remaining > 0
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Offers `bytes` to the decoder and returns how many of them were taken.
    ///
    /// Bytes belonging to an oversized frame are discarded first. The rest is
    /// appended to the window up to its capacity; anything beyond that is not
    /// stored. Callers that must not lose data drain frames with
    /// [`next_frame`](Self::next_frame) and offer the remainder again. A full
    /// window always holds a complete frame, so this loop always progresses.
    pub fn ingest(&mut self, bytes: &[u8]) -> usize {
        self.compact();

        let mut input = bytes;
        if self.skip_remaining > 0 {
            let skip = (self.skip_remaining.min(input.len() as u64)) as usize;
            self.skip_remaining -= skip as u64;
            self.stats.skipped_bytes += skip as u64;
            input = &input[skip..];
            if self.skip_remaining == 0 {
                trace!("oversized frame fully skipped, framing resumed");
            }
        }

        let space = self.buf.len() - self.len;
        let take = space.min(input.len());
        self.buf[self.len..self.len + take].copy_from_slice(&input[..take]);
        self.len += take;

        bytes.len() - input.len() + take
    }

    /// Returns the body of the next complete frame, or `None` when no frame
    /// is available yet.
    ///
    /// A declared length that does not fit in the window switches the decoder
    /// into skip mode: the window is cleared and the next
    /// `length + 4 - buffered` ingested bytes are discarded.
    pub fn next_frame(&mut self) -> Option<&[u8]> {
        self.compact();

        if self.skip_remaining > 0 || self.len < FRAME_HEADER_SIZE {
            return None;
        }

        let declared = u32::from_be_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]);
        let total = u64::from(declared) + FRAME_HEADER_SIZE as u64;

        if total > self.buf.len() as u64 {
            let skip = total - self.len as u64;
            warn!(
                declared,
                capacity = self.buf.len(),
                skip,
                "skipping oversized frame"
            );
            self.stats.oversized_frames += 1;
            self.stats.skipped_bytes += self.len as u64;
            self.skip_remaining = skip;
            self.len = 0;
            return None;
        }

        let total = total as usize;
        if self.len < total {
            return None;
        }

        self.consumed = total;
        self.stats.frames += 1;
        Some(&self.buf[FRAME_HEADER_SIZE..total])
    }

    /// Discards all buffered bytes and any skip in progress.
    ///
    /// Statistics are kept.
    pub fn clear(&mut self) {
        self.len = 0;
        self.consumed = 0;
        self.skip_remaining = 0;
    }

    fn compact(&mut self) {
        if self.consumed == 0 {
            return;
        }
        self.buf.copy_within(self.consumed..self.len, 0);
        self.len -= self.consumed;
        self.consumed = 0;
    }
}
