//! [`Framer`] – carves an unbounded byte stream into 17-byte frames.
//!
//! Bytes arrive in arbitrary chunks from the serial link.  The framer keeps
//! an accumulation buffer and emits a [`Frame`] whenever a complete
//! candidate is recognised.  Two recovery strategies exist, selected by
//! [`FramingMode`]:
//!
//! * **Legacy** – append every byte; when the buffer holds exactly 17 bytes
//!   and starts with the sentinel, dispatch it.  Independently, when the
//!   incoming byte *is* the sentinel and the buffer already holds 17 or more
//!   bytes, restart the buffer with that sentinel.  A truncated frame
//!   therefore swallows the frame that follows it; recovery happens at the
//!   next sentinel after that.
//! * **Resync** – bytes before a sentinel are dropped.  When a 17-byte
//!   candidate contains a later sentinel that is immediately followed by the
//!   configured room address, the candidate is treated as truncated and the
//!   buffer restarts at that sentinel.  Samples of `0xFD` followed by the
//!   two room bytes would be misread as a frame start.

use sensfloor_types::FramingMode;
use tracing::debug;

use crate::frame::{FRAME_LEN, FRAME_START, Frame};

/// Counters describing framer activity since construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FramerStats {
    /// Candidates handed out as frames.
    pub frames: u64,
    /// Times the buffer was restarted on a sentinel with bytes thrown away.
    pub resyncs: u64,
    /// Bytes dropped without ever being part of a dispatched frame.
    pub discarded: u64,
}

/// Stateful byte-stream framer.
///
/// # Example
///
/// ```
/// use sensfloor_protocol::{Framer, Frame};
/// use sensfloor_types::{FramingMode, TileId};
///
/// let mut framer = Framer::new(FramingMode::Legacy, [1, 1]);
/// let bytes = Frame::poll_request([1, 1], TileId(0, 2)).to_bytes();
///
/// let frames = framer.feed(&bytes);
/// assert_eq!(frames.len(), 1);
/// assert_eq!(frames[0].tile, TileId(0, 2));
/// ```
#[derive(Debug)]
pub struct Framer {
    mode: FramingMode,
    room: [u8; 2],
    buffer: Vec<u8>,
    dispatched: bool,
    stats: FramerStats,
}

impl Framer {
    /// Create a framer.  `room` is only consulted in [`FramingMode::Resync`].
    pub fn new(mode: FramingMode, room: [u8; 2]) -> Self {
        Self {
            mode,
            room,
            buffer: Vec::with_capacity(FRAME_LEN * 2),
            dispatched: false,
            stats: FramerStats::default(),
        }
    }

    pub fn mode(&self) -> FramingMode {
        self.mode
    }

    /// Number of bytes currently held in the accumulation buffer.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    /// Consume one byte, returning a frame when one completes.
    pub fn push(&mut self, byte: u8) -> Option<Frame> {
        match self.mode {
            FramingMode::Legacy => self.push_legacy(byte),
            FramingMode::Resync => self.push_resync(byte),
        }
    }

    /// Consume a chunk of bytes, returning the frames in stream order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Frame> {
        bytes.iter().filter_map(|&b| self.push(b)).collect()
    }

    fn push_legacy(&mut self, byte: u8) -> Option<Frame> {
        self.buffer.push(byte);

        let mut frame = None;
        if self.buffer.len() == FRAME_LEN && self.buffer[0] == FRAME_START {
            frame = self.take_candidate(FRAME_LEN);
            self.dispatched = true;
        }

        if byte == FRAME_START && self.buffer.len() >= FRAME_LEN {
            let held = self.buffer.len() - 1;
            let kept = if self.dispatched { FRAME_LEN.min(held) } else { 0 };
            let dropped = held - kept;
            if dropped > 0 {
                self.stats.resyncs += 1;
                self.stats.discarded += dropped as u64;
                debug!(dropped, "framer restarted on sentinel");
            }
            self.buffer.clear();
            self.buffer.push(byte);
            self.dispatched = false;
        }

        frame
    }

    fn push_resync(&mut self, byte: u8) -> Option<Frame> {
        if self.buffer.is_empty() && byte != FRAME_START {
            self.stats.discarded += 1;
            return None;
        }
        self.buffer.push(byte);
        if self.buffer.len() < FRAME_LEN {
            return None;
        }

        if let Some(start) = self.interior_start() {
            self.buffer.drain(..start);
            self.stats.resyncs += 1;
            self.stats.discarded += start as u64;
            debug!(dropped = start, "truncated frame superseded by new start");
            return None;
        }

        let frame = self.take_candidate(FRAME_LEN);
        self.buffer.clear();
        frame
    }

    /// Offset of a later frame start inside the current 17-byte candidate.
    fn interior_start(&self) -> Option<usize> {
        (1..=FRAME_LEN - 3).find(|&k| {
            self.buffer[k] == FRAME_START
                && self.buffer[k + 1] == self.room[0]
                && self.buffer[k + 2] == self.room[1]
        })
    }

    fn take_candidate(&mut self, len: usize) -> Option<Frame> {
        match Frame::parse(&self.buffer[..len]) {
            Ok(frame) => {
                self.stats.frames += 1;
                Some(frame)
            }
            Err(e) => {
                debug!(error = %e, "discarding candidate");
                None
            }
        }
    }
}
