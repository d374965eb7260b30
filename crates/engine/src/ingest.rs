// Copyright 2025-2026 CEMAXECUTER LLC

//! Dual-channel ingest state machine.
//!
//! The driver invokes one callback per tuner with no built-in pairing.
//! Pairing is reconstructed purely from call ordering and count
//! equality: stream A writes the first half of each frame and records
//! its count, stream B fills in the second half of the same frames,
//! emits any completed transfers, and clears the count. Any reordering
//! or count mismatch is a fault for that delivery; the engine drops it
//! and waits for the next hardware-reported reset to re-synchronize.
//!
//! The driver contract is that callback invocations never overlap.
//! The merger itself is not thread-safe; callers that cannot rely on
//! driver serialization must wrap it in a lock (`duo_sdrplay` does).

use std::fmt;

use crate::buffer::ScalarBuf;
use crate::transfer::{Transfer, TransferShape};
use crate::TransferSink;

/// Stream synchronization fault. Not fatal: the offending delivery is
/// dropped and buffer state is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncFault {
    /// Stream A fired again before stream B consumed the pending block.
    Overflow,
    /// Stream B fired with no pending stream A block to pair with.
    OutOfOrder,
    /// Paired deliveries carried different sample counts.
    CountMismatch { expected: usize, got: usize },
}

impl fmt::Display for SyncFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncFault::Overflow => {
                write!(f, "buffer overflow: stream B has not been handled")
            }
            SyncFault::OutOfOrder => {
                write!(f, "buffer out of sync: stream A has not been handled")
            }
            SyncFault::CountMismatch { expected, got } => {
                write!(
                    f,
                    "buffer out of sync: expected numSamples={} got={}",
                    expected, got
                )
            }
        }
    }
}

/// Owns the circular buffer and merge cursors. State mutates only
/// through the two stream transition functions, keeping the sync-fault
/// detection centralized and testable without hardware.
pub struct StreamMerger {
    shape: TransferShape,
    buf: ScalarBuf,
    buffer_len: usize,
    /// Samples written by stream A, awaiting the matching stream B
    /// delivery. Cleared once B has merged them.
    pending_a: usize,
    /// Count of the most recently merged pair; the next stream A
    /// delivery must match it.
    merged: usize,
    /// Next scalar slot to receive data. Always frame-aligned.
    write_idx: usize,
    /// Next scalar slot to hand to the consumer. Advances by whole
    /// transfers, so emitted views never straddle the wrap point.
    read_idx: usize,
}

impl StreamMerger {
    pub fn new(shape: TransferShape) -> Self {
        let buf = ScalarBuf::new(&shape);
        let buffer_len = buf.len();
        Self {
            shape,
            buf,
            buffer_len,
            pending_a: 0,
            merged: 0,
            write_idx: 0,
            read_idx: 0,
        }
    }

    pub fn shape(&self) -> &TransferShape {
        &self.shape
    }

    /// Current write cursor in scalars (test and diagnostics hook).
    pub fn write_idx(&self) -> usize {
        self.write_idx
    }

    /// Current read cursor in scalars.
    pub fn read_idx(&self) -> usize {
        self.read_idx
    }

    fn reset(&mut self) {
        self.pending_a = 0;
        self.merged = 0;
        self.write_idx = 0;
        self.read_idx = 0;
    }

    /// Tuner A delivery: interleave `xi`/`xq` into the A slots of the
    /// next frames. A hardware `reset` re-synchronizes the merger and
    /// the delivery is treated as the first block of a fresh stream.
    pub fn on_stream_a(&mut self, xi: &[i16], xq: &[i16], reset: bool) -> Result<(), SyncFault> {
        debug_assert_eq!(xi.len(), xq.len());
        let count = xi.len();

        if reset {
            self.reset();
        } else if self.pending_a != 0 || self.merged == 0 {
            return Err(SyncFault::Overflow);
        } else if self.merged != count {
            return Err(SyncFault::CountMismatch {
                expected: self.merged,
                got: count,
            });
        }

        let mut idx = self.write_idx;
        for i in 0..count {
            self.buf.write_pair(idx, xi[i], xq[i]);
            // skip the stream B slots of this frame
            idx = (idx + 4) % self.buffer_len;
        }
        self.pending_a = count;
        Ok(())
    }

    /// Tuner B delivery: fill in the B slots of the frames stream A
    /// just wrote, emitting a transfer at every completed transfer
    /// boundary (possibly several per call). A `reset` drops the
    /// delivery and re-synchronizes; the next A/B pair starts fresh.
    pub fn on_stream_b(
        &mut self,
        xi: &[i16],
        xq: &[i16],
        reset: bool,
        sink: &mut dyn TransferSink,
    ) -> Result<(), SyncFault> {
        debug_assert_eq!(xi.len(), xq.len());
        let count = xi.len();

        if reset {
            self.reset();
            return Ok(());
        }
        if self.pending_a == 0 {
            return Err(SyncFault::OutOfOrder);
        }
        if self.pending_a != count {
            return Err(SyncFault::CountMismatch {
                expected: self.pending_a,
                got: count,
            });
        }

        self.merged = count;
        let mut idx = self.write_idx;
        for i in 0..count {
            self.buf.write_pair(idx + 2, xi[i], xq[i]);
            idx = (idx + 4) % self.buffer_len;
            if idx % self.shape.num_scalars == 0 {
                self.emit(sink);
            }
        }
        self.write_idx = idx;

        // clear to indicate to stream A that B has caught up
        self.pending_a = 0;
        Ok(())
    }

    /// Hand the next full transfer unit to the consumer and advance
    /// the read cursor. The view is contiguous by construction: the
    /// buffer length is a whole number of transfer units.
    fn emit(&mut self, sink: &mut dyn TransferSink) {
        let start = self.read_idx;
        self.read_idx = (self.read_idx + self.shape.num_scalars) % self.buffer_len;
        let transfer = Transfer {
            shape: self.shape,
            data: self.buf.slice(start, self.shape.num_scalars),
        };
        sink.on_transfer(&transfer);
    }
}
