// Copyright 2025-2026 CEMAXECUTER LLC

//! Transfer geometry and the borrowed transfer descriptor.
//!
//! Terminology used throughout the engine:
//!   scalar: one real value, I or Q
//!   sample: one complex (I, Q) pair from a single tuner
//!   frame:  the interleaved quartet (Ia, Qa, Ib, Qb) from both tuners

use std::mem;

/// Scalar representation of the merged stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Raw 16-bit ADC scalars, stored unmodified.
    Short,
    /// 32-bit floats, each scalar normalized by 1/32767 at write time.
    Float,
}

impl SampleFormat {
    pub fn scalar_size(self) -> usize {
        match self {
            SampleFormat::Short => mem::size_of::<i16>(),
            SampleFormat::Float => mem::size_of::<f32>(),
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, SampleFormat::Float)
    }
}

/// Fixed per-transfer sizes and counts, derived once at startup from
/// the sample format and the caller's maximum byte budget.
///
/// `num_bytes` is always an exact multiple of `frame_size`; a budget
/// smaller than one frame is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferShape {
    pub format: SampleFormat,
    pub scalar_size: usize,
    pub sample_size: usize,
    pub frame_size: usize,
    pub num_frames: usize,
    pub num_samples: usize,
    pub num_scalars: usize,
    pub num_bytes: usize,
}

impl TransferShape {
    pub fn new(format: SampleFormat, max_transfer_size: usize) -> Result<Self, String> {
        let scalar_size = format.scalar_size();
        let sample_size = scalar_size * 2;
        let frame_size = sample_size * 2;
        let num_frames = max_transfer_size / frame_size;
        if num_frames == 0 {
            return Err(format!(
                "max transfer size {} is smaller than one frame ({} bytes)",
                max_transfer_size, frame_size
            ));
        }
        let num_samples = num_frames * 2;
        let num_scalars = num_samples * 2;
        Ok(Self {
            format,
            scalar_size,
            sample_size,
            frame_size,
            num_frames,
            num_samples,
            num_scalars,
            num_bytes: num_scalars * scalar_size,
        })
    }
}

/// Typed view of one transfer's scalars.
#[derive(Debug, Clone, Copy)]
pub enum TransferData<'a> {
    Short(&'a [i16]),
    Float(&'a [f32]),
}

/// One emitted chunk of interleaved frames.
///
/// Carries redundant size metadata so sinks can interpret the data as
/// scalars, samples, or frames without re-deriving anything. The data
/// view borrows the engine's circular buffer and is only valid for the
/// duration of the sink call; the slot is overwritten once the cursor
/// wraps back around (about 100 transfers later).
#[derive(Debug, Clone, Copy)]
pub struct Transfer<'a> {
    pub shape: TransferShape,
    pub data: TransferData<'a>,
}

impl<'a> Transfer<'a> {
    /// Raw little-endian byte view of the transfer data, for
    /// byte-oriented sinks (UDP datagrams, file writes).
    pub fn bytes(&self) -> &'a [u8] {
        match self.data {
            TransferData::Short(s) => unsafe {
                std::slice::from_raw_parts(s.as_ptr() as *const u8, std::mem::size_of_val(s))
            },
            TransferData::Float(s) => unsafe {
                std::slice::from_raw_parts(s.as_ptr() as *const u8, std::mem::size_of_val(s))
            },
        }
    }
}
