// Copyright 2025-2026 CEMAXECUTER LLC

//! Circular scalar storage backing the stream merger.

use crate::transfer::{SampleFormat, TransferData, TransferShape};

/// How many transfer units the circular buffer holds. The buffer
/// length is a fixed multiple of the transfer size so the transfer
/// cadence divides evenly into the buffer and emitted views never
/// straddle the wrap point.
pub const BUFFER_TRANSFERS: usize = 100;

/// Circular array of scalars in the configured sample format.
///
/// This is a raw indexed store with no cursor logic of its own;
/// index correctness is the `StreamMerger`'s responsibility.
pub enum ScalarBuf {
    Short(Vec<i16>),
    Float(Vec<f32>),
}

impl ScalarBuf {
    pub fn new(shape: &TransferShape) -> Self {
        let len = BUFFER_TRANSFERS * shape.num_scalars;
        match shape.format {
            SampleFormat::Short => ScalarBuf::Short(vec![0; len]),
            SampleFormat::Float => ScalarBuf::Float(vec![0.0; len]),
        }
    }

    /// Buffer length in scalars.
    pub fn len(&self) -> usize {
        match self {
            ScalarBuf::Short(v) => v.len(),
            ScalarBuf::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store one complex sample at scalar index `idx` (I) and
    /// `idx + 1` (Q). Float mode normalizes by full scale 32767, not
    /// 32768, matching the hardware's symmetric ADC range.
    #[inline]
    pub fn write_pair(&mut self, idx: usize, xi: i16, xq: i16) {
        match self {
            ScalarBuf::Short(v) => {
                v[idx] = xi;
                v[idx + 1] = xq;
            }
            ScalarBuf::Float(v) => {
                v[idx] = xi as f32 / 32767.0;
                v[idx + 1] = xq as f32 / 32767.0;
            }
        }
    }

    /// Borrow `len` scalars starting at `start` as transfer data.
    /// The caller guarantees the range does not wrap.
    pub fn slice(&self, start: usize, len: usize) -> TransferData<'_> {
        match self {
            ScalarBuf::Short(v) => TransferData::Short(&v[start..start + len]),
            ScalarBuf::Float(v) => TransferData::Float(&v[start..start + len]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_length_is_transfer_multiple() {
        let shape = TransferShape::new(SampleFormat::Short, 1024).unwrap();
        let buf = ScalarBuf::new(&shape);
        assert_eq!(buf.len(), BUFFER_TRANSFERS * shape.num_scalars);
        assert_eq!(buf.len() % shape.num_scalars, 0);
    }

    #[test]
    fn test_float_normalization() {
        let shape = TransferShape::new(SampleFormat::Float, 64).unwrap();
        let mut buf = ScalarBuf::new(&shape);
        buf.write_pair(0, 32767, -32767);
        match buf.slice(0, 2) {
            TransferData::Float(s) => {
                assert!((s[0] - 1.0).abs() < 1e-6);
                assert!((s[1] + 1.0).abs() < 1e-6);
            }
            _ => panic!("expected float data"),
        }
    }

    #[test]
    fn test_short_passthrough() {
        let shape = TransferShape::new(SampleFormat::Short, 64).unwrap();
        let mut buf = ScalarBuf::new(&shape);
        buf.write_pair(4, -1234, 5678);
        match buf.slice(4, 2) {
            TransferData::Short(s) => assert_eq!(s, &[-1234, 5678]),
            _ => panic!("expected short data"),
        }
    }
}
