// Copyright 2025-2026 CEMAXECUTER LLC

//! WAV capture sink.
//!
//! The header layout is the minimum that supports IEEE floating point
//! samples (18-byte fmt chunk plus a fact chunk) and is still valid for
//! LPCM: RIFF(12) + fmt(26) + fact(12) + data(8) = 58 bytes. Each of
//! the four WAV channels carries one scalar of the interleaved frame
//! (Ia, Qa, Ib, Qb).

use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use byteorder::{LittleEndian, WriteBytesExt};

use duo_engine::transfer::SampleFormat;
use duo_engine::{Transfer, TransferSink};

/// Size of the full header block preceding sample data.
pub const WAV_HEADER_SIZE: u64 = 58;

const FMT_CHUNK_SIZE: u32 = 18;
const FACT_CHUNK_SIZE: u32 = 4;

const FORMAT_LPCM: u16 = 1;
const FORMAT_IEEE_FLOAT: u16 = 3;

/// Everything needed to render the header for one capture.
#[derive(Debug, Clone, Copy)]
pub struct WavSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub format: SampleFormat,
}

impl WavSpec {
    /// Four channels, one per scalar of the (Ia, Qa, Ib, Qb) frame.
    pub fn duo(sample_rate: u32, format: SampleFormat) -> Self {
        WavSpec {
            sample_rate,
            channels: 4,
            format,
        }
    }

    fn block_align(&self) -> u16 {
        self.channels * self.format.scalar_size() as u16
    }

    /// Writes the complete 58-byte header with sizes computed for
    /// `data_bytes` of sample data. Written once with zero sizes when
    /// the file is created, then again over the top once the total is
    /// known.
    pub fn write_header<W: Write>(&self, w: &mut W, data_bytes: u32) -> io::Result<()> {
        let bytes_per_sample = self.format.scalar_size() as u32;
        let audio_format = if self.format.is_float() {
            FORMAT_IEEE_FLOAT
        } else {
            FORMAT_LPCM
        };

        // RIFF chunk
        w.write_all(b"RIFF")?;
        w.write_u32::<LittleEndian>(WAV_HEADER_SIZE as u32 - 8 + data_bytes)?;
        w.write_all(b"WAVE")?;

        // fmt chunk, 18-byte body with the extension size field
        w.write_all(b"fmt ")?;
        w.write_u32::<LittleEndian>(FMT_CHUNK_SIZE)?;
        w.write_u16::<LittleEndian>(audio_format)?;
        w.write_u16::<LittleEndian>(self.channels)?;
        w.write_u32::<LittleEndian>(self.sample_rate)?;
        w.write_u32::<LittleEndian>(self.sample_rate * self.channels as u32 * bytes_per_sample)?;
        w.write_u16::<LittleEndian>(self.block_align())?;
        w.write_u16::<LittleEndian>(bytes_per_sample as u16 * 8)?;
        w.write_u16::<LittleEndian>(0)?; // extension size

        // fact chunk, required for floating point
        w.write_all(b"fact")?;
        w.write_u32::<LittleEndian>(FACT_CHUNK_SIZE)?;
        w.write_u32::<LittleEndian>(data_bytes / self.block_align() as u32)?;

        // data chunk header, samples follow
        w.write_all(b"data")?;
        w.write_u32::<LittleEndian>(data_bytes)?;
        Ok(())
    }
}

/// Writes merged transfers to a WAV (or headerless raw) file.
///
/// Discards transfers during the warmup window, truncates the final
/// write to whole frames so the byte budget is never exceeded, and
/// raises the shared `done` flag when the budget is reached or a write
/// fails. The control hook watches the flag to stop the engine.
pub struct WavCapture {
    out: File,
    spec: Option<WavSpec>,
    max_bytes: u64,
    bytes_written: u64,
    start_at: Instant,
    started: bool,
    done: Arc<AtomicBool>,
}

impl WavCapture {
    /// Creates the output file and writes a placeholder header unless
    /// `spec` is `None` (headerless capture). `max_bytes` bounds the
    /// whole file, header included.
    pub fn create(
        path: &Path,
        spec: Option<WavSpec>,
        max_bytes: u64,
        warmup: Duration,
        done: Arc<AtomicBool>,
    ) -> Result<Self, String> {
        let mut out = File::create(path)
            .map_err(|e| format!("failed to create {}: {}", path.display(), e))?;

        let mut data_budget = max_bytes;
        if let Some(spec) = &spec {
            if max_bytes <= WAV_HEADER_SIZE {
                return Err(format!(
                    "file size budget {} does not fit the {}-byte WAV header",
                    max_bytes, WAV_HEADER_SIZE
                ));
            }
            spec.write_header(&mut out, 0)
                .map_err(|e| format!("failed to write WAV header: {}", e))?;
            data_budget = max_bytes - WAV_HEADER_SIZE;
        }

        Ok(WavCapture {
            out,
            spec,
            max_bytes: data_budget,
            bytes_written: 0,
            start_at: Instant::now() + warmup,
            started: warmup.is_zero(),
            done,
        })
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Rewrites the header with the final sizes. Call once after the
    /// engine has stopped.
    pub fn finish(&mut self) -> Result<(), String> {
        if let Some(spec) = self.spec {
            self.out
                .seek(SeekFrom::Start(0))
                .map_err(|e| format!("failed to seek to WAV header: {}", e))?;
            spec.write_header(&mut self.out, self.bytes_written as u32)
                .map_err(|e| format!("failed to update WAV header: {}", e))?;
        }
        self.out
            .flush()
            .map_err(|e| format!("failed to flush output: {}", e))
    }
}

impl TransferSink for WavCapture {
    fn on_transfer(&mut self, transfer: &Transfer<'_>) {
        if !self.started {
            // Samples during warmup are discarded, including the
            // transfer that ends it.
            if Instant::now() >= self.start_at {
                self.started = true;
            }
            return;
        }
        if self.done.load(Ordering::SeqCst) {
            return;
        }

        let bytes = transfer.bytes();
        let frame_size = transfer.shape.frame_size as u64;
        let remaining = self.max_bytes - self.bytes_written;
        let mut num_bytes = bytes.len() as u64;
        if remaining < num_bytes {
            // Truncate the final transfer to whole frames.
            num_bytes = (remaining / frame_size) * frame_size;
        }
        if num_bytes == 0 {
            self.done.store(true, Ordering::SeqCst);
            return;
        }

        match self.out.write_all(&bytes[..num_bytes as usize]) {
            Ok(()) => {
                self.bytes_written += num_bytes;
                if self.bytes_written >= self.max_bytes {
                    self.done.store(true, Ordering::SeqCst);
                }
            }
            Err(e) => {
                log::error!("capture write failed: {}", e);
                self.done.store(true, Ordering::SeqCst);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duo_engine::transfer::{TransferData, TransferShape};
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("duo_wav_test_{}_{}.wav", std::process::id(), name))
    }

    fn short_transfer(shape: TransferShape, scalars: &[i16]) -> Transfer<'_> {
        Transfer {
            shape,
            data: TransferData::Short(scalars),
        }
    }

    #[test]
    fn test_capture_truncates_to_whole_frames() {
        let path = temp_path("truncate");
        let spec = WavSpec::duo(2_000_000, SampleFormat::Short);
        let done = Arc::new(AtomicBool::new(false));
        // 100 bytes of data budget after the header
        let mut capture = WavCapture::create(
            &path,
            Some(spec),
            WAV_HEADER_SIZE + 100,
            Duration::ZERO,
            done.clone(),
        )
        .unwrap();

        // 64-byte transfers, 8-byte frames
        let shape = TransferShape::new(SampleFormat::Short, 64).unwrap();
        let scalars = vec![7i16; shape.num_scalars];

        capture.on_transfer(&short_transfer(shape, &scalars));
        assert_eq!(capture.bytes_written(), 64);
        assert!(!done.load(Ordering::SeqCst));

        // 36 bytes remain: only 4 whole frames (32 bytes) fit
        capture.on_transfer(&short_transfer(shape, &scalars));
        assert_eq!(capture.bytes_written(), 96);
        assert!(!done.load(Ordering::SeqCst));

        // 4 bytes remain, less than one frame: nothing written, done raised
        capture.on_transfer(&short_transfer(shape, &scalars));
        assert_eq!(capture.bytes_written(), 96);
        assert!(done.load(Ordering::SeqCst));

        // further transfers are ignored once done
        capture.on_transfer(&short_transfer(shape, &scalars));
        assert_eq!(capture.bytes_written(), 96);

        capture.finish().unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len() as u64, WAV_HEADER_SIZE + 96);
        // patched data chunk size
        assert_eq!(u32::from_le_bytes(bytes[54..58].try_into().unwrap()), 96);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_capture_discards_warmup() {
        let path = temp_path("warmup");
        let done = Arc::new(AtomicBool::new(false));
        let mut capture = WavCapture::create(
            &path,
            None,
            1 << 20,
            Duration::from_millis(30),
            done,
        )
        .unwrap();

        let shape = TransferShape::new(SampleFormat::Short, 64).unwrap();
        let scalars = vec![3i16; shape.num_scalars];

        // inside the warmup window
        capture.on_transfer(&short_transfer(shape, &scalars));
        assert_eq!(capture.bytes_written(), 0);

        std::thread::sleep(Duration::from_millis(50));

        // the transfer that ends the window is itself discarded
        capture.on_transfer(&short_transfer(shape, &scalars));
        assert_eq!(capture.bytes_written(), 0);

        capture.on_transfer(&short_transfer(shape, &scalars));
        assert_eq!(capture.bytes_written(), 64);

        capture.finish().unwrap();
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_header_size() {
        let spec = WavSpec::duo(2_000_000, SampleFormat::Short);
        let mut buf = Vec::new();
        spec.write_header(&mut buf, 0).unwrap();
        assert_eq!(buf.len() as u64, WAV_HEADER_SIZE);
    }

    #[test]
    fn test_header_short_format() {
        let spec = WavSpec::duo(2_000_000, SampleFormat::Short);
        let mut buf = Vec::new();
        spec.write_header(&mut buf, 0).unwrap();

        assert_eq!(&buf[0..4], b"RIFF");
        // riff chunk size covers the rest of the header with no data yet
        assert_eq!(u32::from_le_bytes(buf[4..8].try_into().unwrap()), 50);
        assert_eq!(&buf[8..12], b"WAVE");

        assert_eq!(&buf[12..16], b"fmt ");
        assert_eq!(u32::from_le_bytes(buf[16..20].try_into().unwrap()), 18);
        // LPCM
        assert_eq!(u16::from_le_bytes(buf[20..22].try_into().unwrap()), 1);
        // 4 channels
        assert_eq!(u16::from_le_bytes(buf[22..24].try_into().unwrap()), 4);
        assert_eq!(
            u32::from_le_bytes(buf[24..28].try_into().unwrap()),
            2_000_000
        );
        // byte rate = rate * channels * 2
        assert_eq!(
            u32::from_le_bytes(buf[28..32].try_into().unwrap()),
            16_000_000
        );
        // block align = 8, bits = 16, ext size = 0
        assert_eq!(u16::from_le_bytes(buf[32..34].try_into().unwrap()), 8);
        assert_eq!(u16::from_le_bytes(buf[34..36].try_into().unwrap()), 16);
        assert_eq!(u16::from_le_bytes(buf[36..38].try_into().unwrap()), 0);

        assert_eq!(&buf[38..42], b"fact");
        assert_eq!(u32::from_le_bytes(buf[42..46].try_into().unwrap()), 4);
        assert_eq!(u32::from_le_bytes(buf[46..50].try_into().unwrap()), 0);

        assert_eq!(&buf[50..54], b"data");
        assert_eq!(u32::from_le_bytes(buf[54..58].try_into().unwrap()), 0);
    }

    #[test]
    fn test_header_float_format() {
        let spec = WavSpec::duo(250_000, SampleFormat::Float);
        let mut buf = Vec::new();
        spec.write_header(&mut buf, 0).unwrap();

        // IEEE float
        assert_eq!(u16::from_le_bytes(buf[20..22].try_into().unwrap()), 3);
        // block align = 16, bits = 32
        assert_eq!(u16::from_le_bytes(buf[32..34].try_into().unwrap()), 16);
        assert_eq!(u16::from_le_bytes(buf[34..36].try_into().unwrap()), 32);
    }

    #[test]
    fn test_header_update_sizes() {
        let spec = WavSpec::duo(2_000_000, SampleFormat::Short);
        let mut buf = Vec::new();
        spec.write_header(&mut buf, 8000).unwrap();

        assert_eq!(u32::from_le_bytes(buf[4..8].try_into().unwrap()), 8050);
        // fact sample length = data / block align = 8000 / 8
        assert_eq!(u32::from_le_bytes(buf[46..50].try_into().unwrap()), 1000);
        assert_eq!(u32::from_le_bytes(buf[54..58].try_into().unwrap()), 8000);
    }
}
