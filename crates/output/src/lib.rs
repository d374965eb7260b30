// Copyright 2025-2026 CEMAXECUTER LLC

//! Transfer sinks for the merged dual tuner stream: UDP datagrams and
//! WAV file capture.

pub mod udp;
pub mod wav;

pub use udp::{max_transfer_for_mtu, UdpSink};
pub use wav::{WavCapture, WavSpec, WAV_HEADER_SIZE};
