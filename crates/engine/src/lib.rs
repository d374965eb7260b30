// Copyright 2025-2026 CEMAXECUTER LLC

//! Dual-tuner stream merging engine.
//!
//! The RSPduo delivers one callback stream per tuner with no built-in
//! pairing; this crate reconstructs the pairing from call ordering and
//! count equality, interleaves both tuners into (Ia, Qa, Ib, Qb) frames
//! in a circular buffer, and emits fixed-size transfers to a sink. It
//! is deliberately hardware-free: the `duo_sdrplay` crate wires these
//! types to the real driver callbacks.

pub mod buffer;
pub mod config;
pub mod control;
pub mod ingest;
pub mod transfer;

pub use config::EngineConfig;
pub use control::TuneParams;
pub use ingest::{StreamMerger, SyncFault};
pub use transfer::{SampleFormat, Transfer, TransferData, TransferShape};

/// Verdict returned by a [`ControlHook`] each control cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Stop,
}

/// Receives merged transfers from the engine.
///
/// Called synchronously on the driver's stream-B callback thread,
/// possibly several times per callback. Implementations must not block
/// or sleep, and must copy out anything they need to retain: the
/// transfer's data view is only valid for the duration of the call.
pub trait TransferSink: Send {
    fn on_transfer(&mut self, transfer: &Transfer<'_>);
}

/// Receives formatted diagnostic messages (sync faults, rejected
/// parameter values, hardware events). Never invoked on the fast
/// ingest path except on fault.
pub trait MessageSink: Send {
    fn on_message(&mut self, msg: &str);
}

/// Periodic control hook, invoked roughly every 100 ms from the
/// control loop on the caller's thread. The hook may mutate the
/// snapshot; the loop diffs it against the applied configuration and
/// issues only the necessary hardware updates.
pub trait ControlHook: Send {
    fn on_control(&mut self, params: &mut TuneParams) -> Control;
}
