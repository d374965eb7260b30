// Copyright 2025-2026 CEMAXECUTER LLC

//! sdrplay_api backend for the dual tuner engine.
//!
//! Links against the vendor `sdrplay_api` service library (v3.07) and
//! drives an RSPduo in dual tuner mode, feeding both tuner streams into
//! [`duo_engine`]'s merger. The only entry point most users need is
//! [`run`].

pub mod ffi;
pub mod runner;
pub mod session;

pub use runner::run;
pub use session::{Device, Session};
