//! Serial link handling.
//!
//! The rover shares one byte stream with the host: telemetry lines go out,
//! single-byte drive commands come in.
//!
//! # Modules
//! - `telemetry`: rate-limited JSON distance records.
//! - `commands`: byte-to-drive dispatch and the inbound drain.

pub mod commands;
pub mod telemetry;
