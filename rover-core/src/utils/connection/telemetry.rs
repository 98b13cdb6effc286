//! Telemetry records sent to the host.
//!
//! One line per record, `{"F":<cm>,"L":<cm>,"R":<cm>}` followed by CR LF.
//! Records go out no more often than the cadence period; a late loop makes a
//! late record, never a doubled one.

use alloc::vec::Vec;

use embedded_io::Write;
use serde::{Deserialize, Serialize};

use crate::utils::controllers::{sonar::Distances, RoverError};

/// Line terminator after each record.
pub const LINE_END: &[u8] = b"\r\n";

/// Wire form of one distance snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Telemetry {
    #[serde(rename = "F")]
    pub front: u16,
    #[serde(rename = "L")]
    pub left: u16,
    #[serde(rename = "R")]
    pub right: u16,
}

impl From<Distances> for Telemetry {
    fn from(d: Distances) -> Self {
        Self {
            front: d.front,
            left: d.left,
            right: d.right,
        }
    }
}

impl Telemetry {
    /// Encode the record, line terminator included.
    pub fn to_line(&self) -> Result<Vec<u8>, RoverError> {
        let mut line = serde_json::to_vec(self).map_err(|_| RoverError::Encode)?;
        line.extend_from_slice(LINE_END);
        Ok(line)
    }

    /// Parse one received line. Surrounding whitespace is ignored.
    pub fn parse_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim())
    }
}

/// Elapsed-time gate for telemetry emission.
#[derive(Debug, Clone, Copy)]
pub struct TelemetryCadence {
    last_emit_ms: u64,
    period_ms: u64,
}

impl TelemetryCadence {
    pub fn new(period_ms: u64) -> Self {
        Self {
            last_emit_ms: 0,
            period_ms,
        }
    }

    pub fn is_due(
        &self,
        now_ms: u64,
    ) -> bool {
        now_ms.saturating_sub(self.last_emit_ms) >= self.period_ms
    }

    pub fn last_emit_ms(&self) -> u64 {
        self.last_emit_ms
    }

    /// Write a record for `distances` if the period has elapsed since the last
    /// one, and advance the gate to `now_ms`. Returns whether a record was sent.
    pub fn emit_if_due<W: Write>(
        &mut self,
        now_ms: u64,
        distances: &Distances,
        out: &mut W,
    ) -> Result<bool, RoverError> {
        if !self.is_due(now_ms) {
            return Ok(false);
        }

        let line = Telemetry::from(*distances).to_line()?;
        out.write_all(&line).map_err(RoverError::serial)?;
        self.last_emit_ms = now_ms;
        tracing::debug!(?distances, now_ms, "telemetry sent");
        Ok(true)
    }
}
