//! Single-byte drive commands from the host.
//!
//! There is no framing: every byte is a whole command. Bytes are handled in
//! arrival order and each one overwrites the drive state, so when several
//! arrive together the last one wins. Unknown bytes are dropped.

use embedded_hal::{digital::OutputPin, pwm::SetDutyCycle};
use embedded_io::{Read, ReadReady};

use crate::utils::controllers::{
    motors::{DifferentialDrive, DriveMode},
    RoverError,
};

/// What a command byte asks the drive to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveProfile {
    pub mode: DriveMode,
    pub speed: u8,
}

/// Mapping from command bytes to drive profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTable {
    entries: [(u8, DriveProfile); 5],
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::with_speeds(120, 110)
    }
}

impl CommandTable {
    /// Table for `F`/`B` at `straight` and `L`/`R` at `turn`. `S` always stops.
    pub fn with_speeds(
        straight: u8,
        turn: u8,
    ) -> Self {
        let p = |mode, speed| DriveProfile { mode, speed };
        Self {
            entries: [
                (b'F', p(DriveMode::Forward, straight)),
                (b'B', p(DriveMode::Backward, straight)),
                (b'L', p(DriveMode::TurnLeft, turn)),
                (b'R', p(DriveMode::TurnRight, turn)),
                (b'S', p(DriveMode::Stop, 0)),
            ],
        }
    }

    pub fn lookup(
        &self,
        byte: u8,
    ) -> Option<DriveProfile> {
        self.entries
            .iter()
            .find(|(b, _)| *b == byte)
            .map(|(_, profile)| *profile)
    }

    /// Apply one byte to the drive. Returns `false` for an unknown byte.
    pub fn dispatch<D, P>(
        &self,
        byte: u8,
        drive: &mut DifferentialDrive<D, P>,
    ) -> Result<bool, RoverError>
    where
        D: OutputPin,
        P: SetDutyCycle,
    {
        match self.lookup(byte) {
            Some(DriveProfile { mode, speed }) => {
                drive.set_motion(mode, speed)?;
                let command = byte as char;
                tracing::info!(%command, ?mode, speed, "drive command");
                Ok(true)
            }
            None => {
                tracing::debug!(byte, "ignored unknown command byte");
                Ok(false)
            }
        }
    }

    /// Read and dispatch every byte the port already has buffered, without
    /// waiting for more. Returns how many bytes were recognised commands.
    ///
    /// A byte whose drive update fails does not end the drain; later bytes
    /// (a trailing `S` in particular) still apply. The first such failure is
    /// returned once the buffer is empty.
    pub fn drain<S, D, P>(
        &self,
        serial: &mut S,
        drive: &mut DifferentialDrive<D, P>,
    ) -> Result<usize, RoverError>
    where
        S: Read + ReadReady,
        D: OutputPin,
        P: SetDutyCycle,
    {
        let mut applied = 0;
        let mut failed = None;
        let mut byte = [0u8; 1];

        while serial.read_ready().map_err(RoverError::serial)? {
            if serial.read(&mut byte).map_err(RoverError::serial)? == 0 {
                break;
            }
            match self.dispatch(byte[0], drive) {
                Ok(true) => applied += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(byte = byte[0], "drive command failed: {:?}", e);
                    failed.get_or_insert(e);
                }
            }
        }

        match failed {
            Some(e) => Err(e),
            None => Ok(applied),
        }
    }
}
