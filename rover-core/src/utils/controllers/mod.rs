//! Module Exports
//!
//! This file exports the hardware controllers and the main cycle scheduler.
//!
//! - `sonar`: Triggers the ultrasonic rangefinders and converts echo times.
//! - `motors`: Drives the two H-bridge motor channels.
//!
//! `RoverController` owns every peripheral and runs them in one cooperative
//! loop: three staggered sonar reads, telemetry if due, then the command drain.

pub mod motors;
pub mod sonar;

use embedded_hal::{delay::DelayNs, digital::OutputPin, pwm::SetDutyCycle};
use embedded_io::{Read, ReadReady, Write};

use crate::utils::{
    connection::{commands::CommandTable, telemetry::TelemetryCadence},
    math::ranging::NO_ECHO_CM,
    time::Clock,
};
use motors::DifferentialDrive;
use sonar::{Distances, PulseIn, Sensor, SonarArray, SonarTiming};

/// Errors reported by the hardware boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoverError {
    Pin(embedded_hal::digital::ErrorKind),
    Pwm(embedded_hal::pwm::ErrorKind),
    Serial(embedded_io::ErrorKind),
    /// Telemetry record could not be encoded.
    Encode,
}

impl RoverError {
    pub(crate) fn pin<E: embedded_hal::digital::Error>(e: E) -> Self {
        RoverError::Pin(e.kind())
    }

    pub(crate) fn pwm<E: embedded_hal::pwm::Error>(e: E) -> Self {
        RoverError::Pwm(e.kind())
    }

    pub(crate) fn serial<E: embedded_io::Error>(e: E) -> Self {
        RoverError::Serial(e.kind())
    }
}

/// Loop timing and command speeds.
#[derive(Debug, Clone, Copy)]
pub struct RoverConfig {
    pub sonar: SonarTiming,
    /// Pause between adjacent sonar reads to let echoes die out (ms).
    pub settle_ms: u32,
    /// Pause at the end of every cycle (ms).
    pub loop_delay_ms: u32,
    /// Minimum spacing of telemetry records (ms).
    pub telemetry_period_ms: u64,
    /// Pause after power-on before the first cycle (ms).
    pub startup_delay_ms: u32,
    pub commands: CommandTable,
}

impl Default for RoverConfig {
    fn default() -> Self {
        Self {
            sonar: SonarTiming::default(),
            settle_ms: 30,
            loop_delay_ms: 20,
            telemetry_period_ms: 150,
            startup_delay_ms: 50,
            commands: CommandTable::default(),
        }
    }
}

/// Mutable loop state carried from one cycle to the next.
#[derive(Debug, Clone, Copy)]
pub struct RoverState {
    pub distances: Distances,
    pub cadence: TelemetryCadence,
}

/// What happened during one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub distances: Distances,
    pub telemetry_sent: bool,
    pub commands_applied: usize,
    /// First hardware failure seen during the cycle, if any.
    pub fault: Option<RoverError>,
}

/// The rover front end: sonars, drive, serial link, and the loop tying them
/// together.
pub struct RoverController<T, E, D, P, S, C, Dl> {
    sonars: SonarArray<T, E>,
    drive: DifferentialDrive<D, P>,
    serial: S,
    clock: C,
    delay: Dl,
    config: RoverConfig,
    state: RoverState,
}

impl<T, E, D, P, S, C, Dl> RoverController<T, E, D, P, S, C, Dl>
where
    T: OutputPin,
    E: PulseIn,
    D: OutputPin,
    P: SetDutyCycle,
    S: Read + ReadReady + Write,
    C: Clock,
    Dl: DelayNs,
{
    pub fn new(
        sonars: SonarArray<T, E>,
        drive: DifferentialDrive<D, P>,
        serial: S,
        clock: C,
        delay: Dl,
        config: Option<RoverConfig>,
    ) -> Self {
        let config = config.unwrap_or_default();
        let state = RoverState {
            distances: Distances::default(),
            cadence: TelemetryCadence::new(config.telemetry_period_ms),
        };

        RoverController {
            sonars,
            drive,
            serial,
            clock,
            delay,
            config,
            state,
        }
    }

    /// Put the hardware in a safe idle state: motors stopped, triggers low.
    pub fn init(&mut self) -> Result<(), RoverError> {
        self.drive.stop()?;
        self.sonars.idle_all()?;
        self.delay.delay_ms(self.config.startup_delay_ms);
        tracing::info!("rover front end ready");
        Ok(())
    }

    /// Run one pass of the loop.
    ///
    /// Every step runs even when an earlier one fails: a sensor that cannot be
    /// triggered reads as [`NO_ECHO_CM`], and a dead serial TX line never keeps
    /// commands from being drained. The first failure is kept in the report.
    pub fn cycle(&mut self) -> CycleReport {
        let mut fault = None;

        for (i, sensor) in Sensor::ALL.into_iter().enumerate() {
            if i > 0 {
                self.delay.delay_ms(self.config.settle_ms);
            }
            let cm = match self.sonars.measure(sensor, &mut self.delay) {
                Ok(cm) => cm,
                Err(e) => {
                    tracing::error!(?sensor, "sonar measurement failed: {:?}", e);
                    fault.get_or_insert(e);
                    NO_ECHO_CM
                }
            };
            self.state.distances.set(sensor, cm);
        }
        tracing::debug!(distances = ?self.state.distances, "sonar sweep");

        let now = self.clock.now_ms();
        let telemetry_sent =
            match self
                .state
                .cadence
                .emit_if_due(now, &self.state.distances, &mut self.serial)
            {
                Ok(sent) => sent,
                Err(e) => {
                    tracing::error!("telemetry write failed: {:?}", e);
                    fault.get_or_insert(e);
                    false
                }
            };

        let commands_applied = match self
            .config
            .commands
            .drain(&mut self.serial, &mut self.drive)
        {
            Ok(n) => n,
            Err(e) => {
                tracing::error!("command drain failed: {:?}", e);
                fault.get_or_insert(e);
                0
            }
        };

        self.delay.delay_ms(self.config.loop_delay_ms);

        CycleReport {
            distances: self.state.distances,
            telemetry_sent,
            commands_applied,
            fault,
        }
    }

    /// Loop forever. Failures are logged inside [`Self::cycle`].
    pub fn run(&mut self) -> ! {
        if let Err(e) = self.init() {
            tracing::error!("init failed: {:?}", e);
        }
        loop {
            self.cycle();
        }
    }

    pub fn state(&self) -> &RoverState {
        &self.state
    }

    pub fn drive(&self) -> &DifferentialDrive<D, P> {
        &self.drive
    }

    pub fn serial_mut(&mut self) -> &mut S {
        &mut self.serial
    }
}
