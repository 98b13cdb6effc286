//! Differential drive over two H-bridge motor channels.
//!
//! Each motor has two direction lines (IN1/IN2) and a PWM enable line, as on
//! an L298N. The drive only writes to the hardware; it remembers what it last
//! commanded so callers can inspect it.

use embedded_hal::{digital::OutputPin, pwm::SetDutyCycle};

use crate::utils::controllers::RoverError;

/// Full-scale speed value.
pub const MAX_SPEED: u8 = u8::MAX;

/// Direction lines of a single motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotorDirection {
    Forward,
    Backward,
    /// Both lines low, motor freewheels.
    #[default]
    Coast,
}

/// Commanded state of one motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotorState {
    pub direction: MotorDirection,
    /// Duty magnitude, 0..=255.
    pub speed: u8,
}

/// Whole-vehicle motion modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
    Forward,
    Backward,
    /// Pivot in place: left backward, right forward.
    TurnLeft,
    /// Pivot in place: left forward, right backward.
    TurnRight,
    Stop,
}

impl DriveMode {
    /// Per-motor directions `(left, right)` for this mode.
    pub fn directions(self) -> (MotorDirection, MotorDirection) {
        use MotorDirection::*;
        match self {
            DriveMode::Forward => (Forward, Forward),
            DriveMode::Backward => (Backward, Backward),
            DriveMode::TurnLeft => (Backward, Forward),
            DriveMode::TurnRight => (Forward, Backward),
            DriveMode::Stop => (Coast, Coast),
        }
    }
}

/// One H-bridge channel.
pub struct Motor<D, P> {
    in1: D,
    in2: D,
    enable: P,
    state: MotorState,
}

impl<D, P> Motor<D, P>
where
    D: OutputPin,
    P: SetDutyCycle,
{
    pub fn new(
        in1: D,
        in2: D,
        enable: P,
    ) -> Self {
        Self {
            in1,
            in2,
            enable,
            state: MotorState::default(),
        }
    }

    /// Set direction lines, then the duty cycle as `speed / 255` of full scale.
    pub fn apply(
        &mut self,
        direction: MotorDirection,
        speed: u8,
    ) -> Result<(), RoverError> {
        let (in1, in2) = match direction {
            MotorDirection::Forward => (true, false),
            MotorDirection::Backward => (false, true),
            MotorDirection::Coast => (false, false),
        };
        self.in1.set_state(in1.into()).map_err(RoverError::pin)?;
        self.in2.set_state(in2.into()).map_err(RoverError::pin)?;
        self.enable
            .set_duty_cycle_fraction(speed as u16, MAX_SPEED as u16)
            .map_err(RoverError::pwm)?;

        self.state = MotorState { direction, speed };
        Ok(())
    }

    pub fn state(&self) -> MotorState {
        self.state
    }
}

/// Left and right motors driven together.
pub struct DifferentialDrive<D, P> {
    left: Motor<D, P>,
    right: Motor<D, P>,
    mode: DriveMode,
}

impl<D, P> DifferentialDrive<D, P>
where
    D: OutputPin,
    P: SetDutyCycle,
{
    pub fn new(
        left: Motor<D, P>,
        right: Motor<D, P>,
    ) -> Self {
        Self {
            left,
            right,
            mode: DriveMode::Stop,
        }
    }

    /// Drive both motors for `mode` at `speed`. `Stop` ignores `speed` and
    /// zeroes the duty on both sides.
    pub fn set_motion(
        &mut self,
        mode: DriveMode,
        speed: u8,
    ) -> Result<(), RoverError> {
        let speed = if mode == DriveMode::Stop { 0 } else { speed };
        let (left, right) = mode.directions();

        let applied = self
            .left
            .apply(left, speed)
            .and_then(|()| self.right.apply(right, speed));
        if let Err(e) = applied {
            // Never leave one side on the new command and the other on the old.
            self.halt();
            return Err(e);
        }
        self.mode = mode;
        Ok(())
    }

    /// Best-effort stop of both sides after a failed write.
    fn halt(&mut self) {
        for motor in [&mut self.left, &mut self.right] {
            if let Err(e) = motor.apply(MotorDirection::Coast, 0) {
                tracing::error!("motor halt failed: {:?}", e);
            }
        }
        self.mode = DriveMode::Stop;
    }

    pub fn stop(&mut self) -> Result<(), RoverError> {
        self.set_motion(DriveMode::Stop, 0)
    }

    pub fn mode(&self) -> DriveMode {
        self.mode
    }

    /// Commanded `(left, right)` motor states.
    pub fn state(&self) -> (MotorState, MotorState) {
        (self.left.state(), self.right.state())
    }
}
