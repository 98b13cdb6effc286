//! Ultrasonic rangefinder driver for the three sonar heads (front, left, right).
//!
//! Each head has a trigger output and an echo input. A measurement pulses the
//! trigger, then times the echo pulse through a [`PulseIn`] implementation.
//! The call blocks for at most the configured echo timeout.

use embedded_hal::{delay::DelayNs, digital::OutputPin};

use crate::utils::{
    controllers::RoverError,
    math::ranging::{echo_to_cm, NO_ECHO_CM},
    time::Clock,
};

/// Position of a sonar head on the chassis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sensor {
    Front,
    Left,
    Right,
}

impl Sensor {
    /// Measurement order within one cycle.
    pub const ALL: [Sensor; 3] = [Sensor::Front, Sensor::Left, Sensor::Right];

    pub fn index(self) -> usize {
        match self {
            Sensor::Front => 0,
            Sensor::Left => 1,
            Sensor::Right => 2,
        }
    }
}

/// Latest reading from each sonar head, in centimetres (999 = no echo).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Distances {
    pub front: u16,
    pub left: u16,
    pub right: u16,
}

impl Default for Distances {
    fn default() -> Self {
        Self {
            front: NO_ECHO_CM,
            left: NO_ECHO_CM,
            right: NO_ECHO_CM,
        }
    }
}

impl Distances {
    pub fn get(&self, sensor: Sensor) -> u16 {
        match sensor {
            Sensor::Front => self.front,
            Sensor::Left => self.left,
            Sensor::Right => self.right,
        }
    }

    pub fn set(&mut self, sensor: Sensor, cm: u16) {
        match sensor {
            Sensor::Front => self.front = cm,
            Sensor::Left => self.left = cm,
            Sensor::Right => self.right = cm,
        }
    }
}

/// Times a high pulse on an echo line.
///
/// Returns the pulse width in microseconds, or `None` when no complete pulse
/// was seen within `timeout_us`.
pub trait PulseIn {
    fn pulse_in(&mut self, timeout_us: u32) -> Option<u32>;
}

impl<T: PulseIn + ?Sized> PulseIn for &mut T {
    fn pulse_in(&mut self, timeout_us: u32) -> Option<u32> {
        (**self).pulse_in(timeout_us)
    }
}

/// Busy-wait pulse timer over a digital input pin.
///
/// Waits for any pulse already in progress to end, then for the rising edge,
/// then times until the falling edge. The timeout covers all three waits.
pub struct EchoPin<P, C> {
    pin: P,
    clock: C,
}

impl<P, C> EchoPin<P, C>
where
    P: embedded_hal::digital::InputPin,
    C: Clock,
{
    pub fn new(pin: P, clock: C) -> Self {
        Self { pin, clock }
    }

    /// Spin until the pin reads `high`, returning `false` if `deadline` passes
    /// first. A pin read error counts as not yet at the level.
    fn wait_for(&mut self, high: bool, deadline: u64) -> bool {
        loop {
            if self.pin.is_high().map(|h| h == high).unwrap_or(false) {
                return true;
            }
            if self.clock.now_us() >= deadline {
                return false;
            }
        }
    }
}

impl<P, C> PulseIn for EchoPin<P, C>
where
    P: embedded_hal::digital::InputPin,
    C: Clock,
{
    fn pulse_in(&mut self, timeout_us: u32) -> Option<u32> {
        let deadline = self.clock.now_us() + timeout_us as u64;

        if !self.wait_for(false, deadline) || !self.wait_for(true, deadline) {
            return None;
        }
        let start = self.clock.now_us();
        if !self.wait_for(false, deadline) {
            return None;
        }
        let width = self.clock.now_us().saturating_sub(start);
        u32::try_from(width).ok()
    }
}

/// Timing parameters for one trigger/echo cycle.
#[derive(Debug, Clone, Copy)]
pub struct SonarTiming {
    /// Low time before the trigger pulse (µs).
    pub trigger_settle_us: u32,
    /// Trigger pulse width (µs).
    pub trigger_pulse_us: u32,
    /// Longest echo wait (µs). 30 ms covers a ~5 m round trip.
    pub echo_timeout_us: u32,
}

impl Default for SonarTiming {
    fn default() -> Self {
        Self {
            trigger_settle_us: 2,
            trigger_pulse_us: 10,
            echo_timeout_us: 30_000,
        }
    }
}

/// One HC-SR04 style rangefinder.
pub struct Rangefinder<T, E> {
    trigger: T,
    echo: E,
    timing: SonarTiming,
}

impl<T, E> Rangefinder<T, E>
where
    T: OutputPin,
    E: PulseIn,
{
    pub fn new(
        trigger: T,
        echo: E,
        timing: SonarTiming,
    ) -> Self {
        Self {
            trigger,
            echo,
            timing,
        }
    }

    /// Drive the trigger line low without firing.
    pub fn idle(&mut self) -> Result<(), RoverError> {
        self.trigger.set_low().map_err(RoverError::pin)
    }

    /// Fire the sensor and return the distance in centimetres.
    ///
    /// No echo within the timeout, or a reading past the usable range, comes
    /// back as [`NO_ECHO_CM`]. Neither is an error.
    pub fn measure<D: DelayNs>(
        &mut self,
        delay: &mut D,
    ) -> Result<u16, RoverError> {
        self.trigger.set_low().map_err(RoverError::pin)?;
        delay.delay_us(self.timing.trigger_settle_us);
        self.trigger.set_high().map_err(RoverError::pin)?;
        delay.delay_us(self.timing.trigger_pulse_us);
        self.trigger.set_low().map_err(RoverError::pin)?;

        let cm = match self.echo.pulse_in(self.timing.echo_timeout_us) {
            Some(width) if width < self.timing.echo_timeout_us => echo_to_cm(width),
            _ => NO_ECHO_CM,
        };
        Ok(cm)
    }
}

/// The three rangefinders, indexed by [`Sensor`].
pub struct SonarArray<T, E> {
    heads: [Rangefinder<T, E>; 3],
}

impl<T, E> SonarArray<T, E>
where
    T: OutputPin,
    E: PulseIn,
{
    pub fn new(
        front: Rangefinder<T, E>,
        left: Rangefinder<T, E>,
        right: Rangefinder<T, E>,
    ) -> Self {
        Self {
            heads: [front, left, right],
        }
    }

    pub fn measure<D: DelayNs>(
        &mut self,
        sensor: Sensor,
        delay: &mut D,
    ) -> Result<u16, RoverError> {
        self.heads[sensor.index()].measure(delay)
    }

    /// Drive every trigger line low.
    pub fn idle_all(&mut self) -> Result<(), RoverError> {
        for head in self.heads.iter_mut() {
            head.idle()?;
        }
        Ok(())
    }
}
