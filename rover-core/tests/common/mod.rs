//! Hand-rolled hardware doubles shared by the integration tests.
#![allow(dead_code)]

use std::{
    cell::Cell,
    collections::VecDeque,
    convert::Infallible,
    rc::Rc,
};

use embedded_hal::{delay::DelayNs, digital, pwm};
use rover_core::utils::{
    controllers::{
        motors::{DifferentialDrive, Motor},
        sonar::{PulseIn, Rangefinder, SonarArray},
    },
    Clock, RoverConfig, RoverController,
};

/// Simulated monotonic time. Delays advance it; so do echo waits.
#[derive(Clone, Default)]
pub struct SimClock {
    ns: Rc<Cell<u64>>,
}

impl SimClock {
    pub fn starting_at_ms(ms: u64) -> Self {
        let clock = Self::default();
        clock.ns.set(ms * 1_000_000);
        clock
    }

    pub fn advance_us(
        &self,
        us: u64,
    ) {
        self.ns.set(self.ns.get() + us * 1_000);
    }
}

impl Clock for SimClock {
    fn now_us(&self) -> u64 {
        self.ns.get() / 1_000
    }
}

impl DelayNs for SimClock {
    fn delay_ns(
        &mut self,
        ns: u32,
    ) {
        self.ns.set(self.ns.get() + ns as u64);
    }
}

/// Clock that moves forward a fixed step every time it is read.
pub struct TickingClock {
    now: Cell<u64>,
    step: u64,
}

impl TickingClock {
    pub fn new(step: u64) -> Self {
        Self {
            now: Cell::new(0),
            step,
        }
    }
}

impl Clock for TickingClock {
    fn now_us(&self) -> u64 {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }
}

/// Echo line that replays scripted pulse widths, consuming simulated time.
pub struct ScriptedEcho {
    widths: VecDeque<Option<u32>>,
    clock: SimClock,
}

impl ScriptedEcho {
    pub fn new(
        widths: impl IntoIterator<Item = Option<u32>>,
        clock: SimClock,
    ) -> Self {
        Self {
            widths: widths.into_iter().collect(),
            clock,
        }
    }
}

impl PulseIn for ScriptedEcho {
    fn pulse_in(
        &mut self,
        timeout_us: u32,
    ) -> Option<u32> {
        let width = self.widths.pop_front().flatten();
        let waited = width.map_or(timeout_us, |w| w.min(timeout_us));
        self.clock.advance_us(waited as u64);
        width
    }
}

/// Output pin that accepts every write.
pub struct NullPin;

impl digital::ErrorType for NullPin {
    type Error = Infallible;
}

impl digital::OutputPin for NullPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Sonar trigger line that can be made to fail every write.
#[derive(Default)]
pub struct TriggerPin {
    pub fails: bool,
}

impl TriggerPin {
    pub fn broken() -> Self {
        Self { fails: true }
    }

    fn write(&self) -> Result<(), digital::ErrorKind> {
        if self.fails {
            Err(digital::ErrorKind::Other)
        } else {
            Ok(())
        }
    }
}

impl digital::ErrorType for TriggerPin {
    type Error = digital::ErrorKind;
}

impl digital::OutputPin for TriggerPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write()
    }
}

/// PWM channel that remembers the last duty written.
pub struct RecordingPwm {
    pub duty: Rc<Cell<u16>>,
    max: u16,
    reject_nonzero: bool,
}

impl RecordingPwm {
    pub fn new(max: u16) -> (Self, Rc<Cell<u16>>) {
        let duty = Rc::new(Cell::new(0));
        (
            Self {
                duty: duty.clone(),
                max,
                reject_nonzero: false,
            },
            duty,
        )
    }

    /// Channel that accepts only a zero duty, like a driver stuck in fault.
    pub fn stuck(max: u16) -> (Self, Rc<Cell<u16>>) {
        let (mut pwm, duty) = Self::new(max);
        pwm.reject_nonzero = true;
        (pwm, duty)
    }
}

impl pwm::ErrorType for RecordingPwm {
    type Error = pwm::ErrorKind;
}

impl pwm::SetDutyCycle for RecordingPwm {
    fn max_duty_cycle(&self) -> u16 {
        self.max
    }

    fn set_duty_cycle(
        &mut self,
        duty: u16,
    ) -> Result<(), Self::Error> {
        if self.reject_nonzero && duty != 0 {
            return Err(pwm::ErrorKind::Other);
        }
        self.duty.set(duty);
        Ok(())
    }
}

/// Serial port with a scripted inbound queue and a captured outbound buffer.
#[derive(Default)]
pub struct LoopbackSerial {
    pub rx: VecDeque<u8>,
    pub tx: Vec<u8>,
    /// Every write fails with `BrokenPipe`, as with nothing on the far end.
    pub broken_tx: bool,
}

impl LoopbackSerial {
    pub fn push(
        &mut self,
        bytes: &[u8],
    ) {
        self.rx.extend(bytes.iter().copied());
    }

    pub fn take_output(&mut self) -> String {
        String::from_utf8(std::mem::take(&mut self.tx)).unwrap()
    }
}

impl embedded_io::ErrorType for LoopbackSerial {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::Read for LoopbackSerial {
    fn read(
        &mut self,
        buf: &mut [u8],
    ) -> Result<usize, Self::Error> {
        let mut n = 0;
        while n < buf.len() {
            match self.rx.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl embedded_io::ReadReady for LoopbackSerial {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.rx.is_empty())
    }
}

impl embedded_io::Write for LoopbackSerial {
    fn write(
        &mut self,
        buf: &[u8],
    ) -> Result<usize, Self::Error> {
        if self.broken_tx {
            return Err(embedded_io::ErrorKind::BrokenPipe);
        }
        self.tx.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub type TestDrive = DifferentialDrive<NullPin, RecordingPwm>;

pub type TestRover = RoverController<
    TriggerPin,
    ScriptedEcho,
    NullPin,
    RecordingPwm,
    LoopbackSerial,
    SimClock,
    SimClock,
>;

/// Drive with full scale 255, plus handles to the left and right duties.
pub fn test_drive() -> (TestDrive, Rc<Cell<u16>>, Rc<Cell<u16>>) {
    let (left_pwm, left_duty) = RecordingPwm::new(255);
    let (right_pwm, right_duty) = RecordingPwm::new(255);
    let drive = DifferentialDrive::new(
        Motor::new(NullPin, NullPin, left_pwm),
        Motor::new(NullPin, NullPin, right_pwm),
    );
    (drive, left_duty, right_duty)
}

/// Rover whose sonars replay the given widths (one entry per cycle).
pub fn test_rover(
    clock: &SimClock,
    front: Vec<Option<u32>>,
    left: Vec<Option<u32>>,
    right: Vec<Option<u32>>,
    config: Option<RoverConfig>,
) -> TestRover {
    let triggers = [TriggerPin::default(), TriggerPin::default(), TriggerPin::default()];
    test_rover_with_triggers(clock, triggers, [front, left, right], config)
}

/// Rover with explicit `[front, left, right]` trigger lines and echo scripts.
pub fn test_rover_with_triggers(
    clock: &SimClock,
    triggers: [TriggerPin; 3],
    widths: [Vec<Option<u32>>; 3],
    config: Option<RoverConfig>,
) -> TestRover {
    let timing = config.unwrap_or_default().sonar;
    let [front, left, right] = widths;
    let [t_front, t_left, t_right] = triggers;
    let head = |trigger: TriggerPin, widths: Vec<Option<u32>>| {
        Rangefinder::new(trigger, ScriptedEcho::new(widths, clock.clone()), timing)
    };
    let sonars = SonarArray::new(
        head(t_front, front),
        head(t_left, left),
        head(t_right, right),
    );
    let (drive, _, _) = test_drive();

    RoverController::new(
        sonars,
        drive,
        LoopbackSerial::default(),
        clock.clone(),
        clock.clone(),
        config,
    )
}

/// Echo width that converts to `cm` centimetres.
pub fn width_for_cm(cm: u32) -> u32 {
    // 1 cm ≈ 58.31 µs of round trip
    (cm as f32 / 0.01715).round() as u32
}
