use clap::Parser;
use embassy_executor::{Executor, Spawner};
use embassy_time::Delay;
use embedded_hal::{digital, pwm};
use rover_core::{
    mk_static,
    utils::{
        controllers::{
            motors::{DifferentialDrive, Motor},
            sonar::{PulseIn, Rangefinder, SonarArray},
        },
        math::ranging::{NO_ECHO_CM, SPEED_OF_SOUND_CM_PER_US},
        EmbassyClock, RoverConfig, RoverController,
    },
};
use static_cell::StaticCell;
use std::{
    collections::VecDeque,
    convert::Infallible,
    io::{Read as _, Write as _},
    sync::mpsc::{self, Receiver},
};
use tracing::{error, info, trace};

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts
{
    /// simulated distance to the obstacle ahead (cm, 999 = nothing)
    #[clap(long, default_value_t = 120)]
    front: u16,
    /// simulated distance on the left (cm, 999 = nothing)
    #[clap(long, default_value_t = NO_ECHO_CM)]
    left: u16,
    /// simulated distance on the right (cm, 999 = nothing)
    #[clap(long, default_value_t = 45)]
    right: u16,
    /// stop after this many cycles instead of running forever
    #[clap(long)]
    cycles: Option<u64>,
}

/// Echo line that answers with a fixed obstacle distance.
struct SimulatedEcho {
    width_us: Option<u32>,
}

impl SimulatedEcho {
    fn at(cm: u16) -> Self {
        let width_us = (cm != NO_ECHO_CM)
            .then(|| (cm as f32 * 2.0 / SPEED_OF_SOUND_CM_PER_US) as u32);
        Self { width_us }
    }
}

impl PulseIn for SimulatedEcho {
    fn pulse_in(&mut self, timeout_us: u32) -> Option<u32> {
        self.width_us.filter(|w| *w < timeout_us)
    }
}

/// Output pin that logs its level changes.
struct LogPin(&'static str);

impl digital::ErrorType for LogPin {
    type Error = Infallible;
}

impl digital::OutputPin for LogPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        trace!(pin = self.0, "low");
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        trace!(pin = self.0, "high");
        Ok(())
    }
}

/// 8-bit PWM channel that logs its duty.
struct LogPwm(&'static str);

impl pwm::ErrorType for LogPwm {
    type Error = Infallible;
}

impl pwm::SetDutyCycle for LogPwm {
    fn max_duty_cycle(&self) -> u16 {
        255
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        info!(channel = self.0, duty, "pwm");
        Ok(())
    }
}

/// Serial link over the process stdio. A reader thread feeds stdin bytes
/// through a channel so `read_ready` never blocks.
struct StdioSerial {
    inbound: Receiver<u8>,
    pending: VecDeque<u8>,
}

impl StdioSerial {
    fn spawn() -> Self {
        let (tx, inbound) = mpsc::channel();
        std::thread::spawn(move || {
            for byte in std::io::stdin().lock().bytes() {
                match byte {
                    Ok(b) if tx.send(b).is_ok() => {}
                    _ => break,
                }
            }
        });
        Self {
            inbound,
            pending: VecDeque::new(),
        }
    }
}

impl embedded_io::ErrorType for StdioSerial {
    type Error = std::io::Error;
}

impl embedded_io::ReadReady for StdioSerial {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        self.pending.extend(self.inbound.try_iter());
        Ok(!self.pending.is_empty())
    }
}

impl embedded_io::Read for StdioSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.pending.is_empty() && !buf.is_empty() {
            // Blocking read, as a UART would wait for the next byte.
            if let Ok(b) = self.inbound.recv() {
                self.pending.push_back(b);
            }
        }
        let n = buf.len().min(self.pending.len());
        for (slot, b) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = b;
        }
        Ok(n)
    }
}

impl embedded_io::Write for StdioSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut out = std::io::stdout().lock();
        out.write_all(buf)?;
        out.flush()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::stdout().flush()
    }
}

type SimRover = RoverController<
    LogPin,
    SimulatedEcho,
    LogPin,
    LogPwm,
    StdioSerial,
    EmbassyClock,
    Delay,
>;

#[embassy_executor::task]
async fn rover_task(rover: &'static mut SimRover, cycles: Option<u64>) {
    let Some(limit) = cycles else {
        rover.run();
    };

    if let Err(e) = rover.init() {
        error!("init failed: {:?}", e);
    }
    for _ in 0..limit {
        let report = rover.cycle();
        trace!(?report, "cycle");
    }
    info!("finished {} cycles", limit);
    std::process::exit(0);
}

#[embassy_executor::task]
async fn main_task(spawner: Spawner) {
    let opts: Opts = Opts::parse();
    let config = RoverConfig::default();

    let head = |name, cm| Rangefinder::new(LogPin(name), SimulatedEcho::at(cm), config.sonar);
    let sonars = SonarArray::new(
        head("trig_f", opts.front),
        head("trig_l", opts.left),
        head("trig_r", opts.right),
    );
    let drive = DifferentialDrive::new(
        Motor::new(LogPin("in1_l"), LogPin("in2_l"), LogPwm("ena")),
        Motor::new(LogPin("in1_r"), LogPin("in2_r"), LogPwm("enb")),
    );

    info!(
        front = opts.front,
        left = opts.left,
        right = opts.right,
        "simulated rover up; send F/B/L/R/S on stdin"
    );
    let rover = mk_static!(
        SimRover,
        RoverController::new(
            sonars,
            drive,
            StdioSerial::spawn(),
            EmbassyClock,
            Delay,
            Some(config),
        )
    );
    spawner.spawn(rover_task(rover, opts.cycles)).unwrap();
}

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    // Logs go to stderr; stdout carries the telemetry stream.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner.spawn(main_task(spawner)).unwrap();
    });
}
