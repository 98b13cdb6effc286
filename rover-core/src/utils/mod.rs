//! Utility re-exports and helper macros for the Sonar Rover.
//!
//! This module re-exports the hardware controllers, the serial link handlers,
//! and the ranging math, and provides a helper macro for static init:
//!
//! - `connection`: telemetry emission and command interpretation over serial
//! - `controllers`: rangefinders, motors, and the main cycle scheduler
//! - `math`: echo-time to distance conversion
//! - `time`: the monotonic clock abstraction used by the scheduler
//!
//! The `mk_static!` macro simplifies static initialization in no-std contexts.

pub mod connection;
pub mod controllers;
pub mod math;
pub mod time;

pub use connection::{commands::CommandTable, telemetry::Telemetry};
pub use controllers::{RoverConfig, RoverController, RoverError};
pub use time::{Clock, EmbassyClock};

#[macro_export]
/// Initialize a no-std static cell and write the given value into it.
///
/// This macro creates a `static_cell::StaticCell` for type `$t` and initializes
/// it with `$val`, returning a mutable reference to the stored value.
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        STATIC_CELL.uninit().write($val)
    }};
}
