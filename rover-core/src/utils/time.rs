//! Monotonic time source for the control loop.
//!
//! The scheduler and the echo timer only need "now" in micro- or milliseconds.
//! On hardware that comes from `embassy-time`; tests supply a simulated clock.

/// Monotonic clock with microsecond resolution.
pub trait Clock {
    /// Microseconds since an arbitrary, fixed origin.
    fn now_us(&self) -> u64;

    /// Milliseconds since the same origin as [`Clock::now_us`].
    fn now_ms(&self) -> u64 {
        self.now_us() / 1_000
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}

/// `Clock` backed by the global `embassy-time` driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_us(&self) -> u64 {
        embassy_time::Instant::now().as_micros()
    }

    fn now_ms(&self) -> u64 {
        embassy_time::Instant::now().as_millis()
    }
}
