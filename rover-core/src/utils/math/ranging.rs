//! Time-of-flight ranging for HC-SR04 style ultrasonic sensors.
//!
//! The echo pin stays high for the round trip of the burst, so the one-way
//! distance is half the pulse width times the speed of sound.
//!
//! # Example
//! ```rust
//! use rover_core::utils::math::ranging::{echo_to_cm, NO_ECHO_CM};
//! assert_eq!(echo_to_cm(1166), 20);
//! assert_eq!(echo_to_cm(40_000), NO_ECHO_CM);
//! ```

use libm;

/// Distance reported when no echo arrived or the reading is out of range.
pub const NO_ECHO_CM: u16 = 999;

/// Largest distance reported as a real reading (cm).
pub const MAX_RANGE_CM: u16 = 600;

/// Speed of sound in cm/µs (≈343 m/s).
pub const SPEED_OF_SOUND_CM_PER_US: f32 = 0.0343;

/// Convert a round-trip echo pulse width into a one-way distance.
///
/// Returns [`NO_ECHO_CM`] for a zero width (no echo) and for anything that
/// works out farther than [`MAX_RANGE_CM`].
pub fn echo_to_cm(duration_us: u32) -> u16 {
    if duration_us == 0 {
        return NO_ECHO_CM;
    }

    let cm = libm::roundf(duration_us as f32 * SPEED_OF_SOUND_CM_PER_US / 2.0);
    if cm > MAX_RANGE_CM as f32 {
        NO_ECHO_CM
    } else {
        cm as u16
    }
}
