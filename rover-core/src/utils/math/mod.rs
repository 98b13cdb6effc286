//! Math utilities for the Sonar Rover.
//!
//! This module provides the time-of-flight to distance conversion used by the
//! ultrasonic rangefinders.

pub mod ranging;
