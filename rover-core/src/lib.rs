//! Core drivers and the cooperative control loop for the Sonar Rover on no-std
//! embedded platforms.
//!
//! For a host-side simulation of the board, see `rover-app/mock-mcu`.
#![no_std]

extern crate alloc;

pub mod utils;
