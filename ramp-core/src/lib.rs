//! Timer-backed acceleration/deceleration units for stepper axes on no-std
//! embedded platforms.
//!
//! For a host-side walkthrough on simulated timers, see `ramp-app/mock-mcu`.
#![no_std]

pub mod utils;
