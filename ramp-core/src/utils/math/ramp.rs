//! Register arithmetic for timer-generated velocity ramps.
//!
//! The ramp timer counts upward from an initial value to its period, and the
//! counter itself is read back as the current speed. The count rate
//! (`core_clock / prescale`) is therefore the acceleration in speed units per
//! second, and the period is the target speed.
//!
//! Deceleration cannot count down, so it counts the *speed deficit* upward:
//! the counter starts at `max_speed - current_speed` and runs to
//! `max_speed - min_speed`, and the speed is decoded as `max_speed - counter`.
//!
//! # Example
//! ```rust
//! use ramp_core::utils::math::ramp::{accel_plan, decoded_speed, RampMode};
//! let plan = accel_plan(72_000_000, 20_000, 10_000, 200);
//! assert_eq!(plan.prescale, 3_600);
//! assert_eq!(decoded_speed(RampMode::Accelerating, 10_000, plan.period), 10_000);
//! ```

use serde::{Deserialize, Serialize};

/// Direction of a velocity ramp.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RampMode {
    Accelerating,
    Decelerating,
}

/// Register values to load before starting a ramp.
///
/// `counter` must be written after the prescale reload, which clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterPlan {
    pub prescale: u16,
    pub period: u16,
    pub counter: u16,
}

/// Prescale for a ramp rate, saturating at the slowest setting.
///
/// A zero rate has no finite prescale and maps to `0xFFFF` as well.
pub fn prescale_for(
    core_clock_hz: u32,
    rate: u32,
) -> u16 {
    core_clock_hz
        .checked_div(rate)
        .and_then(|p| u16::try_from(p).ok())
        .unwrap_or(u16::MAX)
}

/// Registers for a ramp from the speed floor up to `max_speed`.
pub fn accel_plan(
    core_clock_hz: u32,
    accel: u32,
    max_speed: u16,
    min_speed: u16,
) -> RegisterPlan {
    RegisterPlan {
        prescale: prescale_for(core_clock_hz, accel),
        period: max_speed,
        counter: min_speed,
    }
}

/// Registers for a ramp from `current_speed` down to the speed floor.
pub fn decel_plan(
    core_clock_hz: u32,
    decel: u32,
    max_speed: u16,
    min_speed: u16,
    current_speed: u16,
) -> RegisterPlan {
    RegisterPlan {
        prescale: prescale_for(core_clock_hz, decel),
        period: max_speed.saturating_sub(min_speed),
        counter: max_speed.saturating_sub(current_speed),
    }
}

/// Speed represented by a raw counter value in the given mode.
pub fn decoded_speed(
    mode: RampMode,
    max_speed: u16,
    counter: u16,
) -> u16 {
    match mode {
        RampMode::Accelerating => counter,
        RampMode::Decelerating => max_speed.saturating_sub(counter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLK: u32 = 72_000_000;

    #[test]
    fn accel_plan_targets_max_speed_from_floor() {
        let plan = accel_plan(CLK, 20_000, 10_000, 200);
        assert_eq!(
            plan,
            RegisterPlan {
                prescale: 3_600,
                period: 10_000,
                counter: 200
            }
        );
    }

    #[test]
    fn decel_plan_counts_the_speed_deficit() {
        let plan = decel_plan(CLK, 40_000, 10_000, 200, 6_000);
        assert_eq!(plan.prescale, 1_800);
        assert_eq!(plan.period, 9_800);
        assert_eq!(plan.counter, 4_000);
        // decoding the starting counter gives back the starting speed
        assert_eq!(decoded_speed(RampMode::Decelerating, 10_000, plan.counter), 6_000);
        // and the period decodes to the floor
        assert_eq!(decoded_speed(RampMode::Decelerating, 10_000, plan.period), 200);
    }

    #[test]
    fn prescale_saturates() {
        assert_eq!(prescale_for(CLK, 0), u16::MAX);
        // 72 MHz / 1000 = 72000 does not fit in 16 bits
        assert_eq!(prescale_for(CLK, 1_000), u16::MAX);
        assert_eq!(prescale_for(CLK, 72_000_000), 1);
    }

    #[test]
    fn decel_subtractions_do_not_wrap() {
        let plan = decel_plan(CLK, 20_000, 150, 200, 300);
        assert_eq!(plan.period, 0);
        assert_eq!(plan.counter, 0);
        assert_eq!(decoded_speed(RampMode::Decelerating, 150, 400), 0);
    }
}
