//! Configuration for the ramp subsystem.
//!
//! All types derive `serde` so a board description can be loaded from JSON on
//! the host, or written out as `const` values in firmware.

use serde::{Deserialize, Serialize};

/// Maximum number of hardware timers that can back ramp units.
pub const MAX_RAMP_UNITS: usize = 4;

/// Core clock of the reference target (STM32F1 at 72 MHz).
pub const DEFAULT_CORE_CLOCK_HZ: u32 = 72_000_000;

/// Slowest speed value the ramp units will accept.
pub const DEFAULT_MIN_SPEED: u16 = 200;

/// Clock and speed limits shared by every unit in a pool.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct RampConfig {
    /// Timer input clock in Hz; divided by accel/decel to get the prescale.
    pub core_clock_hz: u32,
    /// Speed floor. Lower writes are clamped up to this value.
    pub min_speed: u16,
}

impl Default for RampConfig {
    fn default() -> Self {
        Self {
            core_clock_hz: DEFAULT_CORE_CLOCK_HZ,
            min_speed: DEFAULT_MIN_SPEED,
        }
    }
}

/// Interrupt controller settings for one timer update line.
///
/// Higher `preemption_priority` values preempt less.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterruptConfig {
    pub irq_channel: u8,
    pub preemption_priority: u8,
    pub sub_priority: u8,
}

impl InterruptConfig {
    pub const fn new(
        irq_channel: u8,
        preemption_priority: u8,
        sub_priority: u8,
    ) -> Self {
        Self {
            irq_channel,
            preemption_priority,
            sub_priority,
        }
    }
}

/// Board-level description of a ramp pool: shared limits plus one interrupt
/// line per timer, in registration order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    #[serde(default)]
    pub ramp: RampConfig,
    pub units: heapless::Vec<InterruptConfig, MAX_RAMP_UNITS>,
}

impl Default for PoolConfig {
    /// TIM2..TIM5 update lines, all at preemption priority 1.
    fn default() -> Self {
        let mut units = heapless::Vec::new();
        for (irq, sub) in [(28u8, 0u8), (29, 1), (30, 2), (50, 3)] {
            // capacity is MAX_RAMP_UNITS, four entries always fit
            let _ = units.push(InterruptConfig::new(irq, 1, sub));
        }
        Self {
            ramp: RampConfig::default(),
            units,
        }
    }
}
