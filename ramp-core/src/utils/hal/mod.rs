//! Timer capability consumed by the ramp units.
//!
//! A ramp unit drives a single up-counting 16-bit timer. The trait mirrors the
//! register set of a general-purpose STM32 timer closely enough that a PAC
//! backend is a thin wrapper, while `SimTimer` models it in software.

pub mod sim;

use crate::utils::config::InterruptConfig;

pub use sim::SimTimer;

/// Register-level access to one hardware timer channel.
pub trait RampTimer {
    /// Put the timer into the ramp time base: up-counting, no clock
    /// division, prescale and period at `0xFFFF`, no repetition, period
    /// preload enabled. The timer is left stopped.
    fn init(&mut self);

    /// Program and enable the update interrupt line at the interrupt
    /// controller.
    fn configure_interrupt(
        &mut self,
        irq: &InterruptConfig,
    );

    fn prescale(&self) -> u16;
    fn set_prescale(
        &mut self,
        prescale: u16,
    );

    fn period(&self) -> u16;
    fn set_period(
        &mut self,
        period: u16,
    );

    fn counter(&self) -> u16;
    fn set_counter(
        &mut self,
        counter: u16,
    );

    /// Force an update generation so a new prescale takes effect now.
    ///
    /// The hardware zeroes the counter and raises the update flag as side
    /// effects.
    fn reload_prescale(&mut self);

    /// Clear a pending update event flag.
    fn clear_update_flag(&mut self);

    fn enable_update_interrupt(&mut self);
    fn disable_update_interrupt(&mut self);
    fn is_update_interrupt_enabled(&self) -> bool;

    /// Start counting.
    fn start(&mut self);
    /// Halt counting. Pending flags are left untouched.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}
