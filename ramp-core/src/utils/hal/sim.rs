//! Software model of an up-counting timer, for host tests and the mock MCU.

use super::RampTimer;
use crate::utils::config::InterruptConfig;

/// Simulated 16-bit up-counting timer.
///
/// The counter only moves when [`SimTimer::tick`] is called, which stands in
/// for the timer clock. As on an STM32 up-counter, the counter holds the
/// period for one count and the update event happens on the following count,
/// when it overflows back to zero.
#[derive(Debug, Clone, Default)]
pub struct SimTimer {
    prescale: u16,
    period: u16,
    counter: u16,
    running: bool,
    update_irq_enabled: bool,
    update_flag: bool,
    irq: Option<InterruptConfig>,
    reloads: u32,
}

impl SimTimer {
    pub const fn new() -> Self {
        Self {
            prescale: 0,
            period: 0,
            counter: 0,
            running: false,
            update_irq_enabled: false,
            update_flag: false,
            irq: None,
            reloads: 0,
        }
    }

    /// Advance the counter by `steps` counts.
    ///
    /// Returns `true` when the counter overflowed past the period during this
    /// call while the update interrupt was enabled, i.e. when the platform
    /// should run the owning unit's completion handler.
    pub fn tick(
        &mut self,
        steps: u16,
    ) -> bool {
        if !self.running {
            return false;
        }
        let next = u32::from(self.counter) + u32::from(steps);
        if next > u32::from(self.period) {
            // overflow: the hardware wraps to zero and flags the update
            self.counter = 0;
            self.update_flag = true;
            self.update_irq_enabled
        } else {
            // next <= period, which fits in 16 bits
            self.counter = next as u16;
            false
        }
    }

    pub fn update_flag(&self) -> bool {
        self.update_flag
    }

    /// Interrupt line programmed by [`RampTimer::configure_interrupt`].
    pub fn interrupt(&self) -> Option<InterruptConfig> {
        self.irq
    }

    /// Number of forced prescale reloads so far.
    pub fn reloads(&self) -> u32 {
        self.reloads
    }

    /// Raise the update flag without touching the counter, as a stale event
    /// left over from an earlier run would.
    pub fn raise_update_flag(&mut self) {
        self.update_flag = true;
    }
}

impl RampTimer for SimTimer {
    fn init(&mut self) {
        self.running = false;
        self.update_irq_enabled = false;
        self.update_flag = false;
        self.prescale = 0xFFFF;
        self.period = 0xFFFF;
        self.counter = 0;
    }

    fn configure_interrupt(
        &mut self,
        irq: &InterruptConfig,
    ) {
        self.irq = Some(*irq);
    }

    fn prescale(&self) -> u16 {
        self.prescale
    }

    fn set_prescale(
        &mut self,
        prescale: u16,
    ) {
        self.prescale = prescale;
    }

    fn period(&self) -> u16 {
        self.period
    }

    fn set_period(
        &mut self,
        period: u16,
    ) {
        self.period = period;
    }

    fn counter(&self) -> u16 {
        self.counter
    }

    fn set_counter(
        &mut self,
        counter: u16,
    ) {
        self.counter = counter;
    }

    fn reload_prescale(&mut self) {
        // update generation: counter cleared, update flag raised
        self.counter = 0;
        self.update_flag = true;
        self.reloads = self.reloads.saturating_add(1);
    }

    fn clear_update_flag(&mut self) {
        self.update_flag = false;
    }

    fn enable_update_interrupt(&mut self) {
        self.update_irq_enabled = true;
    }

    fn disable_update_interrupt(&mut self) {
        self.update_irq_enabled = false;
    }

    fn is_update_interrupt_enabled(&self) -> bool {
        self.update_irq_enabled
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_fires_only_with_interrupt_enabled() {
        let mut t = SimTimer::new();
        t.init();
        t.set_period(10);
        t.start();
        assert!(!t.tick(11));
        assert!(t.update_flag());
        assert_eq!(t.counter(), 0);

        t.clear_update_flag();
        t.enable_update_interrupt();
        assert!(!t.tick(4));
        assert_eq!(t.counter(), 4);
        assert!(!t.tick(6));
        assert_eq!(t.counter(), 10);
        assert!(!t.update_flag());
        assert!(t.tick(1));
    }

    #[test]
    fn full_range_period_still_overflows() {
        let mut t = SimTimer::new();
        t.init();
        t.enable_update_interrupt();
        t.set_counter(0xFFF0);
        t.start();
        assert!(!t.tick(0x0F));
        assert!(t.tick(1));
    }

    #[test]
    fn stopped_timer_holds_counter() {
        let mut t = SimTimer::new();
        t.init();
        t.set_counter(5);
        assert!(!t.tick(100));
        assert_eq!(t.counter(), 5);
    }

    #[test]
    fn prescale_reload_zeroes_counter() {
        let mut t = SimTimer::new();
        t.set_counter(1234);
        t.reload_prescale();
        assert_eq!(t.counter(), 0);
        assert!(t.update_flag());
        assert_eq!(t.reloads(), 1);
    }
}
