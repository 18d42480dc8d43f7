//! A single timer-backed acceleration/deceleration unit.
//!
//! Lifecycle: `Idle` -> [`RampUnit::lock`] -> `Locked` -> [`RampUnit::start`]
//! -> `Running` -> update interrupt ([`RampUnit::on_timer_expired`]) ->
//! `Done`. [`RampUnit::free`] returns any state to `Idle`.
//!
//! Foreground code must not rewrite the prescale, period or counter registers
//! while the update interrupt is enabled and the timer is counting. `start`
//! always stops first, and the interrupt handler only performs the terminal
//! stop/latch/done sequence.

use serde::{Deserialize, Serialize};

use super::{
    axis::{Axis, AxisId, RampProfile},
    diagnostics::{Anomaly, Diagnostics},
};
use crate::utils::{
    config::{InterruptConfig, RampConfig},
    hal::RampTimer,
    math::ramp::{self, RampMode},
};

/// Index of a unit inside its pool, as seen by the platform layer that owns
/// the timer interrupts.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitId(pub u8);

/// Handle given to the axis that acquired a unit.
///
/// Stamped with the unit's lock generation, so a handle kept after its unit
/// was released or reclaimed no longer matches once the unit is relocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitHandle {
    id: UnitId,
    generation: u16,
}

impl UnitHandle {
    pub fn id(&self) -> UnitId {
        self.id
    }
}

/// Observable state of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampState {
    /// Not bound to any axis.
    Idle,
    /// Bound, parameters snapshotted, timer not counting.
    Locked,
    /// Bound and counting toward the target.
    Running,
    /// Target reached, timer halted, final speed latched.
    Done,
}

/// Completion message produced by the update interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RampComplete {
    pub unit: UnitId,
    pub axis: Option<AxisId>,
    /// Speed latched at completion.
    pub speed: u16,
}

pub struct RampUnit<'a, T> {
    id: UnitId,
    timer: T,
    irq: InterruptConfig,
    ramp: RampConfig,
    axis: Option<&'a dyn Axis>,
    mode: Option<RampMode>,
    profile: RampProfile,
    done: bool,
    generation: u16,
    diag: Diagnostics,
}

impl<'a, T> RampUnit<'a, T>
where
    T: RampTimer,
{
    /// Wrap a timer. The timer is not touched until [`RampUnit::init`].
    pub fn new(
        id: UnitId,
        timer: T,
        irq: InterruptConfig,
        ramp: RampConfig,
    ) -> Self {
        Self {
            id,
            timer,
            irq,
            ramp,
            axis: None,
            mode: None,
            profile: RampProfile::default(),
            done: false,
            generation: 0,
            diag: Diagnostics::default(),
        }
    }

    /// Reset the unit to `Idle` and bring up its timer and interrupt line.
    pub fn init(&mut self) {
        self.axis = None;
        self.mode = None;
        self.done = false;
        self.timer.init();
        self.timer.configure_interrupt(&self.irq);
        tracing::debug!(unit = self.id.0, irq = self.irq.irq_channel, "ramp unit initialised");
    }

    /// Bind the unit to `axis` and snapshot its ramp parameters.
    ///
    /// Does not check whether the unit is already bound; the pool only calls
    /// this on units it has just found free or freed. Any other caller has to
    /// guarantee that itself.
    ///
    /// Every lock starts a new generation, invalidating earlier handles.
    pub fn lock(
        &mut self,
        axis: &'a dyn Axis,
    ) -> UnitHandle {
        self.profile = axis.profile();
        self.axis = Some(axis);
        self.mode = None;
        self.done = false;
        self.generation = self.generation.wrapping_add(1);
        tracing::trace!(unit = self.id.0, axis = axis.id().0, profile = ?self.profile, "ramp unit locked");
        self.handle()
    }

    /// Stop the timer and unbind the unit.
    pub fn free(&mut self) {
        self.stop();
        if let Some(axis) = self.axis.take() {
            tracing::trace!(unit = self.id.0, axis = axis.id().0, "ramp unit freed");
        }
        self.mode = None;
        self.done = false;
    }

    /// Load the registers for a ramp in `mode` and start counting.
    pub fn start(
        &mut self,
        mode: RampMode,
    ) {
        self.stop();
        self.mode = Some(mode);
        self.done = false;

        let RampConfig {
            core_clock_hz,
            min_speed,
        } = self.ramp;
        let plan = match mode {
            RampMode::Accelerating => ramp::accel_plan(
                core_clock_hz,
                self.profile.accel,
                self.profile.max_speed,
                min_speed,
            ),
            RampMode::Decelerating => ramp::decel_plan(
                core_clock_hz,
                self.profile.decel,
                self.profile.max_speed,
                min_speed,
                self.timer.counter(),
            ),
        };

        self.timer.set_prescale(plan.prescale);
        self.timer.set_period(plan.period);
        // the reload zeroes the counter, so the start value goes in after it
        self.timer.reload_prescale();
        self.timer.set_counter(plan.counter);

        self.timer.clear_update_flag();
        self.timer.enable_update_interrupt();
        self.timer.start();
        tracing::debug!(unit = self.id.0, ?mode, ?plan, "ramp started");
    }

    /// Disable the update interrupt and halt the timer.
    ///
    /// A pending update flag is left set; `start` clears it.
    pub fn stop(&mut self) {
        self.timer.disable_update_interrupt();
        self.timer.stop();
    }

    /// Current speed of the ramp.
    ///
    /// Returns the speed floor, and records [`Anomaly::InvalidState`], if the
    /// unit has no ramp mode.
    pub fn cur_speed(&mut self) -> u16 {
        let raw = if self.done {
            self.timer.period()
        } else {
            self.timer.counter()
        };
        match self.mode {
            Some(mode) => ramp::decoded_speed(mode, self.profile.max_speed, raw),
            None => {
                tracing::error!(unit = self.id.0, "speed read from a unit with no ramp mode");
                self.diag.record(Anomaly::InvalidState);
                self.ramp.min_speed
            }
        }
    }

    /// Write the speed directly, for moves without acceleration.
    ///
    /// Values below the speed floor are clamped up to it.
    pub fn set_cur_speed(
        &mut self,
        speed: u16,
    ) {
        let floor = self.ramp.min_speed;
        let speed = if speed < floor {
            tracing::warn!(unit = self.id.0, speed, floor, "speed below floor, clamped");
            self.diag.record(Anomaly::SpeedBelowFloor);
            floor
        } else {
            speed
        };
        self.timer.set_counter(speed);
    }

    /// Completion handler for the timer update interrupt.
    ///
    /// Stops the timer, latches the period into the counter and marks the
    /// ramp done. An update that lands after the unit was stopped or freed
    /// (pending while the foreground held the pool) is ignored and leaves the
    /// unit untouched.
    pub fn on_timer_expired(&mut self) -> Option<RampComplete> {
        if self.axis.is_none() || !self.timer.is_update_interrupt_enabled() {
            tracing::debug!(unit = self.id.0, "late update on an inactive ramp unit ignored");
            return None;
        }
        self.stop();
        let period = self.timer.period();
        self.timer.set_counter(period);
        self.done = true;

        let speed = match self.mode {
            Some(mode) => ramp::decoded_speed(mode, self.profile.max_speed, period),
            None => period,
        };
        Some(RampComplete {
            unit: self.id,
            axis: self.axis.map(|a| a.id()),
            speed,
        })
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Handle for the current lock generation.
    pub fn handle(&self) -> UnitHandle {
        UnitHandle {
            id: self.id,
            generation: self.generation,
        }
    }

    /// Whether `handle` was issued by this unit's current lock.
    pub fn holds(
        &self,
        handle: UnitHandle,
    ) -> bool {
        self.axis.is_some() && handle == self.handle()
    }

    /// Whether the unit is bound to an axis.
    pub fn is_busy(&self) -> bool {
        self.axis.is_some()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn state(&self) -> RampState {
        if self.axis.is_none() {
            RampState::Idle
        } else if self.done {
            RampState::Done
        } else if self.timer.is_running() {
            RampState::Running
        } else {
            RampState::Locked
        }
    }

    pub fn mode(&self) -> Option<RampMode> {
        self.mode
    }

    /// Ramp parameters captured at the last lock.
    pub fn profile(&self) -> RampProfile {
        self.profile
    }

    pub fn bound_axis(&self) -> Option<AxisId> {
        self.axis.map(|a| a.id())
    }

    pub(crate) fn bound(&self) -> Option<&'a dyn Axis> {
        self.axis
    }

    pub fn interrupt(&self) -> &InterruptConfig {
        &self.irq
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.diag
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Raw timer access for the platform layer.
    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{controllers::axis::AxisState, hal::SimTimer};

    fn unit<'a>() -> RampUnit<'a, SimTimer> {
        let mut u = RampUnit::new(
            UnitId(0),
            SimTimer::new(),
            InterruptConfig::new(28, 2, 0),
            RampConfig::default(),
        );
        u.init();
        u
    }

    #[test]
    fn walks_through_every_state() {
        let axis = AxisState::new(AxisId(1), 10_000, 20_000, 20_000);
        let mut u = unit();
        assert_eq!(u.state(), RampState::Idle);

        u.lock(&axis);
        assert_eq!(u.state(), RampState::Locked);

        u.start(RampMode::Accelerating);
        assert_eq!(u.state(), RampState::Running);

        let done = u.on_timer_expired().unwrap();
        assert_eq!(u.state(), RampState::Done);
        assert_eq!(done.speed, 10_000);
        assert_eq!(done.axis, Some(AxisId(1)));

        u.free();
        assert_eq!(u.state(), RampState::Idle);
        assert!(!u.is_busy());
        assert!(!u.timer().is_running());
    }

    #[test]
    fn start_loads_counter_after_reload() {
        let axis = AxisState::new(AxisId(1), 10_000, 20_000, 20_000);
        let mut u = unit();
        u.lock(&axis);
        u.timer_mut().raise_update_flag();
        u.start(RampMode::Accelerating);

        let t = u.timer();
        assert_eq!(t.prescale(), 3_600);
        assert_eq!(t.period(), 10_000);
        assert_eq!(t.counter(), 200);
        assert_eq!(t.reloads(), 1);
        assert!(!t.update_flag());
        assert!(t.is_update_interrupt_enabled());
    }

    #[test]
    fn stop_leaves_update_flag_pending() {
        let axis = AxisState::new(AxisId(1), 10_000, 20_000, 20_000);
        let mut u = unit();
        u.lock(&axis);
        u.start(RampMode::Accelerating);
        u.timer_mut().raise_update_flag();
        u.stop();
        assert!(u.timer().update_flag());
        assert!(!u.timer().is_update_interrupt_enabled());
        assert_eq!(u.state(), RampState::Locked);
    }

    #[test]
    fn decel_tracks_counter_until_done() {
        let axis = AxisState::new(AxisId(1), 10_000, 20_000, 40_000);
        let mut u = unit();
        u.lock(&axis);
        u.set_cur_speed(7_000);
        u.start(RampMode::Decelerating);
        assert_eq!(u.timer().prescale(), 1_800);
        assert_eq!(u.timer().counter(), 3_000);
        assert_eq!(u.cur_speed(), 7_000);

        for _ in 0..10 {
            assert!(!u.timer_mut().tick(500));
            let counter = u.timer().counter();
            assert_eq!(u.cur_speed(), 10_000 - counter);
        }
        // 3000 + 5000 = 8000; 1800 more reaches the 9800 period and one
        // further count overflows
        assert!(!u.timer_mut().tick(1_800));
        assert_eq!(u.cur_speed(), 200);
        assert!(u.timer_mut().tick(1));
        assert!(u.on_timer_expired().is_some());
        assert!(u.is_done());
        assert_eq!(u.cur_speed(), 200);
    }

    #[test]
    fn speed_writes_clamp_to_floor() {
        let mut u = unit();
        u.set_cur_speed(150);
        assert_eq!(u.timer().counter(), 200);
        assert_eq!(u.diagnostics().speed_below_floor, 1);

        u.set_cur_speed(200);
        assert_eq!(u.timer().counter(), 200);
        u.set_cur_speed(4_321);
        assert_eq!(u.timer().counter(), 4_321);
        assert_eq!(u.diagnostics().speed_below_floor, 1);
    }

    #[test]
    fn speed_without_mode_degrades_to_floor() {
        let mut u = unit();
        u.timer_mut().set_counter(5_000);
        assert_eq!(u.cur_speed(), 200);
        assert_eq!(u.diagnostics().invalid_state, 1);
    }

    #[test]
    fn update_after_stop_is_ignored() {
        let axis = AxisState::new(AxisId(1), 10_000, 20_000, 20_000);
        let mut u = unit();
        u.lock(&axis);
        u.start(RampMode::Accelerating);
        u.timer_mut().set_counter(4_000);
        u.stop();
        assert_eq!(u.on_timer_expired(), None);
        assert!(!u.is_done());
        assert_eq!(u.timer().counter(), 4_000);

        u.free();
        assert_eq!(u.on_timer_expired(), None);
        assert_eq!(u.state(), RampState::Idle);
    }

    #[test]
    fn relock_clears_done_and_bumps_generation() {
        let a = AxisState::new(AxisId(1), 10_000, 20_000, 20_000);
        let b = AxisState::new(AxisId(2), 10_000, 20_000, 20_000);
        let mut u = unit();
        let first = u.lock(&a);
        u.start(RampMode::Accelerating);
        u.on_timer_expired();
        assert!(u.is_done());

        let second = u.lock(&b);
        assert_ne!(first, second);
        assert!(!u.is_done());
        assert_eq!(u.mode(), None);
        assert_eq!(u.state(), RampState::Locked);
        assert!(u.holds(second));
        assert!(!u.holds(first));
    }

    #[test]
    fn lock_snapshots_profile() {
        let axis = AxisState::new(AxisId(3), 8_000, 10_000, 10_000);
        let mut u = unit();
        u.lock(&axis);
        axis.set_profile(RampProfile {
            max_speed: 2_000,
            accel: 1,
            decel: 1,
        });
        assert_eq!(u.profile().max_speed, 8_000);
        u.start(RampMode::Accelerating);
        assert_eq!(u.timer().period(), 8_000);
    }
}
