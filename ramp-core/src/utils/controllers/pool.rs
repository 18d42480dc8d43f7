//! Fixed-capacity pool of ramp units.
//!
//! The pool is assembled once at startup by registering one timer per unit,
//! initialised with [`RampPool::init_all`], and then lends units to motor axes
//! through [`RampPool::acquire`] / [`RampPool::release`]. Capacity is a const
//! generic, so the footprint is fixed at build time.
//!
//! The pool expects a single foreground context. If several tasks can request
//! units, wrap it in a [`super::isr::SharedRampPool`] so each acquire runs as
//! one critical section.

use heapless::Vec;

use super::{
    axis::{Axis, AxisId},
    diagnostics::{Anomaly, Diagnostics},
    unit::{RampComplete, RampState, RampUnit, UnitHandle, UnitId},
};
use crate::utils::{
    config::{InterruptConfig, PoolConfig, RampConfig, MAX_RAMP_UNITS},
    hal::RampTimer,
    math::ramp::RampMode,
};

/// Errors raised while assembling a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// More units registered than the pool can hold.
    CapacityExceeded { capacity: usize },
    /// The board config names more units than timers were supplied.
    MissingTimer { unit: usize },
}

impl core::fmt::Display for PoolError {
    fn fmt(
        &self,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        match self {
            PoolError::CapacityExceeded { capacity } => {
                write!(f, "ramp pool is full ({capacity} units)")
            }
            PoolError::MissingTimer { unit } => write!(f, "no timer supplied for ramp unit {unit}"),
        }
    }
}

impl core::error::Error for PoolError {}

pub struct RampPool<'a, T, const N: usize = MAX_RAMP_UNITS> {
    units: Vec<RampUnit<'a, T>, N>,
    ramp: RampConfig,
    diag: Diagnostics,
}

impl<'a, T, const N: usize> RampPool<'a, T, N>
where
    T: RampTimer,
{
    /// Empty pool; every unit registered later shares `ramp`.
    pub const fn new(ramp: RampConfig) -> Self {
        Self {
            units: Vec::new(),
            ramp,
            diag: Diagnostics {
                resource_exhausted: 0,
                configuration_empty: 0,
                invalid_state: 0,
                speed_below_floor: 0,
                stale_lock_reclaimed: 0,
            },
        }
    }

    /// Build a pool from a board description, pairing each configured
    /// interrupt line with the next timer.
    pub fn from_config<I>(
        config: &PoolConfig,
        timers: I,
    ) -> Result<Self, PoolError>
    where
        I: IntoIterator<Item = T>,
    {
        let mut pool = Self::new(config.ramp);
        let mut timers = timers.into_iter();
        for (i, irq) in config.units.iter().enumerate() {
            let timer = timers.next().ok_or(PoolError::MissingTimer { unit: i })?;
            pool.register(timer, *irq)?;
        }
        Ok(pool)
    }

    /// Add a unit backed by `timer`. Registration order is scan order.
    pub fn register(
        &mut self,
        timer: T,
        irq: InterruptConfig,
    ) -> Result<UnitId, PoolError> {
        let full = PoolError::CapacityExceeded { capacity: N };
        let id = UnitId(u8::try_from(self.units.len()).map_err(|_| full)?);
        self.units
            .push(RampUnit::new(id, timer, irq, self.ramp))
            .map_err(|_| full)?;
        Ok(id)
    }

    /// Initialise every unit's timer and interrupt line.
    ///
    /// An empty pool is reported but not treated as fatal; every later
    /// acquire will simply fail.
    pub fn init_all(&mut self) {
        for unit in self.units.iter_mut() {
            unit.init();
        }
        if self.units.is_empty() {
            tracing::error!("no ramp units registered, no axis will be able to move");
            self.diag.record(Anomaly::ConfigurationEmpty);
        } else {
            tracing::info!(units = self.units.len(), "ramp units initialised");
        }
    }

    /// Largest preemption priority value among the units, i.e. the least
    /// urgent one. Zero for an empty pool.
    pub fn lowest_preemption_priority(&self) -> u8 {
        self.units
            .iter()
            .map(|u| u.interrupt().preemption_priority)
            .max()
            .unwrap_or(0)
    }

    /// Lend a unit to `axis`.
    ///
    /// The first free unit in registration order wins. If none is free, a
    /// unit whose bound axis reports itself idle is assumed to have been
    /// leaked by a missing [`RampPool::release`] and is taken back. This is a
    /// best-effort guess that trusts the axis' own busy flag.
    ///
    /// An axis that already holds a unit gets the same unit back, relocked.
    /// Every successful acquire issues a fresh handle; handles from earlier
    /// locks stop working.
    pub fn acquire(
        &mut self,
        axis: &'a dyn Axis,
    ) -> Option<UnitHandle> {
        let id = axis.id();

        if let Some(unit) = self.units.iter_mut().find(|u| u.bound_axis() == Some(id)) {
            unit.free();
            let handle = unit.lock(axis);
            tracing::debug!(unit = unit.id().0, axis = id.0, "axis relocked its ramp unit");
            return Some(handle);
        }

        if let Some(unit) = self.units.iter_mut().find(|u| !u.is_busy()) {
            let handle = unit.lock(axis);
            tracing::debug!(unit = unit.id().0, axis = id.0, "ramp unit acquired");
            return Some(handle);
        }

        let stale = self
            .units
            .iter_mut()
            .find(|u| u.bound().is_some_and(|owner| !owner.is_busy()));
        if let Some(unit) = stale {
            tracing::warn!(
                unit = unit.id().0,
                stale_axis = ?unit.bound_axis(),
                axis = id.0,
                "reclaiming ramp unit from an idle axis that never released it"
            );
            unit.free();
            let handle = unit.lock(axis);
            self.diag.record(Anomaly::StaleLockReclaimed);
            return Some(handle);
        }

        tracing::warn!(
            axis = id.0,
            capacity = self.units.len(),
            "no ramp unit available, too many axes moving at once"
        );
        self.diag.record(Anomaly::ResourceExhausted);
        None
    }

    /// Stop and unbind every unit held by `axis`. Returns how many were
    /// released; zero is not an error.
    pub fn release(
        &mut self,
        axis: AxisId,
    ) -> usize {
        let mut released = 0;
        for unit in self.units.iter_mut().filter(|u| u.bound_axis() == Some(axis)) {
            unit.free();
            released += 1;
        }
        released
    }

    pub fn start(
        &mut self,
        unit: UnitHandle,
        mode: RampMode,
    ) {
        if let Some(u) = self.checked_mut(unit) {
            u.start(mode);
        }
    }

    pub fn stop(
        &mut self,
        unit: UnitHandle,
    ) {
        if let Some(u) = self.checked_mut(unit) {
            u.stop();
        }
    }

    /// Current ramp speed, or the speed floor for a stale handle.
    pub fn cur_speed(
        &mut self,
        unit: UnitHandle,
    ) -> u16 {
        let floor = self.ramp.min_speed;
        self.checked_mut(unit).map_or(floor, |u| u.cur_speed())
    }

    pub fn set_cur_speed(
        &mut self,
        unit: UnitHandle,
        speed: u16,
    ) {
        if let Some(u) = self.checked_mut(unit) {
            u.set_cur_speed(speed);
        }
    }

    pub fn is_done(
        &mut self,
        unit: UnitHandle,
    ) -> bool {
        self.checked_mut(unit).is_some_and(|u| u.is_done())
    }

    /// State of the unit behind `unit`, `None` for a stale handle.
    pub fn state(
        &mut self,
        unit: UnitHandle,
    ) -> Option<RampState> {
        self.checked_mut(unit).map(|u| u.state())
    }

    /// Run the completion transition of `unit`. Called from its update
    /// interrupt.
    pub fn on_timer_expired(
        &mut self,
        unit: UnitId,
    ) -> Option<RampComplete> {
        self.units
            .get_mut(usize::from(unit.0))
            .and_then(|u| u.on_timer_expired())
    }

    pub fn unit(
        &self,
        unit: UnitId,
    ) -> Option<&RampUnit<'a, T>> {
        self.units.get(usize::from(unit.0))
    }

    pub fn unit_mut(
        &mut self,
        unit: UnitId,
    ) -> Option<&mut RampUnit<'a, T>> {
        self.units.get_mut(usize::from(unit.0))
    }

    pub fn units(&self) -> impl Iterator<Item = &RampUnit<'a, T>> {
        self.units.iter()
    }

    pub fn units_mut(&mut self) -> impl Iterator<Item = &mut RampUnit<'a, T>> {
        self.units.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of units currently bound to an axis.
    pub fn busy_count(&self) -> usize {
        self.units.iter().filter(|u| u.is_busy()).count()
    }

    pub fn ramp_config(&self) -> &RampConfig {
        &self.ramp
    }

    /// Anomaly counters of the pool and all of its units.
    pub fn diagnostics(&self) -> Diagnostics {
        self.units
            .iter()
            .fold(self.diag, |acc, u| acc.merged(u.diagnostics()))
    }

    /// Unit lookup for handle-addressed calls. A handle whose unit has since
    /// been released, reclaimed or relocked is an invalid-state anomaly.
    fn checked_mut(
        &mut self,
        unit: UnitHandle,
    ) -> Option<&mut RampUnit<'a, T>> {
        let idx = usize::from(unit.id().0);
        if !self.units.get(idx).is_some_and(|u| u.holds(unit)) {
            tracing::error!(unit = unit.id().0, "stale ramp unit handle");
            self.diag.record(Anomaly::InvalidState);
            return None;
        }
        self.units.get_mut(idx)
    }
}
