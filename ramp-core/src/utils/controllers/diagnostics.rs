//! Non-fatal anomaly reporting.
//!
//! Every anomaly is handled where it is detected by returning a sentinel. The
//! only other trace is a log line and a bump of the matching counter here.

/// Anomalies the ramp subsystem recovers from on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anomaly {
    /// No free and no reclaimable unit for an acquire.
    ResourceExhausted,
    /// Pool initialised with no registered units.
    ConfigurationEmpty,
    /// Speed read from a unit that has no ramp mode.
    InvalidState,
    /// Speed write below the floor, clamped up.
    SpeedBelowFloor,
    /// Unit taken back from an axis that finished without releasing it.
    StaleLockReclaimed,
}

/// Saturating per-anomaly counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub resource_exhausted: u32,
    pub configuration_empty: u32,
    pub invalid_state: u32,
    pub speed_below_floor: u32,
    pub stale_lock_reclaimed: u32,
}

impl Diagnostics {
    pub fn record(
        &mut self,
        anomaly: Anomaly,
    ) {
        let slot = match anomaly {
            Anomaly::ResourceExhausted => &mut self.resource_exhausted,
            Anomaly::ConfigurationEmpty => &mut self.configuration_empty,
            Anomaly::InvalidState => &mut self.invalid_state,
            Anomaly::SpeedBelowFloor => &mut self.speed_below_floor,
            Anomaly::StaleLockReclaimed => &mut self.stale_lock_reclaimed,
        };
        *slot = slot.saturating_add(1);
    }

    /// Sum of two counter sets.
    pub fn merged(
        self,
        other: Diagnostics,
    ) -> Diagnostics {
        Diagnostics {
            resource_exhausted: self.resource_exhausted.saturating_add(other.resource_exhausted),
            configuration_empty: self
                .configuration_empty
                .saturating_add(other.configuration_empty),
            invalid_state: self.invalid_state.saturating_add(other.invalid_state),
            speed_below_floor: self.speed_below_floor.saturating_add(other.speed_below_floor),
            stale_lock_reclaimed: self
                .stale_lock_reclaimed
                .saturating_add(other.stale_lock_reclaimed),
        }
    }

    pub fn total(&self) -> u32 {
        self.resource_exhausted
            .saturating_add(self.configuration_empty)
            .saturating_add(self.invalid_state)
            .saturating_add(self.speed_below_floor)
            .saturating_add(self.stale_lock_reclaimed)
    }
}
