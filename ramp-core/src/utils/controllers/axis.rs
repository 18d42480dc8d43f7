//! Motor axis as seen by the ramp pool.
//!
//! The pool never owns an axis. It keeps a shared reference to the axis a unit
//! is bound to, and asks that axis whether it is still moving when looking for
//! units to reclaim.

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// Stable identity of a motor axis.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AxisId(pub u8);

/// Ramp parameters copied into a unit when it is locked.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RampProfile {
    pub max_speed: u16,
    pub accel: u32,
    pub decel: u32,
}

impl Default for RampProfile {
    fn default() -> Self {
        Self {
            max_speed: 10_000,
            accel: 20_000,
            decel: 20_000,
        }
    }
}

/// A motor axis that can borrow a ramp unit.
///
/// `Sync` because the pool holding the reference is shared with interrupt
/// context.
pub trait Axis: Sync {
    fn id(&self) -> AxisId;

    /// Whether the axis is still executing a move.
    ///
    /// Used by the pool to detect units that were never released.
    fn is_busy(&self) -> bool;

    /// Current ramp parameters of the axis.
    fn profile(&self) -> RampProfile;
}

/// Axis state backed by atomics, so it can live in a `static` and be updated
/// from the motion task while the pool holds a reference to it.
#[derive(Debug)]
pub struct AxisState {
    id: AxisId,
    busy: AtomicBool,
    max_speed: AtomicU16,
    accel: AtomicU32,
    decel: AtomicU32,
}

impl AxisState {
    pub const fn new(
        id: AxisId,
        max_speed: u16,
        accel: u32,
        decel: u32,
    ) -> Self {
        Self {
            id,
            busy: AtomicBool::new(false),
            max_speed: AtomicU16::new(max_speed),
            accel: AtomicU32::new(accel),
            decel: AtomicU32::new(decel),
        }
    }

    pub fn with_profile(
        id: AxisId,
        profile: RampProfile,
    ) -> Self {
        Self::new(id, profile.max_speed, profile.accel, profile.decel)
    }

    pub fn set_busy(
        &self,
        busy: bool,
    ) {
        self.busy.store(busy, Ordering::Release);
    }

    pub fn set_profile(
        &self,
        profile: RampProfile,
    ) {
        self.max_speed.store(profile.max_speed, Ordering::Relaxed);
        self.accel.store(profile.accel, Ordering::Relaxed);
        self.decel.store(profile.decel, Ordering::Relaxed);
    }
}

impl Axis for AxisState {
    fn id(&self) -> AxisId {
        self.id
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn profile(&self) -> RampProfile {
        RampProfile {
            max_speed: self.max_speed.load(Ordering::Relaxed),
            accel: self.accel.load(Ordering::Relaxed),
            decel: self.decel.load(Ordering::Relaxed),
        }
    }
}
