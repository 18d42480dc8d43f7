//! Sharing a ramp pool between foreground code and timer interrupts.
//!
//! The pool lives inside a critical-section mutex. Each timer's update
//! interrupt calls [`on_update_interrupt`] with its unit handle; the handler
//! latches the final speed, sets the unit's `done` flag and posts a
//! [`RampComplete`] on a bounded channel the motion task can wait on.

use core::cell::RefCell;

use embassy_sync::{
    blocking_mutex::{raw::CriticalSectionRawMutex, Mutex},
    channel::Channel,
};

use super::{
    pool::RampPool,
    unit::{RampComplete, UnitId},
};
use crate::utils::hal::RampTimer;

/// Depth of the completion channel; one slot per hardware timer is enough
/// when the foreground drains it every loop.
pub const COMPLETION_DEPTH: usize = 8;

/// A pool shared with interrupt context.
pub type SharedRampPool<'a, T, const N: usize> =
    Mutex<CriticalSectionRawMutex, RefCell<RampPool<'a, T, N>>>;

/// Channel carrying completion events from interrupts to the motion task.
pub type CompletionChannel = Channel<CriticalSectionRawMutex, RampComplete, COMPLETION_DEPTH>;

/// Wrap a pool for sharing with interrupts.
pub const fn share<'a, T, const N: usize>(pool: RampPool<'a, T, N>) -> SharedRampPool<'a, T, N> {
    Mutex::new(RefCell::new(pool))
}

/// Run `f` on the pool inside a critical section.
pub fn with_pool<'a, T, const N: usize, R>(
    pool: &SharedRampPool<'a, T, N>,
    f: impl FnOnce(&mut RampPool<'a, T, N>) -> R,
) -> R {
    pool.lock(|cell| f(&mut *cell.borrow_mut()))
}

/// Timer update interrupt body for `unit`.
///
/// The `done` flag set by the handler stays authoritative; if the channel is
/// full the event is dropped with a warning.
pub fn on_update_interrupt<T, const N: usize>(
    pool: &SharedRampPool<'_, T, N>,
    unit: UnitId,
    events: &CompletionChannel,
) -> Option<RampComplete>
where
    T: RampTimer,
{
    let event = with_pool(pool, |p| p.on_timer_expired(unit))?;
    if events.try_send(event).is_err() {
        tracing::warn!(unit = unit.0, "completion channel full, event dropped");
    }
    Some(event)
}
