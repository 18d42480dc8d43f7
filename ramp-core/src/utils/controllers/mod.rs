//! Module Exports
//!
//! - `axis`: the motor axis collaborator a unit is lent to.
//! - `unit`: a single timer-backed ramp unit and its state machine.
//! - `pool`: the fixed-capacity registry that lends units to axes.
//! - `isr`: glue for sharing a pool with timer update interrupts.
//! - `diagnostics`: anomaly counters behind the log output.

pub mod axis;
pub mod diagnostics;
pub mod isr;
pub mod pool;
pub mod unit;

pub use axis::{Axis, AxisId, AxisState, RampProfile};
pub use diagnostics::{Anomaly, Diagnostics};
pub use isr::{on_update_interrupt, share, with_pool, CompletionChannel, SharedRampPool};
pub use pool::{PoolError, RampPool};
pub use unit::{RampComplete, RampState, RampUnit, UnitHandle, UnitId};
