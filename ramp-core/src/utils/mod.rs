//! Utility re-exports and helper macros for the ramp subsystem.
//!
//! - `config`: clock, speed floor and interrupt line settings
//! - `controllers`: ramp units, the unit pool and interrupt glue
//! - `hal`: the timer capability and its simulated backend
//! - `math`: ramp parameter to timer register arithmetic
//!
//! The `mk_static!` macro simplifies static initialization in no-std contexts.

pub mod config;
pub mod controllers;
pub mod hal;
pub mod math;

pub use config::{InterruptConfig, PoolConfig, RampConfig};
pub use controllers::{Axis, AxisId, AxisState, RampPool, UnitHandle, UnitId};
pub use hal::{RampTimer, SimTimer};
pub use math::ramp::RampMode;

#[doc(hidden)]
pub use static_cell as __static_cell;

#[macro_export]
/// Initialize a no-std static cell and write the given value into it.
///
/// This macro creates a `static_cell::StaticCell` for type `$t` and initializes
/// it with `$val`, returning a mutable reference to the stored value. The
/// caller does not need its own `static_cell` dependency.
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: $crate::utils::__static_cell::StaticCell<$t> =
            $crate::utils::__static_cell::StaticCell::new();
        STATIC_CELL.uninit().write($val)
    }};
}
