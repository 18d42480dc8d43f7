//! Math utilities for the ramp units.
//!
//! This module maps ramp parameters onto timer register values.

pub mod ramp;
