//! Memory pressure sampling
//!
//! Usage is the store's total size divided by a host-supplied
//! [`CapacityProvider`]. Each sample is classified into a [`PressureLevel`]
//! with no hysteresis and recorded in bounded history, which also feeds a
//! short linear usage prediction.

mod capacity;
mod monitor;

pub use capacity::{usage_fraction, CapacityProvider, FixedCapacity};
pub use monitor::{MemoryPressureEvent, PressureLevel, PressureMonitor, PREDICTION_WINDOW};
