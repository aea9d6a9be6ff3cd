//! Capacity denominators for usage calculation

/// Trait for supplying the byte budget that usage is measured against
pub trait CapacityProvider: Send + Sync {
    /// Current capacity in bytes
    fn capacity_bytes(&self) -> u64;
}

/// Constant byte budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedCapacity(pub u64);

impl CapacityProvider for FixedCapacity {
    fn capacity_bytes(&self) -> u64 {
        self.0
    }
}

impl<F> CapacityProvider for F
where
    F: Fn() -> u64 + Send + Sync,
{
    fn capacity_bytes(&self) -> u64 {
        self()
    }
}

/// Fraction of `capacity` used by `total` bytes; 0.0 when capacity is zero
pub fn usage_fraction(total: u64, capacity: u64) -> f64 {
    if capacity == 0 {
        0.0
    } else {
        total as f64 / capacity as f64
    }
}
