//! Capacity growth policies.

/// Occupancy ratio at or above which an elastic buffer grows.
pub const LOAD_FACTOR_THRESHOLD: f64 = 0.75;

/// Factor applied to the capacity on every elastic growth step.
pub const EXPANSION_MULTIPLIER: f64 = 2.0;

/// Decides whether a buffer grows before an insertion.
///
/// The policy is consulted under the buffer's lock at the start of every
/// `produce`, with the element count as it was before the insertion. An
/// answer that is not larger than the current capacity is ignored, so a
/// buffer never shrinks.
pub trait GrowthPolicy: Send + Sync + 'static {
    /// Returns the capacity to grow to, or `None` to keep the current one.
    fn grow_to(&self, count: usize, capacity: usize) -> Option<usize>;
}

/// Never grows: producers block once the buffer is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fixed;

impl GrowthPolicy for Fixed {
    fn grow_to(&self, _count: usize, _capacity: usize) -> Option<usize> {
        None
    }
}

/// Doubles the capacity once the buffer is three quarters full.
///
/// The load is computed from the pre-insertion count, so growth kicks in
/// one call "late": a buffer of capacity 4 holds 3 items at capacity 4 and
/// grows to 8 while inserting the 4th.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Elastic {
    load_factor: f64,
    multiplier: f64,
}

impl Default for Elastic {
    fn default() -> Self {
        Elastic {
            load_factor: LOAD_FACTOR_THRESHOLD,
            multiplier: EXPANSION_MULTIPLIER,
        }
    }
}

impl Elastic {
    /// Returns the growth threshold.
    pub fn load_factor(&self) -> f64 {
        self.load_factor
    }

    /// Returns the growth multiplier.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }
}

impl GrowthPolicy for Elastic {
    fn grow_to(&self, count: usize, capacity: usize) -> Option<usize> {
        if capacity == 0 {
            return None;
        }
        let load = count as f64 / capacity as f64;
        if load < self.load_factor {
            return None;
        }
        Some((capacity as f64 * self.multiplier).floor() as usize)
    }
}
