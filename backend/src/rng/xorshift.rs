//! xorshift64* generator
//!
//! Small, fast and fully reproducible: the same seed always yields the same
//! traffic. Passes BigCrush, which is plenty for scenario sampling.

use serde::{Deserialize, Serialize};

const MULTIPLIER: u64 = 0x2545_F491_4F6C_DD1D;

/// Seeded generator for scenario sampling
///
/// # Example
/// ```
/// use highway_overtake_core_rs::rng::TrafficRng;
///
/// let mut a = TrafficRng::new(42);
/// let mut b = TrafficRng::new(42);
/// let speed = a.uniform(20.0, 25.0);
/// assert!((20.0..25.0).contains(&speed));
/// assert_eq!(speed, b.uniform(20.0, 25.0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficRng {
    state: u64,
}

impl TrafficRng {
    /// Zero is not a valid xorshift state and is mapped to 1
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    pub fn state(&self) -> u64 {
        self.state
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(MULTIPLIER)
    }

    /// Uniform in `[0, 1)` with 53 bits of precision
    pub fn unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform in `[low, high)`; `low` when the interval is empty
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        low + (high - low) * self.unit()
    }

    /// Uniform index in `0..n`, `None` for `n == 0`
    pub fn index(&mut self, n: usize) -> Option<usize> {
        if n == 0 {
            return None;
        }
        Some((self.next_u64() % n as u64) as usize)
    }
}
