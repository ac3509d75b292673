//! Small numeric helpers shared by the solver and the simulator.

use num_traits::Float;

/// Allowed deviation of an action's outcome probabilities from 1.0.
pub const PROBABILITY_TOLERANCE: f64 = 1e-4;

/// Returns true if `sum` is 1.0 within [`PROBABILITY_TOLERANCE`].
pub fn sums_to_one(sum: f64) -> bool {
    approx::abs_diff_eq!(sum, 1.0, epsilon = PROBABILITY_TOLERANCE)
}

/// Running mean and population variance (Welford).
///
/// A sequence of identical values yields that exact value as the mean and a
/// variance of exactly zero, which a naive sum / n does not guarantee.
#[derive(Debug, Clone, Copy)]
pub struct RunningStats<T: Float> {
    count: usize,
    mean: T,
    m2: T,
    min: T,
    max: T,
}

impl<T: Float> Default for RunningStats<T> {
    fn default() -> Self {
        Self {
            count: 0,
            mean: T::zero(),
            m2: T::zero(),
            min: T::infinity(),
            max: T::neg_infinity(),
        }
    }
}

impl<T: Float> RunningStats<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, x: T) {
        self.count += 1;
        let n = T::from(self.count).unwrap_or_else(T::nan);
        let delta = x - self.mean;
        self.mean = self.mean + delta / n;
        self.m2 = self.m2 + delta * (x - self.mean);
        self.min = self.min.min(x);
        self.max = self.max.max(x);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Mean of the pushed values, zero when empty.
    pub fn mean(&self) -> T {
        self.mean
    }

    /// Population variance, zero when empty.
    pub fn variance(&self) -> T {
        if self.count == 0 {
            return T::zero();
        }
        self.m2 / T::from(self.count).unwrap_or_else(T::nan)
    }

    pub fn std_dev(&self) -> T {
        self.variance().sqrt()
    }

    /// Smallest value, zero when empty.
    pub fn min(&self) -> T {
        if self.count == 0 {
            T::zero()
        } else {
            self.min
        }
    }

    /// Largest value, zero when empty.
    pub fn max(&self) -> T {
        if self.count == 0 {
            T::zero()
        } else {
            self.max
        }
    }
}

impl<T: Float> FromIterator<T> for RunningStats<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut stats = Self::new();
        for x in iter {
            stats.push(x);
        }
        stats
    }
}

/// Arithmetic mean, zero for an empty slice.
pub fn mean<T: Float>(xs: &[T]) -> T {
    xs.iter().copied().collect::<RunningStats<T>>().mean()
}

/// Population standard deviation, zero for an empty slice.
pub fn population_std_dev<T: Float>(xs: &[T]) -> T {
    xs.iter().copied().collect::<RunningStats<T>>().std_dev()
}

/// Largest absolute elementwise difference of two equally long slices.
pub fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .fold(0.0_f64, |acc, (x, y)| acc.max((x - y).abs()))
}
