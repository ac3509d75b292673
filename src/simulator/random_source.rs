use rand::rngs::ThreadRng;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Source of uniform draws in `[0, 1)` for the simulator.
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;

    /// Uniform index in `0..len`; `len` must be non-zero.
    fn next_index(&mut self, len: usize) -> usize {
        let i = (self.next_unit() * len as f64) as usize;
        i.min(len.saturating_sub(1))
    }
}

impl<S: RandomSource + ?Sized> RandomSource for &mut S {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

/// Adapts any [`rand::Rng`].
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl<R: Rng> RandomSource for RngSource<R> {
    fn next_unit(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}

impl RngSource<ChaCha20Rng> {
    /// Reproducible source.
    pub fn seeded(seed: u64) -> Self {
        Self(ChaCha20Rng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self(ChaCha20Rng::from_entropy())
    }
}

impl RngSource<ThreadRng> {
    pub fn thread() -> Self {
        Self(rand::thread_rng())
    }
}

/// Replays a fixed sequence of draws, wrapping around at the end.
/// An empty sequence always yields 0.0.
#[derive(Debug, Clone, Default)]
pub struct FixedDraws {
    draws: Vec<f64>,
    cursor: usize,
}

impl FixedDraws {
    pub fn new(draws: impl Into<Vec<f64>>) -> Self {
        Self {
            draws: draws.into(),
            cursor: 0,
        }
    }

    /// Number of draws handed out so far.
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for FixedDraws {
    fn next_unit(&mut self) -> f64 {
        if self.draws.is_empty() {
            return 0.0;
        }
        let draw = self.draws[self.cursor % self.draws.len()];
        self.cursor += 1;
        draw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_draws_wrap() {
        let mut source = FixedDraws::new([0.1, 0.9]);
        let draws: Vec<f64> = (0..5).map(|_| source.next_unit()).collect();
        assert_eq!(draws, vec![0.1, 0.9, 0.1, 0.9, 0.1]);
        assert_eq!(source.consumed(), 5);
        assert_eq!(FixedDraws::default().next_unit(), 0.0);
    }

    #[test]
    fn test_next_index_stays_in_range() {
        let mut source = FixedDraws::new([0.0, 0.5, 0.999_999_999, 1.0]);
        assert_eq!(source.next_index(3), 0);
        assert_eq!(source.next_index(3), 1);
        assert_eq!(source.next_index(3), 2);
        assert_eq!(source.next_index(3), 2);
    }

    #[test]
    fn test_seeded_source_is_reproducible() {
        let mut a = RngSource::seeded(7);
        let mut b = RngSource::seeded(7);
        for _ in 0..100 {
            let x = a.next_unit();
            assert_eq!(x, b.next_unit());
            assert!((0.0..1.0).contains(&x));
        }
    }
}
