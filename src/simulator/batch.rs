//! Batched rollouts and Monte Carlo policy evaluation.

use log::debug;
use serde::Serialize;

use crate::numeric::RunningStats;
use crate::simulator::{RandomSource, SimulationConfig, Simulator, TrajectoryResult};
use crate::solver::Policy;

/// Aggregate of many independent rollouts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatistics {
    pub num_runs: usize,
    pub avg_reward: f64,
    pub min_reward: f64,
    pub max_reward: f64,
    /// Population standard deviation of the total rewards.
    pub std_dev_reward: f64,
    pub avg_steps: f64,
    pub min_steps: usize,
    pub max_steps: usize,
    pub per_run_results: Vec<TrajectoryResult>,
}

impl BatchStatistics {
    /// Summarizes finished runs. Run order does not affect the figures.
    /// An empty batch reports zeros.
    pub fn from_runs(runs: Vec<TrajectoryResult>) -> Self {
        let rewards: RunningStats<f64> = runs.iter().map(|r| r.total_reward).collect();
        let steps: RunningStats<f64> = runs.iter().map(|r| r.steps as f64).collect();
        Self {
            num_runs: runs.len(),
            avg_reward: rewards.mean(),
            min_reward: rewards.min(),
            max_reward: rewards.max(),
            std_dev_reward: rewards.std_dev(),
            avg_steps: steps.mean(),
            min_steps: runs.iter().map(|r| r.steps).min().unwrap_or(0),
            max_steps: runs.iter().map(|r| r.steps).max().unwrap_or(0),
            per_run_results: runs,
        }
    }
}

impl Simulator<'_> {
    /// Runs `config.num_runs` rollouts back to back, drawing from the same
    /// source, and summarizes them.
    pub fn multiple_rollouts<R: RandomSource + ?Sized>(
        &self,
        policy: &Policy,
        start: &str,
        config: &SimulationConfig,
        rng: &mut R,
    ) -> BatchStatistics {
        let runs = (0..config.num_runs)
            .map(|_| self.rollout(policy, start, config.max_steps, &mut *rng))
            .collect();
        let stats = BatchStatistics::from_runs(runs);
        debug!(
            "{} rollouts from `{}`: mean reward {:.4} (sd {:.4}), mean steps {:.2}",
            stats.num_runs, start, stats.avg_reward, stats.std_dev_reward, stats.avg_steps
        );
        stats
    }

    /// Monte Carlo estimate of the policy's value at `start`: the mean total
    /// reward of [`multiple_rollouts`](Self::multiple_rollouts).
    pub fn monte_carlo_evaluation<R: RandomSource + ?Sized>(
        &self,
        policy: &Policy,
        start: &str,
        config: &SimulationConfig,
        rng: &mut R,
    ) -> f64 {
        self.multiple_rollouts(policy, start, config, rng).avg_reward
    }

    /// Same as [`multiple_rollouts`](Self::multiple_rollouts) with the runs
    /// spread over the rayon pool. Run `i` draws from a ChaCha20 stream
    /// seeded with `seed + i`, so the result depends only on `seed`.
    #[cfg(feature = "parallel")]
    pub fn par_multiple_rollouts(
        &self,
        policy: &Policy,
        start: &str,
        config: &SimulationConfig,
        seed: u64,
    ) -> BatchStatistics {
        use crate::simulator::RngSource;
        use rayon::prelude::*;

        let runs = (0..config.num_runs)
            .into_par_iter()
            .map(|run| {
                let mut rng = RngSource::seeded(seed.wrapping_add(run as u64));
                self.rollout(policy, start, config.max_steps, &mut rng)
            })
            .collect();
        BatchStatistics::from_runs(runs)
    }
}
