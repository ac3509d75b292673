use std::collections::HashMap;

use crate::model::StateId;
use crate::simulator::{RandomSource, SimulationConfig, Simulator};
use crate::solver::Policy;

impl Simulator<'_> {
    /// Fraction of all recorded trajectory steps, start steps included, that
    /// landed on each state over `config.num_runs` rollouts.
    ///
    /// Every state of the graph gets an entry; unvisited states map to 0.
    pub fn state_visitation_frequency<R: RandomSource + ?Sized>(
        &self,
        policy: &Policy,
        start: &str,
        config: &SimulationConfig,
        rng: &mut R,
    ) -> HashMap<StateId, f64> {
        let index = self.index();
        let mut counts = vec![0_usize; index.len()];
        let mut total = 0_usize;

        for _ in 0..config.num_runs {
            let run = self.rollout(policy, start, config.max_steps, &mut *rng);
            for step in &run.trajectory {
                if let Some(s) = index.state_index(step.state_id.as_str()) {
                    counts[s] += 1;
                    total += 1;
                }
            }
        }

        let mut frequencies: HashMap<StateId, f64> = HashMap::with_capacity(counts.len());
        for (s, &count) in counts.iter().enumerate() {
            let frequency = if total == 0 {
                0.0
            } else {
                count as f64 / total as f64
            };
            // duplicated ids share the first state's count
            frequencies.entry(index.state_id(s).clone()).or_insert(frequency);
        }
        frequencies
    }
}
