//! Stochastic rollouts of a policy against the graph's transition model.
//!
//! Nothing here returns an error: broken references in the graph or policy
//! end a trajectory early and are recorded in the result instead, so a
//! batch of runs always completes.

pub mod batch;
pub mod random_source;
pub mod rollout;
pub mod visitation;


pub use batch::BatchStatistics;
pub use random_source::{FixedDraws, RandomSource, RngSource};

use serde::Serialize;

use crate::error::LookupFailure;
use crate::model::{ActionId, Graph, MdpIndex, StateId};

/// Limits for batched simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Transitions allowed per trajectory, not counting the start step.
    pub max_steps: usize,
    pub num_runs: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_steps: 100,
            num_runs: 100,
        }
    }
}

impl SimulationConfig {
    pub fn new(num_runs: usize, max_steps: usize) -> Self {
        Self {
            max_steps,
            num_runs,
        }
    }
}

/// One entry of a trajectory.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub state_id: StateId,
    pub state_label: String,
    /// `None` for the start step.
    pub action_id: Option<ActionId>,
    pub action_label: Option<String>,
    pub reward_delta: f64,
    pub cumulative_reward: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_note: Option<String>,
}

/// Outcome of a single rollout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryResult {
    pub trajectory: Vec<Step>,
    pub total_reward: f64,
    /// Trajectory length minus the start step.
    pub steps: usize,
    /// Set only when the start state does not exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<LookupFailure>,
}

impl TrajectoryResult {
    pub(crate) fn failed(error: LookupFailure) -> Self {
        Self {
            trajectory: Vec::new(),
            total_reward: 0.0,
            steps: 0,
            error: Some(error),
        }
    }

    /// The state the trajectory ended in.
    pub fn final_state(&self) -> Option<&StateId> {
        self.trajectory.last().map(|step| &step.state_id)
    }
}

/// Runs rollouts over one graph snapshot.
///
/// The id index is built once in [`Simulator::new`] and shared by every run.
///
/// # Examples
/// ```
/// use mdp_engine::model::Graph;
/// use mdp_engine::simulator::{RngSource, SimulationConfig, Simulator};
/// use mdp_engine::solver::{value_iteration, SolverConfig};
///
/// let graph = Graph::demo();
/// let solution = value_iteration(&graph, &SolverConfig::default()).unwrap();
/// let simulator = Simulator::new(&graph);
///
/// let run = simulator.rollout(&solution.policy, "start", 10, &mut RngSource::seeded(1));
/// assert_eq!(run.total_reward, 45.0);
/// assert_eq!(run.steps, 1);
///
/// let stats = simulator.multiple_rollouts(
///     &solution.policy,
///     "start",
///     &SimulationConfig::new(50, 10),
///     &mut RngSource::seeded(2),
/// );
/// assert_eq!(stats.std_dev_reward, 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct Simulator<'g> {
    index: MdpIndex<'g>,
}

impl<'g> Simulator<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self {
            index: MdpIndex::build(graph),
        }
    }

    pub fn graph(&self) -> &'g Graph {
        self.index.graph()
    }

    pub(crate) fn index(&self) -> &MdpIndex<'g> {
        &self.index
    }
}
