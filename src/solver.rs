//! Dynamic-programming solvers for the Bellman optimality equation.
//!
//! Both solvers validate the graph first and refuse to run on a graph with
//! structural problems. Sweeps are synchronous: each sweep reads only the
//! previous full value table.

pub mod bellman;
pub mod policy_iteration;
pub mod validation;
pub mod value_iteration;

#[cfg(test)]
mod tests;

pub use bellman::q_values;
pub use policy_iteration::{evaluate_policy, policy_iteration};
pub use validation::{collect_issues, validate};
pub use value_iteration::value_iteration;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{MdpError, Result};
use crate::model::{ActionId, Graph, MdpIndex, StateId, StateKind};

/// Chosen action per state. States without an entry take no action.
pub type Policy = HashMap<StateId, ActionId>;

/// Solver options. `None` settings fall back to the graph's own.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    pub gamma: Option<f64>,
    pub epsilon: Option<f64>,
    /// Sweeps for value iteration, improvement rounds for policy iteration.
    pub max_iterations: usize,
    /// Sweeps per policy evaluation.
    pub eval_max_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            gamma: None,
            epsilon: None,
            max_iterations: 1000,
            eval_max_iterations: 100,
        }
    }
}

impl SolverConfig {
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = Some(gamma);
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = Some(epsilon);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_eval_max_iterations(mut self, eval_max_iterations: usize) -> Self {
        self.eval_max_iterations = eval_max_iterations;
        self
    }

    /// Resolves gamma and epsilon against the graph and checks their ranges.
    pub fn settings(&self, graph: &Graph) -> Result<Settings> {
        let gamma = self.gamma.unwrap_or(graph.gamma);
        let epsilon = self.epsilon.unwrap_or(graph.epsilon);
        if !(0.0..=1.0).contains(&gamma) {
            return Err(MdpError::InvalidSetting {
                name: "gamma",
                value: gamma,
            });
        }
        if !epsilon.is_finite() || epsilon <= 0.0 {
            return Err(MdpError::InvalidSetting {
                name: "epsilon",
                value: epsilon,
            });
        }
        Ok(Settings { gamma, epsilon })
    }
}

/// Discount factor and convergence threshold in effect for one solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    pub gamma: f64,
    pub epsilon: f64,
}

/// Value function and greedy policy produced by one solver call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    pub values: HashMap<StateId, f64>,
    pub policy: Policy,
    pub iterations: usize,
    pub converged: bool,
}

impl Solution {
    pub(crate) fn from_dense(
        index: &MdpIndex<'_>,
        values: &[f64],
        policy: &[Option<usize>],
        iterations: usize,
        converged: bool,
    ) -> Self {
        let values = values
            .iter()
            .enumerate()
            .map(|(s, &v)| (index.state_id(s).clone(), v))
            .collect();
        let policy = policy
            .iter()
            .enumerate()
            .filter_map(|(s, &a)| {
                a.map(|a| (index.state_id(s).clone(), index.action_meta(a).id.clone()))
            })
            .collect();
        Self {
            values,
            policy,
            iterations,
            converged,
        }
    }

    pub fn value(&self, state_id: &str) -> Option<f64> {
        self.values.get(state_id).copied()
    }

    pub fn action_for(&self, state_id: &str) -> Option<&ActionId> {
        self.policy.get(state_id)
    }

    /// Largest `|V(s) - max_a Q(s,a)|` over active states, evaluated against
    /// this solution's own value table.
    pub fn bellman_residual(&self, graph: &Graph, gamma: f64) -> f64 {
        let index = graph.index();
        let values = index.dense_values(&self.values);
        (0..index.len())
            .filter_map(|s| match index.kind(s) {
                StateKind::Active(actions) => bellman::greedy(&index, s, actions, &values, gamma)
                    .map(|(_, best)| (values[s] - best).abs()),
                StateKind::Terminal | StateKind::Absorbing => None,
            })
            .fold(0.0, f64::max)
    }
}
