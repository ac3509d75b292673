//! Value iteration: repeated Bellman optimality backups until the value
//! function stops moving.

use log::{debug, trace, warn};

use crate::error::Result;
use crate::model::Graph;
use crate::solver::bellman::backup;
use crate::solver::{validate, Solution, SolverConfig};

/// Performs value iteration on the given graph, returning the near-optimal
/// value function and the greedy policy recorded during the last sweep.
///
/// # Arguments
/// - `graph`: the MDP snapshot; it is validated before any sweep runs
/// - `config`: gamma/epsilon overrides and the sweep limit
///
/// # Returns
/// - `Ok(solution)` with `converged == true` once a full sweep changes no
///   value by `epsilon` or more, or `converged == false` with the last table
///   when `max_iterations` sweeps were not enough
/// - `Err(MdpError::Validation)` if the graph is malformed
///
/// Terminal and action-less states are pinned to their own reward. Ties
/// between actions go to the one enumerated first.
///
/// # Examples
///
/// ```
/// use mdp_engine::model::Graph;
/// use mdp_engine::solver::{value_iteration, SolverConfig};
///
/// let graph = Graph::demo();
/// let solution = value_iteration(&graph, &SolverConfig::default()).unwrap();
///
/// assert!(solution.converged);
/// assert_eq!(solution.value("work"), Some(45.0));
/// assert_eq!(solution.action_for("start").unwrap().as_str(), "start-bike");
/// ```
pub fn value_iteration(graph: &Graph, config: &SolverConfig) -> Result<Solution> {
    let settings = config.settings(graph)?;
    validate(graph)?;

    let index = graph.index();
    let n = index.len();
    let mut v = vec![0.0; n]; // start with zero values
    let mut policy = vec![None; n];
    let mut iterations = 0;
    let mut converged = false;

    debug!(
        "value iteration: {} states, gamma={}, epsilon={}",
        n, settings.gamma, settings.epsilon
    );

    while iterations < config.max_iterations {
        iterations += 1;
        let mut delta = 0.0_f64;
        // Updated values go to a separate table to avoid partial updates
        let mut v_new = vec![0.0; n];
        for s in 0..n {
            let (value, best) = backup(&index, s, &v, settings.gamma);
            v_new[s] = value;
            if best.is_some() {
                policy[s] = best;
            }
            delta = delta.max((value - v[s]).abs());
        }

        v = v_new;
        trace!("sweep {}: max delta {}", iterations, delta);
        if delta < settings.epsilon {
            converged = true;
            break;
        }
    }

    if converged {
        debug!("value iteration converged after {} sweeps", iterations);
    } else {
        warn!(
            "value iteration stopped after {} sweeps without converging",
            iterations
        );
    }

    Ok(Solution::from_dense(&index, &v, &policy, iterations, converged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MdpError;
    use crate::model::{Action, State};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_self_loop_converges_to_geometric_sum() {
        // V(s) = 2 + 0.9 V(s)  =>  V(s) = 20
        let mut graph = Graph::new().with_gamma(0.9);
        graph
            .add_state(State::new("s", 2.0))
            .add_action(Action::new("stay", "s").with_outcome("s", 1.0));
        let config = SolverConfig::default().with_epsilon(1e-9);
        let solution = value_iteration(&graph, &config).unwrap();

        assert!(solution.converged);
        assert_abs_diff_eq!(solution.value("s").unwrap(), 20.0, epsilon = 1e-6);
        assert_eq!(solution.action_for("s").unwrap().as_str(), "stay");
    }

    #[test]
    fn test_sweeps_are_synchronous() {
        // a -> b -> c(terminal, 10), gamma 1. With Jacobi sweeps the value
        // needs one sweep per hop to travel back to `a`.
        let mut graph = Graph::new().with_gamma(1.0);
        graph
            .add_state(State::new("a", 0.0))
            .add_state(State::new("b", 0.0))
            .add_state(State::new("c", 10.0).terminal())
            .add_action(Action::new("ab", "a").with_outcome("b", 1.0))
            .add_action(Action::new("bc", "b").with_outcome("c", 1.0));

        let one = value_iteration(&graph, &SolverConfig::default().with_max_iterations(1)).unwrap();
        assert!(!one.converged);
        assert_eq!(one.iterations, 1);
        assert_eq!(one.value("c"), Some(10.0));
        assert_eq!(one.value("b"), Some(0.0));
        assert_eq!(one.value("a"), Some(0.0));

        let two = value_iteration(&graph, &SolverConfig::default().with_max_iterations(2)).unwrap();
        assert_eq!(two.value("b"), Some(10.0));
        assert_eq!(two.value("a"), Some(0.0));

        let full = value_iteration(&graph, &SolverConfig::default()).unwrap();
        assert!(full.converged);
        assert_eq!(full.iterations, 4);
        assert_eq!(full.value("a"), Some(10.0));
    }

    #[test]
    fn test_gamma_zero_uses_immediate_reward_only() {
        let mut graph = Graph::new();
        graph
            .add_state(State::new("s", 1.0))
            .add_state(State::new("big", 100.0).terminal())
            .add_action(Action::new("cheap", "s").with_outcome("s", 1.0))
            .add_action(
                Action::new("costly", "s")
                    .with_cost(0.5)
                    .with_outcome("big", 1.0),
            );
        let solution =
            value_iteration(&graph, &SolverConfig::default().with_gamma(0.0)).unwrap();

        assert!(solution.converged);
        assert_eq!(solution.value("s"), Some(1.0));
        assert_eq!(solution.action_for("s").unwrap().as_str(), "cheap");
    }

    #[test]
    fn test_action_less_state_keeps_reward_and_no_policy() {
        let mut graph = Graph::new();
        graph
            .add_state(State::new("lonely", -3.0))
            .add_state(State::new("end", 7.0).terminal());
        let solution = value_iteration(&graph, &SolverConfig::default()).unwrap();

        assert_eq!(solution.value("lonely"), Some(-3.0));
        assert_eq!(solution.value("end"), Some(7.0));
        assert!(solution.policy.is_empty());
    }

    #[test]
    fn test_invalid_graph_is_rejected() {
        let mut graph = Graph::new();
        graph
            .add_state(State::new("a", 0.0))
            .add_action(Action::new("half", "a").with_outcome("a", 0.5));
        assert!(matches!(
            value_iteration(&graph, &SolverConfig::default()),
            Err(MdpError::Validation(_))
        ));
    }

    #[test]
    fn test_out_of_range_settings_are_rejected() {
        let graph = Graph::demo();
        assert!(matches!(
            value_iteration(&graph, &SolverConfig::default().with_gamma(1.5)),
            Err(MdpError::InvalidSetting { name: "gamma", .. })
        ));
        assert!(matches!(
            value_iteration(&graph, &SolverConfig::default().with_epsilon(0.0)),
            Err(MdpError::InvalidSetting { name: "epsilon", .. })
        ));
    }

    #[test]
    fn test_empty_graph() {
        let solution = value_iteration(&Graph::new(), &SolverConfig::default()).unwrap();
        assert!(solution.converged);
        assert_eq!(solution.iterations, 1);
        assert!(solution.values.is_empty());
    }
}
