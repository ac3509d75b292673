//! Policy iteration: alternate full policy evaluation with greedy
//! improvement until the policy stops changing.

use log::{debug, trace, warn};

use crate::error::Result;
use crate::model::{Graph, MdpIndex, StateKind};
use crate::solver::bellman::{greedy, q_value};
use crate::solver::{validate, Policy, Solution, SolverConfig};

/// Iterative evaluation of a fixed policy, in place.
///
/// Starts from whatever `values` holds. Returns the number of sweeps and
/// whether the last sweep moved every value by less than `epsilon`.
fn evaluate(
    index: &MdpIndex<'_>,
    policy: &[Option<usize>],
    values: &mut Vec<f64>,
    gamma: f64,
    epsilon: f64,
    max_sweeps: usize,
) -> (usize, bool) {
    let n = index.len();
    let mut sweeps = 0;
    while sweeps < max_sweeps {
        sweeps += 1;
        let mut delta = 0.0_f64;
        let mut next = vec![0.0; n];
        for s in 0..n {
            next[s] = match (index.kind(s), policy[s]) {
                (StateKind::Active(_), Some(a)) => q_value(index, s, a, values, gamma),
                _ => index.state(s).reward,
            };
            delta = delta.max((next[s] - values[s]).abs());
        }
        *values = next;
        if delta < epsilon {
            return (sweeps, true);
        }
    }
    (sweeps, false)
}

/// Performs policy iteration on the given graph.
///
/// The initial policy takes the first enumerated action of every active
/// state. Each round evaluates the current policy (up to
/// `eval_max_iterations` sweeps, warm-started from the previous round's
/// values) and then switches every active state to its greedy action. The
/// loop ends when a round changes no action (`converged == true`) or after
/// `max_iterations` rounds (`converged == false`); either way the final
/// policy is evaluated once more before returning. `iterations` counts
/// rounds.
///
/// # Examples
///
/// ```
/// use mdp_engine::model::Graph;
/// use mdp_engine::solver::{policy_iteration, SolverConfig};
///
/// let solution = policy_iteration(&Graph::demo(), &SolverConfig::default()).unwrap();
/// assert!(solution.converged);
/// assert_eq!(solution.value("delay"), Some(-2.0));
/// ```
pub fn policy_iteration(graph: &Graph, config: &SolverConfig) -> Result<Solution> {
    let settings = config.settings(graph)?;
    validate(graph)?;

    let index = graph.index();
    let n = index.len();
    let mut policy: Vec<Option<usize>> = (0..n)
        .map(|s| match index.kind(s) {
            StateKind::Active(actions) => actions.first().copied(),
            StateKind::Terminal | StateKind::Absorbing => None,
        })
        .collect();
    let mut values = vec![0.0; n];
    let mut rounds = 0;
    let mut converged = false;

    debug!(
        "policy iteration: {} states, gamma={}, epsilon={}",
        n, settings.gamma, settings.epsilon
    );

    while rounds < config.max_iterations {
        rounds += 1;
        let (sweeps, evaluated) = evaluate(
            &index,
            &policy,
            &mut values,
            settings.gamma,
            settings.epsilon,
            config.eval_max_iterations,
        );
        if !evaluated {
            trace!("round {}: evaluation hit the sweep limit", rounds);
        }

        let mut changed = 0;
        for s in 0..n {
            if let StateKind::Active(actions) = index.kind(s) {
                if let Some((best, _)) = greedy(&index, s, actions, &values, settings.gamma) {
                    if policy[s] != Some(best) {
                        policy[s] = Some(best);
                        changed += 1;
                    }
                }
            }
        }
        trace!(
            "round {}: {} evaluation sweeps, {} action(s) changed",
            rounds,
            sweeps,
            changed
        );

        if changed == 0 {
            converged = true;
            break;
        }
    }

    evaluate(
        &index,
        &policy,
        &mut values,
        settings.gamma,
        settings.epsilon,
        config.eval_max_iterations,
    );

    if converged {
        debug!("policy iteration stable after {} rounds", rounds);
    } else {
        warn!(
            "policy iteration stopped after {} rounds without a stable policy",
            rounds
        );
    }

    Ok(Solution::from_dense(&index, &values, &policy, rounds, converged))
}

/// Evaluates a given policy with the expected-value Bellman equation.
///
/// Entries naming an unknown action, or an action owned by another state,
/// are ignored; such states, like terminal and action-less ones, are worth
/// their reward. The returned solution carries the policy entries that were
/// used, the number of sweeps, and whether evaluation converged within
/// `eval_max_iterations` sweeps.
pub fn evaluate_policy(graph: &Graph, policy: &Policy, config: &SolverConfig) -> Result<Solution> {
    let settings = config.settings(graph)?;
    validate(graph)?;

    let index = graph.index();
    let dense: Vec<Option<usize>> = (0..index.len())
        .map(|s| {
            let StateKind::Active(actions) = index.kind(s) else {
                return None;
            };
            policy
                .get(index.state_id(s))
                .and_then(|id| index.action_index(id.as_str()))
                .filter(|a| actions.contains(a))
        })
        .collect();

    let mut values = vec![0.0; index.len()];
    let (sweeps, converged) = evaluate(
        &index,
        &dense,
        &mut values,
        settings.gamma,
        settings.epsilon,
        config.eval_max_iterations,
    );
    if !converged {
        warn!("policy evaluation stopped after {} sweeps", sweeps);
    }

    Ok(Solution::from_dense(&index, &values, &dense, sweeps, converged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MdpError;
    use crate::model::{Action, ActionId, State, StateId};
    use approx::assert_abs_diff_eq;

    /// The first action is a trap so the initial policy must be improved.
    fn trap_graph() -> Graph {
        let mut graph = Graph::new().with_gamma(0.9);
        graph
            .add_state(State::new("s", 0.0))
            .add_state(State::new("pit", -10.0).terminal())
            .add_state(State::new("goal", 10.0).terminal())
            .add_action(Action::new("jump", "s").with_outcome("pit", 1.0))
            .add_action(
                Action::new("walk", "s")
                    .with_cost(1.0)
                    .with_outcome("s", 0.5)
                    .with_outcome("goal", 0.5),
            );
        graph
    }

    #[test]
    fn test_improves_initial_policy() {
        let graph = trap_graph();
        let solution = policy_iteration(&graph, &SolverConfig::default()).unwrap();

        assert!(solution.converged);
        assert_eq!(solution.action_for("s").unwrap().as_str(), "walk");
        // V = -1 + 0.9 (0.5 V + 5)  =>  V = 3.5 / 0.55
        assert_abs_diff_eq!(solution.value("s").unwrap(), 3.5 / 0.55, epsilon = 0.01);
        assert_eq!(solution.value("pit"), Some(-10.0));
        assert!(solution.iterations >= 2);
    }

    #[test]
    fn test_round_limit_reports_not_converged() {
        let graph = trap_graph();
        let config = SolverConfig::default().with_max_iterations(1);
        let solution = policy_iteration(&graph, &config).unwrap();

        assert!(!solution.converged);
        assert_eq!(solution.iterations, 1);
        assert_eq!(solution.action_for("s").unwrap().as_str(), "walk");
    }

    #[test]
    fn test_evaluate_given_policy() {
        let graph = trap_graph();
        let jump: Policy = [(StateId::from("s"), ActionId::from("jump"))].into();
        let solution = evaluate_policy(&graph, &jump, &SolverConfig::default()).unwrap();

        assert!(solution.converged);
        assert_eq!(solution.value("s"), Some(-9.0));
        assert_eq!(solution.action_for("s").unwrap().as_str(), "jump");
    }

    #[test]
    fn test_evaluate_ignores_foreign_actions() {
        let mut graph = trap_graph();
        graph
            .add_state(State::new("other", 0.0))
            .add_action(Action::new("elsewhere", "other").with_outcome("goal", 1.0));
        let policy: Policy = [
            (StateId::from("s"), ActionId::from("elsewhere")),
            (StateId::from("pit"), ActionId::from("jump")),
        ]
        .into();
        let solution = evaluate_policy(&graph, &policy, &SolverConfig::default()).unwrap();

        assert_eq!(solution.value("s"), Some(0.0));
        assert_eq!(solution.value("pit"), Some(-10.0));
        assert!(solution.policy.is_empty());
    }

    #[test]
    fn test_rejects_invalid_graph() {
        let mut graph = trap_graph();
        graph.add_action(Action::new("bad", "s").with_outcome("goal", 0.2));
        assert!(matches!(
            policy_iteration(&graph, &SolverConfig::default()),
            Err(MdpError::Validation(_))
        ));
    }
}
