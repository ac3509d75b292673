use std::collections::HashSet;

use log::warn;

use crate::error::{Result, ValidationError, ValidationIssue};
use crate::model::Graph;
use crate::numeric::sums_to_one;

/// Checks that the graph can be solved.
///
/// Every action's outcome probabilities must sum to 1.0 (within
/// [`PROBABILITY_TOLERANCE`](crate::numeric::PROBABILITY_TOLERANCE)), every
/// outcome must target an existing state, and no action may have two
/// outcomes into the same state. An action with no outcomes fails the sum
/// check.
///
/// # Examples
/// ```
/// use mdp_engine::model::{Action, Graph, State};
/// use mdp_engine::solver::validate;
///
/// let mut graph = Graph::new();
/// graph
///     .add_state(State::new("a", 0.0))
///     .add_state(State::new("b", 1.0).terminal())
///     .add_action(Action::new("go", "a").with_outcome("b", 0.7));
///
/// let err = validate(&graph).unwrap_err();
/// assert!(err.to_string().contains("0.7000"));
/// ```
pub fn validate(graph: &Graph) -> Result<()> {
    let issues = collect_issues(graph);
    if issues.is_empty() {
        return Ok(());
    }
    warn!("graph failed validation with {} issue(s)", issues.len());
    Err(ValidationError { issues }.into())
}

/// All validation issues of the graph, in graph order.
pub fn collect_issues(graph: &Graph) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let mut state_ids = HashSet::with_capacity(graph.states.len());
    for state in &graph.states {
        if !state_ids.insert(state.id.as_str()) {
            issues.push(ValidationIssue::DuplicateState {
                state: state.id.clone(),
            });
        }
    }

    for action in &graph.actions {
        if !state_ids.contains(action.state_id.as_str()) {
            issues.push(ValidationIssue::UnknownOwner {
                action: action.id.clone(),
                label: action.label.clone(),
                state: action.state_id.clone(),
            });
        }

        let mut targets = HashSet::with_capacity(action.outcomes.len());
        for outcome in &action.outcomes {
            let target = outcome.to_state_id.as_str();
            if !state_ids.contains(target) {
                issues.push(ValidationIssue::UnknownTarget {
                    action: action.id.clone(),
                    label: action.label.clone(),
                    target: outcome.to_state_id.clone(),
                });
            } else if !targets.insert(target) {
                issues.push(ValidationIssue::DuplicateTarget {
                    action: action.id.clone(),
                    label: action.label.clone(),
                    target: outcome.to_state_id.clone(),
                });
            }
        }

        let sum = action.probability_sum();
        if !sums_to_one(sum) {
            issues.push(ValidationIssue::ProbabilitySum {
                action: action.id.clone(),
                label: action.label.clone(),
                sum,
            });
        }
    }

    issues
}
