use serde::Serialize;
use thiserror::Error;

use crate::model::{ActionId, StateId};

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MdpError>;

/// Errors returned by the solver and by graph snapshot loading.
#[derive(Debug, Error)]
pub enum MdpError {
    /// The graph is structurally unfit for solving.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A discount factor or convergence threshold outside its domain.
    #[error("invalid setting `{name}`: {value}")]
    InvalidSetting { name: &'static str, value: f64 },

    /// The graph snapshot could not be parsed.
    #[error("failed to read graph snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

/// Every structural problem found in a graph, collected in one pass.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("graph failed validation: {}", render_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    /// Offending action labels paired with their actual probability sums.
    pub fn probability_sums(&self) -> Vec<(&str, f64)> {
        self.issues
            .iter()
            .filter_map(|issue| match issue {
                ValidationIssue::ProbabilitySum { label, sum, .. } => Some((label.as_str(), *sum)),
                _ => None,
            })
            .collect()
    }

    /// Returns true if any issue concerns the given action.
    pub fn mentions_action(&self, action: &str) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.action().is_some_and(|id| id.as_str() == action))
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationIssue {
    #[error("action `{label}` ({action}) has outcome probabilities summing to {sum:.4}, expected 1.0")]
    ProbabilitySum {
        action: ActionId,
        label: String,
        sum: f64,
    },

    #[error("action `{label}` ({action}) targets unknown state `{target}`")]
    UnknownTarget {
        action: ActionId,
        label: String,
        target: StateId,
    },

    #[error("action `{label}` ({action}) has more than one outcome into state `{target}`")]
    DuplicateTarget {
        action: ActionId,
        label: String,
        target: StateId,
    },

    #[error("action `{label}` ({action}) belongs to unknown state `{state}`")]
    UnknownOwner {
        action: ActionId,
        label: String,
        state: StateId,
    },

    #[error("state id `{state}` is used by more than one state")]
    DuplicateState { state: StateId },
}

impl ValidationIssue {
    /// The action this issue is about, if any.
    pub fn action(&self) -> Option<&ActionId> {
        match self {
            ValidationIssue::ProbabilitySum { action, .. }
            | ValidationIssue::UnknownTarget { action, .. }
            | ValidationIssue::DuplicateTarget { action, .. }
            | ValidationIssue::UnknownOwner { action, .. } => Some(action),
            ValidationIssue::DuplicateState { .. } => None,
        }
    }
}

fn render_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A graph lookup that failed during simulation.
///
/// Never returned through `Err`: the simulator records it in the trajectory
/// so a batch of runs keeps going.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LookupFailure {
    #[error("start state `{state}` not found")]
    UnknownStartState { state: StateId },

    #[error("action `{action}` chosen for state `{state}` not found")]
    UnknownAction { state: StateId, action: ActionId },

    #[error("action `{label}` ({action}) has no outcomes")]
    EmptyOutcomes { action: ActionId, label: String },

    #[error("action `{action}` leads to unknown state `{target}`")]
    UnknownTarget { action: ActionId, target: StateId },
}
