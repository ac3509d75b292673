//! Q-values and greedy action selection.

use std::collections::HashMap;

use crate::model::{ActionId, Graph, MdpIndex, StateId, StateKind};

/// `Q(s,a) = R(s) - cost(a) + gamma * sum_{s'} P(s'|s,a) V(s')`.
///
/// Outcomes pointing at a missing state read `V = 0`.
pub(crate) fn q_value(
    index: &MdpIndex<'_>,
    state: usize,
    action: usize,
    values: &[f64],
    gamma: f64,
) -> f64 {
    let act = index.action(action);
    let mut expected = 0.0;
    for outcome in &act.outcomes {
        expected += outcome.prob * outcome.target.map_or(0.0, |t| values[t]);
    }
    index.state(state).reward - act.cost + gamma * expected
}

/// Best action among `actions` and its Q-value. Ties go to the action
/// enumerated first.
pub(crate) fn greedy(
    index: &MdpIndex<'_>,
    state: usize,
    actions: &[usize],
    values: &[f64],
    gamma: f64,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for &a in actions {
        let q = q_value(index, state, a, values, gamma);
        match best {
            Some((_, best_q)) if q <= best_q => {}
            _ => best = Some((a, q)),
        }
    }
    best
}

/// One Bellman optimality backup of state `s` against `values`.
pub(crate) fn backup(
    index: &MdpIndex<'_>,
    state: usize,
    values: &[f64],
    gamma: f64,
) -> (f64, Option<usize>) {
    match index.kind(state) {
        StateKind::Terminal | StateKind::Absorbing => (index.state(state).reward, None),
        StateKind::Active(actions) => match greedy(index, state, actions, values, gamma) {
            Some((a, q)) => (q, Some(a)),
            None => (index.state(state).reward, None),
        },
    }
}

/// Q-value of every action of `state_id` against a value table, in
/// enumeration order. Empty for terminal, action-less or unknown states.
///
/// # Examples
/// ```
/// use std::collections::HashMap;
/// use mdp_engine::model::{Graph, StateId};
/// use mdp_engine::solver::q_values;
///
/// let graph = Graph::demo();
/// let values = HashMap::from([(StateId::from("work"), 45.0)]);
/// let q = q_values(&graph, &values, "start", 1.0);
/// assert_eq!(q.len(), 3);
/// assert_eq!(q[0].1, 45.0);
/// ```
pub fn q_values(
    graph: &Graph,
    values: &HashMap<StateId, f64>,
    state_id: &str,
    gamma: f64,
) -> Vec<(ActionId, f64)> {
    let index = graph.index();
    let Some(state) = index.state_index(state_id) else {
        return Vec::new();
    };
    let StateKind::Active(actions) = index.kind(state) else {
        return Vec::new();
    };
    let dense = index.dense_values(values);
    actions
        .iter()
        .map(|&a| {
            (
                index.action_meta(a).id.clone(),
                q_value(&index, state, a, &dense, gamma),
            )
        })
        .collect()
}
