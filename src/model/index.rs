use std::collections::HashMap;

use crate::model::{Action, Graph, State, StateId};

/// How the solver and simulator treat a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateKind {
    /// Marked terminal; its actions, if any, are ignored.
    Terminal,
    /// Not terminal but without actions; behaves like a terminal state.
    Absorbing,
    /// Indices of the owned actions, in enumeration order.
    Active(Vec<usize>),
}

#[derive(Debug, Clone)]
pub struct IndexedState {
    pub reward: f64,
    pub kind: StateKind,
}

#[derive(Debug, Clone, Copy)]
pub struct IndexedOutcome {
    /// `None` when the outcome points at a state missing from the graph.
    pub target: Option<usize>,
    pub prob: f64,
}

#[derive(Debug, Clone)]
pub struct IndexedAction {
    pub cost: f64,
    pub outcomes: Vec<IndexedOutcome>,
}

/// Dense view of a [`Graph`] with O(1) id lookups.
///
/// States and actions keep the positions they have in the graph, so a
/// dense index is also a position in `graph.states` / `graph.actions`.
/// When ids are duplicated the first occurrence wins.
#[derive(Debug, Clone)]
pub struct MdpIndex<'g> {
    graph: &'g Graph,
    states: Vec<IndexedState>,
    actions: Vec<IndexedAction>,
    state_lookup: HashMap<&'g str, usize>,
    action_lookup: HashMap<&'g str, usize>,
}

impl<'g> MdpIndex<'g> {
    pub fn build(graph: &'g Graph) -> Self {
        let mut state_lookup = HashMap::with_capacity(graph.states.len());
        for (i, state) in graph.states.iter().enumerate() {
            state_lookup.entry(state.id.as_str()).or_insert(i);
        }

        let mut action_lookup = HashMap::with_capacity(graph.actions.len());
        let mut owned: Vec<Vec<usize>> = vec![Vec::new(); graph.states.len()];
        let mut actions = Vec::with_capacity(graph.actions.len());
        for (i, action) in graph.actions.iter().enumerate() {
            action_lookup.entry(action.id.as_str()).or_insert(i);
            if let Some(&owner) = state_lookup.get(action.state_id.as_str()) {
                owned[owner].push(i);
            }
            actions.push(IndexedAction {
                cost: action.cost,
                outcomes: action
                    .outcomes
                    .iter()
                    .map(|o| IndexedOutcome {
                        target: state_lookup.get(o.to_state_id.as_str()).copied(),
                        prob: o.prob,
                    })
                    .collect(),
            });
        }

        let states = graph
            .states
            .iter()
            .zip(owned)
            .map(|(state, owned)| IndexedState {
                reward: state.reward,
                kind: if state.terminal {
                    StateKind::Terminal
                } else if owned.is_empty() {
                    StateKind::Absorbing
                } else {
                    StateKind::Active(owned)
                },
            })
            .collect();

        Self {
            graph,
            states,
            actions,
            state_lookup,
            action_lookup,
        }
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state_index(&self, id: &str) -> Option<usize> {
        self.state_lookup.get(id).copied()
    }

    pub fn action_index(&self, id: &str) -> Option<usize> {
        self.action_lookup.get(id).copied()
    }

    pub fn state(&self, index: usize) -> &IndexedState {
        &self.states[index]
    }

    pub fn kind(&self, index: usize) -> &StateKind {
        &self.states[index].kind
    }

    pub fn action(&self, index: usize) -> &IndexedAction {
        &self.actions[index]
    }

    pub fn state_meta(&self, index: usize) -> &'g State {
        &self.graph.states[index]
    }

    pub fn state_id(&self, index: usize) -> &'g StateId {
        &self.graph.states[index].id
    }

    pub fn action_meta(&self, index: usize) -> &'g Action {
        &self.graph.actions[index]
    }

    /// Dense value table from an id-keyed one; missing entries read as 0.
    pub fn dense_values(&self, values: &HashMap<StateId, f64>) -> Vec<f64> {
        self.graph
            .states
            .iter()
            .map(|s| values.get(&s.id).copied().unwrap_or(0.0))
            .collect()
    }
}
