//! Read-only graph snapshot of a finite Markov Decision Process.
//!
//! A [`Graph`] is a plain collection of states and actions. The editor that
//! builds it owns the only mutable copy; the solver and simulator borrow a
//! snapshot and never change it. Identifiers are resolved to dense indices
//! once per snapshot by [`MdpIndex`].

mod index;

pub use index::{IndexedAction, IndexedOutcome, IndexedState, MdpIndex, StateKind};

use std::borrow::Borrow;
use std::fmt;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default discount factor for a new graph.
pub const DEFAULT_GAMMA: f64 = 0.95;
/// Default convergence threshold for a new graph.
pub const DEFAULT_EPSILON: f64 = 0.001;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Unique identifier of a state.
    StateId
);
string_id!(
    /// Unique identifier of an action.
    ActionId
);

/// A state of the MDP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    pub id: StateId,
    #[serde(default)]
    pub label: String,
    /// Editor position, ignored by the solver and simulator.
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub terminal: bool,
    /// Reward received on entering (or starting in) this state.
    #[serde(default)]
    pub reward: f64,
}

impl State {
    /// Creates a non-terminal state labelled with its id.
    pub fn new(id: impl Into<String>, reward: f64) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id: StateId(id),
            x: 0.0,
            y: 0.0,
            terminal: false,
            reward,
        }
    }

    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }
}

/// One probabilistic transition of an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub to_state_id: StateId,
    pub prob: f64,
}

/// An action available in exactly one state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: ActionId,
    pub state_id: StateId,
    #[serde(default)]
    pub label: String,
    /// Subtracted from the return every time the action is taken.
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
}

impl Action {
    /// Creates a free action with no outcomes, labelled with its id.
    pub fn new(id: impl Into<String>, state_id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id: ActionId(id),
            state_id: StateId(state_id.into()),
            cost: 0.0,
            outcomes: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_outcome(mut self, to_state_id: impl Into<String>, prob: f64) -> Self {
        self.outcomes.push(Outcome {
            to_state_id: StateId(to_state_id.into()),
            prob,
        });
        self
    }

    /// Sum of this action's outcome probabilities.
    pub fn probability_sum(&self) -> f64 {
        self.outcomes.iter().map(|o| o.prob).sum()
    }
}

/// A snapshot of the whole MDP together with its solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Graph {
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    #[serde(default)]
    pub states: Vec<State>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub start_state_id: Option<StateId>,
}

fn default_gamma() -> f64 {
    DEFAULT_GAMMA
}

fn default_epsilon() -> f64 {
    DEFAULT_EPSILON
}

impl Default for Graph {
    fn default() -> Self {
        Self {
            gamma: DEFAULT_GAMMA,
            epsilon: DEFAULT_EPSILON,
            states: Vec::new(),
            actions: Vec::new(),
            start_state_id: None,
        }
    }
}

impl Graph {
    /// Creates an empty graph with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a graph snapshot from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses a graph snapshot from a JSON reader.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Serializes the snapshot to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Adds a state. The first state added becomes the start state unless
    /// one is set explicitly.
    pub fn add_state(&mut self, state: State) -> &mut Self {
        if self.start_state_id.is_none() {
            self.start_state_id = Some(state.id.clone());
        }
        self.states.push(state);
        self
    }

    pub fn add_action(&mut self, action: Action) -> &mut Self {
        self.actions.push(action);
        self
    }

    /// Appends an outcome to an existing action. Returns false if the
    /// action does not exist.
    pub fn add_outcome(&mut self, action_id: &str, to_state_id: &str, prob: f64) -> bool {
        match self.actions.iter_mut().find(|a| a.id.as_str() == action_id) {
            Some(action) => {
                action.outcomes.push(Outcome {
                    to_state_id: StateId::from(to_state_id),
                    prob,
                });
                true
            }
            None => false,
        }
    }

    pub fn set_start(&mut self, state_id: &str) -> &mut Self {
        self.start_state_id = Some(StateId::from(state_id));
        self
    }

    pub fn state(&self, id: &str) -> Option<&State> {
        self.states.iter().find(|s| s.id.as_str() == id)
    }

    pub fn action(&self, id: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.id.as_str() == id)
    }

    /// Actions owned by a state, in enumeration order.
    pub fn actions_of<'a>(&'a self, state_id: &'a str) -> impl Iterator<Item = &'a Action> + 'a {
        self.actions
            .iter()
            .filter(move |a| a.state_id.as_str() == state_id)
    }

    /// Builds the id lookup tables for this snapshot.
    pub fn index(&self) -> MdpIndex<'_> {
        MdpIndex::build(self)
    }

    /// The commute example: get to work by bike, car or train.
    ///
    /// ```
    /// use mdp_engine::model::Graph;
    ///
    /// let graph = Graph::demo();
    /// assert_eq!(graph.states.len(), 4);
    /// assert_eq!(graph.actions_of("start").count(), 3);
    /// ```
    pub fn demo() -> Self {
        let mut graph = Graph::new();
        graph
            .add_state(State::new("start", 0.0).with_label("Start").at(100.0, 200.0))
            .add_state(
                State::new("work", 45.0)
                    .with_label("Work")
                    .at(400.0, 100.0)
                    .terminal(),
            )
            .add_state(State::new("delay", 0.0).with_label("Delay").at(300.0, 300.0))
            .add_state(
                State::new("home", 0.0)
                    .with_label("Home")
                    .at(500.0, 300.0)
                    .terminal(),
            );
        graph
            .add_action(
                Action::new("start-bike", "start")
                    .with_label("bike")
                    .with_outcome("work", 1.0),
            )
            .add_action(
                Action::new("start-car", "start")
                    .with_label("car")
                    .with_outcome("work", 1.0),
            )
            .add_action(
                Action::new("start-train", "start")
                    .with_label("train")
                    .with_cost(5.0)
                    .with_outcome("delay", 0.2)
                    .with_outcome("home", 0.8),
            )
            .add_action(
                Action::new("delay-train", "delay")
                    .with_label("train")
                    .with_cost(2.0)
                    .with_outcome("home", 1.0),
            );
        graph.set_start("start");
        graph
    }
}
