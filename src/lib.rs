//! Solve and simulate finite Markov Decision Processes.
//!
//! A [`Graph`] snapshot of states, actions and probabilistic outcomes goes
//! into the [`solver`] (value iteration, policy iteration), which returns a
//! value function and a greedy policy. The [`simulator`] rolls that policy
//! out against the same snapshot and aggregates Monte Carlo statistics.

pub mod error;
pub mod model;
pub mod numeric;
pub mod simulator;
pub mod solver;

pub use error::{LookupFailure, MdpError, Result, ValidationError, ValidationIssue};
pub use model::{Action, ActionId, Graph, Outcome, State, StateId};
pub use simulator::{
    BatchStatistics, FixedDraws, RandomSource, RngSource, SimulationConfig, Simulator, Step,
    TrajectoryResult,
};
pub use solver::{
    evaluate_policy, policy_iteration, q_values, validate, value_iteration, Policy, Solution,
    SolverConfig,
};
