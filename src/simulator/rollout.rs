//! Single trajectories: policy rollouts and the uniform random walk.

use log::warn;

use crate::error::LookupFailure;
use crate::model::{IndexedOutcome, MdpIndex, StateKind};
use crate::simulator::{RandomSource, Simulator, Step, TrajectoryResult};
use crate::solver::Policy;

/// Picks the outcome for a uniform `draw` in `[0, 1)`.
///
/// Probabilities are accumulated in enumeration order and the first outcome
/// whose cumulative probability reaches `draw` wins. If rounding leaves the
/// total below `draw`, the last outcome is taken. Returns a position in
/// `outcomes`, or `None` if there are none.
///
/// # Examples
/// ```
/// use mdp_engine::model::IndexedOutcome;
/// use mdp_engine::simulator::rollout::sample_outcome;
///
/// let coin = [
///     IndexedOutcome { target: Some(0), prob: 0.5 },
///     IndexedOutcome { target: Some(1), prob: 0.5 },
/// ];
/// assert_eq!(sample_outcome(&coin, 0.4), Some(0));
/// assert_eq!(sample_outcome(&coin, 0.999999999), Some(1));
/// ```
pub fn sample_outcome(outcomes: &[IndexedOutcome], draw: f64) -> Option<usize> {
    let mut cumulative = 0.0;
    for (i, outcome) in outcomes.iter().enumerate() {
        cumulative += outcome.prob;
        if cumulative >= draw {
            return Some(i);
        }
    }
    outcomes.len().checked_sub(1)
}

enum Choice {
    Take(usize),
    Stop,
    Fail(LookupFailure),
}

/// Decides which action to take in a non-terminal state.
trait ActionSelector {
    fn select<R: RandomSource + ?Sized>(
        &mut self,
        index: &MdpIndex<'_>,
        state: usize,
        rng: &mut R,
    ) -> Choice;
}

struct FollowPolicy<'p>(&'p Policy);

impl ActionSelector for FollowPolicy<'_> {
    fn select<R: RandomSource + ?Sized>(
        &mut self,
        index: &MdpIndex<'_>,
        state: usize,
        _rng: &mut R,
    ) -> Choice {
        let state_id = index.state_id(state);
        match self.0.get(state_id) {
            None => Choice::Stop,
            Some(action_id) => match index.action_index(action_id.as_str()) {
                Some(a) => Choice::Take(a),
                None => Choice::Fail(LookupFailure::UnknownAction {
                    state: state_id.clone(),
                    action: action_id.clone(),
                }),
            },
        }
    }
}

struct UniformChoice;

impl ActionSelector for UniformChoice {
    fn select<R: RandomSource + ?Sized>(
        &mut self,
        index: &MdpIndex<'_>,
        state: usize,
        rng: &mut R,
    ) -> Choice {
        match index.kind(state) {
            StateKind::Active(actions) => Choice::Take(actions[rng.next_index(actions.len())]),
            StateKind::Terminal | StateKind::Absorbing => Choice::Stop,
        }
    }
}

impl Simulator<'_> {
    /// Follows `policy` from `start` for at most `max_steps` transitions.
    ///
    /// The start step carries the start state's reward. Each later step
    /// adds the entered state's reward and subtracts the action's cost. The
    /// run stops early in a terminal state, in a state the policy has no
    /// entry for, or on a broken reference; broken references are noted on
    /// the last step. An unknown start state yields an empty trajectory with
    /// `error` set.
    pub fn rollout<R: RandomSource + ?Sized>(
        &self,
        policy: &Policy,
        start: &str,
        max_steps: usize,
        rng: &mut R,
    ) -> TrajectoryResult {
        self.run(start, max_steps, rng, &mut FollowPolicy(policy))
    }

    /// Like [`rollout`](Self::rollout) but picks uniformly among the
    /// available actions at every step. Stops in terminal and action-less
    /// states.
    pub fn random_walk<R: RandomSource + ?Sized>(
        &self,
        start: &str,
        max_steps: usize,
        rng: &mut R,
    ) -> TrajectoryResult {
        self.run(start, max_steps, rng, &mut UniformChoice)
    }

    fn run<R, A>(&self, start: &str, max_steps: usize, rng: &mut R, selector: &mut A) -> TrajectoryResult
    where
        R: RandomSource + ?Sized,
        A: ActionSelector,
    {
        let index = self.index();
        let Some(mut current) = index.state_index(start) else {
            warn!("rollout requested from unknown start state `{}`", start);
            return TrajectoryResult::failed(LookupFailure::UnknownStartState {
                state: start.into(),
            });
        };

        let start_meta = index.state_meta(current);
        let mut total = start_meta.reward;
        let mut trajectory = vec![Step {
            state_id: start_meta.id.clone(),
            state_label: start_meta.label.clone(),
            action_id: None,
            action_label: None,
            reward_delta: total,
            cumulative_reward: total,
            error_note: None,
        }];

        while trajectory.len() <= max_steps {
            if let StateKind::Terminal = index.kind(current) {
                break;
            }

            let action = match selector.select(index, current, &mut *rng) {
                Choice::Take(a) => a,
                Choice::Stop => break,
                Choice::Fail(failure) => {
                    note_failure(&mut trajectory, failure);
                    break;
                }
            };
            let meta = index.action_meta(action);
            let act = index.action(action);

            if act.outcomes.is_empty() {
                total -= act.cost;
                let here = index.state_meta(current);
                let failure = LookupFailure::EmptyOutcomes {
                    action: meta.id.clone(),
                    label: meta.label.clone(),
                };
                warn!("{}", failure);
                trajectory.push(Step {
                    state_id: here.id.clone(),
                    state_label: here.label.clone(),
                    action_id: Some(meta.id.clone()),
                    action_label: Some(meta.label.clone()),
                    reward_delta: -act.cost,
                    cumulative_reward: total,
                    error_note: Some(failure.to_string()),
                });
                break;
            }

            let draw = rng.next_unit();
            let picked = sample_outcome(&act.outcomes, draw).map(|i| (i, act.outcomes[i].target));
            let next = match picked {
                Some((_, Some(next))) => next,
                Some((i, None)) => {
                    note_failure(
                        &mut trajectory,
                        LookupFailure::UnknownTarget {
                            action: meta.id.clone(),
                            target: meta.outcomes[i].to_state_id.clone(),
                        },
                    );
                    break;
                }
                None => break,
            };

            let entered = index.state_meta(next);
            let delta = entered.reward - act.cost;
            total += delta;
            trajectory.push(Step {
                state_id: entered.id.clone(),
                state_label: entered.label.clone(),
                action_id: Some(meta.id.clone()),
                action_label: Some(meta.label.clone()),
                reward_delta: delta,
                cumulative_reward: total,
                error_note: None,
            });
            current = next;
        }

        let steps = trajectory.len() - 1;
        TrajectoryResult {
            trajectory,
            total_reward: total,
            steps,
            error: None,
        }
    }
}

fn note_failure(trajectory: &mut [Step], failure: LookupFailure) {
    warn!("rollout truncated: {}", failure);
    if let Some(last) = trajectory.last_mut() {
        last.error_note = Some(failure.to_string());
    }
}
