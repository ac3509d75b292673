use approx::assert_abs_diff_eq;

use crate::error::MdpError;
use crate::model::{Action, Graph, State};
use crate::solver::{policy_iteration, value_iteration, SolverConfig};

/// Small grid-like graph with a cycle, noisy moves and two exits.
fn corridor() -> Graph {
    let mut graph = Graph::new().with_gamma(0.9);
    graph
        .add_state(State::new("c0", -1.0))
        .add_state(State::new("c1", -1.0))
        .add_state(State::new("c2", -1.0))
        .add_state(State::new("exit", 20.0).terminal())
        .add_state(State::new("lava", -20.0).terminal());
    for (here, left, right) in [("c0", "lava", "c1"), ("c1", "c0", "c2"), ("c2", "c1", "exit")] {
        graph
            .add_action(
                Action::new(format!("{here}-left"), here)
                    .with_label("left")
                    .with_outcome(left, 0.8)
                    .with_outcome(right, 0.2),
            )
            .add_action(
                Action::new(format!("{here}-right"), here)
                    .with_label("right")
                    .with_cost(0.5)
                    .with_outcome(right, 0.8)
                    .with_outcome(left, 0.2),
            );
    }
    graph
}

/// Layered DAG: every state reaches a terminal state.
fn layered_dag(width: usize, depth: usize) -> Graph {
    let mut graph = Graph::new().with_gamma(1.0);
    for layer in 0..depth {
        for i in 0..width {
            graph.add_state(State::new(format!("s{layer}_{i}"), (i as f64) - 1.0));
        }
    }
    graph.add_state(State::new("sink", 5.0).terminal());
    for layer in 0..depth {
        for i in 0..width {
            let here = format!("s{layer}_{i}");
            let next = |j: usize| {
                if layer + 1 == depth {
                    "sink".to_string()
                } else {
                    format!("s{}_{}", layer + 1, j % width)
                }
            };
            graph.add_action(
                Action::new(format!("{here}-a"), here.clone())
                    .with_cost(0.25)
                    .with_outcome(next(i), 1.0),
            );
            if layer + 1 < depth {
                graph.add_action(
                    Action::new(format!("{here}-b"), here.clone())
                        .with_outcome(next(i), 0.5)
                        .with_outcome(next(i + 1), 0.5),
                );
            }
        }
    }
    graph
}

#[test]
fn test_demo_end_to_end() {
    let graph = Graph::demo();
    let solution = value_iteration(&graph, &SolverConfig::default()).unwrap();

    assert!(solution.converged);
    assert_eq!(solution.value("work"), Some(45.0));
    assert_eq!(solution.value("home"), Some(0.0));
    assert_eq!(solution.value("delay"), Some(-2.0));
    assert_abs_diff_eq!(solution.value("start").unwrap(), 0.95 * 45.0, epsilon = 1e-9);
    // bike and car tie; bike is enumerated first
    assert_eq!(solution.action_for("start").unwrap().as_str(), "start-bike");
    assert_eq!(solution.action_for("delay").unwrap().as_str(), "delay-train");
    assert!(solution.action_for("work").is_none());
    assert!(solution.action_for("home").is_none());
}

#[test]
fn test_demo_train_q_value() {
    let graph = Graph::demo();
    let solution = value_iteration(&graph, &SolverConfig::default()).unwrap();
    let q = crate::solver::q_values(&graph, &solution.values, "start", graph.gamma);
    assert_eq!(q[2].0.as_str(), "start-train");
    assert_abs_diff_eq!(q[2].1, 0.95 * (0.2 * -2.0) - 5.0, epsilon = 1e-9);
    assert_eq!(q[0].1, q[1].1);
}

#[test]
fn test_dag_converges() {
    let graph = layered_dag(4, 6);
    let solution = value_iteration(&graph, &SolverConfig::default()).unwrap();
    assert!(solution.converged);
    assert!(solution.iterations <= 1000);
}

#[test]
fn test_bellman_consistency() {
    for graph in [Graph::demo(), corridor(), layered_dag(3, 4)] {
        let solution = value_iteration(&graph, &SolverConfig::default()).unwrap();
        assert!(solution.converged);
        assert!(solution.bellman_residual(&graph, graph.gamma) < graph.epsilon);
    }
}

#[test]
fn test_terminal_values_equal_reward() {
    for gamma in [0.0, 0.5, 0.95, 1.0] {
        for epsilon in [1e-1, 1e-3, 1e-6] {
            let graph = corridor();
            let config = SolverConfig::default()
                .with_gamma(gamma)
                .with_epsilon(epsilon);
            let vi = value_iteration(&graph, &config).unwrap();
            let pi = policy_iteration(&graph, &config).unwrap();
            for solution in [vi, pi] {
                assert_eq!(solution.value("exit"), Some(20.0));
                assert_eq!(solution.value("lava"), Some(-20.0));
            }
        }
    }
}

#[test]
fn test_policy_and_value_iteration_agree() {
    for graph in [Graph::demo(), corridor(), layered_dag(3, 5)] {
        let config = SolverConfig::default().with_epsilon(1e-6);
        let vi = value_iteration(&graph, &config).unwrap();
        let pi = policy_iteration(&graph, &config).unwrap();
        assert!(vi.converged && pi.converged);
        for state in &graph.states {
            let id = state.id.as_str();
            assert_abs_diff_eq!(vi.value(id).unwrap(), pi.value(id).unwrap(), epsilon = 1e-3);
        }
    }
}

#[test]
fn test_corridor_policy_heads_for_exit() {
    let graph = corridor();
    let solution = policy_iteration(&graph, &SolverConfig::default()).unwrap();
    for here in ["c0", "c1", "c2"] {
        assert_eq!(
            solution.action_for(here).unwrap().as_str(),
            format!("{here}-right")
        );
    }
}

#[test]
fn test_unreachable_states_solve_independently() {
    let mut graph = Graph::demo();
    graph
        .add_state(State::new("island", 1.0))
        .add_action(Action::new("island-stay", "island").with_outcome("island", 1.0));
    let solution = value_iteration(&graph, &SolverConfig::default().with_epsilon(1e-9)).unwrap();
    assert!(solution.converged);
    assert_abs_diff_eq!(solution.value("island").unwrap(), 1.0 / 0.05, epsilon = 1e-6);
}

#[test]
fn test_probability_validation_blocks_both_solvers() {
    let mut graph = Graph::demo();
    graph.actions[2].outcomes[1].prob = 0.5;
    for result in [
        value_iteration(&graph, &SolverConfig::default()),
        policy_iteration(&graph, &SolverConfig::default()),
    ] {
        match result {
            Err(MdpError::Validation(err)) => {
                assert!(err.mentions_action("start-train"));
                let sums = err.probability_sums();
                assert_eq!(sums.len(), 1);
                assert_abs_diff_eq!(sums[0].1, 0.7, epsilon = 1e-12);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}

#[test]
fn test_solution_serializes_with_boundary_names() {
    let solution = value_iteration(&Graph::demo(), &SolverConfig::default()).unwrap();
    let json = serde_json::to_value(&solution).unwrap();
    assert_eq!(json["values"]["work"], 45.0);
    assert_eq!(json["policy"]["start"], "start-bike");
    assert_eq!(json["converged"], true);
    assert!(json["iterations"].as_u64().unwrap() >= 1);
}
