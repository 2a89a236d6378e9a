//! Decision walks on acyclic and cyclic graphs.

mod common;

use common::{bid_program, environment, observations, single_team};
use tangle_foundation::{ActionId, RngStream};
use tangle_graph::{
    decide_all, decide_snapshots, evaluate_policy, DecisionEngine, DecisionError,
    EvaluationParameters, Graph, GraphError, InvariantViolation, LearningEnvironment,
};
use tangle_vm::{DataSource, ExecutionFault, ExecutionMode, PrimitiveArray};

#[test]
fn test_highest_bid_wins() {
    let env = environment();
    let (graph, team) = single_team(&env, 3);
    let input = observations(&[0.5, 2.0, -1.0]);

    let mut engine = DecisionEngine::default();
    assert_eq!(engine.decide(&graph, team, &[&input]), Ok(ActionId(1)));
}

#[test]
fn test_tie_goes_to_first_edge() {
    let env = environment();
    let (graph, team) = single_team(&env, 3);
    let input = observations(&[1.0, 1.0, 1.0]);

    let mut engine = DecisionEngine::default();
    assert_eq!(engine.decide(&graph, team, &[&input]), Ok(ActionId(0)));

    let input = observations(&[0.0, 3.0, 3.0]);
    assert_eq!(engine.decide(&graph, team, &[&input]), Ok(ActionId(1)));
}

#[test]
fn test_nan_bid_ranks_last() {
    let env = environment();
    let (graph, team) = single_team(&env, 2);
    let input = observations(&[f64::NAN, -5.0]);

    let mut engine = DecisionEngine::default();
    assert_eq!(engine.decide(&graph, team, &[&input]), Ok(ActionId(1)));
}

#[test]
fn test_cycle_is_not_reentered() {
    // t1 -> t2 and t2 -> t1 bid high; actions bid low.
    let env = environment();
    let mut graph = Graph::new(env.clone());
    let t1 = graph.add_team();
    let t2 = graph.add_team();
    let a0 = graph.add_action(ActionId(0));
    let a1 = graph.add_action(ActionId(1));
    graph.add_edge(t1, t2, bid_program(&env, 0)).unwrap();
    graph.add_edge(t1, a0, bid_program(&env, 1)).unwrap();
    graph.add_edge(t2, t1, bid_program(&env, 0)).unwrap();
    graph.add_edge(t2, a1, bid_program(&env, 2)).unwrap();
    let input = observations(&[10.0, 1.0, 2.0]);

    let mut engine = DecisionEngine::default();
    let decision = engine.walk(&graph, t1, &[&input]).unwrap();
    assert_eq!(decision.action, ActionId(1));
    assert_eq!(decision.path, vec![t1, t2]);

    let decision = engine.walk(&graph, t2, &[&input]).unwrap();
    assert_eq!(decision.action, ActionId(0));
    assert_eq!(decision.path, vec![t2, t1]);
}

#[test]
fn test_exhausted_team_reports_no_termination_path() {
    let env = environment();
    let mut graph = Graph::new(env.clone());
    let t1 = graph.add_team();
    let t2 = graph.add_team();
    graph.add_edge(t1, t2, bid_program(&env, 0)).unwrap();
    graph.add_edge(t2, t1, bid_program(&env, 0)).unwrap();
    let input = observations(&[]);

    let mut engine = DecisionEngine::default();
    assert_eq!(
        engine.decide(&graph, t1, &[&input]),
        Err(DecisionError::NoTerminationPath { team: t2, steps: 2 })
    );
}

#[test]
fn test_team_cycle_needs_an_action_edge_on_every_team() {
    let env = environment();
    let mut graph = Graph::new(env.clone());
    let a0 = graph.add_action(ActionId(0));
    let t1 = graph.add_team();
    let t2 = graph.add_team();
    graph.add_edge(t1, t2, bid_program(&env, 0)).unwrap();
    graph.add_edge(t1, a0, bid_program(&env, 1)).unwrap();
    graph.add_edge(t2, t1, bid_program(&env, 2)).unwrap();
    let input = observations(&[10.0, 1.0, 5.0, -3.0]);

    assert_eq!(
        graph.check_invariants(),
        Err(InvariantViolation::NoActionEdge(t2))
    );
    let mut engine = DecisionEngine::default();
    assert!(matches!(
        engine.decide(&graph, t1, &[&input]),
        Err(DecisionError::NoTerminationPath { team, .. }) if team == t2
    ));

    let a1 = graph.add_action(ActionId(1));
    graph.add_edge(t2, a1, bid_program(&env, 3)).unwrap();
    assert!(graph.check_invariants().is_ok());
    let decision = engine.walk(&graph, t1, &[&input]).unwrap();
    assert_eq!(decision.action, ActionId(1));
}

#[test]
fn test_walk_requires_a_team() {
    let env = environment();
    let (graph, _) = single_team(&env, 1);
    let action = graph.action_vertex(ActionId(0)).unwrap();
    let input = observations(&[]);

    let mut engine = DecisionEngine::default();
    assert_eq!(
        engine.decide(&graph, action, &[&input]),
        Err(DecisionError::Graph(GraphError::NotATeam(action)))
    );
}

#[test]
fn test_program_fault_depends_on_mode() {
    let env = environment();
    let (mut graph, team) = single_team(&env, 2);
    let faulty = graph.edge_ids().next().unwrap();
    graph.program_mut(faulty).unwrap().line_mut(0).unwrap().operands[0].address = 40;
    let input = observations(&[5.0, -1.0]);

    let mut strict = DecisionEngine::new(ExecutionMode::Strict);
    assert!(matches!(
        strict.decide(&graph, team, &[&input]),
        Err(DecisionError::Execution {
            edge,
            fault: ExecutionFault::AddressOutOfRange { address: 40, .. },
        }) if edge == faulty
    ));

    // The faulty line is skipped, leaving a bid of 0.0 above -1.0.
    let mut tolerant = DecisionEngine::new(ExecutionMode::Tolerant);
    assert_eq!(tolerant.decide(&graph, team, &[&input]), Ok(ActionId(0)));
}

#[test]
fn test_walks_end_within_team_count_on_dense_cycles() {
    // Every Team points at every other Team and at one Action.
    let env = environment();
    let mut graph = Graph::new(env.clone());
    let teams: Vec<_> = (0..5).map(|_| graph.add_team()).collect();
    for (index, &team) in teams.iter().enumerate() {
        for (other_index, &other) in teams.iter().enumerate() {
            if other != team {
                let program = bid_program(&env, (index + other_index) % 8);
                graph.add_edge(team, other, program).unwrap();
            }
        }
        let action = graph.add_action(ActionId(index as u64));
        graph.add_edge(team, action, bid_program(&env, index)).unwrap();
    }

    let mut rng = RngStream::new(17);
    let mut engine = DecisionEngine::default();
    for _ in 0..50 {
        let values: Vec<f64> = (0..8).map(|_| rng.uniform() * 10.0 - 5.0).collect();
        let input = observations(&values);
        for &root in &teams {
            let decision = engine.walk(&graph, root, &[&input]).unwrap();
            assert!(decision.path.len() <= teams.len());
        }
    }
}

#[test]
fn test_parallel_walks_match_sequential() {
    let env = environment();
    let mut graph = Graph::new(env.clone());
    let actions: Vec<_> = (0..4).map(|a| graph.add_action(ActionId(a))).collect();
    let roots: Vec<_> = (0..16)
        .map(|i| {
            let team = graph.add_team();
            for (offset, &action) in actions.iter().enumerate() {
                let address = (i + offset) % 8;
                graph.add_edge(team, action, bid_program(&env, address)).unwrap();
            }
            team
        })
        .collect();
    let input = observations(&[0.1, 0.7, 0.3, 0.9, 0.2, 0.8, 0.4, 0.6]);

    let parallel = decide_all(&graph, &roots, &[&input], ExecutionMode::Strict);
    let mut engine = DecisionEngine::default();
    let sequential: Vec<_> = roots
        .iter()
        .map(|&root| engine.decide(&graph, root, &[&input]))
        .collect();
    assert_eq!(parallel, sequential);

    let snapshots: Vec<PrimitiveArray> = (0..8)
        .map(|shift| {
            let values: Vec<f64> = (0..8).map(|i| ((i + shift) % 8) as f64).collect();
            observations(&values)
        })
        .collect();
    let views: Vec<Vec<&dyn DataSource>> = snapshots
        .iter()
        .map(|snapshot| vec![snapshot as &dyn DataSource])
        .collect();
    let results = decide_snapshots(&graph, roots[0], &views, ExecutionMode::Strict);
    for (snapshot, result) in snapshots.iter().zip(results) {
        assert_eq!(result, engine.decide(&graph, roots[0], &[snapshot]));
    }
}

/// Rewards action 1; episodes last ten steps.
#[derive(Debug)]
struct Counter {
    input: PrimitiveArray,
    steps: u64,
    score: f64,
}

impl LearningEnvironment for Counter {
    fn reset(&mut self, _seed: u64) {
        self.steps = 0;
        self.score = 0.0;
    }

    fn data_sources(&self) -> Vec<&dyn DataSource> {
        vec![&self.input as &dyn DataSource]
    }

    fn do_action(&mut self, action: ActionId) {
        self.steps += 1;
        if action == ActionId(1) {
            self.score += 1.0;
        }
    }

    fn is_terminal(&self) -> bool {
        self.steps >= 10
    }

    fn score(&self) -> f64 {
        self.score
    }
}

#[test]
fn test_evaluate_policy_runs_episodes() {
    let env = environment();
    let (graph, team) = single_team(&env, 2);
    let mut counter = Counter {
        input: observations(&[0.0, 1.0]),
        steps: 0,
        score: 0.0,
    };

    let params = EvaluationParameters {
        nb_iterations_per_policy_evaluation: 3,
        ..EvaluationParameters::default()
    };
    let result = evaluate_policy(&graph, team, &mut counter, &params, 0).unwrap();
    assert_eq!(result.scores, vec![10.0, 10.0, 10.0]);
    assert_eq!(result.mean, 10.0);
    assert_eq!(result.nb_actions, 30);

    let capped = EvaluationParameters {
        max_nb_actions_per_eval: 4,
        nb_iterations_per_policy_evaluation: 1,
        ..EvaluationParameters::default()
    };
    let result = evaluate_policy(&graph, team, &mut counter, &capped, 0).unwrap();
    assert_eq!(result.scores, vec![4.0]);
}
