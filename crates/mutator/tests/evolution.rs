//! Multi-generation mutation runs.

use std::sync::Arc;

use tangle_foundation::{RngStream, VertexId};
use tangle_graph::{decide_all, Graph, GraphSnapshot};
use tangle_mutator::{GraphMutator, MutationParameters, NEW_TEAMS_PER_PASS};
use tangle_vm::{builtins, Environment, ExecutionMode, InstructionSet, PrimitiveArray};

const NB_INPUTS: usize = 6;

fn environment() -> Arc<Environment> {
    let input = PrimitiveArray::new(NB_INPUTS);
    let instructions = InstructionSet::arithmetic()
        .with(builtins::mult_by_param())
        .with(builtins::mean(2));
    Arc::new(Environment::new(instructions, &[&input], 6, 2).unwrap())
}

fn parameters() -> MutationParameters {
    let mut params = MutationParameters::default();
    params.graph.nb_actions = 3;
    params.graph.nb_roots = 12;
    params.graph.p_edge_destination_change = 0.3;
    params.graph.p_new_team_destination = 0.2;
    params.graph.p_program_sharing = 0.2;
    params.program.min_program_size = 2;
    params.program.max_program_size = 16;
    params
}

fn evolve(seed: u64, generations: usize) -> Graph {
    let params = parameters();
    let nb_roots = params.graph.nb_roots;
    let mut mutator = GraphMutator::new(params, seed).unwrap();
    let mut graph = Graph::new(environment());
    mutator.init_random_graph(&mut graph).unwrap();
    mutator.populate(&mut graph, nb_roots).unwrap();
    for _ in 0..generations {
        mutator.mutate_graph(&mut graph).unwrap();
    }
    graph
}

fn snapshot_bytes(graph: &Graph) -> Vec<u8> {
    GraphSnapshot::capture(graph).to_bytes().unwrap()
}

fn has_action_edge(graph: &Graph, team: VertexId) -> bool {
    graph
        .vertex(team)
        .and_then(|vertex| vertex.as_team())
        .is_some_and(|team| {
            team.outgoing().iter().any(|&edge| {
                graph
                    .edge(edge)
                    .and_then(|edge| graph.vertex(edge.destination()))
                    .is_some_and(|vertex| vertex.is_action())
            })
        })
}

#[test]
fn test_same_seed_same_graph() {
    let first = evolve(17, 10);
    let second = evolve(17, 10);
    assert_eq!(snapshot_bytes(&first), snapshot_bytes(&second));

    let other = evolve(18, 10);
    assert_ne!(snapshot_bytes(&first), snapshot_bytes(&other));
}

#[test]
fn test_invariants_hold_every_generation() {
    let params = parameters();
    let (min, max) = (
        params.program.min_program_size,
        params.program.max_program_size,
    );
    let nb_roots = params.graph.nb_roots;
    let mut mutator = GraphMutator::new(params, 3).unwrap();
    let mut graph = Graph::new(environment());

    mutator.init_random_graph(&mut graph).unwrap();
    graph.check_invariants().unwrap();
    mutator.populate(&mut graph, nb_roots).unwrap();

    let mut input = PrimitiveArray::new(NB_INPUTS);
    let mut rng = RngStream::new(99);
    for generation in 0..25 {
        graph.check_invariants().unwrap();
        graph.check_program_sizes(min, max).unwrap();
        assert!(
            graph.teams().all(|team| has_action_edge(&graph, team)),
            "generation {generation}"
        );

        for value in input.values_mut() {
            *value = rng.uniform() * 10.0 - 5.0;
        }
        let roots: Vec<VertexId> = graph.roots().iter().copied().collect();
        for decision in decide_all(&graph, &roots, &[&input], ExecutionMode::Strict) {
            decision.unwrap();
        }

        mutator.mutate_graph(&mut graph).unwrap();
    }
}

#[test]
fn test_team_count_grows_by_bounded_steps() {
    let mut params = parameters();
    params.graph.p_new_team_destination = 0.9;
    params.graph.p_edge_addition = 0.8;
    let nb_roots = params.graph.nb_roots;
    let mut mutator = GraphMutator::new(params, 3).unwrap();
    let mut graph = Graph::new(environment());
    mutator.init_random_graph(&mut graph).unwrap();
    mutator.populate(&mut graph, nb_roots).unwrap();

    let start = graph.nb_teams();
    for generation in 1..=30 {
        let before = graph.nb_teams();
        mutator.mutate_graph(&mut graph).unwrap();
        assert!(
            graph.nb_teams() <= before + NEW_TEAMS_PER_PASS,
            "generation {generation}: {} teams after {before}",
            graph.nb_teams()
        );
        assert!(graph.nb_teams() <= start + generation * NEW_TEAMS_PER_PASS);
    }
    graph.check_invariants().unwrap();
}

#[test]
fn test_populate_reaches_target() {
    let params = parameters();
    let mut mutator = GraphMutator::new(params, 5).unwrap();
    let mut graph = Graph::new(environment());
    mutator.init_random_graph(&mut graph).unwrap();

    let report = mutator.populate(&mut graph, 12).unwrap();
    assert_eq!(graph.roots().len(), 12);
    assert!(report.teams_cloned >= 9);
    graph.check_invariants().unwrap();
}

#[test]
fn test_shared_programs_are_copied_on_mutation() {
    let env = environment();
    let mut params = parameters();
    params.graph.nb_actions = 2;
    let mut mutator = GraphMutator::new(params, 11).unwrap();
    let mut graph = Graph::new(env);
    mutator.init_random_graph(&mut graph).unwrap();

    let parent = graph.teams().next().unwrap();
    let parent_programs: Vec<_> = graph
        .vertex(parent)
        .and_then(|vertex| vertex.as_team())
        .unwrap()
        .outgoing()
        .iter()
        .map(|&edge| graph.edge(edge).unwrap().program().clone())
        .collect();
    let originals: Vec<_> = parent_programs
        .iter()
        .map(|program| (program.lines().to_vec(), program.constants().to_vec()))
        .collect();

    let child = graph.clone_team(parent).unwrap();
    let child_edges: Vec<_> = graph
        .vertex(child)
        .and_then(|vertex| vertex.as_team())
        .unwrap()
        .outgoing()
        .iter()
        .copied()
        .collect();
    let report = mutator.mutate_programs(&mut graph, &child_edges).unwrap();
    assert_eq!(report.programs_mutated, child_edges.len());
    assert_eq!(report.programs_released, 0);

    for (edge, shared) in child_edges.iter().zip(&parent_programs) {
        assert!(!Arc::ptr_eq(graph.edge(*edge).unwrap().program(), shared));
    }
    for (program, (lines, constants)) in parent_programs.iter().zip(&originals) {
        assert_eq!(program.lines(), lines.as_slice());
        assert_eq!(program.constants(), constants.as_slice());
    }
}

#[test]
fn test_mutation_releases_unused_programs() {
    let mut params = parameters();
    params.graph.p_edge_deletion = 1.0;
    params.graph.p_edge_addition = 0.0;
    params.graph.p_program_mutation = 0.0;
    params.graph.p_edge_destination_change = 0.0;
    params.graph.max_init_outgoing_edges = 3;
    params.graph.min_outgoing_edges = 1;
    let mut mutator = GraphMutator::new(params, 2).unwrap();
    let mut graph = Graph::new(environment());
    mutator.init_random_graph(&mut graph).unwrap();
    let edges_before = graph.nb_edges();

    let report = mutator.mutate_graph(&mut graph).unwrap();
    assert_eq!(report.edges_added, 0);
    assert_eq!(graph.nb_edges(), edges_before - report.edges_deleted);
    assert_eq!(report.programs_released, report.edges_deleted);
    assert!(graph.teams().all(|team| has_action_edge(&graph, team)));
}
