//! Shared fixtures for graph integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use tangle_foundation::ActionId;
use tangle_graph::Graph;
use tangle_vm::{Environment, InstructionSet, Operand, PrimitiveArray, Program};

pub const NB_INPUTS: usize = 8;

pub fn observations(values: &[f64]) -> PrimitiveArray {
    let mut input = PrimitiveArray::new(NB_INPUTS);
    for (address, &value) in values.iter().enumerate() {
        input.set(address, value);
    }
    input
}

pub fn environment() -> Arc<Environment> {
    let input = observations(&[]);
    Arc::new(Environment::new(InstructionSet::arithmetic(), &[&input], 4, 0).unwrap())
}

/// Program whose bid is the observation at `address`: r0 = in[address] + r1.
pub fn bid_program(env: &Arc<Environment>, address: usize) -> Arc<Program> {
    let mut program = Program::new(env.clone());
    let line = program.add_new_line();
    line.operands = vec![Operand::new(1, address), Operand::new(0, 1)];
    program.identify_introns();
    Arc::new(program)
}

/// One Team with an edge to each of `nb_actions` Actions; edge `i` bids
/// observation `i`.
pub fn single_team(env: &Arc<Environment>, nb_actions: u64) -> (Graph, tangle_foundation::VertexId) {
    let mut graph = Graph::new(env.clone());
    let team = graph.add_team();
    for action in 0..nb_actions {
        let vertex = graph.add_action(ActionId(action));
        graph
            .add_edge(team, vertex, bid_program(env, action as usize))
            .unwrap();
    }
    (graph, team)
}
