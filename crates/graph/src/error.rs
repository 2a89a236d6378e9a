//! Graph, decision and snapshot errors.

use thiserror::Error;

use tangle_foundation::{EdgeId, VertexId};
use tangle_vm::{ExecutionFault, ProgramError};

/// Invalid structural edit of a graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("unknown vertex {0}")]
    UnknownVertex(VertexId),

    #[error("unknown edge {0}")]
    UnknownEdge(EdgeId),

    /// Only Teams have outgoing edges.
    #[error("vertex {0} is not a team")]
    NotATeam(VertexId),

    /// An edge may not point back at its own source.
    #[error("edge from {0} to itself")]
    SelfLoop(VertexId),

    /// Programs must be bound to the graph's environment.
    #[error("program is bound to another environment")]
    EnvironmentMismatch,
}

/// A decision walk could not produce an action.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecisionError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Every outgoing edge of `team` leads to an already visited Team.
    ///
    /// Only reachable on graphs failing [`crate::Graph::check_invariants`]
    /// with [`InvariantViolation::NoActionEdge`].
    #[error("no termination path from team {team} after {steps} steps")]
    NoTerminationPath { team: VertexId, steps: usize },

    /// A strict-mode program fault while computing a bid.
    #[error("program of edge {edge} failed: {fault}")]
    Execution {
        edge: EdgeId,
        #[source]
        fault: ExecutionFault,
    },
}

/// A structural invariant does not hold.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("team {0} has no outgoing edge")]
    TeamWithoutEdge(VertexId),

    /// A decision walk entering this Team could run out of choices.
    #[error("team {0} has no edge towards an action")]
    NoActionEdge(VertexId),

    #[error("edge {0} points at its own source")]
    SelfLoop(EdgeId),

    #[error("program of edge {edge} has {len} lines, outside [{min}, {max}]")]
    ProgramSize {
        edge: EdgeId,
        len: usize,
        min: usize,
        max: usize,
    },

    #[error("program of edge {edge} is invalid: {error}")]
    InvalidProgram {
        edge: EdgeId,
        #[source]
        error: ProgramError,
    },

    #[error("vertex {0} has no edge at all")]
    Orphan(VertexId),

    #[error("root set does not match teams without incoming edges")]
    RootMismatch,

    #[error("edge {0} is missing from its endpoints' edge lists")]
    Dangling(EdgeId),
}

/// A snapshot could not be encoded, decoded or restored.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("edge record {edge} refers to missing vertex {vertex}")]
    DanglingVertex { edge: usize, vertex: usize },

    #[error("edge record {edge} refers to missing program {program}")]
    DanglingProgram { edge: usize, program: usize },

    #[error("program record {index} is invalid: {error}")]
    Program {
        index: usize,
        #[source]
        error: ProgramError,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),
}
