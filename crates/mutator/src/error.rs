//! Mutation and parameter errors.

use thiserror::Error;

use tangle_graph::GraphError;
use tangle_vm::ProgramError;

/// A knob holds a value no operator can work with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("{name} must be a probability in [0, 1], got {value}")]
    Probability { name: &'static str, value: f64 },

    #[error("{name}: minimum {min} exceeds maximum {max}")]
    InvertedBounds {
        name: &'static str,
        min: i64,
        max: i64,
    },

    #[error("{name} must be at least 1")]
    Zero { name: &'static str },
}

/// Mutation could not run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MutationError {
    /// No instruction of the environment can be given valid operands.
    #[error("no instruction has a compatible data source for all its operands")]
    NoCompatibleInstruction,

    #[error("no action identifiers configured")]
    NoActions,

    #[error("graph has no team")]
    EmptyGraph,

    #[error(transparent)]
    Parameters(#[from] ParameterError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Program(#[from] ProgramError),
}
