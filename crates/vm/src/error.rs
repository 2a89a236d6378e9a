//! Errors raised by environments, programs and the execution engine.
//!
//! # Error Categories
//!
//! - **Configuration**: [`ConfigError`] is fatal and raised while building an
//!   [`Environment`](crate::Environment). Nothing can run on a bad environment.
//! - **Execution**: [`ExecutionFault`] describes one line that cannot run.
//!   Strict execution aborts on it; tolerant execution skips the line.
//! - **Program editing**: [`ProgramError`] reports out-of-range edits and
//!   lines that do not fit the bound environment.

use thiserror::Error;

/// Fatal environment configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The register file must hold at least the result register.
    #[error("environment has no registers")]
    NoRegisters,

    /// The instruction catalogue is empty.
    #[error("instruction set is empty")]
    NoInstructions,

    /// No instruction takes any operand, so lines cannot read data.
    #[error("no instruction in the set takes an operand")]
    NoOperands,

    /// No external data source was supplied.
    #[error("environment has no external data source")]
    NoDataSources,

    /// An external data source cannot be addressed at all.
    #[error("data source {index} has an empty address space")]
    EmptyAddressSpace {
        /// Source index, counting the register file as 0.
        index: usize,
    },

    /// No instruction has a compatible source for every one of its operands.
    #[error("no instruction has a compatible data source for all its operands")]
    NoUsableInstruction,

    /// The derived line width is zero bits.
    #[error("derived line size is zero")]
    ZeroLineSize,
}

/// A line of a program cannot be executed as written.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionFault {
    /// The instruction index does not name an instruction of the set.
    #[error("instruction index {index} out of range ({count} instructions)")]
    InvalidInstruction { index: usize, count: usize },

    /// The destination is not a register.
    #[error("destination register {index} out of range ({count} registers)")]
    InvalidDestination { index: usize, count: usize },

    /// The line carries fewer operands than the instruction needs.
    #[error("instruction {instruction} needs {needed} operands, line has {available}")]
    MissingOperand {
        instruction: String,
        needed: usize,
        available: usize,
    },

    /// The line carries fewer parameters than the instruction needs.
    #[error("instruction {instruction} needs {needed} parameters, line has {available}")]
    MissingParameter {
        instruction: String,
        needed: usize,
        available: usize,
    },

    /// The operand names a data source that does not exist.
    #[error("data source {index} out of range ({count} sources)")]
    InvalidSource { index: usize, count: usize },

    /// The operand address lies outside the source's address space.
    #[error("address {address} out of range for data source {source_index} (space {space})")]
    AddressOutOfRange {
        source_index: usize,
        address: usize,
        space: usize,
    },

    /// The data source cannot provide values of the operand's type.
    #[error("data source {source_index} cannot provide {operand_type} operands")]
    TypeMismatch {
        source_index: usize,
        operand_type: String,
    },

    /// The data sources given to the engine do not match the environment.
    #[error("data sources do not match the environment: {reason}")]
    IncompatibleSources { reason: String },
}

/// Errors raised while editing or rebuilding a program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProgramError {
    /// A line index is past the end of the program.
    #[error("line {index} out of range (program has {len} lines)")]
    LineOutOfRange { index: usize, len: usize },

    /// A constant index is past the end of the constant buffer.
    #[error("constant {index} out of range ({len} constants)")]
    ConstantOutOfRange { index: usize, len: usize },

    /// The constant buffer does not have the size the environment requires.
    #[error("expected {expected} constants, found {found}")]
    ConstantCount { expected: usize, found: usize },

    /// A line does not fit the bound environment.
    #[error("line {index} is invalid: {fault}")]
    InvalidLine {
        index: usize,
        #[source]
        fault: ExecutionFault,
    },
}
