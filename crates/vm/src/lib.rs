//! Tangle VM - linear register-machine programs
//!
//! A [`Program`] is an ordered list of [`Line`]s bound to one
//! [`Environment`]. Each line reads operands from the register file, the
//! program's constants or an external [`DataSource`], calls one
//! [`Instruction`] and writes a scalar into a destination register. The
//! [`ProgramExecutionEngine`] runs a program and returns register 0.

pub mod data;
pub mod environment;
pub mod error;
pub mod executor;
pub mod instruction;
pub mod line;
pub mod program;

pub use data::{array_address_space, DataSource, OperandType, OperandValue, PrimitiveArray};
pub use environment::{Environment, SourceLayout};
pub use error::{ConfigError, ExecutionFault, ProgramError};
pub use executor::{ExecutionMode, ProgramExecutionEngine};
pub use instruction::{
    builtins, Instruction, InstructionSet, KernelFn, KernelInstruction, LambdaInstruction,
    Parameter, PARAMETER_BITS,
};
pub use line::{Line, Operand};
pub use program::Program;

/// Index of the register holding the result of a program.
pub const RESULT_REGISTER: usize = 0;

/// Index of the register file among the data sources of every line.
pub const REGISTER_SOURCE: usize = 0;
