//! Program lines.
//!
//! A line is a structured record rather than a packed bit field: the
//! instruction index, the destination register, one [`Operand`] slot per
//! operand of the widest instruction, and one raw parameter slot per
//! parameter of the most demanding instruction. Slots past the current
//! instruction's arity are kept so that changing the instruction back and
//! forth does not lose them.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::environment::Environment;
use crate::error::ExecutionFault;
use crate::instruction::{Instruction, Parameter};
use crate::REGISTER_SOURCE;

/// Location of one operand: a data source index and an address within it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operand {
    pub source: usize,
    pub address: usize,
}

impl Operand {
    pub const fn new(source: usize, address: usize) -> Self {
        Self { source, address }
    }
}

/// One instruction occurrence within a program.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Line {
    pub instruction: usize,
    pub destination: usize,
    pub operands: Vec<Operand>,
    pub parameters: Vec<Parameter>,
}

impl Line {
    /// A zeroed line with the slot counts of `env`.
    pub fn new(env: &Environment) -> Self {
        Self {
            instruction: 0,
            destination: 0,
            operands: vec![Operand::default(); env.max_nb_operands()],
            parameters: vec![0; env.max_nb_parameters()],
        }
    }

    /// Look up the line's instruction and check the destination and slot
    /// counts against it.
    pub fn resolve<'e>(&self, env: &'e Environment) -> Result<&'e dyn Instruction, ExecutionFault> {
        let instruction =
            env.instruction(self.instruction)
                .ok_or(ExecutionFault::InvalidInstruction {
                    index: self.instruction,
                    count: env.instructions().len(),
                })?;
        if self.destination >= env.nb_registers() {
            return Err(ExecutionFault::InvalidDestination {
                index: self.destination,
                count: env.nb_registers(),
            });
        }
        let needed = instruction.operand_types().len();
        if self.operands.len() < needed {
            return Err(ExecutionFault::MissingOperand {
                instruction: instruction.name().to_string(),
                needed,
                available: self.operands.len(),
            });
        }
        let needed = instruction.nb_parameters();
        if self.parameters.len() < needed {
            return Err(ExecutionFault::MissingParameter {
                instruction: instruction.name().to_string(),
                needed,
                available: self.parameters.len(),
            });
        }
        Ok(instruction)
    }

    /// Check every field of the line against `env`.
    ///
    /// Operands used by the instruction must be readable with their declared
    /// type; unused slots must still point inside an existing source.
    pub fn validate(&self, env: &Environment) -> Result<(), ExecutionFault> {
        let instruction = self.resolve(env)?;
        let types = instruction.operand_types();
        for (operand, &ty) in self.operands.iter().zip(types) {
            env.check_operand(operand, ty)?;
        }
        for operand in &self.operands[types.len()..] {
            if operand.source >= env.nb_sources() {
                return Err(ExecutionFault::InvalidSource {
                    index: operand.source,
                    count: env.nb_sources(),
                });
            }
            let space = env.source_largest_space(operand.source);
            if operand.address >= space {
                return Err(ExecutionFault::AddressOutOfRange {
                    source_index: operand.source,
                    address: operand.address,
                    space,
                });
            }
        }
        Ok(())
    }

    /// Register cells read by the line's instruction.
    ///
    /// Empty for a line whose instruction cannot be resolved.
    pub fn register_reads<'a>(
        &'a self,
        env: &'a Environment,
    ) -> impl Iterator<Item = Range<usize>> + 'a {
        let types = self
            .resolve(env)
            .map(|instruction| instruction.operand_types())
            .unwrap_or(&[]);
        self.operands
            .iter()
            .zip(types)
            .filter(|(operand, _)| operand.source == REGISTER_SOURCE)
            .map(|(operand, ty)| operand.address..operand.address + ty.width())
    }
}
