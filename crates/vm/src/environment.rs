//! Execution environment shared by every program of a graph.
//!
//! An [`Environment`] fixes the instruction catalogue, the register count,
//! the number of per-program constants and the addressable layout of every
//! data source. Programs are bound to one environment for their lifetime.
//!
//! # Source Indexing
//!
//! ```text
//! 0                  register file
//! 1                  program constants (only when nb_constants > 0)
//! offset..           external data sources, in the order given
//! ```
//!
//! The environment precomputes, for each instruction operand, which sources
//! can provide a value of the operand's type, and which instructions have a
//! compatible source for every operand. Random line generation only draws
//! from those.

use indexmap::{IndexMap, IndexSet};

use crate::data::{array_address_space, DataSource, OperandType};
use crate::error::{ConfigError, ExecutionFault};
use crate::instruction::{Instruction, InstructionSet, PARAMETER_BITS};
use crate::line::Operand;
use crate::REGISTER_SOURCE;

/// Addressable layout of one data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    spaces: IndexMap<OperandType, usize>,
    largest: usize,
}

impl SourceLayout {
    fn of_array(len: usize, types: &IndexSet<OperandType>) -> Self {
        Self {
            spaces: types
                .iter()
                .map(|&ty| (ty, array_address_space(len, ty)))
                .collect(),
            largest: len,
        }
    }

    fn of_source(source: &dyn DataSource, types: &IndexSet<OperandType>) -> Self {
        Self {
            spaces: types
                .iter()
                .map(|&ty| (ty, source.address_space(ty)))
                .collect(),
            largest: source.largest_address_space(),
        }
    }

    /// Address space for operands of `ty` (0 when unsupported).
    pub fn address_space(&self, ty: OperandType) -> usize {
        self.spaces.get(&ty).copied().unwrap_or(0)
    }

    pub fn largest_address_space(&self) -> usize {
        self.largest
    }
}

/// Instruction set, register file and data-source layout bound together.
#[derive(Debug)]
pub struct Environment {
    instructions: InstructionSet,
    nb_registers: usize,
    nb_constants: usize,
    layouts: Vec<SourceLayout>,
    /// `compatible[instruction][operand]` lists the usable source indices.
    compatible: Vec<Vec<Vec<usize>>>,
    usable_instructions: Vec<usize>,
    max_nb_operands: usize,
    max_nb_parameters: usize,
    largest_address_space: usize,
    line_size: usize,
}

impl Environment {
    /// Build an environment from an instruction set and the external sources
    /// programs will read.
    ///
    /// The sources are only inspected for their layout. The engine receives
    /// the actual observations at each execution, and they must keep the same
    /// layout.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when no line could be generated or encoded:
    /// no registers, no instructions, no operands, no external source, an
    /// external source with nothing to address, no instruction whose operands
    /// all have a compatible source, or a zero line size.
    pub fn new(
        instructions: InstructionSet,
        sources: &[&dyn DataSource],
        nb_registers: usize,
        nb_constants: usize,
    ) -> Result<Self, ConfigError> {
        if nb_registers == 0 {
            return Err(ConfigError::NoRegisters);
        }
        if instructions.is_empty() {
            return Err(ConfigError::NoInstructions);
        }
        let max_nb_operands = instructions.max_nb_operands();
        if max_nb_operands == 0 {
            return Err(ConfigError::NoOperands);
        }
        if sources.is_empty() {
            return Err(ConfigError::NoDataSources);
        }

        let types: IndexSet<OperandType> = instructions
            .iter()
            .flat_map(|instruction| instruction.operand_types().iter().copied())
            .collect();

        let mut layouts = vec![SourceLayout::of_array(nb_registers, &types)];
        if nb_constants > 0 {
            layouts.push(SourceLayout::of_array(nb_constants, &types));
        }
        let offset = layouts.len();
        for (position, source) in sources.iter().enumerate() {
            let layout = SourceLayout::of_source(*source, &types);
            if layout.largest == 0 {
                return Err(ConfigError::EmptyAddressSpace {
                    index: offset + position,
                });
            }
            layouts.push(layout);
        }

        let compatible: Vec<Vec<Vec<usize>>> = instructions
            .iter()
            .map(|instruction| {
                instruction
                    .operand_types()
                    .iter()
                    .map(|&ty| {
                        layouts
                            .iter()
                            .enumerate()
                            .filter(|(_, layout)| layout.address_space(ty) > 0)
                            .map(|(index, _)| index)
                            .collect()
                    })
                    .collect()
            })
            .collect();

        let usable_instructions: Vec<usize> = compatible
            .iter()
            .enumerate()
            .filter(|(_, operands)| operands.iter().all(|sources| !sources.is_empty()))
            .map(|(index, _)| index)
            .collect();
        if usable_instructions.is_empty() {
            return Err(ConfigError::NoUsableInstruction);
        }

        let largest_address_space = layouts
            .iter()
            .map(SourceLayout::largest_address_space)
            .max()
            .unwrap_or(0);
        let max_nb_parameters = instructions.max_nb_parameters();

        let line_size = ceil_log2(instructions.len())
            + ceil_log2(nb_registers)
            + max_nb_operands * (ceil_log2(layouts.len()) + ceil_log2(largest_address_space))
            + max_nb_parameters * PARAMETER_BITS;
        if line_size == 0 {
            return Err(ConfigError::ZeroLineSize);
        }

        Ok(Self {
            instructions,
            nb_registers,
            nb_constants,
            layouts,
            compatible,
            usable_instructions,
            max_nb_operands,
            max_nb_parameters,
            largest_address_space,
            line_size,
        })
    }

    pub fn instructions(&self) -> &InstructionSet {
        &self.instructions
    }

    pub fn instruction(&self, index: usize) -> Option<&dyn Instruction> {
        self.instructions.get(index)
    }

    pub fn nb_registers(&self) -> usize {
        self.nb_registers
    }

    pub fn nb_constants(&self) -> usize {
        self.nb_constants
    }

    /// Number of sources including registers and constants.
    pub fn nb_sources(&self) -> usize {
        self.layouts.len()
    }

    pub fn nb_external_sources(&self) -> usize {
        self.layouts.len() - self.external_source_offset()
    }

    /// Source index of the constant buffer, if programs carry constants.
    pub fn constants_source_index(&self) -> Option<usize> {
        (self.nb_constants > 0).then_some(REGISTER_SOURCE + 1)
    }

    /// Source index of the first external data source.
    pub fn external_source_offset(&self) -> usize {
        if self.nb_constants > 0 {
            2
        } else {
            1
        }
    }

    pub fn layout(&self, source: usize) -> Option<&SourceLayout> {
        self.layouts.get(source)
    }

    /// Address space of `source` for operands of `ty` (0 if unknown).
    pub fn address_space(&self, source: usize, ty: OperandType) -> usize {
        self.layouts
            .get(source)
            .map_or(0, |layout| layout.address_space(ty))
    }

    pub fn source_largest_space(&self, source: usize) -> usize {
        self.layouts
            .get(source)
            .map_or(0, SourceLayout::largest_address_space)
    }

    pub fn largest_address_space(&self) -> usize {
        self.largest_address_space
    }

    pub fn max_nb_operands(&self) -> usize {
        self.max_nb_operands
    }

    pub fn max_nb_parameters(&self) -> usize {
        self.max_nb_parameters
    }

    /// Sources able to feed operand `operand` of instruction `instruction`.
    pub fn compatible_sources(&self, instruction: usize, operand: usize) -> &[usize] {
        self.compatible
            .get(instruction)
            .and_then(|operands| operands.get(operand))
            .map_or(&[][..], Vec::as_slice)
    }

    /// Instructions whose every operand has at least one compatible source.
    pub fn usable_instructions(&self) -> &[usize] {
        &self.usable_instructions
    }

    /// Width in bits of an encoded line.
    pub fn line_size(&self) -> usize {
        self.line_size
    }

    pub fn instruction_bits(&self) -> usize {
        ceil_log2(self.instructions.len())
    }

    pub fn destination_bits(&self) -> usize {
        ceil_log2(self.nb_registers)
    }

    pub fn source_bits(&self) -> usize {
        ceil_log2(self.layouts.len())
    }

    pub fn address_bits(&self) -> usize {
        ceil_log2(self.largest_address_space)
    }

    /// Check that an operand of type `ty` can be read from its source.
    ///
    /// Returns the address space of the source for `ty`.
    pub fn check_operand(&self, operand: &Operand, ty: OperandType) -> Result<usize, ExecutionFault> {
        let layout = self
            .layouts
            .get(operand.source)
            .ok_or(ExecutionFault::InvalidSource {
                index: operand.source,
                count: self.layouts.len(),
            })?;
        let space = layout.address_space(ty);
        if space == 0 {
            return Err(ExecutionFault::TypeMismatch {
                source_index: operand.source,
                operand_type: ty.to_string(),
            });
        }
        if operand.address >= space {
            return Err(ExecutionFault::AddressOutOfRange {
                source_index: operand.source,
                address: operand.address,
                space,
            });
        }
        Ok(space)
    }

    /// Check that observations supplied at execution match the layout the
    /// environment was built with.
    pub fn check_sources(&self, sources: &[&dyn DataSource]) -> Result<(), ExecutionFault> {
        let offset = self.external_source_offset();
        let expected = self.layouts.len() - offset;
        if sources.len() != expected {
            return Err(ExecutionFault::IncompatibleSources {
                reason: format!("expected {} sources, got {}", expected, sources.len()),
            });
        }
        for (position, (source, layout)) in sources.iter().zip(&self.layouts[offset..]).enumerate() {
            let mismatch = layout
                .spaces
                .iter()
                .find(|(ty, space)| source.address_space(**ty) != **space);
            if let Some((ty, space)) = mismatch {
                return Err(ExecutionFault::IncompatibleSources {
                    reason: format!(
                        "source {} has address space {} for {} operands, expected {}",
                        offset + position,
                        source.address_space(*ty),
                        ty,
                        space
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Bits needed to encode `n` distinct values.
fn ceil_log2(n: usize) -> usize {
    if n <= 1 {
        0
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as usize
    }
}
