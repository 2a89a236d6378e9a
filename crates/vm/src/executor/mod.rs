//! Program execution engine.
//!
//! Runs a [`Program`] line by line against a register file, the program's
//! constants and the external observations of one evaluation step.
//!
//! # Execution Model
//!
//! - Registers are reset to `0.0` at the start of every run
//! - Lines execute in program order; intron lines are skipped when enabled,
//!   which never changes the result
//! - Each line fetches its operands, calls its instruction and writes the
//!   scalar into its destination register
//! - The result is register 0 after the last line
//!
//! # Fault Handling
//!
//! In [`ExecutionMode::Strict`] the first faulty line aborts the run with an
//! [`ExecutionFault`]. In [`ExecutionMode::Tolerant`] the line is traced and
//! skipped, its destination keeps its previous value, and execution goes on.
//! Observations whose layout differs from the environment abort the run in
//! both modes.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::data::{DataSource, OperandValue, PrimitiveArray};
use crate::environment::Environment;
use crate::error::ExecutionFault;
use crate::line::Line;
use crate::program::Program;
use crate::{REGISTER_SOURCE, RESULT_REGISTER};

/// How line faults are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Abort on the first faulty line.
    #[default]
    Strict,
    /// Skip faulty lines and return a best-effort result.
    Tolerant,
}

/// Executes programs with reusable buffers.
///
/// One engine per thread: the register file is private to the engine, so
/// parallel walks each own an engine and share programs read-only.
#[derive(Debug, Clone)]
pub struct ProgramExecutionEngine {
    registers: PrimitiveArray,
    constants: PrimitiveArray,
    operands: Vec<OperandValue>,
    skip_introns: bool,
}

impl ProgramExecutionEngine {
    /// An engine that skips intron lines.
    pub fn new() -> Self {
        Self {
            registers: PrimitiveArray::default(),
            constants: PrimitiveArray::default(),
            operands: Vec::with_capacity(4),
            skip_introns: true,
        }
    }

    /// Enable or disable intron skipping.
    pub fn with_intron_skipping(mut self, skip_introns: bool) -> Self {
        self.skip_introns = skip_introns;
        self
    }

    /// Register file as left by the last run.
    pub fn registers(&self) -> &PrimitiveArray {
        &self.registers
    }

    /// Execute `program` against the external observations `sources`.
    ///
    /// `sources` must match, in count and layout, the sources the program's
    /// environment was built with.
    ///
    /// # Errors
    ///
    /// - [`ExecutionFault::IncompatibleSources`] in both modes
    /// - the first line fault in [`ExecutionMode::Strict`]
    pub fn execute(
        &mut self,
        program: &Program,
        sources: &[&dyn DataSource],
        mode: ExecutionMode,
    ) -> Result<f64, ExecutionFault> {
        let env = program.environment().as_ref();
        env.check_sources(sources)?;

        self.registers.fill(env.nb_registers(), 0.0);
        self.load_constants(program.constants());

        for (index, line) in program.lines().iter().enumerate() {
            if self.skip_introns && program.is_intron(index) {
                continue;
            }
            if let Err(fault) = self.execute_line(env, line, sources) {
                match mode {
                    ExecutionMode::Strict => return Err(fault),
                    ExecutionMode::Tolerant => {
                        trace!(line = index, %fault, "skipping faulty line");
                    }
                }
            }
        }

        Ok(self.registers.get(RESULT_REGISTER).unwrap_or(0.0))
    }

    fn load_constants(&mut self, constants: &[i32]) {
        self.constants.fill(constants.len(), 0.0);
        for (cell, &value) in self.constants.values_mut().iter_mut().zip(constants) {
            *cell = f64::from(value);
        }
    }

    fn execute_line(
        &mut self,
        env: &Environment,
        line: &Line,
        sources: &[&dyn DataSource],
    ) -> Result<(), ExecutionFault> {
        let instruction = line.resolve(env)?;
        let Self {
            registers,
            constants,
            operands,
            ..
        } = self;

        operands.clear();
        for (operand, &ty) in line.operands.iter().zip(instruction.operand_types()) {
            let space = env.check_operand(operand, ty)?;
            let source: &dyn DataSource = if operand.source == REGISTER_SOURCE {
                &*registers
            } else if Some(operand.source) == env.constants_source_index() {
                &*constants
            } else {
                sources[operand.source - env.external_source_offset()]
            };
            let value = source
                .read(ty, operand.address)
                .ok_or(ExecutionFault::AddressOutOfRange {
                    source_index: operand.source,
                    address: operand.address,
                    space,
                })?;
            operands.push(value);
        }

        let parameters = &line.parameters[..instruction.nb_parameters()];
        let result = instruction.execute(operands, parameters);
        registers.set(line.destination, result);
        Ok(())
    }
}

impl Default for ProgramExecutionEngine {
    fn default() -> Self {
        Self::new()
    }
}
