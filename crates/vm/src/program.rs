//! Programs: ordered lines bound to one environment.
//!
//! # Introns
//!
//! [`Program::identify_introns`] runs a backward dataflow pass from the
//! result register. A line is effective when its destination is read by a
//! later effective line (or is the result register at the end of the
//! program); every other line is an intron. Introns stay in the program and
//! keep evolving, but the execution engine may skip them and they do not
//! count towards [`Program::effective_len`].
//!
//! Any edit through [`Program::line_mut`], [`Program::add_new_line`],
//! [`Program::insert_line`], [`Program::remove_line`] or
//! [`Program::swap_lines`] flags every line as effective until the next
//! `identify_introns` call, so skipping introns never skips a live line.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::environment::Environment;
use crate::error::ProgramError;
use crate::line::Line;
use crate::RESULT_REGISTER;

/// A linear register-machine program.
///
/// Programs are shared between graph edges through `Arc<Program>`; cloning
/// copies the lines and constants and keeps the environment shared.
#[derive(Debug, Clone)]
pub struct Program {
    environment: Arc<Environment>,
    lines: Vec<Line>,
    introns: Vec<bool>,
    constants: Vec<i32>,
}

impl Program {
    /// An empty program with zeroed constants.
    pub fn new(environment: Arc<Environment>) -> Self {
        let constants = vec![0; environment.nb_constants()];
        Self {
            environment,
            lines: Vec::new(),
            introns: Vec::new(),
            constants,
        }
    }

    /// Rebuild a program from stored lines and constants.
    ///
    /// Every line is validated and introns are identified.
    pub fn from_parts(
        environment: Arc<Environment>,
        lines: Vec<Line>,
        constants: Vec<i32>,
    ) -> Result<Self, ProgramError> {
        if constants.len() != environment.nb_constants() {
            return Err(ProgramError::ConstantCount {
                expected: environment.nb_constants(),
                found: constants.len(),
            });
        }
        let introns = vec![false; lines.len()];
        let mut program = Self {
            environment,
            lines,
            introns,
            constants,
        };
        program.validate()?;
        program.identify_introns();
        Ok(program)
    }

    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Result<&Line, ProgramError> {
        let len = self.lines.len();
        self.lines
            .get(index)
            .ok_or(ProgramError::LineOutOfRange { index, len })
    }

    pub fn line_mut(&mut self, index: usize) -> Result<&mut Line, ProgramError> {
        let len = self.lines.len();
        self.reset_introns();
        self.lines
            .get_mut(index)
            .ok_or(ProgramError::LineOutOfRange { index, len })
    }

    /// Append a zeroed line and return it for editing.
    pub fn add_new_line(&mut self) -> &mut Line {
        let line = Line::new(&self.environment);
        self.lines.push(line);
        self.introns.push(false);
        self.reset_introns();
        let last = self.lines.len() - 1;
        &mut self.lines[last]
    }

    /// Insert `line` before position `index` (`index == len` appends).
    pub fn insert_line(&mut self, index: usize, line: Line) -> Result<(), ProgramError> {
        if index > self.lines.len() {
            return Err(ProgramError::LineOutOfRange {
                index,
                len: self.lines.len(),
            });
        }
        self.lines.insert(index, line);
        self.introns.insert(index, false);
        self.reset_introns();
        Ok(())
    }

    pub fn remove_line(&mut self, index: usize) -> Result<Line, ProgramError> {
        if index >= self.lines.len() {
            return Err(ProgramError::LineOutOfRange {
                index,
                len: self.lines.len(),
            });
        }
        self.introns.remove(index);
        self.reset_introns();
        Ok(self.lines.remove(index))
    }

    pub fn swap_lines(&mut self, a: usize, b: usize) -> Result<(), ProgramError> {
        let len = self.lines.len();
        for index in [a, b] {
            if index >= len {
                return Err(ProgramError::LineOutOfRange { index, len });
            }
        }
        self.lines.swap(a, b);
        self.reset_introns();
        Ok(())
    }

    fn reset_introns(&mut self) {
        self.introns.fill(false);
    }

    /// Flag intron lines by backward dataflow from the result register.
    ///
    /// Returns the number of introns.
    pub fn identify_introns(&mut self) -> usize {
        let env = &self.environment;
        let mut needed = vec![false; env.nb_registers()];
        needed[RESULT_REGISTER] = true;
        let mut count = 0;

        let limit = needed.len();
        for (line, intron) in self.lines.iter().zip(self.introns.iter_mut()).rev() {
            let writes_needed = needed.get(line.destination).copied().unwrap_or(false);
            *intron = !writes_needed;
            if !writes_needed {
                count += 1;
                continue;
            }
            // A faulty line never overwrites its destination.
            if line.resolve(env).is_ok() {
                needed[line.destination] = false;
            }
            for reads in line.register_reads(env) {
                for register in reads.filter(|&register| register < limit) {
                    needed[register] = true;
                }
            }
        }

        count
    }

    pub fn is_intron(&self, index: usize) -> bool {
        self.introns.get(index).copied().unwrap_or(false)
    }

    pub fn nb_introns(&self) -> usize {
        self.introns.iter().filter(|&&intron| intron).count()
    }

    /// Number of lines that contribute to the result.
    pub fn effective_len(&self) -> usize {
        self.lines.len() - self.nb_introns()
    }

    /// Non-intron lines with their positions.
    pub fn effective_lines(&self) -> impl Iterator<Item = (usize, &Line)> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(index, _)| !self.introns[*index])
    }

    /// Delete every line currently flagged as an intron.
    ///
    /// Returns the number of removed lines.
    pub fn clear_introns(&mut self) -> usize {
        let before = self.lines.len();
        let mut flags = self.introns.iter();
        self.lines.retain(|_| !flags.next().copied().unwrap_or(false));
        self.introns = vec![false; self.lines.len()];
        before - self.lines.len()
    }

    pub fn constants(&self) -> &[i32] {
        &self.constants
    }

    pub fn constant(&self, index: usize) -> Result<i32, ProgramError> {
        self.constants
            .get(index)
            .copied()
            .ok_or(ProgramError::ConstantOutOfRange {
                index,
                len: self.constants.len(),
            })
    }

    pub fn set_constant(&mut self, index: usize, value: i32) -> Result<(), ProgramError> {
        let len = self.constants.len();
        let slot = self
            .constants
            .get_mut(index)
            .ok_or(ProgramError::ConstantOutOfRange { index, len })?;
        *slot = value;
        Ok(())
    }

    /// Whether both programs compute the same function of their inputs.
    ///
    /// Compares the effective lines and the constants those lines read.
    /// Relies on up-to-date intron flags in both programs.
    pub fn has_identical_behavior(&self, other: &Program) -> bool {
        if !Arc::ptr_eq(&self.environment, &other.environment) {
            return false;
        }
        if !self
            .effective_lines()
            .map(|(_, line)| line)
            .eq(other.effective_lines().map(|(_, line)| line))
        {
            return false;
        }
        self.constants_read()
            .into_iter()
            .all(|index| self.constants.get(index) == other.constants.get(index))
    }

    /// Constant indices read by effective lines.
    fn constants_read(&self) -> BTreeSet<usize> {
        let Some(source) = self.environment.constants_source_index() else {
            return BTreeSet::new();
        };
        let env = &self.environment;
        self.effective_lines()
            .filter_map(|(_, line)| {
                line.resolve(env)
                    .ok()
                    .map(|instruction| (line, instruction.operand_types()))
            })
            .flat_map(|(line, types)| {
                line.operands
                    .iter()
                    .zip(types)
                    .filter(move |(operand, _)| operand.source == source)
                    .flat_map(|(operand, ty)| operand.address..operand.address + ty.width())
            })
            .collect()
    }

    /// Check every line against the bound environment.
    pub fn validate(&self) -> Result<(), ProgramError> {
        for (index, line) in self.lines.iter().enumerate() {
            line.validate(&self.environment)
                .map_err(|fault| ProgramError::InvalidLine { index, fault })?;
        }
        Ok(())
    }
}
