//! Program-level operators.
//!
//! Each operator edits one [`Program`] in place and reports whether it did
//! anything. Operators that would push the program outside its size bounds
//! are no-ops. Intron flags are refreshed by [`mutate_program`] only.

use std::sync::Arc;

use tangle_foundation::RngStream;
use tangle_vm::{Environment, Program};

use crate::error::MutationError;
use crate::line::{alter_line, init_random_line};
use crate::params::ProgramParameters;

/// Mutation rounds tried before giving up on a behavior change.
pub const BEHAVIOR_CHANGE_ATTEMPTS: usize = 100;

/// A program of `[max(1, min), max]` random lines with random constants.
pub fn init_random_program(
    env: &Arc<Environment>,
    params: &ProgramParameters,
    rng: &mut RngStream,
) -> Result<Program, MutationError> {
    let mut program = Program::new(Arc::clone(env));
    let min = params.min_program_size.max(1) as u64;
    let nb_lines = rng.next_unsigned_int(min, params.max_program_size as u64) as usize;
    for index in 0..nb_lines {
        program.insert_line(index, init_random_line(env, rng)?)?;
    }
    for index in 0..env.nb_constants() {
        program.set_constant(index, random_constant(params, rng))?;
    }
    program.identify_introns();
    Ok(program)
}

/// Remove a uniformly chosen line unless the program is at its minimum size.
pub fn delete_random_line(
    program: &mut Program,
    params: &ProgramParameters,
    rng: &mut RngStream,
) -> Result<bool, MutationError> {
    if program.is_empty() || program.len() <= params.min_program_size {
        return Ok(false);
    }
    program.remove_line(rng.next_index(program.len()))?;
    Ok(true)
}

/// Insert a random line at a random position unless the program is at its
/// maximum size.
pub fn insert_random_line(
    program: &mut Program,
    params: &ProgramParameters,
    rng: &mut RngStream,
) -> Result<bool, MutationError> {
    if program.len() >= params.max_program_size {
        return Ok(false);
    }
    let line = init_random_line(program.environment(), rng)?;
    let position = rng.next_unsigned_int(0, program.len() as u64) as usize;
    program.insert_line(position, line)?;
    Ok(true)
}

/// Exchange two distinct random lines.
pub fn swap_random_lines(program: &mut Program, rng: &mut RngStream) -> Result<bool, MutationError> {
    let len = program.len();
    if len < 2 {
        return Ok(false);
    }
    let first = rng.next_index(len);
    let second = (first + 1 + rng.next_index(len - 1)) % len;
    program.swap_lines(first, second)?;
    Ok(true)
}

/// Re-roll one field of a uniformly chosen line.
pub fn alter_random_line(program: &mut Program, rng: &mut RngStream) -> Result<bool, MutationError> {
    if program.is_empty() {
        return Ok(false);
    }
    let env = Arc::clone(program.environment());
    let index = rng.next_index(program.len());
    let line = program.line_mut(index)?;
    alter_line(&env, line, rng)
}

/// Re-roll each constant with probability `pConstantMutation`.
pub fn mutate_constants(
    program: &mut Program,
    params: &ProgramParameters,
    rng: &mut RngStream,
) -> Result<bool, MutationError> {
    let mut changed = false;
    for index in 0..program.constants().len() {
        if rng.bool_with_prob(params.p_constant_mutation) {
            let value = random_constant(params, rng);
            changed |= program.constant(index)? != value;
            program.set_constant(index, value)?;
        }
    }
    Ok(changed)
}

/// One round of program mutation: line deletion, insertion, alteration and
/// swap, each with its own probability, then constant mutation.
///
/// With `forceBehaviorChange`, rounds are repeated until the effective
/// behavior differs from the program's starting point, up to
/// [`BEHAVIOR_CHANGE_ATTEMPTS`] rounds.
pub fn mutate_program(
    program: &mut Program,
    params: &ProgramParameters,
    rng: &mut RngStream,
) -> Result<bool, MutationError> {
    let original = params.force_behavior_change.then(|| program.clone());
    let mut changed = false;

    for _ in 0..BEHAVIOR_CHANGE_ATTEMPTS {
        if rng.bool_with_prob(params.p_delete) {
            changed |= delete_random_line(program, params, rng)?;
        }
        if rng.bool_with_prob(params.p_add) {
            changed |= insert_random_line(program, params, rng)?;
        }
        if rng.bool_with_prob(params.p_mutate) {
            changed |= alter_random_line(program, rng)?;
        }
        if rng.bool_with_prob(params.p_swap) {
            changed |= swap_random_lines(program, rng)?;
        }
        changed |= mutate_constants(program, params, rng)?;
        program.identify_introns();

        match &original {
            Some(original) if program.has_identical_behavior(original) => continue,
            _ => break,
        }
    }
    Ok(changed)
}

fn random_constant(params: &ProgramParameters, rng: &mut RngStream) -> i32 {
    rng.next_i32(params.min_const_value, params.max_const_value)
}

#[cfg(test)]
mod tests;
