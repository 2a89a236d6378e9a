//! Random line generation and alteration.

use tangle_foundation::RngStream;
use tangle_vm::{Environment, Line, Operand, OperandType, Parameter, PARAMETER_BITS};

use crate::error::MutationError;

/// Build a structurally valid random line.
///
/// The instruction is drawn among the usable instructions of `env`, each
/// operand among its compatible sources with a uniform address, the
/// destination among the registers, and parameters over the full
/// [`Parameter`] range.
pub fn init_random_line(env: &Environment, rng: &mut RngStream) -> Result<Line, MutationError> {
    let usable = env.usable_instructions();
    if usable.is_empty() {
        return Err(MutationError::NoCompatibleInstruction);
    }

    let mut line = Line::new(env);
    line.instruction = usable[rng.next_index(usable.len())];
    line.destination = rng.next_index(env.nb_registers());
    let types = operand_types(env, line.instruction);
    for (index, &ty) in types.iter().enumerate() {
        line.operands[index] = random_operand(env, line.instruction, index, ty, rng);
    }
    for parameter in &mut line.parameters {
        *parameter = random_parameter(rng);
    }
    Ok(line)
}

/// Re-roll exactly one field of `line`, keeping it valid.
///
/// The field is chosen with a probability proportional to its width in bits,
/// among the instruction, the destination, the source and the address of
/// each operand of the current instruction, and each of its parameters.
/// The new value always differs from the old one when the field admits
/// another value. Returns `false` when no field has any alternative.
pub fn alter_line(
    env: &Environment,
    line: &mut Line,
    rng: &mut RngStream,
) -> Result<bool, MutationError> {
    if env.usable_instructions().is_empty() {
        return Err(MutationError::NoCompatibleInstruction);
    }

    let types = operand_types(env, line.instruction);
    let nb_parameters = env
        .instruction(line.instruction)
        .map_or(0, |instruction| instruction.nb_parameters())
        .min(line.parameters.len());

    let mut fields = vec![Field::Instruction, Field::Destination];
    let mut weights = vec![env.instruction_bits() as u64, env.destination_bits() as u64];
    for index in 0..types.len() {
        fields.push(Field::Source(index));
        weights.push(env.source_bits() as u64);
        fields.push(Field::Address(index));
        weights.push(env.address_bits() as u64);
    }
    for index in 0..nb_parameters {
        fields.push(Field::Parameter(index));
        weights.push(PARAMETER_BITS as u64);
    }
    if weights.iter().all(|&weight| weight == 0) {
        return Ok(false);
    }

    let field = fields[rng.weighted_choice(&weights)];
    Ok(match field {
        Field::Instruction => alter_instruction(env, line, rng),
        Field::Destination => {
            let previous = line.destination;
            line.destination = pick_other(rng, env.nb_registers(), previous);
            line.destination != previous
        }
        Field::Source(index) => alter_source(env, line, index, types[index], rng),
        Field::Address(index) => {
            let operand = &mut line.operands[index];
            let space = env.address_space(operand.source, types[index]);
            let previous = operand.address;
            operand.address = pick_other(rng, space, previous);
            operand.address != previous
        }
        Field::Parameter(index) => {
            let previous = line.parameters[index];
            let raw = pick_other(rng, 1 << PARAMETER_BITS, previous as u16 as usize);
            line.parameters[index] = raw as u16 as Parameter;
            line.parameters[index] != previous
        }
    })
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Instruction,
    Destination,
    Source(usize),
    Address(usize),
    Parameter(usize),
}

fn operand_types(env: &Environment, instruction: usize) -> Vec<OperandType> {
    env.instruction(instruction)
        .map(|instruction| instruction.operand_types().to_vec())
        .unwrap_or_default()
}

fn random_operand(
    env: &Environment,
    instruction: usize,
    index: usize,
    ty: OperandType,
    rng: &mut RngStream,
) -> Operand {
    let sources = env.compatible_sources(instruction, index);
    let source = sources[rng.next_index(sources.len())];
    let address = rng.next_index(env.address_space(source, ty));
    Operand::new(source, address)
}

fn random_parameter(rng: &mut RngStream) -> Parameter {
    rng.next_unsigned_int(0, u64::from(u16::MAX)) as u16 as Parameter
}

/// Switch to another usable instruction, re-deriving the operands the new
/// instruction cannot read as they are.
fn alter_instruction(env: &Environment, line: &mut Line, rng: &mut RngStream) -> bool {
    let usable = env.usable_instructions();
    let previous = line.instruction;
    line.instruction = pick_other_in(rng, usable, previous);
    if line.instruction == previous {
        return false;
    }

    let types = operand_types(env, line.instruction);
    for (index, &ty) in types.iter().enumerate() {
        let operand = line.operands[index];
        let compatible = env
            .compatible_sources(line.instruction, index)
            .contains(&operand.source)
            && operand.address < env.address_space(operand.source, ty);
        if !compatible {
            line.operands[index] = random_operand(env, line.instruction, index, ty, rng);
        }
    }
    true
}

/// Move one operand to another compatible source, re-rolling its address
/// if it falls outside the new source.
fn alter_source(
    env: &Environment,
    line: &mut Line,
    index: usize,
    ty: OperandType,
    rng: &mut RngStream,
) -> bool {
    let sources = env.compatible_sources(line.instruction, index);
    let operand = &mut line.operands[index];
    let previous = operand.source;
    operand.source = pick_other_in(rng, sources, previous);
    if operand.source == previous {
        return false;
    }
    let space = env.address_space(operand.source, ty);
    if operand.address >= space {
        operand.address = rng.next_index(space);
    }
    true
}

/// A value of `0..len` other than `current`, or `current` when `len <= 1`.
fn pick_other(rng: &mut RngStream, len: usize, current: usize) -> usize {
    if len <= 1 {
        return current;
    }
    if current >= len {
        return rng.next_index(len);
    }
    let drawn = rng.next_index(len - 1);
    if drawn >= current {
        drawn + 1
    } else {
        drawn
    }
}

/// An element of `choices` other than `current`, or `current` when no other
/// exists.
fn pick_other_in(rng: &mut RngStream, choices: &[usize], current: usize) -> usize {
    match choices.iter().position(|&choice| choice == current) {
        Some(position) => choices
            .get(pick_other(rng, choices.len(), position))
            .copied()
            .unwrap_or(current),
        None if choices.is_empty() => current,
        None => choices[rng.next_index(choices.len())],
    }
}
