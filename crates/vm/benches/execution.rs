//! Program execution throughput.
//!
//! Measures:
//! - Cost per line as program length grows
//! - Gain from skipping intron lines

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use tangle_foundation::RngStream;
use tangle_vm::{
    Environment, ExecutionMode, InstructionSet, Operand, PrimitiveArray, Program,
    ProgramExecutionEngine,
};

const NB_REGISTERS: usize = 8;
const NB_INPUTS: usize = 64;

fn observations() -> PrimitiveArray {
    PrimitiveArray::from_values((0..NB_INPUTS).map(|i| i as f64 * 0.25 - 4.0).collect())
}

/// Random scalar program; every operand reads a register or an input.
fn random_program(env: &Arc<Environment>, len: usize, seed: u64) -> Program {
    let mut rng = RngStream::new(seed);
    let mut program = Program::new(env.clone());
    let nb_instructions = env.instructions().len();
    for _ in 0..len {
        let line = program.add_new_line();
        line.instruction = rng.next_index(nb_instructions);
        line.destination = rng.next_index(NB_REGISTERS);
        for operand in line.operands.iter_mut() {
            let source = rng.next_index(2);
            let space = if source == 0 { NB_REGISTERS } else { NB_INPUTS };
            *operand = Operand::new(source, rng.next_index(space));
        }
    }
    program.identify_introns();
    program
}

fn bench_program_length(c: &mut Criterion) {
    let mut group = c.benchmark_group("program_length");
    let input = observations();
    let env = Arc::new(
        Environment::new(InstructionSet::arithmetic(), &[&input], NB_REGISTERS, 0)
            .expect("benchmark environment"),
    );

    for len in [8, 32, 96] {
        let program = random_program(&env, len, 0xC0FFEE);
        let mut engine = ProgramExecutionEngine::new().with_intron_skipping(false);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &program, |b, program| {
            b.iter(|| {
                engine
                    .execute(black_box(program), &[&input], ExecutionMode::Strict)
                    .expect("valid program")
            })
        });
    }

    group.finish();
}

fn bench_intron_skipping(c: &mut Criterion) {
    let mut group = c.benchmark_group("intron_skipping");
    let input = observations();
    let env = Arc::new(
        Environment::new(InstructionSet::arithmetic(), &[&input], NB_REGISTERS, 0)
            .expect("benchmark environment"),
    );
    let program = random_program(&env, 96, 7);

    for skip in [false, true] {
        let mut engine = ProgramExecutionEngine::new().with_intron_skipping(skip);
        group.bench_with_input(BenchmarkId::from_parameter(skip), &program, |b, program| {
            b.iter(|| {
                engine
                    .execute(black_box(program), &[&input], ExecutionMode::Strict)
                    .expect("valid program")
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_program_length, bench_intron_skipping);
criterion_main!(benches);
