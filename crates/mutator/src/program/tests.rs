use super::*;
use tangle_vm::{InstructionSet, PrimitiveArray};

fn environment(nb_constants: usize) -> Arc<Environment> {
    let input = PrimitiveArray::from_values(vec![0.0; 5]);
    Arc::new(Environment::new(InstructionSet::arithmetic(), &[&input], 4, nb_constants).unwrap())
}

fn params(min: usize, max: usize) -> ProgramParameters {
    ProgramParameters {
        min_program_size: min,
        max_program_size: max,
        ..ProgramParameters::default()
    }
}

#[test]
fn random_program_within_bounds() {
    let env = environment(3);
    let params = params(4, 10);
    let mut rng = RngStream::new(2);
    for _ in 0..100 {
        let program = init_random_program(&env, &params, &mut rng).unwrap();
        assert!((4..=10).contains(&program.len()));
        assert!(program.validate().is_ok());
        assert!(program
            .constants()
            .iter()
            .all(|c| (params.min_const_value..=params.max_const_value).contains(c)));
    }
}

#[test]
fn random_program_has_at_least_one_line() {
    let env = environment(0);
    let params = params(0, 1);
    let mut rng = RngStream::new(9);
    let program = init_random_program(&env, &params, &mut rng).unwrap();
    assert_eq!(program.len(), 1);
}

#[test]
fn delete_respects_minimum() {
    let env = environment(0);
    let params = params(3, 3);
    let mut rng = RngStream::new(4);
    let mut program = init_random_program(&env, &params, &mut rng).unwrap();
    assert!(!delete_random_line(&mut program, &params, &mut rng).unwrap());
    assert_eq!(program.len(), 3);

    let relaxed = self::params(2, 3);
    assert!(delete_random_line(&mut program, &relaxed, &mut rng).unwrap());
    assert_eq!(program.len(), 2);
}

#[test]
fn insert_respects_maximum() {
    let env = environment(0);
    let params = params(2, 2);
    let mut rng = RngStream::new(4);
    let mut program = init_random_program(&env, &params, &mut rng).unwrap();
    assert!(!insert_random_line(&mut program, &params, &mut rng).unwrap());

    let relaxed = self::params(2, 3);
    assert!(insert_random_line(&mut program, &relaxed, &mut rng).unwrap());
    assert_eq!(program.len(), 3);
    assert!(program.validate().is_ok());
}

#[test]
fn swap_needs_two_lines() {
    let env = environment(0);
    let mut rng = RngStream::new(6);
    let mut program = init_random_program(&env, &params(1, 1), &mut rng).unwrap();
    assert!(!swap_random_lines(&mut program, &mut rng).unwrap());

    program
        .insert_line(1, crate::line::init_random_line(&env, &mut rng).unwrap())
        .unwrap();
    let before = program.lines().to_vec();
    assert!(swap_random_lines(&mut program, &mut rng).unwrap());
    assert_eq!(program.lines()[0], before[1]);
    assert_eq!(program.lines()[1], before[0]);
}

#[test]
fn empty_program_operators_are_noops() {
    let env = environment(0);
    let mut rng = RngStream::new(1);
    let mut program = Program::new(Arc::clone(&env));
    assert!(!delete_random_line(&mut program, &params(0, 4), &mut rng).unwrap());
    assert!(!alter_random_line(&mut program, &mut rng).unwrap());
    assert!(!swap_random_lines(&mut program, &mut rng).unwrap());
}

#[test]
fn constants_stay_in_range() {
    let env = environment(4);
    let params = ProgramParameters {
        p_constant_mutation: 1.0,
        min_const_value: -3,
        max_const_value: 3,
        ..ProgramParameters::default()
    };
    let mut rng = RngStream::new(10);
    let mut program = Program::new(Arc::clone(&env));
    for _ in 0..50 {
        mutate_constants(&mut program, &params, &mut rng).unwrap();
        assert!(program.constants().iter().all(|c| (-3..=3).contains(c)));
    }
}

#[test]
fn mutation_keeps_program_valid() {
    let env = environment(2);
    let params = params(1, 12);
    let mut rng = RngStream::new(21);
    let mut program = init_random_program(&env, &params, &mut rng).unwrap();
    for _ in 0..300 {
        mutate_program(&mut program, &params, &mut rng).unwrap();
        assert!((1..=12).contains(&program.len()));
        assert!(program.validate().is_ok());
    }
}

#[test]
fn mutation_is_deterministic() {
    let env = environment(2);
    let params = params(1, 20);
    let mut rng = RngStream::new(77);
    let start = init_random_program(&env, &params, &mut rng).unwrap();

    let run = |seed: u64| {
        let mut program = start.clone();
        let mut rng = RngStream::new(seed);
        for _ in 0..20 {
            mutate_program(&mut program, &params, &mut rng).unwrap();
        }
        (program.lines().to_vec(), program.constants().to_vec())
    };
    assert_eq!(run(5), run(5));
}

#[test]
fn forced_behavior_change() {
    let env = environment(0);
    let params = ProgramParameters {
        force_behavior_change: true,
        ..params(1, 30)
    };
    let mut rng = RngStream::new(13);
    let mut program = init_random_program(&env, &params, &mut rng).unwrap();
    for _ in 0..50 {
        let before = program.clone();
        mutate_program(&mut program, &params, &mut rng).unwrap();
        assert!(!program.has_identical_behavior(&before));
    }
}
