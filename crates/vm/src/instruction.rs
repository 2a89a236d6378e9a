//! Instruction catalogue.
//!
//! An [`Instruction`] declares the shape of each operand it consumes and the
//! number of raw parameters it reads from a line, and turns fetched values
//! into one scalar. Instructions are referenced by their position in the
//! [`InstructionSet`], so the set is append-only once programs exist.
//!
//! Two implementations cover most needs:
//!
//! - [`KernelInstruction`] wraps a plain function pointer ([`KernelFn`])
//! - [`LambdaInstruction`] wraps a shared closure
//!
//! The [`builtins`] module provides the arithmetic kernels.

use std::fmt;
use std::sync::Arc;

use crate::data::{OperandType, OperandValue};

/// Raw parameter bits carried by a line.
pub type Parameter = i16;

/// Width in bits of one [`Parameter`].
pub const PARAMETER_BITS: usize = 16;

/// Signature of a kernel backing a [`KernelInstruction`].
///
/// Operands are fetched with the declared types, in declaration order.
pub type KernelFn = fn(&[OperandValue], &[Parameter]) -> f64;

/// An operation callable from a program line.
pub trait Instruction: Send + Sync + fmt::Debug {
    /// Human-readable name used in reports.
    fn name(&self) -> &str;

    /// Type of each operand, in order.
    fn operand_types(&self) -> &[OperandType];

    /// Number of raw parameters read from the line.
    fn nb_parameters(&self) -> usize {
        0
    }

    /// Compute the result from operands matching [`Instruction::operand_types`].
    fn execute(&self, operands: &[OperandValue], parameters: &[Parameter]) -> f64;
}

/// Instruction backed by a function pointer.
#[derive(Debug, Clone)]
pub struct KernelInstruction {
    name: String,
    operand_types: Vec<OperandType>,
    nb_parameters: usize,
    kernel: KernelFn,
}

impl KernelInstruction {
    pub fn new(name: impl Into<String>, operand_types: Vec<OperandType>, kernel: KernelFn) -> Self {
        Self {
            name: name.into(),
            operand_types,
            nb_parameters: 0,
            kernel,
        }
    }

    /// Declare how many raw parameters the kernel reads.
    pub fn with_parameters(mut self, nb_parameters: usize) -> Self {
        self.nb_parameters = nb_parameters;
        self
    }
}

impl Instruction for KernelInstruction {
    fn name(&self) -> &str {
        &self.name
    }

    fn operand_types(&self) -> &[OperandType] {
        &self.operand_types
    }

    fn nb_parameters(&self) -> usize {
        self.nb_parameters
    }

    fn execute(&self, operands: &[OperandValue], parameters: &[Parameter]) -> f64 {
        (self.kernel)(operands, parameters)
    }
}

type LambdaFn = dyn Fn(&[OperandValue], &[Parameter]) -> f64 + Send + Sync;

/// Instruction backed by a closure, for kernels that capture state.
#[derive(Clone)]
pub struct LambdaInstruction {
    name: String,
    operand_types: Vec<OperandType>,
    nb_parameters: usize,
    function: Arc<LambdaFn>,
}

impl LambdaInstruction {
    pub fn new<F>(name: impl Into<String>, operand_types: Vec<OperandType>, function: F) -> Self
    where
        F: Fn(&[OperandValue], &[Parameter]) -> f64 + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            operand_types,
            nb_parameters: 0,
            function: Arc::new(function),
        }
    }

    pub fn with_parameters(mut self, nb_parameters: usize) -> Self {
        self.nb_parameters = nb_parameters;
        self
    }
}

impl fmt::Debug for LambdaInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LambdaInstruction")
            .field("name", &self.name)
            .field("operand_types", &self.operand_types)
            .field("nb_parameters", &self.nb_parameters)
            .finish_non_exhaustive()
    }
}

impl Instruction for LambdaInstruction {
    fn name(&self) -> &str {
        &self.name
    }

    fn operand_types(&self) -> &[OperandType] {
        &self.operand_types
    }

    fn nb_parameters(&self) -> usize {
        self.nb_parameters
    }

    fn execute(&self, operands: &[OperandValue], parameters: &[Parameter]) -> f64 {
        (self.function)(operands, parameters)
    }
}

/// Ordered catalogue of instructions, indexed by position.
#[derive(Debug, Default)]
pub struct InstructionSet {
    instructions: Vec<Box<dyn Instruction>>,
}

impl InstructionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The scalar arithmetic built-ins: add, sub, mul, div, max, min.
    pub fn arithmetic() -> Self {
        Self::new()
            .with(builtins::add())
            .with(builtins::sub())
            .with(builtins::mul())
            .with(builtins::div())
            .with(builtins::max())
            .with(builtins::min())
    }

    /// Append an instruction and return its index.
    pub fn add(&mut self, instruction: impl Instruction + 'static) -> usize {
        self.instructions.push(Box::new(instruction));
        self.instructions.len() - 1
    }

    /// Builder form of [`InstructionSet::add`].
    pub fn with(mut self, instruction: impl Instruction + 'static) -> Self {
        self.add(instruction);
        self
    }

    pub fn get(&self, index: usize) -> Option<&dyn Instruction> {
        self.instructions.get(index).map(|instruction| instruction.as_ref())
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Instruction> {
        self.instructions.iter().map(|instruction| instruction.as_ref())
    }

    /// Largest operand count over the set.
    pub fn max_nb_operands(&self) -> usize {
        self.iter()
            .map(|instruction| instruction.operand_types().len())
            .max()
            .unwrap_or(0)
    }

    /// Largest parameter count over the set.
    pub fn max_nb_parameters(&self) -> usize {
        self.iter()
            .map(|instruction| instruction.nb_parameters())
            .max()
            .unwrap_or(0)
    }
}

/// Built-in kernels.
pub mod builtins {
    use super::*;

    const SCALAR_PAIR: [OperandType; 2] = [OperandType::Scalar, OperandType::Scalar];

    fn binary(name: &str, kernel: KernelFn) -> KernelInstruction {
        KernelInstruction::new(name, SCALAR_PAIR.to_vec(), kernel)
    }

    pub fn add() -> KernelInstruction {
        binary("add", |ops, _| ops[0].value() + ops[1].value())
    }

    pub fn sub() -> KernelInstruction {
        binary("sub", |ops, _| ops[0].value() - ops[1].value())
    }

    pub fn mul() -> KernelInstruction {
        binary("mul", |ops, _| ops[0].value() * ops[1].value())
    }

    /// Protected division: a zero divisor yields the smallest positive `f64`.
    pub fn div() -> KernelInstruction {
        binary("div", |ops, _| {
            let divisor = ops[1].value();
            if divisor == 0.0 {
                f64::MIN_POSITIVE
            } else {
                ops[0].value() / divisor
            }
        })
    }

    pub fn max() -> KernelInstruction {
        binary("max", |ops, _| ops[0].value().max(ops[1].value()))
    }

    pub fn min() -> KernelInstruction {
        binary("min", |ops, _| ops[0].value().min(ops[1].value()))
    }

    /// Scalar operand times the line's first parameter.
    pub fn mult_by_param() -> KernelInstruction {
        KernelInstruction::new("mult_by_param", vec![OperandType::Scalar], |ops, params| {
            ops[0].value() * f64::from(params[0])
        })
        .with_parameters(1)
    }

    /// Dot product of two vectors of `width` cells.
    pub fn dot(width: usize) -> KernelInstruction {
        KernelInstruction::new(
            format!("dot{}", width),
            vec![OperandType::Vector(width); 2],
            |ops, _| {
                ops[0]
                    .as_slice()
                    .iter()
                    .zip(ops[1].as_slice())
                    .map(|(a, b)| a * b)
                    .sum()
            },
        )
    }

    /// Mean of a vector of `width` cells.
    pub fn mean(width: usize) -> KernelInstruction {
        KernelInstruction::new(
            format!("mean{}", width),
            vec![OperandType::Vector(width)],
            |ops, _| {
                let cells = ops[0].as_slice();
                if cells.is_empty() {
                    0.0
                } else {
                    cells.iter().sum::<f64>() / cells.len() as f64
                }
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalars(values: &[f64]) -> Vec<OperandValue> {
        values.iter().copied().map(OperandValue::Scalar).collect()
    }

    #[test]
    fn test_arithmetic_builtins() {
        let ops = scalars(&[6.0, 3.0]);
        assert_eq!(builtins::add().execute(&ops, &[]), 9.0);
        assert_eq!(builtins::sub().execute(&ops, &[]), 3.0);
        assert_eq!(builtins::mul().execute(&ops, &[]), 18.0);
        assert_eq!(builtins::div().execute(&ops, &[]), 2.0);
        assert_eq!(builtins::max().execute(&ops, &[]), 6.0);
        assert_eq!(builtins::min().execute(&ops, &[]), 3.0);
    }

    #[test]
    fn test_protected_division() {
        let ops = scalars(&[1.0, 0.0]);
        assert_eq!(builtins::div().execute(&ops, &[]), f64::MIN_POSITIVE);
    }

    #[test]
    fn test_parameter_and_vector_builtins() {
        let instruction = builtins::mult_by_param();
        assert_eq!(instruction.nb_parameters(), 1);
        assert_eq!(instruction.execute(&scalars(&[1.5]), &[-4]), -6.0);

        let a = OperandValue::Vector(vec![1.0, 2.0]);
        let b = OperandValue::Vector(vec![3.0, 4.0]);
        let dot = builtins::dot(2);
        assert_eq!(dot.operand_types(), &[OperandType::Vector(2); 2]);
        assert_eq!(dot.execute(&[a.clone(), b], &[]), 11.0);
        assert_eq!(builtins::mean(2).execute(&[a], &[]), 1.5);
    }

    #[test]
    fn test_lambda_instruction_captures_state() {
        let offset = 10.0;
        let instruction = LambdaInstruction::new("offset", vec![OperandType::Scalar], move |ops, _| {
            ops[0].value() + offset
        });
        assert_eq!(instruction.name(), "offset");
        assert_eq!(instruction.execute(&scalars(&[1.0]), &[]), 11.0);
        assert!(format!("{:?}", instruction).contains("offset"));
    }

    #[test]
    fn test_instruction_set_catalogue() {
        let mut set = InstructionSet::arithmetic();
        assert_eq!(set.len(), 6);
        assert_eq!(set.max_nb_operands(), 2);
        assert_eq!(set.max_nb_parameters(), 0);

        let index = set.add(builtins::mult_by_param());
        assert_eq!(index, 6);
        assert_eq!(set.max_nb_parameters(), 1);
        assert_eq!(set.get(0).map(|i| i.name()), Some("add"));
        assert!(set.get(7).is_none());
        assert_eq!(InstructionSet::new().max_nb_operands(), 0);
    }
}
