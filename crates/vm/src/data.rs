//! Data sources readable by program lines.
//!
//! A data source is addressed per operand type: a scalar operand reads one
//! cell, a vector operand of width `w` reads `w` contiguous cells starting at
//! its address. The register file and the constant buffer are
//! [`PrimitiveArray`]s exposed through the same contract as external
//! observations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

use tangle_foundation::stable_hash::fnv1a64_f64s;

/// Shape of a value consumed by an instruction operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperandType {
    /// A single `f64`.
    Scalar,
    /// `width` contiguous `f64` values.
    Vector(usize),
}

impl OperandType {
    /// Number of cells read by one operand of this type.
    pub fn width(self) -> usize {
        match self {
            OperandType::Scalar => 1,
            OperandType::Vector(width) => width,
        }
    }
}

impl fmt::Display for OperandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandType::Scalar => write!(f, "scalar"),
            OperandType::Vector(width) => write!(f, "vector[{}]", width),
        }
    }
}

/// A value fetched for one operand.
#[derive(Debug, Clone, PartialEq)]
pub enum OperandValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl OperandValue {
    /// All components of the value.
    pub fn as_slice(&self) -> &[f64] {
        match self {
            OperandValue::Scalar(value) => std::slice::from_ref(value),
            OperandValue::Vector(values) => values,
        }
    }

    /// The scalar value, or the first component of a vector (0.0 if empty).
    pub fn value(&self) -> f64 {
        self.as_slice().first().copied().unwrap_or(0.0)
    }
}

/// Capability contract for anything a line can read from.
///
/// Implementations must be immutable for the duration of an evaluation:
/// many decision walks read the same source concurrently.
pub trait DataSource: Send + Sync + fmt::Debug {
    /// Number of valid addresses for operands of type `ty` (0 if unsupported).
    fn address_space(&self, ty: OperandType) -> usize;

    /// Largest address space over every operand type this source supports.
    fn largest_address_space(&self) -> usize;

    /// Read one operand; `None` when the address or type is not supported.
    fn read(&self, ty: OperandType, address: usize) -> Option<OperandValue>;

    /// Stable hash of the current content.
    fn fingerprint(&self) -> u64;

    /// Underlying cells touched by an operand of type `ty` at `address`.
    fn accessed_addresses(&self, ty: OperandType, address: usize) -> Range<usize> {
        address..address + ty.width()
    }
}

/// Address space of a flat array of `len` cells for operands of type `ty`.
///
/// Scalars can start anywhere; a vector of width `w` can start at any of the
/// `len - w + 1` positions where it fits. Zero-width vectors are unsupported.
pub fn array_address_space(len: usize, ty: OperandType) -> usize {
    match ty {
        OperandType::Scalar => len,
        OperandType::Vector(width) if width > 0 && width <= len => len - width + 1,
        OperandType::Vector(_) => 0,
    }
}

/// A flat array of `f64` cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveArray {
    values: Vec<f64>,
}

impl PrimitiveArray {
    /// A zero-filled array of `len` cells.
    pub fn new(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
        }
    }

    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Overwrite one cell, returning the previous value.
    pub fn set(&mut self, index: usize, value: f64) -> Option<f64> {
        self.values
            .get_mut(index)
            .map(|cell| std::mem::replace(cell, value))
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Resize to `len` cells and set every cell to `value`.
    pub fn fill(&mut self, len: usize, value: f64) {
        self.values.clear();
        self.values.resize(len, value);
    }
}

impl From<Vec<f64>> for PrimitiveArray {
    fn from(values: Vec<f64>) -> Self {
        Self::from_values(values)
    }
}

impl DataSource for PrimitiveArray {
    fn address_space(&self, ty: OperandType) -> usize {
        array_address_space(self.values.len(), ty)
    }

    fn largest_address_space(&self) -> usize {
        self.values.len()
    }

    fn read(&self, ty: OperandType, address: usize) -> Option<OperandValue> {
        if address >= self.address_space(ty) {
            return None;
        }
        match ty {
            OperandType::Scalar => self.get(address).map(OperandValue::Scalar),
            OperandType::Vector(width) => self
                .values
                .get(address..address + width)
                .map(|cells| OperandValue::Vector(cells.to_vec())),
        }
    }

    fn fingerprint(&self) -> u64 {
        fnv1a64_f64s(&self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_space_per_type() {
        assert_eq!(array_address_space(8, OperandType::Scalar), 8);
        assert_eq!(array_address_space(8, OperandType::Vector(2)), 7);
        assert_eq!(array_address_space(8, OperandType::Vector(8)), 1);
        assert_eq!(array_address_space(8, OperandType::Vector(9)), 0);
        assert_eq!(array_address_space(8, OperandType::Vector(0)), 0);
        assert_eq!(array_address_space(0, OperandType::Scalar), 0);
    }

    #[test]
    fn test_read_scalar_and_vector() {
        let array = PrimitiveArray::from_values(vec![1.0, 2.0, 3.0]);

        assert_eq!(
            array.read(OperandType::Scalar, 2),
            Some(OperandValue::Scalar(3.0))
        );
        assert_eq!(array.read(OperandType::Scalar, 3), None);
        assert_eq!(
            array.read(OperandType::Vector(2), 1),
            Some(OperandValue::Vector(vec![2.0, 3.0]))
        );
        assert_eq!(array.read(OperandType::Vector(2), 2), None);
        assert_eq!(
            array.accessed_addresses(OperandType::Vector(2), 1),
            1..3
        );
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let mut array = PrimitiveArray::new(4);
        let empty = array.fingerprint();
        assert_eq!(array.set(1, 0.5), Some(0.0));
        assert_ne!(array.fingerprint(), empty);
        assert_eq!(array.set(4, 1.0), None);

        array.fill(4, 0.0);
        assert_eq!(array.fingerprint(), empty);
    }

    #[test]
    fn test_operand_value_accessors() {
        assert_eq!(OperandValue::Scalar(2.5).value(), 2.5);
        assert_eq!(OperandValue::Vector(vec![4.0, 1.0]).value(), 4.0);
        assert_eq!(OperandValue::Vector(vec![]).value(), 0.0);
        assert_eq!(OperandValue::Scalar(1.0).as_slice(), &[1.0]);
    }
}
