//! Stable hashing utilities.
//!
//! Data sources expose a content fingerprint so that callers can cache
//! results keyed on observations. These helpers provide a stable FNV-1a
//! 64-bit implementation that gives the same value on every platform.
//!
//! NOTE: FNV-1a is **not** cryptographically secure.

/// 64-bit FNV-1a offset basis.
pub const FNV1A_OFFSET_BASIS_64: u64 = 0xcbf29ce484222325;
/// 64-bit FNV-1a prime.
pub const FNV1A_PRIME_64: u64 = 0x0000_0100_0000_01B3;

/// Mix bytes into an existing FNV-1a 64-bit hash state.
///
/// For each byte, XOR it into the hash and multiply by the FNV prime.
/// Start from [`FNV1A_OFFSET_BASIS_64`] for a fresh hash.
///
/// # Example
/// ```
/// use tangle_foundation::stable_hash::{fnv1a64_mix, FNV1A_OFFSET_BASIS_64};
///
/// let hash = fnv1a64_mix(FNV1A_OFFSET_BASIS_64, b"hello");
/// let hash = fnv1a64_mix(hash, b"world");
/// ```
#[inline]
pub const fn fnv1a64_mix(mut hash: u64, bytes: &[u8]) -> u64 {
    let mut i = 0usize;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV1A_PRIME_64);
        i += 1;
    }
    hash
}

/// Hash an arbitrary byte slice with FNV-1a 64-bit.
#[inline]
pub const fn fnv1a64(bytes: &[u8]) -> u64 {
    fnv1a64_mix(FNV1A_OFFSET_BASIS_64, bytes)
}

/// Hash a sequence of `f64` values by their bit patterns.
///
/// `0.0` and `-0.0` hash differently, NaN payloads are preserved.
pub fn fnv1a64_f64s(values: &[f64]) -> u64 {
    values.iter().fold(FNV1A_OFFSET_BASIS_64, |hash, value| {
        fnv1a64_mix(hash, &value.to_bits().to_le_bytes())
    })
}
