//! Tangle Foundation
//!
//! Core primitives shared by every tangle crate: a reproducible random
//! stream, stable FNV-1a hashing for data fingerprints, and the typed
//! identifiers used by the decision graph.

pub mod ids;
pub mod rng;
pub mod stable_hash;

// Re-export ID types at crate root
pub use ids::{ActionId, EdgeId, VertexId};

pub use rng::RngStream;

// Re-export stable hash items at crate root
pub use stable_hash::{fnv1a64, fnv1a64_mix, FNV1A_OFFSET_BASIS_64, FNV1A_PRIME_64};
