//! Typed identifiers for the decision graph.
//!
//! Vertices and edges are addressed by opaque, monotonically allocated
//! numbers; a removed identifier is never reused by the same graph.
//! Action identifiers are chosen by the caller and carried verbatim to
//! the output of a decision.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            /// Creates an identifier from its raw value.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Returns the raw value.
            pub const fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

define_id!(
    /// Identifier of a Team or Action vertex within one graph
    VertexId,
    "v"
);

define_id!(
    /// Identifier of an edge within one graph
    EdgeId,
    "e"
);

define_id!(
    /// Opaque action identifier returned by a decision
    ActionId,
    "a"
);
