//! Tangle Mutator - seeded evolution of decision graphs
//!
//! Every operator draws from an explicit [`RngStream`] handle, so a seed and
//! a sequence of calls reproduce the same graph bit for bit.
//!
//! - [`line`]: random line generation and single-field alteration
//! - [`program`]: line insertion, deletion, swap, alteration and constants
//! - [`graph`]: edge addition, deletion, rewiring, graph initialisation and
//!   root population
//!
//! Operators that cannot proceed without breaking a graph invariant do
//! nothing and report it (`Ok(None)` / `Ok(false)`); only configuration
//! problems are errors.
//!
//! [`RngStream`]: tangle_foundation::RngStream

pub mod config;
pub mod error;
pub mod graph;
pub mod line;
pub mod params;
pub mod program;

pub use config::{Parameters, ParametersError};
pub use error::{MutationError, ParameterError};
pub use graph::{GraphMutator, MutationReport, NEW_TEAMS_PER_PASS, POPULATE_ATTEMPTS_PER_ROOT};
pub use params::{GraphParameters, MutationParameters, ProgramParameters};
