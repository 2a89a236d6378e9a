//! Tangle Graph - bipartite decision graphs
//!
//! A [`Graph`] holds Team and Action vertices joined by edges. Each edge
//! carries a shared [`Program`](tangle_vm::Program) that computes a bid.
//! A decision starts at a root Team, lets every eligible outgoing edge bid,
//! follows the highest bid and stops at the first Action reached.
//!
//! Cycles between Teams are allowed. A walk never re-enters a Team it has
//! already visited, so it takes at most one step per Team.

pub mod decide;
pub mod edge;
pub mod error;
pub mod evaluate;
pub mod graph;
pub mod parallel;
pub mod snapshot;
pub mod stats;
pub mod vertex;

pub use decide::{Decision, DecisionEngine};
pub use edge::Edge;
pub use error::{DecisionError, GraphError, InvariantViolation, SnapshotError};
pub use evaluate::{evaluate_policy, EvaluationParameters, EvaluationResult, LearningEnvironment};
pub use graph::{CleanupReport, Graph};
pub use parallel::{decide_all, decide_snapshots};
pub use snapshot::{EdgeRecord, GraphSnapshot, ProgramRecord, VertexRecord};
pub use stats::PolicyStats;
pub use vertex::{Action, Team, Vertex};
