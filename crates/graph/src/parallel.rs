//! Parallel decision walks.
//!
//! Walks only read the graph, so any number of them can run at once. Each
//! rayon worker owns a private [`DecisionEngine`] (register file and visited
//! set); the graph, programs and observations are shared read-only. Results
//! come back in input order.

use rayon::prelude::*;

use tangle_foundation::{ActionId, VertexId};
use tangle_vm::{DataSource, ExecutionMode};

use crate::decide::DecisionEngine;
use crate::error::DecisionError;
use crate::graph::Graph;

/// One decision per root against the same observations.
pub fn decide_all(
    graph: &Graph,
    roots: &[VertexId],
    sources: &[&dyn DataSource],
    mode: ExecutionMode,
) -> Vec<Result<ActionId, DecisionError>> {
    roots
        .par_iter()
        .map_init(
            || DecisionEngine::new(mode),
            |engine, &root| engine.decide(graph, root, sources),
        )
        .collect()
}

/// One decision per observation snapshot from the same root.
pub fn decide_snapshots(
    graph: &Graph,
    root: VertexId,
    snapshots: &[Vec<&dyn DataSource>],
    mode: ExecutionMode,
) -> Vec<Result<ActionId, DecisionError>> {
    snapshots
        .par_iter()
        .map_init(
            || DecisionEngine::new(mode),
            |engine, sources| engine.decide(graph, root, sources),
        )
        .collect()
}
