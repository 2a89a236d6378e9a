//! Decision walks.
//!
//! # Algorithm
//!
//! ```text
//! current := root, visited := {root}
//! loop:
//!   bid every outgoing edge of current whose destination is not visited
//!   follow the highest bid
//!   Action  -> return its action id
//!   Team    -> visited += destination, current := destination
//! ```
//!
//! Edges towards an already visited Team are left out of the bidding, so a
//! walk visits each Team at most once and ends within `nb_teams` steps even
//! on cyclic graphs. Edges towards Actions always bid.
//!
//! # Ties and Exhaustion
//!
//! - The first edge, in the Team's outgoing order, holding the strictly
//!   greatest bid wins. NaN bids rank below every number.
//! - A Team whose edges all lead to visited Teams ends the walk with
//!   [`DecisionError::NoTerminationPath`]. The walk never re-enters a Team.
//!   Graphs passing [`crate::Graph::check_invariants`] give every Team an
//!   Action edge, so their walks always end on an Action.

use std::collections::HashSet;
use tracing::trace;

use tangle_foundation::{ActionId, VertexId};
use tangle_vm::{DataSource, ExecutionMode, ProgramExecutionEngine};

use crate::edge::Edge;
use crate::error::{DecisionError, GraphError};
use crate::graph::Graph;
use crate::vertex::Vertex;

/// Outcome of one walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub action: ActionId,
    /// Teams visited, starting with the root.
    pub path: Vec<VertexId>,
}

/// Walks a graph from a root Team to an Action.
///
/// Holds the program engine and the visited set so repeated walks reuse
/// their buffers. One engine per thread.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    engine: ProgramExecutionEngine,
    mode: ExecutionMode,
    visited: HashSet<VertexId>,
}

impl DecisionEngine {
    pub fn new(mode: ExecutionMode) -> Self {
        Self {
            engine: ProgramExecutionEngine::new(),
            mode,
            visited: HashSet::new(),
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Action chosen by the policy rooted at `root` for `sources`.
    pub fn decide(
        &mut self,
        graph: &Graph,
        root: VertexId,
        sources: &[&dyn DataSource],
    ) -> Result<ActionId, DecisionError> {
        self.walk(graph, root, sources).map(|decision| decision.action)
    }

    /// Walk from `root` and report the path taken.
    ///
    /// # Errors
    ///
    /// - [`GraphError`] if `root` is not a Team of `graph`
    /// - [`DecisionError::Execution`] on a strict-mode program fault
    /// - [`DecisionError::NoTerminationPath`] on an exhausted Team
    pub fn walk(
        &mut self,
        graph: &Graph,
        root: VertexId,
        sources: &[&dyn DataSource],
    ) -> Result<Decision, DecisionError> {
        let mut current = root;
        let mut path = vec![root];
        self.visited.clear();
        self.visited.insert(root);

        loop {
            let team = graph
                .vertex(current)
                .ok_or(GraphError::UnknownVertex(current))?
                .as_team()
                .ok_or(GraphError::NotATeam(current))?;

            let mut best: Option<(f64, &Edge)> = None;
            for &id in team.outgoing() {
                let edge = graph.edge(id).ok_or(GraphError::UnknownEdge(id))?;
                if self.visited.contains(&edge.destination()) {
                    continue;
                }
                let bid = self
                    .engine
                    .execute(edge.program(), sources, self.mode)
                    .map_err(|fault| DecisionError::Execution { edge: id, fault })?;
                let bid = if bid.is_nan() { f64::NEG_INFINITY } else { bid };
                if best.map_or(true, |(highest, _)| bid > highest) {
                    best = Some((bid, edge));
                }
            }

            let Some((bid, edge)) = best else {
                return Err(DecisionError::NoTerminationPath {
                    team: current,
                    steps: path.len(),
                });
            };

            let destination = edge.destination();
            match graph
                .vertex(destination)
                .ok_or(GraphError::UnknownVertex(destination))?
            {
                Vertex::Action(action) => {
                    trace!(root = %root, action = %action.action_id(), steps = path.len(), "decision");
                    return Ok(Decision {
                        action: action.action_id(),
                        path,
                    });
                }
                Vertex::Team(_) => {
                    trace!(from = %current, to = %destination, bid, "follow edge");
                    self.visited.insert(destination);
                    path.push(destination);
                    current = destination;
                }
            }
        }
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(ExecutionMode::Strict)
    }
}
