//! Edges: a source Team, a destination vertex and a shared program.

use std::sync::Arc;

use tangle_foundation::VertexId;
use tangle_vm::Program;

/// Directed edge bidding for its destination.
///
/// The program is shared: several edges may hold the same `Arc<Program>`.
/// Editing goes through [`Graph::program_mut`](crate::Graph::program_mut),
/// which copies a shared program before writing.
#[derive(Debug, Clone)]
pub struct Edge {
    pub(crate) source: VertexId,
    pub(crate) destination: VertexId,
    pub(crate) program: Arc<Program>,
}

impl Edge {
    pub fn source(&self) -> VertexId {
        self.source
    }

    pub fn destination(&self) -> VertexId {
        self.destination
    }

    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }
}
