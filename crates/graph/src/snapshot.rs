//! Lossless graph snapshots.
//!
//! A snapshot stores vertices and programs by position and edges as index
//! triples. Programs shared between edges are stored once and stay shared
//! after restoration. The environment is not stored: it holds code
//! (instructions) and is supplied again on [`GraphSnapshot::restore`].
//!
//! Encoded with `bincode`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tangle_foundation::ActionId;
use tangle_vm::{Environment, Line, Program};

use crate::error::SnapshotError;
use crate::graph::Graph;
use crate::vertex::Vertex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VertexRecord {
    Team,
    Action(ActionId),
}

/// Edge as indices into the snapshot's vertex and program lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: usize,
    pub destination: usize,
    pub program: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramRecord {
    pub lines: Vec<Line>,
    pub constants: Vec<i32>,
}

/// Serializable image of a [`Graph`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub vertices: Vec<VertexRecord>,
    pub edges: Vec<EdgeRecord>,
    pub programs: Vec<ProgramRecord>,
}

impl GraphSnapshot {
    /// Record the structure and program content of `graph`.
    pub fn capture(graph: &Graph) -> Self {
        let vertices = graph
            .vertices()
            .map(|(_, vertex)| match vertex {
                Vertex::Team(_) => VertexRecord::Team,
                Vertex::Action(action) => VertexRecord::Action(action.action_id()),
            })
            .collect();

        let mut programs = Vec::new();
        let mut program_index: HashMap<*const Program, usize> = HashMap::new();
        let mut edges = Vec::with_capacity(graph.nb_edges());
        for (_, edge) in graph.edges() {
            let program = *program_index
                .entry(Arc::as_ptr(edge.program()))
                .or_insert_with(|| {
                    programs.push(ProgramRecord {
                        lines: edge.program().lines().to_vec(),
                        constants: edge.program().constants().to_vec(),
                    });
                    programs.len() - 1
                });
            // Both endpoints are vertices of the graph.
            let source = graph.vertex_index(edge.source()).unwrap_or(usize::MAX);
            let destination = graph.vertex_index(edge.destination()).unwrap_or(usize::MAX);
            edges.push(EdgeRecord {
                source,
                destination,
                program,
            });
        }

        Self {
            vertices,
            edges,
            programs,
        }
    }

    /// Rebuild a graph bound to `environment`.
    ///
    /// Every program line is validated and introns are recomputed. Vertices
    /// and edges are created in record order.
    pub fn restore(&self, environment: Arc<Environment>) -> Result<Graph, SnapshotError> {
        let programs = self
            .programs
            .iter()
            .enumerate()
            .map(|(index, record)| {
                Program::from_parts(
                    environment.clone(),
                    record.lines.clone(),
                    record.constants.clone(),
                )
                .map(Arc::new)
                .map_err(|error| SnapshotError::Program { index, error })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut graph = Graph::new(environment);
        let ids: Vec<_> = self
            .vertices
            .iter()
            .map(|record| match record {
                VertexRecord::Team => graph.add_team(),
                VertexRecord::Action(action) => graph.add_action(*action),
            })
            .collect();

        for (index, record) in self.edges.iter().enumerate() {
            let vertex = |position: usize| {
                ids.get(position).copied().ok_or(SnapshotError::DanglingVertex {
                    edge: index,
                    vertex: position,
                })
            };
            let source = vertex(record.source)?;
            let destination = vertex(record.destination)?;
            let program = programs
                .get(record.program)
                .ok_or(SnapshotError::DanglingProgram {
                    edge: index,
                    program: record.program,
                })?;
            graph.add_edge(source, destination, Arc::clone(program))?;
        }

        Ok(graph)
    }

    /// Positions of the Team records without incoming edge records.
    pub fn root_indices(&self) -> Vec<usize> {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(index, record)| {
                **record == VertexRecord::Team
                    && !self.edges.iter().any(|edge| edge.destination == *index)
            })
            .map(|(index, _)| index)
            .collect()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        Ok(bincode::deserialize(bytes)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        Self::from_bytes(&std::fs::read(path)?)
    }
}
