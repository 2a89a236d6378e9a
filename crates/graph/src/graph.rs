//! The decision graph.
//!
//! # Ownership
//!
//! The graph owns every vertex and edge; edges share programs through
//! `Arc<Program>`. A program is released when the last edge holding it is
//! removed or given another program.
//!
//! # Roots
//!
//! Roots are the Teams without incoming edges. The set is maintained on
//! every structural edit rather than recomputed. Its order is deterministic
//! for a given edit sequence but otherwise unspecified.
//!
//! # Invariants
//!
//! Outside a mutation, [`Graph::check_invariants`] holds:
//! 1. every Team has at least one outgoing edge
//! 2. every Team has at least one edge towards an Action, so a decision
//!    walk always terminates
//! 3. no edge points at its own source
//! 4. every program is valid for the graph's environment
//! 5. no vertex is orphaned
//! 6. the root set is exactly the Teams without incoming edges
//!
//! Edits only enforce what cannot be repaired later (no self loops, edges
//! start at Teams, one environment). Invariants 1, 2 and 5 are the caller's
//! responsibility between edits; [`Graph::cleanup`] restores 5.

use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use tangle_foundation::{ActionId, EdgeId, VertexId};
use tangle_vm::{Environment, Program};

use crate::edge::Edge;
use crate::error::{GraphError, InvariantViolation};
use crate::vertex::{Action, Team, Vertex};

/// Vertices removed by [`Graph::cleanup`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed_vertices: Vec<VertexId>,
}

/// Bipartite Team/Action graph whose edges carry bid programs.
#[derive(Debug, Clone)]
pub struct Graph {
    environment: Arc<Environment>,
    vertices: IndexMap<VertexId, Vertex>,
    edges: IndexMap<EdgeId, Edge>,
    roots: IndexSet<VertexId>,
    next_vertex: u64,
    next_edge: u64,
}

impl Graph {
    pub fn new(environment: Arc<Environment>) -> Self {
        Self {
            environment,
            vertices: IndexMap::new(),
            edges: IndexMap::new(),
            roots: IndexSet::new(),
            next_vertex: 0,
            next_edge: 0,
        }
    }

    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    pub fn nb_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn nb_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn nb_teams(&self) -> usize {
        self.vertices.values().filter(|v| v.is_team()).count()
    }

    pub fn nb_actions(&self) -> usize {
        self.vertices.values().filter(|v| v.is_action()).count()
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// Position of a vertex in insertion order.
    pub fn vertex_index(&self, id: VertexId) -> Option<usize> {
        self.vertices.get_index_of(&id)
    }

    /// All vertices in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &Vertex)> {
        self.vertices.iter().map(|(id, vertex)| (*id, vertex))
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges.iter().map(|(id, edge)| (*id, edge))
    }

    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.keys().copied()
    }

    pub fn teams(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices
            .iter()
            .filter(|(_, vertex)| vertex.is_team())
            .map(|(id, _)| *id)
    }

    /// Action vertices with their action identifiers.
    pub fn actions(&self) -> impl Iterator<Item = (VertexId, ActionId)> + '_ {
        self.vertices
            .iter()
            .filter_map(|(id, vertex)| vertex.action_id().map(|action| (*id, action)))
    }

    /// First Action vertex carrying `action_id`.
    pub fn action_vertex(&self, action_id: ActionId) -> Option<VertexId> {
        self.actions()
            .find(|(_, action)| *action == action_id)
            .map(|(id, _)| id)
    }

    /// Teams without incoming edges, in the order they became roots.
    pub fn roots(&self) -> &IndexSet<VertexId> {
        &self.roots
    }

    pub fn is_root(&self, id: VertexId) -> bool {
        self.roots.contains(&id)
    }

    fn team(&self, id: VertexId) -> Result<&Team, GraphError> {
        self.vertices
            .get(&id)
            .ok_or(GraphError::UnknownVertex(id))?
            .as_team()
            .ok_or(GraphError::NotATeam(id))
    }

    fn team_mut(&mut self, id: VertexId) -> Result<&mut Team, GraphError> {
        match self.vertices.get_mut(&id) {
            Some(Vertex::Team(team)) => Ok(team),
            Some(Vertex::Action(_)) => Err(GraphError::NotATeam(id)),
            None => Err(GraphError::UnknownVertex(id)),
        }
    }

    fn allocate_vertex(&mut self) -> VertexId {
        let id = VertexId::new(self.next_vertex);
        self.next_vertex += 1;
        id
    }

    /// Add an edgeless Team. It is a root until something points at it.
    pub fn add_team(&mut self) -> VertexId {
        let id = self.allocate_vertex();
        self.vertices.insert(id, Vertex::Team(Team::default()));
        self.roots.insert(id);
        id
    }

    pub fn add_action(&mut self, action_id: ActionId) -> VertexId {
        let id = self.allocate_vertex();
        self.vertices.insert(
            id,
            Vertex::Action(Action {
                action_id,
                incoming: IndexSet::new(),
            }),
        );
        id
    }

    /// Connect `source` to `destination` with `program`.
    ///
    /// # Errors
    ///
    /// Unknown endpoints, a non-Team source, a self loop, or a program bound
    /// to another environment.
    pub fn add_edge(
        &mut self,
        source: VertexId,
        destination: VertexId,
        program: Arc<Program>,
    ) -> Result<EdgeId, GraphError> {
        self.team(source)?;
        if !self.vertices.contains_key(&destination) {
            return Err(GraphError::UnknownVertex(destination));
        }
        if source == destination {
            return Err(GraphError::SelfLoop(source));
        }
        self.check_environment(&program)?;

        let id = EdgeId::new(self.next_edge);
        self.next_edge += 1;
        self.edges.insert(
            id,
            Edge {
                source,
                destination,
                program,
            },
        );
        self.team_mut(source)?.outgoing.insert(id);
        self.attach_incoming(destination, id);
        Ok(id)
    }

    /// Remove an edge, releasing its program reference.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<Edge, GraphError> {
        let edge = self
            .edges
            .shift_remove(&id)
            .ok_or(GraphError::UnknownEdge(id))?;
        if let Ok(team) = self.team_mut(edge.source) {
            team.outgoing.shift_remove(&id);
        }
        self.detach_incoming(edge.destination, id);
        Ok(edge)
    }

    /// Point an edge at another vertex. Returns the previous destination.
    pub fn set_destination(
        &mut self,
        id: EdgeId,
        destination: VertexId,
    ) -> Result<VertexId, GraphError> {
        let source = self.edges.get(&id).ok_or(GraphError::UnknownEdge(id))?.source;
        if !self.vertices.contains_key(&destination) {
            return Err(GraphError::UnknownVertex(destination));
        }
        if source == destination {
            return Err(GraphError::SelfLoop(source));
        }

        let edge = self.edges.get_mut(&id).ok_or(GraphError::UnknownEdge(id))?;
        let previous = std::mem::replace(&mut edge.destination, destination);
        self.detach_incoming(previous, id);
        self.attach_incoming(destination, id);
        Ok(previous)
    }

    /// Remove a vertex and every edge touching it.
    pub fn remove_vertex(&mut self, id: VertexId) -> Result<Vertex, GraphError> {
        let vertex = self.vertices.get(&id).ok_or(GraphError::UnknownVertex(id))?;
        let touching: Vec<EdgeId> = vertex
            .outgoing()
            .chain(vertex.incoming().iter().copied())
            .collect();
        for edge in touching {
            self.remove_edge(edge)?;
        }
        self.roots.swap_remove(&id);
        self.vertices
            .shift_remove(&id)
            .ok_or(GraphError::UnknownVertex(id))
    }

    /// Add a root Team whose edges copy the destinations of `team`'s edges
    /// and share their programs.
    pub fn clone_team(&mut self, team: VertexId) -> Result<VertexId, GraphError> {
        let outgoing: Vec<(VertexId, Arc<Program>)> = self
            .team(team)?
            .outgoing
            .iter()
            .filter_map(|edge| self.edges.get(edge))
            .map(|edge| (edge.destination, Arc::clone(&edge.program)))
            .collect();

        let clone = self.add_team();
        for (destination, program) in outgoing {
            self.add_edge(clone, destination, program)?;
        }
        Ok(clone)
    }

    /// Give an edge another program. Returns the previous one.
    pub fn replace_program(
        &mut self,
        id: EdgeId,
        program: Arc<Program>,
    ) -> Result<Arc<Program>, GraphError> {
        self.check_environment(&program)?;
        let edge = self.edges.get_mut(&id).ok_or(GraphError::UnknownEdge(id))?;
        Ok(std::mem::replace(&mut edge.program, program))
    }

    /// Mutable access to an edge's program, copying it first if shared.
    pub fn program_mut(&mut self, id: EdgeId) -> Result<&mut Program, GraphError> {
        let edge = self.edges.get_mut(&id).ok_or(GraphError::UnknownEdge(id))?;
        Ok(Arc::make_mut(&mut edge.program))
    }

    /// Each program referenced by at least one edge, once, in edge order.
    pub fn distinct_programs(&self) -> Vec<Arc<Program>> {
        let mut seen = HashSet::new();
        self.edges
            .values()
            .filter(|edge| seen.insert(Arc::as_ptr(&edge.program)))
            .map(|edge| Arc::clone(&edge.program))
            .collect()
    }

    /// Remove every orphaned vertex.
    pub fn cleanup(&mut self) -> CleanupReport {
        let orphans: Vec<VertexId> = self
            .vertices
            .iter()
            .filter(|(_, vertex)| vertex.is_orphan())
            .map(|(id, _)| *id)
            .collect();
        for id in &orphans {
            self.roots.swap_remove(id);
            self.vertices.shift_remove(id);
        }
        if !orphans.is_empty() {
            debug!(removed = orphans.len(), "graph cleanup");
        }
        CleanupReport {
            removed_vertices: orphans,
        }
    }

    /// Remove every vertex and edge.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.edges.clear();
        self.roots.clear();
    }

    /// Verify the structural invariants listed in the module documentation.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        for (id, edge) in &self.edges {
            if edge.source == edge.destination {
                return Err(InvariantViolation::SelfLoop(*id));
            }
            let listed_out = self
                .team(edge.source)
                .is_ok_and(|team| team.outgoing.contains(id));
            let listed_in = self
                .vertices
                .get(&edge.destination)
                .is_some_and(|vertex| vertex.incoming().contains(id));
            if !listed_out || !listed_in {
                return Err(InvariantViolation::Dangling(*id));
            }
            edge.program
                .validate()
                .map_err(|error| InvariantViolation::InvalidProgram { edge: *id, error })?;
        }

        for (id, vertex) in &self.vertices {
            if vertex.is_orphan() {
                return Err(InvariantViolation::Orphan(*id));
            }
            if vertex.is_team() && vertex.nb_outgoing() == 0 {
                return Err(InvariantViolation::TeamWithoutEdge(*id));
            }
            if vertex.is_team() && !self.reaches_action(vertex) {
                return Err(InvariantViolation::NoActionEdge(*id));
            }
        }

        let expected: HashSet<VertexId> = self
            .vertices
            .iter()
            .filter(|(_, vertex)| vertex.is_team() && vertex.incoming().is_empty())
            .map(|(id, _)| *id)
            .collect();
        let actual: HashSet<VertexId> = self.roots.iter().copied().collect();
        if expected != actual || actual.len() != self.roots.len() {
            return Err(InvariantViolation::RootMismatch);
        }
        Ok(())
    }

    /// Check that every program holds between `min` and `max` lines.
    pub fn check_program_sizes(&self, min: usize, max: usize) -> Result<(), InvariantViolation> {
        for (id, edge) in &self.edges {
            let len = edge.program.len();
            if len < min || len > max {
                return Err(InvariantViolation::ProgramSize {
                    edge: *id,
                    len,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }

    fn reaches_action(&self, team: &Vertex) -> bool {
        team.outgoing().any(|id| {
            self.edges
                .get(&id)
                .and_then(|edge| self.vertices.get(&edge.destination))
                .is_some_and(Vertex::is_action)
        })
    }

    fn check_environment(&self, program: &Program) -> Result<(), GraphError> {
        if Arc::ptr_eq(program.environment(), &self.environment) {
            Ok(())
        } else {
            Err(GraphError::EnvironmentMismatch)
        }
    }

    fn attach_incoming(&mut self, destination: VertexId, edge: EdgeId) {
        if let Some(vertex) = self.vertices.get_mut(&destination) {
            vertex.incoming_mut().insert(edge);
            if vertex.is_team() {
                self.roots.swap_remove(&destination);
            }
        }
    }

    fn detach_incoming(&mut self, destination: VertexId, edge: EdgeId) {
        if let Some(vertex) = self.vertices.get_mut(&destination) {
            let incoming = vertex.incoming_mut();
            incoming.shift_remove(&edge);
            if incoming.is_empty() && vertex.is_team() {
                self.roots.insert(destination);
            }
        }
    }
}
