//! Graph-level operators.
//!
//! [`GraphMutator`] owns the mutation knobs and the random stream of a run.
//! Every structural operator keeps the termination guard: each Team keeps at
//! least one outgoing edge to an Action, so a decision walk from any Team can
//! always end. An operator that could only proceed by breaking it is a no-op.
//!
//! A pass ([`GraphMutator::mutate_graph`] or [`GraphMutator::populate`])
//! only mutates root Teams and creates at most [`NEW_TEAMS_PER_PASS`] leaf
//! Teams, so a graph grows by a bounded number of Teams per pass.
//!
//! Program mutation never edits a program in place. The program of each
//! selected edge is copied, mutated, and swapped in, so programs shared with
//! other edges stay untouched.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, instrument, warn};

use tangle_foundation::{ActionId, EdgeId, RngStream, VertexId};
use tangle_graph::{Edge, Graph, GraphError, Vertex};
use tangle_vm::{Environment, Program};

use crate::error::MutationError;
use crate::params::MutationParameters;
use crate::program::{init_random_program, mutate_program};

/// Population attempts allowed per requested root.
pub const POPULATE_ATTEMPTS_PER_ROOT: usize = 10;

/// Leaf Teams a single pass may create as new edge destinations.
pub const NEW_TEAMS_PER_PASS: usize = 4;

/// Counts of what a mutation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationReport {
    pub edges_added: usize,
    pub edges_deleted: usize,
    pub destinations_changed: usize,
    pub programs_mutated: usize,
    /// Programs dropped by their last edge, including programs created
    /// earlier in the same pass.
    pub programs_released: usize,
    pub vertices_removed: usize,
    pub teams_cloned: usize,
}

/// Seeded mutation engine for one graph lineage.
#[derive(Debug, Clone)]
pub struct GraphMutator {
    params: MutationParameters,
    rng: RngStream,
    new_teams_left: usize,
}

impl GraphMutator {
    /// # Errors
    ///
    /// Rejects out-of-range knobs.
    pub fn new(params: MutationParameters, seed: u64) -> Result<Self, MutationError> {
        Self::with_rng(params, RngStream::new(seed))
    }

    pub fn with_rng(params: MutationParameters, rng: RngStream) -> Result<Self, MutationError> {
        params.validate()?;
        Ok(Self {
            params,
            rng,
            new_teams_left: NEW_TEAMS_PER_PASS,
        })
    }

    pub fn params(&self) -> &MutationParameters {
        &self.params
    }

    pub fn rng(&self) -> &RngStream {
        &self.rng
    }

    pub fn rng_mut(&mut self) -> &mut RngStream {
        &mut self.rng
    }

    /// Replace the content of `graph` with `nbActions` Actions and as many
    /// Teams. Team *i* points at Action *i* and at distinct other Actions,
    /// each edge with a fresh random program.
    #[instrument(skip_all, fields(nb_actions = self.params.graph.nb_actions))]
    pub fn init_random_graph(&mut self, graph: &mut Graph) -> Result<(), MutationError> {
        let nb_actions = self.params.graph.nb_actions;
        if nb_actions == 0 {
            return Err(MutationError::NoActions);
        }
        graph.clear();

        let actions: Vec<VertexId> = (0..nb_actions)
            .map(|id| graph.add_action(ActionId::new(id)))
            .collect();
        let teams: Vec<VertexId> = actions.iter().map(|_| graph.add_team()).collect();

        let count = actions.len();
        let lower = self.params.graph.min_outgoing_edges.max(1).min(count);
        let upper = self.params.graph.max_init_outgoing_edges.clamp(lower, count);
        for (index, &team) in teams.iter().enumerate() {
            let nb_edges = self.rng.next_unsigned_int(lower as u64, upper as u64) as usize;
            let mut others: Vec<usize> = (0..count).filter(|&other| other != index).collect();
            let mut destinations = vec![index];
            while destinations.len() < nb_edges {
                let pick = self.rng.next_index(others.len());
                destinations.push(others.swap_remove(pick));
            }
            for destination in destinations {
                let program = self.random_program(graph.environment())?;
                graph.add_edge(team, actions[destination], program)?;
            }
        }

        debug!(
            teams = graph.nb_teams(),
            edges = graph.nb_edges(),
            "random graph initialised"
        );
        Ok(())
    }

    /// Add an outgoing edge to `team` unless it already has the maximum.
    pub fn add_random_edge(
        &mut self,
        graph: &mut Graph,
        team: VertexId,
    ) -> Result<Option<EdgeId>, MutationError> {
        if outgoing_edges(graph, team)?.len() >= self.params.graph.max_outgoing_edges {
            return Ok(None);
        }
        let program = self.new_edge_program(graph)?;
        let destination = self.pick_destination(graph, team)?;
        Ok(Some(graph.add_edge(team, destination, program)?))
    }

    /// Remove a uniformly chosen outgoing edge of `team` and return it.
    ///
    /// No-op when `team` is at its minimum edge count, and never removes the
    /// last edge to an Action.
    pub fn delete_random_edge(
        &mut self,
        graph: &mut Graph,
        team: VertexId,
    ) -> Result<Option<Edge>, MutationError> {
        let outgoing = outgoing_edges(graph, team)?;
        if outgoing.len() <= self.params.graph.min_outgoing_edges.max(1) {
            return Ok(None);
        }
        let sole_action = action_edge_count(graph, &outgoing) <= 1;
        let candidates: Vec<EdgeId> = outgoing
            .into_iter()
            .filter(|&edge| !(sole_action && targets_action(graph, edge)))
            .collect();
        if candidates.is_empty() {
            return Ok(None);
        }
        let edge = candidates[self.rng.next_index(candidates.len())];
        Ok(Some(graph.remove_edge(edge)?))
    }

    /// Rewire a uniformly chosen outgoing edge of `team`.
    pub fn change_random_destination(
        &mut self,
        graph: &mut Graph,
        team: VertexId,
    ) -> Result<Option<EdgeId>, MutationError> {
        let outgoing = outgoing_edges(graph, team)?;
        if outgoing.is_empty() {
            return Ok(None);
        }
        let edge = outgoing[self.rng.next_index(outgoing.len())];
        Ok(self.change_destination(graph, team, edge)?.then_some(edge))
    }

    /// Rewire `edge` of `team`. The sole Action edge of a Team only moves to
    /// another Action.
    pub fn change_destination(
        &mut self,
        graph: &mut Graph,
        team: VertexId,
        edge: EdgeId,
    ) -> Result<bool, MutationError> {
        let current = graph
            .edge(edge)
            .ok_or(GraphError::UnknownEdge(edge))?
            .destination();
        let sole_action = targets_action(graph, edge)
            && action_edge_count(graph, &outgoing_edges(graph, team)?) == 1;
        let destination = if sole_action {
            self.pick_action(graph)?
        } else {
            self.pick_destination(graph, team)?
        };
        if destination == current {
            return Ok(false);
        }
        graph.set_destination(edge, destination)?;
        Ok(true)
    }

    /// Mutate the outgoing edges of one Team: repeated deletion, repeated
    /// addition, then per-edge destination change and program selection.
    ///
    /// Edges whose program should be mutated are appended to `pending`.
    /// Returns whether anything changed or was queued.
    pub fn mutate_team(
        &mut self,
        graph: &mut Graph,
        team: VertexId,
        report: &mut MutationReport,
        pending: &mut Vec<EdgeId>,
    ) -> Result<bool, MutationError> {
        let mut changed = false;
        let knobs = self.params.graph.clone();

        while self.rng.bool_with_prob(knobs.p_edge_deletion) {
            let Some(removed) = self.delete_random_edge(graph, team)? else {
                break;
            };
            report.edges_deleted += 1;
            if is_last_reference(removed.program()) {
                report.programs_released += 1;
            }
            changed = true;
        }
        while self.rng.bool_with_prob(knobs.p_edge_addition) {
            if self.add_random_edge(graph, team)?.is_none() {
                break;
            }
            report.edges_added += 1;
            changed = true;
        }
        for edge in outgoing_edges(graph, team)? {
            if self.rng.bool_with_prob(knobs.p_edge_destination_change)
                && self.change_destination(graph, team, edge)?
            {
                report.destinations_changed += 1;
                changed = true;
            }
            if self.rng.bool_with_prob(knobs.p_program_mutation) {
                pending.push(edge);
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Mutate every root Team of `graph`, mutate the selected programs,
    /// then run cleanup.
    ///
    /// Inner Teams are left as they are. A graph whose Teams all have
    /// incoming edges has every Team mutated instead.
    #[instrument(skip_all, fields(teams = graph.nb_teams(), roots = graph.roots().len()))]
    pub fn mutate_graph(&mut self, graph: &mut Graph) -> Result<MutationReport, MutationError> {
        let teams: Vec<VertexId> = if graph.roots().is_empty() {
            graph.teams().collect()
        } else {
            graph.roots().iter().copied().collect()
        };
        if teams.is_empty() {
            return Err(MutationError::EmptyGraph);
        }

        self.new_teams_left = NEW_TEAMS_PER_PASS;
        let mut report = MutationReport::default();
        let mut pending = Vec::new();
        for team in teams {
            self.mutate_team(graph, team, &mut report, &mut pending)?;
        }
        self.mutate_edge_programs(graph, &pending, &mut report)?;
        finish(graph, &mut report);

        debug!(
            added = report.edges_added,
            deleted = report.edges_deleted,
            rewired = report.destinations_changed,
            programs = report.programs_mutated,
            released = report.programs_released,
            removed = report.vertices_removed,
            "graph mutated"
        );
        Ok(report)
    }

    /// Grow the root set to `nb_roots` by cloning random roots and mutating
    /// each clone.
    ///
    /// A clone may absorb other roots by pointing at them, so the loop runs
    /// until the target is reached or
    /// `nb_roots * POPULATE_ATTEMPTS_PER_ROOT` clones were made.
    #[instrument(skip_all, fields(target = nb_roots))]
    pub fn populate(
        &mut self,
        graph: &mut Graph,
        nb_roots: usize,
    ) -> Result<MutationReport, MutationError> {
        self.new_teams_left = NEW_TEAMS_PER_PASS;
        let mut report = MutationReport::default();
        let cap = nb_roots.saturating_mul(POPULATE_ATTEMPTS_PER_ROOT);
        let mut attempts = 0;

        while graph.roots().len() < nb_roots {
            if attempts >= cap {
                warn!(
                    roots = graph.roots().len(),
                    target = nb_roots,
                    attempts,
                    "population stopped at attempt cap"
                );
                break;
            }
            attempts += 1;

            let parents: Vec<VertexId> = if graph.roots().is_empty() {
                graph.teams().collect()
            } else {
                graph.roots().iter().copied().collect()
            };
            if parents.is_empty() {
                return Err(MutationError::EmptyGraph);
            }
            let parent = parents[self.rng.next_index(parents.len())];
            let child = graph.clone_team(parent)?;
            report.teams_cloned += 1;

            let mut pending = Vec::new();
            self.mutate_team(graph, child, &mut report, &mut pending)?;
            if pending.is_empty() {
                let outgoing = outgoing_edges(graph, child)?;
                if let Some(&edge) = outgoing.get(self.rng.next_index(outgoing.len())) {
                    pending.push(edge);
                }
            }
            self.mutate_edge_programs(graph, &pending, &mut report)?;
        }
        finish(graph, &mut report);

        debug!(
            roots = graph.roots().len(),
            attempts,
            cloned = report.teams_cloned,
            "population complete"
        );
        Ok(report)
    }

    /// Mutate a private copy of each edge's program and give it to the edge.
    ///
    /// One child stream per edge is forked in order before the parallel
    /// section, so the result does not depend on the thread count. The
    /// report counts mutated and released programs.
    pub fn mutate_programs(
        &mut self,
        graph: &mut Graph,
        edges: &[EdgeId],
    ) -> Result<MutationReport, MutationError> {
        let mut report = MutationReport::default();
        self.mutate_edge_programs(graph, edges, &mut report)?;
        Ok(report)
    }

    fn mutate_edge_programs(
        &mut self,
        graph: &mut Graph,
        edges: &[EdgeId],
        report: &mut MutationReport,
    ) -> Result<(), MutationError> {
        let jobs = edges
            .iter()
            .map(|&id| -> Result<_, MutationError> {
                let edge = graph.edge(id).ok_or(GraphError::UnknownEdge(id))?;
                Ok((id, Program::clone(edge.program()), self.rng.fork()))
            })
            .collect::<Result<Vec<_>, MutationError>>()?;

        let params = &self.params.program;
        let mutated = jobs
            .into_par_iter()
            .map(|(id, mut program, mut rng)| -> Result<_, MutationError> {
                mutate_program(&mut program, params, &mut rng)?;
                Ok((id, program))
            })
            .collect::<Result<Vec<_>, MutationError>>()?;

        for (id, program) in mutated {
            let previous = graph.replace_program(id, Arc::new(program))?;
            report.programs_mutated += 1;
            if is_last_reference(&previous) {
                report.programs_released += 1;
            }
        }
        Ok(())
    }

    fn random_program(&mut self, env: &Arc<Environment>) -> Result<Arc<Program>, MutationError> {
        Ok(Arc::new(init_random_program(
            env,
            &self.params.program,
            &mut self.rng,
        )?))
    }

    fn new_edge_program(&mut self, graph: &Graph) -> Result<Arc<Program>, MutationError> {
        if graph.nb_edges() > 0 && self.rng.bool_with_prob(self.params.graph.p_program_sharing) {
            let index = self.rng.next_index(graph.nb_edges());
            if let Some((_, edge)) = graph.edges().nth(index) {
                return Ok(Arc::clone(edge.program()));
            }
        }
        self.random_program(graph.environment())
    }

    /// An Action, a new Team, or an existing Team other than `source`.
    ///
    /// Once the pass has created [`NEW_TEAMS_PER_PASS`] Teams, a draw for a
    /// new Team picks an existing one.
    fn pick_destination(
        &mut self,
        graph: &mut Graph,
        source: VertexId,
    ) -> Result<VertexId, MutationError> {
        if self
            .rng
            .bool_with_prob(self.params.graph.p_edge_destination_is_action)
        {
            return self.pick_action(graph);
        }
        if self.rng.bool_with_prob(self.params.graph.p_new_team_destination)
            && self.new_teams_left > 0
        {
            self.new_teams_left -= 1;
            return self.create_leaf_team(graph);
        }
        let teams: Vec<VertexId> = graph.teams().filter(|&team| team != source).collect();
        if teams.is_empty() {
            return self.pick_action(graph);
        }
        Ok(teams[self.rng.next_index(teams.len())])
    }

    /// The vertex of a uniformly drawn action id, created if absent.
    fn pick_action(&mut self, graph: &mut Graph) -> Result<VertexId, MutationError> {
        let nb_actions = self.params.graph.nb_actions;
        if nb_actions == 0 {
            return Err(MutationError::NoActions);
        }
        let action_id = ActionId::new(self.rng.next_unsigned_int(0, nb_actions - 1));
        Ok(graph
            .action_vertex(action_id)
            .unwrap_or_else(|| graph.add_action(action_id)))
    }

    /// A new Team with a single edge to an Action.
    fn create_leaf_team(&mut self, graph: &mut Graph) -> Result<VertexId, MutationError> {
        let team = graph.add_team();
        let action = self.pick_action(graph)?;
        let program = self.random_program(graph.environment())?;
        graph.add_edge(team, action, program)?;
        Ok(team)
    }
}

fn finish(graph: &mut Graph, report: &mut MutationReport) {
    report.vertices_removed += graph.cleanup().removed_vertices.len();
}

fn is_last_reference(program: &Arc<Program>) -> bool {
    Arc::strong_count(program) == 1
}

fn outgoing_edges(graph: &Graph, team: VertexId) -> Result<Vec<EdgeId>, GraphError> {
    let vertex = graph.vertex(team).ok_or(GraphError::UnknownVertex(team))?;
    let team = vertex.as_team().ok_or(GraphError::NotATeam(team))?;
    Ok(team.outgoing().iter().copied().collect())
}

fn targets_action(graph: &Graph, edge: EdgeId) -> bool {
    graph
        .edge(edge)
        .and_then(|edge| graph.vertex(edge.destination()))
        .is_some_and(Vertex::is_action)
}

fn action_edge_count(graph: &Graph, edges: &[EdgeId]) -> usize {
    edges
        .iter()
        .filter(|&&edge| targets_action(graph, edge))
        .count()
}
