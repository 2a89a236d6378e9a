//! Structural statistics of one policy.
//!
//! [`PolicyStats::analyze`] explores the subgraph reachable from a root
//! breadth first and gathers the numbers used to compare evolved policies:
//! depth profile, branching, program sizes and what the effective lines
//! actually use.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use tangle_foundation::{ActionId, VertexId};
use tangle_vm::{Program, REGISTER_SOURCE};

use crate::error::GraphError;
use crate::graph::Graph;
use crate::vertex::Vertex;

/// Statistics of the policy rooted at one Team.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyStats {
    /// Depth of the deepest vertex, the root being at depth 0.
    pub max_depth: usize,
    /// Number of vertices first reached at each depth.
    pub vertices_per_depth: Vec<usize>,
    pub nb_distinct_teams: usize,
    /// Outgoing edge count of each reachable Team, in discovery order.
    pub outgoing_edges_per_team: Vec<usize>,
    /// Line count of each distinct reachable program.
    pub lines_per_program: Vec<usize>,
    /// Intron count of each distinct reachable program.
    pub introns_per_program: Vec<usize>,
    /// Effective lines using each instruction index.
    pub instruction_usage: BTreeMap<usize, usize>,
    /// Effective reads of each non-register `(source, address)` cell.
    pub data_usage: BTreeMap<(usize, usize), usize>,
    /// Reachable edges leading to each action.
    pub action_usage: BTreeMap<ActionId, usize>,
    /// Reachable edges holding each distinct program, in discovery order.
    pub edges_per_program: Vec<usize>,
}

impl PolicyStats {
    /// Breadth-first analysis of the policy rooted at `root`.
    pub fn analyze(graph: &Graph, root: VertexId) -> Result<Self, GraphError> {
        let root_vertex = graph.vertex(root).ok_or(GraphError::UnknownVertex(root))?;
        if !root_vertex.is_team() {
            return Err(GraphError::NotATeam(root));
        }

        let mut stats = Self::default();
        let mut seen = HashSet::from([root]);
        let mut queue = VecDeque::from([(root, 0usize)]);
        let mut programs: Vec<Arc<Program>> = Vec::new();

        while let Some((id, depth)) = queue.pop_front() {
            stats.max_depth = stats.max_depth.max(depth);
            if stats.vertices_per_depth.len() <= depth {
                stats.vertices_per_depth.resize(depth + 1, 0);
            }
            stats.vertices_per_depth[depth] += 1;

            let vertex = graph.vertex(id).ok_or(GraphError::UnknownVertex(id))?;
            let Vertex::Team(team) = vertex else {
                continue;
            };
            stats.nb_distinct_teams += 1;
            stats.outgoing_edges_per_team.push(team.outgoing().len());

            for &edge_id in team.outgoing() {
                let edge = graph.edge(edge_id).ok_or(GraphError::UnknownEdge(edge_id))?;
                match programs
                    .iter()
                    .position(|known| Arc::ptr_eq(known, edge.program()))
                {
                    Some(index) => stats.edges_per_program[index] += 1,
                    None => {
                        programs.push(Arc::clone(edge.program()));
                        stats.edges_per_program.push(1);
                    }
                }

                let destination = edge.destination();
                if let Some(action) = graph.vertex(destination).and_then(Vertex::action_id) {
                    *stats.action_usage.entry(action).or_default() += 1;
                }
                if seen.insert(destination) {
                    queue.push_back((destination, depth + 1));
                }
            }
        }

        for program in &programs {
            stats.record_program(program);
        }
        Ok(stats)
    }

    fn record_program(&mut self, program: &Program) {
        self.lines_per_program.push(program.len());
        self.introns_per_program.push(program.nb_introns());

        let env = program.environment();
        for (_, line) in program.effective_lines() {
            *self.instruction_usage.entry(line.instruction).or_default() += 1;
            let Some(instruction) = env.instruction(line.instruction) else {
                continue;
            };
            for (operand, ty) in line.operands.iter().zip(instruction.operand_types()) {
                if operand.source == REGISTER_SOURCE {
                    continue;
                }
                for address in operand.address..operand.address + ty.width() {
                    *self.data_usage.entry((operand.source, address)).or_default() += 1;
                }
            }
        }
    }

    pub fn nb_distinct_programs(&self) -> usize {
        self.lines_per_program.len()
    }

    pub fn average_program_len(&self) -> f64 {
        average(&self.lines_per_program)
    }

    pub fn average_effective_len(&self) -> f64 {
        let effective: Vec<usize> = self
            .lines_per_program
            .iter()
            .zip(&self.introns_per_program)
            .map(|(lines, introns)| lines - introns)
            .collect();
        average(&effective)
    }
}

fn average(values: &[usize]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<usize>() as f64 / values.len() as f64
    }
}

impl fmt::Display for PolicyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "max depth: {}", self.max_depth)?;
        writeln!(f, "vertices per depth: {:?}", self.vertices_per_depth)?;
        writeln!(f, "teams: {}", self.nb_distinct_teams)?;
        writeln!(
            f,
            "outgoing edges per team: {:?}",
            self.outgoing_edges_per_team
        )?;
        writeln!(
            f,
            "programs: {} (avg {:.2} lines, {:.2} effective)",
            self.nb_distinct_programs(),
            self.average_program_len(),
            self.average_effective_len()
        )?;
        writeln!(f, "edges per program: {:?}", self.edges_per_program)?;
        writeln!(f, "instruction usage:")?;
        for (instruction, count) in &self.instruction_usage {
            writeln!(f, "  #{}: {}", instruction, count)?;
        }
        writeln!(f, "action usage:")?;
        for (action, count) in &self.action_usage {
            writeln!(f, "  {}: {}", action, count)?;
        }
        write!(f, "data cells read: {}", self.data_usage.len())
    }
}
