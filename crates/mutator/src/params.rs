//! Mutation knobs.
//!
//! Plain values with documented defaults. [`MutationParameters::validate`]
//! runs before any operator sees them.

use serde::{Deserialize, Serialize};

use crate::error::ParameterError;

/// Knobs of the graph-level operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphParameters {
    /// Number of distinct action identifiers.
    pub nb_actions: u64,
    /// Root count targeted by population.
    pub nb_roots: usize,
    pub max_init_outgoing_edges: usize,
    pub min_outgoing_edges: usize,
    pub max_outgoing_edges: usize,
    pub p_edge_deletion: f64,
    pub p_edge_addition: f64,
    pub p_program_mutation: f64,
    pub p_edge_destination_change: f64,
    /// Probability that a new destination is an Action rather than a Team.
    pub p_edge_destination_is_action: f64,
    /// Probability that a Team destination is a freshly created Team.
    pub p_new_team_destination: f64,
    /// Probability that a new edge shares an existing Program.
    pub p_program_sharing: f64,
}

impl Default for GraphParameters {
    fn default() -> Self {
        Self {
            nb_actions: 2,
            nb_roots: 20,
            max_init_outgoing_edges: 3,
            min_outgoing_edges: 1,
            max_outgoing_edges: 5,
            p_edge_deletion: 0.7,
            p_edge_addition: 0.7,
            p_program_mutation: 0.2,
            p_edge_destination_change: 0.1,
            p_edge_destination_is_action: 0.5,
            p_new_team_destination: 0.0,
            p_program_sharing: 0.0,
        }
    }
}

impl GraphParameters {
    pub fn validate(&self) -> Result<(), ParameterError> {
        check_probability("pEdgeDeletion", self.p_edge_deletion)?;
        check_probability("pEdgeAddition", self.p_edge_addition)?;
        check_probability("pProgramMutation", self.p_program_mutation)?;
        check_probability("pEdgeDestinationChange", self.p_edge_destination_change)?;
        check_probability("pEdgeDestinationIsAction", self.p_edge_destination_is_action)?;
        check_probability("pNewTeamDestination", self.p_new_team_destination)?;
        check_probability("pProgramSharing", self.p_program_sharing)?;

        check_nonzero("nbActions", self.nb_actions)?;
        check_nonzero("nbRoots", self.nb_roots as u64)?;
        check_nonzero("maxInitOutgoingEdges", self.max_init_outgoing_edges as u64)?;
        check_nonzero("maxOutgoingEdges", self.max_outgoing_edges as u64)?;
        check_bounds(
            "outgoingEdges",
            self.min_outgoing_edges as i64,
            self.max_outgoing_edges as i64,
        )?;
        check_bounds(
            "maxInitOutgoingEdges",
            self.max_init_outgoing_edges as i64,
            self.max_outgoing_edges as i64,
        )
    }
}

/// Knobs of the program-level operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgramParameters {
    pub min_program_size: usize,
    pub max_program_size: usize,
    /// Line deletion.
    pub p_delete: f64,
    /// Line insertion.
    pub p_add: f64,
    /// Line alteration.
    pub p_mutate: f64,
    pub p_swap: f64,
    /// Per-constant re-roll probability.
    pub p_constant_mutation: f64,
    pub min_const_value: i32,
    pub max_const_value: i32,
    /// Retry mutation until the effective behavior differs.
    pub force_behavior_change: bool,
}

impl Default for ProgramParameters {
    fn default() -> Self {
        Self {
            min_program_size: 1,
            max_program_size: 96,
            p_delete: 0.5,
            p_add: 0.5,
            p_mutate: 1.0,
            p_swap: 1.0,
            p_constant_mutation: 0.5,
            min_const_value: -10,
            max_const_value: 10,
            force_behavior_change: false,
        }
    }
}

impl ProgramParameters {
    pub fn validate(&self) -> Result<(), ParameterError> {
        check_probability("pDelete", self.p_delete)?;
        check_probability("pAdd", self.p_add)?;
        check_probability("pMutate", self.p_mutate)?;
        check_probability("pSwap", self.p_swap)?;
        check_probability("pConstantMutation", self.p_constant_mutation)?;

        check_nonzero("maxProgramSize", self.max_program_size as u64)?;
        check_bounds(
            "programSize",
            self.min_program_size as i64,
            self.max_program_size as i64,
        )?;
        check_bounds(
            "constValue",
            i64::from(self.min_const_value),
            i64::from(self.max_const_value),
        )
    }
}

/// Every mutation knob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MutationParameters {
    pub graph: GraphParameters,
    pub program: ProgramParameters,
}

impl MutationParameters {
    pub fn validate(&self) -> Result<(), ParameterError> {
        self.graph.validate()?;
        self.program.validate()
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<(), ParameterError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ParameterError::Probability { name, value })
    }
}

fn check_nonzero(name: &'static str, value: u64) -> Result<(), ParameterError> {
    if value == 0 {
        Err(ParameterError::Zero { name })
    } else {
        Ok(())
    }
}

fn check_bounds(name: &'static str, min: i64, max: i64) -> Result<(), ParameterError> {
    if min > max {
        Err(ParameterError::InvertedBounds { name, min, max })
    } else {
        Ok(())
    }
}
