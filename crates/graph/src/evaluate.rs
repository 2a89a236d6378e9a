//! Policy evaluation against a learning environment.
//!
//! Runs a fixed number of episodes of a policy rooted at one Team and
//! reports the score of each. Selection between policies is left to the
//! caller.

use serde::{Deserialize, Serialize};
use tracing::debug;

use tangle_foundation::{ActionId, VertexId};
use tangle_vm::{DataSource, ExecutionMode};

use crate::decide::DecisionEngine;
use crate::error::DecisionError;
use crate::graph::Graph;

/// An episodic environment driven by decisions.
pub trait LearningEnvironment {
    /// Start a new episode.
    fn reset(&mut self, seed: u64);

    /// Observations for the next decision, matching the graph environment.
    fn data_sources(&self) -> Vec<&dyn DataSource>;

    fn do_action(&mut self, action: ActionId);

    fn is_terminal(&self) -> bool;

    /// Score of the current episode so far.
    fn score(&self) -> f64;
}

/// Evaluation knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvaluationParameters {
    /// Decisions allowed per episode before it is cut short.
    pub max_nb_actions_per_eval: u64,
    /// Episodes per policy evaluation.
    pub nb_iterations_per_policy_evaluation: u64,
    pub execution: ExecutionMode,
}

impl Default for EvaluationParameters {
    fn default() -> Self {
        Self {
            max_nb_actions_per_eval: 1000,
            nb_iterations_per_policy_evaluation: 5,
            execution: ExecutionMode::Strict,
        }
    }
}

/// Scores of the episodes of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    pub scores: Vec<f64>,
    pub mean: f64,
    pub nb_actions: u64,
}

/// Evaluate the policy rooted at `root`.
///
/// Episode `i` resets the environment with `seed + i`.
pub fn evaluate_policy(
    graph: &Graph,
    root: VertexId,
    environment: &mut dyn LearningEnvironment,
    params: &EvaluationParameters,
    seed: u64,
) -> Result<EvaluationResult, DecisionError> {
    let mut engine = DecisionEngine::new(params.execution);
    let mut scores = Vec::with_capacity(params.nb_iterations_per_policy_evaluation as usize);
    let mut nb_actions = 0;

    for iteration in 0..params.nb_iterations_per_policy_evaluation {
        environment.reset(seed.wrapping_add(iteration));
        let mut steps = 0;
        while !environment.is_terminal() && steps < params.max_nb_actions_per_eval {
            let action = {
                let sources = environment.data_sources();
                engine.decide(graph, root, &sources)?
            };
            environment.do_action(action);
            steps += 1;
        }
        nb_actions += steps;
        scores.push(environment.score());
    }

    let mean = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };
    debug!(root = %root, mean, nb_actions, "policy evaluated");

    Ok(EvaluationResult {
        scores,
        mean,
        nb_actions,
    })
}
