//! Parameters document type and loading.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tangle_graph::EvaluationParameters;

use crate::error::ParameterError;
use crate::params::MutationParameters;

/// Errors that can occur when loading or validating a parameters document.
#[derive(Debug, Error)]
pub enum ParametersError {
    /// Failed to read the parameters file.
    #[error("failed to read parameters file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse the parameters YAML.
    #[error("failed to parse parameters YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("invalid apiVersion: expected 'tangle/v1', got '{0}'")]
    InvalidApiVersion(String),

    #[error("invalid kind: expected 'Parameters', got '{0}'")]
    InvalidKind(String),

    /// A knob is out of range.
    #[error("invalid parameter: {0}")]
    Invalid(#[from] ParameterError),
}

pub type ParametersResult<T> = Result<T, ParametersError>;

/// Every knob of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    /// API version for compatibility checking.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Kind must be "Parameters".
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Seed of the run's random stream.
    #[serde(default)]
    pub seed: u64,

    /// Registers of every Program.
    #[serde(default = "default_nb_registers")]
    pub nb_registers: usize,

    /// Constants owned by every Program.
    #[serde(default)]
    pub nb_program_constants: usize,

    #[serde(default)]
    pub mutation: MutationParameters,

    #[serde(default)]
    pub evaluation: EvaluationParameters,
}

fn default_api_version() -> String {
    "tangle/v1".to_string()
}

fn default_kind() -> String {
    "Parameters".to_string()
}

fn default_nb_registers() -> usize {
    8
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            seed: 0,
            nb_registers: default_nb_registers(),
            nb_program_constants: 0,
            mutation: MutationParameters::default(),
            evaluation: EvaluationParameters::default(),
        }
    }
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a parameters document from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> ParametersResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a parameters document from a YAML string.
    pub fn from_yaml(yaml: &str) -> ParametersResult<Self> {
        let parameters: Parameters = serde_yaml::from_str(yaml)?;
        parameters.validate_schema()?;
        parameters.validate()?;
        Ok(parameters)
    }

    pub fn to_yaml(&self) -> ParametersResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn validate_schema(&self) -> ParametersResult<()> {
        if self.api_version != "tangle/v1" {
            return Err(ParametersError::InvalidApiVersion(self.api_version.clone()));
        }
        if self.kind != "Parameters" {
            return Err(ParametersError::InvalidKind(self.kind.clone()));
        }
        Ok(())
    }

    /// Check every knob.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.nb_registers == 0 {
            return Err(ParameterError::Zero {
                name: "nbRegisters",
            });
        }
        if self.evaluation.max_nb_actions_per_eval == 0 {
            return Err(ParameterError::Zero {
                name: "maxNbActionsPerEval",
            });
        }
        if self.evaluation.nb_iterations_per_policy_evaluation == 0 {
            return Err(ParameterError::Zero {
                name: "nbIterationsPerPolicyEvaluation",
            });
        }
        self.mutation.validate()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_registers(mut self, nb_registers: usize) -> Self {
        self.nb_registers = nb_registers;
        self
    }

    pub fn with_constants(mut self, nb_program_constants: usize) -> Self {
        self.nb_program_constants = nb_program_constants;
        self
    }

    pub fn with_mutation(mut self, mutation: MutationParameters) -> Self {
        self.mutation = mutation;
        self
    }

    pub fn with_evaluation(mut self, evaluation: EvaluationParameters) -> Self {
        self.evaluation = evaluation;
        self
    }
}
