//! Parameters documents
//!
//! One YAML document carries every knob of a run: the register file shape
//! of the Environment, the seed, the mutation knobs and the evaluation
//! knobs. Omitted fields take their documented defaults.
//!
//! # File Format
//!
//! ```yaml
//! apiVersion: tangle/v1
//! kind: Parameters
//!
//! seed: 42
//! nbRegisters: 8
//! nbProgramConstants: 2
//!
//! mutation:
//!   graph:
//!     nbActions: 3
//!     nbRoots: 30
//!     pEdgeAddition: 0.5
//!   program:
//!     maxProgramSize: 40
//!     forceBehaviorChange: true
//!
//! evaluation:
//!   maxNbActionsPerEval: 200
//!   nbIterationsPerPolicyEvaluation: 3
//!   execution: tolerant
//! ```

mod types;


pub use types::*;
