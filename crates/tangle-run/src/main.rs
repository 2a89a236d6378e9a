//! Tangle Run - grows and mutates a decision graph on a toy task
//!
//! This binary loads a parameters document, builds a random graph, and for
//! each generation populates the root set, evaluates every root policy on
//! the tracking task, and mutates the graph. The final graph can be saved as
//! a snapshot.

mod tracker;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tangle_foundation::VertexId;
use tangle_graph::{
    evaluate_policy, DecisionError, Graph, GraphError, GraphSnapshot, PolicyStats, SnapshotError,
};
use tangle_mutator::{GraphMutator, MutationError, Parameters, ParametersError};
use tangle_vm::{ConfigError, Environment, InstructionSet};

use crate::tracker::Tracker;

#[derive(Parser, Debug)]
#[command(name = "tangle-run")]
#[command(about = "Grow and mutate a decision graph on a target tracking task")]
struct Cli {
    /// Path to a parameters YAML document (defaults when omitted)
    #[arg(long)]
    params: Option<PathBuf>,

    /// Number of generations to run
    #[arg(long, default_value = "20")]
    generations: u64,

    /// Override the seed of the parameters document
    #[arg(long)]
    seed: Option<u64>,

    /// Write the final graph to this snapshot file
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(Debug, Error)]
enum RunError {
    #[error("failed to load parameters: {0}")]
    Parameters(#[from] ParametersError),

    #[error("invalid environment: {0}")]
    Environment(#[from] ConfigError),

    #[error("mutation failed: {0}")]
    Mutation(#[from] MutationError),

    #[error("evaluation failed: {0}")]
    Decision(#[from] DecisionError),

    #[error("analysis failed: {0}")]
    Graph(#[from] GraphError),

    #[error("failed to write snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tangle_run=info,tangle_mutator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), RunError> {
    let mut parameters = match &cli.params {
        Some(path) => {
            info!("Loading parameters from: {}", path.display());
            Parameters::load(path)?
        }
        None => Parameters::default(),
    };
    if let Some(seed) = cli.seed {
        parameters = parameters.with_seed(seed);
    }

    let tracker = Tracker::new();
    let environment = Arc::new(Environment::new(
        InstructionSet::arithmetic(),
        &[tracker.observations()],
        parameters.nb_registers,
        parameters.nb_program_constants,
    )?);
    info!(
        instructions = environment.instructions().len(),
        line_bits = environment.line_size(),
        "environment ready"
    );

    let nb_roots = parameters.mutation.graph.nb_roots;
    let mut mutator = GraphMutator::new(parameters.mutation.clone(), parameters.seed)?;
    let mut graph = Graph::new(environment);
    mutator.init_random_graph(&mut graph)?;

    let mut best = None;
    for generation in 0..cli.generations {
        mutator.populate(&mut graph, nb_roots)?;

        let (root, score) = evaluate_roots(&graph, &parameters, generation)?;
        info!(
            generation,
            roots = graph.roots().len(),
            teams = graph.nb_teams(),
            edges = graph.nb_edges(),
            programs = graph.distinct_programs().len(),
            best_root = %root,
            best_score = score,
            "generation evaluated"
        );
        best = Some(root);

        if generation + 1 < cli.generations {
            let report = mutator.mutate_graph(&mut graph)?;
            info!(
                added = report.edges_added,
                deleted = report.edges_deleted,
                rewired = report.destinations_changed,
                mutated = report.programs_mutated,
                released = report.programs_released,
                "generation mutated"
            );
        }
    }

    if let Some(root) = best {
        let stats = PolicyStats::analyze(&graph, root)?;
        info!("Best policy {}:\n{}", root, stats);
    }

    if let Some(path) = &cli.snapshot {
        GraphSnapshot::capture(&graph).save(path)?;
        info!("Snapshot written to: {}", path.display());
    }
    Ok(())
}

/// Evaluate every root in parallel and return the best one with its mean
/// score. Ties go to the earliest root.
fn evaluate_roots(
    graph: &Graph,
    parameters: &Parameters,
    generation: u64,
) -> Result<(VertexId, f64), RunError> {
    let roots: Vec<VertexId> = graph.roots().iter().copied().collect();
    let seed = parameters.seed.wrapping_add(generation.wrapping_mul(1_000));
    let scores = roots
        .par_iter()
        .map_init(Tracker::new, |tracker, &root| {
            evaluate_policy(graph, root, tracker, &parameters.evaluation, seed)
                .map(|result| (root, result.mean))
        })
        .collect::<Result<Vec<_>, DecisionError>>()?;

    scores
        .into_iter()
        .reduce(|best, candidate| if candidate.1 > best.1 { candidate } else { best })
        .ok_or(RunError::Mutation(MutationError::EmptyGraph))
}
