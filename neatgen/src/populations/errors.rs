use crate::GenomeKey;

use thiserror::Error;

/// Errors that abort a generation's evolution step.
#[derive(Debug, Error)]
pub enum EvolutionError {
    /// Every species was removed by stagnation, and
    /// the population is not configured to reset.
    #[error("complete extinction in generation {generation}")]
    CompleteExtinction { generation: usize },
    /// A genome reached reproduction without a fitness value.
    #[error("genome {key} has not been evaluated")]
    MissingFitness { key: GenomeKey },
    /// Fitness was assigned to a genome that is not
    /// in the population.
    #[error("no genome with key {key} in the population")]
    UnknownGenome { key: GenomeKey },
    /// Multi-objective fitness vectors of different lengths.
    #[error("genome {key} has {found} objectives, expected {expected}")]
    ObjectiveCountMismatch {
        key: GenomeKey,
        expected: usize,
        found: usize,
    },
    /// The fitness evaluator failed for a genome.
    #[error("evaluation of genome {key} failed")]
    Evaluation {
        key: GenomeKey,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// A run with neither a generation limit nor
    /// fitness termination would never end.
    #[error("cannot run without a generation limit when fitness termination is disabled")]
    UnboundedRun,
}
