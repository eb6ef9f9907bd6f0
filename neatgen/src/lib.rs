//! A generational implementation of NeuroEvolution of Augmenting Topologies,
//! following the 2002 paper: <http://nn.cs.utexas.edu/keyword?stanley:ec02>
//!
//! Genomes are user-defined through the [`Genome`] trait, and grouped into
//! species by genetic distance. Each generation is bred by one of two
//! reproduction strategies:
//! - [`DefaultReproduction`]: stagnant species are removed, the remaining ones
//!   receive offspring in proportion to their adjusted fitness, and parents
//!   are drawn from each species' fittest members.
//! - [`Nsga2Reproduction`]: genomes with multi-objective [`Fitness`]es are
//!   ranked by non-dominated sorting and crowding distance, and parents are
//!   picked by tournament, keeping the best of parents and offspring.
//!
//! A neural network-based genome representation is supplied by the
//! `neatgen-nn` crate.
//!
//! All randomness is drawn from a seeded [`PopulationRng`] owned by the
//! population, so a run is reproducible from its configuration, and a
//! serialized [`Population`] is a checkpoint that resumes the same run.
//!
//! # Example usage: two objectives with `neatgen-nn`
//! ```
//! use neatgen::{Genome, NeatConfig, Population};
//! use neatgen_nn::genomics::{GeneticConfig, NNGenome};
//!
//! let config: NeatConfig<GeneticConfig> = NeatConfig::from_toml_str(r#"
//!     [population]
//!     pop_size = 40
//!     no_fitness_termination = true
//!     reproduction = "nsga2"
//!     seed = 3
//!
//!     [genome]
//!     input_count = 2
//!     output_count = 1
//!     node_addition_mutation_chance = 0.2
//! "#).unwrap();
//!
//! let mut population = Population::<_, _, NNGenome>::new(config.population, config.genome);
//!
//! // Maximize total weight while keeping genomes small.
//! let evaluate = |genome: &NNGenome, _seed: u64| {
//!     let weight: f32 = genome.genes().filter(|g| g.enabled()).map(|g| g.weight()).sum();
//!     [weight, -(genome.genes().count() as f32)]
//! };
//! population.run(evaluate, Some(5)).unwrap();
//!
//! assert_eq!(population.generation(), 5);
//! assert_eq!(population.genomes().len(), 40);
//! assert!(population.best_genome().is_some());
//! ```

mod config;
mod genome;
#[cfg(test)]
mod mock;
mod populations;
mod rng;

pub use config::{ConfigError, GenomeConfig, NeatConfig};
pub use genome::*;
pub use populations::*;
pub use rng::PopulationRng;
