//! # neatgen-nn
//! A neural network-based implementation of the [`neatgen`] crate's `Genome` trait.
//!
//! Provides an [`NNGenome`] type usable in `neatgen` `Population`s: a graph of
//! sensor, hidden and actuator nodes joined by weighted connection genes, with
//! historical markings kept in a population-wide [`History`].
//!
//! Turning a genome into a runnable network is left to the user; node
//! [activation] and [aggregation] functions are provided for that purpose.
//!
//! [`NNGenome`]: crate::genomics::NNGenome
//! [`History`]: crate::genomics::History
//! [activation]: crate::genomics::ActivationType::apply
//! [aggregation]: crate::genomics::AggregationType::apply
//!
//! # Example usage
//! ```
//! use neatgen::{NeatConfig, Population};
//! use neatgen_nn::genomics::{GeneticConfig, NNGenome};
//!
//! let config: NeatConfig<GeneticConfig> = NeatConfig::from_toml_str(r#"
//!     [population]
//!     pop_size = 30
//!     fitness_threshold = 2.9
//!     seed = 1
//!
//!     [genome]
//!     input_count = 3
//!     output_count = 1
//! "#).unwrap();
//!
//! let mut population = Population::<_, _, NNGenome>::new(config.population, config.genome);
//!
//! // Reward enabled connections with weights close to 1.
//! let best = population.run(
//!     |genome, _seed| {
//!         genome
//!             .genes()
//!             .filter(|g| g.enabled())
//!             .map(|g| 1.0 - (g.weight() - 1.0).abs().min(1.0))
//!             .sum::<f32>()
//!     },
//!     Some(20),
//! ).unwrap();
//!
//! assert!(best.is_some());
//! ```

pub mod genomics;

/// Identifier type used to designate historically
/// identical mutations for the purposes of
/// genome comparison and genetic tracking.
pub type Innovation = usize;
