//! Reproduction strategies.
//!
//! A strategy turns an evaluated, speciated generation
//! into the genomes of the next one. [`DefaultReproduction`]
//! uses single-objective fitness; [`Nsga2Reproduction`]
//! ranks genomes by Pareto dominance over multiple objectives.
mod default;
mod nsga2;

pub use default::DefaultReproduction;
pub use nsga2::{crowding_distance, non_dominated_sort, CrowdedFitness, Nsga2Reproduction};

use super::errors::EvolutionError;
use super::offspring_factory::OffspringFactory;
use super::reporting::ReporterSet;
use super::species_set::SpeciesSet;
use super::stagnation::Stagnation;
use super::{PopulationConfig, ReproductionMethod};
use crate::{Genome, GenomeKey};

use rand::Rng;
use serde::{Deserialize, Serialize};

use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Hands out genome keys in increasing order,
/// starting at 1. Keys are never reused.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenomeIndexer {
    next: GenomeKey,
}

impl GenomeIndexer {
    pub fn new() -> GenomeIndexer {
        GenomeIndexer { next: 1 }
    }

    /// Returns a fresh key.
    pub fn next_key(&mut self) -> GenomeKey {
        let key = self.next;
        self.next += 1;
        key
    }

    /// Returns the key that will be handed out next.
    pub fn peek(&self) -> GenomeKey {
        self.next
    }
}

impl Default for GenomeIndexer {
    fn default() -> GenomeIndexer {
        GenomeIndexer::new()
    }
}

/// The reproduction strategy of a population,
/// along with any state it keeps between generations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Reproduction<G> {
    Default(DefaultReproduction),
    Nsga2(Nsga2Reproduction<G>),
}

impl<G: Genome> Reproduction<G> {
    /// Creates the configured strategy.
    pub fn new(method: ReproductionMethod) -> Reproduction<G> {
        match method {
            ReproductionMethod::Default => Reproduction::Default(DefaultReproduction::new()),
            ReproductionMethod::Nsga2 => Reproduction::Nsga2(Nsga2Reproduction::new()),
        }
    }

    fn indexer(&mut self) -> &mut GenomeIndexer {
        match self {
            Reproduction::Default(r) => &mut r.indexer,
            Reproduction::Nsga2(r) => &mut r.indexer,
        }
    }

    /// Creates `count` random genomes with fresh keys.
    pub fn create_new<R: Rng + ?Sized>(
        &mut self,
        genetic_config: &G::Config,
        count: usize,
        rng: &mut R,
    ) -> BTreeMap<GenomeKey, G> {
        let indexer = self.indexer();
        (0..count)
            .map(|_| {
                let key = indexer.next_key();
                (key, G::new(key, genetic_config, &mut *rng))
            })
            .collect()
    }

    /// Ranks an evaluated generation, and returns its best genome.
    ///
    /// For single-objective reproduction this is the genome
    /// with the highest fitness. NSGA-II merges the generation
    /// with the stored parents, ranks them by dominance and
    /// crowding, keeps the best as the next parents, and
    /// returns the best non-dominated genome.
    ///
    /// # Errors
    /// Returns an error if a genome is unevaluated, or if
    /// objective counts differ.
    pub fn sort(
        &mut self,
        genomes: &BTreeMap<GenomeKey, G>,
        species_set: &mut SpeciesSet<G>,
        stagnation: &mut Stagnation,
        generation: usize,
        config: &PopulationConfig,
        reporters: &mut ReporterSet<G>,
    ) -> Result<Option<G>, EvolutionError> {
        match self {
            Reproduction::Default(_) => best_by_primary_fitness(genomes.values()),
            Reproduction::Nsga2(r) => {
                r.sort(genomes, species_set, stagnation, generation, config, reporters)
            }
        }
    }

    /// Produces the next generation's genomes.
    ///
    /// Returns an empty map if every species went extinct.
    pub(crate) fn reproduce<R: Rng + ?Sized>(
        &mut self,
        factory: &mut OffspringFactory<'_, G, R>,
        genomes: &BTreeMap<GenomeKey, G>,
        species_set: &mut SpeciesSet<G>,
        stagnation: &mut Stagnation,
        generation: usize,
        reporters: &mut ReporterSet<G>,
    ) -> Result<BTreeMap<GenomeKey, G>, EvolutionError> {
        match self {
            Reproduction::Default(r) => {
                r.reproduce(factory, genomes, species_set, stagnation, generation, reporters)
            }
            Reproduction::Nsga2(r) => r.reproduce(factory),
        }
    }

    /// Forgets any state carried between generations.
    /// Keys keep increasing.
    pub fn reset(&mut self) {
        if let Reproduction::Nsga2(r) = self {
            r.reset();
        }
    }
}

/// Returns the genome with the highest primary fitness,
/// ties going to the lowest key.
pub(crate) fn best_by_primary_fitness<'a, G: Genome + 'a>(
    genomes: impl Iterator<Item = &'a G>,
) -> Result<Option<G>, EvolutionError> {
    let mut best: Option<(&G, f32)> = None;
    for genome in genomes {
        let fitness = genome
            .primary_fitness()
            .ok_or(EvolutionError::MissingFitness { key: genome.key() })?;
        best = match best {
            Some((b, f)) if by_fitness_then_key((b, f), (genome, fitness)) != Ordering::Less => {
                Some((b, f))
            }
            _ => Some((genome, fitness)),
        };
    }
    Ok(best.map(|(g, _)| g.clone()))
}

/// Orders by fitness, with lower keys counting as better on ties.
fn by_fitness_then_key<G: Genome>(a: (&G, f32), b: (&G, f32)) -> Ordering {
    a.1.total_cmp(&b.1).then(b.0.key().cmp(&a.0.key()))
}
