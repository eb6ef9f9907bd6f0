use super::GenomeIndexer;
use crate::populations::errors::EvolutionError;
use crate::populations::offspring_factory::OffspringFactory;
use crate::populations::reporting::ReporterSet;
use crate::populations::species_set::SpeciesSet;
use crate::populations::stagnation::Stagnation;
use crate::populations::{PopulationConfig, SpeciesID};
use crate::{Genome, GenomeKey};

use rand::Rng;
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

/// Single-objective reproduction.
///
/// Stagnant species are removed, and the remaining ones
/// receive offspring in proportion to their adjusted fitness.
/// Each species keeps its elite unchanged, and breeds the
/// rest of its offspring from its fittest members by
/// tournament selection.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DefaultReproduction {
    pub(super) indexer: GenomeIndexer,
}

impl DefaultReproduction {
    pub fn new() -> DefaultReproduction {
        DefaultReproduction::default()
    }

    pub(super) fn reproduce<G: Genome, R: Rng + ?Sized>(
        &mut self,
        factory: &mut OffspringFactory<'_, G, R>,
        genomes: &BTreeMap<GenomeKey, G>,
        species_set: &mut SpeciesSet<G>,
        stagnation: &mut Stagnation,
        generation: usize,
        reporters: &mut ReporterSet<G>,
    ) -> Result<BTreeMap<GenomeKey, G>, EvolutionError> {
        let config = factory.config;
        for (id, stagnant) in stagnation.update(species_set, genomes, generation, config) {
            if stagnant {
                if let Some(species) = species_set.remove(id) {
                    reporters.species_stagnant(&species);
                }
            }
        }
        if species_set.is_empty() {
            return Ok(BTreeMap::new());
        }

        let allotted = self.allot_offspring(species_set, genomes, config.size.get(), config)?;

        let mut offspring = BTreeMap::new();
        for (id, spawn) in allotted {
            let Some(species) = species_set.get(id) else {
                continue;
            };
            let ranked = rank_members(species.members(), genomes)?;

            let elite = config.elitism.min(spawn).min(ranked.len());
            for genome in &ranked[..elite] {
                offspring.insert(genome.key(), (*genome).clone());
            }

            let survivors = ((config.survival_threshold * ranked.len() as f32).ceil() as usize)
                .max(2)
                .min(ranked.len());
            let parents = &ranked[..survivors];
            for _ in elite..spawn {
                let key = self.indexer.next_key();
                offspring.insert(key, factory.breed(key, parents));
            }
            tracing::debug!(
                species = ?id,
                members = ranked.len(),
                spawn,
                elite,
                survivors,
                "reproduced species"
            );
        }
        Ok(offspring)
    }

    /// Computes each species' adjusted fitness, and
    /// divides `pop_size` offspring among them in proportion.
    fn allot_offspring<G: Genome>(
        &self,
        species_set: &mut SpeciesSet<G>,
        genomes: &BTreeMap<GenomeKey, G>,
        pop_size: usize,
        config: &PopulationConfig,
    ) -> Result<Vec<(SpeciesID, usize)>, EvolutionError> {
        let mut means = vec![];
        let (mut min, mut max) = (f32::MAX, f32::MIN);
        for species in species_set.iter() {
            let mut sum = 0.0;
            for key in species.members() {
                let fitness = genomes
                    .get(&key)
                    .and_then(Genome::primary_fitness)
                    .ok_or(EvolutionError::MissingFitness { key })?;
                min = min.min(fitness);
                max = max.max(fitness);
                sum += fitness;
            }
            means.push((species.id(), sum / species.len() as f32));
        }

        let range = config.fitness_min_divisor.max(max - min);
        let mut adjusted = Vec::with_capacity(means.len());
        for (id, mean) in means {
            let af = (mean - min) / range;
            if let Some(species) = species_set.get_mut(id) {
                species.adjusted_fitness = Some(af);
            }
            adjusted.push((id, af));
        }

        let total: f32 = adjusted.iter().map(|(_, af)| af).sum();
        let shares: Vec<f32> = if total > 0.0 {
            adjusted
                .iter()
                .map(|(_, af)| af / total * pop_size as f32)
                .collect()
        } else {
            vec![pop_size as f32 / adjusted.len() as f32; adjusted.len()]
        };
        tracing::debug!(min, max, ?adjusted, "adjusted species fitness");

        Ok(adjusted
            .iter()
            .map(|(id, _)| *id)
            .zip(round_retain_sum(&shares, pop_size))
            .collect())
    }
}

/// Returns a species' members sorted by decreasing
/// fitness, ties going to the lowest key.
fn rank_members<G: Genome>(
    members: impl Iterator<Item = GenomeKey>,
    genomes: &BTreeMap<GenomeKey, G>,
) -> Result<Vec<&G>, EvolutionError> {
    let mut ranked = vec![];
    for key in members {
        let genome = genomes.get(&key).ok_or(EvolutionError::UnknownGenome { key })?;
        let fitness = genome
            .primary_fitness()
            .ok_or(EvolutionError::MissingFitness { key })?;
        ranked.push((genome, fitness));
    }
    ranked.sort_by(|(g1, f1), (g2, f2)| f2.total_cmp(f1).then(g1.key().cmp(&g2.key())));
    Ok(ranked.into_iter().map(|(g, _)| g).collect())
}

/// Rounds all values to whole numbers summing to `total`,
/// assuming the values themselves (approximately) do.
/// The values with the largest fractional parts are rounded
/// up, ties going to the earliest value.
fn round_retain_sum(values: &[f32], total: usize) -> Vec<usize> {
    let mut truncated: Vec<(usize, usize, f32)> = values
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let u = f.max(0.0).floor();
            (i, u as usize, f - u)
        })
        .collect();
    let truncated_sum: usize = truncated.iter().map(|(_, u, _)| *u).sum();
    let remainder = total.saturating_sub(truncated_sum).min(truncated.len());
    // Sort in decreasing order of error
    truncated.sort_by(|a, b| b.2.total_cmp(&a.2).then(a.0.cmp(&b.0)));
    for (_, u, _) in &mut truncated[..remainder] {
        *u += 1;
    }
    truncated.sort_by_key(|(i, ..)| *i);
    truncated.iter().map(|(_, u, _)| *u).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockConfig, MockGenome, MockHistory};
    use crate::PopulationRng;

    use std::num::NonZeroUsize;

    #[test]
    fn round_retain_sum() {
        let v = [
            5.2,
            9.5,
            2.8,
            1.3,
            2.2,
            2.7,
            6.3,
            1.0000000000001,
            0.9999999999999,
        ];
        let w = super::round_retain_sum(&v, 32);
        assert_eq!(w.iter().sum::<usize>(), 32);
        assert_eq!(w, [5, 10, 3, 1, 2, 3, 6, 1, 1]);
    }

    #[test]
    fn round_retain_sum_breaks_ties_in_order() {
        assert_eq!(super::round_retain_sum(&[1.5, 1.5, 1.0], 4), [2, 1, 1]);
        assert_eq!(super::round_retain_sum(&[10.0 / 3.0; 3], 10), [4, 3, 3]);
    }

    const GENETICS: MockConfig = MockConfig {
        spread: 0.0,
        mutation: 0.5,
    };

    fn config() -> PopulationConfig {
        PopulationConfig {
            size: NonZeroUsize::new(10).unwrap(),
            elitism: 2,
            survival_threshold: 0.5,
            sexual_reproduction_chance: 0.5,
            max_stagnation: NonZeroUsize::new(5).unwrap(),
            fitness_min_divisor: 1.0,
            ..PopulationConfig::zero()
        }
    }

    /// Two species of three genomes each, the one
    /// around 10.0 being much fitter.
    fn evaluated() -> (BTreeMap<GenomeKey, MockGenome>, SpeciesSet<MockGenome>) {
        let genomes: BTreeMap<_, _> = [
            MockGenome::evaluated(1, 0.0, 1.0),
            MockGenome::evaluated(2, 0.1, 2.0),
            MockGenome::evaluated(3, 0.2, 1.5),
            MockGenome::evaluated(4, 10.0, 9.0),
            MockGenome::evaluated(5, 10.1, 10.0),
            MockGenome::evaluated(6, 10.2, 10.0),
        ]
        .into_iter()
        .map(|g| (g.key, g))
        .collect();
        let mut species_set = SpeciesSet::new();
        species_set.speciate(&genomes, 0, 1.0, &GENETICS, &mut ReporterSet::new());
        (genomes, species_set)
    }

    fn reproduce(
        genomes: &BTreeMap<GenomeKey, MockGenome>,
        species_set: &mut SpeciesSet<MockGenome>,
        config: &PopulationConfig,
    ) -> BTreeMap<GenomeKey, MockGenome> {
        let mut reproduction = DefaultReproduction::new();
        reproduction.indexer = GenomeIndexer { next: 7 };
        let mut history = MockHistory::default();
        let mut rng = PopulationRng::seed_from_u64(11);
        let mut factory =
            OffspringFactory::<MockGenome, _>::new(&mut history, &GENETICS, config, &mut rng);
        reproduction
            .reproduce(
                &mut factory,
                genomes,
                species_set,
                &mut Stagnation::new(),
                0,
                &mut ReporterSet::new(),
            )
            .unwrap()
    }

    #[test]
    fn offspring_fill_the_population() {
        let (genomes, mut species_set) = evaluated();
        let offspring = reproduce(&genomes, &mut species_set, &config());
        assert_eq!(offspring.len(), 10);
    }

    #[test]
    fn fitter_species_get_more_offspring() {
        let (genomes, mut species_set) = evaluated();
        reproduce(&genomes, &mut species_set, &config());

        let low = species_set.get(SpeciesID(0, 0)).unwrap();
        let high = species_set.get(SpeciesID(0, 1)).unwrap();
        assert_eq!(low.adjusted_fitness(), Some(0.5 / 9.0));
        assert_eq!(high.adjusted_fitness(), Some((29.0 / 3.0 - 1.0) / 9.0));
    }

    #[test]
    fn elites_are_carried_over_unchanged() {
        let (genomes, mut species_set) = evaluated();
        let offspring = reproduce(&genomes, &mut species_set, &config());

        // Top two of the fitter species: 5 and 6 tie, and 4 is third.
        assert_eq!(offspring.get(&5), genomes.get(&5));
        assert_eq!(offspring.get(&6), genomes.get(&6));
        assert!(!offspring.contains_key(&4));
        // New keys continue from the indexer.
        assert!(offspring.keys().filter(|k| **k >= 7).count() >= 6);
    }

    #[test]
    fn elitism_is_bounded_by_allotment() {
        let (genomes, mut species_set) = evaluated();
        let config = PopulationConfig {
            size: NonZeroUsize::new(1).unwrap(),
            elitism: 3,
            ..config()
        };
        let offspring = reproduce(&genomes, &mut species_set, &config);
        assert_eq!(offspring.keys().copied().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn missing_fitness_is_an_error() {
        let (mut genomes, mut species_set) = evaluated();
        genomes.get_mut(&3).unwrap().fitness = None;

        let mut reproduction = DefaultReproduction::new();
        let mut history = MockHistory::default();
        let mut rng = PopulationRng::seed_from_u64(0);
        let config = config();
        let mut factory =
            OffspringFactory::<MockGenome, _>::new(&mut history, &GENETICS, &config, &mut rng);
        let result = reproduction.reproduce(
            &mut factory,
            &genomes,
            &mut species_set,
            &mut Stagnation::new(),
            0,
            &mut ReporterSet::new(),
        );
        assert!(matches!(result, Err(EvolutionError::MissingFitness { key: 3 })));
    }
}
