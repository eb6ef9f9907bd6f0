use super::species::SpeciesID;
use super::species_set::SpeciesSet;
use super::PopulationConfig;
use crate::{Genome, GenomeKey};

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

/// Improvement record of a single species.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StagnationRecord {
    /// Generation in which the species fitness last improved.
    pub last_improved: usize,
    /// Best species fitness seen so far.
    pub best_fitness: Option<f32>,
}

/// Tracks species' fitness over time, flagging
/// those that stop improving.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Stagnation {
    records: BTreeMap<SpeciesID, StagnationRecord>,
}

impl Stagnation {
    pub fn new() -> Stagnation {
        Stagnation::default()
    }

    /// Returns the improvement record of a species.
    pub fn record(&self, id: SpeciesID) -> Option<&StagnationRecord> {
        self.records.get(&id)
    }

    /// Updates every species' fitness and improvement record,
    /// and returns a `(species, is_stagnant)` verdict for each
    /// species, in ID order.
    ///
    /// A species is stagnant once it has gone `max_stagnation`
    /// generations without improving, unless it is among the
    /// `species_elitism` fittest species, or flagging it would
    /// leave no more than `species_elitism` species.
    pub fn update<G: Genome>(
        &mut self,
        species_set: &mut SpeciesSet<G>,
        genomes: &BTreeMap<GenomeKey, G>,
        generation: usize,
        config: &PopulationConfig,
    ) -> Vec<(SpeciesID, bool)> {
        let ids = species_set.ids();
        let mut ranked = Vec::with_capacity(ids.len());

        for id in &ids {
            let Some(species) = species_set.get_mut(*id) else {
                continue;
            };
            let fitness = config
                .species_fitness_func
                .apply(&species.member_fitnesses(genomes))
                .unwrap_or(f32::NEG_INFINITY);
            species.fitness = Some(fitness);
            species.adjusted_fitness = None;
            species.fitness_history.push(fitness);

            let record = self.records.entry(*id).or_insert(StagnationRecord {
                last_improved: generation,
                best_fitness: None,
            });
            if record.best_fitness.map_or(true, |best| fitness > best) {
                record.best_fitness = Some(fitness);
                record.last_improved = generation;
            }
            ranked.push((*id, fitness, record.last_improved));
        }
        self.records.retain(|id, _| species_set.get(*id).is_some());

        // Ascending fitness, so the fittest species come last.
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        let species_count = ranked.len();
        let mut non_stagnant = species_count;
        let mut verdicts = BTreeMap::new();
        for (index, (id, fitness, last_improved)) in ranked.into_iter().enumerate() {
            let stagnant_time = generation.saturating_sub(last_improved);
            let mut is_stagnant = non_stagnant > config.species_elitism
                && stagnant_time >= config.max_stagnation.get();
            if species_count - index <= config.species_elitism {
                is_stagnant = false;
            }
            if is_stagnant {
                non_stagnant -= 1;
            }
            tracing::debug!(
                species = ?id,
                fitness,
                stagnant_time,
                is_stagnant,
                "stagnation check"
            );
            verdicts.insert(id, is_stagnant);
        }

        ids.into_iter()
            .filter_map(|id| verdicts.get(&id).map(|stagnant| (id, *stagnant)))
            .collect()
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }
}
