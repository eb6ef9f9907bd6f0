use super::reporting::ReporterSet;
use super::species::{Species, SpeciesID};
use crate::{Genome, GenomeKey};

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Memoizes genetic distances during a speciation pass.
///
/// Distances are keyed by the genomes' keys, which is
/// sound because keys are never reused and genomes are
/// never modified once created.
pub(crate) struct GenomeDistanceCache<'a, G: Genome> {
    distances: HashMap<(GenomeKey, GenomeKey), f32, RandomState>,
    config: &'a G::Config,
    hits: usize,
    misses: usize,
}

impl<'a, G: Genome> GenomeDistanceCache<'a, G> {
    pub(crate) fn new(config: &'a G::Config) -> GenomeDistanceCache<'a, G> {
        GenomeDistanceCache {
            distances: HashMap::default(),
            config,
            hits: 0,
            misses: 0,
        }
    }

    pub(crate) fn distance(&mut self, first: &G, second: &G) -> f32 {
        let pair = if first.key() <= second.key() {
            (first.key(), second.key())
        } else {
            (second.key(), first.key())
        };
        if let Some(d) = self.distances.get(&pair) {
            self.hits += 1;
            return *d;
        }
        self.misses += 1;
        let d = G::genetic_distance(first, second, self.config);
        self.distances.insert(pair, d);
        d
    }

    /// Mean and standard deviation of all computed distances.
    pub(crate) fn statistics(&self) -> Option<(f32, f32)> {
        if self.distances.is_empty() {
            return None;
        }
        let n = self.distances.len() as f32;
        let mean = self.distances.values().sum::<f32>() / n;
        let variance = self
            .distances
            .values()
            .map(|d| (d - mean).powi(2))
            .sum::<f32>()
            / n;
        Some((mean, variance.sqrt()))
    }
}

/// A partition of a population into species.
///
/// Species are kept in ID order, which is also the order
/// in which representatives are compared during speciation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesSet<G> {
    species: BTreeMap<SpeciesID, Species<G>>,
    genome_to_species: BTreeMap<GenomeKey, SpeciesID>,
    last_created: Option<SpeciesID>,
}

impl<G> Default for SpeciesSet<G> {
    fn default() -> SpeciesSet<G> {
        SpeciesSet {
            species: BTreeMap::new(),
            genome_to_species: BTreeMap::new(),
            last_created: None,
        }
    }
}

impl<G: Genome> SpeciesSet<G> {
    /// Creates an empty species set.
    pub fn new() -> SpeciesSet<G> {
        SpeciesSet::default()
    }

    /// Partitions `genomes` into species.
    ///
    /// Genomes are visited in key order, and each joins the
    /// first species (in ID order, followed by species created
    /// earlier in this pass) whose representative is closer than
    /// `threshold`. Genomes matching no species found a new one.
    /// Afterwards each species' representative becomes the member
    /// closest to its previous representative, and species left
    /// without members are dropped.
    ///
    /// # Examples
    /// ```
    /// use neatgen::{Genome, SpeciesSet};
    /// use neatgen::reporting::ReporterSet;
    /// use neatgen_nn::genomics::{GeneticConfig, NNGenome};
    /// use rand::SeedableRng;
    /// use std::collections::BTreeMap;
    ///
    /// let config = GeneticConfig {
    ///     initial_expression_chance: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(0);
    /// let genomes: BTreeMap<_, _> = (1..=10)
    ///     .map(|key| (key, NNGenome::new(key, &config, &mut rng)))
    ///     .collect();
    ///
    /// let mut species_set = SpeciesSet::new();
    /// species_set.speciate(&genomes, 0, 3.0, &config, &mut ReporterSet::new());
    ///
    /// // Every genome is in exactly one species.
    /// for key in genomes.keys() {
    ///     let id = species_set.species_of(*key).unwrap();
    ///     assert!(species_set.get(id).unwrap().contains(*key));
    /// }
    /// assert_eq!(species_set.iter().map(|s| s.len()).sum::<usize>(), 10);
    /// ```
    pub fn speciate(
        &mut self,
        genomes: &BTreeMap<GenomeKey, G>,
        generation: usize,
        threshold: f32,
        genetic_config: &G::Config,
        reporters: &mut ReporterSet<G>,
    ) {
        let mut cache = GenomeDistanceCache::<G>::new(genetic_config);

        // (id, previous representative, members)
        let mut candidates: Vec<(SpeciesID, G, BTreeSet<GenomeKey>)> = self
            .species
            .values()
            .map(|s| (s.id(), s.representative().clone(), BTreeSet::new()))
            .collect();
        let mut created = vec![];

        for (key, genome) in genomes {
            let found = candidates
                .iter()
                .position(|(_, representative, _)| {
                    cache.distance(representative, genome) < threshold
                });
            match found {
                Some(index) => {
                    candidates[index].2.insert(*key);
                }
                None => {
                    let id = self.next_species_id(generation);
                    candidates.push((id, genome.clone(), std::iter::once(*key).collect()));
                    created.push(id);
                }
            }
        }

        let mut species = BTreeMap::new();
        for (id, previous, members) in candidates {
            if members.is_empty() {
                tracing::debug!(species = ?id, "species left without members");
                continue;
            }
            let closest = members
                .iter()
                .map(|key| &genomes[key])
                .fold(None, |best: Option<(f32, &G)>, g| {
                    let d = cache.distance(&previous, g);
                    match best {
                        Some((best_d, _)) if best_d <= d => best,
                        _ => Some((d, g)),
                    }
                })
                .map(|(_, g)| g.clone());
            let Some(representative) = closest else {
                continue;
            };
            let mut entry = match self.species.remove(&id) {
                Some(mut existing) => {
                    existing.set_representative(representative);
                    existing
                }
                None => Species::new(id, representative),
            };
            entry.members = members;
            species.insert(id, entry);
        }

        self.species = species;
        self.genome_to_species = self
            .species
            .values()
            .flat_map(|s| s.members().map(move |key| (key, s.id())))
            .collect();

        if let Some((mean, stdev)) = cache.statistics() {
            tracing::debug!(
                mean,
                stdev,
                hits = cache.hits,
                misses = cache.misses,
                "genetic distances"
            );
        }
        tracing::debug!(
            generation,
            species = self.species.len(),
            created = created.len(),
            "speciated population"
        );
        for id in created {
            if let Some(s) = self.species.get(&id) {
                reporters.species_created(s);
            }
        }
    }

    fn next_species_id(&mut self, generation: usize) -> SpeciesID {
        let id = match self.last_created {
            Some(SpeciesID(g, index)) if g == generation => SpeciesID(generation, index + 1),
            _ => SpeciesID(generation, 0),
        };
        self.last_created = Some(id);
        id
    }

    /// Returns the species with the given ID.
    pub fn get(&self, id: SpeciesID) -> Option<&Species<G>> {
        self.species.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: SpeciesID) -> Option<&mut Species<G>> {
        self.species.get_mut(&id)
    }

    /// Returns the ID of the species containing the genome.
    pub fn species_of(&self, key: GenomeKey) -> Option<SpeciesID> {
        self.genome_to_species.get(&key).copied()
    }

    /// Returns an iterator over all species, in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Species<G>> {
        self.species.values()
    }

    /// Returns the IDs of all species, in order.
    pub fn ids(&self) -> Vec<SpeciesID> {
        self.species.keys().copied().collect()
    }

    /// Returns the number of species.
    pub fn len(&self) -> usize {
        self.species.len()
    }

    /// Returns whether there are no species.
    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    /// Removes a species and its membership records.
    pub(crate) fn remove(&mut self, id: SpeciesID) -> Option<Species<G>> {
        let removed = self.species.remove(&id)?;
        for key in removed.members() {
            self.genome_to_species.remove(&key);
        }
        Some(removed)
    }

    /// Removes every species.
    pub(crate) fn clear(&mut self) {
        self.species.clear();
        self.genome_to_species.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockConfig, MockGenome};
    use proptest::prelude::*;

    const CONFIG: MockConfig = MockConfig {
        spread: 0.0,
        mutation: 0.0,
    };

    fn population(values: &[(GenomeKey, f32)]) -> BTreeMap<GenomeKey, MockGenome> {
        values
            .iter()
            .map(|(key, value)| (*key, MockGenome::with_value(*key, *value)))
            .collect()
    }

    fn speciate(
        set: &mut SpeciesSet<MockGenome>,
        genomes: &BTreeMap<GenomeKey, MockGenome>,
        generation: usize,
    ) {
        set.speciate(genomes, generation, 1.0, &CONFIG, &mut ReporterSet::new());
    }

    #[test]
    fn partition_is_total_and_disjoint() {
        let genomes = population(&[(1, 0.0), (2, 0.5), (3, 5.0), (4, 5.2), (5, 10.0), (6, 0.9)]);
        let mut set = SpeciesSet::new();
        speciate(&mut set, &genomes, 0);

        let mut seen = BTreeSet::new();
        for species in set.iter() {
            for key in species.members() {
                assert!(seen.insert(key), "genome {} in two species", key);
                assert_eq!(set.species_of(key), Some(species.id()));
            }
        }
        assert_eq!(seen, genomes.keys().copied().collect());
        assert_eq!(set.len(), 3);
    }

    fn assert_partition(
        set: &SpeciesSet<MockGenome>,
        genomes: &BTreeMap<GenomeKey, MockGenome>,
    ) -> Result<(), TestCaseError> {
        let mut seen = BTreeSet::new();
        for species in set.iter() {
            prop_assert!(!species.is_empty());
            for key in species.members() {
                prop_assert!(seen.insert(key));
                prop_assert_eq!(set.species_of(key), Some(species.id()));
            }
        }
        prop_assert_eq!(seen, genomes.keys().copied().collect::<BTreeSet<_>>());
        Ok(())
    }

    proptest! {
        #[test]
        fn random_populations_are_partitioned(
            first in prop::collection::vec(0.0f32..20.0, 1..40),
            second in prop::collection::vec(0.0f32..20.0, 1..40),
        ) {
            let first: BTreeMap<_, _> = first
                .iter()
                .enumerate()
                .map(|(i, v)| (i + 1, MockGenome::with_value(i + 1, *v)))
                .collect();
            let offset = first.len() / 2;
            let second: BTreeMap<_, _> = second
                .iter()
                .enumerate()
                .map(|(i, v)| (offset + i + 1, MockGenome::with_value(offset + i + 1, *v)))
                .collect();

            let mut set = SpeciesSet::new();
            speciate(&mut set, &first, 0);
            assert_partition(&set, &first)?;
            speciate(&mut set, &second, 1);
            assert_partition(&set, &second)?;
        }
    }

    #[test]
    fn genomes_join_first_compatible_species() {
        // Genome 2 is compatible with both the species founded by 1
        // and the one founded by 3, and joins the older one.
        let genomes = population(&[(1, 0.0), (3, 1.5), (2, 0.8)]);
        let mut set = SpeciesSet::new();
        speciate(&mut set, &genomes, 0);

        assert_eq!(set.species_of(1), Some(SpeciesID(0, 0)));
        assert_eq!(set.species_of(2), Some(SpeciesID(0, 0)));
        assert_eq!(set.species_of(3), Some(SpeciesID(0, 1)));
    }

    #[test]
    fn representative_drifts_to_closest_member() {
        let mut set = SpeciesSet::new();
        speciate(&mut set, &population(&[(1, 0.0)]), 0);
        assert_eq!(set.get(SpeciesID(0, 0)).unwrap().representative().key, 1);

        // Genome 1 is gone; 3 is closer to the old representative than 2.
        speciate(&mut set, &population(&[(2, 0.8), (3, 0.3)]), 1);
        let species = set.get(SpeciesID(0, 0)).unwrap();
        assert_eq!(species.representative().key, 3);
        assert_eq!(species.members().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn empty_species_are_dropped() {
        let mut set = SpeciesSet::new();
        speciate(&mut set, &population(&[(1, 0.0), (2, 10.0)]), 0);
        assert_eq!(set.len(), 2);

        speciate(&mut set, &population(&[(3, 10.2)]), 1);
        assert_eq!(set.ids(), vec![SpeciesID(0, 1)]);
        assert_eq!(set.species_of(3), Some(SpeciesID(0, 1)));
    }

    #[test]
    fn species_ids_are_unique_within_a_generation() {
        let mut set = SpeciesSet::new();
        speciate(&mut set, &population(&[(1, 0.0)]), 2);
        speciate(&mut set, &population(&[(2, 0.0), (3, 50.0)]), 2);
        assert_eq!(set.ids(), vec![SpeciesID(2, 0), SpeciesID(2, 1)]);
    }

    #[test]
    fn removal_forgets_members() {
        let mut set = SpeciesSet::new();
        speciate(&mut set, &population(&[(1, 0.0), (2, 10.0)]), 0);
        let removed = set.remove(SpeciesID(0, 0)).unwrap();
        assert!(removed.contains(1));
        assert_eq!(set.species_of(1), None);
        assert_eq!(set.species_of(2), Some(SpeciesID(0, 1)));
    }

    #[test]
    fn distance_cache_is_symmetric() {
        let a = MockGenome::with_value(1, 1.0);
        let b = MockGenome::with_value(2, 4.0);
        let mut cache = GenomeDistanceCache::<MockGenome>::new(&CONFIG);
        assert_eq!(cache.distance(&a, &b), 3.0);
        assert_eq!(cache.distance(&b, &a), 3.0);
        assert_eq!((cache.hits, cache.misses), (1, 1));
        assert_eq!(cache.statistics(), Some((3.0, 0.0)));
    }
}
