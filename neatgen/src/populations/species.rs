use crate::{Genome, GenomeKey};

use serde::{Deserialize, Serialize};

use std::collections::{BTreeMap, BTreeSet};

/// Species identifier. Specifies
/// the generation in which the species
/// was born, and the count of other species
/// generated in the _same generation_ before
/// the one identified (i.e, if it was the
/// third species born in generation 5, it
/// will be species [5, 2]).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SpeciesID(pub usize, pub usize);

/// Species are collections of reproductively
/// compatible (within a certain [compatibility threshold])
/// genomes. Membership is determined by calculating
/// the genetic distance to a _representative_, which
/// is re-chosen every generation as the member closest
/// to the previous representative.
///
/// [compatibility threshold]: crate::PopulationConfig::compatibility_threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Species<G> {
    id: SpeciesID,
    representative: G,
    pub(super) members: BTreeSet<GenomeKey>,
    pub(super) fitness: Option<f32>,
    pub(super) adjusted_fitness: Option<f32>,
    pub(super) fitness_history: Vec<f32>,
}

impl<G: Genome> Species<G> {
    /// Creates a new species with the specified ID and
    /// representative. The representative is also added
    /// to the species' members.
    ///
    /// # Examples
    /// ```
    /// use neatgen::{Genome, Species, SpeciesID};
    /// use neatgen_nn::genomics::{GeneticConfig, NNGenome};
    /// use rand::SeedableRng;
    ///
    /// let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(0);
    /// let genome = NNGenome::new(7, &GeneticConfig::zero(), &mut rng);
    /// let species = Species::new(SpeciesID(1, 0), genome);
    ///
    /// assert_eq!(species.id(), SpeciesID(1, 0));
    /// assert_eq!(species.created(), 1);
    /// assert_eq!(species.members().collect::<Vec<_>>(), vec![7]);
    /// ```
    pub fn new(id: SpeciesID, representative: G) -> Species<G> {
        Species {
            id,
            members: std::iter::once(representative.key()).collect(),
            representative,
            fitness: None,
            adjusted_fitness: None,
            fitness_history: vec![],
        }
    }

    /// Returns the species' ID.
    pub fn id(&self) -> SpeciesID {
        self.id
    }

    /// Returns the generation the species was created in.
    pub fn created(&self) -> usize {
        self.id.0
    }

    /// Returns the species' representative.
    pub fn representative(&self) -> &G {
        &self.representative
    }

    pub(super) fn set_representative(&mut self, representative: G) {
        self.representative = representative;
    }

    /// Returns the genetic distance between the species'
    /// representative and `other`.
    pub fn genetic_distance(&self, other: &G, config: &G::Config) -> f32 {
        G::genetic_distance(&self.representative, other, config)
    }

    /// Returns an iterator over the keys of the species'
    /// members, in increasing order.
    pub fn members(&self) -> impl Iterator<Item = GenomeKey> + '_ {
        self.members.iter().copied()
    }

    /// Returns whether the genome belongs to the species.
    pub fn contains(&self, key: GenomeKey) -> bool {
        self.members.contains(&key)
    }

    /// Returns the number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns whether the species has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns the species fitness computed during the
    /// last stagnation update.
    pub fn fitness(&self) -> Option<f32> {
        self.fitness
    }

    /// Returns the species' normalized mean fitness
    /// computed during the last reproduction.
    pub fn adjusted_fitness(&self) -> Option<f32> {
        self.adjusted_fitness
    }

    /// Returns the species' fitness in every generation
    /// it has been tracked.
    pub fn fitness_history(&self) -> &[f32] {
        &self.fitness_history
    }

    /// Returns the primary fitnesses of the species' evaluated members.
    pub fn member_fitnesses(&self, genomes: &BTreeMap<GenomeKey, G>) -> Vec<f32> {
        self.members
            .iter()
            .filter_map(|key| genomes.get(key))
            .filter_map(Genome::primary_fitness)
            .collect()
    }

    /// Returns the best-performing member, ties going
    /// to the lowest key.
    pub fn champion<'a>(&self, genomes: &'a BTreeMap<GenomeKey, G>) -> Option<&'a G> {
        self.members
            .iter()
            .filter_map(|key| genomes.get(key))
            .filter(|g| g.fitness().is_some())
            .fold(None, |best: Option<&G>, g| match best {
                Some(b) if b.primary_fitness() >= g.primary_fitness() => Some(b),
                _ => Some(g),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockGenome;

    #[test]
    fn champion_prefers_lowest_key_on_ties() {
        let genomes: BTreeMap<_, _> = [
            MockGenome::evaluated(1, 0.0, 3.0),
            MockGenome::evaluated(2, 0.0, 5.0),
            MockGenome::evaluated(3, 0.0, 5.0),
            MockGenome::with_value(4, 0.0),
        ]
        .into_iter()
        .map(|g| (g.key, g))
        .collect();
        let mut species = Species::new(SpeciesID(0, 0), genomes[&1].clone());
        species.members.extend([2, 3, 4]);

        assert_eq!(species.champion(&genomes).map(|g| g.key), Some(2));
        assert_eq!(species.member_fitnesses(&genomes), vec![3.0, 5.0, 5.0]);
    }

    #[test]
    fn representative_is_a_member() {
        let species = Species::new(SpeciesID(3, 1), MockGenome::with_value(9, 1.0));
        assert!(species.contains(9));
        assert_eq!(species.len(), 1);
        assert_eq!(species.created(), 3);
    }
}
