use super::GenomeIndexer;
use crate::populations::errors::EvolutionError;
use crate::populations::offspring_factory::OffspringFactory;
use crate::populations::reporting::ReporterSet;
use crate::populations::species_set::SpeciesSet;
use crate::populations::stagnation::Stagnation;
use crate::populations::{PopulationConfig, SpeciesID};
use crate::{Fitness, Genome, GenomeKey};

use rand::Rng;
use serde::{Deserialize, Serialize};

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// A genome's standing in a non-dominated sort.
///
/// Ranks are negative (`-k` for the `k`-th front), so that
/// greater is better in every field.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrowdedFitness {
    pub rank: i64,
    pub crowding_distance: f32,
    pub primary: f32,
}

impl CrowdedFitness {
    /// The crowded-comparison operator: compares rank, then
    /// crowding distance, then the primary objective.
    /// `Greater` means `self` is preferred.
    ///
    /// # Examples
    /// ```
    /// use neatgen::CrowdedFitness;
    /// use std::cmp::Ordering;
    ///
    /// let front0 = CrowdedFitness { rank: 0, crowding_distance: 0.5, primary: 1.0 };
    /// let front1 = CrowdedFitness { rank: -1, crowding_distance: f32::INFINITY, primary: 9.0 };
    /// assert_eq!(front0.crowded_cmp(&front1), Ordering::Greater);
    ///
    /// let sparse = CrowdedFitness { crowding_distance: 2.0, ..front0 };
    /// assert_eq!(front0.crowded_cmp(&sparse), Ordering::Less);
    /// ```
    pub fn crowded_cmp(&self, other: &CrowdedFitness) -> Ordering {
        self.rank
            .cmp(&other.rank)
            .then(self.crowding_distance.total_cmp(&other.crowding_distance))
            .then(self.primary.total_cmp(&other.primary))
    }

    /// Standing of a genome that was never ranked.
    fn unranked() -> CrowdedFitness {
        CrowdedFitness {
            rank: i64::MIN,
            crowding_distance: 0.0,
            primary: f32::NEG_INFINITY,
        }
    }
}

/// Partitions solutions into Pareto fronts.
///
/// Returns the indices of each front, best front first, and
/// each front in increasing index order. All objectives are
/// maximized.
///
/// # Examples
/// ```
/// use neatgen::{non_dominated_sort, Fitness};
///
/// let fitnesses = [
///     Fitness::from([5.0, 1.0]),
///     Fitness::from([3.0, 4.0]),
///     Fitness::from([2.0, 1.0]),
/// ];
/// let fronts = non_dominated_sort(&fitnesses.iter().collect::<Vec<_>>());
/// assert_eq!(fronts, vec![vec![0, 1], vec![2]]);
/// ```
pub fn non_dominated_sort(fitnesses: &[&Fitness]) -> Vec<Vec<usize>> {
    let n = fitnesses.len();
    let mut dominated: Vec<Vec<usize>> = vec![vec![]; n];
    let mut domination_count = vec![0usize; n];

    for i in 0..n {
        for j in (i + 1)..n {
            if fitnesses[i].dominates(fitnesses[j]) {
                dominated[i].push(j);
                domination_count[j] += 1;
            } else if fitnesses[j].dominates(fitnesses[i]) {
                dominated[j].push(i);
                domination_count[i] += 1;
            }
        }
    }

    let mut fronts = vec![];
    let mut current: Vec<usize> = (0..n).filter(|i| domination_count[*i] == 0).collect();
    while !current.is_empty() {
        let mut next = vec![];
        for p in &current {
            for q in &dominated[*p] {
                domination_count[*q] -= 1;
                if domination_count[*q] == 0 {
                    next.push(*q);
                }
            }
        }
        next.sort_unstable();
        fronts.push(current);
        current = next;
    }
    fronts
}

/// Computes the crowding distance of every member of a front.
///
/// For each objective, the members with the extreme values get
/// an infinite distance, and every other member accumulates the
/// gap between its neighbours, normalized by the objective's range.
/// Objectives with no range add nothing.
///
/// # Examples
/// ```
/// use neatgen::{crowding_distance, Fitness};
///
/// let front = [
///     Fitness::from([0.0, 4.0]),
///     Fitness::from([1.0, 2.0]),
///     Fitness::from([3.0, 0.0]),
/// ];
/// let distances = crowding_distance(&front.iter().collect::<Vec<_>>());
/// assert_eq!(distances, vec![f32::INFINITY, 2.0, f32::INFINITY]);
/// ```
pub fn crowding_distance(front: &[&Fitness]) -> Vec<f32> {
    let n = front.len();
    if n <= 2 {
        return vec![f32::INFINITY; n];
    }

    let objectives = front[0].objectives().len();
    let mut distances = vec![0.0f32; n];
    for m in 0..objectives {
        let value = |i: usize| front[i].objectives().get(m).copied().unwrap_or(0.0);
        let mut indices: Vec<usize> = (0..n).collect();
        indices.sort_by(|a, b| value(*a).total_cmp(&value(*b)));

        distances[indices[0]] = f32::INFINITY;
        distances[indices[n - 1]] = f32::INFINITY;

        let range = value(indices[n - 1]) - value(indices[0]);
        if range > 0.0 {
            for i in 1..(n - 1) {
                let (prev, next) = (value(indices[i - 1]), value(indices[i + 1]));
                distances[indices[i]] += (next - prev) / range;
            }
        }
    }
    distances
}

/// Multi-objective reproduction by non-dominated sorting
/// and crowding distance.
///
/// The strategy keeps the previous generation's selected
/// parents, which compete with every new generation for the
/// next parent slots. [`sort`](Nsga2Reproduction::sort) must
/// run on every evaluated generation before it reproduces.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Nsga2Reproduction<G> {
    pub(super) indexer: GenomeIndexer,
    parent_pop: BTreeMap<GenomeKey, G>,
    parent_species: BTreeMap<GenomeKey, Option<SpeciesID>>,
    #[serde(skip)]
    rankings: BTreeMap<GenomeKey, CrowdedFitness>,
}

impl<G> Default for Nsga2Reproduction<G> {
    fn default() -> Nsga2Reproduction<G> {
        Nsga2Reproduction {
            indexer: GenomeIndexer::new(),
            parent_pop: BTreeMap::new(),
            parent_species: BTreeMap::new(),
            rankings: BTreeMap::new(),
        }
    }
}

impl<G: Genome> Nsga2Reproduction<G> {
    pub fn new() -> Nsga2Reproduction<G> {
        Nsga2Reproduction::default()
    }

    /// Returns the currently selected parents.
    pub fn parents(&self) -> &BTreeMap<GenomeKey, G> {
        &self.parent_pop
    }

    /// Returns the species a parent is bred in, if
    /// it is still assigned to one.
    pub fn parent_species(&self, key: GenomeKey) -> Option<SpeciesID> {
        self.parent_species.get(&key).copied().flatten()
    }

    /// Returns a parent's standing from the last sort.
    pub fn ranking(&self, key: GenomeKey) -> Option<&CrowdedFitness> {
        self.rankings.get(&key)
    }

    fn standing(&self, key: GenomeKey) -> CrowdedFitness {
        self.rankings
            .get(&key)
            .copied()
            .unwrap_or_else(CrowdedFitness::unranked)
    }

    /// Selects the next parents from the evaluated `genomes`
    /// and the current parents, and returns the best
    /// non-dominated genome among them.
    ///
    /// Stagnant species are dropped from `genomes` first,
    /// unless doing so would leave fewer than `pop_size`
    /// candidates.
    ///
    /// # Errors
    /// Returns an error if a candidate is unevaluated, or
    /// has a different number of objectives than the others.
    pub fn sort(
        &mut self,
        genomes: &BTreeMap<GenomeKey, G>,
        species_set: &mut SpeciesSet<G>,
        stagnation: &mut Stagnation,
        generation: usize,
        config: &PopulationConfig,
        reporters: &mut ReporterSet<G>,
    ) -> Result<Option<G>, EvolutionError> {
        let pop_size = config.size.get();

        let stagnant: Vec<SpeciesID> = stagnation
            .update(species_set, genomes, generation, config)
            .into_iter()
            .filter_map(|(id, stagnant)| stagnant.then(|| id))
            .collect();
        let stagnant_members: BTreeSet<GenomeKey> = stagnant
            .iter()
            .filter_map(|id| species_set.get(*id))
            .flat_map(|s| s.members())
            .collect();
        let mut removed = BTreeSet::new();
        let remaining = genomes.len().saturating_sub(stagnant_members.len());
        if remaining + self.parent_pop.len() < pop_size {
            if !stagnant.is_empty() {
                tracing::debug!(
                    species = stagnant.len(),
                    "keeping stagnant species to fill the population"
                );
            }
        } else {
            for id in stagnant {
                if let Some(species) = species_set.remove(id) {
                    reporters.species_stagnant(&species);
                }
            }
            removed = stagnant_members;
        }

        let candidates: Vec<&G> = genomes
            .values()
            .filter(|g| !removed.contains(&g.key()))
            .chain(self.parent_pop.values())
            .collect();
        let mut fitnesses = Vec::with_capacity(candidates.len());
        for genome in &candidates {
            let fitness = genome
                .fitness()
                .ok_or(EvolutionError::MissingFitness { key: genome.key() })?;
            fitnesses.push(fitness);
        }
        if let Some(expected) = fitnesses.first().map(|f| f.objectives().len()) {
            for (genome, fitness) in candidates.iter().zip(&fitnesses) {
                if fitness.objectives().len() != expected {
                    return Err(EvolutionError::ObjectiveCountMismatch {
                        key: genome.key(),
                        expected,
                        found: fitness.objectives().len(),
                    });
                }
            }
        }

        let fronts = non_dominated_sort(&fitnesses);
        let mut rankings = BTreeMap::new();
        for (k, front) in fronts.iter().enumerate() {
            let front_fitnesses: Vec<&Fitness> = front.iter().map(|i| fitnesses[*i]).collect();
            let distances = crowding_distance(&front_fitnesses);
            for (i, crowding_distance) in front.iter().zip(distances) {
                rankings.insert(
                    candidates[*i].key(),
                    CrowdedFitness {
                        rank: -(k as i64),
                        crowding_distance,
                        primary: fitnesses[*i].primary(),
                    },
                );
            }
        }
        tracing::debug!(
            candidates = candidates.len(),
            fronts = ?fronts.iter().map(Vec::len).collect::<Vec<_>>(),
            "non-dominated sort"
        );

        let mut selected = candidates;
        selected.sort_by(|a, b| {
            rankings[&b.key()]
                .crowded_cmp(&rankings[&a.key()])
                .then(a.key().cmp(&b.key()))
        });
        selected.truncate(pop_size);

        let mut parent_pop = BTreeMap::new();
        let mut parent_species = BTreeMap::new();
        for genome in selected {
            let key = genome.key();
            let species = if genomes.contains_key(&key) {
                species_set.species_of(key)
            } else {
                self.parent_species(key)
            };
            parent_species.insert(key, species.filter(|id| species_set.get(*id).is_some()));
            parent_pop.insert(key, genome.clone());
        }
        rankings.retain(|key, _| parent_pop.contains_key(key));

        let best = parent_pop
            .values()
            .filter(|g| rankings[&g.key()].rank == 0)
            .fold(None, |best: Option<&G>, g| match best {
                Some(b) if rankings[&b.key()].primary >= rankings[&g.key()].primary => Some(b),
                _ => Some(g),
            })
            .cloned();

        self.parent_pop = parent_pop;
        self.parent_species = parent_species;
        self.rankings = rankings;
        Ok(best)
    }

    /// Breeds one child per parent. Parents are grouped by
    /// species, with unassigned parents forming one more group,
    /// and each group is ranked by the crowded-comparison
    /// operator for tournament selection.
    pub(super) fn reproduce<R: Rng + ?Sized>(
        &mut self,
        factory: &mut OffspringFactory<'_, G, R>,
    ) -> Result<BTreeMap<GenomeKey, G>, EvolutionError> {
        let mut groups: BTreeMap<SpeciesID, Vec<&G>> = BTreeMap::new();
        let mut unassigned = vec![];
        for (key, genome) in &self.parent_pop {
            match self.parent_species(*key) {
                Some(id) => groups.entry(id).or_default().push(genome),
                None => unassigned.push(genome),
            }
        }

        let mut offspring = BTreeMap::new();
        for mut group in groups.into_values().chain(std::iter::once(unassigned)) {
            if group.is_empty() {
                continue;
            }
            group.sort_by(|a, b| {
                self.standing(b.key())
                    .crowded_cmp(&self.standing(a.key()))
                    .then(a.key().cmp(&b.key()))
            });
            for _ in 0..group.len() {
                let key = self.indexer.next_key();
                offspring.insert(key, factory.breed(key, &group));
            }
        }
        Ok(offspring)
    }

    /// Forgets the stored parents.
    pub fn reset(&mut self) {
        self.parent_pop.clear();
        self.parent_species.clear();
        self.rankings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockConfig, MockGenome, MockHistory};
    use crate::PopulationRng;

    use std::num::NonZeroUsize;

    const GENETICS: MockConfig = MockConfig {
        spread: 0.0,
        mutation: 0.0,
    };

    fn fitnesses(values: &[[f32; 2]]) -> Vec<Fitness> {
        values.iter().map(|v| Fitness::from(*v)).collect()
    }

    #[test]
    fn fronts_of_three() {
        let f = fitnesses(&[[5.0, 1.0], [3.0, 4.0], [2.0, 1.0]]);
        let fronts = non_dominated_sort(&f.iter().collect::<Vec<_>>());
        assert_eq!(fronts, vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn chain_of_fronts() {
        let f = fitnesses(&[[1.0, 1.0], [3.0, 3.0], [2.0, 2.0], [3.0, 3.0]]);
        let fronts = non_dominated_sort(&f.iter().collect::<Vec<_>>());
        assert_eq!(fronts, vec![vec![1, 3], vec![2], vec![0]]);
    }

    #[test]
    fn crowding_extremes_are_infinite() {
        let f = fitnesses(&[[1.0, 4.0], [2.0, 3.0], [4.0, 1.0], [3.0, 2.0]]);
        let distances = crowding_distance(&f.iter().collect::<Vec<_>>());
        assert_eq!(distances[0], f32::INFINITY);
        assert_eq!(distances[2], f32::INFINITY);
        for interior in [distances[1], distances[3]] {
            assert!(interior.is_finite() && interior >= 0.0);
            assert!((interior - 4.0 / 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn flat_objectives_add_no_distance() {
        let f = fitnesses(&[[1.0, 1.0], [1.0, 2.0], [1.0, 3.0]]);
        let distances = crowding_distance(&f.iter().collect::<Vec<_>>());
        assert_eq!(distances, vec![f32::INFINITY, 1.0, f32::INFINITY]);
    }

    #[test]
    fn small_fronts_are_all_extremes() {
        let f = fitnesses(&[[1.0, 1.0], [2.0, 0.0]]);
        assert_eq!(
            crowding_distance(&f.iter().collect::<Vec<_>>()),
            vec![f32::INFINITY; 2]
        );
        assert!(crowding_distance(&[]).is_empty());
    }

    fn population(
        entries: &[(GenomeKey, f32, [f32; 2])],
    ) -> BTreeMap<GenomeKey, MockGenome> {
        entries
            .iter()
            .map(|(key, value, objectives)| {
                (*key, MockGenome::with_objectives(*key, *value, objectives))
            })
            .collect()
    }

    fn config(size: usize) -> PopulationConfig {
        PopulationConfig {
            size: NonZeroUsize::new(size).unwrap(),
            max_stagnation: NonZeroUsize::new(1).unwrap(),
            species_elitism: 0,
            ..PopulationConfig::zero()
        }
    }

    struct Run {
        reproduction: Nsga2Reproduction<MockGenome>,
        species_set: SpeciesSet<MockGenome>,
        stagnation: Stagnation,
    }

    impl Run {
        fn new() -> Run {
            Run {
                reproduction: Nsga2Reproduction::new(),
                species_set: SpeciesSet::new(),
                stagnation: Stagnation::new(),
            }
        }

        fn sort(
            &mut self,
            genomes: &BTreeMap<GenomeKey, MockGenome>,
            generation: usize,
            config: &PopulationConfig,
        ) -> Result<Option<MockGenome>, EvolutionError> {
            let mut reporters = ReporterSet::new();
            self.species_set
                .speciate(genomes, generation, 1.0, &GENETICS, &mut reporters);
            self.reproduction.sort(
                genomes,
                &mut self.species_set,
                &mut self.stagnation,
                generation,
                config,
                &mut reporters,
            )
        }
    }

    #[test]
    fn end_to_end_selection() {
        let genomes = population(&[
            (1, 0.0, [5.0, 1.0]),
            (2, 0.1, [3.0, 4.0]),
            (3, 0.2, [2.0, 1.0]),
        ]);
        let mut run = Run::new();
        let best = run.sort(&genomes, 0, &config(3)).unwrap();

        let r = &run.reproduction;
        assert_eq!(r.parents().keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(r.ranking(1).unwrap().rank, 0);
        assert_eq!(r.ranking(2).unwrap().rank, 0);
        assert_eq!(r.ranking(3).unwrap().rank, -1);
        assert_eq!(best.map(|g| g.key), Some(1));
        assert_eq!(r.parent_species(3), Some(SpeciesID(0, 0)));
    }

    #[test]
    fn selection_keeps_the_best_fronts() {
        let genomes = population(&[
            (1, 0.0, [5.0, 1.0]),
            (2, 0.1, [3.0, 4.0]),
            (3, 0.2, [2.0, 1.0]),
            (4, 0.3, [1.0, 0.0]),
        ]);
        let mut run = Run::new();
        run.sort(&genomes, 0, &config(2)).unwrap();
        assert_eq!(
            run.reproduction.parents().keys().copied().collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn stagnation_trim_is_skipped_when_it_would_underfill() {
        let genomes = population(&[(1, 0.0, [1.0, 1.0]), (2, 0.1, [1.0, 2.0])]);
        let mut run = Run::new();
        run.sort(&genomes, 0, &config(2)).unwrap();
        run.reproduction.reset();

        // The only species has not improved, but removing it
        // would leave nothing to select from.
        run.sort(&genomes, 1, &config(2)).unwrap();
        assert_eq!(run.reproduction.parents().len(), 2);
        assert_eq!(run.species_set.len(), 1);
    }

    #[test]
    fn stagnant_children_are_trimmed_when_parents_suffice() {
        let first = population(&[
            (1, 0.0, [5.0, 1.0]),
            (2, 0.1, [3.0, 4.0]),
            (3, 0.2, [2.0, 1.0]),
        ]);
        let mut run = Run::new();
        run.sort(&first, 0, &config(3)).unwrap();

        let second = population(&[
            (4, 0.0, [1.0, 1.0]),
            (5, 0.1, [1.0, 1.0]),
            (6, 0.2, [1.0, 1.0]),
        ]);
        run.sort(&second, 1, &config(3)).unwrap();

        let r = &run.reproduction;
        assert_eq!(r.parents().keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(run.species_set.is_empty());
        assert!((1..=3).all(|key| r.parent_species(key).is_none()));
    }

    #[test]
    fn mismatched_objectives_are_rejected() {
        let mut genomes = population(&[(1, 0.0, [5.0, 1.0])]);
        genomes.insert(2, MockGenome::with_objectives(2, 0.1, &[1.0, 2.0, 3.0]));
        let mut run = Run::new();
        let result = run.sort(&genomes, 0, &config(2));
        assert!(matches!(
            result,
            Err(EvolutionError::ObjectiveCountMismatch {
                expected: 2,
                found: 3,
                ..
            })
        ));
    }

    #[test]
    fn every_parent_has_one_child() {
        let genomes = population(&[
            (1, 0.0, [5.0, 1.0]),
            (2, 0.1, [3.0, 4.0]),
            (3, 20.0, [2.0, 1.0]),
        ]);
        let mut run = Run::new();
        run.sort(&genomes, 0, &config(3)).unwrap();
        run.reproduction.indexer = GenomeIndexer { next: 4 };

        let config = PopulationConfig {
            sexual_reproduction_chance: 1.0,
            ..config(3)
        };
        let mut history = MockHistory::default();
        let mut rng = PopulationRng::seed_from_u64(5);
        let mut factory =
            OffspringFactory::<MockGenome, _>::new(&mut history, &GENETICS, &config, &mut rng);
        let children = run.reproduction.reproduce(&mut factory).unwrap();

        assert_eq!(children.keys().copied().collect::<Vec<_>>(), vec![4, 5, 6]);
        // The lone member of the second species breeds asexually.
        assert_eq!(children[&6].value, 20.0);
    }
}
