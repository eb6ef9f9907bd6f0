//! A Population is a collection of genomes.
//! These are grouped into species, which can
//! be evolved using a genome evaluation function
//! as the source of selective pressure.
mod config;
mod errors;
pub mod logging;
mod offspring_factory;
pub mod reporting;
mod reproduction;
mod species;
mod species_set;
mod stagnation;

use crate::{Fitness, Genome, GenomeKey, InnovationHistory, PopulationRng};
pub use config::{FitnessCriterion, PopulationConfig, ReproductionMethod, SpeciesFitnessFunction};
pub use errors::EvolutionError;
use offspring_factory::OffspringFactory;
use reporting::{Reporter, ReporterSet};
pub use reproduction::{
    crowding_distance, non_dominated_sort, CrowdedFitness, DefaultReproduction, GenomeIndexer,
    Nsga2Reproduction, Reproduction,
};
pub use species::{Species, SpeciesID};
pub use species_set::SpeciesSet;
pub use stagnation::{Stagnation, StagnationRecord};

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::error::Error;

/// A population of genomes.
///
/// Besides the genomes themselves, a population owns
/// everything that evolution depends on: species, stagnation
/// records, reproduction state, innovation history and the
/// random number generator. Serializing a population therefore
/// checkpoints a run, and deserializing it resumes the exact
/// same sequence of generations. Reporters are not serialized.
#[derive(Serialize, Deserialize)]
pub struct Population<C, H, G> {
    genomes: BTreeMap<GenomeKey, G>,
    species_set: SpeciesSet<G>,
    stagnation: Stagnation,
    reproduction: Reproduction<G>,
    history: H,
    generation: usize,
    best_genome: Option<G>,
    population_config: PopulationConfig,
    genetic_config: C,
    rng: PopulationRng,
    #[serde(skip, default = "ReporterSet::default")]
    reporters: ReporterSet<G>,
}

impl<C, H, G> Population<C, H, G>
where
    H: InnovationHistory<Config = C>,
    G: Genome<InnovationHistory = H, Config = C>,
{
    /// Creates a new population using the passed configurations.
    ///
    /// The type of `genetic_config` depends on the implementation
    /// of [`Genome`], and is effectively opaque to the population.
    ///
    /// [`Genome`]: crate::Genome
    ///
    /// # Examples
    /// ```
    /// # use neatgen_nn::genomics::{GeneticConfig, NNGenome as G};
    /// use neatgen::{Population, PopulationConfig};
    /// use std::num::NonZeroUsize;
    ///
    /// let pop_config = PopulationConfig {
    ///     // Set desired configuration
    ///     size: NonZeroUsize::new(10).unwrap(),
    ///     ..PopulationConfig::zero()
    /// };
    /// # let genetic_config = GeneticConfig::zero();
    ///
    /// // With `G` a suitable type implementing `Genome`...
    /// let population = Population::<_, _, G>::new(pop_config, genetic_config);
    /// assert_eq!(population.genomes().len(), 10);
    /// assert_eq!(population.generation(), 0);
    /// ```
    pub fn new(population_config: PopulationConfig, genetic_config: C) -> Population<C, H, G> {
        let mut rng = PopulationRng::seed_from_u64(population_config.seed);
        let mut reproduction = Reproduction::new(population_config.reproduction);
        let genomes =
            reproduction.create_new(&genetic_config, population_config.size.get(), &mut rng);
        let mut population = Population {
            genomes,
            species_set: SpeciesSet::new(),
            stagnation: Stagnation::new(),
            reproduction,
            history: H::new(&genetic_config),
            generation: 0,
            best_genome: None,
            population_config,
            genetic_config,
            rng,
            reporters: ReporterSet::new(),
        };
        population.speciate();
        population
    }

    /// Recreates the population from its configurations,
    /// as it was when first created. Reporters are kept.
    pub fn reset(&mut self)
    where
        C: Clone,
    {
        let reporters = std::mem::take(&mut self.reporters);
        *self = Population::new(self.population_config.clone(), self.genetic_config.clone());
        self.reporters = reporters;
    }

    /// Registers a reporter, notified of every following
    /// evolution event.
    pub fn add_reporter(&mut self, reporter: impl Reporter<G> + 'static) {
        self.reporters.add(reporter);
    }

    /// Returns the seed handed to the evaluator for the
    /// genome with the given key.
    ///
    /// Seeds depend only on the configured seed and the
    /// key, so evaluation results do not depend on the
    /// order (or thread) in which genomes are evaluated.
    pub fn evaluation_seed(&self, key: GenomeKey) -> u64 {
        self.population_config.seed.wrapping_add(key as u64)
    }

    /// Evaluates the fitness of each genome in the
    /// population using the passed evaluator.
    ///
    /// The evaluator receives each genome along with its
    /// [evaluation seed], and may return a single value
    /// or a list of objectives.
    ///
    /// [evaluation seed]: Population::evaluation_seed
    ///
    /// # Examples
    /// ```
    /// # use neatgen_nn::genomics::{GeneticConfig, NNGenome as G};
    /// use neatgen::{Genome, Population, PopulationConfig};
    ///
    /// # let genetic_config = GeneticConfig::zero();
    /// let mut population = Population::<_, _, G>::new(
    ///     PopulationConfig::zero(),
    ///     genetic_config,
    /// );
    ///
    /// population.evaluate_fitness(|genome, _seed| {
    ///     // Compute genome's fitness...
    ///     # let fitness = genome.genes().count() as f32;
    ///     fitness
    /// });
    /// assert!(population.genomes().values().all(|g| g.fitness().is_some()));
    /// ```
    pub fn evaluate_fitness<E, F>(&mut self, mut evaluator: E)
    where
        E: FnMut(&G, u64) -> F,
        F: Into<Fitness>,
    {
        let seed = self.population_config.seed;
        for (key, genome) in self.genomes.iter_mut() {
            let fitness = evaluator(genome, seed.wrapping_add(*key as u64)).into();
            genome.set_fitness(fitness);
        }
    }

    /// Evaluates the fitness of each genome with a fallible
    /// evaluator.
    ///
    /// # Errors
    /// Stops at the first failed evaluation, and returns
    /// its error. Genomes evaluated before the failure keep
    /// their fitness.
    ///
    /// # Examples
    /// ```
    /// # use neatgen_nn::genomics::{GeneticConfig, NNGenome as G};
    /// use neatgen::{EvolutionError, Population, PopulationConfig};
    ///
    /// # let genetic_config = GeneticConfig::zero();
    /// let mut population = Population::<_, _, G>::new(PopulationConfig::zero(), genetic_config);
    ///
    /// let result = population.try_evaluate_fitness(|_, _| "not a number".parse::<f32>());
    /// assert!(matches!(result, Err(EvolutionError::Evaluation { key: 1, .. })));
    /// ```
    pub fn try_evaluate_fitness<E, F, X>(&mut self, mut evaluator: E) -> Result<(), EvolutionError>
    where
        E: FnMut(&G, u64) -> Result<F, X>,
        F: Into<Fitness>,
        X: Into<Box<dyn Error + Send + Sync>>,
    {
        let seed = self.population_config.seed;
        for (key, genome) in self.genomes.iter_mut() {
            let fitness = evaluator(genome, seed.wrapping_add(*key as u64))
                .map_err(|e| EvolutionError::Evaluation {
                    key: *key,
                    source: e.into(),
                })?
                .into();
            genome.set_fitness(fitness);
        }
        Ok(())
    }

    /// Evaluates the fitness of each genome in parallel.
    ///
    /// Each genome still receives its own [evaluation seed],
    /// so the results are identical to those of
    /// [`evaluate_fitness`] for any number of threads.
    ///
    /// [evaluation seed]: Population::evaluation_seed
    /// [`evaluate_fitness`]: Population::evaluate_fitness
    #[cfg(feature = "parallel")]
    pub fn evaluate_fitness_parallel<E, F>(&mut self, evaluator: E)
    where
        G: Send + Sync,
        E: Fn(&G, u64) -> F + Sync,
        F: Into<Fitness>,
    {
        use rayon::prelude::*;

        let seed = self.population_config.seed;
        self.genomes.par_iter_mut().for_each(|(key, genome)| {
            let fitness = evaluator(genome, seed.wrapping_add(*key as u64)).into();
            genome.set_fitness(fitness);
        });
    }

    /// Sets the fitness of a single genome.
    ///
    /// # Errors
    /// Returns an error if no genome has the given key.
    pub fn assign_fitness(
        &mut self,
        key: GenomeKey,
        fitness: impl Into<Fitness>,
    ) -> Result<(), EvolutionError> {
        let genome = self
            .genomes
            .get_mut(&key)
            .ok_or(EvolutionError::UnknownGenome { key })?;
        genome.set_fitness(fitness.into());
        Ok(())
    }

    /// Evolves the population into its next generation.
    ///
    /// The configured reproduction strategy ranks the evaluated
    /// genomes, removes stagnant species, and breeds the next
    /// generation, which is then re-speciated. All new genomes
    /// (including carried over elites) need evaluating before
    /// the next call.
    ///
    /// If stagnation removes every species, the population
    /// is either replaced by a new random one, or evolution
    /// fails, as set by [`reset_on_extinction`].
    ///
    /// # Errors
    /// Returns an error if any genome has not been evaluated,
    /// if multi-objective fitnesses differ in length, or on
    /// complete extinction without reset.
    ///
    /// [`reset_on_extinction`]: PopulationConfig::reset_on_extinction
    ///
    /// # Examples
    /// ```
    /// # use neatgen_nn::genomics::{GeneticConfig, NNGenome as G};
    /// use neatgen::{Population, PopulationConfig};
    /// use std::num::NonZeroUsize;
    ///
    /// # let genetic_config = GeneticConfig::zero();
    /// // With `G` a suitable type implementing `Genome`...
    /// let mut population = Population::<_, _, G>::new(
    ///     PopulationConfig {
    ///         size: NonZeroUsize::new(5).unwrap(),
    ///         survival_threshold: 1.0,
    ///         compatibility_threshold: 1.0,
    ///         fitness_min_divisor: 1.0,
    ///         max_stagnation: NonZeroUsize::new(15).unwrap(),
    ///         ..PopulationConfig::zero()
    ///     },
    ///     genetic_config,
    /// );
    ///
    /// // Evolution requires every genome to be evaluated.
    /// assert!(population.evolve().is_err());
    ///
    /// population.evaluate_fitness(|_, _| 1.0_f32);
    /// population.evolve().unwrap();
    /// assert_eq!(population.generation(), 1);
    /// assert_eq!(population.genomes().len(), 5);
    /// ```
    pub fn evolve(&mut self) -> Result<(), EvolutionError> {
        if let Some(genome) = self.genomes.values().find(|g| g.fitness().is_none()) {
            return Err(EvolutionError::MissingFitness { key: genome.key() });
        }

        let best = self.reproduction.sort(
            &self.genomes,
            &mut self.species_set,
            &mut self.stagnation,
            self.generation,
            &self.population_config,
            &mut self.reporters,
        )?;
        if let Some(best) = best {
            self.track_best(&best);
            self.reporters
                .post_evaluate(&self.genomes, &self.species_set, &best);
        }

        let mut factory = OffspringFactory::new(
            &mut self.history,
            &self.genetic_config,
            &self.population_config,
            &mut self.rng,
        );
        let mut offspring = self.reproduction.reproduce(
            &mut factory,
            &self.genomes,
            &mut self.species_set,
            &mut self.stagnation,
            self.generation,
            &mut self.reporters,
        )?;

        if offspring.is_empty() {
            self.reporters.complete_extinction(self.generation);
            if !self.population_config.reset_on_extinction {
                return Err(EvolutionError::CompleteExtinction {
                    generation: self.generation,
                });
            }
            self.species_set.clear();
            self.stagnation.clear();
            self.reproduction.reset();
            offspring = self.reproduction.create_new(
                &self.genetic_config,
                self.population_config.size.get(),
                &mut self.rng,
            );
            self.reporters
                .info("population replaced by new random genomes after extinction");
        }

        for genome in offspring.values_mut() {
            genome.clear_fitness();
        }
        self.genomes = offspring;

        let completed = self.generation;
        self.generation += 1;
        self.speciate();
        self.reporters
            .end_generation(completed, &self.genomes, &self.species_set);
        Ok(())
    }

    /// Runs evaluation and evolution until either the
    /// [fitness criterion] reaches the [fitness threshold],
    /// or `generations` generations have been evaluated.
    ///
    /// Returns the genome that met the threshold, or
    /// else the best genome seen during the run.
    ///
    /// # Errors
    /// Returns any error raised by [`evolve`], and
    /// rejects unlimited runs when fitness-based
    /// termination is disabled.
    ///
    /// [fitness criterion]: PopulationConfig::fitness_criterion
    /// [fitness threshold]: PopulationConfig::fitness_threshold
    /// [`evolve`]: Population::evolve
    ///
    /// # Examples
    /// ```
    /// # use neatgen_nn::genomics::{GeneticConfig, NNGenome as G};
    /// use neatgen::{Genome, Population, PopulationConfig};
    ///
    /// # let genetic_config = GeneticConfig::zero();
    /// let mut population = Population::<_, _, G>::new(
    ///     PopulationConfig {
    ///         fitness_threshold: 1.0,
    ///         ..PopulationConfig::zero()
    ///     },
    ///     genetic_config,
    /// );
    ///
    /// let winner = population.run(|_, _| 1.0_f32, Some(10)).unwrap().unwrap();
    /// assert_eq!(winner.primary_fitness(), Some(1.0));
    /// assert_eq!(population.generation(), 0);
    /// ```
    pub fn run<E, F>(
        &mut self,
        mut evaluator: E,
        generations: Option<usize>,
    ) -> Result<Option<G>, EvolutionError>
    where
        E: FnMut(&G, u64) -> F,
        F: Into<Fitness>,
    {
        if generations.is_none() && self.population_config.no_fitness_termination {
            return Err(EvolutionError::UnboundedRun);
        }

        let mut evaluated = 0;
        while generations.map_or(true, |n| evaluated < n) {
            self.reporters.start_generation(self.generation);
            self.evaluate_fitness(&mut evaluator);
            evaluated += 1;

            if !self.population_config.no_fitness_termination {
                let reached = self
                    .fitness_criterion_value()
                    .map_or(false, |v| v >= self.population_config.fitness_threshold);
                if reached {
                    if let Some(champion) = self.champion().cloned() {
                        self.track_best(&champion);
                        self.reporters.found_solution(self.generation, &champion);
                        return Ok(Some(champion));
                    }
                }
            }

            self.evolve()?;
        }
        Ok(self.best_genome.clone())
    }

    /// Summarizes the primary fitness of all evaluated
    /// genomes with the configured criterion.
    fn fitness_criterion_value(&self) -> Option<f32> {
        let values: Vec<f32> = self
            .genomes
            .values()
            .filter_map(Genome::primary_fitness)
            .collect();
        if values.is_empty() {
            return None;
        }
        Some(match self.population_config.fitness_criterion {
            FitnessCriterion::Max => values.iter().copied().fold(f32::MIN, f32::max),
            FitnessCriterion::Min => values.iter().copied().fold(f32::MAX, f32::min),
            FitnessCriterion::Mean => values.iter().sum::<f32>() / values.len() as f32,
        })
    }

    /// Replaces the best genome seen so far if
    /// `candidate` is strictly fitter.
    fn track_best(&mut self, candidate: &G) {
        let improved = match &self.best_genome {
            Some(best) => candidate.primary_fitness() > best.primary_fitness(),
            None => candidate.fitness().is_some(),
        };
        if improved {
            self.reporters.new_best_genome(self.generation, candidate);
            self.best_genome = Some(candidate.clone());
        }
    }

    fn speciate(&mut self) {
        self.species_set.speciate(
            &self.genomes,
            self.generation,
            self.population_config.compatibility_threshold,
            &self.genetic_config,
            &mut self.reporters,
        );
    }

    /// Returns the current generation's fittest evaluated
    /// genome, by primary fitness, or `None` if no genome
    /// has been evaluated yet.
    ///
    /// # Examples
    /// ```
    /// # use neatgen_nn::genomics::{GeneticConfig, NNGenome as G};
    /// use neatgen::{Genome, Population, PopulationConfig};
    /// use std::num::NonZeroUsize;
    ///
    /// # let genetic_config = GeneticConfig::zero();
    /// let mut population = Population::<_, _, G>::new(
    ///     PopulationConfig {
    ///         size: NonZeroUsize::new(4).unwrap(),
    ///         ..PopulationConfig::zero()
    ///     },
    ///     genetic_config,
    /// );
    /// assert!(population.champion().is_none());
    ///
    /// population.evaluate_fitness(|g, _| g.key() as f32);
    /// assert_eq!(population.champion().map(|g| g.key()), Some(4));
    /// ```
    pub fn champion(&self) -> Option<&G> {
        let mut champion: Option<(&G, f32)> = None;
        for genome in self.genomes.values() {
            if let Some(fitness) = genome.primary_fitness() {
                if champion.map_or(true, |(_, best)| fitness > best) {
                    champion = Some((genome, fitness));
                }
            }
        }
        champion.map(|(g, _)| g)
    }

    /// Returns the fittest genome seen during evolution,
    /// as ranked when each generation was evolved.
    pub fn best_genome(&self) -> Option<&G> {
        self.best_genome.as_ref()
    }

    /// Returns the current generation's genomes, by key.
    pub fn genomes(&self) -> &BTreeMap<GenomeKey, G> {
        &self.genomes
    }

    pub fn genome(&self, key: GenomeKey) -> Option<&G> {
        self.genomes.get(&key)
    }

    /// Returns the current species partition.
    ///
    /// # Examples
    /// ```
    /// # use neatgen_nn::genomics::{GeneticConfig, NNGenome as G};
    /// use neatgen::{Population, PopulationConfig};
    /// use std::num::NonZeroUsize;
    ///
    /// # let genetic_config = GeneticConfig::zero();
    /// let population = Population::<_, _, G>::new(
    ///     PopulationConfig {
    ///         size: NonZeroUsize::new(6).unwrap(),
    ///         compatibility_threshold: 1.0,
    ///         ..PopulationConfig::zero()
    ///     },
    ///     genetic_config,
    /// );
    /// // Genomes without genes are all identical.
    /// assert_eq!(population.species().len(), 1);
    /// ```
    pub fn species(&self) -> &SpeciesSet<G> {
        &self.species_set
    }

    pub fn stagnation(&self) -> &Stagnation {
        &self.stagnation
    }

    pub fn reproduction(&self) -> &Reproduction<G> {
        &self.reproduction
    }

    /// Returns the current generation number, starting at 0.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Returns the population's innovation history.
    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn config(&self) -> &PopulationConfig {
        &self.population_config
    }

    pub fn genetic_config(&self) -> &C {
        &self.genetic_config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockConfig, MockGenome, MockHistory};

    use std::cell::RefCell;
    use std::num::NonZeroUsize;
    use std::rc::Rc;

    type MockPopulation = Population<MockConfig, MockHistory, MockGenome>;

    const GENETICS: MockConfig = MockConfig {
        spread: 10.0,
        mutation: 0.5,
    };

    fn config() -> PopulationConfig {
        PopulationConfig {
            size: NonZeroUsize::new(20).unwrap(),
            seed: 7,
            compatibility_threshold: 2.0,
            elitism: 1,
            survival_threshold: 0.5,
            sexual_reproduction_chance: 0.5,
            tournament_size: NonZeroUsize::new(2).unwrap(),
            species_elitism: 1,
            max_stagnation: NonZeroUsize::new(10).unwrap(),
            fitness_min_divisor: 1.0,
            fitness_threshold: f32::MAX,
            ..PopulationConfig::zero()
        }
    }

    /// Closer to 5.0 is better.
    fn target(genome: &MockGenome, _: u64) -> f32 {
        10.0 - (genome.value - 5.0).abs()
    }

    #[derive(Clone, Default)]
    struct Events(Rc<RefCell<Vec<String>>>);

    impl Reporter<MockGenome> for Events {
        fn start_generation(&mut self, generation: usize) {
            self.0.borrow_mut().push(format!("start {}", generation));
        }

        fn end_generation(
            &mut self,
            generation: usize,
            _: &BTreeMap<GenomeKey, MockGenome>,
            _: &SpeciesSet<MockGenome>,
        ) {
            self.0.borrow_mut().push(format!("end {}", generation));
        }

        fn complete_extinction(&mut self, generation: usize) {
            self.0.borrow_mut().push(format!("extinction {}", generation));
        }

        fn found_solution(&mut self, generation: usize, _: &MockGenome) {
            self.0.borrow_mut().push(format!("solution {}", generation));
        }
    }

    #[test]
    fn initial_population_is_speciated() {
        let population = MockPopulation::new(config(), GENETICS);
        assert_eq!(population.genomes().len(), 20);
        assert_eq!(
            population.genomes().keys().copied().collect::<Vec<_>>(),
            (1..=20).collect::<Vec<_>>()
        );
        let total: usize = population.species().iter().map(Species::len).sum();
        assert_eq!(total, 20);
        assert!(population.genomes().values().all(|g| g.fitness.is_none()));
    }

    #[test]
    fn evaluation_seeds_offset_by_key() {
        let mut population = MockPopulation::new(config(), GENETICS);
        let mut seeds = vec![];
        population.evaluate_fitness(|g, seed| {
            seeds.push((g.key, seed));
            0.0_f32
        });
        assert!(seeds.iter().all(|(key, seed)| *seed == 7 + *key as u64));
        assert_eq!(population.evaluation_seed(3), 10);
    }

    #[test]
    fn size_is_kept_across_generations() {
        let mut population = MockPopulation::new(config(), GENETICS);
        for generation in 0..10 {
            assert_eq!(population.generation(), generation);
            population.evaluate_fitness(target);
            population.evolve().unwrap();
            assert_eq!(population.genomes().len(), 20);
            assert!(population.genomes().values().all(|g| g.fitness.is_none()));
        }
    }

    #[test]
    fn same_seed_same_run() {
        let run = || {
            let mut population = MockPopulation::new(config(), GENETICS);
            for _ in 0..5 {
                population.evaluate_fitness(target);
                population.evolve().unwrap();
            }
            population.genomes().clone()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn best_genome_never_gets_worse() {
        let mut population = MockPopulation::new(config(), GENETICS);
        let mut best = f32::MIN;
        for _ in 0..8 {
            population.evaluate_fitness(target);
            population.evolve().unwrap();
            let current = population.best_genome().and_then(Genome::primary_fitness).unwrap();
            assert!(current >= best);
            best = current;
        }
    }

    #[test]
    fn unevaluated_genomes_block_evolution() {
        let mut population = MockPopulation::new(config(), GENETICS);
        population.evaluate_fitness(target);
        population.genomes.get_mut(&4).unwrap().fitness = None;
        assert!(matches!(
            population.evolve(),
            Err(EvolutionError::MissingFitness { key: 4 })
        ));
    }

    #[test]
    fn fitness_can_be_assigned_by_key() {
        let mut population = MockPopulation::new(config(), GENETICS);
        population.assign_fitness(2, 3.0_f32).unwrap();
        assert_eq!(population.genome(2).unwrap().fitness, Some(Fitness::Scalar(3.0)));
        assert!(matches!(
            population.assign_fitness(99, 1.0_f32),
            Err(EvolutionError::UnknownGenome { key: 99 })
        ));
    }

    #[test]
    fn run_stops_at_threshold() {
        let mut population = MockPopulation::new(
            PopulationConfig {
                fitness_threshold: 9.5,
                ..config()
            },
            GENETICS,
        );
        let events = Events::default();
        population.add_reporter(events.clone());

        let winner = population.run(target, Some(200)).unwrap().unwrap();
        assert!(winner.primary_fitness().unwrap() >= 9.5);
        let log = events.0.borrow();
        assert_eq!(
            log.last().cloned(),
            Some(format!("solution {}", population.generation()))
        );
        assert_eq!(log.first().cloned(), Some("start 0".to_string()));
    }

    #[test]
    fn mean_criterion() {
        let mut population = MockPopulation::new(
            PopulationConfig {
                fitness_criterion: FitnessCriterion::Mean,
                fitness_threshold: 2.0,
                ..config()
            },
            GENETICS,
        );
        // Every genome scores 2.0, so the mean reaches the threshold.
        let winner = population.run(|_, _| 2.0_f32, Some(3)).unwrap();
        assert!(winner.is_some());
        assert_eq!(population.generation(), 0);
    }

    #[test]
    fn run_without_any_limit_is_rejected() {
        let mut population = MockPopulation::new(
            PopulationConfig {
                no_fitness_termination: true,
                ..config()
            },
            GENETICS,
        );
        assert!(matches!(
            population.run(target, None),
            Err(EvolutionError::UnboundedRun)
        ));

        let best = population.run(target, Some(3)).unwrap();
        assert!(best.is_some());
        assert_eq!(population.generation(), 3);
    }

    /// Identical genomes, all in a single species.
    const CLONES: MockConfig = MockConfig {
        spread: 0.0,
        mutation: 0.0,
    };

    fn stagnating_config(reset_on_extinction: bool) -> PopulationConfig {
        PopulationConfig {
            max_stagnation: NonZeroUsize::new(1).unwrap(),
            species_elitism: 0,
            reset_on_extinction,
            ..config()
        }
    }

    #[test]
    fn extinction_is_an_error_without_reset() {
        let mut population = MockPopulation::new(stagnating_config(false), CLONES);
        let events = Events::default();
        population.add_reporter(events.clone());

        // Constant fitness never improves, so the only
        // species stagnates in generation 1.
        population.evaluate_fitness(|_, _| 1.0_f32);
        population.evolve().unwrap();
        population.evaluate_fitness(|_, _| 1.0_f32);
        assert!(matches!(
            population.evolve(),
            Err(EvolutionError::CompleteExtinction { generation: 1 })
        ));
        assert!(events.0.borrow().contains(&"extinction 1".to_string()));
    }

    #[test]
    fn extinction_resets_when_configured() {
        let mut population = MockPopulation::new(stagnating_config(true), CLONES);
        for _ in 0..2 {
            population.evaluate_fitness(|_, _| 1.0_f32);
            population.evolve().unwrap();
        }
        assert_eq!(population.generation(), 2);
        assert_eq!(population.genomes().len(), 20);
        // Fresh genomes get fresh keys.
        assert!(population.genomes().keys().all(|k| *k > 20));
        assert!(!population.species().is_empty());
    }

    #[test]
    fn reset_keeps_reporters() {
        let mut population = MockPopulation::new(config(), GENETICS);
        let events = Events::default();
        population.add_reporter(events.clone());
        population.evaluate_fitness(target);
        population.evolve().unwrap();

        population.reset();
        assert_eq!(population.generation(), 0);
        assert!(population.best_genome().is_none());
        population.evaluate_fitness(target);
        population.evolve().unwrap();
        assert_eq!(events.0.borrow().len(), 2);
    }

    #[test]
    fn nsga2_population_keeps_its_size() {
        let mut population = MockPopulation::new(
            PopulationConfig {
                reproduction: ReproductionMethod::Nsga2,
                ..config()
            },
            GENETICS,
        );
        for _ in 0..5 {
            population.evaluate_fitness(|g, _| vec![g.value, 10.0 - g.value]);
            population.evolve().unwrap();
            assert_eq!(population.genomes().len(), 20);
        }
        match population.reproduction() {
            Reproduction::Nsga2(r) => assert_eq!(r.parents().len(), 20),
            Reproduction::Default(_) => panic!("wrong reproduction strategy"),
        }
    }
}
