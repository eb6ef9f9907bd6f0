use neatgen::{Genome, NeatConfig, Population, PopulationConfig, ReproductionMethod};
use neatgen_nn::genomics::{GeneticConfig, History, NNGenome};

use std::num::NonZeroUsize;

type NNPopulation = Population<GeneticConfig, History, NNGenome>;

const CONFIG: &str = r#"
    [population]
    pop_size = 30
    fitness_threshold = 1000.0
    seed = 11
    compatibility_threshold = 2.5
    elitism = 1
    survival_threshold = 0.3

    [genome]
    input_count = 3
    output_count = 2
    initial_expression_chance = 0.5
    node_addition_mutation_chance = 0.3
    gene_addition_mutation_chance = 0.5
    node_deletion_mutation_chance = 0.05
    gene_deletion_mutation_chance = 0.1
"#;

fn config() -> NeatConfig<GeneticConfig> {
    NeatConfig::from_toml_str(CONFIG).unwrap()
}

/// Rewards enabled genes with positive weights, and hidden nodes.
fn structural_fitness(genome: &NNGenome, _seed: u64) -> f32 {
    let weights: f32 = genome
        .genes()
        .filter(|g| g.enabled())
        .map(|g| g.weight().max(0.0))
        .sum();
    weights + 0.5 * genome.nodes().count() as f32
}

fn two_objectives(genome: &NNGenome, seed: u64) -> [f32; 2] {
    [
        structural_fitness(genome, seed),
        -(genome.genes().count() as f32),
    ]
}

fn snapshot(population: &NNPopulation) -> String {
    ron::to_string(population.genomes()).unwrap()
}

#[test]
fn runs_are_reproducible() {
    for reproduction in [ReproductionMethod::Default, ReproductionMethod::Nsga2] {
        let NeatConfig {
            mut population,
            genome,
        } = config();
        population.reproduction = reproduction;

        let mut first = NNPopulation::new(population.clone(), genome.clone());
        let mut second = NNPopulation::new(population, genome);
        first.run(two_objectives, Some(6)).unwrap();
        second.run(two_objectives, Some(6)).unwrap();

        assert_eq!(snapshot(&first), snapshot(&second), "{:?}", reproduction);
        assert_eq!(first.generation(), 6);
    }
}

#[test]
fn different_seeds_diverge() {
    let NeatConfig {
        mut population,
        genome,
    } = config();
    let mut first = NNPopulation::new(population.clone(), genome.clone());
    population.seed += 1;
    let mut second = NNPopulation::new(population, genome);
    first.run(structural_fitness, Some(3)).unwrap();
    second.run(structural_fitness, Some(3)).unwrap();

    assert_ne!(snapshot(&first), snapshot(&second));
}

#[test]
fn checkpoint_resumes_same_run() {
    let NeatConfig { population, genome } = config();
    let mut uninterrupted = NNPopulation::new(population, genome);
    uninterrupted.run(structural_fitness, Some(4)).unwrap();

    let checkpoint = ron::to_string(&uninterrupted).unwrap();
    let mut resumed: NNPopulation = ron::from_str(&checkpoint).unwrap();
    assert_eq!(resumed.generation(), 4);
    assert_eq!(snapshot(&resumed), snapshot(&uninterrupted));

    uninterrupted.run(structural_fitness, Some(4)).unwrap();
    resumed.run(structural_fitness, Some(4)).unwrap();
    assert_eq!(snapshot(&resumed), snapshot(&uninterrupted));
    assert_eq!(
        resumed.history().max_gene_innovation(),
        uninterrupted.history().max_gene_innovation()
    );
}

#[test]
fn population_size_is_constant() {
    for reproduction in [ReproductionMethod::Default, ReproductionMethod::Nsga2] {
        let NeatConfig {
            mut population,
            genome,
        } = config();
        population.reproduction = reproduction;
        let mut population = NNPopulation::new(population, genome);

        for _ in 0..8 {
            population.evaluate_fitness(two_objectives);
            population.evolve().unwrap();
            assert_eq!(population.genomes().len(), 30, "{:?}", reproduction);
            assert!(population.genomes().values().all(|g| g.fitness().is_none()));
            assert!(population.genomes().values().all(|g| g.validate().is_ok()));
        }
    }
}

#[test]
fn species_partition_the_population() {
    let NeatConfig { population, genome } = config();
    let mut population = NNPopulation::new(population, genome);
    population.run(structural_fitness, Some(5)).unwrap();

    let mut members: Vec<_> = population
        .species()
        .iter()
        .flat_map(|s| s.members())
        .collect();
    members.sort_unstable();
    let keys: Vec<_> = population.genomes().keys().copied().collect();
    assert_eq!(members, keys);
}

#[test]
fn elites_survive_unchanged() {
    let NeatConfig {
        mut population,
        genome,
    } = config();
    population.elitism = 2;
    population.compatibility_threshold = 1000.0;
    let mut population = NNPopulation::new(population, genome);
    population.evaluate_fitness(structural_fitness);

    let mut ranked: Vec<&NNGenome> = population.genomes().values().collect();
    ranked.sort_by(|a, b| {
        b.primary_fitness()
            .unwrap_or(f32::MIN)
            .total_cmp(&a.primary_fitness().unwrap_or(f32::MIN))
            .then(a.key().cmp(&b.key()))
    });
    let elites: Vec<NNGenome> = ranked[..2].iter().map(|g| (*g).clone()).collect();

    population.evolve().unwrap();
    for elite in elites {
        let carried = population.genome(elite.key()).unwrap();
        assert!(carried.genes().eq(elite.genes()));
        assert!(carried.nodes().eq(elite.nodes()));
        assert!(carried.fitness().is_none());
    }
}

#[test]
fn run_stops_at_fitness_threshold() {
    let NeatConfig {
        mut population,
        genome,
    } = config();
    population.fitness_threshold = 1.0;
    let mut population = NNPopulation::new(population, genome);

    // Every genome has at least 5 nodes.
    let winner = population.run(structural_fitness, Some(10)).unwrap().unwrap();
    assert!(winner.primary_fitness().unwrap() >= 1.0);
    assert_eq!(population.generation(), 0);
}

#[test]
fn nsga2_keeps_non_dominated_parents() {
    let population_config = PopulationConfig {
        size: NonZeroUsize::new(20).unwrap(),
        no_fitness_termination: true,
        seed: 5,
        compatibility_threshold: 3.0,
        survival_threshold: 0.5,
        sexual_reproduction_chance: 0.5,
        tournament_size: NonZeroUsize::new(2).unwrap(),
        max_stagnation: NonZeroUsize::new(20).unwrap(),
        fitness_min_divisor: 1.0,
        reproduction: ReproductionMethod::Nsga2,
        ..PopulationConfig::zero()
    };
    let genetic_config = GeneticConfig {
        input_count: NonZeroUsize::new(2).unwrap(),
        ..GeneticConfig::default()
    };
    let mut population = NNPopulation::new(population_config, genetic_config);
    population.run(two_objectives, Some(5)).unwrap();

    let nsga2 = match population.reproduction() {
        neatgen::Reproduction::Nsga2(state) => state,
        neatgen::Reproduction::Default(_) => panic!("expected NSGA-II state"),
    };
    assert_eq!(nsga2.parents().len(), 20);
    // Every stored parent was ranked, and the first front is never empty.
    assert!(nsga2.parents().keys().all(|k| nsga2.ranking(*k).is_some()));
    assert!(nsga2
        .parents()
        .keys()
        .any(|k| nsga2.ranking(*k).map_or(false, |r| r.rank == 0)));
}

#[test]
fn unbounded_runs_need_a_threshold() {
    let NeatConfig {
        mut population,
        genome,
    } = config();
    population.no_fitness_termination = true;
    let mut population = NNPopulation::new(population, genome);
    assert!(matches!(
        population.run(structural_fitness, None),
        Err(neatgen::EvolutionError::UnboundedRun)
    ));
}
