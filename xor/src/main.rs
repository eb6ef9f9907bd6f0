mod network;

use network::FeedForwardNetwork;

use neatgen::logging::{EvolutionLogger, ReportingLevel, Stats};
use neatgen::reporting::TracingReporter;
use neatgen::{Genome, NeatConfig, Population, ReproductionMethod};
use neatgen_nn::genomics::{GeneticConfig, History, NNGenome};

use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

use std::error::Error;
use std::fs;

type XorPopulation = Population<GeneticConfig, History, NNGenome>;

const CONFIG_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml");
const GENERATIONS: usize = 300;
const STRESS_RUNS: u64 = 200;
// Allowed error margin for neural net answers.
const ERROR_MARGIN: f32 = 0.3;

const XOR: [([f32; 2], f32); 4] = [
    ([0.0, 0.0], 0.0),
    ([0.0, 1.0], 1.0),
    ([1.0, 0.0], 1.0),
    ([1.0, 1.0], 0.0),
];

fn evaluate_xor(genome: &NNGenome, _seed: u64) -> f32 {
    let network = FeedForwardNetwork::new(genome);
    let error: f32 = XOR
        .iter()
        .map(|(input, expected)| {
            let error = (network.activate(input)[0] - expected).abs();
            if error < ERROR_MARGIN {
                0.0
            } else {
                error
            }
        })
        .sum();
    (4.0 - error).powi(2)
}

/// XOR accuracy, and a penalty on network size.
fn evaluate_xor_and_size(genome: &NNGenome, seed: u64) -> [f32; 2] {
    let size = genome.genes().filter(|g| g.enabled()).count();
    [evaluate_xor(genome, seed), -(size as f32)]
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = NeatConfig::<GeneticConfig>::from_file(CONFIG_PATH)?;

    match std::env::args().nth(1).as_deref() {
        Some("stress") => stress_test(&config),
        Some("checkpoint") => checkpoint_test(&config)?,
        Some("objectives") => objectives_test(&config)?,
        _ => single_run(&config)?,
    }
    Ok(())
}

fn report_winner(winner: Option<NNGenome>) {
    let Some(winner) = winner else {
        tracing::warn!("no genome was evaluated");
        return;
    };
    tracing::info!(key = winner.key(), fitness = ?winner.fitness(), "best genome:\n{}", winner);
    let network = FeedForwardNetwork::new(&winner);
    for (input, expected) in XOR {
        tracing::info!(?input, expected, output = network.activate(&input)[0]);
    }
}

fn single_run(config: &NeatConfig<GeneticConfig>) -> Result<(), Box<dyn Error>> {
    let mut population = XorPopulation::new(config.population.clone(), config.genome.clone());
    population.add_reporter(TracingReporter::new());
    report_winner(population.run(evaluate_xor, Some(GENERATIONS))?);
    Ok(())
}

/// Runs many differently-seeded populations in parallel, and
/// summarizes how many generations they took to solve XOR.
fn stress_test(config: &NeatConfig<GeneticConfig>) {
    let threshold = config.population.fitness_threshold;
    let generations: Vec<Option<usize>> = (0..STRESS_RUNS)
        .into_par_iter()
        .map(|seed| {
            let mut population_config = config.population.clone();
            population_config.seed = seed;
            let mut population = XorPopulation::new(population_config, config.genome.clone());
            match population.run(evaluate_xor, Some(GENERATIONS)) {
                Ok(Some(winner)) if winner.primary_fitness() >= Some(threshold) => {
                    Some(population.generation())
                }
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(seed, error = %e, "run failed");
                    None
                }
            }
        })
        .collect();

    let failures = generations.iter().filter(|g| g.is_none()).count();
    tracing::info!(
        stats = ?Stats::from(generations.iter().flatten().map(|g| *g as f32)),
        failure_rate = failures as f32 / STRESS_RUNS as f32,
        runs = STRESS_RUNS,
        "generations needed by successful runs"
    );
}

/// Evolves a population for a while, checkpoints it,
/// and checks that the restored copy evolves identically.
fn checkpoint_test(config: &NeatConfig<GeneticConfig>) -> Result<(), Box<dyn Error>> {
    const CHECKPOINT_AT: usize = 10;

    let mut population = XorPopulation::new(config.population.clone(), config.genome.clone());
    let mut logger = EvolutionLogger::new(ReportingLevel::PopulationChampion);
    for _ in 0..CHECKPOINT_AT {
        population.evaluate_fitness_parallel(evaluate_xor);
        logger.log(
            &population,
            &|g: &NNGenome| [g.primary_fitness().unwrap_or(0.0), g.genes().count() as f32],
            ["fitness", "genes"],
        );
        population.evolve()?;
    }
    if let Some(log) = logger.iter().last() {
        tracing::info!("last generation before checkpoint:\n{}", log);
    }

    let path = std::env::temp_dir().join("xor-checkpoint.ron");
    fs::write(&path, ron::to_string(&population)?)?;
    tracing::info!(path = %path.display(), generation = population.generation(), "saved checkpoint");

    let mut restored: XorPopulation = ron::from_str(&fs::read_to_string(&path)?)?;
    restored.add_reporter(TracingReporter::new());

    let winner = population.run(evaluate_xor, Some(GENERATIONS))?;
    let restored_winner = restored.run(evaluate_xor, Some(GENERATIONS))?;
    tracing::info!(
        identical = winner == restored_winner,
        generation = restored.generation(),
        "resumed run finished"
    );
    report_winner(restored_winner);
    Ok(())
}

/// Solves XOR with NSGA-II, also minimizing the number
/// of enabled connections.
fn objectives_test(config: &NeatConfig<GeneticConfig>) -> Result<(), Box<dyn Error>> {
    let mut population_config = config.population.clone();
    population_config.reproduction = ReproductionMethod::Nsga2;

    let mut population = XorPopulation::new(population_config, config.genome.clone());
    population.add_reporter(TracingReporter::new());
    report_winner(population.run(evaluate_xor_and_size, Some(GENERATIONS))?);
    Ok(())
}
