//! Observers of a population's evolution.
//!
//! A [`Reporter`] is notified at fixed points of every
//! generation. Every hook has a no-op default, so
//! implementors only override what they need.
//!
//! # Examples
//! ```
//! use neatgen::reporting::Reporter;
//! use neatgen::Genome;
//!
//! /// Counts the species created during a run.
//! #[derive(Default)]
//! struct SpeciesCounter {
//!     created: usize,
//! }
//!
//! impl<G: Genome> Reporter<G> for SpeciesCounter {
//!     fn species_created(&mut self, _: &neatgen::Species<G>) {
//!         self.created += 1;
//!     }
//! }
//! ```
use super::logging::Stats;
use super::species::Species;
use super::species_set::SpeciesSet;
use crate::{Genome, GenomeKey};

use std::collections::BTreeMap;
use std::time::Instant;

/// Hooks called by a [`Population`](crate::Population)
/// during evolution.
pub trait Reporter<G> {
    /// Called at the start of every generation in
    /// [`Population::run`](crate::Population::run).
    fn start_generation(&mut self, _generation: usize) {}

    /// Called once every genome has been evaluated,
    /// with the best genome of the generation.
    fn post_evaluate(
        &mut self,
        _genomes: &BTreeMap<GenomeKey, G>,
        _species: &SpeciesSet<G>,
        _best: &G,
    ) {
    }

    /// Called after the next generation has been speciated.
    fn end_generation(
        &mut self,
        _generation: usize,
        _genomes: &BTreeMap<GenomeKey, G>,
        _species: &SpeciesSet<G>,
    ) {
    }

    fn species_created(&mut self, _species: &Species<G>) {}

    /// Called when a species is removed for stagnating.
    fn species_stagnant(&mut self, _species: &Species<G>) {}

    /// Called when a genome beats the best fitness seen so far.
    fn new_best_genome(&mut self, _generation: usize, _genome: &G) {}

    fn complete_extinction(&mut self, _generation: usize) {}

    /// Called when the fitness criterion reaches the
    /// configured threshold.
    fn found_solution(&mut self, _generation: usize, _genome: &G) {}

    fn info(&mut self, _message: &str) {}
}

/// A collection of reporters, all notified of every event.
pub struct ReporterSet<G> {
    reporters: Vec<Box<dyn Reporter<G>>>,
}

impl<G> Default for ReporterSet<G> {
    fn default() -> ReporterSet<G> {
        ReporterSet { reporters: vec![] }
    }
}

impl<G: Genome> ReporterSet<G> {
    pub fn new() -> ReporterSet<G> {
        ReporterSet::default()
    }

    pub fn add(&mut self, reporter: impl Reporter<G> + 'static) {
        self.reporters.push(Box::new(reporter));
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }

    pub fn start_generation(&mut self, generation: usize) {
        for r in &mut self.reporters {
            r.start_generation(generation);
        }
    }

    pub fn post_evaluate(
        &mut self,
        genomes: &BTreeMap<GenomeKey, G>,
        species: &SpeciesSet<G>,
        best: &G,
    ) {
        for r in &mut self.reporters {
            r.post_evaluate(genomes, species, best);
        }
    }

    pub fn end_generation(
        &mut self,
        generation: usize,
        genomes: &BTreeMap<GenomeKey, G>,
        species: &SpeciesSet<G>,
    ) {
        for r in &mut self.reporters {
            r.end_generation(generation, genomes, species);
        }
    }

    pub fn species_created(&mut self, species: &Species<G>) {
        for r in &mut self.reporters {
            r.species_created(species);
        }
    }

    pub fn species_stagnant(&mut self, species: &Species<G>) {
        for r in &mut self.reporters {
            r.species_stagnant(species);
        }
    }

    pub fn new_best_genome(&mut self, generation: usize, genome: &G) {
        for r in &mut self.reporters {
            r.new_best_genome(generation, genome);
        }
    }

    pub fn complete_extinction(&mut self, generation: usize) {
        for r in &mut self.reporters {
            r.complete_extinction(generation);
        }
    }

    pub fn found_solution(&mut self, generation: usize, genome: &G) {
        for r in &mut self.reporters {
            r.found_solution(generation, genome);
        }
    }

    pub fn info(&mut self, message: &str) {
        for r in &mut self.reporters {
            r.info(message);
        }
    }
}

/// Emits every event as a [`tracing`] event.
///
/// Generation summaries are logged at `INFO`, per-species
/// detail at `DEBUG`, and stagnation and extinction at `WARN`.
#[derive(Debug, Default)]
pub struct TracingReporter {
    generation: usize,
    generation_start: Option<Instant>,
}

impl TracingReporter {
    pub fn new() -> TracingReporter {
        TracingReporter::default()
    }
}

impl<G: Genome> Reporter<G> for TracingReporter {
    fn start_generation(&mut self, generation: usize) {
        self.generation = generation;
        self.generation_start = Some(Instant::now());
        tracing::info!(generation, "running generation");
    }

    fn post_evaluate(
        &mut self,
        genomes: &BTreeMap<GenomeKey, G>,
        species: &SpeciesSet<G>,
        best: &G,
    ) {
        let fitness = Stats::from(genomes.values().filter_map(Genome::primary_fitness));
        tracing::info!(
            generation = self.generation,
            mean = fitness.mean,
            median = fitness.median,
            maximum = fitness.maximum,
            best_key = best.key(),
            best_species = ?species.species_of(best.key()),
            "population fitness"
        );
    }

    fn end_generation(
        &mut self,
        generation: usize,
        genomes: &BTreeMap<GenomeKey, G>,
        species: &SpeciesSet<G>,
    ) {
        for s in species.iter() {
            tracing::debug!(
                species = ?s.id(),
                age = generation.saturating_sub(s.created()),
                size = s.len(),
                fitness = ?s.fitness(),
                adjusted_fitness = ?s.adjusted_fitness(),
                "species summary"
            );
        }
        let elapsed = self.generation_start.take().map(|start| start.elapsed());
        tracing::info!(
            generation,
            genomes = genomes.len(),
            species = species.len(),
            ?elapsed,
            "generation complete"
        );
    }

    fn species_created(&mut self, species: &Species<G>) {
        tracing::debug!(species = ?species.id(), "new species");
    }

    fn species_stagnant(&mut self, species: &Species<G>) {
        tracing::warn!(
            species = ?species.id(),
            size = species.len(),
            "removing stagnated species"
        );
    }

    fn new_best_genome(&mut self, generation: usize, genome: &G) {
        tracing::info!(
            generation,
            key = genome.key(),
            fitness = ?genome.fitness(),
            "new best genome"
        );
    }

    fn complete_extinction(&mut self, generation: usize) {
        tracing::warn!(generation, "all species extinct");
    }

    fn found_solution(&mut self, generation: usize, genome: &G) {
        tracing::info!(
            generation,
            key = genome.key(),
            fitness = ?genome.fitness(),
            "solution found"
        );
    }

    fn info(&mut self, message: &str) {
        tracing::info!("{}", message);
    }
}
