use crate::config::ConfigError;

use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;

/// How the population's fitness is summarized
/// when checking for termination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitnessCriterion {
    Max,
    Min,
    Mean,
}

/// How a species' fitness is computed from
/// its members' fitnesses, for stagnation tracking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeciesFitnessFunction {
    Max,
    Min,
    Mean,
    Median,
}

impl SpeciesFitnessFunction {
    /// Summarizes a list of fitness values.
    /// Returns `None` for an empty list.
    ///
    /// # Examples
    /// ```
    /// use neatgen::SpeciesFitnessFunction;
    ///
    /// let values = [1.0, 4.0, 2.0, 3.0];
    /// assert_eq!(SpeciesFitnessFunction::Max.apply(&values), Some(4.0));
    /// assert_eq!(SpeciesFitnessFunction::Min.apply(&values), Some(1.0));
    /// assert_eq!(SpeciesFitnessFunction::Mean.apply(&values), Some(2.5));
    /// assert_eq!(SpeciesFitnessFunction::Median.apply(&values), Some(2.5));
    /// assert_eq!(SpeciesFitnessFunction::Max.apply(&[]), None);
    /// ```
    pub fn apply(self, values: &[f32]) -> Option<f32> {
        if values.is_empty() {
            return None;
        }
        Some(match self {
            SpeciesFitnessFunction::Max => values.iter().copied().fold(f32::MIN, f32::max),
            SpeciesFitnessFunction::Min => values.iter().copied().fold(f32::MAX, f32::min),
            SpeciesFitnessFunction::Mean => values.iter().sum::<f32>() / values.len() as f32,
            SpeciesFitnessFunction::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(f32::total_cmp);
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
        })
    }
}

/// The reproduction strategy used by a population.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReproductionMethod {
    /// Single-objective, fitness-proportional
    /// tournament reproduction.
    Default,
    /// Multi-objective NSGA-II reproduction.
    Nsga2,
}

/// Configuration data for population generation
/// and evolution.
///
/// # Note
/// All quantities expressing probabilities
/// should be in the range [0.0, 1.0], which
/// [`validate`] checks.
///
/// [`validate`]: PopulationConfig::validate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PopulationConfig {
    /// Size of the population.
    #[serde(alias = "pop_size")]
    pub size: NonZeroUsize,
    /// Summary of the population's primary fitness
    /// compared against the [`fitness_threshold`].
    ///
    /// [`fitness_threshold`]: PopulationConfig::fitness_threshold
    pub fitness_criterion: FitnessCriterion,
    /// Evolution stops once the fitness criterion
    /// reaches this value.
    pub fitness_threshold: f32,
    /// Disables fitness-based termination.
    pub no_fitness_termination: bool,
    /// Create a new random population if all species
    /// go extinct, instead of failing.
    pub reset_on_extinction: bool,
    /// Seed of all of the population's randomness,
    /// and base of every genome's evaluation seed.
    pub seed: u64,
    /// Genetic distance threshold, beyond which
    /// genomes are considered as belonging to
    /// different species.
    pub compatibility_threshold: f32,
    /// Top n of each species which is copied
    /// as-is to the next generation.
    pub elitism: usize,
    /// Top % of each species which can participate
    /// in mating.
    pub survival_threshold: f32,
    /// Chance that offspring will be the result
    /// of sexual reproduction (as opposed to asexual).
    pub sexual_reproduction_chance: f32,
    /// Number of candidates sampled per tournament.
    pub tournament_size: NonZeroUsize,
    /// Number of best species protected from
    /// stagnation removal.
    pub species_elitism: usize,
    /// Number of generations without a fitness increase
    /// before a species is considered _stagnated_.
    pub max_stagnation: NonZeroUsize,
    /// Species fitness summary used for stagnation.
    pub species_fitness_func: SpeciesFitnessFunction,
    /// Smallest divisor used when normalizing species
    /// fitnesses for offspring allotment.
    pub fitness_min_divisor: f32,
    /// Reproduction strategy.
    pub reproduction: ReproductionMethod,
}

impl PopulationConfig {
    /// Returns a "zero-valued" default configuration.
    /// All values are 0, empty, or in the case of
    /// `NonZeroUsize`s, 1. Enumerations take their first
    /// variant.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to abbreviate configuration
    /// instantiation, or to fill in unused values.
    ///
    /// # Examples
    /// ```
    /// use neatgen::PopulationConfig;
    ///
    /// let cfg1 = PopulationConfig::zero();
    ///
    /// let cfg2 = PopulationConfig {
    ///     // Specify some values here...
    ///     elitism: 2,
    ///     // Default the rest...
    ///     ..PopulationConfig::zero()
    /// };
    /// ```
    pub const fn zero() -> PopulationConfig {
        PopulationConfig {
            size: NonZeroUsize::MIN,
            fitness_criterion: FitnessCriterion::Max,
            fitness_threshold: 0.0,
            no_fitness_termination: false,
            reset_on_extinction: false,
            seed: 0,
            compatibility_threshold: 0.0,
            elitism: 0,
            survival_threshold: 0.0,
            sexual_reproduction_chance: 0.0,
            tournament_size: NonZeroUsize::MIN,
            species_elitism: 0,
            max_stagnation: NonZeroUsize::MIN,
            species_fitness_func: SpeciesFitnessFunction::Max,
            fitness_min_divisor: 0.0,
            reproduction: ReproductionMethod::Default,
        }
    }

    /// Checks that all values are within their valid ranges.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    ///
    /// # Examples
    /// ```
    /// use neatgen::PopulationConfig;
    ///
    /// assert!(PopulationConfig::default().validate().is_ok());
    ///
    /// let config = PopulationConfig {
    ///     survival_threshold: 1.5,
    ///     ..PopulationConfig::default()
    /// };
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability("survival_threshold", self.survival_threshold)?;
        check_probability("sexual_reproduction_chance", self.sexual_reproduction_chance)?;
        if !(self.compatibility_threshold >= 0.0) {
            return Err(ConfigError::invalid(
                "compatibility_threshold",
                "must be a non-negative number",
            ));
        }
        if !(self.fitness_min_divisor > 0.0) {
            return Err(ConfigError::invalid(
                "fitness_min_divisor",
                "must be a positive number",
            ));
        }
        if self.fitness_threshold.is_nan() {
            return Err(ConfigError::invalid("fitness_threshold", "must be a number"));
        }
        Ok(())
    }
}

impl Default for PopulationConfig {
    fn default() -> PopulationConfig {
        PopulationConfig {
            size: NonZeroUsize::new(150).unwrap_or(NonZeroUsize::MIN),
            fitness_threshold: f32::MAX,
            compatibility_threshold: 3.0,
            elitism: 2,
            survival_threshold: 0.2,
            sexual_reproduction_chance: 0.75,
            tournament_size: NonZeroUsize::new(2).unwrap_or(NonZeroUsize::MIN),
            species_elitism: 2,
            max_stagnation: NonZeroUsize::new(15).unwrap_or(NonZeroUsize::MIN),
            fitness_min_divisor: 1.0,
            ..PopulationConfig::zero()
        }
    }
}

pub(crate) fn check_probability(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("{} is not a probability in [0, 1]", value),
        ))
    }
}
