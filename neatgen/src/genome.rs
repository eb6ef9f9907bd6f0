use rand::Rng;
use serde::{Deserialize, Serialize};

use std::fmt;

/// Identifier of a genome within a population.
/// Keys are handed out in increasing order and
/// never reused.
pub type GenomeKey = usize;

/// The fitness of a genome. Either a single value,
/// or an ordered tuple of objectives for multi-objective
/// reproduction.
///
/// All objectives are maximized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Fitness {
    Scalar(f32),
    Objectives(Vec<f32>),
}

impl Fitness {
    /// Returns the value used for thresholding, reporting,
    /// and single-objective selection: the scalar value, or
    /// the first objective.
    ///
    /// An empty objective vector has a primary value of
    /// negative infinity.
    ///
    /// # Examples
    /// ```
    /// use neatgen::Fitness;
    ///
    /// assert_eq!(Fitness::Scalar(3.0).primary(), 3.0);
    /// assert_eq!(Fitness::Objectives(vec![5.0, 1.0]).primary(), 5.0);
    /// ```
    pub fn primary(&self) -> f32 {
        match self {
            Fitness::Scalar(value) => *value,
            Fitness::Objectives(values) => values.first().copied().unwrap_or(f32::NEG_INFINITY),
        }
    }

    /// Returns all objectives. A scalar fitness
    /// is a single objective.
    ///
    /// # Examples
    /// ```
    /// use neatgen::Fitness;
    ///
    /// assert_eq!(Fitness::Scalar(3.0).objectives(), &[3.0]);
    /// assert_eq!(Fitness::Objectives(vec![5.0, 1.0]).objectives(), &[5.0, 1.0]);
    /// ```
    pub fn objectives(&self) -> &[f32] {
        match self {
            Fitness::Scalar(value) => std::slice::from_ref(value),
            Fitness::Objectives(values) => values,
        }
    }

    /// Returns whether `self` Pareto-dominates `other`:
    /// no objective is worse and at least one is strictly
    /// better.
    ///
    /// # Examples
    /// ```
    /// use neatgen::Fitness;
    ///
    /// let a = Fitness::Objectives(vec![5.0, 1.0]);
    /// let b = Fitness::Objectives(vec![3.0, 4.0]);
    /// let c = Fitness::Objectives(vec![2.0, 1.0]);
    ///
    /// assert!(!a.dominates(&b) && !b.dominates(&a));
    /// assert!(a.dominates(&c));
    /// assert!(!a.dominates(&a));
    /// ```
    pub fn dominates(&self, other: &Fitness) -> bool {
        let mut strictly_better = false;
        for (a, b) in self.objectives().iter().zip(other.objectives()) {
            if a < b {
                return false;
            } else if a > b {
                strictly_better = true;
            }
        }
        strictly_better
    }
}

impl From<f32> for Fitness {
    fn from(value: f32) -> Fitness {
        Fitness::Scalar(value)
    }
}

impl From<Vec<f32>> for Fitness {
    fn from(values: Vec<f32>) -> Fitness {
        Fitness::Objectives(values)
    }
}

impl<const N: usize> From<[f32; N]> for Fitness {
    fn from(values: [f32; N]) -> Fitness {
        Fitness::Objectives(values.to_vec())
    }
}

impl fmt::Display for Fitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fitness::Scalar(value) => write!(f, "{:.4}", value),
            Fitness::Objectives(values) => write!(f, "{:.4?}", values),
        }
    }
}

/// An interface for genomes that can be used by NEAT.
///
/// All randomness must be drawn from the passed `rng`,
/// so that evolution is reproducible from a seed.
pub trait Genome: Clone {
    type Config;
    type InnovationHistory: InnovationHistory<Config = Self::Config>;

    /// Returns a randomized genome with the given key.
    fn new<R: Rng + ?Sized>(key: GenomeKey, config: &Self::Config, rng: &mut R) -> Self;

    /// Returns the genome's key.
    fn key(&self) -> GenomeKey;

    /// Returns the genetic distance between two genomes.
    ///
    /// Must be symmetric, non-negative, and zero
    /// between a genome and itself.
    fn genetic_distance(first: &Self, second: &Self, config: &Self::Config) -> f32;

    /// Combines two genomes and returns a mutated "child" genome
    /// with the given key and no fitness.
    ///
    /// `parent1` is the fitter parent, as ranked by the
    /// reproduction strategy; implementations should not
    /// re-rank the parents by their fitness values.
    /// Asexual reproduction is done by passing the same
    /// genome as both parents.
    fn mate<R: Rng + ?Sized>(
        key: GenomeKey,
        parent1: &Self,
        parent2: &Self,
        history: &mut Self::InnovationHistory,
        config: &Self::Config,
        rng: &mut R,
    ) -> Self;

    /// Sets the genome's fitness value.
    fn set_fitness(&mut self, fitness: Fitness);

    /// Returns the genome's fitness value, if it has
    /// been evaluated.
    fn fitness(&self) -> Option<&Fitness>;

    /// Forgets the genome's fitness, marking it
    /// as needing evaluation.
    fn clear_fitness(&mut self);

    /// Returns the primary fitness value, if evaluated.
    fn primary_fitness(&self) -> Option<f32> {
        self.fitness().map(Fitness::primary)
    }
}

/// An Innovation History is used to keep track
/// of genetic innovations throught successive
/// generations of genomes.
///
/// The exact function and utility of the
/// InnovationHistory is left to the implementor.
pub trait InnovationHistory {
    type Config;

    fn new(config: &Self::Config) -> Self;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_is_single_objective() {
        let fitness = Fitness::from(4.5_f32);
        assert_eq!(fitness.objectives(), &[4.5]);
        assert_eq!(fitness.primary(), 4.5);
    }

    #[test]
    fn empty_objectives_have_lowest_primary() {
        assert_eq!(Fitness::Objectives(vec![]).primary(), f32::NEG_INFINITY);
    }

    #[test]
    fn equal_fitnesses_do_not_dominate() {
        let a = Fitness::from([1.0, 2.0]);
        let b = Fitness::from([1.0, 2.0]);
        assert!(!a.dominates(&b));
        assert!(!b.dominates(&a));
    }

    #[test]
    fn dominance_needs_no_worse_objective() {
        let a = Fitness::from([1.0, 3.0]);
        let b = Fitness::from([2.0, 2.0]);
        assert!(!a.dominates(&b));
        assert!(!b.dominates(&a));
        assert!(Fitness::from([2.0, 3.0]).dominates(&a));
    }
}
