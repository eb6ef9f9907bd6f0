use super::PopulationConfig;
use crate::{Genome, GenomeKey};

use rand::Rng;

/// Auxiliary type for offspring generation.
/// Handles the selection and mating of parents
/// according to the specified configs, drawing all
/// randomness from the population's generator.
pub(crate) struct OffspringFactory<'a, G: Genome, R: Rng + ?Sized> {
    history: &'a mut G::InnovationHistory,
    genetic_config: &'a G::Config,
    pub(crate) config: &'a PopulationConfig,
    pub(crate) rng: &'a mut R,
}

impl<'a, G: Genome, R: Rng + ?Sized> OffspringFactory<'a, G, R> {
    pub(crate) fn new(
        history: &'a mut G::InnovationHistory,
        genetic_config: &'a G::Config,
        config: &'a PopulationConfig,
        rng: &'a mut R,
    ) -> OffspringFactory<'a, G, R> {
        OffspringFactory {
            history,
            genetic_config,
            config,
            rng,
        }
    }

    /// Runs a tournament among `candidates` ranked
    /// parents, returning the winner's rank.
    ///
    /// Contestants are sampled with replacement, and
    /// the best-ranked (lowest index) wins.
    pub(crate) fn tournament(&mut self, candidates: usize) -> usize {
        (0..self.config.tournament_size.get())
            .map(|_| self.rng.gen_range(0..candidates))
            .min()
            .unwrap_or(0)
    }

    /// Breeds a child from `ranked`, a list of
    /// prospective parents sorted from best to worst.
    ///
    /// The first parent is chosen by tournament. With
    /// [`sexual_reproduction_chance`] a second tournament
    /// picks its mate, and otherwise the child is bred
    /// asexually. Single-parent lists always breed asexually.
    ///
    /// # Panics
    /// Panics if `ranked` is empty.
    ///
    /// [`sexual_reproduction_chance`]: PopulationConfig::sexual_reproduction_chance
    pub(crate) fn breed(&mut self, key: GenomeKey, ranked: &[&G]) -> G {
        assert!(!ranked.is_empty(), "no eligible parents for genome {}", key);
        let first = self.tournament(ranked.len());
        let second = if ranked.len() > 1
            && self.rng.gen::<f32>() < self.config.sexual_reproduction_chance
        {
            self.tournament(ranked.len())
        } else {
            first
        };
        let (fitter, other) = (first.min(second), first.max(second));
        G::mate(
            key,
            ranked[fitter],
            ranked[other],
            &mut *self.history,
            self.genetic_config,
            &mut *self.rng,
        )
    }
}
