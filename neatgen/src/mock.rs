//! A one-dimensional genome used by unit tests.
use crate::{Fitness, Genome, GenomeKey, InnovationHistory};

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct MockGenome {
    pub key: GenomeKey,
    pub value: f32,
    pub fitness: Option<Fitness>,
}

impl MockGenome {
    pub fn with_value(key: GenomeKey, value: f32) -> MockGenome {
        MockGenome {
            key,
            value,
            fitness: None,
        }
    }

    pub fn evaluated(key: GenomeKey, value: f32, fitness: f32) -> MockGenome {
        MockGenome {
            key,
            value,
            fitness: Some(Fitness::Scalar(fitness)),
        }
    }

    pub fn with_objectives(key: GenomeKey, value: f32, objectives: &[f32]) -> MockGenome {
        MockGenome {
            key,
            value,
            fitness: Some(Fitness::Objectives(objectives.to_vec())),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct MockConfig {
    /// Initial values are drawn from `[0, spread)`.
    pub spread: f32,
    /// Children are displaced by up to this much.
    pub mutation: f32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct MockHistory {
    pub matings: usize,
}

impl InnovationHistory for MockHistory {
    type Config = MockConfig;

    fn new(_: &MockConfig) -> MockHistory {
        MockHistory::default()
    }
}

impl Genome for MockGenome {
    type Config = MockConfig;
    type InnovationHistory = MockHistory;

    fn new<R: Rng + ?Sized>(key: GenomeKey, config: &MockConfig, rng: &mut R) -> MockGenome {
        let value = if config.spread > 0.0 {
            rng.gen_range(0.0..config.spread)
        } else {
            0.0
        };
        MockGenome::with_value(key, value)
    }

    fn key(&self) -> GenomeKey {
        self.key
    }

    fn genetic_distance(first: &MockGenome, second: &MockGenome, _: &MockConfig) -> f32 {
        (first.value - second.value).abs()
    }

    fn mate<R: Rng + ?Sized>(
        key: GenomeKey,
        parent1: &MockGenome,
        parent2: &MockGenome,
        history: &mut MockHistory,
        config: &MockConfig,
        rng: &mut R,
    ) -> MockGenome {
        history.matings += 1;
        let noise = if config.mutation > 0.0 {
            rng.gen_range(-config.mutation..config.mutation)
        } else {
            0.0
        };
        MockGenome::with_value(key, (parent1.value + parent2.value) / 2.0 + noise)
    }

    fn set_fitness(&mut self, fitness: Fitness) {
        self.fitness = Some(fitness);
    }

    fn fitness(&self) -> Option<&Fitness> {
        self.fitness.as_ref()
    }

    fn clear_fitness(&mut self) {
        self.fitness = None;
    }
}
