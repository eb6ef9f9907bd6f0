use neatgen::ConfigError;

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Initialization and mutation parameters of a
/// floating-point gene attribute, such as a
/// connection's weight or a node's bias.
///
/// Initial values are drawn from a normal distribution,
/// and all values are kept within `[min, max]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FloatAttributeConfig {
    /// Mean of initial values.
    pub init_mean: f32,
    /// Standard deviation of initial values.
    pub init_stdev: f32,
    /// Smallest allowed value.
    pub min: f32,
    /// Largest allowed value.
    pub max: f32,
    /// Chance of a value being perturbed during mutation.
    pub mutate_rate: f32,
    /// Standard deviation of perturbations.
    pub mutate_power: f32,
    /// Chance of a value being replaced by a new
    /// initial value during mutation, if not perturbed.
    pub replace_rate: f32,
}

impl FloatAttributeConfig {
    /// Returns a configuration whose values are
    /// always 0 and never mutate.
    pub const fn zero() -> FloatAttributeConfig {
        FloatAttributeConfig {
            init_mean: 0.0,
            init_stdev: 0.0,
            min: 0.0,
            max: 0.0,
            mutate_rate: 0.0,
            mutate_power: 0.0,
            replace_rate: 0.0,
        }
    }

    /// Returns a configuration for an attribute fixed at `value`.
    ///
    /// # Examples
    /// ```
    /// use neatgen_nn::genomics::FloatAttributeConfig;
    /// use rand::SeedableRng;
    /// use rand_chacha::ChaCha8Rng;
    ///
    /// let config = FloatAttributeConfig::constant(1.0);
    /// let mut rng = ChaCha8Rng::seed_from_u64(0);
    ///
    /// assert_eq!(config.init_value(&mut rng), 1.0);
    /// assert_eq!(config.mutate_value(1.0, &mut rng), 1.0);
    /// ```
    pub const fn constant(value: f32) -> FloatAttributeConfig {
        FloatAttributeConfig {
            init_mean: value,
            min: value,
            max: value,
            ..FloatAttributeConfig::zero()
        }
    }

    /// Clamps `value` into `[min, max]`.
    pub fn clamp(&self, value: f32) -> f32 {
        value.max(self.min).min(self.max)
    }

    /// Returns a new random value.
    pub fn init_value<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        let noise: f32 = rng.sample(StandardNormal);
        self.clamp(self.init_mean + self.init_stdev * noise)
    }

    /// Returns a possibly mutated version of `value`.
    ///
    /// With probability [`mutate_rate`] the value is perturbed
    /// by gaussian noise; otherwise with probability
    /// [`replace_rate`] it is replaced by a new initial value.
    ///
    /// [`mutate_rate`]: FloatAttributeConfig::mutate_rate
    /// [`replace_rate`]: FloatAttributeConfig::replace_rate
    ///
    /// # Examples
    /// ```
    /// use neatgen_nn::genomics::FloatAttributeConfig;
    /// use rand::SeedableRng;
    /// use rand_chacha::ChaCha8Rng;
    ///
    /// let config = FloatAttributeConfig {
    ///     min: -5.0,
    ///     max: 5.0,
    ///     mutate_rate: 1.0,
    ///     mutate_power: 100.0,
    ///     ..FloatAttributeConfig::zero()
    /// };
    /// let mut rng = ChaCha8Rng::seed_from_u64(0);
    ///
    /// let value = config.mutate_value(2.0, &mut rng);
    /// assert!((-5.0..=5.0).contains(&value));
    /// ```
    pub fn mutate_value<R: Rng + ?Sized>(&self, value: f32, rng: &mut R) -> f32 {
        let r: f32 = rng.gen();
        if r < self.mutate_rate {
            let noise: f32 = rng.sample(StandardNormal);
            self.clamp(value + self.mutate_power * noise)
        } else if r < self.mutate_rate + self.replace_rate {
            self.init_value(rng)
        } else {
            value
        }
    }

    /// Checks that the configuration describes
    /// a valid range and valid rates.
    ///
    /// # Errors
    /// Returns an error naming the attribute if a
    /// rate is not a probability, or the range is empty.
    pub fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        if !(self.min <= self.max) {
            return Err(ConfigError::invalid(
                name,
                format!("min ({}) is greater than max ({})", self.min, self.max),
            ));
        }
        if !(self.init_stdev >= 0.0 && self.mutate_power >= 0.0) {
            return Err(ConfigError::invalid(
                name,
                "standard deviations must be non-negative",
            ));
        }
        for rate in [self.mutate_rate, self.replace_rate] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::invalid(
                    name,
                    format!("{} is not a probability in [0, 1]", rate),
                ));
            }
        }
        Ok(())
    }
}

impl Default for FloatAttributeConfig {
    fn default() -> FloatAttributeConfig {
        FloatAttributeConfig {
            init_mean: 0.0,
            init_stdev: 1.0,
            min: -30.0,
            max: 30.0,
            mutate_rate: 0.8,
            mutate_power: 0.5,
            replace_rate: 0.1,
        }
    }
}
