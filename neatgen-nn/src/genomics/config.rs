use crate::genomics::{ActivationType, AggregationType, FloatAttributeConfig};

use neatgen::{ConfigError, GenomeConfig};
use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;

/// Configuration data for genome generation
/// and inter-genome operations.
///
/// # Note
/// All quantities expressing probabilities
/// should be in the range [0.0, 1.0], which
/// [`validate`] checks.
///
/// [`validate`]: GeneticConfig::validate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GeneticConfig {
    /// Number of inputs in a genome.
    pub input_count: NonZeroUsize,
    /// Number of outputs in a genome.
    pub output_count: NonZeroUsize,
    /// Forbid gene additions that would create cycles,
    /// including recursive genes.
    pub feed_forward: bool,
    /// Chance that a gene between an input-output node pair
    /// is created during initial genome generation.
    pub initial_expression_chance: f32,
    /// Possible activation types for hidden nodes in a genome.
    /// If an empty vector is given, nodes will default
    /// to [`Sigmoid`].
    ///
    /// [`Sigmoid`]: crate::genomics::ActivationType
    pub activation_types: Vec<ActivationType>,
    /// Activation types of output nodes in a genome.
    /// If fewer than [`output_count`] are specified,
    /// the default is [`Sigmoid`].
    ///
    /// [`output_count`]: GeneticConfig::output_count
    /// [`Sigmoid`]: crate::genomics::ActivationType
    pub output_activation_types: Vec<ActivationType>,
    /// Possible aggregation types for non-sensor nodes.
    /// If an empty vector is given, nodes will default
    /// to [`Sum`].
    ///
    /// [`Sum`]: crate::genomics::AggregationType
    pub aggregation_types: Vec<AggregationType>,
    /// Chance of a hidden node's activation type being
    /// replaced during mutation.
    pub activation_mutate_rate: f32,
    /// Chance of a node's aggregation type being
    /// replaced during mutation.
    pub aggregation_mutate_rate: f32,
    /// Gene weights.
    pub weight: FloatAttributeConfig,
    /// Node biases.
    pub bias: FloatAttributeConfig,
    /// Node response gains.
    pub response: FloatAttributeConfig,
    /// Chance of a gene being enabled or disabled
    /// during mutation.
    pub enabled_mutate_rate: f32,
    /// Chance of child mutation during mating.
    pub child_mutation_chance: f32,
    /// Chance that a gene or node common to both parents
    /// is inherited from the fitter parent.
    pub crossover_fitter_bias: f32,
    /// Chance of a node addition mutation taking place during mating.
    pub node_addition_mutation_chance: f32,
    /// Chance of a gene addition mutation taking place during mating.
    pub gene_addition_mutation_chance: f32,
    /// Chance of a node deletion mutation taking place during mating.
    pub node_deletion_mutation_chance: f32,
    /// Chance of a gene deletion mutation taking place during mating.
    pub gene_deletion_mutation_chance: f32,
    /// Maximum number of input nodes tried by gene
    /// addition before it returns with failure.
    pub max_gene_addition_mutation_attempts: usize,
    /// Chance that a recursive gene will be created during
    /// gene mutation if possible.
    pub recursion_chance: f32,
    /// Apply at most one structural mutation per child,
    /// chosen in proportion to the structural mutation chances.
    pub single_structural_mutation: bool,
    /// Weight of excess genes in genetic distance.
    pub excess_gene_factor: f32,
    /// Weight of disjoint genes in genetic distance.
    pub disjoint_gene_factor: f32,
    /// Weight of the common gene weight average in genetic distance.
    pub common_weight_factor: f32,
    /// Genomes smaller than this are compared without
    /// normalizing gene counts by genome size.
    pub normalization_threshold: usize,
}

impl GeneticConfig {
    /// Returns a "zero-valued" default configuration.
    /// All values are 0, empty, or in the case of
    /// `NonZeroUsize`s, 1.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to fill in unused values during
    /// configuration instantiation.
    ///
    /// # Examples
    /// ```
    /// use neatgen_nn::genomics::GeneticConfig;
    ///
    /// let cfg1 = GeneticConfig::zero();
    ///
    /// let cfg2 = GeneticConfig {
    ///     // Specify some values here...
    ///     recursion_chance: 1.0,
    ///     child_mutation_chance: 1.0,
    ///     // Default the rest...
    ///     ..GeneticConfig::zero()
    /// };
    /// ```
    pub const fn zero() -> GeneticConfig {
        GeneticConfig {
            input_count: NonZeroUsize::MIN,
            output_count: NonZeroUsize::MIN,
            feed_forward: false,
            initial_expression_chance: 0.0,
            activation_types: vec![],
            output_activation_types: vec![],
            aggregation_types: vec![],
            activation_mutate_rate: 0.0,
            aggregation_mutate_rate: 0.0,
            weight: FloatAttributeConfig::zero(),
            bias: FloatAttributeConfig::zero(),
            response: FloatAttributeConfig::zero(),
            enabled_mutate_rate: 0.0,
            child_mutation_chance: 0.0,
            crossover_fitter_bias: 0.0,
            node_addition_mutation_chance: 0.0,
            gene_addition_mutation_chance: 0.0,
            node_deletion_mutation_chance: 0.0,
            gene_deletion_mutation_chance: 0.0,
            max_gene_addition_mutation_attempts: 0,
            recursion_chance: 0.0,
            single_structural_mutation: false,
            excess_gene_factor: 0.0,
            disjoint_gene_factor: 0.0,
            common_weight_factor: 0.0,
            normalization_threshold: 0,
        }
    }

    /// Checks that all values are within their valid ranges.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    ///
    /// # Examples
    /// ```
    /// use neatgen_nn::genomics::GeneticConfig;
    ///
    /// assert!(GeneticConfig::default().validate().is_ok());
    ///
    /// let config = GeneticConfig {
    ///     crossover_fitter_bias: -0.5,
    ///     ..GeneticConfig::default()
    /// };
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let probabilities = [
            ("initial_expression_chance", self.initial_expression_chance),
            ("activation_mutate_rate", self.activation_mutate_rate),
            ("aggregation_mutate_rate", self.aggregation_mutate_rate),
            ("enabled_mutate_rate", self.enabled_mutate_rate),
            ("child_mutation_chance", self.child_mutation_chance),
            ("crossover_fitter_bias", self.crossover_fitter_bias),
            ("node_addition_mutation_chance", self.node_addition_mutation_chance),
            ("gene_addition_mutation_chance", self.gene_addition_mutation_chance),
            ("node_deletion_mutation_chance", self.node_deletion_mutation_chance),
            ("gene_deletion_mutation_chance", self.gene_deletion_mutation_chance),
            ("recursion_chance", self.recursion_chance),
        ];
        for (field, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid(
                    field,
                    format!("{} is not a probability in [0, 1]", value),
                ));
            }
        }
        let factors = [
            ("excess_gene_factor", self.excess_gene_factor),
            ("disjoint_gene_factor", self.disjoint_gene_factor),
            ("common_weight_factor", self.common_weight_factor),
        ];
        for (field, value) in factors {
            if !(value >= 0.0) {
                return Err(ConfigError::invalid(field, "must be a non-negative number"));
            }
        }
        if self.output_activation_types.len() > self.output_count.get() {
            return Err(ConfigError::invalid(
                "output_activation_types",
                "more activation types than outputs",
            ));
        }
        self.weight.validate("weight")?;
        self.bias.validate("bias")?;
        self.response.validate("response")
    }
}

impl Default for GeneticConfig {
    fn default() -> GeneticConfig {
        GeneticConfig {
            input_count: NonZeroUsize::new(2).unwrap_or(NonZeroUsize::MIN),
            feed_forward: true,
            initial_expression_chance: 1.0,
            activation_types: vec![ActivationType::Sigmoid],
            aggregation_types: vec![AggregationType::Sum],
            weight: FloatAttributeConfig::default(),
            bias: FloatAttributeConfig {
                mutate_rate: 0.7,
                ..FloatAttributeConfig::default()
            },
            response: FloatAttributeConfig::constant(1.0),
            enabled_mutate_rate: 0.01,
            child_mutation_chance: 1.0,
            crossover_fitter_bias: 0.5,
            node_addition_mutation_chance: 0.2,
            gene_addition_mutation_chance: 0.5,
            node_deletion_mutation_chance: 0.2,
            gene_deletion_mutation_chance: 0.5,
            max_gene_addition_mutation_attempts: 20,
            excess_gene_factor: 1.0,
            disjoint_gene_factor: 1.0,
            common_weight_factor: 0.5,
            normalization_threshold: 20,
            ..GeneticConfig::zero()
        }
    }
}

impl GenomeConfig for GeneticConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        GeneticConfig::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neatgen::NeatConfig;

    #[test]
    fn genome_section_from_toml() {
        let config: NeatConfig<GeneticConfig> = NeatConfig::from_toml_str(
            r#"
            [genome]
            input_count = 3
            output_count = 2
            feed_forward = false
            activation_types = ["sigmoid", "relu", "tanh"]
            output_activation_types = ["identity"]
            aggregation_types = ["sum", "max"]
            single_structural_mutation = true
            normalization_threshold = 10

            [genome.weight]
            init_stdev = 2.0
            min = -8.0
            max = 8.0

            [genome.response]
            init_mean = 1.0
            init_stdev = 0.0
            min = 1.0
            max = 1.0
            mutate_rate = 0.0
            mutate_power = 0.0
            replace_rate = 0.0
            "#,
        )
        .unwrap();
        let genome = config.genome;
        assert!(genome.validate().is_ok());
        assert_eq!(genome.input_count.get(), 3);
        assert!(!genome.feed_forward);
        assert_eq!(
            genome.activation_types,
            vec![ActivationType::Sigmoid, ActivationType::ReLU, ActivationType::Tanh]
        );
        assert_eq!(genome.aggregation_types[1], AggregationType::Max);
        assert_eq!(genome.weight.min, -8.0);
        // Unspecified attribute values keep their defaults.
        assert_eq!(genome.weight.mutate_rate, 0.8);
        assert_eq!(genome.response, FloatAttributeConfig::constant(1.0));
    }

    #[test]
    fn out_of_range_genome_section_is_rejected_on_load() {
        let result = NeatConfig::<GeneticConfig>::from_toml_str(
            r#"
            [genome]
            recursion_chance = 1.5
            "#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "recursion_chance",
                ..
            })
        ));
    }

    #[test]
    fn unknown_genome_keys_are_rejected() {
        let result = NeatConfig::<GeneticConfig>::from_toml_str(
            r#"
            [genome]
            weight_bound = 5.0
            "#,
        );
        assert!(result.is_err());

        let result = NeatConfig::<GeneticConfig>::from_toml_str(
            r#"
            [genome.bias]
            mean = 0.0
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let config = GeneticConfig {
            node_addition_mutation_chance: 1.2,
            ..GeneticConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "node_addition_mutation_chance",
                ..
            })
        ));

        let config = GeneticConfig {
            weight: FloatAttributeConfig {
                min: 1.0,
                max: 0.0,
                ..FloatAttributeConfig::default()
            },
            ..GeneticConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "weight", .. })
        ));
    }
}
