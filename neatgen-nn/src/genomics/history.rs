use crate::genomics::GeneticConfig;
use crate::Innovation;

use ahash::RandomState;
use neatgen::InnovationHistory;
use serde::{Deserialize, Serialize};

use std::collections::hash_map::{Entry, HashMap};

/// A `History` keeps track of gene and node innovations in a
/// population, in order to make sure identical mutations
/// are assigned the same innovation numbers.
///
/// For gene innovations the input and output nodes are used to
/// identify identical mutations, and the corresponding innovation
/// number is recorded.
///
/// For node innovations the split gene is used to identify
/// identical mutations, and the innovation numbers for the
/// corresponding input gene, new node, and output gene are
/// recorded, in that order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History {
    next_gene_innovation: Innovation,
    next_node_innovation: Innovation,
    gene_innovations: HashMap<(Innovation, Innovation), Innovation, RandomState>,
    node_innovations: HashMap<Innovation, (Innovation, Innovation, Innovation), RandomState>,
}

impl InnovationHistory for History {
    type Config = GeneticConfig;

    fn new(config: &GeneticConfig) -> History {
        Self::new(config)
    }
}

impl History {
    /// Creates a new History using the specified configuration.
    ///
    /// Initially generated genes are given the innovation number
    /// `o + i ⨯ output_count`, where `i` is the innovation number
    /// of their input node and `o` is the index of their output node.
    /// Thus, the next available gene innovation number starts
    /// at `input_count ⨯ output_count`.
    ///
    /// # Examples
    /// ```
    /// use neatgen_nn::genomics::{GeneticConfig, History};
    ///
    /// let history = History::new(&GeneticConfig::zero());
    ///
    /// assert_eq!(history.max_gene_innovation(), 0);
    /// assert_eq!(history.max_node_innovation(), 1);
    /// ```
    pub fn new(config: &GeneticConfig) -> History {
        let (inputs, outputs) = (config.input_count.get(), config.output_count.get());
        let gene_innovations = (0..inputs)
            .flat_map(|i| (0..outputs).map(move |o| ((i, inputs + o), o + i * outputs)))
            .collect();
        History {
            // Pre-allocate innovation numbers for all possible initial
            // genes, and the input and output nodes.
            next_gene_innovation: inputs * outputs,
            next_node_innovation: inputs + outputs,
            gene_innovations,
            node_innovations: HashMap::default(),
        }
    }

    /// Returns the innovation number of a gene between
    /// the specified nodes, registering it if it is new.
    pub(crate) fn gene_innovation(&mut self, input: Innovation, output: Innovation) -> Innovation {
        match self.gene_innovations.entry((input, output)) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let id = self.next_gene_innovation;
                self.next_gene_innovation += 1;
                *entry.insert(id)
            }
        }
    }

    /// Returns the innovation numbers of the mutation
    /// splitting `split_gene`, registering it if it is new,
    /// in the format `(input gene, new node, output gene)`.
    ///
    /// If `force_new` is `true`, fresh numbers are assigned
    /// and replace any previous record of the mutation. This is
    /// for genomes that already split the same gene in a previous
    /// mutation, which would otherwise receive duplicate genes and
    /// nodes. This can be detected if the numbers returned with
    /// `force_new` set to `false` refer to genes or nodes already
    /// present in the genome.
    pub(crate) fn node_innovation(
        &mut self,
        split_gene: Innovation,
        endpoints: (Innovation, Innovation),
        force_new: bool,
    ) -> (Innovation, Innovation, Innovation) {
        if !force_new {
            if let Some(record) = self.node_innovations.get(&split_gene) {
                return *record;
            }
        }
        let (input, output) = endpoints;
        let new_node = self.next_node_innovation;
        self.next_node_innovation += 1;
        let record = (
            self.gene_innovation(input, new_node),
            new_node,
            self.gene_innovation(new_node, output),
        );
        self.node_innovations.insert(split_gene, record);
        record
    }

    /// Returns the highest gene innovation number generated.
    pub fn max_gene_innovation(&self) -> Innovation {
        self.next_gene_innovation.saturating_sub(1)
    }

    /// Returns the highest node innovation number generated.
    pub fn max_node_innovation(&self) -> Innovation {
        self.next_node_innovation.saturating_sub(1)
    }

    /// Returns an iterator over the complete record of
    /// gene innovations, in the format
    /// `((input node, output node), gene innovation)`.
    /// No ordering is guaranteed.
    pub fn gene_innovation_history(
        &self,
    ) -> impl Iterator<Item = (&(Innovation, Innovation), &Innovation)> {
        self.gene_innovations.iter()
    }

    /// Returns an iterator over the complete record of
    /// node innovations, in the format
    /// `(split gene, (input gene, new node, output gene))`.
    /// No ordering is guaranteed.
    ///
    /// # Examples
    /// ```
    /// use neatgen::{Genome, PopulationRng};
    /// use neatgen_nn::genomics::{GeneticConfig, History, NNGenome};
    ///
    /// let config = GeneticConfig {
    ///     initial_expression_chance: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut history = History::new(&config);
    /// let mut rng = PopulationRng::seed_from_u64(0);
    ///
    /// // Add mutations to the history through genome mutation.
    /// let mut genome = NNGenome::new(0, &config, &mut rng);
    /// genome.mutate_add_node(&mut history, &config, &mut rng).unwrap();
    ///
    /// for (split_gene, (input_gene, new_node, output_gene)) in history.node_innovation_history() {
    ///     println!("gene {} split into genes {} and {} with node {} in between",
    ///         split_gene, input_gene, output_gene, new_node);
    /// }
    /// assert_eq!(history.node_innovation_history().count(), 1);
    /// ```
    pub fn node_innovation_history(
        &self,
    ) -> impl Iterator<Item = (&Innovation, &(Innovation, Innovation, Innovation))> {
        self.node_innovations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::num::NonZeroUsize;

    fn config() -> GeneticConfig {
        GeneticConfig {
            input_count: NonZeroUsize::new(3).unwrap(),
            output_count: NonZeroUsize::new(2).unwrap(),
            ..GeneticConfig::zero()
        }
    }

    #[test]
    fn initial_genes_are_preallocated() {
        let mut history = History::new(&config());
        // Nodes 0..3 are sensors, 3..5 actuators.
        assert_eq!(history.gene_innovation(0, 3), 0);
        assert_eq!(history.gene_innovation(0, 4), 1);
        assert_eq!(history.gene_innovation(2, 4), 5);
        assert_eq!(history.max_gene_innovation(), 5);
        assert_eq!(history.max_node_innovation(), 4);
    }

    #[test]
    fn identical_mutations_share_innovations() {
        let mut history = History::new(&config());
        let first = history.gene_innovation(3, 4);
        assert_eq!(first, 6);
        assert_eq!(history.gene_innovation(3, 4), first);
        assert_eq!(history.gene_innovation(4, 3), 7);

        let split = history.node_innovation(0, (0, 3), false);
        assert_eq!(split, (8, 5, 9));
        assert_eq!(history.node_innovation(0, (0, 3), false), split);
    }

    #[test]
    fn forced_node_innovations_are_fresh() {
        let mut history = History::new(&config());
        let first = history.node_innovation(1, (0, 4), false);
        let second = history.node_innovation(1, (0, 4), true);
        assert_eq!(first, (6, 5, 7));
        assert_eq!(second, (8, 6, 9));
        // The newest split replaces the record.
        assert_eq!(history.node_innovation(1, (0, 4), false), second);
    }
}
