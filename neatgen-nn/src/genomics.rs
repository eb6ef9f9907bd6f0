//! Genomes encoding neural networks as graphs of
//! node and connection genes, and their genetic operators.
mod attributes;
mod config;
mod errors;
mod genes;
mod graphs;
mod history;
mod nodes;

pub use attributes::FloatAttributeConfig;
pub use config::GeneticConfig;
pub use errors::*;
pub use genes::Gene;
pub use graphs::{creates_cycle, feed_forward_layers, required_for_output};
pub use history::History;
pub use nodes::{ActivationType, AggregationType, Node, NodeType};

use crate::Innovation;

use neatgen::{Fitness, Genome, GenomeKey};
use rand::prelude::{IteratorRandom, Rng, SliceRandom};
use serde::{Deserialize, Serialize};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A mutable collection of genes and nodes.
///
/// Genes and nodes are kept ordered by innovation number,
/// so that every operation on a genome visits them in the
/// same order, and is reproducible given the same random
/// number generator state.
///
/// Suports Serde for convenient genome saving and loading.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct NNGenome {
    key: GenomeKey,
    genes: BTreeMap<Innovation, Gene>,
    nodes: BTreeMap<Innovation, Node>,
    node_pairings: BTreeMap<(Innovation, Innovation), Innovation>,
    fitness: Option<Fitness>,
}

impl NNGenome {
    fn generate_nodes<R: Rng + ?Sized>(
        config: &GeneticConfig,
        rng: &mut R,
    ) -> BTreeMap<Innovation, Node> {
        let input_count = config.input_count.get();
        let output_count = config.output_count.get();

        let mut nodes = BTreeMap::new();
        for i in 0..input_count {
            nodes.insert(i, Node::new(i, NodeType::Sensor, ActivationType::Identity));
        }
        for o in 0..output_count {
            let id = o + input_count;
            let activation = config
                .output_activation_types
                .get(o)
                .copied()
                .unwrap_or(ActivationType::Sigmoid);
            let mut node = Node::new(id, NodeType::Actuator, activation);
            Self::init_node_attributes(&mut node, config, rng);
            nodes.insert(id, node);
        }
        nodes
    }

    fn init_node_attributes<R: Rng + ?Sized>(node: &mut Node, config: &GeneticConfig, rng: &mut R) {
        node.set_bias(config.bias.init_value(rng));
        node.set_response(config.response.init_value(rng));
        if let Some(aggregation) = config.aggregation_types.choose(rng) {
            node.set_aggregation_type(*aggregation);
        }
    }

    fn generate_initial_genes<R: Rng + ?Sized>(&mut self, config: &GeneticConfig, rng: &mut R) {
        let input_count = config.input_count.get();
        let output_count = config.output_count.get();
        for i in 0..input_count {
            for o in 0..output_count {
                if rng.gen::<f32>() < config.initial_expression_chance {
                    let weight = config.weight.init_value(rng);
                    self.add_gene_unchecked(o + i * output_count, i, o + input_count, weight);
                }
            }
        }
    }

    /// Add a new gene to the genome.
    /// Returns a reference to the new gene.
    ///
    /// # Panics
    ///
    /// This function will panic if a gene with the same
    /// `gene_id` already existed in the genome, if either `input_id`
    /// or `output_id` do not correspond to nodes present in the genome,
    /// if another gene joins the same nodes, or if `output_id`
    /// corresponds to a sensor node.
    ///
    /// # Examples
    /// ```
    /// use neatgen::Genome;
    /// use neatgen_nn::genomics::{GeneticConfig, NNGenome};
    /// use rand::SeedableRng;
    /// use rand_chacha::ChaCha8Rng;
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     initial_expression_chance: 0.0,
    ///     ..GeneticConfig::zero()
    /// };
    ///
    /// let mut genome = NNGenome::new(0, &config, &mut ChaCha8Rng::seed_from_u64(0));
    ///
    /// // The genome is initially empty.
    /// assert_eq!(genome.genes().count(), 0);
    ///
    /// let inserted_gene = genome.add_gene(42, 2, 4, 2.5).clone();
    ///
    /// // The genome now contains a gene with the specified characteristics.
    /// assert_eq!(&inserted_gene, genome.genes().next().unwrap());
    /// assert_eq!(inserted_gene.endpoints(), (2, 4));
    /// assert_eq!(inserted_gene.weight(), 2.5);
    ///
    /// // Make a cycle (gene 43 goes 3 -> 4, gene 44 goes 4 -> 3).
    /// genome.add_gene(43, 3, 4, -3.0);
    /// genome.add_gene(44, 4, 3, 1.0);
    ///
    /// // Recursive gene.
    /// genome.add_gene(45, 4, 4, -1.0);
    /// assert!(genome.validate().is_ok());
    /// ```
    pub fn add_gene(
        &mut self,
        gene_id: Innovation,
        input_id: Innovation,
        output_id: Innovation,
        weight: f32,
    ) -> &mut Gene {
        if let Err(e) = self.check_gene_viability(gene_id, input_id, output_id) {
            panic!("{} in {}", e, self);
        }
        self.add_gene_unchecked(gene_id, input_id, output_id, weight)
    }

    /// Add a new gene to the genome.
    /// Assumes that the gene is not a duplicate
    /// or invalid gene for the genome.
    fn add_gene_unchecked(
        &mut self,
        gene_id: Innovation,
        input_id: Innovation,
        output_id: Innovation,
        weight: f32,
    ) -> &mut Gene {
        if let Some(input) = self.nodes.get_mut(&input_id) {
            let _ = input.add_output_gene(gene_id);
        }
        if let Some(output) = self.nodes.get_mut(&output_id) {
            let _ = output.add_input_gene(gene_id);
        }
        self.node_pairings.insert((input_id, output_id), gene_id);
        self.genes
            .entry(gene_id)
            .or_insert_with(|| Gene::new(gene_id, input_id, output_id, weight))
    }

    /// Checks whether a gene is a duplicate or
    /// is invalid for the genome.
    fn check_gene_viability(
        &self,
        gene_id: Innovation,
        input_id: Innovation,
        output_id: Innovation,
    ) -> Result<(), GeneValidityError> {
        use GeneValidityError::*;
        match (self.nodes.get(&input_id), self.nodes.get(&output_id)) {
            _ if self.genes.contains_key(&gene_id) => Err(DuplicateGeneID(gene_id)),
            (Some(_), Some(output)) => {
                if self.node_pairings.contains_key(&(input_id, output_id)) {
                    Err(DuplicateGeneWithEndpoints(gene_id, (input_id, output_id)))
                } else if output.node_type() == NodeType::Sensor {
                    Err(SensorEndpoint(output_id))
                } else {
                    Ok(())
                }
            }
            _ => Err(NonexistentEndpoints(input_id, output_id)),
        }
    }

    /// Removes a gene and its references from
    /// the genome's nodes and endpoint index.
    fn remove_gene_unchecked(&mut self, gene_id: Innovation) -> Option<Gene> {
        let gene = self.genes.remove(&gene_id)?;
        if let Some(input) = self.nodes.get_mut(&gene.input()) {
            let _ = input.remove_output_gene(gene_id);
        }
        if let Some(output) = self.nodes.get_mut(&gene.output()) {
            let _ = output.remove_input_gene(gene_id);
        }
        self.node_pairings.remove(&gene.endpoints());
        Some(gene)
    }

    /// Add a new hidden node to the genome, with no
    /// bias, unit response and sum aggregation.
    /// Returns a reference to the newly created node.
    ///
    /// # Panics
    ///
    /// This function panics if a node of the
    /// same ID already existed in the genome.
    ///
    /// # Examples
    /// ```
    /// use neatgen::Genome;
    /// use neatgen_nn::genomics::{ActivationType, GeneticConfig, NNGenome, NodeType};
    /// use rand::SeedableRng;
    /// use rand_chacha::ChaCha8Rng;
    ///
    /// let config = GeneticConfig::zero();
    /// let mut genome = NNGenome::new(0, &config, &mut ChaCha8Rng::seed_from_u64(0));
    ///
    /// let inserted_node = genome.add_node(42, ActivationType::Tanh).clone();
    ///
    /// assert_eq!(genome.nodes().count(), 1 + 1 + 1);
    /// assert_eq!(genome.node(42), Some(&inserted_node));
    /// assert_eq!(inserted_node.node_type(), NodeType::Neuron);
    /// ```
    pub fn add_node(&mut self, node_id: Innovation, activation_type: ActivationType) -> &mut Node {
        if self.nodes.contains_key(&node_id) {
            panic!("{} in {}", NodeValidityError::DuplicateNodeID(node_id), self);
        }
        self.nodes
            .entry(node_id)
            .or_insert_with(|| Node::new(node_id, NodeType::Neuron, activation_type))
    }

    fn add_random_hidden_node<R: Rng + ?Sized>(
        &mut self,
        node_id: Innovation,
        config: &GeneticConfig,
        rng: &mut R,
    ) {
        let activation = config
            .activation_types
            .choose(rng)
            .copied()
            .unwrap_or(ActivationType::Sigmoid);
        let mut node = Node::new(node_id, NodeType::Neuron, activation);
        Self::init_node_attributes(&mut node, config, rng);
        self.nodes.insert(node_id, node);
    }

    /// Mutates the genome's gene and node attributes:
    /// weights, enabled flags, biases, responses, and
    /// activation and aggregation types, each according
    /// to its rates in `config`.
    ///
    /// Sensor nodes are never mutated, and output nodes
    /// keep their activation types.
    pub fn mutate_attributes<R: Rng + ?Sized>(&mut self, config: &GeneticConfig, rng: &mut R) {
        for gene in self.genes.values_mut() {
            gene.set_weight(config.weight.mutate_value(gene.weight(), rng));
            if rng.gen::<f32>() < config.enabled_mutate_rate {
                gene.set_enabled(!gene.enabled());
            }
        }
        for node in self.nodes.values_mut() {
            if node.node_type() == NodeType::Sensor {
                continue;
            }
            node.set_bias(config.bias.mutate_value(node.bias(), rng));
            node.set_response(config.response.mutate_value(node.response(), rng));
            if node.node_type() == NodeType::Neuron
                && rng.gen::<f32>() < config.activation_mutate_rate
            {
                if let Some(activation) = config.activation_types.choose(rng) {
                    node.set_activation_type(*activation);
                }
            }
            if rng.gen::<f32>() < config.aggregation_mutate_rate {
                if let Some(aggregation) = config.aggregation_types.choose(rng) {
                    node.set_aggregation_type(*aggregation);
                }
            }
        }
    }

    /// Induces a _gene mutation_ in the genome.
    /// If successful, returns the newly added gene.
    ///
    /// Genes never end in sensor nodes, nor join two output nodes.
    /// With [`feed_forward`] set, genes that would close a cycle
    /// are never added; otherwise, genes from a hidden or output
    /// node to itself are added with probability [`recursion_chance`].
    ///
    /// # Errors
    ///
    /// Returns an error if no viable pair of nodes
    /// exists or [too many] attempts have failed.
    ///
    /// [`feed_forward`]: crate::genomics::GeneticConfig::feed_forward
    /// [`recursion_chance`]: crate::genomics::GeneticConfig::recursion_chance
    /// [too many]: crate::genomics::GeneticConfig::max_gene_addition_mutation_attempts
    ///
    /// # Examples
    /// ```
    /// use neatgen::Genome;
    /// use neatgen_nn::genomics::{GeneticConfig, History, NNGenome};
    /// use rand::SeedableRng;
    /// use rand_chacha::ChaCha8Rng;
    ///
    /// let config = GeneticConfig {
    ///     initial_expression_chance: 0.0,
    ///     max_gene_addition_mutation_attempts: 1,
    ///     recursion_chance: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut rng = ChaCha8Rng::seed_from_u64(0);
    /// let mut genome = NNGenome::new(0, &config, &mut rng);
    ///
    /// // The genome is initially empty.
    /// assert_eq!(genome.genes().count(), 0);
    ///
    /// genome.mutate_add_gene(&mut History::new(&config), &config, &mut rng).unwrap();
    ///
    /// // The genome now has a new gene.
    /// assert_eq!(genome.genes().count(), 1);
    /// ```
    pub fn mutate_add_gene<R: Rng + ?Sized>(
        &mut self,
        history: &mut History,
        config: &GeneticConfig,
        rng: &mut R,
    ) -> Result<&Gene, GeneAdditionMutationError> {
        let non_sensor_nodes = self.select_non_sensor_nodes();
        let mut potential_inputs = self.select_potential_input_nodes(&non_sensor_nodes);

        if potential_inputs.is_empty() {
            return Err(GeneAdditionMutationError::GenomeFullyConnected);
        }
        potential_inputs.shuffle(rng);

        match self.find_node_pair(&potential_inputs, &non_sensor_nodes, config, rng) {
            Some((input, output)) => {
                let gene_id = history.gene_innovation(input, output);
                let weight = config.weight.init_value(rng);
                let gene: &Gene = self.add_gene(gene_id, input, output, weight);
                Ok(gene)
            }
            None => Err(GeneAdditionMutationError::NoInputOutputPairFound),
        }
    }

    fn select_non_sensor_nodes(&self) -> BTreeSet<Innovation> {
        self.nodes
            .values()
            .filter(|n| n.node_type() != NodeType::Sensor)
            .map(Node::innovation)
            .collect()
    }

    fn select_potential_input_nodes(&self, non_sensor_nodes: &BTreeSet<Innovation>) -> Vec<Innovation> {
        self.nodes
            .values()
            .filter(|n| n.output_genes().count() < non_sensor_nodes.len())
            .map(Node::innovation)
            .collect()
    }

    fn find_node_pair<R: Rng + ?Sized>(
        &self,
        potential_inputs: &[Innovation],
        potential_outputs: &BTreeSet<Innovation>,
        config: &GeneticConfig,
        rng: &mut R,
    ) -> Option<(Innovation, Innovation)> {
        potential_inputs
            .iter()
            .take(config.max_gene_addition_mutation_attempts)
            .find_map(|i| {
                self.choose_output_node_for(*i, potential_outputs, config, rng)
                    .map(|output| (*i, output))
            })
    }

    fn choose_output_node_for<R: Rng + ?Sized>(
        &self,
        candidate_input: Innovation,
        potential_outputs: &BTreeSet<Innovation>,
        config: &GeneticConfig,
        rng: &mut R,
    ) -> Option<Innovation> {
        let input = &self.nodes[&candidate_input];
        if !config.feed_forward
            && input.node_type() != NodeType::Sensor
            && !self.node_pairings.contains_key(&(candidate_input, candidate_input))
            && rng.gen::<f32>() < config.recursion_chance
        {
            return Some(candidate_input);
        }

        let connected: BTreeSet<_> = input
            .output_genes()
            .map(|id| self.genes[id].output())
            .collect();
        potential_outputs
            .iter()
            .copied()
            .filter(|o| *o != candidate_input && !connected.contains(o))
            .filter(|o| {
                input.node_type() != NodeType::Actuator
                    || self.nodes[o].node_type() != NodeType::Actuator
            })
            .filter(|o| {
                !config.feed_forward
                    || !creates_cycle(self.node_pairings.keys().copied(), (candidate_input, *o))
            })
            .choose(rng)
    }

    /// Induces a _node mutation_ in the genome, splitting
    /// a random enabled gene in two with a new node in between.
    /// If succesful, returns the triplet (_in gene_, _new node_, _out gene_)
    /// as a tuple of references.
    ///
    /// The split gene is disabled. The _in gene_ gets a weight
    /// of 1, and the _out gene_ the split gene's weight.
    ///
    /// # Errors
    ///
    /// This function returns an error if there are no enabled
    /// genes in the genome that could be split.
    ///
    /// # Examples
    /// ```
    /// use neatgen::Genome;
    /// use neatgen_nn::genomics::{ActivationType, GeneticConfig, History, NNGenome, NodeType};
    /// use rand::SeedableRng;
    /// use rand_chacha::ChaCha8Rng;
    ///
    /// let config = GeneticConfig {
    ///     initial_expression_chance: 1.0,
    ///     activation_types: vec![ActivationType::ReLU],
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut rng = ChaCha8Rng::seed_from_u64(0);
    /// let mut genome = NNGenome::new(0, &config, &mut rng);
    ///
    /// // The genome starts with a single gene,
    /// // and a sensor and actuator node.
    /// assert_eq!(genome.genes().count(), 1);
    /// assert_eq!(genome.nodes().count(), 1 + 1);
    ///
    /// let prev_gene = genome.genes().next().unwrap().clone();
    ///
    /// let (new_input_gene, new_node, new_output_gene) =
    ///     genome.mutate_add_node(&mut History::new(&config), &config, &mut rng).unwrap();
    ///
    /// assert_eq!(new_input_gene.output(), new_node.innovation());
    /// assert_eq!(new_input_gene.weight(), 1.0);
    ///
    /// assert_eq!(new_output_gene.input(), new_node.innovation());
    /// assert_eq!(new_output_gene.weight(), prev_gene.weight());
    ///
    /// assert_eq!(new_node.activation_type(), ActivationType::ReLU);
    /// assert_eq!(new_node.node_type(), NodeType::Neuron);
    ///
    /// assert_eq!(genome.genes().count(), 1 + 2);
    /// assert_eq!(genome.nodes().count(), 1 + 1 + 1);
    ///
    /// // Old gene is disabled, not removed.
    /// assert!(!genome.gene(prev_gene.innovation()).unwrap().enabled());
    /// ```
    pub fn mutate_add_node<R: Rng + ?Sized>(
        &mut self,
        history: &mut History,
        config: &GeneticConfig,
        rng: &mut R,
    ) -> Result<(&Gene, &Node, &Gene), NodeAdditionMutationError> {
        let gene_to_split = self
            .genes
            .values()
            .filter(|g| g.enabled())
            .map(Gene::innovation)
            .choose(rng)
            .ok_or(NodeAdditionMutationError::EmptyGenome)?;
        let (input_node, output_node) = self.genes[&gene_to_split].endpoints();
        let split_weight = self.genes[&gene_to_split].weight();

        let mut mutation = history.node_innovation(gene_to_split, (input_node, output_node), false);
        if self.split_already_present(mutation) {
            mutation = history.node_innovation(gene_to_split, (input_node, output_node), true);
        }
        let (input_gene, new_node, output_gene) = mutation;

        if let Some(gene) = self.genes.get_mut(&gene_to_split) {
            gene.set_enabled(false);
        }
        self.add_random_hidden_node(new_node, config, rng);
        self.add_gene_unchecked(input_gene, input_node, new_node, 1.0);
        self.add_gene_unchecked(output_gene, new_node, output_node, split_weight);

        Ok((
            &self.genes[&input_gene],
            &self.nodes[&new_node],
            &self.genes[&output_gene],
        ))
    }

    /// Whether the genome already contains any part of a node mutation,
    /// from having split the same gene before.
    fn split_already_present(&self, mutation: (Innovation, Innovation, Innovation)) -> bool {
        let (input_gene, new_node, output_gene) = mutation;
        self.nodes.contains_key(&new_node)
            || self.genes.contains_key(&input_gene)
            || self.genes.contains_key(&output_gene)
    }

    /// Deletes a randomly-chosen gene from the genome,
    /// and returns it.
    ///
    /// # Errors
    /// Returns an error if the genome has no genes.
    pub fn mutate_delete_gene<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<Gene, DeletionMutationError> {
        self.genes
            .keys()
            .copied()
            .choose(rng)
            .and_then(|innovation| self.remove_gene_unchecked(innovation))
            .ok_or(DeletionMutationError::NoGenes)
    }

    /// Deletes a randomly-chosen hidden node, and all
    /// incident genes, from the genome. Returns the node
    /// and its genes, in increasing innovation order.
    ///
    /// # Errors
    /// Returns an error if the genome has no hidden nodes.
    ///
    /// # Examples
    /// ```
    /// use neatgen::Genome;
    /// use neatgen_nn::genomics::{ActivationType, GeneticConfig, NNGenome};
    /// use rand::SeedableRng;
    /// use rand_chacha::ChaCha8Rng;
    ///
    /// let mut rng = ChaCha8Rng::seed_from_u64(0);
    /// let mut genome = NNGenome::new(0, &GeneticConfig::zero(), &mut rng);
    /// genome.add_node(42, ActivationType::Sigmoid);
    /// genome.add_gene(16, 0, 42, 1.0);
    /// genome.add_gene(17, 42, 1, 1.0);
    ///
    /// let (removed_node, removed_genes) = genome.mutate_delete_node(&mut rng).unwrap();
    ///
    /// assert_eq!(removed_node.innovation(), 42);
    /// assert_eq!(removed_genes[0].innovation(), 16);
    /// assert_eq!(removed_genes[1].innovation(), 17);
    ///
    /// assert_eq!(genome.nodes().count(), 2);
    /// assert_eq!(genome.genes().count(), 0);
    /// ```
    pub fn mutate_delete_node<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<(Node, Vec<Gene>), DeletionMutationError> {
        let innovation = self
            .nodes
            .values()
            .filter(|n| n.node_type() == NodeType::Neuron)
            .map(Node::innovation)
            .choose(rng)
            .ok_or(DeletionMutationError::NoHiddenNodes)?;
        let incident: BTreeSet<Innovation> = {
            let node = &self.nodes[&innovation];
            node.input_genes().chain(node.output_genes()).copied().collect()
        };
        let genes = incident
            .into_iter()
            .filter_map(|id| self.remove_gene_unchecked(id))
            .collect();
        let node = self
            .nodes
            .remove(&innovation)
            .ok_or(DeletionMutationError::NoHiddenNodes)?;
        Ok((node, genes))
    }

    /// Applies structural and attribute mutations to the genome,
    /// with the probabilities specified in `config`.
    ///
    /// With [`single_structural_mutation`] set, at most one structural
    /// mutation is chosen, in proportion to its chance; otherwise each
    /// is applied independently. Attribute mutations follow.
    ///
    /// [`single_structural_mutation`]: crate::genomics::GeneticConfig::single_structural_mutation
    pub fn mutate<R: Rng + ?Sized>(
        &mut self,
        history: &mut History,
        config: &GeneticConfig,
        rng: &mut R,
    ) {
        use StructuralMutation::*;
        let chances = [
            (DeleteNode, config.node_deletion_mutation_chance),
            (DeleteGene, config.gene_deletion_mutation_chance),
            (AddNode, config.node_addition_mutation_chance),
            (AddGene, config.gene_addition_mutation_chance),
        ];
        if config.single_structural_mutation {
            let total: f32 = chances.iter().map(|(_, chance)| chance).sum();
            let mut r = rng.gen::<f32>() * total.max(1.0);
            for (mutation, chance) in chances {
                if r < chance {
                    self.mutate_structure(mutation, history, config, rng);
                    break;
                }
                r -= chance;
            }
        } else {
            for (mutation, chance) in chances {
                if rng.gen::<f32>() < chance {
                    self.mutate_structure(mutation, history, config, rng);
                }
            }
        }
        self.mutate_attributes(config, rng);
    }

    fn mutate_structure<R: Rng + ?Sized>(
        &mut self,
        mutation: StructuralMutation,
        history: &mut History,
        config: &GeneticConfig,
        rng: &mut R,
    ) {
        let result = match mutation {
            StructuralMutation::DeleteNode => {
                self.mutate_delete_node(rng).map(drop).map_err(|e| e.to_string())
            }
            StructuralMutation::DeleteGene => {
                self.mutate_delete_gene(rng).map(drop).map_err(|e| e.to_string())
            }
            StructuralMutation::AddNode => self
                .mutate_add_node(history, config, rng)
                .map(drop)
                .map_err(|e| e.to_string()),
            StructuralMutation::AddGene => self
                .mutate_add_gene(history, config, rng)
                .map(drop)
                .map_err(|e| e.to_string()),
        };
        if let Err(error) = result {
            tracing::trace!(genome = self.key, ?mutation, %error, "structural mutation skipped");
        }
    }

    /// Returns a child with the gene layout of `fitter`, and
    /// alleles of common genes taken from either parent.
    ///
    /// Which parent is fitter is decided by the caller's
    /// ranking (crowded comparison under NSGA-II).
    fn crossover<R: Rng + ?Sized>(
        key: GenomeKey,
        fitter: &NNGenome,
        other: &NNGenome,
        config: &GeneticConfig,
        rng: &mut R,
    ) -> NNGenome {
        let mut child = fitter.clone();
        child.key = key;
        child.fitness = None;

        for (id, gene) in child.genes.iter_mut() {
            if let Some(others_gene) = other.genes.get(id) {
                if rng.gen::<f32>() >= config.crossover_fitter_bias {
                    gene.set_weight(others_gene.weight());
                    gene.set_enabled(others_gene.enabled());
                }
            }
        }
        for (id, node) in child.nodes.iter_mut() {
            if let Some(others_node) = other.nodes.get(id) {
                if rng.gen::<f32>() >= config.crossover_fitter_bias {
                    node.inherit_attributes(others_node);
                }
            }
        }
        child
    }

    /// Checks the genome's structural invariants: genes join
    /// existing nodes, never end in sensors, are listed by both of
    /// their endpoints, and no two genes share the same endpoints.
    ///
    /// # Errors
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), GenomeValidityError> {
        use GenomeValidityError::*;
        for (id, gene) in &self.genes {
            let (input_id, output_id) = gene.endpoints();
            let input = self.nodes.get(&input_id).ok_or(DanglingEndpoint {
                gene: *id,
                node: input_id,
            })?;
            let output = self.nodes.get(&output_id).ok_or(DanglingEndpoint {
                gene: *id,
                node: output_id,
            })?;
            if output.node_type() == NodeType::Sensor {
                return Err(SensorInput {
                    gene: *id,
                    node: output_id,
                });
            }
            if !input.has_output_gene(*id) {
                return Err(AdjacencyMismatch {
                    node: input_id,
                    gene: *id,
                });
            }
            if !output.has_input_gene(*id) {
                return Err(AdjacencyMismatch {
                    node: output_id,
                    gene: *id,
                });
            }
            match self.node_pairings.get(&gene.endpoints()) {
                Some(indexed) if indexed == id => {}
                Some(indexed) => return Err(DuplicateEndpoints(*indexed, *id)),
                None => return Err(EndpointIndexMismatch),
            }
        }
        if self.node_pairings.len() != self.genes.len() {
            return Err(EndpointIndexMismatch);
        }
        for node in self.nodes.values() {
            let node_id = node.innovation();
            let listed = node
                .input_genes()
                .map(|id| (id, false))
                .chain(node.output_genes().map(|id| (id, true)));
            for (gene_id, outgoing) in listed {
                let endpoint = self.genes.get(gene_id).map(|g| {
                    if outgoing {
                        g.input()
                    } else {
                        g.output()
                    }
                });
                if endpoint != Some(node_id) {
                    return Err(AdjacencyMismatch {
                        node: node_id,
                        gene: *gene_id,
                    });
                }
            }
        }
        Ok(())
    }

    /// Returns an iterator over the genome's genes,
    /// in increasing innovation order.
    ///
    /// # Examples
    /// ```
    /// use neatgen::Genome;
    /// use neatgen_nn::genomics::{GeneticConfig, NNGenome};
    /// use rand::SeedableRng;
    /// use rand_chacha::ChaCha8Rng;
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     initial_expression_chance: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    ///
    /// let genome = NNGenome::new(0, &config, &mut ChaCha8Rng::seed_from_u64(0));
    ///
    /// for gene in genome.genes() {
    ///     println!("gene: {}", gene);
    /// }
    /// assert!(genome.genes().map(|g| g.innovation()).eq(0..6));
    /// ```
    pub fn genes(&self) -> impl Iterator<Item = &Gene> {
        self.genes.values()
    }

    /// Returns an iterator over the genome's nodes,
    /// in increasing innovation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn gene(&self, innovation: Innovation) -> Option<&Gene> {
        self.genes.get(&innovation)
    }

    pub fn node(&self, innovation: Innovation) -> Option<&Node> {
        self.nodes.get(&innovation)
    }
}

impl Genome for NNGenome {
    type Config = GeneticConfig;
    type InnovationHistory = History;

    /// Create a new genome with the specified configuration.
    ///
    /// Initially generated genes are given the innovation number
    /// `o + i ⨯ output_count`, where `i` is the innovation number
    /// of their input node and `o` is the index of their output node.
    /// Thus, genes created through mutation start at innovation
    /// number `input_count ⨯ output_count`.
    ///
    /// # Examples
    /// ```
    /// use neatgen::Genome;
    /// use neatgen_nn::genomics::{ActivationType, GeneticConfig, NNGenome, NodeType};
    /// use rand::SeedableRng;
    /// use rand_chacha::ChaCha8Rng;
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     initial_expression_chance: 1.0,
    ///     ..GeneticConfig::default()
    /// };
    ///
    /// let genome = NNGenome::new(7, &config, &mut ChaCha8Rng::seed_from_u64(0));
    ///
    /// // As configured, the genome should have 3 sensors + 2 actuators.
    /// assert_eq!(genome.key(), 7);
    /// assert_eq!(genome.nodes().filter(|n| n.node_type() == NodeType::Sensor).count(), 3);
    /// assert_eq!(genome.nodes().filter(|n| n.node_type() == NodeType::Actuator).count(), 2);
    ///
    /// // And with an initial_expression_chance of 1, there is a gene for every pair of nodes.
    /// assert_eq!(genome.genes().count(), 3 * 2);
    ///
    /// // All genes should have weights within the configured bounds.
    /// assert!(genome.genes().all(|g| (config.weight.min..=config.weight.max).contains(&g.weight())));
    /// ```
    fn new<R: Rng + ?Sized>(key: GenomeKey, config: &GeneticConfig, rng: &mut R) -> NNGenome {
        let mut genome = NNGenome {
            key,
            genes: BTreeMap::new(),
            nodes: Self::generate_nodes(config, rng),
            node_pairings: BTreeMap::new(),
            fitness: None,
        };
        genome.generate_initial_genes(config, rng);
        genome
    }

    fn key(&self) -> GenomeKey {
        self.key
    }

    /// Calculates the _genetic distance_ between two genomes,
    /// weighting structural and weight differences as specified
    /// in `config`.
    ///
    /// Genes and hidden nodes present in only one genome are
    /// _disjoint_ if their innovation number is within the range
    /// of both genomes, and _excess_ otherwise. Their counts are
    /// normalized by the size of the larger genome, unless it has
    /// fewer than [`normalization_threshold`] genes and hidden nodes.
    ///
    /// [`normalization_threshold`]: crate::genomics::GeneticConfig::normalization_threshold
    ///
    /// # Examples
    /// ```
    /// use neatgen::Genome;
    /// use neatgen_nn::genomics::{ActivationType, GeneticConfig, NNGenome};
    /// use rand::SeedableRng;
    /// use rand_chacha::ChaCha8Rng;
    /// use std::num::NonZeroUsize;
    ///
    /// // Completely arbitrary quantities.
    /// const EXCESS_FACTOR: f32 = 1.5;
    /// const DISJOINT_FACTOR: f32 = 0.5;
    /// const WEIGHT_FACTOR: f32 = 0.25;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(2).unwrap(),
    ///     output_count: NonZeroUsize::new(1).unwrap(),
    ///     excess_gene_factor: EXCESS_FACTOR,
    ///     disjoint_gene_factor: DISJOINT_FACTOR,
    ///     common_weight_factor: WEIGHT_FACTOR,
    ///     normalization_threshold: 20,
    ///     ..GeneticConfig::zero()
    /// };
    ///
    /// let mut rng = ChaCha8Rng::seed_from_u64(0);
    /// let mut genome1 = NNGenome::new(1, &config, &mut rng);
    /// let mut genome2 = NNGenome::new(2, &config, &mut rng);
    ///
    /// genome1.add_node(3, ActivationType::Sigmoid);
    /// genome2.add_node(3, ActivationType::Sigmoid);
    ///
    /// // Common gene, weight difference of 2.0.
    /// genome1.add_gene(0, 0, 2, 1.0);
    /// genome2.add_gene(0, 0, 2, -1.0);
    ///
    /// // Disjoint genes.
    /// genome1.add_gene(1, 1, 2, 3.0);
    /// genome2.add_gene(2, 1, 3, 1.0);
    ///
    /// // Common gene, weight difference of 0.0.
    /// genome1.add_gene(3, 2, 3, 1.0);
    /// genome2.add_gene(3, 2, 3, 1.0);
    ///
    /// // Excess gene.
    /// genome1.add_gene(4, 2, 2, 3.0);
    ///
    /// assert_eq!(
    ///     NNGenome::genetic_distance(&genome1, &genome2, &config),
    ///     EXCESS_FACTOR * 1.0 + DISJOINT_FACTOR * 2.0 + WEIGHT_FACTOR * (2.0 + 0.0) / 2.0
    /// );
    /// ```
    fn genetic_distance(first: &NNGenome, second: &NNGenome, config: &GeneticConfig) -> f32 {
        let genes = |g: &NNGenome| g.genes.keys().copied().collect::<BTreeSet<_>>();
        let hidden_nodes = |g: &NNGenome| {
            g.nodes
                .values()
                .filter(|n| n.node_type() == NodeType::Neuron)
                .map(Node::innovation)
                .collect::<BTreeSet<_>>()
        };

        let (first_genes, second_genes) = (genes(first), genes(second));
        let (first_nodes, second_nodes) = (hidden_nodes(first), hidden_nodes(second));
        let (gene_disjoint, gene_excess) = disjoint_and_excess(&first_genes, &second_genes);
        let (node_disjoint, node_excess) = disjoint_and_excess(&first_nodes, &second_nodes);

        let weight_diffs: Vec<f32> = first_genes
            .intersection(&second_genes)
            .map(|id| (first.genes[id].weight() - second.genes[id].weight()).abs())
            .collect();
        let weight_diff = if weight_diffs.is_empty() {
            0.0
        } else {
            weight_diffs.iter().sum::<f32>() / weight_diffs.len() as f32
        };

        let size = (first_genes.len() + first_nodes.len())
            .max(second_genes.len() + second_nodes.len());
        let n = if size < config.normalization_threshold {
            1
        } else {
            size.max(1)
        };

        (config.excess_gene_factor * (gene_excess + node_excess) as f32
            + config.disjoint_gene_factor * (gene_disjoint + node_disjoint) as f32)
            / n as f32
            + config.common_weight_factor * weight_diff
    }

    /// Combines two genomes and returns their _child_ genome.
    ///
    /// The child takes the structure of the fitter parent, `parent1`
    /// when both are equally fit. Depending on
    /// [`config.child_mutation_chance`], the child may then undergo
    /// mutations.
    ///
    /// [`config.child_mutation_chance`]: crate::genomics::GeneticConfig::child_mutation_chance
    ///
    /// # Panics
    /// Panics if the child is structurally invalid, which
    /// would be a bug in the genetic operators.
    ///
    /// # Examples
    /// ```
    /// use neatgen::Genome;
    /// use neatgen_nn::genomics::{GeneticConfig, History, NNGenome};
    /// use rand::SeedableRng;
    /// use rand_chacha::ChaCha8Rng;
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     initial_expression_chance: 1.0,
    ///     child_mutation_chance: 0.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut rng = ChaCha8Rng::seed_from_u64(0);
    ///
    /// let parent = NNGenome::new(1, &config, &mut rng);
    ///
    /// // A genome can be "mated" with itself,
    /// // which implies asexual reproduction:
    /// let child = NNGenome::mate(2, &parent, &parent, &mut History::new(&config), &config, &mut rng);
    /// assert_eq!(child.key(), 2);
    /// assert!(child.genes().eq(parent.genes()));
    /// assert!(child.fitness().is_none());
    /// ```
    fn mate<R: Rng + ?Sized>(
        key: GenomeKey,
        parent1: &NNGenome,
        parent2: &NNGenome,
        history: &mut History,
        config: &GeneticConfig,
        rng: &mut R,
    ) -> NNGenome {
        let mut child = Self::crossover(key, parent1, parent2, config, rng);
        if rng.gen::<f32>() < config.child_mutation_chance {
            child.mutate(history, config, rng);
        }
        if let Err(e) = child.validate() {
            panic!("invalid child {}: {}", child, e);
        }
        child
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

#[derive(Clone, Copy, Debug)]
enum StructuralMutation {
    DeleteNode,
    DeleteGene,
    AddNode,
    AddGene,
}

/// Counts the ids present in only one of two sets, as
/// `(disjoint, excess)`: disjoint ids are no greater than
/// both sets' maximum ids.
fn disjoint_and_excess(a: &BTreeSet<Innovation>, b: &BTreeSet<Innovation>) -> (usize, usize) {
    let bound = a.last().zip(b.last()).map(|(x, y)| *x.min(y));
    a.symmetric_difference(b)
        .fold((0, 0), |(disjoint, excess), id| match bound {
            Some(bound) if *id <= bound => (disjoint + 1, excess),
            _ => (disjoint, excess + 1),
        })
}

impl fmt::Display for NNGenome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let genes: Vec<&Gene> = self.genes.values().collect();
        let nodes: Vec<&Node> = self.nodes.values().collect();
        f.debug_struct("NNGenome")
            .field("Key", &self.key)
            .field("Genes", &genes)
            .field("Nodes", &nodes)
            .field("Fitness", &self.fitness)
            .finish()
    }
}
