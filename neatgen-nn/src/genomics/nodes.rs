use super::{AbsentEntryRemoval, GeneValidityError};
use crate::Innovation;

use serde::{Deserialize, Serialize};

use std::collections::BTreeSet;
use std::fmt;

/// An ActivationType represents the type
/// of activation function the node's network
/// equivalent will use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum ActivationType {
    // 1 / (1 + exp(-4.9x))
    Sigmoid,
    // x
    Identity,
    // 0   if x < 0
    // x   if x ≥ 0
    ReLU,
    // exp(-x²)
    Gaussian,
    // sin(πx)
    Sinusoidal,
    // tanh(x)
    Tanh,
}

impl ActivationType {
    /// Applies the activation function to `x`.
    ///
    /// # Examples
    /// ```
    /// use neatgen_nn::genomics::ActivationType;
    ///
    /// assert_eq!(ActivationType::Sigmoid.apply(0.0), 0.5);
    /// assert_eq!(ActivationType::ReLU.apply(-3.0), 0.0);
    /// assert_eq!(ActivationType::Identity.apply(-3.0), -3.0);
    /// ```
    pub fn apply(self, x: f32) -> f32 {
        match self {
            ActivationType::Sigmoid => 1.0 / (1.0 + (-4.9 * x).exp()),
            ActivationType::Identity => x,
            ActivationType::ReLU => x.max(0.0),
            ActivationType::Gaussian => (-x * x).exp(),
            ActivationType::Sinusoidal => (std::f32::consts::PI * x).sin(),
            ActivationType::Tanh => x.tanh(),
        }
    }
}

/// An AggregationType represents the function
/// combining a node's weighted inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum AggregationType {
    Sum,
    Product,
    Max,
    Min,
    Mean,
}

impl AggregationType {
    /// Combines `inputs` into a single value.
    /// An empty input list aggregates to 0.
    ///
    /// # Examples
    /// ```
    /// use neatgen_nn::genomics::AggregationType;
    ///
    /// let inputs = [1.0, -2.0, 4.0];
    /// assert_eq!(AggregationType::Sum.apply(&inputs), 3.0);
    /// assert_eq!(AggregationType::Product.apply(&inputs), -8.0);
    /// assert_eq!(AggregationType::Max.apply(&inputs), 4.0);
    /// assert_eq!(AggregationType::Mean.apply(&inputs), 1.0);
    /// assert_eq!(AggregationType::Min.apply(&[]), 0.0);
    /// ```
    pub fn apply(self, inputs: &[f32]) -> f32 {
        if inputs.is_empty() {
            return 0.0;
        }
        match self {
            AggregationType::Sum => inputs.iter().sum(),
            AggregationType::Product => inputs.iter().product(),
            AggregationType::Max => inputs.iter().copied().fold(f32::MIN, f32::max),
            AggregationType::Min => inputs.iter().copied().fold(f32::MAX, f32::min),
            AggregationType::Mean => inputs.iter().sum::<f32>() / inputs.len() as f32,
        }
    }
}

/// A NodeType indicates the function of
/// the node's network equivalent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    /// Input nodes.
    Sensor,
    /// Hidden nodes.
    Neuron,
    /// Output nodes.
    Actuator,
}

/// Nodes are the structural elements of genomes
/// between which genes are created.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Node {
    id: Innovation,
    inputs: BTreeSet<Innovation>,
    outputs: BTreeSet<Innovation>,
    node_type: NodeType,
    bias: f32,
    response: f32,
    activation_type: ActivationType,
    aggregation_type: AggregationType,
}

impl Node {
    /// Generate a new node with the passed parameters,
    /// no bias, unit response and sum aggregation.
    ///
    /// # Examples
    /// ```
    /// use neatgen_nn::genomics::{Node, NodeType, ActivationType};
    ///
    /// let node = Node::new(5, NodeType::Neuron, ActivationType::Sigmoid);
    /// assert_eq!(node.bias(), 0.0);
    /// assert_eq!(node.response(), 1.0);
    /// ```
    pub fn new(id: Innovation, node_type: NodeType, activation_type: ActivationType) -> Node {
        Node {
            id,
            inputs: BTreeSet::new(),
            outputs: BTreeSet::new(),
            node_type,
            bias: 0.0,
            response: 1.0,
            activation_type,
            aggregation_type: AggregationType::Sum,
        }
    }

    /// Adds the passed innovation number to the node's
    /// list of input genes.
    ///
    /// # Errors
    /// This function returns an error if the gene is already
    /// in the node's inputs.
    ///
    /// # Examples
    /// ```
    /// use neatgen_nn::genomics::{Node, NodeType, ActivationType};
    ///
    /// let mut node = Node::new(5, NodeType::Neuron, ActivationType::Sigmoid);
    ///
    /// node.add_input_gene(9).unwrap();
    /// assert_eq!(*node.input_genes().next().unwrap(), 9);
    ///
    /// assert!(node.add_input_gene(9).is_err());
    /// ```
    pub fn add_input_gene(&mut self, gene_id: Innovation) -> Result<(), GeneValidityError> {
        if self.inputs.insert(gene_id) {
            Ok(())
        } else {
            Err(GeneValidityError::DuplicateGeneID(gene_id))
        }
    }

    /// Removes the input gene matching the specified
    /// innovation number.
    ///
    /// # Errors
    /// This function returns an error if the node
    /// has no input gene that matches the passed ID.
    pub fn remove_input_gene(&mut self, gene_id: Innovation) -> Result<(), AbsentEntryRemoval> {
        if self.inputs.remove(&gene_id) {
            Ok(())
        } else {
            Err(AbsentEntryRemoval::Gene(gene_id))
        }
    }

    /// Adds the passed innovation number to the node's
    /// list of output genes.
    ///
    /// # Errors
    /// This function returns an error if the gene is already
    /// in the node's outputs.
    pub fn add_output_gene(&mut self, gene_id: Innovation) -> Result<(), GeneValidityError> {
        if self.outputs.insert(gene_id) {
            Ok(())
        } else {
            Err(GeneValidityError::DuplicateGeneID(gene_id))
        }
    }

    /// Removes the output gene matching the specified
    /// innovation number.
    ///
    /// # Errors
    /// This function returns an error if the node
    /// has no output gene that matches the passed ID.
    ///
    /// # Examples
    /// ```
    /// use neatgen_nn::genomics::{Node, NodeType, ActivationType};
    ///
    /// let mut node = Node::new(5, NodeType::Neuron, ActivationType::Sigmoid);
    ///
    /// assert!(node.remove_output_gene(9).is_err());
    ///
    /// node.add_output_gene(9).unwrap();
    /// assert_eq!(node.output_genes().count(), 1);
    ///
    /// assert!(node.remove_output_gene(9).is_ok());
    /// assert_eq!(node.output_genes().count(), 0);
    /// ```
    pub fn remove_output_gene(&mut self, gene_id: Innovation) -> Result<(), AbsentEntryRemoval> {
        if self.outputs.remove(&gene_id) {
            Ok(())
        } else {
            Err(AbsentEntryRemoval::Gene(gene_id))
        }
    }

    /// Returns the node's innovation number.
    pub fn innovation(&self) -> Innovation {
        self.id
    }

    /// Returns an iterator over the node's input genes,
    /// in increasing order.
    pub fn input_genes(&self) -> impl Iterator<Item = &Innovation> {
        self.inputs.iter()
    }

    /// Returns an iterator over the node's output genes,
    /// in increasing order.
    pub fn output_genes(&self) -> impl Iterator<Item = &Innovation> {
        self.outputs.iter()
    }

    pub(super) fn has_input_gene(&self, gene_id: Innovation) -> bool {
        self.inputs.contains(&gene_id)
    }

    pub(super) fn has_output_gene(&self, gene_id: Innovation) -> bool {
        self.outputs.contains(&gene_id)
    }

    /// Returns the node's node type.
    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    /// Returns the node's bias.
    pub fn bias(&self) -> f32 {
        self.bias
    }

    pub fn set_bias(&mut self, bias: f32) {
        self.bias = bias;
    }

    /// Returns the node's response, the gain applied
    /// to its aggregated input.
    pub fn response(&self) -> f32 {
        self.response
    }

    pub fn set_response(&mut self, response: f32) {
        self.response = response;
    }

    /// Returns the node's activation type.
    pub fn activation_type(&self) -> ActivationType {
        self.activation_type
    }

    pub fn set_activation_type(&mut self, activation_type: ActivationType) {
        self.activation_type = activation_type;
    }

    /// Returns the node's aggregation type.
    pub fn aggregation_type(&self) -> AggregationType {
        self.aggregation_type
    }

    pub fn set_aggregation_type(&mut self, aggregation_type: AggregationType) {
        self.aggregation_type = aggregation_type;
    }

    /// Copies the node's inheritable attributes from `other`,
    /// leaving its connectivity untouched.
    pub(super) fn inherit_attributes(&mut self, other: &Node) {
        self.bias = other.bias;
        self.response = other.response;
        self.activation_type = other.activation_type;
        self.aggregation_type = other.aggregation_type;
    }

    /// Returns the node's output for an already weighted set of inputs.
    ///
    /// # Examples
    /// ```
    /// use neatgen_nn::genomics::{Node, NodeType, ActivationType};
    ///
    /// let mut node = Node::new(2, NodeType::Actuator, ActivationType::Identity);
    /// node.set_bias(0.5);
    /// node.set_response(2.0);
    ///
    /// assert_eq!(node.activate(&[1.0, 0.25]), 3.0);
    /// ```
    pub fn activate(&self, weighted_inputs: &[f32]) -> f32 {
        let aggregate = self.aggregation_type.apply(weighted_inputs);
        self.activation_type
            .apply(self.bias + self.response * aggregate)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}[{:?}, {:?}/{:?}, b={:.3}, r={:.3}, IN: {:?}, OUT: {:?}]",
            self.id,
            self.node_type,
            self.activation_type,
            self.aggregation_type,
            self.bias,
            self.response,
            self.inputs,
            self.outputs,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_and_output_genes_are_tracked_separately() {
        let mut node = Node::new(3, NodeType::Neuron, ActivationType::Tanh);
        node.add_input_gene(4).unwrap();
        node.add_output_gene(4).unwrap();
        node.add_input_gene(1).unwrap();

        assert_eq!(node.input_genes().copied().collect::<Vec<_>>(), [1, 4]);
        assert!(node.has_output_gene(4));
        assert!(matches!(
            node.add_output_gene(4),
            Err(GeneValidityError::DuplicateGeneID(4))
        ));

        node.remove_input_gene(4).unwrap();
        assert!(!node.has_input_gene(4));
        assert!(node.has_output_gene(4));
        assert!(matches!(
            node.remove_input_gene(4),
            Err(AbsentEntryRemoval::Gene(4))
        ));
    }

    #[test]
    fn inherited_attributes_keep_connectivity() {
        let mut node = Node::new(3, NodeType::Neuron, ActivationType::Sigmoid);
        node.add_input_gene(0).unwrap();

        let mut other = Node::new(3, NodeType::Neuron, ActivationType::Gaussian);
        other.set_bias(-1.5);
        other.set_aggregation_type(AggregationType::Max);
        node.inherit_attributes(&other);

        assert_eq!(node.activation_type(), ActivationType::Gaussian);
        assert_eq!(node.aggregation_type(), AggregationType::Max);
        assert_eq!(node.bias(), -1.5);
        assert_eq!(node.input_genes().count(), 1);
    }

    #[test]
    fn activation_functions() {
        assert!((ActivationType::Sigmoid.apply(10.0) - 1.0).abs() < 1e-6);
        assert_eq!(ActivationType::Gaussian.apply(0.0), 1.0);
        assert!(ActivationType::Sinusoidal.apply(1.0).abs() < 1e-6);
        assert_eq!(ActivationType::Tanh.apply(0.0), 0.0);
        assert_eq!(ActivationType::ReLU.apply(2.5), 2.5);
    }
}
