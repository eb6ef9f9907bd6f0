use neatgen_nn::genomics::{feed_forward_layers, NNGenome, Node, NodeType};
use neatgen_nn::Innovation;

use std::collections::BTreeMap;

/// A node evaluation step: the node, and
/// its incoming `(source, weight)` links.
struct NodeEval {
    node: Node,
    links: Vec<(Innovation, f32)>,
}

/// A neural network without cycles, evaluated
/// one layer at a time.
pub struct FeedForwardNetwork {
    inputs: Vec<Innovation>,
    outputs: Vec<Innovation>,
    evaluations: Vec<NodeEval>,
}

impl FeedForwardNetwork {
    /// Generates a new network from the passed genome's
    /// enabled genes. Nodes that don't lead to an output
    /// are left out.
    pub fn new(genome: &NNGenome) -> FeedForwardNetwork {
        let of_type = |node_type| {
            genome
                .nodes()
                .filter(|n| n.node_type() == node_type)
                .map(Node::innovation)
                .collect::<Vec<_>>()
        };
        let inputs = of_type(NodeType::Sensor);
        let outputs = of_type(NodeType::Actuator);
        let connections: Vec<_> = genome
            .genes()
            .filter(|g| g.enabled())
            .map(|g| g.endpoints())
            .collect();

        let evaluations = feed_forward_layers(&inputs, &outputs, &connections)
            .into_iter()
            .flatten()
            .filter_map(|id| genome.node(id))
            .map(|node| NodeEval {
                node: node.clone(),
                links: genome
                    .genes()
                    .filter(|g| g.enabled() && g.output() == node.innovation())
                    .map(|g| (g.input(), g.weight()))
                    .collect(),
            })
            .collect();

        FeedForwardNetwork {
            inputs,
            outputs,
            evaluations,
        }
    }

    /// Returns the network's outputs for the given inputs.
    /// Outputs with no path from the inputs are 0.
    pub fn activate(&self, inputs: &[f32]) -> Vec<f32> {
        let mut values: BTreeMap<Innovation, f32> =
            self.inputs.iter().copied().zip(inputs.iter().copied()).collect();
        for eval in &self.evaluations {
            let weighted: Vec<f32> = eval
                .links
                .iter()
                .map(|(source, weight)| values.get(source).copied().unwrap_or(0.0) * weight)
                .collect();
            values.insert(eval.node.innovation(), eval.node.activate(&weighted));
        }
        self.outputs
            .iter()
            .map(|o| values.get(o).copied().unwrap_or(0.0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neatgen::Genome;
    use neatgen_nn::genomics::{ActivationType, FloatAttributeConfig, GeneticConfig};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sigmoid(x: f32) -> f32 {
        1.0 / (1.0 + (-4.9 * x).exp())
    }

    fn config() -> GeneticConfig {
        GeneticConfig {
            response: FloatAttributeConfig::constant(1.0),
            ..GeneticConfig::zero()
        }
    }

    #[test]
    fn activate_through_hidden_node() {
        let mut genome = NNGenome::new(0, &config(), &mut ChaCha8Rng::seed_from_u64(0));
        genome.add_node(2, ActivationType::Sigmoid);
        genome.add_gene(0, 0, 2, 1.0);
        genome.add_gene(1, 2, 1, 1.0);
        let network = FeedForwardNetwork::new(&genome);
        for input in -20..=20 {
            let input = input as f32 / 10.0;
            assert_eq!(network.activate(&[input])[0], sigmoid(sigmoid(input)));
        }
    }

    #[test]
    fn disabled_genes_are_ignored() {
        let mut genome = NNGenome::new(0, &config(), &mut ChaCha8Rng::seed_from_u64(0));
        genome.add_gene(0, 0, 1, 1.0).set_enabled(false);
        let network = FeedForwardNetwork::new(&genome);
        assert_eq!(network.activate(&[5.0]), vec![0.0]);
    }
}
