use crate::Innovation;

use thiserror::Error;

/// An error type indicating the attempted
/// removal of an item that is absent in the genome.
#[derive(Debug, Error)]
pub enum AbsentEntryRemoval {
    #[error("attempted removal of nonexistent gene with id {0}")]
    Gene(Innovation),
    #[error("attempted removal of nonexistent node with id {0}")]
    Node(Innovation),
}

/// An error type indicating the gene being created
/// or added is invalid.
#[derive(Debug, Error)]
pub enum GeneValidityError {
    #[error("duplicate gene insertion with id {0}")]
    DuplicateGeneID(Innovation),
    #[error("gene insertion between nonexistent endpoint(s) {0} -> {1}")]
    NonexistentEndpoints(Innovation, Innovation),
    #[error("gene insertion with endpoints {1:?} and id {0} shadows gene with same endpoints")]
    DuplicateGeneWithEndpoints(Innovation, (Innovation, Innovation)),
    #[error("gene insertion with sensor node {0} as output")]
    SensorEndpoint(Innovation),
}

/// An error type indicating the node being created
/// or added is invalid.
#[derive(Debug, Error)]
pub enum NodeValidityError {
    #[error("duplicate node insertion with id {0}")]
    DuplicateNodeID(Innovation),
}

/// An error type indicating a failure
/// to carry out a gene addition mutation.
#[derive(Debug, Error)]
pub enum GeneAdditionMutationError {
    #[error("gene mutation on fully-connected genome")]
    GenomeFullyConnected,
    #[error("no viable input-output pair found for gene mutation")]
    NoInputOutputPairFound,
}

/// An error type indicating a failure
/// to carry out a node addition mutation.
#[derive(Debug, Error)]
pub enum NodeAdditionMutationError {
    #[error("node mutation on genome without enabled genes")]
    EmptyGenome,
}

/// An error type indicating a failure to remove
/// a gene or node by mutation.
#[derive(Debug, Error)]
pub enum DeletionMutationError {
    #[error("gene deletion on genome without genes")]
    NoGenes,
    #[error("node deletion on genome without hidden nodes")]
    NoHiddenNodes,
}

/// An error type describing a structurally
/// inconsistent genome.
#[derive(Debug, Error)]
pub enum GenomeValidityError {
    #[error("gene {gene} refers to nonexistent node {node}")]
    DanglingEndpoint { gene: Innovation, node: Innovation },
    #[error("gene {gene} has sensor node {node} as its output")]
    SensorInput { gene: Innovation, node: Innovation },
    #[error("node {node} does not list gene {gene} among its connections")]
    AdjacencyMismatch { node: Innovation, gene: Innovation },
    #[error("genes {0} and {1} share endpoints")]
    DuplicateEndpoints(Innovation, Innovation),
    #[error("endpoint index does not match the genome's genes")]
    EndpointIndexMismatch,
}
