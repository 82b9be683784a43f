use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    /// Fewer than six leaves, no ternary tree worth searching
    #[error("There must be at least six objects to cluster, found {found}")]
    InsufficientLeaves { found: usize },

    /// A mutation operator ran out of retries without a valid candidate
    #[error("Mutation {mutation} found no valid candidate after {retries} retries")]
    MutationExhausted { mutation: String, retries: usize },

    /// Every mutation operator was exhausted on the same iteration
    #[error("All mutation operators exhausted, the topology is stuck")]
    TopologyStuck,

    /// A symbol that is neither a literal nor a degenerate code
    #[error("Unrecognized symbol '{symbol}' at position {position} of the oligo")]
    MalformedDegeneratePattern { symbol: char, position: usize },

    #[error("Cannot build {k} clusters from {leaves} leaves")]
    InvalidClusterCount { k: usize, leaves: usize },

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// The tree violates the ternary tree invariants
    #[error("Invalid tree structure: {0}")]
    Structure(String),

    #[error("Distance matrix error: {0}")]
    Matrix(String),
}
