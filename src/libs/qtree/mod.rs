//! Quartet tree construction.
//!
//! Random ternary trees are improved by local mutations under a quartet
//! consistency score, then cut into clusters along the tree.

pub mod clust;
pub mod error;
pub mod io;
pub mod mutate;
pub mod node;
pub mod score;
pub mod search;
pub mod tree;

pub use clust::{build_clusters, cluster_with, ClusterBuilder, ClusterOptions, Linkage};
pub use error::TreeError;
pub use mutate::{Mutation, MutationConfig, Touched};
pub use node::Node;
pub use score::{PathCache, QuartetScorer, Score};
pub use search::{Progress, SearchOptions, SearchOutcome, StopReason, TreeSearch};
pub use tree::QuartetTree;
