//! Subcommand modules for the `quartree` binary.

pub mod build;
pub mod clust;
pub mod oligo;
pub mod score;
pub mod to_dot;
