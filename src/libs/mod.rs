pub mod matrix;
pub mod oligo;
pub mod path;
pub mod qtree;
