//! Quartet consistency scoring.
//!
//! For four leaves `a < b < c < d` there are three ways to split them into two
//! pairs. In a ternary tree exactly one split has vertex-disjoint leaf-to-leaf
//! paths; its cost is the sum of the two pair distances. The tree cost is the
//! sum of those costs over all quartets, normalized between the best and worst
//! split costs the distance matrix allows.

use super::mutate::Touched;
use super::node::Node;
use super::tree::QuartetTree;
use super::TreeError;
use crate::libs::matrix::DistanceMatrix;
use crate::libs::path::{find_one_path, Graph, SearchOrder};
use itertools::Itertools;
use rayon::prelude::*;
use std::collections::HashMap;

/// Two leaf indices, smaller first.
pub type LeafPair = (usize, usize);

/// Inner nodes on the path between every pair of leaves.
///
/// Each entry holds the interior of the path, sorted, so path-disjointness
/// is a merge walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathCache {
    paths: HashMap<LeafPair, Vec<usize>>,
}

impl PathCache {
    /// Compute the path of every leaf pair. Pairs are searched in parallel.
    pub fn build(tree: &QuartetTree) -> Self {
        let graph = tree.to_graph();
        let pairs: Vec<LeafPair> = (0..tree.n_leaves()).tuple_combinations().collect();
        let paths = pairs
            .par_iter()
            .map(|&(a, b)| ((a, b), leaf_path(&graph, a, b)))
            .collect();
        Self { paths }
    }

    /// Recompute only the entries a mutation can have changed.
    ///
    /// `tree` is the mutated tree; staleness is decided from the old paths
    /// held in `self`.
    pub fn refresh(&self, tree: &QuartetTree, touched: &Touched) -> Self {
        let stale: Vec<LeafPair> = self
            .paths
            .iter()
            .filter(|((a, b), path)| {
                touched.leaves.contains(a)
                    || touched.leaves.contains(b)
                    || touched.inner.iter().any(|i| path.binary_search(i).is_ok())
            })
            .map(|(&pair, _)| pair)
            .collect();

        let graph = tree.to_graph();
        let updated: Vec<(LeafPair, Vec<usize>)> = stale
            .par_iter()
            .map(|&(a, b)| ((a, b), leaf_path(&graph, a, b)))
            .collect();

        let mut paths = self.paths.clone();
        paths.extend(updated);
        Self { paths }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Interior of the path between two leaves, in either order.
    pub fn get(&self, a: usize, b: usize) -> Option<&[usize]> {
        let key = if a < b { (a, b) } else { (b, a) };
        self.paths.get(&key).map(|v| v.as_slice())
    }
}

fn leaf_path(graph: &Graph<Node>, a: usize, b: usize) -> Vec<usize> {
    let mut inner: Vec<usize> = find_one_path(graph, &Node::Leaf(a), &Node::Leaf(b), SearchOrder::BreadthFirst)
        .unwrap_or_default()
        .iter()
        .filter_map(|n| n.as_inner())
        .collect();
    inner.sort_unstable();
    inner
}

fn disjoint(x: &[usize], y: &[usize]) -> bool {
    let (mut i, mut j) = (0, 0);
    while i < x.len() && j < y.len() {
        match x[i].cmp(&y[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => return false,
        }
    }
    true
}

/// The three splits of a quartet, in the order `ab|cd`, `ac|bd`, `ad|bc`.
pub fn pairings(q: [usize; 4]) -> [(LeafPair, LeafPair); 3] {
    let [a, b, c, d] = q;
    [((a, b), (c, d)), ((a, c), (b, d)), ((a, d), (b, c))]
}

/// One split of a quartet judged against the current tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuartetResult {
    pub consistent: bool,
    pub cost: f64,
    pub pairing: (LeafPair, LeafPair),
}

/// Normalized tree score with the raw totals behind it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub value: f64,
    pub cost: f64,
    pub consistent: usize,
}

/// Scores trees against one distance matrix.
///
/// The minimum and maximum achievable costs depend on the matrix only, so
/// they are computed once here. Leaf `l` of a scored tree must be row `l` of
/// the matrix.
#[derive(Debug, Clone)]
pub struct QuartetScorer<'a> {
    dm: &'a DistanceMatrix,
    min_cost: f64,
    max_cost: f64,
}

impl<'a> QuartetScorer<'a> {
    pub fn new(dm: &'a DistanceMatrix) -> Self {
        let n = dm.size();
        let (min_cost, max_cost) = (0..n)
            .into_par_iter()
            .map(|a| {
                let mut lo = 0.0;
                let mut hi = 0.0;
                for (b, c, d) in (a + 1..n).tuple_combinations() {
                    let costs = pairings([a, b, c, d]).map(|(p, q)| pair_cost(dm, p, q));
                    lo += costs.iter().copied().fold(f64::INFINITY, f64::min);
                    hi += costs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                }
                (lo, hi)
            })
            .reduce(|| (0.0, 0.0), |x, y| (x.0 + y.0, x.1 + y.1));

        Self {
            dm,
            min_cost,
            max_cost,
        }
    }

    pub fn min_cost(&self) -> f64 {
        self.min_cost
    }

    pub fn max_cost(&self) -> f64 {
        self.max_cost
    }

    /// Check that `tree` lines up with the matrix rows.
    pub fn check_tree(&self, tree: &QuartetTree) -> Result<(), TreeError> {
        if tree.labels() != self.dm.get_names() {
            return Err(TreeError::Matrix(
                "tree leaves are not in distance matrix order".to_string(),
            ));
        }
        Ok(())
    }

    /// Judge the three splits of one quartet.
    pub fn evaluate(&self, cache: &PathCache, q: [usize; 4]) -> [QuartetResult; 3] {
        pairings(q).map(|(p, r)| {
            let consistent = match (cache.get(p.0, p.1), cache.get(r.0, r.1)) {
                (Some(x), Some(y)) => disjoint(x, y),
                _ => false,
            };
            QuartetResult {
                consistent,
                cost: pair_cost(self.dm, p, r),
                pairing: (p, r),
            }
        })
    }

    /// Score the tree whose paths are in `cache`, a value in `[0, 1]`.
    ///
    /// With all splits costing the same the score is fixed at 1.0.
    pub fn score(&self, cache: &PathCache) -> Score {
        let n = self.dm.size();
        let (cost, consistent) = (0..n)
            .into_par_iter()
            .map(|a| {
                let mut cost = 0.0;
                let mut consistent = 0;
                for (b, c, d) in (a + 1..n).tuple_combinations() {
                    for result in self.evaluate(cache, [a, b, c, d]) {
                        if result.consistent {
                            cost += result.cost;
                            consistent += 1;
                        }
                    }
                }
                (cost, consistent)
            })
            .reduce(|| (0.0, 0), |x, y| (x.0 + y.0, x.1 + y.1));

        let span = self.max_cost - self.min_cost;
        let value = if span <= f64::EPSILON * self.max_cost.abs().max(1.0) {
            1.0
        } else {
            ((self.max_cost - cost) / span).clamp(0.0, 1.0)
        };

        Score {
            value,
            cost,
            consistent,
        }
    }

    /// Build the path cache of `tree` and score it.
    pub fn score_tree(&self, tree: &QuartetTree) -> Result<Score, TreeError> {
        self.check_tree(tree)?;
        Ok(self.score(&PathCache::build(tree)))
    }
}

fn pair_cost(dm: &DistanceMatrix, p: LeafPair, q: LeafPair) -> f64 {
    dm.get(p.0, p.1) + dm.get(q.0, q.1)
}
