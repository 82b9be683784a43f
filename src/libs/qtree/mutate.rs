//! Local moves over a [`QuartetTree`].
//!
//! Every operator works on a copy and returns it together with the nodes it
//! rewired, so the caller can refresh only the cached paths running through
//! them. Candidate pairs that fail a precondition are resampled; an operator
//! gives up with [`TreeError::MutationExhausted`] once its retry budget is
//! spent.

use super::node::Node;
use super::tree::QuartetTree;
use super::TreeError;
use crate::libs::path::{find_one_path, interior, SearchOrder};
use rand::seq::{index, SliceRandom};
use rand::Rng;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutation {
    /// Exchange the attachment points of two leaves
    SwapLeaves,
    /// Exchange one off-path subtree of each of two inner nodes
    SwapNodes,
    /// Move a leaf onto an inner node, sending one of its subtrees to the
    /// leaf's old attachment point
    SwapLeafNode,
}

impl Mutation {
    pub const ALL: [Mutation; 3] = [Mutation::SwapLeaves, Mutation::SwapNodes, Mutation::SwapLeafNode];
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mutation::SwapLeaves => "swap-leaves",
            Mutation::SwapNodes => "swap-nodes",
            Mutation::SwapLeafNode => "swap-leaf-node",
        };
        write!(f, "{}", name)
    }
}

/// Retry budget and candidate path limit shared by all operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationConfig {
    pub max_retries: usize,
    /// Reject candidate pairs whose connecting path holds more nodes
    pub path_limit: Option<usize>,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            max_retries: 1000,
            path_limit: None,
        }
    }
}

/// Leaves and inner nodes whose incident edges changed.
///
/// A cached leaf-pair path is stale exactly when the pair holds one of
/// `leaves` or the old path runs through one of `inner`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Touched {
    pub leaves: Vec<usize>,
    pub inner: Vec<usize>,
}

pub fn apply<R: Rng>(
    mutation: Mutation,
    tree: &QuartetTree,
    rng: &mut R,
    config: &MutationConfig,
) -> Result<(QuartetTree, Touched), TreeError> {
    match mutation {
        Mutation::SwapLeaves => swap_leaves(tree, rng, config),
        Mutation::SwapNodes => swap_inner_nodes(tree, rng, config),
        Mutation::SwapLeafNode => swap_leaf_with_node(tree, rng, config),
    }
}

fn exhausted(mutation: Mutation, retries: usize) -> TreeError {
    TreeError::MutationExhausted {
        mutation: mutation.to_string(),
        retries,
    }
}

fn within_limit<N>(path: &[N], config: &MutationConfig) -> bool {
    config.path_limit.map_or(true, |max| path.len() <= max)
}

/// Swap two leaves hanging from different inner nodes.
pub fn swap_leaves<R: Rng>(
    tree: &QuartetTree,
    rng: &mut R,
    config: &MutationConfig,
) -> Result<(QuartetTree, Touched), TreeError> {
    let n = tree.n_leaves();

    for _ in 0..config.max_retries {
        let pair = index::sample(rng, n, 2);
        let (a, b) = (pair.index(0), pair.index(1));
        let (ma, mb) = (tree.mother(a), tree.mother(b));
        if ma == mb {
            continue;
        }

        let mut new_tree = tree.clone();
        new_tree.attach_leaf(a, mb);
        new_tree.attach_leaf(b, ma);
        return Ok((
            new_tree,
            Touched {
                leaves: vec![a, b],
                inner: vec![],
            },
        ));
    }

    Err(exhausted(Mutation::SwapLeaves, config.max_retries))
}

/// Exchange subtrees between two non-adjacent inner nodes.
///
/// For inner nodes `a` and `b`, each with at least two inner neighbors, pick
/// a neighbor `x` of `a` and `y` of `b`, both off the `a`-`b` path, then
/// rewire `a - x, b - y` into `a - y, b - x`. Keeping `x` and `y` off the
/// path is what keeps the result acyclic.
pub fn swap_inner_nodes<R: Rng>(
    tree: &QuartetTree,
    rng: &mut R,
    config: &MutationConfig,
) -> Result<(QuartetTree, Touched), TreeError> {
    let candidates: Vec<usize> = (0..tree.n_inner())
        .filter(|&i| tree.inner_neighbors(i).len() >= 2)
        .collect();
    if candidates.len() < 2 {
        return Err(exhausted(Mutation::SwapNodes, 0));
    }
    let graph = tree.inner_graph();

    for _ in 0..config.max_retries {
        let pair = index::sample(rng, candidates.len(), 2);
        let (a, b) = (candidates[pair.index(0)], candidates[pair.index(1)]);

        let Some(path) = find_one_path(&graph, &a, &b, SearchOrder::DepthFirst) else {
            continue;
        };
        if !within_limit(&path, config) {
            continue;
        }
        let between = interior(&path);
        if between.is_empty() {
            continue;
        }

        let off_a: Vec<usize> = tree
            .inner_neighbors(a)
            .iter()
            .copied()
            .filter(|x| !between.contains(x) && *x != b)
            .collect();
        let off_b: Vec<usize> = tree
            .inner_neighbors(b)
            .iter()
            .copied()
            .filter(|y| !between.contains(y) && *y != a)
            .collect();
        let (Some(&x), Some(&y)) = (off_a.choose(rng), off_b.choose(rng)) else {
            continue;
        };

        let mut new_tree = tree.clone();
        new_tree.unlink(a, x);
        new_tree.unlink(b, y);
        new_tree.link(a, y);
        new_tree.link(b, x);
        return Ok((
            new_tree,
            Touched {
                leaves: vec![],
                inner: vec![x, y],
            },
        ));
    }

    Err(exhausted(Mutation::SwapNodes, config.max_retries))
}

/// Re-hang a leaf on a distant inner node.
///
/// For an inner node `v` with at least two inner neighbors and a leaf `l`
/// not hanging from `v`, pick an inner neighbor `s` of `v` off the `v`-`l`
/// path. `s` moves to the old attachment point of `l`, and `l` moves to `v`.
pub fn swap_leaf_with_node<R: Rng>(
    tree: &QuartetTree,
    rng: &mut R,
    config: &MutationConfig,
) -> Result<(QuartetTree, Touched), TreeError> {
    let candidates: Vec<usize> = (0..tree.n_inner())
        .filter(|&i| tree.inner_neighbors(i).len() >= 2)
        .collect();
    if candidates.is_empty() {
        return Err(exhausted(Mutation::SwapLeafNode, 0));
    }
    let graph = tree.to_graph();

    for _ in 0..config.max_retries {
        let v = candidates[rng.gen_range(0..candidates.len())];
        let leaf = rng.gen_range(0..tree.n_leaves());
        let mother = tree.mother(leaf);
        if mother == v {
            continue;
        }

        let Some(path) = find_one_path(&graph, &Node::Inner(v), &Node::Leaf(leaf), SearchOrder::DepthFirst)
        else {
            continue;
        };
        if !within_limit(&path, config) {
            continue;
        }
        let between: Vec<usize> = interior(&path).iter().filter_map(|n| n.as_inner()).collect();

        let off_path: Vec<usize> = tree
            .inner_neighbors(v)
            .iter()
            .copied()
            .filter(|s| !between.contains(s) && *s != mother)
            .collect();
        let Some(&s) = off_path.choose(rng) else {
            continue;
        };

        let mut new_tree = tree.clone();
        new_tree.unlink(v, s);
        new_tree.link(mother, s);
        new_tree.attach_leaf(leaf, v);
        return Ok((
            new_tree,
            Touched {
                leaves: vec![leaf],
                inner: vec![s],
            },
        ));
    }

    Err(exhausted(Mutation::SwapLeafNode, config.max_retries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("L{}", i)).collect()
    }

    #[test]
    fn every_operator_keeps_invariants() {
        let mut rng = StdRng::seed_from_u64(7);
        let config = MutationConfig::default();
        for n in [6, 7, 20, 100] {
            let mut tree = QuartetTree::generate_random(&labels(n), &mut rng).unwrap();
            for round in 0..60 {
                let mutation = Mutation::ALL[round % 3];
                match apply(mutation, &tree, &mut rng, &config) {
                    Ok((next, _)) => {
                        next.validate().unwrap();
                        assert_eq!(next.n_edges(), next.n_inner() + next.n_leaves() - 1);
                        tree = next;
                    }
                    Err(TreeError::MutationExhausted { .. }) => {}
                    Err(e) => panic!("{}", e),
                }
            }
        }
    }

    #[test]
    fn swap_leaves_moves_two_leaves() {
        let mut rng = StdRng::seed_from_u64(1);
        let tree = QuartetTree::generate_random(&labels(10), &mut rng).unwrap();
        let (next, touched) = swap_leaves(&tree, &mut rng, &MutationConfig::default()).unwrap();

        assert_eq!(touched.leaves.len(), 2);
        let (a, b) = (touched.leaves[0], touched.leaves[1]);
        assert_ne!(tree.mother(a), tree.mother(b));
        assert_eq!(next.mother(a), tree.mother(b));
        assert_eq!(next.mother(b), tree.mother(a));
        assert_eq!(next.inner, tree.inner);
    }

    #[test]
    fn swap_nodes_keeps_leaves() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = MutationConfig::default();
        let mut done = 0;
        for _ in 0..20 {
            let tree = QuartetTree::generate_random(&labels(20), &mut rng).unwrap();
            if let Ok((next, touched)) = swap_inner_nodes(&tree, &mut rng, &config) {
                assert_eq!(next.leaf_of, tree.leaf_of);
                assert_eq!(touched.inner.len(), 2);
                assert_ne!(next.inner, tree.inner);
                next.validate().unwrap();
                done += 1;
            }
        }
        assert!(done > 0);
    }

    #[test]
    fn swap_leaf_node_rehangs_leaf() {
        let mut rng = StdRng::seed_from_u64(11);
        let tree = QuartetTree::generate_random(&labels(12), &mut rng).unwrap();
        let (next, touched) = swap_leaf_with_node(&tree, &mut rng, &MutationConfig::default()).unwrap();

        let leaf = touched.leaves[0];
        let s = touched.inner[0];
        let old_mother = tree.mother(leaf);
        let new_mother = next.mother(leaf);
        assert_ne!(old_mother, new_mother);
        assert!(next.inner_neighbors(old_mother).contains(&s));
        assert!(!next.inner_neighbors(new_mother).contains(&s));
        next.validate().unwrap();
    }

    #[test]
    fn exhausted_on_star() {
        // n0 in the middle, three cherries: no two nodes with two inner neighbors
        let tree = QuartetTree::from_parts(
            labels(6),
            vec![
                [1, 2, 3].into_iter().collect(),
                [0].into_iter().collect(),
                [0].into_iter().collect(),
                [0].into_iter().collect(),
            ],
            vec![1, 1, 2, 2, 3, 3],
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let config = MutationConfig {
            max_retries: 10,
            path_limit: None,
        };

        assert!(matches!(
            swap_inner_nodes(&tree, &mut rng, &config),
            Err(TreeError::MutationExhausted { .. })
        ));
        assert!(swap_leaves(&tree, &mut rng, &config).is_ok());
        assert!(swap_leaf_with_node(&tree, &mut rng, &config).is_ok());
    }

    #[test]
    fn path_limit_rejects_long_moves() {
        let mut rng = StdRng::seed_from_u64(2);
        let tree = QuartetTree::generate_random(&labels(40), &mut rng).unwrap();
        let config = MutationConfig {
            max_retries: 50,
            path_limit: Some(2),
        };
        // a path of two nodes has no interior, nothing qualifies
        assert!(matches!(
            swap_inner_nodes(&tree, &mut rng, &config),
            Err(TreeError::MutationExhausted { .. })
        ));
    }
}
