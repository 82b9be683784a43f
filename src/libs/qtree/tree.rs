use super::node::{inner_name, Node};
use super::TreeError;
use crate::libs::path::Graph;
use petgraph::graph::UnGraph;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeSet, HashSet};

/// Smallest number of leaves a search tree may hold.
pub const MIN_LEAVES: usize = 6;

/// Unrooted ternary tree over labeled leaves.
///
/// Only inner-to-inner edges are stored in `inner`; every leaf edge is kept
/// once, in `leaf_of`. The unified adjacency view is built on demand by
/// [`QuartetTree::to_graph`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuartetTree {
    /// Leaf labels, `Leaf(l)` is `labels[l]`
    pub(super) labels: Vec<String>,

    /// Inner node -> adjacent inner nodes
    pub(super) inner: Vec<BTreeSet<usize>>,

    /// Leaf -> the inner node it hangs from
    pub(super) leaf_of: Vec<usize>,
}

impl QuartetTree {
    /// Generate a random ternary tree with `labels` as leaves.
    ///
    /// Inner nodes are chained first: node 0 takes 1 to 3 inner neighbors,
    /// and every later node, already attached to an earlier one, takes up
    /// to its remaining free slots from the unused nodes. Leaves then fill
    /// every free slot in random order. The construction order guarantees
    /// a single component.
    pub fn generate_random<R: Rng>(labels: &[String], rng: &mut R) -> Result<Self, TreeError> {
        check_labels(labels)?;

        let n_inner = labels.len() - 2;
        let mut inner = vec![BTreeSet::new(); n_inner];

        let mut unused: Vec<usize> = (1..n_inner).rev().collect();
        for node in 0..n_inner {
            if unused.is_empty() {
                break;
            }
            let free = 3 - inner[node].len();
            if free == 0 {
                continue;
            }
            let rolled = rng.gen_range(1..=free).min(unused.len());
            for _ in 0..rolled {
                if let Some(other) = unused.pop() {
                    inner[node].insert(other);
                    inner[other].insert(node);
                }
            }
        }

        let mut pool: Vec<usize> = (0..labels.len()).collect();
        pool.shuffle(rng);

        let mut leaf_of = vec![0; labels.len()];
        for (node, neighbors) in inner.iter().enumerate() {
            for _ in neighbors.len()..3 {
                let leaf = pool
                    .pop()
                    .ok_or_else(|| TreeError::Structure("ran out of leaves".to_string()))?;
                leaf_of[leaf] = node;
            }
        }
        if !pool.is_empty() {
            return Err(TreeError::Structure(format!("{} leaves left unplaced", pool.len())));
        }

        Ok(Self {
            labels: labels.to_vec(),
            inner,
            leaf_of,
        })
    }

    /// Assemble a tree from its parts and check every invariant.
    pub fn from_parts(
        labels: Vec<String>,
        inner: Vec<BTreeSet<usize>>,
        leaf_of: Vec<usize>,
    ) -> Result<Self, TreeError> {
        check_labels(&labels)?;
        let tree = Self {
            labels,
            inner,
            leaf_of,
        };
        tree.validate()?;
        Ok(tree)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn n_leaves(&self) -> usize {
        self.labels.len()
    }

    pub fn n_inner(&self) -> usize {
        self.inner.len()
    }

    /// Number of edges, leaf edges included.
    pub fn n_edges(&self) -> usize {
        self.inner.iter().map(|s| s.len()).sum::<usize>() / 2 + self.leaf_of.len()
    }

    pub fn leaf_index(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Inner neighbors of an inner node.
    pub fn inner_neighbors(&self, id: usize) -> &BTreeSet<usize> {
        &self.inner[id]
    }

    /// The inner node a leaf hangs from.
    pub fn mother(&self, leaf: usize) -> usize {
        self.leaf_of[leaf]
    }

    /// Leaves hanging from an inner node.
    pub fn leaves_of(&self, id: usize) -> Vec<usize> {
        self.leaf_of
            .iter()
            .enumerate()
            .filter(|(_, &m)| m == id)
            .map(|(l, _)| l)
            .collect()
    }

    pub fn degree(&self, node: Node) -> usize {
        match node {
            Node::Leaf(_) => 1,
            Node::Inner(i) => self.inner[i].len() + self.leaf_of.iter().filter(|&&m| m == i).count(),
        }
    }

    /// Display name of a node: `n<i>` for inner nodes, the label for leaves.
    pub fn node_name(&self, node: Node) -> String {
        match node {
            Node::Inner(i) => inner_name(i),
            Node::Leaf(l) => self.labels[l].clone(),
        }
    }

    /// Inner-node-only adjacency.
    pub fn inner_graph(&self) -> Graph<usize> {
        self.inner
            .iter()
            .enumerate()
            .map(|(i, s)| (i, s.iter().copied().collect()))
            .collect()
    }

    /// Unified adjacency of inner nodes and leaves.
    pub fn to_graph(&self) -> Graph<Node> {
        let mut graph: Graph<Node> = Graph::new();
        for (i, neighbors) in self.inner.iter().enumerate() {
            graph.insert(
                Node::Inner(i),
                neighbors.iter().map(|&j| Node::Inner(j)).collect(),
            );
        }
        for (leaf, &mother) in self.leaf_of.iter().enumerate() {
            graph.entry(Node::Inner(mother)).or_default().push(Node::Leaf(leaf));
            graph.insert(Node::Leaf(leaf), vec![Node::Inner(mother)]);
        }
        graph
    }

    /// [`QuartetTree::to_graph`] with display names, for external renderers.
    pub fn named_graph(&self) -> Graph<String> {
        self.to_graph()
            .into_iter()
            .map(|(k, v)| {
                (
                    self.node_name(k),
                    v.into_iter().map(|n| self.node_name(n)).collect(),
                )
            })
            .collect()
    }

    /// Renumber leaves so that `Leaf(l)` carries `order[l]`.
    ///
    /// Used to line a loaded tree up with the rows of a distance matrix.
    pub fn with_leaf_order(&self, order: &[String]) -> Result<Self, TreeError> {
        if order.len() != self.labels.len() {
            return Err(TreeError::Matrix(format!(
                "tree has {} leaves, matrix has {} rows",
                self.labels.len(),
                order.len()
            )));
        }
        let mut leaf_of = Vec::with_capacity(order.len());
        for name in order {
            let old = self
                .leaf_index(name)
                .ok_or_else(|| TreeError::Matrix(format!("{} is not a leaf of the tree", name)))?;
            leaf_of.push(self.leaf_of[old]);
        }
        Self::from_parts(order.to_vec(), self.inner.clone(), leaf_of)
    }

    /// Check the ternary tree invariants.
    ///
    /// * `n - 2` inner nodes, symmetric inner adjacency without self loops
    /// * every inner node of degree 3, every leaf of degree 1
    /// * connected and acyclic
    pub fn validate(&self) -> Result<(), TreeError> {
        let n = self.labels.len();
        let m = self.inner.len();
        if n < MIN_LEAVES {
            return Err(TreeError::InsufficientLeaves { found: n });
        }
        if m + 2 != n {
            return Err(TreeError::Structure(format!(
                "{} leaves need {} inner nodes, found {}",
                n,
                n - 2,
                m
            )));
        }
        if self.leaf_of.len() != n {
            return Err(TreeError::Structure(format!(
                "{} leaves but {} attachments",
                n,
                self.leaf_of.len()
            )));
        }

        for (i, neighbors) in self.inner.iter().enumerate() {
            for &j in neighbors {
                if j == i || j >= m {
                    return Err(TreeError::Structure(format!(
                        "invalid edge {} - {}",
                        inner_name(i),
                        inner_name(j)
                    )));
                }
                if !self.inner[j].contains(&i) {
                    return Err(TreeError::Structure(format!(
                        "asymmetric edge {} - {}",
                        inner_name(i),
                        inner_name(j)
                    )));
                }
            }
        }
        if let Some(leaf) = self.leaf_of.iter().position(|&mother| mother >= m) {
            return Err(TreeError::Structure(format!(
                "leaf {} hangs from a missing node",
                self.labels[leaf]
            )));
        }

        for i in 0..m {
            let degree = self.degree(Node::Inner(i));
            if degree != 3 {
                return Err(TreeError::Structure(format!(
                    "{} has degree {}",
                    inner_name(i),
                    degree
                )));
            }
        }

        // inner nodes first, leaves after them
        let mut graph = UnGraph::<(), ()>::with_capacity(n + m, n + m);
        let ids: Vec<_> = (0..n + m).map(|_| graph.add_node(())).collect();
        for (i, neighbors) in self.inner.iter().enumerate() {
            for &j in neighbors.iter().filter(|&&j| j > i) {
                graph.add_edge(ids[i], ids[j], ());
            }
        }
        for (leaf, &mother) in self.leaf_of.iter().enumerate() {
            graph.add_edge(ids[m + leaf], ids[mother], ());
        }

        if graph.edge_count() != n + m - 1 {
            return Err(TreeError::Structure(format!(
                "{} edges over {} nodes",
                graph.edge_count(),
                n + m
            )));
        }
        if petgraph::algo::connected_components(&graph) != 1 {
            return Err(TreeError::Structure("tree is disconnected".to_string()));
        }
        if petgraph::algo::is_cyclic_undirected(&graph) {
            return Err(TreeError::Structure("tree has a cycle".to_string()));
        }

        Ok(())
    }

    // --- Edits used by the mutation operators ---

    pub(super) fn link(&mut self, a: usize, b: usize) {
        self.inner[a].insert(b);
        self.inner[b].insert(a);
    }

    pub(super) fn unlink(&mut self, a: usize, b: usize) {
        self.inner[a].remove(&b);
        self.inner[b].remove(&a);
    }

    pub(super) fn attach_leaf(&mut self, leaf: usize, node: usize) {
        self.leaf_of[leaf] = node;
    }
}

fn check_labels(labels: &[String]) -> Result<(), TreeError> {
    if labels.len() < MIN_LEAVES {
        return Err(TreeError::InsufficientLeaves {
            found: labels.len(),
        });
    }
    let mut seen = HashSet::new();
    for label in labels {
        if !seen.insert(label.as_str()) {
            return Err(TreeError::Structure(format!("duplicated leaf label {}", label)));
        }
    }
    Ok(())
}
