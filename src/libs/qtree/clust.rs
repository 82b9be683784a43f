use super::node::Node;
use super::tree::QuartetTree;
use super::TreeError;
use crate::libs::matrix::DistanceMatrix;
use crate::libs::path::{find_bounded_path, find_one_path, interior, Graph, SearchOrder};
use itertools::Itertools;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Paths longer than this many nodes never qualify as a merge candidate.
pub const MAX_PATH_NODES: usize = 3;

/// Distance between two clusters of leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    Single,
    Complete,
    Average,
}

impl FromStr for Linkage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(Linkage::Single),
            "complete" => Ok(Linkage::Complete),
            "average" => Ok(Linkage::Average),
            _ => Err(anyhow::anyhow!("Unknown linkage: {}", s)),
        }
    }
}

impl Linkage {
    pub fn distance(&self, dm: &DistanceMatrix, one: &[usize], two: &[usize]) -> f64 {
        let distances = one.iter().cartesian_product(two.iter()).map(|(&a, &b)| dm.get(a, b));
        match self {
            Linkage::Single => distances.fold(f64::INFINITY, f64::min),
            Linkage::Complete => distances.fold(f64::NEG_INFINITY, f64::max),
            Linkage::Average => {
                let (sum, count) = distances.fold((0.0, 0usize), |(s, c), d| (s + d, c + 1));
                sum / count as f64
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub id: usize,
    /// Tree node the cluster is anchored on when measuring paths
    pub mother: Node,
    pub members: Vec<usize>,
}

#[derive(Debug, Clone)]
struct Candidate {
    one: usize,
    two: usize,
    between: Vec<Node>,
    distance: f64,
}

/// Agglomerative merging of leaves along a tree.
///
/// Starts with one cluster per leaf anchored on the leaf itself. Each merge
/// joins the two clusters whose anchors are closest in the tree, breaking
/// ties by linkage distance.
#[derive(Debug, Clone)]
pub struct ClusterBuilder<'a> {
    graph: Graph<Node>,
    dm: &'a DistanceMatrix,
    linkage: Linkage,
    max_path_nodes: usize,
    clusters: BTreeMap<usize, Cluster>,
    next_id: usize,
}

impl<'a> ClusterBuilder<'a> {
    pub fn new(tree: &QuartetTree, dm: &'a DistanceMatrix, linkage: Linkage) -> Result<Self, TreeError> {
        if tree.labels() != dm.get_names() {
            return Err(TreeError::Matrix(
                "tree leaves are not in distance matrix order".to_string(),
            ));
        }

        let clusters: BTreeMap<usize, Cluster> = (0..tree.n_leaves())
            .map(|l| {
                (
                    l,
                    Cluster {
                        id: l,
                        mother: Node::Leaf(l),
                        members: vec![l],
                    },
                )
            })
            .collect();

        Ok(Self {
            graph: tree.to_graph(),
            dm,
            linkage,
            max_path_nodes: MAX_PATH_NODES,
            next_id: clusters.len(),
            clusters,
        })
    }

    pub fn with_max_path_nodes(mut self, max_path_nodes: usize) -> Self {
        self.max_path_nodes = max_path_nodes;
        self
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.values()
    }

    fn candidates(&self, bound: Option<usize>) -> Vec<Candidate> {
        let pairs: Vec<(usize, usize)> = self.clusters.keys().copied().tuple_combinations().collect();
        pairs
            .par_iter()
            .filter_map(|&(one, two)| {
                let (c1, c2) = (&self.clusters[&one], &self.clusters[&two]);
                let path = match bound {
                    Some(max) => find_bounded_path(&self.graph, &c1.mother, &c2.mother, max),
                    None => find_one_path(&self.graph, &c1.mother, &c2.mother, SearchOrder::BreadthFirst),
                }?;
                Some(Candidate {
                    one,
                    two,
                    between: interior(&path),
                    distance: self.linkage.distance(self.dm, &c1.members, &c2.members),
                })
            })
            .collect()
    }

    /// Merge the closest pair of clusters.
    ///
    /// Returns `false` when a single cluster is left.
    pub fn merge_closest(&mut self) -> Result<bool, TreeError> {
        if self.clusters.len() < 2 {
            return Ok(false);
        }

        let mut candidates = self.candidates(Some(self.max_path_nodes));
        if candidates.is_empty() {
            // anchors all drifted apart, fall back to full paths
            candidates = self.candidates(None);
        }
        let best = candidates
            .into_iter()
            .min_by(|x, y| {
                x.between
                    .len()
                    .cmp(&y.between.len())
                    .then(x.distance.total_cmp(&y.distance))
                    .then((x.one, x.two).cmp(&(y.one, y.two)))
            })
            .ok_or_else(|| TreeError::Structure("no path between clusters".to_string()))?;

        let (Some(one), Some(two)) = (self.clusters.remove(&best.one), self.clusters.remove(&best.two)) else {
            return Err(TreeError::Structure("merged a missing cluster".to_string()));
        };

        let mother = match best.between.first() {
            Some(&node) => node,
            None if two.members.len() > one.members.len() => two.mother,
            None => one.mother,
        };
        let mut members = one.members;
        members.extend(two.members);

        let id = self.next_id;
        self.next_id += 1;
        self.clusters.insert(id, Cluster { id, mother, members });

        Ok(true)
    }

    /// Cluster index of every leaf, in leaf order.
    ///
    /// Clusters are numbered by ascending id.
    pub fn labels(&self) -> Vec<usize> {
        let n = self.clusters.values().map(|c| c.members.len()).sum();
        let mut labels = vec![0; n];
        for (idx, cluster) in self.clusters.values().enumerate() {
            for &leaf in &cluster.members {
                labels[leaf] = idx;
            }
        }
        labels
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterOptions {
    pub k: usize,
    pub linkage: Linkage,
    /// Cutoff of the bounded path search between cluster anchors
    pub max_path_nodes: usize,
}

impl ClusterOptions {
    pub fn new(k: usize, linkage: Linkage) -> Self {
        Self {
            k,
            linkage,
            max_path_nodes: MAX_PATH_NODES,
        }
    }
}

/// Cut `tree` into `k` clusters and label each leaf, in matrix order.
pub fn build_clusters(
    k: usize,
    linkage: Linkage,
    tree: &QuartetTree,
    dm: &DistanceMatrix,
) -> Result<Vec<usize>, TreeError> {
    cluster_with(&ClusterOptions::new(k, linkage), tree, dm)
}

pub fn cluster_with(
    options: &ClusterOptions,
    tree: &QuartetTree,
    dm: &DistanceMatrix,
) -> Result<Vec<usize>, TreeError> {
    let (k, n) = (options.k, tree.n_leaves());
    if k == 0 || k > n {
        return Err(TreeError::InvalidClusterCount { k, leaves: n });
    }

    let mut builder =
        ClusterBuilder::new(tree, dm, options.linkage)?.with_max_path_nodes(options.max_path_nodes);
    while builder.len() > k {
        builder.merge_closest()?;
    }
    Ok(builder.labels())
}
