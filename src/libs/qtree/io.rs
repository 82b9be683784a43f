//! Checkpoints and Graphviz output.
//!
//! A checkpoint is a directory with two flat text dictionaries:
//!
//! * `inner_node_dict.txt`, one inner node per line with its inner
//!   neighbors, `n3: ['n0' 'n5']`
//! * `leaf_dict.txt`, one leaf per line with the node it hangs from,
//!   `label: n3`

use super::node::{inner_name, parse_inner_name};
use super::tree::QuartetTree;
use super::TreeError;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufRead, Write};
use std::path::Path;

pub const INNER_DICT_FILE: &str = "inner_node_dict.txt";
pub const LEAF_DICT_FILE: &str = "leaf_dict.txt";

/// Inner node name -> names of the adjacent inner nodes.
pub type InnerNodeDict = BTreeMap<String, BTreeSet<String>>;

/// Leaf label -> name of the inner node it hangs from.
pub type LeafDict = BTreeMap<String, String>;

pub fn inner_node_dict(tree: &QuartetTree) -> InnerNodeDict {
    (0..tree.n_inner())
        .map(|i| {
            (
                inner_name(i),
                tree.inner_neighbors(i).iter().map(|&j| inner_name(j)).collect(),
            )
        })
        .collect()
}

pub fn leaf_dict(tree: &QuartetTree) -> LeafDict {
    tree.labels()
        .iter()
        .enumerate()
        .map(|(l, label)| (label.clone(), inner_name(tree.mother(l))))
        .collect()
}

/// ```
/// use quartree::libs::qtree::io::{load_inner_dict, save_inner_dict};
///
/// let text = "n0: ['n1' 'n2' 'n3']\nn1: ['n0']\n";
/// let dict = load_inner_dict(text).unwrap();
/// assert_eq!(dict["n0"].len(), 3);
/// assert_eq!(save_inner_dict(&dict), text);
/// ```
pub fn save_inner_dict(dict: &InnerNodeDict) -> String {
    let mut s = String::new();
    for (node, neighbors) in dict {
        let quoted: Vec<String> = neighbors.iter().map(|n| format!("'{}'", n)).collect();
        s += &format!("{}: [{}]\n", node, quoted.join(" "));
    }
    s
}

pub fn load_inner_dict(text: &str) -> Result<InnerNodeDict, TreeError> {
    let mut dict = InnerNodeDict::new();
    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (node, value) = line
            .split_once(':')
            .ok_or_else(|| TreeError::Checkpoint(format!("inner dict line {}: missing ':'", lineno + 1)))?;

        let value = value.trim();
        let value = value
            .strip_prefix('[')
            .and_then(|v| v.strip_suffix(']'))
            .ok_or_else(|| TreeError::Checkpoint(format!("inner dict line {}: expected [...]", lineno + 1)))?;
        let neighbors = value
            .split_whitespace()
            .map(|n| n.trim_matches(|c| c == '\'' || c == '"').to_string())
            .collect();

        if dict.insert(node.trim().to_string(), neighbors).is_some() {
            return Err(TreeError::Checkpoint(format!("inner node {} listed twice", node.trim())));
        }
    }
    Ok(dict)
}

pub fn save_leaf_dict(dict: &LeafDict) -> String {
    let mut s = String::new();
    for (label, mother) in dict {
        s += &format!("{}: {}\n", label, mother);
    }
    s
}

pub fn load_leaf_dict(text: &str) -> Result<LeafDict, TreeError> {
    let mut dict = LeafDict::new();
    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        // labels may hold ':', node names never do
        let (label, mother) = line
            .rsplit_once(':')
            .ok_or_else(|| TreeError::Checkpoint(format!("leaf dict line {}: missing ':'", lineno + 1)))?;
        if dict.insert(label.trim().to_string(), mother.trim().to_string()).is_some() {
            return Err(TreeError::Checkpoint(format!("leaf {} listed twice", label.trim())));
        }
    }
    Ok(dict)
}

impl QuartetTree {
    /// Rebuild a tree from its two dictionaries.
    ///
    /// Inner nodes must be named `n0` to `n<m-1>`. Leaves are ordered by
    /// label. The result passes [`QuartetTree::validate`].
    pub fn from_dicts(inner: &InnerNodeDict, leaves: &LeafDict) -> Result<Self, TreeError> {
        let parse = |name: &str| -> Result<usize, TreeError> {
            parse_inner_name(name)
                .filter(|&i| i < inner.len())
                .ok_or_else(|| TreeError::Checkpoint(format!("unknown inner node {}", name)))
        };

        let mut adjacency = vec![BTreeSet::new(); inner.len()];
        for (node, neighbors) in inner {
            let i = parse(node)?;
            for other in neighbors {
                adjacency[i].insert(parse(other)?);
            }
        }

        let mut labels = Vec::with_capacity(leaves.len());
        let mut leaf_of = Vec::with_capacity(leaves.len());
        for (label, mother) in leaves {
            labels.push(label.clone());
            leaf_of.push(parse(mother)?);
        }

        Self::from_parts(labels, adjacency, leaf_of)
    }

    /// Undirected Graphviz text of the tree.
    ///
    /// Inner nodes are points; leaves are labeled. With `clusters`, the
    /// cluster index of every leaf in leaf order, leaves are filled with one
    /// color per cluster.
    ///
    /// ```
    /// use quartree::libs::qtree::QuartetTree;
    /// use rand::SeedableRng;
    ///
    /// let labels: Vec<String> = (0..6).map(|i| format!("S{}", i)).collect();
    /// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    /// let tree = QuartetTree::generate_random(&labels, &mut rng).unwrap();
    ///
    /// let dot = tree.to_dot(None);
    /// assert!(dot.starts_with("graph Tree {"));
    /// assert_eq!(dot.matches(" -- ").count(), tree.n_edges());
    /// ```
    pub fn to_dot(&self, clusters: Option<&[usize]>) -> String {
        let mut s = String::from("graph Tree {\n");
        s.push_str("    node [shape=point];\n");

        for (l, label) in self.labels().iter().enumerate() {
            let color = clusters
                .and_then(|c| c.get(l))
                .map(|&c| format!(", style=filled, fillcolor={}", PALETTE[c % PALETTE.len()]))
                .unwrap_or_default();
            s += &format!(
                "    \"{}\" [shape=box, label=\"{}\"{}];\n",
                label.replace('"', "\\\""),
                label.replace('"', "\\\""),
                color
            );
        }

        for i in 0..self.n_inner() {
            for &j in self.inner_neighbors(i).iter().filter(|&&j| j > i) {
                s += &format!("    {} -- {};\n", inner_name(i), inner_name(j));
            }
        }
        for (l, label) in self.labels().iter().enumerate() {
            s += &format!(
                "    {} -- \"{}\";\n",
                inner_name(self.mother(l)),
                label.replace('"', "\\\"")
            );
        }

        s.push_str("}\n");
        s
    }
}

const PALETTE: [&str; 10] = [
    "lightblue",
    "salmon",
    "palegreen",
    "gold",
    "plum",
    "orange",
    "turquoise",
    "pink",
    "khaki",
    "lightgray",
];

/// Write both dictionaries of `tree` into `dir`, creating it if needed.
pub fn save(tree: &QuartetTree, dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;

    let mut writer = intspan::writer(&dir.join(INNER_DICT_FILE).to_string_lossy());
    writer.write_all(save_inner_dict(&inner_node_dict(tree)).as_bytes())?;
    writer.flush()?;

    let mut writer = intspan::writer(&dir.join(LEAF_DICT_FILE).to_string_lossy());
    writer.write_all(save_leaf_dict(&leaf_dict(tree)).as_bytes())?;
    writer.flush()?;

    Ok(())
}

/// Read a tree checkpoint from `dir`.
pub fn load(dir: &Path) -> anyhow::Result<QuartetTree> {
    let inner = load_inner_dict(&read_to_string(&dir.join(INNER_DICT_FILE))?)?;
    let leaves = load_leaf_dict(&read_to_string(&dir.join(LEAF_DICT_FILE))?)?;
    Ok(QuartetTree::from_dicts(&inner, &leaves)?)
}

fn read_to_string(path: &Path) -> Result<String, TreeError> {
    if !path.is_file() {
        return Err(TreeError::Checkpoint(format!("{} not found", path.display())));
    }
    let reader = intspan::reader(&path.to_string_lossy());
    let mut text = String::new();
    for line in reader.lines() {
        let line = line.map_err(|e| TreeError::Checkpoint(e.to_string()))?;
        text.push_str(&line);
        text.push('\n');
    }
    Ok(text)
}

/// Read `label<TAB>cluster` lines and return the clusters in `labels` order.
pub fn read_clusters(infile: &str, labels: &[String]) -> anyhow::Result<Vec<usize>> {
    let mut assigned: BTreeMap<String, usize> = BTreeMap::new();
    for line in intspan::reader(infile).lines() {
        let line = line?;
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 2 {
            continue;
        }
        assigned.insert(fields[0].to_string(), fields[1].trim().parse()?);
    }

    labels
        .iter()
        .map(|l| {
            assigned
                .get(l)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("{} has no cluster", l))
        })
        .collect()
}
