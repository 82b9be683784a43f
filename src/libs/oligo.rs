//! Expansion of degenerate oligos into every concrete sequence they stand for.
//!
//! The pattern is turned into a layered DAG. Every node holds the literal run
//! that precedes a degenerate symbol plus one of its alternatives, and a layer
//! index that grows by one per degenerate symbol. Concatenating the segments
//! along any start-to-sink path gives one expansion.

use crate::libs::path::{find_paths_until, Graph};
use crate::libs::qtree::TreeError;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Symbol table for degenerate codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegeneracyTable {
    codes: BTreeMap<char, Vec<char>>,
    literals: BTreeSet<char>,
    strict: bool,
}

impl Default for DegeneracyTable {
    fn default() -> Self {
        Self::iupac()
    }
}

impl DegeneracyTable {
    /// A table with the given codes, `ACGT` as literals, strict mode on.
    pub fn new(codes: BTreeMap<char, Vec<char>>) -> Self {
        Self {
            codes,
            literals: "ACGT".chars().collect(),
            strict: true,
        }
    }

    /// IUPAC nucleotide ambiguity codes.
    pub fn iupac() -> Self {
        let codes = [
            ('R', "AG"),
            ('Y', "CT"),
            ('S', "GC"),
            ('W', "AT"),
            ('K', "GT"),
            ('M', "AC"),
            ('B', "CGT"),
            ('D', "AGT"),
            ('H', "ACT"),
            ('V', "ACG"),
            ('N', "ACGT"),
        ]
        .iter()
        .map(|(k, v)| (*k, v.chars().collect()))
        .collect();

        Self::new(codes)
    }

    /// Replace the literal alphabet.
    pub fn with_literals(mut self, literals: &str) -> Self {
        self.literals = literals.chars().collect();
        self
    }

    /// In lenient mode, symbols that are neither literal nor degenerate are
    /// kept as literals instead of being rejected.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Alternatives of a degenerate symbol, `None` for anything else.
    pub fn alternatives(&self, symbol: char) -> Option<&[char]> {
        self.codes.get(&symbol).map(|v| v.as_slice())
    }

    fn classify(&self, symbol: char, position: usize) -> Result<Symbol<'_>, TreeError> {
        if let Some(alts) = self.codes.get(&symbol) {
            Ok(Symbol::Degenerate(alts))
        } else if self.literals.contains(&symbol) || !self.strict {
            Ok(Symbol::Literal(symbol))
        } else {
            Err(TreeError::MalformedDegeneratePattern { symbol, position })
        }
    }
}

enum Symbol<'a> {
    Literal(char),
    Degenerate(&'a [char]),
}

/// A node of the oligo graph: a sequence segment at a layer index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OligoNode {
    pub segment: String,
    pub index: usize,
}

impl fmt::Display for OligoNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.segment, self.index)
    }
}

/// Layered DAG built from one pattern.
#[derive(Debug, Clone, Default)]
pub struct OligoGraph {
    pub adjacency: Graph<OligoNode>,
    /// Index of the sink layer.
    pub last: usize,
}

impl OligoGraph {
    /// Build the graph of a degenerate pattern.
    ///
    /// Each degenerate symbol closes the current literal run into one node
    /// per alternative, all linked from every node of the previous layer.
    /// A trailing literal run becomes a final single-node layer, so sinks
    /// always cover the full pattern length.
    pub fn build(pattern: &str, table: &DegeneracyTable) -> Result<Self, TreeError> {
        let mut adjacency: Graph<OligoNode> = Graph::new();
        let mut previous: Vec<OligoNode> = Vec::new();
        let mut run = String::new();
        let mut index = 0;

        for (position, symbol) in pattern.chars().enumerate() {
            match table.classify(symbol, position)? {
                Symbol::Literal(c) => run.push(c),
                Symbol::Degenerate(alts) => {
                    let layer: Vec<OligoNode> = alts
                        .iter()
                        .map(|alt| OligoNode {
                            segment: format!("{}{}", run, alt),
                            index,
                        })
                        .collect();
                    link(&mut adjacency, &previous, &layer);
                    previous = layer;
                    index += 1;
                    run.clear();
                }
            }
        }

        // trailing literals, or a pattern without any degenerate symbol
        if !run.is_empty() || previous.is_empty() {
            let layer = vec![OligoNode { segment: run, index }];
            link(&mut adjacency, &previous, &layer);
            index += 1;
        }

        Ok(Self {
            adjacency,
            last: index - 1,
        })
    }

    pub fn start_nodes(&self) -> Vec<&OligoNode> {
        self.adjacency.keys().filter(|n| n.index == 0).collect()
    }

    pub fn end_nodes(&self) -> Vec<&OligoNode> {
        self.adjacency
            .keys()
            .filter(|n| n.index == self.last)
            .collect()
    }

    /// Every concrete sequence spelled by a start-to-sink path.
    pub fn sequences(&self) -> BTreeSet<String> {
        let mut seqs = BTreeSet::new();
        for start in self.start_nodes() {
            for path in find_paths_until(&self.adjacency, start, |n| n.index == self.last) {
                let seq: String = path.iter().map(|n| n.segment.as_str()).collect();
                seqs.insert(seq);
            }
        }
        seqs
    }
}

fn link(adjacency: &mut Graph<OligoNode>, from: &[OligoNode], to: &[OligoNode]) {
    for node in to {
        adjacency.entry(node.clone()).or_default();
    }
    for node in from {
        let edges = adjacency.entry(node.clone()).or_default();
        edges.extend(to.iter().cloned());
    }
}

/// Expand a degenerate pattern into the set of concrete sequences.
///
/// ```
/// use quartree::libs::oligo::{expand_degenerate, DegeneracyTable};
///
/// let table = DegeneracyTable::iupac();
/// let seqs = expand_degenerate("AGR", &table).unwrap();
/// assert_eq!(seqs.into_iter().collect::<Vec<_>>(), vec!["AGA", "AGG"]);
/// ```
pub fn expand_degenerate(pattern: &str, table: &DegeneracyTable) -> Result<BTreeSet<String>, TreeError> {
    Ok(OligoGraph::build(pattern, table)?.sequences())
}

/// Number of expansions before deduplication.
pub fn count_degeneracy(pattern: &str, table: &DegeneracyTable) -> Result<usize, TreeError> {
    let mut count = 1usize;
    for (position, symbol) in pattern.chars().enumerate() {
        if let Symbol::Degenerate(alts) = table.classify(symbol, position)? {
            count = count.saturating_mul(alts.len());
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_r() -> DegeneracyTable {
        let mut codes = BTreeMap::new();
        codes.insert('R', vec!['A', 'G']);
        DegeneracyTable::new(codes)
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn trailing_degenerate() {
        assert_eq!(expand_degenerate("AGR", &table_r()).unwrap(), set(&["AGA", "AGG"]));
    }

    #[test]
    fn no_degenerate_symbol() {
        let empty = DegeneracyTable::new(BTreeMap::new());
        assert_eq!(expand_degenerate("ACGT", &empty).unwrap(), set(&["ACGT"]));
    }

    #[test]
    fn leading_degenerate() {
        let table = table_r();
        let graph = OligoGraph::build("RAC", &table).unwrap();
        assert_eq!(graph.start_nodes().len(), 2);
        assert_eq!(graph.end_nodes().len(), 1);
        assert_eq!(graph.sequences(), set(&["AAC", "GAC"]));
    }

    #[test]
    fn node_labels_carry_layer_index() {
        let graph = OligoGraph::build("TRAC", &table_r()).unwrap();
        let labels: Vec<String> = graph.adjacency.keys().map(|n| n.to_string()).collect();
        assert_eq!(labels, vec!["AC1", "TA0", "TG0"]);
    }

    #[test]
    fn expansions_keep_pattern_length() {
        let table = DegeneracyTable::iupac();
        for pattern in ["GTGYCAGCMGCCGCGGTAA", "RAYTNGGA", "NNN", "ACRYT", "GGACTACHVGGGTWTCTAAT"] {
            let seqs = expand_degenerate(pattern, &table).unwrap();
            assert_eq!(seqs.len(), count_degeneracy(pattern, &table).unwrap());
            for seq in &seqs {
                assert_eq!(seq.len(), pattern.len(), "{} from {}", seq, pattern);
            }
        }
    }

    #[test]
    fn one_walk_per_start() {
        let table = DegeneracyTable::iupac();
        for pattern in ["RAYTN", "NNAN", "ACGT", "WSN"] {
            let graph = OligoGraph::build(pattern, &table).unwrap();
            let mut pairwise = BTreeSet::new();
            for start in graph.start_nodes() {
                for end in graph.end_nodes() {
                    for path in crate::libs::path::find_all_paths(&graph.adjacency, start, end) {
                        pairwise.insert(path.iter().map(|n| n.segment.as_str()).collect::<String>());
                    }
                }
            }
            assert_eq!(graph.sequences(), pairwise, "{}", pattern);
            assert_eq!(graph.sequences().len(), count_degeneracy(pattern, &table).unwrap());
        }
    }

    #[test]
    fn duplicates_collapse() {
        let mut codes = BTreeMap::new();
        codes.insert('X', vec!['A', 'A']);
        let table = DegeneracyTable::new(codes);
        assert_eq!(count_degeneracy("XC", &table).unwrap(), 2);
        assert_eq!(expand_degenerate("XC", &table).unwrap(), set(&["AC"]));
    }

    #[test]
    fn unknown_symbols() {
        let strict = DegeneracyTable::iupac();
        assert_eq!(
            expand_degenerate("ACZT", &strict),
            Err(TreeError::MalformedDegeneratePattern {
                symbol: 'Z',
                position: 2
            })
        );

        let lenient = DegeneracyTable::iupac().with_strict(false);
        assert_eq!(expand_degenerate("ACZR", &lenient).unwrap(), set(&["ACZA", "ACZG"]));
    }

    #[test]
    fn empty_pattern() {
        assert_eq!(expand_degenerate("", &DegeneracyTable::iupac()).unwrap(), set(&[""]));
    }
}
