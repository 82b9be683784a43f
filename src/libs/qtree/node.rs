/// A vertex of an unrooted ternary tree.
///
/// Inner nodes and leaves live in separate index spaces: `Inner(i)` indexes
/// the inner adjacency table, `Leaf(l)` indexes the leaf labels (which are
/// also the rows of the distance matrix).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Node {
    Inner(usize),
    Leaf(usize),
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    pub fn is_inner(&self) -> bool {
        matches!(self, Node::Inner(_))
    }

    pub fn as_inner(&self) -> Option<usize> {
        match self {
            Node::Inner(i) => Some(*i),
            Node::Leaf(_) => None,
        }
    }
}

/// Checkpoint name of an inner node, `n0`, `n1`, ...
pub fn inner_name(id: usize) -> String {
    format!("n{}", id)
}

/// Inverse of [`inner_name`].
///
/// ```
/// use quartree::libs::qtree::node::parse_inner_name;
///
/// assert_eq!(parse_inner_name("n12"), Some(12));
/// assert_eq!(parse_inner_name("12"), None);
/// assert_eq!(parse_inner_name("nx"), None);
/// ```
pub fn parse_inner_name(name: &str) -> Option<usize> {
    name.strip_prefix('n')?.parse().ok()
}
