//! Path finding over adjacency maps.
//!
//! Every search carries its partial path inside the frontier entry instead of
//! a global visited set, so the same machinery serves single-path lookups on
//! trees and exhaustive simple-path enumeration on DAGs.

use std::collections::{BTreeMap, VecDeque};

/// Adjacency map. The caller decides whether edges are stored both ways.
pub type Graph<N> = BTreeMap<N, Vec<N>>;

/// Frontier discipline for [`find_one_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOrder {
    /// Expansions are prepended to the queue.
    DepthFirst,
    /// Expansions are appended to the queue.
    BreadthFirst,
}

/// Find one path from `start` to `end`, both inclusive.
///
/// Neighbors are expanded in sorted order, so the result is deterministic for
/// a given graph. Returns `None` when `end` is unreachable or `start` is not a
/// key of the graph (unless `start == end`).
///
/// ```
/// use quartree::libs::path::{find_one_path, Graph, SearchOrder};
///
/// let mut graph: Graph<u32> = Graph::new();
/// graph.insert(1, vec![2]);
/// graph.insert(2, vec![1, 3]);
/// graph.insert(3, vec![2]);
///
/// let path = find_one_path(&graph, &1, &3, SearchOrder::DepthFirst).unwrap();
/// assert_eq!(path, vec![1, 2, 3]);
/// ```
pub fn find_one_path<N>(graph: &Graph<N>, start: &N, end: &N, order: SearchOrder) -> Option<Vec<N>>
where
    N: Ord + Clone,
{
    search(graph, start, end, order, None)
}

/// Breadth-first search that gives up as soon as the path under expansion
/// holds more than `max_nodes` nodes.
///
/// A path to `end` is still returned if `end` is dequeued before any longer
/// partial path. This is a hard cutoff: callers rely on `None` meaning
/// "not close enough", not only "disconnected".
pub fn find_bounded_path<N>(graph: &Graph<N>, start: &N, end: &N, max_nodes: usize) -> Option<Vec<N>>
where
    N: Ord + Clone,
{
    search(graph, start, end, SearchOrder::BreadthFirst, Some(max_nodes))
}

fn search<N>(
    graph: &Graph<N>,
    start: &N,
    end: &N,
    order: SearchOrder,
    max_nodes: Option<usize>,
) -> Option<Vec<N>>
where
    N: Ord + Clone,
{
    let mut queue: VecDeque<(N, Vec<N>)> = VecDeque::new();
    queue.push_back((start.clone(), vec![start.clone()]));

    while let Some((head, path)) = queue.pop_front() {
        if &head == end {
            return Some(path);
        }
        if let Some(max) = max_nodes {
            if path.len() > max {
                return None;
            }
        }

        let Some(neighbors) = graph.get(&head) else {
            continue;
        };

        let mut expand: Vec<&N> = neighbors.iter().filter(|n| !path.contains(*n)).collect();
        expand.sort();

        match order {
            SearchOrder::BreadthFirst => {
                for next in expand {
                    let mut p = path.clone();
                    p.push(next.clone());
                    queue.push_back((next.clone(), p));
                }
            }
            SearchOrder::DepthFirst => {
                // reversed so the smallest neighbor ends up at the front
                for next in expand.into_iter().rev() {
                    let mut p = path.clone();
                    p.push(next.clone());
                    queue.push_front((next.clone(), p));
                }
            }
        }
    }

    None
}

/// Enumerate every simple path from `start` to `end`.
///
/// Iterative depth-first search with an explicit stack; a node already in the
/// partial path is never revisited. Paths are returned in discovery order,
/// following the adjacency list order of each node.
///
/// ```
/// use quartree::libs::path::{find_all_paths, Graph};
///
/// let mut graph: Graph<&str> = Graph::new();
/// graph.insert("a", vec!["b", "c"]);
/// graph.insert("b", vec!["d"]);
/// graph.insert("c", vec!["d"]);
///
/// let paths = find_all_paths(&graph, &"a", &"d");
/// assert_eq!(paths, vec![vec!["a", "b", "d"], vec!["a", "c", "d"]]);
/// ```
pub fn find_all_paths<N>(graph: &Graph<N>, start: &N, end: &N) -> Vec<Vec<N>>
where
    N: Ord + Clone,
{
    find_paths_until(graph, start, |n| n == end)
}

/// Enumerate every simple path from `start` to any node accepted by `is_end`.
///
/// A path stops at the first accepted node it reaches. One walk covers all
/// the targets, where `find_all_paths` would need one walk per target.
///
/// ```
/// use quartree::libs::path::{find_paths_until, Graph};
///
/// let mut graph: Graph<u32> = Graph::new();
/// graph.insert(0, vec![1, 2]);
/// graph.insert(1, vec![3, 4]);
/// graph.insert(2, vec![3, 4]);
///
/// let paths = find_paths_until(&graph, &0, |n| *n >= 3);
/// assert_eq!(paths.len(), 4);
/// ```
pub fn find_paths_until<N, F>(graph: &Graph<N>, start: &N, is_end: F) -> Vec<Vec<N>>
where
    N: Ord + Clone,
    F: Fn(&N) -> bool,
{
    let mut paths = Vec::new();
    if is_end(start) {
        paths.push(vec![start.clone()]);
        return paths;
    }
    if !graph.contains_key(start) {
        return paths;
    }

    // each frame: the partial path and the index of the next neighbor to try
    let mut stack: Vec<(Vec<N>, usize)> = vec![(vec![start.clone()], 0)];

    while let Some((path, idx)) = stack.last_mut() {
        let next = path
            .last()
            .and_then(|tip| graph.get(tip))
            .and_then(|neighbors| neighbors.get(*idx))
            .cloned();
        let Some(next) = next else {
            stack.pop();
            continue;
        };
        *idx += 1;
        if path.contains(&next) {
            continue;
        }

        let mut extended = path.clone();
        extended.push(next.clone());
        if is_end(&next) {
            paths.push(extended);
        } else {
            stack.push((extended, 0));
        }
    }

    paths
}

/// The nodes strictly between the two ends of a path.
pub fn interior<N: Clone>(path: &[N]) -> Vec<N> {
    if path.len() <= 2 {
        Vec::new()
    } else {
        path[1..path.len() - 1].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1 - 2 - 3 - 4
    //      \     /
    //        5
    fn diamond() -> Graph<u32> {
        let mut graph = Graph::new();
        graph.insert(1, vec![2]);
        graph.insert(2, vec![1, 3, 5]);
        graph.insert(3, vec![2, 4]);
        graph.insert(4, vec![3, 5]);
        graph.insert(5, vec![2, 4]);
        graph
    }

    fn chain(len: u32) -> Graph<u32> {
        let mut graph = Graph::new();
        for i in 0..len {
            let mut nb = vec![];
            if i > 0 {
                nb.push(i - 1);
            }
            if i + 1 < len {
                nb.push(i + 1);
            }
            graph.insert(i, nb);
        }
        graph
    }

    #[test]
    fn paths_until_any_target() {
        let graph = diamond();
        let mut walked = find_paths_until(&graph, &1, |n| *n == 4 || *n == 5);
        walked.sort();
        assert_eq!(walked, vec![vec![1, 2, 3, 4], vec![1, 2, 5]]);

        let mut by_target = find_all_paths(&graph, &1, &4);
        by_target.extend(find_all_paths(&graph, &1, &5));
        // a per-target walk may run through another target
        assert!(by_target.contains(&vec![1, 2, 5, 4]));
        assert_eq!(find_paths_until(&graph, &3, |n| *n == 3), vec![vec![3]]);
        assert!(find_paths_until(&graph, &9, |n| *n == 1).is_empty());
    }

    #[test]
    fn all_paths_finds_both_routes() {
        let graph = diamond();
        let paths = find_all_paths(&graph, &1, &4);
        assert_eq!(paths.len(), 2);
        assert!(paths.contains(&vec![1, 2, 3, 4]));
        assert!(paths.contains(&vec![1, 2, 5, 4]));

        for path in &paths {
            let mut sorted = path.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted.len(), path.len(), "repeated node in {:?}", path);
        }
    }

    #[test]
    fn all_paths_dead_ends() {
        let mut graph: Graph<u32> = Graph::new();
        graph.insert(1, vec![]);
        assert!(find_all_paths(&graph, &1, &2).is_empty());
        assert!(find_all_paths(&graph, &7, &2).is_empty());
        assert_eq!(find_all_paths(&graph, &7, &7), vec![vec![7]]);
    }

    #[test]
    fn one_path_both_orders() {
        let graph = diamond();
        let dfs = find_one_path(&graph, &1, &4, SearchOrder::DepthFirst).unwrap();
        assert_eq!(dfs, vec![1, 2, 3, 4]);
        let bfs = find_one_path(&graph, &1, &4, SearchOrder::BreadthFirst).unwrap();
        assert_eq!(bfs.len(), 4);
        assert_eq!(bfs.first(), Some(&1));
        assert_eq!(bfs.last(), Some(&4));

        assert_eq!(
            find_one_path(&graph, &3, &3, SearchOrder::BreadthFirst),
            Some(vec![3])
        );
    }

    #[test]
    fn one_path_not_found() {
        let mut graph = diamond();
        graph.insert(9, vec![]);
        assert!(find_one_path(&graph, &1, &9, SearchOrder::DepthFirst).is_none());
        assert!(find_one_path(&graph, &42, &1, SearchOrder::BreadthFirst).is_none());
    }

    #[test]
    fn bounded_path_cutoff() {
        let graph = chain(6);
        assert_eq!(find_bounded_path(&graph, &0, &2, 3), Some(vec![0, 1, 2]));
        // 0-1-2-3 is dequeued before any longer partial path
        assert_eq!(find_bounded_path(&graph, &0, &3, 3), Some(vec![0, 1, 2, 3]));
        assert_eq!(find_bounded_path(&graph, &0, &4, 3), None);
        assert_eq!(find_one_path(&graph, &0, &4, SearchOrder::BreadthFirst).map(|p| p.len()), Some(5));
    }

    #[test]
    fn interior_nodes() {
        assert_eq!(interior(&[1, 2, 3, 4]), vec![2, 3]);
        assert!(interior(&[1, 2]).is_empty());
        assert!(interior::<u32>(&[]).is_empty());
    }
}
