use super::mutate::{self, Mutation, MutationConfig};
use super::score::{PathCache, QuartetScorer};
use super::tree::QuartetTree;
use super::TreeError;
use crate::libs::matrix::DistanceMatrix;
use rand::seq::SliceRandom;
use rand::Rng;
use std::ops::ControlFlow;
use tracing::{debug, info, warn};

/// Knobs of the hill-climbing search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    /// Trees to generate, the initial random tree included
    pub n_trees: usize,
    /// Stop once the score reaches this value
    pub target_score: f64,
    /// Never stop before this many trees
    pub min_iterations: usize,
    /// Resampling budget of each mutation operator
    pub max_retries: usize,
    /// Longest connecting path, in nodes, a mutation may work across
    pub path_limit: Option<usize>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            n_trees: 1000,
            target_score: 0.98,
            min_iterations: 6,
            max_retries: 1000,
            path_limit: None,
        }
    }
}

impl SearchOptions {
    fn mutation_config(&self) -> MutationConfig {
        MutationConfig {
            max_retries: self.max_retries,
            path_limit: self.path_limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    BudgetExhausted,
    Cancelled,
}

/// State reported after every accept/reject decision.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'t> {
    pub mutation: Mutation,
    pub accepted: bool,
    /// Trees generated so far
    pub trees: usize,
    /// Score of the current (best) tree
    pub score: f64,
    pub tree: &'t QuartetTree,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOutcome {
    pub reason: StopReason,
    pub score: f64,
    pub trees: usize,
    pub accepted: usize,
}

/// Strict hill climbing over ternary trees.
///
/// Owns the current tree and its path cache; candidates are produced and
/// scored one at a time since each step depends on the previous one.
pub struct TreeSearch<'a, R> {
    scorer: QuartetScorer<'a>,
    tree: QuartetTree,
    cache: PathCache,
    score: f64,
    trees: usize,
    accepted: usize,
    options: SearchOptions,
    rng: R,
}

impl<'a, R: Rng> TreeSearch<'a, R> {
    /// Start from a random tree over the matrix labels.
    pub fn new(dm: &'a DistanceMatrix, options: SearchOptions, mut rng: R) -> Result<Self, TreeError> {
        let tree = QuartetTree::generate_random(dm.get_names(), &mut rng)?;
        Self::resume(dm, tree, options, rng)
    }

    /// Continue from an existing tree, e.g. a loaded checkpoint.
    pub fn resume(
        dm: &'a DistanceMatrix,
        tree: QuartetTree,
        options: SearchOptions,
        rng: R,
    ) -> Result<Self, TreeError> {
        let tree = if tree.labels() == dm.get_names() {
            tree
        } else {
            tree.with_leaf_order(dm.get_names())?
        };

        let scorer = QuartetScorer::new(dm);
        let cache = PathCache::build(&tree);
        let score = scorer.score(&cache).value;
        info!("Initial tree score: {:.5}", score);

        Ok(Self {
            scorer,
            tree,
            cache,
            score,
            trees: 1,
            accepted: 0,
            options,
            rng,
        })
    }

    pub fn tree(&self) -> &QuartetTree {
        &self.tree
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn trees(&self) -> usize {
        self.trees
    }

    pub fn into_tree(self) -> QuartetTree {
        self.tree
    }

    pub fn should_continue(&self) -> bool {
        self.trees < self.options.min_iterations
            || (self.score < self.options.target_score && self.trees < self.options.n_trees)
    }

    /// Mutate, rescore and keep the candidate if it scores strictly higher.
    ///
    /// The mutation type is drawn uniformly; if its operator is exhausted the
    /// other two are tried in random order before giving up.
    pub fn step(&mut self) -> Result<(Mutation, bool), TreeError> {
        let config = self.options.mutation_config();
        let mut order = Mutation::ALL;
        order.shuffle(&mut self.rng);

        let mut candidate = None;
        for mutation in order {
            match mutate::apply(mutation, &self.tree, &mut self.rng, &config) {
                Ok((tree, touched)) => {
                    candidate = Some((mutation, tree, touched));
                    break;
                }
                Err(e @ TreeError::MutationExhausted { .. }) => warn!("{}", e),
                Err(e) => return Err(e),
            }
        }
        let (mutation, tree, touched) = candidate.ok_or(TreeError::TopologyStuck)?;

        let cache = self.cache.refresh(&tree, &touched);
        let score = self.scorer.score(&cache).value;
        self.trees += 1;

        let accepted = score > self.score;
        if accepted {
            self.tree = tree;
            self.cache = cache;
            self.score = score;
            self.accepted += 1;
            debug!(
                "Tree Score: {:.5} Mutation: {} Trees Generated: {}",
                self.score, mutation, self.trees
            );
        }

        Ok((mutation, accepted))
    }

    /// Run until the target score, the tree budget or a cancellation.
    ///
    /// `observer` sees every decision; returning `ControlFlow::Break(())`
    /// stops the search at that boundary.
    pub fn run<F>(&mut self, mut observer: F) -> Result<SearchOutcome, TreeError>
    where
        F: FnMut(&Progress) -> ControlFlow<()>,
    {
        let mut reason = None;
        while self.should_continue() {
            let (mutation, accepted) = self.step()?;
            let progress = Progress {
                mutation,
                accepted,
                trees: self.trees,
                score: self.score,
                tree: &self.tree,
            };
            if observer(&progress).is_break() {
                reason = Some(StopReason::Cancelled);
                break;
            }
        }

        let reason = reason.unwrap_or(if self.score >= self.options.target_score {
            StopReason::TargetReached
        } else {
            StopReason::BudgetExhausted
        });
        info!(
            "Search stopped ({:?}) with score {:.5} after {} trees",
            reason, self.score, self.trees
        );

        Ok(SearchOutcome {
            reason,
            score: self.score,
            trees: self.trees,
            accepted: self.accepted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn uniform(n: usize) -> DistanceMatrix {
        let rows = (0..n)
            .map(|i| (0..n).map(|j| if i == j { 0.0 } else { 1.0 }).collect())
            .collect();
        DistanceMatrix::new((0..n).map(|i| format!("S{}", i)).collect(), rows).unwrap()
    }

    #[test]
    fn never_stops_before_min_iterations() {
        // every tree scores 1.0 on a uniform matrix
        let dm = uniform(6);
        let mut search = TreeSearch::new(&dm, SearchOptions::default(), StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(search.score(), 1.0);

        let outcome = search.run(|_| ControlFlow::Continue(())).unwrap();
        assert_eq!(outcome.trees, 6);
        assert_eq!(outcome.reason, StopReason::TargetReached);
        assert_eq!(outcome.accepted, 0);
    }

    #[test]
    fn zero_retries_get_stuck() {
        let dm = uniform(6);
        let options = SearchOptions {
            max_retries: 0,
            ..Default::default()
        };

        let mut search = TreeSearch::new(&dm, options, StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(search.step().unwrap_err(), TreeError::TopologyStuck);
        assert_eq!(search.trees(), 1);

        let mut search = TreeSearch::new(&dm, options, StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(
            search.run(|_| ControlFlow::Continue(())).unwrap_err(),
            TreeError::TopologyStuck
        );
    }

    #[test]
    fn budget_and_cancel() {
        let mut rows = vec![vec![0.0; 8]; 8];
        for i in 0..8 {
            for j in 0..8 {
                if i != j {
                    rows[i][j] = ((i * 7 + j * 7) % 11 + 1) as f64;
                }
            }
        }
        let dm = DistanceMatrix::new((0..8).map(|i| format!("S{}", i)).collect(), rows).unwrap();

        let options = SearchOptions {
            n_trees: 20,
            target_score: 1.1,
            ..Default::default()
        };
        let mut search = TreeSearch::new(&dm, options, StdRng::seed_from_u64(5)).unwrap();
        let mut last = search.score();
        let outcome = search
            .run(|p| {
                assert!(p.score >= last);
                last = p.score;
                p.tree.validate().unwrap();
                ControlFlow::Continue(())
            })
            .unwrap();
        assert_eq!(outcome.reason, StopReason::BudgetExhausted);
        assert_eq!(outcome.trees, 20);

        let mut search = TreeSearch::new(&dm, options, StdRng::seed_from_u64(5)).unwrap();
        let outcome = search
            .run(|p| {
                if p.trees >= 3 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        assert_eq!(outcome.reason, StopReason::Cancelled);
        assert_eq!(outcome.trees, 3);
    }

    #[test]
    fn same_seed_same_tree() {
        let dm = uniform(9);
        let options = SearchOptions {
            target_score: 2.0,
            n_trees: 30,
            ..Default::default()
        };
        let a = TreeSearch::new(&dm, options, StdRng::seed_from_u64(77)).unwrap();
        let b = TreeSearch::new(&dm, options, StdRng::seed_from_u64(77)).unwrap();
        assert_eq!(a.tree(), b.tree());
    }
}
