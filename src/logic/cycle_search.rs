use super::graph::{AssetKey, MarketGraph};
use super::types::{Hop, SearchConfig, SearchStats, Signal};
use alloy_primitives::B256;
use petgraph::graph::NodeIndex;
use tracing::debug;

// Slack on the pruning bound so that summation order can never prune a qualifying cycle.
const PRUNE_EPSILON: f64 = 1e-12;

/// Bounded-depth log-weight DFS for profitable cycles.
///
/// The search walks the market graph depth first from the start asset, keeping the running
/// sum of edge weights. The first cycle back to the start whose implied ratio strictly
/// exceeds the threshold is returned; no attempt is made to find the best one. Among several
/// qualifying cycles the winner is the first in DFS order over insertion-ordered edges.
#[derive(Debug, Clone)]
pub struct CycleSearch {
    config: SearchConfig,
}

impl CycleSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search for a profitable cycle through `start`.
    ///
    /// Never fails: an unknown start asset, an asset without outgoing edges or an exhausted
    /// budget all yield a non-profitable signal.
    pub fn find_profitable_cycle(
        &self,
        graph: &MarketGraph,
        start: &AssetKey,
        trigger: Option<B256>,
    ) -> (Signal, SearchStats) {
        let Some(start_idx) = graph.node_index(start) else {
            debug!("Start asset {} not in market graph", start);
            return (Signal::not_profitable(trigger), SearchStats::default());
        };
        let Some(min_weight) = graph.min_weight() else {
            return (Signal::not_profitable(trigger), SearchStats::default());
        };
        if self.config.max_hops < 2 {
            return (Signal::not_profitable(trigger), SearchStats::default());
        }

        let mut visited = vec![false; graph.node_count()];
        visited[start_idx.index()] = true;

        let mut dfs = DfsState {
            graph,
            start: start_idx,
            config: &self.config,
            weight_target: self.config.weight_target(),
            min_weight,
            visited,
            path: Vec::with_capacity(self.config.max_hops as usize),
            stats: SearchStats::default(),
        };

        let found = dfs.visit(start_idx, 0.0);
        let stats = dfs.stats;

        match found {
            Some(cumulative_weight) => {
                let hops = dfs.hops();
                let signal = Signal::profitable(trigger, hops, cumulative_weight);
                debug!(
                    "Profitable cycle found: {} (expanded={}, pruned={})",
                    signal, stats.expanded, stats.pruned
                );
                (signal, stats)
            }
            None => {
                if stats.budget_exhausted {
                    debug!("Cycle search from {} stopped after {} expansions", start, stats.expanded);
                }
                (Signal::not_profitable(trigger), stats)
            }
        }
    }
}

struct DfsState<'a> {
    graph: &'a MarketGraph,
    start: NodeIndex<usize>,
    config: &'a SearchConfig,
    weight_target: f64,
    min_weight: f64,
    // per-search visited flags indexed by node index
    visited: Vec<bool>,
    // (from, to, rate) of the current path
    path: Vec<(NodeIndex<usize>, NodeIndex<usize>, f64)>,
    stats: SearchStats,
}

impl DfsState<'_> {
    /// Returns the cumulative weight of the first qualifying cycle; `self.path` then holds it.
    fn visit(&mut self, node: NodeIndex<usize>, weight: f64) -> Option<f64> {
        let graph = self.graph;
        let max_hops = self.config.max_hops as usize;

        for (edge, next) in graph.neighbor_indices(node) {
            if self.stats.expanded >= self.config.max_expansions {
                self.stats.budget_exhausted = true;
                return None;
            }
            self.stats.expanded += 1;

            let next_weight = weight + edge.weight;
            let hops = self.path.len() + 1;

            if next == self.start {
                if hops >= 2 && self.qualifies(next_weight) {
                    self.path.push((node, next, edge.rate));
                    return Some(next_weight);
                }
                continue;
            }

            // closing the cycle from `next` needs at least one more hop
            if hops >= max_hops || self.visited[next.index()] {
                continue;
            }

            if self.lower_bound(next_weight, max_hops - hops) >= self.weight_target + PRUNE_EPSILON {
                self.stats.pruned += 1;
                continue;
            }

            self.visited[next.index()] = true;
            self.path.push((node, next, edge.rate));

            if let Some(found) = self.visit(next, next_weight) {
                return Some(found);
            }
            if self.stats.budget_exhausted {
                return None;
            }

            self.path.pop();
            self.visited[next.index()] = false;
        }

        None
    }

    fn qualifies(&self, cumulative_weight: f64) -> bool {
        cumulative_weight < self.weight_target && (-cumulative_weight).exp() > self.config.threshold
    }

    /// Smallest cumulative weight any completion of the current path can reach with
    /// between 1 and `remaining` more edges.
    fn lower_bound(&self, weight: f64, remaining: usize) -> f64 {
        if self.min_weight < 0.0 { weight + remaining as f64 * self.min_weight } else { weight + self.min_weight }
    }

    fn hops(&self) -> Vec<Hop> {
        self.path
            .iter()
            .filter_map(|&(from, to, rate)| {
                let from = self.graph.asset(from)?.as_ref().clone();
                let to = self.graph.asset(to)?.as_ref().clone();
                Some(Hop { from, to, rate })
            })
            .collect()
    }
}
