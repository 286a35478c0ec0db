use super::asset::{AssetKey, AssetWrapper};
use crate::errors::GraphError;
use crate::logic::types::MarketUpdate;
use ahash::RandomState;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

pub type FastHasher = RandomState;
/// FastHashMap using ahash
pub type FastHashMap<K, V> = HashMap<K, V, FastHasher>;

/// Directed graph of assets (nodes) and exchange rates (edges).
///
/// Edge weights are stored in log space (`-ln(rate)`) so that the weight of a cycle is the
/// sum of its edges and a cycle is profitable when that sum is negative.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketGraph {
    // Nodes and edges are never removed, so plain indices stay valid.
    pub graph: DiGraph<AssetNode, ExchangeEdge, usize>,
    // asset -> node index
    pub asset_index: FastHashMap<AssetKey, NodeIndex<usize>>,
    // outgoing edges per node in insertion order (petgraph walks its edge lists newest first)
    adjacency: Vec<Vec<EdgeIndex<usize>>>,
    // smallest edge weight in the graph, None while empty
    min_weight: Option<f64>,
}

/// What an upsert did to the graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EdgeUpdate {
    Inserted,
    Updated { previous_rate: f64 },
}

impl MarketGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node_index(&self, asset: &AssetKey) -> Option<NodeIndex<usize>> {
        self.asset_index.get(asset).copied()
    }

    pub fn asset(&self, node: NodeIndex<usize>) -> Option<&AssetWrapper> {
        self.graph.node_weight(node).map(|node| &node.asset)
    }

    /// Minimum edge weight across the whole graph, used as the pruning bound of the cycle search.
    pub fn min_weight(&self) -> Option<f64> {
        self.min_weight
    }

    pub fn add_or_get_asset_idx(&mut self, asset: &AssetKey) -> NodeIndex<usize> {
        if let Some(&idx) = self.asset_index.get(asset) {
            return idx;
        }
        let arc_asset = Arc::new(asset.clone());
        let idx = self.graph.add_node(AssetNode::new(arc_asset));
        self.asset_index.insert(asset.clone(), idx);
        self.adjacency.push(Vec::new());
        idx
    }

    /// Insert the edge `from -> to` or overwrite its rate in place.
    ///
    /// Rejected input leaves the graph untouched, no node is created for it.
    pub fn upsert_edge(&mut self, from: &AssetKey, to: &AssetKey, rate: f64) -> Result<EdgeUpdate, GraphError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(GraphError::InvalidRate { from: from.to_string(), to: to.to_string(), rate });
        }
        if from == to {
            return Err(GraphError::SelfLoop { asset: from.to_string() });
        }

        let edge = ExchangeEdge::new(rate);
        let from_idx = self.add_or_get_asset_idx(from);
        let to_idx = self.add_or_get_asset_idx(to);

        if let Some(edge_idx) = self.graph.find_edge(from_idx, to_idx) {
            let previous = std::mem::replace(&mut self.graph[edge_idx], edge);
            self.track_overwrite(previous.weight, edge.weight);
            Ok(EdgeUpdate::Updated { previous_rate: previous.rate })
        } else {
            let edge_idx = self.graph.add_edge(from_idx, to_idx, edge);
            self.adjacency[from_idx.index()].push(edge_idx);
            self.min_weight = Some(self.min_weight.map_or(edge.weight, |min| min.min(edge.weight)));
            Ok(EdgeUpdate::Inserted)
        }
    }

    /// Apply one `(venue, base, quote, rate)` tuple from the market-data feed.
    pub fn apply_update(&mut self, update: &MarketUpdate) -> Result<EdgeUpdate, GraphError> {
        let from = AssetKey::new(update.venue.as_str(), update.base.as_str());
        let to = AssetKey::new(update.venue.as_str(), update.quote.as_str());
        self.upsert_edge(&from, &to, update.rate)
    }

    pub fn edge_between(&self, from: &AssetKey, to: &AssetKey) -> Option<&ExchangeEdge> {
        let from_idx = self.asset_index.get(from)?;
        let to_idx = self.asset_index.get(to)?;
        let edge_idx = self.graph.find_edge(*from_idx, *to_idx)?;
        self.graph.edge_weight(edge_idx)
    }

    /// Outgoing edges of a node in insertion order, with their target node.
    pub fn neighbor_indices(
        &self,
        node: NodeIndex<usize>,
    ) -> impl Iterator<Item = (&ExchangeEdge, NodeIndex<usize>)> + '_ {
        self.adjacency.get(node.index()).into_iter().flatten().filter_map(move |&edge_idx| {
            let (_, target) = self.graph.edge_endpoints(edge_idx)?;
            Some((&self.graph[edge_idx], target))
        })
    }

    /// Outgoing edges of an asset in insertion order. Unknown assets have no neighbors.
    pub fn neighbors<'a>(&'a self, asset: &AssetKey) -> impl Iterator<Item = (&'a ExchangeEdge, &'a AssetKey)> + 'a {
        self.node_index(asset)
            .into_iter()
            .flat_map(move |idx| self.neighbor_indices(idx))
            .filter_map(move |(edge, target)| self.asset(target).map(|asset| (edge, asset.as_ref())))
    }

    fn track_overwrite(&mut self, previous_weight: f64, new_weight: f64) {
        match self.min_weight {
            Some(min) if new_weight < min => self.min_weight = Some(new_weight),
            // the old minimum edge went up, another edge may hold the minimum now
            Some(min) if previous_weight <= min && new_weight > previous_weight => {
                self.min_weight = self.graph.edge_weights().map(|edge| edge.weight).reduce(f64::min);
            }
            Some(_) => {}
            None => self.min_weight = Some(new_weight),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetNode {
    pub asset: AssetWrapper,
}

impl Display for AssetNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.asset)
    }
}

impl AssetNode {
    pub fn new(asset: AssetWrapper) -> Self {
        Self { asset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExchangeEdge {
    pub rate: f64,
    // -ln(rate)
    pub weight: f64,
}

impl ExchangeEdge {
    pub fn new(rate: f64) -> Self {
        Self { rate, weight: -rate.ln() }
    }
}

impl Display for ExchangeEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rate={} weight={:.6}", self.rate, self.weight)
    }
}
