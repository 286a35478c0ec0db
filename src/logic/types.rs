use super::graph::{AssetKey, PathHash};
use crate::utils::constants::{DEFAULT_MAX_EXPANSIONS, MAX_HOPS};
use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::Instant;

/// One exchange-rate observation pushed by the market-data feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketUpdate {
    pub venue: String,
    pub base: String,
    pub quote: String,
    pub rate: f64,
}

impl MarketUpdate {
    pub fn new(venue: impl Into<String>, base: impl Into<String>, quote: impl Into<String>, rate: f64) -> Self {
        Self { venue: venue.into(), base: base.into(), quote: quote.into(), rate }
    }
}

/// A single traversed edge of a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hop {
    pub from: AssetKey,
    pub to: AssetKey,
    pub rate: f64,
}

impl Display for Hop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}@{}", self.from, self.to, self.rate)
    }
}

/// Result of a cycle search for one pending transaction.
///
/// A signal that is not profitable carries an empty path. Signals are consumed right away by the
/// race coordinator and never stored.
#[derive(Debug, Clone)]
pub struct Signal {
    /// Pending transaction that triggered the search
    pub trigger: Option<B256>,
    pub profitable: bool,
    pub path: Vec<Hop>,
    /// Sum of `-ln(rate)` over the path
    pub cumulative_weight: f64,
    /// `exp(-cumulative_weight)`
    pub profit_ratio: f64,
    pub path_hash: PathHash,
    pub discovered_at: Instant,
}

impl Signal {
    pub fn not_profitable(trigger: Option<B256>) -> Self {
        Self {
            trigger,
            profitable: false,
            path: Vec::new(),
            cumulative_weight: 0.0,
            profit_ratio: 1.0,
            path_hash: PathHash::default(),
            discovered_at: Instant::now(),
        }
    }

    pub fn profitable(trigger: Option<B256>, path: Vec<Hop>, cumulative_weight: f64) -> Self {
        let mut signal = Self {
            trigger,
            profitable: true,
            path,
            cumulative_weight,
            profit_ratio: (-cumulative_weight).exp(),
            path_hash: PathHash::default(),
            discovered_at: Instant::now(),
        };
        let assets = signal.asset_path();
        signal.path_hash = PathHash::from_hops(assets.iter().map(String::as_str));
        signal
    }

    /// The hop identifiers handed to the settlement contract, start asset first and last.
    pub fn asset_path(&self) -> Vec<String> {
        let Some(first) = self.path.first() else {
            return Vec::new();
        };
        std::iter::once(first.from.hop_id()).chain(self.path.iter().map(|hop| hop.to.hop_id())).collect()
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}

impl Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.profitable {
            return write!(f, "Signal(not profitable)");
        }
        let path = self.asset_path().join(" -> ");
        write!(f, "Signal(hops={}, ratio={:.6}, path={})", self.path.len(), self.profit_ratio, path)
    }
}

/// Parameters of the cycle search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    /// Maximum cycle length in hops
    pub max_hops: u8,
    /// Minimum implied profit ratio, execution overhead already included
    pub threshold: f64,
    /// Upper limit of expanded edges per search
    pub max_expansions: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { max_hops: MAX_HOPS, threshold: 1.0, max_expansions: DEFAULT_MAX_EXPANSIONS }
    }
}

impl SearchConfig {
    pub fn new(max_hops: u8, threshold: f64) -> Self {
        Self { max_hops, threshold, ..Self::default() }
    }

    pub fn with_max_expansions(mut self, max_expansions: usize) -> Self {
        self.max_expansions = max_expansions;
        self
    }

    /// A cycle qualifies when its cumulative weight is strictly below this value.
    pub fn weight_target(&self) -> f64 {
        -self.threshold.ln()
    }
}

/// Counters of a single search, logged at debug level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub expanded: usize,
    pub pruned: usize,
    pub budget_exhausted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profitable_signal_asset_path() {
        let a = AssetKey::new("dex", "A");
        let b = AssetKey::new("dex", "B");
        let path = vec![
            Hop { from: a.clone(), to: b.clone(), rate: 1.1 },
            Hop { from: b.clone(), to: a.clone(), rate: 1.0 },
        ];
        let signal = Signal::profitable(None, path, -(1.1f64.ln()));

        assert!(signal.profitable);
        assert_eq!(signal.asset_path(), vec!["dex:A", "dex:B", "dex:A"]);
        assert!((signal.profit_ratio - 1.1).abs() < 1e-12);
        assert_eq!(signal.path_hash, PathHash::from_hops(["dex:A", "dex:B", "dex:A"]));
    }

    #[test]
    fn test_not_profitable_signal_is_empty() {
        let signal = Signal::not_profitable(Some(B256::repeat_byte(1)));
        assert!(!signal.profitable);
        assert!(signal.is_empty());
        assert!(signal.asset_path().is_empty());
        assert_eq!(signal.to_string(), "Signal(not profitable)");
    }

    #[test]
    fn test_weight_target() {
        assert_eq!(SearchConfig::new(12, 1.0).weight_target(), 0.0);
        assert!(SearchConfig::new(12, 1.01).weight_target() < 0.0);
    }
}
