use crate::logic::graph::{EdgeUpdate, MarketGraph};
use crate::logic::types::MarketUpdate;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub type SharedMarketGraph = Arc<RwLock<MarketGraph>>;

/// Counters for applied market updates
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedStats {
    pub batches: usize,
    pub inserted: usize,
    pub updated: usize,
    pub rejected: usize,
}

impl FeedStats {
    fn merge(&mut self, other: FeedStats) {
        self.batches += other.batches;
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.rejected += other.rejected;
    }
}

/// Single writer of the market graph.
///
/// Each batch is applied under one write guard so a concurrent search sees either none or all
/// of it. Rejected updates are logged and skipped, the rest of the batch still applies.
pub struct MarketFeed {
    graph: SharedMarketGraph,
}

impl MarketFeed {
    pub fn new(graph: SharedMarketGraph) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> SharedMarketGraph {
        Arc::clone(&self.graph)
    }

    pub async fn apply_batch(&self, batch: &[MarketUpdate]) -> FeedStats {
        let mut stats = FeedStats { batches: 1, ..Default::default() };
        let mut graph = self.graph.write().await;

        for update in batch {
            match graph.apply_update(update) {
                Ok(EdgeUpdate::Inserted) => stats.inserted += 1,
                Ok(EdgeUpdate::Updated { .. }) => stats.updated += 1,
                Err(e) => {
                    warn!("Skipping market update on {}: {}", update.venue, e);
                    stats.rejected += 1;
                }
            }
        }
        debug!(
            "Applied batch of {}: inserted={} updated={} rejected={}",
            batch.len(),
            stats.inserted,
            stats.updated,
            stats.rejected
        );
        stats
    }

    /// Apply batches until every sender is dropped.
    pub async fn run(self, mut updates_rx: mpsc::Receiver<Vec<MarketUpdate>>) -> FeedStats {
        let mut total = FeedStats::default();
        while let Some(batch) = updates_rx.recv().await {
            total.merge(self.apply_batch(&batch).await);
        }
        info!(
            "Market feed stopped after {} batches: inserted={} updated={} rejected={}",
            total.batches, total.inserted, total.updated, total.rejected
        );
        total
    }

    pub fn spawn(self, updates_rx: mpsc::Receiver<Vec<MarketUpdate>>) -> JoinHandle<FeedStats> {
        tokio::spawn(self.run(updates_rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::graph::AssetKey;

    fn shared() -> SharedMarketGraph {
        Arc::new(RwLock::new(MarketGraph::new()))
    }

    #[tokio::test]
    async fn test_batch_skips_invalid_updates() {
        let feed = MarketFeed::new(shared());
        let stats = feed
            .apply_batch(&[
                MarketUpdate::new("uni", "WETH", "USDC", 3000.0),
                MarketUpdate::new("uni", "USDC", "WETH", -1.0),
                MarketUpdate::new("uni", "WETH", "WETH", 1.0),
                MarketUpdate::new("uni", "USDC", "WETH", 1.0 / 2990.0),
            ])
            .await;

        assert_eq!(stats, FeedStats { batches: 1, inserted: 2, updated: 0, rejected: 2 });

        let graph = feed.graph();
        let graph = graph.read().await;
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.edge_between(&AssetKey::new("uni", "WETH"), &AssetKey::new("uni", "USDC")).is_some());
    }

    #[tokio::test]
    async fn test_run_drains_channel() -> eyre::Result<()> {
        let graph = shared();
        let (tx, rx) = mpsc::channel(4);
        let handle = MarketFeed::new(Arc::clone(&graph)).spawn(rx);

        tx.send(vec![MarketUpdate::new("uni", "WETH", "USDC", 3000.0)]).await?;
        tx.send(vec![MarketUpdate::new("uni", "WETH", "USDC", 3010.0)]).await?;
        drop(tx);

        let stats = handle.await?;
        assert_eq!(stats, FeedStats { batches: 2, inserted: 1, updated: 1, rejected: 0 });

        let graph = graph.read().await;
        let edge = graph
            .edge_between(&AssetKey::new("uni", "WETH"), &AssetKey::new("uni", "USDC"))
            .ok_or_else(|| eyre::eyre!("edge missing"))?;
        assert_eq!(edge.rate, 3010.0);
        Ok(())
    }
}
