use super::cycle_search::CycleSearch;
use super::start_asset::StartAssetResolver;
use super::types::{SearchConfig, SearchStats, Signal};
use crate::data_sync::{PendingTx, SharedMarketGraph};
use crate::execution::ExecutionRaceCoordinator;
use eyre::{Result, eyre};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

/// StrikeEngine turns pending transactions into execution races.
///
/// For every notification it resolves a start asset, searches the shared market graph for a
/// profitable cycle under a read guard and hands a profitable signal to the race coordinator.
/// Each notification is handled on its own task so a slow search never blocks ingestion.
pub struct StrikeEngine {
    graph: SharedMarketGraph,
    search: CycleSearch,
    resolver: Arc<dyn StartAssetResolver>,
    coordinator: ExecutionRaceCoordinator,
    stats: EngineStats,
}

impl StrikeEngine {
    pub fn search_config(&self) -> &SearchConfig {
        self.search.config()
    }

    pub fn coordinator(&self) -> &ExecutionRaceCoordinator {
        &self.coordinator
    }

    /// Search for a profitable cycle on behalf of `tx`.
    pub async fn evaluate(&self, tx: &PendingTx) -> (Signal, SearchStats) {
        let Some(start) = self.resolver.resolve(tx) else {
            self.stats.unresolved.fetch_add(1, Ordering::Relaxed);
            return (Signal::not_profitable(Some(tx.hash)), SearchStats::default());
        };

        let graph = self.graph.read().await;
        let (signal, search_stats) = self.search.find_profitable_cycle(&graph, &start, Some(tx.hash));
        drop(graph);

        self.stats.searches.fetch_add(1, Ordering::Relaxed);
        if search_stats.budget_exhausted {
            self.stats.budget_exhausted.fetch_add(1, Ordering::Relaxed);
            warn!(
                "Search from {} for {} hit the expansion cap after {} expansions",
                start, tx.hash, search_stats.expanded
            );
        }
        (signal, search_stats)
    }

    /// Evaluate `tx` and race a profitable signal. Returns the number of attempts dispatched.
    pub async fn handle_pending(&self, tx: PendingTx) -> usize {
        self.stats.notifications.fetch_add(1, Ordering::Relaxed);
        let (signal, search_stats) = self.evaluate(&tx).await;

        if !signal.profitable {
            debug!(
                "{}: no profitable cycle ({} expanded, {} pruned)",
                tx.hash, search_stats.expanded, search_stats.pruned
            );
            return 0;
        }

        self.stats.profitable.fetch_add(1, Ordering::Relaxed);
        info!(
            "{}: {} {} expanded in {:?} since seen",
            tx.hash,
            signal,
            search_stats.expanded,
            tx.seen_at.elapsed()
        );

        let dispatched = self.coordinator.strike(Arc::new(signal));
        self.stats.dispatched.fetch_add(dispatched as u64, Ordering::Relaxed);
        dispatched
    }

    /// Handle notifications until the channel closes, then wait for in-flight handlers.
    pub async fn run(self: Arc<Self>, mut pending_rx: mpsc::Receiver<PendingTx>) -> EngineStatsSnapshot {
        let config = self.search.config();
        info!("Strike engine started, max_hops={} threshold={}", config.max_hops, config.threshold);
        let mut handlers = JoinSet::new();

        while let Some(tx) = pending_rx.recv().await {
            let engine = Arc::clone(&self);
            handlers.spawn(async move { engine.handle_pending(tx).await });
            while let Some(joined) = handlers.try_join_next() {
                self.record_handler(joined);
            }
        }
        while let Some(joined) = handlers.join_next().await {
            self.record_handler(joined);
        }

        let stats = self.get_statistics();
        warn!(
            "Strike engine stopped: notifications={} profitable={} dispatched={} faulted={}",
            stats.notifications, stats.profitable, stats.dispatched, stats.faulted
        );
        stats
    }

    fn record_handler(&self, joined: Result<usize, JoinError>) {
        if let Err(e) = joined {
            self.stats.faulted.fetch_add(1, Ordering::Relaxed);
            if e.is_panic() {
                error!("Pending transaction handler panicked: {}", e);
            } else {
                error!("Pending transaction handler cancelled: {}", e);
            }
        }
    }

    pub fn get_statistics(&self) -> EngineStatsSnapshot {
        self.stats.snapshot()
    }
}

#[derive(Debug, Default)]
struct EngineStats {
    notifications: AtomicU64,
    unresolved: AtomicU64,
    searches: AtomicU64,
    budget_exhausted: AtomicU64,
    profitable: AtomicU64,
    dispatched: AtomicU64,
    faulted: AtomicU64,
}

impl EngineStats {
    fn snapshot(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            notifications: self.notifications.load(Ordering::Relaxed),
            unresolved: self.unresolved.load(Ordering::Relaxed),
            searches: self.searches.load(Ordering::Relaxed),
            budget_exhausted: self.budget_exhausted.load(Ordering::Relaxed),
            profitable: self.profitable.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            faulted: self.faulted.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time engine statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EngineStatsSnapshot {
    pub notifications: u64,
    pub unresolved: u64,
    pub searches: u64,
    pub budget_exhausted: u64,
    pub profitable: u64,
    pub dispatched: u64,
    /// Handlers that panicked or were cancelled
    pub faulted: u64,
}

/// Builder for StrikeEngine
pub struct StrikeEngineBuilder {
    graph: SharedMarketGraph,
    search_config: SearchConfig,
    resolver: Option<Arc<dyn StartAssetResolver>>,
    coordinator: Option<ExecutionRaceCoordinator>,
}

impl StrikeEngineBuilder {
    pub fn new(graph: SharedMarketGraph) -> Self {
        Self { graph, search_config: SearchConfig::default(), resolver: None, coordinator: None }
    }

    pub fn with_search_config(mut self, search_config: SearchConfig) -> Self {
        self.search_config = search_config;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn StartAssetResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_coordinator(mut self, coordinator: ExecutionRaceCoordinator) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    pub fn build(self) -> Result<StrikeEngine> {
        let resolver = self.resolver.ok_or_else(|| eyre!("StrikeEngine needs a start asset resolver"))?;
        let coordinator = self.coordinator.ok_or_else(|| eyre!("StrikeEngine needs a race coordinator"))?;

        Ok(StrikeEngine {
            graph: self.graph,
            search: CycleSearch::new(self.search_config),
            resolver,
            coordinator,
            stats: EngineStats::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_sync::MarketFeed;
    use crate::execution::{MockChainClient, NetworkGovernor, NetworkProfile, StrikeCategory};
    use crate::logic::FixedStartAsset;
    use crate::logic::graph::{AssetKey, MarketGraph};
    use crate::logic::types::MarketUpdate;
    use alloy_primitives::utils::parse_ether;
    use alloy_primitives::{Address, B256};
    use std::time::Duration;
    use tokio::sync::RwLock;
    use tokio::time::timeout;

    struct NoStart;

    struct PanickingStart;

    impl StartAssetResolver for PanickingStart {
        fn resolve(&self, _tx: &PendingTx) -> Option<AssetKey> {
            panic!("resolver blew up");
        }
    }

    impl StartAssetResolver for NoStart {
        fn resolve(&self, _tx: &PendingTx) -> Option<AssetKey> {
            None
        }
    }

    async fn triangle(closing_rate: f64) -> SharedMarketGraph {
        let graph = Arc::new(RwLock::new(MarketGraph::new()));
        MarketFeed::new(Arc::clone(&graph))
            .apply_batch(&[
                MarketUpdate::new("uni", "A", "B", 1.02),
                MarketUpdate::new("uni", "B", "C", 1.01),
                MarketUpdate::new("uni", "C", "A", closing_rate),
            ])
            .await;
        graph
    }

    fn engine(
        graph: SharedMarketGraph,
        governors: Vec<Arc<NetworkGovernor>>,
    ) -> Result<(StrikeEngine, mpsc::UnboundedReceiver<crate::execution::StrikeReport>)> {
        let (coordinator, reports) = ExecutionRaceCoordinator::new(governors);
        let engine = StrikeEngineBuilder::new(graph)
            .with_search_config(SearchConfig::new(12, 1.0))
            .with_resolver(Arc::new(FixedStartAsset::new(AssetKey::new("uni", "A"))))
            .with_coordinator(coordinator)
            .build()?;
        Ok((engine, reports))
    }

    fn governor(name: &str, client: Arc<MockChainClient>) -> Result<Arc<NetworkGovernor>> {
        let profile = NetworkProfile::new(name, 1, parse_ether("0.01")?, 1_000_000_000);
        Ok(Arc::new(NetworkGovernor::new(profile, client, Address::repeat_byte(0xee))))
    }

    #[tokio::test]
    async fn test_profitable_notification_races_every_network() -> Result<()> {
        let eth = Arc::new(MockChainClient::new(parse_ether("1.5")?, 1_000_000_000));
        let base = Arc::new(MockChainClient::new(parse_ether("0.5")?, 1_000_000_000));
        let governors = vec![governor("ETHEREUM", Arc::clone(&eth))?, governor("BASE", Arc::clone(&base))?];
        let (engine, mut reports) = engine(triangle(1.0).await, governors)?;

        let dispatched = engine.handle_pending(PendingTx::new(B256::repeat_byte(0x09))).await;
        assert_eq!(dispatched, 2);

        for _ in 0..2 {
            let report = timeout(Duration::from_secs(5), reports.recv()).await?.ok_or_else(|| eyre!("no report"))?;
            assert_eq!(report.outcome.category(), StrikeCategory::Submitted);
            assert_eq!(report.trigger, Some(B256::repeat_byte(0x09)));
        }
        assert_eq!(eth.submitted().len(), 1);
        assert_eq!(base.submitted().len(), 1);

        let stats = engine.get_statistics();
        assert_eq!(stats.profitable, 1);
        assert_eq!(stats.dispatched, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_unprofitable_notification_dispatches_nothing() -> Result<()> {
        let client = Arc::new(MockChainClient::new(parse_ether("1.5")?, 1_000_000_000));
        let (engine, _reports) = engine(triangle(0.95).await, vec![governor("ETHEREUM", Arc::clone(&client))?])?;

        let (signal, _) = engine.evaluate(&PendingTx::new(B256::ZERO)).await;
        assert!(!signal.profitable);
        assert!(signal.path.is_empty());

        assert_eq!(engine.handle_pending(PendingTx::new(B256::ZERO)).await, 0);
        assert!(client.first_call_at().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_unresolved_start_is_skipped() -> Result<()> {
        let (coordinator, _reports) = ExecutionRaceCoordinator::new(Vec::new());
        let engine = StrikeEngineBuilder::new(triangle(1.0).await)
            .with_resolver(Arc::new(NoStart))
            .with_coordinator(coordinator)
            .build()?;

        assert_eq!(engine.handle_pending(PendingTx::new(B256::ZERO)).await, 0);
        let stats = engine.get_statistics();
        assert_eq!(stats.unresolved, 1);
        assert_eq!(stats.searches, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_run_handles_every_notification() -> Result<()> {
        let (engine, _reports) = engine(triangle(1.0).await, Vec::new())?;
        let engine = Arc::new(engine);
        let (tx, rx) = mpsc::channel(8);

        for byte in 0..5u8 {
            tx.send(PendingTx::new(B256::repeat_byte(byte))).await?;
        }
        drop(tx);

        let stats = timeout(Duration::from_secs(5), Arc::clone(&engine).run(rx)).await?;
        assert_eq!(stats.notifications, 5);
        assert_eq!(stats.searches, 5);
        assert_eq!(stats.profitable, 5);
        assert_eq!(stats.dispatched, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_run_counts_panicking_handlers() -> Result<()> {
        let (coordinator, _reports) = ExecutionRaceCoordinator::new(Vec::new());
        let engine = StrikeEngineBuilder::new(triangle(1.0).await)
            .with_resolver(Arc::new(PanickingStart))
            .with_coordinator(coordinator)
            .build()?;
        let (tx, rx) = mpsc::channel(8);

        for byte in 0..3u8 {
            tx.send(PendingTx::new(B256::repeat_byte(byte))).await?;
        }
        drop(tx);

        let stats = timeout(Duration::from_secs(5), Arc::new(engine).run(rx)).await?;
        assert_eq!(stats.notifications, 3);
        assert_eq!(stats.searches, 0);
        assert_eq!(stats.faulted, 3);
        Ok(())
    }

    const WINNING: [f64; 3] = [1.10, 1.00, 0.95];
    const LOSING: [f64; 3] = [0.90, 1.05, 1.00];

    fn ring(rates: [f64; 3]) -> Vec<MarketUpdate> {
        vec![
            MarketUpdate::new("uni", "A", "B", rates[0]),
            MarketUpdate::new("uni", "B", "C", rates[1]),
            MarketUpdate::new("uni", "C", "A", rates[2]),
        ]
    }

    // any mix of the two batches that starts with the winning A->B hop is also profitable,
    // so a torn read would surface as a signal with foreign rates
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_search_never_sees_half_applied_batch() -> Result<()> {
        let graph = Arc::new(RwLock::new(MarketGraph::new()));
        let feed = MarketFeed::new(Arc::clone(&graph));
        feed.apply_batch(&ring(WINNING)).await;
        let (engine, _reports) = engine(graph, Vec::new())?;
        let engine = Arc::new(engine);

        let writer = tokio::spawn(async move {
            for round in 0..400 {
                let rates = if round % 2 == 0 { LOSING } else { WINNING };
                feed.apply_batch(&ring(rates)).await;
                tokio::task::yield_now().await;
            }
        });

        let mut searches = JoinSet::new();
        for _ in 0..4 {
            let engine = Arc::clone(&engine);
            searches.spawn(async move {
                for _ in 0..400 {
                    let (signal, _) = engine.evaluate(&PendingTx::new(B256::ZERO)).await;
                    if signal.profitable {
                        let rates: Vec<f64> = signal.path.iter().map(|hop| hop.rate).collect();
                        assert_eq!(rates, WINNING.to_vec());
                    }
                    tokio::task::yield_now().await;
                }
            });
        }
        while let Some(joined) = searches.join_next().await {
            joined?;
        }
        writer.await?;

        assert_eq!(engine.get_statistics().searches, 1600);
        Ok(())
    }

    #[test]
    fn test_builder_requires_resolver() {
        let (coordinator, _reports) = ExecutionRaceCoordinator::new(Vec::new());
        let graph = Arc::new(RwLock::new(MarketGraph::new()));
        let result = StrikeEngineBuilder::new(graph).with_coordinator(coordinator).build();
        assert!(result.is_err());
    }
}
