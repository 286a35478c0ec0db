use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use eyre::Result;
use mesh_strike::config::{AppConfig, NetworkPlan};
use mesh_strike::data_sync::{MarketFeed, PendingTxListener};
use mesh_strike::execution::{
    AlloyChainClient, ExecutionRaceCoordinator, FallbackClient, NetworkGovernor, StrikeSupervisor,
};
use mesh_strike::health;
use mesh_strike::logic::{FixedStartAsset, MarketGraph, StrikeEngineBuilder};
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_CONFIG_FILE: &str = "config.toml";

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).with_line_number(true).init();
}

fn build_governor(
    plan: &NetworkPlan,
    signer: &PrivateKeySigner,
    executor: Address,
) -> Result<Arc<NetworkGovernor>> {
    let endpoints = &plan.endpoints;
    let primary = AlloyChainClient::connect(endpoints.primary_rpc.as_str(), signer.clone())?;
    let secondary = AlloyChainClient::connect(endpoints.secondary_rpc.as_str(), signer.clone())?;
    let client = FallbackClient::new(Arc::new(primary), Arc::new(secondary))
        .with_stall_timeouts(endpoints.primary_stall, endpoints.secondary_stall);

    let profile = &plan.profile;
    info!(
        "[{}] chain {} moat {} wei priority {} wei, stall {:?}/{:?}",
        profile.name,
        profile.chain_id,
        profile.moat,
        profile.priority_fee,
        endpoints.primary_stall,
        endpoints.secondary_stall
    );
    Ok(Arc::new(NetworkGovernor::new(plan.profile.clone(), Arc::new(client), executor)))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let config_file = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
    let config = AppConfig::load(&config_file).await?;
    let config = match config.validate() {
        Ok(config) => config,
        Err(e) => {
            error!("Refusing to start: {}", e);
            return Err(e.into());
        }
    };
    info!("{} starting from {}, funding account {}", config.engine_name, config.start_asset, config.signer.address());

    let graph = Arc::new(RwLock::new(MarketGraph::new()));
    let feed = MarketFeed::new(Arc::clone(&graph));
    let seeded = feed.apply_batch(&config.seed_quotes).await;
    info!("Seeded market graph: {} inserted, {} rejected", seeded.inserted, seeded.rejected);
    // live quote sources push batches through market_tx
    let (market_tx, market_rx) = mpsc::channel(config.ingress.market_channel_buffer.max(1));
    let feed_task = feed.spawn(market_rx);

    let governors = config
        .networks
        .iter()
        .map(|plan| build_governor(plan, &config.signer, config.executor))
        .collect::<Result<Vec<_>>>()?;
    let (coordinator, reports) = ExecutionRaceCoordinator::new(governors);
    let supervisor_task = tokio::spawn(StrikeSupervisor::new(reports).run());

    let listener = health::bind(config.health_port).await?;
    let health_task = tokio::spawn(health::serve(listener, config.engine_name.clone()));

    let engine = Arc::new(
        StrikeEngineBuilder::new(graph)
            .with_search_config(config.search)
            .with_resolver(Arc::new(FixedStartAsset::new(config.start_asset.clone())))
            .with_coordinator(coordinator)
            .build()?,
    );

    let (pending_rx, shutdown_tx) = PendingTxListener::from_config(&config.ingress).subscribe();
    let mut engine_task = tokio::spawn(Arc::clone(&engine).run(pending_rx));

    let shutdown_requested = tokio::select! {
        _ = tokio::signal::ctrl_c() => true,
        result = &mut engine_task => {
            match result {
                Ok(stats) => warn!("Pending transaction stream ended, engine stats: {:?}", stats),
                Err(e) => error!("Engine task failed: {}", e),
            }
            false
        }
    };
    if shutdown_requested {
        info!("Shutdown requested");
        if shutdown_tx.send(()).await.is_err() {
            warn!("Pending transaction listener already stopped");
        }
        match engine_task.await {
            Ok(stats) => info!("Engine stats: {:?}", stats),
            Err(e) => warn!("Engine task failed: {}", e),
        }
    }

    // the coordinator lives in the engine, dropping it lets the supervisor drain and stop
    drop(engine);
    match supervisor_task.await {
        Ok(stats) => info!("Race stats: {} strikes, {:?}", stats.total(), stats),
        Err(e) => warn!("Supervisor task failed: {}", e),
    }

    drop(market_tx);
    if let Err(e) = feed_task.await {
        warn!("Market feed task failed: {}", e);
    }
    health_task.abort();
    Ok(())
}
