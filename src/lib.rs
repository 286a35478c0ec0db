// Three-Layer Architecture
pub mod data_sync; // Ingress Layer: pending transactions, market updates
pub mod execution; // Execution Layer: governors, failover, race
pub mod logic; // Logic Layer: market graph, cycle search, engine

// Common utilities and types
pub mod config;
pub mod errors;
pub mod health;
pub mod utils;

// Re-export key components from each layer
pub use config::{AppConfig, NetworkEndpoints, NetworkPlan, ValidatedConfig};
pub use data_sync::{IngressConfig, MarketFeed, PendingTx, PendingTxListener, SharedMarketGraph};
pub use errors::{ConfigError, GovernorError, GraphError, ProviderError};
pub use execution::{
    AlloyChainClient, ChainClient, ExecutionRaceCoordinator, FallbackClient, MockChainClient, NetworkGovernor,
    NetworkProfile, RaceStats, StrikeOutcome, StrikeReport, StrikeSupervisor, Submission,
};
pub use logic::{
    AssetKey, CycleSearch, FixedStartAsset, MarketGraph, MarketUpdate, SearchConfig, Signal, StartAssetResolver,
    StrikeEngine, StrikeEngineBuilder,
};
