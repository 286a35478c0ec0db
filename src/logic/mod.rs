/// Logic Layer - Strike Engine
///
/// This layer is responsible for:
/// - The market graph of assets and exchange rates
/// - Log-weight cycle search for profitable paths
/// - Turning pending transactions into signals for the execution race

pub mod cycle_search;
pub mod engine;
pub mod graph;
pub mod start_asset;
pub mod types;

// Re-export key components from the logic layer
pub use cycle_search::CycleSearch;
pub use engine::{EngineStatsSnapshot, StrikeEngine, StrikeEngineBuilder};
pub use graph::{AssetKey, AssetNode, AssetWrapper, EdgeUpdate, ExchangeEdge, MarketGraph, PathHash};
pub use start_asset::{FixedStartAsset, StartAssetResolver};
pub use types::{Hop, MarketUpdate, SearchConfig, SearchStats, Signal};
