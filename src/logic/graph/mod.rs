pub mod asset;
pub mod market_graph;
pub mod path_hash;

pub use asset::{AssetKey, AssetWrapper};
pub use market_graph::{AssetNode, EdgeUpdate, ExchangeEdge, FastHashMap, MarketGraph};
pub use path_hash::PathHash;
