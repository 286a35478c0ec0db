/// Ingress Layer
///
/// This layer feeds the engine from the outside world:
///
/// - WebSocket subscription to pending transactions (newPendingTransactions)
/// - Market update batches applied to the shared market graph by a single writer

pub mod config;
pub mod market_feed;
pub mod websocket;

pub use config::IngressConfig;
pub use market_feed::{FeedStats, MarketFeed, SharedMarketGraph};
pub use websocket::{PendingTx, PendingTxListener, parse_pending_notification};
