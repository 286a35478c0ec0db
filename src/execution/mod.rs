/// Execution Layer
///
/// This layer is responsible for:
/// - Per-network funding, fee and nonce policy (governors)
/// - Two-tier RPC failover
/// - Settlement calldata encoding
/// - Racing one signal across every configured network

pub mod alloy_client;
pub mod client;
pub mod fallback;
pub mod governor;
pub mod mock_client;
pub mod race;
pub mod settlement;

#[cfg(test)]
mod tests;

pub use alloy_client::AlloyChainClient;
pub use client::{ChainClient, ExecutionRequest, FeeData};
pub use fallback::FallbackClient;
pub use governor::{NetworkGovernor, NetworkProfile, Submission, required_overhead, trade_size};
pub use mock_client::MockChainClient;
pub use race::{ExecutionRaceCoordinator, RaceStats, StrikeCategory, StrikeOutcome, StrikeReport, StrikeSupervisor};
pub use settlement::{IComplexPathExecutor, encode_execute_path};
