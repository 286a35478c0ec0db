use crate::errors::ProviderError;
use alloy_primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;

/// Fee data of a network at the time of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeeData {
    /// Current gas price in wei, treated as the base fee of the overhead estimate
    pub gas_price: u128,
}

/// Fully specified settlement transaction, signed and sent by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub chain_id: u64,
    pub to: Address,
    pub input: Bytes,
    pub value: U256,
    pub nonce: u64,
    pub gas_limit: u64,
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

/// The RPC surface a governor needs from one network, bound to one funding account.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Address of the funding account
    fn address(&self) -> Address;

    /// Current balance of the funding account
    async fn balance(&self) -> Result<U256, ProviderError>;

    async fn fee_data(&self) -> Result<FeeData, ProviderError>;

    /// Next nonce of the funding account including pending transactions
    async fn pending_nonce(&self) -> Result<u64, ProviderError>;

    /// Sign and broadcast, returning the transaction hash without waiting for inclusion
    async fn submit(&self, request: &ExecutionRequest) -> Result<B256, ProviderError>;
}
