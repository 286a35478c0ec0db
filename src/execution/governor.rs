use super::client::{ChainClient, ExecutionRequest};
use super::settlement::encode_execute_path;
use crate::errors::GovernorError;
use crate::logic::types::Signal;
use crate::utils::constants::DEFAULT_GAS_BUDGET;
use alloy_primitives::{Address, B256, U256};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Static per-chain execution policy, immutable for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProfile {
    pub name: String,
    pub chain_id: u64,
    /// Safety reserve in wei, never committed to a trade
    pub moat: U256,
    /// Priority fee in wei per gas
    pub priority_fee: u128,
    pub gas_budget: u64,
}

impl NetworkProfile {
    pub fn new(name: impl Into<String>, chain_id: u64, moat: U256, priority_fee: u128) -> Self {
        Self { name: name.into(), chain_id, moat, priority_fee, gas_budget: DEFAULT_GAS_BUDGET }
    }

    pub fn with_gas_budget(mut self, gas_budget: u64) -> Self {
        self.gas_budget = gas_budget;
        self
    }
}

/// A settlement transaction accepted by a network's RPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub network: String,
    pub tx_hash: B256,
    pub trade_size: U256,
    pub nonce: u64,
}

impl fmt::Display for Submission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} tx {} nonce {} size {}", self.network, self.tx_hash, self.nonce, self.trade_size)
    }
}

/// Worst-case cost of an attempt: `gas_budget × (gas_price + priority_fee) + moat`.
pub fn required_overhead(gas_budget: u64, gas_price: u128, priority_fee: u128, moat: U256) -> U256 {
    let fee_per_gas = U256::from(gas_price).saturating_add(U256::from(priority_fee));
    U256::from(gas_budget).saturating_mul(fee_per_gas).saturating_add(moat)
}

/// The whole spendable balance, or `None` when the balance does not cover the overhead.
pub fn trade_size(balance: U256, overhead: U256) -> Option<U256> {
    balance.checked_sub(overhead)
}

/// Funding, fee and nonce policy for one network.
pub struct NetworkGovernor {
    profile: NetworkProfile,
    client: Arc<dyn ChainClient>,
    executor: Address,
}

impl NetworkGovernor {
    pub fn new(profile: NetworkProfile, client: Arc<dyn ChainClient>, executor: Address) -> Self {
        Self { profile, client, executor }
    }

    pub fn profile(&self) -> &NetworkProfile {
        &self.profile
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    /// One execution attempt for `signal`. Returns once the transaction is broadcast.
    pub async fn attempt(&self, signal: &Signal) -> Result<Submission, GovernorError> {
        let (balance, fee_data) = tokio::try_join!(self.client.balance(), self.client.fee_data())
            .map_err(GovernorError::ProviderUnavailable)?;

        let profile = &self.profile;
        let overhead = required_overhead(profile.gas_budget, fee_data.gas_price, profile.priority_fee, profile.moat);
        let Some(trade_size) = trade_size(balance, overhead) else {
            return Err(GovernorError::InsufficientFunds { balance, overhead });
        };

        let nonce = self.client.pending_nonce().await.map_err(GovernorError::ProviderUnavailable)?;
        let request = ExecutionRequest {
            chain_id: profile.chain_id,
            to: self.executor,
            input: encode_execute_path(signal.asset_path(), trade_size),
            value: trade_size,
            nonce,
            gas_limit: profile.gas_budget,
            max_fee_per_gas: fee_data.gas_price.saturating_add(profile.priority_fee),
            max_priority_fee_per_gas: profile.priority_fee,
        };
        debug!("{} submitting {} hops, size {} nonce {}", profile.name, signal.len(), trade_size, nonce);

        let tx_hash = self.client.submit(&request).await.map_err(GovernorError::Submission)?;
        Ok(Submission { network: profile.name.clone(), tx_hash, trade_size, nonce })
    }
}
