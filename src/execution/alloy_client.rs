use super::client::{ChainClient, ExecutionRequest, FeeData};
use crate::errors::ProviderError;
use alloy_network::{EthereumWallet, TransactionBuilder};
use alloy_primitives::{Address, B256, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types_eth::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use eyre::{Result, eyre};
use url::Url;

/// `ChainClient` over a single HTTP JSON-RPC endpoint, signing locally.
pub struct AlloyChainClient {
    provider: DynProvider,
    address: Address,
    endpoint: Url,
}

impl AlloyChainClient {
    pub fn connect(rpc_url: &str, signer: PrivateKeySigner) -> Result<Self> {
        let endpoint = Url::parse(rpc_url).map_err(|e| eyre!("Invalid RPC url {}: {}", rpc_url, e))?;
        let address = signer.address();
        let provider =
            ProviderBuilder::new().wallet(EthereumWallet::from(signer)).connect_http(endpoint.clone()).erased();

        Ok(Self { provider, address, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    fn address(&self) -> Address {
        self.address
    }

    async fn balance(&self) -> Result<U256, ProviderError> {
        self.provider.get_balance(self.address).await.map_err(|e| ProviderError::rpc("eth_getBalance", e))
    }

    async fn fee_data(&self) -> Result<FeeData, ProviderError> {
        let gas_price = self.provider.get_gas_price().await.map_err(|e| ProviderError::rpc("eth_gasPrice", e))?;
        Ok(FeeData { gas_price })
    }

    async fn pending_nonce(&self) -> Result<u64, ProviderError> {
        self.provider
            .get_transaction_count(self.address)
            .pending()
            .await
            .map_err(|e| ProviderError::rpc("eth_getTransactionCount", e))
    }

    async fn submit(&self, request: &ExecutionRequest) -> Result<B256, ProviderError> {
        let tx = TransactionRequest::default()
            .with_from(self.address)
            .with_to(request.to)
            .with_input(request.input.clone())
            .with_value(request.value)
            .with_nonce(request.nonce)
            .with_chain_id(request.chain_id)
            .with_gas_limit(request.gas_limit)
            .with_max_fee_per_gas(request.max_fee_per_gas)
            .with_max_priority_fee_per_gas(request.max_priority_fee_per_gas);

        let pending =
            self.provider.send_transaction(tx).await.map_err(|e| ProviderError::rpc("eth_sendRawTransaction", e))?;
        Ok(*pending.tx_hash())
    }
}
