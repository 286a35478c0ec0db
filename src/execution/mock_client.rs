use super::client::{ChainClient, ExecutionRequest, FeeData};
use crate::errors::ProviderError;
use alloy_primitives::{Address, B256, U256, keccak256};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Scriptable in-memory `ChainClient` for exercising governors and the race without a node.
#[derive(Debug)]
pub struct MockChainClient {
    address: Address,
    balance: U256,
    gas_price: u128,
    delay: Duration,
    fail_fetch: bool,
    fail_submit: bool,
    panic_on_submit: bool,
    nonce: AtomicU64,
    first_call_at: Mutex<Option<Instant>>,
    submitted: Mutex<Vec<ExecutionRequest>>,
}

impl MockChainClient {
    pub fn new(balance: U256, gas_price: u128) -> Self {
        Self {
            address: Address::repeat_byte(0x11),
            balance,
            gas_price,
            delay: Duration::ZERO,
            fail_fetch: false,
            fail_submit: false,
            panic_on_submit: false,
            nonce: AtomicU64::new(0),
            first_call_at: Mutex::new(None),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Every call sleeps this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_nonce(self, nonce: u64) -> Self {
        self.nonce.store(nonce, Ordering::SeqCst);
        self
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn failing_submit(mut self) -> Self {
        self.fail_submit = true;
        self
    }

    pub fn panicking_submit(mut self) -> Self {
        self.panic_on_submit = true;
        self
    }

    pub fn submitted(&self) -> Vec<ExecutionRequest> {
        self.submitted.lock().map(|requests| requests.clone()).unwrap_or_default()
    }

    /// When the first RPC call of any kind reached this client
    pub fn first_call_at(&self) -> Option<Instant> {
        self.first_call_at.lock().ok().and_then(|at| *at)
    }

    async fn enter(&self, call: &'static str) -> Result<(), ProviderError> {
        if let Ok(mut at) = self.first_call_at.lock() {
            at.get_or_insert_with(Instant::now);
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_fetch && call != "eth_sendRawTransaction" {
            return Err(ProviderError::Rpc { call, reason: "mock endpoint down".to_string() });
        }
        Ok(())
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    fn address(&self) -> Address {
        self.address
    }

    async fn balance(&self) -> Result<U256, ProviderError> {
        self.enter("eth_getBalance").await?;
        Ok(self.balance)
    }

    async fn fee_data(&self) -> Result<FeeData, ProviderError> {
        self.enter("eth_gasPrice").await?;
        Ok(FeeData { gas_price: self.gas_price })
    }

    async fn pending_nonce(&self) -> Result<u64, ProviderError> {
        self.enter("eth_getTransactionCount").await?;
        Ok(self.nonce.load(Ordering::SeqCst))
    }

    async fn submit(&self, request: &ExecutionRequest) -> Result<B256, ProviderError> {
        self.enter("eth_sendRawTransaction").await?;
        if self.panic_on_submit {
            panic!("mock client panicked on submit");
        }
        if self.fail_submit {
            return Err(ProviderError::Rpc { call: "eth_sendRawTransaction", reason: "nonce too low".to_string() });
        }

        self.nonce.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut submitted) = self.submitted.lock() {
            submitted.push(request.clone());
        }
        Ok(keccak256(&request.input))
    }
}
