use super::client::{ChainClient, ExecutionRequest, FeeData};
use crate::errors::ProviderError;
use crate::utils::constants::{PRIMARY_STALL_TIMEOUT_MS, SECONDARY_STALL_TIMEOUT_MS};
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

/// Two-tier endpoint failover.
///
/// Every call goes to the primary endpoint first. If it errors or stalls past its timeout the
/// secondary endpoint is started under its own timeout. A stalled primary keeps running and
/// races the secondary, the first success wins. A call that loses the race is never cancelled:
/// it is left to finish in the background, so a broadcast already on the wire always completes.
/// When both endpoints fail or stall the call fails with `ProviderError::Unavailable`.
pub struct FallbackClient {
    primary: Arc<dyn ChainClient>,
    secondary: Arc<dyn ChainClient>,
    primary_stall: Duration,
    secondary_stall: Duration,
}

enum RaceEvent<T> {
    Primary(Result<T, ProviderError>),
    Secondary(Result<T, ProviderError>),
    Deadline,
}

impl FallbackClient {
    pub fn new(primary: Arc<dyn ChainClient>, secondary: Arc<dyn ChainClient>) -> Self {
        Self {
            primary,
            secondary,
            primary_stall: Duration::from_millis(PRIMARY_STALL_TIMEOUT_MS),
            secondary_stall: Duration::from_millis(SECONDARY_STALL_TIMEOUT_MS),
        }
    }

    pub fn with_stall_timeouts(mut self, primary_stall: Duration, secondary_stall: Duration) -> Self {
        self.primary_stall = primary_stall;
        self.secondary_stall = secondary_stall;
        self
    }

    async fn call<T, F, Fut>(&self, call: &'static str, op: F) -> Result<T, ProviderError>
    where
        T: Send + 'static,
        F: Fn(Arc<dyn ChainClient>) -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, ProviderError>> + Send + 'static,
    {
        let mut primary = Box::pin(op(Arc::clone(&self.primary)));
        let mut primary_error = match timeout(self.primary_stall, primary.as_mut()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => {
                debug!("Primary endpoint failed for {}: {}, trying secondary", call, e);
                Some(e)
            }
            Err(_) => {
                debug!("Primary endpoint stalled for {} after {:?}, racing secondary", call, self.primary_stall);
                None
            }
        };

        let mut secondary = Box::pin(op(Arc::clone(&self.secondary)));
        let mut secondary_error = None;
        let deadline = sleep(self.secondary_stall);
        tokio::pin!(deadline);

        while primary_error.is_none() || secondary_error.is_none() {
            let event = tokio::select! {
                result = primary.as_mut(), if primary_error.is_none() => RaceEvent::Primary(result),
                result = secondary.as_mut(), if secondary_error.is_none() => RaceEvent::Secondary(result),
                _ = &mut deadline => RaceEvent::Deadline,
            };

            match event {
                RaceEvent::Primary(Ok(value)) => {
                    if secondary_error.is_none() {
                        detach(call, "secondary", secondary);
                    }
                    return Ok(value);
                }
                RaceEvent::Secondary(Ok(value)) => {
                    if primary_error.is_none() {
                        detach(call, "primary", primary);
                    }
                    return Ok(value);
                }
                RaceEvent::Primary(Err(e)) => primary_error = Some(e),
                RaceEvent::Secondary(Err(e)) => secondary_error = Some(e),
                RaceEvent::Deadline => break,
            }
        }

        let primary_error = match primary_error {
            Some(e) => e,
            None => {
                detach(call, "primary", primary);
                ProviderError::Stalled { call, timeout: self.primary_stall }
            }
        };
        let secondary_error = match secondary_error {
            Some(e) => e,
            None => {
                detach(call, "secondary", secondary);
                ProviderError::Stalled { call, timeout: self.secondary_stall }
            }
        };

        Err(ProviderError::Unavailable { call, primary: Box::new(primary_error), secondary: Box::new(secondary_error) })
    }
}

/// Let a call that lost the race run to completion.
fn detach<T, Fut>(call: &'static str, endpoint: &'static str, pending: Pin<Box<Fut>>)
where
    T: Send + 'static,
    Fut: Future<Output = Result<T, ProviderError>> + Send + 'static,
{
    tokio::spawn(async move {
        match pending.await {
            Ok(_) => info!("Late {} answer for {} completed after the race was decided", endpoint, call),
            Err(e) => debug!("Late {} failure for {}: {}", endpoint, call, e),
        }
    });
}

#[async_trait]
impl ChainClient for FallbackClient {
    fn address(&self) -> Address {
        self.primary.address()
    }

    async fn balance(&self) -> Result<U256, ProviderError> {
        self.call("eth_getBalance", |client| async move { client.balance().await }).await
    }

    async fn fee_data(&self) -> Result<FeeData, ProviderError> {
        self.call("eth_gasPrice", |client| async move { client.fee_data().await }).await
    }

    async fn pending_nonce(&self) -> Result<u64, ProviderError> {
        self.call("eth_getTransactionCount", |client| async move { client.pending_nonce().await }).await
    }

    async fn submit(&self, request: &ExecutionRequest) -> Result<B256, ProviderError> {
        self.call("eth_sendRawTransaction", |client| {
            let request = request.clone();
            async move { client.submit(&request).await }
        })
        .await
    }
}
