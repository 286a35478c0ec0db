use super::config::IngressConfig;
use alloy_primitives::B256;
use eyre::{Result, eyre};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use url::Url;

/// Pending transaction announced by the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTx {
    pub hash: B256,
    pub seen_at: Instant,
}

impl PendingTx {
    pub fn new(hash: B256) -> Self {
        Self { hash, seen_at: Instant::now() }
    }
}

/// How a subscription session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Shutdown,
    Disconnected,
}

/// WebSocket listener for `newPendingTransactions`
pub struct PendingTxListener {
    wss_url: String,
    connection_timeout: Duration,
    max_reconnect_attempts: u32,
    reconnect_delay: Duration,
    channel_buffer: usize,
}

impl PendingTxListener {
    pub fn new(
        wss_url: String,
        connection_timeout: Duration,
        max_reconnect_attempts: u32,
        reconnect_delay: Duration,
    ) -> Self {
        Self { wss_url, connection_timeout, max_reconnect_attempts, reconnect_delay, channel_buffer: 1024 }
    }

    pub fn from_config(config: &IngressConfig) -> Self {
        Self::new(
            config.wss_url.clone(),
            config.ws_connection_timeout(),
            config.max_reconnect_attempts,
            config.reconnect_delay(),
        )
        .with_channel_buffer(config.pending_channel_buffer)
    }

    pub fn with_channel_buffer(mut self, channel_buffer: usize) -> Self {
        self.channel_buffer = channel_buffer.max(1);
        self
    }

    /// Start the subscription.
    /// Returns a receiver for pending transactions and a shutdown sender
    pub fn subscribe(&self) -> (mpsc::Receiver<PendingTx>, mpsc::Sender<()>) {
        let (pending_tx, pending_rx) = mpsc::channel(self.channel_buffer);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let wss_url = self.wss_url.clone();
        let connection_timeout = self.connection_timeout;
        let max_reconnect_attempts = self.max_reconnect_attempts;
        let reconnect_delay = self.reconnect_delay;

        tokio::spawn(async move {
            let mut reconnect_count = 0;

            loop {
                match Self::connect_and_subscribe(&wss_url, connection_timeout, &pending_tx, &mut shutdown_rx).await {
                    Ok(SessionEnd::Shutdown) => {
                        info!("Pending transaction subscription shut down");
                        break;
                    }
                    Ok(SessionEnd::Disconnected) => {
                        reconnect_count = 0;
                        warn!("Pending transaction stream disconnected, reconnecting in {:?}", reconnect_delay);
                        sleep(reconnect_delay).await;
                    }
                    Err(e) => {
                        error!("WebSocket connection error: {}", e);
                        reconnect_count += 1;

                        if reconnect_count >= max_reconnect_attempts {
                            error!("Max reconnection attempts reached, giving up");
                            break;
                        }

                        warn!("Attempting reconnection #{} in {:?}", reconnect_count, reconnect_delay);
                        sleep(reconnect_delay).await;
                    }
                }
                if pending_tx.is_closed() || shutdown_rx.try_recv().is_ok() {
                    break;
                }
            }
        });

        (pending_rx, shutdown_tx)
    }

    async fn connect_and_subscribe(
        wss_url: &str,
        connection_timeout: Duration,
        pending_tx: &mpsc::Sender<PendingTx>,
        shutdown_rx: &mut mpsc::Receiver<()>,
    ) -> Result<SessionEnd> {
        let url = Url::parse(wss_url)?;
        info!("Connecting to WebSocket: {}", url);

        let (ws_stream, _) = timeout(connection_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| eyre!("WebSocket connection timeout"))?
            .map_err(|e| eyre!("WebSocket connection failed: {}", e))?;

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        let subscribe_request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_subscribe",
            "params": ["newPendingTransactions"]
        });
        ws_sender.send(Message::Text(subscribe_request.to_string().into())).await?;

        let subscription_id = match timeout(connection_timeout, ws_receiver.next()).await {
            Err(_) => return Err(eyre!("Subscription confirmation timeout")),
            Ok(Some(Ok(Message::Text(text)))) => {
                let response: Value = serde_json::from_str(text.as_str())?;
                if let Some(result) = response.get("result") {
                    result.as_str().ok_or_else(|| eyre!("Invalid subscription ID format"))?.to_string()
                } else if let Some(error) = response.get("error") {
                    return Err(eyre!("Subscription error: {}", error));
                } else {
                    return Err(eyre!("Unexpected subscription response: {}", text));
                }
            }
            Ok(Some(Ok(msg))) => return Err(eyre!("Unexpected message type during subscription: {:?}", msg)),
            Ok(Some(Err(e))) => return Err(eyre!("WebSocket error during subscription: {}", e)),
            Ok(None) => return Err(eyre!("WebSocket closed during subscription")),
        };

        info!("Subscribed to newPendingTransactions with ID: {}", subscription_id);

        loop {
            tokio::select! {
                ws_msg = ws_receiver.next() => {
                    match ws_msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Err(e) = Self::handle_message(text.as_str(), pending_tx) {
                                warn!("Failed to handle WebSocket message: {}", e);
                                if pending_tx.is_closed() {
                                    return Ok(SessionEnd::Shutdown);
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            info!("WebSocket closed by server");
                            return Ok(SessionEnd::Disconnected);
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = ws_sender.send(Message::Pong(data)).await {
                                error!("Failed to send pong: {}", e);
                                return Ok(SessionEnd::Disconnected);
                            }
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!("WebSocket error: {}", e);
                            return Ok(SessionEnd::Disconnected);
                        }
                        None => {
                            info!("WebSocket stream ended");
                            return Ok(SessionEnd::Disconnected);
                        }
                    }
                }

                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal");
                    return Ok(SessionEnd::Shutdown);
                }
            }
        }
    }

    /// Forward a notification without blocking; a full channel drops the transaction.
    fn handle_message(text: &str, pending_tx: &mpsc::Sender<PendingTx>) -> Result<()> {
        let Some(hash) = parse_pending_notification(text)? else {
            return Ok(());
        };
        debug!("Pending transaction: {}", hash);

        if let Err(e) = pending_tx.try_send(PendingTx::new(hash)) {
            match e {
                mpsc::error::TrySendError::Full(dropped) => {
                    warn!("Pending transaction channel is full, dropping {}", dropped.hash);
                }
                mpsc::error::TrySendError::Closed(_) => {
                    return Err(eyre!("Pending transaction channel is closed"));
                }
            }
        }
        Ok(())
    }
}

/// Extract the transaction hash from an `eth_subscription` notification.
///
/// Nodes announce either the bare hash or the full transaction object. Anything that is not a
/// notification yields `None`.
pub fn parse_pending_notification(text: &str) -> Result<Option<B256>> {
    let message: Value = serde_json::from_str(text)?;
    let Some(result) = message.get("params").and_then(|params| params.get("result")) else {
        return Ok(None);
    };

    let hash = match result {
        Value::String(hash) => hash.as_str(),
        Value::Object(tx) => {
            tx.get("hash").and_then(Value::as_str).ok_or_else(|| eyre!("Transaction object without hash"))?
        }
        other => return Err(eyre!("Unexpected notification payload: {}", other)),
    };
    let hash = hash.parse::<B256>().map_err(|e| eyre!("Invalid transaction hash {}: {}", hash, e))?;
    Ok(Some(hash))
}
