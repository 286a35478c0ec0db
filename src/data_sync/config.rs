use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the ingress layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngressConfig {
    /// WebSocket RPC URL for the pending transaction subscription
    pub wss_url: String,
    /// WebSocket connection timeout in seconds
    pub ws_connection_timeout_secs: u64,
    /// Maximum number of consecutive reconnection attempts
    pub max_reconnect_attempts: u32,
    /// Delay between reconnection attempts in seconds
    pub reconnect_delay_secs: u64,
    /// Buffer size of the pending transaction channel to the engine
    pub pending_channel_buffer: usize,
    /// Buffer size of the market update channel to the feed
    pub market_channel_buffer: usize,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            wss_url: String::new(),
            ws_connection_timeout_secs: 30,
            max_reconnect_attempts: 5,
            reconnect_delay_secs: 2,
            pending_channel_buffer: 1024,
            market_channel_buffer: 100,
        }
    }
}

impl IngressConfig {
    pub fn ws_connection_timeout(&self) -> Duration {
        Duration::from_secs(self.ws_connection_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IngressConfig::default();
        assert!(config.wss_url.is_empty());
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.pending_channel_buffer, 1024);
    }

    #[test]
    fn test_durations() {
        let config = IngressConfig::default();
        assert_eq!(config.ws_connection_timeout(), Duration::from_secs(30));
        assert_eq!(config.reconnect_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_partial_section_keeps_defaults() -> eyre::Result<()> {
        let config: IngressConfig = toml::from_str(
            r#"
            wss_url = "wss://node.example/ws"
            reconnect_delay_secs = 5
            "#,
        )?;
        assert_eq!(config.wss_url, "wss://node.example/ws");
        assert_eq!(config.reconnect_delay(), Duration::from_secs(5));
        assert_eq!(config.ws_connection_timeout_secs, 30);
        Ok(())
    }
}
