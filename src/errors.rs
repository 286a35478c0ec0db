use alloy_primitives::U256;
use alloy_transport::TransportError;
use std::time::Duration;

/// Rejections at the market graph boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("invalid exchange rate {rate} for {from} -> {to}")]
    InvalidRate { from: String, to: String, rate: f64 },
    #[error("self-loop edge rejected for {asset}")]
    SelfLoop { asset: String },
}

/// Failure of a single upstream RPC call, after fallback where applicable.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("`{call}` stalled after {timeout:?}")]
    Stalled { call: &'static str, timeout: Duration },
    #[error("`{call}` failed: {reason}")]
    Rpc { call: &'static str, reason: String },
    #[error("`{call}` unavailable on every endpoint (primary: {primary}; secondary: {secondary})")]
    Unavailable { call: &'static str, primary: Box<ProviderError>, secondary: Box<ProviderError> },
}

impl ProviderError {
    pub fn rpc(call: &'static str, error: TransportError) -> Self {
        Self::Rpc { call, reason: error.to_string() }
    }

    pub fn call(&self) -> &'static str {
        match self {
            Self::Stalled { call, .. } | Self::Rpc { call, .. } | Self::Unavailable { call, .. } => call,
        }
    }
}

/// Outcome of a governor attempt that did not end in a submitted transaction.
#[derive(Debug, thiserror::Error)]
pub enum GovernorError {
    #[error("insufficient funds: balance {balance} < overhead {overhead}")]
    InsufficientFunds { balance: U256, overhead: U256 },
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(#[source] ProviderError),
    #[error("submission rejected: {0}")]
    Submission(#[source] ProviderError),
}

impl GovernorError {
    /// Expected outcomes of a race that say nothing about the health of the process.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InsufficientFunds { .. } | Self::ProviderUnavailable(_))
    }
}

/// Startup configuration problems. The process refuses to start on any of these.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(String),
    #[error("setting `{key}` references unset environment variable: {value}")]
    Unexpanded { key: String, value: String },
    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: String, reason: String },
}
