use crate::data_sync::IngressConfig;
use crate::errors::ConfigError;
use crate::execution::NetworkProfile;
use crate::logic::graph::AssetKey;
use crate::logic::types::{MarketUpdate, SearchConfig};
use crate::utils::config_loader::{LoadConfigError, has_unexpanded_var, load_from_file, load_from_file_sync};
use crate::utils::constants::{
    DEFAULT_GAS_BUDGET, DEFAULT_HEALTH_PORT, DEFAULT_MAX_EXPANSIONS, ENGINE_NAME, MAX_HOPS, PRIMARY_STALL_TIMEOUT_MS,
    SECONDARY_STALL_TIMEOUT_MS,
};
use alloy_primitives::utils::{parse_ether, parse_units};
use alloy_primitives::{Address, U256};
use alloy_signer_local::PrivateKeySigner;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Root of the TOML configuration file.
#[derive(Clone, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub ingress: IngressConfig,
    #[serde(default)]
    pub health: HealthSection,
    #[serde(default)]
    pub execution: ExecutionSection,
    #[serde(default = "default_networks")]
    pub networks: Vec<NetworkSection>,
    #[serde(default)]
    pub market: MarketSection,
}

#[derive(Clone, Deserialize, Debug)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSection {
    pub name: String,
    pub start_venue: String,
    pub start_asset: String,
    pub max_hops: u8,
    /// Minimum implied profit ratio of a cycle before overhead
    pub min_profit_ratio: f64,
    /// Execution overhead in basis points added on top of `min_profit_ratio`
    pub overhead_bps: u32,
    pub max_expansions: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            name: ENGINE_NAME.to_string(),
            start_venue: String::new(),
            start_asset: String::new(),
            max_hops: MAX_HOPS,
            min_profit_ratio: 1.0,
            overhead_bps: 0,
            max_expansions: DEFAULT_MAX_EXPANSIONS,
        }
    }
}

impl EngineSection {
    /// `min_profit_ratio × (1 + overhead_bps / 10 000)`
    pub fn threshold(&self) -> f64 {
        self.min_profit_ratio * (1.0 + self.overhead_bps as f64 / 10_000.0)
    }
}

#[derive(Clone, Deserialize, Debug)]
#[serde(default, deny_unknown_fields)]
pub struct HealthSection {
    pub port: u16,
}

impl Default for HealthSection {
    fn default() -> Self {
        Self { port: port_or_default(std::env::var("PORT").ok().as_deref()) }
    }
}

/// `PORT` as set by the hosting platform, falling back to the default liveness port.
fn port_or_default(value: Option<&str>) -> u16 {
    value.and_then(|port| port.trim().parse().ok()).unwrap_or(DEFAULT_HEALTH_PORT)
}

#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutionSection {
    pub executor_address: String,
    pub private_key: String,
    /// Secondary endpoint shared by every network
    pub fallback_rpc: String,
    pub gas_budget: u64,
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            executor_address: env_or_placeholder("EXECUTOR_ADDRESS"),
            private_key: env_or_placeholder("PRIVATE_KEY"),
            fallback_rpc: env_or_placeholder("FALLBACK_RPC"),
            gas_budget: DEFAULT_GAS_BUDGET,
        }
    }
}

impl fmt::Debug for ExecutionSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionSection")
            .field("executor_address", &self.executor_address)
            .field("private_key", &"<redacted>")
            .field("fallback_rpc", &self.fallback_rpc)
            .field("gas_budget", &self.gas_budget)
            .finish()
    }
}

#[derive(Clone, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct NetworkSection {
    pub name: String,
    pub chain_id: u64,
    pub rpc: String,
    /// Safety reserve in ether, e.g. "0.01"
    pub moat_eth: String,
    /// Priority fee in gwei, e.g. "1.2"
    pub priority_gwei: String,
    #[serde(default = "default_primary_stall_ms")]
    pub primary_stall_ms: u64,
    #[serde(default = "default_secondary_stall_ms")]
    pub secondary_stall_ms: u64,
}

impl NetworkSection {
    fn with_env_rpc(name: &str, chain_id: u64, rpc_var: &str, moat_eth: &str, priority_gwei: &str) -> Self {
        Self {
            name: name.to_string(),
            chain_id,
            rpc: env_or_placeholder(rpc_var),
            moat_eth: moat_eth.to_string(),
            priority_gwei: priority_gwei.to_string(),
            primary_stall_ms: PRIMARY_STALL_TIMEOUT_MS,
            secondary_stall_ms: SECONDARY_STALL_TIMEOUT_MS,
        }
    }
}

#[derive(Clone, Deserialize, Debug, Default)]
#[serde(default, deny_unknown_fields)]
pub struct MarketSection {
    pub quotes: Vec<QuoteSection>,
}

/// Seed quote applied to the market graph at startup
#[derive(Clone, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct QuoteSection {
    pub venue: String,
    pub base: String,
    pub quote: String,
    pub rate: f64,
}

fn default_networks() -> Vec<NetworkSection> {
    vec![
        NetworkSection::with_env_rpc("ETHEREUM", 1, "ETH_RPC", "0.01", "450"),
        NetworkSection::with_env_rpc("BASE", 8453, "BASE_RPC", "0.005", "2"),
        NetworkSection::with_env_rpc("ARBITRUM", 42161, "ARB_RPC", "0.003", "1.2"),
    ]
}

fn default_primary_stall_ms() -> u64 {
    PRIMARY_STALL_TIMEOUT_MS
}

fn default_secondary_stall_ms() -> u64 {
    SECONDARY_STALL_TIMEOUT_MS
}

/// The environment value, or the `${VAR}` placeholder so validation can name what is unset.
fn env_or_placeholder(var: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| format!("${{{}}}", var))
}

/// Endpoints of one network and how long each may stall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkEndpoints {
    pub primary_rpc: Url,
    pub secondary_rpc: Url,
    pub primary_stall: Duration,
    pub secondary_stall: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPlan {
    pub profile: NetworkProfile,
    pub endpoints: NetworkEndpoints,
}

/// Everything the binary needs, checked once at startup.
pub struct ValidatedConfig {
    pub engine_name: String,
    pub start_asset: AssetKey,
    pub search: SearchConfig,
    pub ingress: IngressConfig,
    pub health_port: u16,
    pub executor: Address,
    pub signer: PrivateKeySigner,
    pub networks: Vec<NetworkPlan>,
    pub seed_quotes: Vec<MarketUpdate>,
}

impl AppConfig {
    pub fn load_sync(file_name: impl AsRef<Path>) -> Result<Self, LoadConfigError> {
        load_from_file_sync(file_name)
    }

    pub async fn load(file_name: impl AsRef<Path>) -> Result<Self, LoadConfigError> {
        load_from_file(file_name).await
    }

    /// All fatal startup checks. Any error means the process must not start.
    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        let engine = &self.engine;
        let start_venue = required("engine.start_venue", &engine.start_venue)?;
        let start_asset = required("engine.start_asset", &engine.start_asset)?;

        if engine.max_hops < 2 || engine.max_hops > MAX_HOPS {
            return Err(invalid("engine.max_hops", format!("must be between 2 and {}", MAX_HOPS)));
        }
        if !engine.min_profit_ratio.is_finite() || engine.min_profit_ratio <= 0.0 {
            return Err(invalid("engine.min_profit_ratio", "must be a positive number"));
        }
        if engine.max_expansions == 0 {
            return Err(invalid("engine.max_expansions", "must be positive"));
        }
        let search = SearchConfig::new(engine.max_hops, engine.threshold()).with_max_expansions(engine.max_expansions);

        let wss_url = parse_url("ingress.wss_url", &self.ingress.wss_url, &["ws", "wss"])?;
        let ingress = IngressConfig { wss_url: wss_url.to_string(), ..self.ingress.clone() };

        let execution = &self.execution;
        let executor = required("execution.executor_address", &execution.executor_address)?
            .parse::<Address>()
            .map_err(|e| invalid("execution.executor_address", e))?;
        let signer = required("execution.private_key", &execution.private_key)?
            .parse::<PrivateKeySigner>()
            .map_err(|_| invalid("execution.private_key", "not a valid secp256k1 private key"))?;
        let secondary_rpc = parse_url("execution.fallback_rpc", &execution.fallback_rpc, &["http", "https"])?;
        if execution.gas_budget == 0 {
            return Err(invalid("execution.gas_budget", "must be positive"));
        }

        if self.networks.is_empty() {
            return Err(ConfigError::Missing("networks".to_string()));
        }
        let mut names = HashSet::new();
        let mut networks = Vec::with_capacity(self.networks.len());
        for network in &self.networks {
            let name = required("networks.name", &network.name)?;
            if !names.insert(name.to_string()) {
                return Err(invalid("networks.name", format!("duplicate network {}", name)));
            }
            networks.push(network.plan(name, execution.gas_budget, &secondary_rpc)?);
        }

        let seed_quotes = self
            .market
            .quotes
            .iter()
            .map(|quote| {
                if !quote.rate.is_finite() || quote.rate <= 0.0 {
                    return Err(invalid(
                        "market.quotes.rate",
                        format!("{} {}->{} has rate {}", quote.venue, quote.base, quote.quote, quote.rate),
                    ));
                }
                Ok(MarketUpdate::new(quote.venue.as_str(), quote.base.as_str(), quote.quote.as_str(), quote.rate))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ValidatedConfig {
            engine_name: engine.name.clone(),
            start_asset: AssetKey::new(start_venue, start_asset),
            search,
            ingress,
            health_port: self.health.port,
            executor,
            signer,
            networks,
            seed_quotes,
        })
    }
}

impl NetworkSection {
    fn plan(&self, name: &str, gas_budget: u64, secondary_rpc: &Url) -> Result<NetworkPlan, ConfigError> {
        let key = |field: &str| format!("networks.{}.{}", name, field);

        if self.chain_id == 0 {
            return Err(invalid(&key("chain_id"), "must be positive"));
        }
        let primary_rpc = parse_url(&key("rpc"), &self.rpc, &["http", "https"])?;
        let moat: U256 =
            parse_ether(required(&key("moat_eth"), &self.moat_eth)?).map_err(|e| invalid(&key("moat_eth"), e))?;
        let priority_fee: U256 = parse_units(required(&key("priority_gwei"), &self.priority_gwei)?, "gwei")
            .map_err(|e| invalid(&key("priority_gwei"), e))?
            .get_absolute();
        let priority_fee = u128::try_from(priority_fee).map_err(|e| invalid(&key("priority_gwei"), e))?;

        Ok(NetworkPlan {
            profile: NetworkProfile::new(name, self.chain_id, moat, priority_fee).with_gas_budget(gas_budget),
            endpoints: NetworkEndpoints {
                primary_rpc,
                secondary_rpc: secondary_rpc.clone(),
                primary_stall: Duration::from_millis(self.primary_stall_ms),
                secondary_stall: Duration::from_millis(self.secondary_stall_ms),
            },
        })
    }
}

fn required<'a>(key: &str, value: &'a str) -> Result<&'a str, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Missing(key.to_string()));
    }
    if has_unexpanded_var(value) {
        return Err(ConfigError::Unexpanded { key: key.to_string(), value: value.to_string() });
    }
    Ok(value)
}

fn parse_url(key: &str, value: &str, schemes: &[&str]) -> Result<Url, ConfigError> {
    let url = Url::parse(required(key, value)?).map_err(|e| invalid(key, e))?;
    if !schemes.contains(&url.scheme()) {
        return Err(invalid(key, format!("unsupported scheme {}, expected one of {:?}", url.scheme(), schemes)));
    }
    Ok(url)
}

fn invalid(key: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid { key: key.to_string(), reason: reason.to_string() }
}
