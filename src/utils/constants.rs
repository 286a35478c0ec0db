/// Longest cycle the search will consider, in hops.
pub const MAX_HOPS: u8 = 12;

/// Gas limit of one settlement call, also the gas budget of the overhead estimate.
pub const DEFAULT_GAS_BUDGET: u64 = 1_200_000;

/// Expanded edges after which a single search gives up.
pub const DEFAULT_MAX_EXPANSIONS: usize = 2_000_000;

/// Stall timeouts of the two-tier provider fallback.
pub const PRIMARY_STALL_TIMEOUT_MS: u64 = 80;
pub const SECONDARY_STALL_TIMEOUT_MS: u64 = 120;

pub const DEFAULT_HEALTH_PORT: u16 = 8080;

/// Fixed payload of the liveness endpoint.
pub const HEALTH_STATUS: &str = "FINALITY_ACTIVE";
pub const ENGINE_NAME: &str = "MESH_STRIKE_V1";
