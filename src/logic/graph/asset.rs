use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

/// A tradable asset on a specific venue, e.g. `uniswap:WETH`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetKey {
    venue: String,
    asset: String,
}

pub type AssetWrapper = Arc<AssetKey>;

impl AssetKey {
    pub fn new(venue: impl Into<String>, asset: impl Into<String>) -> AssetKey {
        AssetKey { venue: venue.into(), asset: asset.into() }
    }

    pub fn get_venue(&self) -> &str {
        &self.venue
    }

    pub fn get_asset(&self) -> &str {
        &self.asset
    }

    /// Identifier of this asset as a hop in the settlement contract path.
    pub fn hop_id(&self) -> String {
        self.to_string()
    }
}

impl Display for AssetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.venue, self.asset)
    }
}

impl FromStr for AssetKey {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((venue, asset)) if !venue.is_empty() && !asset.is_empty() => Ok(AssetKey::new(venue, asset)),
            _ => Err(eyre::eyre!("asset must be written as venue:asset, got {:?}", s)),
        }
    }
}
