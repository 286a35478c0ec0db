use crate::data_sync::PendingTx;
use crate::logic::graph::AssetKey;

/// Picks the asset a cycle search starts from for a pending transaction.
pub trait StartAssetResolver: Send + Sync {
    /// `None` skips the transaction
    fn resolve(&self, tx: &PendingTx) -> Option<AssetKey>;
}

/// Starts every search from the same configured asset.
#[derive(Debug, Clone)]
pub struct FixedStartAsset {
    asset: AssetKey,
}

impl FixedStartAsset {
    pub fn new(asset: AssetKey) -> Self {
        Self { asset }
    }
}

impl StartAssetResolver for FixedStartAsset {
    fn resolve(&self, _tx: &PendingTx) -> Option<AssetKey> {
        Some(self.asset.clone())
    }
}
