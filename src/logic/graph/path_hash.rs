use alloy_primitives::hex;
use serde::{Deserialize, Serialize};
use sha2::digest::Update;
use sha2::{Digest, Sha256};
use std::fmt::{Debug, Display};

/// Stable sha256 identifier of a cycle, used to correlate strike reports of one signal.
#[derive(Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct PathHash(pub [u8; 32]);

impl PathHash {
    /// Hash the hop identifiers in order. An empty path hashes to the empty digest.
    pub fn from_hops<'a, I: IntoIterator<Item = &'a str>>(hops: I) -> Self {
        let mut hasher = Sha256::new();
        for hop in hops {
            Update::update(&mut hasher, hop.as_bytes());
            // separator so that ["ab", "c"] and ["a", "bc"] differ
            Update::update(&mut hasher, &[0u8]);
        }
        PathHash(hasher.finalize().into())
    }

    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl Display for PathHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode_prefixed(self.0))
    }
}

impl Debug for PathHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PathHash({})", hex::encode_prefixed(self.0))
    }
}

impl From<[u8; 32]> for PathHash {
    fn from(hash: [u8; 32]) -> Self {
        PathHash(hash)
    }
}

impl Serialize for PathHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex::encode_prefixed(self.0))
    }
}

impl<'de> Deserialize<'de> for PathHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let hash: [u8; 32] = bytes.try_into().map_err(|_| serde::de::Error::custom("path hash must be 32 bytes"))?;
        Ok(PathHash(hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_path_hash() {
        let path_hash = PathHash([1; 32]);

        let serialized = serde_json::to_string(&path_hash).unwrap();
        let deserialized: PathHash = serde_json::from_str(&serialized).unwrap();

        assert_eq!(path_hash, deserialized);
    }

    #[test]
    fn test_hop_boundaries_matter() {
        let joined = PathHash::from_hops(["ab", "c"]);
        let split = PathHash::from_hops(["a", "bc"]);
        assert_ne!(joined, split);
        assert_eq!(joined, PathHash::from_hops(["ab", "c"]));
    }
}
