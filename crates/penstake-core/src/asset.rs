//! Asset metadata records, as streamed by the view service.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed-size asset identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub [u8; 32]);

impl AssetId {
    pub const LEN: usize = 32;

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({self})")
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0[..8] {
            write!(f, "{b:02x}")?;
        }
        f.write_str("..")
    }
}

/// One denomination unit of an asset, e.g. `penumbra` at exponent 6.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenomUnit {
    pub denom: String,
    pub exponent: u32,
}

/// Denomination metadata for an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub penumbra_asset_id: AssetId,
    pub base: String,
    pub display: String,
    pub symbol: String,
    #[serde(default)]
    pub denom_units: Vec<DenomUnit>,
}

impl Metadata {
    /// Exponent of the display unit, if listed.
    pub fn display_exponent(&self) -> Option<u32> {
        self.denom_units
            .iter()
            .find(|u| u.denom == self.display)
            .map(|u| u.exponent)
    }
}

/// One element of the asset stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetsResponse {
    pub denom_metadata: Option<Metadata>,
}

/// An asset keyed by its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub id: AssetId,
    pub metadata: Metadata,
}

impl AssetsResponse {
    /// Lift the response into a keyed record. Responses without metadata yield `None`.
    pub fn into_record(self) -> Option<AssetRecord> {
        self.denom_metadata.map(|metadata| AssetRecord {
            id: metadata.penumbra_asset_id,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_exponent_follows_display_denom() {
        let metadata = Metadata {
            penumbra_asset_id: AssetId([1; 32]),
            base: "upenumbra".into(),
            display: "penumbra".into(),
            symbol: "UM".into(),
            denom_units: vec![
                DenomUnit { denom: "upenumbra".into(), exponent: 0 },
                DenomUnit { denom: "penumbra".into(), exponent: 6 },
            ],
        };
        assert_eq!(metadata.display_exponent(), Some(6));
    }

    #[test]
    fn response_without_metadata_has_no_record() {
        assert!(AssetsResponse { denom_metadata: None }.into_record().is_none());
    }
}
