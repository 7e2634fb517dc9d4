//! Validator identity keys.
//!
//! Identity format: `penumbravalid1<payload>`
//!
//! The key is derived by wrapping a validator's address string; the payload is
//! kept opaque and only checked for presence.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Human-readable prefix of every validator identity.
pub const IDENTITY_KEY_PREFIX: &str = "penumbravalid1";

/// A validator identity key, used to look up staking rate data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityKey {
    payload: String,
}

impl IdentityKey {
    /// The payload following the prefix.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// The full address form, prefix included.
    pub fn address(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", IDENTITY_KEY_PREFIX, self.payload)
    }
}

impl FromStr for IdentityKey {
    type Err = IdentityKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload = s
            .trim()
            .strip_prefix(IDENTITY_KEY_PREFIX)
            .ok_or_else(|| IdentityKeyParseError::MissingPrefix(s.to_string()))?;

        if payload.is_empty() {
            return Err(IdentityKeyParseError::EmptyPayload);
        }

        Ok(Self {
            payload: payload.to_string(),
        })
    }
}

impl TryFrom<String> for IdentityKey {
    type Error = IdentityKeyParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<IdentityKey> for String {
    fn from(ik: IdentityKey) -> Self {
        ik.to_string()
    }
}

/// Error parsing a validator address into an identity key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityKeyParseError {
    #[error("validator address must start with 'penumbravalid1', got: {0}")]
    MissingPrefix(String),
    #[error("validator address has no key material after the prefix")]
    EmptyPayload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_address() {
        let ik: IdentityKey = "penumbravalid1abc123".parse().unwrap();
        assert_eq!(ik.payload(), "abc123");
        assert_eq!(ik.address(), "penumbravalid1abc123");
    }

    #[test]
    fn rejects_foreign_prefix() {
        let err = "penumbra1abc".parse::<IdentityKey>().unwrap_err();
        assert!(matches!(err, IdentityKeyParseError::MissingPrefix(_)));
    }

    #[test]
    fn rejects_empty_payload() {
        let err = "penumbravalid1".parse::<IdentityKey>().unwrap_err();
        assert_eq!(err, IdentityKeyParseError::EmptyPayload);
    }

    #[test]
    fn payload_is_not_inspected() {
        let ik: IdentityKey = "penumbravalid1Ab+/9_-=".parse().unwrap();
        assert_eq!(ik.payload(), "Ab+/9_-=");
        assert_eq!(ik.to_string(), "penumbravalid1Ab+/9_-=");
    }

    #[test]
    fn serde_uses_address_form() {
        let ik: IdentityKey = "penumbravalid1xyz".parse().unwrap();
        let json = serde_json::to_string(&ik).unwrap();
        assert_eq!(json, "\"penumbravalid1xyz\"");
        let back: IdentityKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ik);
    }
}
