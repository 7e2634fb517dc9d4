//! Fixed-width 128-bit amounts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An unsigned 128-bit amount split into two 64-bit halves, as the planner expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
    pub lo: u64,
    pub hi: u64,
}

impl Amount {
    pub const ZERO: Self = Self { lo: 0, hi: 0 };

    /// Split a `u128` into its halves.
    pub const fn new(value: u128) -> Self {
        Self {
            lo: value as u64,
            hi: (value >> 64) as u64,
        }
    }

    /// Recombine the halves.
    pub const fn value(&self) -> u128 {
        ((self.hi as u128) << 64) | self.lo as u128
    }

    pub const fn is_zero(&self) -> bool {
        self.lo == 0 && self.hi == 0
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self::new(value)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self { lo: value, hi: 0 }
    }
}

impl From<Amount> for u128 {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    /// Parse a base-10 integer. Values above `u128::MAX` are rejected, never truncated.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().replace('_', "");
        if digits.is_empty() {
            return Err(AmountError::Empty);
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::NotANumber(s.to_string()));
        }

        let mut value: u128 = 0;
        for b in digits.bytes() {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u128::from(b - b'0')))
                .ok_or_else(|| AmountError::Overflow(s.to_string()))?;
        }
        Ok(Self::new(value))
    }
}

/// Error parsing an amount.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("amount is not a base-10 integer: {0}")]
    NotANumber(String),
    #[error("amount does not fit in 128 bits: {0}")]
    Overflow(String),
}
