//! Planner and staking query shapes.
//!
//! Only the fields this layer reads or writes are modeled; plans and built
//! transactions stay opaque.

use crate::{Amount, IdentityKey};
use serde::{Deserialize, Serialize};

/// Fee tier for automatic fee selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeTier {
    #[default]
    Low,
    Medium,
    High,
}

/// How the planner should pick the fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "case", rename_all = "snake_case")]
pub enum FeeMode {
    /// Let the wallet pick a fee at the given tier.
    AutoFee { fee_tier: FeeTier },
    /// Pay exactly this amount.
    ManualFee { amount: Amount },
}

/// Index of a wallet sub-account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressIndex {
    pub account: u32,
}

impl AddressIndex {
    pub fn new(account: u32) -> Self {
        Self { account }
    }
}

/// Exchange and reward rates of a validator for one epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateData {
    pub identity_key: IdentityKey,
    pub epoch_index: u64,
    pub validator_reward_rate: Amount,
    pub validator_exchange_rate: Amount,
}

/// Staking view of a validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorInfo {
    pub name: String,
    pub rate_data: Option<RateData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorInfoRequest {
    pub identity_key: IdentityKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorInfoResponse {
    pub validator_info: Option<ValidatorInfo>,
}

/// A single delegation inside a planner request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub amount: Amount,
    pub rate_data: RateData,
}

/// Request for the view service's transaction planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPlannerRequest {
    pub fee_mode: FeeMode,
    pub source: AddressIndex,
    #[serde(default)]
    pub delegations: Vec<Delegation>,
}

impl TransactionPlannerRequest {
    /// A request delegating `amount` from `account` at the given rate data.
    pub fn delegate(fee_tier: FeeTier, account: u32, amount: Amount, rate_data: RateData) -> Self {
        Self {
            fee_mode: FeeMode::AutoFee { fee_tier },
            source: AddressIndex::new(account),
            delegations: vec![Delegation { amount, rate_data }],
        }
    }
}

/// Opaque transaction plan produced by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionPlan(pub serde_json::Value);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionPlannerResponse {
    pub plan: Option<TransactionPlan>,
}

/// An authorized, built transaction ready for broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transaction(pub serde_json::Value);

/// Hash identifying a broadcast transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
