//! Core types for penstake.
//!
//! This crate holds the plain data exchanged with a wallet provider. The
//! orchestration (connection, client resolution, workflows) lives in
//! `penstake-client`.

mod amount;
mod asset;
mod failure;
mod identity;
mod service;
mod stake;

pub use amount::{Amount, AmountError};
pub use asset::{AssetId, AssetRecord, AssetsResponse, DenomUnit, Metadata};
pub use failure::Failure;
pub use identity::{IDENTITY_KEY_PREFIX, IdentityKey, IdentityKeyParseError};
pub use service::{
    CustodyService, GovernanceService, Service, ServiceDescriptor, StakeService, ViewService,
};
pub use stake::{
    AddressIndex, Delegation, FeeMode, FeeTier, RateData, Transaction, TransactionId,
    TransactionPlan, TransactionPlannerRequest, TransactionPlannerResponse, ValidatorInfo,
    ValidatorInfoRequest, ValidatorInfoResponse,
};

use serde::{Deserialize, Serialize};

/// Connection state shared between the broker and its observers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionState {
    /// The provider accepted the connection.
    pub connected: bool,
    /// A connect attempt is in flight.
    pub loading: bool,
    /// Message of the last connection or client failure.
    pub error: Option<String>,
}

impl ConnectionState {
    /// Disconnected, idle, no error.
    pub const fn initial() -> Self {
        Self {
            connected: false,
            loading: false,
            error: None,
        }
    }
}
