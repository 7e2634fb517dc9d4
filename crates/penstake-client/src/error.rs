//! Errors surfaced by the orchestration layer.

use penstake_core::{Failure, IdentityKey, ServiceDescriptor};

pub type Result<T> = std::result::Result<T, Error>;

/// Fallback shown when a connect attempt fails without a message.
pub const CONNECTION_FAILED: &str = "Connection failed";

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The provider refused or failed the connection handshake.
    #[error("{}", .0.message_or(CONNECTION_FAILED))]
    Connection(Failure),

    /// The provider could not produce a client for a service.
    #[error("{}", acquisition_message(.descriptor, .source))]
    ClientAcquisition {
        descriptor: ServiceDescriptor,
        source: Failure,
    },

    /// An RPC on a resolved client failed.
    #[error("{rpc} failed: {source}")]
    Query { rpc: &'static str, source: Failure },

    /// The staking service knows the validator but returned no rate data.
    #[error("No rate data for validator {0}")]
    MissingRateData(IdentityKey),

    /// The planner returned no plan.
    #[error("Failed to create transaction plan")]
    Planning,

    /// Authorization or broadcast failed.
    #[error("{}", .0)]
    Submission(Failure),

    /// A submission on the same workflow has not finished yet.
    #[error("A delegation is already being submitted")]
    ConcurrentSubmission,

    /// The submit future was dropped before it finished.
    #[error("Submission was cancelled")]
    Cancelled,
}

impl Error {
    /// The human-readable message, or `None` when the root cause carried none.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Connection(f) | Self::Submission(f) => f.as_message().map(str::to_string),
            Self::ClientAcquisition { source, .. } | Self::Query { source, .. } => {
                source.as_message().map(str::to_string)
            }
            Self::MissingRateData(_)
            | Self::Planning
            | Self::ConcurrentSubmission
            | Self::Cancelled => Some(self.to_string()),
        }
    }

    /// The provider failure behind this error, if one exists.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Connection(f) | Self::Submission(f) => Some(f),
            Self::ClientAcquisition { source, .. } | Self::Query { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Message recorded when a client cannot be created.
pub(crate) fn acquisition_message(descriptor: &ServiceDescriptor, source: &Failure) -> String {
    source.message_or(format!("Failed to create {descriptor} client"))
}
