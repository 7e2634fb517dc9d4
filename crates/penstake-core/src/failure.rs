//! Failures reported by the external provider.

use std::fmt;

/// The outcome of a failed external call, classified once where the call is made.
///
/// Callers never re-inspect the raw value: a failure either carries a
/// human-readable message or it does not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The provider supplied a message.
    Message(String),
    /// The provider failed without anything printable.
    Opaque,
}

impl Failure {
    pub fn message(msg: impl Into<String>) -> Self {
        Self::Message(msg.into())
    }

    /// The carried message, if any. An empty message is still a message.
    pub fn as_message(&self) -> Option<&str> {
        match self {
            Self::Message(m) => Some(m),
            Self::Opaque => None,
        }
    }

    /// The carried message, or `fallback` for opaque failures.
    pub fn message_or(&self, fallback: impl Into<String>) -> String {
        self.as_message()
            .map(str::to_string)
            .unwrap_or_else(|| fallback.into())
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_message() {
            Some(m) => f.write_str(m),
            None => f.write_str("unknown failure"),
        }
    }
}

impl std::error::Error for Failure {}

impl From<String> for Failure {
    fn from(msg: String) -> Self {
        Self::Message(msg)
    }
}

impl From<&str> for Failure {
    fn from(msg: &str) -> Self {
        Self::Message(msg.to_string())
    }
}
