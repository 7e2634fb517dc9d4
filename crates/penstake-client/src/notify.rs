//! User-facing progress notifications.
//!
//! Every call carries a [`ProgressId`]; a renderer must replace the message
//! shown under that id instead of stacking a new one.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Token tying successive notifier calls to one visible message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgressId(u64);

impl ProgressId {
    /// A process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProgressId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "progress-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Loading,
    Success,
    Error,
}

pub trait Notifier: Send + Sync {
    fn loading(&self, message: &str, id: ProgressId);
    fn success(&self, message: &str, id: ProgressId);
    fn error(&self, message: &str, id: ProgressId);
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn loading(&self, message: &str, id: ProgressId) {
        (**self).loading(message, id)
    }

    fn success(&self, message: &str, id: ProgressId) {
        (**self).success(message, id)
    }

    fn error(&self, message: &str, id: ProgressId) {
        (**self).error(message, id)
    }
}

/// Renders notifications as log events. Useful for headless runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn loading(&self, message: &str, id: ProgressId) {
        tracing::info!(%id, "{}", message);
    }

    fn success(&self, message: &str, id: ProgressId) {
        tracing::info!(%id, "{}", message);
    }

    fn error(&self, message: &str, id: ProgressId) {
        tracing::error!(%id, "{}", message);
    }
}
