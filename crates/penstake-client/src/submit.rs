//! Authorization and broadcast of a transaction plan.

use crate::error::{Error, Result};
use crate::notify::{Notifier, ProgressId};
use crate::provider::ViewClient;
use penstake_core::{TransactionId, TransactionPlan};
use std::future::Future;

/// Turns a plan into a broadcast transaction.
///
/// Implementations may update the notification under `progress`; the caller
/// owns the final success or error message.
pub trait SubmissionPipeline<V>: Send + Sync {
    fn submit(
        &self,
        view: &V,
        plan: TransactionPlan,
        progress: ProgressId,
    ) -> impl Future<Output = Result<TransactionId>> + Send;
}

/// Authorize and build through the view service, then broadcast.
#[derive(Debug, Clone)]
pub struct AuthorizeAndBroadcast<N> {
    notifier: N,
    await_detection: bool,
}

impl<N: Notifier> AuthorizeAndBroadcast<N> {
    pub fn new(notifier: N) -> Self {
        Self {
            notifier,
            await_detection: true,
        }
    }

    /// Return as soon as the transaction is sent instead of waiting for the wallet to see it.
    pub fn fire_and_forget(mut self) -> Self {
        self.await_detection = false;
        self
    }
}

impl<V, N> SubmissionPipeline<V> for AuthorizeAndBroadcast<N>
where
    V: ViewClient,
    N: Notifier,
{
    async fn submit(
        &self,
        view: &V,
        plan: TransactionPlan,
        progress: ProgressId,
    ) -> Result<TransactionId> {
        self.notifier.loading("Building transaction...", progress);
        let transaction = view
            .authorize_and_build(plan)
            .await
            .map_err(Error::Submission)?;

        self.notifier.loading("Broadcasting transaction...", progress);
        let id = view
            .broadcast_transaction(transaction, self.await_detection)
            .await
            .map_err(Error::Submission)?;

        tracing::info!("Broadcast transaction {}", id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockProvider, RecordingNotifier};
    use crate::provider::Provide;
    use penstake_core::{Failure, ViewService};
    use std::sync::Arc;

    #[tokio::test]
    async fn broadcasts_built_transaction() {
        let provider = MockProvider::new();
        let view = <MockProvider as Provide<ViewService>>::service(&provider).await.unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let pipeline = AuthorizeAndBroadcast::new(notifier.clone());
        let progress = ProgressId::next();

        let id = pipeline
            .submit(&view, TransactionPlan(serde_json::json!({ "actions": [] })), progress)
            .await
            .unwrap();

        assert!(!id.0.is_empty());
        assert_eq!(notifier.current(progress).unwrap().1, "Broadcasting transaction...");
    }

    #[tokio::test]
    async fn authorization_failure_is_submission_error() {
        let provider = MockProvider::new().fail_authorize(Failure::message("user denied"));
        let view = <MockProvider as Provide<ViewService>>::service(&provider).await.unwrap();
        let pipeline = AuthorizeAndBroadcast::new(RecordingNotifier::default());

        let err = pipeline
            .submit(&view, TransactionPlan(serde_json::Value::Null), ProgressId::next())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Submission(Failure::Message(ref m)) if m == "user denied"));
        assert_eq!(provider.broadcasts(), 0);
    }
}
