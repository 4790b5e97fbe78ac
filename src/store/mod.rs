use async_trait::async_trait;

use crate::domain::subscriber::{SubscriberPatch, SubscriberRecord};
use crate::domain::subscriber_email::SubscriberEmail;
use crate::utils::error_chain_fmt;

mod in_memory;
mod postgres;

pub use in_memory::InMemorySubscriberStore;
pub use postgres::PostgresSubscriberStore;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Persistent storage of subscriber records keyed by normalized email.
///
/// Implementations must make `insert` an atomic "insert or fail if exists" and `update` an
/// atomic conditional write on `SubscriberPatch::expected_status`.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    async fn insert(&self, record: &SubscriberRecord) -> Result<(), InsertError>;

    async fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<SubscriberRecord>, StoreError>;

    /// Returns `None` when no record with `email` is in the patch's expected status.
    async fn update(
        &self,
        email: &SubscriberEmail,
        patch: SubscriberPatch,
    ) -> Result<Option<SubscriberRecord>, StoreError>;

    async fn find_active(&self) -> Result<Vec<SubscriberRecord>, StoreError>;
}

#[derive(thiserror::Error)]
pub enum StoreError {
    #[error("The subscriber store is temporarily unavailable.")]
    Unavailable(#[source] BoxError),
    #[error("The subscriber store failed to complete the operation.")]
    Failed(#[source] BoxError),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl std::fmt::Debug for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum InsertError {
    #[error("A subscriber with this email already exists.")]
    UniqueViolation,
    #[error(transparent)]
    Store(#[from] StoreError),
}
