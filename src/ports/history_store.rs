use chrono::{DateTime, Utc};

use crate::domain::{TransactionKind, TransactionRecord, UserId};

#[mockall::automock]
#[async_trait::async_trait]
pub trait HistoryStorePort {
    /// Append a new transaction record for a user
    ///
    /// The store assigns the `record_id`.
    async fn append(
        &self,
        user_id: UserId,
        amount: u64,
        kind: TransactionKind,
        occurred_at: DateTime<Utc>,
    ) -> Result<TransactionRecord, Error>;

    /// All records of a user, in insertion order
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<TransactionRecord>, Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Concrete adapter errors
    ///
    /// This could represent any errors from a concrete adapter that is not part of the domain
    /// model, such as connectivity, configuration, or permission errors.
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
