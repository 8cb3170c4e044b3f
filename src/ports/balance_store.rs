use crate::domain::{UserBalance, UserId};

#[mockall::automock]
#[async_trait::async_trait]
pub trait BalanceStorePort {
    /// Current balance of a user
    ///
    /// Users that were never written to have an empty balance.
    async fn read(&self, user_id: UserId) -> Result<UserBalance, Error>;

    /// Insert or replace the balance of a user
    ///
    /// Returns the stored record with a refreshed `updated_at`.
    async fn write(&self, user_id: UserId, balance: u64) -> Result<UserBalance, Error>;
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
