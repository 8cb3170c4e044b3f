use std::sync::Arc;

use chrono::Utc;
use futures::future::{self, BoxFuture};

use crate::{
    config::PointConfig,
    domain::{Amount, InvalidAmount, TransactionKind, UserBalance, UserId},
    ports::{balance_store::BalanceStorePort, history_store::HistoryStorePort},
    sequential::KeySequentialExecutor,
};

pub mod credit;
pub mod debit;
pub mod get_balance;
pub mod get_history;

/// Balance transaction service
///
/// Every credit and debit for a user runs as a single task on the user's key, so the
/// read-validate-write sequence of one mutation never interleaves with another one for the same
/// user. Reads go straight to the stores and may observe a balance that a queued mutation is
/// about to change.
pub struct PointService<B, H> {
    balances: Arc<B>,
    histories: Arc<H>,
    executor: KeySequentialExecutor<UserId>,
    config: PointConfig,
}

impl<B, H> PointService<B, H>
where
    B: BalanceStorePort + Send + Sync + 'static,
    H: HistoryStorePort + Send + Sync + 'static,
{
    pub fn new(balances: Arc<B>, histories: Arc<H>) -> Self {
        Self::with_config(balances, histories, PointConfig::default())
    }

    pub fn with_config(balances: Arc<B>, histories: Arc<H>, config: PointConfig) -> Self {
        Self {
            balances,
            histories,
            executor: KeySequentialExecutor::new(),
            config,
        }
    }

    pub fn config(&self) -> &PointConfig {
        &self.config
    }

    /// Queue a balance mutation on the user's key
    ///
    /// Invalid amounts are rejected before queueing. `next_balance` turns the current balance
    /// into the new one, or rejects the mutation without touching either store. The balance
    /// write and the history append are issued together and are not rolled back if the other
    /// one fails.
    fn mutate(
        &self,
        user_id: UserId,
        amount: i64,
        kind: TransactionKind,
        next_balance: fn(u64, Amount, u64) -> Result<u64, Error>,
    ) -> BoxFuture<'static, Result<UserBalance, Error>> {
        let amount = match Amount::try_from(amount) {
            Ok(amount) => amount,
            Err(err) => {
                let err = Error::from(err);
                log_failure(user_id, kind, &err);
                return Box::pin(future::ready(Err(err)));
            }
        };

        let balances = Arc::clone(&self.balances);
        let histories = Arc::clone(&self.histories);
        let max_balance = self.config.max_balance;

        let task = self.executor.enqueue(user_id, move || async move {
            let current = balances.read(user_id).await?;
            let balance = next_balance(current.balance, amount, max_balance)?;

            let (updated, record) = tokio::join!(
                balances.write(user_id, balance),
                histories.append(user_id, amount.get(), kind, Utc::now()),
            );
            let updated = updated?;
            let record = record?;

            tracing::debug!(
                user_id,
                %kind,
                %amount,
                previous = current.balance,
                balance = updated.balance,
                record_id = record.record_id,
                "applied balance mutation"
            );
            Ok::<_, Error>(updated)
        });

        Box::pin(async move {
            let res = task.await.map_err(Error::from).and_then(|res| res);
            if let Err(err) = &res {
                log_failure(user_id, kind, err);
            }
            res
        })
    }
}

impl<B, H> Clone for PointService<B, H> {
    fn clone(&self) -> Self {
        Self {
            balances: Arc::clone(&self.balances),
            histories: Arc::clone(&self.histories),
            executor: self.executor.clone(),
            config: self.config.clone(),
        }
    }
}

fn log_failure(user_id: UserId, kind: TransactionKind, err: &Error) {
    match err.kind() {
        ErrorKind::Internal => {
            tracing::error!(user_id, %kind, error = ?err, "balance mutation failed")
        }
        _ => tracing::warn!(user_id, %kind, error = %err, "balance mutation rejected"),
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid request: {0}")]
    Validation(#[from] InvalidAmount),

    /// Crediting would take the balance above the maximum
    #[error("balance limit exceeded: {current} + {amount} is above {max_balance}")]
    LimitExceeded {
        current: u64,
        amount: u64,
        max_balance: u64,
    },

    /// Debiting would make the balance negative
    #[error("insufficient funds: cannot subtract {amount} from {current}")]
    InsufficientFunds { current: u64, amount: u64 },

    #[error("balance store error: {0:?}")]
    BalanceStore(#[from] crate::ports::balance_store::Error),
    #[error("history store error: {0:?}")]
    HistoryStore(#[from] crate::ports::history_store::Error),
    #[error("executor error: {0}")]
    Executor(#[from] crate::sequential::Error),
}

/// Classification of an [`Error`] for callers mapping failures to responses
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    LimitExceeded,
    InsufficientFunds,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            Error::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Error::BalanceStore(_) | Error::HistoryStore(_) | Error::Executor(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether the caller can fix the request and try again
    ///
    /// Failures that are not user-correctable may have partially applied a mutation.
    pub fn is_user_correctable(&self) -> bool {
        self.kind() != ErrorKind::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adapters::database::memory::{MemoryBalanceStore, MemoryHistoryStore},
        ports::{balance_store, history_store},
        sequential,
    };
    use rstest::*;
    use speculoos::prelude::*;

    #[rstest]
    #[case(Error::Validation(InvalidAmount(0)), ErrorKind::Validation, true)]
    #[case(Error::LimitExceeded { current: 1, amount: 2, max_balance: 2 }, ErrorKind::LimitExceeded, true)]
    #[case(Error::InsufficientFunds { current: 1, amount: 2 }, ErrorKind::InsufficientFunds, true)]
    #[case(Error::BalanceStore(balance_store::Error::Adapter("down".into())), ErrorKind::Internal, false)]
    #[case(Error::HistoryStore(history_store::Error::Adapter("down".into())), ErrorKind::Internal, false)]
    #[case(Error::Executor(sequential::Error::TaskPanicked), ErrorKind::Internal, false)]
    fn test_error_kind(
        #[case] err: Error,
        #[case] expected: ErrorKind,
        #[case] user_correctable: bool,
    ) {
        assert_that!(err.kind()).is_equal_to(expected);
        assert_that!(err.is_user_correctable()).is_equal_to(user_correctable);
    }

    #[tokio::test]
    async fn test_clones_share_queue_and_stores() {
        let service = PointService::new(
            Arc::new(MemoryBalanceStore::default()),
            Arc::new(MemoryHistoryStore::default()),
        );
        let other = service.clone();

        let first = service.credit(1, 100);
        let second = other.debit(1, 100);

        assert_that!(first.await).is_ok().matches(|b| b.balance == 100);
        assert_that!(second.await).is_ok().matches(|b| b.balance == 0);
    }
}
