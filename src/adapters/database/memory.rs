use crate::{
    domain::{TransactionKind, TransactionRecord, UserBalance, UserId},
    ports::{
        balance_store::{self, BalanceStorePort},
        history_store::{self, HistoryStorePort},
    },
};
use chrono::{DateTime, Utc};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

/// In-memory balance table
///
/// Clones share the same underlying table.
#[derive(Clone, Debug, Default)]
pub struct MemoryBalanceStore {
    balances: Arc<Mutex<HashMap<UserId, UserBalance>>>,
}

#[async_trait::async_trait]
impl BalanceStorePort for MemoryBalanceStore {
    async fn read(&self, user_id: UserId) -> Result<UserBalance, balance_store::Error> {
        let balance = self
            .balances
            .lock()?
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| UserBalance::new(user_id));

        Ok(balance)
    }

    async fn write(
        &self,
        user_id: UserId,
        balance: u64,
    ) -> Result<UserBalance, balance_store::Error> {
        let mut balances = self.balances.lock()?;
        let now = Utc::now();
        let stored = balances
            .entry(user_id)
            .and_modify(|stored| {
                stored.balance = balance;
                // Wall clocks can step backwards; keep per-user timestamps non-decreasing
                stored.updated_at = stored.updated_at.max(now);
            })
            .or_insert_with(|| UserBalance {
                user_id,
                balance,
                updated_at: now,
            });

        Ok(stored.clone())
    }
}

/// In-memory transaction history
///
/// Records of all users live in a single append-only log, so insertion order is preserved.
#[derive(Clone, Debug, Default)]
pub struct MemoryHistoryStore {
    records: Arc<Mutex<Vec<TransactionRecord>>>,
}

#[async_trait::async_trait]
impl HistoryStorePort for MemoryHistoryStore {
    async fn append(
        &self,
        user_id: UserId,
        amount: u64,
        kind: TransactionKind,
        occurred_at: DateTime<Utc>,
    ) -> Result<TransactionRecord, history_store::Error> {
        let mut records = self.records.lock()?;
        let record = TransactionRecord {
            record_id: records.len() as u64 + 1,
            user_id,
            amount,
            kind,
            occurred_at,
        };
        records.push(record.clone());

        Ok(record)
    }

    async fn list_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<TransactionRecord>, history_store::Error> {
        let records = self
            .records
            .lock()?
            .iter()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect();

        Ok(records)
    }
}

/// Erased [`PoisonError`]
///
/// `PoisonError` keeps the `MutexGuard` internally, which is not send. Thus we erase the error
/// and only keep the string representation instead.
#[derive(Debug, thiserror::Error)]
#[error("poison error: {0}")]
pub struct ErasedPoisonError(String);

impl<T> From<PoisonError<T>> for balance_store::Error {
    fn from(err: PoisonError<T>) -> Self {
        Self::Adapter(Box::new(ErasedPoisonError(err.to_string())))
    }
}

impl<T> From<PoisonError<T>> for history_store::Error {
    fn from(err: PoisonError<T>) -> Self {
        Self::Adapter(Box::new(ErasedPoisonError(err.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speculoos::prelude::*;

    #[tokio::test]
    async fn test_read_missing_user() {
        let store = MemoryBalanceStore::default();

        let res = store.read(42).await;

        assert_that!(res)
            .is_ok()
            .matches(|balance| balance.user_id == 42 && balance.balance == 0);
    }

    #[tokio::test]
    async fn test_write_retrieve() {
        let store = MemoryBalanceStore::default();

        let res = store.write(1, 500).await;
        assert_that!(res)
            .is_ok()
            .matches(|balance| balance.user_id == 1 && balance.balance == 500);

        // Retrieving the balance should return the written value
        let res = store.read(1).await;
        assert_that!(res)
            .is_ok()
            .matches(|balance| balance.user_id == 1 && balance.balance == 500);
    }

    #[tokio::test]
    async fn test_write_keeps_timestamp_monotonic() {
        let store = MemoryBalanceStore::default();

        let first = store.write(1, 100).await.unwrap();
        let second = store.write(1, 200).await.unwrap();

        assert_that!(second.updated_at).is_greater_than_or_equal_to(first.updated_at);
        assert_that!(second.balance).is_equal_to(200);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryBalanceStore::default();
        let other = store.clone();

        store.write(3, 30).await.unwrap();

        let res = other.read(3).await;
        assert_that!(res).is_ok().matches(|balance| balance.balance == 30);
    }

    #[tokio::test]
    async fn test_append_assigns_increasing_ids() {
        let store = MemoryHistoryStore::default();
        let now = Utc::now();

        let first = store
            .append(1, 100, TransactionKind::Credit, now)
            .await
            .unwrap();
        let second = store
            .append(2, 50, TransactionKind::Debit, now)
            .await
            .unwrap();

        assert_that!(second.record_id).is_greater_than(first.record_id);
    }

    #[tokio::test]
    async fn test_list_by_user_filters_and_keeps_order() {
        let store = MemoryHistoryStore::default();
        let now = Utc::now();
        store
            .append(1, 100, TransactionKind::Credit, now)
            .await
            .unwrap();
        store
            .append(2, 999, TransactionKind::Credit, now)
            .await
            .unwrap();
        store
            .append(1, 40, TransactionKind::Debit, now)
            .await
            .unwrap();

        let res = store.list_by_user(1).await.unwrap();

        let entries: Vec<_> = res.iter().map(|record| (record.amount, record.kind)).collect();
        assert_that!(entries).is_equal_to(vec![
            (100, TransactionKind::Credit),
            (40, TransactionKind::Debit),
        ]);
    }

    #[tokio::test]
    async fn test_list_by_user_empty() {
        let store = MemoryHistoryStore::default();

        let res = store.list_by_user(9).await;

        assert_that!(res).is_ok().is_empty();
    }
}
