use std::{fmt, num::NonZeroU64};

use chrono::{DateTime, Utc};

/// Upper bound for a user's point balance
pub const MAX_BALANCE: u64 = 10_000;

/// Identity of a user owning a point balance
pub type UserId = u64;

/// Current point total of a user
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserBalance {
    pub user_id: UserId,
    /// Current amount of points
    ///
    /// Always between 0 and the configured maximum balance.
    pub balance: u64,
    /// Time of the last write for this user
    pub updated_at: DateTime<Utc>,
}

impl UserBalance {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            balance: 0,
            updated_at: Utc::now(),
        }
    }
}

/// Audit entry for a single successful balance mutation
///
/// Records are append-only: they are never updated or deleted once stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRecord {
    /// Monotonically assigned by the history store
    pub record_id: u64,
    pub user_id: UserId,
    pub amount: u64,
    pub kind: TransactionKind,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Credit,
    Debit,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Credit => f.write_str("CREDIT"),
            TransactionKind::Debit => f.write_str("DEBIT"),
        }
    }
}

/// Strictly positive number of points to credit or debit
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(NonZeroU64);

impl Amount {
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl TryFrom<i64> for Amount {
    type Error = InvalidAmount;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .ok()
            .and_then(NonZeroU64::new)
            .map(Amount)
            .ok_or(InvalidAmount(value))
    }
}

impl From<NonZeroU64> for Amount {
    fn from(value: NonZeroU64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Amount that is zero or negative
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("amount must be a positive integer, got {0}")]
pub struct InvalidAmount(pub i64);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use speculoos::prelude::*;

    #[rstest]
    #[case(1)]
    #[case(100)]
    #[case(i64::MAX)]
    fn test_amount_positive(#[case] value: i64) {
        let res = Amount::try_from(value);

        assert_that!(res).is_ok().matches(|amount| amount.get() == value as u64);
    }

    #[rstest]
    #[case(0)]
    #[case(-1)]
    #[case(i64::MIN)]
    fn test_amount_not_positive(#[case] value: i64) {
        let res = Amount::try_from(value);

        assert_that!(res).is_err().is_equal_to(InvalidAmount(value));
    }

    #[test]
    fn test_new_balance_is_empty() {
        let balance = UserBalance::new(7);

        assert_that!(balance.user_id).is_equal_to(7);
        assert_that!(balance.balance).is_equal_to(0);
    }

    #[test]
    fn test_kind_display() {
        assert_that!(TransactionKind::Credit.to_string()).is_equal_to("CREDIT".to_string());
        assert_that!(TransactionKind::Debit.to_string()).is_equal_to("DEBIT".to_string());
    }
}
