use std::task::{Context, Poll};

use futures::future::BoxFuture;
use tower::Service;

use crate::{
    domain::{Amount, TransactionKind, UserBalance, UserId},
    ports::{balance_store::BalanceStorePort, history_store::HistoryStorePort},
};

use super::{Error, PointService};

pub struct CreditRequest {
    pub user_id: UserId,
    /// Number of points to add, as received from the caller
    pub amount: i64,
}

impl<B, H> PointService<B, H>
where
    B: BalanceStorePort + Send + Sync + 'static,
    H: HistoryStorePort + Send + Sync + 'static,
{
    /// Add points to a user's balance
    ///
    /// The credit is queued behind every mutation already submitted for this user. It fails
    /// without any change if the new balance would exceed the configured maximum.
    pub fn credit(
        &self,
        user_id: UserId,
        amount: i64,
    ) -> BoxFuture<'static, Result<UserBalance, Error>> {
        self.mutate(user_id, amount, TransactionKind::Credit, credited_balance)
    }
}

impl<B, H> Service<CreditRequest> for PointService<B, H>
where
    B: BalanceStorePort + Send + Sync + 'static,
    H: HistoryStorePort + Send + Sync + 'static,
{
    type Response = UserBalance;
    type Error = Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: CreditRequest) -> Self::Future {
        self.credit(req.user_id, req.amount)
    }
}

fn credited_balance(current: u64, amount: Amount, max_balance: u64) -> Result<u64, Error> {
    current
        .checked_add(amount.get())
        .filter(|balance| *balance <= max_balance)
        .ok_or(Error::LimitExceeded {
            current,
            amount: amount.get(),
            max_balance,
        })
}
