use std::task::{Context, Poll};

use futures::future::BoxFuture;
use tower::Service;

use crate::{
    domain::{Amount, TransactionKind, UserBalance, UserId},
    ports::{balance_store::BalanceStorePort, history_store::HistoryStorePort},
};

use super::{Error, PointService};

pub struct DebitRequest {
    pub user_id: UserId,
    /// Number of points to remove, as received from the caller
    pub amount: i64,
}

impl<B, H> PointService<B, H>
where
    B: BalanceStorePort + Send + Sync + 'static,
    H: HistoryStorePort + Send + Sync + 'static,
{
    /// Remove points from a user's balance
    ///
    /// The debit is queued behind every mutation already submitted for this user. It fails
    /// without any change if the balance would become negative.
    pub fn debit(
        &self,
        user_id: UserId,
        amount: i64,
    ) -> BoxFuture<'static, Result<UserBalance, Error>> {
        self.mutate(user_id, amount, TransactionKind::Debit, debited_balance)
    }
}

impl<B, H> Service<DebitRequest> for PointService<B, H>
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

    fn call(&mut self, req: DebitRequest) -> Self::Future {
        self.debit(req.user_id, req.amount)
    }
}

fn debited_balance(current: u64, amount: Amount, _max_balance: u64) -> Result<u64, Error> {
    current
        .checked_sub(amount.get())
        .ok_or(Error::InsufficientFunds {
            current,
            amount: amount.get(),
        })
}
