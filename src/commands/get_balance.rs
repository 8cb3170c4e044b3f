use std::{
    sync::Arc,
    task::{Context, Poll},
};

use futures::future::BoxFuture;
use tower::Service;

use crate::{
    domain::{UserBalance, UserId},
    ports::{balance_store::BalanceStorePort, history_store::HistoryStorePort},
};

use super::{Error, PointService};

pub struct GetBalanceRequest {
    pub user_id: UserId,
}

impl<B, H> PointService<B, H>
where
    B: BalanceStorePort + Send + Sync + 'static,
    H: HistoryStorePort + Send + Sync + 'static,
{
    /// Current balance of a user
    ///
    /// Not queued behind pending mutations for the user.
    pub fn get_balance(&self, user_id: UserId) -> BoxFuture<'static, Result<UserBalance, Error>> {
        let balances = Arc::clone(&self.balances);
        Box::pin(async move {
            balances.read(user_id).await.map_err(|err| {
                tracing::error!(user_id, error = ?err, "failed to read balance");
                Error::from(err)
            })
        })
    }
}

impl<B, H> Service<GetBalanceRequest> for PointService<B, H>
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

    fn call(&mut self, req: GetBalanceRequest) -> Self::Future {
        self.get_balance(req.user_id)
    }
}
