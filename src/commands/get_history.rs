use std::{
    sync::Arc,
    task::{Context, Poll},
};

use futures::future::BoxFuture;
use tower::Service;

use crate::{
    domain::{TransactionRecord, UserId},
    ports::{balance_store::BalanceStorePort, history_store::HistoryStorePort},
};

use super::{Error, PointService};

pub struct GetHistoryRequest {
    pub user_id: UserId,
}

impl<B, H> PointService<B, H>
where
    B: BalanceStorePort + Send + Sync + 'static,
    H: HistoryStorePort + Send + Sync + 'static,
{
    /// Transaction history of a user, in the order the history store recorded it
    pub fn get_history(
        &self,
        user_id: UserId,
    ) -> BoxFuture<'static, Result<Vec<TransactionRecord>, Error>> {
        let histories = Arc::clone(&self.histories);
        Box::pin(async move {
            histories.list_by_user(user_id).await.map_err(|err| {
                tracing::error!(user_id, error = ?err, "failed to list history");
                Error::from(err)
            })
        })
    }
}

impl<B, H> Service<GetHistoryRequest> for PointService<B, H>
where
    B: BalanceStorePort + Send + Sync + 'static,
    H: HistoryStorePort + Send + Sync + 'static,
{
    type Response = Vec<TransactionRecord>;
    type Error = Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: GetHistoryRequest) -> Self::Future {
        self.get_history(req.user_id)
    }
}
