//! Per-key sequential task execution
//!
//! [`KeySequentialExecutor`] runs asynchronous work items so that items sharing a key execute
//! strictly one at a time, in the order they were enqueued, while items for different keys run
//! independently.
//!
//! The executor does not keep a queue of pending items. For every key with outstanding work it
//! only remembers the *tail*: the most recently enqueued task. A new task captures the current
//! tail as its predecessor, waits for it to settle, runs, then becomes the predecessor of
//! whatever comes next. Memory is proportional to the number of busy keys, not to the amount
//! of queued work.

use std::{
    collections::HashMap,
    fmt::Debug,
    future::Future,
    hash::Hash,
    panic::AssertUnwindSafe,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    task::{Context, Poll},
};

use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};
use tokio::sync::oneshot;

/// Completion signal of a queued task
///
/// Resolves once the task settled, whatever its outcome was.
type Link = Shared<BoxFuture<'static, ()>>;

struct Tail {
    /// Unique per enqueued task, used as the task identity
    ticket: u64,
    link: Link,
}

pub struct KeySequentialExecutor<K> {
    tails: Arc<Mutex<HashMap<K, Tail>>>,
    next_ticket: Arc<AtomicU64>,
}

impl<K> KeySequentialExecutor<K>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            tails: Arc::new(Mutex::new(HashMap::new())),
            next_ticket: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Schedule `work` to run after every task previously enqueued for `key`
    ///
    /// The task is linked into the chain before this function returns, so the submission order
    /// is the order of `enqueue` calls. The task is driven by the tokio runtime and runs to
    /// completion even if the returned handle is dropped.
    ///
    /// `work` must not enqueue with the same `key` and await the result: it would wait on a task
    /// that can only start after `work` itself settled.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn enqueue<F, Fut, T>(&self, key: K, work: F) -> TaskHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);

        let mut tails = lock(&self.tails);
        let predecessor = tails.get(&key).map(|tail| tail.link.clone());
        tracing::trace!(?key, ticket, queued = predecessor.is_some(), "enqueue task");

        let shared_tails = Arc::clone(&self.tails);
        let settled_key = key.clone();
        let link = async move {
            // Only completion matters here: a failed predecessor does not block its successors
            if let Some(predecessor) = predecessor {
                predecessor.await;
            }

            let outcome = AssertUnwindSafe(async move { work().await })
                .catch_unwind()
                .await
                .map_err(|_| Error::TaskPanicked);

            release(&shared_tails, &settled_key, ticket);
            tracing::trace!(key = ?settled_key, ticket, ok = outcome.is_ok(), "task settled");

            // The caller may have stopped waiting for the result
            let _ = sender.send(outcome);
        }
        .boxed()
        .shared();

        tails.insert(
            key,
            Tail {
                ticket,
                link: link.clone(),
            },
        );
        drop(tails);

        tokio::spawn(link);

        TaskHandle { receiver }
    }

    /// Number of keys that currently have work in flight
    pub fn tracked_keys(&self) -> usize {
        lock(&self.tails).len()
    }

    /// Whether `key` currently has work in flight
    pub fn is_tracked(&self, key: &K) -> bool {
        lock(&self.tails).contains_key(key)
    }
}

impl<K> Default for KeySequentialExecutor<K>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Clone for KeySequentialExecutor<K> {
    fn clone(&self) -> Self {
        Self {
            tails: Arc::clone(&self.tails),
            next_ticket: Arc::clone(&self.next_ticket),
        }
    }
}

/// Forget the tail of `key` if it is still the task identified by `ticket`
///
/// A newer task may have replaced the tail in the meantime, in which case that task is now
/// responsible for the entry.
fn release<K: Eq + Hash>(tails: &Mutex<HashMap<K, Tail>>, key: &K, ticket: u64) {
    let mut tails = lock(tails);
    if tails.get(key).is_some_and(|tail| tail.ticket == ticket) {
        tails.remove(key);
    }
}

/// The map is never left half-updated while the lock is held, so a poisoned lock is still usable.
fn lock<K>(tails: &Mutex<HashMap<K, Tail>>) -> MutexGuard<'_, HashMap<K, Tail>> {
    tails.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle on the outcome of an enqueued task
#[must_use = "dropping a handle does not cancel the task, but discards its outcome"]
pub struct TaskHandle<T> {
    receiver: oneshot::Receiver<Result<T, Error>>,
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::TaskDropped)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The work panicked while running
    ///
    /// Tasks queued behind it for the same key still run.
    #[error("task panicked")]
    TaskPanicked,

    /// The task was dropped before producing an outcome, e.g. during runtime shutdown
    #[error("task dropped before completion")]
    TaskDropped,
}
