//! Fixed-size worker pool for independent, cancelable units of work.
//!
//! A [`TaskPool`] runs `workers` Tokio tasks that drain a bounded queue.
//! The first task to fail records its error and cancels the pool in one
//! critical section; every later failure is discarded. Once cancelled,
//! new submissions are rejected and queued tasks are dequeued and dropped
//! without running. Tasks already running are not killed: they receive
//! the pool's [`CancellationToken`] and are expected to check it.
//!
//! ```text
//! submit() --> [ bounded queue ] --> worker 0..N --> task(token)
//!                                         |
//!                                         +-- Err --> first-error slot + cancel (once)
//! ```

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::BoxFuture;
use futures::FutureExt as _;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A queued unit of work.
type Task<E> = Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, Result<(), E>> + Send>;

/// Errors returned by [`TaskPool::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// The pool recorded a terminal error, its parent signal fired, or
    /// [`TaskPool::wait`] already closed the submission path.
    #[error("pool cancelled")]
    Cancelled,
}

/// Observable lifecycle of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Submissions are accepted.
    Accepting,
    /// Cancelled: submissions are rejected and queued tasks are skipped.
    Draining,
    /// All workers have exited.
    Closed,
}

/// State shared by the pool handle and every worker.
struct Shared<E> {
    cancel: CancellationToken,
    first_error: Mutex<Option<E>>,
    panic: Mutex<Option<Box<dyn Any + Send>>>,
}

impl<E> Shared<E> {
    /// Record `err` if no error has been recorded yet and cancel the pool.
    /// Both happen under the same lock so exactly one failure wins.
    fn record_failure(&self, err: E) {
        let mut slot = self.first_error.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(err);
            self.cancel.cancel();
            tracing::debug!("task pool recorded first error, cancelling siblings");
        }
    }

    fn record_panic(&self, payload: Box<dyn Any + Send>) {
        let mut slot = self.panic.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(payload);
        }
        self.cancel.cancel();
    }
}

/// Bounded worker pool with first-error-wins cancellation.
pub struct TaskPool<E> {
    shared: Arc<Shared<E>>,
    sender: Option<mpsc::Sender<Task<E>>>,
    workers: Vec<JoinHandle<()>>,
}

impl<E: Send + 'static> TaskPool<E> {
    /// Start `workers` workers draining a queue of `queue_capacity` tasks.
    ///
    /// Both values are raised to at least one. Must be called from within
    /// a Tokio runtime.
    pub fn new(workers: usize, queue_capacity: usize) -> Self {
        Self::with_cancellation(workers, queue_capacity, CancellationToken::new())
    }

    /// Like [`TaskPool::new`], but the pool is also cancelled when `parent` is.
    pub fn with_parent(workers: usize, queue_capacity: usize, parent: &CancellationToken) -> Self {
        Self::with_cancellation(workers, queue_capacity, parent.child_token())
    }

    fn with_cancellation(workers: usize, queue_capacity: usize, cancel: CancellationToken) -> Self {
        let (sender, receiver) = mpsc::channel::<Task<E>>(queue_capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let shared = Arc::new(Shared {
            cancel,
            first_error: Mutex::new(None),
            panic: Mutex::new(None),
        });

        let handles = (0..workers.max(1))
            .map(|worker| {
                let shared = Arc::clone(&shared);
                let receiver = Arc::clone(&receiver);
                tokio::spawn(run_worker(worker, shared, receiver))
            })
            .collect();

        Self {
            shared,
            sender: Some(sender),
            workers: handles,
        }
    }

    /// Enqueue a task.
    ///
    /// Waits for queue space, but never past pool cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Cancelled`] if the pool is, or becomes,
    /// cancelled before the task is enqueued, or has been closed by
    /// [`TaskPool::wait`].
    pub async fn submit<F, Fut>(&self, task: F) -> Result<(), PoolError>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        if self.shared.cancel.is_cancelled() {
            return Err(PoolError::Cancelled);
        }
        let Some(sender) = self.sender.as_ref() else {
            return Err(PoolError::Cancelled);
        };

        let task: Task<E> = Box::new(move |token| task(token).boxed());

        tokio::select! {
            biased;
            () = self.shared.cancel.cancelled() => Err(PoolError::Cancelled),
            sent = sender.send(task) => sent.map_err(|_rejected| PoolError::Cancelled),
        }
    }

    /// Close the submission path, wait for every worker to exit and return
    /// the single recorded error, if any.
    ///
    /// The recorded error is handed out once; later calls return `Ok(())`.
    /// A panic raised by a task is re-raised here after all workers exit.
    ///
    /// # Errors
    ///
    /// Returns the first error any task produced.
    pub async fn wait(&mut self) -> Result<(), E> {
        drop(self.sender.take());

        for handle in self.workers.drain(..) {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    self.shared.record_panic(e.into_panic());
                }
            }
        }

        let panic = self
            .shared
            .panic
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(payload) = panic {
            std::panic::resume_unwind(payload);
        }

        let first = self
            .shared
            .first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        first.map_or(Ok(()), Err)
    }

    /// The pool-wide cancellation signal handed to every task.
    pub fn token(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PoolState {
        if self.sender.is_none() && self.workers.is_empty() {
            PoolState::Closed
        } else if self.shared.cancel.is_cancelled() {
            PoolState::Draining
        } else {
            PoolState::Accepting
        }
    }
}

impl<E> Drop for TaskPool<E> {
    fn drop(&mut self) {
        // Dropped without `wait`: stop the workers rather than leak them.
        if !self.workers.is_empty() {
            self.shared.cancel.cancel();
        }
    }
}

async fn run_worker<E>(
    worker: usize,
    shared: Arc<Shared<E>>,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Task<E>>>>,
) {
    loop {
        let next = receiver.lock().await.recv().await;
        let Some(task) = next else {
            break;
        };

        if shared.cancel.is_cancelled() {
            continue;
        }

        match AssertUnwindSafe(task(shared.cancel.clone())).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => shared.record_failure(err),
            Err(payload) => {
                tracing::error!(worker, "task panicked, cancelling pool");
                shared.record_panic(payload);
            }
        }
    }
    tracing::trace!(worker, "task pool worker exited");
}
