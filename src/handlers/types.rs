use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::{Notify, oneshot};
use uuid::Uuid;

use super::traits::DispatchError;

/// Failures observed through a [`FetchTask`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("fetch cancelled")]
    Cancelled,
    #[error("handler failed: {0}")]
    Handler(String),
    #[error("handler dropped the task without completing it")]
    Abandoned,
}

pub type FetchResult<T> = Result<T, FetchError>;

#[derive(Debug, Default)]
struct CancelSignal {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelSignal {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Execution handle for a dispatched fetch.
///
/// The handler that accepted the request keeps the matching
/// [`TaskCompleter`] and reports the outcome through it. Dispatch failures
/// use the same handle shape, so callers have a single failure path.
pub struct FetchTask<T> {
    id: Uuid,
    receiver: oneshot::Receiver<FetchResult<T>>,
    signal: Arc<CancelSignal>,
}

/// Producer side of a [`FetchTask`], owned by the executing handler
pub struct TaskCompleter<T> {
    task_id: Uuid,
    sender: oneshot::Sender<FetchResult<T>>,
    signal: Arc<CancelSignal>,
}

impl<T> FetchTask<T> {
    /// Create a pending task and the completer used to resolve it
    pub fn channel() -> (FetchTask<T>, TaskCompleter<T>) {
        let id = Uuid::new_v4();
        let (sender, receiver) = oneshot::channel();
        let signal = Arc::new(CancelSignal::default());

        let task = FetchTask {
            id,
            receiver,
            signal: signal.clone(),
        };
        let completer = TaskCompleter {
            task_id: id,
            sender,
            signal,
        };

        (task, completer)
    }

    /// Create a task that has already failed
    pub fn failed(error: impl Into<FetchError>) -> Self {
        let (task, completer) = Self::channel();
        completer.complete(Err(error.into()));
        task
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Request cancellation. The handler decides how and when to honor it.
    pub fn cancel(&self) {
        self.signal.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.signal.is_cancelled()
    }

    /// Poll for the outcome without waiting; `None` while still running
    pub fn try_result(&mut self) -> Option<FetchResult<T>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(FetchError::Abandoned)),
        }
    }

    /// Wait for the handler to complete the task
    pub async fn wait(self) -> FetchResult<T> {
        match self.receiver.await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Abandoned),
        }
    }
}

impl<T> From<DispatchError> for FetchTask<T> {
    fn from(error: DispatchError) -> Self {
        FetchTask::failed(error)
    }
}

impl<T> fmt::Debug for FetchTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchTask")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl<T> TaskCompleter<T> {
    pub fn task_id(&self) -> Uuid {
        self.task_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.signal.is_cancelled()
    }

    /// Resolves once the task owner called [`FetchTask::cancel`]
    pub async fn cancelled(&self) {
        loop {
            let notified = self.signal.notify.notified();
            if self.signal.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Deliver the outcome. Returns false if the task was already dropped.
    pub fn complete(self, result: FetchResult<T>) -> bool {
        self.sender.send(result).is_ok()
    }
}

impl<T> fmt::Debug for TaskCompleter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskCompleter")
            .field("task_id", &self.task_id)
            .finish()
    }
}
