use futures::future::{self, Either};
use tokio::{runtime::Handle, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A wrapper over a runtime handle which spawns async and blocking tasks tied to one shared
/// [CancellationToken]. Cancelling the token stops every async task at its next suspension
/// point.
#[derive(Clone, Debug)]
pub struct ReamExecutor {
    handle: Handle,
    cancellation_token: CancellationToken,
}

impl ReamExecutor {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Builds an executor on the runtime this is called from.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// Spawns a future which is dropped once the executor is shut down.
    pub fn spawn<F>(&self, task: F, name: &'static str) -> JoinHandle<Option<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let cancellation_token = self.cancellation_token.clone();
        self.handle.spawn(async move {
            match future::select(Box::pin(task), Box::pin(cancellation_token.cancelled())).await {
                Either::Left((output, _)) => Some(output),
                Either::Right(_) => {
                    debug!("Async task {name} shutdown");
                    None
                }
            }
        })
    }

    /// Runs a blocking closure on the runtime's blocking thread pool. Blocking work can't be
    /// interrupted, so the closure always runs to completion.
    pub fn spawn_blocking<F, R>(&self, task: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.handle.spawn_blocking(task)
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    pub fn is_shutdown(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    pub fn shutdown(&self) {
        self.cancellation_token.cancel();
    }
}
