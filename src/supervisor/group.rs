use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::error::SupervisorError;

/// A set of concurrently running tasks sharing one cancellation token.
///
/// The first task to fail records its error and cancels the token; every
/// other task is expected to notice and return. [`TaskGroup::wait`] only
/// returns once all tasks have finished, with the first recorded error.
pub struct TaskGroup {
    token: CancellationToken,
    tasks: JoinSet<()>,
    first_error: Arc<Mutex<Option<SupervisorError>>>,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            tasks: JoinSet::new(),
            first_error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Starts a task. `task` receives a clone of the group's token.
    pub fn spawn<F, Fut>(&mut self, name: impl Into<String>, task: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), SupervisorError>> + Send + 'static,
    {
        let name = name.into();
        let fut = task(self.token.clone());
        let token = self.token.clone();
        let first_error = self.first_error.clone();

        self.tasks.spawn(async move {
            let result = match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(SupervisorError::TaskPanicked { name: name.clone() }),
            };

            match result {
                Ok(()) => debug!(task = %name, "task finished"),
                Err(e) => record_failure(&first_error, &token, &name, e),
            }
        });
    }

    /// Deliberate shutdown. Does not record an error.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Waits for every task to finish and returns the first failure, if any.
    pub async fn wait(mut self) -> Result<(), SupervisorError> {
        while let Some(joined) = self.tasks.join_next().await {
            // Tasks are never aborted and panics are caught inside them.
            if let Err(e) = joined {
                error!(error = %e, "task could not be joined");
            }
        }

        match self.first_error.lock().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for TaskGroup {
    fn default() -> Self {
        Self::new()
    }
}

fn record_failure(
    slot: &Mutex<Option<SupervisorError>>,
    token: &CancellationToken,
    name: &str,
    err: SupervisorError,
) {
    {
        let mut slot = slot.lock();
        if slot.is_none() {
            error!(task = %name, error = %err, "task failed, cancelling group");
            *slot = Some(err);
        } else {
            debug!(task = %name, error = %err, "task failed after group was already cancelled");
        }
    }
    token.cancel();
}
