use chrono::{DateTime, Utc};

use crate::storage::error::StorageError;

/// Maintenance operation run by the prune worker.
pub trait Pruner: Send + Sync {
    /// Removes everything older than `cutoff`, returning how many items went.
    fn prune(&self, cutoff: DateTime<Utc>) -> Result<usize, StorageError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
