pub mod metrics;
pub mod pruner;
pub mod types;

pub use pruner::PruneWorker;
pub use types::{Clock, Pruner, SystemClock};
