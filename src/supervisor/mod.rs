pub mod error;
pub mod group;
pub mod signal;

pub use error::SupervisorError;
pub use group::TaskGroup;
pub use signal::watch_signals;
