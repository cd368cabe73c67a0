pub mod engine;
pub mod error;
pub mod snapshot;
pub mod types;

pub use engine::EventStore;
pub use error::StorageError;
pub use types::{Event, StoreState};
