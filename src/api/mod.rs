pub mod error;
pub mod internal;
pub mod metrics;
pub mod rest;
pub mod runner;

pub use rest::EventBufferServer;
pub use runner::{BoundServer, GracefulRunner, ServiceDescriptor, SHUTDOWN_TIMEOUT};
