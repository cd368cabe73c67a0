pub mod api;
pub mod background;
pub mod config;
pub mod server;
pub mod storage;
pub mod supervisor;
