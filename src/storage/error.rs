use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] Box<bincode::ErrorKind>),

    #[error("Corrupt state file: {0}")]
    Corrupt(String),

    #[error("Inconsistent state: {0}")]
    Inconsistent(String),
}
