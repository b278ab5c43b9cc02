use thiserror::Error;

/// Core error types for wvec
#[derive(Error, Debug)]
pub enum Error {
    #[error("Model not initialized")]
    NotInitialized,

    #[error("Invalid size: {0}")]
    InvalidSize(String),

    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    #[error("File I/O error: {0}")]
    FileIo(#[from] std::io::Error),

    #[error("Invalid checkpoint magic: {0:?}")]
    InvalidMagic([u8; 4]),

    #[error("Unsupported checkpoint version: {0}")]
    UnsupportedVersion(i32),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
