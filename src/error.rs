use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CompileError {
    #[error("cannot compile a canvas with zero area")]
    Unbounded,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReadError {
    #[error("save data is corrupted: {0}")]
    Corrupted(&'static str),
    #[error("save data was written by an unsupported version: {0}")]
    Outdated(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config")]
    Parse(#[from] serde_json::Error),
}
