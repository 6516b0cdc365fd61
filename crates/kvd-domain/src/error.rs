/// Shared error type used across all kvdrive crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame: {0}")]
    Frame(String),

    #[error("snapshot: {0}")]
    Snapshot(String),

    #[error("profile: {0}")]
    Profile(String),

    #[error("model: {0}")]
    Model(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
