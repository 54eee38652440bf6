use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("SFU error: {0}")]
    Sfu(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Human-readable message carried to clients in error acks and
    /// `error` unicasts. Internal details stay in the logs.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::NotFound(msg)
            | Self::InvalidInput(msg)
            | Self::Conflict(msg)
            | Self::Upstream(msg) => msg.clone(),
            Self::Sfu(_) => "Voice service error".to_string(),
            Self::Serialization(_) | Self::Internal(_) => "Internal error".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
