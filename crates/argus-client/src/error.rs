//! Client-side error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("not connected")]
    NotConnected,
    #[error("already connected")]
    AlreadyConnected,
    #[error("connection timeout after {0:?}")]
    Timeout(std::time::Duration),
    #[error("websocket error: {0}")]
    WebSocket(String),
    #[error("wire error: {0}")]
    Wire(#[from] argus_protocol::WireError),
    #[error(transparent)]
    Engine(#[from] argus_engine::EngineError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("collaborator rejected request: {0}")]
    Collaborator(String),
}

impl ClientError {
    /// Short operator-facing description, without transport internals.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Collaborator(reason) => reason.clone(),
            ClientError::NotConnected => "not connected to the backend".to_string(),
            ClientError::Timeout(_) => "the backend did not respond in time".to_string(),
            ClientError::Http(_) => "could not reach the backend".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
