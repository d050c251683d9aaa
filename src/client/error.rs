use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a failure envelope
    #[error("{code}: {message}")]
    Api {
        status: Option<u16>,
        code: String,
        message: String,
        timestamp: String,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("No rows returned")]
    NotFound,

    #[error("Could not decode response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Stable code for failures reported by the server
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { code, .. } => Some(code),
            ClientError::NotFound => Some("NOT_FOUND"),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}
