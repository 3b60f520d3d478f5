//! Request handling errors

/// Outcome of a failed client request
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Bad input from the client; reported back, never logged as a fault
    #[error("{0}")]
    Validation(String),

    /// Coordination backend failure
    #[error("service unavailable: {0}")]
    Unavailable(#[from] chatrelay_core::Error),
}

impl ChatError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Text sent to the client in a `room error` event
    pub fn client_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Unavailable(_) => "Room service is temporarily unavailable".to_string(),
        }
    }
}

pub type ChatResult<T> = std::result::Result<T, ChatError>;
