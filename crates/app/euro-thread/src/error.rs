use euro_endpoint::EndpointError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThreadError {
    #[error("Transport error: {0}")]
    Transport(#[source] EndpointError),

    #[error("Invalid page size: {0}")]
    InvalidPageSize(u32),

    #[error("Invalid conversation id")]
    InvalidConversationId,
}

impl From<EndpointError> for ThreadError {
    fn from(err: EndpointError) -> Self {
        ThreadError::Transport(err)
    }
}

impl ThreadError {
    /// Message suitable for showing next to a list that failed to load.
    pub fn display_message(&self) -> String {
        match self {
            ThreadError::Transport(err) => err.display_message(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ThreadError>;
