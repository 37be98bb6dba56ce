//! Error types for attachment transfers

use std::{io, path::PathBuf};

use euro_endpoint::EndpointError;
use euro_storage::StorageError;
use serde::Serialize;
use thiserror::Error;

pub(crate) const FALLBACK_MESSAGE: &str = "Something went wrong";

/// Where a failure happened, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Reading, encoding or writing on this device, including storage consent.
    LocalIo,
    /// The remote side rejected the request or the connection failed.
    Transport,
}

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Download interrupted: {0}")]
    Interrupted(#[source] io::Error),

    #[error("Invalid file location: {0}")]
    InvalidLocation(String),

    #[error("Could not share file: {0}")]
    Share(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}

impl AttachmentError {
    pub fn invalid_location(msg: impl Into<String>) -> Self {
        AttachmentError::InvalidLocation(msg.into())
    }

    /// Classify an error from writing a response body to disk. Errors that
    /// came out of the body stream are network failures, the rest are local.
    pub(crate) fn from_write(path: PathBuf, source: io::Error) -> Self {
        let from_network = source
            .get_ref()
            .is_some_and(|inner| inner.is::<reqwest::Error>());
        if from_network {
            AttachmentError::Interrupted(source)
        } else {
            AttachmentError::Write { path, source }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AttachmentError::Interrupted(_) | AttachmentError::Endpoint(_) => ErrorKind::Transport,
            _ => ErrorKind::LocalIo,
        }
    }

    /// Text for the user: the server's own message when it sent one, the
    /// error itself otherwise.
    pub fn user_message(&self) -> String {
        let message = match self {
            AttachmentError::Endpoint(err) => err.display_message(),
            other => other.to_string(),
        };
        if message.trim().is_empty() {
            FALLBACK_MESSAGE.to_string()
        } else {
            message
        }
    }

    /// Like [`user_message`](Self::user_message), but a rejected transfer
    /// always names the status code next to the server's wording.
    pub fn download_message(&self) -> String {
        match self {
            AttachmentError::Endpoint(err) => match (err.server_message(), err.status()) {
                (Some(message), Some(status)) if !message.trim().is_empty() => {
                    format!("{message} ({status})")
                }
                _ => self.user_message(),
            },
            _ => self.user_message(),
        }
    }
}

pub type AttachmentResult<T> = std::result::Result<T, AttachmentError>;
