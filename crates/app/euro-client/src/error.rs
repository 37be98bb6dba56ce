use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Endpoint error: {0}")]
    Endpoint(#[from] euro_endpoint::EndpointError),

    #[error("Storage error: {0}")]
    Storage(#[from] euro_storage::StorageError),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
