use std::path::Path;

use async_trait::async_trait;
use euro_endpoint::{Endpoint, EndpointError, check_status};
use euro_thread::Attachment;
use tokio::sync::watch;
use tracing::debug;

use crate::{
    AttachmentError, AttachmentRecord, AttachmentResult,
    types::{UploadRequest, UploadResponse},
};

/// Remote side of attachment transfers.
#[async_trait]
pub trait AttachmentService: Send + Sync {
    /// Send one batch of encoded files; the server answers with the stored
    /// attachments in the same order.
    async fn upload(&self, records: &[AttachmentRecord]) -> AttachmentResult<Vec<Attachment>>;

    /// Fetch `remote_url` into `destination`. On failure nothing is left at
    /// `destination`. Returns the number of bytes written.
    async fn transfer(&self, remote_url: &str, destination: &Path) -> AttachmentResult<u64>;
}

pub struct HttpAttachmentService {
    endpoint_rx: watch::Receiver<Endpoint>,
}

impl HttpAttachmentService {
    pub fn new(endpoint_rx: watch::Receiver<Endpoint>) -> Self {
        Self { endpoint_rx }
    }

    fn endpoint(&self) -> Endpoint {
        self.endpoint_rx.borrow().clone()
    }
}

#[async_trait]
impl AttachmentService for HttpAttachmentService {
    async fn upload(&self, records: &[AttachmentRecord]) -> AttachmentResult<Vec<Attachment>> {
        let endpoint = self.endpoint();
        let url = endpoint.url(&["attachments"])?;
        debug!("Uploading {} attachment(s)", records.len());

        let response: UploadResponse = endpoint
            .post_json(
                url,
                &UploadRequest {
                    attachments: records,
                },
            )
            .await?;
        Ok(response.data)
    }

    async fn transfer(&self, remote_url: &str, destination: &Path) -> AttachmentResult<u64> {
        let endpoint = self.endpoint();
        let url = endpoint.resolve(remote_url)?;

        let response = endpoint
            .get(url)
            .await
            .send()
            .await
            .map_err(EndpointError::from)?;
        // Status first: an error body must never be written as the file.
        let response = check_status(response).await?;

        let written = euro_fs::write_stream_atomically(destination, response.bytes_stream())
            .await
            .map_err(|source| AttachmentError::from_write(destination.to_path_buf(), source))?;
        debug!("Wrote {} bytes to {}", written, destination.display());
        Ok(written)
    }
}
