use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::AttachmentResult;

/// Native save/share sheet, provided by the host shell.
#[async_trait]
pub trait ShareSurface: Send + Sync {
    async fn share(&self, path: &Path, mimetype: &str) -> AttachmentResult<()>;
}

/// Announces the saved file in the log instead of opening a sheet.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogShare;

#[async_trait]
impl ShareSurface for LogShare {
    async fn share(&self, path: &Path, mimetype: &str) -> AttachmentResult<()> {
        info!("Saved {} ({})", path.display(), mimetype);
        Ok(())
    }
}
