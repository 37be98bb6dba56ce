use std::sync::Arc;

use chrono::Utc;
use euro_settings::{SyncSettings, UploadSettings};
use euro_storage::PlatformCapabilities;
use futures::future::try_join_all;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{
    AttachmentError, AttachmentService, ErrorReporter, Notification, Notifier,
    OutboundAttachment, UploadOutcome,
    encode::prepare_record,
    report::{ErrorMetadata, ErrorReport, Severity},
};

/// Encodes picked files and sends them to the server as one batch.
///
/// The batch is all or nothing: if any file cannot be read nothing is sent,
/// and the caller gets the configured generic failure text.
pub struct UploadPipeline {
    service: Arc<dyn AttachmentService>,
    capabilities: PlatformCapabilities,
    settings: watch::Receiver<SyncSettings>,
    reporter: Arc<dyn ErrorReporter>,
    notifier: Arc<dyn Notifier>,
}

impl UploadPipeline {
    pub fn new(
        service: Arc<dyn AttachmentService>,
        capabilities: PlatformCapabilities,
        settings: watch::Receiver<SyncSettings>,
        reporter: Arc<dyn ErrorReporter>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            service,
            capabilities,
            settings,
            reporter,
            notifier,
        }
    }

    pub async fn upload(&self, files: Vec<OutboundAttachment>) -> UploadOutcome {
        if files.is_empty() {
            return UploadOutcome::succeeded(Vec::new());
        }

        let upload_settings = self.settings.borrow().upload.clone();
        let now = Utc::now();

        // A failing read drops the sibling encodes still in flight.
        let encodes = files
            .iter()
            .enumerate()
            .map(|(index, file)| prepare_record(file, index, now, self.capabilities));
        let records = match try_join_all(encodes).await {
            Ok(records) => records,
            Err(err) => {
                let text = upload_settings.generic_failure_text.clone();
                return self.fail(err, text, &upload_settings).await;
            }
        };

        match self.service.upload(&records).await {
            Ok(items) => {
                info!("Uploaded {} attachment(s)", items.len());
                UploadOutcome::succeeded(items)
            }
            Err(err) => {
                let text = match &err {
                    AttachmentError::Endpoint(endpoint) if endpoint.server_message().is_some() => {
                        err.user_message()
                    }
                    _ => upload_settings.generic_failure_text.clone(),
                };
                self.fail(err, text, &upload_settings).await
            }
        }
    }

    async fn fail(
        &self,
        err: AttachmentError,
        text: String,
        upload_settings: &UploadSettings,
    ) -> UploadOutcome {
        debug!("Upload failed: {}", err);
        self.reporter
            .report(ErrorReport {
                context: "upload_attachments".to_string(),
                severity: Severity::Error,
                metadata: ErrorMetadata {
                    attachment_name: None,
                    raw_message: err.to_string(),
                    kind: err.kind(),
                },
            })
            .await;
        self.notifier
            .notify(Notification {
                title: text.clone(),
                duration: upload_settings.notification_duration,
            })
            .await;
        UploadOutcome::failed(text)
    }
}
