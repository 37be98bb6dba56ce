use std::{path::PathBuf, sync::Arc};

use dashmap::{DashMap, mapref::entry::Entry};
use euro_settings::SyncSettings;
use euro_storage::{StorageLocator, resolve_cache_slot};
use euro_thread::Attachment;
use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    AttachmentError, AttachmentResult, AttachmentService, DownloadOutcome, ErrorReporter,
    Notification, Notifier, ShareSurface,
    report::{ErrorMetadata, ErrorReport, Severity},
};

type InFlight = Shared<BoxFuture<'static, DownloadOutcome>>;

/// Resolves, caches and fetches incoming attachments, then offers them to the
/// share surface.
///
/// At most one download per attachment id runs at a time; later requests for
/// the same id wait on the one already running.
#[derive(Clone)]
pub struct DownloadManager {
    inner: Arc<Inner>,
}

struct Inner {
    service: Arc<dyn AttachmentService>,
    locator: StorageLocator,
    share: Arc<dyn ShareSurface>,
    reporter: Arc<dyn ErrorReporter>,
    notifier: Arc<dyn Notifier>,
    settings: watch::Receiver<SyncSettings>,
    in_flight: DashMap<String, InFlight>,
}

impl DownloadManager {
    pub fn new(
        service: Arc<dyn AttachmentService>,
        locator: StorageLocator,
        share: Arc<dyn ShareSurface>,
        reporter: Arc<dyn ErrorReporter>,
        notifier: Arc<dyn Notifier>,
        settings: watch::Receiver<SyncSettings>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                service,
                locator,
                share,
                reporter,
                notifier,
                settings,
                in_flight: DashMap::new(),
            }),
        }
    }

    pub async fn download(&self, attachment: &Attachment) -> DownloadOutcome {
        let download = match self.inner.in_flight.entry(attachment.id.clone()) {
            Entry::Occupied(running) => {
                debug!("Joining download of {}", attachment.id);
                running.get().clone()
            }
            Entry::Vacant(slot) => {
                let inner = Arc::clone(&self.inner);
                let attachment = attachment.clone();
                let download = async move {
                    let outcome = inner.run(&attachment).await;
                    inner.in_flight.remove(&attachment.id);
                    outcome
                }
                .boxed()
                .shared();
                slot.insert(download.clone());
                download
            }
        };

        download.await
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.len()
    }
}

impl Inner {
    async fn run(&self, attachment: &Attachment) -> DownloadOutcome {
        match self.fetch(attachment).await {
            Ok(path) => DownloadOutcome::saved(path),
            Err(err) => {
                let message = err.download_message();
                self.report(attachment, &err, Severity::Error).await;
                let duration = self.settings.borrow().upload.notification_duration;
                self.notifier
                    .notify(Notification {
                        title: message.clone(),
                        duration,
                    })
                    .await;
                DownloadOutcome::failed(message)
            }
        }
    }

    async fn fetch(&self, attachment: &Attachment) -> AttachmentResult<PathBuf> {
        let ttl = self.settings.borrow().storage.cache_ttl;
        let dir = self.locator.resolve_download_dir().await?;
        let slot = resolve_cache_slot(
            &dir,
            &attachment.id,
            &attachment.original_filename,
            ttl,
        )
        .await?;

        if slot.hit {
            info!("Using cached {}", slot.path.display());
        } else {
            info!(
                "Downloading {} to {}",
                attachment.original_filename,
                slot.path.display()
            );
            self.service
                .transfer(&attachment.remote_url, &slot.path)
                .await?;
        }

        if self.locator.capabilities().native_share_available
            && let Err(err) = self.share.share(&slot.path, &attachment.mimetype).await
        {
            // The file is saved; a dismissed share sheet does not undo that.
            warn!("Share failed for {}: {}", slot.path.display(), err);
            self.report(attachment, &err, Severity::Warning).await;
        }

        Ok(slot.path)
    }

    async fn report(&self, attachment: &Attachment, err: &AttachmentError, severity: Severity) {
        self.reporter
            .report(ErrorReport {
                context: "download_attachment".to_string(),
                severity,
                metadata: ErrorMetadata {
                    attachment_name: Some(attachment.original_filename.clone()),
                    raw_message: err.to_string(),
                    kind: err.kind(),
                },
            })
            .await;
    }
}
