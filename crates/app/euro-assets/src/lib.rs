//! Attachment transfers: batch upload of picked files, and cached downloads
//! handed off to the platform share surface.

mod download;
mod encode;
mod error;
mod report;
mod service;
mod share;
mod types;
mod upload;

pub use download::DownloadManager;
pub use encode::{display_name, local_path, mime_type, prepare_record};
pub use error::{AttachmentError, AttachmentResult, ErrorKind};
pub use report::{
    ErrorMetadata, ErrorReport, ErrorReporter, LogNotifier, Notification, Notifier,
    PosthogReporter, RecordingNotifier, RecordingReporter, Severity, TracingReporter,
};
pub use service::{AttachmentService, HttpAttachmentService};
pub use share::{LogShare, ShareSurface};
pub use types::{AttachmentRecord, DownloadOutcome, OutboundAttachment, UploadOutcome};
pub use upload::UploadPipeline;
