use std::path::PathBuf;

use euro_thread::Attachment;
use serde::{Deserialize, Serialize};

/// A file the user picked for sending. Lives for one upload call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundAttachment {
    pub local_uri: String,
    pub name: Option<String>,
    pub mime_type: Option<String>,
    pub size_bytes: Option<u64>,
    /// Content already base64-encoded by the picker.
    pub inline_data: Option<String>,
}

impl OutboundAttachment {
    pub fn from_uri(local_uri: impl Into<String>) -> Self {
        Self {
            local_uri: local_uri.into(),
            ..Default::default()
        }
    }
}

/// One entry of the upload request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRecord {
    pub original_filename: String,
    pub mimetype: String,
    pub size: u64,
    pub encoded_content: String,
    pub source_uri: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct UploadRequest<'a> {
    pub attachments: &'a [AttachmentRecord],
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    pub data: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub items: Vec<Attachment>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
}

impl UploadOutcome {
    pub fn succeeded(items: Vec<Attachment>) -> Self {
        Self {
            items,
            success: true,
            error_text: None,
        }
    }

    pub fn failed(error_text: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            success: false,
            error_text: Some(error_text.into()),
        }
    }
}

/// Result of a download: exactly one of the two fields is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadOutcome {
    pub local_path: Option<PathBuf>,
    pub error: Option<String>,
}

impl DownloadOutcome {
    pub fn saved(local_path: PathBuf) -> Self {
        Self {
            local_path: Some(local_path),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            local_path: None,
            error: Some(error.into()),
        }
    }

    pub fn is_saved(&self) -> bool {
        self.local_path.is_some()
    }
}
