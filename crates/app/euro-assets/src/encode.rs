use std::{path::PathBuf, sync::LazyLock};

use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use chrono::{DateTime, SecondsFormat, Utc};
use euro_storage::PlatformCapabilities;
use percent_encoding::percent_decode_str;
use regex::Regex;
use tracing::debug;

use crate::{AttachmentError, AttachmentRecord, AttachmentResult, OutboundAttachment};

static TRAILING_FILENAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^/]+\.[A-Za-z0-9]+$").expect("filename pattern is valid"));

/// Name shown for an outbound file: the picker's name, else the last path
/// segment if it carries an extension, else a synthesized one.
pub fn display_name(
    attachment: &OutboundAttachment,
    index: usize,
    now: DateTime<Utc>,
    capabilities: PlatformCapabilities,
) -> String {
    if let Some(name) = attachment.name.as_deref().map(str::trim)
        && !name.is_empty()
    {
        return name.to_string();
    }

    if let Some(found) = TRAILING_FILENAME.find(&attachment.local_uri) {
        let name = found.as_str();
        if capabilities.percent_encoded_file_uris {
            return percent_decode_str(name).decode_utf8_lossy().into_owned();
        }
        return name.to_string();
    }

    format!(
        "file-{}-{}",
        now.to_rfc3339_opts(SecondsFormat::Millis, true),
        index
    )
}

pub fn mime_type(attachment: &OutboundAttachment, name: &str) -> String {
    attachment
        .mime_type
        .as_deref()
        .map(str::trim)
        .filter(|mime| !mime.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            mime_guess::from_path(name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        })
}

/// Filesystem path behind a local file URI.
pub fn local_path(uri: &str, capabilities: PlatformCapabilities) -> AttachmentResult<PathBuf> {
    let path = uri.strip_prefix("file://").unwrap_or(uri);
    if path.is_empty() {
        return Err(AttachmentError::invalid_location(uri));
    }

    if capabilities.percent_encoded_file_uris {
        let decoded = percent_decode_str(path)
            .decode_utf8()
            .map_err(|e| AttachmentError::invalid_location(format!("{uri}: {e}")))?;
        return Ok(PathBuf::from(decoded.as_ref()));
    }

    Ok(PathBuf::from(path))
}

/// Turn one outbound file into its transport record, reading and encoding the
/// file unless the picker already supplied the content.
pub async fn prepare_record(
    attachment: &OutboundAttachment,
    index: usize,
    now: DateTime<Utc>,
    capabilities: PlatformCapabilities,
) -> AttachmentResult<AttachmentRecord> {
    let original_filename = display_name(attachment, index, now, capabilities);
    let mimetype = mime_type(attachment, &original_filename);

    let (encoded_content, size) = match &attachment.inline_data {
        Some(encoded) => {
            let size = attachment
                .size_bytes
                .unwrap_or_else(|| decoded_len(encoded));
            (encoded.clone(), size)
        }
        None => {
            let path = local_path(&attachment.local_uri, capabilities)?;
            debug!("Encoding {}", path.display());
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|source| AttachmentError::Read {
                    path: path.clone(),
                    source,
                })?;
            (BASE64_STANDARD.encode(&bytes), bytes.len() as u64)
        }
    };

    Ok(AttachmentRecord {
        original_filename,
        mimetype,
        size,
        encoded_content,
        source_uri: attachment.local_uri.clone(),
    })
}

fn decoded_len(encoded: &str) -> u64 {
    let trimmed = encoded.trim_end();
    let padding = trimmed.bytes().rev().take_while(|b| *b == b'=').count();
    ((trimmed.len() / 4 * 3).saturating_sub(padding)) as u64
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 2, 8, 30, 0).unwrap()
    }

    #[test]
    fn name_comes_from_uri_segment() {
        let file = OutboundAttachment::from_uri("file:///tmp/abc/photo.jpg");
        assert_eq!(
            display_name(&file, 0, now(), PlatformCapabilities::desktop()),
            "photo.jpg"
        );
    }

    #[test]
    fn explicit_name_wins() {
        let file = OutboundAttachment {
            name: Some("Quarterly.xlsx".to_string()),
            ..OutboundAttachment::from_uri("file:///tmp/abc/photo.jpg")
        };
        assert_eq!(
            display_name(&file, 0, now(), PlatformCapabilities::desktop()),
            "Quarterly.xlsx"
        );
    }

    #[test]
    fn name_is_synthesized_without_extension() {
        let file = OutboundAttachment::from_uri("content://media/external/images/1234");
        assert_eq!(
            display_name(&file, 3, now(), PlatformCapabilities::desktop()),
            "file-2026-04-02T08:30:00.000Z-3"
        );
    }

    #[test]
    fn encoded_uri_names_are_decoded() {
        let file = OutboundAttachment::from_uri("file:///var/mobile/My%20Scan.pdf");
        assert_eq!(
            display_name(&file, 0, now(), PlatformCapabilities::ios(true)),
            "My Scan.pdf"
        );
        assert_eq!(
            local_path(&file.local_uri, PlatformCapabilities::ios(true)).unwrap(),
            PathBuf::from("/var/mobile/My Scan.pdf")
        );
        assert_eq!(
            local_path(&file.local_uri, PlatformCapabilities::desktop()).unwrap(),
            PathBuf::from("/var/mobile/My%20Scan.pdf")
        );
    }

    #[test]
    fn mime_is_guessed_from_name() {
        let file = OutboundAttachment::from_uri("file:///tmp/a.png");
        assert_eq!(mime_type(&file, "a.png"), "image/png");
        assert_eq!(mime_type(&file, "blob"), "application/octet-stream");
    }

    #[tokio::test]
    async fn reads_and_encodes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();
        let file = OutboundAttachment::from_uri(format!("file://{}", path.display()));

        let record = prepare_record(&file, 0, now(), PlatformCapabilities::desktop())
            .await
            .unwrap();

        assert_eq!(record.original_filename, "notes.txt");
        assert_eq!(record.mimetype, "text/plain");
        assert_eq!(record.size, 5);
        assert_eq!(record.encoded_content, "aGVsbG8=");
        assert_eq!(record.source_uri, file.local_uri);
    }

    #[tokio::test]
    async fn inline_content_skips_the_read() {
        let file = OutboundAttachment {
            inline_data: Some("aGVsbG8=".to_string()),
            ..OutboundAttachment::from_uri("file:///does/not/exist.txt")
        };

        let record = prepare_record(&file, 0, now(), PlatformCapabilities::desktop())
            .await
            .unwrap();

        assert_eq!(record.encoded_content, "aGVsbG8=");
        assert_eq!(record.size, 5);
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let file = OutboundAttachment::from_uri("file:///does/not/exist.txt");

        let err = prepare_record(&file, 0, now(), PlatformCapabilities::desktop())
            .await
            .unwrap_err();

        assert!(matches!(err, AttachmentError::Read { .. }));
    }
}
