use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use tracing::debug;

use crate::StorageResult;

/// Where an attachment lives locally and whether that file can be used as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSlot {
    pub path: PathBuf,
    pub hit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Freshness {
    Missing,
    Fresh,
    Expired,
}

/// Reduce a server-declared filename to one safe path component.
///
/// Directory parts are dropped, reserved characters replaced, and names that
/// would escape the directory (`..`) rejected.
pub fn sanitize_filename(declared: &str) -> Option<String> {
    let last = declared
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if last.is_empty() || last == "." || last == ".." {
        return None;
    }

    let cleaned: String = last
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    Some(cleaned)
}

/// Fresh name used once the plain filename has expired: the attachment id is
/// spliced in before the extension, so the result is stable per attachment.
pub fn disambiguated_name(filename: &str, attachment_id: &str) -> String {
    let tag: String = attachment_id
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(12)
        .collect();
    let tag = if tag.is_empty() { "copy".to_string() } else { tag };

    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            format!("{stem}-{tag}.{ext}")
        }
        _ => format!("{filename}-{tag}"),
    }
}

/// Compute the cache path for an attachment inside `dir`.
///
/// Every attachment owns the folder `dir/<attachment id>`, so attachments that
/// share a declared filename never share a file. Inside that folder the
/// declared filename is the cache key. A fresh file under that name is a hit.
/// Once it is older than `ttl`, the attachment moves to its
/// [`disambiguated_name`], which is itself a hit while fresh and otherwise
/// gets downloaded again.
pub async fn resolve_cache_slot(
    dir: &Path,
    attachment_id: &str,
    declared_filename: &str,
    ttl: Duration,
) -> StorageResult<CacheSlot> {
    let dir = dir.join(attachment_folder(attachment_id));
    let filename = sanitize_filename(declared_filename)
        .unwrap_or_else(|| disambiguated_name("attachment", attachment_id));
    let primary = dir.join(&filename);

    match freshness(&primary, ttl).await? {
        Freshness::Fresh => {
            return Ok(CacheSlot {
                path: primary,
                hit: true,
            });
        }
        Freshness::Missing => {
            return Ok(CacheSlot {
                path: primary,
                hit: false,
            });
        }
        Freshness::Expired => {
            debug!("Cached file {} expired", primary.display());
        }
    }

    let alternate = dir.join(disambiguated_name(&filename, attachment_id));
    let hit = freshness(&alternate, ttl).await? == Freshness::Fresh;
    Ok(CacheSlot {
        path: alternate,
        hit,
    })
}

fn attachment_folder(attachment_id: &str) -> String {
    sanitize_filename(attachment_id)
        .filter(|folder| !folder.starts_with('.'))
        .unwrap_or_else(|| disambiguated_name("attachment", attachment_id))
}

async fn freshness(path: &Path, ttl: Duration) -> StorageResult<Freshness> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Freshness::Missing),
        Err(err) => return Err(err.into()),
    };

    if !metadata.is_file() {
        return Ok(Freshness::Expired);
    }

    // Timestamps in the future or unsupported by the filesystem count as fresh.
    let expired = metadata
        .modified()
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|age| age > ttl);

    Ok(if expired {
        Freshness::Expired
    } else {
        Freshness::Fresh
    })
}
