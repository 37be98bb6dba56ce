use std::{
    fs,
    io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use futures::{Stream, StreamExt};
use tokio::io::AsyncWriteExt;

/// Write atomically, creating all leading directories.
pub fn create_dirs_then_write<P: AsRef<Path>>(
    file_path: P,
    contents: impl AsRef<[u8]>,
) -> io::Result<()> {
    let file_path = file_path.as_ref();
    let parent_dir = parent_of(file_path)?;
    fs::create_dir_all(parent_dir)?;

    let temp_path = temp_path_in(parent_dir);
    fs::write(&temp_path, contents.as_ref())?;

    if let Err(err) = fs::rename(&temp_path, file_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    Ok(())
}

/// Drain `chunks` into `file_path`.
///
/// The bytes land in a hidden sibling file first and are only renamed onto
/// `file_path` once the stream has ended cleanly, so a failed transfer never
/// leaves a truncated file at the destination. Returns the number of bytes
/// written.
pub async fn write_stream_atomically<P, S, B, E>(file_path: P, chunks: S) -> io::Result<u64>
where
    P: AsRef<Path>,
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::error::Error + Send + Sync + 'static,
{
    let file_path = file_path.as_ref();
    let parent_dir = parent_of(file_path)?;
    tokio::fs::create_dir_all(parent_dir).await?;

    let temp_path = temp_path_in(parent_dir);
    match drain_into(&temp_path, chunks).await {
        Ok(written) => {
            if let Err(err) = tokio::fs::rename(&temp_path, file_path).await {
                remove_quietly(&temp_path).await;
                return Err(err);
            }
            Ok(written)
        }
        Err(err) => {
            remove_quietly(&temp_path).await;
            Err(err)
        }
    }
}

async fn drain_into<S, B, E>(temp_path: &Path, chunks: S) -> io::Result<u64>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut file = tokio::fs::File::options()
        .write(true)
        .create_new(true)
        .open(temp_path)
        .await?;
    let mut written = 0u64;

    let mut chunks = std::pin::pin!(chunks);
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(io::Error::other)?;
        let bytes = chunk.as_ref();
        file.write_all(bytes).await?;
        written += bytes.len() as u64;
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

async fn remove_quietly(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await
        && err.kind() != io::ErrorKind::NotFound
    {
        tracing::warn!("Failed to remove temporary file {}: {}", path.display(), err);
    }
}

fn parent_of(file_path: &Path) -> io::Result<&Path> {
    file_path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "File path has no parent directory",
        )
    })
}

static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Unique per call within the process, even when the clock does not advance.
fn temp_path_in(dir: &Path) -> PathBuf {
    let sequence = TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();

    let process_id = std::process::id();
    dir.join(format!(".tmp_{}_{}__{}", process_id, sequence, timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[derive(Debug)]
    struct Interrupted;

    impl std::fmt::Display for Interrupted {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "connection reset")
        }
    }

    impl std::error::Error for Interrupted {}

    fn entries(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }

    #[test]
    fn create_dirs_then_write_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("settings.json");

        create_dirs_then_write(&target, "{}\n").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "{}\n");
        assert_eq!(entries(target.parent().unwrap()).len(), 1);
    }

    #[tokio::test]
    async fn stream_is_renamed_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("report.pdf");
        let chunks = stream::iter(vec![
            Ok::<_, Interrupted>(b"hello ".to_vec()),
            Ok(b"world".to_vec()),
        ]);

        let written = write_stream_atomically(&target, chunks).await.unwrap();

        assert_eq!(written, 11);
        assert_eq!(fs::read(&target).unwrap(), b"hello world");
        assert_eq!(entries(dir.path()), vec![target]);
    }

    #[test]
    fn temp_paths_never_repeat() {
        let dir = Path::new("/downloads");

        let first = temp_path_in(dir);
        let second = temp_path_in(dir);

        assert_ne!(first, second);
        assert_eq!(first.parent(), Some(dir));
    }

    #[tokio::test]
    async fn concurrent_streams_into_one_dir_stay_separate() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.bin");
        let second = dir.path().join("b.bin");
        let chunks = |fill: u8| {
            stream::iter((0..64).map(move |_| Ok::<_, Interrupted>(vec![fill; 1024])))
        };

        let (a, b) = tokio::join!(
            write_stream_atomically(&first, chunks(b'a')),
            write_stream_atomically(&second, chunks(b'b')),
        );

        assert_eq!(a.unwrap(), 64 * 1024);
        assert_eq!(b.unwrap(), 64 * 1024);
        assert!(fs::read(&first).unwrap().iter().all(|&byte| byte == b'a'));
        assert!(fs::read(&second).unwrap().iter().all(|&byte| byte == b'b'));
        assert_eq!(entries(dir.path()).len(), 2);
    }

    #[tokio::test]
    async fn failed_stream_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("report.pdf");
        let chunks = stream::iter(vec![Ok(b"partial".to_vec()), Err(Interrupted)]);

        let err = write_stream_atomically(&target, chunks).await.unwrap_err();

        assert!(err.to_string().contains("connection reset"));
        assert!(!target.exists());
        assert!(entries(dir.path()).is_empty());
    }
}
