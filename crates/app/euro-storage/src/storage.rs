use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, warn};

use crate::{
    PermissionGate, PermissionStatus, PlatformCapabilities, StorageError, StorageResult,
};

/// The two places downloads may end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRoots {
    /// Platform downloads directory, if the platform has one.
    pub public_downloads: Option<PathBuf>,
    /// App-private directory that is always writable.
    pub private_dir: PathBuf,
}

impl StorageRoots {
    pub fn new(public_downloads: Option<PathBuf>, private_dir: impl Into<PathBuf>) -> Self {
        Self {
            public_downloads,
            private_dir: private_dir.into(),
        }
    }

    pub fn from_system(app_dir_name: &str) -> StorageResult<Self> {
        let private_dir = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or(StorageError::NoPrivateDir)?
            .join(app_dir_name)
            .join("downloads");

        Ok(Self {
            public_downloads: dirs::download_dir(),
            private_dir,
        })
    }
}

#[derive(Clone)]
pub struct StorageLocator {
    roots: StorageRoots,
    folder_name: String,
    capabilities: PlatformCapabilities,
    permission: Arc<dyn PermissionGate>,
}

impl StorageLocator {
    pub fn new(
        roots: StorageRoots,
        folder_name: impl Into<String>,
        capabilities: PlatformCapabilities,
        permission: Arc<dyn PermissionGate>,
    ) -> Self {
        Self {
            roots,
            folder_name: folder_name.into(),
            capabilities,
            permission,
        }
    }

    pub fn capabilities(&self) -> PlatformCapabilities {
        self.capabilities
    }

    /// Directory downloads should be written to.
    ///
    /// Prefers `<public downloads>/<folder>`; anything that prevents using it
    /// (denied consent, no public directory, failure creating the folder)
    /// falls back to the private directory. Only a failing permission prompt
    /// or an unusable private directory is an error.
    pub async fn resolve_download_dir(&self) -> StorageResult<PathBuf> {
        if self.capabilities.needs_explicit_permission {
            let status = self.permission.request_storage_access().await?;
            if status == PermissionStatus::Denied {
                debug!("Storage permission denied; using private directory");
                return self.private_dir().await;
            }
        }

        let Some(public_downloads) = &self.roots.public_downloads else {
            debug!("No public downloads directory; using private directory");
            return self.private_dir().await;
        };

        let folder = public_downloads.join(&self.folder_name);
        match ensure_dir(&folder).await {
            Ok(()) => Ok(folder),
            Err(err) => {
                warn!(
                    "Could not prepare download folder {}: {}; using private directory",
                    folder.display(),
                    err
                );
                self.private_dir().await
            }
        }
    }

    pub async fn private_dir(&self) -> StorageResult<PathBuf> {
        let dir = self.roots.private_dir.clone();
        ensure_dir(&dir)
            .await
            .map_err(|source| StorageError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        Ok(dir)
    }
}

async fn ensure_dir(dir: &Path) -> io::Result<()> {
    match tokio::fs::create_dir_all(dir).await {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
        Err(err) => return Err(err),
    }

    // A regular file squatting on the folder name is not a usable directory.
    if !tokio::fs::metadata(dir).await?.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} exists and is not a directory", dir.display()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::AlwaysGranted;

    struct ScriptedGate {
        answer: Option<PermissionStatus>,
        asked: AtomicUsize,
    }

    impl ScriptedGate {
        fn new(answer: Option<PermissionStatus>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                asked: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PermissionGate for ScriptedGate {
        async fn request_storage_access(&self) -> StorageResult<PermissionStatus> {
            self.asked.fetch_add(1, Ordering::SeqCst);
            self.answer
                .ok_or_else(|| StorageError::permission("prompt dismissed by activity"))
        }
    }

    fn roots(base: &Path) -> StorageRoots {
        StorageRoots::new(Some(base.join("Downloads")), base.join("private"))
    }

    #[tokio::test]
    async fn desktop_uses_public_subfolder_without_asking() {
        let tmp = tempfile::tempdir().unwrap();
        let gate = ScriptedGate::new(Some(PermissionStatus::Denied));
        let locator = StorageLocator::new(
            roots(tmp.path()),
            "Eurora",
            PlatformCapabilities::desktop(),
            gate.clone(),
        );

        let dir = locator.resolve_download_dir().await.unwrap();

        assert_eq!(dir, tmp.path().join("Downloads").join("Eurora"));
        assert!(dir.is_dir());
        assert_eq!(gate.asked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn existing_folder_is_reused() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("Downloads").join("Eurora")).unwrap();
        let locator = StorageLocator::new(
            roots(tmp.path()),
            "Eurora",
            PlatformCapabilities::desktop(),
            Arc::new(AlwaysGranted),
        );

        let first = locator.resolve_download_dir().await.unwrap();
        let second = locator.resolve_download_dir().await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn denied_permission_falls_back_to_private_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let gate = ScriptedGate::new(Some(PermissionStatus::Denied));
        let locator = StorageLocator::new(
            roots(tmp.path()),
            "Eurora",
            PlatformCapabilities::android(28),
            gate.clone(),
        );

        let dir = locator.resolve_download_dir().await.unwrap();

        assert_eq!(dir, tmp.path().join("private"));
        assert!(dir.is_dir());
        assert_eq!(gate.asked.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn granted_permission_uses_public_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let locator = StorageLocator::new(
            roots(tmp.path()),
            "Eurora",
            PlatformCapabilities::android(28),
            ScriptedGate::new(Some(PermissionStatus::Granted)),
        );

        let dir = locator.resolve_download_dir().await.unwrap();

        assert_eq!(dir, tmp.path().join("Downloads").join("Eurora"));
    }

    #[tokio::test]
    async fn failing_prompt_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let locator = StorageLocator::new(
            roots(tmp.path()),
            "Eurora",
            PlatformCapabilities::android(26),
            ScriptedGate::new(None),
        );

        let err = locator.resolve_download_dir().await.unwrap_err();

        assert!(err.is_permission());
    }

    #[tokio::test]
    async fn folder_creation_failure_falls_back_to_private_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let downloads = tmp.path().join("Downloads");
        std::fs::create_dir_all(&downloads).unwrap();
        std::fs::write(downloads.join("Eurora"), b"not a directory").unwrap();

        let locator = StorageLocator::new(
            roots(tmp.path()),
            "Eurora",
            PlatformCapabilities::desktop(),
            Arc::new(AlwaysGranted),
        );

        let dir = locator.resolve_download_dir().await.unwrap();

        assert_eq!(dir, tmp.path().join("private"));
    }

    #[tokio::test]
    async fn missing_public_dir_uses_private_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let locator = StorageLocator::new(
            StorageRoots::new(None, tmp.path().join("private")),
            "Eurora",
            PlatformCapabilities::ios(true),
            Arc::new(AlwaysGranted),
        );

        let dir = locator.resolve_download_dir().await.unwrap();

        assert_eq!(dir, tmp.path().join("private"));
    }
}
