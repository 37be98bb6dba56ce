use async_trait::async_trait;

use crate::StorageResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Runtime storage-consent prompt provided by the host shell.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    async fn request_storage_access(&self) -> StorageResult<PermissionStatus>;
}

/// For platforms where public downloads never need consent.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysGranted;

#[async_trait]
impl PermissionGate for AlwaysGranted {
    async fn request_storage_access(&self) -> StorageResult<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }
}
