//! Where downloaded attachments live on disk.
//!
//! [`StorageLocator`] picks a writable download directory for the current
//! platform, and [`resolve_cache_slot`] maps an attachment onto a file inside
//! it, deciding whether that file can be reused.

mod cache;
mod capabilities;
mod error;
mod permission;
mod storage;

pub use cache::{CacheSlot, disambiguated_name, resolve_cache_slot, sanitize_filename};
pub use capabilities::{
    ANDROID_SCOPED_STORAGE_API_LEVEL, PlatformCapabilities, UNKNOWN_ANDROID_API_LEVEL,
};
pub use error::{StorageError, StorageResult};
pub use permission::{AlwaysGranted, PermissionGate, PermissionStatus};
pub use storage::{StorageLocator, StorageRoots};
