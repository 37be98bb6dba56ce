use serde::{Deserialize, Serialize};

mod error;
mod json;
mod persistence;
mod settings;
mod watch;

pub use error::{Error, Result};
pub use settings::{
    ApiSettings, PaginationSettings, StorageSettings, TelemetrySettings, UploadSettings,
};
pub use watch::{SETTINGS_FILE, SettingsWithDiskSync};

/// Everything the sync engine reads from configuration.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
    pub api: ApiSettings,
    pub pagination: PaginationSettings,
    pub storage: StorageSettings,
    pub upload: UploadSettings,
    pub telemetry: TelemetrySettings,
}

impl SyncSettings {
    pub fn validate(&self) -> Result<()> {
        if self.api.endpoint.trim().is_empty() {
            return Err(Error::Invalid("api.endpoint must not be empty".to_string()));
        }

        if self.pagination.conversation_page_size == 0 {
            return Err(Error::Invalid(
                "pagination.conversationPageSize must be greater than 0".to_string(),
            ));
        }

        if self.pagination.message_page_size == 0 {
            return Err(Error::Invalid(
                "pagination.messagePageSize must be greater than 0".to_string(),
            ));
        }

        if self.storage.cache_ttl.is_zero() {
            return Err(Error::Invalid(
                "storage.cacheTtl must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
