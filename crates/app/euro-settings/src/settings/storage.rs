use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StorageSettings {
    /// Name of the private per-app directory under the platform data dir.
    pub app_dir_name: String,
    /// Sub-folder created inside the public downloads directory.
    pub download_folder: String,
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,
}
