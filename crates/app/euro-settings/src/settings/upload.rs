use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadSettings {
    pub generic_failure_text: String,
    #[serde(with = "humantime_serde")]
    pub notification_duration: Duration,
}
