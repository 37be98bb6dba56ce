use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiSettings {
    /// Base URL every conversation and attachment request is resolved against.
    pub endpoint: String,
}
