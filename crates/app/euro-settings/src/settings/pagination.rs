use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationSettings {
    pub conversation_page_size: u32,
    pub message_page_size: u32,
}
