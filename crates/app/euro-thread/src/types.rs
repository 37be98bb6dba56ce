use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anything that can be merged into a paged list. Items are de-duplicated by id.
pub trait PageItem {
    fn item_id(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
}

impl PageItem for Conversation {
    fn item_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Source reference attached to an assistant reply. Carried as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

/// A file the server already holds, as referenced by a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub object_path: String,
    pub original_filename: String,
    pub mimetype: String,
    pub size: u64,
    #[serde(alias = "url")]
    pub remote_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

impl PageItem for Message {
    fn item_id(&self) -> &str {
        &self.id
    }
}

/// Pagination block of a list response. Only `page` is always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    #[serde(default, alias = "limit")]
    pub page_size: Option<u32>,
    #[serde(default, alias = "total")]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListConversationsRequest {
    pub page: u32,
    pub page_size: u32,
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListMessagesRequest {
    pub conversation_id: String,
    pub page: u32,
    pub page_size: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_page_parses_with_optional_fields_missing() {
        let page: Page<Message> = serde_json::from_value(serde_json::json!({
            "data": [{
                "id": "m1",
                "role": "assistant",
                "content": "Here you go",
                "createdAt": "2026-03-01T10:00:00Z",
                "attachments": [{
                    "id": "a1",
                    "objectPath": "uploads/a1",
                    "originalFilename": "report.pdf",
                    "mimetype": "application/pdf",
                    "size": 2048,
                    "url": "https://cdn.example.com/a1"
                }],
                "citations": [{"title": "Source", "unknown": 1}]
            }],
            "pagination": {"page": 1, "limit": 30}
        }))
        .unwrap();

        let message = &page.data[0];
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.conversation_id, None);
        assert_eq!(message.attachments[0].remote_url, "https://cdn.example.com/a1");
        assert_eq!(message.citations[0].title.as_deref(), Some("Source"));
        assert_eq!(page.pagination.page_size, Some(30));
        assert_eq!(page.pagination.total_count, None);
    }

    #[test]
    fn conversation_page_reads_totals() {
        let page: Page<Conversation> = serde_json::from_value(serde_json::json!({
            "data": [{
                "id": "c1",
                "createdAt": "2026-03-01T10:00:00Z",
                "updatedAt": "2026-03-02T10:00:00Z"
            }],
            "pagination": {"page": 2, "pageSize": 10, "totalCount": 37, "totalPages": 4}
        }))
        .unwrap();

        assert_eq!(page.data[0].title, None);
        assert_eq!(page.pagination.total_count, Some(37));
        assert_eq!(page.pagination.total_pages, Some(4));
    }
}
