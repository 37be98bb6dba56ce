use std::sync::Arc;

use tracing::debug;

use crate::{
    cursor::PageCursor,
    error::{Result, ThreadError},
    service::ConversationService,
    store::{PagedSnapshot, PagedStore},
    types::{Conversation, ListConversationsRequest, ListMessagesRequest, Message},
};

/// Cache key of a conversation list: the query as first issued.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationQuery {
    pub search: Option<String>,
    pub page_size: u32,
}

impl ConversationQuery {
    /// Blank searches are the same list as no search.
    pub fn new(search: Option<&str>, page_size: u32) -> Self {
        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Self { search, page_size }
    }
}

/// Cache key of one conversation's message history.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageQuery {
    pub conversation_id: String,
    pub page_size: u32,
}

impl MessageQuery {
    pub fn new(conversation_id: impl Into<String>, page_size: u32) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            page_size,
        }
    }
}

/// Loaded conversation lists and message histories.
///
/// Owned by whoever drives the UI and handed to [`ThreadManager`], so it can
/// be shared or dropped independently of the remote service.
#[derive(Default)]
pub struct ConversationCache {
    conversations: PagedStore<ConversationQuery, Conversation>,
    messages: PagedStore<MessageQuery, Message>,
}

impl ConversationCache {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct ThreadManager {
    service: Arc<dyn ConversationService>,
    cache: Arc<ConversationCache>,
}

impl ThreadManager {
    pub fn new(service: Arc<dyn ConversationService>, cache: Arc<ConversationCache>) -> Self {
        Self { service, cache }
    }

    /// Load the next page of `query`, requested with `page_size` (the size
    /// configured right now, not the one the query started with).
    pub async fn fetch_next_conversations(
        &self,
        query: &ConversationQuery,
        page_size: u32,
    ) -> Result<PagedSnapshot<Conversation>> {
        let service = Arc::clone(&self.service);
        let search = query.search.clone();
        self.cache
            .conversations
            .fetch_next(query, page_size, move |page, page_size| async move {
                service
                    .list_conversations(ListConversationsRequest {
                        page,
                        page_size,
                        search,
                    })
                    .await
            })
            .await
    }

    /// Load the next page only if the list is still at `seen`.
    pub async fn fetch_conversations_after(
        &self,
        query: &ConversationQuery,
        seen: Option<&PageCursor>,
        page_size: u32,
    ) -> Result<PagedSnapshot<Conversation>> {
        let service = Arc::clone(&self.service);
        let search = query.search.clone();
        self.cache
            .conversations
            .fetch_next_after(query, seen, page_size, move |page, page_size| async move {
                service
                    .list_conversations(ListConversationsRequest {
                        page,
                        page_size,
                        search,
                    })
                    .await
            })
            .await
    }

    pub async fn refresh_conversations(
        &self,
        query: &ConversationQuery,
        page_size: u32,
    ) -> Result<PagedSnapshot<Conversation>> {
        let service = Arc::clone(&self.service);
        let search = query.search.clone();
        self.cache
            .conversations
            .refresh(query, page_size, move |page, page_size| async move {
                service
                    .list_conversations(ListConversationsRequest {
                        page,
                        page_size,
                        search,
                    })
                    .await
            })
            .await
    }

    pub async fn conversations(
        &self,
        query: &ConversationQuery,
    ) -> Option<PagedSnapshot<Conversation>> {
        self.cache.conversations.snapshot(query).await
    }

    pub async fn fetch_next_messages(
        &self,
        query: &MessageQuery,
        page_size: u32,
    ) -> Result<PagedSnapshot<Message>> {
        validate(query)?;
        let service = Arc::clone(&self.service);
        let conversation_id = query.conversation_id.clone();
        self.cache
            .messages
            .fetch_next(query, page_size, move |page, page_size| async move {
                service
                    .list_messages(ListMessagesRequest {
                        conversation_id,
                        page,
                        page_size,
                    })
                    .await
            })
            .await
    }

    pub async fn fetch_messages_after(
        &self,
        query: &MessageQuery,
        seen: Option<&PageCursor>,
        page_size: u32,
    ) -> Result<PagedSnapshot<Message>> {
        validate(query)?;
        let service = Arc::clone(&self.service);
        let conversation_id = query.conversation_id.clone();
        self.cache
            .messages
            .fetch_next_after(query, seen, page_size, move |page, page_size| async move {
                service
                    .list_messages(ListMessagesRequest {
                        conversation_id,
                        page,
                        page_size,
                    })
                    .await
            })
            .await
    }

    pub async fn refresh_messages(
        &self,
        query: &MessageQuery,
        page_size: u32,
    ) -> Result<PagedSnapshot<Message>> {
        validate(query)?;
        let service = Arc::clone(&self.service);
        let conversation_id = query.conversation_id.clone();
        self.cache
            .messages
            .refresh(query, page_size, move |page, page_size| async move {
                service
                    .list_messages(ListMessagesRequest {
                        conversation_id,
                        page,
                        page_size,
                    })
                    .await
            })
            .await
    }

    pub async fn messages(&self, query: &MessageQuery) -> Option<PagedSnapshot<Message>> {
        self.cache.messages.snapshot(query).await
    }

    /// Add a message sent from this client to an already loaded history.
    pub async fn append_message(&self, query: &MessageQuery, message: Message) -> bool {
        let appended = self.cache.messages.append(query, message).await;
        if !appended {
            debug!(
                "Message not appended to conversation {}",
                query.conversation_id
            );
        }
        appended
    }
}

fn validate(query: &MessageQuery) -> Result<()> {
    if query.conversation_id.trim().is_empty() {
        return Err(ThreadError::InvalidConversationId);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::types::{Page, Pagination, Role};

    #[derive(Default)]
    struct RecordingService {
        conversation_requests: Mutex<Vec<ListConversationsRequest>>,
        message_requests: Mutex<Vec<ListMessagesRequest>>,
    }

    fn conversation(id: String) -> Conversation {
        let at = Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap();
        Conversation {
            id,
            title: None,
            created_at: at,
            updated_at: at,
            last_message: None,
            last_message_at: None,
        }
    }

    fn message(id: &str) -> Message {
        Message {
            id: id.to_string(),
            role: Role::User,
            content: "hello".to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap(),
            conversation_id: Some("c1".to_string()),
            attachments: Vec::new(),
            citations: Vec::new(),
        }
    }

    #[async_trait]
    impl ConversationService for RecordingService {
        async fn list_conversations(
            &self,
            request: ListConversationsRequest,
        ) -> Result<Page<Conversation>> {
            let data = (0..request.page_size)
                .map(|i| conversation(format!("{}-{}", request.page, i)))
                .collect();
            let pagination = Pagination {
                page: request.page,
                page_size: Some(request.page_size),
                total_count: Some(100),
                total_pages: None,
            };
            self.conversation_requests.lock().unwrap().push(request);
            Ok(Page { data, pagination })
        }

        async fn list_messages(&self, request: ListMessagesRequest) -> Result<Page<Message>> {
            let pagination = Pagination {
                page: request.page,
                page_size: None,
                total_count: None,
                total_pages: None,
            };
            self.message_requests.lock().unwrap().push(request);
            Ok(Page {
                data: vec![message("m1"), message("m2")],
                pagination,
            })
        }
    }

    fn manager() -> (Arc<RecordingService>, ThreadManager) {
        let service = Arc::new(RecordingService::default());
        let manager = ThreadManager::new(service.clone(), Arc::new(ConversationCache::new()));
        (service, manager)
    }

    #[test]
    fn blank_search_is_no_search() {
        assert_eq!(
            ConversationQuery::new(Some("   "), 20),
            ConversationQuery::new(None, 20)
        );
        assert_eq!(
            ConversationQuery::new(Some(" tax "), 20).search.as_deref(),
            Some("tax")
        );
    }

    #[tokio::test]
    async fn search_and_current_page_size_reach_service() {
        let (service, manager) = manager();
        let query = ConversationQuery::new(Some("tax"), 20);

        manager.fetch_next_conversations(&query, 20).await.unwrap();
        let snapshot = manager.fetch_next_conversations(&query, 5).await.unwrap();

        let requests = service.conversation_requests.lock().unwrap().clone();
        assert_eq!(
            requests,
            vec![
                ListConversationsRequest {
                    page: 1,
                    page_size: 20,
                    search: Some("tax".to_string()),
                },
                ListConversationsRequest {
                    page: 2,
                    page_size: 5,
                    search: Some("tax".to_string()),
                },
            ]
        );
        assert_eq!(snapshot.items.len(), 25);
    }

    #[tokio::test]
    async fn different_searches_have_separate_lists() {
        let (_, manager) = manager();
        let tax = ConversationQuery::new(Some("tax"), 10);
        let all = ConversationQuery::new(None, 10);

        manager.fetch_next_conversations(&tax, 10).await.unwrap();
        manager.fetch_next_conversations(&tax, 10).await.unwrap();

        assert!(manager.conversations(&all).await.is_none());
        assert_eq!(manager.conversations(&tax).await.unwrap().items.len(), 20);
    }

    #[tokio::test]
    async fn message_history_and_local_append() {
        let (service, manager) = manager();
        let query = MessageQuery::new("c1", 30);

        let loaded = manager.fetch_next_messages(&query, 30).await.unwrap();
        assert!(!loaded.has_more());

        // Exhausted history is not requested again.
        manager.fetch_next_messages(&query, 30).await.unwrap();
        assert_eq!(service.message_requests.lock().unwrap().len(), 1);

        assert!(manager.append_message(&query, message("m3")).await);
        let snapshot = manager.messages(&query).await.unwrap();
        assert_eq!(
            snapshot
                .items
                .iter()
                .map(|m| m.id.as_str())
                .collect::<Vec<_>>(),
            ["m1", "m2", "m3"]
        );
    }

    #[tokio::test]
    async fn blank_conversation_id_is_rejected() {
        let (service, manager) = manager();

        let err = manager
            .fetch_next_messages(&MessageQuery::new(" ", 30), 30)
            .await
            .unwrap_err();

        assert!(matches!(err, ThreadError::InvalidConversationId));
        assert!(service.message_requests.lock().unwrap().is_empty());
    }
}
