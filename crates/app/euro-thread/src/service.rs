use async_trait::async_trait;
use euro_endpoint::Endpoint;
use tokio::sync::watch;

use crate::{
    error::Result,
    types::{Conversation, ListConversationsRequest, ListMessagesRequest, Message, Page},
};

/// Remote listing of conversations and their messages.
#[async_trait]
pub trait ConversationService: Send + Sync {
    async fn list_conversations(
        &self,
        request: ListConversationsRequest,
    ) -> Result<Page<Conversation>>;

    async fn list_messages(&self, request: ListMessagesRequest) -> Result<Page<Message>>;
}

/// [`ConversationService`] over the REST API of whatever endpoint is current.
pub struct HttpConversationService {
    endpoint_rx: watch::Receiver<Endpoint>,
}

impl HttpConversationService {
    pub fn new(endpoint_rx: watch::Receiver<Endpoint>) -> Self {
        Self { endpoint_rx }
    }

    fn endpoint(&self) -> Endpoint {
        self.endpoint_rx.borrow().clone()
    }
}

#[async_trait]
impl ConversationService for HttpConversationService {
    async fn list_conversations(
        &self,
        request: ListConversationsRequest,
    ) -> Result<Page<Conversation>> {
        let endpoint = self.endpoint();
        let url = endpoint.url(&["conversations"])?;

        let mut query = vec![
            ("page", request.page.to_string()),
            ("pageSize", request.page_size.to_string()),
        ];
        if let Some(search) = request.search {
            query.push(("search", search));
        }

        Ok(endpoint.get_json(url, &query).await?)
    }

    async fn list_messages(&self, request: ListMessagesRequest) -> Result<Page<Message>> {
        let endpoint = self.endpoint();
        let url = endpoint.url(&["conversations", &request.conversation_id, "messages"])?;

        let query = [
            ("page", request.page.to_string()),
            ("pageSize", request.page_size.to_string()),
        ];

        Ok(endpoint.get_json(url, &query).await?)
    }
}
