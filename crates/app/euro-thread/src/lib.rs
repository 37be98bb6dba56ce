mod cursor;
mod error;
mod manager;
mod service;
mod store;
mod types;

pub use cursor::{ContinuationRule, PageCursor};
pub use error::{Result as ThreadResult, ThreadError};
pub use manager::{ConversationCache, ConversationQuery, MessageQuery, ThreadManager};
pub use service::{ConversationService, HttpConversationService};
pub use store::{PagedSnapshot, PagedStore};
pub use types::{
    Attachment, Citation, Conversation, ListConversationsRequest, ListMessagesRequest, Message,
    Page, PageItem, Pagination, Role,
};
