use std::sync::{Arc, Mutex};

use bon::bon;
use dashmap::DashMap;
use euro_assets::{
    AttachmentService, DownloadManager, DownloadOutcome, ErrorReporter, HttpAttachmentService,
    LogNotifier, LogShare, Notifier, OutboundAttachment, ShareSurface, TracingReporter,
    UploadOutcome, UploadPipeline,
};
use euro_endpoint::EndpointManager;
use euro_settings::SyncSettings;
use euro_storage::{PermissionGate, PlatformCapabilities, StorageLocator, StorageRoots};
use euro_thread::{
    Attachment, Conversation, ConversationCache, ConversationQuery, ConversationService,
    HttpConversationService, Message, MessageQuery, PageCursor, PagedSnapshot, ThreadManager,
    ThreadResult,
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::ClientResult;

/// Entry point for the UI: paged conversation lists and message histories,
/// attachment upload and download.
///
/// Page sizes and upload texts are read from the settings channel on every
/// call, so edits to `settings.json` apply to the next request.
pub struct SyncClient {
    threads: ThreadManager,
    uploads: UploadPipeline,
    downloads: DownloadManager,
    settings: watch::Receiver<SyncSettings>,
    active_search: Mutex<ConversationQuery>,
    message_queries: DashMap<String, MessageQuery>,
}

#[bon]
impl SyncClient {
    #[builder]
    pub fn new(
        conversations: Arc<dyn ConversationService>,
        attachments: Arc<dyn AttachmentService>,
        locator: StorageLocator,
        settings: watch::Receiver<SyncSettings>,
        #[builder(default)] cache: Arc<ConversationCache>,
        reporter: Option<Arc<dyn ErrorReporter>>,
        notifier: Option<Arc<dyn Notifier>>,
        share: Option<Arc<dyn ShareSurface>>,
    ) -> Self {
        let reporter: Arc<dyn ErrorReporter> = match reporter {
            Some(reporter) => reporter,
            None => Arc::new(TracingReporter),
        };
        let notifier: Arc<dyn Notifier> = match notifier {
            Some(notifier) => notifier,
            None => Arc::new(LogNotifier),
        };
        let share: Arc<dyn ShareSurface> = match share {
            Some(share) => share,
            None => Arc::new(LogShare),
        };
        let capabilities = locator.capabilities();
        let page_size = settings.borrow().pagination.conversation_page_size;

        Self {
            threads: ThreadManager::new(conversations, cache),
            uploads: UploadPipeline::new(
                Arc::clone(&attachments),
                capabilities,
                settings.clone(),
                Arc::clone(&reporter),
                Arc::clone(&notifier),
            ),
            downloads: DownloadManager::new(
                attachments,
                locator,
                share,
                reporter,
                notifier,
                settings.clone(),
            ),
            settings,
            active_search: Mutex::new(ConversationQuery::new(None, page_size)),
            message_queries: DashMap::new(),
        }
    }

    /// Wire the HTTP services, platform storage and settings together.
    pub fn connect(
        endpoint: &EndpointManager,
        settings: watch::Receiver<SyncSettings>,
        capabilities: PlatformCapabilities,
        permission: Arc<dyn PermissionGate>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> ClientResult<Self> {
        let storage = settings.borrow().storage.clone();
        let roots = StorageRoots::from_system(&storage.app_dir_name)?;
        let locator = StorageLocator::new(roots, storage.download_folder, capabilities, permission);
        info!("Connecting to {}", endpoint.current_url());

        Ok(Self::builder()
            .conversations(Arc::new(HttpConversationService::new(endpoint.subscribe())))
            .attachments(Arc::new(HttpAttachmentService::new(endpoint.subscribe())))
            .locator(locator)
            .settings(settings)
            .reporter(reporter)
            .build())
    }

    fn conversation_page_size(&self) -> u32 {
        self.settings.borrow().pagination.conversation_page_size
    }

    fn message_page_size(&self) -> u32 {
        self.settings.borrow().pagination.message_page_size
    }

    fn active_search(&self) -> ConversationQuery {
        match self.active_search.lock() {
            Ok(query) => query.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn message_query(&self, conversation_id: &str) -> MessageQuery {
        self.message_queries
            .entry(conversation_id.to_string())
            .or_insert_with(|| MessageQuery::new(conversation_id, self.message_page_size()))
            .clone()
    }

    /// Switch the conversation list to `search`. Lists already loaded for
    /// other searches stay cached.
    pub fn set_search(&self, search: Option<&str>) {
        let query = ConversationQuery::new(search, self.conversation_page_size());
        debug!("Conversation search set to {:?}", query.search);
        match self.active_search.lock() {
            Ok(mut active) => *active = query,
            Err(poisoned) => *poisoned.into_inner() = query,
        }
    }

    pub async fn fetch_next_conversation_page(&self) -> ThreadResult<PagedSnapshot<Conversation>> {
        let query = self.active_search();
        self.threads
            .fetch_next_conversations(&query, self.conversation_page_size())
            .await
    }

    /// Fetch the next conversation page only if the list is still at `seen`.
    pub async fn fetch_conversations_after(
        &self,
        seen: Option<&PageCursor>,
    ) -> ThreadResult<PagedSnapshot<Conversation>> {
        let query = self.active_search();
        self.threads
            .fetch_conversations_after(&query, seen, self.conversation_page_size())
            .await
    }

    pub async fn refresh_conversations(&self) -> ThreadResult<PagedSnapshot<Conversation>> {
        let query = self.active_search();
        self.threads
            .refresh_conversations(&query, self.conversation_page_size())
            .await
    }

    pub async fn conversations(&self) -> Option<PagedSnapshot<Conversation>> {
        self.threads.conversations(&self.active_search()).await
    }

    pub async fn fetch_next_message_page(
        &self,
        conversation_id: &str,
    ) -> ThreadResult<PagedSnapshot<Message>> {
        let query = self.message_query(conversation_id);
        self.threads
            .fetch_next_messages(&query, self.message_page_size())
            .await
    }

    pub async fn fetch_messages_after(
        &self,
        conversation_id: &str,
        seen: Option<&PageCursor>,
    ) -> ThreadResult<PagedSnapshot<Message>> {
        let query = self.message_query(conversation_id);
        self.threads
            .fetch_messages_after(&query, seen, self.message_page_size())
            .await
    }

    pub async fn refresh_messages(
        &self,
        conversation_id: &str,
    ) -> ThreadResult<PagedSnapshot<Message>> {
        let query = self.message_query(conversation_id);
        self.threads
            .refresh_messages(&query, self.message_page_size())
            .await
    }

    pub async fn messages(&self, conversation_id: &str) -> Option<PagedSnapshot<Message>> {
        let query = self.message_query(conversation_id);
        self.threads.messages(&query).await
    }

    pub async fn append_message(&self, conversation_id: &str, message: Message) -> bool {
        let query = self.message_query(conversation_id);
        self.threads.append_message(&query, message).await
    }

    pub async fn upload_attachments(&self, files: Vec<OutboundAttachment>) -> UploadOutcome {
        self.uploads.upload(files).await
    }

    pub async fn download_attachment(&self, attachment: &Attachment) -> DownloadOutcome {
        self.downloads.download(attachment).await
    }
}

/// Re-point `endpoint` whenever `api.endpoint` changes in the settings.
pub fn spawn_endpoint_follower(
    mut settings: watch::Receiver<SyncSettings>,
    endpoint: Arc<EndpointManager>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while settings.changed().await.is_ok() {
            let url = settings.borrow_and_update().api.endpoint.clone();
            if endpoint.current_url().trim_end_matches('/') == url.trim_end_matches('/') {
                continue;
            }
            if let Err(err) = endpoint.set_base_url(&url) {
                warn!("Ignoring endpoint setting {}: {}", url, err);
            }
        }
        debug!("Settings channel closed; endpoint follower stopped");
    })
}
