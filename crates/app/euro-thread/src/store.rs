use std::{collections::HashSet, fmt::Debug, future::Future, hash::Hash, sync::Arc};

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    cursor::PageCursor,
    error::{Result, ThreadError},
    types::{Page, PageItem, Pagination},
};

/// What a caller needs to render one paged list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedSnapshot<T> {
    pub items: Vec<T>,
    pub cursor: Option<PageCursor>,
    pub last_error: Option<String>,
}

impl<T> PagedSnapshot<T> {
    pub fn has_more(&self) -> bool {
        self.cursor.is_none_or(|cursor| cursor.has_more())
    }

    pub fn next_page(&self) -> Option<u32> {
        match &self.cursor {
            None => Some(1),
            Some(cursor) => cursor.next_page(),
        }
    }
}

struct PagedEntry<T> {
    items: Vec<T>,
    seen: HashSet<String>,
    cursor: Option<PageCursor>,
    last_error: Option<String>,
}

impl<T> Default for PagedEntry<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
            cursor: None,
            last_error: None,
        }
    }
}

impl<T: PageItem + Clone> PagedEntry<T> {
    fn next_page(&self) -> Option<u32> {
        match &self.cursor {
            None => Some(1),
            Some(cursor) => cursor.next_page(),
        }
    }

    fn push(&mut self, item: T) -> bool {
        if !self.seen.insert(item.item_id().to_owned()) {
            return false;
        }
        self.items.push(item);
        true
    }

    fn merge(&mut self, requested_page: u32, page_size: u32, page: Page<T>) {
        // A server echoing an older page number must not rewind the cursor.
        let pagination = Pagination {
            page: page.pagination.page.max(requested_page),
            ..page.pagination
        };
        let received = page.data.len();

        for item in page.data {
            self.push(item);
        }
        self.cursor = Some(PageCursor::from_page(&pagination, received, page_size));
        self.last_error = None;
    }

    fn snapshot(&self) -> PagedSnapshot<T> {
        PagedSnapshot {
            items: self.items.clone(),
            cursor: self.cursor,
            last_error: self.last_error.clone(),
        }
    }
}

/// Keyed store of merged pages.
///
/// Every key owns its own entry (items, cursor, last error) behind an async
/// mutex that is held for the whole fetch, so two continuations for the same
/// key never request the same page twice. Different keys never contend.
pub struct PagedStore<K, T> {
    entries: DashMap<K, Arc<Mutex<PagedEntry<T>>>>,
}

impl<K, T> Default for PagedStore<K, T>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<K, T> PagedStore<K, T>
where
    K: Eq + Hash + Clone + Debug,
    T: PageItem + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, key: &K) -> Arc<Mutex<PagedEntry<T>>> {
        if let Some(entry) = self.entries.get(key) {
            return Arc::clone(entry.value());
        }
        Arc::clone(self.entries.entry(key.clone()).or_default().value())
    }

    /// Fetch the page after the last one received and merge it in.
    ///
    /// `fetch` is called with `(page, page_size)`. When the list is already
    /// exhausted nothing is requested and the current snapshot is returned.
    pub async fn fetch_next<F, Fut>(
        &self,
        key: &K,
        page_size: u32,
        fetch: F,
    ) -> Result<PagedSnapshot<T>>
    where
        F: FnOnce(u32, u32) -> Fut,
        Fut: Future<Output = Result<Page<T>>>,
    {
        let entry = self.entry(key);
        let mut entry = entry.lock().await;
        advance(&mut *entry, key, page_size, fetch).await?;
        Ok(entry.snapshot())
    }

    /// Like [`Self::fetch_next`], but only if the entry is still at `seen`.
    ///
    /// A caller that fires twice for the same end of list passes the cursor it
    /// rendered; the second call finds the store already moved on and returns
    /// the snapshot without fetching.
    pub async fn fetch_next_after<F, Fut>(
        &self,
        key: &K,
        seen: Option<&PageCursor>,
        page_size: u32,
        fetch: F,
    ) -> Result<PagedSnapshot<T>>
    where
        F: FnOnce(u32, u32) -> Fut,
        Fut: Future<Output = Result<Page<T>>>,
    {
        let entry = self.entry(key);
        let mut entry = entry.lock().await;
        if entry.cursor.as_ref() != seen {
            debug!("{:?} already advanced past the given cursor", key);
            return Ok(entry.snapshot());
        }
        advance(&mut *entry, key, page_size, fetch).await?;
        Ok(entry.snapshot())
    }

    /// Refetch page 1 and replace the entry with it.
    ///
    /// On failure the previously merged pages stay visible with the error
    /// recorded next to them.
    pub async fn refresh<F, Fut>(&self, key: &K, page_size: u32, fetch: F) -> Result<PagedSnapshot<T>>
    where
        F: FnOnce(u32, u32) -> Fut,
        Fut: Future<Output = Result<Page<T>>>,
    {
        if page_size == 0 {
            return Err(ThreadError::InvalidPageSize(page_size));
        }

        let entry = self.entry(key);
        let mut entry = entry.lock().await;
        debug!("Refreshing {:?}", key);

        match fetch(1, page_size).await {
            Ok(page) => {
                let mut fresh = PagedEntry::default();
                fresh.merge(1, page_size, page);
                *entry = fresh;
                Ok(entry.snapshot())
            }
            Err(err) => {
                warn!("Refreshing {:?} failed: {}", key, err);
                entry.last_error = Some(err.display_message());
                Err(err)
            }
        }
    }

    pub async fn snapshot(&self, key: &K) -> Option<PagedSnapshot<T>> {
        let entry = self.entries.get(key).map(|entry| Arc::clone(entry.value()))?;
        let entry = entry.lock().await;
        Some(entry.snapshot())
    }

    /// Append a locally created item to a loaded entry. The cursor is left
    /// untouched. Returns `false` if the key was never loaded or the id is
    /// already present.
    pub async fn append(&self, key: &K, item: T) -> bool {
        let Some(entry) = self.entries.get(key).map(|entry| Arc::clone(entry.value())) else {
            return false;
        };
        let mut entry = entry.lock().await;
        entry.push(item)
    }
}

async fn advance<K, T, F, Fut>(
    entry: &mut PagedEntry<T>,
    key: &K,
    page_size: u32,
    fetch: F,
) -> Result<()>
where
    K: Debug,
    T: PageItem + Clone,
    F: FnOnce(u32, u32) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    if page_size == 0 {
        return Err(ThreadError::InvalidPageSize(page_size));
    }

    let Some(page) = entry.next_page() else {
        debug!("{:?} has no further pages", key);
        return Ok(());
    };

    debug!("Fetching page {} of {:?} (page size {})", page, key, page_size);
    match fetch(page, page_size).await {
        Ok(response) => {
            entry.merge(page, page_size, response);
            Ok(())
        }
        Err(err) => {
            warn!("Fetching page {} of {:?} failed: {}", page, key, err);
            entry.last_error = Some(err.display_message());
            Err(err)
        }
    }
}
