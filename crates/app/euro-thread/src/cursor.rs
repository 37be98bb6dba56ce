use serde::Serialize;

use crate::types::Pagination;

/// Which rule decided whether another page exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ContinuationRule {
    /// `page * page_size >= total_count` ends the list.
    CountBased,
    /// The response carried no total, so a short page ends the list.
    ShortPage,
}

/// Position reached in a paged list, derived from the last page received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCursor {
    pub page: u32,
    pub page_size: u32,
    pub total_count: Option<u64>,
    pub total_pages: Option<u32>,
    pub received: usize,
}

impl PageCursor {
    /// Build the cursor for a page that returned `received` items after being
    /// requested with `requested_page_size`.
    pub fn from_page(pagination: &Pagination, received: usize, requested_page_size: u32) -> Self {
        let page_size = pagination
            .page_size
            .filter(|size| *size > 0)
            .unwrap_or(requested_page_size);

        let total_pages = pagination.total_pages.or_else(|| {
            pagination
                .total_count
                .map(|total| total.div_ceil(u64::from(page_size.max(1))) as u32)
        });

        Self {
            page: pagination.page,
            page_size,
            total_count: pagination.total_count,
            total_pages,
            received,
        }
    }

    pub fn rule(&self) -> ContinuationRule {
        if self.total_count.is_some() {
            ContinuationRule::CountBased
        } else {
            ContinuationRule::ShortPage
        }
    }

    pub fn has_more(&self) -> bool {
        match (self.rule(), self.total_count) {
            (ContinuationRule::CountBased, Some(total)) => {
                u64::from(self.page) * u64::from(self.page_size) < total
            }
            _ => self.received > 0 && self.received >= self.page_size as usize,
        }
    }

    /// Page to request next, or `None` once the list is exhausted.
    pub fn next_page(&self) -> Option<u32> {
        self.has_more().then(|| self.page + 1)
    }
}
