use std::time::Duration;

use super::index::IndexId;
use super::query::Query;

pub const DEFAULT_PAGE_SIZE: u64 = 500;
/// Default `index.max_result_window` of Elasticsearch, which also bounds scroll pages.
pub const MAX_PAGE_SIZE: u64 = 10_000;
pub const DEFAULT_CURSOR_TTL: Duration = Duration::from_secs(60);

/// Opaque handle on the server side state of a scan.
///
/// A cursor is neither `Clone` nor `Copy`: each advance hands out a new one,
/// and releasing it consumes the handle, so it cannot be released twice.
#[derive(Debug, PartialEq, Eq)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(id: impl Into<String>) -> Self {
        Cursor(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One batch of documents, along with the cursor to fetch the next one.
#[derive(Debug)]
pub struct Page<D> {
    pub documents: Vec<D>,
    pub cursor: Cursor,
}

/// First page of a scan, and the number of matching documents when the scan
/// was opened.
#[derive(Debug)]
pub struct ScrollStart<D> {
    pub page: Page<D>,
    pub total_hits: u64,
}

/// What to scan, and how.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub index: IndexId,
    pub query: Query,
    pub page_size: u64,
    pub cursor_ttl: Duration,
}

impl ScanRequest {
    pub fn new(index: IndexId, query: Query) -> Self {
        ScanRequest {
            index,
            query,
            page_size: DEFAULT_PAGE_SIZE,
            cursor_ttl: DEFAULT_CURSOR_TTL,
        }
    }

    pub fn with_page_size(self, page_size: u64) -> Self {
        ScanRequest { page_size, ..self }
    }

    pub fn with_cursor_ttl(self, cursor_ttl: Duration) -> Self {
        ScanRequest { cursor_ttl, ..self }
    }

    /// Number of pages needed to deliver `total_hits` documents.
    pub fn page_count(&self, total_hits: u64) -> u64 {
        if self.page_size == 0 {
            0
        } else {
            (total_hits + self.page_size - 1) / self.page_size
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// Every page was delivered.
    Completed,
    /// The sink asked to stop before the last page.
    Cancelled,
}

/// Summary of a scan that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub index: IndexId,
    pub status: ScanStatus,
    pub total_hits: u64,
    pub pages_expected: u64,
    pub pages_delivered: u64,
    pub documents_delivered: u64,
}
