use std::time::Duration;

/// Bytes per page, including header.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default capacity of the buffer pool, in pages.
pub const DEFAULT_PAGES: usize = 50;

/// Knobs shared by the buffer pool and the heap files it caches.
///
/// There is no process-wide page size: every component that needs it
/// gets it from the config it was constructed with.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub page_size: usize,
    pub buffer_pool_pages: usize,

    // A fresh deadline in [lock_wait_min, lock_wait_max) is drawn for
    // every page request.
    pub lock_wait_min: Duration,
    pub lock_wait_max: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            buffer_pool_pages: DEFAULT_PAGES,
            lock_wait_min: Duration::from_millis(0),
            lock_wait_max: Duration::from_millis(2000),
        }
    }
}

impl DatabaseConfig {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_buffer_pool_pages(mut self, pages: usize) -> Self {
        self.buffer_pool_pages = pages;
        self
    }

    pub fn with_lock_wait(mut self, min: Duration, max: Duration) -> Self {
        self.lock_wait_min = min;
        self.lock_wait_max = max;
        self
    }
}
