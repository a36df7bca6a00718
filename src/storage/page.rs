use super::HeapPageID;
use crate::transaction::Transaction;

/// What the buffer pool needs to know about a cached page.
pub trait Page {
    fn get_pid(&self) -> HeapPageID;

    /// Serialize the page to exactly one page of bytes.
    fn get_page_data(&self) -> Vec<u8>;

    /// The transaction that dirtied the page, `None` if the page is
    /// clean.
    fn is_dirty(&self) -> Option<Transaction>;

    fn mark_dirty(&mut self, dirty: bool, tx: &Transaction);
}
