use std::fmt;

// HeapPageID identifies a unique page across all tables.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapPageID {
    pub table_id: u32,

    /// page_index represents the position of the page in
    /// the table file, start from 0
    pub page_index: u32,
}

impl HeapPageID {
    pub fn new(table_id: u32, page_index: u32) -> Self {
        Self {
            table_id,
            page_index,
        }
    }

    pub fn get_table_id(&self) -> u32 {
        self.table_id
    }

    pub fn get_page_index(&self) -> u32 {
        self.page_index
    }

    /// Byte offset of the page in its table file.
    pub fn offset(&self, page_size: usize) -> u64 {
        self.page_index as u64 * page_size as u64
    }

    pub fn get_short_repr(&self) -> String {
        format!("page_{}", self.page_index)
    }
}

impl fmt::Display for HeapPageID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}_{}", self.table_id, self.page_index)
    }
}

impl fmt::Debug for HeapPageID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
