use std::fmt;

use super::HeapPageID;

/// A reference to a specific tuple slot on a specific page.
///
/// It stays valid until the tuple it points to is deleted.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct RecordID {
    pub pid: HeapPageID,
    pub slot: usize,
}

impl RecordID {
    pub fn new(pid: HeapPageID, slot: usize) -> Self {
        Self { pid, slot }
    }

    pub fn get_pid(&self) -> HeapPageID {
        self.pid
    }

    pub fn get_slot(&self) -> usize {
        self.slot
    }
}

impl fmt::Display for RecordID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}#{}", self.pid, self.slot)
    }
}

impl fmt::Debug for RecordID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
