use std::fmt;

use bit_vec::BitVec;
use log::debug;

use super::{HeapPageID, Page, RecordID, TableSchema, Tuple};
use crate::{
    error::SmallError,
    io::{Serializeable, SmallReader, SmallWriter},
    transaction::Transaction,
    utils::ceil_div,
};

/// A fixed-size page of a heap file.
///
/// Layout:
///
/// ```text
/// | header: bitmap of used slots | slot 0 | slot 1 | ... | padding |
/// ```
///
/// Every slot has the size of one tuple of the table's schema.
pub struct HeapPage {
    pid: HeapPageID,
    schema: TableSchema,
    page_size: usize,

    slot_count: usize,

    // indicate slots' status: true means occupied, false means empty
    header: BitVec,

    // all slots (include empty slots)
    tuples: Vec<Option<Tuple>>,

    // the transaction that dirtied this page, if any
    dirty_tx: Option<Transaction>,
}

impl HeapPage {
    /// Construct a page from the bytes read from disk.
    ///
    /// The page size is the length of `bytes`.
    pub fn new(pid: &HeapPageID, bytes: &[u8], schema: &TableSchema) -> Result<Self, SmallError> {
        let page_size = bytes.len();
        let slot_count = Self::calculate_slots_count(schema, page_size);
        let header_size = Self::calculate_header_size(slot_count);
        let tuple_size = schema.get_tuple_size();

        if slot_count == 0 || header_size + slot_count * tuple_size > page_size {
            return Err(SmallError::new(&format!(
                "page {:?} is too small for its schema: {} bytes",
                pid, page_size
            )));
        }

        let mut header = BitVec::from_bytes(&bytes[..header_size]);
        header.truncate(slot_count);

        let mut reader = SmallReader::new(&bytes[header_size..]);
        let mut tuples = Vec::with_capacity(slot_count);
        for slot in 0..slot_count {
            if header[slot] {
                let mut tuple = Tuple::decode(&mut reader, schema)?;
                tuple.set_rid(Some(RecordID::new(*pid, slot)));
                tuples.push(Some(tuple));
            } else {
                reader.skip(tuple_size)?;
                tuples.push(None);
            }
        }

        Ok(Self {
            pid: *pid,
            schema: schema.clone(),
            page_size,
            slot_count,
            header,
            tuples,
            dirty_tx: None,
        })
    }

    pub fn empty_page_data(page_size: usize) -> Vec<u8> {
        vec![0; page_size]
    }

    /// Retrieve the maximum number of tuples this page can hold.
    ///
    /// Each tuple takes `tuple_size * 8` bits for its content and 1 bit
    /// for the header.
    pub fn calculate_slots_count(schema: &TableSchema, page_size: usize) -> usize {
        let bits_per_tuple_including_header = schema.get_tuple_size() * 8 + 1;
        (page_size * 8) / bits_per_tuple_including_header
    }

    pub fn calculate_header_size(slot_count: usize) -> usize {
        ceil_div(slot_count, 8)
    }

    pub fn get_slots_count(&self) -> usize {
        self.slot_count
    }

    pub fn is_slot_used(&self, slot: usize) -> bool {
        self.header.get(slot).unwrap_or(false)
    }

    pub fn empty_slots_count(&self) -> usize {
        self.header.iter().filter(|used| !used).count()
    }

    /// Returns the number of tuples currently stored on this page
    pub fn tuples_count(&self) -> usize {
        self.slot_count - self.empty_slots_count()
    }

    /// Adds the tuple to the first empty slot of the page, return the
    /// new location of the tuple.
    pub fn insert_tuple(&mut self, tuple: &Tuple) -> Result<RecordID, SmallError> {
        if !tuple.matches(&self.schema) {
            return Err(SmallError::new(&format!(
                "tuple {} doesn't match schema [{}]",
                tuple, self.schema
            )));
        }

        let slot = (0..self.slot_count)
            .find(|&i| !self.is_slot_used(i))
            .ok_or_else(|| SmallError::new(&format!("page {:?} is full", self.pid)))?;

        let rid = RecordID::new(self.pid, slot);
        let mut stored = tuple.clone();
        stored.set_rid(Some(rid));

        self.header.set(slot, true);
        self.tuples[slot] = Some(stored);
        debug!("insert {} into {:?}", tuple, rid);
        Ok(rid)
    }

    /// Delete the tuple from the page, the tuple's record id decides
    /// which slot is cleared.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<(), SmallError> {
        let rid = tuple
            .get_rid()
            .ok_or_else(|| SmallError::new(&format!("tuple {} has no record id", tuple)))?;

        if rid.pid != self.pid {
            return Err(SmallError::new(&format!(
                "tuple {:?} is not on page {:?}",
                tuple, self.pid
            )));
        }

        if !self.is_slot_used(rid.slot) {
            return Err(SmallError::new(&format!("slot {:?} is already empty", rid)));
        }

        self.header.set(rid.slot, false);
        self.tuples[rid.slot] = None;
        Ok(())
    }

    pub fn get_tuple(&self, slot: usize) -> Option<&Tuple> {
        self.tuples.get(slot).and_then(|t| t.as_ref())
    }

    /// Iterate over the used slots, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter().flatten()
    }

    pub fn get_schema(&self) -> &TableSchema {
        &self.schema
    }
}

impl Page for HeapPage {
    fn get_pid(&self) -> HeapPageID {
        self.pid
    }

    fn get_page_data(&self) -> Vec<u8> {
        let tuple_size = self.schema.get_tuple_size();

        let mut writer = SmallWriter::new_reserved(self.page_size);
        writer.write_bytes(&self.header.to_bytes());
        for tuple in self.tuples.iter() {
            match tuple {
                Some(t) => writer.write(t, &self.schema),
                None => writer.write_bytes(&vec![0; tuple_size]),
            }
        }

        // the layout is checked in `new`, so the content always fits
        writer
            .to_padded_bytes(self.page_size)
            .unwrap_or_else(|_| Self::empty_page_data(self.page_size))
    }

    fn is_dirty(&self) -> Option<Transaction> {
        self.dirty_tx
    }

    fn mark_dirty(&mut self, dirty: bool, tx: &Transaction) {
        if dirty {
            self.dirty_tx = Some(*tx);
        } else {
            self.dirty_tx = None;
        }
    }
}

impl fmt::Debug for HeapPage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "HeapPage {{ pid: {:?}, slots: {}/{}, header: {}, dirty: {:?} }}",
            self.pid,
            self.tuples_count(),
            self.slot_count,
            hex::encode(self.header.to_bytes()),
            self.dirty_tx,
        )
    }
}
