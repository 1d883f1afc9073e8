//! Heap page - one fixed-size slotted page of a table.
//!
//! # Page Layout
//! ```text
//! ┌──────────────────┬──────────┬──────────┬─────┬──────────┬─────────┐
//! │ header bitmap    │ slot 0   │ slot 1   │ ... │ slot N-1 │ padding │
//! │ ⌈N/8⌉ bytes      │ R bytes  │ R bytes  │     │ R bytes  │ zeros   │
//! └──────────────────┴──────────┴──────────┴─────┴──────────┴─────────┘
//! ```
//! where `R` is the record byte width given by the page's schema and
//! `N = ⌊page_size·8 / (R·8 + 1)⌋` (the `+1` reserves one header bit per
//! slot). Bit `i` of the header is set iff slot `i` holds a record; free
//! slots serialize as `R` zero bytes.
//!
//! Round-trip invariant: parsing a page and serializing it again yields the
//! identical byte buffer.

use std::io;

use crate::common::config::page_size;
use crate::common::{Error, PageId, Result, TransactionId};
use crate::storage::tuple::{RecordId, Tuple, TupleDesc};

/// In-memory form of one slotted disk page.
///
/// A page tracks at most one dirtying transaction at a time (last writer
/// wins; the lock protocol guarantees a single exclusive writer anyway) and
/// keeps the byte image it was parsed from as a before-image for rollback.
pub struct HeapPage {
    pid: PageId,
    desc: TupleDesc,
    header: Vec<u8>,
    tuples: Vec<Option<Tuple>>,
    dirtied_by: Option<TransactionId>,
    before_image: Vec<u8>,
}

impl HeapPage {
    /// Number of record slots a page holds for records of `desc`'s width.
    pub fn slots_per_page(desc: &TupleDesc) -> usize {
        (page_size() * 8) / (desc.byte_size() * 8 + 1)
    }

    /// Header bytes needed for `slot_count` slots (one bit per slot).
    pub fn header_size(slot_count: usize) -> usize {
        slot_count.div_ceil(8)
    }

    /// A zeroed buffer representing a brand-new empty page.
    pub fn empty_page_data() -> Vec<u8> {
        vec![0u8; page_size()]
    }

    /// Parse a page from its on-disk bytes.
    ///
    /// `data` must be exactly one page long. Occupied slots are decoded
    /// field by field per the schema; free slots are skipped over. The
    /// input buffer is retained as the page's before-image.
    pub fn parse(pid: PageId, data: &[u8], desc: TupleDesc) -> Result<Self> {
        if data.len() != page_size() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} has {} bytes, expected {}", pid, data.len(), page_size()),
            )));
        }

        let slot_count = Self::slots_per_page(&desc);
        let header = data[..Self::header_size(slot_count)].to_vec();
        let record_size = desc.byte_size();

        let mut tuples = Vec::with_capacity(slot_count);
        let mut offset = header.len();
        for slot in 0..slot_count {
            if header[slot / 8] & (1 << (slot % 8)) != 0 {
                let mut fields = Vec::with_capacity(desc.len());
                let mut field_off = offset;
                for i in 0..desc.len() {
                    let ft = desc.field_type(i);
                    fields.push(ft.parse(&data[field_off..field_off + ft.byte_size()]));
                    field_off += ft.byte_size();
                }
                let mut tuple = Tuple::new(desc.clone(), fields)?;
                tuple.set_record_id(Some(RecordId { page_id: pid, slot }));
                tuples.push(Some(tuple));
            } else {
                tuples.push(None);
            }
            offset += record_size;
        }

        Ok(Self {
            pid,
            desc,
            header,
            tuples,
            dirtied_by: None,
            before_image: data.to_vec(),
        })
    }

    /// Serialize to exactly one page of bytes: header, slots in order
    /// (zero-filled when free), zero padding to the page size.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = vec![0u8; page_size()];
        buf[..self.header.len()].copy_from_slice(&self.header);

        let record_size = self.desc.byte_size();
        let mut offset = self.header.len();
        for tuple in &self.tuples {
            if let Some(tuple) = tuple {
                let mut field_off = offset;
                for (i, field) in tuple.fields().iter().enumerate() {
                    let width = self.desc.field_type(i).byte_size();
                    field.serialize_into(&mut buf[field_off..field_off + width]);
                    field_off += width;
                }
            }
            offset += record_size;
        }
        buf
    }

    #[inline]
    pub fn id(&self) -> PageId {
        self.pid
    }

    pub fn desc(&self) -> &TupleDesc {
        &self.desc
    }

    /// Total number of slots on this page.
    pub fn slot_count(&self) -> usize {
        self.tuples.len()
    }

    /// Whether slot `i` currently holds a record.
    pub fn is_slot_used(&self, i: usize) -> bool {
        i < self.slot_count() && self.header[i / 8] & (1 << (i % 8)) != 0
    }

    /// Number of free slots remaining.
    pub fn empty_slot_count(&self) -> usize {
        self.tuples.iter().filter(|t| t.is_none()).count()
    }

    /// The record in slot `i`, if any.
    pub fn tuple(&self, i: usize) -> Option<&Tuple> {
        self.tuples.get(i).and_then(|t| t.as_ref())
    }

    /// Occupied slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter().filter_map(|t| t.as_ref())
    }

    fn set_slot_used(&mut self, i: usize, used: bool) {
        let mask = 1 << (i % 8);
        if used {
            self.header[i / 8] |= mask;
        } else {
            self.header[i / 8] &= !mask;
        }
    }

    /// Place `tuple` in the lowest-numbered free slot, stamping its record
    /// id with that location.
    ///
    /// # Errors
    /// [`Error::SchemaMismatch`] if the tuple's schema differs from the
    /// page's; [`Error::PageFull`] if no slot is free.
    pub fn insert_tuple(&mut self, mut tuple: Tuple) -> Result<RecordId> {
        if *tuple.desc() != self.desc {
            return Err(Error::SchemaMismatch);
        }
        for slot in 0..self.slot_count() {
            if !self.is_slot_used(slot) {
                let rid = RecordId {
                    page_id: self.pid,
                    slot,
                };
                tuple.set_record_id(Some(rid));
                self.set_slot_used(slot, true);
                self.tuples[slot] = Some(tuple);
                return Ok(rid);
            }
        }
        Err(Error::PageFull(self.pid))
    }

    /// Clear the slot named by `tuple`'s record id.
    ///
    /// # Errors
    /// [`Error::MissingRecordId`] if the tuple carries no location;
    /// [`Error::InvalidSlot`] if the location names another page, an
    /// out-of-range slot, or a slot that is already free.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let rid = tuple.record_id().ok_or(Error::MissingRecordId)?;
        if rid.page_id != self.pid {
            return Err(Error::InvalidSlot {
                page: self.pid,
                slot: rid.slot,
            });
        }
        if rid.slot >= self.slot_count() || !self.is_slot_used(rid.slot) {
            return Err(Error::InvalidSlot {
                page: self.pid,
                slot: rid.slot,
            });
        }
        self.set_slot_used(rid.slot, false);
        self.tuples[rid.slot] = None;
        Ok(())
    }

    /// Set or clear the dirty mark. An unconditional overwrite: marking
    /// clean erases the recorded transaction whoever set it.
    pub fn mark_dirty(&mut self, txn: Option<TransactionId>) {
        self.dirtied_by = txn;
    }

    /// The transaction that last dirtied this page, or `None` if clean.
    pub fn dirtied_by(&self) -> Option<TransactionId> {
        self.dirtied_by
    }

    /// Reconstruct the page as it looked when the before-image was last
    /// captured. A historical view; it does not follow later edits.
    pub fn before_image(&self) -> Result<HeapPage> {
        HeapPage::parse(self.pid, &self.before_image, self.desc.clone())
    }

    /// Re-capture the before-image from the current contents.
    pub fn set_before_image(&mut self) {
        self.before_image = self.serialize();
    }
}

/// Build an all-int tuple for an all-int schema.
#[cfg(test)]
pub(crate) fn int_tuple(desc: &TupleDesc, values: &[i32]) -> Tuple {
    use crate::storage::tuple::Field;
    let fields = values.iter().map(|&v| Field::Int(v)).collect();
    Tuple::new(desc.clone(), fields).expect("int fields match an all-int schema")
}
