//! Control interval space accounting.
//!
//! A [`ControlInterval`] is a fixed-capacity page used for space bookkeeping.
//! Every stored record costs its length plus [`RDF_SIZE`] bytes of descriptor
//! overhead, so at all times:
//!
//! `free_space + sum(record_len + RDF_SIZE) == capacity`
//!
//! The KSDS engine assigns addresses with a monotonic offset and does not
//! consult control intervals; a paging layer would build on this type.

use crate::error::{VsamError, VsamResult};

/// Per-record descriptor overhead in bytes
pub const RDF_SIZE: usize = 3;

/// Location of one record inside the control interval's data area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordDescriptor {
    pub offset: usize,
    pub length: usize,
}

#[derive(Debug, Clone)]
pub struct ControlInterval {
    capacity: usize,
    free_space: usize,
    descriptors: Vec<RecordDescriptor>,
    data: Vec<u8>,
}

impl ControlInterval {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            free_space: capacity,
            descriptors: Vec::new(),
            data: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn free_space(&self) -> usize {
        self.free_space
    }

    pub fn record_count(&self) -> usize {
        self.descriptors.len()
    }

    pub fn descriptors(&self) -> &[RecordDescriptor] {
        &self.descriptors
    }

    /// Whether a record of `record_size` bytes plus its descriptor still fits.
    pub fn has_space_for(&self, record_size: usize) -> bool {
        record_size
            .checked_add(RDF_SIZE)
            .map_or(false, |needed| self.free_space >= needed)
    }

    /// Store `record` and return its slot number.
    pub fn insert(&mut self, record: &[u8]) -> VsamResult<usize> {
        if !self.has_space_for(record.len()) {
            return Err(VsamError::invalid_request(format!(
                "control interval full: {} bytes free, {} needed",
                self.free_space,
                record.len() + RDF_SIZE
            )));
        }
        let descriptor = RecordDescriptor { offset: self.data.len(), length: record.len() };
        self.data.extend_from_slice(record);
        self.descriptors.push(descriptor);
        self.free_space -= record.len() + RDF_SIZE;
        Ok(self.descriptors.len() - 1)
    }

    /// Bytes of the record in `slot`.
    pub fn record(&self, slot: usize) -> Option<&[u8]> {
        self.descriptors
            .get(slot)
            .map(|d| &self.data[d.offset..d.offset + d.length])
    }

    /// Occupied share of the capacity, in percent. 0 for a zero-capacity CI.
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        (self.capacity - self.free_space) as f64 / self.capacity as f64 * 100.0
    }

    pub fn clear(&mut self) {
        self.free_space = self.capacity;
        self.descriptors.clear();
        self.data.clear();
    }
}
