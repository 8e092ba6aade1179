//! Byte-addressed linear memory, grown a word at a time.

use std::ops::Range;

use crate::vm::{Fault, Word};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearMemory {
    bytes: Vec<u8>,
    /// Hard limit on size in bytes
    limit: usize,
}

impl LinearMemory {
    pub fn new(limit: usize) -> Self {
        Self {
            bytes: Vec::new(),
            limit,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Byte range touched by an access of `len` bytes at `offset`.
    ///
    /// Zero-length accesses touch nothing, whatever the offset. Ranges that
    /// would take memory past the limit are `OutOfResource`.
    pub fn range(&self, offset: Word, len: Word) -> Result<Option<Range<usize>>, Fault> {
        if len.is_zero() {
            return Ok(None);
        }
        let start = offset.to_usize().ok_or(Fault::OutOfResource)?;
        let len = len.to_usize().ok_or(Fault::OutOfResource)?;
        let end = start.checked_add(len).ok_or(Fault::OutOfResource)?;
        if end > self.limit || end.div_ceil(32) * 32 > self.limit {
            return Err(Fault::OutOfResource);
        }
        Ok(Some(start..end))
    }

    /// Grow so that `end` is addressable. Never shrinks.
    pub fn grow(&mut self, end: usize) {
        let size = end.div_ceil(32) * 32;
        if size > self.bytes.len() {
            self.bytes.resize(size, 0);
        }
    }

    pub fn get(&self, range: Range<usize>) -> &[u8] {
        &self.bytes[range]
    }

    pub fn set(&mut self, at: usize, data: &[u8]) {
        self.bytes[at..at + data.len()].copy_from_slice(data);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}
