//! Browse cursors.
//!
//! A [`BrowseContext`] holds a copy of the last key and address it visited,
//! never a handle into the record store. Each engine call re-resolves the
//! position with a successor or predecessor search, so records inserted or
//! erased between calls cannot invalidate the cursor.
//!
//! States:
//! - at start, no position: fresh context, or before the first key
//! - positioned: resting on a key (which may since have been erased)
//! - at end: forward exhausted, or no qualifying key on start; in the latter
//!   case the requested key is kept so a backward read resumes below it
//! - at start with a position: backward exhausted from that key

use std::fmt;

use crate::types::{Address, Key};

/// Opaque browse handle. Never reused within one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BrowseId(pub(crate) u64);

impl BrowseId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BrowseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Natural direction of a browse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Last visited key and its address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub key: Key,
    /// `Address::Invalid` when the key was requested but not found
    pub address: Address,
}

#[derive(Debug, Clone)]
pub struct BrowseContext {
    id: BrowseId,
    direction: Direction,
    position: Option<Position>,
    at_start: bool,
    at_end: bool,
    records_read: u64,
}

impl BrowseContext {
    pub(crate) fn new(id: BrowseId, direction: Direction) -> Self {
        Self {
            id,
            direction,
            position: None,
            at_start: true,
            at_end: false,
            records_read: 0,
        }
    }

    pub fn id(&self) -> BrowseId {
        self.id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn current_key(&self) -> Option<&Key> {
        self.position.as_ref().map(|p| &p.key)
    }

    pub fn at_start(&self) -> bool {
        self.at_start
    }

    pub fn at_end(&self) -> bool {
        self.at_end
    }

    /// Records returned through this cursor so far.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Rest on `key` without counting a read (start or reset).
    pub(crate) fn position_at(&mut self, key: Key, address: Address) {
        self.position = Some(Position { key, address });
        self.at_start = false;
        self.at_end = false;
    }

    /// Move onto a record returned by a sequential read.
    pub(crate) fn advance_to(&mut self, key: Key, address: Address) {
        self.position_at(key, address);
        self.records_read += 1;
    }

    /// No qualifying key at or after `requested`. The key stays as the
    /// resume point for backward reads.
    pub(crate) fn mark_exhausted(&mut self, requested: Key) {
        self.position = Some(Position { key: requested, address: Address::Invalid });
        self.at_start = false;
        self.at_end = true;
    }

    /// Forward read found nothing past the position. Position is kept.
    pub(crate) fn hit_end(&mut self) {
        self.at_start = false;
        self.at_end = true;
    }

    /// Backward read found nothing before the position. Position is kept.
    pub(crate) fn hit_start(&mut self) {
        self.at_end = false;
        self.at_start = true;
    }
}
