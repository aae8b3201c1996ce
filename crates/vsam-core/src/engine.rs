//! KSDS engine: keyed record store with browse cursors.
//!
//! [`KsdsEngine`] owns an ordered record store, a secondary RBA index and the
//! browse-context table, all behind one reader/writer lock. Statistics are
//! atomics kept outside that lock.
//!
//! - **Shared lock**: `read`, `read_generic`, `read_by_rba`, `read_next`,
//!   `read_prev`, `is_open`, reporting
//! - **Exclusive lock**: `open`, `close`, `write`, `update`, `erase`,
//!   `start_browse`, `end_browse`, `reset_browse`
//!
//! No lock is held across calls. A cursor whose current key is erased by
//! another thread resumes from that key on its next call.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, trace};

use crate::browse::{BrowseContext, BrowseId, Direction};
use crate::definition::DatasetDefinition;
use crate::error::{VsamError, VsamResult};
use crate::snapshot::{read_snapshot, write_snapshot};
use crate::stats::{Statistics, StatisticsSnapshot};
use crate::types::{printable_key, Address, Key, Record};

/// OPEN mode of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Read only
    Input,
    /// Load: writes only
    Output,
    /// Reads, writes, updates and erases
    InputOutput,
    /// Append
    Extend,
}

impl AccessMode {
    /// Whether `write`, `update` and `erase` are permitted.
    pub fn allows_output(&self) -> bool {
        !matches!(self, AccessMode::Input)
    }
}

/// ACCESS MODE clause of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingMode {
    Sequential,
    Random,
    Dynamic,
}

#[derive(Debug, Clone, Copy)]
struct OpenState {
    access_mode: AccessMode,
    processing_mode: ProcessingMode,
}

/// Everything guarded by the engine lock.
#[derive(Default)]
struct Store {
    /// Access and processing mode while open, `None` when closed
    open: Option<OpenState>,
    /// Records in key order
    records: BTreeMap<Key, Record>,
    /// RBA -> key, for addressed reads
    rba_index: BTreeMap<u64, Key>,
    /// Live browse cursors, each lockable on its own under the shared lock
    browses: HashMap<BrowseId, Mutex<BrowseContext>>,
    /// Next relative byte address to assign
    next_rba: u64,
}

impl Store {
    fn successor(&self, key: &[u8]) -> Option<&Record> {
        self.records
            .range::<[u8], _>((Bound::Excluded(key), Bound::Unbounded))
            .next()
            .map(|(_, r)| r)
    }

    fn predecessor(&self, key: &[u8]) -> Option<&Record> {
        self.records
            .range::<[u8], _>((Bound::Unbounded, Bound::Excluded(key)))
            .next_back()
            .map(|(_, r)| r)
    }

    fn successor_or_equal(&self, key: &[u8]) -> Option<&Record> {
        self.records
            .range::<[u8], _>((Bound::Included(key), Bound::Unbounded))
            .next()
            .map(|(_, r)| r)
    }

    fn used_bytes(&self) -> u64 {
        self.records.values().map(Record::stored_len).sum()
    }
}

/// Key-sequenced dataset engine.
///
/// All public methods take `&self`; share it between threads with `Arc`.
pub struct KsdsEngine {
    /// Validated cluster definition
    definition: DatasetDefinition,
    /// Snapshot file written on close, if any
    location: Option<PathBuf>,
    /// Records, RBA index and browse table
    store: RwLock<Store>,
    /// Lock-free operation counters
    stats: Statistics,
    /// Browse id source; ids are never reused
    next_browse_id: AtomicU64,
}

impl KsdsEngine {
    /// Build a closed, empty engine. The definition must already be validated.
    pub fn new(definition: DatasetDefinition) -> Self {
        Self::with_location(definition, None)
    }

    /// Build a closed, empty engine that persists to `location` on close.
    pub fn with_location(definition: DatasetDefinition, location: Option<PathBuf>) -> Self {
        Self {
            definition,
            location,
            store: RwLock::new(Store::default()),
            stats: Statistics::new(),
            next_browse_id: AtomicU64::new(1),
        }
    }

    pub fn definition(&self) -> &DatasetDefinition {
        &self.definition
    }

    pub fn cluster_name(&self) -> &str {
        &self.definition.cluster_name
    }

    /// Snapshot location, if the dataset is backed by one.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    fn not_open(&self) -> VsamError {
        VsamError::FileNotOpen { cluster: self.definition.cluster_name.clone() }
    }

    fn ensure_open(&self, store: &Store) -> VsamResult<OpenState> {
        store.open.ok_or_else(|| self.not_open())
    }

    fn ensure_output(&self, store: &Store, op: &str) -> VsamResult<()> {
        let state = self.ensure_open(store)?;
        if !state.access_mode.allows_output() {
            return Err(VsamError::invalid_request(format!(
                "{} not permitted: {} opened for {:?}",
                op, self.definition.cluster_name, state.access_mode
            )));
        }
        Ok(())
    }

    fn check_record(&self, record: &Record) -> VsamResult<()> {
        let key_len = record.key().len();
        if key_len == 0 {
            return Err(VsamError::invalid_request("empty key"));
        }
        if key_len > self.definition.key_length as usize {
            return Err(VsamError::invalid_request(format!(
                "key length {} exceeds defined key length {}",
                key_len, self.definition.key_length
            )));
        }
        if record.data().len() > self.definition.maximum_record_length as usize {
            return Err(VsamError::invalid_request(format!(
                "record length {} exceeds maximum {}",
                record.data().len(),
                self.definition.maximum_record_length
            )));
        }
        Ok(())
    }

    /// Bytes allocated for `next_rba` assigned bytes, in whole control intervals.
    fn allocated_for(&self, next_rba: u64) -> u64 {
        let ci = u64::from(self.definition.ci_size.max(1));
        next_rba.div_ceil(ci).saturating_mul(ci)
    }

    // -----------------------------------------------------------------------
    // Open / close
    // -----------------------------------------------------------------------

    pub fn open(&self, access_mode: AccessMode, processing_mode: ProcessingMode) -> VsamResult<()> {
        let mut store = self.store.write();
        if store.open.is_some() {
            return Err(VsamError::AlreadyOpen { cluster: self.definition.cluster_name.clone() });
        }
        store.open = Some(OpenState { access_mode, processing_mode });
        debug!(
            cluster = %self.definition.cluster_name,
            ?access_mode,
            ?processing_mode,
            records = store.records.len(),
            "dataset opened"
        );
        Ok(())
    }

    /// Close the dataset, discarding every live browse context.
    ///
    /// With a location set, the store is saved there first; if that fails
    /// the dataset stays open.
    pub fn close(&self) -> VsamResult<()> {
        let mut store = self.store.write();
        self.ensure_open(&store)?;

        if let Some(location) = &self.location {
            let bytes = write_snapshot(location, store.next_rba, store.records.values())?;
            debug!(
                cluster = %self.definition.cluster_name,
                path = %location.display(),
                bytes,
                "snapshot saved on close"
            );
        }

        let discarded = store.browses.len();
        store.browses.clear();
        store.open = None;
        debug!(
            cluster = %self.definition.cluster_name,
            discarded_browses = discarded,
            "dataset closed"
        );
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.store.read().open.is_some()
    }

    pub fn access_mode(&self) -> Option<AccessMode> {
        self.store.read().open.map(|s| s.access_mode)
    }

    pub fn processing_mode(&self) -> Option<ProcessingMode> {
        self.store.read().open.map(|s| s.processing_mode)
    }

    // -----------------------------------------------------------------------
    // Keyed and addressed access
    // -----------------------------------------------------------------------

    /// Exact-key read. Returns a copy of the stored record.
    pub fn read(&self, key: &[u8]) -> VsamResult<Record> {
        let started = Instant::now();
        let store = self.store.read();
        self.ensure_open(&store)?;
        let record = store
            .records
            .get(key)
            .cloned()
            .ok_or_else(|| VsamError::RecordNotFound { key: printable_key(key) })?;
        drop(store);
        self.stats.record_read(started.elapsed());
        Ok(record)
    }

    /// Generic read: first record whose key starts with `prefix`.
    pub fn read_generic(&self, prefix: &[u8]) -> VsamResult<Record> {
        let started = Instant::now();
        let store = self.store.read();
        self.ensure_open(&store)?;
        let record = store
            .successor_or_equal(prefix)
            .filter(|r| r.key().as_bytes().starts_with(prefix))
            .cloned()
            .ok_or_else(|| VsamError::RecordNotFound { key: printable_key(prefix) })?;
        drop(store);
        self.stats.record_read(started.elapsed());
        Ok(record)
    }

    pub fn read_by_rba(&self, rba: u64) -> VsamResult<Record> {
        let started = Instant::now();
        let store = self.store.read();
        self.ensure_open(&store)?;
        let record = store
            .rba_index
            .get(&rba)
            .and_then(|key| store.records.get(key))
            .cloned()
            .ok_or(VsamError::RbaNotFound { rba })?;
        drop(store);
        self.stats.record_read(started.elapsed());
        Ok(record)
    }

    /// Relative-record addressing does not apply to a KSDS; always fails.
    pub fn read_by_rrn(&self, rrn: u64) -> VsamResult<Record> {
        let store = self.store.read();
        self.ensure_open(&store)?;
        Err(VsamError::invalid_request(format!(
            "RRN {} requested: KSDS does not support relative record addressing",
            rrn
        )))
    }

    /// Insert a new record and return the address assigned to it.
    ///
    /// Addresses are a running byte offset advanced by key + payload length,
    /// unique and increasing in insertion order.
    pub fn write(&self, record: Record) -> VsamResult<Address> {
        let started = Instant::now();
        let mut store = self.store.write();
        self.ensure_output(&store, "WRITE")?;
        self.check_record(&record)?;

        if store.records.contains_key(record.key()) {
            return Err(VsamError::DuplicateKey { key: record.key().to_string() });
        }

        let address = Address::Rba(store.next_rba);
        let stored_len = record.stored_len();
        store.next_rba = store
            .next_rba
            .checked_add(stored_len)
            .ok_or_else(|| VsamError::invalid_request("relative byte address space exhausted"))?;

        let mut record = record.with_address(address);
        record.touch();
        debug_assert!(record.address().is_valid());

        let key = record.key().clone();
        trace!(cluster = %self.definition.cluster_name, %key, %address, "record written");
        store.rba_index.insert(stored_rba(address), key.clone());
        store.records.insert(key, record);
        let allocated = self.allocated_for(store.next_rba);
        drop(store);

        self.stats.set_allocated(allocated);
        self.stats.record_write(started.elapsed(), stored_len);
        Ok(address)
    }

    /// Replace the payload of an existing record. Address is preserved.
    pub fn update(&self, record: Record) -> VsamResult<()> {
        let started = Instant::now();
        let mut store = self.store.write();
        self.ensure_output(&store, "REWRITE")?;
        self.check_record(&record)?;

        let stored = store
            .records
            .get_mut(record.key().as_bytes())
            .ok_or_else(|| VsamError::RecordNotFound { key: record.key().to_string() })?;
        let old_len = stored.stored_len();
        stored.replace_data(record.into_data());
        let new_len = stored.stored_len();
        drop(store);

        self.stats.record_update(started.elapsed(), old_len, new_len);
        Ok(())
    }

    /// Remove a record. Returns the removed record with its deleted flag set.
    pub fn erase(&self, key: &[u8]) -> VsamResult<Record> {
        let started = Instant::now();
        let mut store = self.store.write();
        self.ensure_output(&store, "DELETE")?;

        let mut record = store
            .records
            .remove(key)
            .ok_or_else(|| VsamError::RecordNotFound { key: printable_key(key) })?;
        store.rba_index.remove(&stored_rba(record.address()));
        drop(store);

        record.mark_deleted();
        self.stats.record_delete(started.elapsed(), record.stored_len());
        Ok(record)
    }

    // -----------------------------------------------------------------------
    // Browse
    // -----------------------------------------------------------------------

    /// Create a browse cursor.
    ///
    /// With `gteq`, the cursor rests on the smallest key >= `key`; otherwise
    /// on exactly `key`. If no key qualifies the cursor starts at end.
    /// `read_next` returns the record after the resting key and `read_prev`
    /// the one before it. `backward` only sets the natural direction used by
    /// [`KsdsEngine::read_browse`].
    pub fn start_browse(&self, key: &[u8], gteq: bool, backward: bool) -> VsamResult<BrowseId> {
        let mut store = self.store.write();
        self.ensure_open(&store)?;

        let id = BrowseId(self.next_browse_id.fetch_add(1, Ordering::Relaxed));
        let direction = if backward { Direction::Backward } else { Direction::Forward };
        let mut ctx = BrowseContext::new(id, direction);

        let found = if gteq { store.successor_or_equal(key) } else { store.records.get(key) };
        match found {
            Some(record) => ctx.position_at(record.key().clone(), record.address()),
            None => ctx.mark_exhausted(Key::from(key)),
        }

        debug!(
            cluster = %self.definition.cluster_name,
            browse = %id,
            start = %printable_key(key),
            gteq,
            ?direction,
            at_end = ctx.at_end(),
            "browse started"
        );
        store.browses.insert(id, Mutex::new(ctx));
        Ok(id)
    }

    /// Next record in ascending key order.
    pub fn read_next(&self, id: BrowseId) -> VsamResult<Record> {
        self.step(id, Some(Direction::Forward))
    }

    /// Previous record in descending key order.
    ///
    /// Clears an end-of-file left by forward reads and steps back from the
    /// last position.
    pub fn read_prev(&self, id: BrowseId) -> VsamResult<Record> {
        self.step(id, Some(Direction::Backward))
    }

    /// Read in the cursor's natural direction.
    pub fn read_browse(&self, id: BrowseId) -> VsamResult<Record> {
        self.step(id, None)
    }

    fn step(&self, id: BrowseId, direction: Option<Direction>) -> VsamResult<Record> {
        let started = Instant::now();
        let store = self.store.read();
        self.ensure_open(&store)?;
        let mut ctx = store
            .browses
            .get(&id)
            .ok_or(VsamError::InvalidBrowseId { browse_id: id.0 })?
            .lock();

        let record = match direction.unwrap_or(ctx.direction()) {
            Direction::Forward => {
                if ctx.at_end() {
                    return Err(VsamError::EndOfFile { browse_id: id.0 });
                }
                let next = match ctx.current_key() {
                    Some(key) => store.successor(key.as_bytes()),
                    None => store.records.values().next(),
                };
                match next {
                    Some(record) => record.clone(),
                    None => {
                        ctx.hit_end();
                        return Err(VsamError::EndOfFile { browse_id: id.0 });
                    }
                }
            }
            Direction::Backward => {
                if ctx.at_start() {
                    return Err(VsamError::StartOfFile { browse_id: id.0 });
                }
                let prev = match ctx.current_key() {
                    Some(key) => store.predecessor(key.as_bytes()),
                    None => store.records.values().next_back(),
                };
                match prev {
                    Some(record) => record.clone(),
                    None => {
                        ctx.hit_start();
                        return Err(VsamError::StartOfFile { browse_id: id.0 });
                    }
                }
            }
        };

        ctx.advance_to(record.key().clone(), record.address());
        drop(ctx);
        drop(store);
        self.stats.record_read(started.elapsed());
        Ok(record)
    }

    /// Drop a browse cursor. Unknown ids are ignored.
    pub fn end_browse(&self, id: BrowseId) -> VsamResult<()> {
        let mut store = self.store.write();
        self.ensure_open(&store)?;
        if let Some(ctx) = store.browses.remove(&id) {
            debug!(browse = %id, records_read = ctx.lock().records_read(), "browse ended");
        }
        Ok(())
    }

    /// Reposition a cursor onto the smallest key >= `key`.
    pub fn reset_browse(&self, id: BrowseId, key: &[u8]) -> VsamResult<()> {
        let mut store = self.store.write();
        self.ensure_open(&store)?;
        let target = store
            .successor_or_equal(key)
            .map(|r| (r.key().clone(), r.address()));
        let ctx = store
            .browses
            .get_mut(&id)
            .ok_or(VsamError::InvalidBrowseId { browse_id: id.0 })?
            .get_mut();
        match target {
            Some((key, address)) => ctx.position_at(key, address),
            None => ctx.mark_exhausted(Key::from(key)),
        }
        Ok(())
    }

    /// Copy of a live browse context.
    pub fn browse_context(&self, id: BrowseId) -> VsamResult<BrowseContext> {
        let store = self.store.read();
        store
            .browses
            .get(&id)
            .map(|ctx| ctx.lock().clone())
            .ok_or(VsamError::InvalidBrowseId { browse_id: id.0 })
    }

    pub fn active_browses(&self) -> usize {
        self.store.read().browses.len()
    }

    // -----------------------------------------------------------------------
    // Reporting
    // -----------------------------------------------------------------------

    pub fn statistics(&self) -> StatisticsSnapshot {
        self.stats.snapshot()
    }

    pub fn record_count(&self) -> u64 {
        self.store.read().records.len() as u64
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    /// Save the current store to `path`. Works open or closed.
    pub fn save_snapshot(&self, path: &Path) -> VsamResult<u64> {
        let store = self.store.read();
        write_snapshot(path, store.next_rba, store.records.values())
    }

    /// Replace the store with the contents of the snapshot at `path`.
    ///
    /// The dataset must be closed.
    pub fn load_snapshot(&self, path: &Path) -> VsamResult<()> {
        let snapshot = read_snapshot(path)?;

        let mut records = BTreeMap::new();
        let mut rba_index = BTreeMap::new();
        let mut next_rba = snapshot.next_rba;
        for record in snapshot.records {
            self.check_record(&record)?;
            let rba = record.address().rba().ok_or_else(|| {
                VsamError::corrupted(0, format!("record {} has no RBA", record.key()))
            })?;
            let end = rba.checked_add(record.stored_len()).ok_or_else(|| {
                VsamError::corrupted(
                    0,
                    format!("record {} at RBA {} overflows the address space", record.key(), rba),
                )
            })?;
            next_rba = next_rba.max(end);
            if rba_index.insert(rba, record.key().clone()).is_some() {
                return Err(VsamError::corrupted(0, format!("RBA {} assigned twice", rba)));
            }
            if records.insert(record.key().clone(), record).is_some() {
                return Err(VsamError::corrupted(0, "duplicate key in snapshot"));
            }
        }

        let mut store = self.store.write();
        if store.open.is_some() {
            return Err(VsamError::invalid_request("cannot load a snapshot into an open dataset"));
        }
        store.records = records;
        store.rba_index = rba_index;
        store.next_rba = next_rba;
        store.browses.clear();
        let used = store.used_bytes();
        let allocated = self.allocated_for(next_rba);
        let count = store.records.len();
        drop(store);

        self.stats.reset_space(used, allocated);
        info!(
            cluster = %self.definition.cluster_name,
            path = %path.display(),
            records = count,
            "snapshot restored"
        );
        Ok(())
    }
}

fn stored_rba(address: Address) -> u64 {
    address.rba().unwrap_or(u64::MAX)
}

impl std::fmt::Debug for KsdsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let store = self.store.read();
        f.debug_struct("KsdsEngine")
            .field("cluster", &self.definition.cluster_name)
            .field("open", &store.open.is_some())
            .field("records", &store.records.len())
            .field("browses", &store.browses.len())
            .finish()
    }
}
