//! Per-dataset statistics.
//!
//! Counters are plain atomics updated outside the engine's store lock.
//! Readers may observe a counter a moment before or after the matching store
//! change; derived rates are eventually consistent.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

fn from_micros(micros: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_micros(micros)
}

/// Live counters for one dataset.
#[derive(Debug)]
pub struct Statistics {
    reads: AtomicU64,
    writes: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
    inserts: AtomicU64,
    deleted_records: AtomicU64,
    bytes_used: AtomicU64,
    bytes_allocated: AtomicU64,
    io_time_nanos: AtomicU64,
    created_at: AtomicU64,
    last_access: AtomicU64,
    last_modified: AtomicU64,
}

impl Statistics {
    pub fn new() -> Self {
        let now = now_micros();
        Self {
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            updates: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
            deleted_records: AtomicU64::new(0),
            bytes_used: AtomicU64::new(0),
            bytes_allocated: AtomicU64::new(0),
            io_time_nanos: AtomicU64::new(0),
            created_at: AtomicU64::new(now),
            last_access: AtomicU64::new(now),
            last_modified: AtomicU64::new(now),
        }
    }

    fn add_io_time(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.io_time_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    fn touch_access(&self) {
        self.last_access.store(now_micros(), Ordering::Relaxed);
    }

    fn touch_modified(&self) {
        let now = now_micros();
        self.last_access.store(now, Ordering::Relaxed);
        self.last_modified.store(now, Ordering::Relaxed);
    }

    /// Record a successful read (keyed, addressed or sequential).
    pub fn record_read(&self, elapsed: Duration) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.add_io_time(elapsed);
        self.touch_access();
    }

    /// Record a successful insert of `bytes` new bytes.
    pub fn record_write(&self, elapsed: Duration, bytes: u64) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.inserts.fetch_add(1, Ordering::Relaxed);
        self.bytes_used.fetch_add(bytes, Ordering::Relaxed);
        self.add_io_time(elapsed);
        self.touch_modified();
    }

    /// Record an in-place update that changed the stored size from `old_bytes` to `new_bytes`.
    pub fn record_update(&self, elapsed: Duration, old_bytes: u64, new_bytes: u64) {
        self.updates.fetch_add(1, Ordering::Relaxed);
        if new_bytes >= old_bytes {
            self.bytes_used.fetch_add(new_bytes - old_bytes, Ordering::Relaxed);
        } else {
            self.release_bytes(old_bytes - new_bytes);
        }
        self.add_io_time(elapsed);
        self.touch_modified();
    }

    /// Record an erase that freed `bytes`.
    pub fn record_delete(&self, elapsed: Duration, bytes: u64) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        self.deleted_records.fetch_add(1, Ordering::Relaxed);
        self.release_bytes(bytes);
        self.add_io_time(elapsed);
        self.touch_modified();
    }

    fn release_bytes(&self, bytes: u64) {
        let _ = self
            .bytes_used
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |used| {
                Some(used.saturating_sub(bytes))
            });
    }

    /// Raise the allocated byte count to `bytes`. Allocation only grows, so
    /// writers publishing out of order never move it backwards.
    pub fn set_allocated(&self, bytes: u64) {
        self.bytes_allocated.fetch_max(bytes, Ordering::Relaxed);
    }

    /// Overwrite the space counters after a bulk restore.
    pub(crate) fn reset_space(&self, used: u64, allocated: u64) {
        self.bytes_used.store(used, Ordering::Relaxed);
        self.bytes_allocated.store(allocated, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            deleted_records: self.deleted_records.load(Ordering::Relaxed),
            bytes_used: self.bytes_used.load(Ordering::Relaxed),
            bytes_allocated: self.bytes_allocated.load(Ordering::Relaxed),
            io_time: Duration::from_nanos(self.io_time_nanos.load(Ordering::Relaxed)),
            created_at: from_micros(self.created_at.load(Ordering::Relaxed)),
            last_access: from_micros(self.last_access.load(Ordering::Relaxed)),
            last_modified: from_micros(self.last_modified.load(Ordering::Relaxed)),
        }
    }

    pub fn space_utilization(&self) -> f64 {
        self.snapshot().space_utilization()
    }

    pub fn average_io_time(&self) -> Duration {
        self.snapshot().average_io_time()
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable copy of a dataset's statistics, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticsSnapshot {
    pub reads: u64,
    pub writes: u64,
    pub updates: u64,
    pub deletes: u64,
    pub inserts: u64,
    pub deleted_records: u64,
    pub bytes_used: u64,
    pub bytes_allocated: u64,
    pub io_time: Duration,
    pub created_at: SystemTime,
    pub last_access: SystemTime,
    pub last_modified: SystemTime,
}

impl StatisticsSnapshot {
    /// reads + writes + updates + deletes
    pub fn total_operations(&self) -> u64 {
        self.reads
            .saturating_add(self.writes)
            .saturating_add(self.updates)
            .saturating_add(self.deletes)
    }

    /// Used bytes over allocated bytes, in percent. 0 when nothing is allocated.
    pub fn space_utilization(&self) -> f64 {
        if self.bytes_allocated == 0 {
            return 0.0;
        }
        self.bytes_used as f64 / self.bytes_allocated as f64 * 100.0
    }

    /// Mean IO time per operation. Zero when no operations were recorded.
    pub fn average_io_time(&self) -> Duration {
        let total = self.total_operations();
        if total == 0 {
            return Duration::ZERO;
        }
        let nanos = self.io_time.as_nanos() / u128::from(total);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}
