//! VSAM Core: In-Memory Key-Sequenced Dataset Engine
//!
//! An in-memory emulation of a VSAM KSDS: records ordered by a unique byte
//! key, each with a relative byte address, plus browse cursors that walk the
//! key order in either direction.
//!
//! # Architecture
//!
//! - **Store**: ordered map of key to record behind one reader/writer lock,
//!   with a secondary RBA index
//! - **Browse**: cursors keep a copy of their last key and re-resolve it on
//!   every call, so concurrent inserts and erases never invalidate them
//! - **Statistics**: lock-free atomic counters
//! - **Snapshots**: optional CRC32C-framed files, written with an atomic rename
//!
//! # Quick start
//!
//! ```no_run
//! use vsam_core::{create_dataset, AccessMode, DatasetDefinition, ProcessingMode, Record};
//!
//! # fn main() -> vsam_core::VsamResult<()> {
//! let engine = create_dataset(DatasetDefinition::ksds("PAYROLL.KSDS", 8), None)?;
//! engine.open(AccessMode::InputOutput, ProcessingMode::Dynamic)?;
//! engine.write(Record::new("EMP00001", b"Ada".to_vec()))?;
//! let record = engine.read(b"EMP00001")?;
//! assert_eq!(record.data(), b"Ada");
//! engine.close()?;
//! # Ok(())
//! # }
//! ```

pub mod browse;
pub mod control_interval;
pub mod dataset;
pub mod definition;
pub mod engine;
pub mod error;
pub mod format;
pub mod platform_durability;
pub mod snapshot;
pub mod stats;
pub mod types;

// Re-export key types for convenience
pub use browse::{BrowseContext, BrowseId, Direction, Position};
pub use control_interval::ControlInterval;
pub use dataset::create_dataset;
pub use definition::{DatasetDefinition, Organization};
pub use engine::{AccessMode, KsdsEngine, ProcessingMode};
pub use error::{ErrorKind, VsamError, VsamResult};
pub use stats::{Statistics, StatisticsSnapshot};
pub use types::{Address, Key, Record};
