//! Snapshot files: durable copies of a KSDS record store.
//!
//! File format: SnapshotHeader (32 bytes) + one frame per record in key order.
//!
//! Header layout:
//!   [0..4]   magic:        [u8;4] - "VSAM"
//!   [4..8]   version:      u32 LE
//!   [8..16]  record_count: u64 LE
//!   [16..24] next_rba:     u64 LE - next relative byte address to assign
//!   [24..32] reserved:     zero
//!
//! Frame layout:
//!   [0..4]   length:   u32 LE - record bytes in this frame
//!   [4..8]   checksum: u32 LE - CRC32C of the record bytes
//!   [8..]    record in wire format (see `format`)
//!
//! Saving uses the atomic rename pattern:
//! 1. Write everything to `<name>.tmp` next to the target
//! 2. Sync the temp file
//! 3. Rename it over the target (atomic on POSIX)
//! 4. Sync the parent directory

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{VsamError, VsamResult};
use crate::format::{deserialize_record, serialize_record};
use crate::platform_durability::{sync_file, sync_parent_dir};
use crate::types::Record;

/// Magic bytes identifying a snapshot file
pub const SNAPSHOT_MAGIC: [u8; 4] = *b"VSAM";

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Header size in bytes
pub const SNAPSHOT_HEADER_SIZE: usize = 32;

const FRAME_HEADER_SIZE: usize = 8;

/// Decoded snapshot contents.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Next relative byte address the store would assign
    pub next_rba: u64,
    /// Records in key order
    pub records: Vec<Record>,
}

fn io_error(path: &Path, e: std::io::Error, what: &str) -> VsamError {
    VsamError::Io {
        path: Some(path.to_path_buf()),
        kind: e.kind(),
        message: format!("{}: {}", what, e),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `records` to `path`, replacing any previous snapshot atomically.
///
/// Returns the number of bytes written.
pub fn write_snapshot<'a, I>(path: &Path, next_rba: u64, records: I) -> VsamResult<u64>
where
    I: ExactSizeIterator<Item = &'a Record>,
{
    let tmp = temp_path(path);
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)
        .map_err(|e| io_error(&tmp, e, "Failed to create snapshot file"))?;

    let mut header = [0u8; SNAPSHOT_HEADER_SIZE];
    header[0..4].copy_from_slice(&SNAPSHOT_MAGIC);
    header[4..8].copy_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
    header[8..16].copy_from_slice(&(records.len() as u64).to_le_bytes());
    header[16..24].copy_from_slice(&next_rba.to_le_bytes());

    let mut writer = BufWriter::new(file);
    let mut written = SNAPSHOT_HEADER_SIZE as u64;
    writer
        .write_all(&header)
        .map_err(|e| io_error(&tmp, e, "Snapshot write failed"))?;

    for record in records {
        let bytes = serialize_record(record)?;
        let length = u32::try_from(bytes.len())
            .map_err(|_| VsamError::invalid_request("record too large for snapshot frame"))?;
        let checksum = crc32c::crc32c(&bytes);
        writer
            .write_all(&length.to_le_bytes())
            .and_then(|_| writer.write_all(&checksum.to_le_bytes()))
            .and_then(|_| writer.write_all(&bytes))
            .map_err(|e| io_error(&tmp, e, "Snapshot write failed"))?;
        written += (FRAME_HEADER_SIZE + bytes.len()) as u64;
    }

    let file = writer
        .into_inner()
        .map_err(|e| io_error(&tmp, e.into_error(), "Snapshot flush failed"))?;
    sync_file(&file).map_err(|e| io_error(&tmp, e, "Snapshot sync failed"))?;
    drop(file);

    fs::rename(&tmp, path).map_err(|e| io_error(path, e, "Snapshot rename failed"))?;
    sync_parent_dir(path).map_err(|e| io_error(path, e, "Snapshot directory sync failed"))?;

    Ok(written)
}

/// Read and verify a snapshot file.
pub fn read_snapshot(path: &Path) -> VsamResult<Snapshot> {
    let data = fs::read(path).map_err(|e| io_error(path, e, "Failed to read snapshot file"))?;

    if data.len() < SNAPSHOT_HEADER_SIZE {
        return Err(VsamError::corrupted(
            0,
            format!(
                "snapshot too short: {} bytes, need at least {}",
                data.len(),
                SNAPSHOT_HEADER_SIZE
            ),
        ));
    }
    if data[0..4] != SNAPSHOT_MAGIC {
        return Err(VsamError::corrupted(0, "snapshot magic not found"));
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != SNAPSHOT_VERSION {
        return Err(VsamError::corrupted(4, format!("unsupported snapshot version {}", version)));
    }
    let record_count = le_u64(&data[8..16]);
    let next_rba = le_u64(&data[16..24]);

    let mut records = Vec::new();
    let mut offset = SNAPSHOT_HEADER_SIZE;
    while offset < data.len() {
        if data.len() - offset < FRAME_HEADER_SIZE {
            return Err(VsamError::corrupted(offset as u64, "truncated frame header"));
        }
        let length = le_u32(&data[offset..offset + 4]) as usize;
        let expected = le_u32(&data[offset + 4..offset + 8]);
        let body_start = offset + FRAME_HEADER_SIZE;
        if data.len() - body_start < length {
            return Err(VsamError::corrupted(
                offset as u64,
                format!(
                    "truncated frame: need {} bytes, {} available",
                    length,
                    data.len() - body_start
                ),
            ));
        }
        let body = &data[body_start..body_start + length];

        let actual = crc32c::crc32c(body);
        if actual != expected {
            return Err(VsamError::ChecksumMismatch {
                path: path.to_path_buf(),
                expected,
                actual,
                offset: offset as u64,
            });
        }

        let (record, consumed) = deserialize_record(body)?;
        if consumed != length {
            return Err(VsamError::corrupted(
                offset as u64,
                format!("frame holds {} bytes, record used {}", length, consumed),
            ));
        }
        records.push(record);
        offset = body_start + length;
    }

    if records.len() as u64 != record_count {
        return Err(VsamError::corrupted(
            8,
            format!("header promises {} records, found {}", record_count, records.len()),
        ));
    }

    Ok(Snapshot { next_rba, records })
}

fn le_u32(bytes: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(raw)
}

fn le_u64(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Address;
    use tempfile::TempDir;

    fn sample_records() -> Vec<Record> {
        (1..=5u64)
            .map(|i| {
                Record::new(format!("KEY{:05}", i).as_str(), format!("data-{}", i).into_bytes())
                    .with_address(Address::Rba(i * 100))
            })
            .collect()
    }

    #[test]
    fn test_write_read_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("TEST.KSDS");
        let records = sample_records();

        let written = write_snapshot(&path, 600, records.iter()).unwrap();
        assert_eq!(written, std::fs::metadata(&path).unwrap().len());
        assert!(!temp_path(&path).exists());

        let snap = read_snapshot(&path).unwrap();
        assert_eq!(snap.next_rba, 600);
        assert_eq!(snap.records.len(), 5);
        for (a, b) in snap.records.iter().zip(records.iter()) {
            assert_eq!(a.key(), b.key());
            assert_eq!(a.data(), b.data());
            assert_eq!(a.address(), b.address());
        }
    }

    #[test]
    fn test_empty_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("EMPTY.KSDS");
        write_snapshot(&path, 0, std::iter::empty::<&Record>()).unwrap();
        let snap = read_snapshot(&path).unwrap();
        assert!(snap.records.is_empty());
        assert_eq!(snap.next_rba, 0);
    }

    #[test]
    fn test_overwrite_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("TEST.KSDS");
        let records = sample_records();
        write_snapshot(&path, 600, records.iter()).unwrap();
        write_snapshot(&path, 200, records[..1].iter()).unwrap();
        let snap = read_snapshot(&path).unwrap();
        assert_eq!(snap.records.len(), 1);
        assert_eq!(snap.next_rba, 200);
    }

    #[test]
    fn test_corrupted_payload_detected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("TEST.KSDS");
        write_snapshot(&path, 600, sample_records().iter()).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 30;
        bytes[last] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(read_snapshot(&path), Err(VsamError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_bad_magic_detected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("TEST.KSDS");
        write_snapshot(&path, 0, sample_records().iter()).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0] = b'X';
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(read_snapshot(&path), Err(VsamError::Corrupted { offset: 0, .. })));
    }

    #[test]
    fn test_torn_tail_detected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("TEST.KSDS");
        write_snapshot(&path, 0, sample_records().iter()).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 5]).unwrap();

        assert!(matches!(read_snapshot(&path), Err(VsamError::Corrupted { .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = read_snapshot(&dir.path().join("NOPE.KSDS")).unwrap_err();
        assert!(matches!(err, VsamError::Io { kind: std::io::ErrorKind::NotFound, .. }));
    }
}
