//! Record wire format
//!
//! Records are written as a sequence of fixed-order fields:
//! key_len(u64 LE) + key_bytes + data_len(u64 LE) + data_bytes + AddressBlock (24 bytes)
//!
//! The layout round-trips byte-for-byte: decoding then re-encoding any
//! accepted buffer yields the same bytes. Modification time and the deleted
//! flag are not part of the wire form.

use crate::definition::{MAX_KEY_LENGTH, MAX_RECORD_LENGTH};
use crate::error::{VsamError, VsamResult};
use crate::types::{Address, Key, Record};

/// Address block size in bytes
pub const ADDRESS_SIZE: usize = 24;

/// Largest key accepted on the wire
pub const MAX_WIRE_KEY_SIZE: usize = MAX_KEY_LENGTH as usize;

const TAG_INVALID: u8 = 0;
const TAG_RBA: u8 = 1;
const TAG_RRN: u8 = 2;

/// Fixed-size address block.
///
/// Layout:
///   [0]      tag:      u8     - 0 = invalid, 1 = RBA active, 2 = RRN active
///   [1..8]   reserved: [u8;7] - must be zero
///   [8..16]  rba:      u64 LE - zero unless tag == 1
///   [16..24] rrn:      u64 LE - zero unless tag == 2
pub fn encode_address(address: Address) -> [u8; ADDRESS_SIZE] {
    let mut buf = [0u8; ADDRESS_SIZE];
    match address {
        Address::Invalid => buf[0] = TAG_INVALID,
        Address::Rba(rba) => {
            buf[0] = TAG_RBA;
            buf[8..16].copy_from_slice(&rba.to_le_bytes());
        }
        Address::Rrn(rrn) => {
            buf[0] = TAG_RRN;
            buf[16..24].copy_from_slice(&rrn.to_le_bytes());
        }
    }
    buf
}

/// Parse an address block. Rejects anything [`encode_address`] would not produce.
pub fn decode_address(bytes: &[u8; ADDRESS_SIZE]) -> VsamResult<Address> {
    if bytes[1..8].iter().any(|b| *b != 0) {
        return Err(VsamError::corrupted(1, "non-zero reserved bytes in address block"));
    }
    let rba = read_u64(&bytes[8..16]);
    let rrn = read_u64(&bytes[16..24]);
    match bytes[0] {
        TAG_INVALID if rba == 0 && rrn == 0 => Ok(Address::Invalid),
        TAG_RBA if rrn == 0 => Ok(Address::Rba(rba)),
        TAG_RRN if rba == 0 => Ok(Address::Rrn(rrn)),
        TAG_INVALID | TAG_RBA | TAG_RRN => {
            Err(VsamError::corrupted(8, "inactive address slot is not zero"))
        }
        other => Err(VsamError::corrupted(0, format!("invalid address tag: {}", other))),
    }
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(raw)
}

/// Encoded size of a record in bytes.
pub fn encoded_len(record: &Record) -> usize {
    8 + record.key().len() + 8 + record.data().len() + ADDRESS_SIZE
}

/// Serialize a record into its wire form.
pub fn serialize_record(record: &Record) -> VsamResult<Vec<u8>> {
    if record.key().is_empty() || record.key().len() > MAX_WIRE_KEY_SIZE {
        return Err(VsamError::invalid_request(format!(
            "key length {} outside [1, {}]",
            record.key().len(),
            MAX_WIRE_KEY_SIZE
        )));
    }
    if record.data().len() > MAX_RECORD_LENGTH as usize {
        return Err(VsamError::invalid_request(format!(
            "record length {} exceeds {}",
            record.data().len(),
            MAX_RECORD_LENGTH
        )));
    }

    let mut buffer = Vec::with_capacity(encoded_len(record));
    buffer.extend_from_slice(&(record.key().len() as u64).to_le_bytes());
    buffer.extend_from_slice(record.key().as_bytes());
    buffer.extend_from_slice(&(record.data().len() as u64).to_le_bytes());
    buffer.extend_from_slice(record.data());
    buffer.extend_from_slice(&encode_address(record.address()));
    Ok(buffer)
}

/// Deserialize one record from the front of `data`.
///
/// Returns the record and the number of bytes consumed.
pub fn deserialize_record(data: &[u8]) -> VsamResult<(Record, usize)> {
    let mut offset = 0usize;

    let key_len = take_len(data, &mut offset, "key")?;
    if key_len == 0 || key_len > MAX_WIRE_KEY_SIZE {
        return Err(VsamError::corrupted(0, format!("invalid key length: {}", key_len)));
    }
    let key = take_bytes(data, &mut offset, key_len, "key")?;

    let data_len_offset = offset;
    let data_len = take_len(data, &mut offset, "data")?;
    if data_len > MAX_RECORD_LENGTH as usize {
        return Err(VsamError::corrupted(
            data_len_offset as u64,
            format!("record length {} exceeds {}", data_len, MAX_RECORD_LENGTH),
        ));
    }
    let payload = take_bytes(data, &mut offset, data_len, "data")?;

    let address_offset = offset;
    let block = take_bytes(data, &mut offset, ADDRESS_SIZE, "address")?;
    let mut raw = [0u8; ADDRESS_SIZE];
    raw.copy_from_slice(block);
    let address = decode_address(&raw).map_err(|e| match e {
        VsamError::Corrupted { offset, reason } => {
            VsamError::corrupted(address_offset as u64 + offset, reason)
        }
        other => other,
    })?;

    let record = Record::new(Key::new(key), payload.to_vec()).with_address(address);
    Ok((record, offset))
}

fn take_len(data: &[u8], offset: &mut usize, field: &str) -> VsamResult<usize> {
    let bytes = take_bytes(data, offset, 8, field)?;
    let len = read_u64(bytes);
    usize::try_from(len).map_err(|_| {
        VsamError::corrupted(*offset as u64 - 8, format!("{} length {} too large", field, len))
    })
}

fn take_bytes<'a>(
    data: &'a [u8],
    offset: &mut usize,
    len: usize,
    field: &str,
) -> VsamResult<&'a [u8]> {
    let end = offset.checked_add(len).filter(|end| *end <= data.len()).ok_or_else(|| {
        VsamError::corrupted(
            *offset as u64,
            format!("truncated {}: need {} bytes, {} available", field, len, data.len() - *offset),
        )
    })?;
    let slice = &data[*offset..end];
    *offset = end;
    Ok(slice)
}
