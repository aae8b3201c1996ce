//! Key, address and record value types.
//!
//! Keys order lexicographically over raw bytes. An [`Address`] is either a
//! relative byte address or a relative record number, never both.

use std::borrow::Borrow;
use std::fmt;
use std::time::SystemTime;

/// Ordered byte key. Immutable once built.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Box<[u8]>);

impl Key {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into().into_boxed_slice())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[u8]> for Key {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes)
    }
}

impl<const N: usize> From<&[u8; N]> for Key {
    fn from(bytes: &[u8; N]) -> Self {
        Self::new(&bytes[..])
    }
}

impl From<Vec<u8>> for Key {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Borrow<[u8]> for Key {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

/// Printable ASCII keys render as text, anything else as hex.
impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_key(&self.0, f)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key(")?;
        display_key(&self.0, f)?;
        write!(f, ")")
    }
}

fn display_key(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if !bytes.is_empty() && bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
        for b in bytes {
            write!(f, "{}", *b as char)?;
        }
        Ok(())
    } else {
        write!(f, "0x")?;
        for b in bytes {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Printable rendering of raw key bytes, used in error details.
pub(crate) fn printable_key(bytes: &[u8]) -> String {
    struct Printable<'a>(&'a [u8]);
    impl fmt::Display for Printable<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            display_key(self.0, f)
        }
    }
    Printable(bytes).to_string()
}

/// Physical address of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Address {
    /// Not yet assigned. Never attached to a stored record.
    #[default]
    Invalid,
    /// Relative byte address
    Rba(u64),
    /// Relative record number
    Rrn(u64),
}

impl Address {
    pub fn rba(&self) -> Option<u64> {
        match self {
            Address::Rba(rba) => Some(*rba),
            _ => None,
        }
    }

    pub fn rrn(&self) -> Option<u64> {
        match self {
            Address::Rrn(rrn) => Some(*rrn),
            _ => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Address::Invalid)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Invalid => write!(f, "INVALID"),
            Address::Rba(rba) => write!(f, "RBA({})", rba),
            Address::Rrn(rrn) => write!(f, "RRN({})", rrn),
        }
    }
}

/// A logical record: key, payload, address and modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    key: Key,
    data: Vec<u8>,
    address: Address,
    modified: SystemTime,
    deleted: bool,
}

impl Record {
    /// New unaddressed record. The engine assigns the address on write.
    pub fn new(key: impl Into<Key>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            data: data.into(),
            address: Address::Invalid,
            modified: SystemTime::now(),
            deleted: false,
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Key length plus payload length.
    pub fn stored_len(&self) -> u64 {
        (self.key.len() + self.data.len()) as u64
    }

    pub(crate) fn with_address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }

    pub(crate) fn replace_data(&mut self, data: Vec<u8>) {
        self.data = data;
        self.modified = SystemTime::now();
    }

    pub(crate) fn touch(&mut self) {
        self.modified = SystemTime::now();
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.deleted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ordering_is_bytewise() {
        let mut keys = vec![Key::from("KEY00003"), Key::from("KEY00001"), Key::from("KEY00002")];
        keys.sort();
        assert_eq!(keys[0].as_bytes(), b"KEY00001");
        assert_eq!(keys[2].as_bytes(), b"KEY00003");

        // Shorter prefix sorts first, high bytes sort last
        assert!(Key::from("A") < Key::from("AA"));
        assert!(Key::new(vec![0x7f]) < Key::new(vec![0x80]));
    }

    #[test]
    fn test_key_display() {
        assert_eq!(Key::from("KEY 1").to_string(), "KEY 1");
        assert_eq!(Key::new(vec![0x00, 0xff]).to_string(), "0x00ff");
        assert_eq!(format!("{:?}", Key::from("A")), "Key(A)");
    }

    #[test]
    fn test_address_exclusive() {
        let rba = Address::Rba(42);
        assert_eq!(rba.rba(), Some(42));
        assert_eq!(rba.rrn(), None);
        assert!(rba.is_valid());

        let rrn = Address::Rrn(7);
        assert_eq!(rrn.rba(), None);
        assert_eq!(rrn.rrn(), Some(7));

        assert!(!Address::default().is_valid());
    }

    #[test]
    fn test_new_record_unaddressed() {
        let record = Record::new("KEY00001", b"payload".to_vec());
        assert_eq!(record.address(), Address::Invalid);
        assert!(!record.is_deleted());
        assert_eq!(record.stored_len(), 15);
    }

    #[test]
    fn test_replace_data_refreshes_timestamp() {
        let mut record = Record::new("K", b"old".to_vec()).with_address(Address::Rba(10));
        let before = record.modified();
        std::thread::sleep(std::time::Duration::from_millis(2));
        record.replace_data(b"new".to_vec());
        assert_eq!(record.data(), b"new");
        assert_eq!(record.address(), Address::Rba(10));
        assert!(record.modified() >= before);
    }
}
