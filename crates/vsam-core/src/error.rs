//! Error types for VSAM operations
//!
//! Every engine operation returns a [`VsamResult`]. Each [`VsamError`] variant
//! is exactly one kind from the error taxonomy and carries enough context to
//! render a human-readable detail string.
//!
//! `EndOfFile`, `StartOfFile` and `RecordNotFound` are ordinary signals a
//! caller branches on (browse termination, lookup misses). They are not faults.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::definition::Organization;

/// Error kind, without context. Useful for branching and for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AlreadyOpen,
    FileNotOpen,
    InvalidRequest,
    DuplicateKey,
    RecordNotFound,
    RbaNotFound,
    EndOfFile,
    StartOfFile,
    InvalidBrowseId,
    InvalidArgument,
    UnsupportedOrganization,
    Io,
    Corrupted,
    ChecksumMismatch,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::AlreadyOpen => "ALREADY_OPEN",
            ErrorKind::FileNotOpen => "FILE_NOT_OPEN",
            ErrorKind::InvalidRequest => "INVALID_REQUEST",
            ErrorKind::DuplicateKey => "DUPLICATE_KEY",
            ErrorKind::RecordNotFound => "RECORD_NOT_FOUND",
            ErrorKind::RbaNotFound => "RBA_NOT_FOUND",
            ErrorKind::EndOfFile => "END_OF_FILE",
            ErrorKind::StartOfFile => "START_OF_FILE",
            ErrorKind::InvalidBrowseId => "INVALID_BROWSE_ID",
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::UnsupportedOrganization => "UNSUPPORTED_ORGANIZATION",
            ErrorKind::Io => "IO_ERROR",
            ErrorKind::Corrupted => "CORRUPTED",
            ErrorKind::ChecksumMismatch => "CHECKSUM_MISMATCH",
        };
        f.write_str(name)
    }
}

/// VSAM error types with detailed context
#[derive(Debug, Clone, Error)]
pub enum VsamError {
    /// `open` called on a dataset that is already open
    #[error("Dataset {cluster} is already open")]
    AlreadyOpen {
        /// Cluster name of the dataset
        cluster: String,
    },

    /// I/O request issued against a closed dataset
    #[error("Dataset {cluster} is not open")]
    FileNotOpen {
        /// Cluster name of the dataset
        cluster: String,
    },

    /// Request not permitted in the current access mode or organization
    #[error("Invalid request: {reason}")]
    InvalidRequest {
        /// Why the request was refused
        reason: String,
    },

    /// Write of a key that is already stored
    #[error("Duplicate key {key}")]
    DuplicateKey {
        /// Printable form of the key
        key: String,
    },

    /// Keyed lookup missed
    #[error("Record not found for key {key}")]
    RecordNotFound {
        /// Printable form of the key
        key: String,
    },

    /// Addressed lookup missed
    #[error("No record at RBA {rba}")]
    RbaNotFound {
        /// Relative byte address that was requested
        rba: u64,
    },

    /// Forward browse exhausted
    #[error("End of file on browse {browse_id}")]
    EndOfFile {
        /// Browse cursor that hit the end
        browse_id: u64,
    },

    /// Backward browse exhausted
    #[error("Beginning of file on browse {browse_id}")]
    StartOfFile {
        /// Browse cursor that hit the start
        browse_id: u64,
    },

    /// Browse id unknown (never issued, ended, or discarded by close)
    #[error("Invalid browse id {browse_id}")]
    InvalidBrowseId {
        /// The id that was presented
        browse_id: u64,
    },

    /// Dataset definition failed validation
    #[error("Invalid {field}: {reason}")]
    InvalidArgument {
        /// Offending definition field
        field: &'static str,
        /// Human-readable description
        reason: String,
    },

    /// No engine exists for this organization
    #[error("No engine available for {organization} organization")]
    UnsupportedOrganization {
        /// Requested organization
        organization: Organization,
    },

    /// I/O operation failed
    #[error("{}", format_io(.path, .kind, .message))]
    Io {
        /// The file path where the error occurred
        path: Option<PathBuf>,
        /// The underlying I/O error kind
        kind: std::io::ErrorKind,
        /// Human-readable description
        message: String,
    },

    /// Snapshot or wire data is structurally invalid
    #[error("Corrupted data at offset {offset}: {reason}")]
    Corrupted {
        /// Byte offset where the problem was detected
        offset: u64,
        /// Description of the corruption
        reason: String,
    },

    /// Checksum verification failed
    #[error(
        "Checksum mismatch in {} at offset {offset}: expected 0x{expected:08x}, got 0x{actual:08x}",
        .path.display()
    )]
    ChecksumMismatch {
        /// File where checksum failed
        path: PathBuf,
        /// Expected checksum value
        expected: u32,
        /// Actual checksum computed
        actual: u32,
        /// Byte offset of the corrupted frame
        offset: u64,
    },
}

fn format_io(path: &Option<PathBuf>, kind: &std::io::ErrorKind, message: &str) -> String {
    match path {
        Some(path) => format!("I/O error in {}: {} ({})", path.display(), message, kind),
        None => format!("I/O error: {} ({})", message, kind),
    }
}

impl VsamError {
    /// The taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VsamError::AlreadyOpen { .. } => ErrorKind::AlreadyOpen,
            VsamError::FileNotOpen { .. } => ErrorKind::FileNotOpen,
            VsamError::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            VsamError::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            VsamError::RecordNotFound { .. } => ErrorKind::RecordNotFound,
            VsamError::RbaNotFound { .. } => ErrorKind::RbaNotFound,
            VsamError::EndOfFile { .. } => ErrorKind::EndOfFile,
            VsamError::StartOfFile { .. } => ErrorKind::StartOfFile,
            VsamError::InvalidBrowseId { .. } => ErrorKind::InvalidBrowseId,
            VsamError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            VsamError::UnsupportedOrganization { .. } => ErrorKind::UnsupportedOrganization,
            VsamError::Io { .. } => ErrorKind::Io,
            VsamError::Corrupted { .. } => ErrorKind::Corrupted,
            VsamError::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
        }
    }

    /// Human-readable detail string.
    pub fn detail(&self) -> String {
        self.to_string()
    }

    /// Two-digit VSAM/COBOL file status code for this error.
    pub fn file_status(&self) -> &'static str {
        match self.kind() {
            ErrorKind::EndOfFile | ErrorKind::StartOfFile => "10",
            ErrorKind::DuplicateKey => "22",
            ErrorKind::RecordNotFound | ErrorKind::RbaNotFound => "23",
            ErrorKind::AlreadyOpen => "41",
            ErrorKind::FileNotOpen => "47",
            ErrorKind::InvalidArgument | ErrorKind::UnsupportedOrganization => "39",
            ErrorKind::InvalidRequest | ErrorKind::InvalidBrowseId => "92",
            ErrorKind::Io | ErrorKind::Corrupted | ErrorKind::ChecksumMismatch => "90",
        }
    }

    /// True for end-of-file in either browse direction.
    pub fn is_end_of_data(&self) -> bool {
        matches!(self, VsamError::EndOfFile { .. } | VsamError::StartOfFile { .. })
    }

    pub(crate) fn invalid_request(reason: impl Into<String>) -> Self {
        VsamError::InvalidRequest { reason: reason.into() }
    }

    pub(crate) fn invalid_argument(field: &'static str, reason: impl Into<String>) -> Self {
        VsamError::InvalidArgument { field, reason: reason.into() }
    }

    pub(crate) fn corrupted(offset: u64, reason: impl Into<String>) -> Self {
        VsamError::Corrupted { offset, reason: reason.into() }
    }
}

/// Convert std::io::Error to VsamError::Io
impl From<std::io::Error> for VsamError {
    fn from(err: std::io::Error) -> Self {
        VsamError::Io {
            path: None,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for VSAM operations
pub type VsamResult<T> = Result<T, VsamError>;
