//! Dataset definitions
//!
//! A [`DatasetDefinition`] is the DEFINE CLUSTER equivalent: it names the
//! cluster, picks an organization and fixes key and record geometry.
//! Presets exist per organization, with builder methods for the rest.

use std::fmt;

use crate::error::{VsamError, VsamResult};

/// Smallest control-interval size accepted
pub const MIN_CI_SIZE: u32 = 512;

/// Largest control-interval size accepted
pub const MAX_CI_SIZE: u32 = 32 * 1024;

/// Control-interval size used by the presets
pub const DEFAULT_CI_SIZE: u32 = 4096;

/// Hard ceiling on the maximum record length (non-spanned)
pub const MAX_RECORD_LENGTH: u32 = 32_761;

/// Longest KSDS key
pub const MAX_KEY_LENGTH: u32 = 255;

/// VSAM file organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Organization {
    /// Key-sequenced
    Ksds,
    /// Entry-sequenced
    Esds,
    /// Relative-record
    Rrds,
    /// Linear
    Lds,
}

impl fmt::Display for Organization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Organization::Ksds => "KSDS",
            Organization::Esds => "ESDS",
            Organization::Rrds => "RRDS",
            Organization::Lds => "LDS",
        })
    }
}

/// Cluster definition: name, organization and geometry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetDefinition {
    /// Cluster name, e.g. `PROD.CUSTOMER.KSDS`
    pub cluster_name: String,
    /// File organization
    pub organization: Organization,
    /// Key length in bytes (KSDS only, must be > 0)
    pub key_length: u32,
    /// Key offset within the logical record
    pub key_offset: u32,
    /// Control-interval size in bytes
    pub ci_size: u32,
    /// Average record length in bytes
    pub average_record_length: u32,
    /// Maximum record length in bytes
    pub maximum_record_length: u32,
}

impl DatasetDefinition {
    fn base(cluster_name: impl Into<String>, organization: Organization) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            organization,
            key_length: 0,
            key_offset: 0,
            ci_size: DEFAULT_CI_SIZE,
            average_record_length: 80,
            maximum_record_length: 256,
        }
    }

    /// Key-sequenced cluster with the given key length
    pub fn ksds(cluster_name: impl Into<String>, key_length: u32) -> Self {
        Self {
            key_length,
            ..Self::base(cluster_name, Organization::Ksds)
        }
    }

    /// Entry-sequenced cluster
    pub fn esds(cluster_name: impl Into<String>) -> Self {
        Self::base(cluster_name, Organization::Esds)
    }

    /// Relative-record cluster
    pub fn rrds(cluster_name: impl Into<String>) -> Self {
        Self::base(cluster_name, Organization::Rrds)
    }

    /// Linear cluster
    pub fn lds(cluster_name: impl Into<String>) -> Self {
        Self::base(cluster_name, Organization::Lds)
    }

    pub fn with_ci_size(mut self, ci_size: u32) -> Self {
        self.ci_size = ci_size;
        self
    }

    pub fn with_key_offset(mut self, key_offset: u32) -> Self {
        self.key_offset = key_offset;
        self
    }

    pub fn with_record_lengths(mut self, average: u32, maximum: u32) -> Self {
        self.average_record_length = average;
        self.maximum_record_length = maximum;
        self
    }

    /// Validate all definition parameters.
    ///
    /// Must succeed before an engine is built from this definition.
    pub fn validate(&self) -> VsamResult<()> {
        if self.cluster_name.trim().is_empty() {
            return Err(VsamError::invalid_argument(
                "cluster_name",
                "cluster name must not be empty",
            ));
        }
        if self.organization == Organization::Ksds && self.key_length == 0 {
            return Err(VsamError::invalid_argument("key_length", "KSDS requires key_length > 0"));
        }
        if self.key_length > MAX_KEY_LENGTH {
            return Err(VsamError::invalid_argument(
                "key_length",
                format!("{} exceeds {}", self.key_length, MAX_KEY_LENGTH),
            ));
        }
        if self.ci_size < MIN_CI_SIZE || self.ci_size > MAX_CI_SIZE {
            return Err(VsamError::invalid_argument(
                "ci_size",
                format!("{} outside [{}, {}]", self.ci_size, MIN_CI_SIZE, MAX_CI_SIZE),
            ));
        }
        if self.maximum_record_length == 0 || self.maximum_record_length > MAX_RECORD_LENGTH {
            return Err(VsamError::invalid_argument(
                "maximum_record_length",
                format!("{} outside [1, {}]", self.maximum_record_length, MAX_RECORD_LENGTH),
            ));
        }
        if self.average_record_length > self.maximum_record_length {
            return Err(VsamError::invalid_argument(
                "average_record_length",
                format!(
                    "{} exceeds maximum_record_length {}",
                    self.average_record_length, self.maximum_record_length
                ),
            ));
        }
        Ok(())
    }
}
