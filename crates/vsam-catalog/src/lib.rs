//! Dataset catalog for vsam-core
//!
//! Defines, looks up, lists and deletes KSDS engines by cluster name.
//!
//! # Architecture
//!
//! A catalog is an ordinary value the caller constructs and passes around;
//! there is no process-wide default. Rooted catalogs give each dataset a
//! snapshot file `<root>/<CLUSTER>.ksds`, restored on define and rewritten
//! whenever the dataset is closed.

pub mod catalog;
pub mod error;

pub use catalog::Catalog;
pub use error::{CatalogError, CatalogResult};
