//! Catalog errors.

use thiserror::Error;
use vsam_core::VsamError;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Dataset not cataloged: {name}")]
    NotFound { name: String },

    #[error("Dataset already cataloged: {name}")]
    AlreadyDefined { name: String },

    #[error("Dataset in use: {name} is open")]
    InUse { name: String },

    #[error(transparent)]
    Dataset(#[from] VsamError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;
