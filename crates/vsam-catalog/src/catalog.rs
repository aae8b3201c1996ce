//! Dataset catalog.
//!
//! A [`Catalog`] is an explicitly constructed registry of engines keyed by
//! cluster name. Engines are handed out as `Arc<KsdsEngine>` so several
//! callers can share one dataset.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use tracing::{debug, info};

use vsam_core::{create_dataset, DatasetDefinition, KsdsEngine};

use crate::error::{CatalogError, CatalogResult};

/// File extension for catalog-managed snapshot files
pub const SNAPSHOT_EXTENSION: &str = "ksds";

pub struct Catalog {
    /// Directory holding snapshot files, `None` for a purely in-memory catalog
    root: Option<PathBuf>,
    /// Engines by upper-cased cluster name
    datasets: RwLock<HashMap<String, Arc<KsdsEngine>>>,
}

impl Catalog {
    /// In-memory catalog. Datasets are never persisted.
    pub fn new() -> Self {
        Self { root: None, datasets: RwLock::new(HashMap::new()) }
    }

    /// Catalog whose datasets persist under `root` as `<CLUSTER>.ksds`.
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: Some(root.as_ref().to_path_buf()),
            datasets: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    fn normalize(name: &str) -> String {
        name.trim().to_ascii_uppercase()
    }

    fn location_for(&self, name: &str) -> Option<PathBuf> {
        self.root.as_ref().map(|root| root.join(format!("{}.{}", name, SNAPSHOT_EXTENSION)))
    }

    /// Validate `definition`, build its engine and register it.
    ///
    /// When the catalog is rooted and a snapshot for the cluster exists, the
    /// engine starts from it.
    pub fn define(&self, mut definition: DatasetDefinition) -> CatalogResult<Arc<KsdsEngine>> {
        let name = Self::normalize(&definition.cluster_name);
        definition.cluster_name = name.clone();

        let mut datasets = self.datasets.write();
        if datasets.contains_key(&name) {
            return Err(CatalogError::AlreadyDefined { name });
        }

        let location = self.location_for(&name);
        let engine = Arc::new(create_dataset(definition, location.as_deref())?);
        datasets.insert(name.clone(), Arc::clone(&engine));
        info!(cluster = %name, records = engine.record_count(), "dataset defined");
        Ok(engine)
    }

    pub fn lookup(&self, name: &str) -> CatalogResult<Arc<KsdsEngine>> {
        let name = Self::normalize(name);
        self.datasets
            .read()
            .get(&name)
            .cloned()
            .ok_or(CatalogError::NotFound { name })
    }

    /// Remove a dataset from the catalog, along with its snapshot file.
    ///
    /// An open dataset is refused.
    pub fn delete(&self, name: &str) -> CatalogResult<()> {
        let name = Self::normalize(name);
        let mut datasets = self.datasets.write();
        let engine = datasets
            .get(&name)
            .ok_or_else(|| CatalogError::NotFound { name: name.clone() })?;
        if engine.is_open() {
            return Err(CatalogError::InUse { name });
        }

        if let Some(path) = engine.location() {
            match std::fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "snapshot removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(CatalogError::Dataset(e.into())),
            }
        }
        datasets.remove(&name);
        info!(cluster = %name, "dataset deleted");
        Ok(())
    }

    /// Cataloged cluster names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.datasets.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.datasets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.read().is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("root", &self.root)
            .field("datasets", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vsam_core::{AccessMode, ProcessingMode};

    #[test]
    fn test_define_and_lookup() {
        let catalog = Catalog::new();
        let engine = catalog.define(DatasetDefinition::ksds("payroll.master", 8)).unwrap();
        assert_eq!(engine.cluster_name(), "PAYROLL.MASTER");

        let found = catalog.lookup("Payroll.Master").unwrap();
        assert!(Arc::ptr_eq(&engine, &found));
        assert!(matches!(catalog.lookup("OTHER"), Err(CatalogError::NotFound { .. })));
    }

    #[test]
    fn test_duplicate_define_rejected() {
        let catalog = Catalog::new();
        catalog.define(DatasetDefinition::ksds("A.KSDS", 8)).unwrap();
        let err = catalog.define(DatasetDefinition::ksds("a.ksds", 4)).unwrap_err();
        assert!(matches!(err, CatalogError::AlreadyDefined { ref name } if name == "A.KSDS"));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_define_propagates_dataset_errors() {
        let catalog = Catalog::new();
        let err = catalog.define(DatasetDefinition::esds("LOG.ESDS")).unwrap_err();
        assert!(matches!(err, CatalogError::Dataset(_)));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_delete_refuses_open_dataset() {
        let catalog = Catalog::new();
        let engine = catalog.define(DatasetDefinition::ksds("A.KSDS", 8)).unwrap();
        engine.open(AccessMode::Input, ProcessingMode::Random).unwrap();
        assert!(matches!(catalog.delete("A.KSDS"), Err(CatalogError::InUse { .. })));

        engine.close().unwrap();
        catalog.delete("A.KSDS").unwrap();
        assert!(catalog.is_empty());
        assert!(matches!(catalog.delete("A.KSDS"), Err(CatalogError::NotFound { .. })));
    }

    #[test]
    fn test_list_sorted() {
        let catalog = Catalog::new();
        for name in ["C.KSDS", "A.KSDS", "B.KSDS"] {
            catalog.define(DatasetDefinition::ksds(name, 8)).unwrap();
        }
        assert_eq!(catalog.list(), vec!["A.KSDS", "B.KSDS", "C.KSDS"]);
    }

    #[test]
    fn test_rooted_location() {
        let dir = TempDir::new().unwrap();
        let catalog = Catalog::with_root(dir.path());
        let engine = catalog.define(DatasetDefinition::ksds("a.ksds", 8)).unwrap();
        assert_eq!(engine.location(), Some(dir.path().join("A.KSDS.ksds").as_path()));
        assert!(format!("{:?}", catalog).contains("Catalog"));
    }
}
