//! Dataset factory.

use std::path::Path;

use tracing::{debug, info};

use crate::definition::{DatasetDefinition, Organization};
use crate::engine::KsdsEngine;
use crate::error::{VsamError, VsamResult};

/// Build an engine for `definition`.
///
/// The definition is validated first. Only key-sequenced datasets have an
/// engine; other organizations fail with `UnsupportedOrganization`. When
/// `location` names an existing snapshot, the engine is restored from it and
/// will save back there on close.
pub fn create_dataset(
    definition: DatasetDefinition,
    location: Option<&Path>,
) -> VsamResult<KsdsEngine> {
    definition.validate()?;

    if definition.organization != Organization::Ksds {
        return Err(VsamError::UnsupportedOrganization { organization: definition.organization });
    }

    let engine = KsdsEngine::with_location(definition, location.map(Path::to_path_buf));
    match location {
        Some(path) if path.exists() => {
            engine.load_snapshot(path)?;
            info!(cluster = %engine.cluster_name(), path = %path.display(), "dataset restored");
        }
        _ => debug!(cluster = %engine.cluster_name(), "dataset created"),
    }
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{AccessMode, ProcessingMode};
    use crate::error::ErrorKind;
    use crate::types::Record;
    use tempfile::TempDir;

    #[test]
    fn test_create_ksds() {
        let engine = create_dataset(DatasetDefinition::ksds("MY.KSDS", 8), None).unwrap();
        assert_eq!(engine.cluster_name(), "MY.KSDS");
        assert!(!engine.is_open());
        assert_eq!(engine.record_count(), 0);
        assert!(engine.location().is_none());
    }

    #[test]
    fn test_unsupported_organizations() {
        for def in [
            DatasetDefinition::esds("MY.ESDS"),
            DatasetDefinition::rrds("MY.RRDS"),
            DatasetDefinition::lds("MY.LDS"),
        ] {
            let err = create_dataset(def, None).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedOrganization);
        }
    }

    #[test]
    fn test_invalid_definition_rejected() {
        let err = create_dataset(DatasetDefinition::ksds("MY.KSDS", 0), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_restore_from_location() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("MY.KSDS.snap");

        let engine = create_dataset(DatasetDefinition::ksds("MY.KSDS", 8), Some(&path)).unwrap();
        assert_eq!(engine.location(), Some(path.as_path()));
        engine.open(AccessMode::Output, ProcessingMode::Sequential).unwrap();
        engine.write(Record::new("KEY00001", b"persisted".to_vec())).unwrap();
        engine.close().unwrap();

        let engine = create_dataset(DatasetDefinition::ksds("MY.KSDS", 8), Some(&path)).unwrap();
        engine.open(AccessMode::Input, ProcessingMode::Random).unwrap();
        assert_eq!(engine.read(b"KEY00001").unwrap().data(), b"persisted");
    }
}
