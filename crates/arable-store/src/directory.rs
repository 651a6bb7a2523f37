//! Append-only directory store.
//!
//! Each sample becomes two files named by its [`TrainId`]:
//! `data_{id}.npz` holding the arrays and `data_{id}.json` holding the
//! metadata sidecar. Existing samples are never overwritten: a rerun of
//! the same preparation job skips everything already on disk, so
//! interrupted runs resume instead of redoing work.

use std::fs::File;
use std::path::{Path, PathBuf};

use log::debug;
use ndarray_npy::NpzWriter;
use serde::{Deserialize, Serialize};

use arable_pipeline::SegmentDescriptor;

use crate::id::TrainId;
use crate::record::{SampleMeta, TrainingRecord};
use crate::{SampleStore, StoreError};

/// JSON sidecar layout: identity, metadata, and segment descriptors.
#[derive(Debug, Serialize, Deserialize)]
pub struct Sidecar {
    pub id: TrainId,
    pub meta: SampleMeta,
    pub descriptors: Vec<SegmentDescriptor>,
}

/// Store that persists samples as NPZ + JSON pairs under one directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] when the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn array_path(&self, id: &TrainId) -> PathBuf {
        self.root.join(format!("data_{id}.npz"))
    }

    #[must_use]
    pub fn sidecar_path(&self, id: &TrainId) -> PathBuf {
        self.root.join(format!("data_{id}.json"))
    }

    /// Read back a sidecar, mostly for inspection tooling.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] / [`StoreError::Json`] on unreadable or
    /// malformed sidecars.
    pub fn read_sidecar(&self, id: &TrainId) -> Result<Sidecar, StoreError> {
        let file = File::open(self.sidecar_path(id))?;
        Ok(serde_json::from_reader(file)?)
    }
}

impl SampleStore for DirectoryStore {
    fn contains(&self, id: &TrainId) -> bool {
        self.array_path(id).exists()
    }

    fn write(&self, record: &TrainingRecord) -> Result<(), StoreError> {
        let array_path = self.array_path(&record.id);
        if array_path.exists() {
            return Err(StoreError::DuplicateId {
                id: record.id.to_string(),
            });
        }

        let mut npz = NpzWriter::new(File::create(&array_path)?);
        npz.add_array("x", &record.stack)?;
        npz.add_array("y", &record.labels)?;
        npz.add_array("bdist", &record.distance)?;
        npz.add_array("segments", &record.segments)?;
        npz.finish()?;

        let sidecar = Sidecar {
            id: record.id.clone(),
            meta: record.meta.clone(),
            descriptors: record.descriptors.clone(),
        };
        let file = File::create(self.sidecar_path(&record.id))?;
        serde_json::to_writer_pretty(file, &sidecar)?;

        debug!("stored sample {}", record.id);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};
    use ndarray_npy::NpzReader;

    fn sample_record(grid: &str) -> TrainingRecord {
        TrainingRecord {
            id: TrainId::new("site_2020_2021".into(), grid.into(), "none".into()),
            stack: Array3::from_elem((6, 5, 5), 0.25f32),
            labels: Array2::from_elem((5, 5), 1u8),
            distance: Array2::from_elem((5, 5), 0.5f32),
            segments: Array2::from_elem((5, 5), 1u32),
            descriptors: Vec::new(),
            meta: SampleMeta {
                group_id: "site_2020_2021".into(),
                grid_id: grid.into(),
                start_year: Some(2020),
                end_year: Some(2021),
                bounds: [0.0, 0.0, 50.0, 50.0],
                geo_bounds: None,
                resolution: 10.0,
                time_steps: 2,
                bands_per_step: 3,
            },
        }
    }

    #[test]
    fn writes_arrays_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::open(dir.path()).unwrap();
        let record = sample_record("cell0");
        store.write(&record).unwrap();

        let mut npz = NpzReader::new(File::open(store.array_path(&record.id)).unwrap()).unwrap();
        let stack: Array3<f32> = npz.by_name("x.npy").unwrap();
        let labels: Array2<u8> = npz.by_name("y.npy").unwrap();
        assert_eq!(stack, record.stack);
        assert_eq!(labels, record.labels);

        let sidecar = store.read_sidecar(&record.id).unwrap();
        assert_eq!(sidecar.meta, record.meta);
        assert_eq!(sidecar.id, record.id);
    }

    #[test]
    fn contains_reflects_written_samples() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::open(dir.path()).unwrap();
        let record = sample_record("cell1");
        assert!(!store.contains(&record.id));
        store.write(&record).unwrap();
        assert!(store.contains(&record.id));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::open(dir.path()).unwrap();
        let record = sample_record("cell2");
        store.write(&record).unwrap();
        let err = store.write(&record).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId { .. }));
    }

    #[test]
    fn distinct_augmentations_coexist() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::open(dir.path()).unwrap();
        let plain = sample_record("cell3");
        let mut flipped = sample_record("cell3");
        flipped.id.augmentation = "fliplr".into();
        store.write(&plain).unwrap();
        store.write(&flipped).unwrap();
        assert!(store.contains(&plain.id));
        assert!(store.contains(&flipped.id));
    }

    #[test]
    fn open_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = DirectoryStore::open(&nested).unwrap();
        assert_eq!(store.root(), nested.as_path());
        assert!(nested.is_dir());
    }
}
