//! arable-store: append-only persistence for training samples.
//!
//! Samples are addressed by [`TrainId`] and persisted through the
//! [`SampleStore`] trait. The shipped implementation,
//! [`DirectoryStore`], writes NPZ array bundles with JSON metadata
//! sidecars; the trait seam keeps the grid orchestration testable
//! without touching a filesystem.

pub mod directory;
pub mod id;
pub mod record;

pub use directory::{DirectoryStore, Sidecar};
pub use id::TrainId;
pub use record::{SampleMeta, TrainingRecord};

use ndarray_npy::WriteNpzError;

/// Persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("NPZ serialization: {0}")]
    Npz(#[from] WriteNpzError),

    #[error("metadata serialization: {0}")]
    Json(#[from] serde_json::Error),

    /// The store is append-only; an id can be written once.
    #[error("sample {id} already exists")]
    DuplicateId { id: String },
}

/// Where prepared samples go.
///
/// `contains` lets callers skip preparation work for samples that are
/// already persisted; `write` must refuse to overwrite.
pub trait SampleStore {
    fn contains(&self, id: &TrainId) -> bool;

    /// Persist one record.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateId`] when the id was written before, or
    /// the underlying serialization/I/O error.
    fn write(&self, record: &TrainingRecord) -> Result<(), StoreError>;
}
