//! Training-sample identity.
//!
//! Every persisted sample is addressed by a [`TrainId`]: the region
//! group it came from, the grid cell within the group, the augmentation
//! variant, and (for per-timestep exports) the temporal index. The
//! rendered form is the filename stem, so identity and on-disk layout
//! cannot drift apart.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of one training sample.
///
/// Renders as `{group}_{grid}_{augmentation}` with an optional
/// zero-padded `_{index:03}` temporal suffix, e.g.
/// `site_2020_2021_cell17_none` or `site_2020_2021_cell17_ts-aug_004`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrainId {
    /// Region/year group, e.g. `site_2020_2021`.
    pub group: String,
    /// Grid-cell id within the group.
    pub grid: String,
    /// Augmentation variant name, `none` for the untouched sample.
    pub augmentation: String,
    /// Temporal index for per-timestep exports.
    pub temporal_index: Option<usize>,
}

impl TrainId {
    #[must_use]
    pub const fn new(group: String, grid: String, augmentation: String) -> Self {
        Self {
            group,
            grid,
            augmentation,
            temporal_index: None,
        }
    }

    /// The same identity at a specific temporal index.
    #[must_use]
    pub fn at_step(&self, index: usize) -> Self {
        Self {
            temporal_index: Some(index),
            ..self.clone()
        }
    }
}

impl fmt::Display for TrainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.group, self.grid, self.augmentation)?;
        if let Some(index) = self.temporal_index {
            write!(f, "_{index:03}")?;
        }
        Ok(())
    }
}
