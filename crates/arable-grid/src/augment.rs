//! Augmentation fan-out.
//!
//! The transforms themselves are external collaborators behind the
//! [`Augmenter`] trait; this module only knows how a configured
//! augmentation name expands into persisted record identities.

use arable_pipeline::LabeledSample;
use arable_store::TrainId;

/// Prefix marking temporal augmentations, which expand into one record
/// per temporal index.
const TEMPORAL_PREFIX: &str = "ts-";

/// One configured augmentation variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Augmentation {
    pub name: String,
    /// `Some(n)` for temporal augmentations: `n` indexed records.
    pub temporal_steps: Option<usize>,
}

impl Augmentation {
    /// Parse a configured name; `ts-`-prefixed names become temporal
    /// with `temporal_steps` indexed variants.
    #[must_use]
    pub fn parse(name: &str, temporal_steps: usize) -> Self {
        let temporal = name
            .starts_with(TEMPORAL_PREFIX)
            .then_some(temporal_steps);
        Self {
            name: name.to_owned(),
            temporal_steps: temporal,
        }
    }

    /// The record identities this augmentation produces for one cell.
    #[must_use]
    pub fn variant_ids(&self, group: &str, grid: &str) -> Vec<TrainId> {
        let base = TrainId::new(group.to_owned(), grid.to_owned(), self.name.clone());
        match self.temporal_steps {
            Some(steps) => (0..steps).map(|i| base.at_step(i)).collect(),
            None => vec![base],
        }
    }
}

/// Transforms a labeled sample into one augmentation variant.
pub trait Augmenter {
    /// `step` is the temporal index for temporal augmentations.
    fn apply(&self, sample: &LabeledSample, step: Option<usize>) -> LabeledSample;
}

/// Pass-through variant, used for the un-augmented `none` record and
/// as the fallback when no transform is registered for a name.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityAugmenter;

impl Augmenter for IdentityAugmenter {
    fn apply(&self, sample: &LabeledSample, _step: Option<usize>) -> LabeledSample {
        sample.clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    #[test]
    fn plain_augmentation_yields_one_id() {
        let aug = Augmentation::parse("none", 2);
        assert_eq!(aug.temporal_steps, None);
        let ids = aug.variant_ids("g", "c");
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].to_string(), "g_c_none");
    }

    #[test]
    fn temporal_augmentation_expands_to_indexed_ids() {
        let aug = Augmentation::parse("ts-warp", 3);
        assert_eq!(aug.temporal_steps, Some(3));
        let ids = aug.variant_ids("g", "c");
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[0].to_string(), "g_c_ts-warp_000");
        assert_eq!(ids[2].to_string(), "g_c_ts-warp_002");
    }

    #[test]
    fn identity_augmenter_preserves_the_sample() {
        let sample = LabeledSample {
            stack: Array3::from_elem((2, 3, 3), 0.3f32),
            labels: Array2::from_elem((3, 3), 1u8),
            distance: Array2::from_elem((3, 3), 0.5f32),
            segments: Array2::from_elem((3, 3), 1u32),
            descriptors: Vec::new(),
        };
        let out = IdentityAugmenter.apply(&sample, Some(1));
        assert_eq!(out.labels, sample.labels);
        assert_eq!(out.stack, sample.stack);
    }
}
