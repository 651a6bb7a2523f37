//! Majority-vote segment relabeling.
//!
//! After recoding, a connected region can carry a mix of labels (land
//! cover rarely aligns pixel-perfect with field boundaries). Each
//! non-edge connected region is forced to a single class by majority
//! vote so downstream consumers can treat segments as homogeneous.

use std::collections::HashMap;

use ndarray::Array2;

use crate::raster::label_components;
use crate::types::{BACKGROUND, CROP, EDGE, LabelKind, PipelineError};

/// Relabel every non-edge connected region to a single class.
///
/// `reference` is the 3-class label array from edge detection; its
/// edge pixels are excluded from connectivity so regions stay separated
/// by their boundaries. `labels` holds the (possibly recoded) classes
/// being uniformized, and is modified in place.
///
/// Per region: no crop pixels at all, or a crop fraction of at most
/// one half, relabels the whole region background. A crop majority
/// relabels the region to the single crop class
/// ([`LabelKind::Boundaries`]) or to the most frequent nonzero class
/// ([`LabelKind::CropTypes`]; ties break to the lowest class id).
///
/// Returns the segment map used for the vote.
///
/// # Errors
///
/// [`PipelineError::ArrayTooLarge`] when a dimension exceeds `u32`.
pub fn uniformize_segments(
    labels: &mut Array2<u8>,
    reference: &Array2<u8>,
    kind: LabelKind,
) -> Result<Array2<u32>, PipelineError> {
    let non_edge = reference.mapv(|l| u8::from(l != EDGE));
    let segments = label_components(&non_edge)?;

    // One pass: per-segment area, crop count, and class histogram.
    struct Vote {
        area: usize,
        crop: usize,
        counts: HashMap<u8, usize>,
    }
    let mut votes: HashMap<u32, Vote> = HashMap::new();
    for ((i, j), &segment) in segments.indexed_iter() {
        if segment == 0 {
            continue;
        }
        let vote = votes.entry(segment).or_insert_with(|| Vote {
            area: 0,
            crop: 0,
            counts: HashMap::new(),
        });
        vote.area += 1;
        let label = labels[[i, j]];
        if label != BACKGROUND {
            vote.crop += 1;
            *vote.counts.entry(label).or_insert(0) += 1;
        }
    }

    // Resolve each segment to one class.
    let decisions: HashMap<u32, u8> = votes
        .into_iter()
        .map(|(segment, vote)| {
            #[allow(clippy::cast_precision_loss)]
            let crop_fraction = vote.crop as f64 / vote.area as f64;
            let class = if vote.crop == 0 || crop_fraction <= 0.5 {
                BACKGROUND
            } else {
                match kind {
                    LabelKind::Boundaries => CROP,
                    LabelKind::CropTypes => mode_class(&vote.counts),
                }
            };
            (segment, class)
        })
        .collect();

    for ((i, j), &segment) in segments.indexed_iter() {
        if segment == 0 {
            continue;
        }
        if let Some(&class) = decisions.get(&segment) {
            labels[[i, j]] = class;
        }
    }

    Ok(segments)
}

/// Most frequent class; ties break to the lowest class id so the
/// result does not depend on hash iteration order.
fn mode_class(counts: &HashMap<u8, usize>) -> u8 {
    counts
        .iter()
        .max_by(|(class_a, count_a), (class_b, count_b)| {
            count_a.cmp(count_b).then(class_b.cmp(class_a))
        })
        .map_or(BACKGROUND, |(&class, _)| class)
}
