//! Rayon-parallel decoding (feature-gated).
//!
//! Grid rows are decoded independently and concatenated in row order, so the
//! result is identical to the sequential decoder.

use crate::anchors::AnchorPrior;
use crate::decode::{decode_row, Candidates};
use crate::tensor::RawOutput;
use rayon::prelude::*;

/// Row-parallel decode.
///
/// Each task owns the probability slice of its row and returns that row's
/// boxes; boxes are stitched back in row order afterwards.
pub(crate) fn decode_par(raw: RawOutput<'_>, anchors: &[AnchorPrior]) -> Candidates {
    let layout = raw.layout();
    let per_row = layout.grid().width * layout.num_anchors();
    let mut probs = vec![0.0f32; layout.num_candidates() * layout.num_classes()];

    let row_boxes: Vec<_> = probs
        .par_chunks_exact_mut(per_row * layout.num_classes())
        .enumerate()
        .map(|(row, probs_row)| {
            let mut boxes = Vec::with_capacity(per_row);
            decode_row(raw, anchors, row, &mut boxes, probs_row);
            boxes
        })
        .collect();

    let mut boxes = Vec::with_capacity(layout.num_candidates());
    for row in row_boxes {
        boxes.extend(row);
    }

    Candidates {
        boxes,
        probs,
        num_classes: layout.num_classes(),
    }
}
