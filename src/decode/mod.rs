//! Tensor decoding into candidate boxes.
//!
//! Every `(row, col, anchor)` triple becomes one candidate, emitted in
//! row-major order. A candidate's geometry is fixed at decode time; only its
//! class probabilities change afterwards, when the selector zeroes them.

use crate::anchors::{AnchorPrior, AnchorPriors};
use crate::geometry::BoxGeom;
use crate::tensor::{RawOutput, TensorLayout, BOX_CHANNELS};
use crate::trace::{trace_event, trace_span};
use crate::util::math::{argmax, logistic, softmax_scaled};
use crate::util::{GridDecodeError, GridDecodeResult};

#[cfg(feature = "rayon")]
pub mod rayon;

/// Decoder options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodeConfig {
    /// Fail with [`GridDecodeError::NonFinite`] when the buffer holds NaN or
    /// infinity, and with [`GridDecodeError::SizeOverflow`] when a finite
    /// `tw`/`th` decodes to an infinite box size. Sizes are computed in `f32`,
    /// so this happens for logits above roughly `88 - ln(prior)`. When
    /// disabled, such values flow into the candidates.
    pub reject_non_finite: bool,
    /// Decode grid rows in parallel. Requires the `rayon` feature; ignored
    /// otherwise.
    pub parallel: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            reject_non_finite: true,
            parallel: false,
        }
    }
}

/// Decoded candidates: one box and one probability row per grid anchor.
///
/// Probabilities are stored as a flat row-major `num_candidates x num_classes`
/// matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidates {
    boxes: Vec<BoxGeom>,
    probs: Vec<f32>,
    num_classes: usize,
}

impl Candidates {
    /// Builds candidates from boxes and a flat probability matrix.
    pub fn from_parts(
        boxes: Vec<BoxGeom>,
        probs: Vec<f32>,
        num_classes: usize,
    ) -> GridDecodeResult<Self> {
        if num_classes == 0 {
            return Err(GridDecodeError::InvalidConfig {
                reason: "num_classes must be > 0",
            });
        }
        if boxes.len().checked_mul(num_classes) != Some(probs.len()) {
            return Err(GridDecodeError::InvalidConfig {
                reason: "probability matrix must hold num_classes values per box",
            });
        }
        Ok(Self {
            boxes,
            probs,
            num_classes,
        })
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn boxes(&self) -> &[BoxGeom] {
        &self.boxes
    }

    pub fn bbox(&self, idx: usize) -> Option<&BoxGeom> {
        self.boxes.get(idx)
    }

    /// Class probabilities of candidate `idx`.
    pub fn probs(&self, idx: usize) -> Option<&[f32]> {
        let start = idx.checked_mul(self.num_classes)?;
        self.probs.get(start..start + self.num_classes)
    }

    /// Best class and its probability for candidate `idx`.
    pub fn best_class(&self, idx: usize) -> Option<(usize, f32)> {
        self.probs(idx).and_then(argmax)
    }

    /// Candidates whose best class probability exceeds `threshold`.
    ///
    /// Yields `(index, class_id, confidence)` in decode order without any
    /// suppression.
    pub fn confident(&self, threshold: f32) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        self.probs
            .chunks_exact(self.num_classes)
            .enumerate()
            .filter_map(move |(idx, row)| {
                let (class_id, prob) = argmax(row)?;
                (prob > threshold).then_some((idx, class_id, prob))
            })
    }

    /// Number of candidates whose best class probability exceeds `threshold`.
    pub fn count_confident(&self, threshold: f32) -> usize {
        self.confident(threshold).count()
    }

    /// Sets one class probability of candidate `idx` to zero and returns the
    /// updated row.
    pub(crate) fn zero_class(&mut self, idx: usize, class_id: usize) -> &[f32] {
        let start = idx * self.num_classes;
        let row = &mut self.probs[start..start + self.num_classes];
        row[class_id] = 0.0;
        row
    }
}

/// Decodes a raw output tensor into candidates.
///
/// The anchor count of `raw` must match `anchors`. Produces exactly
/// `height * width * num_anchors` candidates.
pub fn decode(
    raw: RawOutput<'_>,
    anchors: &AnchorPriors,
    cfg: &DecodeConfig,
) -> GridDecodeResult<Candidates> {
    let layout = raw.layout();
    if layout.num_anchors() != anchors.len() {
        return Err(GridDecodeError::AnchorCountMismatch {
            expected: layout.num_anchors(),
            got: anchors.len(),
        });
    }

    let _span = trace_span!(
        "decode",
        height = layout.grid().height,
        width = layout.grid().width,
        anchors = layout.num_anchors(),
        classes = layout.num_classes()
    )
    .entered();

    if cfg.reject_non_finite {
        raw.check_finite()?;
    }

    #[cfg(feature = "rayon")]
    let candidates = if cfg.parallel {
        self::rayon::decode_par(raw, anchors.as_slice())
    } else {
        decode_seq(raw, anchors.as_slice())
    };
    #[cfg(not(feature = "rayon"))]
    let candidates = decode_seq(raw, anchors.as_slice());

    if cfg.reject_non_finite {
        check_box_sizes(raw, &candidates)?;
    }

    trace_event!("decoded_candidates", count = candidates.len());
    Ok(candidates)
}

/// Fails on the first candidate whose width or height overflowed.
///
/// Candidates follow block order, so candidate `k` starts at buffer offset
/// `k * anchor_stride`.
fn check_box_sizes(raw: RawOutput<'_>, candidates: &Candidates) -> GridDecodeResult<()> {
    let stride = raw.layout().anchor_stride();
    let data = raw.as_slice();
    for (k, b) in candidates.boxes.iter().enumerate() {
        let channel = if !b.width.is_finite() {
            2
        } else if !b.height.is_finite() {
            3
        } else {
            continue;
        };
        let index = k * stride + channel;
        return Err(GridDecodeError::SizeOverflow {
            index,
            value: data[index],
        });
    }
    Ok(())
}

fn decode_seq(raw: RawOutput<'_>, anchors: &[AnchorPrior]) -> Candidates {
    let layout = raw.layout();
    let mut boxes = Vec::with_capacity(layout.num_candidates());
    let mut probs = vec![0.0f32; layout.num_candidates() * layout.num_classes()];
    let row_probs = layout.grid().width * layout.num_anchors() * layout.num_classes();
    for (row, probs_row) in probs.chunks_exact_mut(row_probs).enumerate() {
        decode_row(raw, anchors, row, &mut boxes, probs_row);
    }
    Candidates {
        boxes,
        probs,
        num_classes: layout.num_classes(),
    }
}

/// Decodes grid row `row`, appending its boxes and filling `probs` with the
/// row's `width * num_anchors * num_classes` probabilities.
pub(crate) fn decode_row(
    raw: RawOutput<'_>,
    anchors: &[AnchorPrior],
    row: usize,
    boxes: &mut Vec<BoxGeom>,
    probs: &mut [f32],
) {
    let layout = raw.layout();
    let num_classes = layout.num_classes();
    let Some(values) = raw.row(row) else {
        return;
    };
    let blocks = values.chunks_exact(layout.anchor_stride());
    let outs = probs.chunks_exact_mut(num_classes);
    for (slot, (block, out)) in blocks.zip(outs).enumerate() {
        let col = slot / layout.num_anchors();
        let anchor = &anchors[slot % layout.num_anchors()];
        boxes.push(decode_block(block, row, col, anchor, &layout, out));
    }
}

/// Decodes one `[tx, ty, tw, th, to, logits..]` block.
#[inline]
fn decode_block(
    block: &[f32],
    row: usize,
    col: usize,
    anchor: &AnchorPrior,
    layout: &TensorLayout,
    probs: &mut [f32],
) -> BoxGeom {
    let grid = layout.grid();
    let grid_w = grid.width as f32;
    let grid_h = grid.height as f32;

    let cx = (logistic(block[0]) + col as f32) / grid_w;
    let cy = (logistic(block[1]) + row as f32) / grid_h;
    let w = block[2].exp() * anchor.width / grid_w;
    let h = block[3].exp() * anchor.height / grid_h;
    let objectness = logistic(block[4]);

    softmax_scaled(&block[BOX_CHANNELS..], objectness, probs);
    BoxGeom::from_center(cx, cy, w, h)
}
