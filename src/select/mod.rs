//! Greedy selection with soft suppression.
//!
//! Each step picks the candidate with the highest current class probability.
//! Instead of discarding boxes that overlap the pick, only the picked class is
//! zeroed on them (and on the pick itself). A box that overlaps a class-A
//! detection can therefore still be picked later as class B.
//!
//! Every step either stops the loop or zeroes at least one of the
//! `num_candidates * num_classes` probabilities, which bounds the number of
//! steps even without a detection limit.

use crate::decode::Candidates;
use crate::geometry::BoxGeom;
use crate::trace::{trace_event, trace_span};
use crate::util::{GridDecodeError, GridDecodeResult};

mod overlap;
mod state;

#[cfg(feature = "simd")]
mod simd;

use overlap::OverlapIndex;
pub use state::SelectionState;

/// Selection limits and thresholds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectConfig {
    /// Minimum class probability for a pick, in `(0, 1]`.
    pub confidence_threshold: f32,
    /// Maximum number of picks, at least 1.
    pub max_detections: usize,
    /// Overlaps strictly above this IoU are suppressed; in `[0, 1]`.
    pub iou_threshold: f32,
}

impl SelectConfig {
    pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

    /// Creates a config with the default IoU threshold.
    pub fn new(confidence_threshold: f32, max_detections: usize) -> Self {
        Self {
            confidence_threshold,
            max_detections,
            iou_threshold: Self::DEFAULT_IOU_THRESHOLD,
        }
    }

    pub fn with_iou_threshold(mut self, iou_threshold: f32) -> Self {
        self.iou_threshold = iou_threshold;
        self
    }

    /// Validates thresholds and limits.
    pub fn validate(&self) -> GridDecodeResult<()> {
        if !(self.confidence_threshold > 0.0 && self.confidence_threshold <= 1.0) {
            return Err(GridDecodeError::InvalidConfig {
                reason: "confidence_threshold must be in (0, 1]",
            });
        }
        if self.max_detections == 0 {
            return Err(GridDecodeError::InvalidConfig {
                reason: "max_detections must be > 0",
            });
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(GridDecodeError::InvalidConfig {
                reason: "iou_threshold must be in [0, 1]",
            });
        }
        Ok(())
    }
}

/// One pick of the selector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Selected {
    /// Candidate index in decode order.
    pub index: usize,
    pub class_id: usize,
    /// Class probability at the time of the pick.
    pub confidence: f32,
    pub bbox: BoxGeom,
}

/// Step-wise soft-suppression selector over a set of candidates.
///
/// Borrows the candidates mutably: picked classes are zeroed in place.
pub struct SoftSuppressor<'c> {
    candidates: &'c mut Candidates,
    state: SelectionState,
    overlaps: OverlapIndex,
    cfg: SelectConfig,
    scratch: Vec<usize>,
    picked: usize,
}

impl<'c> SoftSuppressor<'c> {
    /// Validates `cfg` and precomputes per-candidate state.
    pub fn new(candidates: &'c mut Candidates, cfg: SelectConfig) -> GridDecodeResult<Self> {
        cfg.validate()?;
        let state = SelectionState::from_candidates(candidates);
        let overlaps = OverlapIndex::new(candidates.boxes());
        Ok(Self {
            candidates,
            state,
            overlaps,
            cfg,
            scratch: Vec::new(),
            picked: 0,
        })
    }

    /// Current per-candidate maxima and classes.
    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn candidates(&self) -> &Candidates {
        &*self.candidates
    }

    /// Number of picks made so far.
    pub fn picked(&self) -> usize {
        self.picked
    }

    /// Performs one pick and its suppression.
    ///
    /// Returns `None` once the detection limit is reached or no candidate
    /// meets the confidence threshold; the state is left untouched then.
    pub fn step(&mut self) -> Option<Selected> {
        if self.picked >= self.cfg.max_detections {
            return None;
        }
        let (index, confidence) = self.state.best()?;
        if !(confidence >= self.cfg.confidence_threshold) {
            return None;
        }
        let class_id = self.state.cur_class()[index];
        let bbox = self.candidates.boxes()[index];

        self.scratch.clear();
        self.overlaps
            .overlapping(index, self.cfg.iou_threshold, &mut self.scratch);
        self.scratch.push(index);
        for &m in &self.scratch {
            let row = self.candidates.zero_class(m, class_id);
            self.state.refresh(m, row);
        }

        trace_event!(
            "selected",
            index = index,
            class_id = class_id,
            confidence = confidence,
            suppressed = self.scratch.len() - 1
        );
        self.picked += 1;
        Some(Selected {
            index,
            class_id,
            confidence,
            bbox,
        })
    }

    /// Runs steps until the limit or threshold stops the loop.
    pub fn run(mut self) -> Vec<Selected> {
        let mut selected = Vec::with_capacity(self.cfg.max_detections.min(self.state.len()));
        while let Some(pick) = self.step() {
            selected.push(pick);
        }
        selected
    }
}

/// Selects up to `cfg.max_detections` candidates with soft suppression.
///
/// Picks are returned in selection order. `candidates` is modified: every
/// picked class is zeroed on the pick and on its overlaps.
pub fn select(candidates: &mut Candidates, cfg: &SelectConfig) -> GridDecodeResult<Vec<Selected>> {
    let _span = trace_span!(
        "select",
        candidates = candidates.len(),
        threshold = cfg.confidence_threshold
    )
    .entered();
    let selected = SoftSuppressor::new(candidates, *cfg)?.run();
    trace_event!("selection_done", count = selected.len());
    Ok(selected)
}
