//! Per-candidate running maximum and argmax.

use crate::decode::Candidates;
use crate::util::math::argmax;

/// Current best probability and class of every candidate.
///
/// Entries change only when the selector zeroes a probability of that
/// candidate, so a pick is a single scan over `cur_max` rather than over
/// the full probability matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionState {
    cur_max: Vec<f32>,
    cur_class: Vec<usize>,
}

impl SelectionState {
    /// Computes the initial state from freshly decoded candidates.
    pub fn from_candidates(candidates: &Candidates) -> Self {
        let mut cur_max = Vec::with_capacity(candidates.len());
        let mut cur_class = Vec::with_capacity(candidates.len());
        for idx in 0..candidates.len() {
            let (class_id, prob) = candidates.best_class(idx).unwrap_or((0, 0.0));
            cur_max.push(prob);
            cur_class.push(class_id);
        }
        Self { cur_max, cur_class }
    }

    pub fn len(&self) -> usize {
        self.cur_max.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cur_max.is_empty()
    }

    /// Current best probability of every candidate.
    pub fn cur_max(&self) -> &[f32] {
        &self.cur_max
    }

    /// Current best class of every candidate.
    pub fn cur_class(&self) -> &[usize] {
        &self.cur_class
    }

    /// Candidate with the highest current probability; lowest index on ties.
    pub fn best(&self) -> Option<(usize, f32)> {
        argmax(&self.cur_max)
    }

    /// Recomputes the entry of candidate `idx` from its probability row.
    pub(crate) fn refresh(&mut self, idx: usize, probs: &[f32]) {
        if let Some((class_id, prob)) = argmax(probs) {
            self.cur_max[idx] = prob;
            self.cur_class[idx] = class_id;
        }
    }
}
