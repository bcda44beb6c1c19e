//! Overlap queries between one picked box and every other candidate.

use crate::geometry::BoxGeom;

/// Column layout of candidate boxes with precomputed areas.
///
/// Corners are stored once so each query costs a single pass of
/// max/min/multiply per candidate.
pub(crate) struct OverlapIndex {
    pub(crate) x1: Vec<f32>,
    pub(crate) y1: Vec<f32>,
    pub(crate) x2: Vec<f32>,
    pub(crate) y2: Vec<f32>,
    pub(crate) area: Vec<f32>,
}

impl OverlapIndex {
    pub(crate) fn new(boxes: &[BoxGeom]) -> Self {
        let n = boxes.len();
        let mut index = Self {
            x1: Vec::with_capacity(n),
            y1: Vec::with_capacity(n),
            x2: Vec::with_capacity(n),
            y2: Vec::with_capacity(n),
            area: Vec::with_capacity(n),
        };
        for b in boxes {
            index.x1.push(b.x1);
            index.y1.push(b.y1);
            index.x2.push(b.x2());
            index.y2.push(b.y2());
            index.area.push(b.area());
        }
        index
    }

    /// Pushes every `k != picked` with `IoU(picked, k) > iou_threshold` into
    /// `out`, in ascending index order.
    pub(crate) fn overlapping(&self, picked: usize, iou_threshold: f32, out: &mut Vec<usize>) {
        #[cfg(feature = "simd")]
        {
            crate::select::simd::overlapping_simd(self, picked, iou_threshold, out);
        }
        #[cfg(not(feature = "simd"))]
        {
            self.overlapping_scalar(picked, iou_threshold, out);
        }
    }

    #[cfg_attr(feature = "simd", allow(dead_code))]
    pub(crate) fn overlapping_scalar(&self, picked: usize, iou_threshold: f32, out: &mut Vec<usize>) {
        for k in 0..self.area.len() {
            if k != picked && self.iou(picked, k) > iou_threshold {
                out.push(k);
            }
        }
    }

    /// IoU with the intersection extent clipped at zero.
    #[inline]
    pub(crate) fn iou(&self, a: usize, b: usize) -> f32 {
        let w = (self.x2[a].min(self.x2[b]) - self.x1[a].max(self.x1[b])).max(0.0);
        let h = (self.y2[a].min(self.y2[b]) - self.y1[a].max(self.y1[b])).max(0.0);
        let inter = w * h;
        inter / (self.area[a] + self.area[b] - inter)
    }
}
