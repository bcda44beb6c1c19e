//! SIMD overlap queries using the `wide` crate.
//!
//! Eight candidates are tested per step with `f32x8`; the tail falls back to
//! the scalar IoU. Lane arithmetic follows the scalar formula operation for
//! operation, so finite inputs select the same overlap sets.

use crate::select::overlap::OverlapIndex;
use wide::f32x8;

const LANES: usize = 8;

#[inline]
fn load_f32x8(slice: &[f32]) -> f32x8 {
    f32x8::from([
        slice[0], slice[1], slice[2], slice[3], slice[4], slice[5], slice[6], slice[7],
    ])
}

pub(crate) fn overlapping_simd(
    index: &OverlapIndex,
    picked: usize,
    iou_threshold: f32,
    out: &mut Vec<usize>,
) {
    let n = index.area.len();
    let simd_end = n / LANES * LANES;

    let px1 = f32x8::splat(index.x1[picked]);
    let py1 = f32x8::splat(index.y1[picked]);
    let px2 = f32x8::splat(index.x2[picked]);
    let py2 = f32x8::splat(index.y2[picked]);
    let parea = f32x8::splat(index.area[picked]);
    let zero = f32x8::ZERO;

    let mut k = 0;
    while k < simd_end {
        let x1 = load_f32x8(&index.x1[k..]);
        let y1 = load_f32x8(&index.y1[k..]);
        let x2 = load_f32x8(&index.x2[k..]);
        let y2 = load_f32x8(&index.y2[k..]);
        let area = load_f32x8(&index.area[k..]);

        let w = (px2.min(x2) - px1.max(x1)).max(zero);
        let h = (py2.min(y2) - py1.max(y1)).max(zero);
        let inter = w * h;
        let iou = inter / (parea + area - inter);

        for (lane, value) in iou.to_array().into_iter().enumerate() {
            let idx = k + lane;
            if idx != picked && value > iou_threshold {
                out.push(idx);
            }
        }
        k += LANES;
    }

    for idx in simd_end..n {
        if idx != picked && index.iou(picked, idx) > iou_threshold {
            out.push(idx);
        }
    }
}
