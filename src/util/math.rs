//! Activation and reduction helpers used by the decoder and selector.

/// Numerically stable logistic sigmoid.
///
/// Positive inputs use `1 / (1 + e^-x)` and non-positive inputs use
/// `e^x / (1 + e^x)`, so neither branch exponentiates a large positive value.
#[inline]
pub fn logistic(x: f32) -> f32 {
    if x > 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Writes `softmax(logits) * scale` into `out`.
///
/// The maximum logit is subtracted before exponentiating. `out` must have the
/// same length as `logits`.
pub fn softmax_scaled(logits: &[f32], scale: f32, out: &mut [f32]) {
    debug_assert_eq!(logits.len(), out.len());
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    for (dst, &logit) in out.iter_mut().zip(logits) {
        let e = (logit - max).exp();
        *dst = e;
        sum += e;
    }
    for dst in out.iter_mut() {
        *dst = *dst / sum * scale;
    }
}

/// Returns `softmax(logits)` as a new vector.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let mut out = vec![0.0f32; logits.len()];
    softmax_scaled(logits, 1.0, &mut out);
    out
}

/// Index and value of the first maximum, or `None` for an empty slice.
///
/// Ties resolve to the lowest index.
#[inline]
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    let (&first, rest) = values.split_first()?;
    let mut best_idx = 0usize;
    let mut best = first;
    for (offset, &value) in rest.iter().enumerate() {
        if value > best {
            best = value;
            best_idx = offset + 1;
        }
    }
    Some((best_idx, best))
}

/// Rounds to `decimals` digits after the point, half away from zero.
#[inline]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
