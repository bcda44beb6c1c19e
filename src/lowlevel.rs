//! Low-level building blocks for custom postprocessing pipelines.
//!
//! These expose the step-wise selector, its state and the numeric helpers.
//! Most users should prefer [`crate::Postprocessor`].

pub use crate::anchors::{CUSTOM_VISION, CUSTOM_VISION_ROUNDED};
pub use crate::detection::{format_detection, format_detections, ROUND_DECIMALS};
pub use crate::select::{SelectionState, SoftSuppressor};
pub use crate::tensor::BOX_CHANNELS;
pub use crate::util::math::{argmax, logistic, round_to, softmax, softmax_scaled};
