//! Error types for griddecode.

use thiserror::Error;

/// Result alias for griddecode operations.
pub type GridDecodeResult<T> = std::result::Result<T, GridDecodeError>;

/// Errors that can occur while decoding and selecting detections.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum GridDecodeError {
    /// Grid height or width is zero.
    #[error("invalid grid dimensions {height}x{width}")]
    InvalidGrid { height: usize, width: usize },
    /// The buffer does not split into `cells x anchors x (5 + classes)` values.
    #[error(
        "buffer of {len} values does not divide into {cells} cells x {anchors} anchors x (5 + classes)"
    )]
    ShapeMismatch {
        len: usize,
        cells: usize,
        anchors: usize,
    },
    /// The tensor layout and the anchor priors disagree on the anchor count.
    #[error("tensor layout expects {expected} anchors, got {got} priors")]
    AnchorCountMismatch { expected: usize, got: usize },
    /// Anchor priors are empty or contain non-positive sizes.
    #[error("invalid anchor priors: {reason}")]
    InvalidAnchors { reason: &'static str },
    /// A threshold, limit or label list is out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: &'static str },
    /// Fewer labels than the model has classes.
    #[error("model has {classes} classes but only {labels} labels are configured")]
    MissingLabels { classes: usize, labels: usize },
    /// A selected class id has no entry in the label list.
    #[error("class id {class_id} has no label ({labels} labels configured)")]
    LabelOutOfRange { class_id: usize, labels: usize },
    /// The input buffer holds NaN or infinity.
    #[error("non-finite value {value} at buffer index {index}")]
    NonFinite { index: usize, value: f32 },
    /// A finite size logit whose exponential does not fit in `f32`.
    #[error("size logit {value} at buffer index {index} overflows the decoded box")]
    SizeOverflow { index: usize, value: f32 },
}
