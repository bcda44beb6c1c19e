//! Labelled, rounded detection records.
//!
//! Selector output is widened to `f64` and rounded to
//! [`ROUND_DECIMALS`] digits. Boxes stay in normalized coordinates unless the
//! optional clamp is enabled; [`BoundingBox::to_pixels`] projects them onto
//! an image.

use std::fmt;

use crate::select::Selected;
use crate::util::math::round_to;
use crate::util::{GridDecodeError, GridDecodeResult};

/// Digits kept after the decimal point in formatted values.
pub const ROUND_DECIMALS: i32 = 8;

/// Box as left/top corner plus size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Scales a normalized box to an image of `width x height` pixels.
    pub fn to_pixels(&self, width: f64, height: f64) -> BoundingBox {
        BoundingBox {
            left: self.left * width,
            top: self.top * height,
            width: self.width * width,
            height: self.height * height,
        }
    }

    /// Rounds every field to `decimals` digits.
    pub fn rounded(&self, decimals: i32) -> BoundingBox {
        BoundingBox {
            left: round_to(self.left, decimals),
            top: round_to(self.top, decimals),
            width: round_to(self.width, decimals),
            height: round_to(self.height, decimals),
        }
    }
}

/// A labelled detection in selection order.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub class_id: usize,
    pub class_name: String,
    pub confidence: f64,
    pub bounding_box: BoundingBox,
}

impl fmt::Display for Detection {
    /// Renders as `label: 93.1%`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:.1}%", self.class_name, self.confidence * 100.0)
    }
}

/// Labels and output options of the formatter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormatConfig {
    /// Class names indexed by class id.
    pub labels: Vec<String>,
    /// Clip boxes to the unit square before rounding.
    pub clamp: bool,
}

impl FormatConfig {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            clamp: false,
        }
    }

    pub fn with_clamp(mut self, clamp: bool) -> Self {
        self.clamp = clamp;
        self
    }

    pub fn validate(&self) -> GridDecodeResult<()> {
        if self.labels.is_empty() {
            return Err(GridDecodeError::InvalidConfig {
                reason: "at least one label is required",
            });
        }
        Ok(())
    }

    /// Checks that every class of a `num_classes` model has a label.
    pub fn check_classes(&self, num_classes: usize) -> GridDecodeResult<()> {
        if self.labels.len() < num_classes {
            return Err(GridDecodeError::MissingLabels {
                classes: num_classes,
                labels: self.labels.len(),
            });
        }
        Ok(())
    }

    /// Returns the label of `class_id`.
    pub fn label(&self, class_id: usize) -> GridDecodeResult<&str> {
        self.labels
            .get(class_id)
            .map(String::as_str)
            .ok_or(GridDecodeError::LabelOutOfRange {
                class_id,
                labels: self.labels.len(),
            })
    }
}

/// Formats one pick.
pub fn format_detection(pick: &Selected, cfg: &FormatConfig) -> GridDecodeResult<Detection> {
    let class_name = cfg.label(pick.class_id)?.to_owned();
    let geom = if cfg.clamp {
        pick.bbox.clamped()
    } else {
        pick.bbox
    };
    let bounding_box = BoundingBox {
        left: geom.x1 as f64,
        top: geom.y1 as f64,
        width: geom.width as f64,
        height: geom.height as f64,
    }
    .rounded(ROUND_DECIMALS);
    Ok(Detection {
        class_id: pick.class_id,
        class_name,
        confidence: round_to(pick.confidence as f64, ROUND_DECIMALS),
        bounding_box,
    })
}

/// Formats picks in their selection order.
pub fn format_detections(picks: &[Selected], cfg: &FormatConfig) -> GridDecodeResult<Vec<Detection>> {
    picks.iter().map(|pick| format_detection(pick, cfg)).collect()
}
