//! End-to-end postprocessing: decode, select, format.

use crate::anchors::AnchorPriors;
use crate::decode::{decode, Candidates, DecodeConfig};
use crate::detection::{format_detections, Detection, FormatConfig};
use crate::select::{select, SelectConfig};
use crate::tensor::{GridShape, RawOutput};
use crate::util::GridDecodeResult;

/// Options for one postprocessing pass.
///
/// There is no default confidence threshold: deployments of the same model
/// have used both 0.6 and 0.8, and the right value depends on the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct PostprocessConfig {
    pub decode: DecodeConfig,
    pub select: SelectConfig,
    pub format: FormatConfig,
}

impl PostprocessConfig {
    /// Creates a config with default decode options, IoU threshold 0.45 and
    /// no clamping.
    pub fn new<I, S>(labels: I, confidence_threshold: f32, max_detections: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            decode: DecodeConfig::default(),
            select: SelectConfig::new(confidence_threshold, max_detections),
            format: FormatConfig::new(labels),
        }
    }

    pub fn with_iou_threshold(mut self, iou_threshold: f32) -> Self {
        self.select.iou_threshold = iou_threshold;
        self
    }

    pub fn with_clamp(mut self, clamp: bool) -> Self {
        self.format.clamp = clamp;
        self
    }

    pub fn with_decode(mut self, decode: DecodeConfig) -> Self {
        self.decode = decode;
        self
    }

    pub fn validate(&self) -> GridDecodeResult<()> {
        self.select.validate()?;
        self.format.validate()
    }
}

/// Validated anchors and options, reusable across frames.
///
/// Holds no per-call state, so one instance can serve concurrent calls.
#[derive(Clone, Debug)]
pub struct Postprocessor {
    anchors: AnchorPriors,
    config: PostprocessConfig,
}

impl Postprocessor {
    pub fn new(anchors: AnchorPriors, config: PostprocessConfig) -> GridDecodeResult<Self> {
        config.validate()?;
        Ok(Self { anchors, config })
    }

    pub fn anchors(&self) -> &AnchorPriors {
        &self.anchors
    }

    pub fn config(&self) -> &PostprocessConfig {
        &self.config
    }

    /// Decodes `raw` without selecting.
    pub fn decode(&self, raw: &[f32], grid: GridShape) -> GridDecodeResult<Candidates> {
        let raw = RawOutput::new(raw, grid, self.anchors.len())?;
        self.config.format.check_classes(raw.layout().num_classes())?;
        decode(raw, &self.anchors, &self.config.decode)
    }

    /// Runs decode, soft suppression and formatting on one output tensor.
    pub fn run(&self, raw: &[f32], grid: GridShape) -> GridDecodeResult<Vec<Detection>> {
        let mut candidates = self.decode(raw, grid)?;
        let picks = select(&mut candidates, &self.config.select)?;
        format_detections(&picks, &self.config.format)
    }
}

/// One-shot helper around [`Postprocessor`].
pub fn postprocess(
    raw: &[f32],
    grid: GridShape,
    anchors: &AnchorPriors,
    config: &PostprocessConfig,
) -> GridDecodeResult<Vec<Detection>> {
    Postprocessor::new(anchors.clone(), config.clone())?.run(raw, grid)
}
