//! Anchor priors that parameterize predicted box sizes.
//!
//! Each prior is a `(width, height)` pair measured in grid cells. Two preset
//! sets ship with the crate: the trained values at full precision and the
//! same values rounded to three decimals. Outputs decoded with one set differ
//! slightly from outputs decoded with the other, so the choice is left to the
//! caller.

use crate::util::{GridDecodeError, GridDecodeResult};

/// A single anchor template in grid-cell units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnchorPrior {
    /// Width in grid cells.
    pub width: f32,
    /// Height in grid cells.
    pub height: f32,
}

impl AnchorPrior {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Full-precision priors of the five-anchor Custom Vision head.
pub const CUSTOM_VISION: [AnchorPrior; 5] = [
    AnchorPrior::new(0.57273, 0.677385),
    AnchorPrior::new(1.87446, 2.06253),
    AnchorPrior::new(3.33843, 5.47434),
    AnchorPrior::new(7.88282, 3.52778),
    AnchorPrior::new(9.77052, 9.16828),
];

/// The same priors rounded to three decimals.
pub const CUSTOM_VISION_ROUNDED: [AnchorPrior; 5] = [
    AnchorPrior::new(0.573, 0.677),
    AnchorPrior::new(1.87, 2.06),
    AnchorPrior::new(3.34, 5.47),
    AnchorPrior::new(7.88, 3.53),
    AnchorPrior::new(9.77, 9.17),
];

/// Named preset anchor sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnchorPreset {
    /// [`CUSTOM_VISION`].
    CustomVision,
    /// [`CUSTOM_VISION_ROUNDED`].
    CustomVisionRounded,
}

impl AnchorPreset {
    /// Parses a preset from its snake_case name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "custom_vision" => Some(Self::CustomVision),
            "custom_vision_rounded" => Some(Self::CustomVisionRounded),
            _ => None,
        }
    }

    /// Returns the snake_case name of the preset.
    pub fn name(self) -> &'static str {
        match self {
            Self::CustomVision => "custom_vision",
            Self::CustomVisionRounded => "custom_vision_rounded",
        }
    }

    /// Returns the prior values of the preset.
    pub fn priors(self) -> &'static [AnchorPrior] {
        match self {
            Self::CustomVision => &CUSTOM_VISION,
            Self::CustomVisionRounded => &CUSTOM_VISION_ROUNDED,
        }
    }
}

/// Validated, ordered list of anchor priors.
#[derive(Clone, Debug, PartialEq)]
pub struct AnchorPriors {
    priors: Vec<AnchorPrior>,
}

impl AnchorPriors {
    /// Creates a prior list; every size must be finite and positive.
    pub fn new(priors: Vec<AnchorPrior>) -> GridDecodeResult<Self> {
        if priors.is_empty() {
            return Err(GridDecodeError::InvalidAnchors {
                reason: "at least one anchor prior is required",
            });
        }
        for prior in &priors {
            if !prior.width.is_finite() || !prior.height.is_finite() {
                return Err(GridDecodeError::InvalidAnchors {
                    reason: "anchor sizes must be finite",
                });
            }
            if prior.width <= 0.0 || prior.height <= 0.0 {
                return Err(GridDecodeError::InvalidAnchors {
                    reason: "anchor sizes must be > 0",
                });
            }
        }
        Ok(Self { priors })
    }

    /// Creates a prior list from `(width, height)` pairs.
    pub fn from_pairs(pairs: &[(f32, f32)]) -> GridDecodeResult<Self> {
        Self::new(
            pairs
                .iter()
                .map(|&(width, height)| AnchorPrior::new(width, height))
                .collect(),
        )
    }

    /// Returns the priors of a named preset.
    pub fn preset(preset: AnchorPreset) -> Self {
        Self {
            priors: preset.priors().to_vec(),
        }
    }

    /// Returns the number of anchors.
    pub fn len(&self) -> usize {
        self.priors.len()
    }

    /// Always false for a validated list.
    pub fn is_empty(&self) -> bool {
        self.priors.is_empty()
    }

    /// Returns the prior for anchor `idx`.
    pub fn get(&self, idx: usize) -> Option<&AnchorPrior> {
        self.priors.get(idx)
    }

    pub fn as_slice(&self) -> &[AnchorPrior] {
        &self.priors
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnchorPrior> + '_ {
        self.priors.iter()
    }
}

impl From<AnchorPreset> for AnchorPriors {
    fn from(preset: AnchorPreset) -> Self {
        Self::preset(preset)
    }
}
