//! griddecode turns the raw output of a grid-based single-shot detector into
//! labelled detections.
//!
//! A flat `[row][col][anchor][5 + classes]` tensor is decoded into one
//! candidate per grid anchor, then candidates are picked greedily with soft
//! suppression: overlapping boxes lose only the picked class, so they can
//! still surface under another class. Decoding can run row-parallel via the
//! `rayon` feature and overlap queries use `wide` under the `simd` feature.
//!
//! ```no_run
//! use griddecode::{AnchorPreset, AnchorPriors, GridShape, PostprocessConfig, Postprocessor};
//!
//! # fn main() -> Result<(), griddecode::GridDecodeError> {
//! let labels = ["oropharynx", "tonsil region a", "tonsil region b", "uvula"];
//! let processor = Postprocessor::new(
//!     AnchorPriors::preset(AnchorPreset::CustomVision),
//!     PostprocessConfig::new(labels, 0.6, 20),
//! )?;
//! let raw = vec![0.0f32; 13 * 13 * 45];
//! for det in processor.run(&raw, GridShape::square(13))? {
//!     println!("{det}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod anchors;
pub mod decode;
pub mod detection;
pub mod geometry;
pub mod lowlevel;
mod pipeline;
pub mod select;
pub mod tensor;
mod trace;
pub mod util;

pub use anchors::{AnchorPreset, AnchorPrior, AnchorPriors};
pub use decode::{decode, Candidates, DecodeConfig};
pub use detection::{BoundingBox, Detection, FormatConfig};
pub use geometry::BoxGeom;
pub use pipeline::{postprocess, PostprocessConfig, Postprocessor};
pub use select::{select, SelectConfig, Selected};
pub use tensor::{GridShape, RawOutput, TensorLayout};
pub use util::{GridDecodeError, GridDecodeResult};
