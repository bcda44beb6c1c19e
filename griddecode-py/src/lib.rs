//! Python bindings for the griddecode detector postprocessing library.
//!
//! This module exposes the high-level griddecode API to Python via PyO3.

use numpy::{PyReadonlyArrayDyn, PyUntypedArrayMethods};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use griddecode::{
    AnchorPreset, AnchorPriors, BoundingBox, DecodeConfig, Detection as RustDetection, GridDecodeError,
    GridShape, PostprocessConfig, Postprocessor as RustPostprocessor,
};

/// Convert a GridDecodeError to a Python exception.
fn to_py_err(err: GridDecodeError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// A labelled detection with a normalized bounding box.
#[pyclass]
#[derive(Clone)]
pub struct Detection {
    /// Class index in the label list.
    #[pyo3(get)]
    pub class_id: usize,
    /// Class label.
    #[pyo3(get)]
    pub class_name: String,
    /// Class probability scaled by objectness, rounded to 8 decimals.
    #[pyo3(get)]
    pub confidence: f64,
    bounding_box: BoundingBox,
}

#[pymethods]
impl Detection {
    #[getter]
    fn left(&self) -> f64 {
        self.bounding_box.left
    }

    #[getter]
    fn top(&self) -> f64 {
        self.bounding_box.top
    }

    #[getter]
    fn width(&self) -> f64 {
        self.bounding_box.width
    }

    #[getter]
    fn height(&self) -> f64 {
        self.bounding_box.height
    }

    /// Bounding box as a `(left, top, width, height)` tuple.
    #[getter]
    fn bbox(&self) -> (f64, f64, f64, f64) {
        box_tuple(&self.bounding_box)
    }

    /// Scale the box to an image of `image_width x image_height` pixels.
    fn to_pixels(&self, image_width: f64, image_height: f64) -> (f64, f64, f64, f64) {
        box_tuple(&self.bounding_box.to_pixels(image_width, image_height))
    }

    fn __repr__(&self) -> String {
        let b = &self.bounding_box;
        format!(
            "Detection(class_name='{}', confidence={:.4}, bbox=({:.4}, {:.4}, {:.4}, {:.4}))",
            self.class_name, self.confidence, b.left, b.top, b.width, b.height
        )
    }
}

fn box_tuple(b: &BoundingBox) -> (f64, f64, f64, f64) {
    (b.left, b.top, b.width, b.height)
}

impl From<RustDetection> for Detection {
    fn from(d: RustDetection) -> Self {
        Self {
            class_id: d.class_id,
            class_name: d.class_name,
            confidence: d.confidence,
            bounding_box: d.bounding_box,
        }
    }
}

fn resolve_anchors(preset: &str, pairs: Option<Vec<(f32, f32)>>) -> PyResult<AnchorPriors> {
    match pairs {
        Some(pairs) => AnchorPriors::from_pairs(&pairs).map_err(to_py_err),
        None => AnchorPreset::from_name(preset)
            .map(AnchorPriors::preset)
            .ok_or_else(|| {
                PyValueError::new_err(
                    "anchors must be 'custom_vision' or 'custom_vision_rounded'",
                )
            }),
    }
}

/// Runs the decoder over a 1-D or 3-D float32 array.
fn run_array(
    inner: &RustPostprocessor,
    raw: &PyReadonlyArrayDyn<'_, f32>,
    grid: Option<(usize, usize)>,
) -> PyResult<Vec<Detection>> {
    let shape = raw.shape();
    let grid = match (shape.len(), grid) {
        (3, None) => GridShape::new(shape[0], shape[1]),
        (3, Some((height, width))) => {
            if (height, width) != (shape[0], shape[1]) {
                return Err(PyValueError::new_err(
                    "grid does not match the leading dimensions of the array",
                ));
            }
            GridShape::new(height, width)
        }
        (1, Some((height, width))) => GridShape::new(height, width),
        (1, None) => {
            return Err(PyValueError::new_err(
                "grid=(height, width) is required for a flat array",
            ))
        }
        _ => {
            return Err(PyValueError::new_err(
                "raw must be a 1-D or (height, width, channels) array",
            ))
        }
    };
    let data = raw.as_slice()?;
    let detections = inner.run(data, grid).map_err(to_py_err)?;
    Ok(detections.into_iter().map(Detection::from).collect())
}

/// Reusable postprocessor for one model head.
#[pyclass]
pub struct Postprocessor {
    inner: RustPostprocessor,
}

#[pymethods]
impl Postprocessor {
    /// Create a new Postprocessor.
    ///
    /// Args:
    ///     labels: Class names indexed by class id
    ///     confidence_threshold: Minimum confidence of a detection
    ///     max_detections: Maximum number of detections per call
    ///     iou_threshold: Overlap above which a pick suppresses its class (default: 0.45)
    ///     anchors: "custom_vision" or "custom_vision_rounded" (default: "custom_vision")
    ///     anchor_pairs: Explicit (width, height) priors; overrides `anchors`
    ///     clamp: Clip boxes to the unit square (default: False)
    ///     parallel: Decode grid rows in parallel (default: False)
    ///     reject_non_finite: Fail on NaN or infinite input (default: True)
    #[new]
    #[pyo3(signature = (
        labels,
        confidence_threshold,
        max_detections,
        iou_threshold = 0.45,
        anchors = "custom_vision",
        anchor_pairs = None,
        clamp = false,
        parallel = false,
        reject_non_finite = true
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        labels: Vec<String>,
        confidence_threshold: f32,
        max_detections: usize,
        iou_threshold: f32,
        anchors: &str,
        anchor_pairs: Option<Vec<(f32, f32)>>,
        clamp: bool,
        parallel: bool,
        reject_non_finite: bool,
    ) -> PyResult<Self> {
        let anchors = resolve_anchors(anchors, anchor_pairs)?;
        let config = PostprocessConfig::new(labels, confidence_threshold, max_detections)
            .with_iou_threshold(iou_threshold)
            .with_clamp(clamp)
            .with_decode(DecodeConfig {
                reject_non_finite,
                parallel,
            });
        let inner = RustPostprocessor::new(anchors, config).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Decode, suppress and label one output tensor.
    ///
    /// Args:
    ///     raw: float32 array, either flat or (height, width, channels)
    ///     grid: (height, width); required for flat arrays
    ///
    /// Returns:
    ///     List of Detection objects in selection order
    #[pyo3(signature = (raw, grid = None))]
    fn run(
        &self,
        raw: PyReadonlyArrayDyn<'_, f32>,
        grid: Option<(usize, usize)>,
    ) -> PyResult<Vec<Detection>> {
        run_array(&self.inner, &raw, grid)
    }

    /// Number of anchor priors.
    #[getter]
    fn num_anchors(&self) -> usize {
        self.inner.anchors().len()
    }

    /// Class labels.
    #[getter]
    fn labels(&self) -> Vec<String> {
        self.inner.config().format.labels.clone()
    }

    fn __repr__(&self) -> String {
        let cfg = self.inner.config();
        format!(
            "Postprocessor(labels={}, confidence_threshold={}, max_detections={}, iou_threshold={})",
            cfg.format.labels.len(),
            cfg.select.confidence_threshold,
            cfg.select.max_detections,
            cfg.select.iou_threshold
        )
    }
}

/// Convenience function that builds a postprocessor and runs it once.
///
/// For repeated calls with the same options, create a Postprocessor instead.
///
/// Args:
///     raw: float32 array, either flat or (height, width, channels)
///     labels: Class names indexed by class id
///     confidence_threshold: Minimum confidence of a detection
///     max_detections: Maximum number of detections
///     grid: (height, width); required for flat arrays
///     anchors: "custom_vision" or "custom_vision_rounded" (default: "custom_vision")
///
/// Returns:
///     List of Detection objects in selection order
#[pyfunction]
#[pyo3(signature = (raw, labels, confidence_threshold, max_detections, grid = None, anchors = "custom_vision"))]
fn postprocess(
    raw: PyReadonlyArrayDyn<'_, f32>,
    labels: Vec<String>,
    confidence_threshold: f32,
    max_detections: usize,
    grid: Option<(usize, usize)>,
    anchors: &str,
) -> PyResult<Vec<Detection>> {
    let anchors = resolve_anchors(anchors, None)?;
    let config = PostprocessConfig::new(labels, confidence_threshold, max_detections);
    let inner = RustPostprocessor::new(anchors, config).map_err(to_py_err)?;
    run_array(&inner, &raw, grid)
}

/// Python module for griddecode detector postprocessing.
#[pymodule]
fn _griddecode(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Detection>()?;
    m.add_class::<Postprocessor>()?;
    m.add_function(wrap_pyfunction!(postprocess, m)?)?;

    // Add version
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
