//! Validates the full pipeline against recorded reference cases.
//!
//! Each case under `tests/fixtures` carries a raw output tensor, the
//! postprocessing options and the detections a float64 reference produced
//! for it. Inputs were generated so that no pick, threshold or IoU comparison
//! sits within rounding distance of a tie.

use griddecode::{
    AnchorPreset, AnchorPriors, Detection, GridShape, PostprocessConfig, Postprocessor,
};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Tolerance between the f32 pipeline and the f64 reference.
const VALUE_TOLERANCE: f64 = 1e-5;

#[derive(Debug, Deserialize)]
struct Manifest {
    cases: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnchorsJson {
    Preset(String),
    Explicit(Vec<(f32, f32)>),
}

#[derive(Debug, Deserialize)]
struct BoxJson {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

#[derive(Debug, Deserialize)]
struct ExpectedDetection {
    class_id: usize,
    class_name: String,
    confidence: f64,
    bounding_box: BoxJson,
}

#[derive(Debug, Deserialize)]
struct Case {
    case_id: String,
    grid: (usize, usize),
    anchors: AnchorsJson,
    labels: Vec<String>,
    confidence_threshold: f32,
    max_detections: usize,
    iou_threshold: f32,
    #[serde(default)]
    clamp: bool,
    raw: Vec<f32>,
    expected: Vec<ExpectedDetection>,
}

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn load_cases() -> Vec<Case> {
    let dir = fixtures_dir();
    let manifest_text = fs::read_to_string(dir.join("manifest.json")).expect("read manifest");
    let manifest: Manifest = serde_json::from_str(&manifest_text).expect("parse manifest");
    manifest
        .cases
        .iter()
        .map(|id| {
            let text = fs::read_to_string(dir.join(format!("{id}.json")))
                .unwrap_or_else(|e| panic!("read case {id}: {e}"));
            serde_json::from_str(&text).unwrap_or_else(|e| panic!("parse case {id}: {e}"))
        })
        .collect()
}

fn anchors_for(case: &Case) -> AnchorPriors {
    match &case.anchors {
        AnchorsJson::Preset(name) => {
            let preset = AnchorPreset::from_name(name)
                .unwrap_or_else(|| panic!("{}: unknown preset {name}", case.case_id));
            AnchorPriors::preset(preset)
        }
        AnchorsJson::Explicit(pairs) => AnchorPriors::from_pairs(pairs).unwrap(),
    }
}

fn run_case(case: &Case) -> Vec<Detection> {
    let config = PostprocessConfig::new(
        case.labels.iter().cloned(),
        case.confidence_threshold,
        case.max_detections,
    )
    .with_iou_threshold(case.iou_threshold)
    .with_clamp(case.clamp);
    let processor = Postprocessor::new(anchors_for(case), config).unwrap();
    let (height, width) = case.grid;
    processor
        .run(&case.raw, GridShape::new(height, width))
        .unwrap()
}

fn assert_close(case_id: &str, what: &str, got: f64, want: f64) {
    assert!(
        (got - want).abs() <= VALUE_TOLERANCE,
        "{case_id}: {what} = {got}, expected {want}"
    );
}

#[test]
fn fixtures_are_present() {
    let cases = load_cases();
    assert!(cases.len() >= 3);
    for case in &cases {
        assert!(!case.expected.is_empty(), "{} has no detections", case.case_id);
    }
}

#[test]
fn pipeline_matches_reference_detections() {
    for case in load_cases() {
        let got = run_case(&case);
        assert_eq!(
            got.len(),
            case.expected.len(),
            "{}: detection count",
            case.case_id
        );
        for (rank, (det, want)) in got.iter().zip(&case.expected).enumerate() {
            let id = format!("{}#{rank}", case.case_id);
            assert_eq!(det.class_id, want.class_id, "{id}: class id");
            assert_eq!(det.class_name, want.class_name, "{id}: class name");
            assert_close(&id, "confidence", det.confidence, want.confidence);
            let b = det.bounding_box;
            let w = &want.bounding_box;
            assert_close(&id, "left", b.left, w.left);
            assert_close(&id, "top", b.top, w.top);
            assert_close(&id, "width", b.width, w.width);
            assert_close(&id, "height", b.height, w.height);
        }
    }
}

#[test]
fn reference_cases_respect_output_contract() {
    for case in load_cases() {
        let got = run_case(&case);
        assert!(got.len() <= case.max_detections);
        for pair in got.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence, "{}", case.case_id);
        }
        if case.clamp {
            for det in &got {
                let b = det.bounding_box;
                assert!(b.left >= 0.0 && b.top >= 0.0);
                assert!(b.right() <= 1.0 + 1e-6 && b.bottom() <= 1.0 + 1e-6);
            }
        }
    }
}
