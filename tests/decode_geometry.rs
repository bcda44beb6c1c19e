use griddecode::lowlevel::CUSTOM_VISION;
use griddecode::{
    decode, select, AnchorPreset, AnchorPriors, DecodeConfig, GridShape, PostprocessConfig,
    Postprocessor, RawOutput, SelectConfig,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const GRID: usize = 13;
const ANCHORS: usize = 5;
const CLASSES: usize = 4;
const STRIDE: usize = 5 + CLASSES;

fn labels() -> [&'static str; 4] {
    ["oropharynx", "tonsil region a", "tonsil region b", "uvula"]
}

fn offset(row: usize, col: usize, anchor: usize) -> usize {
    ((row * GRID + col) * ANCHORS + anchor) * STRIDE
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[test]
fn all_zero_tensor_decodes_to_uniform_candidates() {
    let raw = vec![0.0f32; GRID * GRID * ANCHORS * STRIDE];
    let view = RawOutput::new(&raw, GridShape::square(GRID), ANCHORS).unwrap();
    let anchors = AnchorPriors::preset(AnchorPreset::CustomVision);
    let mut candidates = decode(view, &anchors, &DecodeConfig::default()).unwrap();

    assert_eq!(candidates.len(), 845);
    assert_eq!(candidates.num_classes(), 4);
    for idx in 0..candidates.len() {
        let (_, prob) = candidates.best_class(idx).unwrap();
        assert!((prob - 0.125).abs() < 1e-7);
    }

    let picks = select(&mut candidates, &SelectConfig::new(0.6, 20)).unwrap();
    assert!(picks.is_empty());
}

#[test]
fn candidate_count_is_independent_of_content() {
    let mut rng = StdRng::seed_from_u64(7);
    for (height, width, anchors) in [(1, 1, 1), (3, 5, 2), (13, 13, 5), (7, 2, 3)] {
        let len = height * width * anchors * (5 + 3);
        let raw: Vec<f32> = (0..len).map(|_| rng.random_range(-8.0..8.0)).collect();
        let view = RawOutput::new(&raw, GridShape::new(height, width), anchors).unwrap();
        let priors = AnchorPriors::new(CUSTOM_VISION[..anchors].to_vec()).unwrap();
        let candidates = decode(view, &priors, &DecodeConfig::default()).unwrap();
        assert_eq!(candidates.len(), height * width * anchors);
        assert_eq!(candidates.num_classes(), 3);
    }
}

#[test]
fn engineered_anchor_yields_one_detection_with_expected_geometry() {
    let (row, col, anchor) = (6usize, 4usize, 2usize);
    let (tx, ty, tw, th) = (0.5f32, -0.3f32, 0.2f32, -0.1f32);

    let mut raw = vec![0.0f32; GRID * GRID * ANCHORS * STRIDE];
    let base = offset(row, col, anchor);
    raw[base] = tx;
    raw[base + 1] = ty;
    raw[base + 2] = tw;
    raw[base + 3] = th;
    raw[base + 4] = 10.0;
    raw[base + 5 + 3] = 10.0;

    let processor = Postprocessor::new(
        AnchorPriors::preset(AnchorPreset::CustomVision),
        PostprocessConfig::new(labels(), 0.5, 5),
    )
    .unwrap();
    let detections = processor.run(&raw, GridShape::square(GRID)).unwrap();
    assert_eq!(detections.len(), 1);
    let det = &detections[0];
    assert_eq!(det.class_id, 3);
    assert_eq!(det.class_name, "uvula");

    let e10 = 10f64.exp();
    let expected_conf = sigmoid(10.0) * e10 / (e10 + 3.0);
    assert!((det.confidence - expected_conf).abs() < 1e-6);

    let prior = CUSTOM_VISION[anchor];
    let grid = GRID as f64;
    let cx = (sigmoid(tx as f64) + col as f64) / grid;
    let cy = (sigmoid(ty as f64) + row as f64) / grid;
    let w = (tw as f64).exp() * prior.width as f64 / grid;
    let h = (th as f64).exp() * prior.height as f64 / grid;
    let b = det.bounding_box;
    assert!((b.left - (cx - w / 2.0)).abs() < 1e-6);
    assert!((b.top - (cy - h / 2.0)).abs() < 1e-6);
    assert!((b.width - w).abs() < 1e-6);
    assert!((b.height - h).abs() < 1e-6);
}

#[test]
fn border_boxes_are_not_clamped_by_default() {
    let mut raw = vec![0.0f32; GRID * GRID * ANCHORS * STRIDE];
    // Largest anchor in the top-left cell extends past the image edge.
    let base = offset(0, 0, 4);
    raw[base + 4] = 10.0;
    raw[base + 5] = 10.0;

    let anchors = AnchorPriors::preset(AnchorPreset::CustomVision);
    let cfg = PostprocessConfig::new(labels(), 0.5, 5);
    let unclamped = Postprocessor::new(anchors.clone(), cfg.clone())
        .unwrap()
        .run(&raw, GridShape::square(GRID))
        .unwrap();
    assert_eq!(unclamped.len(), 1);
    assert!(unclamped[0].bounding_box.left < 0.0);
    assert!(unclamped[0].bounding_box.top < 0.0);

    let clamped = Postprocessor::new(anchors, cfg.with_clamp(true))
        .unwrap()
        .run(&raw, GridShape::square(GRID))
        .unwrap();
    assert_eq!(clamped[0].bounding_box.left, 0.0);
    assert_eq!(clamped[0].bounding_box.top, 0.0);
    assert!(clamped[0].bounding_box.right() <= 1.0);
}

#[test]
fn confident_scan_counts_candidates_before_suppression() {
    let mut raw = vec![0.0f32; GRID * GRID * ANCHORS * STRIDE];
    for anchor in 0..3 {
        let base = offset(2, 2, anchor);
        raw[base + 4] = 10.0;
        raw[base + 5 + 1] = 10.0;
    }
    let view = RawOutput::new(&raw, GridShape::square(GRID), ANCHORS).unwrap();
    let anchors = AnchorPriors::preset(AnchorPreset::CustomVisionRounded);
    let candidates = decode(view, &anchors, &DecodeConfig::default()).unwrap();
    assert_eq!(candidates.count_confident(0.5), 3);
    let hits: Vec<_> = candidates.confident(0.5).map(|(idx, class, _)| (idx, class)).collect();
    let first = (2 * GRID + 2) * ANCHORS;
    assert_eq!(hits, vec![(first, 1), (first + 1, 1), (first + 2, 1)]);
}
