use griddecode::lowlevel::SoftSuppressor;
use griddecode::{
    decode, select, AnchorPriors, Candidates, DecodeConfig, GridShape, RawOutput, SelectConfig,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const GRID: usize = 3;
const ANCHORS: usize = 3;
const CLASSES: usize = 2;
const STRIDE: usize = 5 + CLASSES;

/// Identical anchors, so all anchors of one cell decode to the same box.
fn same_size_anchors() -> AnchorPriors {
    AnchorPriors::from_pairs(&[(2.0, 2.0); ANCHORS]).unwrap()
}

fn set_anchor(raw: &mut [f32], row: usize, col: usize, anchor: usize, logits: [f32; CLASSES]) {
    let base = ((row * GRID + col) * ANCHORS + anchor) * STRIDE;
    raw[base + 4] = 10.0;
    raw[base + 5..base + 5 + CLASSES].copy_from_slice(&logits);
}

fn decode_grid(raw: &[f32]) -> Candidates {
    let view = RawOutput::new(raw, GridShape::square(GRID), ANCHORS).unwrap();
    decode(view, &same_size_anchors(), &DecodeConfig::default()).unwrap()
}

fn centre_index(anchor: usize) -> usize {
    (GRID + 1) * ANCHORS + anchor
}

#[test]
fn overlapping_box_resurfaces_under_second_class() {
    let mut raw = vec![0.0f32; GRID * GRID * ANCHORS * STRIDE];
    // Strong class 0.
    set_anchor(&mut raw, 1, 1, 0, [8.0, 0.0]);
    // Slightly prefers class 0, but class 1 is still above threshold.
    set_anchor(&mut raw, 1, 1, 1, [0.2, 0.0]);

    let mut candidates = decode_grid(&raw);
    let weaker = candidates.probs(centre_index(1)).unwrap().to_vec();
    assert!(weaker[0] > weaker[1]);
    assert!(weaker[1] > 0.3);

    let picks = select(&mut candidates, &SelectConfig::new(0.3, 10)).unwrap();
    assert_eq!(picks.len(), 2);

    assert_eq!(picks[0].index, centre_index(0));
    assert_eq!(picks[0].class_id, 0);

    // A standard NMS would drop this box: it overlaps the first pick fully.
    assert_eq!(picks[1].index, centre_index(1));
    assert_eq!(picks[1].class_id, 1);
    assert_eq!(picks[1].confidence, weaker[1]);
    assert!(picks[0].bbox.iou(&picks[1].bbox) > 0.99);

    // Only class 0 was zeroed on the weaker box by the first pick, and class 1
    // by the second.
    assert_eq!(candidates.probs(centre_index(1)).unwrap(), &[0.0, 0.0]);
}

#[test]
fn stronger_second_class_box_suppresses_the_weak_one() {
    let mut raw = vec![0.0f32; GRID * GRID * ANCHORS * STRIDE];
    set_anchor(&mut raw, 1, 1, 0, [8.0, 0.0]);
    set_anchor(&mut raw, 1, 1, 1, [0.2, 0.0]);
    set_anchor(&mut raw, 1, 1, 2, [0.0, 6.0]);

    let mut candidates = decode_grid(&raw);
    let picks = select(&mut candidates, &SelectConfig::new(0.3, 10)).unwrap();
    let order: Vec<_> = picks.iter().map(|p| (p.index, p.class_id)).collect();
    assert_eq!(order, vec![(centre_index(0), 0), (centre_index(2), 1)]);
}

#[test]
fn first_pick_only_touches_picked_class() {
    let mut raw = vec![0.0f32; GRID * GRID * ANCHORS * STRIDE];
    set_anchor(&mut raw, 1, 1, 0, [8.0, 0.0]);
    set_anchor(&mut raw, 1, 1, 1, [0.2, 0.0]);

    let mut candidates = decode_grid(&raw);
    let before = candidates.probs(centre_index(1)).unwrap().to_vec();
    let mut selector = SoftSuppressor::new(&mut candidates, SelectConfig::new(0.3, 1)).unwrap();
    let pick = selector.step().unwrap();
    assert_eq!(pick.class_id, 0);
    assert!(selector.step().is_none());

    let after = selector.candidates().probs(centre_index(1)).unwrap();
    assert_eq!(after[0], 0.0);
    assert_eq!(after[1], before[1]);
    assert_eq!(selector.state().cur_class()[centre_index(1)], 1);
}

#[test]
fn cur_max_never_increases_and_only_overlaps_change() {
    let mut rng = StdRng::seed_from_u64(42);
    let anchors = AnchorPriors::from_pairs(&[(0.6, 0.7), (1.9, 2.1), (3.3, 5.5)]).unwrap();
    for _ in 0..8 {
        let len = 6 * 6 * 3 * (5 + 4);
        let raw: Vec<f32> = (0..len).map(|_| rng.random_range(-4.0..4.0)).collect();
        let view = RawOutput::new(&raw, GridShape::square(6), 3).unwrap();
        let mut candidates = decode(view, &anchors, &DecodeConfig::default()).unwrap();
        let cfg = SelectConfig::new(0.05, 50);
        let mut selector = SoftSuppressor::new(&mut candidates, cfg).unwrap();

        let mut last_conf = f32::INFINITY;
        while selector.picked() < cfg.max_detections {
            let before = selector.state().cur_max().to_vec();
            let Some(pick) = selector.step() else {
                break;
            };
            assert!(pick.confidence >= cfg.confidence_threshold);
            assert_eq!(pick.confidence, before[pick.index]);
            // Picks are each the global maximum at their step.
            assert!(pick.confidence <= last_conf);
            last_conf = pick.confidence;

            let after = selector.state().cur_max();
            for (k, (&b, &a)) in before.iter().zip(after).enumerate() {
                assert!(a <= b);
                if a != b {
                    let other = selector.candidates().bbox(k).unwrap();
                    assert!(k == pick.index || pick.bbox.iou(other) > cfg.iou_threshold);
                }
            }
        }
        assert!(selector.picked() <= cfg.max_detections);
    }
}
