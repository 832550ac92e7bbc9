//! Integration tests for the SMAA T2x frame pipeline
//!
//! # Test Categories
//!
//! 1. **Edge Cases** - Flat frames, single hard edges, debug visualization
//! 2. **Temporal Behaviour** - Camera cuts, history replacement, convergence
//! 3. **Degraded Paths** - Missing lookup tables, no view state, cancellation

use image::Rgba;
use sha2::{Digest, Sha256};
use smaa_t2x::config::{DebugVisualization, EdgeDetector, RawSettings};
use smaa_t2x::pipeline::PassThroughReason;
use smaa_t2x::stages::detect_edges;
use smaa_t2x::{
    ColorImage, DepthImage, FrameInputs, FrameOutcome, FrameRequest, LookupKind, LookupTextures,
    PipelineConfig, SmaaPipeline, VelocityImage, ViewState, ViewStates,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

// ============================================================================
// Test Utilities
// ============================================================================

/// SHA256 of the raw float data, for exact comparisons of large buffers.
fn hash_image(image: &ColorImage) -> String {
    let mut hasher = Sha256::new();
    for value in image.as_raw() {
        hasher.update(value.to_le_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Colour, depth and velocity of one static frame.
struct Scene {
    color: ColorImage,
    depth: DepthImage,
    velocity: VelocityImage,
}

impl Scene {
    fn new(color: ColorImage) -> Self {
        let (w, h) = color.dimensions();
        Self { color, depth: DepthImage::new(w, h), velocity: VelocityImage::new(w, h) }
    }

    fn inputs(&self) -> FrameInputs<'_> {
        FrameInputs::new(&self.color, &self.depth, &self.velocity)
    }
}

fn grey(v: f32) -> Rgba<f32> {
    Rgba([v, v, v, 1.0])
}

/// Black for `x < split`, white from `split` on.
fn hard_edge(width: u32, height: u32, split: u32) -> ColorImage {
    ColorImage::from_fn(width, height, |x, _| if x < split { grey(0.0) } else { grey(1.0) })
}

/// A shallow slope: white right of the line `x = y / 3 + 4`.
fn slope(size: u32) -> ColorImage {
    ColorImage::from_fn(size, size, |x, y| {
        if x as f32 > y as f32 / 3.0 + 4.0 {
            grey(1.0)
        } else {
            grey(0.0)
        }
    })
}

fn config_with(detector: EdgeDetector) -> PipelineConfig {
    RawSettings { edge_detector: detector.into(), ..Default::default() }.resolve()
}

fn max_rgb_difference(a: &ColorImage, b: &ColorImage) -> f32 {
    a.pixels()
        .zip(b.pixels())
        .flat_map(|(p, q)| (0..3).map(move |c| (p.0[c] - q.0[c]).abs()))
        .fold(0.0, f32::max)
}

// ============================================================================
// Edge Cases
// ============================================================================

#[test]
fn test_flat_frame_is_unchanged() {
    let scene = Scene::new(ColorImage::from_pixel(16, 16, Rgba([0.3, 0.5, 0.7, 1.0])));
    let pipeline = SmaaPipeline::new(LookupTextures::generate());
    let mut view = ViewState::new();
    let config = config_with(EdgeDetector::Luminance);

    for _ in 0..3 {
        let out = pipeline.run_frame(&FrameRequest::new(scene.inputs(), config), Some(&mut view));
        assert_eq!(out.outcome, FrameOutcome::Resolved);
        assert_eq!(max_rgb_difference(&out.image, &scene.color), 0.0);
    }
}

#[test]
fn test_flat_frame_has_no_edges() {
    let scene = Scene::new(ColorImage::from_pixel(16, 16, grey(0.5)));
    for detector in [EdgeDetector::Luminance, EdgeDetector::Colour, EdgeDetector::Depth] {
        let edges = detect_edges(&scene.inputs(), &config_with(detector));
        assert!(edges.pixels().all(|p| p.0[0] == 0.0 && p.0[1] == 0.0), "{}", detector);
    }
}

#[test]
fn test_hard_edge_marks_boundary_column_only() {
    let scene = Scene::new(hard_edge(12, 8, 5));
    for detector in [EdgeDetector::Luminance, EdgeDetector::Colour] {
        let edges = detect_edges(&scene.inputs(), &config_with(detector));
        for (x, _, p) in edges.enumerate_pixels() {
            assert_eq!(p.0[0], if x == 5 { 1.0 } else { 0.0 }, "{} at x = {}", detector, x);
            assert_eq!(p.0[1], 0.0);
        }
    }
}

#[test]
fn test_hard_edge_is_softened() {
    let scene = Scene::new(slope(24));
    let pipeline = SmaaPipeline::new(LookupTextures::generate());
    let out = pipeline.run_frame(
        &FrameRequest::new(scene.inputs(), config_with(EdgeDetector::Luminance)),
        None,
    );
    assert_eq!(out.outcome, FrameOutcome::Blended);

    let softened = out.image.pixels().filter(|p| p.0[0] > 0.0 && p.0[0] < 1.0).count();
    assert!(softened > 0, "no pixel along the slope was blended");
    assert!(out.image.pixels().all(|p| (0.0..=1.0).contains(&p.0[0])));
}

#[test]
fn test_edge_visualization_matches_edge_stage() {
    let scene = Scene::new(slope(24));
    let config = RawSettings {
        edge_detector: EdgeDetector::Luminance.into(),
        visualize: DebugVisualization::Edges,
        ..Default::default()
    }
    .resolve();
    let pipeline = SmaaPipeline::new(LookupTextures::generate());
    let mut view = ViewState::new();

    let out = pipeline.run_frame(&FrameRequest::new(scene.inputs(), config), Some(&mut view));
    assert_eq!(out.outcome, FrameOutcome::Visualized);
    assert_eq!(hash_image(&out.image), hash_image(&detect_edges(&scene.inputs(), &config)));
    assert!(view.history.is_none());
}

#[test]
fn test_weight_visualization_is_bounded() {
    let scene = Scene::new(slope(24));
    let config = RawSettings {
        edge_detector: EdgeDetector::Luminance.into(),
        visualize: DebugVisualization::BlendWeights,
        ..Default::default()
    }
    .resolve();
    let pipeline = SmaaPipeline::new(LookupTextures::generate());
    let out = pipeline.run_frame(&FrameRequest::new(scene.inputs(), config), None);
    assert_eq!(out.outcome, FrameOutcome::Visualized);
    assert!(out.image.pixels().any(|p| p.0.iter().any(|w| *w > 0.0)));
    assert!(out.image.pixels().all(|p| p.0.iter().all(|w| (0.0..=1.0).contains(w))));
}

// ============================================================================
// Temporal Behaviour
// ============================================================================

#[test]
fn test_camera_cut_matches_stateless_frame() {
    let scene = Scene::new(slope(24));
    let config = config_with(EdgeDetector::Luminance);
    let pipeline = SmaaPipeline::new(LookupTextures::generate());
    let mut view = ViewState::new();

    for _ in 0..3 {
        pipeline.run_frame(&FrameRequest::new(scene.inputs(), config), Some(&mut view));
    }

    let cut = FrameRequest::new(scene.inputs(), config).with_camera_cut(true);
    let with_cut = pipeline.run_frame(&cut, Some(&mut view));
    let stateless = pipeline.run_frame(&FrameRequest::new(scene.inputs(), config), None);

    assert_eq!(with_cut.outcome, FrameOutcome::Blended);
    assert_eq!(hash_image(&with_cut.image), hash_image(&stateless.image));
    assert_eq!(with_cut.jitter.map(|j| j.index), Some(0));

    let history = view.history.as_ref().expect("camera cut stores its output");
    assert_eq!(hash_image(&history.image), hash_image(&with_cut.image));
}

#[test]
fn test_history_is_replaced_every_frame() {
    let scene = Scene::new(slope(24));
    let config = config_with(EdgeDetector::Luminance);
    let pipeline = SmaaPipeline::new(LookupTextures::generate());
    let mut view = ViewState::new();

    for frame in 1..=4u64 {
        let out = pipeline.run_frame(&FrameRequest::new(scene.inputs(), config), Some(&mut view));
        let history = view.history.as_ref().expect("history after a resolved frame");
        assert_eq!(hash_image(&history.image), hash_image(&out.image));
        assert_eq!(view.frames_resolved, frame);
    }
}

#[test]
fn test_steady_state_converges() {
    let scene = Scene::new(slope(32));
    let config = config_with(EdgeDetector::Luminance);
    let pipeline = SmaaPipeline::new(LookupTextures::generate());
    let mut view = ViewState::new();

    let mut outputs: Vec<ColorImage> = Vec::new();
    for _ in 0..30 {
        let request = FrameRequest::new(scene.inputs(), config);
        outputs.push(pipeline.run_frame(&request, Some(&mut view)).image);
    }

    // Same jitter sample two frames apart.
    let last = &outputs[29];
    let previous = &outputs[27];
    assert!(max_rgb_difference(last, previous) < 1e-3);
}

#[test]
fn test_jitter_alternates_and_resets_on_cut() {
    let scene = Scene::new(slope(16));
    let config = config_with(EdgeDetector::Luminance);
    let pipeline = SmaaPipeline::new(LookupTextures::generate());
    let mut view = ViewState::new();

    let mut indices = Vec::new();
    for frame in 0..6 {
        let request = FrameRequest::new(scene.inputs(), config).with_camera_cut(frame == 3);
        let out = pipeline.run_frame(&request, Some(&mut view));
        indices.push(out.jitter.map(|j| j.index));
    }
    assert_eq!(indices, vec![Some(0), Some(1), Some(0), Some(0), Some(1), Some(0)]);
}

#[test]
fn test_views_keep_separate_state() {
    let scene = Scene::new(slope(16));
    let config = config_with(EdgeDetector::Luminance);
    let pipeline = SmaaPipeline::new(LookupTextures::generate());
    let mut views = ViewStates::new();

    let request = FrameRequest::new(scene.inputs(), config);
    for _ in 0..3 {
        pipeline.run_frame(&request, Some(views.get_or_create(1)));
    }
    pipeline.run_frame(&request, Some(views.get_or_create(2)));

    assert_eq!(views.get(1).map(|v| v.frames_resolved), Some(3));
    assert_eq!(views.get(2).map(|v| v.frames_resolved), Some(1));
    assert!(views.destroy(1));
    assert!(views.get(1).is_none());
    assert_eq!(views.len(), 1);
}

// ============================================================================
// Degraded Paths
// ============================================================================

#[test]
fn test_missing_area_table_passes_input_through() {
    let scene = Scene::new(slope(16));
    let lookups = LookupTextures { area: None, ..LookupTextures::generate() };
    let pipeline = SmaaPipeline::new(lookups);
    let mut view = ViewState::new();

    let out = pipeline.run_frame(
        &FrameRequest::new(scene.inputs(), config_with(EdgeDetector::Luminance)),
        Some(&mut view),
    );
    let reason = PassThroughReason::MissingLookup(LookupKind::Area);
    assert_eq!(out.outcome, FrameOutcome::PassThrough(reason));
    assert_eq!(hash_image(&out.image), hash_image(&scene.color));
    assert!(view.history.is_none());
}

#[test]
fn test_without_view_state_no_history_is_kept() {
    let scene = Scene::new(slope(16));
    let config = config_with(EdgeDetector::Luminance);
    let pipeline = SmaaPipeline::new(LookupTextures::generate());

    let first = pipeline.run_frame(&FrameRequest::new(scene.inputs(), config), None);
    let second = pipeline.run_frame(&FrameRequest::new(scene.inputs(), config), None);
    assert_eq!(first.outcome, FrameOutcome::Blended);
    assert_eq!(first.jitter.map(|j| j.index), Some(0));
    assert_eq!(hash_image(&first.image), hash_image(&second.image));
}

#[test]
fn test_cancelled_frame_is_aborted() {
    let scene = Scene::new(slope(16));
    let pipeline = SmaaPipeline::new(LookupTextures::generate());
    let mut view = ViewState::new();
    let cancel = Arc::new(AtomicBool::new(true));

    let request =
        FrameRequest::new(scene.inputs(), config_with(EdgeDetector::Luminance)).with_cancel(cancel);
    let out = pipeline.run_frame(&request, Some(&mut view));
    assert_eq!(out.outcome, FrameOutcome::Aborted);
    assert_eq!(hash_image(&out.image), hash_image(&scene.color));
    assert!(view.history.is_none());
    assert_eq!(view.jitter.current_index(), None);
}

#[test]
fn test_preview_frames_do_not_touch_view() {
    let scene = Scene::new(slope(16));
    let pipeline = SmaaPipeline::new(LookupTextures::generate());
    let mut view = ViewState::new();

    let request = FrameRequest::new(scene.inputs(), config_with(EdgeDetector::Luminance))
        .with_persist_history(false);
    let out = pipeline.run_frame(&request, Some(&mut view));
    assert_eq!(out.outcome, FrameOutcome::Resolved);
    assert!(view.history.is_none());
    assert_eq!(view.jitter.current_index(), None);
    assert_eq!(view.frames_resolved, 0);
}
