//! Edge detection stage.
//!
//! Marks, for every pixel, whether it differs from its left neighbour
//! (`r`) and from its top neighbour (`g`):
//!
//! | Detector | Signal | Threshold | Contrast adaptation |
//! |----------|--------|-----------|---------------------|
//! | Depth | scene depth | preset x 0.1 | no |
//! | Luminance | Rec. 709 luma | preset | yes |
//! | Colour | max channel difference | preset | yes |
//! | Normal | max channel difference of world normals | preset | yes |
//!
//! With predication enabled the threshold is lowered where a secondary
//! buffer (depth, normals or a material signal) also changes.

use crate::config::{EdgeDetector, PipelineConfig, PredicationSource};
use crate::frame::{
    dispatch, fetch_channel0, fetch_rgba, ColorImage, DepthImage, EdgeImage, FrameInputs, Rect,
};

/// Rec. 709 luma weights.
const LUMA_WEIGHTS: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Depth threshold relative to the colour threshold.
const DEPTH_THRESHOLD_SCALE: f32 = 0.1;

const NO_EDGE: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Signal compared between neighbouring pixels.
enum EdgeSource<'a> {
    Depth(&'a DepthImage),
    Luma(&'a ColorImage),
    Colour(&'a ColorImage),
}

impl EdgeSource<'_> {
    fn delta(&self, viewport: Rect, a: (i32, i32), b: (i32, i32)) -> f32 {
        match self {
            EdgeSource::Depth(depth) => {
                let da = fetch_channel0(*depth, viewport, a.0, a.1);
                let db = fetch_channel0(*depth, viewport, b.0, b.1);
                (da - db).abs()
            }
            EdgeSource::Luma(color) => {
                let la = luma(&fetch_rgba(color, viewport, a.0, a.1));
                let lb = luma(&fetch_rgba(color, viewport, b.0, b.1));
                (la - lb).abs()
            }
            EdgeSource::Colour(color) => {
                let ca = fetch_rgba(color, viewport, a.0, a.1);
                let cb = fetch_rgba(color, viewport, b.0, b.1);
                (ca[0] - cb[0]).abs().max((ca[1] - cb[1]).abs()).max((ca[2] - cb[2]).abs())
            }
        }
    }
}

/// Secondary buffer for predicated thresholding; channel 0 is compared.
enum Predication<'a> {
    /// Predication requested but the buffer is absent: behaves as flat white
    Flat,
    Depth(&'a DepthImage),
    Image(&'a ColorImage),
}

impl Predication<'_> {
    fn value(&self, viewport: Rect, x: i32, y: i32) -> f32 {
        match self {
            Predication::Flat => 1.0,
            Predication::Depth(depth) => fetch_channel0(*depth, viewport, x, y),
            Predication::Image(image) => fetch_channel0(*image, viewport, x, y),
        }
    }
}

pub fn luma(rgba: &[f32; 4]) -> f32 {
    rgba[0] * LUMA_WEIGHTS[0] + rgba[1] * LUMA_WEIGHTS[1] + rgba[2] * LUMA_WEIGHTS[2]
}

/// 1 if `delta` exceeds `threshold`.
fn exceeds(threshold: f32, delta: f32) -> f32 {
    if delta > threshold {
        1.0
    } else {
        0.0
    }
}

/// Compute the edge image for a frame.
pub fn detect_edges(inputs: &FrameInputs<'_>, config: &PipelineConfig) -> EdgeImage {
    let viewport = inputs.viewport;
    let (width, height) = inputs.dimensions();

    let source = match config.edge_detector() {
        EdgeDetector::Depth => EdgeSource::Depth(inputs.depth),
        EdgeDetector::Luminance => EdgeSource::Luma(inputs.color),
        EdgeDetector::Colour => EdgeSource::Colour(inputs.color),
        EdgeDetector::Normal => match inputs.normal {
            Some(normal) => EdgeSource::Colour(normal),
            None => {
                log::warn!("normal edge detection without a normal buffer, using scene colour");
                EdgeSource::Colour(inputs.color)
            }
        },
    };

    let predication = match config.predication() {
        PredicationSource::None => None,
        PredicationSource::Depth => Some(Predication::Depth(inputs.depth)),
        PredicationSource::WorldNormal => {
            Some(inputs.normal.map_or(Predication::Flat, Predication::Image))
        }
        PredicationSource::MaterialSignal => {
            Some(inputs.material.map_or(Predication::Flat, Predication::Image))
        }
    };

    let base_threshold = config.threshold();
    let adaptation = config.adaptation_factor();

    dispatch(width, height, viewport, None, |x, y| {
        let (x, y) = (x as i32, y as i32);
        match &source {
            EdgeSource::Depth(_) => {
                let threshold = base_threshold * DEPTH_THRESHOLD_SCALE;
                depth_edges(&source, viewport, x, y, threshold)
            }
            _ => {
                let threshold = match &predication {
                    Some(predication) => {
                        predicated_threshold(predication, viewport, x, y, base_threshold, config)
                    }
                    None => [base_threshold; 2],
                };
                adaptive_edges(&source, viewport, x, y, threshold, adaptation)
            }
        }
    })
}

/// Per-axis threshold lowered where the predication buffer changes.
fn predicated_threshold(
    predication: &Predication<'_>,
    viewport: Rect,
    x: i32,
    y: i32,
    threshold: f32,
    config: &PipelineConfig,
) -> [f32; 2] {
    let here = predication.value(viewport, x, y);
    let left = predication.value(viewport, x - 1, y);
    let top = predication.value(viewport, x, y - 1);

    let base = config.predication_scale() * threshold;
    let strength = config.predication_strength();
    let changed = |delta: f32| if delta >= config.predication_threshold() { 1.0 } else { 0.0 };

    [
        base * (1.0 - strength * changed((here - left).abs())),
        base * (1.0 - strength * changed((here - top).abs())),
    ]
}

fn depth_edges(
    source: &EdgeSource<'_>,
    viewport: Rect,
    x: i32,
    y: i32,
    threshold: f32,
) -> [f32; 4] {
    let left = source.delta(viewport, (x, y), (x - 1, y));
    let top = source.delta(viewport, (x, y), (x, y - 1));
    [exceeds(threshold, left), exceeds(threshold, top), 0.0, 1.0]
}

/// Threshold test followed by local contrast adaptation: an edge is dropped
/// when a neighbouring edge is more than `adaptation` times stronger.
fn adaptive_edges(
    source: &EdgeSource<'_>,
    viewport: Rect,
    x: i32,
    y: i32,
    threshold: [f32; 2],
    adaptation: f32,
) -> [f32; 4] {
    let here = (x, y);
    let left = source.delta(viewport, here, (x - 1, y));
    let top = source.delta(viewport, here, (x, y - 1));

    let mut edges = [exceeds(threshold[0], left), exceeds(threshold[1], top)];
    if edges == [0.0, 0.0] {
        return NO_EDGE;
    }

    let right = source.delta(viewport, here, (x + 1, y));
    let bottom = source.delta(viewport, here, (x, y + 1));
    let left_left = source.delta(viewport, (x - 1, y), (x - 2, y));
    let top_top = source.delta(viewport, (x, y - 1), (x, y - 2));

    let max_delta = left.max(right).max(left_left).max(top.max(bottom).max(top_top));

    if max_delta > adaptation * left {
        edges[0] = 0.0;
    }
    if max_delta > adaptation * top {
        edges[1] = 0.0;
    }

    [edges[0], edges[1], 0.0, 1.0]
}
