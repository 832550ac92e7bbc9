//! Blending weight stage.
//!
//! For every pixel carrying an edge, measures the edge segment it belongs to,
//! classifies the crossing edges at both ends and looks up how much of the
//! pixel the revectorised silhouette covers.
//!
//! Output channels: `r`/`g` are the weights across the top edge (this pixel
//! takes from above / the pixel above takes from this one), `b`/`a` the same
//! across the left edge.
//!
//! High and Ultra presets also search diagonal staircases (see
//! [`super::diagonal`]) and round off sharp corners.

use super::diagonal;
use crate::config::PipelineConfig;
use crate::frame::{dispatch, saturate, EdgeImage, Rect, WeightImage};
use crate::jitter::SubsampleIndices;
use crate::lookup::{AreaTexture, SearchTexture, SearchWindow};

const NO_WEIGHTS: [f32; 4] = [0.0; 4];

/// Read-only view of an edge image; edges outside the viewport do not exist.
#[derive(Clone, Copy)]
pub(super) struct EdgeView<'a> {
    edges: &'a EdgeImage,
    viewport: Rect,
}

impl<'a> EdgeView<'a> {
    pub(super) fn new(edges: &'a EdgeImage, viewport: Rect) -> Self {
        Self { edges, viewport }
    }

    fn channel(&self, x: i32, y: i32, channel: usize) -> bool {
        self.viewport.contains(x, y) && self.edges.get_pixel(x as u32, y as u32).0[channel] > 0.5
    }

    /// Edge between `(x, y)` and its left neighbour.
    pub(super) fn left(&self, x: i32, y: i32) -> bool {
        self.channel(x, y, 0)
    }

    /// Edge between `(x, y)` and its top neighbour.
    pub(super) fn top(&self, x: i32, y: i32) -> bool {
        self.channel(x, y, 1)
    }

    fn left_code(&self, x: i32, y: i32) -> u8 {
        3 * self.left(x, y) as u8 + self.left(x, y - 1) as u8
    }

    fn top_code(&self, x: i32, y: i32) -> u8 {
        3 * self.top(x, y) as u8 + self.top(x - 1, y) as u8
    }
}

/// Parameters shared by every pixel of the stage.
struct WeightParams<'a> {
    area: &'a AreaTexture,
    search: &'a SearchTexture,
    subsample: SubsampleIndices,
    max_search_steps: u32,
    max_diagonal_steps: u32,
    diagonals: bool,
    corners: bool,
    corner_rounding: f32,
}

/// Compute the blending weight image.
pub fn compute_weights(
    edges: &EdgeImage,
    viewport: Rect,
    area: &AreaTexture,
    search: &SearchTexture,
    subsample: SubsampleIndices,
    config: &PipelineConfig,
) -> WeightImage {
    let (width, height) = edges.dimensions();
    let view = EdgeView::new(edges, viewport);
    let params = WeightParams {
        area,
        search,
        subsample,
        max_search_steps: config.max_search_steps() as u32,
        max_diagonal_steps: config.max_diagonal_search_steps() as u32,
        diagonals: config.preset().diagonal_detection(),
        corners: config.preset().corner_detection(),
        corner_rounding: config.corner_rounding_norm(),
    };

    dispatch(width, height, viewport, None, |x, y| pixel_weights(&view, &params, x as i32, y as i32))
}

fn pixel_weights(view: &EdgeView<'_>, params: &WeightParams<'_>, x: i32, y: i32) -> [f32; 4] {
    let mut weights = NO_WEIGHTS;
    let mut left_edge = view.left(x, y);

    if view.top(x, y) {
        let diagonal = if params.diagonals && params.max_diagonal_steps > 0 {
            let steps = params.max_diagonal_steps;
            diagonal::diagonal_weights(view, params.area, x, y, steps, params.subsample)
        } else {
            None
        };

        match diagonal {
            Some((r, g)) => {
                weights[0] = r;
                weights[1] = g;
                // Diagonal weights cover both edges of this pixel.
                left_edge = false;
            }
            None => {
                let (r, g) = horizontal_weights(view, params, x, y);
                weights[0] = r;
                weights[1] = g;
            }
        }
    }

    if left_edge {
        let (b, a) = vertical_weights(view, params, x, y);
        weights[2] = b;
        weights[3] = a;
    }

    weights
}

/// Walk from `start` in `direction` while the search table says the segment continues.
fn search_end<F>(search: &SearchTexture, steps: u32, start: i32, direction: i32, window: F) -> i32
where
    F: Fn(i32) -> SearchWindow,
{
    let mut end = start;
    for _ in 0..steps {
        let advance = search.advance(window(end)) as i32;
        end += direction * advance;
        if advance < 2 {
            break;
        }
    }
    end
}

/// Weights across the top edge of `(x, y)`.
fn horizontal_weights(view: &EdgeView<'_>, params: &WeightParams<'_>, x: i32, y: i32) -> (f32, f32) {
    let crossing = |cx: i32| view.left(cx, y) || view.left(cx, y - 1);

    let left_end = search_end(params.search, params.max_search_steps, x, -1, |end| SearchWindow {
        on_edge0: view.top(end - 1, y),
        crossing0: crossing(end),
        on_edge1: view.top(end - 2, y),
        crossing1: crossing(end - 1),
    });
    let right_end = search_end(params.search, params.max_search_steps, x, 1, |end| SearchWindow {
        on_edge0: view.top(end + 1, y),
        crossing0: crossing(end + 1),
        on_edge1: view.top(end + 2, y),
        crossing1: crossing(end + 2),
    });

    let d_left = (x - left_end) as f32;
    let d_right = (right_end - x) as f32;
    let e1 = view.left_code(left_end, y);
    let e2 = view.left_code(right_end + 1, y);

    let (mut r, mut g) =
        params.area.sample_orthogonal(d_left, d_right, e1, e2, params.subsample.horizontal);

    if params.corners {
        let rounding = corner_rounding(params.corner_rounding, d_left, d_right);
        let below = 1.0
            - rounding.0 * view.left(left_end, y + 1) as u8 as f32
            - rounding.1 * view.left(right_end + 1, y + 1) as u8 as f32;
        let above = 1.0
            - rounding.0 * view.left(left_end, y - 2) as u8 as f32
            - rounding.1 * view.left(right_end + 1, y - 2) as u8 as f32;
        r *= saturate(below);
        g *= saturate(above);
    }

    (r, g)
}

/// Weights across the left edge of `(x, y)`.
fn vertical_weights(view: &EdgeView<'_>, params: &WeightParams<'_>, x: i32, y: i32) -> (f32, f32) {
    let crossing = |cy: i32| view.top(x, cy) || view.top(x - 1, cy);

    let top_end = search_end(params.search, params.max_search_steps, y, -1, |end| SearchWindow {
        on_edge0: view.left(x, end - 1),
        crossing0: crossing(end),
        on_edge1: view.left(x, end - 2),
        crossing1: crossing(end - 1),
    });
    let bottom_end = search_end(params.search, params.max_search_steps, y, 1, |end| SearchWindow {
        on_edge0: view.left(x, end + 1),
        crossing0: crossing(end + 1),
        on_edge1: view.left(x, end + 2),
        crossing1: crossing(end + 2),
    });

    let d_top = (y - top_end) as f32;
    let d_bottom = (bottom_end - y) as f32;
    let e1 = view.top_code(x, top_end);
    let e2 = view.top_code(x, bottom_end + 1);

    let (mut b, mut a) =
        params.area.sample_orthogonal(d_top, d_bottom, e1, e2, params.subsample.vertical);

    if params.corners {
        let rounding = corner_rounding(params.corner_rounding, d_top, d_bottom);
        let right = 1.0
            - rounding.0 * view.top(x + 1, top_end) as u8 as f32
            - rounding.1 * view.top(x + 1, bottom_end + 1) as u8 as f32;
        let left = 1.0
            - rounding.0 * view.top(x - 2, top_end) as u8 as f32
            - rounding.1 * view.top(x - 2, bottom_end + 1) as u8 as f32;
        b *= saturate(right);
        a *= saturate(left);
    }

    (b, a)
}

/// How much each end of a segment may reduce the weights at a sharp corner.
///
/// Only the nearer end counts, or both equally at the centre of the segment.
fn corner_rounding(rounding_norm: f32, d_near: f32, d_far: f32) -> (f32, f32) {
    let near = (d_near <= d_far) as u8 as f32;
    let far = (d_far <= d_near) as u8 as f32;
    let scale = (1.0 - rounding_norm) / (near + far);
    (near * scale, far * scale)
}
