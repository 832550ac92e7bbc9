//! Diagonal pattern search for the blending weight stage.
//!
//! A 45 degree staircase is a run of "units": pixels carrying both a side edge
//! and a top edge. Two orientations exist:
//!
//! - `/` units have a left and a top edge and climb towards the upper right.
//! - `\` units have a top edge and a right edge (the left edge of the next
//!   pixel) and climb towards the upper left.
//!
//! Both are handled by one search written for `/` and evaluated in a
//! horizontally mirrored frame for `\`.

use super::weights::EdgeView;
use crate::jitter::SubsampleIndices;
use crate::lookup::AreaTexture;

/// Segments must be longer than this many units.
const MIN_DIAGONAL_LENGTH: u32 = 3;

/// Staircase orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Orientation {
    mirrored: bool,
}

const RISING: Orientation = Orientation { mirrored: false };
const FALLING: Orientation = Orientation { mirrored: true };

impl Orientation {
    /// Horizontal step, mirrored for `\`.
    fn dx(&self, dx: i32) -> i32 {
        if self.mirrored {
            -dx
        } else {
            dx
        }
    }

    fn side(&self, view: &EdgeView<'_>, x: i32, y: i32) -> bool {
        if self.mirrored {
            view.left(x + 1, y)
        } else {
            view.left(x, y)
        }
    }

    fn top(&self, view: &EdgeView<'_>, x: i32, y: i32) -> bool {
        view.top(x, y)
    }

    fn is_unit(&self, view: &EdgeView<'_>, x: i32, y: i32) -> bool {
        self.side(view, x, y) && self.top(view, x, y)
    }
}

/// Result of walking along a staircase.
struct DiagonalRun {
    /// Units passed before the run stopped
    length: u32,
    /// The walk ended on the step limit rather than on the staircase end
    hit_limit: bool,
    /// First position that was not a unit
    stop: (i32, i32),
}

fn walk(
    view: &EdgeView<'_>,
    orientation: Orientation,
    from: (i32, i32),
    step: (i32, i32),
    limit: u32,
) -> DiagonalRun {
    let mut length = 0;
    let mut position = (from.0 + step.0, from.1 + step.1);
    while orientation.is_unit(view, position.0, position.1) {
        length += 1;
        if length >= limit {
            return DiagonalRun { length, hit_limit: true, stop: position };
        }
        position = (position.0 + step.0, position.1 + step.1);
    }
    DiagonalRun { length, hit_limit: false, stop: position }
}

/// Weights for one staircase orientation through `(x, y)`.
fn orientation_weights(
    view: &EdgeView<'_>,
    area: &AreaTexture,
    orientation: Orientation,
    x: i32,
    y: i32,
    max_steps: u32,
    row: usize,
) -> Option<(f32, f32)> {
    let limit = max_steps.saturating_sub(1).max(1);
    let down = (orientation.dx(-1), 1);
    let up = (orientation.dx(1), -1);

    let (d_low, low_limited) = if orientation.side(view, x, y) {
        let run = walk(view, orientation, (x, y), down, limit);
        let extra = (!run.hit_limit && orientation.top(view, run.stop.0, run.stop.1)) as u32;
        (run.length + extra, run.hit_limit)
    } else {
        (0, false)
    };

    let high = walk(view, orientation, (x, y), up, limit);
    let d_high = high.length;

    if d_low + d_high + 1 <= MIN_DIAGONAL_LENGTH {
        return None;
    }

    let low_end = (x + down.0 * d_low as i32, y + down.1 * d_low as i32);
    let high_end = (x + up.0 * d_high as i32, y + up.1 * d_high as i32);

    // Crossing codes: 2 for a crossing continuing the staircase end
    // vertically, 1 for one continuing it horizontally.
    let start = if low_limited {
        0
    } else {
        2 * orientation.side(view, low_end.0, low_end.1 + 1) as u8
            + orientation.top(view, low_end.0 + orientation.dx(-1), low_end.1) as u8
    };
    let end = if high.hit_limit {
        0
    } else {
        2 * orientation.top(view, high_end.0 + orientation.dx(1), high_end.1) as u8
            + orientation.side(view, high_end.0 + orientation.dx(1), high_end.1 - 1) as u8
    };

    let weights = area.sample_diagonal(d_low, d_high, start, end, row);
    if weights == (0.0, 0.0) {
        None
    } else {
        Some(weights)
    }
}

/// Diagonal weights across the top edge of `(x, y)`, if the pixel lies on a
/// diagonal staircase of either orientation.
pub(super) fn diagonal_weights(
    view: &EdgeView<'_>,
    area: &AreaTexture,
    x: i32,
    y: i32,
    max_steps: u32,
    subsample: SubsampleIndices,
) -> Option<(f32, f32)> {
    let rising = orientation_weights(view, area, RISING, x, y, max_steps, subsample.diag1);
    let falling = orientation_weights(view, area, FALLING, x, y, max_steps, subsample.diag2);

    match (rising, falling) {
        (None, None) => None,
        (a, b) => {
            let (ar, ag) = a.unwrap_or((0.0, 0.0));
            let (br, bg) = b.unwrap_or((0.0, 0.0));
            Some(((ar + br).min(1.0), (ag + bg).min(1.0)))
        }
    }
}
