//! Area lookup table.
//!
//! For a pixel on an edge segment, the area table gives how much of the pixel
//! is covered by the revectorised silhouette, as a pair of weights
//! (`r`: the pixel takes from across the edge, `g`: the pixel across the edge
//! takes from this one).
//!
//! Layout of the 160x560 two-channel 16-bit image:
//!
//! | Region | Tiles | Tile size | Tile index | Texel index |
//! |--------|-------|-----------|------------|-------------|
//! | x 0..80 | 5 x 5 | 16 | crossing code per end (0, 1, 3, 4) | sqrt of distance to each end |
//! | x 80..160 | 4 x 4 | 20 | crossing code per end (0..3) | distance to each end |
//!
//! Each of the seven 80-texel-tall rows holds the table for one subsample
//! offset; diagonal tables use the first five rows.

use crate::error::{LookupKind, SmaaError};
use image::{ImageBuffer, LumaA};
use std::path::Path;

pub type AreaImage = ImageBuffer<LumaA<u16>, Vec<u16>>;

pub const AREA_TEXTURE_WIDTH: u32 = 160;
pub const AREA_TEXTURE_HEIGHT: u32 = 560;

/// Texels per orthogonal tile side; distances up to `15^2` are encoded.
pub const ORTHO_TILE_SIZE: u32 = 16;
/// Texels per diagonal tile side.
pub const DIAG_TILE_SIZE: u32 = 20;
/// Height of one subsample row.
const SUBSAMPLE_ROW_HEIGHT: u32 = 80;
/// Horizontal start of the diagonal half.
const DIAG_ORIGIN_X: u32 = 80;

/// Subpixel offsets of the orthogonal tables, one per subsample row.
pub const ORTHO_OFFSETS: [f64; 7] = [0.0, -0.25, 0.25, -0.125, 0.125, -0.375, 0.375];

/// Subpixel offsets of the diagonal tables, one per subsample row.
pub const DIAG_OFFSETS: [(f64, f64); 5] =
    [(0.0, 0.0), (0.25, -0.25), (-0.25, 0.25), (0.125, -0.125), (-0.125, 0.125)];

/// Distance at which smoothed U-shapes reach their exact area.
const SMOOTH_MAX_DISTANCE: f64 = 32.0;

type Point = (f64, f64);
type Area = (f64, f64);

/// Precomputed subpixel coverage table.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaTexture {
    image: AreaImage,
}

impl AreaTexture {
    /// Compute the full table.
    pub fn generate() -> Self {
        let mut image = AreaImage::new(AREA_TEXTURE_WIDTH, AREA_TEXTURE_HEIGHT);

        for (row, &offset) in ORTHO_OFFSETS.iter().enumerate() {
            for pattern in 0..16u8 {
                let (e1, e2) = ortho_pattern_codes(pattern);
                for i in 0..ORTHO_TILE_SIZE {
                    for j in 0..ORTHO_TILE_SIZE {
                        let left = (i * i) as f64;
                        let right = (j * j) as f64;
                        let area = area_ortho(pattern, left, right, offset);
                        let x = e1 as u32 * ORTHO_TILE_SIZE + i;
                        let y = row as u32 * SUBSAMPLE_ROW_HEIGHT + e2 as u32 * ORTHO_TILE_SIZE + j;
                        image.put_pixel(x, y, encode(area));
                    }
                }
            }
        }

        for (row, &offset) in DIAG_OFFSETS.iter().enumerate() {
            for start in 0..4u8 {
                for end in 0..4u8 {
                    for i in 0..DIAG_TILE_SIZE {
                        for j in 0..DIAG_TILE_SIZE {
                            let area = area_diag(start, end, i as f64, j as f64, offset);
                            let x = DIAG_ORIGIN_X + start as u32 * DIAG_TILE_SIZE + i;
                            let y = row as u32 * SUBSAMPLE_ROW_HEIGHT
                                + end as u32 * DIAG_TILE_SIZE
                                + j;
                            image.put_pixel(x, y, encode(area));
                        }
                    }
                }
            }
        }

        Self { image }
    }

    /// Wrap an image loaded from storage, checking its size.
    pub fn from_image(image: AreaImage) -> Result<Self, SmaaError> {
        let actual = image.dimensions();
        let expected = (AREA_TEXTURE_WIDTH, AREA_TEXTURE_HEIGHT);
        if actual != expected {
            return Err(SmaaError::InvalidLookup { kind: LookupKind::Area, expected, actual });
        }
        Ok(Self { image })
    }

    pub fn load(path: &Path) -> Result<Self, SmaaError> {
        let image = image::open(path)?.into_luma_alpha16();
        Self::from_image(image)
    }

    pub fn save(&self, path: &Path) -> Result<(), SmaaError> {
        self.image.save(path)?;
        Ok(())
    }

    pub fn image(&self) -> &AreaImage {
        &self.image
    }

    /// Look up orthogonal weights.
    ///
    /// `left` and `right` are the distances in pixels to both ends of the
    /// segment, `e1`/`e2` the crossing codes (0, 1, 3 or 4) at each end.
    /// Distances are interpolated in square-root space.
    pub fn sample_orthogonal(&self, left: f32, right: f32, e1: u8, e2: u8, row: usize) -> (f32, f32) {
        let max = (ORTHO_TILE_SIZE - 1) as f32;
        let u = left.max(0.0).sqrt().min(max);
        let v = right.max(0.0).sqrt().min(max);

        let tile_x = e1.min(4) as u32 * ORTHO_TILE_SIZE;
        let tile_y = subsample_row(row, ORTHO_OFFSETS.len()) + e2.min(4) as u32 * ORTHO_TILE_SIZE;

        let (i0, j0) = (u.floor() as u32, v.floor() as u32);
        let (i1, j1) = ((i0 + 1).min(ORTHO_TILE_SIZE - 1), (j0 + 1).min(ORTHO_TILE_SIZE - 1));
        let (tu, tv) = (u - i0 as f32, v - j0 as f32);

        let texel = |i: u32, j: u32| decode(self.image.get_pixel(tile_x + i, tile_y + j));
        let lerp = |a: (f32, f32), b: (f32, f32), t: f32| (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t);

        let top = lerp(texel(i0, j0), texel(i1, j0), tu);
        let bottom = lerp(texel(i0, j1), texel(i1, j1), tu);
        lerp(top, bottom, tv)
    }

    /// Look up diagonal weights.
    ///
    /// `left` and `right` count diagonal steps to each end, `start`/`end`
    /// are two-bit crossing codes.
    pub fn sample_diagonal(&self, left: u32, right: u32, start: u8, end: u8, row: usize) -> (f32, f32) {
        let i = left.min(DIAG_TILE_SIZE - 1);
        let j = right.min(DIAG_TILE_SIZE - 1);
        let x = DIAG_ORIGIN_X + start.min(3) as u32 * DIAG_TILE_SIZE + i;
        let y = subsample_row(row, DIAG_OFFSETS.len()) + end.min(3) as u32 * DIAG_TILE_SIZE + j;
        decode(self.image.get_pixel(x, y))
    }
}

fn subsample_row(row: usize, rows: usize) -> u32 {
    row.min(rows - 1) as u32 * SUBSAMPLE_ROW_HEIGHT
}

fn encode(area: Area) -> LumaA<u16> {
    let quantize = |v: f64| (v.clamp(0.0, 1.0) * u16::MAX as f64).round() as u16;
    LumaA([quantize(area.0), quantize(area.1)])
}

fn decode(texel: &LumaA<u16>) -> (f32, f32) {
    let scale = u16::MAX as f32;
    (texel.0[0] as f32 / scale, texel.0[1] as f32 / scale)
}

/// Crossing codes at both ends for an orthogonal pattern.
///
/// Bits 0 and 1 are crossings on the pixel's side of the edge at the left and
/// right ends (weight 3), bits 2 and 3 those on the far side (weight 1).
fn ortho_pattern_codes(pattern: u8) -> (u8, u8) {
    let e1 = 3 * (pattern & 1) + ((pattern >> 2) & 1);
    let e2 = 3 * ((pattern >> 1) & 1) + ((pattern >> 3) & 1);
    (e1, e2)
}

/// Area between the line `p1 -> p2` and the edge axis inside pixel column `x`.
///
/// Returns `(below, above)`: the area on the pixel's side and on the far side.
fn area(p1: Point, p2: Point, x: f64) -> Area {
    let d = (p2.0 - p1.0, p2.1 - p1.1);
    let x1 = x;
    let x2 = x + 1.0;
    let y1 = p1.1 + d.1 * (x1 - p1.0) / d.0;
    let y2 = p1.1 + d.1 * (x2 - p1.0) / d.0;

    let inside = (x1 >= p1.0 && x1 < p2.0) || (x2 > p1.0 && x2 <= p2.0);
    if !inside {
        return (0.0, 0.0);
    }

    let trapezoid = 1f64.copysign(y1) == 1f64.copysign(y2) || y1.abs() < 1e-4 || y2.abs() < 1e-4;
    if trapezoid {
        let a = (y1 + y2) / 2.0;
        return if a < 0.0 { (a.abs(), 0.0) } else { (0.0, a.abs()) };
    }

    // The line crosses the axis inside the pixel: two triangles.
    let xc = -p1.1 * d.0 / d.1 + p1.0;
    let frac = xc.fract();
    let a1 = if xc > p1.0 { y1 * frac / 2.0 } else { 0.0 };
    let a2 = if xc < p2.0 { y2 * (1.0 - frac) / 2.0 } else { 0.0 };
    let a = if a1.abs() > a2.abs() { a1 } else { -a2 };
    if a < 0.0 {
        (a1.abs(), a2.abs())
    } else {
        (a2.abs(), a1.abs())
    }
}

/// Soften short U-shapes, which are usually features rather than aliasing.
fn smooth_area(d: f64, a1: Area, a2: Area) -> (Area, Area) {
    let p = (d / SMOOTH_MAX_DISTANCE).clamp(0.0, 1.0);
    let smooth = |a: f64| {
        let b = (a * 2.0).sqrt() * 0.5;
        b + (a - b) * p
    };
    ((smooth(a1.0), smooth(a1.1)), (smooth(a2.0), smooth(a2.1)))
}

fn add(a: Area, b: Area) -> Area {
    (a.0 + b.0, a.1 + b.1)
}

fn average(a: Area, b: Area) -> Area {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}

/// Orthogonal coverage for one of the 16 crossing patterns.
fn area_ortho(pattern: u8, left: f64, right: f64, offset: f64) -> Area {
    let d = left + right + 1.0;
    let o1 = 0.5 + offset;
    let o2 = offset - 0.5;
    let mid = (d / 2.0, 0.0);

    match pattern {
        // Straight lines and crossings on both sides of one end are left alone.
        0 | 5 | 10 | 15 => (0.0, 0.0),
        1 => {
            if left <= right {
                area((0.0, o2), mid, left)
            } else {
                (0.0, 0.0)
            }
        }
        2 => {
            if left >= right {
                area(mid, (d, o2), left)
            } else {
                (0.0, 0.0)
            }
        }
        3 => {
            let (a1, a2) =
                smooth_area(d, area((0.0, o2), mid, left), area(mid, (d, o2), left));
            add(a1, a2)
        }
        4 => {
            if left <= right {
                area((0.0, o1), mid, left)
            } else {
                (0.0, 0.0)
            }
        }
        6 => z_shape((0.0, o1), (d, o2), mid, left, offset),
        7 => area((0.0, o1), (d, o2), left),
        8 => {
            if left >= right {
                area(mid, (d, o1), left)
            } else {
                (0.0, 0.0)
            }
        }
        9 => z_shape((0.0, o2), (d, o1), mid, left, offset),
        11 => area((0.0, o2), (d, o1), left),
        12 => {
            let (a1, a2) =
                smooth_area(d, area((0.0, o1), mid, left), area(mid, (d, o1), left));
            add(a1, a2)
        }
        13 => area((0.0, o2), (d, o1), left),
        14 => area((0.0, o1), (d, o2), left),
        _ => (0.0, 0.0),
    }
}

/// Z-shapes blend the full line with two half L-shapes when offset, so the
/// centre and the sides of a long Z agree.
fn z_shape(start: Point, end: Point, mid: Point, left: f64, offset: f64) -> Area {
    let full = area(start, end, left);
    if offset.abs() > 0.0 {
        let halves = add(area(start, mid, left), area(mid, end, left));
        average(full, halves)
    } else {
        full
    }
}

/// Fraction of the pixel square at `(px, py)` lying below the line through `p1` and `p2`.
fn coverage_below(p1: Point, p2: Point, px: f64, py: f64) -> f64 {
    let slope = (p2.1 - p1.1) / (p2.0 - p1.0);
    let height = |x: f64| (p1.1 + slope * (x - p1.0) - py).clamp(0.0, 1.0);

    let mut breaks = vec![px, px + 1.0];
    if slope != 0.0 {
        for level in [0.0, 1.0] {
            let x = p1.0 + (py + level - p1.1) / slope;
            if x > px && x < px + 1.0 {
                breaks.push(x);
            }
        }
    }
    breaks.sort_by(|a, b| a.total_cmp(b));

    breaks.windows(2).map(|w| (w[1] - w[0]) * (height(w[0]) + height(w[1])) / 2.0).sum()
}

/// Coverage of the pixel `left` steps along a diagonal line `p1 -> p2`.
///
/// The diagonal units sit at `(1 + k, k)` in a y-up frame; the result pairs
/// the uncovered part of the unit with the covered part of the pixel above it.
fn area_diag_line(p1: Point, p2: Point, left: f64, offset: (f64, f64)) -> Area {
    let p1 = (p1.0 + offset.0, p1.1 + offset.1);
    let p2 = (p2.0 + offset.0, p2.1 + offset.1);
    let a1 = coverage_below(p1, p2, 1.0 + left, left);
    let a2 = coverage_below(p1, p2, 1.0 + left, 1.0 + left);
    (1.0 - a1, a2)
}

/// Candidate line endpoints for a two-bit diagonal crossing code.
///
/// Code 2 (low crossing) pins the line to the inner corner, code 1 (high
/// crossing) to the outer corner. Without a single crossing the true ending is
/// unknown and both candidates are averaged.
fn diag_endpoints(code: u8, base: Point) -> Vec<Point> {
    let low = base;
    let high = (base.0, base.1 + 1.0);
    match code {
        1 => vec![high],
        2 => vec![low],
        _ => vec![high, low],
    }
}

/// Diagonal coverage for a start/end crossing code pair.
fn area_diag(start: u8, end: u8, left: f64, right: f64, offset: (f64, f64)) -> Area {
    let d = left + right + 1.0;
    let starts = diag_endpoints(start, (1.0, 0.0));
    let ends = diag_endpoints(end, (1.0 + d, d));

    let mut total = (0.0, 0.0);
    let mut count = 0.0;
    for &p1 in &starts {
        for &p2 in &ends {
            total = add(total, area_diag_line(p1, p2, left, offset));
            count += 1.0;
        }
    }
    (total.0 / count, total.1 / count)
}
