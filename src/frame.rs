//! Frame buffers, viewport rectangles and pixel sampling shared by every stage.
//!
//! All stage buffers are 32-bit float images from the `image` crate:
//!
//! | Alias | Pixel | Contents |
//! |-------|-------|----------|
//! | [`ColorImage`] | `Rgba<f32>` | scene colour, world normal, material signal |
//! | [`DepthImage`] | `Luma<f32>` | scene depth, 0 is near |
//! | [`VelocityImage`] | `Rgba<f32>` | r,g = motion in pixels (current - previous) |
//! | [`EdgeImage`] | `Rgba<f32>` | r = left edge, g = top edge |
//! | [`WeightImage`] | `Rgba<f32>` | r,g = top edge weights, b,a = left edge weights |
//!
//! Stages run one closure per pixel inside the viewport on the `rayon` pool
//! (see [`dispatch`]). Reads go through [`fetch`] and [`sample_bilinear`],
//! which clamp coordinates to the viewport like a clamp-addressed sampler.

use crate::error::SmaaError;
use image::{ImageBuffer, Luma, Pixel, Rgba32FImage};
use rayon::prelude::*;

pub type ColorImage = Rgba32FImage;
pub type DepthImage = ImageBuffer<Luma<f32>, Vec<f32>>;
pub type VelocityImage = Rgba32FImage;
pub type EdgeImage = Rgba32FImage;
pub type WeightImage = Rgba32FImage;

/// A pixel rectangle inside a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle covering a whole `width` x `height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// One past the last column.
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// One past the last row.
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x as i32
            && y >= self.y as i32
            && x < self.right() as i32
            && y < self.bottom() as i32
    }

    /// Clamp a pixel coordinate into the rectangle. The rectangle must not be empty.
    pub fn clamp(&self, x: i32, y: i32) -> (u32, u32) {
        let cx = x.clamp(self.x as i32, self.right() as i32 - 1);
        let cy = y.clamp(self.y as i32, self.bottom() as i32 - 1);
        (cx as u32, cy as u32)
    }

    /// The part of this rectangle lying inside a `width` x `height` image.
    pub fn intersect(&self, width: u32, height: u32) -> Rect {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Rect { x, y, width: self.right().min(width) - x, height: self.bottom().min(height) - y }
    }

    /// Size as a float vector, for normalising pixel offsets.
    pub fn size(&self) -> (f32, f32) {
        (self.width as f32, self.height as f32)
    }
}

/// Per-frame inputs of one view.
#[derive(Debug, Clone, Copy)]
pub struct FrameInputs<'a> {
    pub color: &'a ColorImage,
    pub depth: &'a DepthImage,
    pub velocity: &'a VelocityImage,
    /// World-space normals, read by the normal edge detector and world-normal predication
    pub normal: Option<&'a ColorImage>,
    /// Specular/roughness/metallic signal for material predication
    pub material: Option<&'a ColorImage>,
    pub viewport: Rect,
}

impl<'a> FrameInputs<'a> {
    /// Inputs covering the whole colour image, without optional buffers.
    pub fn new(color: &'a ColorImage, depth: &'a DepthImage, velocity: &'a VelocityImage) -> Self {
        let (width, height) = color.dimensions();
        Self { color, depth, velocity, normal: None, material: None, viewport: Rect::full(width, height) }
    }

    pub fn with_normal(mut self, normal: &'a ColorImage) -> Self {
        self.normal = Some(normal);
        self
    }

    pub fn with_material(mut self, material: &'a ColorImage) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_viewport(mut self, viewport: Rect) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.color.dimensions()
    }

    /// Check every buffer against the colour image and return the usable viewport.
    ///
    /// The viewport is cropped to the image; an empty result is an error.
    pub fn validate(&self) -> Result<Rect, SmaaError> {
        let expected = self.color.dimensions();
        check_dimensions("depth", expected, self.depth.dimensions())?;
        check_dimensions("velocity", expected, self.velocity.dimensions())?;
        if let Some(normal) = self.normal {
            check_dimensions("normal", expected, normal.dimensions())?;
        }
        if let Some(material) = self.material {
            check_dimensions("material", expected, material.dimensions())?;
        }

        let viewport = self.viewport.intersect(expected.0, expected.1);
        if viewport.is_empty() {
            return Err(SmaaError::DimensionMismatch {
                what: "viewport",
                expected,
                actual: (self.viewport.width, self.viewport.height),
            });
        }
        Ok(viewport)
    }
}

fn check_dimensions(
    what: &'static str,
    expected: (u32, u32),
    actual: (u32, u32),
) -> Result<(), SmaaError> {
    if expected == actual {
        Ok(())
    } else {
        Err(SmaaError::DimensionMismatch { what, expected, actual })
    }
}

/// Fetch a pixel, clamping the coordinate into the viewport.
pub fn fetch<P>(image: &ImageBuffer<P, Vec<f32>>, viewport: Rect, x: i32, y: i32) -> P
where
    P: Pixel<Subpixel = f32>,
{
    let (cx, cy) = viewport.clamp(x, y);
    *image.get_pixel(cx, cy)
}

/// Fetch all four channels of an RGBA pixel with clamped addressing.
pub fn fetch_rgba(image: &Rgba32FImage, viewport: Rect, x: i32, y: i32) -> [f32; 4] {
    fetch(image, viewport, x, y).0
}

/// Fetch channel 0 of a pixel with clamped addressing.
pub fn fetch_channel0<P>(image: &ImageBuffer<P, Vec<f32>>, viewport: Rect, x: i32, y: i32) -> f32
where
    P: Pixel<Subpixel = f32>,
{
    fetch(image, viewport, x, y).channels()[0]
}

/// Bilinearly sample an RGBA image at a continuous position.
///
/// Coordinates are in pixels with pixel centres at `+0.5`, so sampling at
/// `(x + 0.5, y + 0.5)` returns pixel `(x, y)` exactly.
pub fn sample_bilinear(image: &Rgba32FImage, viewport: Rect, px: f32, py: f32) -> [f32; 4] {
    let u = px - 0.5;
    let v = py - 0.5;
    let x0 = u.floor();
    let y0 = v.floor();
    let tx = u - x0;
    let ty = v - y0;
    let (x0, y0) = (x0 as i32, y0 as i32);

    let c00 = fetch_rgba(image, viewport, x0, y0);
    let c10 = fetch_rgba(image, viewport, x0 + 1, y0);
    let c01 = fetch_rgba(image, viewport, x0, y0 + 1);
    let c11 = fetch_rgba(image, viewport, x0 + 1, y0 + 1);

    let top = mix(&c00, &c10, tx);
    let bottom = mix(&c01, &c11, tx);
    mix(&top, &bottom, ty)
}

/// Linear interpolation between two RGBA values.
pub fn mix(a: &[f32; 4], b: &[f32; 4], t: f32) -> [f32; 4] {
    if t == 0.0 {
        return *a;
    }
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
        a[3] + (b[3] - a[3]) * t,
    ]
}

pub fn saturate(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Run `kernel` for every pixel of the viewport in parallel.
///
/// Pixels outside the viewport are copied from `outside`, or left zero when
/// it is `None`. Rows are distributed over the `rayon` pool.
pub fn dispatch<F>(
    width: u32,
    height: u32,
    viewport: Rect,
    outside: Option<&Rgba32FImage>,
    kernel: F,
) -> Rgba32FImage
where
    F: Fn(u32, u32) -> [f32; 4] + Sync,
{
    let mut output = Rgba32FImage::new(width, height);
    let row_len = width as usize * 4;
    if row_len == 0 {
        return output;
    }

    let buffer: &mut [f32] = &mut output;
    buffer.par_chunks_mut(row_len).enumerate().for_each(|(y, row)| {
        let y = y as u32;
        for (x, texel) in row.chunks_exact_mut(4).enumerate() {
            let x = x as u32;
            let value = if viewport.contains(x as i32, y as i32) {
                kernel(x, y)
            } else if let Some(source) = outside {
                source.get_pixel(x, y).0
            } else {
                continue;
            };
            texel.copy_from_slice(&value);
        }
    });

    output
}
