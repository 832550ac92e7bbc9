//! Neighbourhood blending stage.
//!
//! Each pixel mixes with at most two neighbours along the dominant axis,
//! using the weights stored on its own edges and on the edges shared with its
//! right and bottom neighbours. The alpha channel is replaced by
//! `sqrt(5 * |velocity|)` (velocity in viewport units) for the temporal
//! resolve to compare against history.

use crate::frame::{
    dispatch, fetch_rgba, sample_bilinear, ColorImage, Rect, VelocityImage, WeightImage,
};

/// Below this total weight a pixel is copied unchanged.
const MIN_TOTAL_WEIGHT: f32 = 1e-5;

/// Scale applied to the velocity length before the square root.
pub const VELOCITY_ALPHA_SCALE: f32 = 5.0;

/// Weight stored at `(x, y)`, or zero outside the viewport.
fn weight_at(weights: &WeightImage, viewport: Rect, x: i32, y: i32, channel: usize) -> f32 {
    if viewport.contains(x, y) {
        weights.get_pixel(x as u32, y as u32).0[channel]
    } else {
        0.0
    }
}

/// Encode a pixel velocity as the alpha channel consumed by the resolve stage.
pub fn velocity_alpha(velocity_pixels: [f32; 2], viewport: Rect) -> f32 {
    let (width, height) = viewport.size();
    let u = velocity_pixels[0] / width.max(1.0);
    let v = velocity_pixels[1] / height.max(1.0);
    (VELOCITY_ALPHA_SCALE * (u * u + v * v).sqrt()).sqrt()
}

/// Blend every pixel with its neighbours according to the weight image.
///
/// Output alpha is the [`velocity_alpha`] of the blended motion, not the input alpha.
pub fn blend_neighborhood(
    color: &ColorImage,
    velocity: &VelocityImage,
    weights: &WeightImage,
    viewport: Rect,
) -> ColorImage {
    let (width, height) = color.dimensions();

    dispatch(width, height, viewport, Some(color), |x, y| {
        let (x, y) = (x as i32, y as i32);

        // Amount taken from the right, below, left and above.
        let right = weight_at(weights, viewport, x + 1, y, 3);
        let below = weight_at(weights, viewport, x, y + 1, 1);
        let left = weight_at(weights, viewport, x, y, 2);
        let above = weight_at(weights, viewport, x, y, 0);

        if right + below + left + above < MIN_TOTAL_WEIGHT {
            let mut out = fetch_rgba(color, viewport, x, y);
            let v = fetch_rgba(velocity, viewport, x, y);
            out[3] = velocity_alpha([v[0], v[1]], viewport);
            return out;
        }

        let horizontal = right.max(left) > below.max(above);
        let (offsets, amounts) = if horizontal {
            ([(right, 0.0), (-left, 0.0)], [right, left])
        } else {
            ([(0.0, below), (0.0, -above)], [below, above])
        };
        let total = amounts[0] + amounts[1];

        let (cx, cy) = (x as f32 + 0.5, y as f32 + 0.5);
        let mut out = [0.0f32; 4];
        let mut motion = [0.0f32; 2];
        for (offset, amount) in offsets.iter().zip(amounts) {
            let share = amount / total;
            let sample = sample_bilinear(color, viewport, cx + offset.0, cy + offset.1);
            let v = sample_bilinear(velocity, viewport, cx + offset.0, cy + offset.1);
            for (channel, value) in out.iter_mut().zip(sample).take(3) {
                *channel += share * value;
            }
            motion[0] += share * v[0];
            motion[1] += share * v[1];
        }
        out[3] = velocity_alpha(motion, viewport);
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn split(width: u32, height: u32) -> ColorImage {
        ColorImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgba([0.0, 0.0, 0.0, 1.0])
            } else {
                Rgba([1.0, 1.0, 1.0, 1.0])
            }
        })
    }

    #[test]
    fn test_zero_weights_copy_colour() {
        let color = split(6, 4);
        let velocity = VelocityImage::new(6, 4);
        let weights = WeightImage::new(6, 4);
        let out = blend_neighborhood(&color, &velocity, &weights, Rect::full(6, 4));
        for (x, y, p) in out.enumerate_pixels() {
            let src = color.get_pixel(x, y).0;
            assert_eq!(&p.0[..3], &src[..3]);
            assert_eq!(p.0[3], 0.0);
        }
    }

    #[test]
    fn test_left_weight_pulls_from_left() {
        let color = split(6, 4);
        let velocity = VelocityImage::new(6, 4);
        let mut weights = WeightImage::new(6, 4);
        // Pixel (3, 1) takes a quarter from its left neighbour.
        weights.put_pixel(3, 1, Rgba([0.0, 0.0, 0.25, 0.0]));
        let out = blend_neighborhood(&color, &velocity, &weights, Rect::full(6, 4));
        assert!((out.get_pixel(3, 1).0[0] - 0.75).abs() < 1e-6);
        assert_eq!(out.get_pixel(3, 2).0[0], 1.0);
    }

    #[test]
    fn test_neighbour_weight_pulls_into_left_pixel() {
        let color = split(6, 4);
        let velocity = VelocityImage::new(6, 4);
        let mut weights = WeightImage::new(6, 4);
        // Alpha of (3, 1): the left pixel (2, 1) takes from (3, 1).
        weights.put_pixel(3, 1, Rgba([0.0, 0.0, 0.0, 0.5]));
        let out = blend_neighborhood(&color, &velocity, &weights, Rect::full(6, 4));
        assert!((out.get_pixel(2, 1).0[0] - 0.5).abs() < 1e-6);
        assert_eq!(out.get_pixel(3, 1).0[0], 1.0);
    }

    #[test]
    fn test_velocity_alpha() {
        let viewport = Rect::full(100, 100);
        assert_eq!(velocity_alpha([0.0, 0.0], viewport), 0.0);
        // 20 pixels of a 100 pixel viewport: sqrt(5 * 0.2) = 1.
        assert!((velocity_alpha([20.0, 0.0], viewport) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_output_alpha_encodes_motion_not_input_alpha() {
        let color = ColorImage::from_pixel(100, 2, Rgba([0.5, 0.5, 0.5, 0.5]));
        let velocity = VelocityImage::from_pixel(100, 2, Rgba([20.0, 0.0, 0.0, 0.0]));
        let weights = WeightImage::new(100, 2);
        let out = blend_neighborhood(&color, &velocity, &weights, Rect::full(100, 2));
        // 20 of 100 pixels: sqrt(5 * 0.2) = 1.
        assert!(out.pixels().all(|p| (p.0[3] - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_outside_viewport_is_copied() {
        let color = split(6, 4);
        let velocity = VelocityImage::new(6, 4);
        let weights = WeightImage::new(6, 4);
        let out = blend_neighborhood(&color, &velocity, &weights, Rect::new(0, 0, 3, 4));
        assert_eq!(out.get_pixel(5, 0).0, color.get_pixel(5, 0).0);
    }
}
