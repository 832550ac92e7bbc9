//! Temporal resolve stage.
//!
//! Blends the antialiased frame with the previous resolved frame, fetched at
//! the motion-compensated position. The history weight starts at the
//! configured bias and drops towards zero when the velocity (carried in alpha)
//! or the colour differs between the two frames.

use crate::config::PipelineConfig;
use crate::frame::{
    dispatch, fetch_channel0, fetch_rgba, mix, sample_bilinear, saturate, ColorImage, DepthImage,
    Rect, VelocityImage,
};
use crate::history::HistoryBuffer;

/// Converts colour divergence into the same scale as velocity divergence.
pub const COLOR_DIVERGENCE_SCALE: f32 = 0.04;

/// Divisor of the squared alpha difference.
const VELOCITY_DIVERGENCE_DIVISOR: f32 = 5.0;

/// Velocity of the closest (smallest depth) pixel in the 3x3 neighbourhood.
fn dilated_velocity(
    velocity: &VelocityImage,
    depth: &DepthImage,
    viewport: Rect,
    x: i32,
    y: i32,
) -> [f32; 2] {
    let mut closest = (x, y);
    let mut closest_depth = fetch_channel0(depth, viewport, x, y);
    for dy in -1..=1 {
        for dx in -1..=1 {
            let d = fetch_channel0(depth, viewport, x + dx, y + dy);
            if d < closest_depth {
                closest_depth = d;
                closest = (x + dx, y + dy);
            }
        }
    }
    let v = fetch_rgba(velocity, viewport, closest.0, closest.1);
    [v[0], v[1]]
}

/// History weight for one pixel.
pub fn history_weight(current: &[f32; 4], previous: &[f32; 4], config: &PipelineConfig) -> f32 {
    let alpha_delta = (current[3] * current[3] - previous[3] * previous[3]).abs();
    let velocity_delta = (alpha_delta / VELOCITY_DIVERGENCE_DIVISOR).sqrt();
    let color_delta = (current[0] - previous[0])
        .abs()
        .max((current[1] - previous[1]).abs())
        .max((current[2] - previous[2]).abs());
    let divergence = velocity_delta.max(color_delta * COLOR_DIVERGENCE_SCALE);
    config.temporal_history_bias() * saturate(1.0 - divergence * config.reprojection_weight())
}

/// Resolve the current frame against history.
///
/// Without history (first frame, or history of another size) the current
/// frame is returned as is: the placeholder history is black with weight zero.
pub fn resolve_temporal(
    current: &ColorImage,
    history: Option<&HistoryBuffer>,
    velocity: &VelocityImage,
    depth: &DepthImage,
    config: &PipelineConfig,
    viewport: Rect,
) -> ColorImage {
    let (width, height) = current.dimensions();

    let history = history.filter(|h| {
        let usable = h.dimensions() == (width, height) && !h.viewport.is_empty();
        if !usable {
            log::warn!(
                "history is {}x{}, frame is {}x{}; resolving without history",
                h.dimensions().0,
                h.dimensions().1,
                width,
                height
            );
        }
        usable
    });

    dispatch(width, height, viewport, Some(current), |x, y| {
        let c = current.get_pixel(x, y).0;
        let Some(history) = history else {
            return c;
        };

        let (x, y) = (x as i32, y as i32);
        let v = dilated_velocity(velocity, depth, viewport, x, y);
        let px = x as f32 + 0.5 - v[0];
        let py = y as f32 + 0.5 - v[1];

        let (hx, hy) = (px.floor() as i32, py.floor() as i32);
        if !history.viewport.contains(hx, hy) {
            return c;
        }

        let previous = sample_bilinear(&history.image, history.viewport, px, py);
        mix(&c, &previous, history_weight(&c, &previous, config))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawSettings;
    use image::Rgba;

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    #[test]
    fn test_no_history_returns_current() {
        let current = ColorImage::from_pixel(4, 4, Rgba([0.2, 0.4, 0.6, 0.0]));
        let velocity = VelocityImage::new(4, 4);
        let depth = DepthImage::new(4, 4);
        let out = resolve_temporal(&current, None, &velocity, &depth, &config(), Rect::full(4, 4));
        assert_eq!(out, current);
    }

    #[test]
    fn test_static_history_is_blended_with_bias() {
        let current = ColorImage::from_pixel(4, 4, Rgba([1.0, 1.0, 1.0, 0.0]));
        let previous = ColorImage::from_pixel(4, 4, Rgba([0.9, 0.9, 0.9, 0.0]));
        let history = HistoryBuffer::new(previous, Rect::full(4, 4));
        let velocity = VelocityImage::new(4, 4);
        let depth = DepthImage::new(4, 4);
        let out =
            resolve_temporal(&current, Some(&history), &velocity, &depth, &config(), Rect::full(4, 4));

        // Colour divergence 0.1 -> 0.1 * 0.04 * 25 = 0.1 rejection.
        let weight = 0.4 * (1.0 - 0.1);
        let expected = 1.0 - 0.1 * weight;
        assert!((out.get_pixel(1, 1).0[0] - expected).abs() < 1e-4, "{:?}", out.get_pixel(1, 1));
    }

    #[test]
    fn test_motion_rejects_history() {
        // Fast-moving pixels versus a static history.
        let current = ColorImage::from_pixel(4, 4, Rgba([1.0, 1.0, 1.0, 1.0]));
        let previous = ColorImage::from_pixel(4, 4, Rgba([0.0, 0.0, 0.0, 0.0]));
        let history = HistoryBuffer::new(previous, Rect::full(4, 4));
        let velocity = VelocityImage::new(4, 4);
        let depth = DepthImage::new(4, 4);
        let out =
            resolve_temporal(&current, Some(&history), &velocity, &depth, &config(), Rect::full(4, 4));
        assert_eq!(out.get_pixel(1, 1).0, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_reprojection_outside_history_viewport() {
        let current = ColorImage::from_pixel(4, 4, Rgba([1.0, 1.0, 1.0, 0.0]));
        let previous = ColorImage::from_pixel(4, 4, Rgba([0.9, 0.9, 0.9, 0.0]));
        let history = HistoryBuffer::new(previous, Rect::full(4, 4));
        // Everything moved 3 pixels right since the previous frame.
        let velocity = VelocityImage::from_pixel(4, 4, Rgba([3.0, 0.0, 0.0, 0.0]));
        let depth = DepthImage::new(4, 4);
        let out =
            resolve_temporal(&current, Some(&history), &velocity, &depth, &config(), Rect::full(4, 4));
        assert_eq!(out.get_pixel(1, 2).0, [1.0, 1.0, 1.0, 0.0]);
        assert!(out.get_pixel(3, 2).0[0] < 1.0);
    }

    #[test]
    fn test_zero_bias_disables_history() {
        let config = RawSettings { temporal_history_bias: 0.0, ..Default::default() }.resolve();
        let pixel = [0.5, 0.5, 0.5, 0.0];
        assert_eq!(history_weight(&pixel, &pixel, &config), 0.0);
        assert!((history_weight(&pixel, &pixel, &PipelineConfig::default()) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_dilation_prefers_closest_depth() {
        let mut velocity = VelocityImage::new(3, 3);
        velocity.put_pixel(2, 2, Rgba([4.0, -2.0, 0.0, 0.0]));
        let mut depth = DepthImage::from_pixel(3, 3, image::Luma([0.8]));
        depth.put_pixel(2, 2, image::Luma([0.1]));
        assert_eq!(dilated_velocity(&velocity, &depth, Rect::full(3, 3), 1, 1), [4.0, -2.0]);
        assert_eq!(dilated_velocity(&velocity, &depth, Rect::full(3, 3), 0, 0), [0.0, 0.0]);
    }
}
