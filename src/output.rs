//! PNG input and output for frame sequences

use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};

use crate::error::SmaaError;
use crate::frame::{ColorImage, DepthImage, VelocityImage};

/// Largest motion, in pixels per axis, representable in a velocity PNG.
///
/// Channel values map linearly from `[0, 1]` to `[-range, range]`; a
/// mid-grey pixel means no motion.
pub const VELOCITY_PNG_RANGE: f32 = 32.0;

/// Load a colour frame as linear floating point RGBA in `[0, 1]`.
pub fn load_color(path: &Path) -> Result<ColorImage, SmaaError> {
    Ok(image::open(path)?.to_rgba32f())
}

/// Load a depth buffer from a greyscale image (0 is nearest).
pub fn load_depth(path: &Path) -> Result<DepthImage, SmaaError> {
    Ok(image::open(path)?.to_luma32f())
}

/// Load a velocity buffer; red and green carry the x and y motion.
pub fn load_velocity(path: &Path) -> Result<VelocityImage, SmaaError> {
    let mut velocity = image::open(path)?.to_rgba32f();
    for pixel in velocity.pixels_mut() {
        let [r, g, _, _] = pixel.0;
        pixel.0 = [decode_velocity(r), decode_velocity(g), 0.0, 0.0];
    }
    Ok(velocity)
}

fn decode_velocity(channel: f32) -> f32 {
    (channel * 2.0 - 1.0) * VELOCITY_PNG_RANGE
}

/// Quantize a floating point frame to 8-bit RGB; alpha is dropped.
pub fn to_rgb8(image: &ColorImage) -> RgbImage {
    let quantize = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, _] = image.get_pixel(x, y).0;
        Rgb([quantize(r), quantize(g), quantize(b)])
    })
}

/// Save an RGB image to a PNG file, creating parent directories.
pub fn save_png(image: &RgbImage, path: &Path) -> Result<(), SmaaError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    image.save(path)?;
    Ok(())
}

/// Path of the companion buffer for `frame` in `dir`, matched by file name.
///
/// `frames/0001.png` with `dir = depth/` gives `depth/0001.png`.
pub fn companion_path(frame: &Path, dir: &Path) -> Option<PathBuf> {
    frame.file_name().map(|name| dir.join(name))
}
