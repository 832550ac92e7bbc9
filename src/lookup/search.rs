//! Search lookup table.
//!
//! The orthogonal edge search walks along an edge two pixels at a time. Each
//! two-pixel window is summarised in a 4-bit code:
//!
//! | Bit | Meaning |
//! |-----|---------|
//! | 0 | first window pixel carries the edge |
//! | 1 | a crossing edge separates the first pixel from the current end |
//! | 2 | second window pixel carries the edge |
//! | 3 | a crossing edge separates the second pixel from the first |
//!
//! The table maps each code to how many window pixels (0, 1 or 2) still
//! belong to the segment. It is stored as a 16x1 grayscale PNG.

use crate::error::{LookupKind, SmaaError};
use image::{GrayImage, Luma};
use std::path::Path;

pub const SEARCH_TEXTURE_WIDTH: u32 = 16;
pub const SEARCH_TEXTURE_HEIGHT: u32 = 1;

/// Gray level used per pixel of advance when stored as an image.
const LEVEL_PER_PIXEL: u8 = 127;

/// One two-pixel window of an edge search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchWindow {
    pub on_edge0: bool,
    pub crossing0: bool,
    pub on_edge1: bool,
    pub crossing1: bool,
}

impl SearchWindow {
    pub fn code(&self) -> usize {
        self.on_edge0 as usize
            | (self.crossing0 as usize) << 1
            | (self.on_edge1 as usize) << 2
            | (self.crossing1 as usize) << 3
    }

    fn from_code(code: usize) -> Self {
        Self {
            on_edge0: code & 1 != 0,
            crossing0: code & 2 != 0,
            on_edge1: code & 4 != 0,
            crossing1: code & 8 != 0,
        }
    }

    fn advance(&self) -> u8 {
        if !self.on_edge0 || self.crossing0 {
            0
        } else if !self.on_edge1 || self.crossing1 {
            1
        } else {
            2
        }
    }
}

/// Precomputed search advance table.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTexture {
    image: GrayImage,
}

impl SearchTexture {
    /// Compute the table.
    pub fn generate() -> Self {
        let image = GrayImage::from_fn(SEARCH_TEXTURE_WIDTH, SEARCH_TEXTURE_HEIGHT, |x, _| {
            Luma([SearchWindow::from_code(x as usize).advance() * LEVEL_PER_PIXEL])
        });
        Self { image }
    }

    /// Wrap an image loaded from storage, checking its size.
    pub fn from_image(image: GrayImage) -> Result<Self, SmaaError> {
        let actual = image.dimensions();
        let expected = (SEARCH_TEXTURE_WIDTH, SEARCH_TEXTURE_HEIGHT);
        if actual != expected {
            return Err(SmaaError::InvalidLookup { kind: LookupKind::Search, expected, actual });
        }
        Ok(Self { image })
    }

    pub fn load(path: &Path) -> Result<Self, SmaaError> {
        let image = image::open(path)?.into_luma8();
        Self::from_image(image)
    }

    pub fn save(&self, path: &Path) -> Result<(), SmaaError> {
        self.image.save(path)?;
        Ok(())
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    /// Number of window pixels that continue the segment.
    pub fn advance(&self, window: SearchWindow) -> u32 {
        let level = self.image.get_pixel(window.code() as u32, 0).0[0] as u32;
        let step = LEVEL_PER_PIXEL as u32;
        ((level + step / 2) / step).min(2)
    }
}
