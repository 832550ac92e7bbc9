//! Two-sample subpixel jitter sequence (SMAA T2x).
//!
//! Each view alternates between two rotated-grid sample offsets:
//!
//! | Index | Offset (pixels) | Area table rows (h, v, diag1, diag2) |
//! |-------|-----------------|--------------------------------------|
//! | 0 | (-0.25, -0.25) | (1, 1, 1, 0) |
//! | 1 | (+0.25, +0.25) | (2, 2, 2, 0) |
//!
//! The offset is applied to the camera projection before the frame is
//! rendered, and the index selects which subsample rows of the area table the
//! blending weight stage reads.

use crate::frame::Rect;
use glam::{Mat4, Vec2, Vec3};

/// Sample offsets in pixels, indexed by sample index.
pub const SAMPLE_OFFSETS: [Vec2; 2] = [Vec2::new(-4.0 / 16.0, -4.0 / 16.0), Vec2::new(4.0 / 16.0, 4.0 / 16.0)];

/// Area table subsample rows for one jitter sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubsampleIndices {
    pub horizontal: usize,
    pub vertical: usize,
    pub diag1: usize,
    pub diag2: usize,
}

impl SubsampleIndices {
    /// Rows used when no temporal supersampling is in effect.
    pub const NONE: SubsampleIndices = SubsampleIndices { horizontal: 0, vertical: 0, diag1: 0, diag2: 0 };

    pub fn for_sample(index: u8) -> Self {
        if index & 1 == 0 {
            SubsampleIndices { horizontal: 1, vertical: 1, diag1: 1, diag2: 0 }
        } else {
            SubsampleIndices { horizontal: 2, vertical: 2, diag1: 2, diag2: 0 }
        }
    }
}

/// Jitter chosen for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JitterState {
    pub index: u8,
    pub offset_pixels: Vec2,
    pub offset_ndc: Vec2,
}

impl JitterState {
    /// Build the state for `index` in a viewport.
    pub fn new(index: u8, viewport: Rect) -> Self {
        let index = index & 1;
        let offset_pixels = SAMPLE_OFFSETS[index as usize];
        let (width, height) = viewport.size();
        let offset_ndc = Vec2::new(
            offset_pixels.x / (width.max(1.0) * 0.5),
            -offset_pixels.y / (height.max(1.0) * 0.5),
        );
        Self { index, offset_pixels, offset_ndc }
    }

    /// Translate a projection matrix by the NDC offset.
    pub fn apply_to_projection(&self, projection: &Mat4) -> Mat4 {
        Mat4::from_translation(Vec3::new(self.offset_ndc.x, self.offset_ndc.y, 0.0)) * *projection
    }

    pub fn subsample_indices(&self) -> SubsampleIndices {
        SubsampleIndices::for_sample(self.index)
    }
}

/// Per-view alternation between the two samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JitterSequencer {
    last: Option<u8>,
}

impl JitterSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the most recent sample, if any frame has been sequenced.
    pub fn current_index(&self) -> Option<u8> {
        self.last
    }

    /// The sample the next call to [`advance`](Self::advance) would produce.
    pub fn peek(&self, camera_cut: bool) -> u8 {
        match self.last {
            Some(index) if !camera_cut => (index + 1) & 1,
            _ => 0,
        }
    }

    /// Move to the next sample. A camera cut restarts the sequence at 0.
    pub fn advance(&mut self, camera_cut: bool, viewport: Rect) -> JitterState {
        let index = self.peek(camera_cut);
        self.last = Some(index);
        JitterState::new(index, viewport)
    }

    /// Forget the sequence position.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn test_sequence_alternates() {
        let viewport = Rect::full(64, 32);
        let mut sequencer = JitterSequencer::new();
        let indices: Vec<u8> = (0..6).map(|_| sequencer.advance(false, viewport).index).collect();
        assert_eq!(indices, vec![0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn test_camera_cut_resets_to_zero() {
        let viewport = Rect::full(64, 32);
        let mut sequencer = JitterSequencer::new();
        sequencer.advance(false, viewport);
        assert_eq!(sequencer.advance(true, viewport).index, 0);
        assert_eq!(sequencer.advance(false, viewport).index, 1);
        assert_eq!(sequencer.advance(true, viewport).index, 0);
        assert_eq!(sequencer.advance(true, viewport).index, 0);
    }

    #[test]
    fn test_peek_does_not_advance() {
        let viewport = Rect::full(8, 8);
        let mut sequencer = JitterSequencer::new();
        sequencer.advance(false, viewport);
        assert_eq!(sequencer.peek(false), 1);
        assert_eq!(sequencer.peek(false), 1);
        assert_eq!(sequencer.current_index(), Some(0));
    }

    #[test]
    fn test_ndc_offset() {
        let state = JitterState::new(1, Rect::full(100, 50));
        assert!((state.offset_ndc.x - 0.25 / 50.0).abs() < 1e-7);
        assert!((state.offset_ndc.y + 0.25 / 25.0).abs() < 1e-7);
    }

    #[test]
    fn test_projection_translation() {
        let state = JitterState::new(0, Rect::full(4, 4));
        let jittered = state.apply_to_projection(&Mat4::IDENTITY);
        let clip = jittered * Vec4::new(0.0, 0.0, 0.5, 1.0);
        assert!((clip.x - state.offset_ndc.x).abs() < 1e-7);
        assert!((clip.y - state.offset_ndc.y).abs() < 1e-7);
        assert!((clip.z - 0.5).abs() < 1e-7);
    }

    #[test]
    fn test_subsample_indices() {
        assert_eq!(
            JitterState::new(0, Rect::full(4, 4)).subsample_indices(),
            SubsampleIndices { horizontal: 1, vertical: 1, diag1: 1, diag2: 0 }
        );
        assert_eq!(SubsampleIndices::for_sample(1).horizontal, 2);
    }
}
