//! Error types for the SMAA pipeline

use std::fmt;
use thiserror::Error;

/// Which precomputed lookup table an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    Area,
    Search,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupKind::Area => write!(f, "area"),
            LookupKind::Search => write!(f, "search"),
        }
    }
}

/// Errors raised while preparing resources for a frame.
///
/// None of these escape [`crate::pipeline::SmaaPipeline::run_frame`]: the
/// pipeline degrades to passing the input through instead.
#[derive(Debug, Error)]
pub enum SmaaError {
    /// A lookup table was never supplied
    #[error("{0} lookup table is missing")]
    MissingLookup(LookupKind),
    /// A lookup table image has the wrong size
    #[error("{kind} lookup table must be {}x{}, got {}x{}", expected.0, expected.1, actual.0, actual.1)]
    InvalidLookup { kind: LookupKind, expected: (u32, u32), actual: (u32, u32) },
    /// An input buffer does not match the colour buffer's size
    #[error("{what} buffer is {}x{}, expected {}x{}", actual.0, actual.1, expected.0, expected.1)]
    DimensionMismatch { what: &'static str, expected: (u32, u32), actual: (u32, u32) },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}
