//! SMAA T2x - Subpixel morphological antialiasing with temporal supersampling
//!
//! This library provides:
//! - Edge detection, blending weight and neighbourhood blending passes
//! - A two-sample jitter sequence and per-view history for the temporal resolve
//! - Generation and loading of the area and search lookup tables
//! - `smaa.toml` settings with range clamping
//!
//! The entry point is [`SmaaPipeline::run_frame`], which takes one frame of
//! one view and never fails: unusable frames are passed through unchanged.

pub mod cli;
pub mod config;
pub mod error;
pub mod frame;
pub mod history;
pub mod jitter;
pub mod lookup;
pub mod output;
pub mod pipeline;
pub mod stages;

pub use config::{PipelineConfig, RawSettings};
pub use error::{LookupKind, SmaaError};
pub use frame::{ColorImage, DepthImage, FrameInputs, Rect, VelocityImage};
pub use history::{HistoryBuffer, ViewId, ViewState, ViewStates};
pub use jitter::{JitterSequencer, JitterState};
pub use lookup::LookupTextures;
pub use pipeline::{FrameOutcome, FrameOutput, FrameRequest, FrameStage, SmaaPipeline};
