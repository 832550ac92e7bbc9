//! The four image passes of SMAA T2x.
//!
//! # Module Structure
//!
//! - [`edges`] - Luma, colour or depth edge detection with predication
//! - [`weights`] - Blending weights from edge patterns and the area table
//! - `diagonal` - Diagonal staircase search used by [`weights`]
//! - [`blend`] - Neighbourhood blending, velocity stored in alpha
//! - [`resolve`] - Temporal resolve against the previous frame

pub mod blend;
mod diagonal;
pub mod edges;
pub mod resolve;
pub mod weights;

pub use blend::{blend_neighborhood, velocity_alpha};
pub use edges::{detect_edges, luma};
pub use resolve::{history_weight, resolve_temporal};
pub use weights::compute_weights;
