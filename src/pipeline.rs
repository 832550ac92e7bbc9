//! Per-frame driver for the SMAA T2x passes.
//!
//! One call to [`SmaaPipeline::run_frame`] moves a view through
//!
//! ```text
//! Idle -> JitterApplied -> EdgesComputed -> WeightsComputed -> Blended
//!      -> Final | TemporallyResolved -> Idle
//! ```
//!
//! Failures never escape: a frame that cannot be processed is passed through
//! unchanged, and a frame without per-view state skips the temporal resolve.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::{DebugVisualization, PipelineConfig};
use crate::error::{LookupKind, SmaaError};
use crate::frame::{ColorImage, FrameInputs};
use crate::history::ViewState;
use crate::jitter::JitterState;
use crate::lookup::LookupTextures;
use crate::stages::{blend_neighborhood, compute_weights, detect_edges, resolve_temporal};

/// Where a frame is in the pass sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameStage {
    Idle,
    JitterApplied,
    EdgesComputed,
    WeightsComputed,
    Blended,
    Final,
    TemporallyResolved,
}

impl fmt::Display for FrameStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameStage::Idle => "idle",
            FrameStage::JitterApplied => "jitter-applied",
            FrameStage::EdgesComputed => "edges-computed",
            FrameStage::WeightsComputed => "weights-computed",
            FrameStage::Blended => "blended",
            FrameStage::Final => "final",
            FrameStage::TemporallyResolved => "temporally-resolved",
        };
        write!(f, "{}", name)
    }
}

/// Why a frame was passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassThroughReason {
    /// The master enable flag is off
    Disabled,
    /// Input buffers disagree in size or the viewport is empty
    InvalidInputs,
    /// A lookup table is unavailable
    MissingLookup(LookupKind),
}

/// How a frame ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Antialiased and blended with history
    Resolved,
    /// Antialiased without temporal resolve (camera cut or no view state)
    Blended,
    /// Input colour returned unchanged
    PassThrough(PassThroughReason),
    /// Cancelled between passes; input colour returned unchanged
    Aborted,
    /// An intermediate buffer was returned for debugging
    Visualized,
}

/// Everything needed to process one frame of one view.
pub struct FrameRequest<'a> {
    pub inputs: FrameInputs<'a>,
    pub config: PipelineConfig,
    /// The camera jumped; history must not be used
    pub camera_cut: bool,
    /// Store the result as history and advance the jitter sequence
    pub persist_history: bool,
    /// Checked between passes
    pub cancel: Option<Arc<AtomicBool>>,
}

impl<'a> FrameRequest<'a> {
    pub fn new(inputs: FrameInputs<'a>, config: PipelineConfig) -> Self {
        Self { inputs, config, camera_cut: false, persist_history: true, cancel: None }
    }

    pub fn with_camera_cut(mut self, camera_cut: bool) -> Self {
        self.camera_cut = camera_cut;
        self
    }

    pub fn with_persist_history(mut self, persist_history: bool) -> Self {
        self.persist_history = persist_history;
        self
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Result of [`SmaaPipeline::run_frame`].
#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub image: ColorImage,
    pub outcome: FrameOutcome,
    /// Jitter used for this frame; `None` when no pass ran
    pub jitter: Option<JitterState>,
}

impl FrameOutput {
    fn unchanged(inputs: &FrameInputs<'_>, outcome: FrameOutcome) -> Self {
        Self { image: inputs.color.clone(), outcome, jitter: None }
    }
}

/// Runs frames through the SMAA T2x passes.
///
/// The pipeline itself only holds the lookup tables; everything that changes
/// from frame to frame lives in the caller's [`ViewState`].
#[derive(Debug, Clone, Default)]
pub struct SmaaPipeline {
    lookups: LookupTextures,
}

impl SmaaPipeline {
    pub fn new(lookups: LookupTextures) -> Self {
        Self { lookups }
    }

    pub fn lookups(&self) -> &LookupTextures {
        &self.lookups
    }

    /// Process one frame.
    ///
    /// With `view` set, the frame uses the view's jitter sequence and history
    /// and, if `persist_history` is set, updates both. Without it the frame is
    /// treated like a camera cut and nothing is stored.
    pub fn run_frame(
        &self,
        request: &FrameRequest<'_>,
        view: Option<&mut ViewState>,
    ) -> FrameOutput {
        let inputs = &request.inputs;
        let config = &request.config;

        if !config.enabled() {
            log::debug!("SMAA disabled, passing frame through");
            let outcome = FrameOutcome::PassThrough(PassThroughReason::Disabled);
            return FrameOutput::unchanged(inputs, outcome);
        }

        let viewport = match inputs.validate() {
            Ok(viewport) => viewport,
            Err(e) => {
                log::warn!("invalid SMAA inputs, passing frame through: {}", e);
                return FrameOutput::unchanged(
                    inputs,
                    FrameOutcome::PassThrough(PassThroughReason::InvalidInputs),
                );
            }
        };

        let (area, search) = match self.lookups.resolve() {
            Ok(tables) => tables,
            Err(e) => {
                log::warn!("{}, passing frame through", e);
                let reason = match e {
                    SmaaError::MissingLookup(kind) | SmaaError::InvalidLookup { kind, .. } => {
                        PassThroughReason::MissingLookup(kind)
                    }
                    _ => PassThroughReason::InvalidInputs,
                };
                return FrameOutput::unchanged(inputs, FrameOutcome::PassThrough(reason));
            }
        };

        let inputs = inputs.with_viewport(viewport);
        let camera_cut = request.camera_cut || view.is_none();
        let index = view.as_ref().map_or(0, |v| v.jitter.peek(camera_cut));
        let jitter = JitterState::new(index, viewport);
        log::debug!("{}: sample {} (camera cut: {})", FrameStage::JitterApplied, index, camera_cut);

        if request.cancelled() {
            return abort(&inputs, FrameStage::JitterApplied);
        }

        let edges = detect_edges(&inputs, config);
        log::debug!("{}: {}x{}", FrameStage::EdgesComputed, viewport.width, viewport.height);
        if config.visualize() == DebugVisualization::Edges {
            return visualized(edges, jitter);
        }
        if request.cancelled() {
            return abort(&inputs, FrameStage::EdgesComputed);
        }

        let subsample = jitter.subsample_indices();
        let weights = compute_weights(&edges, viewport, area, search, subsample, config);
        log::debug!("{}", FrameStage::WeightsComputed);
        if config.visualize() == DebugVisualization::BlendWeights {
            return visualized(weights, jitter);
        }
        if request.cancelled() {
            return abort(&inputs, FrameStage::WeightsComputed);
        }

        let blended = blend_neighborhood(inputs.color, inputs.velocity, &weights, viewport);
        log::debug!("{}", FrameStage::Blended);

        let Some(view) = view else {
            log::debug!("{}: no view state", FrameStage::Final);
            return finish(blended, FrameOutcome::Blended, jitter);
        };

        if request.camera_cut {
            log::debug!("{}: camera cut", FrameStage::Final);
            if request.persist_history {
                view.jitter.advance(true, viewport);
                view.store_history(blended.clone(), viewport);
            }
            return finish(blended, FrameOutcome::Blended, jitter);
        }

        if request.cancelled() {
            return abort(&inputs, FrameStage::Blended);
        }

        let resolved = resolve_temporal(
            &blended,
            view.history_for_frame(false),
            inputs.velocity,
            inputs.depth,
            config,
            viewport,
        );
        log::debug!("{}: frame {}", FrameStage::TemporallyResolved, view.frames_resolved + 1);

        if request.persist_history {
            view.jitter.advance(false, viewport);
            view.store_history(resolved.clone(), viewport);
            view.frames_resolved += 1;
        }
        log::debug!("{}", FrameStage::Idle);

        finish(resolved, FrameOutcome::Resolved, jitter)
    }
}

fn abort(inputs: &FrameInputs<'_>, stage: FrameStage) -> FrameOutput {
    log::debug!("frame cancelled after {}", stage);
    FrameOutput::unchanged(inputs, FrameOutcome::Aborted)
}

fn visualized(image: ColorImage, jitter: JitterState) -> FrameOutput {
    finish(image, FrameOutcome::Visualized, jitter)
}

fn finish(image: ColorImage, outcome: FrameOutcome, jitter: JitterState) -> FrameOutput {
    FrameOutput { image, outcome, jitter: Some(jitter) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EdgeDetector, RawSettings};
    use crate::frame::{DepthImage, Rect, VelocityImage};
    use image::Rgba;

    fn split(width: u32, height: u32) -> ColorImage {
        ColorImage::from_fn(width, height, |x, _| {
            let v = if x < width / 2 { 0.0 } else { 1.0 };
            Rgba([v, v, v, 1.0])
        })
    }

    struct Buffers {
        color: ColorImage,
        depth: DepthImage,
        velocity: VelocityImage,
    }

    impl Buffers {
        fn new(color: ColorImage) -> Self {
            let (w, h) = color.dimensions();
            Self { color, depth: DepthImage::new(w, h), velocity: VelocityImage::new(w, h) }
        }

        fn inputs(&self) -> FrameInputs<'_> {
            FrameInputs::new(&self.color, &self.depth, &self.velocity)
        }
    }

    fn luminance() -> PipelineConfig {
        RawSettings { edge_detector: EdgeDetector::Luminance.into(), ..Default::default() }.resolve()
    }

    #[test]
    fn test_disabled_passes_through() {
        let buffers = Buffers::new(split(8, 8));
        let config = RawSettings { enabled: false, ..Default::default() }.resolve();
        let pipeline = SmaaPipeline::new(LookupTextures::generate());
        let out = pipeline.run_frame(&FrameRequest::new(buffers.inputs(), config), None);
        assert_eq!(out.outcome, FrameOutcome::PassThrough(PassThroughReason::Disabled));
        assert_eq!(out.image, buffers.color);
        assert!(out.jitter.is_none());
    }

    #[test]
    fn test_mismatched_buffers_pass_through() {
        let color = split(8, 8);
        let depth = DepthImage::new(8, 4);
        let velocity = VelocityImage::new(8, 8);
        let inputs = FrameInputs::new(&color, &depth, &velocity);
        let pipeline = SmaaPipeline::new(LookupTextures::generate());
        let mut view = ViewState::new();
        let out = pipeline.run_frame(&FrameRequest::new(inputs, luminance()), Some(&mut view));
        assert_eq!(out.outcome, FrameOutcome::PassThrough(PassThroughReason::InvalidInputs));
        assert_eq!(out.image, color);
        assert!(view.history.is_none());
    }

    #[test]
    fn test_missing_search_table_passes_through() {
        let buffers = Buffers::new(split(8, 8));
        let mut lookups = LookupTextures::generate();
        lookups.search = None;
        let pipeline = SmaaPipeline::new(lookups);
        let mut view = ViewState::new();
        let request = FrameRequest::new(buffers.inputs(), luminance());
        let out = pipeline.run_frame(&request, Some(&mut view));
        assert_eq!(
            out.outcome,
            FrameOutcome::PassThrough(PassThroughReason::MissingLookup(LookupKind::Search))
        );
        assert_eq!(out.image, buffers.color);
        assert_eq!(view.jitter.current_index(), None);
    }

    #[test]
    fn test_cancelled_frame_leaves_view_untouched() {
        let buffers = Buffers::new(split(8, 8));
        let pipeline = SmaaPipeline::new(LookupTextures::generate());
        let mut view = ViewState::new();
        let cancel = Arc::new(AtomicBool::new(true));
        let request = FrameRequest::new(buffers.inputs(), luminance()).with_cancel(cancel);
        let out = pipeline.run_frame(&request, Some(&mut view));
        assert_eq!(out.outcome, FrameOutcome::Aborted);
        assert_eq!(out.image, buffers.color);
        assert!(view.history.is_none());
        assert_eq!(view.jitter.current_index(), None);
    }

    #[test]
    fn test_frames_alternate_jitter_and_store_history() {
        let buffers = Buffers::new(split(8, 8));
        let pipeline = SmaaPipeline::new(LookupTextures::generate());
        let mut view = ViewState::new();
        let request = FrameRequest::new(buffers.inputs(), luminance());

        let indices: Vec<u8> = (0..4)
            .map(|_| pipeline.run_frame(&request, Some(&mut view)).jitter.map_or(9, |j| j.index))
            .collect();
        assert_eq!(indices, vec![0, 1, 0, 1]);
        assert_eq!(view.frames_resolved, 4);
        assert_eq!(view.history.as_ref().map(|h| h.viewport), Some(Rect::full(8, 8)));
    }

    #[test]
    fn test_camera_cut_restarts_jitter() {
        let buffers = Buffers::new(split(8, 8));
        let pipeline = SmaaPipeline::new(LookupTextures::generate());
        let mut view = ViewState::new();
        let request = FrameRequest::new(buffers.inputs(), luminance());
        pipeline.run_frame(&request, Some(&mut view));
        assert_eq!(view.jitter.current_index(), Some(0));

        let cut = FrameRequest::new(buffers.inputs(), luminance()).with_camera_cut(true);
        let out = pipeline.run_frame(&cut, Some(&mut view));
        assert_eq!(out.outcome, FrameOutcome::Blended);
        assert_eq!(out.jitter.map(|j| j.index), Some(0));
        assert_eq!(view.jitter.current_index(), Some(0));
        assert_eq!(view.frames_resolved, 1);
    }

    #[test]
    fn test_frame_stage_display() {
        assert_eq!(FrameStage::WeightsComputed.to_string(), "weights-computed");
        assert_eq!(FrameStage::TemporallyResolved.to_string(), "temporally-resolved");
    }
}
