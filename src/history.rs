//! Per-view persistent state: jitter position and the previous resolved frame.

use crate::frame::{ColorImage, Rect};
use crate::jitter::JitterSequencer;
use std::collections::HashMap;
use std::sync::Arc;

/// The last resolved frame of a view.
///
/// The image is reference counted so a frame in flight can read it while the
/// owning [`ViewState`] stays borrowed.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    pub image: Arc<ColorImage>,
    pub viewport: Rect,
}

impl HistoryBuffer {
    pub fn new(image: ColorImage, viewport: Rect) -> Self {
        Self { image: Arc::new(image), viewport }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// State carried between frames of one view.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub jitter: JitterSequencer,
    pub history: Option<HistoryBuffer>,
    /// Frames that went through the temporal resolve
    pub frames_resolved: u64,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// History usable for this frame; a camera cut hides any stored frame.
    pub fn history_for_frame(&self, camera_cut: bool) -> Option<&HistoryBuffer> {
        if camera_cut {
            None
        } else {
            self.history.as_ref()
        }
    }

    /// Replace the stored history with a newly resolved frame.
    pub fn store_history(&mut self, image: ColorImage, viewport: Rect) {
        self.history = Some(HistoryBuffer::new(image, viewport));
    }

    /// Drop history and restart the jitter sequence.
    pub fn invalidate(&mut self) {
        self.history = None;
        self.jitter.reset();
    }
}

/// Identifier of a view owned by the caller (a viewport, a camera, a window).
pub type ViewId = u64;

/// View states keyed by view, owned by whoever owns view lifetimes.
#[derive(Debug, Default)]
pub struct ViewStates {
    views: HashMap<ViewId, ViewState>,
}

impl ViewStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, view: ViewId) -> Option<&ViewState> {
        self.views.get(&view)
    }

    pub fn get_mut(&mut self, view: ViewId) -> Option<&mut ViewState> {
        self.views.get_mut(&view)
    }

    pub fn get_or_create(&mut self, view: ViewId) -> &mut ViewState {
        self.views.entry(view).or_default()
    }

    /// Destroy a view and its history. Returns true if it existed.
    pub fn destroy(&mut self, view: ViewId) -> bool {
        self.views.remove(&view).is_some()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}
