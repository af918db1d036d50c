//! Boundary between the runtime's state machines and whatever actually puts
//! pixels on a display.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use wxr_core::XrResult;

use crate::sync::Fence;
use crate::types::{
    CompositionLayer, EnvironmentBlendMode, Extent2Df, LocationFlags, Nanos, Pose,
    ReferenceSpaceType, SwapchainDesc, Time, View,
};

/// Static description of the display device.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemInfo {
    pub vendor_id: u32,
    pub system_name: String,
    pub max_image_width: u32,
    pub max_image_height: u32,
    pub max_layer_count: u32,
    pub max_sample_count: u32,
    pub recommended_width: u32,
    pub recommended_height: u32,
    pub orientation_tracking: bool,
    pub position_tracking: bool,
    pub blend_modes: Vec<EnvironmentBlendMode>,
}

/// One allocated swapchain image.
#[derive(Clone)]
pub struct BackendImage {
    /// OpenGL ES texture name handed to the application.
    pub texture: u32,
    pub fence: Arc<Fence>,
}

/// A pose in the backend's world frame plus its validity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedPose {
    pub pose: Pose,
    pub flags: LocationFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTiming {
    /// First vsync at or after the queried time.
    pub next_vsync: Time,
    pub period: Nanos,
    /// Vsyncs the compositor missed since the previous query.
    pub missed_frames: u32,
}

/// Display-side events that drive the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendEvent {
    Ready,
    Visible,
    Hidden,
    Focused,
    Unfocused,
    StopRequested,
    Lost,
}

/// Images handed to the compositor for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSubmission {
    pub display_time: Time,
    pub blend_mode: EnvironmentBlendMode,
    pub layers: Vec<CompositionLayer>,
    /// `(swapchain handle, image index)` for every image the layers reference.
    pub images: Vec<(u64, u32)>,
}

/// Presentation backend used by a runtime.
pub trait PresentationBackend: Send + Sync {
    fn name(&self) -> &str;

    fn system_info(&self) -> SystemInfo;

    /// GL internal formats, in order of preference.
    fn swapchain_formats(&self) -> Vec<i64>;

    fn allocate_images(&self, desc: &SwapchainDesc, count: u32) -> XrResult<Vec<BackendImage>>;

    fn free_images(&self, images: &[BackendImage]);

    /// The application acquired `image`; arm its fence for the upcoming work.
    fn image_acquired(&self, image: &BackendImage);

    /// World pose of a reference space origin at `time`, `None` when untracked.
    fn locate_reference(&self, ty: ReferenceSpaceType, time: Time) -> Option<TrackedPose>;

    /// Per-eye views in the world frame.
    fn eye_views(&self, time: Time) -> Option<Vec<View>>;

    fn stage_bounds(&self) -> Option<Extent2Df>;

    fn frame_timing(&self, after: Time) -> FrameTiming;

    /// Subscribe a new session to display events.
    fn connect(&self) -> Receiver<BackendEvent>;

    fn session_began(&self);

    fn session_ended(&self);

    fn submit(&self, frame: FrameSubmission) -> XrResult<()>;
}
