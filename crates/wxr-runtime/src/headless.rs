//! Simulated display: a fixed vsync grid, a standing user and a compositor
//! that records what it is given. Used by the shipped runtime library, the
//! CLI simulator and the tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use wxr_core::config::RuntimeConfig;
use wxr_core::{XrError, XrResult};

use crate::backend::{
    BackendEvent, BackendImage, FrameSubmission, FrameTiming, PresentationBackend, SystemInfo,
    TrackedPose,
};
use crate::sync::Fence;
use crate::time;
use crate::types::{
    EnvironmentBlendMode, Extent2Df, Fov, LocationFlags, Pose, ReferenceSpaceType,
    SwapchainDesc, Time, Vec3, View,
};

pub const GL_RGBA8: i64 = 0x8058;
pub const GL_SRGB8_ALPHA8: i64 = 0x8C43;
pub const GL_DEPTH_COMPONENT24: i64 = 0x81A6;
pub const GL_DEPTH24_STENCIL8: i64 = 0x88F0;

const VENDOR_ID: u32 = 0x5758;

/// Submissions kept for inspection; older ones are dropped.
const SUBMISSION_HISTORY: usize = 256;

const TRACKED: LocationFlags = LocationFlags {
    orientation_valid: true,
    position_valid: true,
    orientation_tracked: true,
    position_tracked: true,
};

const STATIC: LocationFlags = LocationFlags {
    orientation_valid: true,
    position_valid: true,
    orientation_tracked: false,
    position_tracked: false,
};

#[derive(Default)]
struct HeadlessState {
    subscribers: Vec<Sender<BackendEvent>>,
    hold_fences: bool,
    held: Vec<Arc<Fence>>,
    pending_misses: u32,
    tracking_lost: bool,
    device_lost: bool,
    /// The display declines to offer READY until made available again.
    unavailable: bool,
    failing_submits: u32,
    live_images: usize,
    submissions: VecDeque<FrameSubmission>,
    submitted: u64,
}

impl HeadlessState {
    fn broadcast(&mut self, event: BackendEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}

pub struct HeadlessBackend {
    config: RuntimeConfig,
    epoch: Time,
    period: i64,
    next_texture: AtomicU32,
    state: Mutex<HeadlessState>,
}

impl HeadlessBackend {
    pub fn new(config: RuntimeConfig) -> Self {
        let period = config.display_period_ns();
        info!(
            "headless display: {:.1} Hz, {}x{} per eye",
            config.display.refresh_rate_hz, config.display.view_width, config.display.view_height
        );
        Self {
            config,
            epoch: time::now_ns(),
            period,
            next_texture: AtomicU32::new(1),
            state: Mutex::new(HeadlessState::default()),
        }
    }

    /// Keep fences unsignaled after acquire until [`release_fences`](Self::release_fences).
    pub fn hold_fences(&self, hold: bool) {
        self.state.lock().hold_fences = hold;
    }

    /// Signal every fence armed while holding.
    pub fn release_fences(&self) {
        let held = std::mem::take(&mut self.state.lock().held);
        for fence in held {
            fence.signal();
        }
    }

    /// Report `count` extra missed vsyncs on the next timing query.
    pub fn inject_missed_frames(&self, count: u32) {
        let mut state = self.state.lock();
        state.pending_misses = state.pending_misses.saturating_add(count);
    }

    pub fn set_tracking(&self, tracked: bool) {
        self.state.lock().tracking_lost = !tracked;
    }

    /// Fail the next `count` submissions as a compositor fault would.
    pub fn fail_submissions(&self, count: u32) {
        let mut state = self.state.lock();
        state.failing_submits = state.failing_submits.saturating_add(count);
    }

    /// While unavailable, idle sessions are not offered READY. Making the
    /// display available again offers it to every connected session.
    pub fn set_available(&self, available: bool) {
        let mut state = self.state.lock();
        state.unavailable = !available;
        if available && !state.device_lost {
            state.broadcast(BackendEvent::Ready);
        }
    }

    /// Simulate the display going away. Every connected session is told.
    pub fn lose_device(&self) {
        warn!("headless display lost");
        let mut state = self.state.lock();
        state.device_lost = true;
        state.broadcast(BackendEvent::Lost);
    }

    pub fn inject_event(&self, event: BackendEvent) {
        debug!("injecting {:?}", event);
        self.state.lock().broadcast(event);
    }

    /// The most recent submissions, oldest first.
    pub fn submissions(&self) -> Vec<FrameSubmission> {
        self.state.lock().submissions.iter().cloned().collect()
    }

    /// Total frames composited since creation.
    pub fn submitted_frames(&self) -> u64 {
        self.state.lock().submitted
    }

    pub fn live_images(&self) -> usize {
        self.state.lock().live_images
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    fn head_pose(&self) -> Pose {
        Pose::from_translation(Vec3::new(0.0, self.config.tracking.eye_height_m, 0.0))
    }
}

impl PresentationBackend for HeadlessBackend {
    fn name(&self) -> &str {
        "headless"
    }

    fn system_info(&self) -> SystemInfo {
        let display = &self.config.display;
        let mut blend_modes = vec![EnvironmentBlendMode::Opaque];
        if display.alpha_blend {
            blend_modes.push(EnvironmentBlendMode::AlphaBlend);
        }
        SystemInfo {
            vendor_id: VENDOR_ID,
            system_name: format!("{} headless display", self.config.runtime.name),
            max_image_width: display.max_image_width,
            max_image_height: display.max_image_height,
            max_layer_count: display.max_layer_count,
            max_sample_count: display.max_sample_count,
            recommended_width: display.view_width,
            recommended_height: display.view_height,
            orientation_tracking: true,
            position_tracking: true,
            blend_modes,
        }
    }

    fn swapchain_formats(&self) -> Vec<i64> {
        vec![GL_SRGB8_ALPHA8, GL_RGBA8, GL_DEPTH24_STENCIL8, GL_DEPTH_COMPONENT24]
    }

    fn allocate_images(&self, desc: &SwapchainDesc, count: u32) -> XrResult<Vec<BackendImage>> {
        if !self.swapchain_formats().contains(&desc.format) {
            return Err(XrError::SwapchainFormatUnsupported(desc.format));
        }
        let mut state = self.state.lock();
        if state.device_lost {
            return Err(XrError::RuntimeFailure("display lost".into()));
        }
        let images: Vec<BackendImage> = (0..count)
            .map(|_| BackendImage {
                texture: self.next_texture.fetch_add(1, Ordering::Relaxed),
                fence: Arc::new(Fence::new(true)),
            })
            .collect();
        state.live_images += images.len();
        debug!(
            "allocated {} images {}x{} format {:#x}",
            count, desc.width, desc.height, desc.format
        );
        Ok(images)
    }

    fn free_images(&self, images: &[BackendImage]) {
        for image in images {
            image.fence.cancel();
        }
        let mut state = self.state.lock();
        state.live_images = state.live_images.saturating_sub(images.len());
        state
            .held
            .retain(|held| !images.iter().any(|image| Arc::ptr_eq(held, &image.fence)));
    }

    fn image_acquired(&self, image: &BackendImage) {
        let mut state = self.state.lock();
        image.fence.reset();
        if state.hold_fences {
            state.held.push(Arc::clone(&image.fence));
        } else {
            image.fence.signal();
        }
    }

    fn locate_reference(&self, ty: ReferenceSpaceType, _time: Time) -> Option<TrackedPose> {
        match ty {
            ReferenceSpaceType::View => {
                if self.state.lock().tracking_lost {
                    return None;
                }
                Some(TrackedPose {
                    pose: self.head_pose(),
                    flags: TRACKED,
                })
            }
            ReferenceSpaceType::Local => Some(TrackedPose {
                pose: Pose::from_translation(Vec3::new(
                    0.0,
                    self.config.tracking.eye_height_m,
                    0.0,
                )),
                flags: STATIC,
            }),
            ReferenceSpaceType::Stage => Some(TrackedPose {
                pose: Pose::IDENTITY,
                flags: STATIC,
            }),
        }
    }

    fn eye_views(&self, _time: Time) -> Option<Vec<View>> {
        if self.state.lock().tracking_lost {
            return None;
        }
        let tracking = &self.config.tracking;
        let half = tracking.half_fov_deg.to_radians();
        let fov = Fov {
            angle_left: -half,
            angle_right: half,
            angle_up: half,
            angle_down: -half,
        };
        let head = self.head_pose();
        let eye = |x: f32| View {
            pose: head.compose(&Pose::from_translation(Vec3::new(x, 0.0, 0.0))),
            fov,
        };
        let offset = tracking.ipd_m / 2.0;
        Some(vec![eye(-offset), eye(offset)])
    }

    fn stage_bounds(&self) -> Option<Extent2Df> {
        let tracking = &self.config.tracking;
        (tracking.stage_width_m > 0.0 && tracking.stage_depth_m > 0.0).then_some(Extent2Df {
            width: tracking.stage_width_m,
            height: tracking.stage_depth_m,
        })
    }

    fn frame_timing(&self, after: Time) -> FrameTiming {
        let since = (after - self.epoch).max(0);
        let vsyncs = (since + self.period - 1) / self.period;
        let missed_frames = std::mem::take(&mut self.state.lock().pending_misses);
        FrameTiming {
            next_vsync: self.epoch + vsyncs * self.period,
            period: self.period,
            missed_frames,
        }
    }

    fn connect(&self) -> Receiver<BackendEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut state = self.state.lock();
        let first = if state.device_lost {
            Some(BackendEvent::Lost)
        } else if state.unavailable {
            None
        } else {
            Some(BackendEvent::Ready)
        };
        if first.map_or(true, |event| tx.send(event).is_ok()) {
            state.subscribers.push(tx);
        }
        rx
    }

    fn session_began(&self) {
        let mut state = self.state.lock();
        state.broadcast(BackendEvent::Visible);
        state.broadcast(BackendEvent::Focused);
    }

    /// The display is ready for the next session as soon as one ends.
    fn session_ended(&self) {
        debug!("session ended");
        let mut state = self.state.lock();
        if !state.device_lost && !state.unavailable {
            state.broadcast(BackendEvent::Ready);
        }
    }

    fn submit(&self, frame: FrameSubmission) -> XrResult<()> {
        let mut state = self.state.lock();
        if state.device_lost {
            return Err(XrError::SessionLost);
        }
        if state.failing_submits > 0 {
            state.failing_submits -= 1;
            warn!("dropping frame for {}: injected compositor fault", frame.display_time);
            return Err(XrError::RuntimeFailure("compositor rejected the frame".into()));
        }
        debug!(
            "composite at {} with {} layers",
            frame.display_time,
            frame.layers.len()
        );
        if state.submissions.len() == SUBMISSION_HISTORY {
            state.submissions.pop_front();
        }
        state.submissions.push_back(frame);
        state.submitted += 1;
        Ok(())
    }
}
