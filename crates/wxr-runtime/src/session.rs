//! Session state machine and frame loop.
//!
//! Every entry point first drains the backend event channel so the state the
//! application sees is never older than the last event the display sent.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use wxr_core::config::RuntimeConfig;
use wxr_core::{Status, XrError, XrResult};

use crate::backend::{BackendEvent, FrameSubmission, PresentationBackend, SystemInfo};
use crate::clock::FrameClock;
use crate::event::{Event, EventQueue};
use crate::space::Space;
use crate::swapchain::{StagedPresent, Swapchain};
use crate::sync::{CancelReason, Wake, WakeSignal};
use crate::time;
use crate::types::{
    CompositionLayer, Extent2Df, FrameEndInfo, FrameState, GlesBinding, LocationFlags, Pose,
    ReferenceSpaceType, SessionState, SwapchainDesc, SwapchainSubImage, Time, View,
    ViewConfigurationType,
};

/// Swapchain create flags this runtime understands
/// (`PROTECTED_CONTENT | STATIC_IMAGE`).
const KNOWN_SWAPCHAIN_CREATE_FLAGS: u64 = 0x3;

/// The only view configuration a head-mounted display offers here.
pub const PRIMARY_VIEW_CONFIGURATION: ViewConfigurationType = ViewConfigurationType::PrimaryStereo;

struct SessionInner {
    state: SessionState,
    running: bool,
    exit_requested: bool,
    destroyed: bool,
    view_configuration: Option<ViewConfigurationType>,
    clock: FrameClock,
    /// Produced by `wait_frame`, consumed by `begin_frame`.
    pending_frame: Option<FrameState>,
    /// Begun and not yet ended.
    frame_in_progress: Option<FrameState>,
    swapchains: HashMap<u64, Arc<Swapchain>>,
    spaces: HashMap<u64, Arc<Space>>,
}

pub struct Session {
    handle: u64,
    instance: u64,
    binding: GlesBinding,
    system: SystemInfo,
    config: RuntimeConfig,
    backend: Arc<dyn PresentationBackend>,
    events: Arc<EventQueue>,
    backend_events: Receiver<BackendEvent>,
    wake: WakeSignal,
    inner: Mutex<SessionInner>,
}

/// Handles a destroyed session owned, for unregistration.
#[derive(Debug, Default)]
pub struct DestroyedChildren {
    pub swapchains: Vec<u64>,
    pub spaces: Vec<u64>,
}

impl Session {
    pub fn new(
        handle: u64,
        instance: u64,
        binding: GlesBinding,
        system: SystemInfo,
        config: RuntimeConfig,
        backend: Arc<dyn PresentationBackend>,
        events: Arc<EventQueue>,
    ) -> Self {
        let backend_events = backend.connect();
        let clock = FrameClock::new(config.frame.max_pressure, config.frame.latency_frames);
        events.push(Event::SessionStateChanged {
            session: handle,
            state: SessionState::Idle,
            time: time::now_ns(),
        });
        info!("session {:#x} created on {} backend", handle, backend.name());
        Self {
            handle,
            instance,
            binding,
            system,
            config,
            backend,
            events,
            backend_events,
            wake: WakeSignal::new(),
            inner: Mutex::new(SessionInner {
                state: SessionState::Idle,
                running: false,
                exit_requested: false,
                destroyed: false,
                view_configuration: None,
                clock,
                pending_frame: None,
                frame_in_progress: None,
                swapchains: HashMap::new(),
                spaces: HashMap::new(),
            }),
        }
    }

    pub fn handle(&self) -> u64 {
        self.handle
    }

    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn binding(&self) -> GlesBinding {
        self.binding
    }

    pub fn backend(&self) -> &Arc<dyn PresentationBackend> {
        &self.backend
    }

    pub fn state(&self) -> SessionState {
        let mut inner = self.inner.lock();
        self.pump_locked(&mut inner);
        inner.state
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().running
    }

    pub fn frame_in_progress(&self) -> bool {
        self.inner.lock().frame_in_progress.is_some()
    }

    /// Apply any events the backend has sent since the last call.
    pub fn pump(&self) {
        let mut inner = self.inner.lock();
        self.pump_locked(&mut inner);
    }

    pub fn begin(&self, view_configuration: ViewConfigurationType) -> XrResult<()> {
        let mut inner = self.enter()?;
        if inner.running {
            return Err(XrError::SessionRunning);
        }
        if inner.state != SessionState::Ready {
            return Err(XrError::SessionNotReady);
        }
        if view_configuration != PRIMARY_VIEW_CONFIGURATION {
            return Err(XrError::ViewConfigurationTypeUnsupported);
        }
        inner.running = true;
        inner.view_configuration = Some(view_configuration);
        self.transition(&mut inner, SessionState::Synchronized);
        self.backend.session_began();
        Ok(())
    }

    pub fn end(&self) -> XrResult<()> {
        let mut inner = self.enter()?;
        if !inner.running {
            return Err(XrError::SessionNotRunning);
        }
        if inner.state != SessionState::Stopping {
            return Err(XrError::SessionNotStopping);
        }
        inner.running = false;
        inner.view_configuration = None;
        inner.pending_frame = None;
        inner.frame_in_progress = None;
        self.backend.session_ended();
        self.transition(&mut inner, SessionState::Idle);
        if inner.exit_requested {
            self.transition(&mut inner, SessionState::Exiting);
        }
        Ok(())
    }

    pub fn request_exit(&self) -> XrResult<()> {
        let mut inner = self.enter()?;
        if !inner.running {
            return Err(XrError::SessionNotRunning);
        }
        info!("session {:#x}: exit requested", self.handle);
        inner.exit_requested = true;
        self.demote_to_stopping(&mut inner);
        Ok(())
    }

    /// Block until the next frame boundary and predict when that frame will
    /// be displayed.
    pub fn wait_frame(&self) -> XrResult<FrameState> {
        let (plan, generation) = {
            let mut inner = self.enter()?;
            if !inner.running {
                return Err(XrError::SessionNotRunning);
            }
            let now = time::now_ns();
            let timing = self.backend.frame_timing(now);
            let plan = inner.clock.advance(now, timing);
            if inner.state == SessionState::Stopping {
                let frame = FrameState {
                    predicted_display_time: plan.predicted_display_time,
                    predicted_display_period: plan.period,
                    should_render: false,
                };
                inner.pending_frame = Some(frame);
                return Ok(frame);
            }
            (plan, self.wake.generation())
        };

        match self
            .wake
            .sleep_until(time::to_instant(plan.boundary), generation)
        {
            Wake::Elapsed | Wake::Interrupted => {}
            Wake::Cancelled(CancelReason::Destroyed) => {
                return Err(XrError::HandleInvalid("session destroyed during xrWaitFrame".into()))
            }
            Wake::Cancelled(CancelReason::Lost) => return Err(XrError::SessionLost),
        }

        let mut inner = self.enter()?;
        if !inner.running {
            return Err(XrError::SessionNotRunning);
        }
        let frame = FrameState {
            predicted_display_time: plan.predicted_display_time,
            predicted_display_period: plan.period,
            should_render: inner.state.is_visible(),
        };
        inner.pending_frame = Some(frame);
        debug!(
            "wait_frame: predicted {} period {} render {}",
            frame.predicted_display_time, frame.predicted_display_period, frame.should_render
        );
        Ok(frame)
    }

    pub fn begin_frame(&self) -> XrResult<()> {
        let mut inner = self.enter()?;
        if !inner.running {
            return Err(XrError::CallOrderInvalid("session is not running".into()));
        }
        if inner.frame_in_progress.is_some() {
            return Err(XrError::CallOrderInvalid("a frame is already in progress".into()));
        }
        let Some(frame) = inner.pending_frame.take() else {
            return Err(XrError::CallOrderInvalid(
                "xrBeginFrame without a preceding xrWaitFrame".into(),
            ));
        };
        inner.frame_in_progress = Some(frame);
        Ok(())
    }

    /// Fail with `CallOrderInvalid` unless a frame has been begun. Lets the
    /// ABI layer reject an out-of-order EndFrame before reading its layers.
    pub fn check_frame_in_progress(&self) -> XrResult<()> {
        let inner = self.enter()?;
        frame_begun(&inner).map(|_| ())
    }

    pub fn end_frame(&self, info: &FrameEndInfo) -> XrResult<()> {
        let mut inner = self.enter()?;
        let frame = frame_begun(&inner)?;
        self.validate_frame(&inner, &frame, info)?;

        let referenced: Vec<(u64, Arc<Swapchain>)> = referenced_swapchains(&info.layers)
            .into_iter()
            .filter_map(|handle| {
                let swapchain = inner.swapchains.get(&handle)?;
                Some((handle, Arc::clone(swapchain)))
            })
            .collect();
        // Rings stay locked until the compositor accepts the frame. Nothing is
        // committed if it does not.
        let staged: Vec<(u64, StagedPresent<'_>)> = referenced
            .iter()
            .filter_map(|(handle, sc)| sc.stage_present().map(|staged| (*handle, staged)))
            .collect();
        self.backend.submit(FrameSubmission {
            display_time: info.display_time,
            blend_mode: info.environment_blend_mode,
            layers: info.layers.clone(),
            images: staged
                .iter()
                .map(|(handle, staged)| (*handle, staged.index()))
                .collect(),
        })?;

        for (_, staged) in staged {
            staged.commit();
        }
        inner.frame_in_progress = None;
        Ok(())
    }

    fn validate_frame(
        &self,
        inner: &SessionInner,
        frame: &FrameState,
        info: &FrameEndInfo,
    ) -> XrResult<()> {
        if info.display_time <= 0 || info.display_time > frame.predicted_display_time {
            return Err(XrError::TimeInvalid(format!(
                "display time {} outside (0, {}]",
                info.display_time, frame.predicted_display_time
            )));
        }
        if !self.system.blend_modes.contains(&info.environment_blend_mode) {
            return Err(XrError::EnvironmentBlendModeUnsupported);
        }
        let max = self.system.max_layer_count;
        if info.layers.len() > max as usize {
            return Err(XrError::LayerLimitExceeded {
                count: info.layers.len() as u32,
                max,
            });
        }
        let view_count = inner
            .view_configuration
            .unwrap_or(PRIMARY_VIEW_CONFIGURATION)
            .view_count();

        for (i, layer) in info.layers.iter().enumerate() {
            if !inner.spaces.contains_key(&layer.space()) {
                return Err(XrError::LayerInvalid(format!(
                    "layer {} space {:#x} does not belong to this session",
                    i,
                    layer.space()
                )));
            }
            match layer {
                CompositionLayer::Projection { views, .. } if views.len() != view_count => {
                    return Err(XrError::ValidationFailure(format!(
                        "projection layer {} has {} views, expected {}",
                        i,
                        views.len(),
                        view_count
                    )));
                }
                CompositionLayer::Quad { pose, .. } if !pose.is_valid() => {
                    return Err(XrError::PoseInvalid);
                }
                _ => {}
            }
            for sub_image in layer.sub_images() {
                let swapchain = inner.swapchains.get(&sub_image.swapchain).ok_or_else(|| {
                    XrError::LayerInvalid(format!(
                        "layer {} swapchain {:#x} does not belong to this session",
                        i, sub_image.swapchain
                    ))
                })?;
                if !swapchain.has_released() {
                    return Err(XrError::LayerInvalid(format!(
                        "layer {} swapchain {:#x} has no released image",
                        i, sub_image.swapchain
                    )));
                }
                check_sub_image(swapchain.desc(), &sub_image)?;
            }
        }
        Ok(())
    }

    /// Per-eye views at `time`, relative to `space`.
    pub fn locate_views(
        &self,
        view_configuration: ViewConfigurationType,
        time: Time,
        space: &Space,
    ) -> XrResult<(LocationFlags, Vec<View>)> {
        drop(self.enter()?);
        if view_configuration != PRIMARY_VIEW_CONFIGURATION {
            return Err(XrError::ViewConfigurationTypeUnsupported);
        }
        if time <= 0 {
            return Err(XrError::TimeInvalid(format!("locate time {}", time)));
        }
        if space.session() != self.handle {
            return Err(XrError::ValidationFailure(
                "space belongs to another session".into(),
            ));
        }
        let untracked = || {
            let views = vec![View::default(); view_configuration.view_count()];
            (LocationFlags::NONE, views)
        };
        let Some(origin) = space.world_pose(self.backend.as_ref(), time) else {
            return Ok(untracked());
        };
        let Some(eyes) = self.backend.eye_views(time) else {
            return Ok(untracked());
        };
        let head = self
            .backend
            .locate_reference(ReferenceSpaceType::View, time)
            .map_or(LocationFlags::NONE, |head| head.flags);
        let flags = head.relative_to(origin.flags);
        if !flags.is_valid() {
            return Ok(untracked());
        }
        let to_base = origin.pose.inverse();
        let views = eyes
            .iter()
            .map(|eye| View {
                pose: to_base.compose(&eye.pose),
                fov: eye.fov,
            })
            .collect();
        Ok((flags, views))
    }

    /// Validate a swapchain description against the system and allocate it.
    pub fn create_swapchain(&self, desc: SwapchainDesc) -> XrResult<Swapchain> {
        drop(self.enter()?);
        if desc.create_flags & !KNOWN_SWAPCHAIN_CREATE_FLAGS != 0 {
            return Err(XrError::ValidationFailure(format!(
                "unknown swapchain create flags {:#x}",
                desc.create_flags
            )));
        }
        if !self.backend.swapchain_formats().contains(&desc.format) {
            return Err(XrError::SwapchainFormatUnsupported(desc.format));
        }
        if desc.width == 0
            || desc.height == 0
            || desc.width > self.system.max_image_width
            || desc.height > self.system.max_image_height
        {
            return Err(XrError::ValidationFailure(format!(
                "swapchain size {}x{} outside 1..={}x{}",
                desc.width, desc.height, self.system.max_image_width, self.system.max_image_height
            )));
        }
        if desc.sample_count == 0 || desc.sample_count > self.system.max_sample_count {
            return Err(XrError::ValidationFailure(format!(
                "sample count {} unsupported",
                desc.sample_count
            )));
        }
        if desc.face_count != 1 && desc.face_count != 6 {
            return Err(XrError::ValidationFailure(format!(
                "face count must be 1 or 6, got {}",
                desc.face_count
            )));
        }
        if desc.array_size == 0 || desc.mip_count == 0 {
            return Err(XrError::ValidationFailure(
                "array size and mip count must be non-zero".into(),
            ));
        }
        Swapchain::new(
            self.handle,
            desc,
            &self.config.swapchain,
            Arc::clone(&self.backend),
        )
    }

    /// Take ownership of a registered swapchain. Fails if the session was
    /// destroyed in the meantime.
    pub fn adopt_swapchain(&self, handle: u64, swapchain: Arc<Swapchain>) -> XrResult<()> {
        let mut inner = self.inner.lock();
        if inner.destroyed {
            return Err(XrError::HandleInvalid("session destroyed".into()));
        }
        inner.swapchains.insert(handle, swapchain);
        Ok(())
    }

    pub fn forget_swapchain(&self, handle: u64) -> Option<Arc<Swapchain>> {
        self.inner.lock().swapchains.remove(&handle)
    }

    pub fn create_reference_space(
        &self,
        ty: ReferenceSpaceType,
        pose_in_reference: Pose,
    ) -> XrResult<Space> {
        drop(self.enter()?);
        Space::reference(self.handle, ty, pose_in_reference)
    }

    pub fn adopt_space(&self, handle: u64, space: Arc<Space>) -> XrResult<()> {
        let mut inner = self.inner.lock();
        if inner.destroyed {
            return Err(XrError::HandleInvalid("session destroyed".into()));
        }
        inner.spaces.insert(handle, space);
        Ok(())
    }

    pub fn forget_space(&self, handle: u64) -> Option<Arc<Space>> {
        self.inner.lock().spaces.remove(&handle)
    }

    pub fn reference_space_types(&self) -> Vec<ReferenceSpaceType> {
        vec![
            ReferenceSpaceType::View,
            ReferenceSpaceType::Local,
            ReferenceSpaceType::Stage,
        ]
    }

    /// Stage bounds for STAGE; every other type has none.
    pub fn reference_space_bounds(&self, ty: ReferenceSpaceType) -> XrResult<(Status, Extent2Df)> {
        drop(self.enter()?);
        match (ty, self.backend.stage_bounds()) {
            (ReferenceSpaceType::Stage, Some(bounds)) => Ok((Status::Success, bounds)),
            _ => Ok((Status::SpaceBoundsUnavailable, Extent2Df::default())),
        }
    }

    /// Force-stop the session and release everything it owns. Returns the
    /// child handles the caller must unregister.
    pub fn destroy(&self) -> DestroyedChildren {
        let mut inner = self.inner.lock();
        if inner.destroyed {
            return DestroyedChildren::default();
        }
        inner.destroyed = true;
        if inner.running {
            info!("session {:#x} destroyed while running, force-stopping", self.handle);
            inner.running = false;
            self.backend.session_ended();
        }
        inner.pending_frame = None;
        inner.frame_in_progress = None;
        self.wake.cancel(CancelReason::Destroyed);
        for swapchain in inner.swapchains.values() {
            swapchain.cancel(CancelReason::Destroyed);
        }
        let children = DestroyedChildren {
            swapchains: inner.swapchains.drain().map(|(handle, _)| handle).collect(),
            spaces: inner.spaces.drain().map(|(handle, _)| handle).collect(),
        };
        self.events.forget_session(self.handle);
        children
    }

    /// Lock the session for an entry point: drain backend events and reject
    /// destroyed or lost sessions.
    fn enter(&self) -> XrResult<parking_lot::MutexGuard<'_, SessionInner>> {
        let mut inner = self.inner.lock();
        if inner.destroyed {
            return Err(XrError::HandleInvalid("session destroyed".into()));
        }
        self.pump_locked(&mut inner);
        if inner.state == SessionState::LossPending {
            return Err(XrError::SessionLost);
        }
        Ok(inner)
    }

    fn pump_locked(&self, inner: &mut SessionInner) {
        if inner.destroyed {
            return;
        }
        while let Ok(event) = self.backend_events.try_recv() {
            self.apply(inner, event);
        }
    }

    fn apply(&self, inner: &mut SessionInner, event: BackendEvent) {
        debug!("session {:#x}: backend event {:?}", self.handle, event);
        use SessionState::*;
        match event {
            BackendEvent::Ready => {
                if inner.state == Idle && !inner.running && !inner.exit_requested {
                    self.transition(inner, Ready);
                }
            }
            BackendEvent::Visible if inner.running && inner.state == Synchronized => {
                self.transition(inner, Visible);
            }
            BackendEvent::Focused if inner.running => {
                if inner.state == Synchronized {
                    self.transition(inner, Visible);
                }
                if inner.state == Visible {
                    self.transition(inner, Focused);
                }
            }
            BackendEvent::Unfocused if inner.state == Focused => {
                self.transition(inner, Visible);
            }
            BackendEvent::Hidden => {
                if inner.state == Focused {
                    self.transition(inner, Visible);
                }
                if inner.state == Visible {
                    self.transition(inner, Synchronized);
                }
            }
            BackendEvent::StopRequested if inner.running => {
                self.demote_to_stopping(inner);
            }
            BackendEvent::Lost => self.mark_lost(inner),
            _ => {}
        }
    }

    fn demote_to_stopping(&self, inner: &mut SessionInner) {
        use SessionState::*;
        if inner.state == Focused {
            self.transition(inner, Visible);
        }
        if inner.state == Visible {
            self.transition(inner, Synchronized);
        }
        if inner.state == Synchronized {
            self.transition(inner, Stopping);
        }
        self.wake.interrupt();
    }

    fn mark_lost(&self, inner: &mut SessionInner) {
        if inner.state == SessionState::LossPending {
            return;
        }
        warn!("session {:#x} lost", self.handle);
        self.transition(inner, SessionState::LossPending);
        inner.pending_frame = None;
        inner.frame_in_progress = None;
        self.wake.cancel(CancelReason::Lost);
        for swapchain in inner.swapchains.values() {
            swapchain.cancel(CancelReason::Lost);
        }
    }

    fn transition(&self, inner: &mut SessionInner, state: SessionState) {
        if inner.state == state {
            return;
        }
        info!("session {:#x}: {:?} -> {:?}", self.handle, inner.state, state);
        inner.state = state;
        self.events.push(Event::SessionStateChanged {
            session: self.handle,
            state,
            time: time::now_ns(),
        });
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn frame_begun(inner: &SessionInner) -> XrResult<FrameState> {
    inner.frame_in_progress.ok_or_else(|| {
        XrError::CallOrderInvalid("xrEndFrame without a preceding xrBeginFrame".into())
    })
}

fn referenced_swapchains(layers: &[CompositionLayer]) -> Vec<u64> {
    let mut handles: Vec<u64> = layers
        .iter()
        .flat_map(|layer| layer.sub_images())
        .map(|sub_image| sub_image.swapchain)
        .collect();
    handles.sort_unstable();
    handles.dedup();
    handles
}

fn check_sub_image(desc: &SwapchainDesc, sub_image: &SwapchainSubImage) -> XrResult<()> {
    if sub_image.image_array_index >= desc.array_size {
        return Err(XrError::ValidationFailure(format!(
            "image array index {} >= array size {}",
            sub_image.image_array_index, desc.array_size
        )));
    }
    let rect = sub_image.image_rect;
    let inside = rect.offset_x >= 0
        && rect.offset_y >= 0
        && rect.width > 0
        && rect.height > 0
        && rect.offset_x as i64 + rect.width as i64 <= desc.width as i64
        && rect.offset_y as i64 + rect.height as i64 <= desc.height as i64;
    if !inside {
        return Err(XrError::SwapchainRectInvalid(format!(
            "{}x{}+{}+{} outside {}x{}",
            rect.width, rect.height, rect.offset_x, rect.offset_y, desc.width, desc.height
        )));
    }
    Ok(())
}
