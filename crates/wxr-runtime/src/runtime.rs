//! Process-wide runtime state: the handle tables and the single instance slot.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};
use wxr_core::config::RuntimeConfig;
use wxr_core::{HandleTable, ObjectKind, XrError, XrResult};

use crate::backend::PresentationBackend;
use crate::event::Event;
use crate::headless::HeadlessBackend;
use crate::instance::{validate_create_info, Instance, InstanceProperties};
use crate::session::Session;
use crate::space::{self, Space};
use crate::swapchain::Swapchain;
use crate::sync::CancelReason;
use crate::types::{
    ApiVersion, GlesBinding, InstanceCreateInfo, LocationFlags, Pose, ReferenceSpaceType,
    SpaceLocation, SwapchainDesc, Time, View, ViewConfigurationType,
};

/// Live object counts, for diagnostics and leak checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectCounts {
    pub instances: usize,
    pub sessions: usize,
    pub spaces: usize,
    pub swapchains: usize,
}

pub struct Runtime {
    config: RuntimeConfig,
    backend: Arc<dyn PresentationBackend>,
    instances: HandleTable<Instance>,
    sessions: HandleTable<Session>,
    spaces: HandleTable<Space>,
    swapchains: HandleTable<Swapchain>,
    /// Serialises instance creation against the one-instance limit.
    instance_slot: Mutex<Option<u64>>,
}

impl Runtime {
    pub fn new(config: RuntimeConfig, backend: Arc<dyn PresentationBackend>) -> Self {
        info!(
            "runtime '{}' using {} backend",
            config.runtime.name,
            backend.name()
        );
        Self {
            config,
            backend,
            instances: HandleTable::new(ObjectKind::Instance),
            sessions: HandleTable::new(ObjectKind::Session),
            spaces: HandleTable::new(ObjectKind::Space),
            swapchains: HandleTable::new(ObjectKind::Swapchain),
            instance_slot: Mutex::new(None),
        }
    }

    /// Runtime over a [`HeadlessBackend`] built from the same configuration.
    pub fn headless(config: RuntimeConfig) -> (Self, Arc<HeadlessBackend>) {
        let backend = Arc::new(HeadlessBackend::new(config.clone()));
        let runtime = Self::new(config, Arc::clone(&backend) as Arc<dyn PresentationBackend>);
        (runtime, backend)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn PresentationBackend> {
        &self.backend
    }

    pub fn object_counts(&self) -> ObjectCounts {
        ObjectCounts {
            instances: self.instances.len(),
            sessions: self.sessions.len(),
            spaces: self.spaces.len(),
            swapchains: self.swapchains.len(),
        }
    }

    // ── Instance ────────────────────────────────────────────────

    pub fn create_instance(&self, info: &InstanceCreateInfo) -> XrResult<u64> {
        let app = validate_create_info(info)?.clone();
        let mut slot = self.instance_slot.lock();
        if let Some(existing) = *slot {
            if self.instances.contains(existing) {
                return Err(XrError::LimitReached(format!(
                    "instance {:#x} is still live",
                    existing
                )));
            }
        }
        let properties = InstanceProperties {
            runtime_name: self.config.runtime.name.clone(),
            runtime_version: runtime_version(),
        };
        let system = self.backend.system_info();
        let extensions = info.enabled_extensions.clone();
        let handle = self.instances.register_with(|handle| {
            Arc::new(Instance::new(handle, app, extensions, properties, system))
        });
        *slot = Some(handle);
        Ok(handle)
    }

    pub fn instance(&self, handle: u64) -> XrResult<Arc<Instance>> {
        self.instances.resolve(handle)
    }

    /// Destroy an instance and everything created from it.
    pub fn destroy_instance(&self, handle: u64) -> XrResult<()> {
        let instance = self.instances.unregister(handle)?;
        if let Some(session) = instance.session_handle() {
            if let Err(e) = self.destroy_session(session) {
                warn!("instance {:#x}: session cleanup: {}", handle, e);
            }
        }
        let mut slot = self.instance_slot.lock();
        if *slot == Some(handle) {
            *slot = None;
        }
        info!("instance {:#x} destroyed", handle);
        Ok(())
    }

    pub fn poll_event(&self, instance: u64) -> XrResult<Option<Event>> {
        Ok(self.instance(instance)?.poll_event())
    }

    // ── Session ─────────────────────────────────────────────────

    pub fn create_session(
        &self,
        instance: u64,
        system_id: u64,
        binding: Option<GlesBinding>,
    ) -> XrResult<u64> {
        let owner = self.instance(instance)?;
        let system = owner.system(system_id)?.clone();
        if !owner.graphics_requirements_queried() {
            return Err(XrError::GraphicsRequirementsCallMissing);
        }
        let binding = binding.ok_or_else(|| {
            XrError::GraphicsDeviceInvalid("no OpenGL ES graphics binding in the next chain".into())
        })?;
        if binding.display == 0 || binding.context == 0 {
            return Err(XrError::GraphicsDeviceInvalid(
                "EGL display and context must be non-null".into(),
            ));
        }
        if owner.has_session() {
            return Err(XrError::LimitReached(
                "only one session per instance is supported".into(),
            ));
        }

        let mut created = None;
        let handle = self.sessions.register_with(|handle| {
            let session = Arc::new(Session::new(
                handle,
                instance,
                binding,
                system,
                self.config.clone(),
                Arc::clone(&self.backend),
                Arc::clone(owner.events()),
            ));
            created = Some(Arc::clone(&session));
            session
        });
        let Some(session) = created else {
            return Err(XrError::RuntimeFailure("session registration failed".into()));
        };
        if let Err(e) = owner.attach_session(handle, &session) {
            // Lost a race with another create on the same instance.
            let _ = self.sessions.unregister(handle);
            session.destroy();
            return Err(e);
        }
        Ok(handle)
    }

    pub fn session(&self, handle: u64) -> XrResult<Arc<Session>> {
        self.sessions.resolve(handle)
    }

    /// Force-stop a session and invalidate its spaces and swapchains.
    pub fn destroy_session(&self, handle: u64) -> XrResult<()> {
        let session = self.sessions.unregister(handle)?;
        let children = session.destroy();
        for swapchain in children.swapchains {
            let _ = self.swapchains.unregister(swapchain);
        }
        for space in children.spaces {
            let _ = self.spaces.unregister(space);
        }
        if let Ok(owner) = self.instance(session.instance()) {
            owner.detach_session(handle);
        }
        info!("session {:#x} destroyed", handle);
        Ok(())
    }

    // ── Space ───────────────────────────────────────────────────

    pub fn create_reference_space(
        &self,
        session: u64,
        ty: ReferenceSpaceType,
        pose_in_reference: Pose,
    ) -> XrResult<u64> {
        let owner = self.session(session)?;
        let space = Arc::new(owner.create_reference_space(ty, pose_in_reference)?);
        let handle = self.spaces.register_arc(Arc::clone(&space));
        if let Err(e) = owner.adopt_space(handle, space) {
            let _ = self.spaces.unregister(handle);
            return Err(e);
        }
        Ok(handle)
    }

    pub fn space(&self, handle: u64) -> XrResult<Arc<Space>> {
        self.spaces.resolve(handle)
    }

    pub fn destroy_space(&self, handle: u64) -> XrResult<()> {
        let space = self.spaces.unregister(handle)?;
        if let Ok(owner) = self.session(space.session()) {
            owner.forget_space(handle);
        }
        Ok(())
    }

    pub fn locate_space(&self, space: u64, base: u64, time: Time) -> XrResult<SpaceLocation> {
        let space = self.space(space)?;
        let base = self.space(base)?;
        space::locate(&space, &base, time, &self.backend)
    }

    pub fn locate_views(
        &self,
        session: u64,
        view_configuration: ViewConfigurationType,
        time: Time,
        space: u64,
    ) -> XrResult<(LocationFlags, Vec<View>)> {
        let owner = self.session(session)?;
        let space = self.space(space)?;
        owner.locate_views(view_configuration, time, &space)
    }

    // ── Swapchain ───────────────────────────────────────────────

    pub fn create_swapchain(&self, session: u64, desc: SwapchainDesc) -> XrResult<u64> {
        let owner = self.session(session)?;
        let swapchain = Arc::new(owner.create_swapchain(desc)?);
        let handle = self.swapchains.register_arc(Arc::clone(&swapchain));
        if let Err(e) = owner.adopt_swapchain(handle, swapchain) {
            let _ = self.swapchains.unregister(handle);
            return Err(e);
        }
        Ok(handle)
    }

    pub fn swapchain(&self, handle: u64) -> XrResult<Arc<Swapchain>> {
        self.swapchains.resolve(handle)
    }

    pub fn destroy_swapchain(&self, handle: u64) -> XrResult<()> {
        let swapchain = self.swapchains.unregister(handle)?;
        if let Ok(owner) = self.session(swapchain.session()) {
            owner.forget_swapchain(handle);
        }
        swapchain.cancel(CancelReason::Destroyed);
        Ok(())
    }
}

/// This crate's version in OpenXR's version encoding.
pub fn runtime_version() -> ApiVersion {
    let part = |s: &str| s.parse::<u32>().unwrap_or(0);
    ApiVersion::new(
        part(env!("CARGO_PKG_VERSION_MAJOR")) as u16,
        part(env!("CARGO_PKG_VERSION_MINOR")) as u16,
        part(env!("CARGO_PKG_VERSION_PATCH")),
    )
}
