use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info};
use wxr_core::{XrError, XrResult};

use crate::backend::SystemInfo;
use crate::event::{Event, EventQueue};
use crate::session::{Session, PRIMARY_VIEW_CONFIGURATION};
use crate::types::{
    ApiVersion, ApplicationInfo, EnvironmentBlendMode, FormFactor, InstanceCreateInfo,
    ViewConfigurationType, ViewConfigurationView,
};

pub const GLES_EXTENSION_NAME: &str = "XR_KHR_opengl_es_enable";
pub const GLES_EXTENSION_VERSION: u32 = 8;

/// The head-mounted display's system id. There is only ever one.
pub const SYSTEM_ID: u64 = 1;

/// Newest OpenXR API version this runtime implements.
pub const CURRENT_API_VERSION: ApiVersion = ApiVersion::new(1, 0, 34);

/// OpenGL ES versions a session can be created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphicsRequirements {
    pub min_api_version: ApiVersion,
    pub max_api_version: ApiVersion,
}

pub const GLES_REQUIREMENTS: GraphicsRequirements = GraphicsRequirements {
    min_api_version: ApiVersion::new(3, 0, 0),
    max_api_version: ApiVersion::new(3, 2, 0),
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceProperties {
    pub runtime_name: String,
    pub runtime_version: ApiVersion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewConfigurationProperties {
    pub view_configuration_type: ViewConfigurationType,
    pub fov_mutable: bool,
}

/// Extensions advertised by `xrEnumerateInstanceExtensionProperties`.
pub fn supported_extensions() -> Vec<(&'static str, u32)> {
    vec![(GLES_EXTENSION_NAME, GLES_EXTENSION_VERSION)]
}

/// Reject create requests this runtime cannot honour, in the order the
/// application is told about them.
pub fn validate_create_info(info: &InstanceCreateInfo) -> XrResult<&ApplicationInfo> {
    if info.create_flags != 0 {
        return Err(XrError::ValidationFailure(format!(
            "instance create flags must be zero, got {:#x}",
            info.create_flags
        )));
    }
    let app = info
        .application_info
        .as_ref()
        .ok_or_else(|| XrError::ValidationFailure("missing application info".into()))?;
    if !info.enabled_api_layers.is_empty() {
        return Err(XrError::ApiLayerNotPresent);
    }
    let supported = supported_extensions();
    if let Some(unknown) = info
        .enabled_extensions
        .iter()
        .find(|name| !supported.iter().any(|(known, _)| known == name))
    {
        return Err(XrError::ExtensionNotPresent(unknown.clone()));
    }
    if !info.enabled_extensions.iter().any(|name| name == GLES_EXTENSION_NAME) {
        return Err(XrError::InitializationFailed(format!(
            "{} must be enabled",
            GLES_EXTENSION_NAME
        )));
    }
    if app.api_version.major != CURRENT_API_VERSION.major
        || app.api_version.minor > CURRENT_API_VERSION.minor
    {
        return Err(XrError::ApiVersionUnsupported(format!(
            "{}.{}.{}",
            app.api_version.major, app.api_version.minor, app.api_version.patch
        )));
    }
    Ok(app)
}

pub struct Instance {
    handle: u64,
    application: ApplicationInfo,
    extensions: Vec<String>,
    properties: InstanceProperties,
    system: SystemInfo,
    events: Arc<EventQueue>,
    graphics_queried: AtomicBool,
    session: Mutex<Option<(u64, Weak<Session>)>>,
}

impl Instance {
    pub fn new(
        handle: u64,
        application: ApplicationInfo,
        extensions: Vec<String>,
        properties: InstanceProperties,
        system: SystemInfo,
    ) -> Self {
        info!(
            "instance {:#x} created for '{}' (engine '{}')",
            handle, application.application_name, application.engine_name
        );
        Self {
            handle,
            application,
            extensions,
            properties,
            system,
            events: Arc::new(EventQueue::new()),
            graphics_queried: AtomicBool::new(false),
            session: Mutex::new(None),
        }
    }

    pub fn handle(&self) -> u64 {
        self.handle
    }

    pub fn application(&self) -> &ApplicationInfo {
        &self.application
    }

    pub fn enabled_extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn properties(&self) -> &InstanceProperties {
        &self.properties
    }

    pub fn events(&self) -> &Arc<EventQueue> {
        &self.events
    }

    pub fn get_system(&self, form_factor: FormFactor) -> XrResult<u64> {
        match form_factor {
            FormFactor::HeadMountedDisplay => Ok(SYSTEM_ID),
            FormFactor::HandheldDisplay => Err(XrError::FormFactorUnsupported),
        }
    }

    pub fn check_system(&self, system_id: u64) -> XrResult<()> {
        if system_id == SYSTEM_ID {
            Ok(())
        } else {
            Err(XrError::SystemInvalid)
        }
    }

    pub fn system(&self, system_id: u64) -> XrResult<&SystemInfo> {
        self.check_system(system_id)?;
        Ok(&self.system)
    }

    /// Report the OpenGL ES version range and allow session creation.
    pub fn graphics_requirements(&self, system_id: u64) -> XrResult<GraphicsRequirements> {
        self.check_system(system_id)?;
        self.graphics_queried.store(true, Ordering::Release);
        Ok(GLES_REQUIREMENTS)
    }

    pub fn graphics_requirements_queried(&self) -> bool {
        self.graphics_queried.load(Ordering::Acquire)
    }

    pub fn view_configurations(&self, system_id: u64) -> XrResult<Vec<ViewConfigurationType>> {
        self.check_system(system_id)?;
        Ok(vec![PRIMARY_VIEW_CONFIGURATION])
    }

    fn check_view_configuration(
        &self,
        system_id: u64,
        ty: ViewConfigurationType,
    ) -> XrResult<()> {
        self.check_system(system_id)?;
        if ty != PRIMARY_VIEW_CONFIGURATION {
            return Err(XrError::ViewConfigurationTypeUnsupported);
        }
        Ok(())
    }

    pub fn view_configuration_properties(
        &self,
        system_id: u64,
        ty: ViewConfigurationType,
    ) -> XrResult<ViewConfigurationProperties> {
        self.check_view_configuration(system_id, ty)?;
        Ok(ViewConfigurationProperties {
            view_configuration_type: ty,
            fov_mutable: false,
        })
    }

    pub fn view_configuration_views(
        &self,
        system_id: u64,
        ty: ViewConfigurationType,
    ) -> XrResult<Vec<ViewConfigurationView>> {
        self.check_view_configuration(system_id, ty)?;
        let view = ViewConfigurationView {
            recommended_image_rect_width: self.system.recommended_width,
            max_image_rect_width: self.system.max_image_width,
            recommended_image_rect_height: self.system.recommended_height,
            max_image_rect_height: self.system.max_image_height,
            recommended_swapchain_sample_count: 1,
            max_swapchain_sample_count: self.system.max_sample_count,
        };
        Ok(vec![view; ty.view_count()])
    }

    pub fn environment_blend_modes(
        &self,
        system_id: u64,
        ty: ViewConfigurationType,
    ) -> XrResult<Vec<EnvironmentBlendMode>> {
        self.check_view_configuration(system_id, ty)?;
        Ok(self.system.blend_modes.clone())
    }

    /// Claim the instance's single session slot.
    pub fn attach_session(&self, handle: u64, session: &Arc<Session>) -> XrResult<()> {
        let mut slot = self.session.lock();
        if let Some((existing, weak)) = slot.as_ref() {
            if weak.strong_count() > 0 {
                return Err(XrError::LimitReached(format!(
                    "session {:#x} is still live",
                    existing
                )));
            }
        }
        *slot = Some((handle, Arc::downgrade(session)));
        Ok(())
    }

    pub fn has_session(&self) -> bool {
        self.session
            .lock()
            .as_ref()
            .is_some_and(|(_, weak)| weak.strong_count() > 0)
    }

    pub fn detach_session(&self, handle: u64) {
        let mut slot = self.session.lock();
        if slot.as_ref().is_some_and(|(h, _)| *h == handle) {
            *slot = None;
        }
    }

    pub fn session_handle(&self) -> Option<u64> {
        self.session.lock().as_ref().map(|(handle, _)| *handle)
    }

    /// Next queued event. Backend events for the session are applied first
    /// so state changes show up without any other call.
    pub fn poll_event(&self) -> Option<Event> {
        let session = self
            .session
            .lock()
            .as_ref()
            .and_then(|(_, weak)| weak.upgrade());
        if let Some(session) = session {
            session.pump();
        }
        let event = self.events.poll();
        if let Some(event) = &event {
            debug!("instance {:#x}: delivering {:?}", self.handle, event);
        }
        event
    }
}
