//! WXR OpenXR runtime library
//!
//! This cdylib is what the OpenXR loader opens when the wxr runtime manifest is
//! active. The loader negotiates through `xrNegotiateLoaderRuntimeInterface`
//! and resolves every other entry point through `xrGetInstanceProcAddr`.

extern crate openxr_sys as xr;

use std::ffi::{c_char, CStr};
use std::sync::{Arc, OnceLock};

use tracing::{debug, info, warn};
use wxr_core::config::{default_config_path, RuntimeConfig};
use wxr_core::error::ConfigError;
use wxr_core::{Status, XrError};
use wxr_runtime::instance::CURRENT_API_VERSION;
use wxr_runtime::{HeadlessBackend, Runtime};

use crate::result::guard;
use crate::util::version_to_xr;

pub mod frame;
pub mod gles;
pub mod instance;
pub mod result;
pub mod session;
pub mod space;
pub mod stubs;
pub mod swapchain;
pub mod system;
pub mod util;

// ── Runtime singleton ───────────────────────────────────────

struct Global {
    runtime: Runtime,
    backend: Arc<HeadlessBackend>,
}

static GLOBAL: OnceLock<Global> = OnceLock::new();

fn global() -> &'static Global {
    GLOBAL.get_or_init(|| {
        let path = default_config_path();
        let loaded = RuntimeConfig::load(&path);
        let level = loaded
            .as_ref()
            .ok()
            .and_then(|config| config.runtime.log_level.as_deref());
        wxr_common::try_init_logging(level.unwrap_or("warn"));
        let config = match loaded {
            Ok(config) => config,
            Err(ConfigError::Io(_)) => RuntimeConfig::default(),
            Err(e) => {
                warn!("ignoring {}: {}", path.display(), e);
                RuntimeConfig::default()
            }
        };
        info!("wxr runtime loaded (config {})", path.display());
        let (runtime, backend) = Runtime::headless(config);
        Global { runtime, backend }
    })
}

/// The process-wide runtime behind every exported entry point.
pub fn runtime() -> &'static Runtime {
    &global().runtime
}

/// The backend the exported entry points present to. Exposed for fault
/// injection in tests and the simulator.
pub fn headless_backend() -> &'static Arc<HeadlessBackend> {
    &global().backend
}

// ── Loader negotiation ──────────────────────────────────────

pub const LOADER_INTERFACE_STRUCT_LOADER_INFO: i32 = 1;
pub const LOADER_INTERFACE_STRUCT_RUNTIME_REQUEST: i32 = 3;
pub const LOADER_INFO_STRUCT_VERSION: u32 = 1;
pub const RUNTIME_INFO_STRUCT_VERSION: u32 = 1;
pub const CURRENT_LOADER_RUNTIME_VERSION: u32 = 1;

/// `XrNegotiateLoaderInfo`
#[repr(C)]
pub struct NegotiateLoaderInfo {
    pub struct_type: i32,
    pub struct_version: u32,
    pub struct_size: usize,
    pub min_interface_version: u32,
    pub max_interface_version: u32,
    pub min_api_version: xr::Version,
    pub max_api_version: xr::Version,
}

/// `XrNegotiateRuntimeRequest`
#[repr(C)]
pub struct NegotiateRuntimeRequest {
    pub struct_type: i32,
    pub struct_version: u32,
    pub struct_size: usize,
    pub runtime_interface_version: u32,
    pub runtime_api_version: xr::Version,
    pub get_instance_proc_addr: Option<xr::pfn::GetInstanceProcAddr>,
}

/// Negotiate the loader/runtime interface version with the OpenXR loader.
#[no_mangle]
pub unsafe extern "system" fn xrNegotiateLoaderRuntimeInterface(
    loader_info: *const NegotiateLoaderInfo,
    runtime_request: *mut NegotiateRuntimeRequest,
) -> xr::Result {
    // SAFETY: the loader passes null or valid structures.
    let (Some(info), Some(request)) = (unsafe { loader_info.as_ref() }, unsafe {
        runtime_request.as_mut()
    }) else {
        return xr::Result::ERROR_INITIALIZATION_FAILED;
    };

    if info.struct_type != LOADER_INTERFACE_STRUCT_LOADER_INFO
        || info.struct_version != LOADER_INFO_STRUCT_VERSION
        || info.struct_size != std::mem::size_of::<NegotiateLoaderInfo>()
        || request.struct_type != LOADER_INTERFACE_STRUCT_RUNTIME_REQUEST
        || request.struct_version != RUNTIME_INFO_STRUCT_VERSION
        || request.struct_size != std::mem::size_of::<NegotiateRuntimeRequest>()
    {
        return xr::Result::ERROR_INITIALIZATION_FAILED;
    }

    let interface = CURRENT_LOADER_RUNTIME_VERSION;
    if info.min_interface_version > interface || info.max_interface_version < interface {
        return xr::Result::ERROR_INITIALIZATION_FAILED;
    }
    // Any 1.0.x loader is acceptable.
    let ours = version_to_xr(CURRENT_API_VERSION);
    let api_major_minor = |v: xr::Version| (v.major(), v.minor());
    if api_major_minor(info.min_api_version) > api_major_minor(ours)
        || api_major_minor(info.max_api_version) < api_major_minor(ours)
    {
        return xr::Result::ERROR_INITIALIZATION_FAILED;
    }

    request.runtime_interface_version = interface;
    request.runtime_api_version = ours;
    request.get_instance_proc_addr = Some(xrGetInstanceProcAddr);
    debug!("negotiated loader interface {}", interface);
    xr::Result::SUCCESS
}

// ── xrGetInstanceProcAddr ───────────────────────────────────

macro_rules! entry {
    ($f:path) => {
        // SAFETY: the caller casts the pointer back to the entry point's real type.
        Some(unsafe { std::mem::transmute::<*const (), xr::pfn::VoidFunction>($f as *const ()) })
    };
}

/// Entry points that resolve without an instance.
fn global_function(name: &str) -> Option<xr::pfn::VoidFunction> {
    match name {
        "xrEnumerateApiLayerProperties" => entry!(instance::xrEnumerateApiLayerProperties),
        "xrEnumerateInstanceExtensionProperties" => {
            entry!(instance::xrEnumerateInstanceExtensionProperties)
        }
        "xrCreateInstance" => entry!(instance::xrCreateInstance),
        _ => None,
    }
}

fn instance_function(name: &str) -> Option<xr::pfn::VoidFunction> {
    if let Some(f) = global_function(name) {
        return Some(f);
    }
    match name {
        // ── Instance ────────────────────────────────────────
        "xrGetInstanceProcAddr" => entry!(xrGetInstanceProcAddr),
        "xrDestroyInstance" => entry!(instance::xrDestroyInstance),
        "xrGetInstanceProperties" => entry!(instance::xrGetInstanceProperties),
        "xrPollEvent" => entry!(instance::xrPollEvent),
        "xrResultToString" => entry!(instance::xrResultToString),
        "xrStructureTypeToString" => entry!(instance::xrStructureTypeToString),

        // ── System ──────────────────────────────────────────
        "xrGetSystem" => entry!(system::xrGetSystem),
        "xrGetSystemProperties" => entry!(system::xrGetSystemProperties),
        "xrEnumerateEnvironmentBlendModes" => entry!(system::xrEnumerateEnvironmentBlendModes),
        "xrEnumerateViewConfigurations" => entry!(system::xrEnumerateViewConfigurations),
        "xrGetViewConfigurationProperties" => entry!(system::xrGetViewConfigurationProperties),
        "xrEnumerateViewConfigurationViews" => entry!(system::xrEnumerateViewConfigurationViews),
        "xrGetOpenGLESGraphicsRequirementsKHR" => {
            entry!(system::xrGetOpenGLESGraphicsRequirementsKHR)
        }

        // ── Session ─────────────────────────────────────────
        "xrCreateSession" => entry!(session::xrCreateSession),
        "xrDestroySession" => entry!(session::xrDestroySession),
        "xrBeginSession" => entry!(session::xrBeginSession),
        "xrEndSession" => entry!(session::xrEndSession),
        "xrRequestExitSession" => entry!(session::xrRequestExitSession),

        // ── Space ───────────────────────────────────────────
        "xrEnumerateReferenceSpaces" => entry!(space::xrEnumerateReferenceSpaces),
        "xrCreateReferenceSpace" => entry!(space::xrCreateReferenceSpace),
        "xrGetReferenceSpaceBoundsRect" => entry!(space::xrGetReferenceSpaceBoundsRect),
        "xrCreateActionSpace" => entry!(stubs::xrCreateActionSpace),
        "xrLocateSpace" => entry!(space::xrLocateSpace),
        "xrDestroySpace" => entry!(space::xrDestroySpace),

        // ── Swapchain ───────────────────────────────────────
        "xrEnumerateSwapchainFormats" => entry!(swapchain::xrEnumerateSwapchainFormats),
        "xrCreateSwapchain" => entry!(swapchain::xrCreateSwapchain),
        "xrDestroySwapchain" => entry!(swapchain::xrDestroySwapchain),
        "xrEnumerateSwapchainImages" => entry!(swapchain::xrEnumerateSwapchainImages),
        "xrAcquireSwapchainImage" => entry!(swapchain::xrAcquireSwapchainImage),
        "xrWaitSwapchainImage" => entry!(swapchain::xrWaitSwapchainImage),
        "xrReleaseSwapchainImage" => entry!(swapchain::xrReleaseSwapchainImage),

        // ── Frame ───────────────────────────────────────────
        "xrWaitFrame" => entry!(frame::xrWaitFrame),
        "xrBeginFrame" => entry!(frame::xrBeginFrame),
        "xrEndFrame" => entry!(frame::xrEndFrame),
        "xrLocateViews" => entry!(frame::xrLocateViews),

        // ── Paths, actions, haptics (unsupported) ───────────
        "xrStringToPath" => entry!(stubs::xrStringToPath),
        "xrPathToString" => entry!(stubs::xrPathToString),
        "xrCreateActionSet" => entry!(stubs::xrCreateActionSet),
        "xrDestroyActionSet" => entry!(stubs::xrDestroyActionSet),
        "xrCreateAction" => entry!(stubs::xrCreateAction),
        "xrDestroyAction" => entry!(stubs::xrDestroyAction),
        "xrSuggestInteractionProfileBindings" => {
            entry!(stubs::xrSuggestInteractionProfileBindings)
        }
        "xrAttachSessionActionSets" => entry!(stubs::xrAttachSessionActionSets),
        "xrGetCurrentInteractionProfile" => entry!(stubs::xrGetCurrentInteractionProfile),
        "xrGetActionStateBoolean" => entry!(stubs::xrGetActionStateBoolean),
        "xrGetActionStateFloat" => entry!(stubs::xrGetActionStateFloat),
        "xrGetActionStateVector2f" => entry!(stubs::xrGetActionStateVector2f),
        "xrGetActionStatePose" => entry!(stubs::xrGetActionStatePose),
        "xrSyncActions" => entry!(stubs::xrSyncActions),
        "xrEnumerateBoundSourcesForAction" => entry!(stubs::xrEnumerateBoundSourcesForAction),
        "xrGetInputSourceLocalizedName" => entry!(stubs::xrGetInputSourceLocalizedName),
        "xrApplyHapticFeedback" => entry!(stubs::xrApplyHapticFeedback),
        "xrStopHapticFeedback" => entry!(stubs::xrStopHapticFeedback),

        _ => None,
    }
}

/// Resolve an OpenXR function by name.
///
/// With a null instance only the functions usable before `xrCreateInstance`
/// resolve. Unknown names leave `function` null and return
/// `XR_ERROR_FUNCTION_UNSUPPORTED`.
#[no_mangle]
pub unsafe extern "system" fn xrGetInstanceProcAddr(
    instance: xr::Instance,
    name: *const c_char,
    function: *mut Option<xr::pfn::VoidFunction>,
) -> xr::Result {
    guard("xrGetInstanceProcAddr", || {
        if function.is_null() || name.is_null() {
            return Err(XrError::ValidationFailure("null name or output pointer".into()));
        }
        // SAFETY: checked non-null; the loader passes writable storage.
        unsafe { function.write(None) };
        // SAFETY: checked non-null; names are NUL-terminated.
        let name = unsafe { CStr::from_ptr(name) }
            .to_str()
            .map_err(|_| XrError::FunctionUnsupported("non-UTF-8 name".into()))?;
        let resolved = if instance.into_raw() == 0 {
            global_function(name)
        } else {
            runtime().instance(instance.into_raw())?;
            instance_function(name)
        };
        let Some(f) = resolved else {
            return Err(XrError::FunctionUnsupported(name.to_string()));
        };
        debug!("xrGetInstanceProcAddr({})", name);
        // SAFETY: checked non-null above.
        unsafe { function.write(Some(f)) };
        Ok(Status::Success)
    })
}
