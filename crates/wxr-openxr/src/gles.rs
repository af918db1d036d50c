//! `XR_KHR_opengl_es_enable` structures and the session graphics binding.
//!
//! EGL objects are carried as plain pointers so nothing here depends on
//! platform EGL headers. Layouts follow the registry: a type tag, a `next`
//! pointer, then the payload.

use std::ffi::c_void;

use wxr_core::{XrError, XrResult};
use wxr_runtime::types::GlesBinding;

/// Same layout as `XrGraphicsBindingOpenGLESAndroidKHR`.
#[repr(C)]
pub struct GraphicsBindingOpenGLESKHR {
    pub ty: xr::StructureType,
    pub next: *const c_void,
    pub display: *mut c_void,
    pub config: *mut c_void,
    pub context: *mut c_void,
}

#[repr(C)]
pub struct SwapchainImageOpenGLESKHR {
    pub ty: xr::StructureType,
    pub next: *mut c_void,
    pub image: u32,
}

#[repr(C)]
pub struct GraphicsRequirementsOpenGLESKHR {
    pub ty: xr::StructureType,
    pub next: *mut c_void,
    pub min_api_version_supported: xr::Version,
    pub max_api_version_supported: xr::Version,
}

/// Longest `next` chain walked before giving up on a cycle.
const MAX_CHAIN: usize = 64;

/// Find the OpenGL ES graphics binding in a session create info's `next` chain.
///
/// # Safety
/// `next` must be null or the head of a well-formed OpenXR structure chain.
pub unsafe fn find_binding(next: *const c_void) -> XrResult<Option<GlesBinding>> {
    let mut cursor = next as *const xr::BaseInStructure;
    for _ in 0..MAX_CHAIN {
        // SAFETY: every chain element starts with a BaseInStructure header.
        let Some(header) = (unsafe { cursor.as_ref() }) else {
            return Ok(None);
        };
        if header.ty == xr::StructureType::GRAPHICS_BINDING_OPENGL_ES_ANDROID_KHR {
            // SAFETY: the tag identifies the full structure.
            let binding = unsafe { &*(cursor as *const GraphicsBindingOpenGLESKHR) };
            return Ok(Some(GlesBinding {
                display: binding.display as usize,
                config: binding.config as usize,
                context: binding.context as usize,
            }));
        }
        cursor = header.next;
    }
    Err(XrError::ValidationFailure("structure chain too long".into()))
}
