//! Swapchain creation and the acquire / wait / release lease calls.

use tracing::debug;
use wxr_core::{Status, XrError};
use wxr_runtime::types::SwapchainDesc;
use wxr_runtime::{AcquireOutcome, PresentationBackend};

use crate::gles::SwapchainImageOpenGLESKHR;
use crate::result::guard;
use crate::runtime;
use crate::util::{
    input, optional_input, timeout_from_xr, write_array, write_out, write_tagged_array,
};

#[no_mangle]
pub unsafe extern "system" fn xrEnumerateSwapchainFormats(
    session: xr::Session,
    format_capacity_input: u32,
    format_count_output: *mut u32,
    formats: *mut i64,
) -> xr::Result {
    guard("xrEnumerateSwapchainFormats", || {
        let owner = runtime().session(session.into_raw())?;
        let supported = owner.backend().swapchain_formats();
        // SAFETY: pointers come straight from the application.
        unsafe {
            write_array(
                &supported,
                format_capacity_input,
                format_count_output,
                formats,
                |format, slot| *slot = *format,
            )?
        };
        Ok(Status::Success)
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrCreateSwapchain(
    session: xr::Session,
    create_info: *const xr::SwapchainCreateInfo,
    swapchain: *mut xr::Swapchain,
) -> xr::Result {
    debug!("xrCreateSwapchain({:#x})", session.into_raw());
    guard("xrCreateSwapchain", || {
        // SAFETY: pointers come straight from the application.
        let info = unsafe { input(create_info, xr::StructureType::SWAPCHAIN_CREATE_INFO)? };
        if swapchain.is_null() {
            return Err(XrError::ValidationFailure("swapchain output pointer is null".into()));
        }
        let desc = SwapchainDesc {
            create_flags: info.create_flags.into_raw(),
            usage_flags: info.usage_flags.into_raw(),
            format: info.format,
            sample_count: info.sample_count,
            width: info.width,
            height: info.height,
            face_count: info.face_count,
            array_size: info.array_size,
            mip_count: info.mip_count,
        };
        let handle = runtime().create_swapchain(session.into_raw(), desc)?;
        // SAFETY: checked non-null above.
        unsafe { write_out(swapchain, xr::Swapchain::from_raw(handle))? };
        Ok(Status::Success)
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrDestroySwapchain(swapchain: xr::Swapchain) -> xr::Result {
    debug!("xrDestroySwapchain({:#x})", swapchain.into_raw());
    guard("xrDestroySwapchain", || {
        runtime().destroy_swapchain(swapchain.into_raw())?;
        Ok(Status::Success)
    })
}

/// Report GL texture names. `images` is an array of `XrSwapchainImageOpenGLESKHR`.
#[no_mangle]
pub unsafe extern "system" fn xrEnumerateSwapchainImages(
    swapchain: xr::Swapchain,
    image_capacity_input: u32,
    image_count_output: *mut u32,
    images: *mut xr::SwapchainImageBaseHeader,
) -> xr::Result {
    guard("xrEnumerateSwapchainImages", || {
        let textures = runtime().swapchain(swapchain.into_raw())?.textures();
        // SAFETY: pointers come straight from the application; the element
        // type is fixed by the session's graphics binding.
        unsafe {
            write_tagged_array(
                &textures,
                image_capacity_input,
                image_count_output,
                images as *mut SwapchainImageOpenGLESKHR,
                xr::StructureType::SWAPCHAIN_IMAGE_OPENGL_ES_KHR,
                |texture, slot| slot.image = *texture,
            )?
        };
        Ok(Status::Success)
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrAcquireSwapchainImage(
    swapchain: xr::Swapchain,
    acquire_info: *const xr::SwapchainImageAcquireInfo,
    index: *mut u32,
) -> xr::Result {
    guard("xrAcquireSwapchainImage", || {
        let chain = runtime().swapchain(swapchain.into_raw())?;
        // SAFETY: pointers come straight from the application.
        unsafe {
            optional_input(acquire_info, xr::StructureType::SWAPCHAIN_IMAGE_ACQUIRE_INFO)?
        };
        if index.is_null() {
            return Err(XrError::ValidationFailure("index output pointer is null".into()));
        }
        match chain.acquire()? {
            AcquireOutcome::Acquired(i) => {
                // SAFETY: checked non-null above.
                unsafe { write_out(index, i)? };
                Ok(Status::Success)
            }
            AcquireOutcome::TimedOut => Ok(Status::Timeout),
        }
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrWaitSwapchainImage(
    swapchain: xr::Swapchain,
    wait_info: *const xr::SwapchainImageWaitInfo,
) -> xr::Result {
    guard("xrWaitSwapchainImage", || {
        let chain = runtime().swapchain(swapchain.into_raw())?;
        // SAFETY: pointers come straight from the application.
        let info = unsafe { input(wait_info, xr::StructureType::SWAPCHAIN_IMAGE_WAIT_INFO)? };
        chain.wait(timeout_from_xr(info.timeout))
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrReleaseSwapchainImage(
    swapchain: xr::Swapchain,
    release_info: *const xr::SwapchainImageReleaseInfo,
) -> xr::Result {
    guard("xrReleaseSwapchainImage", || {
        let chain = runtime().swapchain(swapchain.into_raw())?;
        // SAFETY: pointers come straight from the application.
        unsafe {
            optional_input(release_info, xr::StructureType::SWAPCHAIN_IMAGE_RELEASE_INFO)?
        };
        chain.release()?;
        Ok(Status::Success)
    })
}
