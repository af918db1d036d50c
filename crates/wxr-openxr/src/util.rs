//! Pointer plumbing shared by the entry points: typed input/output access,
//! two-call array writes, fixed-size strings and value conversions.

use std::ffi::{c_char, CStr};

use wxr_core::{XrError, XrResult};
use wxr_runtime::enumerate::{two_call, Enumerated};
use wxr_runtime::types::{
    ApiVersion, EnvironmentBlendMode, Extent2Df, FormFactor, Fov, LocationFlags, Pose, Quat,
    Rect2Di, ReferenceSpaceType, SessionState, SwapchainSubImage, Vec3, ViewConfigurationType,
};

use crate::gles::{GraphicsRequirementsOpenGLESKHR, SwapchainImageOpenGLESKHR};

/// OpenXR structs that start with a `type` tag.
pub trait Tagged {
    fn ty(&self) -> xr::StructureType;
}

macro_rules! tagged {
    ($($t:ty),* $(,)?) => {
        $(impl Tagged for $t {
            fn ty(&self) -> xr::StructureType {
                self.ty
            }
        })*
    };
}

tagged!(
    xr::InstanceCreateInfo,
    xr::InstanceProperties,
    xr::ExtensionProperties,
    xr::ApiLayerProperties,
    xr::EventDataBuffer,
    xr::SystemGetInfo,
    xr::SystemProperties,
    xr::SessionCreateInfo,
    xr::SessionBeginInfo,
    xr::ReferenceSpaceCreateInfo,
    xr::SpaceLocation,
    xr::ViewConfigurationView,
    xr::ViewConfigurationProperties,
    xr::SwapchainCreateInfo,
    xr::SwapchainImageAcquireInfo,
    xr::SwapchainImageWaitInfo,
    xr::SwapchainImageReleaseInfo,
    xr::FrameWaitInfo,
    xr::FrameState,
    xr::FrameBeginInfo,
    xr::FrameEndInfo,
    xr::ViewLocateInfo,
    xr::ViewState,
    xr::View,
    SwapchainImageOpenGLESKHR,
    GraphicsRequirementsOpenGLESKHR,
);

fn wrong_type(expected: xr::StructureType, found: xr::StructureType) -> XrError {
    XrError::ValidationFailure(format!(
        "expected structure type {}, found {}",
        expected.into_raw(),
        found.into_raw()
    ))
}

/// Borrow a required input struct, checking its type tag.
///
/// # Safety
/// `ptr` must be null or point to a readable `T`.
pub unsafe fn input<'a, T: Tagged>(ptr: *const T, expected: xr::StructureType) -> XrResult<&'a T> {
    // SAFETY: caller guarantees `ptr` is null or valid.
    let value = unsafe { ptr.as_ref() }
        .ok_or_else(|| XrError::ValidationFailure("required input pointer is null".into()))?;
    if value.ty() != expected {
        return Err(wrong_type(expected, value.ty()));
    }
    Ok(value)
}

/// Like [`input`], for parameters the application may pass as null.
///
/// # Safety
/// `ptr` must be null or point to a readable `T`.
pub unsafe fn optional_input<'a, T: Tagged>(
    ptr: *const T,
    expected: xr::StructureType,
) -> XrResult<Option<&'a T>> {
    if ptr.is_null() {
        return Ok(None);
    }
    // SAFETY: forwarded from the caller.
    unsafe { input(ptr, expected) }.map(Some)
}

/// Borrow an output struct, checking the type tag the application filled in.
///
/// # Safety
/// `ptr` must be null or point to a writable `T`.
pub unsafe fn output<'a, T: Tagged>(ptr: *mut T, expected: xr::StructureType) -> XrResult<&'a mut T> {
    // SAFETY: caller guarantees `ptr` is null or valid.
    let value = unsafe { ptr.as_mut() }
        .ok_or_else(|| XrError::ValidationFailure("required output pointer is null".into()))?;
    if value.ty() != expected {
        return Err(wrong_type(expected, value.ty()));
    }
    Ok(value)
}

/// Write a plain output value.
///
/// # Safety
/// `ptr` must be null or point to a writable `T`.
pub unsafe fn write_out<T>(ptr: *mut T, value: T) -> XrResult<()> {
    if ptr.is_null() {
        return Err(XrError::ValidationFailure("required output pointer is null".into()));
    }
    // SAFETY: non-null and valid per the caller.
    unsafe { ptr.write(value) };
    Ok(())
}

/// Two-call enumeration into a caller-provided array. The required count is
/// written even when the capacity is too small; the array is untouched then.
///
/// # Safety
/// `count_out` must be null or writable; `array` must be null or hold
/// `capacity` elements.
pub unsafe fn write_array<T, U>(
    items: &[T],
    capacity: u32,
    count_out: *mut u32,
    array: *mut U,
    mut fill: impl FnMut(&T, &mut U),
) -> XrResult<()> {
    if count_out.is_null() {
        return Err(XrError::ValidationFailure("count output pointer is null".into()));
    }
    if capacity > 0 && array.is_null() {
        return Err(XrError::ValidationFailure(
            "non-zero capacity with a null array".into(),
        ));
    }
    let (required, result) = two_call(items, capacity);
    // SAFETY: checked non-null above.
    unsafe { count_out.write(required) };
    if let Enumerated::Filled(items) = result? {
        // SAFETY: `capacity >= items.len()` and `array` holds `capacity` elements.
        let slots = unsafe { std::slice::from_raw_parts_mut(array, items.len()) };
        for (item, slot) in items.iter().zip(slots) {
            fill(item, slot);
        }
    }
    Ok(())
}

/// [`write_array`] for arrays of tagged structs: every slot's type is checked
/// before anything is written.
///
/// # Safety
/// Same as [`write_array`].
pub unsafe fn write_tagged_array<T, U: Tagged>(
    items: &[T],
    capacity: u32,
    count_out: *mut u32,
    array: *mut U,
    expected: xr::StructureType,
    fill: impl FnMut(&T, &mut U),
) -> XrResult<()> {
    if !array.is_null() && capacity as usize >= items.len() {
        // SAFETY: `array` holds `capacity` elements per the caller.
        let slots = unsafe { std::slice::from_raw_parts(array, items.len()) };
        if let Some(bad) = slots.iter().find(|slot| slot.ty() != expected) {
            return Err(wrong_type(expected, bad.ty()));
        }
    }
    // SAFETY: forwarded from the caller.
    unsafe { write_array(items, capacity, count_out, array, fill) }
}

/// Copy `src` into a fixed-size C string buffer, truncating if needed.
pub fn write_c_string(src: &str, dst: &mut [c_char]) {
    if dst.is_empty() {
        return;
    }
    let bytes = src.as_bytes();
    let len = std::cmp::min(bytes.len(), dst.len() - 1);
    for (d, s) in dst.iter_mut().zip(&bytes[..len]) {
        *d = *s as c_char;
    }
    dst[len] = 0;
}

/// Read a fixed-size, NUL-terminated C string buffer.
pub fn read_c_array(src: &[c_char]) -> String {
    let bytes: Vec<u8> = src
        .iter()
        .take_while(|c| **c != 0)
        .map(|c| *c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Read `count` C strings from an array of pointers.
///
/// # Safety
/// `ptrs` must be null or hold `count` pointers, each null or NUL-terminated.
pub unsafe fn read_string_array(ptrs: *const *const c_char, count: u32) -> XrResult<Vec<String>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    if ptrs.is_null() {
        return Err(XrError::ValidationFailure(format!(
            "{} names announced with a null array",
            count
        )));
    }
    // SAFETY: `ptrs` holds `count` entries per the caller.
    let ptrs = unsafe { std::slice::from_raw_parts(ptrs, count as usize) };
    ptrs.iter()
        .map(|ptr| {
            if ptr.is_null() {
                return Err(XrError::ValidationFailure("null name in array".into()));
            }
            // SAFETY: non-null and NUL-terminated per the caller.
            Ok(unsafe { CStr::from_ptr(*ptr) }.to_string_lossy().into_owned())
        })
        .collect()
}

// ── Value conversions ───────────────────────────────────────

pub fn version_from_xr(v: xr::Version) -> ApiVersion {
    ApiVersion::new(v.major(), v.minor(), v.patch())
}

pub fn version_to_xr(v: ApiVersion) -> xr::Version {
    xr::Version::new(v.major, v.minor, v.patch)
}

pub fn pose_from_xr(p: &xr::Posef) -> Pose {
    Pose {
        orientation: Quat::new(p.orientation.x, p.orientation.y, p.orientation.z, p.orientation.w),
        position: Vec3::new(p.position.x, p.position.y, p.position.z),
    }
}

pub fn pose_to_xr(p: &Pose) -> xr::Posef {
    xr::Posef {
        orientation: xr::Quaternionf {
            x: p.orientation.x,
            y: p.orientation.y,
            z: p.orientation.z,
            w: p.orientation.w,
        },
        position: xr::Vector3f {
            x: p.position.x,
            y: p.position.y,
            z: p.position.z,
        },
    }
}

pub fn fov_from_xr(f: &xr::Fovf) -> Fov {
    Fov {
        angle_left: f.angle_left,
        angle_right: f.angle_right,
        angle_up: f.angle_up,
        angle_down: f.angle_down,
    }
}

pub fn fov_to_xr(f: &Fov) -> xr::Fovf {
    xr::Fovf {
        angle_left: f.angle_left,
        angle_right: f.angle_right,
        angle_up: f.angle_up,
        angle_down: f.angle_down,
    }
}

pub fn extent_to_xr(e: Extent2Df) -> xr::Extent2Df {
    xr::Extent2Df {
        width: e.width,
        height: e.height,
    }
}

pub fn extent_from_xr(e: &xr::Extent2Df) -> Extent2Df {
    Extent2Df {
        width: e.width,
        height: e.height,
    }
}

pub fn sub_image_from_xr(s: &xr::SwapchainSubImage) -> SwapchainSubImage {
    SwapchainSubImage {
        swapchain: s.swapchain.into_raw(),
        image_rect: Rect2Di {
            offset_x: s.image_rect.offset.x,
            offset_y: s.image_rect.offset.y,
            width: s.image_rect.extent.width,
            height: s.image_rect.extent.height,
        },
        image_array_index: s.image_array_index,
    }
}

pub fn form_factor_from_xr(f: xr::FormFactor) -> XrResult<FormFactor> {
    match f {
        xr::FormFactor::HEAD_MOUNTED_DISPLAY => Ok(FormFactor::HeadMountedDisplay),
        xr::FormFactor::HANDHELD_DISPLAY => Ok(FormFactor::HandheldDisplay),
        other => Err(XrError::ValidationFailure(format!(
            "unknown form factor {}",
            other.into_raw()
        ))),
    }
}

pub fn view_configuration_from_xr(v: xr::ViewConfigurationType) -> XrResult<ViewConfigurationType> {
    match v {
        xr::ViewConfigurationType::PRIMARY_MONO => Ok(ViewConfigurationType::PrimaryMono),
        xr::ViewConfigurationType::PRIMARY_STEREO => Ok(ViewConfigurationType::PrimaryStereo),
        _ => Err(XrError::ViewConfigurationTypeUnsupported),
    }
}

pub fn view_configuration_to_xr(v: ViewConfigurationType) -> xr::ViewConfigurationType {
    match v {
        ViewConfigurationType::PrimaryMono => xr::ViewConfigurationType::PRIMARY_MONO,
        ViewConfigurationType::PrimaryStereo => xr::ViewConfigurationType::PRIMARY_STEREO,
    }
}

pub fn blend_mode_from_xr(m: xr::EnvironmentBlendMode) -> XrResult<EnvironmentBlendMode> {
    match m {
        xr::EnvironmentBlendMode::OPAQUE => Ok(EnvironmentBlendMode::Opaque),
        xr::EnvironmentBlendMode::ADDITIVE => Ok(EnvironmentBlendMode::Additive),
        xr::EnvironmentBlendMode::ALPHA_BLEND => Ok(EnvironmentBlendMode::AlphaBlend),
        _ => Err(XrError::EnvironmentBlendModeUnsupported),
    }
}

pub fn blend_mode_to_xr(m: EnvironmentBlendMode) -> xr::EnvironmentBlendMode {
    match m {
        EnvironmentBlendMode::Opaque => xr::EnvironmentBlendMode::OPAQUE,
        EnvironmentBlendMode::Additive => xr::EnvironmentBlendMode::ADDITIVE,
        EnvironmentBlendMode::AlphaBlend => xr::EnvironmentBlendMode::ALPHA_BLEND,
    }
}

pub fn reference_space_from_xr(t: xr::ReferenceSpaceType) -> XrResult<ReferenceSpaceType> {
    match t {
        xr::ReferenceSpaceType::VIEW => Ok(ReferenceSpaceType::View),
        xr::ReferenceSpaceType::LOCAL => Ok(ReferenceSpaceType::Local),
        xr::ReferenceSpaceType::STAGE => Ok(ReferenceSpaceType::Stage),
        _ => Err(XrError::ReferenceSpaceUnsupported),
    }
}

pub fn reference_space_to_xr(t: ReferenceSpaceType) -> xr::ReferenceSpaceType {
    match t {
        ReferenceSpaceType::View => xr::ReferenceSpaceType::VIEW,
        ReferenceSpaceType::Local => xr::ReferenceSpaceType::LOCAL,
        ReferenceSpaceType::Stage => xr::ReferenceSpaceType::STAGE,
    }
}

pub fn session_state_to_xr(s: SessionState) -> xr::SessionState {
    match s {
        SessionState::Idle => xr::SessionState::IDLE,
        SessionState::Ready => xr::SessionState::READY,
        SessionState::Synchronized => xr::SessionState::SYNCHRONIZED,
        SessionState::Visible => xr::SessionState::VISIBLE,
        SessionState::Focused => xr::SessionState::FOCUSED,
        SessionState::Stopping => xr::SessionState::STOPPING,
        SessionState::LossPending => xr::SessionState::LOSS_PENDING,
        SessionState::Exiting => xr::SessionState::EXITING,
    }
}

pub fn space_location_flags(f: LocationFlags) -> xr::SpaceLocationFlags {
    let mut bits = 0;
    if f.orientation_valid {
        bits |= xr::SpaceLocationFlags::ORIENTATION_VALID.into_raw();
    }
    if f.position_valid {
        bits |= xr::SpaceLocationFlags::POSITION_VALID.into_raw();
    }
    if f.orientation_tracked {
        bits |= xr::SpaceLocationFlags::ORIENTATION_TRACKED.into_raw();
    }
    if f.position_tracked {
        bits |= xr::SpaceLocationFlags::POSITION_TRACKED.into_raw();
    }
    xr::SpaceLocationFlags::from_raw(bits)
}

pub fn view_state_flags(f: LocationFlags) -> xr::ViewStateFlags {
    let mut bits = 0;
    if f.orientation_valid {
        bits |= xr::ViewStateFlags::ORIENTATION_VALID.into_raw();
    }
    if f.position_valid {
        bits |= xr::ViewStateFlags::POSITION_VALID.into_raw();
    }
    if f.orientation_tracked {
        bits |= xr::ViewStateFlags::ORIENTATION_TRACKED.into_raw();
    }
    if f.position_tracked {
        bits |= xr::ViewStateFlags::POSITION_TRACKED.into_raw();
    }
    xr::ViewStateFlags::from_raw(bits)
}

/// Timeout in a wait-info struct. `XR_INFINITE_DURATION` waits forever;
/// zero or negative polls.
pub fn timeout_from_xr(d: xr::Duration) -> Option<std::time::Duration> {
    let nanos = d.as_nanos();
    if nanos == xr::Duration::INFINITE.as_nanos() {
        None
    } else {
        Some(std::time::Duration::from_nanos(nanos.max(0) as u64))
    }
}
