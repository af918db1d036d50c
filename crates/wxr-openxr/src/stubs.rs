//! Paths, actions, haptics and action spaces.
//!
//! There is no input subsystem. These entry points resolve through
//! `xrGetInstanceProcAddr` but always fail with `XR_ERROR_RUNTIME_FAILURE`.

use std::ffi::c_char;

use wxr_core::{XrError, XrResult};

use crate::result::guard;

fn unsupported(name: &str) -> xr::Result {
    guard(name, || -> XrResult<_> {
        Err(XrError::RuntimeFailure(format!("{} is not implemented", name)))
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrCreateActionSpace(
    _session: xr::Session,
    _create_info: *const xr::ActionSpaceCreateInfo,
    _space: *mut xr::Space,
) -> xr::Result {
    unsupported("xrCreateActionSpace")
}

#[no_mangle]
pub unsafe extern "system" fn xrStringToPath(
    _instance: xr::Instance,
    _path_string: *const c_char,
    _path: *mut xr::Path,
) -> xr::Result {
    unsupported("xrStringToPath")
}

#[no_mangle]
pub unsafe extern "system" fn xrPathToString(
    _instance: xr::Instance,
    _path: xr::Path,
    _buffer_capacity_input: u32,
    _buffer_count_output: *mut u32,
    _buffer: *mut c_char,
) -> xr::Result {
    unsupported("xrPathToString")
}

#[no_mangle]
pub unsafe extern "system" fn xrCreateActionSet(
    _instance: xr::Instance,
    _create_info: *const xr::ActionSetCreateInfo,
    _action_set: *mut xr::ActionSet,
) -> xr::Result {
    unsupported("xrCreateActionSet")
}

#[no_mangle]
pub unsafe extern "system" fn xrDestroyActionSet(_action_set: xr::ActionSet) -> xr::Result {
    unsupported("xrDestroyActionSet")
}

#[no_mangle]
pub unsafe extern "system" fn xrCreateAction(
    _action_set: xr::ActionSet,
    _create_info: *const xr::ActionCreateInfo,
    _action: *mut xr::Action,
) -> xr::Result {
    unsupported("xrCreateAction")
}

#[no_mangle]
pub unsafe extern "system" fn xrDestroyAction(_action: xr::Action) -> xr::Result {
    unsupported("xrDestroyAction")
}

#[no_mangle]
pub unsafe extern "system" fn xrSuggestInteractionProfileBindings(
    _instance: xr::Instance,
    _suggested_bindings: *const xr::InteractionProfileSuggestedBinding,
) -> xr::Result {
    unsupported("xrSuggestInteractionProfileBindings")
}

#[no_mangle]
pub unsafe extern "system" fn xrAttachSessionActionSets(
    _session: xr::Session,
    _attach_info: *const xr::SessionActionSetsAttachInfo,
) -> xr::Result {
    unsupported("xrAttachSessionActionSets")
}

#[no_mangle]
pub unsafe extern "system" fn xrGetCurrentInteractionProfile(
    _session: xr::Session,
    _top_level_user_path: xr::Path,
    _interaction_profile: *mut xr::InteractionProfileState,
) -> xr::Result {
    unsupported("xrGetCurrentInteractionProfile")
}

#[no_mangle]
pub unsafe extern "system" fn xrGetActionStateBoolean(
    _session: xr::Session,
    _get_info: *const xr::ActionStateGetInfo,
    _state: *mut xr::ActionStateBoolean,
) -> xr::Result {
    unsupported("xrGetActionStateBoolean")
}

#[no_mangle]
pub unsafe extern "system" fn xrGetActionStateFloat(
    _session: xr::Session,
    _get_info: *const xr::ActionStateGetInfo,
    _state: *mut xr::ActionStateFloat,
) -> xr::Result {
    unsupported("xrGetActionStateFloat")
}

#[no_mangle]
pub unsafe extern "system" fn xrGetActionStateVector2f(
    _session: xr::Session,
    _get_info: *const xr::ActionStateGetInfo,
    _state: *mut xr::ActionStateVector2f,
) -> xr::Result {
    unsupported("xrGetActionStateVector2f")
}

#[no_mangle]
pub unsafe extern "system" fn xrGetActionStatePose(
    _session: xr::Session,
    _get_info: *const xr::ActionStateGetInfo,
    _state: *mut xr::ActionStatePose,
) -> xr::Result {
    unsupported("xrGetActionStatePose")
}

#[no_mangle]
pub unsafe extern "system" fn xrSyncActions(
    _session: xr::Session,
    _sync_info: *const xr::ActionsSyncInfo,
) -> xr::Result {
    unsupported("xrSyncActions")
}

#[no_mangle]
pub unsafe extern "system" fn xrEnumerateBoundSourcesForAction(
    _session: xr::Session,
    _enumerate_info: *const xr::BoundSourcesForActionEnumerateInfo,
    _source_capacity_input: u32,
    _source_count_output: *mut u32,
    _sources: *mut xr::Path,
) -> xr::Result {
    unsupported("xrEnumerateBoundSourcesForAction")
}

#[no_mangle]
pub unsafe extern "system" fn xrGetInputSourceLocalizedName(
    _session: xr::Session,
    _get_info: *const xr::InputSourceLocalizedNameGetInfo,
    _buffer_capacity_input: u32,
    _buffer_count_output: *mut u32,
    _buffer: *mut c_char,
) -> xr::Result {
    unsupported("xrGetInputSourceLocalizedName")
}

#[no_mangle]
pub unsafe extern "system" fn xrApplyHapticFeedback(
    _session: xr::Session,
    _haptic_action_info: *const xr::HapticActionInfo,
    _haptic_feedback: *const xr::HapticBaseHeader,
) -> xr::Result {
    unsupported("xrApplyHapticFeedback")
}

#[no_mangle]
pub unsafe extern "system" fn xrStopHapticFeedback(
    _session: xr::Session,
    _haptic_action_info: *const xr::HapticActionInfo,
) -> xr::Result {
    unsupported("xrStopHapticFeedback")
}
