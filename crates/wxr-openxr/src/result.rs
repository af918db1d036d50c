//! Mapping between the runtime's error taxonomy and `XrResult` codes, plus
//! the symbolic names behind `xrResultToString` / `xrStructureTypeToString`.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error, warn};
use wxr_core::{Status, XrError, XrResult};

pub fn error_code(err: &XrError) -> xr::Result {
    match err {
        XrError::ValidationFailure(_) => xr::Result::ERROR_VALIDATION_FAILURE,
        XrError::HandleInvalid(_) => xr::Result::ERROR_HANDLE_INVALID,
        XrError::CallOrderInvalid(_) => xr::Result::ERROR_CALL_ORDER_INVALID,
        XrError::SessionNotReady => xr::Result::ERROR_SESSION_NOT_READY,
        XrError::SessionNotStopping => xr::Result::ERROR_SESSION_NOT_STOPPING,
        XrError::SessionRunning => xr::Result::ERROR_SESSION_RUNNING,
        XrError::SessionNotRunning => xr::Result::ERROR_SESSION_NOT_RUNNING,
        XrError::SessionLost => xr::Result::ERROR_SESSION_LOST,
        XrError::SizeInsufficient { .. } => xr::Result::ERROR_SIZE_INSUFFICIENT,
        XrError::LimitReached(_) => xr::Result::ERROR_LIMIT_REACHED,
        XrError::TimeInvalid(_) => xr::Result::ERROR_TIME_INVALID,
        XrError::LayerInvalid(_) => xr::Result::ERROR_LAYER_INVALID,
        XrError::LayerLimitExceeded { .. } => xr::Result::ERROR_LAYER_LIMIT_EXCEEDED,
        XrError::FunctionUnsupported(_) => xr::Result::ERROR_FUNCTION_UNSUPPORTED,
        XrError::RuntimeFailure(_) => xr::Result::ERROR_RUNTIME_FAILURE,
        XrError::ApiLayerNotPresent => xr::Result::ERROR_API_LAYER_NOT_PRESENT,
        XrError::ExtensionNotPresent(_) => xr::Result::ERROR_EXTENSION_NOT_PRESENT,
        XrError::InitializationFailed(_) => xr::Result::ERROR_INITIALIZATION_FAILED,
        XrError::ApiVersionUnsupported(_) => xr::Result::ERROR_API_VERSION_UNSUPPORTED,
        XrError::SystemInvalid => xr::Result::ERROR_SYSTEM_INVALID,
        XrError::FormFactorUnsupported => xr::Result::ERROR_FORM_FACTOR_UNSUPPORTED,
        XrError::ViewConfigurationTypeUnsupported => {
            xr::Result::ERROR_VIEW_CONFIGURATION_TYPE_UNSUPPORTED
        }
        XrError::ReferenceSpaceUnsupported => xr::Result::ERROR_REFERENCE_SPACE_UNSUPPORTED,
        XrError::EnvironmentBlendModeUnsupported => {
            xr::Result::ERROR_ENVIRONMENT_BLEND_MODE_UNSUPPORTED
        }
        XrError::SwapchainFormatUnsupported(_) => xr::Result::ERROR_SWAPCHAIN_FORMAT_UNSUPPORTED,
        XrError::SwapchainRectInvalid(_) => xr::Result::ERROR_SWAPCHAIN_RECT_INVALID,
        XrError::GraphicsDeviceInvalid(_) => xr::Result::ERROR_GRAPHICS_DEVICE_INVALID,
        XrError::GraphicsRequirementsCallMissing => {
            xr::Result::ERROR_GRAPHICS_REQUIREMENTS_CALL_MISSING
        }
        XrError::PoseInvalid => xr::Result::ERROR_POSE_INVALID,
    }
}

pub fn status_code(status: Status) -> xr::Result {
    match status {
        Status::Success => xr::Result::SUCCESS,
        Status::Timeout => xr::Result::TIMEOUT_EXPIRED,
        Status::SessionLossPending => xr::Result::SESSION_LOSS_PENDING,
        Status::EventUnavailable => xr::Result::EVENT_UNAVAILABLE,
        Status::SpaceBoundsUnavailable => xr::Result::SPACE_BOUNDS_UNAVAILABLE,
    }
}

/// Run one entry point body and turn its outcome into an `XrResult` code.
/// Panics never cross the C boundary; they become `XR_ERROR_RUNTIME_FAILURE`.
pub fn guard(name: &str, call: impl FnOnce() -> XrResult<Status>) -> xr::Result {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(status)) => status_code(status),
        Ok(Err(e)) => {
            match e {
                XrError::SizeInsufficient { .. } => debug!("{}: {}", name, e),
                _ => warn!("{}: {}", name, e),
            }
            error_code(&e)
        }
        Err(_) => {
            error!("{}: panicked", name);
            xr::Result::ERROR_RUNTIME_FAILURE
        }
    }
}

const RESULT_NAMES: &[(xr::Result, &str)] = &[
    (xr::Result::SUCCESS, "XR_SUCCESS"),
    (xr::Result::TIMEOUT_EXPIRED, "XR_TIMEOUT_EXPIRED"),
    (xr::Result::SESSION_LOSS_PENDING, "XR_SESSION_LOSS_PENDING"),
    (xr::Result::EVENT_UNAVAILABLE, "XR_EVENT_UNAVAILABLE"),
    (xr::Result::SPACE_BOUNDS_UNAVAILABLE, "XR_SPACE_BOUNDS_UNAVAILABLE"),
    (xr::Result::SESSION_NOT_FOCUSED, "XR_SESSION_NOT_FOCUSED"),
    (xr::Result::FRAME_DISCARDED, "XR_FRAME_DISCARDED"),
    (xr::Result::ERROR_VALIDATION_FAILURE, "XR_ERROR_VALIDATION_FAILURE"),
    (xr::Result::ERROR_RUNTIME_FAILURE, "XR_ERROR_RUNTIME_FAILURE"),
    (xr::Result::ERROR_OUT_OF_MEMORY, "XR_ERROR_OUT_OF_MEMORY"),
    (xr::Result::ERROR_API_VERSION_UNSUPPORTED, "XR_ERROR_API_VERSION_UNSUPPORTED"),
    (xr::Result::ERROR_INITIALIZATION_FAILED, "XR_ERROR_INITIALIZATION_FAILED"),
    (xr::Result::ERROR_FUNCTION_UNSUPPORTED, "XR_ERROR_FUNCTION_UNSUPPORTED"),
    (xr::Result::ERROR_FEATURE_UNSUPPORTED, "XR_ERROR_FEATURE_UNSUPPORTED"),
    (xr::Result::ERROR_EXTENSION_NOT_PRESENT, "XR_ERROR_EXTENSION_NOT_PRESENT"),
    (xr::Result::ERROR_LIMIT_REACHED, "XR_ERROR_LIMIT_REACHED"),
    (xr::Result::ERROR_SIZE_INSUFFICIENT, "XR_ERROR_SIZE_INSUFFICIENT"),
    (xr::Result::ERROR_HANDLE_INVALID, "XR_ERROR_HANDLE_INVALID"),
    (xr::Result::ERROR_INSTANCE_LOST, "XR_ERROR_INSTANCE_LOST"),
    (xr::Result::ERROR_SESSION_RUNNING, "XR_ERROR_SESSION_RUNNING"),
    (xr::Result::ERROR_SESSION_NOT_RUNNING, "XR_ERROR_SESSION_NOT_RUNNING"),
    (xr::Result::ERROR_SESSION_LOST, "XR_ERROR_SESSION_LOST"),
    (xr::Result::ERROR_SYSTEM_INVALID, "XR_ERROR_SYSTEM_INVALID"),
    (xr::Result::ERROR_PATH_INVALID, "XR_ERROR_PATH_INVALID"),
    (xr::Result::ERROR_PATH_COUNT_EXCEEDED, "XR_ERROR_PATH_COUNT_EXCEEDED"),
    (xr::Result::ERROR_PATH_FORMAT_INVALID, "XR_ERROR_PATH_FORMAT_INVALID"),
    (xr::Result::ERROR_PATH_UNSUPPORTED, "XR_ERROR_PATH_UNSUPPORTED"),
    (xr::Result::ERROR_LAYER_INVALID, "XR_ERROR_LAYER_INVALID"),
    (xr::Result::ERROR_LAYER_LIMIT_EXCEEDED, "XR_ERROR_LAYER_LIMIT_EXCEEDED"),
    (xr::Result::ERROR_SWAPCHAIN_RECT_INVALID, "XR_ERROR_SWAPCHAIN_RECT_INVALID"),
    (xr::Result::ERROR_SWAPCHAIN_FORMAT_UNSUPPORTED, "XR_ERROR_SWAPCHAIN_FORMAT_UNSUPPORTED"),
    (xr::Result::ERROR_ACTION_TYPE_MISMATCH, "XR_ERROR_ACTION_TYPE_MISMATCH"),
    (xr::Result::ERROR_SESSION_NOT_READY, "XR_ERROR_SESSION_NOT_READY"),
    (xr::Result::ERROR_SESSION_NOT_STOPPING, "XR_ERROR_SESSION_NOT_STOPPING"),
    (xr::Result::ERROR_TIME_INVALID, "XR_ERROR_TIME_INVALID"),
    (xr::Result::ERROR_REFERENCE_SPACE_UNSUPPORTED, "XR_ERROR_REFERENCE_SPACE_UNSUPPORTED"),
    (xr::Result::ERROR_FILE_ACCESS_ERROR, "XR_ERROR_FILE_ACCESS_ERROR"),
    (xr::Result::ERROR_FILE_CONTENTS_INVALID, "XR_ERROR_FILE_CONTENTS_INVALID"),
    (xr::Result::ERROR_FORM_FACTOR_UNSUPPORTED, "XR_ERROR_FORM_FACTOR_UNSUPPORTED"),
    (xr::Result::ERROR_FORM_FACTOR_UNAVAILABLE, "XR_ERROR_FORM_FACTOR_UNAVAILABLE"),
    (xr::Result::ERROR_API_LAYER_NOT_PRESENT, "XR_ERROR_API_LAYER_NOT_PRESENT"),
    (xr::Result::ERROR_CALL_ORDER_INVALID, "XR_ERROR_CALL_ORDER_INVALID"),
    (xr::Result::ERROR_GRAPHICS_DEVICE_INVALID, "XR_ERROR_GRAPHICS_DEVICE_INVALID"),
    (xr::Result::ERROR_POSE_INVALID, "XR_ERROR_POSE_INVALID"),
    (xr::Result::ERROR_INDEX_OUT_OF_RANGE, "XR_ERROR_INDEX_OUT_OF_RANGE"),
    (
        xr::Result::ERROR_VIEW_CONFIGURATION_TYPE_UNSUPPORTED,
        "XR_ERROR_VIEW_CONFIGURATION_TYPE_UNSUPPORTED",
    ),
    (
        xr::Result::ERROR_ENVIRONMENT_BLEND_MODE_UNSUPPORTED,
        "XR_ERROR_ENVIRONMENT_BLEND_MODE_UNSUPPORTED",
    ),
    (xr::Result::ERROR_NAME_DUPLICATED, "XR_ERROR_NAME_DUPLICATED"),
    (xr::Result::ERROR_NAME_INVALID, "XR_ERROR_NAME_INVALID"),
    (xr::Result::ERROR_ACTIONSET_NOT_ATTACHED, "XR_ERROR_ACTIONSET_NOT_ATTACHED"),
    (xr::Result::ERROR_ACTIONSETS_ALREADY_ATTACHED, "XR_ERROR_ACTIONSETS_ALREADY_ATTACHED"),
    (xr::Result::ERROR_LOCALIZED_NAME_DUPLICATED, "XR_ERROR_LOCALIZED_NAME_DUPLICATED"),
    (xr::Result::ERROR_LOCALIZED_NAME_INVALID, "XR_ERROR_LOCALIZED_NAME_INVALID"),
    (
        xr::Result::ERROR_GRAPHICS_REQUIREMENTS_CALL_MISSING,
        "XR_ERROR_GRAPHICS_REQUIREMENTS_CALL_MISSING",
    ),
];

/// Symbolic name of a result code, `XR_UNKNOWN_SUCCESS_n` / `XR_UNKNOWN_FAILURE_n`
/// for codes this runtime does not know.
pub fn result_name(value: xr::Result) -> String {
    match RESULT_NAMES.iter().find(|(code, _)| *code == value) {
        Some((_, name)) => (*name).to_string(),
        None if value.into_raw() >= 0 => format!("XR_UNKNOWN_SUCCESS_{}", value.into_raw()),
        None => format!("XR_UNKNOWN_FAILURE_{}", value.into_raw()),
    }
}

const STRUCTURE_NAMES: &[(xr::StructureType, &str)] = &[
    (xr::StructureType::UNKNOWN, "XR_TYPE_UNKNOWN"),
    (xr::StructureType::API_LAYER_PROPERTIES, "XR_TYPE_API_LAYER_PROPERTIES"),
    (xr::StructureType::EXTENSION_PROPERTIES, "XR_TYPE_EXTENSION_PROPERTIES"),
    (xr::StructureType::INSTANCE_CREATE_INFO, "XR_TYPE_INSTANCE_CREATE_INFO"),
    (xr::StructureType::SYSTEM_GET_INFO, "XR_TYPE_SYSTEM_GET_INFO"),
    (xr::StructureType::SYSTEM_PROPERTIES, "XR_TYPE_SYSTEM_PROPERTIES"),
    (xr::StructureType::VIEW_LOCATE_INFO, "XR_TYPE_VIEW_LOCATE_INFO"),
    (xr::StructureType::VIEW, "XR_TYPE_VIEW"),
    (xr::StructureType::SESSION_CREATE_INFO, "XR_TYPE_SESSION_CREATE_INFO"),
    (xr::StructureType::SWAPCHAIN_CREATE_INFO, "XR_TYPE_SWAPCHAIN_CREATE_INFO"),
    (xr::StructureType::SESSION_BEGIN_INFO, "XR_TYPE_SESSION_BEGIN_INFO"),
    (xr::StructureType::VIEW_STATE, "XR_TYPE_VIEW_STATE"),
    (xr::StructureType::FRAME_END_INFO, "XR_TYPE_FRAME_END_INFO"),
    (xr::StructureType::HAPTIC_VIBRATION, "XR_TYPE_HAPTIC_VIBRATION"),
    (xr::StructureType::EVENT_DATA_BUFFER, "XR_TYPE_EVENT_DATA_BUFFER"),
    (
        xr::StructureType::EVENT_DATA_INSTANCE_LOSS_PENDING,
        "XR_TYPE_EVENT_DATA_INSTANCE_LOSS_PENDING",
    ),
    (
        xr::StructureType::EVENT_DATA_SESSION_STATE_CHANGED,
        "XR_TYPE_EVENT_DATA_SESSION_STATE_CHANGED",
    ),
    (xr::StructureType::ACTION_STATE_BOOLEAN, "XR_TYPE_ACTION_STATE_BOOLEAN"),
    (xr::StructureType::ACTION_STATE_FLOAT, "XR_TYPE_ACTION_STATE_FLOAT"),
    (xr::StructureType::ACTION_STATE_VECTOR2F, "XR_TYPE_ACTION_STATE_VECTOR2F"),
    (xr::StructureType::ACTION_STATE_POSE, "XR_TYPE_ACTION_STATE_POSE"),
    (xr::StructureType::ACTION_SET_CREATE_INFO, "XR_TYPE_ACTION_SET_CREATE_INFO"),
    (xr::StructureType::ACTION_CREATE_INFO, "XR_TYPE_ACTION_CREATE_INFO"),
    (xr::StructureType::INSTANCE_PROPERTIES, "XR_TYPE_INSTANCE_PROPERTIES"),
    (xr::StructureType::FRAME_WAIT_INFO, "XR_TYPE_FRAME_WAIT_INFO"),
    (
        xr::StructureType::COMPOSITION_LAYER_PROJECTION,
        "XR_TYPE_COMPOSITION_LAYER_PROJECTION",
    ),
    (xr::StructureType::COMPOSITION_LAYER_QUAD, "XR_TYPE_COMPOSITION_LAYER_QUAD"),
    (
        xr::StructureType::REFERENCE_SPACE_CREATE_INFO,
        "XR_TYPE_REFERENCE_SPACE_CREATE_INFO",
    ),
    (xr::StructureType::ACTION_SPACE_CREATE_INFO, "XR_TYPE_ACTION_SPACE_CREATE_INFO"),
    (
        xr::StructureType::EVENT_DATA_REFERENCE_SPACE_CHANGE_PENDING,
        "XR_TYPE_EVENT_DATA_REFERENCE_SPACE_CHANGE_PENDING",
    ),
    (xr::StructureType::VIEW_CONFIGURATION_VIEW, "XR_TYPE_VIEW_CONFIGURATION_VIEW"),
    (xr::StructureType::SPACE_LOCATION, "XR_TYPE_SPACE_LOCATION"),
    (xr::StructureType::SPACE_VELOCITY, "XR_TYPE_SPACE_VELOCITY"),
    (xr::StructureType::FRAME_STATE, "XR_TYPE_FRAME_STATE"),
    (
        xr::StructureType::VIEW_CONFIGURATION_PROPERTIES,
        "XR_TYPE_VIEW_CONFIGURATION_PROPERTIES",
    ),
    (xr::StructureType::FRAME_BEGIN_INFO, "XR_TYPE_FRAME_BEGIN_INFO"),
    (
        xr::StructureType::COMPOSITION_LAYER_PROJECTION_VIEW,
        "XR_TYPE_COMPOSITION_LAYER_PROJECTION_VIEW",
    ),
    (xr::StructureType::EVENT_DATA_EVENTS_LOST, "XR_TYPE_EVENT_DATA_EVENTS_LOST"),
    (
        xr::StructureType::INTERACTION_PROFILE_SUGGESTED_BINDING,
        "XR_TYPE_INTERACTION_PROFILE_SUGGESTED_BINDING",
    ),
    (
        xr::StructureType::EVENT_DATA_INTERACTION_PROFILE_CHANGED,
        "XR_TYPE_EVENT_DATA_INTERACTION_PROFILE_CHANGED",
    ),
    (xr::StructureType::INTERACTION_PROFILE_STATE, "XR_TYPE_INTERACTION_PROFILE_STATE"),
    (
        xr::StructureType::SWAPCHAIN_IMAGE_ACQUIRE_INFO,
        "XR_TYPE_SWAPCHAIN_IMAGE_ACQUIRE_INFO",
    ),
    (xr::StructureType::SWAPCHAIN_IMAGE_WAIT_INFO, "XR_TYPE_SWAPCHAIN_IMAGE_WAIT_INFO"),
    (
        xr::StructureType::SWAPCHAIN_IMAGE_RELEASE_INFO,
        "XR_TYPE_SWAPCHAIN_IMAGE_RELEASE_INFO",
    ),
    (xr::StructureType::ACTION_STATE_GET_INFO, "XR_TYPE_ACTION_STATE_GET_INFO"),
    (xr::StructureType::HAPTIC_ACTION_INFO, "XR_TYPE_HAPTIC_ACTION_INFO"),
    (
        xr::StructureType::SESSION_ACTION_SETS_ATTACH_INFO,
        "XR_TYPE_SESSION_ACTION_SETS_ATTACH_INFO",
    ),
    (xr::StructureType::ACTIONS_SYNC_INFO, "XR_TYPE_ACTIONS_SYNC_INFO"),
    (
        xr::StructureType::BOUND_SOURCES_FOR_ACTION_ENUMERATE_INFO,
        "XR_TYPE_BOUND_SOURCES_FOR_ACTION_ENUMERATE_INFO",
    ),
    (
        xr::StructureType::INPUT_SOURCE_LOCALIZED_NAME_GET_INFO,
        "XR_TYPE_INPUT_SOURCE_LOCALIZED_NAME_GET_INFO",
    ),
    (
        xr::StructureType::GRAPHICS_BINDING_OPENGL_ES_ANDROID_KHR,
        "XR_TYPE_GRAPHICS_BINDING_OPENGL_ES_ANDROID_KHR",
    ),
    (
        xr::StructureType::SWAPCHAIN_IMAGE_OPENGL_ES_KHR,
        "XR_TYPE_SWAPCHAIN_IMAGE_OPENGL_ES_KHR",
    ),
    (
        xr::StructureType::GRAPHICS_REQUIREMENTS_OPENGL_ES_KHR,
        "XR_TYPE_GRAPHICS_REQUIREMENTS_OPENGL_ES_KHR",
    ),
];

/// Symbolic name of a structure type, `XR_UNKNOWN_STRUCTURE_TYPE_n` otherwise.
pub fn structure_type_name(value: xr::StructureType) -> String {
    STRUCTURE_NAMES
        .iter()
        .find(|(ty, _)| *ty == value)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| format!("XR_UNKNOWN_STRUCTURE_TYPE_{}", value.into_raw()))
}
