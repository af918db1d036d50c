//! System queries, view configurations and the OpenGL ES requirements.

use tracing::debug;
use wxr_core::Status;

use crate::gles::GraphicsRequirementsOpenGLESKHR;
use crate::result::guard;
use crate::runtime;
use crate::util::{
    blend_mode_to_xr, form_factor_from_xr, input, output, view_configuration_from_xr,
    view_configuration_to_xr, version_to_xr, write_array, write_c_string, write_out,
    write_tagged_array,
};

#[no_mangle]
pub unsafe extern "system" fn xrGetSystem(
    instance: xr::Instance,
    get_info: *const xr::SystemGetInfo,
    system_id: *mut xr::SystemId,
) -> xr::Result {
    debug!("xrGetSystem({:#x})", instance.into_raw());
    guard("xrGetSystem", || {
        let owner = runtime().instance(instance.into_raw())?;
        // SAFETY: pointers come straight from the application.
        let info = unsafe { input(get_info, xr::StructureType::SYSTEM_GET_INFO)? };
        let id = owner.get_system(form_factor_from_xr(info.form_factor)?)?;
        // SAFETY: as above.
        unsafe { write_out(system_id, xr::SystemId::from_raw(id))? };
        Ok(Status::Success)
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrGetSystemProperties(
    instance: xr::Instance,
    system_id: xr::SystemId,
    properties: *mut xr::SystemProperties,
) -> xr::Result {
    debug!("xrGetSystemProperties({:#x})", instance.into_raw());
    guard("xrGetSystemProperties", || {
        let owner = runtime().instance(instance.into_raw())?;
        let system = owner.system(system_id.into_raw())?;
        // SAFETY: pointers come straight from the application.
        let out = unsafe { output(properties, xr::StructureType::SYSTEM_PROPERTIES)? };
        out.system_id = system_id;
        out.vendor_id = system.vendor_id;
        write_c_string(&system.system_name, &mut out.system_name);
        out.graphics_properties = xr::SystemGraphicsProperties {
            max_swapchain_image_height: system.max_image_height,
            max_swapchain_image_width: system.max_image_width,
            max_layer_count: system.max_layer_count,
        };
        out.tracking_properties = xr::SystemTrackingProperties {
            orientation_tracking: system.orientation_tracking.into(),
            position_tracking: system.position_tracking.into(),
        };
        Ok(Status::Success)
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrEnumerateEnvironmentBlendModes(
    instance: xr::Instance,
    system_id: xr::SystemId,
    view_configuration_type: xr::ViewConfigurationType,
    environment_blend_mode_capacity_input: u32,
    environment_blend_mode_count_output: *mut u32,
    environment_blend_modes: *mut xr::EnvironmentBlendMode,
) -> xr::Result {
    guard("xrEnumerateEnvironmentBlendModes", || {
        let owner = runtime().instance(instance.into_raw())?;
        let modes = owner.environment_blend_modes(
            system_id.into_raw(),
            view_configuration_from_xr(view_configuration_type)?,
        )?;
        // SAFETY: pointers come straight from the application.
        unsafe {
            write_array(
                &modes,
                environment_blend_mode_capacity_input,
                environment_blend_mode_count_output,
                environment_blend_modes,
                |mode, slot| *slot = blend_mode_to_xr(*mode),
            )?
        };
        Ok(Status::Success)
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrEnumerateViewConfigurations(
    instance: xr::Instance,
    system_id: xr::SystemId,
    view_configuration_type_capacity_input: u32,
    view_configuration_type_count_output: *mut u32,
    view_configuration_types: *mut xr::ViewConfigurationType,
) -> xr::Result {
    guard("xrEnumerateViewConfigurations", || {
        let owner = runtime().instance(instance.into_raw())?;
        let types = owner.view_configurations(system_id.into_raw())?;
        // SAFETY: pointers come straight from the application.
        unsafe {
            write_array(
                &types,
                view_configuration_type_capacity_input,
                view_configuration_type_count_output,
                view_configuration_types,
                |ty, slot| *slot = view_configuration_to_xr(*ty),
            )?
        };
        Ok(Status::Success)
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrGetViewConfigurationProperties(
    instance: xr::Instance,
    system_id: xr::SystemId,
    view_configuration_type: xr::ViewConfigurationType,
    configuration_properties: *mut xr::ViewConfigurationProperties,
) -> xr::Result {
    guard("xrGetViewConfigurationProperties", || {
        let owner = runtime().instance(instance.into_raw())?;
        let properties = owner.view_configuration_properties(
            system_id.into_raw(),
            view_configuration_from_xr(view_configuration_type)?,
        )?;
        // SAFETY: pointers come straight from the application.
        let out = unsafe {
            output(
                configuration_properties,
                xr::StructureType::VIEW_CONFIGURATION_PROPERTIES,
            )?
        };
        out.view_configuration_type = view_configuration_to_xr(properties.view_configuration_type);
        out.fov_mutable = properties.fov_mutable.into();
        Ok(Status::Success)
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrEnumerateViewConfigurationViews(
    instance: xr::Instance,
    system_id: xr::SystemId,
    view_configuration_type: xr::ViewConfigurationType,
    view_capacity_input: u32,
    view_count_output: *mut u32,
    views: *mut xr::ViewConfigurationView,
) -> xr::Result {
    guard("xrEnumerateViewConfigurationViews", || {
        let owner = runtime().instance(instance.into_raw())?;
        let config_views = owner.view_configuration_views(
            system_id.into_raw(),
            view_configuration_from_xr(view_configuration_type)?,
        )?;
        // SAFETY: pointers come straight from the application.
        unsafe {
            write_tagged_array(
                &config_views,
                view_capacity_input,
                view_count_output,
                views,
                xr::StructureType::VIEW_CONFIGURATION_VIEW,
                |view, slot| {
                    slot.recommended_image_rect_width = view.recommended_image_rect_width;
                    slot.max_image_rect_width = view.max_image_rect_width;
                    slot.recommended_image_rect_height = view.recommended_image_rect_height;
                    slot.max_image_rect_height = view.max_image_rect_height;
                    slot.recommended_swapchain_sample_count =
                        view.recommended_swapchain_sample_count;
                    slot.max_swapchain_sample_count = view.max_swapchain_sample_count;
                },
            )?
        };
        Ok(Status::Success)
    })
}

/// Report the supported OpenGL ES range. Must be called before `xrCreateSession`.
#[no_mangle]
pub unsafe extern "system" fn xrGetOpenGLESGraphicsRequirementsKHR(
    instance: xr::Instance,
    system_id: xr::SystemId,
    graphics_requirements: *mut GraphicsRequirementsOpenGLESKHR,
) -> xr::Result {
    debug!("xrGetOpenGLESGraphicsRequirementsKHR({:#x})", instance.into_raw());
    guard("xrGetOpenGLESGraphicsRequirementsKHR", || {
        let owner = runtime().instance(instance.into_raw())?;
        // SAFETY: pointers come straight from the application.
        let out = unsafe {
            output(
                graphics_requirements,
                xr::StructureType::GRAPHICS_REQUIREMENTS_OPENGL_ES_KHR,
            )?
        };
        let requirements = owner.graphics_requirements(system_id.into_raw())?;
        out.min_api_version_supported = version_to_xr(requirements.min_api_version);
        out.max_api_version_supported = version_to_xr(requirements.max_api_version);
        Ok(Status::Success)
    })
}
