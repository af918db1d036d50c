//! Instance creation, properties, events and the string helpers.

use std::ffi::c_char;

use tracing::debug;
use wxr_core::{Status, XrError};
use wxr_runtime::event::Event;
use wxr_runtime::instance::supported_extensions;
use wxr_runtime::types::{ApplicationInfo, InstanceCreateInfo};

use crate::result::{guard, result_name, structure_type_name};
use crate::runtime;
use crate::util::{
    input, output, read_c_array, read_string_array, session_state_to_xr, version_from_xr,
    version_to_xr, write_c_string, write_out, write_tagged_array,
};

#[no_mangle]
pub unsafe extern "system" fn xrEnumerateApiLayerProperties(
    property_capacity_input: u32,
    property_count_output: *mut u32,
    properties: *mut xr::ApiLayerProperties,
) -> xr::Result {
    debug!("xrEnumerateApiLayerProperties({})", property_capacity_input);
    guard("xrEnumerateApiLayerProperties", || {
        let layers: [(); 0] = [];
        // SAFETY: pointers come straight from the application.
        unsafe {
            write_tagged_array(
                &layers,
                property_capacity_input,
                property_count_output,
                properties,
                xr::StructureType::API_LAYER_PROPERTIES,
                |_, _| {},
            )?
        };
        Ok(Status::Success)
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrEnumerateInstanceExtensionProperties(
    layer_name: *const c_char,
    property_capacity_input: u32,
    property_count_output: *mut u32,
    properties: *mut xr::ExtensionProperties,
) -> xr::Result {
    debug!("xrEnumerateInstanceExtensionProperties({})", property_capacity_input);
    guard("xrEnumerateInstanceExtensionProperties", || {
        if !layer_name.is_null() {
            return Err(XrError::ApiLayerNotPresent);
        }
        let extensions = supported_extensions();
        // SAFETY: pointers come straight from the application.
        unsafe {
            write_tagged_array(
                &extensions,
                property_capacity_input,
                property_count_output,
                properties,
                xr::StructureType::EXTENSION_PROPERTIES,
                |(name, version), slot| {
                    write_c_string(name, &mut slot.extension_name);
                    slot.extension_version = *version;
                },
            )?
        };
        Ok(Status::Success)
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrCreateInstance(
    create_info: *const xr::InstanceCreateInfo,
    instance: *mut xr::Instance,
) -> xr::Result {
    debug!("xrCreateInstance");
    guard("xrCreateInstance", || {
        // SAFETY: pointers come straight from the application.
        let ci = unsafe { input(create_info, xr::StructureType::INSTANCE_CREATE_INFO)? };
        if instance.is_null() {
            return Err(XrError::ValidationFailure("instance output pointer is null".into()));
        }
        let app = &ci.application_info;
        let application_name = read_c_array(&app.application_name);
        let application_info = (!application_name.is_empty()).then(|| ApplicationInfo {
            application_name,
            application_version: app.application_version,
            engine_name: read_c_array(&app.engine_name),
            engine_version: app.engine_version,
            api_version: version_from_xr(app.api_version),
        });
        let info = InstanceCreateInfo {
            create_flags: ci.create_flags.into_raw(),
            application_info,
            // SAFETY: counts and arrays come from the same struct.
            enabled_api_layers: unsafe {
                read_string_array(ci.enabled_api_layer_names, ci.enabled_api_layer_count)?
            },
            enabled_extensions: unsafe {
                read_string_array(ci.enabled_extension_names, ci.enabled_extension_count)?
            },
        };
        let handle = runtime().create_instance(&info)?;
        // SAFETY: checked non-null above.
        unsafe { write_out(instance, xr::Instance::from_raw(handle))? };
        Ok(Status::Success)
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrDestroyInstance(instance: xr::Instance) -> xr::Result {
    debug!("xrDestroyInstance({:#x})", instance.into_raw());
    guard("xrDestroyInstance", || {
        runtime().destroy_instance(instance.into_raw())?;
        Ok(Status::Success)
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrGetInstanceProperties(
    instance: xr::Instance,
    instance_properties: *mut xr::InstanceProperties,
) -> xr::Result {
    debug!("xrGetInstanceProperties({:#x})", instance.into_raw());
    guard("xrGetInstanceProperties", || {
        let owner = runtime().instance(instance.into_raw())?;
        // SAFETY: pointers come straight from the application.
        let out = unsafe { output(instance_properties, xr::StructureType::INSTANCE_PROPERTIES)? };
        let properties = owner.properties();
        out.runtime_version = version_to_xr(properties.runtime_version);
        write_c_string(&properties.runtime_name, &mut out.runtime_name);
        Ok(Status::Success)
    })
}

/// Copy the next queued event into the application's event buffer.
#[no_mangle]
pub unsafe extern "system" fn xrPollEvent(
    instance: xr::Instance,
    event_data: *mut xr::EventDataBuffer,
) -> xr::Result {
    guard("xrPollEvent", || {
        // SAFETY: pointers come straight from the application.
        let buffer = unsafe { output(event_data, xr::StructureType::EVENT_DATA_BUFFER)? };
        let Some(event) = runtime().poll_event(instance.into_raw())? else {
            return Ok(Status::EventUnavailable);
        };
        debug!("xrPollEvent -> {:?}", event);
        let buffer = buffer as *mut xr::EventDataBuffer;
        match event {
            Event::SessionStateChanged {
                session,
                state,
                time,
            } => {
                let out = xr::EventDataSessionStateChanged {
                    ty: xr::StructureType::EVENT_DATA_SESSION_STATE_CHANGED,
                    next: std::ptr::null(),
                    session: xr::Session::from_raw(session),
                    state: session_state_to_xr(state),
                    time: xr::Time::from_nanos(time),
                };
                // SAFETY: the event buffer is larger than any event struct.
                unsafe { (buffer as *mut xr::EventDataSessionStateChanged).write(out) };
            }
            Event::EventsLost { count } => {
                let out = xr::EventDataEventsLost {
                    ty: xr::StructureType::EVENT_DATA_EVENTS_LOST,
                    next: std::ptr::null(),
                    lost_event_count: count,
                };
                // SAFETY: as above.
                unsafe { (buffer as *mut xr::EventDataEventsLost).write(out) };
            }
        }
        Ok(Status::Success)
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrResultToString(
    instance: xr::Instance,
    value: xr::Result,
    buffer: *mut c_char,
) -> xr::Result {
    guard("xrResultToString", || {
        runtime().instance(instance.into_raw())?;
        if buffer.is_null() {
            return Err(XrError::ValidationFailure("null result string buffer".into()));
        }
        // SAFETY: the buffer is XR_MAX_RESULT_STRING_SIZE chars by contract.
        let buffer = unsafe { std::slice::from_raw_parts_mut(buffer, xr::MAX_RESULT_STRING_SIZE) };
        write_c_string(&result_name(value), buffer);
        Ok(Status::Success)
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrStructureTypeToString(
    instance: xr::Instance,
    value: xr::StructureType,
    buffer: *mut c_char,
) -> xr::Result {
    guard("xrStructureTypeToString", || {
        runtime().instance(instance.into_raw())?;
        if buffer.is_null() {
            return Err(XrError::ValidationFailure("null structure name buffer".into()));
        }
        // SAFETY: the buffer is XR_MAX_STRUCTURE_NAME_SIZE chars by contract.
        let buffer =
            unsafe { std::slice::from_raw_parts_mut(buffer, xr::MAX_STRUCTURE_NAME_SIZE) };
        write_c_string(&structure_type_name(value), buffer);
        Ok(Status::Success)
    })
}
