//! Session lifecycle entry points.

use tracing::debug;
use wxr_core::{Status, XrError};

use crate::gles::find_binding;
use crate::result::guard;
use crate::runtime;
use crate::util::{input, view_configuration_from_xr, write_out};

/// Create a session. The `next` chain must carry an OpenGL ES graphics binding.
#[no_mangle]
pub unsafe extern "system" fn xrCreateSession(
    instance: xr::Instance,
    create_info: *const xr::SessionCreateInfo,
    session: *mut xr::Session,
) -> xr::Result {
    debug!("xrCreateSession({:#x})", instance.into_raw());
    guard("xrCreateSession", || {
        runtime().instance(instance.into_raw())?;
        // SAFETY: pointers come straight from the application.
        let info = unsafe { input(create_info, xr::StructureType::SESSION_CREATE_INFO)? };
        if info.create_flags.into_raw() != 0 {
            return Err(XrError::ValidationFailure(format!(
                "session create flags must be zero, got {:#x}",
                info.create_flags.into_raw()
            )));
        }
        if session.is_null() {
            return Err(XrError::ValidationFailure("session output pointer is null".into()));
        }
        // SAFETY: the chain hangs off an application-provided struct.
        let binding = unsafe { find_binding(info.next)? };
        let handle =
            runtime().create_session(instance.into_raw(), info.system_id.into_raw(), binding)?;
        // SAFETY: checked non-null above.
        unsafe { write_out(session, xr::Session::from_raw(handle))? };
        Ok(Status::Success)
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrDestroySession(session: xr::Session) -> xr::Result {
    debug!("xrDestroySession({:#x})", session.into_raw());
    guard("xrDestroySession", || {
        runtime().destroy_session(session.into_raw())?;
        Ok(Status::Success)
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrBeginSession(
    session: xr::Session,
    begin_info: *const xr::SessionBeginInfo,
) -> xr::Result {
    debug!("xrBeginSession({:#x})", session.into_raw());
    guard("xrBeginSession", || {
        let owner = runtime().session(session.into_raw())?;
        // SAFETY: pointers come straight from the application.
        let info = unsafe { input(begin_info, xr::StructureType::SESSION_BEGIN_INFO)? };
        owner.begin(view_configuration_from_xr(info.primary_view_configuration_type)?)?;
        Ok(Status::Success)
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrEndSession(session: xr::Session) -> xr::Result {
    debug!("xrEndSession({:#x})", session.into_raw());
    guard("xrEndSession", || {
        runtime().session(session.into_raw())?.end()?;
        Ok(Status::Success)
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrRequestExitSession(session: xr::Session) -> xr::Result {
    debug!("xrRequestExitSession({:#x})", session.into_raw());
    guard("xrRequestExitSession", || {
        runtime().session(session.into_raw())?.request_exit()?;
        Ok(Status::Success)
    })
}
