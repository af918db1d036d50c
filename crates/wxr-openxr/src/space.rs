//! Reference spaces and space location.

use tracing::debug;
use wxr_core::Status;

use crate::result::guard;
use crate::runtime;
use crate::util::{
    extent_to_xr, input, output, pose_from_xr, pose_to_xr, reference_space_from_xr,
    reference_space_to_xr, space_location_flags, write_array, write_out,
};

#[no_mangle]
pub unsafe extern "system" fn xrEnumerateReferenceSpaces(
    session: xr::Session,
    space_capacity_input: u32,
    space_count_output: *mut u32,
    spaces: *mut xr::ReferenceSpaceType,
) -> xr::Result {
    guard("xrEnumerateReferenceSpaces", || {
        let types = runtime().session(session.into_raw())?.reference_space_types();
        // SAFETY: pointers come straight from the application.
        unsafe {
            write_array(
                &types,
                space_capacity_input,
                space_count_output,
                spaces,
                |ty, slot| *slot = reference_space_to_xr(*ty),
            )?
        };
        Ok(Status::Success)
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrCreateReferenceSpace(
    session: xr::Session,
    create_info: *const xr::ReferenceSpaceCreateInfo,
    space: *mut xr::Space,
) -> xr::Result {
    debug!("xrCreateReferenceSpace({:#x})", session.into_raw());
    guard("xrCreateReferenceSpace", || {
        // SAFETY: pointers come straight from the application.
        let info = unsafe { input(create_info, xr::StructureType::REFERENCE_SPACE_CREATE_INFO)? };
        let handle = runtime().create_reference_space(
            session.into_raw(),
            reference_space_from_xr(info.reference_space_type)?,
            pose_from_xr(&info.pose_in_reference_space),
        )?;
        // SAFETY: as above.
        unsafe { write_out(space, xr::Space::from_raw(handle))? };
        Ok(Status::Success)
    })
}

/// Stage bounds, or `XR_SPACE_BOUNDS_UNAVAILABLE` with a zero extent.
#[no_mangle]
pub unsafe extern "system" fn xrGetReferenceSpaceBoundsRect(
    session: xr::Session,
    reference_space_type: xr::ReferenceSpaceType,
    bounds: *mut xr::Extent2Df,
) -> xr::Result {
    guard("xrGetReferenceSpaceBoundsRect", || {
        let owner = runtime().session(session.into_raw())?;
        let (status, extent) =
            owner.reference_space_bounds(reference_space_from_xr(reference_space_type)?)?;
        // SAFETY: pointers come straight from the application.
        unsafe { write_out(bounds, extent_to_xr(extent))? };
        Ok(status)
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrLocateSpace(
    space: xr::Space,
    base_space: xr::Space,
    time: xr::Time,
    location: *mut xr::SpaceLocation,
) -> xr::Result {
    guard("xrLocateSpace", || {
        let located =
            runtime().locate_space(space.into_raw(), base_space.into_raw(), time.as_nanos())?;
        // SAFETY: pointers come straight from the application.
        let out = unsafe { output(location, xr::StructureType::SPACE_LOCATION)? };
        out.location_flags = space_location_flags(located.flags);
        out.pose = pose_to_xr(&located.pose);
        Ok(Status::Success)
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrDestroySpace(space: xr::Space) -> xr::Result {
    debug!("xrDestroySpace({:#x})", space.into_raw());
    guard("xrDestroySpace", || {
        runtime().destroy_space(space.into_raw())?;
        Ok(Status::Success)
    })
}
