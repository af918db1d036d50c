//! Frame loop entry points and view location.

use tracing::debug;
use wxr_core::{Status, XrError, XrResult};
use wxr_runtime::types::{CompositionLayer, FrameEndInfo, ProjectionView};

use crate::result::guard;
use crate::runtime;
use crate::util::{
    blend_mode_from_xr, extent_from_xr, fov_from_xr, fov_to_xr, input, optional_input, output,
    pose_from_xr, pose_to_xr, sub_image_from_xr, view_configuration_from_xr, view_state_flags,
    write_tagged_array,
};

#[no_mangle]
pub unsafe extern "system" fn xrWaitFrame(
    session: xr::Session,
    frame_wait_info: *const xr::FrameWaitInfo,
    frame_state: *mut xr::FrameState,
) -> xr::Result {
    guard("xrWaitFrame", || {
        let owner = runtime().session(session.into_raw())?;
        // SAFETY: pointers come straight from the application.
        unsafe { optional_input(frame_wait_info, xr::StructureType::FRAME_WAIT_INFO)? };
        // SAFETY: as above.
        let out = unsafe { output(frame_state, xr::StructureType::FRAME_STATE)? };
        let state = owner.wait_frame()?;
        out.predicted_display_time = xr::Time::from_nanos(state.predicted_display_time);
        out.predicted_display_period = xr::Duration::from_nanos(state.predicted_display_period);
        out.should_render = state.should_render.into();
        debug!(
            "xrWaitFrame -> {} (render {})",
            state.predicted_display_time, state.should_render
        );
        Ok(Status::Success)
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrBeginFrame(
    session: xr::Session,
    frame_begin_info: *const xr::FrameBeginInfo,
) -> xr::Result {
    guard("xrBeginFrame", || {
        let owner = runtime().session(session.into_raw())?;
        // SAFETY: pointers come straight from the application.
        unsafe { optional_input(frame_begin_info, xr::StructureType::FRAME_BEGIN_INFO)? };
        owner.begin_frame()?;
        Ok(Status::Success)
    })
}

#[no_mangle]
pub unsafe extern "system" fn xrEndFrame(
    session: xr::Session,
    frame_end_info: *const xr::FrameEndInfo,
) -> xr::Result {
    guard("xrEndFrame", || {
        let owner = runtime().session(session.into_raw())?;
        // SAFETY: pointers come straight from the application.
        let info = unsafe { input(frame_end_info, xr::StructureType::FRAME_END_INFO)? };
        owner.check_frame_in_progress()?;
        let end = FrameEndInfo {
            display_time: info.display_time.as_nanos(),
            environment_blend_mode: blend_mode_from_xr(info.environment_blend_mode)?,
            // SAFETY: the layer array hangs off an application-provided struct.
            layers: unsafe { read_layers(info.layers, info.layer_count)? },
        };
        owner.end_frame(&end)?;
        Ok(Status::Success)
    })
}

/// Copy the application's layer list into runtime layers.
///
/// # Safety
/// `layers` must be null or hold `count` pointers to composition layer structs.
unsafe fn read_layers(
    layers: *const *const xr::CompositionLayerBaseHeader,
    count: u32,
) -> XrResult<Vec<CompositionLayer>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    if layers.is_null() {
        return Err(XrError::ValidationFailure(format!(
            "{} layers announced with a null array",
            count
        )));
    }
    // SAFETY: `layers` holds `count` pointers per the caller.
    let headers = unsafe { std::slice::from_raw_parts(layers, count as usize) };
    headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            // SAFETY: each entry is null or a valid layer struct.
            let Some(base) = (unsafe { header.as_ref() }) else {
                return Err(XrError::LayerInvalid(format!("layer {} is null", i)));
            };
            match base.ty {
                xr::StructureType::COMPOSITION_LAYER_PROJECTION => {
                    // SAFETY: the type tag identifies the full struct.
                    let layer = unsafe { &*(*header as *const xr::CompositionLayerProjection) };
                    Ok(CompositionLayer::Projection {
                        space: layer.space.into_raw(),
                        // SAFETY: views hang off the layer struct.
                        views: unsafe { read_projection_views(layer)? },
                    })
                }
                xr::StructureType::COMPOSITION_LAYER_QUAD => {
                    // SAFETY: the type tag identifies the full struct.
                    let layer = unsafe { &*(*header as *const xr::CompositionLayerQuad) };
                    Ok(CompositionLayer::Quad {
                        space: layer.space.into_raw(),
                        pose: pose_from_xr(&layer.pose),
                        size: extent_from_xr(&layer.size),
                        sub_image: sub_image_from_xr(&layer.sub_image),
                    })
                }
                other => Err(XrError::LayerInvalid(format!(
                    "layer {} has unsupported type {}",
                    i,
                    other.into_raw()
                ))),
            }
        })
        .collect()
}

/// # Safety
/// `layer.views` must be null or hold `layer.view_count` structs.
unsafe fn read_projection_views(
    layer: &xr::CompositionLayerProjection,
) -> XrResult<Vec<ProjectionView>> {
    if layer.view_count == 0 {
        return Ok(Vec::new());
    }
    if layer.views.is_null() {
        return Err(XrError::ValidationFailure(
            "projection layer has a null view array".into(),
        ));
    }
    // SAFETY: `views` holds `view_count` structs per the caller.
    let views = unsafe { std::slice::from_raw_parts(layer.views, layer.view_count as usize) };
    views
        .iter()
        .map(|view| {
            if view.ty != xr::StructureType::COMPOSITION_LAYER_PROJECTION_VIEW {
                return Err(XrError::ValidationFailure(format!(
                    "projection view has type {}",
                    view.ty.into_raw()
                )));
            }
            Ok(ProjectionView {
                pose: pose_from_xr(&view.pose),
                fov: fov_from_xr(&view.fov),
                sub_image: sub_image_from_xr(&view.sub_image),
            })
        })
        .collect()
}

#[no_mangle]
pub unsafe extern "system" fn xrLocateViews(
    session: xr::Session,
    view_locate_info: *const xr::ViewLocateInfo,
    view_state: *mut xr::ViewState,
    view_capacity_input: u32,
    view_count_output: *mut u32,
    views: *mut xr::View,
) -> xr::Result {
    guard("xrLocateViews", || {
        // SAFETY: pointers come straight from the application.
        let info = unsafe { input(view_locate_info, xr::StructureType::VIEW_LOCATE_INFO)? };
        // SAFETY: as above.
        let state = unsafe { output(view_state, xr::StructureType::VIEW_STATE)? };
        let (flags, located) = runtime().locate_views(
            session.into_raw(),
            view_configuration_from_xr(info.view_configuration_type)?,
            info.display_time.as_nanos(),
            info.space.into_raw(),
        )?;
        // SAFETY: as above.
        unsafe {
            write_tagged_array(
                &located,
                view_capacity_input,
                view_count_output,
                views,
                xr::StructureType::VIEW,
                |view, slot| {
                    slot.pose = pose_to_xr(&view.pose);
                    slot.fov = fov_to_xr(&view.fov);
                },
            )?
        };
        state.view_state_flags = view_state_flags(flags);
        Ok(Status::Success)
    })
}
