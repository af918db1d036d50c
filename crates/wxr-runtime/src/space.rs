use std::sync::Arc;

use wxr_core::{XrError, XrResult};

use crate::backend::{PresentationBackend, TrackedPose};
use crate::types::{LocationFlags, Pose, ReferenceSpaceType, SpaceLocation, Time};

/// A reference space: a backend reference frame offset by a fixed pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Space {
    session: u64,
    ty: ReferenceSpaceType,
    pose_in_reference: Pose,
}

impl Space {
    pub fn reference(session: u64, ty: ReferenceSpaceType, pose_in_reference: Pose) -> XrResult<Self> {
        if !pose_in_reference.is_valid() {
            return Err(XrError::PoseInvalid);
        }
        Ok(Self {
            session,
            ty,
            pose_in_reference,
        })
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn reference_type(&self) -> ReferenceSpaceType {
        self.ty
    }

    pub fn pose_in_reference(&self) -> Pose {
        self.pose_in_reference
    }

    /// Origin of this space in the backend's world frame.
    pub fn world_pose(&self, backend: &dyn PresentationBackend, time: Time) -> Option<TrackedPose> {
        backend.locate_reference(self.ty, time).map(|tracked| TrackedPose {
            pose: tracked.pose.compose(&self.pose_in_reference),
            flags: tracked.flags,
        })
    }
}

/// Locate `space` relative to `base` at `time`.
///
/// Missing tracking is not an error: the result carries cleared flags and an
/// identity pose.
pub fn locate(
    space: &Space,
    base: &Space,
    time: Time,
    backend: &Arc<dyn PresentationBackend>,
) -> XrResult<SpaceLocation> {
    if time <= 0 {
        return Err(XrError::TimeInvalid(format!("locate time {}", time)));
    }
    if space.session != base.session {
        return Err(XrError::ValidationFailure(
            "spaces belong to different sessions".into(),
        ));
    }
    let located = space
        .world_pose(backend.as_ref(), time)
        .zip(base.world_pose(backend.as_ref(), time));
    Ok(match located {
        Some((target, origin)) => {
            let flags = target.flags.relative_to(origin.flags);
            if flags.is_valid() {
                SpaceLocation {
                    pose: origin.pose.inverse().compose(&target.pose),
                    flags,
                }
            } else {
                SpaceLocation {
                    pose: Pose::IDENTITY,
                    flags: LocationFlags::NONE,
                }
            }
        }
        None => SpaceLocation {
            pose: Pose::IDENTITY,
            flags: LocationFlags::NONE,
        },
    })
}
