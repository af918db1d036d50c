//! Plain data types exchanged between the runtime, its backend and the ABI layer.

/// Runtime time stamp in nanoseconds, compatible with `XrTime`. Always positive.
pub type Time = i64;

/// Nanosecond duration, compatible with `XrDuration`.
pub type Nanos = i64;

/// `XR_INFINITE_DURATION`
pub const INFINITE_DURATION: Nanos = i64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<Vec3> for glam::Vec3 {
    fn from(v: Vec3) -> Self {
        glam::Vec3::new(v.x, v.y, v.z)
    }
}

impl From<glam::Vec3> for Vec3 {
    fn from(v: glam::Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Self = Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `radians` about the Y (up) axis.
    pub fn from_yaw(radians: f32) -> Self {
        glam::Quat::from_rotation_y(radians).into()
    }
}

impl From<Quat> for glam::Quat {
    fn from(q: Quat) -> Self {
        glam::Quat::from_xyzw(q.x, q.y, q.z, q.w)
    }
}

impl From<glam::Quat> for Quat {
    fn from(q: glam::Quat) -> Self {
        Self::new(q.x, q.y, q.z, q.w)
    }
}

/// Rigid transform: rotate, then translate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub orientation: Quat,
    pub position: Vec3,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        orientation: Quat::IDENTITY,
        position: Vec3::ZERO,
    };

    pub const fn from_translation(position: Vec3) -> Self {
        Self {
            orientation: Quat::IDENTITY,
            position,
        }
    }

    fn parts(&self) -> (glam::Quat, glam::Vec3) {
        (self.orientation.into(), self.position.into())
    }

    fn from_parts(orientation: glam::Quat, position: glam::Vec3) -> Self {
        Self {
            orientation: orientation.into(),
            position: position.into(),
        }
    }

    /// `self ∘ other`: `other` expressed in the frame described by `self`.
    pub fn compose(&self, other: &Pose) -> Pose {
        let (q, p) = self.parts();
        let (other_q, other_p) = other.parts();
        Self::from_parts(q * other_q, p + q * other_p)
    }

    pub fn inverse(&self) -> Pose {
        let (q, p) = self.parts();
        let inv = q.conjugate();
        Self::from_parts(inv, -(inv * p))
    }

    /// Finite components and a unit orientation (1% tolerance).
    pub fn is_valid(&self) -> bool {
        let (q, p) = self.parts();
        q.is_finite() && p.is_finite() && (q.length() - 1.0).abs() <= 0.01
    }
}

/// Field of view half-angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Fov {
    pub angle_left: f32,
    pub angle_right: f32,
    pub angle_up: f32,
    pub angle_down: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Extent2Df {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect2Di {
    pub offset_x: i32,
    pub offset_y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormFactor {
    HeadMountedDisplay,
    HandheldDisplay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewConfigurationType {
    PrimaryMono,
    PrimaryStereo,
}

impl ViewConfigurationType {
    pub fn view_count(self) -> usize {
        match self {
            Self::PrimaryMono => 1,
            Self::PrimaryStereo => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvironmentBlendMode {
    Opaque,
    Additive,
    AlphaBlend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceSpaceType {
    View,
    Local,
    Stage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Ready,
    Synchronized,
    Visible,
    Focused,
    Stopping,
    LossPending,
    Exiting,
}

impl SessionState {
    /// The application should be rendering frames that will be displayed.
    pub fn is_visible(self) -> bool {
        matches!(self, Self::Visible | Self::Focused)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ApiVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u32,
}

impl ApiVersion {
    pub const fn new(major: u16, minor: u16, patch: u32) -> Self {
        Self { major, minor, patch }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationInfo {
    pub application_name: String,
    pub application_version: u32,
    pub engine_name: String,
    pub engine_version: u32,
    pub api_version: ApiVersion,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InstanceCreateInfo {
    pub create_flags: u64,
    pub application_info: Option<ApplicationInfo>,
    pub enabled_api_layers: Vec<String>,
    pub enabled_extensions: Vec<String>,
}

/// EGL objects named by the application's OpenGL ES graphics binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlesBinding {
    pub display: usize,
    pub config: usize,
    pub context: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwapchainDesc {
    pub create_flags: u64,
    pub usage_flags: u64,
    pub format: i64,
    pub sample_count: u32,
    pub width: u32,
    pub height: u32,
    pub face_count: u32,
    pub array_size: u32,
    pub mip_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocationFlags {
    pub orientation_valid: bool,
    pub position_valid: bool,
    pub orientation_tracked: bool,
    pub position_tracked: bool,
}

impl LocationFlags {
    pub const NONE: Self = Self {
        orientation_valid: false,
        position_valid: false,
        orientation_tracked: false,
        position_tracked: false,
    };

    /// Flags for a pose located relative to another. Valid only when both
    /// ends are valid; tracked when either end is actively tracked.
    pub fn relative_to(self, base: Self) -> Self {
        let orientation_valid = self.orientation_valid && base.orientation_valid;
        let position_valid = self.position_valid && base.position_valid;
        Self {
            orientation_valid,
            position_valid,
            orientation_tracked: orientation_valid
                && (self.orientation_tracked || base.orientation_tracked),
            position_tracked: position_valid && (self.position_tracked || base.position_tracked),
        }
    }

    pub fn is_valid(self) -> bool {
        self.orientation_valid && self.position_valid
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpaceLocation {
    pub pose: Pose,
    pub flags: LocationFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct View {
    pub pose: Pose,
    pub fov: Fov,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewConfigurationView {
    pub recommended_image_rect_width: u32,
    pub max_image_rect_width: u32,
    pub recommended_image_rect_height: u32,
    pub max_image_rect_height: u32,
    pub recommended_swapchain_sample_count: u32,
    pub max_swapchain_sample_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainSubImage {
    pub swapchain: u64,
    pub image_rect: Rect2Di,
    pub image_array_index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionView {
    pub pose: Pose,
    pub fov: Fov,
    pub sub_image: SwapchainSubImage,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompositionLayer {
    Projection {
        space: u64,
        views: Vec<ProjectionView>,
    },
    Quad {
        space: u64,
        pose: Pose,
        size: Extent2Df,
        sub_image: SwapchainSubImage,
    },
}

impl CompositionLayer {
    pub fn space(&self) -> u64 {
        match self {
            Self::Projection { space, .. } | Self::Quad { space, .. } => *space,
        }
    }

    pub fn sub_images(&self) -> Vec<SwapchainSubImage> {
        match self {
            Self::Projection { views, .. } => views.iter().map(|v| v.sub_image).collect(),
            Self::Quad { sub_image, .. } => vec![*sub_image],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameEndInfo {
    pub display_time: Time,
    pub environment_blend_mode: EnvironmentBlendMode,
    pub layers: Vec<CompositionLayer>,
}

/// Result of `WaitFrame`, consumed by the next `BeginFrame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameState {
    pub predicted_display_time: Time,
    pub predicted_display_period: Nanos,
    pub should_render: bool,
}
