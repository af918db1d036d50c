/// Failure codes surfaced to the application. Each variant corresponds to one
/// `XR_ERROR_*` result; the ABI layer performs the final mapping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XrError {
    #[error("validation failure: {0}")]
    ValidationFailure(String),

    #[error("invalid handle: {0}")]
    HandleInvalid(String),

    #[error("call order invalid: {0}")]
    CallOrderInvalid(String),

    #[error("session not ready")]
    SessionNotReady,

    #[error("session not stopping")]
    SessionNotStopping,

    #[error("session already running")]
    SessionRunning,

    #[error("session not running")]
    SessionNotRunning,

    #[error("session lost")]
    SessionLost,

    #[error("size insufficient: required {required}, capacity {capacity}")]
    SizeInsufficient { required: u32, capacity: u32 },

    #[error("limit reached: {0}")]
    LimitReached(String),

    #[error("time invalid: {0}")]
    TimeInvalid(String),

    #[error("layer invalid: {0}")]
    LayerInvalid(String),

    #[error("layer limit exceeded: {count} > {max}")]
    LayerLimitExceeded { count: u32, max: u32 },

    #[error("function unsupported: {0}")]
    FunctionUnsupported(String),

    #[error("runtime failure: {0}")]
    RuntimeFailure(String),

    #[error("API layer not present")]
    ApiLayerNotPresent,

    #[error("extension not present: {0}")]
    ExtensionNotPresent(String),

    #[error("initialization failed: {0}")]
    InitializationFailed(String),

    #[error("API version unsupported: {0}")]
    ApiVersionUnsupported(String),

    #[error("system id invalid")]
    SystemInvalid,

    #[error("form factor unsupported")]
    FormFactorUnsupported,

    #[error("view configuration type unsupported")]
    ViewConfigurationTypeUnsupported,

    #[error("reference space unsupported")]
    ReferenceSpaceUnsupported,

    #[error("environment blend mode unsupported")]
    EnvironmentBlendModeUnsupported,

    #[error("swapchain format unsupported: {0:#x}")]
    SwapchainFormatUnsupported(i64),

    #[error("swapchain rect invalid: {0}")]
    SwapchainRectInvalid(String),

    #[error("graphics device invalid: {0}")]
    GraphicsDeviceInvalid(String),

    #[error("graphics requirements were not queried before session creation")]
    GraphicsRequirementsCallMissing,

    #[error("pose invalid")]
    PoseInvalid,
}

pub type XrResult<T> = Result<T, XrError>;

/// Non-error outcomes. These map to the positive `XR_*` success codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Success,
    Timeout,
    SessionLossPending,
    EventUnavailable,
    SpaceBoundsUnavailable,
}

/// Configuration loading failures. Kept apart from [`XrError`] because they
/// never reach the application through an API call.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
