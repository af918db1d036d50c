use std::path::PathBuf;

/// File name of the runtime shared library produced by `wxr-openxr`.
pub fn runtime_library_name() -> &'static str {
    #[cfg(target_os = "windows")]
    { "wxr_openxr.dll" }
    #[cfg(target_os = "macos")]
    { "libwxr_openxr.dylib" }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    { "libwxr_openxr.so" }
}

/// File name used for the runtime manifest.
pub const MANIFEST_FILE_NAME: &str = "wxr_runtime.json";

/// Candidate locations of the loader's active-runtime manifest, most specific first.
///
/// `XR_RUNTIME_JSON` always wins when set.
pub fn active_runtime_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(path) = std::env::var("XR_RUNTIME_JSON") {
        paths.push(PathBuf::from(path));
    }
    #[cfg(unix)]
    {
        let config_home = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")));
        if let Ok(dir) = config_home {
            paths.push(dir.join("openxr/1/active_runtime.json"));
        }
        paths.push(PathBuf::from("/etc/xdg/openxr/1/active_runtime.json"));
    }
    paths
}

/// Directory searched for the system-wide runtime configuration.
pub fn system_config_dir() -> PathBuf {
    #[cfg(windows)]
    {
        let programdata = std::env::var("PROGRAMDATA")
            .unwrap_or_else(|_| r"C:\ProgramData".to_string());
        PathBuf::from(programdata).join("WXR")
    }
    #[cfg(not(windows))]
    {
        PathBuf::from("/etc/wxr")
    }
}

/// Returns the platform name string.
pub fn platform_name() -> &'static str {
    #[cfg(target_os = "windows")]
    { "windows" }
    #[cfg(target_os = "linux")]
    { "linux" }
    #[cfg(target_os = "macos")]
    { "macos" }
    #[cfg(target_os = "emscripten")]
    { "emscripten" }
    #[cfg(not(any(
        target_os = "windows",
        target_os = "linux",
        target_os = "macos",
        target_os = "emscripten"
    )))]
    { "unknown" }
}
