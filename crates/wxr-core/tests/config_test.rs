//! Integration test: configuration parsing and validation

use wxr_core::config::{BackendKind, ExhaustedPolicy, RuntimeConfig};
use wxr_core::error::ConfigError;

#[test]
fn test_defaults_are_valid() {
    let config = RuntimeConfig::default();
    config.validate().unwrap();
    assert_eq!(config.runtime.name, "wxr");
    assert_eq!(config.runtime.backend, BackendKind::Headless);
    assert_eq!(config.swapchain.image_count, 3);
    assert_eq!(config.swapchain.exhausted_policy, ExhaustedPolicy::Fail);
    assert_eq!(config.display_period_ns(), 11_111_111);
    assert_eq!(config.runtime.log_level, None);
}

#[test]
fn test_empty_file_gives_defaults() {
    let config = RuntimeConfig::from_toml_str("").unwrap();
    assert_eq!(config.display.view_width, 1440);
    assert_eq!(config.frame.latency_frames, 1);
}

#[test]
fn test_partial_sections() {
    let config = RuntimeConfig::from_toml_str(
        r#"
        [runtime]
        name = "bench"

        [display]
        refresh_rate_hz = 60.0
        alpha_blend = true

        [swapchain]
        image_count = 4
        queue_depth = 2
        exhausted_policy = "block"
        "#,
    )
    .unwrap();
    assert_eq!(config.runtime.name, "bench");
    assert!(config.display.alpha_blend);
    assert_eq!(config.display.max_layer_count, 16);
    assert_eq!(config.display_period_ns(), 16_666_667);
    assert_eq!(config.swapchain.queue_depth, 2);
    assert_eq!(config.swapchain.exhausted_policy, ExhaustedPolicy::Block);
    assert_eq!(config.swapchain.acquire_timeout_ms, 250);
}

#[test]
fn test_invalid_values_are_rejected() {
    for text in [
        "[display]\nrefresh_rate_hz = 0.0",
        "[display]\nview_width = 0",
        "[display]\nview_width = 8192",
        "[display]\nmax_layer_count = 0",
        "[swapchain]\nimage_count = 1",
        "[swapchain]\nqueue_depth = 3",
        "[frame]\nlatency_frames = 0",
        "[tracking]\nhalf_fov_deg = 90.0",
    ] {
        assert!(
            matches!(RuntimeConfig::from_toml_str(text), Err(ConfigError::Invalid(_))),
            "accepted {:?}",
            text
        );
    }
}

#[test]
fn test_log_level_from_runtime_section() {
    let config =
        RuntimeConfig::from_toml_str("[runtime]\nlog_level = \"wxr_runtime=debug\"\n").unwrap();
    assert_eq!(config.runtime.log_level.as_deref(), Some("wxr_runtime=debug"));
    assert_eq!(config.runtime.name, "wxr");
}

#[test]
fn test_malformed_toml() {
    assert!(matches!(
        RuntimeConfig::from_toml_str("[display\nview_width = 1"),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        RuntimeConfig::from_toml_str("[runtime]\nbackend = \"vulkan\""),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_load_or_default() {
    let dir = std::env::temp_dir().join(format!("wxr-config-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let missing = dir.join("missing.toml");
    assert_eq!(RuntimeConfig::load_or_default(&missing).runtime.name, "wxr");

    let good = dir.join("good.toml");
    std::fs::write(&good, "[runtime]\nname = \"from-file\"\n").unwrap();
    assert_eq!(RuntimeConfig::load_or_default(&good).runtime.name, "from-file");

    let bad = dir.join("bad.toml");
    std::fs::write(&bad, "[swapchain]\nimage_count = 0\n").unwrap();
    assert_eq!(RuntimeConfig::load_or_default(&bad).swapchain.image_count, 3);

    std::fs::remove_dir_all(&dir).unwrap();
}
