use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use serde::Serialize;
use wxr_common::platform::{active_runtime_paths, platform_name, runtime_library_name};
use wxr_core::config::RuntimeConfig;

use crate::manifest::{RuntimeManifest, FILE_FORMAT_VERSION};
use crate::simulate;

/// Symbols the OpenXR loader looks up in a runtime library.
const LOADER_SYMBOLS: [&str; 2] = ["xrNegotiateLoaderRuntimeInterface", "xrGetInstanceProcAddr"];

/// Frames pushed through the in-process self test.
const SELF_TEST_FRAMES: u64 = 5;

// ── Check result types ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<String>,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.to_string(),
            details: Vec::new(),
        }
    }

    fn pass(name: &str, message: &str) -> Self {
        Self::new(name, CheckStatus::Pass, message)
    }

    fn fail(name: &str, message: &str) -> Self {
        Self::new(name, CheckStatus::Fail, message)
    }

    fn warn(name: &str, message: &str) -> Self {
        Self::new(name, CheckStatus::Warn, message)
    }

    fn skip(name: &str, message: &str) -> Self {
        Self::new(name, CheckStatus::Skip, message)
    }

    fn detail(mut self, detail: &str) -> Self {
        self.details.push(detail.to_string());
        self
    }
}

// ── Main entry point ────────────────────────────────────────────────────────

pub async fn run_verify(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let mut results: Vec<CheckResult> = Vec::new();

    let config = check_config(config_path, &mut results);
    let library = check_manifest(&mut results);

    match library {
        Some(path) => check_library(&path, &mut results),
        None => results.push(CheckResult::skip(
            "Runtime library",
            "No active runtime manifest, cannot locate the library",
        )),
    }

    let self_test_config = config.unwrap_or_default();
    let self_test =
        tokio::task::spawn_blocking(move || check_frame_loop(self_test_config)).await?;
    results.push(self_test);

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_results_pretty(&results);
    }

    if results
        .iter()
        .any(|r| matches!(r.status, CheckStatus::Fail))
    {
        std::process::exit(1);
    }

    Ok(())
}

// ── Check 1: Configuration ──────────────────────────────────────────────────

fn check_config(config_path: &Path, results: &mut Vec<CheckResult>) -> Option<RuntimeConfig> {
    if !config_path.exists() {
        results.push(
            CheckResult::warn(
                "Configuration",
                &format!("Config file not found: {}", config_path.display()),
            )
            .detail("Using default configuration")
            .detail("Create wxr.toml or set WXR_CONFIG"),
        );
        return None;
    }

    match RuntimeConfig::load(config_path) {
        Ok(config) => {
            let result = CheckResult::pass(
                "Configuration",
                &format!("Loaded from {}", config_path.display()),
            )
            .detail(&format!("Backend: {:?}", config.runtime.backend))
            .detail(&format!(
                "Display: {:.1} Hz, {}x{} per eye",
                config.display.refresh_rate_hz, config.display.view_width, config.display.view_height
            ))
            .detail(&format!(
                "Swapchain: {} images, {:?} when exhausted",
                config.swapchain.image_count, config.swapchain.exhausted_policy
            ));
            results.push(result);
            Some(config)
        }
        Err(e) => {
            results.push(CheckResult::fail(
                "Configuration",
                &format!("Failed to load {}: {}", config_path.display(), e),
            ));
            None
        }
    }
}

// ── Check 2: Active runtime manifest ────────────────────────────────────────

fn check_manifest(results: &mut Vec<CheckResult>) -> Option<PathBuf> {
    let candidates = active_runtime_paths();
    let Some(manifest_path) = candidates.iter().find(|p| p.exists()) else {
        let mut result = CheckResult::warn("Runtime manifest", "No active runtime manifest found");
        for path in &candidates {
            result = result.detail(&format!("Searched: {}", path.display()));
        }
        results.push(result.detail("Generate one with: wxr manifest --output <path>"));
        return None;
    };

    let manifest = match RuntimeManifest::load(manifest_path) {
        Ok(manifest) => manifest,
        Err(e) => {
            results.push(CheckResult::fail(
                "Runtime manifest",
                &format!("Cannot parse {}: {}", manifest_path.display(), e),
            ));
            return None;
        }
    };

    let library = manifest.resolved_library(manifest_path);
    let mut result = CheckResult::pass(
        "Runtime manifest",
        &format!("Active runtime manifest at {}", manifest_path.display()),
    )
    .detail(&format!("Library: {}", library.display()));
    if let Some(name) = &manifest.runtime.name {
        result = result.detail(&format!("Runtime name: {}", name));
    }

    if manifest.file_format_version != FILE_FORMAT_VERSION {
        result = CheckResult::warn(
            "Runtime manifest",
            &format!(
                "Unexpected file_format_version {} (expected {})",
                manifest.file_format_version, FILE_FORMAT_VERSION
            ),
        )
        .detail(&format!("Manifest: {}", manifest_path.display()));
    }

    let expected = runtime_library_name();
    if !manifest.runtime.library_path.ends_with(expected) {
        result = CheckResult::warn(
            "Runtime manifest",
            &format!("Active runtime is not WXR ({})", manifest.runtime.library_path),
        )
        .detail(&format!("Expected a path ending in {}", expected));
        results.push(result);
        return None;
    }

    results.push(result);
    Some(library)
}

// ── Check 3: Runtime library ────────────────────────────────────────────────

fn check_library(path: &Path, results: &mut Vec<CheckResult>) {
    if !path.exists() {
        results.push(
            CheckResult::fail(
                "Runtime library",
                &format!("Library not found: {}", path.display()),
            )
            .detail("Build with: cargo build --release -p wxr-openxr"),
        );
        return;
    }

    // SAFETY: loading runs the library's initialisers; the wxr runtime has
    // none beyond what the loader would trigger.
    let lib = match unsafe { libloading::Library::new(path) } {
        Ok(lib) => lib,
        Err(e) => {
            results.push(CheckResult::fail(
                "Runtime library",
                &format!("Cannot load {}: {}", path.display(), e),
            ));
            return;
        }
    };

    let missing: Vec<&str> = LOADER_SYMBOLS
        .iter()
        .copied()
        .filter(|symbol| {
            // SAFETY: only the symbol's presence is checked; it is never called.
            let found: Result<libloading::Symbol<unsafe extern "system" fn()>, _> =
                unsafe { lib.get(symbol.as_bytes()) };
            found.is_err()
        })
        .collect();

    if missing.is_empty() {
        results.push(
            CheckResult::pass("Runtime library", &format!("Loaded {}", path.display()))
                .detail(&format!("Exports {}", LOADER_SYMBOLS.join(", ")))
                .detail(&format!("Platform: {}", platform_name())),
        );
    } else {
        results.push(
            CheckResult::fail(
                "Runtime library",
                &format!("{} is missing loader entry points", path.display()),
            )
            .detail(&format!("Missing: {}", missing.join(", "))),
        );
    }
}

// ── Check 4: In-process frame loop ──────────────────────────────────────────

fn check_frame_loop(config: RuntimeConfig) -> CheckResult {
    let exit = AtomicBool::new(false);
    match simulate::drive(config, SELF_TEST_FRAMES, 0.0, &exit) {
        Ok(report) if report.submitted == SELF_TEST_FRAMES => CheckResult::pass(
            "Frame loop",
            &format!("{} frames composited on the headless display", report.submitted),
        ),
        Ok(report) => CheckResult::warn(
            "Frame loop",
            &format!(
                "{} of {} frames composited",
                report.submitted, SELF_TEST_FRAMES
            ),
        ),
        Err(e) => CheckResult::fail("Frame loop", &format!("Headless session failed: {}", e)),
    }
}

// ── Output formatters ───────────────────────────────────────────────────────

fn print_results_pretty(results: &[CheckResult]) {
    println!();
    println!("WXR Installation Verification");
    println!("=============================");
    println!();

    let mut pass_count = 0u32;
    let mut fail_count = 0u32;
    let mut warn_count = 0u32;

    for result in results {
        let (icon, color_start, color_end) = match result.status {
            CheckStatus::Pass => {
                pass_count += 1;
                ("[PASS]", "\x1b[32m", "\x1b[0m")
            }
            CheckStatus::Fail => {
                fail_count += 1;
                ("[FAIL]", "\x1b[31m", "\x1b[0m")
            }
            CheckStatus::Warn => {
                warn_count += 1;
                ("[WARN]", "\x1b[33m", "\x1b[0m")
            }
            CheckStatus::Skip => ("[SKIP]", "\x1b[90m", "\x1b[0m"),
        };

        println!(
            "  {}{}{} {} - {}",
            color_start, icon, color_end, result.name, result.message
        );

        for detail in &result.details {
            println!("         {}", detail);
        }
        println!();
    }

    println!("-------------------------------");
    println!(
        "  {} passed, {} failed, {} warnings",
        pass_count, fail_count, warn_count
    );
    println!();
}
