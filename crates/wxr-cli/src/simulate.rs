//! Headless frame loop driven the way an OpenXR application would drive it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, info, warn};
use wxr_core::config::RuntimeConfig;
use wxr_runtime::event::Event;
use wxr_runtime::headless::GL_SRGB8_ALPHA8;
use wxr_runtime::instance::{CURRENT_API_VERSION, GLES_EXTENSION_NAME, SYSTEM_ID};
use wxr_runtime::types::{
    ApplicationInfo, CompositionLayer, EnvironmentBlendMode, FrameEndInfo, GlesBinding,
    InstanceCreateInfo, Pose, ProjectionView, Rect2Di, ReferenceSpaceType, SessionState,
    SwapchainDesc, SwapchainSubImage, ViewConfigurationType,
};
use wxr_runtime::{AcquireOutcome, Runtime};

const STEREO: ViewConfigurationType = ViewConfigurationType::PrimaryStereo;

#[derive(Debug, Default)]
pub struct SimulationReport {
    pub frames: u64,
    pub rendered: u64,
    pub injected_misses: u64,
    /// Frames whose prediction skipped at least one display period.
    pub skipped_periods: u64,
    pub submitted: u64,
    pub interrupted: bool,
    pub states: Vec<SessionState>,
    pub elapsed: Duration,
    pub period_ns: i64,
}

impl SimulationReport {
    pub fn print(&self) {
        println!();
        println!("WXR Headless Simulation");
        println!("=======================");
        println!();
        println!("  Frames:            {}", self.frames);
        println!("  Rendered:          {}", self.rendered);
        println!("  Composited:        {}", self.submitted);
        println!("  Injected misses:   {}", self.injected_misses);
        println!("  Skipped periods:   {}", self.skipped_periods);
        println!(
            "  Display period:    {:.3} ms",
            self.period_ns as f64 / 1_000_000.0
        );
        if self.frames > 0 {
            println!(
                "  Mean frame time:   {:.3} ms",
                self.elapsed.as_secs_f64() * 1000.0 / self.frames as f64
            );
        }
        let states: Vec<String> = self.states.iter().map(|s| format!("{:?}", s)).collect();
        println!("  Session states:    {}", states.join(" -> "));
        if self.interrupted {
            println!();
            println!("  Interrupted; the session exited early.");
        }
        println!();
    }
}

/// Drive `frames` frames on a blocking thread. Ctrl-C asks the session to exit.
pub async fn run_simulate(
    config: RuntimeConfig,
    frames: u64,
    miss_rate: f64,
) -> anyhow::Result<SimulationReport> {
    let exit = Arc::new(AtomicBool::new(false));

    let exit_on_signal = Arc::clone(&exit);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, requesting session exit");
            exit_on_signal.store(true, Ordering::Release);
        }
    });

    tokio::task::spawn_blocking(move || drive(config, frames, miss_rate, &exit)).await?
}

/// Run the full instance / session / frame-loop lifecycle against a fresh
/// headless runtime.
pub fn drive(
    config: RuntimeConfig,
    frames: u64,
    miss_rate: f64,
    exit: &AtomicBool,
) -> anyhow::Result<SimulationReport> {
    let view_width = config.display.view_width;
    let view_height = config.display.view_height;
    let (runtime, backend) = Runtime::headless(config);
    let mut report = SimulationReport {
        period_ns: backend.config().display_period_ns(),
        ..Default::default()
    };

    let instance = runtime.create_instance(&InstanceCreateInfo {
        application_info: Some(ApplicationInfo {
            application_name: "wxr-simulate".to_string(),
            application_version: 1,
            engine_name: "wxr".to_string(),
            engine_version: 1,
            api_version: CURRENT_API_VERSION,
        }),
        enabled_extensions: vec![GLES_EXTENSION_NAME.to_string()],
        ..Default::default()
    })?;
    runtime.instance(instance)?.graphics_requirements(SYSTEM_ID)?;
    let session_handle = runtime.create_session(
        instance,
        SYSTEM_ID,
        Some(GlesBinding {
            display: 1,
            config: 1,
            context: 1,
        }),
    )?;
    let session = runtime.session(session_handle)?;
    session.begin(STEREO)?;

    let space = runtime.create_reference_space(
        session_handle,
        ReferenceSpaceType::Local,
        Pose::IDENTITY,
    )?;
    let swapchain_handle = runtime.create_swapchain(
        session_handle,
        SwapchainDesc {
            format: GL_SRGB8_ALPHA8,
            sample_count: 1,
            width: view_width * 2,
            height: view_height,
            face_count: 1,
            array_size: 1,
            mip_count: 1,
            ..Default::default()
        },
    )?;
    let swapchain = runtime.swapchain(swapchain_handle)?;

    let mut rng = rand::thread_rng();
    let started = Instant::now();
    let mut last_display_time = None;

    while report.frames < frames {
        if exit.load(Ordering::Acquire) && !report.interrupted {
            report.interrupted = true;
            session.request_exit()?;
        }
        if miss_rate > 0.0 && rng.gen_bool(miss_rate) {
            let misses = rng.gen_range(1..=2);
            backend.inject_missed_frames(misses);
            report.injected_misses += u64::from(misses);
        }

        let frame = session.wait_frame()?;
        if session.state() == SessionState::Stopping {
            debug!("session stopping, leaving the frame loop");
            break;
        }
        session.begin_frame()?;
        report.frames += 1;

        if let Some(last) = last_display_time {
            if frame.predicted_display_time - last > report.period_ns + report.period_ns / 2 {
                report.skipped_periods += 1;
            }
        }
        last_display_time = Some(frame.predicted_display_time);

        let mut layers = Vec::new();
        if frame.should_render {
            match swapchain.acquire()? {
                AcquireOutcome::Acquired(_) => {
                    swapchain.wait(None)?;
                    swapchain.release()?;
                    let (_, views) = runtime.locate_views(
                        session_handle,
                        STEREO,
                        frame.predicted_display_time,
                        space,
                    )?;
                    layers.push(CompositionLayer::Projection {
                        space,
                        views: views
                            .iter()
                            .enumerate()
                            .map(|(eye, view)| ProjectionView {
                                pose: view.pose,
                                fov: view.fov,
                                sub_image: SwapchainSubImage {
                                    swapchain: swapchain_handle,
                                    image_rect: Rect2Di {
                                        offset_x: eye as i32 * view_width as i32,
                                        offset_y: 0,
                                        width: view_width as i32,
                                        height: view_height as i32,
                                    },
                                    image_array_index: 0,
                                },
                            })
                            .collect(),
                    });
                    report.rendered += 1;
                }
                AcquireOutcome::TimedOut => warn!("frame {}: acquire timed out", report.frames),
            }
        }
        session.end_frame(&FrameEndInfo {
            display_time: frame.predicted_display_time,
            environment_blend_mode: EnvironmentBlendMode::Opaque,
            layers,
        })?;
    }
    report.elapsed = started.elapsed();

    if session.state() != SessionState::Stopping {
        session.request_exit()?;
    }
    session.end()?;
    report.submitted = backend.submitted_frames();

    while let Some(event) = runtime.poll_event(instance)? {
        if let Event::SessionStateChanged { state, .. } = event {
            report.states.push(state);
        }
    }
    runtime.destroy_instance(instance)?;
    info!(
        "simulation finished: {} frames, {} composited",
        report.frames, report.submitted
    );
    Ok(report)
}
