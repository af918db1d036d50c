//! Integration test: session state machine and frame loop
//!
//! Runs sessions against the headless backend: lifecycle events, frame
//! bracket ordering, EndFrame validation, cancellation of blocked waits
//! and device loss.
//!
//! Run with: cargo test --test frame_loop_test -- --nocapture

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use wxr_core::config::RuntimeConfig;
use wxr_core::XrError;
use wxr_runtime::event::Event;
use wxr_runtime::headless::GL_SRGB8_ALPHA8;
use wxr_runtime::instance::{CURRENT_API_VERSION, GLES_EXTENSION_NAME, SYSTEM_ID};
use wxr_runtime::types::{
    ApplicationInfo, CompositionLayer, EnvironmentBlendMode, Extent2Df, Fov, FrameEndInfo,
    GlesBinding, InstanceCreateInfo, Pose, ProjectionView, Rect2Di, ReferenceSpaceType,
    SessionState, SwapchainDesc, SwapchainSubImage, ViewConfigurationType,
};
use wxr_runtime::{AcquireOutcome, BackendEvent, HeadlessBackend, Lease, Runtime, Session};

const STEREO: ViewConfigurationType = ViewConfigurationType::PrimaryStereo;

struct Fixture {
    runtime: Runtime,
    backend: Arc<HeadlessBackend>,
    instance: u64,
    session_handle: u64,
    session: Arc<Session>,
}

fn setup(config: RuntimeConfig) -> Fixture {
    let (runtime, backend) = Runtime::headless(config);
    let instance = runtime
        .create_instance(&InstanceCreateInfo {
            application_info: Some(ApplicationInfo {
                application_name: "frame-loop-test".to_string(),
                application_version: 1,
                engine_name: String::new(),
                engine_version: 0,
                api_version: CURRENT_API_VERSION,
            }),
            enabled_extensions: vec![GLES_EXTENSION_NAME.to_string()],
            ..Default::default()
        })
        .unwrap();
    runtime
        .instance(instance)
        .unwrap()
        .graphics_requirements(SYSTEM_ID)
        .unwrap();
    let session_handle = runtime
        .create_session(
            instance,
            SYSTEM_ID,
            Some(GlesBinding {
                display: 1,
                config: 1,
                context: 1,
            }),
        )
        .unwrap();
    let session = runtime.session(session_handle).unwrap();
    Fixture {
        runtime,
        backend,
        instance,
        session_handle,
        session,
    }
}

fn fast_config() -> RuntimeConfig {
    let mut config = RuntimeConfig::default();
    config.display.refresh_rate_hz = 240.0;
    config
}

/// Session begun and focused.
fn running(config: RuntimeConfig) -> Fixture {
    let fx = setup(config);
    fx.session.begin(STEREO).unwrap();
    assert_eq!(fx.session.state(), SessionState::Focused);
    fx
}

fn drain_states(fx: &Fixture) -> Vec<SessionState> {
    let mut states = Vec::new();
    while let Some(event) = fx.runtime.poll_event(fx.instance).unwrap() {
        if let Event::SessionStateChanged { session, state, .. } = event {
            assert_eq!(session, fx.session_handle);
            states.push(state);
        }
    }
    states
}

fn empty_frame(display_time: i64) -> FrameEndInfo {
    FrameEndInfo {
        display_time,
        environment_blend_mode: EnvironmentBlendMode::Opaque,
        layers: Vec::new(),
    }
}

fn swapchain_desc() -> SwapchainDesc {
    SwapchainDesc {
        format: GL_SRGB8_ALPHA8,
        sample_count: 1,
        width: 512,
        height: 512,
        face_count: 1,
        array_size: 1,
        mip_count: 1,
        ..Default::default()
    }
}

fn sub_image(swapchain: u64) -> SwapchainSubImage {
    SwapchainSubImage {
        swapchain,
        image_rect: Rect2Di {
            offset_x: 0,
            offset_y: 0,
            width: 512,
            height: 512,
        },
        image_array_index: 0,
    }
}

fn projection(space: u64, swapchain: u64, views: usize) -> CompositionLayer {
    CompositionLayer::Projection {
        space,
        views: (0..views)
            .map(|_| ProjectionView {
                pose: Pose::IDENTITY,
                fov: Fov::default(),
                sub_image: sub_image(swapchain),
            })
            .collect(),
    }
}

fn quad(space: u64, swapchain: u64) -> CompositionLayer {
    CompositionLayer::Quad {
        space,
        pose: Pose::IDENTITY,
        size: Extent2Df {
            width: 1.0,
            height: 1.0,
        },
        sub_image: sub_image(swapchain),
    }
}

fn render_into(fx: &Fixture, swapchain: u64) {
    let sc = fx.runtime.swapchain(swapchain).unwrap();
    let AcquireOutcome::Acquired(_) = sc.acquire().unwrap() else {
        panic!("acquire timed out");
    };
    sc.wait(None).unwrap();
    sc.release().unwrap();
}

#[test]
fn test_session_lifecycle_events() {
    let fx = setup(fast_config());
    assert_eq!(
        drain_states(&fx),
        vec![SessionState::Idle, SessionState::Ready]
    );

    fx.session.begin(STEREO).unwrap();
    assert_eq!(
        drain_states(&fx),
        vec![
            SessionState::Synchronized,
            SessionState::Visible,
            SessionState::Focused
        ]
    );

    fx.session.request_exit().unwrap();
    assert_eq!(
        drain_states(&fx),
        vec![
            SessionState::Visible,
            SessionState::Synchronized,
            SessionState::Stopping
        ]
    );

    fx.session.end().unwrap();
    assert_eq!(
        drain_states(&fx),
        vec![SessionState::Idle, SessionState::Exiting]
    );
    assert!(!fx.session.is_running());
}

#[test]
fn test_begin_session_preconditions() {
    let fx = setup(fast_config());

    assert_eq!(
        fx.session.begin(ViewConfigurationType::PrimaryMono),
        Err(XrError::ViewConfigurationTypeUnsupported)
    );
    fx.session.begin(STEREO).unwrap();
    assert_eq!(fx.session.begin(STEREO), Err(XrError::SessionRunning));

    // Stopped by a display that is going away: back to IDLE, and not READY
    // again until the display is back.
    fx.backend.set_available(false);
    fx.backend.inject_event(BackendEvent::StopRequested);
    assert_eq!(fx.session.state(), SessionState::Stopping);
    fx.session.end().unwrap();
    assert_eq!(fx.session.state(), SessionState::Idle);
    assert_eq!(fx.session.begin(STEREO), Err(XrError::SessionNotReady));

    fx.backend.set_available(true);
    fx.session.begin(STEREO).unwrap();
}

#[test]
fn test_session_restarts_after_display_stop() {
    let fx = running(fast_config());
    drain_states(&fx);

    fx.backend.inject_event(BackendEvent::StopRequested);
    assert_eq!(fx.session.state(), SessionState::Stopping);
    fx.session.end().unwrap();
    assert_eq!(fx.session.state(), SessionState::Ready);
    assert_eq!(
        drain_states(&fx),
        vec![
            SessionState::Visible,
            SessionState::Synchronized,
            SessionState::Stopping,
            SessionState::Idle,
            SessionState::Ready
        ]
    );

    fx.session.begin(STEREO).unwrap();
    assert_eq!(fx.session.state(), SessionState::Focused);
}

#[test]
fn test_end_session_preconditions() {
    let fx = setup(fast_config());
    assert_eq!(fx.session.end(), Err(XrError::SessionNotRunning));
    assert_eq!(fx.session.request_exit(), Err(XrError::SessionNotRunning));

    fx.session.begin(STEREO).unwrap();
    assert_eq!(fx.session.end(), Err(XrError::SessionNotStopping));
}

#[test]
fn test_focus_events_move_between_running_states() {
    let fx = running(fast_config());

    fx.backend.inject_event(BackendEvent::Unfocused);
    assert_eq!(fx.session.state(), SessionState::Visible);
    fx.backend.inject_event(BackendEvent::Hidden);
    assert_eq!(fx.session.state(), SessionState::Synchronized);

    let frame = fx.session.wait_frame().unwrap();
    assert!(!frame.should_render);

    fx.backend.inject_event(BackendEvent::Focused);
    assert_eq!(fx.session.state(), SessionState::Focused);
}

#[test]
fn test_frame_loop_predictions_increase() {
    let fx = running(fast_config());
    let nominal = fx.runtime.config().display_period_ns();

    let mut last = 0;
    for _ in 0..6 {
        let frame = fx.session.wait_frame().unwrap();
        assert!(frame.predicted_display_time > last);
        assert!(frame.predicted_display_period >= nominal);
        assert!(frame.should_render);
        last = frame.predicted_display_time;

        fx.session.begin_frame().unwrap();
        fx.session
            .end_frame(&empty_frame(frame.predicted_display_time))
            .unwrap();
    }
    assert_eq!(fx.backend.submitted_frames(), 6);
}

#[test]
fn test_frame_calls_require_running_session() {
    let fx = setup(fast_config());
    assert_eq!(fx.session.wait_frame(), Err(XrError::SessionNotRunning));
    assert!(matches!(
        fx.session.begin_frame(),
        Err(XrError::CallOrderInvalid(_))
    ));
}

#[test]
fn test_begin_frame_ordering() {
    let fx = running(fast_config());

    // No WaitFrame yet.
    assert!(matches!(
        fx.session.begin_frame(),
        Err(XrError::CallOrderInvalid(_))
    ));

    let frame = fx.session.wait_frame().unwrap();
    fx.session.begin_frame().unwrap();
    assert!(matches!(
        fx.session.begin_frame(),
        Err(XrError::CallOrderInvalid(_))
    ));
    assert!(fx.session.frame_in_progress());

    fx.session
        .end_frame(&empty_frame(frame.predicted_display_time))
        .unwrap();
    assert!(!fx.session.frame_in_progress());
    assert!(matches!(
        fx.session.end_frame(&empty_frame(frame.predicted_display_time)),
        Err(XrError::CallOrderInvalid(_))
    ));
}

#[test]
fn test_wait_frame_twice_without_begin() {
    let fx = running(fast_config());

    let first = fx.session.wait_frame().unwrap();
    let second = fx.session.wait_frame().unwrap();
    assert!(second.predicted_display_time > first.predicted_display_time);

    fx.session.begin_frame().unwrap();
    fx.session
        .end_frame(&empty_frame(second.predicted_display_time))
        .unwrap();
}

#[test]
fn test_end_frame_time_and_blend_validation() {
    let fx = running(fast_config());
    let frame = fx.session.wait_frame().unwrap();
    fx.session.begin_frame().unwrap();

    assert!(matches!(
        fx.session.end_frame(&empty_frame(0)),
        Err(XrError::TimeInvalid(_))
    ));
    assert!(matches!(
        fx.session
            .end_frame(&empty_frame(frame.predicted_display_time + 1)),
        Err(XrError::TimeInvalid(_))
    ));
    let additive = FrameEndInfo {
        environment_blend_mode: EnvironmentBlendMode::Additive,
        ..empty_frame(frame.predicted_display_time)
    };
    assert_eq!(
        fx.session.end_frame(&additive),
        Err(XrError::EnvironmentBlendModeUnsupported)
    );

    // Failed calls leave the frame open.
    assert!(fx.session.frame_in_progress());
    fx.session
        .end_frame(&empty_frame(frame.predicted_display_time))
        .unwrap();
}

#[test]
fn test_end_frame_with_unacquired_swapchain_is_layer_invalid() {
    let fx = running(fast_config());
    let space = fx
        .runtime
        .create_reference_space(fx.session_handle, ReferenceSpaceType::Local, Pose::IDENTITY)
        .unwrap();
    let swapchain = fx
        .runtime
        .create_swapchain(fx.session_handle, swapchain_desc())
        .unwrap();

    let frame = fx.session.wait_frame().unwrap();
    fx.session.begin_frame().unwrap();
    let state_before = fx.session.state();

    let info = FrameEndInfo {
        layers: vec![quad(space, swapchain)],
        ..empty_frame(frame.predicted_display_time)
    };
    assert!(matches!(
        fx.session.end_frame(&info),
        Err(XrError::LayerInvalid(_))
    ));
    assert_eq!(fx.session.state(), state_before);
    assert!(fx.session.frame_in_progress());
    assert_eq!(fx.backend.submitted_frames(), 0);

    render_into(&fx, swapchain);
    fx.session.end_frame(&info).unwrap();
    let submitted = fx.backend.submissions();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].images, vec![(swapchain, 0)]);
}

#[test]
fn test_failed_submit_keeps_frame_open_and_leases_unchanged() {
    let fx = running(fast_config());
    let space = fx
        .runtime
        .create_reference_space(fx.session_handle, ReferenceSpaceType::Local, Pose::IDENTITY)
        .unwrap();
    let swapchain = fx
        .runtime
        .create_swapchain(fx.session_handle, swapchain_desc())
        .unwrap();
    let sc = fx.runtime.swapchain(swapchain).unwrap();

    // Image 0 goes on screen.
    let frame = fx.session.wait_frame().unwrap();
    fx.session.begin_frame().unwrap();
    render_into(&fx, swapchain);
    fx.session
        .end_frame(&FrameEndInfo {
            layers: vec![quad(space, swapchain)],
            ..empty_frame(frame.predicted_display_time)
        })
        .unwrap();

    // Image 1 is released for the next frame, whose submit fails.
    let frame = fx.session.wait_frame().unwrap();
    fx.session.begin_frame().unwrap();
    render_into(&fx, swapchain);
    let info = FrameEndInfo {
        layers: vec![quad(space, swapchain)],
        ..empty_frame(frame.predicted_display_time)
    };
    let leases = sc.leases();
    assert_eq!(
        leases,
        vec![Lease::PendingPresent, Lease::PendingPresent, Lease::Free]
    );

    fx.backend.fail_submissions(1);
    assert!(matches!(
        fx.session.end_frame(&info),
        Err(XrError::RuntimeFailure(_))
    ));
    assert!(fx.session.frame_in_progress());
    assert_eq!(sc.leases(), leases);
    assert_eq!(fx.backend.submitted_frames(), 1);

    // Retrying commits the frame and retires image 0.
    fx.session.end_frame(&info).unwrap();
    assert!(!fx.session.frame_in_progress());
    assert_eq!(
        sc.leases(),
        vec![Lease::Free, Lease::PendingPresent, Lease::Free]
    );
    let submissions = fx.backend.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[1].images, vec![(swapchain, 1)]);
}

#[test]
fn test_end_frame_layer_validation() {
    let mut config = fast_config();
    config.display.max_layer_count = 2;
    let fx = running(config);
    let space = fx
        .runtime
        .create_reference_space(fx.session_handle, ReferenceSpaceType::Stage, Pose::IDENTITY)
        .unwrap();
    let swapchain = fx
        .runtime
        .create_swapchain(fx.session_handle, swapchain_desc())
        .unwrap();
    render_into(&fx, swapchain);

    let frame = fx.session.wait_frame().unwrap();
    fx.session.begin_frame().unwrap();
    let with = |layers: Vec<CompositionLayer>| FrameEndInfo {
        layers,
        ..empty_frame(frame.predicted_display_time)
    };

    assert_eq!(
        fx.session.end_frame(&with(vec![
            quad(space, swapchain),
            quad(space, swapchain),
            quad(space, swapchain)
        ])),
        Err(XrError::LayerLimitExceeded { count: 3, max: 2 })
    );

    assert!(matches!(
        fx.session.end_frame(&with(vec![quad(0xdead, swapchain)])),
        Err(XrError::LayerInvalid(_))
    ));
    assert!(matches!(
        fx.session.end_frame(&with(vec![quad(space, 0xbeef)])),
        Err(XrError::LayerInvalid(_))
    ));

    assert!(matches!(
        fx.session
            .end_frame(&with(vec![projection(space, swapchain, 1)])),
        Err(XrError::ValidationFailure(_))
    ));

    let mut out_of_bounds = sub_image(swapchain);
    out_of_bounds.image_rect.offset_x = 256;
    let layer = CompositionLayer::Quad {
        space,
        pose: Pose::IDENTITY,
        size: Extent2Df {
            width: 1.0,
            height: 1.0,
        },
        sub_image: out_of_bounds,
    };
    assert!(matches!(
        fx.session.end_frame(&with(vec![layer])),
        Err(XrError::SwapchainRectInvalid(_))
    ));

    let mut bad_index = sub_image(swapchain);
    bad_index.image_array_index = 1;
    let layer = CompositionLayer::Quad {
        space,
        pose: Pose::IDENTITY,
        size: Extent2Df {
            width: 1.0,
            height: 1.0,
        },
        sub_image: bad_index,
    };
    assert!(matches!(
        fx.session.end_frame(&with(vec![layer])),
        Err(XrError::ValidationFailure(_))
    ));

    fx.session
        .end_frame(&with(vec![projection(space, swapchain, 2)]))
        .unwrap();
}

#[test]
fn test_missed_frames_stretch_period() {
    let fx = running(fast_config());
    let nominal = fx.runtime.config().display_period_ns();

    let frame = fx.session.wait_frame().unwrap();
    fx.session.begin_frame().unwrap();
    fx.session
        .end_frame(&empty_frame(frame.predicted_display_time))
        .unwrap();

    fx.backend.inject_missed_frames(2);
    let frame = fx.session.wait_frame().unwrap();
    assert!(frame.predicted_display_period >= 3 * nominal);
}

#[test]
fn test_request_exit_unblocks_wait_frame() {
    let mut config = RuntimeConfig::default();
    config.display.refresh_rate_hz = 2.0;
    let fx = running(config);

    fx.session.wait_frame().unwrap();

    let session = Arc::clone(&fx.session);
    let requester = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        session.request_exit().unwrap();
    });

    let start = Instant::now();
    let frame = fx.session.wait_frame().unwrap();
    assert!(start.elapsed() < Duration::from_millis(400));
    assert!(!frame.should_render);
    requester.join().unwrap();

    // The bracket can still be completed while stopping.
    fx.session.begin_frame().unwrap();
    fx.session
        .end_frame(&empty_frame(frame.predicted_display_time))
        .unwrap();
    fx.session.end().unwrap();
}

#[test]
fn test_destroy_session_unblocks_wait_frame() {
    let mut config = RuntimeConfig::default();
    config.display.refresh_rate_hz = 2.0;
    let fx = running(config);
    fx.session.wait_frame().unwrap();

    let session = Arc::clone(&fx.session);
    let waiter = thread::spawn(move || session.wait_frame());
    thread::sleep(Duration::from_millis(50));

    let start = Instant::now();
    fx.runtime.destroy_session(fx.session_handle).unwrap();
    let result = waiter.join().unwrap();
    assert!(start.elapsed() < Duration::from_millis(400));
    assert!(matches!(result, Err(XrError::HandleInvalid(_))));
    assert!(matches!(
        fx.runtime.session(fx.session_handle),
        Err(XrError::HandleInvalid(_))
    ));
}

#[test]
fn test_device_loss_drives_loss_pending() {
    let fx = running(fast_config());
    fx.backend.lose_device();

    assert_eq!(fx.session.state(), SessionState::LossPending);
    assert_eq!(fx.session.wait_frame(), Err(XrError::SessionLost));
    assert_eq!(fx.session.begin_frame(), Err(XrError::SessionLost));
    assert!(drain_states(&fx).contains(&SessionState::LossPending));

    // Teardown still works.
    fx.runtime.destroy_session(fx.session_handle).unwrap();
}

#[test]
fn test_destroy_instance_destroys_session() {
    let fx = running(fast_config());
    fx.runtime
        .create_swapchain(fx.session_handle, swapchain_desc())
        .unwrap();
    fx.runtime
        .create_reference_space(fx.session_handle, ReferenceSpaceType::View, Pose::IDENTITY)
        .unwrap();

    fx.runtime.destroy_instance(fx.instance).unwrap();
    let counts = fx.runtime.object_counts();
    assert_eq!(counts.instances, 0);
    assert_eq!(counts.sessions, 0);
    assert_eq!(counts.spaces, 0);
    assert_eq!(counts.swapchains, 0);

    drop(fx.session);
    assert_eq!(fx.backend.live_images(), 0);
}
