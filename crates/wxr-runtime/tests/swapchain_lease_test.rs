//! Integration test: swapchain image leasing
//!
//! Drives the acquire/wait/release protocol against the headless backend,
//! including both exhausted-ring policies and teardown while images are held.
//!
//! Run with: cargo test --test swapchain_lease_test -- --nocapture

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use proptest::prelude::*;
use wxr_core::config::{ExhaustedPolicy, RuntimeConfig};
use wxr_core::{Status, XrError};
use wxr_runtime::headless::GL_SRGB8_ALPHA8;
use wxr_runtime::instance::{CURRENT_API_VERSION, GLES_EXTENSION_NAME, SYSTEM_ID};
use wxr_runtime::types::{ApplicationInfo, GlesBinding, InstanceCreateInfo, SwapchainDesc};
use wxr_runtime::{AcquireOutcome, HeadlessBackend, Lease, Runtime, Swapchain};

struct Fixture {
    runtime: Runtime,
    backend: Arc<HeadlessBackend>,
    session: u64,
}

fn setup(config: RuntimeConfig) -> Fixture {
    let (runtime, backend) = Runtime::headless(config);
    let instance = runtime
        .create_instance(&InstanceCreateInfo {
            application_info: Some(ApplicationInfo {
                application_name: "swapchain-test".to_string(),
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
    let session = runtime
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
    Fixture {
        runtime,
        backend,
        session,
    }
}

fn config(image_count: u32, queue_depth: u32, policy: ExhaustedPolicy) -> RuntimeConfig {
    let mut config = RuntimeConfig::default();
    config.swapchain.image_count = image_count;
    config.swapchain.queue_depth = queue_depth;
    config.swapchain.exhausted_policy = policy;
    config.swapchain.acquire_timeout_ms = 50;
    config
}

fn desc() -> SwapchainDesc {
    SwapchainDesc {
        format: GL_SRGB8_ALPHA8,
        sample_count: 1,
        width: 1024,
        height: 1024,
        face_count: 1,
        array_size: 1,
        mip_count: 1,
        ..Default::default()
    }
}

fn create_swapchain(fx: &Fixture) -> (u64, Arc<Swapchain>) {
    let handle = fx.runtime.create_swapchain(fx.session, desc()).unwrap();
    (handle, fx.runtime.swapchain(handle).unwrap())
}

fn cycle(sc: &Swapchain) -> u32 {
    let AcquireOutcome::Acquired(index) = sc.acquire().unwrap() else {
        panic!("acquire timed out");
    };
    assert_eq!(sc.wait(Some(Duration::ZERO)).unwrap(), Status::Success);
    assert_eq!(sc.release().unwrap(), index);
    index
}

#[test]
fn test_acquire_wait_release_cycle() {
    let fx = setup(config(3, 1, ExhaustedPolicy::Fail));
    let (_, sc) = create_swapchain(&fx);

    assert_eq!(sc.image_count(), 3);
    assert_eq!(sc.textures().len(), 3);
    assert_eq!(fx.backend.live_images(), 3);

    assert_eq!(sc.acquire().unwrap(), AcquireOutcome::Acquired(0));
    assert_eq!(sc.leases(), vec![Lease::Acquired, Lease::Free, Lease::Free]);

    assert_eq!(sc.wait(Some(Duration::ZERO)).unwrap(), Status::Success);
    assert_eq!(sc.leases(), vec![Lease::Ready, Lease::Free, Lease::Free]);

    assert_eq!(sc.release().unwrap(), 0);
    assert_eq!(
        sc.leases(),
        vec![Lease::PendingPresent, Lease::Free, Lease::Free]
    );
    assert!(sc.has_released());
}

#[test]
fn test_images_leased_round_robin() {
    let fx = setup(config(3, 1, ExhaustedPolicy::Fail));
    let (_, sc) = create_swapchain(&fx);

    let order: Vec<u32> = (0..7)
        .map(|_| {
            let index = cycle(&sc);
            sc.present();
            index
        })
        .collect();
    assert_eq!(order, vec![0, 1, 2, 0, 1, 2, 0]);
}

#[test]
fn test_queue_depth_exhausted() {
    let fx = setup(config(3, 1, ExhaustedPolicy::Fail));
    let (_, sc) = create_swapchain(&fx);

    sc.acquire().unwrap();
    assert!(matches!(sc.acquire(), Err(XrError::CallOrderInvalid(_))));

    // A waited image still counts against the depth.
    sc.wait(None).unwrap();
    assert!(matches!(sc.acquire(), Err(XrError::CallOrderInvalid(_))));

    sc.release().unwrap();
    assert_eq!(sc.acquire().unwrap(), AcquireOutcome::Acquired(1));
}

#[test]
fn test_wait_and_release_out_of_order() {
    let fx = setup(config(3, 2, ExhaustedPolicy::Fail));
    let (_, sc) = create_swapchain(&fx);

    assert!(matches!(sc.wait(None), Err(XrError::CallOrderInvalid(_))));
    assert!(matches!(sc.release(), Err(XrError::CallOrderInvalid(_))));

    sc.acquire().unwrap();
    assert!(matches!(sc.release(), Err(XrError::CallOrderInvalid(_))));

    sc.acquire().unwrap();
    sc.wait(None).unwrap();
    // Only one image may be waited at a time.
    assert!(matches!(sc.wait(None), Err(XrError::CallOrderInvalid(_))));

    // The oldest acquired image was the one waited.
    assert_eq!(sc.release().unwrap(), 0);
    sc.wait(None).unwrap();
    assert_eq!(sc.release().unwrap(), 1);
}

#[test]
fn test_wait_zero_and_finite_timeouts() {
    let fx = setup(config(3, 1, ExhaustedPolicy::Fail));
    let (_, sc) = create_swapchain(&fx);

    fx.backend.hold_fences(true);
    sc.acquire().unwrap();

    assert_eq!(sc.wait(Some(Duration::ZERO)).unwrap(), Status::Timeout);
    assert_eq!(sc.leases()[0], Lease::Acquired);

    let start = Instant::now();
    assert_eq!(
        sc.wait(Some(Duration::from_millis(30))).unwrap(),
        Status::Timeout
    );
    assert!(start.elapsed() >= Duration::from_millis(30));
    assert_eq!(sc.leases()[0], Lease::Acquired);

    fx.backend.release_fences();
    assert_eq!(sc.wait(Some(Duration::ZERO)).unwrap(), Status::Success);
    assert_eq!(sc.leases()[0], Lease::Ready);
}

#[test]
fn test_infinite_wait_completes_when_fence_signals() {
    let fx = setup(config(3, 1, ExhaustedPolicy::Fail));
    let (_, sc) = create_swapchain(&fx);

    fx.backend.hold_fences(true);
    sc.acquire().unwrap();

    let backend = Arc::clone(&fx.backend);
    let signaller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        backend.release_fences();
    });

    assert_eq!(sc.wait(None).unwrap(), Status::Success);
    signaller.join().unwrap();
}

#[test]
fn test_fail_policy_when_ring_exhausted() {
    let fx = setup(config(2, 1, ExhaustedPolicy::Fail));
    let (_, sc) = create_swapchain(&fx);

    assert_eq!(cycle(&sc), 0);
    assert_eq!(sc.present(), Some(0));
    assert_eq!(cycle(&sc), 1);

    // Image 0 is still on screen until image 1 is presented.
    assert_eq!(sc.leases(), vec![Lease::PendingPresent, Lease::PendingPresent]);
    assert!(matches!(sc.acquire(), Err(XrError::CallOrderInvalid(_))));

    assert_eq!(sc.present(), Some(1));
    assert_eq!(sc.leases(), vec![Lease::Free, Lease::PendingPresent]);
    assert_eq!(sc.acquire().unwrap(), AcquireOutcome::Acquired(0));
}

#[test]
fn test_block_policy_waits_for_compositor() {
    let fx = setup(config(2, 1, ExhaustedPolicy::Block));
    let (_, sc) = create_swapchain(&fx);

    cycle(&sc);
    sc.present();
    cycle(&sc);

    let compositor = {
        let sc = Arc::clone(&sc);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            sc.present();
        })
    };

    assert_eq!(sc.acquire().unwrap(), AcquireOutcome::Acquired(0));
    compositor.join().unwrap();
}

#[test]
fn test_block_policy_times_out() {
    let fx = setup(config(2, 1, ExhaustedPolicy::Block));
    let (_, sc) = create_swapchain(&fx);

    cycle(&sc);
    sc.present();
    cycle(&sc);

    let start = Instant::now();
    assert_eq!(sc.acquire().unwrap(), AcquireOutcome::TimedOut);
    assert!(start.elapsed() >= Duration::from_millis(50));
}

#[test]
fn test_releasing_unpresented_image_frees_previous() {
    let fx = setup(config(3, 1, ExhaustedPolicy::Fail));
    let (_, sc) = create_swapchain(&fx);

    cycle(&sc);
    cycle(&sc);
    // Image 0 was superseded before it reached the compositor.
    assert_eq!(
        sc.leases(),
        vec![Lease::Free, Lease::PendingPresent, Lease::Free]
    );
}

#[test]
fn test_destroy_session_while_running_frees_all_leases() {
    let fx = setup(config(3, 2, ExhaustedPolicy::Fail));
    let (handle, sc) = create_swapchain(&fx);
    let session = fx.runtime.session(fx.session).unwrap();
    session.begin(wxr_runtime::types::ViewConfigurationType::PrimaryStereo).unwrap();

    cycle(&sc);
    sc.present();
    sc.acquire().unwrap();
    assert!(sc.leases().iter().any(|lease| *lease != Lease::Free));

    fx.runtime.destroy_session(fx.session).unwrap();

    assert!(sc.leases().iter().all(|lease| *lease == Lease::Free));
    assert!(matches!(
        fx.runtime.swapchain(handle),
        Err(XrError::HandleInvalid(_))
    ));
    assert!(matches!(sc.acquire(), Err(XrError::HandleInvalid(_))));

    // Backend images go away with the last reference.
    assert_eq!(fx.backend.live_images(), 3);
    drop(sc);
    assert_eq!(fx.backend.live_images(), 0);
}

#[test]
fn test_destroy_swapchain_cancels_blocked_wait() {
    let fx = setup(config(3, 1, ExhaustedPolicy::Fail));
    let (handle, sc) = create_swapchain(&fx);

    fx.backend.hold_fences(true);
    sc.acquire().unwrap();

    let waiter = {
        let sc = Arc::clone(&sc);
        thread::spawn(move || sc.wait(None))
    };
    thread::sleep(Duration::from_millis(20));
    fx.runtime.destroy_swapchain(handle).unwrap();

    let result = waiter.join().unwrap();
    assert!(matches!(result, Err(XrError::HandleInvalid(_))));
}

#[test]
fn test_swapchain_creation_rejects_bad_descriptions() {
    let fx = setup(RuntimeConfig::default());

    let bad_format = SwapchainDesc {
        format: 0x1908, // GL_RGBA, unsized
        ..desc()
    };
    assert_eq!(
        fx.runtime.create_swapchain(fx.session, bad_format),
        Err(XrError::SwapchainFormatUnsupported(0x1908))
    );

    let too_wide = SwapchainDesc {
        width: 1 << 20,
        ..desc()
    };
    assert!(matches!(
        fx.runtime.create_swapchain(fx.session, too_wide),
        Err(XrError::ValidationFailure(_))
    ));

    let bad_faces = SwapchainDesc {
        face_count: 2,
        ..desc()
    };
    assert!(matches!(
        fx.runtime.create_swapchain(fx.session, bad_faces),
        Err(XrError::ValidationFailure(_))
    ));

    assert_eq!(fx.backend.live_images(), 0);
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Acquire,
    Wait,
    Release,
    Present,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Acquire),
        Just(Op::Wait),
        Just(Op::Release),
        Just(Op::Present),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_lease_protocol_is_safe(ops in prop::collection::vec(op(), 1..48)) {
        let fx = setup(config(3, 2, ExhaustedPolicy::Fail));
        let (_, sc) = create_swapchain(&fx);

        let mut outstanding: HashSet<u32> = HashSet::new();
        let mut acquired: VecDeque<u32> = VecDeque::new();
        let mut waited: Option<u32> = None;
        let mut released: Option<u32> = None;
        let mut presenting: Option<u32> = None;
        let mut expected_next = 0u32;

        for op in ops {
            match op {
                Op::Acquire => {
                    if let Ok(AcquireOutcome::Acquired(index)) = sc.acquire() {
                        prop_assert!(!outstanding.contains(&index));
                        prop_assert_ne!(Some(index), presenting);
                        prop_assert_ne!(Some(index), released);
                        prop_assert_eq!(index, expected_next);
                        expected_next = (index + 1) % 3;
                        outstanding.insert(index);
                        acquired.push_back(index);
                    }
                }
                Op::Wait => {
                    if sc.wait(Some(Duration::ZERO)) == Ok(Status::Success) {
                        prop_assert!(waited.is_none());
                        waited = acquired.pop_front();
                        prop_assert!(waited.is_some());
                    }
                }
                Op::Release => match sc.release() {
                    Ok(index) => {
                        prop_assert_eq!(Some(index), waited.take());
                        outstanding.remove(&index);
                        released = Some(index);
                    }
                    Err(_) => prop_assert!(waited.is_none()),
                },
                Op::Present => {
                    let shown = sc.present();
                    prop_assert_eq!(shown, released);
                    if shown.is_some() {
                        presenting = shown;
                    }
                }
            }
        }
    }
}
