//! Integration test: instance creation, system queries and session limits

use wxr_core::config::RuntimeConfig;
use wxr_core::XrError;
use wxr_runtime::enumerate::{two_call, Enumerated};
use wxr_runtime::event::{Event, EventQueue, EVENT_QUEUE_CAPACITY};
use wxr_runtime::instance::{
    supported_extensions, CURRENT_API_VERSION, GLES_EXTENSION_NAME, GLES_REQUIREMENTS, SYSTEM_ID,
};
use wxr_runtime::types::{
    ApiVersion, ApplicationInfo, EnvironmentBlendMode, FormFactor, GlesBinding,
    InstanceCreateInfo, SessionState, ViewConfigurationType,
};
use wxr_runtime::Runtime;

fn create_info() -> InstanceCreateInfo {
    InstanceCreateInfo {
        application_info: Some(ApplicationInfo {
            application_name: "instance-test".to_string(),
            application_version: 3,
            engine_name: "none".to_string(),
            engine_version: 0,
            api_version: CURRENT_API_VERSION,
        }),
        enabled_extensions: vec![GLES_EXTENSION_NAME.to_string()],
        ..Default::default()
    }
}

fn binding() -> Option<GlesBinding> {
    Some(GlesBinding {
        display: 0x10,
        config: 0x20,
        context: 0x30,
    })
}

#[test]
fn test_single_instance_limit() {
    let (runtime, _backend) = Runtime::headless(RuntimeConfig::default());

    let first = runtime.create_instance(&create_info()).unwrap();
    assert!(matches!(
        runtime.create_instance(&create_info()),
        Err(XrError::LimitReached(_))
    ));

    runtime.destroy_instance(first).unwrap();
    let second = runtime.create_instance(&create_info()).unwrap();
    assert_ne!(first, second);

    // The old handle is stale even though its slot was reused.
    assert!(matches!(
        runtime.instance(first),
        Err(XrError::HandleInvalid(_))
    ));
    assert!(matches!(
        runtime.destroy_instance(first),
        Err(XrError::HandleInvalid(_))
    ));
}

#[test]
fn test_create_instance_rejections() {
    let (runtime, _backend) = Runtime::headless(RuntimeConfig::default());

    let mut info = create_info();
    info.create_flags = 1;
    assert!(matches!(
        runtime.create_instance(&info),
        Err(XrError::ValidationFailure(_))
    ));

    let mut info = create_info();
    info.application_info = None;
    assert!(matches!(
        runtime.create_instance(&info),
        Err(XrError::ValidationFailure(_))
    ));

    let mut info = create_info();
    info.enabled_api_layers = vec!["XR_APILAYER_LUNARG_core_validation".to_string()];
    assert_eq!(
        runtime.create_instance(&info),
        Err(XrError::ApiLayerNotPresent)
    );

    let mut info = create_info();
    info.enabled_extensions.push("XR_EXT_hand_tracking".to_string());
    assert_eq!(
        runtime.create_instance(&info),
        Err(XrError::ExtensionNotPresent("XR_EXT_hand_tracking".to_string()))
    );

    let mut info = create_info();
    info.enabled_extensions.clear();
    assert!(matches!(
        runtime.create_instance(&info),
        Err(XrError::InitializationFailed(_))
    ));

    let mut info = create_info();
    if let Some(app) = info.application_info.as_mut() {
        app.api_version = ApiVersion::new(2, 0, 0);
    }
    assert!(matches!(
        runtime.create_instance(&info),
        Err(XrError::ApiVersionUnsupported(_))
    ));

    assert_eq!(runtime.object_counts().instances, 0);
}

#[test]
fn test_instance_properties_and_extensions() {
    let (runtime, _backend) = Runtime::headless(RuntimeConfig::default());
    let handle = runtime.create_instance(&create_info()).unwrap();
    let instance = runtime.instance(handle).unwrap();

    assert_eq!(instance.properties().runtime_name, "wxr");
    assert_eq!(instance.application().application_version, 3);
    assert_eq!(instance.enabled_extensions(), &[GLES_EXTENSION_NAME.to_string()]);
    assert_eq!(supported_extensions(), vec![(GLES_EXTENSION_NAME, 8)]);
}

#[test]
fn test_system_queries() {
    let (runtime, _backend) = Runtime::headless(RuntimeConfig::default());
    let instance = runtime
        .instance(runtime.create_instance(&create_info()).unwrap())
        .unwrap();

    assert_eq!(
        instance.get_system(FormFactor::HeadMountedDisplay),
        Ok(SYSTEM_ID)
    );
    assert_eq!(
        instance.get_system(FormFactor::HandheldDisplay),
        Err(XrError::FormFactorUnsupported)
    );
    assert_eq!(instance.check_system(SYSTEM_ID + 1), Err(XrError::SystemInvalid));

    let system = instance.system(SYSTEM_ID).unwrap();
    assert_eq!(system.max_layer_count, 16);
    assert!(system.orientation_tracking && system.position_tracking);

    assert_eq!(
        instance.view_configurations(SYSTEM_ID).unwrap(),
        vec![ViewConfigurationType::PrimaryStereo]
    );
    let views = instance
        .view_configuration_views(SYSTEM_ID, ViewConfigurationType::PrimaryStereo)
        .unwrap();
    assert_eq!(views.len(), 2);
    assert_eq!(views[0].recommended_image_rect_width, 1440);
    assert_eq!(
        instance.view_configuration_views(SYSTEM_ID, ViewConfigurationType::PrimaryMono),
        Err(XrError::ViewConfigurationTypeUnsupported)
    );
    assert_eq!(
        instance
            .environment_blend_modes(SYSTEM_ID, ViewConfigurationType::PrimaryStereo)
            .unwrap(),
        vec![EnvironmentBlendMode::Opaque]
    );
    assert!(
        !instance
            .view_configuration_properties(SYSTEM_ID, ViewConfigurationType::PrimaryStereo)
            .unwrap()
            .fov_mutable
    );
}

#[test]
fn test_alpha_blend_is_advertised_when_configured() {
    let mut config = RuntimeConfig::default();
    config.display.alpha_blend = true;
    let (runtime, _backend) = Runtime::headless(config);
    let instance = runtime
        .instance(runtime.create_instance(&create_info()).unwrap())
        .unwrap();
    assert_eq!(
        instance
            .environment_blend_modes(SYSTEM_ID, ViewConfigurationType::PrimaryStereo)
            .unwrap(),
        vec![EnvironmentBlendMode::Opaque, EnvironmentBlendMode::AlphaBlend]
    );
}

#[test]
fn test_session_creation_requirements() {
    let (runtime, _backend) = Runtime::headless(RuntimeConfig::default());
    let handle = runtime.create_instance(&create_info()).unwrap();
    let instance = runtime.instance(handle).unwrap();

    assert_eq!(
        runtime.create_session(handle, SYSTEM_ID, binding()),
        Err(XrError::GraphicsRequirementsCallMissing)
    );

    assert_eq!(instance.graphics_requirements(SYSTEM_ID), Ok(GLES_REQUIREMENTS));
    assert_eq!(GLES_REQUIREMENTS.min_api_version, ApiVersion::new(3, 0, 0));
    assert_eq!(GLES_REQUIREMENTS.max_api_version, ApiVersion::new(3, 2, 0));

    assert_eq!(
        runtime.create_session(handle, SYSTEM_ID + 1, binding()),
        Err(XrError::SystemInvalid)
    );
    assert!(matches!(
        runtime.create_session(handle, SYSTEM_ID, None),
        Err(XrError::GraphicsDeviceInvalid(_))
    ));

    let session = runtime.create_session(handle, SYSTEM_ID, binding()).unwrap();
    assert!(matches!(
        runtime.create_session(handle, SYSTEM_ID, binding()),
        Err(XrError::LimitReached(_))
    ));
    assert_eq!(
        runtime.session(session).unwrap().binding(),
        GlesBinding {
            display: 0x10,
            config: 0x20,
            context: 0x30,
        }
    );

    runtime.destroy_session(session).unwrap();
    let again = runtime.create_session(handle, SYSTEM_ID, binding()).unwrap();
    assert_ne!(session, again);
}

#[test]
fn test_foreign_handles_are_rejected() {
    let (runtime, _backend) = Runtime::headless(RuntimeConfig::default());
    let instance = runtime.create_instance(&create_info()).unwrap();

    assert!(matches!(runtime.session(instance), Err(XrError::HandleInvalid(_))));
    assert!(matches!(runtime.swapchain(instance), Err(XrError::HandleInvalid(_))));
    assert!(matches!(runtime.space(0), Err(XrError::HandleInvalid(_))));
    assert!(matches!(runtime.poll_event(0), Err(XrError::HandleInvalid(_))));
}

#[test]
fn test_poll_event_delivers_session_states() {
    let (runtime, _backend) = Runtime::headless(RuntimeConfig::default());
    let handle = runtime.create_instance(&create_info()).unwrap();
    runtime
        .instance(handle)
        .unwrap()
        .graphics_requirements(SYSTEM_ID)
        .unwrap();
    assert_eq!(runtime.poll_event(handle), Ok(None));

    let session = runtime.create_session(handle, SYSTEM_ID, binding()).unwrap();
    let mut states = Vec::new();
    while let Some(event) = runtime.poll_event(handle).unwrap() {
        match event {
            Event::SessionStateChanged {
                session: s,
                state,
                time,
            } => {
                assert_eq!(s, session);
                assert!(time > 0);
                states.push(state);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
    assert_eq!(states, vec![SessionState::Idle, SessionState::Ready]);
}

#[test]
fn test_event_queue_reports_lost_events() {
    let queue = EventQueue::new();
    let total = EVENT_QUEUE_CAPACITY + 6;
    for i in 0..total {
        queue.push(Event::SessionStateChanged {
            session: 1,
            state: SessionState::Idle,
            time: i as i64 + 1,
        });
    }
    assert_eq!(queue.poll(), Some(Event::EventsLost { count: 6 }));

    let mut delivered = Vec::new();
    while let Some(Event::SessionStateChanged { time, .. }) = queue.poll() {
        delivered.push(time);
    }
    assert_eq!(delivered.len(), EVENT_QUEUE_CAPACITY);
    assert_eq!(delivered[0], 7);
}

#[test]
fn test_two_call_enumeration() {
    let items = [10, 20, 30];

    assert_eq!(two_call(&items, 0), (3, Ok(Enumerated::Count(3))));
    assert_eq!(
        two_call(&items, 2),
        (
            3,
            Err(XrError::SizeInsufficient {
                required: 3,
                capacity: 2
            })
        )
    );
    // Asking again with the reported count never fails.
    let (count, _) = two_call(&items, 0);
    assert_eq!(two_call(&items, count), (3, Ok(Enumerated::Filled(&items[..]))));

    let empty: [u32; 0] = [];
    assert_eq!(two_call(&empty, 0), (0, Ok(Enumerated::Count(0))));
}
