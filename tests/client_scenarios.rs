//! End-to-end scenarios driving the runtime pieces together: dictionary
//! growth, timer ordering, and the client discovery state machine.

use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use opcua_runtime::client::{
    AppEvent, MachineState, SecureChannelConfig, StateMachine, Toolkit, wait_machine_over,
};
use opcua_runtime::collections::Dictionary;
use opcua_runtime::event::{EventDispatcher, TimerEvent, TimerManager};
use opcua_runtime::ua;

#[test]
fn dictionary_growth_and_shrink() {
    let mut dict: Dictionary<u32, u32> = Dictionary::new(u32::MAX);
    dict.set_tombstone_key(u32::MAX - 1).unwrap();
    assert_eq!(dict.capacity(), 16);

    for key in 1..=1024_u32 {
        dict.insert(key, key).unwrap();
    }
    assert_eq!(dict.len(), 1024);
    assert!(dict.capacity() > 16);

    for key in 1..=1024_u32 {
        dict.remove(&key).unwrap();
    }
    assert_eq!(dict.len(), 0);
    assert_eq!(dict.capacity(), 16);
}

#[test]
fn timer_ordering_and_latency() {
    let (sender, receiver) = mpsc::channel();
    let dispatcher = EventDispatcher::create_and_start(
        "timer scenario",
        Box::new(move |event, _elt_id, _params, _aux| {
            let _ = sender.send((event, Instant::now()));
        }),
    )
    .unwrap();

    let timers = Arc::new(TimerManager::new());
    let evaluator = timers.start_cyclic_evaluation(Duration::from_millis(10));

    let created = Instant::now();
    // Timer A first with the longer delay, then B with the shorter one.
    timers
        .create(
            TimerEvent::new(dispatcher.handle(), 100, 1, "timer A"),
            Duration::from_millis(100),
        )
        .unwrap();
    timers
        .create(
            TimerEvent::new(dispatcher.handle(), 50, 2, "timer B"),
            Duration::from_millis(50),
        )
        .unwrap();

    let (first, first_at) = receiver.recv_timeout(Duration::from_secs(2)).unwrap();
    let (second, _) = receiver.recv_timeout(Duration::from_secs(2)).unwrap();

    // B fires strictly before A, and never before its delay has passed.
    assert_eq!(first, 50);
    assert_eq!(second, 100);
    let elapsed = first_at.duration_since(created);
    assert!(elapsed >= Duration::from_millis(50), "fired early: {elapsed:?}");

    evaluator.stop();
    dispatcher.stop_and_join().unwrap();
}

fn one_endpoint_response() -> ua::Message {
    ua::Message::GetEndpointsResponse(ua::GetEndpointsResponse {
        response_header: ua::ResponseHeader::default(),
        endpoints: vec![ua::EndpointDescription {
            endpoint_url: ua::String::from("opc.tcp://localhost:4841"),
            server: ua::ApplicationDescription::default(),
            server_certificate: ua::ByteString::null(),
            security_mode: ua::MessageSecurityMode::None,
            security_policy_uri: ua::String::from(ua::SecurityPolicy::None.uri()),
            user_identity_tokens: vec![ua::UserTokenPolicy::anonymous()],
            transport_profile_uri: ua::String::null(),
            security_level: 0,
        }],
    })
}

#[test]
fn client_discovery_scenario() {
    // A listener that accepts the TCP connection but never answers: the
    // wire attempt parks on its read timeout while the test injects the
    // response by hand.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint_url = format!("opc.tcp://127.0.0.1:{}", listener.local_addr().unwrap().port());

    let machine = Arc::new(Mutex::new(StateMachine::new(1)));
    let toolkit = {
        let machine = Arc::clone(&machine);
        let toolkit_handle: Arc<std::sync::OnceLock<opcua_runtime::client::ToolkitHandle>> =
            Arc::new(std::sync::OnceLock::new());
        let callback_handle = Arc::clone(&toolkit_handle);
        let toolkit = Toolkit::initialize(Box::new(move |event, arg, response, aux| {
            if let Some(handle) = callback_handle.get() {
                machine.lock().dispatch_event(handle, event, arg, response, aux);
            }
        }))
        .unwrap();
        toolkit_handle.set(toolkit.handle()).unwrap();
        toolkit
    };

    let config = SecureChannelConfig::new(
        &endpoint_url,
        ua::SecurityPolicy::None,
        ua::MessageSecurityMode::None,
        500,
    )
    .unwrap();
    let config_index = toolkit.add_secure_channel_config(config).unwrap();

    let request = ua::Message::GetEndpointsRequest(ua::GetEndpointsRequest {
        request_header: ua::RequestHeader::default(),
        endpoint_url: ua::String::from(endpoint_url.as_str()),
        locale_ids: Vec::new(),
        profile_uris: Vec::new(),
    });
    machine
        .lock()
        .start_discovery(&toolkit.handle(), config_index, request)
        .unwrap();
    assert_eq!(machine.lock().state(), MachineState::WaitResponse);

    // Inject the discovery response carrying one endpoint.
    let consumed = machine.lock().dispatch_event(
        &toolkit.handle(),
        AppEvent::ReceivedDiscoveryResponse,
        0,
        Some(one_endpoint_response()),
        0,
    );

    assert_eq!(machine.lock().state(), MachineState::WaitFinished);
    assert!(machine.lock().is_over());
    let Some(ua::Message::GetEndpointsResponse(response)) = consumed else {
        panic!("response was not handed back to the caller");
    };
    assert_eq!(response.endpoints.len(), 1);
    assert_eq!(
        response.endpoints[0].security_policy_uri.as_str(),
        Some(ua::SecurityPolicy::None.uri())
    );

    // Terminal state sinks further events, including the late wire failure.
    machine.lock().dispatch_event(
        &toolkit.handle(),
        AppEvent::SendRequestFailed,
        0,
        None,
        0,
    );
    assert_eq!(machine.lock().state(), MachineState::WaitFinished);

    toolkit.clear();
    drop(listener);
}

#[test]
fn discovery_bad_service_result_aborts() {
    let toolkit = Toolkit::initialize(Box::new(|_, _, _, _| {})).unwrap();
    let mut machine = StateMachine::new(1);

    let config = SecureChannelConfig::new(
        "opc.tcp://localhost:4841",
        ua::SecurityPolicy::None,
        ua::MessageSecurityMode::None,
        60_000,
    )
    .unwrap();
    let config_index = toolkit.add_secure_channel_config(config).unwrap();
    machine
        .start_discovery(
            &toolkit.handle(),
            config_index,
            ua::Message::GetEndpointsRequest(ua::GetEndpointsRequest::default()),
        )
        .unwrap();

    let mut bad = ua::GetEndpointsResponse::default();
    bad.response_header.service_result = ua::StatusCode::BAD_TIMEOUT;
    machine.dispatch_event(
        &toolkit.handle(),
        AppEvent::ReceivedDiscoveryResponse,
        0,
        Some(ua::Message::GetEndpointsResponse(bad)),
        0,
    );
    assert_eq!(machine.state(), MachineState::Abort);

    toolkit.clear();
}

#[test]
fn wait_machine_over_times_out() {
    let machine = Mutex::new(StateMachine::new(1));
    let started = Instant::now();
    assert!(!wait_machine_over(&machine, 10, 50));
    assert!(started.elapsed() >= Duration::from_millis(50));
}
