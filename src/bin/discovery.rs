//! Demo client: fetches the endpoints of the configured server.

use std::process::ExitCode;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use opcua_runtime::client::{MachineState, StateMachine, Toolkit, ToolkitHandle, wait_machine_over};
use opcua_runtime::{Result, config, ua};

fn main() -> ExitCode {
    env_logger::init();
    println!("OPC UA discovery demo.");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("# Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn get_endpoints_request() -> ua::Message {
    ua::Message::GetEndpointsRequest(ua::GetEndpointsRequest {
        request_header: ua::RequestHeader::default(),
        endpoint_url: ua::String::from(config::ENDPOINT_URL),
        locale_ids: Vec::new(),
        profile_uris: Vec::new(),
    })
}

fn print_endpoints(response: &ua::GetEndpointsResponse) -> bool {
    println!("{} endpoints:", response.endpoints.len());
    for endpoint in &response.endpoints {
        println!("- {}", endpoint.endpoint_url);
        println!("    security policy: {}", endpoint.security_policy_uri);
        println!("    security mode: {}", endpoint.security_mode);
        for token in &endpoint.user_identity_tokens {
            println!("    user token policy: {}", token.policy_id);
        }
    }
    true
}

fn run() -> Result<()> {
    let machine = Arc::new(Mutex::new(StateMachine::new(1)));
    let toolkit_handle: Arc<OnceLock<ToolkitHandle>> = Arc::new(OnceLock::new());
    let printed_ok = Arc::new(Mutex::new(false));

    let toolkit = {
        let machine = Arc::clone(&machine);
        let toolkit_handle = Arc::clone(&toolkit_handle);
        let printed_ok = Arc::clone(&printed_ok);
        Toolkit::initialize(Box::new(move |event, arg, response, aux| {
            let Some(handle) = toolkit_handle.get() else {
                return;
            };
            let consumed = machine.lock().dispatch_event(handle, event, arg, response, aux);
            if let Some(ua::Message::GetEndpointsResponse(response)) = consumed {
                *printed_ok.lock() = print_endpoints(&response);
            }
        }))?
    };
    toolkit_handle
        .set(toolkit.handle())
        .expect("handle set once");

    let config_index = toolkit.add_secure_channel_config(config::new_secure_channel_config()?)?;
    println!("# Info: Toolkit configuration done.");
    println!("# Info: Sending GetEndpointsRequest.");
    machine
        .lock()
        .start_discovery(&toolkit.handle(), config_index, get_endpoints_request())?;

    let finished = wait_machine_over(&machine, config::SLEEP_LENGTH_MS, config::SC_LIFETIME_MS);
    let success =
        finished && machine.lock().state() == MachineState::WaitFinished && *printed_ok.lock();
    toolkit.clear();

    if success {
        Ok(())
    } else {
        Err(opcua_runtime::Error::Nok)
    }
}
