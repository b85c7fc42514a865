//! Demo client: registers a server with the configured discovery server.

use std::process::ExitCode;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use opcua_runtime::client::{MachineState, StateMachine, Toolkit, ToolkitHandle, wait_machine_over};
use opcua_runtime::{Result, config, ua};

fn main() -> ExitCode {
    env_logger::init();
    println!("OPC UA register demo.");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("# Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn register_server_request() -> ua::Message {
    ua::Message::RegisterServerRequest(ua::RegisterServerRequest {
        request_header: ua::RequestHeader::default(),
        server: ua::RegisteredServer {
            server_uri: ua::String::from(config::APPLICATION_URI),
            product_uri: ua::String::from(config::PRODUCT_URI),
            server_names: vec![ua::LocalizedText::text_only(config::APPLICATION_NAME)],
            server_type: ua::ApplicationType::Server,
            gateway_server_uri: ua::String::null(),
            discovery_urls: vec![ua::String::from(config::ENDPOINT_URL)],
            semaphore_file_path: ua::String::null(),
            is_online: true,
        },
    })
}

fn run() -> Result<()> {
    let machine = Arc::new(Mutex::new(StateMachine::new(1)));
    let toolkit_handle: Arc<OnceLock<ToolkitHandle>> = Arc::new(OnceLock::new());
    let registered = Arc::new(Mutex::new(false));

    let toolkit = {
        let machine = Arc::clone(&machine);
        let toolkit_handle = Arc::clone(&toolkit_handle);
        let registered = Arc::clone(&registered);
        Toolkit::initialize(Box::new(move |event, arg, response, aux| {
            let Some(handle) = toolkit_handle.get() else {
                return;
            };
            let consumed = machine.lock().dispatch_event(handle, event, arg, response, aux);
            if let Some(ua::Message::RegisterServerResponse(response)) = consumed {
                let service_result = response.response_header.service_result;
                if service_result.is_good() {
                    println!("# Info: Server registered.");
                    *registered.lock() = true;
                } else {
                    eprintln!("# Error: Registration failed with status code {service_result}.");
                }
            }
        }))?
    };
    toolkit_handle
        .set(toolkit.handle())
        .expect("handle set once");

    let config_index = toolkit.add_secure_channel_config(config::new_secure_channel_config()?)?;
    println!("# Info: Toolkit configuration done.");
    println!("# Info: Sending RegisterServerRequest.");
    machine
        .lock()
        .start_discovery(&toolkit.handle(), config_index, register_server_request())?;

    let finished = wait_machine_over(&machine, config::SLEEP_LENGTH_MS, config::SC_LIFETIME_MS);
    let success =
        finished && machine.lock().state() == MachineState::WaitFinished && *registered.lock();
    toolkit.clear();

    if success {
        Ok(())
    } else {
        Err(opcua_runtime::Error::Nok)
    }
}
