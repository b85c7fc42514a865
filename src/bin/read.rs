//! Demo client: reads one attribute of one node.

use std::process::ExitCode;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use opcua_runtime::client::{AppEvent, MachineState, StateMachine, Toolkit, ToolkitHandle, wait_machine_over};
use opcua_runtime::{Result, config, ua};

fn print_usage() {
    eprintln!("# Error: Expects exactly 2 arguments:");
    eprintln!("  - the node id XML formatted: [ns=<digits>;]<i, s, g or b>=<nodeid>,");
    eprintln!("  - the AttributeId as an int in the range 1..22");
}

fn main() -> ExitCode {
    env_logger::init();
    println!("OPC UA read demo.");

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        print_usage();
        return ExitCode::FAILURE;
    }
    let Ok(node_id) = ua::NodeId::from_str(&args[1]) else {
        eprintln!("# Error: nodeid not recognized: \"{}\"", args[1]);
        return ExitCode::FAILURE;
    };
    let attribute_id = match args[2].parse::<u32>().ok().and_then(|id| ua::AttributeId::try_from(id).ok()) {
        Some(attribute_id) => attribute_id,
        None => {
            eprintln!("# Error: invalid attribute id: \"{}\"", args[2]);
            eprintln!("   Expecting an integer in the range 1..22");
            return ExitCode::FAILURE;
        }
    };

    match run(node_id, attribute_id) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("# Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn read_request(node_id: &ua::NodeId, attribute_id: ua::AttributeId) -> ua::Message {
    ua::Message::ReadRequest(ua::ReadRequest {
        request_header: ua::RequestHeader::default(),
        max_age: 0.0,
        timestamps_to_return: ua::TimestampsToReturn::Neither,
        nodes_to_read: vec![ua::ReadValueId::new(node_id.clone(), attribute_id)],
    })
}

fn print_read_response(response: &ua::ReadResponse) -> bool {
    let service_result = response.response_header.service_result;
    if service_result != ua::StatusCode::GOOD {
        eprintln!("# Error: Read failed with status code {service_result}.");
        return false;
    }
    let mut ok = true;
    for result in &response.results {
        if result.status.is_bad() {
            eprintln!("# Error: Read result has status code {}.", result.status);
            ok = false;
        } else {
            println!("Read value: {}", result.value);
        }
    }
    ok
}

fn run(node_id: ua::NodeId, attribute_id: ua::AttributeId) -> Result<()> {
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
            if event == AppEvent::ReceivedSessionResponse {
                if let Some(ua::Message::ReadResponse(response)) = consumed {
                    *printed_ok.lock() = print_read_response(&response);
                }
            }
        }))?
    };
    toolkit_handle
        .set(toolkit.handle())
        .expect("handle set once");

    let config_index = toolkit.add_secure_channel_config(config::new_secure_channel_config()?)?;
    println!("# Info: Toolkit configuration done.");
    println!("# Info: Opening Session.");
    println!("# Info: Sending ReadRequest.");
    machine.lock().start_session(
        &toolkit.handle(),
        config_index,
        Some(read_request(&node_id, attribute_id)),
    )?;

    let finished = wait_machine_over(&machine, config::SLEEP_LENGTH_MS, config::SC_LIFETIME_MS);
    let success =
        finished && machine.lock().state() == MachineState::WaitFinished && *printed_ok.lock();

    if machine.lock().state() == MachineState::WaitFinished {
        let _ = machine.lock().stop_session(&toolkit.handle());
    }
    toolkit.clear();

    if success {
        Ok(())
    } else {
        Err(opcua_runtime::Error::Nok)
    }
}
