//! Demo client: browses the references of one node.

use std::process::ExitCode;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use opcua_runtime::client::{AppEvent, StateMachine, Toolkit, ToolkitHandle, wait_machine_over};
use opcua_runtime::{Result, config, ua};

fn main() -> ExitCode {
    env_logger::init();
    println!("OPC UA browse demo.");

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("# Error: Expects exactly 1 argument, the node id in the XML format");
        eprintln!("    [ns=<digits>;]<i, s, g or b>=<nodeid>");
        return ExitCode::FAILURE;
    }
    let Ok(node_id) = ua::NodeId::from_str(&args[1]) else {
        eprintln!("# Error: nodeid not recognized: \"{}\"", args[1]);
        return ExitCode::FAILURE;
    };

    match run(node_id) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("# Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn browse_request(node_id: &ua::NodeId) -> ua::Message {
    let mut description = ua::BrowseDescription::all_forward(node_id.clone());
    description.browse_direction = ua::BrowseDirection::Both;
    description.node_class_mask = 255;
    ua::Message::BrowseRequest(ua::BrowseRequest {
        request_header: ua::RequestHeader::default(),
        view: ua::ViewDescription::default(),
        requested_max_references_per_node: 100,
        nodes_to_browse: vec![description],
    })
}

fn print_browse_response(start: &ua::NodeId, response: &ua::BrowseResponse) -> bool {
    let service_result = response.response_header.service_result;
    if service_result != ua::StatusCode::GOOD {
        eprintln!("# Error: Browse failed with status code {service_result}.");
        return false;
    }

    println!("Browsed nodes:");
    let mut ok = true;
    for (i, result) in response.results.iter().enumerate() {
        if result.status_code != ua::StatusCode::GOOD {
            eprintln!(
                "# Error: Browse result {i} has status code {}.",
                result.status_code
            );
            ok = false;
            continue;
        }
        for reference in &result.references {
            let arrow = if reference.is_forward { "->" } else { "<-" };
            println!(
                "- {start} {arrow} {} \"{}\"",
                reference.node_id.node_id, reference.browse_name
            );
        }
        if reference_continuation_is_null(result) {
            println!("# Info: Continuation point null, no more References.");
        }
    }
    ok
}

fn reference_continuation_is_null(result: &ua::BrowseResult) -> bool {
    result.continuation_point.len() <= 0
}

fn run(node_id: ua::NodeId) -> Result<()> {
    let machine = Arc::new(Mutex::new(StateMachine::new(1)));
    let toolkit_handle: Arc<OnceLock<ToolkitHandle>> = Arc::new(OnceLock::new());
    let printed_ok = Arc::new(Mutex::new(false));

    let toolkit = {
        let machine = Arc::clone(&machine);
        let toolkit_handle = Arc::clone(&toolkit_handle);
        let printed_ok = Arc::clone(&printed_ok);
        let start_node = node_id.clone();
        Toolkit::initialize(Box::new(move |event, arg, response, aux| {
            let Some(handle) = toolkit_handle.get() else {
                return;
            };
            let consumed = machine.lock().dispatch_event(handle, event, arg, response, aux);
            if event == AppEvent::ReceivedSessionResponse {
                if let Some(ua::Message::BrowseResponse(response)) = consumed {
                    *printed_ok.lock() = print_browse_response(&start_node, &response);
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
    println!("# Info: Sending BrowseRequest.");
    machine
        .lock()
        .start_session(&toolkit.handle(), config_index, Some(browse_request(&node_id)))?;

    let finished = wait_machine_over(&machine, config::SLEEP_LENGTH_MS, config::SC_LIFETIME_MS);
    let success = finished
        && machine.lock().state() == opcua_runtime::client::MachineState::WaitFinished
        && *printed_ok.lock();

    if machine.lock().state() == opcua_runtime::client::MachineState::WaitFinished {
        let _ = machine.lock().stop_session(&toolkit.handle());
    }
    toolkit.clear();

    if success {
        Ok(())
    } else {
        Err(opcua_runtime::Error::Nok)
    }
}
