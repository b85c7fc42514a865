//! Demo client: writes the Value attribute of one node.

use std::process::ExitCode;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use opcua_runtime::client::{AppEvent, MachineState, StateMachine, Toolkit, ToolkitHandle, wait_machine_over};
use opcua_runtime::{Result, config, ua};

fn print_usage() {
    eprintln!("# Error: Expects exactly 3 arguments:");
    eprintln!("  - the node id XML formatted: [ns=<digits>;]<i, s, g or b>=<nodeid>,");
    eprintln!("  - -d or -i, the type of the value (64 bit double or 64 bit signed integer),");
    eprintln!("  - the value to write");
}

fn main() -> ExitCode {
    env_logger::init();
    println!("OPC UA write demo.");

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        print_usage();
        return ExitCode::FAILURE;
    }
    let Ok(node_id) = ua::NodeId::from_str(&args[1]) else {
        eprintln!("# Error: nodeid not recognized: \"{}\"", args[1]);
        return ExitCode::FAILURE;
    };
    let value = match args[2].as_str() {
        "-d" => match args[3].parse::<f64>() {
            Ok(value) => ua::Variant::Double(value),
            Err(_) => {
                eprintln!("# Error: invalid double value: \"{}\"", args[3]);
                return ExitCode::FAILURE;
            }
        },
        "-i" => match args[3].parse::<i64>() {
            Ok(value) => ua::Variant::Int64(value),
            Err(_) => {
                eprintln!("# Error: invalid integer value: \"{}\"", args[3]);
                return ExitCode::FAILURE;
            }
        },
        _ => {
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match run(node_id, value) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("# Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn write_request(node_id: &ua::NodeId, value: ua::Variant) -> ua::Message {
    ua::Message::WriteRequest(ua::WriteRequest {
        request_header: ua::RequestHeader::default(),
        nodes_to_write: vec![ua::WriteValue::new(node_id.clone(), value)],
    })
}

fn print_write_response(response: &ua::WriteResponse) -> bool {
    let service_result = response.response_header.service_result;
    if service_result != ua::StatusCode::GOOD {
        eprintln!("# Error: Write failed with status code {service_result}.");
        return false;
    }
    let mut ok = true;
    for status in &response.results {
        if status.is_bad() {
            eprintln!("# Error: Write result has status code {status}.");
            ok = false;
        } else {
            println!("Write result: {status}");
        }
    }
    ok
}

fn run(node_id: ua::NodeId, value: ua::Variant) -> Result<()> {
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
                if let Some(ua::Message::WriteResponse(response)) = consumed {
                    *printed_ok.lock() = print_write_response(&response);
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
    println!("# Info: Sending WriteRequest.");
    machine.lock().start_session(
        &toolkit.handle(),
        config_index,
        Some(write_request(&node_id, value)),
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
