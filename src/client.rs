//! Client side: secure channel configuration and transport, session
//! bookkeeping, the asynchronous toolkit, and the scenario state machine.

pub(crate) mod channel;
mod config;
mod session;
mod state_machine;
mod toolkit;

use std::time::{Duration, Instant};

use parking_lot::Mutex;

pub use self::{
    channel::SecureChannel,
    config::{CertificateHandle, KeyHandle, PkiHandle, SecureChannelConfig},
    session::{Session, SessionState},
    state_machine::{MachineState, StateMachine},
    toolkit::{AppCallback, AppEvent, Toolkit, ToolkitHandle},
};

/// Waits for a machine to reach a terminal state, sleeping in slices of
/// `sleep_ms` up to `lifetime_ms`. Returns false on timeout.
#[must_use]
pub fn wait_machine_over(machine: &Mutex<StateMachine>, sleep_ms: u64, lifetime_ms: u32) -> bool {
    let deadline = Instant::now() + Duration::from_millis(u64::from(lifetime_ms));
    loop {
        if machine.lock().is_over() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(sleep_ms));
    }
}
