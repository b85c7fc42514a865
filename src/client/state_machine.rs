//! Client scenario state machine.
//!
//! One machine drives one logical client scenario: either a discovery
//! request, or a session with one service request. Events from the toolkit
//! callback are fed into [`StateMachine::dispatch_event()`]; terminal
//! states sink all further events.

use log::{error, info, warn};

use crate::client::toolkit::{AppEvent, ToolkitHandle};
use crate::{ua, Error, Result};

/// States of a client scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MachineState {
    #[default]
    Init,
    WaitActivation,
    WaitResponse,
    WaitFinished,
    Abort,
}

/// Drives discovery or session/request/close scenarios, one at a time.
#[derive(Debug)]
pub struct StateMachine {
    state: MachineState,
    /// Index of the secure channel configuration in use.
    sc_config_index: u32,
    /// Caller-chosen stable session id.
    session_internal_id: u32,
    /// Numeric OPC UA session id, assigned on activation.
    session_id: u32,
    /// True once the session is activated and no request is in flight.
    idle_for_request: bool,
    /// Request submitted automatically on activation.
    pending_request: Option<ua::Message>,
}

impl StateMachine {
    #[must_use]
    pub const fn new(session_internal_id: u32) -> Self {
        Self {
            state: MachineState::Init,
            sc_config_index: 0,
            session_internal_id,
            session_id: 0,
            idle_for_request: false,
            pending_request: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> MachineState {
        self.state
    }

    #[must_use]
    pub const fn session_id(&self) -> u32 {
        self.session_id
    }

    /// Whether the machine reached a terminal state.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        matches!(self.state, MachineState::WaitFinished | MachineState::Abort)
    }

    /// Whether the session is activated with no request in flight.
    #[must_use]
    pub const fn is_idle_for_request(&self) -> bool {
        self.idle_for_request
    }

    /// Starts a session scenario. When `request` is given it is submitted
    /// automatically once the session activates.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` outside the Init state, or as the toolkit
    /// call does.
    pub fn start_session(
        &mut self,
        toolkit: &ToolkitHandle,
        sc_config_index: u32,
        request: Option<ua::Message>,
    ) -> Result<()> {
        if self.state != MachineState::Init {
            return Err(Error::InvalidState);
        }
        toolkit.async_activate_session(sc_config_index, self.session_internal_id)?;
        self.sc_config_index = sc_config_index;
        self.pending_request = request;
        self.state = MachineState::WaitActivation;
        info!("opening session");
        Ok(())
    }

    /// Starts a discovery scenario: the request goes out on a one-shot
    /// channel without a session.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` outside the Init state, or as the toolkit
    /// call does.
    pub fn start_discovery(
        &mut self,
        toolkit: &ToolkitHandle,
        sc_config_index: u32,
        request: ua::Message,
    ) -> Result<()> {
        if self.state != MachineState::Init {
            return Err(Error::InvalidState);
        }
        toolkit.async_send_discovery_request(sc_config_index, request)?;
        self.sc_config_index = sc_config_index;
        self.state = MachineState::WaitResponse;
        Ok(())
    }

    /// Sends a request on the activated, idle session.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` unless the machine is idle for a request.
    pub fn send_request(&mut self, toolkit: &ToolkitHandle, request: ua::Message) -> Result<()> {
        if !self.idle_for_request {
            return Err(Error::InvalidState);
        }
        toolkit.async_send_request(self.session_internal_id, request)?;
        self.idle_for_request = false;
        self.state = MachineState::WaitResponse;
        Ok(())
    }

    /// Issues CloseSession and returns to Init, forgetting the session id.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` outside the WaitFinished state.
    pub fn stop_session(&mut self, toolkit: &ToolkitHandle) -> Result<()> {
        if self.state != MachineState::WaitFinished {
            return Err(Error::InvalidState);
        }
        toolkit.async_close_session(self.session_internal_id)?;
        self.session_id = 0;
        self.idle_for_request = false;
        self.state = MachineState::Init;
        Ok(())
    }

    /// Feeds one toolkit event into the machine.
    ///
    /// Returns the response body when the event completes the scenario, so
    /// the caller can consume it.
    pub fn dispatch_event(
        &mut self,
        toolkit: &ToolkitHandle,
        event: AppEvent,
        arg: u32,
        response: Option<ua::Message>,
        aux: usize,
    ) -> Option<ua::Message> {
        match self.state {
            MachineState::Init => {
                warn!("dispatching event {event:?} in init state");
                None
            }
            MachineState::WaitActivation => match event {
                AppEvent::ActivatedSession => {
                    self.session_id = u32::try_from(aux).unwrap_or(0);
                    let _ = arg;
                    info!("session activated");
                    match self.pending_request.take() {
                        Some(request) => {
                            if toolkit
                                .async_send_request(self.session_internal_id, request)
                                .is_err()
                            {
                                error!("request submission failed");
                                self.state = MachineState::Abort;
                            } else {
                                self.state = MachineState::WaitResponse;
                            }
                        }
                        None => {
                            // Stay here, idle: the caller may now send.
                            self.idle_for_request = true;
                        }
                    }
                    None
                }
                AppEvent::SessionActivationFailure => {
                    error!("failed session activation");
                    self.state = MachineState::Abort;
                    None
                }
                other => {
                    error!("in state WaitActivation, unexpected event {other:?}");
                    self.state = MachineState::Abort;
                    None
                }
            },
            MachineState::WaitResponse => match event {
                AppEvent::ReceivedDiscoveryResponse => {
                    let service_result = response
                        .as_ref()
                        .and_then(ua::Message::service_result)
                        .unwrap_or(ua::StatusCode::BAD_UNEXPECTED_ERROR);
                    if service_result.is_bad() {
                        error!("discovery service failed: {service_result}");
                        self.state = MachineState::Abort;
                        None
                    } else {
                        info!("response received");
                        self.state = MachineState::WaitFinished;
                        response
                    }
                }
                AppEvent::ReceivedSessionResponse => {
                    info!("response received");
                    self.state = MachineState::WaitFinished;
                    response
                }
                AppEvent::SendRequestFailed => {
                    error!("send request failed");
                    self.state = MachineState::Abort;
                    None
                }
                other => {
                    error!("in state WaitResponse, unexpected event {other:?}");
                    self.state = MachineState::Abort;
                    None
                }
            },
            MachineState::WaitFinished => {
                warn!("receiving event in wait finished state, ignoring");
                None
            }
            MachineState::Abort => {
                warn!("receiving event in abort state, ignoring");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Machines whose transitions need no toolkit round-trip are driven with
    // a toolkit whose dispatchers run for real; the wire is never touched
    // because events are injected directly.
    fn test_toolkit() -> crate::client::Toolkit {
        crate::client::Toolkit::initialize(Box::new(|_, _, _, _| {})).unwrap()
    }

    #[test]
    fn activation_failure_aborts() {
        let toolkit = test_toolkit();
        let config = crate::client::SecureChannelConfig::new(
            "opc.tcp://localhost:4841",
            ua::SecurityPolicy::None,
            ua::MessageSecurityMode::None,
            60_000,
        )
        .unwrap();
        let index = toolkit.add_secure_channel_config(config).unwrap();

        let mut machine = StateMachine::new(1);
        machine.start_session(&toolkit.handle(), index, None).unwrap();
        assert_eq!(machine.state(), MachineState::WaitActivation);

        machine.dispatch_event(
            &toolkit.handle(),
            AppEvent::SessionActivationFailure,
            1,
            None,
            0,
        );
        assert_eq!(machine.state(), MachineState::Abort);
        assert!(machine.is_over());
        toolkit.clear();
    }

    #[test]
    fn terminal_states_sink_events() {
        let toolkit = test_toolkit();
        let mut machine = StateMachine::new(1);
        // Drive to Abort through an unexpected start.
        machine.state = MachineState::Abort;
        for event in [
            AppEvent::ActivatedSession,
            AppEvent::ReceivedSessionResponse,
            AppEvent::SendRequestFailed,
        ] {
            machine.dispatch_event(&toolkit.handle(), event, 0, None, 0);
            assert_eq!(machine.state(), MachineState::Abort);
        }
        toolkit.clear();
    }

    #[test]
    fn start_session_requires_init() {
        let toolkit = test_toolkit();
        let mut machine = StateMachine::new(1);
        machine.state = MachineState::WaitResponse;
        assert!(matches!(
            machine.start_session(&toolkit.handle(), 1, None),
            Err(Error::InvalidState)
        ));
        toolkit.clear();
    }
}
