//! Client toolkit: the asynchronous API driving sessions and discovery
//! requests through the services dispatcher.
//!
//! Callers never block on the wire: every `async_*` call posts an event to
//! the services manager, whose single worker performs the secure-channel
//! exchanges and reports outcomes back through the applicative dispatcher.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;

use log::{info, warn};
use parking_lot::Mutex;

use crate::client::channel::SecureChannel;
use crate::client::session::Session;
use crate::client::SecureChannelConfig;
use crate::collections::TSafeDictionary;
use crate::event::{DispatcherHandle, EventDispatcher, EvaluatorHandle, TimerEvent, TimerManager};
use crate::{config, ua, Error, Result};

/// Applicative communication events delivered to the toolkit callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum AppEvent {
    /// Session activated; `arg` is the session internal id, `aux` the
    /// numeric server-assigned session id when it is one.
    ActivatedSession = 1,
    SessionActivationFailure = 2,
    ClosedSession = 3,
    /// Response to a request sent on an activated session.
    ReceivedSessionResponse = 4,
    /// Response to a sessionless discovery request.
    ReceivedDiscoveryResponse = 5,
    SendRequestFailed = 6,
}

impl AppEvent {
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            1 => Self::ActivatedSession,
            2 => Self::SessionActivationFailure,
            3 => Self::ClosedSession,
            4 => Self::ReceivedSessionResponse,
            5 => Self::ReceivedDiscoveryResponse,
            6 => Self::SendRequestFailed,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Applicative callback: `(event, arg, response, aux)`.
pub type AppCallback = Box<dyn FnMut(AppEvent, u32, Option<ua::Message>, usize) + Send>;

// Internal service events.
const EVT_ACTIVATE_SESSION: i32 = 1;
const EVT_SEND_REQUEST: i32 = 2;
const EVT_CLOSE_SESSION: i32 = 3;
const EVT_DISCOVERY_REQUEST: i32 = 4;
const EVT_ACTIVATION_TIMEOUT: i32 = 5;

#[derive(Debug)]
struct ToolkitShared {
    services: OnceLock<DispatcherHandle>,
    timers: Arc<TimerManager>,
    configs: Mutex<Vec<Arc<SecureChannelConfig>>>,
    /// Timer id of each running activation deadline, keyed by session
    /// internal id. Shared between caller threads and the services worker.
    activation_timers: TSafeDictionary<u32, u32>,
}

impl ToolkitShared {
    fn services(&self) -> &DispatcherHandle {
        self.services.get().expect("services dispatcher started")
    }

    fn config(&self, sc_config_index: u32) -> Option<Arc<SecureChannelConfig>> {
        let configs = self.configs.lock();
        let index = usize::try_from(sc_config_index).ok()?.checked_sub(1)?;
        configs.get(index).cloned()
    }
}

/// Cloneable access to a running [`Toolkit`].
#[derive(Debug, Clone)]
pub struct ToolkitHandle {
    shared: Arc<ToolkitShared>,
}

impl ToolkitHandle {
    /// Registers a secure channel configuration and returns its index.
    /// Index 0 is never used, so the first configuration gets index 1.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is inconsistent (see
    /// [`SecureChannelConfig::validate()`]).
    pub fn add_secure_channel_config(&self, config: SecureChannelConfig) -> Result<u32> {
        config.validate()?;
        let mut configs = self.shared.configs.lock();
        configs.push(Arc::new(config));
        Ok(u32::try_from(configs.len()).map_err(|_| Error::Nok)?)
    }

    /// Requests asynchronous activation of a session on the given channel
    /// configuration. Completion is reported as [`AppEvent::ActivatedSession`]
    /// or [`AppEvent::SessionActivationFailure`].
    ///
    /// The activation deadline is the configured channel lifetime, observed
    /// via the timer manager.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidParameters` for an unknown configuration index
    /// and with `InvalidState` once the toolkit is cleared.
    pub fn async_activate_session(&self, sc_config_index: u32, session_internal_id: u32) -> Result<()> {
        let config = self
            .shared
            .config(sc_config_index)
            .ok_or(Error::InvalidParameters)?;

        let timer_id = self.shared.timers.create(
            TimerEvent::new(
                self.shared.services().clone(),
                EVT_ACTIVATION_TIMEOUT,
                session_internal_id,
                "session activation timeout",
            ),
            Duration::from_millis(u64::from(config.requested_lifetime_ms)),
        )?;
        self.shared
            .activation_timers
            .insert(session_internal_id, timer_id)?;

        let posted = self.shared.services().add_event(
            EVT_ACTIVATE_SESSION,
            session_internal_id,
            None,
            usize::try_from(sc_config_index).map_err(|_| Error::Nok)?,
            "activate session",
        );
        if posted.is_err() {
            let _ = self.shared.activation_timers.remove(&session_internal_id);
            self.shared.timers.cancel(timer_id);
        }
        posted
    }

    /// Sends a service request on an activated session. The response (or
    /// failure) is reported through the applicative callback.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` once the toolkit is cleared.
    pub fn async_send_request(&self, session_internal_id: u32, request: ua::Message) -> Result<()> {
        self.shared.services().add_event(
            EVT_SEND_REQUEST,
            session_internal_id,
            Some(Box::new(request)),
            0,
            "send service request",
        )
    }

    /// Closes a session; completion is reported as [`AppEvent::ClosedSession`].
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` once the toolkit is cleared.
    pub fn async_close_session(&self, session_internal_id: u32) -> Result<()> {
        self.shared.services().add_event(
            EVT_CLOSE_SESSION,
            session_internal_id,
            None,
            0,
            "close session",
        )
    }

    /// Sends a sessionless discovery request on a one-shot secure channel.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidParameters` for an unknown configuration index
    /// and with `InvalidState` once the toolkit is cleared.
    pub fn async_send_discovery_request(
        &self,
        sc_config_index: u32,
        request: ua::Message,
    ) -> Result<()> {
        self.shared
            .config(sc_config_index)
            .ok_or(Error::InvalidParameters)?;
        self.shared.services().add_event(
            EVT_DISCOVERY_REQUEST,
            0,
            Some(Box::new(request)),
            usize::try_from(sc_config_index).map_err(|_| Error::Nok)?,
            "discovery request",
        )
    }
}

/// The client toolkit: applicative dispatcher, services dispatcher, and
/// timer wheel.
#[derive(Debug)]
pub struct Toolkit {
    handle: ToolkitHandle,
    app_dispatcher: EventDispatcher,
    services_dispatcher: EventDispatcher,
    evaluator: EvaluatorHandle,
}

struct ServicesState {
    shared: Arc<ToolkitShared>,
    app: DispatcherHandle,
    connections: HashMap<u32, ClientConnection>,
    /// Sessions whose activation deadline fired before activation ran.
    timed_out: std::collections::HashSet<u32>,
}

struct ClientConnection {
    channel: SecureChannel,
    session: Session,
}

impl Toolkit {
    /// Initializes the toolkit and starts its dispatchers.
    ///
    /// # Errors
    ///
    /// Fails with `Nok` when worker threads cannot be spawned.
    pub fn initialize(mut callback: AppCallback) -> Result<Self> {
        let app_dispatcher = EventDispatcher::create_and_start(
            "applicative events",
            Box::new(move |event, elt_id, params, aux| {
                let Some(app_event) = AppEvent::from_code(event) else {
                    warn!("dropping unknown applicative event {event}");
                    return;
                };
                let response = params.and_then(|params| {
                    params.downcast::<ua::Message>().map(|boxed| *boxed).ok()
                });
                callback(app_event, elt_id, response, aux);
            }),
        )?;

        // Session internal ids near `u32::MAX` are reserved as dictionary
        // sentinels.
        let activation_timers = TSafeDictionary::new(u32::MAX);
        activation_timers
            .set_tombstone_key(u32::MAX - 1)
            .expect("tombstone key on empty dictionary");
        let shared = Arc::new(ToolkitShared {
            services: OnceLock::new(),
            timers: Arc::new(TimerManager::new()),
            configs: Mutex::new(Vec::new()),
            activation_timers,
        });

        let mut state = ServicesState {
            shared: Arc::clone(&shared),
            app: app_dispatcher.handle(),
            connections: HashMap::new(),
            timed_out: std::collections::HashSet::new(),
        };
        let services_dispatcher = EventDispatcher::create_and_start(
            "client services",
            Box::new(move |event, elt_id, params, aux| {
                state.treat_event(event, elt_id, params, aux);
            }),
        )?;
        shared
            .services
            .set(services_dispatcher.handle())
            .expect("services handle set once");

        let evaluator = shared
            .timers
            .start_cyclic_evaluation(Duration::from_millis(config::TIMER_EVALUATION_TICK_MS));

        info!("toolkit initialized");
        Ok(Self {
            handle: ToolkitHandle { shared },
            app_dispatcher,
            services_dispatcher,
            evaluator,
        })
    }

    #[must_use]
    pub fn handle(&self) -> ToolkitHandle {
        self.handle.clone()
    }

    /// Stops the dispatchers and the timer evaluation.
    pub fn clear(self) {
        self.evaluator.stop();
        if let Err(err) = self.services_dispatcher.stop_and_join() {
            warn!("services dispatcher stop failed: {err}");
        }
        if let Err(err) = self.app_dispatcher.stop_and_join() {
            warn!("applicative dispatcher stop failed: {err}");
        }
    }
}

impl std::ops::Deref for Toolkit {
    type Target = ToolkitHandle;

    fn deref(&self) -> &ToolkitHandle {
        &self.handle
    }
}

impl ServicesState {
    fn post_app(&self, event: AppEvent, arg: u32, response: Option<ua::Message>, aux: usize) {
        let params = response.map(|message| Box::new(message) as crate::event::EventParams);
        if let Err(err) = self
            .app
            .add_event(event.code(), arg, params, aux, "applicative event")
        {
            warn!("applicative event dropped: {err}");
        }
    }

    fn cancel_activation_timer(&self, session_internal_id: u32) {
        if let Ok(Some(timer_id)) = self.shared.activation_timers.remove(&session_internal_id) {
            self.shared.timers.cancel(timer_id);
        }
    }

    fn treat_event(
        &mut self,
        event: i32,
        elt_id: u32,
        params: Option<crate::event::EventParams>,
        aux: usize,
    ) {
        match event {
            EVT_ACTIVATE_SESSION => {
                let sc_config_index = u32::try_from(aux).unwrap_or(0);
                self.activate_session(elt_id, sc_config_index);
            }
            EVT_SEND_REQUEST => {
                let request = params.and_then(|params| {
                    params.downcast::<ua::Message>().map(|boxed| *boxed).ok()
                });
                self.send_request(elt_id, request);
            }
            EVT_CLOSE_SESSION => self.close_session(elt_id),
            EVT_DISCOVERY_REQUEST => {
                let sc_config_index = u32::try_from(aux).unwrap_or(0);
                let request = params.and_then(|params| {
                    params.downcast::<ua::Message>().map(|boxed| *boxed).ok()
                });
                self.discovery_request(sc_config_index, request);
            }
            EVT_ACTIVATION_TIMEOUT => self.activation_timeout(elt_id),
            _ => {
                // Malformed event: params are dropped here, the manager
                // keeps running.
                warn!("client services: unknown event {event}");
            }
        }
    }

    fn activation_timeout(&mut self, session_internal_id: u32) {
        let pending = matches!(
            self.shared.activation_timers.remove(&session_internal_id),
            Ok(Some(_))
        );
        if pending && !self.connections.contains_key(&session_internal_id) {
            // The deadline fired before the activation was handled.
            self.timed_out.insert(session_internal_id);
            warn!("session {session_internal_id}: activation timeout");
            self.post_app(AppEvent::SessionActivationFailure, session_internal_id, None, 0);
        }
    }

    fn activate_session(&mut self, session_internal_id: u32, sc_config_index: u32) {
        if self.timed_out.remove(&session_internal_id) {
            // Already reported as failed by the deadline timer.
            return;
        }
        let Some(config) = self.shared.config(sc_config_index) else {
            self.cancel_activation_timer(session_internal_id);
            self.post_app(AppEvent::SessionActivationFailure, session_internal_id, None, 0);
            return;
        };

        match self.try_activate(session_internal_id, sc_config_index, &config) {
            Ok((connection, numeric_session_id)) => {
                self.cancel_activation_timer(session_internal_id);
                self.connections.insert(session_internal_id, connection);
                self.post_app(
                    AppEvent::ActivatedSession,
                    session_internal_id,
                    None,
                    usize::try_from(numeric_session_id).unwrap_or(0),
                );
            }
            Err(err) => {
                warn!("session {session_internal_id}: activation failed: {err}");
                self.cancel_activation_timer(session_internal_id);
                self.post_app(AppEvent::SessionActivationFailure, session_internal_id, None, 0);
            }
        }
    }

    fn try_activate(
        &self,
        session_internal_id: u32,
        sc_config_index: u32,
        config: &SecureChannelConfig,
    ) -> Result<(ClientConnection, u32)> {
        let mut channel = SecureChannel::open(config)?;

        let create_request = ua::CreateSessionRequest {
            request_header: ua::RequestHeader::new(ua::NodeId::null(), 1, 0),
            client_description: client_description(),
            server_uri: ua::String::null(),
            endpoint_url: ua::String::from(config.endpoint_url.as_str()),
            session_name: ua::String::from("opcua-runtime session"),
            client_nonce: ua::ByteString::null(),
            client_certificate: ua::ByteString::null(),
            requested_session_timeout: f64::from(config.requested_lifetime_ms),
            max_response_message_size: 0,
        };
        channel.send_request(&ua::Message::CreateSessionRequest(create_request))?;
        let (_, response) = channel.recv_response()?;
        let create_response = match response {
            ua::Message::CreateSessionResponse(response)
                if response.response_header.service_result.is_good() =>
            {
                response
            }
            ua::Message::CreateSessionResponse(response) => {
                return Err(Error::from_status_code(response.response_header.service_result));
            }
            other => {
                return Err(other
                    .service_result()
                    .map_or(Error::Nok, Error::from_status_code));
            }
        };

        let activate_request = ua::ActivateSessionRequest {
            request_header: ua::RequestHeader::new(
                create_response.authentication_token.clone(),
                2,
                0,
            ),
            client_signature: ua::SignatureData::default(),
            client_software_certificates: Vec::new(),
            locale_ids: Vec::new(),
            user_identity_token: ua::ExtensionObject::decoded(ua::AnonymousIdentityToken {
                policy_id: ua::String::from("anonymous"),
            }),
            user_token_signature: ua::SignatureData::default(),
        };
        channel.send_request(&ua::Message::ActivateSessionRequest(activate_request))?;
        let (_, response) = channel.recv_response()?;
        match response {
            ua::Message::ActivateSessionResponse(response)
                if response.response_header.service_result.is_good() => {}
            ua::Message::ActivateSessionResponse(response) => {
                return Err(Error::from_status_code(response.response_header.service_result));
            }
            other => {
                return Err(other
                    .service_result()
                    .map_or(Error::Nok, Error::from_status_code));
            }
        }

        let mut session = Session::new(session_internal_id, sc_config_index);
        session.activated(
            create_response.session_id.clone(),
            create_response.authentication_token.clone(),
        );
        let numeric_session_id = create_response.session_id.numeric_value().unwrap_or(0);
        info!("session {session_internal_id} activated");
        Ok((ClientConnection { channel, session }, numeric_session_id))
    }

    fn send_request(&mut self, session_internal_id: u32, request: Option<ua::Message>) {
        let Some(mut request) = request else {
            self.post_app(AppEvent::SendRequestFailed, session_internal_id, None, 0);
            return;
        };
        let Some(connection) = self.connections.get_mut(&session_internal_id) else {
            warn!("session {session_internal_id}: request on unknown session");
            self.post_app(AppEvent::SendRequestFailed, session_internal_id, None, 0);
            return;
        };

        if let Some(header) = request.request_header_mut() {
            header.authentication_token = connection.session.authentication_token.clone();
            header.timestamp = ua::DateTime::now();
        }

        let outcome = connection
            .channel
            .send_request(&request)
            .and_then(|_| connection.channel.recv_response());
        match outcome {
            Ok((_, response)) => {
                let event = if response.is_discovery_response() {
                    AppEvent::ReceivedDiscoveryResponse
                } else {
                    AppEvent::ReceivedSessionResponse
                };
                self.post_app(event, session_internal_id, Some(response), 0);
            }
            Err(err) => {
                warn!("session {session_internal_id}: request failed: {err}");
                self.post_app(AppEvent::SendRequestFailed, session_internal_id, None, 0);
            }
        }
    }

    fn close_session(&mut self, session_internal_id: u32) {
        let Some(mut connection) = self.connections.remove(&session_internal_id) else {
            self.post_app(AppEvent::ClosedSession, session_internal_id, None, 0);
            return;
        };
        let close_request = ua::CloseSessionRequest {
            request_header: ua::RequestHeader::new(
                connection.session.authentication_token.clone(),
                3,
                0,
            ),
            delete_subscriptions: true,
        };
        let outcome = connection
            .channel
            .send_request(&ua::Message::CloseSessionRequest(close_request))
            .and_then(|_| connection.channel.recv_response());
        if let Err(err) = outcome {
            warn!("session {session_internal_id}: close failed: {err}");
        }
        connection.channel.close();
        self.post_app(AppEvent::ClosedSession, session_internal_id, None, 0);
    }

    fn discovery_request(&mut self, sc_config_index: u32, request: Option<ua::Message>) {
        let Some(request) = request else {
            self.post_app(AppEvent::SendRequestFailed, 0, None, 0);
            return;
        };
        let Some(config) = self.shared.config(sc_config_index) else {
            self.post_app(AppEvent::SendRequestFailed, 0, None, 0);
            return;
        };

        let outcome = (|| -> Result<ua::Message> {
            let mut channel = SecureChannel::open(&config)?;
            channel.send_request(&request)?;
            let (_, response) = channel.recv_response()?;
            channel.close();
            Ok(response)
        })();

        match outcome {
            Ok(response) => {
                self.post_app(AppEvent::ReceivedDiscoveryResponse, 0, Some(response), 0);
            }
            Err(err) => {
                warn!("discovery request failed: {err}");
                self.post_app(AppEvent::SendRequestFailed, 0, None, 0);
            }
        }
    }
}

fn client_description() -> ua::ApplicationDescription {
    ua::ApplicationDescription {
        application_uri: ua::String::from(config::APPLICATION_URI),
        product_uri: ua::String::from(config::PRODUCT_URI),
        application_name: ua::LocalizedText::text_only(config::APPLICATION_NAME),
        application_type: ua::ApplicationType::Client,
        gateway_server_uri: ua::String::null(),
        discovery_profile_uri: ua::String::null(),
        discovery_urls: Vec::new(),
    }
}
