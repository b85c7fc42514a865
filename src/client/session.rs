use crate::ua;

/// Lifecycle of a client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Created,
    Activated,
    Closed,
}

/// Client-side bookkeeping of one session on a secure channel.
///
/// The internal id is chosen by the caller and stays stable across the
/// session lifetime; the OPC UA ids are assigned by the server on
/// activation.
#[derive(Debug, Clone)]
pub struct Session {
    /// Caller-chosen stable id.
    pub internal_id: u32,
    /// Index of the secure channel configuration the session runs on.
    pub sc_config_index: u32,
    /// Session id assigned by the server.
    pub session_id: ua::NodeId,
    /// Authentication token used in request headers after activation.
    pub authentication_token: ua::NodeId,
    pub state: SessionState,
}

impl Session {
    #[must_use]
    pub const fn new(internal_id: u32, sc_config_index: u32) -> Self {
        Self {
            internal_id,
            sc_config_index,
            session_id: ua::NodeId::null(),
            authentication_token: ua::NodeId::null(),
            state: SessionState::Created,
        }
    }

    pub fn activated(&mut self, session_id: ua::NodeId, authentication_token: ua::NodeId) {
        self.session_id = session_id;
        self.authentication_token = authentication_token;
        self.state = SessionState::Activated;
    }

    #[must_use]
    pub fn is_activated(&self) -> bool {
        self.state == SessionState::Activated
    }
}
