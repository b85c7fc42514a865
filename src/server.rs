//! Server side: the services manager owning the address space, and the
//! adapters translating typed requests into typed responses.

pub mod services;

use log::warn;

pub use self::services::{ServiceLimits, ServicesCore};

use crate::event::{DispatcherHandle, EventDispatcher, EventParams};
use crate::{ua, Result};

/// Event posted into the server manager to treat one request message.
pub const SERVER_EVENT_TREAT_REQUEST: i32 = 1;

/// Parameters of a [`SERVER_EVENT_TREAT_REQUEST`] event.
#[derive(Debug)]
pub struct ServerRequest {
    pub message: ua::Message,
    /// Where the response event goes.
    pub reply_to: DispatcherHandle,
    /// Event code of the response event.
    pub reply_event: i32,
}

/// The server-side service manager.
///
/// One dispatcher worker owns the [`ServicesCore`] (address space included)
/// exclusively; requests arrive as events carrying the decoded message and
/// the reply target, responses leave as events on the reply target. No
/// locking is needed around the address space on this path.
#[derive(Debug)]
pub struct ServerManager {
    dispatcher: EventDispatcher,
}

impl ServerManager {
    /// Starts the manager worker around the given core.
    ///
    /// # Errors
    ///
    /// Fails with `Nok` when the worker thread cannot be spawned.
    pub fn start(mut core: ServicesCore) -> Result<Self> {
        let dispatcher = EventDispatcher::create_and_start(
            "server services",
            Box::new(move |event, elt_id, params, aux| {
                if event != SERVER_EVENT_TREAT_REQUEST {
                    // Malformed event: drop the parameters, keep running.
                    warn!("server services: unknown event {event}");
                    return;
                }
                let Some(request) = params.and_then(|params| {
                    params.downcast::<ServerRequest>().map(|boxed| *boxed).ok()
                }) else {
                    warn!("server services: event without request parameters");
                    return;
                };
                let response = core.treat_message(&request.message);
                let reply: EventParams = Box::new(response);
                if let Err(err) =
                    request
                        .reply_to
                        .add_event(request.reply_event, elt_id, Some(reply), aux, "service response")
                {
                    warn!("server services: response dropped: {err}");
                }
            }),
        )?;
        Ok(Self { dispatcher })
    }

    #[must_use]
    pub fn handle(&self) -> DispatcherHandle {
        self.dispatcher.handle()
    }

    /// Posts one request for treatment.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` once the manager is stopped.
    pub fn submit(&self, request: ServerRequest, correlation_id: u32) -> Result<()> {
        self.dispatcher.add_event(
            SERVER_EVENT_TREAT_REQUEST,
            correlation_id,
            Some(Box::new(request)),
            0,
            "treat service request",
        )
    }

    /// Stops the worker; queued requests are still treated first.
    ///
    /// # Errors
    ///
    /// Fails with `Nok` when the worker thread panicked.
    pub fn stop(self) -> Result<()> {
        self.dispatcher.stop_and_join()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;
    use crate::address_space::AddressSpace;
    use crate::event::EventDispatcher;

    #[test]
    fn request_response_round_trip_through_events() {
        let (sender, receiver) = mpsc::channel();
        let reply_dispatcher = EventDispatcher::create_and_start(
            "test replies",
            Box::new(move |_event, elt_id, params, _aux| {
                let response = params
                    .and_then(|params| params.downcast::<ua::Message>().ok())
                    .map(|boxed| *boxed);
                sender.send((elt_id, response)).unwrap();
            }),
        )
        .unwrap();

        let core = ServicesCore::new(AddressSpace::new(), "opc.tcp://localhost:4841");
        let manager = ServerManager::start(core).unwrap();

        let request = ua::Message::GetEndpointsRequest(ua::GetEndpointsRequest::default());
        manager
            .submit(
                ServerRequest {
                    message: request,
                    reply_to: reply_dispatcher.handle(),
                    reply_event: 7,
                },
                42,
            )
            .unwrap();

        let (elt_id, response) = receiver.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(elt_id, 42);
        match response {
            Some(ua::Message::GetEndpointsResponse(response)) => {
                assert_eq!(response.endpoints.len(), 1);
            }
            other => panic!("unexpected response: {other:?}"),
        }

        manager.stop().unwrap();
        reply_dispatcher.stop_and_join().unwrap();
    }
}
