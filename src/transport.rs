//! Transport glue: socket wrappers, the readiness set, multicast
//! membership, and the network loop bridging socket readiness to a
//! dispatcher.

mod multicast;
mod socket;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread;
use std::time::Duration;

use log::warn;
use parking_lot::Mutex;

pub use self::{
    multicast::{EthernetDriver, MulticastRegistry},
    socket::{SocketAddressInfo, SocketReadiness, SocketSet, UaSocket},
};

use crate::event::DispatcherHandle;
use crate::{Error, Result};

/// Event codes posted by the network loop.
pub const SOCKET_EVENT_READY_TO_READ: i32 = 1;
pub const SOCKET_EVENT_READY_TO_WRITE: i32 = 2;
pub const SOCKET_EVENT_EXCEPTION: i32 = 3;

const NOT_INITIALIZED: u8 = 0;
const INITIALIZING: u8 = 1;
const INITIALIZED: u8 = 2;
const DEINITIALIZING: u8 = 3;

/// Atomic setup/teardown state of a process-wide registry.
///
/// Transitions are compare-and-swap so concurrent initialize/clear races
/// serialize: NotInitialized → Initializing → Initialized → DeInitializing
/// → NotInitialized.
#[derive(Debug)]
pub struct InitState(AtomicU8);

impl InitState {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU8::new(NOT_INITIALIZED))
    }

    /// Claims the initialization; the caller completes it atomically.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` when not in the NotInitialized state.
    pub fn initialize(&self) -> Result<()> {
        self.0
            .compare_exchange(
                NOT_INITIALIZED,
                INITIALIZING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| Error::InvalidState)?;
        self.0.store(INITIALIZED, Ordering::Release);
        Ok(())
    }

    /// # Errors
    ///
    /// Fails with `InvalidState` when not initialized.
    pub fn check_initialized(&self) -> Result<()> {
        if self.0.load(Ordering::Acquire) == INITIALIZED {
            Ok(())
        } else {
            Err(Error::InvalidState)
        }
    }

    /// Claims and completes the teardown.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` when not in the Initialized state.
    pub fn deinitialize(&self) -> Result<()> {
        self.0
            .compare_exchange(
                INITIALIZED,
                DEINITIALIZING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| Error::InvalidState)?;
        self.0.store(NOT_INITIALIZED, Ordering::Release);
        Ok(())
    }
}

impl Default for InitState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct SocketRegistry {
    state: InitState,
    sockets: Mutex<Vec<Option<UaSocket>>>,
}

/// Bridges socket readiness to dispatcher events.
///
/// A worker thread waits on the registered sockets and posts
/// [`SOCKET_EVENT_READY_TO_READ`] / [`SOCKET_EVENT_READY_TO_WRITE`] /
/// [`SOCKET_EVENT_EXCEPTION`] events, with the socket id as the element id,
/// into the target dispatcher.
#[derive(Debug)]
pub struct SocketManager {
    registry: Arc<SocketRegistry>,
    stop: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl SocketManager {
    /// Starts the network loop posting into `target`.
    ///
    /// # Errors
    ///
    /// Fails with `Nok` when the worker thread cannot be spawned.
    pub fn start(target: DispatcherHandle, tick: Duration) -> Result<Self> {
        let registry = Arc::new(SocketRegistry {
            state: InitState::new(),
            sockets: Mutex::new(Vec::new()),
        });
        registry.state.initialize().expect("fresh registry");

        let stop = Arc::new(AtomicBool::new(false));
        let worker = {
            let registry = Arc::clone(&registry);
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("network loop".to_owned())
                .spawn(move || network_loop(&registry, &target, &stop, tick))
                .map_err(|_| Error::Nok)?
        };

        Ok(Self {
            registry,
            stop,
            worker: Some(worker),
        })
    }

    /// Registers a socket for readiness watching; returns its id.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` after shutdown.
    pub fn add_socket(&self, socket: UaSocket) -> Result<u32> {
        self.registry.state.check_initialized()?;
        let mut sockets = self.registry.sockets.lock();
        let id = sockets.len();
        sockets.push(Some(socket));
        Ok(u32::try_from(id).map_err(|_| Error::Nok)?)
    }

    /// Removes and returns a socket; its events stop being reported.
    #[must_use]
    pub fn take_socket(&self, socket_id: u32) -> Option<UaSocket> {
        let mut sockets = self.registry.sockets.lock();
        sockets.get_mut(socket_id as usize)?.take()
    }

    /// Stops the worker and drops all sockets.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        if self.registry.state.deinitialize().is_ok() {
            self.registry.sockets.lock().clear();
        }
    }
}

impl Drop for SocketManager {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.shutdown();
        }
    }
}

#[cfg(unix)]
fn network_loop(
    registry: &SocketRegistry,
    target: &DispatcherHandle,
    stop: &AtomicBool,
    tick: Duration,
) {
    while !stop.load(Ordering::Acquire) {
        // The set is rebuilt every cycle so registrations made while the
        // previous wait was running are picked up.
        let ready = {
            let sockets = registry.sockets.lock();
            let Ok(mut set) = SocketSet::new() else {
                thread::sleep(tick);
                continue;
            };
            let mut ids = Vec::new();
            for (id, socket) in sockets.iter().enumerate() {
                if let Some(socket) = socket {
                    if set.add(socket, true, false).is_ok() {
                        ids.push(id);
                    }
                }
            }
            if ids.is_empty() {
                drop(sockets);
                thread::sleep(tick);
                continue;
            }
            match set.wait_events(Some(tick)) {
                Ok(ready) => ready
                    .into_iter()
                    .filter_map(|readiness| {
                        ids.get(readiness.index).map(|id| (*id, readiness))
                    })
                    .collect::<Vec<_>>(),
                Err(err) => {
                    warn!("socket wait failed: {err}");
                    Vec::new()
                }
            }
        };

        for (socket_id, readiness) in ready {
            let socket_id = u32::try_from(socket_id).unwrap_or(u32::MAX);
            let event = if readiness.error {
                SOCKET_EVENT_EXCEPTION
            } else if readiness.readable {
                SOCKET_EVENT_READY_TO_READ
            } else {
                SOCKET_EVENT_READY_TO_WRITE
            };
            if let Err(err) = target.add_event(event, socket_id, None, 0, "socket readiness") {
                warn!("socket event dropped: {err}");
                return;
            }
        }
    }
}

#[cfg(not(unix))]
fn network_loop(
    _registry: &SocketRegistry,
    _target: &DispatcherHandle,
    stop: &AtomicBool,
    tick: Duration,
) {
    while !stop.load(Ordering::Acquire) {
        thread::sleep(tick);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::event::EventDispatcher;

    #[test]
    fn init_state_transitions() {
        let state = InitState::new();
        assert!(state.check_initialized().is_err());
        state.initialize().unwrap();
        assert!(state.initialize().is_err());
        state.check_initialized().unwrap();
        state.deinitialize().unwrap();
        assert!(state.deinitialize().is_err());
        // A full cycle may start over.
        state.initialize().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn readiness_is_posted_as_event() {
        let (sender, receiver) = mpsc::channel();
        let dispatcher = EventDispatcher::create_and_start(
            "socket events",
            Box::new(move |event, elt_id, _params, _aux| {
                let _ = sender.send((event, elt_id));
            }),
        )
        .unwrap();

        let manager = SocketManager::start(dispatcher.handle(), Duration::from_millis(10)).unwrap();
        let (receiver_socket, info) = UaSocket::udp_bind("127.0.0.1", 0, false).unwrap();
        let socket_id = manager.add_socket(receiver_socket).unwrap();

        let (sender_socket, _) = UaSocket::udp_bind("127.0.0.1", 0, false).unwrap();
        sender_socket
            .datagram()
            .unwrap()
            .send_to(b"ping", info.address)
            .unwrap();

        let (event, elt_id) = receiver.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(event, SOCKET_EVENT_READY_TO_READ);
        assert_eq!(elt_id, socket_id);

        manager.stop();
        dispatcher.stop_and_join().unwrap();
    }
}
