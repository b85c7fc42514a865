use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use log::{debug, warn};

use crate::collections::AsyncQueue;
use crate::{Error, Result};

/// Opaque parameters carried by an [`Event`].
///
/// Ownership moves with the event: the enqueuer gives it up, the service
/// function receives it and drops it when done.
pub type EventParams = Box<dyn Any + Send>;

/// One unit of work for a service manager.
pub struct Event {
    /// Event code, interpreted by the registered service function.
    pub event: i32,
    /// Id of the element the event concerns (session, socket, timer, ...).
    pub elt_id: u32,
    /// Opaque payload, owned by the event.
    pub params: Option<EventParams>,
    /// Small auxiliary value that travels without allocation.
    pub aux_param: usize,
    /// Static name shown in debug logs.
    pub debug_name: &'static str,
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("event", &self.event)
            .field("elt_id", &self.elt_id)
            .field("has_params", &self.params.is_some())
            .field("aux_param", &self.aux_param)
            .field("debug_name", &self.debug_name)
            .finish()
    }
}

/// Service function invoked for every dequeued event.
pub type ServiceFunction = Box<dyn FnMut(i32, u32, Option<EventParams>, usize) + Send>;

#[derive(Debug)]
enum QueueItem {
    Event(Event),
    Poison,
}

/// Cloneable handle for posting events into a running dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherHandle {
    queue: Arc<AsyncQueue<QueueItem>>,
    stopped: Arc<AtomicBool>,
}

impl DispatcherHandle {
    fn post(&self, event: Event, as_next: bool) -> Result<()> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(Error::InvalidState);
        }
        debug!(
            "queue {}: enqueue event {} ({}) elt {}",
            self.queue.name(),
            event.event,
            event.debug_name,
            event.elt_id
        );
        if as_next {
            self.queue.enqueue_first(QueueItem::Event(event));
        } else {
            self.queue.enqueue_last(QueueItem::Event(event));
        }
        Ok(())
    }

    /// Appends an event (FIFO path).
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` once the dispatcher has been stopped.
    pub fn add_event(
        &self,
        event: i32,
        elt_id: u32,
        params: Option<EventParams>,
        aux_param: usize,
        debug_name: &'static str,
    ) -> Result<()> {
        self.post(
            Event {
                event,
                elt_id,
                params,
                aux_param,
                debug_name,
            },
            false,
        )
    }

    /// Prepends an event so it is handled before anything already queued.
    ///
    /// Order-breaking by design; reserved for priority handling such as
    /// activation shortcuts.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` once the dispatcher has been stopped.
    pub fn add_event_as_next(
        &self,
        event: i32,
        elt_id: u32,
        params: Option<EventParams>,
        aux_param: usize,
        debug_name: &'static str,
    ) -> Result<()> {
        self.post(
            Event {
                event,
                elt_id,
                params,
                aux_param,
                debug_name,
            },
            true,
        )
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

/// Single-threaded cooperative event dispatcher ("service manager").
///
/// One worker thread sequentially dequeues events and invokes the installed
/// service function. Handlers of the same dispatcher never run concurrently,
/// so the service function may mutate its owned state without locking.
#[derive(Debug)]
pub struct EventDispatcher {
    handle: DispatcherHandle,
    worker: Option<thread::JoinHandle<()>>,
}

impl EventDispatcher {
    /// Spawns the worker thread and starts consuming events.
    ///
    /// # Errors
    ///
    /// Fails with `Nok` when the worker thread cannot be spawned.
    pub fn create_and_start(name: &'static str, mut service: ServiceFunction) -> Result<Self> {
        let queue = Arc::new(AsyncQueue::new(name));
        let stopped = Arc::new(AtomicBool::new(false));
        let handle = DispatcherHandle {
            queue: Arc::clone(&queue),
            stopped: Arc::clone(&stopped),
        };

        let worker = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                loop {
                    match queue.dequeue_blocking() {
                        QueueItem::Poison => break,
                        QueueItem::Event(event) => {
                            debug!(
                                "queue {}: dispatch event {} ({}) elt {}",
                                queue.name(),
                                event.event,
                                event.debug_name,
                                event.elt_id
                            );
                            service(event.event, event.elt_id, event.params, event.aux_param);
                        }
                    }
                }
                debug!("queue {}: worker exits", queue.name());
            })
            .map_err(|_| Error::Nok)?;

        Ok(Self {
            handle,
            worker: Some(worker),
        })
    }

    /// Returns a handle for posting events from other threads.
    #[must_use]
    pub fn handle(&self) -> DispatcherHandle {
        self.handle.clone()
    }

    /// See [`DispatcherHandle::add_event()`].
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` once the dispatcher has been stopped.
    pub fn add_event(
        &self,
        event: i32,
        elt_id: u32,
        params: Option<EventParams>,
        aux_param: usize,
        debug_name: &'static str,
    ) -> Result<()> {
        self.handle.add_event(event, elt_id, params, aux_param, debug_name)
    }

    /// See [`DispatcherHandle::add_event_as_next()`].
    ///
    /// # Errors
    ///
    /// Fails with `InvalidState` once the dispatcher has been stopped.
    pub fn add_event_as_next(
        &self,
        event: i32,
        elt_id: u32,
        params: Option<EventParams>,
        aux_param: usize,
        debug_name: &'static str,
    ) -> Result<()> {
        self.handle
            .add_event_as_next(event, elt_id, params, aux_param, debug_name)
    }

    /// Stops accepting events, drains up to the poison pill, and joins the
    /// worker. Events already queued before the stop are still handled.
    ///
    /// # Errors
    ///
    /// Fails with `Nok` when the worker thread panicked.
    pub fn stop_and_join(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Err(Error::InvalidState);
        };
        self.handle.stopped.store(true, Ordering::Release);
        self.handle.queue.enqueue_last(QueueItem::Poison);
        worker.join().map_err(|_| Error::Nok)
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(err) = self.shutdown() {
                warn!("dispatcher shutdown failed: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn events_are_dispatched_in_fifo_order() {
        let (sender, receiver) = mpsc::channel();
        let dispatcher = EventDispatcher::create_and_start(
            "test",
            Box::new(move |event, elt_id, _params, _aux| {
                sender.send((event, elt_id)).unwrap();
            }),
        )
        .unwrap();

        for i in 0..5 {
            dispatcher.add_event(i, i as u32, None, 0, "test event").unwrap();
        }
        for i in 0..5 {
            assert_eq!(
                receiver.recv_timeout(Duration::from_secs(1)).unwrap(),
                (i, i as u32)
            );
        }
        dispatcher.stop_and_join().unwrap();
    }

    #[test]
    fn add_event_as_next_bypasses_queue() {
        let (sender, receiver) = mpsc::channel();
        let (entered_sender, entered_receiver) = mpsc::channel();
        let gate = Arc::new(Mutex::new(()));

        let blocker = gate.lock().unwrap();
        let dispatcher = {
            let gate = Arc::clone(&gate);
            EventDispatcher::create_and_start(
                "test",
                Box::new(move |event, _elt_id, _params, _aux| {
                    if event == 0 {
                        // Report that the gate event left the queue, then
                        // hold the worker until the others are enqueued.
                        entered_sender.send(()).unwrap();
                        drop(gate.lock().unwrap());
                    }
                    sender.send(event).unwrap();
                }),
            )
            .unwrap()
        };

        dispatcher.add_event(0, 0, None, 0, "gate").unwrap();
        entered_receiver
            .recv_timeout(Duration::from_secs(1))
            .unwrap();
        dispatcher.add_event(1, 0, None, 0, "normal").unwrap();
        dispatcher.add_event(2, 0, None, 0, "normal").unwrap();
        dispatcher.add_event_as_next(99, 0, None, 0, "priority").unwrap();
        drop(blocker);

        let mut order = Vec::new();
        for _ in 0..4 {
            order.push(receiver.recv_timeout(Duration::from_secs(1)).unwrap());
        }
        assert_eq!(order, [0, 99, 1, 2]);
        dispatcher.stop_and_join().unwrap();
    }

    #[test]
    fn params_ownership_moves_to_handler() {
        let (sender, receiver) = mpsc::channel();
        let dispatcher = EventDispatcher::create_and_start(
            "test",
            Box::new(move |_event, _elt_id, params, _aux| {
                let payload = params.unwrap().downcast::<String>().unwrap();
                sender.send(*payload).unwrap();
            }),
        )
        .unwrap();

        dispatcher
            .add_event(1, 0, Some(Box::new(String::from("payload"))), 0, "params")
            .unwrap();
        assert_eq!(
            receiver.recv_timeout(Duration::from_secs(1)).unwrap(),
            "payload"
        );
        dispatcher.stop_and_join().unwrap();
    }

    #[test]
    fn stopped_dispatcher_rejects_events() {
        let dispatcher =
            EventDispatcher::create_and_start("test", Box::new(|_, _, _, _| {})).unwrap();
        let handle = dispatcher.handle();
        dispatcher.stop_and_join().unwrap();
        assert!(matches!(
            handle.add_event(1, 0, None, 0, "late"),
            Err(Error::InvalidState)
        ));
    }
}
