use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use log::warn;
use parking_lot::Mutex;

use crate::collections::LinkedList;
use crate::event::{DispatcherHandle, EventParams};
use crate::{Error, Result};

/// Timer id 0 is reserved invalid; at most this many timers are live.
pub const MAX_TIMERS: u32 = u16::MAX as u32;

/// Event parameters a periodic timer can post repeatedly.
///
/// One-shot timers give their parameters away on expiry; periodic timers
/// post a fresh clone every period.
pub trait CloneableParams: Any + Send {
    fn clone_params(&self) -> Box<dyn CloneableParams>;
    fn into_event_params(self: Box<Self>) -> EventParams;
}

impl<T: Any + Send + Clone> CloneableParams for T {
    fn clone_params(&self) -> Box<dyn CloneableParams> {
        Box::new(self.clone())
    }

    fn into_event_params(self: Box<Self>) -> EventParams {
        self
    }
}

impl std::fmt::Debug for dyn CloneableParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CloneableParams")
    }
}

/// What a timer posts into its target dispatcher on expiry.
#[derive(Debug)]
pub struct TimerEvent {
    pub target: DispatcherHandle,
    pub event: i32,
    pub elt_id: u32,
    pub aux_param: usize,
    pub params: Option<Box<dyn CloneableParams>>,
    pub debug_name: &'static str,
}

impl TimerEvent {
    /// Creates a parameter-less timer event.
    #[must_use]
    pub fn new(target: DispatcherHandle, event: i32, elt_id: u32, debug_name: &'static str) -> Self {
        Self {
            target,
            event,
            elt_id,
            aux_param: 0,
            params: None,
            debug_name,
        }
    }
}

#[derive(Debug)]
struct EventTimer {
    event: TimerEvent,
    deadline: Instant,
    period: Option<Duration>,
}

#[derive(Debug)]
struct TimersInner {
    /// Timers sorted by deadline; the list element id is the timer id.
    timers: LinkedList<EventTimer>,
    /// Bitmap of allocated ids, one bit per id 1..=MAX_TIMERS.
    used_ids: Vec<u64>,
    latest_id: u32,
}

impl TimersInner {
    fn id_used(&self, id: u32) -> bool {
        let (word, bit) = (id / 64, id % 64);
        self.used_ids[word as usize] & (1 << bit) != 0
    }

    fn set_id_used(&mut self, id: u32, used: bool) {
        let (word, bit) = (id / 64, id % 64);
        if used {
            self.used_ids[word as usize] |= 1 << bit;
        } else {
            self.used_ids[word as usize] &= !(1 << bit);
        }
    }

    /// Wrap-around search for a free id, starting after the last issued one.
    fn fresh_id(&mut self) -> Option<u32> {
        if self.timers.len() >= MAX_TIMERS {
            return None;
        }
        let start = if self.latest_id >= MAX_TIMERS {
            1
        } else {
            self.latest_id + 1
        };
        let mut id = start;
        loop {
            if !self.id_used(id) {
                self.set_id_used(id, true);
                self.latest_id = id;
                return Some(id);
            }
            id = if id >= MAX_TIMERS { 1 } else { id + 1 };
            if id == start {
                // Full cycle without a free id; cannot happen while the
                // length check above holds.
                return None;
            }
        }
    }
}

/// Manager of one-shot and periodic timers posting events on expiry.
///
/// Timers are held in a deadline-sorted list; [`evaluate()`] walks due
/// timers from the head and posts their events through the FIFO path of the
/// target dispatcher. Cancellation and evaluation exclude each other via
/// the internal lock.
///
/// [`evaluate()`]: Self::evaluate
#[derive(Debug)]
pub struct TimerManager {
    inner: Mutex<TimersInner>,
}

impl Default for TimerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TimersInner {
                timers: LinkedList::new(MAX_TIMERS),
                used_ids: vec![0; ((MAX_TIMERS + 1) as usize).div_ceil(64)],
                latest_id: 0,
            }),
        }
    }

    fn insert(&self, event: TimerEvent, deadline: Instant, period: Option<Duration>) -> Result<u32> {
        let mut inner = self.inner.lock();
        let id = inner.fresh_id().ok_or(Error::OutOfMemory)?;
        let timer = EventTimer {
            event,
            deadline,
            period,
        };
        if inner
            .timers
            .sorted_insert(id, timer, |a, b| a.deadline.cmp(&b.deadline))
            .is_err()
        {
            inner.set_id_used(id, false);
            return Err(Error::OutOfMemory);
        }
        Ok(id)
    }

    /// Schedules a one-shot timer; the event fires once `delay` has passed.
    /// Returns the timer id (never 0).
    ///
    /// # Errors
    ///
    /// Fails with `OutOfMemory` when all timer ids are in use.
    pub fn create(&self, event: TimerEvent, delay: Duration) -> Result<u32> {
        self.insert(event, Instant::now() + delay, None)
    }

    /// Schedules a periodic timer re-armed on every expiry.
    ///
    /// # Errors
    ///
    /// Fails with `OutOfMemory` when all timer ids are in use.
    pub fn create_periodic(&self, event: TimerEvent, period: Duration) -> Result<u32> {
        self.insert(event, Instant::now() + period, Some(period))
    }

    /// Changes the period of a periodic timer, applied from the next expiry.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidParameters` when the id does not name a live
    /// periodic timer.
    pub fn modify_periodic(&self, timer_id: u32, period: Duration) -> Result<()> {
        let mut inner = self.inner.lock();
        let Some(timer) = inner.timers.remove(timer_id) else {
            return Err(Error::InvalidParameters);
        };
        if timer.period.is_none() {
            // Not periodic; put it back untouched.
            inner
                .timers
                .sorted_insert(timer_id, timer, |a, b| a.deadline.cmp(&b.deadline))
                .expect("timer re-insert after remove");
            return Err(Error::InvalidParameters);
        }
        let timer = EventTimer {
            period: Some(period),
            ..timer
        };
        inner
            .timers
            .sorted_insert(timer_id, timer, |a, b| a.deadline.cmp(&b.deadline))
            .expect("timer re-insert after remove");
        Ok(())
    }

    /// Cancels a timer. Idempotent: cancelling an unknown or already expired
    /// id does nothing.
    pub fn cancel(&self, timer_id: u32) {
        if timer_id == 0 || timer_id > MAX_TIMERS {
            return;
        }
        let mut inner = self.inner.lock();
        if inner.id_used(timer_id) {
            inner.timers.remove(timer_id);
            inner.set_id_used(timer_id, false);
        }
    }

    /// Number of live timers.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.inner.lock().timers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Posts the events of all due timers, in deadline order.
    ///
    /// One-shot timers are removed and their id freed; periodic timers are
    /// re-inserted with their next deadline after the walk.
    pub fn evaluate(&self) {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        let mut rearm = Vec::new();

        while let Some((id, head)) = inner.timers.head() {
            if head.deadline > now {
                break;
            }
            let mut timer = inner.timers.pop_head().expect("head exists");

            match timer.period {
                Some(period) => {
                    let params = timer
                        .event
                        .params
                        .as_ref()
                        .map(|params| params.clone_params().into_event_params());
                    let posted = timer.event.target.add_event(
                        timer.event.event,
                        timer.event.elt_id,
                        params,
                        timer.event.aux_param,
                        timer.event.debug_name,
                    );
                    if let Err(err) = posted {
                        warn!("timer {id}: event post failed: {err}");
                    }
                    timer.deadline = now + period;
                    rearm.push((id, timer));
                }
                None => {
                    inner.set_id_used(id, false);
                    let TimerEvent {
                        target,
                        event,
                        elt_id,
                        aux_param,
                        params,
                        debug_name,
                    } = timer.event;
                    let params = params.map(CloneableParams::into_event_params);
                    if let Err(err) = target.add_event(event, elt_id, params, aux_param, debug_name)
                    {
                        warn!("timer {id}: event post failed: {err}");
                    }
                }
            }
        }

        for (id, timer) in rearm {
            inner
                .timers
                .sorted_insert(id, timer, |a, b| a.deadline.cmp(&b.deadline))
                .expect("periodic timer re-insert");
        }
    }

    /// Spawns a thread calling [`evaluate()`] every `tick` until the handle
    /// is stopped.
    ///
    /// [`evaluate()`]: Self::evaluate
    #[must_use]
    pub fn start_cyclic_evaluation(self: &Arc<Self>, tick: Duration) -> EvaluatorHandle {
        let manager = Arc::clone(self);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let worker = thread::spawn(move || {
            while !stop_flag.load(Ordering::Acquire) {
                manager.evaluate();
                thread::sleep(tick);
            }
        });
        EvaluatorHandle {
            stop,
            worker: Some(worker),
        }
    }
}

/// Handle stopping a cyclic evaluation thread.
#[derive(Debug)]
pub struct EvaluatorHandle {
    stop: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl EvaluatorHandle {
    pub fn stop(mut self) {
        self.stop_inner();
    }

    fn stop_inner(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for EvaluatorHandle {
    fn drop(&mut self) {
        self.stop_inner();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::event::EventDispatcher;

    fn test_dispatcher() -> (EventDispatcher, mpsc::Receiver<i32>) {
        let (sender, receiver) = mpsc::channel();
        let dispatcher = EventDispatcher::create_and_start(
            "timer test",
            Box::new(move |event, _elt_id, _params, _aux| {
                let _ = sender.send(event);
            }),
        )
        .unwrap();
        (dispatcher, receiver)
    }

    #[test]
    fn due_timer_posts_event() {
        let (dispatcher, receiver) = test_dispatcher();
        let manager = TimerManager::new();
        let started = Instant::now();

        manager
            .create(
                TimerEvent::new(dispatcher.handle(), 7, 1, "due"),
                Duration::from_millis(50),
            )
            .unwrap();

        loop {
            manager.evaluate();
            match receiver.try_recv() {
                Ok(event) => {
                    assert_eq!(event, 7);
                    assert!(started.elapsed() >= Duration::from_millis(50));
                    break;
                }
                Err(_) => {
                    assert!(started.elapsed() < Duration::from_secs(2), "timer never fired");
                    thread::sleep(Duration::from_millis(5));
                }
            }
        }
        assert!(manager.is_empty());
        dispatcher.stop_and_join().unwrap();
    }

    #[test]
    fn earlier_deadline_fires_first() {
        let (dispatcher, receiver) = test_dispatcher();
        let manager = TimerManager::new();

        manager
            .create(
                TimerEvent::new(dispatcher.handle(), 100, 1, "late"),
                Duration::from_millis(100),
            )
            .unwrap();
        manager
            .create(
                TimerEvent::new(dispatcher.handle(), 50, 2, "early"),
                Duration::from_millis(50),
            )
            .unwrap();

        thread::sleep(Duration::from_millis(150));
        manager.evaluate();

        assert_eq!(receiver.recv_timeout(Duration::from_secs(1)).unwrap(), 50);
        assert_eq!(receiver.recv_timeout(Duration::from_secs(1)).unwrap(), 100);
        dispatcher.stop_and_join().unwrap();
    }

    #[test]
    fn cancel_before_expiry_prevents_post() {
        let (dispatcher, receiver) = test_dispatcher();
        let manager = TimerManager::new();

        let id = manager
            .create(
                TimerEvent::new(dispatcher.handle(), 1, 1, "cancelled"),
                Duration::from_millis(30),
            )
            .unwrap();
        manager.cancel(id);
        manager.cancel(id); // idempotent

        thread::sleep(Duration::from_millis(60));
        manager.evaluate();
        assert!(receiver.try_recv().is_err());
        dispatcher.stop_and_join().unwrap();
    }

    #[test]
    fn periodic_timer_rearms() {
        let (dispatcher, receiver) = test_dispatcher();
        let manager = TimerManager::new();

        manager
            .create_periodic(
                TimerEvent::new(dispatcher.handle(), 5, 1, "periodic"),
                Duration::from_millis(20),
            )
            .unwrap();

        for _ in 0..3 {
            thread::sleep(Duration::from_millis(30));
            manager.evaluate();
            assert_eq!(receiver.recv_timeout(Duration::from_secs(1)).unwrap(), 5);
        }
        assert_eq!(manager.len(), 1);
        dispatcher.stop_and_join().unwrap();
    }

    #[test]
    fn id_allocation_wraps_and_reuses() {
        let (dispatcher, _receiver) = test_dispatcher();
        let manager = TimerManager::new();

        let first = manager
            .create(
                TimerEvent::new(dispatcher.handle(), 1, 1, "a"),
                Duration::from_secs(60),
            )
            .unwrap();
        let second = manager
            .create(
                TimerEvent::new(dispatcher.handle(), 1, 1, "b"),
                Duration::from_secs(60),
            )
            .unwrap();
        assert_ne!(first, 0);
        assert_eq!(second, first + 1);

        manager.cancel(first);
        // The freed id is not handed out again until the allocator wraps.
        let third = manager
            .create(
                TimerEvent::new(dispatcher.handle(), 1, 1, "c"),
                Duration::from_secs(60),
            )
            .unwrap();
        assert_eq!(third, second + 1);
        dispatcher.stop_and_join().unwrap();
    }
}
