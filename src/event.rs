//! Event-driven service core: cooperative dispatchers and the timer wheel
//! that feeds them.

mod dispatcher;
mod timer;

pub use self::{
    dispatcher::{DispatcherHandle, Event, EventDispatcher, EventParams, ServiceFunction},
    timer::{CloneableParams, EvaluatorHandle, TimerEvent, TimerManager, MAX_TIMERS},
};
