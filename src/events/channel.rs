//! Crossbeam-backed transport for pipeline events.
//!
//! Workers on the pool threads each hold a clone of the sender; the front end
//! drains the receiver on its own thread.

use crossbeam_channel::{Receiver, Sender};

use super::Event;

/// Producer side, cloned into every worker
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Deliver `event` to the front end.
    ///
    /// A disconnected receiver means nobody is listening, which is not an
    /// error for the pipeline, so the event is dropped.
    pub fn send(&self, event: Event) {
        if self.inner.send(event).is_err() {
            tracing::trace!("event receiver disconnected");
        }
    }
}

/// Consumer side, owned by the front end
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Blocking iterator that ends when every sender has been dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Constructors for connected sender/receiver pairs
pub struct EventChannel;

impl EventChannel {
    /// Unbounded pair; sends never block
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// Sender whose receiver is already gone; every event is discarded
pub fn null_sender() -> EventSender {
    EventChannel::new().0
}
