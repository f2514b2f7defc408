use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::events::{Event, EventSink};

/// Writes every event to the log.
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, event: Event) {
        info!("{}: {event:?}", event.name());
    }
}

/// Forwards events to an unbounded channel, for subscribers living on other tasks.
pub struct ChannelEventSink {
    sender: mpsc::UnboundedSender<Event>
}

impl ChannelEventSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelEventSink {
    fn publish(&self, event: Event) {
        if let Err(error) = self.sender.send(event) {
            //NOTE: A dropped subscriber must not fail the workflow that produced the event
            warn!("Event [{}] was dropped, no subscriber is listening", error.0.name());
        }
    }
}
