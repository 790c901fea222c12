// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The outbound event stream.
//
// One stream per coordinator, at most one subscriber. Subscribing again
// replaces the previous subscriber, whose receiver then yields `None`. With no
// subscriber, events are dropped, like an event channel nobody listens on.

use std::sync::Mutex;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, trace};

use dtexchange_core::event::OutboundEvent;

/// Receiving end handed to the host.
pub type EventReceiver = UnboundedReceiver<OutboundEvent>;

#[derive(Debug, Default)]
pub struct EventStream {
    subscriber: Mutex<Option<UnboundedSender<OutboundEvent>>>,
}

impl EventStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start listening. Any earlier subscription ends.
    pub fn subscribe(&self) -> EventReceiver {
        let (tx, rx) = unbounded_channel();
        let previous = self.lock().replace(tx);
        if previous.is_some() {
            debug!("event stream subscriber replaced");
        }
        rx
    }

    /// Stop listening.
    pub fn cancel(&self) {
        if self.lock().take().is_some() {
            debug!("event stream subscription cancelled");
        }
    }

    pub fn has_subscriber(&self) -> bool {
        self.lock().is_some()
    }

    /// Deliver one event. Returns whether a subscriber received it.
    pub(crate) fn emit(&self, event: OutboundEvent) -> bool {
        let mut guard = self.lock();
        let Some(tx) = guard.as_ref() else {
            trace!(event = %event.event_type, "no subscriber, event dropped");
            return false;
        };
        let name = event.event_type;
        if tx.send(event).is_err() {
            // Receiver was dropped without cancelling.
            *guard = None;
            debug!(event = %name, "subscriber gone, event dropped");
            return false;
        }
        trace!(event = %name, "event emitted");
        true
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<UnboundedSender<OutboundEvent>>> {
        self.subscriber.lock().expect("event stream lock poisoned")
    }
}
