//! Synchronous publish/subscribe dispatch for board events.
//!
//! [`EventBus`] keeps a table of listeners keyed by [`Topic`]. Listeners are
//! either persistent ([`on`](EventBus::on)) or one-shot
//! ([`once`](EventBus::once), removed after their first call).
//!
//! A listener that returns an error or panics does not stop the emission:
//! the remaining listeners still run, and every failure is handed back to
//! the caller of [`emit`](EventBus::emit) as a [`ListenerFailure`].
//!
//! # Example
//!
//! ```
//! use firmata_core::bus::EventBus;
//! use firmata_core::events::{Event, EventKind, Topic};
//!
//! let mut bus = EventBus::new();
//! bus.on(Topic::DigitalPin(2), |event| {
//!     println!("pin 2: {event:?}");
//!     Ok(())
//! });
//! bus.once(EventKind::Ready, |_| Ok(()));
//!
//! let failures = bus.emit(&Event::DigitalRead { pin: 2, value: 1 });
//! assert!(failures.is_empty());
//! ```

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::warn;

use crate::error::{Error, Result};
use crate::events::{Event, Topic};

/// A boxed event listener.
pub type Listener = Box<dyn FnMut(&Event) -> Result<()> + Send>;

/// Identifies a subscription so it can be removed with [`EventBus::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// A listener that failed during [`EventBus::emit`].
#[derive(Debug)]
pub struct ListenerFailure {
    /// The subscription whose listener failed.
    pub subscription: SubscriptionId,
    /// The topic the listener was registered on.
    pub topic: Topic,
    /// What went wrong. Panics are reported as [`Error::Listener`].
    pub error: Error,
}

struct Subscription {
    id: SubscriptionId,
    topic: Topic,
    once: bool,
    listener: Listener,
}

/// Topic-keyed table of event listeners.
#[derive(Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a persistent listener.
    pub fn on<T, F>(&mut self, topic: T, listener: F) -> SubscriptionId
    where
        T: Into<Topic>,
        F: FnMut(&Event) -> Result<()> + Send + 'static,
    {
        self.subscribe(topic.into(), false, Box::new(listener))
    }

    /// Register a listener that is removed after its first invocation.
    pub fn once<T, F>(&mut self, topic: T, listener: F) -> SubscriptionId
    where
        T: Into<Topic>,
        F: FnMut(&Event) -> Result<()> + Send + 'static,
    {
        self.subscribe(topic.into(), true, Box::new(listener))
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Number of listeners registered on `topic`.
    pub fn listener_count(&self, topic: impl Into<Topic>) -> usize {
        let topic = topic.into();
        self.subscriptions
            .iter()
            .filter(|s| s.topic == topic)
            .count()
    }

    /// Remove every subscription.
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }

    /// Dispatch `event` to every listener of its topics.
    ///
    /// Listeners on the event's kind run first, then listeners on its
    /// pin/channel topic; within a topic they run in registration order.
    pub fn emit(&mut self, event: &Event) -> Vec<ListenerFailure> {
        let mut failures = Vec::new();

        for topic in event.topics() {
            let mut fired_once = Vec::new();

            for sub in self.subscriptions.iter_mut().filter(|s| s.topic == topic) {
                let outcome = catch_unwind(AssertUnwindSafe(|| (sub.listener)(event)));
                let error = match outcome {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(e),
                    Err(payload) => Some(Error::Listener(panic_message(payload))),
                };
                if let Some(error) = error {
                    warn!(topic = %topic, error = %error, "event listener failed");
                    failures.push(ListenerFailure {
                        subscription: sub.id,
                        topic,
                        error,
                    });
                }
                if sub.once {
                    fired_once.push(sub.id);
                }
            }

            if !fired_once.is_empty() {
                self.subscriptions.retain(|s| !fired_once.contains(&s.id));
            }
        }

        failures
    }

    fn subscribe(&mut self, topic: Topic, once: bool, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            topic,
            once,
            listener,
        });
        id
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("listener panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("listener panicked: {s}")
    } else {
        "listener panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use std::sync::{Arc, Mutex};

    fn recorder() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let out = recorder();
        let log = out.clone();
        let mut bus = EventBus::new();

        for name in ["first", "second", "third"] {
            let log = log.clone();
            bus.on(EventKind::Ready, move |_| {
                log.lock().unwrap().push(name.to_string());
                Ok(())
            });
        }

        bus.emit(&Event::Ready);
        assert_eq!(*out.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn once_listener_fires_a_single_time() {
        let out = recorder();
        let log = out.clone();
        let mut bus = EventBus::new();
        bus.once(EventKind::Ready, move |_| {
            log.lock().unwrap().push("ready".into());
            Ok(())
        });

        assert_eq!(bus.listener_count(EventKind::Ready), 1);
        bus.emit(&Event::Ready);
        bus.emit(&Event::Ready);

        assert_eq!(out.lock().unwrap().len(), 1);
        assert_eq!(bus.listener_count(EventKind::Ready), 0);
    }

    #[test]
    fn kind_listeners_run_before_pin_listeners() {
        let out = recorder();
        let log = out.clone();
        let mut bus = EventBus::new();

        let pin_log = log.clone();
        bus.on(Topic::DigitalPin(2), move |_| {
            pin_log.lock().unwrap().push("pin".into());
            Ok(())
        });
        bus.on(EventKind::DigitalRead, move |_| {
            log.lock().unwrap().push("kind".into());
            Ok(())
        });

        bus.emit(&Event::DigitalRead { pin: 2, value: 1 });
        bus.emit(&Event::DigitalRead { pin: 3, value: 1 });

        assert_eq!(*out.lock().unwrap(), vec!["kind", "pin", "kind"]);
    }

    #[test]
    fn failing_listener_does_not_stop_others() {
        let out = recorder();
        let log = out.clone();
        let mut bus = EventBus::new();

        bus.on(EventKind::Ready, |_| Err(Error::Listener("boom".into())));
        bus.on(EventKind::Ready, move |_| {
            log.lock().unwrap().push("survivor".into());
            Ok(())
        });

        let failures = bus.emit(&Event::Ready);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].topic, Topic::Kind(EventKind::Ready));
        assert_eq!(*out.lock().unwrap(), vec!["survivor"]);
    }

    #[test]
    fn panicking_listener_is_isolated() {
        let out = recorder();
        let log = out.clone();
        let mut bus = EventBus::new();

        bus.on(EventKind::Ready, |_| panic!("listener bug"));
        bus.on(EventKind::Ready, move |_| {
            log.lock().unwrap().push("survivor".into());
            Ok(())
        });

        let failures = bus.emit(&Event::Ready);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].error.to_string().contains("listener bug"));
        assert_eq!(*out.lock().unwrap(), vec!["survivor"]);

        // The panicking listener is persistent and still registered.
        assert_eq!(bus.listener_count(EventKind::Ready), 2);
    }

    #[test]
    fn failing_once_listener_is_still_removed() {
        let mut bus = EventBus::new();
        bus.once(EventKind::Ready, |_| Err(Error::Listener("nope".into())));

        assert_eq!(bus.emit(&Event::Ready).len(), 1);
        assert!(bus.emit(&Event::Ready).is_empty());
    }

    #[test]
    fn off_removes_subscription() {
        let mut bus = EventBus::new();
        let id = bus.on(EventKind::Ready, |_| Ok(()));
        assert!(bus.off(id));
        assert!(!bus.off(id));
        assert_eq!(bus.listener_count(EventKind::Ready), 0);
    }

    #[test]
    fn unrelated_topics_are_not_called() {
        let out = recorder();
        let log = out.clone();
        let mut bus = EventBus::new();
        bus.on(Topic::AnalogChannel(1), move |_| {
            log.lock().unwrap().push("a1".into());
            Ok(())
        });

        bus.emit(&Event::AnalogRead {
            channel: 0,
            value: 100,
        });
        assert!(out.lock().unwrap().is_empty());
    }
}
