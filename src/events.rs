//! Typed publish/subscribe bus for UI pages.
//!
//! Handlers run synchronously inside [`EventBus::publish`], in the order
//! they subscribed.

use tracing::trace;

use crate::coordinator::ScannerRunState;
use crate::native::ScanSession;
use crate::settings::SettingsChanged;

/// What a handler subscribes to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    ScannerStateChanged,
    ScannerScanned,
    SettingsChanged,
    ManualSearch,
}

impl Topic {
    /// Wire name, as used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::ScannerStateChanged => "scanner:stateChange",
            Self::ScannerScanned => "scanner:scan",
            Self::SettingsChanged => "settings:changed",
            Self::ManualSearch => "scanner:manualSearch",
        }
    }
}

/// A published event.
#[derive(Clone, Debug, PartialEq)]
pub enum BusEvent {
    StateChanged(ScannerRunState),
    Scanned(ScanSession),
    SettingsChanged(SettingsChanged),
    ManualSearch(String),
}

impl BusEvent {
    pub fn topic(&self) -> Topic {
        match self {
            Self::StateChanged(_) => Topic::ScannerStateChanged,
            Self::Scanned(_) => Topic::ScannerScanned,
            Self::SettingsChanged(_) => Topic::SettingsChanged,
            Self::ManualSearch(_) => Topic::ManualSearch,
        }
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&BusEvent)>;

struct Subscription {
    topic: Topic,
    id: SubscriptionId,
    handler: Handler,
}

#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    subscriptions: Vec<Subscription>,
}

impl core::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventBus")
            .field("next_id", &self.next_id)
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        topic: Topic,
        handler: impl FnMut(&BusEvent) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            topic,
            id,
            handler: Box::new(handler),
        });
        id
    }

    /// Remove a handler. Returns `false` if it was not subscribed to `topic`.
    pub fn unsubscribe(&mut self, topic: Topic, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions
            .retain(|s| !(s.topic == topic && s.id == id));
        self.subscriptions.len() != before
    }

    /// Deliver an event to every handler of its topic. Returns how many ran.
    pub fn publish(&mut self, event: &BusEvent) -> usize {
        let topic = event.topic();
        let mut delivered = 0;
        for sub in self.subscriptions.iter_mut().filter(|s| s.topic == topic) {
            (sub.handler)(event);
            delivered += 1;
        }
        trace!(topic = topic.name(), delivered, "Published event");
        delivered
    }

    /// Number of handlers for a topic.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.subscriptions.iter().filter(|s| s.topic == topic).count()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn publish_reaches_only_matching_topic() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let log = Rc::clone(&seen);
        bus.subscribe(Topic::ScannerStateChanged, move |e| {
            log.borrow_mut().push(e.clone());
        });
        let log = Rc::clone(&seen);
        bus.subscribe(Topic::ManualSearch, move |e| {
            log.borrow_mut().push(e.clone());
        });

        assert_eq!(
            bus.publish(&BusEvent::StateChanged(ScannerRunState::Active)),
            1
        );
        assert_eq!(bus.publish(&BusEvent::Scanned(ScanSession::default())), 0);
        assert_eq!(
            *seen.borrow(),
            [BusEvent::StateChanged(ScannerRunState::Active)]
        );
    }

    #[test]
    fn handlers_run_in_subscription_order() {
        let mut bus = EventBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for n in 0..3 {
            let order = Rc::clone(&order);
            bus.subscribe(Topic::ManualSearch, move |_| order.borrow_mut().push(n));
        }
        bus.publish(&BusEvent::ManualSearch("123".into()));
        assert_eq!(*order.borrow(), [0, 1, 2]);
    }

    #[test]
    fn unsubscribe_needs_matching_topic() {
        let mut bus = EventBus::new();
        let id = bus.subscribe(Topic::ScannerScanned, |_| {});
        assert!(!bus.unsubscribe(Topic::ManualSearch, id));
        assert_eq!(bus.subscriber_count(Topic::ScannerScanned), 1);
        assert!(bus.unsubscribe(Topic::ScannerScanned, id));
        assert!(!bus.unsubscribe(Topic::ScannerScanned, id));
        assert_eq!(bus.publish(&BusEvent::Scanned(ScanSession::default())), 0);
    }

    #[test]
    fn topic_names() {
        assert_eq!(Topic::ScannerStateChanged.name(), "scanner:stateChange");
        assert_eq!(Topic::SettingsChanged.name(), "settings:changed");
    }
}
