use std::any::Any;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Weak};

use bevy::log::{debug, warn};
use parking_lot::Mutex;

use super::Message;

pub type SubscriptionId = u64;

type ErasedMessage = Arc<dyn Any + Send + Sync>;
type ErasedCallback = Arc<dyn Fn(&(dyn Any + Send + Sync)) + Send + Sync>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("topic {topic} carries {expected}, not {found}")]
    TypeMismatch {
        topic: String,
        expected: &'static str,
        found: &'static str,
    },
}

struct Subscriber {
    id: SubscriptionId,
    queue_depth: usize,
    queued: usize,
    callback: ErasedCallback,
}

struct Topic {
    type_name: &'static str,
    subscribers: Vec<Subscriber>,
}

struct Delivery {
    topic: String,
    subscriber: SubscriptionId,
    message: ErasedMessage,
}

#[derive(Default)]
struct BusState {
    topics: BTreeMap<String, Topic>,
    pending: VecDeque<Delivery>,
    next_id: SubscriptionId,
}

impl BusState {
    fn topic_mut(&mut self, name: &str, type_name: &'static str) -> Result<&mut Topic, BusError> {
        let topic = self.topics.entry(name.to_string()).or_insert_with(|| Topic {
            type_name,
            subscribers: Vec::new(),
        });
        if topic.type_name != type_name {
            return Err(BusError::TypeMismatch {
                topic: name.to_string(),
                expected: topic.type_name,
                found: type_name,
            });
        }
        Ok(topic)
    }

    /// Drop the oldest pending delivery for a subscriber whose queue is full.
    fn drop_oldest(&mut self, topic: &str, subscriber: SubscriptionId) {
        if let Some(index) = self
            .pending
            .iter()
            .position(|d| d.subscriber == subscriber && d.topic == topic)
        {
            self.pending.remove(index);
        }
    }

    fn subscriber_mut(&mut self, topic: &str, id: SubscriptionId) -> Option<&mut Subscriber> {
        self.topics
            .get_mut(topic)?
            .subscribers
            .iter_mut()
            .find(|s| s.id == id)
    }
}

/// In-process publish/subscribe bus with typed topics.
///
/// Publishing only queues; callbacks run from [`LocalBus::spin_once`] with
/// the topic table unlocked, so a callback may subscribe, unsubscribe or
/// publish without deadlocking. Each subscriber keeps at most
/// `queue_depth` undelivered messages, discarding the oldest on overflow.
#[derive(Clone, Default)]
pub struct LocalBus {
    state: Arc<Mutex<BusState>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<M, F>(
        &self,
        topic: &str,
        queue_depth: usize,
        callback: F,
    ) -> Result<Subscription, BusError>
    where
        M: Message,
        F: Fn(&M) + Send + Sync + 'static,
    {
        let callback: ErasedCallback = Arc::new(move |message: &(dyn Any + Send + Sync)| {
            if let Some(message) = message.downcast_ref::<M>() {
                callback(message);
            }
        });

        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.topic_mut(topic, M::TYPE_NAME)?.subscribers.push(Subscriber {
            id,
            queue_depth: queue_depth.max(1),
            queued: 0,
            callback,
        });
        debug!("Subscribed to {} ({})", topic, M::TYPE_NAME);

        Ok(Subscription {
            bus: Arc::downgrade(&self.state),
            topic: topic.to_string(),
            id,
            active: true,
        })
    }

    /// Queue `message` for every current subscriber of `topic`.
    ///
    /// Returns how many subscribers the message was queued for.
    pub fn publish<M: Message>(&self, topic: &str, message: M) -> Result<usize, BusError> {
        let message: ErasedMessage = Arc::new(message);
        let mut state = self.state.lock();

        let targets: Vec<(SubscriptionId, bool)> = state
            .topic_mut(topic, M::TYPE_NAME)?
            .subscribers
            .iter()
            .map(|s| (s.id, s.queued >= s.queue_depth))
            .collect();

        for (id, full) in &targets {
            if *full {
                state.drop_oldest(topic, *id);
            } else if let Some(subscriber) = state.subscriber_mut(topic, *id) {
                subscriber.queued += 1;
            }
            state.pending.push_back(Delivery {
                topic: topic.to_string(),
                subscriber: *id,
                message: message.clone(),
            });
        }

        Ok(targets.len())
    }

    /// Deliver everything queued before the call, in publish order.
    ///
    /// Messages published by callbacks during this spin wait for the next one.
    pub fn spin_once(&self) -> usize {
        let budget = self.state.lock().pending.len();
        let mut delivered = 0;

        for _ in 0..budget {
            let next = {
                let mut state = self.state.lock();
                let Some(delivery) = state.pending.pop_front() else {
                    break;
                };
                state
                    .subscriber_mut(&delivery.topic, delivery.subscriber)
                    .map(|subscriber| {
                        subscriber.queued = subscriber.queued.saturating_sub(1);
                        (subscriber.callback.clone(), delivery.message)
                    })
            };

            // Subscriber may have gone away since the message was queued
            if let Some((callback, message)) = next {
                callback(message.as_ref());
                delivered += 1;
            }
        }

        delivered
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.state
            .lock()
            .topics
            .get(topic)
            .map_or(0, |t| t.subscribers.len())
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }
}

/// Live subscription. Dropping it, or calling [`Subscription::shutdown`],
/// unsubscribes and discards anything still queued for it.
pub struct Subscription {
    bus: Weak<Mutex<BusState>>,
    topic: String,
    id: SubscriptionId,
    active: bool,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn shutdown(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        let Some(state) = self.bus.upgrade() else {
            return;
        };
        let mut state = state.lock();
        let id = self.id;
        if let Some(topic) = state.topics.get_mut(&self.topic) {
            topic.subscribers.retain(|s| s.id != id);
        } else {
            warn!("Unsubscribe from unknown topic {}", self.topic);
        }
        state.pending.retain(|d| d.subscriber != id);
        debug!("Unsubscribed from {}", self.topic);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("id", &self.id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::tf2_msgs::TFMessage;
    use crate::messages::visualization_msgs::InteractiveMarkerUpdate;

    fn update(seq_num: u64) -> InteractiveMarkerUpdate {
        InteractiveMarkerUpdate {
            seq_num,
            ..Default::default()
        }
    }

    #[test]
    fn delivers_in_publish_order() {
        let bus = LocalBus::new();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let _sub = bus
            .subscribe("/updates", 10, move |msg: &InteractiveMarkerUpdate| {
                sink.lock().push(msg.seq_num)
            })
            .unwrap();

        for seq in 1..=3 {
            bus.publish("/updates", update(seq)).unwrap();
        }
        assert_eq!(bus.spin_once(), 3);
        assert_eq!(*received.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn full_queue_drops_oldest() {
        let bus = LocalBus::new();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let _sub = bus
            .subscribe("/updates", 2, move |msg: &InteractiveMarkerUpdate| {
                sink.lock().push(msg.seq_num)
            })
            .unwrap();

        for seq in 1..=4 {
            bus.publish("/updates", update(seq)).unwrap();
        }
        bus.spin_once();
        assert_eq!(*received.lock(), vec![3, 4]);
    }

    #[test]
    fn dropping_subscription_discards_pending() {
        let bus = LocalBus::new();
        let received = Arc::new(Mutex::new(0));
        let sink = received.clone();
        let sub = bus
            .subscribe("/tf", 5, move |_: &TFMessage| *sink.lock() += 1)
            .unwrap();

        bus.publish("/tf", TFMessage::default()).unwrap();
        drop(sub);
        assert_eq!(bus.spin_once(), 0);
        assert_eq!(*received.lock(), 0);
        assert_eq!(bus.subscriber_count("/tf"), 0);
    }

    #[test]
    fn topic_type_is_fixed_by_first_use() {
        let bus = LocalBus::new();
        let _sub = bus.subscribe("/tf", 1, |_: &TFMessage| {}).unwrap();
        let err = bus.publish("/tf", update(1)).unwrap_err();
        assert!(matches!(err, BusError::TypeMismatch { .. }));
    }

    #[test]
    fn callbacks_may_resubscribe_during_spin() {
        let bus = LocalBus::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let inner_bus = bus.clone();
        let inner_slot = slot.clone();
        let outer = bus
            .subscribe("/a", 5, move |_: &TFMessage| {
                let sub = inner_bus.subscribe("/b", 5, |_: &TFMessage| {}).unwrap();
                *inner_slot.lock() = Some(sub);
            })
            .unwrap();

        bus.publish(
            "/a",
            TFMessage {
                transforms: vec![Default::default()],
            },
        )
        .unwrap();
        bus.spin_once();
        assert_eq!(bus.subscriber_count("/b"), 1);
        outer.shutdown();
        assert_eq!(bus.subscriber_count("/a"), 0);
    }
}
