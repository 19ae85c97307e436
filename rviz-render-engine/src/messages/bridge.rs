use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use bevy::log::{debug, error, info};
use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};

use super::nav_msgs::OccupancyGrid;
use super::sensor_msgs::PointCloud2;
use super::tf2_msgs::TFMessage;
use super::visualization_msgs::{
    InteractiveMarkerFeedback, InteractiveMarkerInit, InteractiveMarkerUpdate, Marker, MarkerArray,
};
use super::{BusError, LocalBus, Message, Subscription};

const DEFAULT_QUEUE_LENGTH: usize = 10;

#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    #[error("malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("unknown op {0:?}")]
    UnknownOp(String),
    #[error("no decoder for type {type_name:?} on {topic}")]
    UnknownType { topic: String, type_name: String },
    #[error("bad {type_name} payload on {topic}: {source}")]
    Payload {
        topic: String,
        type_name: &'static str,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Wire form of a bridge envelope, tagged by `op`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Envelope {
    Publish {
        topic: String,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        type_name: Option<String>,
        msg: serde_json::Value,
    },
    Subscribe {
        topic: String,
        #[serde(rename = "type")]
        type_name: String,
        #[serde(default)]
        queue_length: Option<usize>,
    },
    Unsubscribe {
        topic: String,
    },
}

/// Moves one message type between JSON and the bus.
trait TopicCodec: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn publish(&self, bus: &LocalBus, topic: &str, msg: serde_json::Value) -> Result<usize, BridgeError>;

    fn subscribe(
        &self,
        bus: &LocalBus,
        topic: &str,
        queue_length: usize,
        outgoing: Sender<String>,
    ) -> Result<Subscription, BridgeError>;
}

struct Codec<M>(PhantomData<fn() -> M>);

impl<M: Message> TopicCodec for Codec<M> {
    fn type_name(&self) -> &'static str {
        M::TYPE_NAME
    }

    fn publish(&self, bus: &LocalBus, topic: &str, msg: serde_json::Value) -> Result<usize, BridgeError> {
        let message: M = serde_json::from_value(msg).map_err(|source| BridgeError::Payload {
            topic: topic.to_string(),
            type_name: M::TYPE_NAME,
            source,
        })?;
        Ok(bus.publish(topic, message)?)
    }

    fn subscribe(
        &self,
        bus: &LocalBus,
        topic: &str,
        queue_length: usize,
        outgoing: Sender<String>,
    ) -> Result<Subscription, BridgeError> {
        let name = topic.to_string();
        let subscription = bus.subscribe(topic, queue_length, move |message: &M| {
            let envelope = serde_json::to_value(message).and_then(|msg| {
                serde_json::to_string(&Envelope::Publish {
                    topic: name.clone(),
                    type_name: Some(M::TYPE_NAME.to_string()),
                    msg,
                })
            });
            match envelope {
                Ok(json) => {
                    if outgoing.send(json).is_err() {
                        debug!("Bridge output closed, dropping {} message", name);
                    }
                }
                Err(e) => error!("Could not encode {} message: {}", name, e),
            }
        })?;
        Ok(subscription)
    }
}

/// Routes rosbridge-style JSON envelopes onto a [`LocalBus`] and forwards
/// subscribed bus traffic back out as JSON.
///
/// Outgoing envelopes queue on a channel; the transport drains it.
pub struct BridgeRouter {
    bus: LocalBus,
    codecs: BTreeMap<&'static str, Arc<dyn TopicCodec>>,
    /// Types learnt from subscriptions and typed publishes.
    topic_types: BTreeMap<String, &'static str>,
    subscriptions: BTreeMap<String, Subscription>,
    sender: Sender<String>,
    receiver: Receiver<String>,
}

impl BridgeRouter {
    /// Router knowing every message type the engine consumes or produces.
    pub fn new(bus: LocalBus) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let mut router = Self {
            bus,
            codecs: BTreeMap::new(),
            topic_types: BTreeMap::new(),
            subscriptions: BTreeMap::new(),
            sender,
            receiver,
        };
        router.register::<TFMessage>();
        router.register::<MarkerArray>();
        router.register::<Marker>();
        router.register::<InteractiveMarkerInit>();
        router.register::<InteractiveMarkerUpdate>();
        router.register::<InteractiveMarkerFeedback>();
        router.register::<PointCloud2>();
        router.register::<OccupancyGrid>();
        router
    }

    pub fn register<M: Message>(&mut self) {
        self.codecs
            .insert(M::TYPE_NAME, Arc::new(Codec::<M>(PhantomData)));
    }

    fn codec(&self, topic: &str, type_name: Option<&str>) -> Result<Arc<dyn TopicCodec>, BridgeError> {
        let type_name = type_name.or_else(|| self.topic_types.get(topic).copied());
        type_name
            .and_then(|name| self.codecs.get(name))
            .cloned()
            .ok_or_else(|| BridgeError::UnknownType {
                topic: topic.to_string(),
                type_name: type_name.unwrap_or_default().to_string(),
            })
    }

    /// Apply one incoming JSON envelope.
    pub fn handle(&mut self, json: &str) -> Result<(), BridgeError> {
        let value: serde_json::Value = serde_json::from_str(json).map_err(BridgeError::Malformed)?;
        let op = value
            .get("op")
            .and_then(|op| op.as_str())
            .unwrap_or_default()
            .to_string();
        if !matches!(op.as_str(), "publish" | "subscribe" | "unsubscribe") {
            return Err(BridgeError::UnknownOp(op));
        }

        match serde_json::from_value(value).map_err(BridgeError::Malformed)? {
            Envelope::Publish {
                topic,
                type_name,
                msg,
            } => {
                let codec = self.codec(&topic, type_name.as_deref())?;
                self.topic_types.insert(topic.clone(), codec.type_name());
                let delivered = codec.publish(&self.bus, &topic, msg)?;
                debug!("Bridged publish on {} to {} subscribers", topic, delivered);
            }
            Envelope::Subscribe {
                topic,
                type_name,
                queue_length,
            } => {
                let codec = self.codec(&topic, Some(&type_name))?;
                let subscription = codec.subscribe(
                    &self.bus,
                    &topic,
                    queue_length.unwrap_or(DEFAULT_QUEUE_LENGTH),
                    self.sender.clone(),
                )?;
                self.topic_types.insert(topic.clone(), codec.type_name());
                // Replacing drops, and so cancels, the previous subscription.
                self.subscriptions.insert(topic.clone(), subscription);
                info!("Bridge subscribed to {} ({})", topic, type_name);
            }
            Envelope::Unsubscribe { topic } => {
                if self.subscriptions.remove(&topic).is_some() {
                    info!("Bridge unsubscribed from {}", topic);
                }
            }
        }
        Ok(())
    }

    /// Envelopes produced since the last call, oldest first.
    pub fn drain_outgoing(&self) -> Vec<String> {
        self.receiver.try_iter().collect()
    }

    pub fn subscribed_topics(&self) -> Vec<&str> {
        self.subscriptions.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    #[test]
    fn publish_reaches_bus_subscribers() {
        let bus = LocalBus::new();
        let seen = Arc::new(Mutex::new(Vec::<TFMessage>::new()));
        let sink = seen.clone();
        let _sub = bus
            .subscribe("/tf", 10, move |m: &TFMessage| sink.lock().push(m.clone()))
            .unwrap();

        let mut router = BridgeRouter::new(bus.clone());
        router
            .handle(
                r#"{"op": "publish", "topic": "/tf", "type": "tf2_msgs/TFMessage",
                    "msg": {"transforms": [{"header": {"frame_id": "world"}, "child_frame_id": "base_link"}]}}"#,
            )
            .unwrap();
        bus.spin_once();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].transforms[0].child_frame_id, "base_link");
    }

    #[test]
    fn subscribed_traffic_comes_back_as_envelopes() {
        let bus = LocalBus::new();
        let mut router = BridgeRouter::new(bus.clone());
        router
            .handle(
                r#"{"op": "subscribe", "topic": "/im/feedback",
                    "type": "visualization_msgs/InteractiveMarkerFeedback"}"#,
            )
            .unwrap();

        bus.publish(
            "/im/feedback",
            InteractiveMarkerFeedback {
                marker_name: "box".into(),
                event_type: InteractiveMarkerFeedback::MOUSE_DOWN,
                ..Default::default()
            },
        )
        .unwrap();
        bus.spin_once();

        let outgoing = router.drain_outgoing();
        assert_eq!(outgoing.len(), 1);
        let Envelope::Publish { topic, msg, .. } = serde_json::from_str(&outgoing[0]).unwrap() else {
            panic!("expected a publish envelope");
        };
        assert_eq!(topic, "/im/feedback");
        assert_eq!(msg["marker_name"], "box");
        assert_eq!(msg["event_type"], 4);

        // The topic's type is now known, so untyped publishes decode too.
        router
            .handle(r#"{"op": "publish", "topic": "/im/feedback", "msg": {"marker_name": "cyl"}}"#)
            .unwrap();
        router
            .handle(r#"{"op": "unsubscribe", "topic": "/im/feedback"}"#)
            .unwrap();
        assert!(router.subscribed_topics().is_empty());
        assert_eq!(bus.subscriber_count("/im/feedback"), 0);
    }

    #[test]
    fn bad_envelopes_are_reported() {
        let mut router = BridgeRouter::new(LocalBus::new());
        assert!(matches!(router.handle("{not json"), Err(BridgeError::Malformed(_))));
        assert!(matches!(
            router.handle(r#"{"op": "call_service", "service": "/x"}"#),
            Err(BridgeError::UnknownOp(op)) if op == "call_service"
        ));
        assert!(matches!(
            router.handle(r#"{"op": "publish", "topic": "/nowhere", "msg": {}}"#),
            Err(BridgeError::UnknownType { .. })
        ));
        assert!(matches!(
            router.handle(
                r#"{"op": "publish", "topic": "/tf", "type": "tf2_msgs/TFMessage", "msg": {"transforms": 3}}"#
            ),
            Err(BridgeError::Payload { .. })
        ));
    }
}
