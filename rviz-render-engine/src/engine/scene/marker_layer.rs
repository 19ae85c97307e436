use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bevy::log::{debug, warn};
use constants::render_settings::{MARKER_PRUNE_PERIOD_MS, MARKER_QUEUE_DEPTH};
use parking_lot::Mutex;
use web_time::Instant;

use crate::engine::render::{DrawContext, FrameContext, Layer, LayerCapabilities, MarkerGeometry};
use crate::messages::visualization_msgs::{Marker, MarkerArray};
use crate::messages::{BusError, LocalBus, Subscription};

type MarkerKey = (String, i32);

struct DisplayedMarker {
    geometry: MarkerGeometry,
    frame: String,
    expires: Option<Instant>,
}

/// Displayed markers by `(namespace, id)`.
#[derive(Default)]
pub struct MarkerTable {
    markers: BTreeMap<MarkerKey, DisplayedMarker>,
}

impl MarkerTable {
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn contains(&self, ns: &str, id: i32) -> bool {
        self.markers.contains_key(&(ns.to_string(), id))
    }

    /// Apply one marker message received at `now`.
    pub fn apply(&mut self, msg: &Marker, now: Instant) {
        let key = (msg.ns.clone(), msg.id);
        match msg.action {
            Marker::ADD => {
                let Some(geometry) = MarkerGeometry::from_message(msg) else {
                    debug!("Skipping marker {}/{} of type {}", msg.ns, msg.id, msg.marker_type);
                    self.markers.remove(&key);
                    return;
                };
                let expires = (!msg.lifetime.is_zero()).then(|| now + msg.lifetime.as_std());
                self.markers.insert(
                    key,
                    DisplayedMarker {
                        geometry,
                        frame: msg.header.frame_id.clone(),
                        expires,
                    },
                );
            }
            Marker::DELETE => {
                self.markers.remove(&key);
            }
            Marker::DELETEALL => self.markers.clear(),
            other => warn!("Unknown marker action {} for {}/{}", other, msg.ns, msg.id),
        }
    }

    /// Drop expired markers, returning how many went.
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.markers.len();
        self.markers
            .retain(|_, marker| marker.expires.is_none_or(|expires| expires > now));
        before - self.markers.len()
    }
}

/// Plain visualization markers from one bus topic, plus marker arrays
/// from the same topic with an `_array` suffix.
pub struct MarkerLayer {
    table: Arc<Mutex<MarkerTable>>,
    _subscriptions: [Subscription; 2],
    last_prune: Option<Instant>,
    enabled: bool,
}

impl MarkerLayer {
    pub fn new(bus: &LocalBus, topic: &str) -> Result<Self, BusError> {
        let table = Arc::new(Mutex::new(MarkerTable::default()));
        let sink = table.clone();
        let single = bus.subscribe(topic, MARKER_QUEUE_DEPTH, move |msg: &Marker| {
            sink.lock().apply(msg, Instant::now());
        })?;
        let sink = table.clone();
        let array = bus.subscribe(
            &format!("{topic}_array"),
            MARKER_QUEUE_DEPTH,
            move |msg: &MarkerArray| {
                let now = Instant::now();
                let mut table = sink.lock();
                for marker in &msg.markers {
                    table.apply(marker, now);
                }
            },
        )?;

        Ok(Self {
            table,
            _subscriptions: [single, array],
            last_prune: None,
            enabled: true,
        })
    }

    pub fn table(&self) -> &Arc<Mutex<MarkerTable>> {
        &self.table
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl Layer for MarkerLayer {
    fn name(&self) -> &str {
        "Markers"
    }

    fn capabilities(&self) -> LayerCapabilities {
        LayerCapabilities::DRAWABLE
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn prepare(&mut self, frame: &mut FrameContext<'_>) {
        let period = Duration::from_millis(MARKER_PRUNE_PERIOD_MS);
        if self
            .last_prune
            .is_some_and(|last| frame.now.saturating_duration_since(last) < period)
        {
            return;
        }
        self.last_prune = Some(frame.now);

        let pruned = self.table.lock().prune(frame.now);
        if pruned > 0 {
            debug!("Pruned {} expired markers", pruned);
        }
    }

    fn draw(&self, ctx: &mut DrawContext<'_>) {
        let table = self.table.lock();
        for marker in table.markers.values() {
            ctx.camera.push_m();
            let transform = ctx.camera.frame_transform(&marker.frame);
            ctx.camera.apply_transform(transform.as_ref());
            ctx.camera.model_stack().multiply(marker.geometry.transform);
            ctx.draw(&marker.geometry.shape, marker.geometry.colour);
            ctx.camera.pop_m();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::selection::SelectionManager;
    use crate::messages::std_msgs::{Duration as MsgDuration, Header};
    use crate::tools::control_manager::InteractiveControlManager;

    fn cube(ns: &str, id: i32) -> Marker {
        Marker {
            header: Header::with_frame("world"),
            ns: ns.into(),
            id,
            marker_type: Marker::CUBE,
            action: Marker::ADD,
            ..Default::default()
        }
    }

    #[test]
    fn actions_follow_namespace_and_id() {
        let mut table = MarkerTable::default();
        let now = Instant::now();
        table.apply(&cube("a", 1), now);
        table.apply(&cube("a", 2), now);
        table.apply(&cube("b", 1), now);
        table.apply(&cube("a", 1), now);
        assert_eq!(table.len(), 3);

        table.apply(
            &Marker {
                action: Marker::DELETE,
                ..cube("a", 2)
            },
            now,
        );
        assert!(!table.contains("a", 2));
        assert!(table.contains("b", 1));

        table.apply(
            &Marker {
                action: Marker::DELETEALL,
                ..Default::default()
            },
            now,
        );
        assert!(table.is_empty());
    }

    #[test]
    fn arrays_apply_in_order() {
        let bus = LocalBus::new();
        let layer = MarkerLayer::new(&bus, "/markers").unwrap();
        bus.publish(
            "/markers_array",
            MarkerArray {
                markers: vec![
                    cube("a", 1),
                    cube("a", 2),
                    Marker {
                        action: Marker::DELETE,
                        ..cube("a", 1)
                    },
                ],
            },
        )
        .unwrap();
        bus.spin_once();

        let table = layer.table().lock();
        assert_eq!(table.len(), 1);
        assert!(table.contains("a", 2));
    }

    #[test]
    fn lifetime_expires_on_a_throttled_prune() {
        let bus = LocalBus::new();
        let mut layer = MarkerLayer::new(&bus, "/markers").unwrap();
        bus.publish(
            "/markers",
            Marker {
                lifetime: MsgDuration { secs: 0, nsecs: 1 },
                ..cube("a", 1)
            },
        )
        .unwrap();
        bus.publish("/markers", cube("a", 2)).unwrap();
        bus.spin_once();
        assert_eq!(layer.table().lock().len(), 2);

        let (controls, _commands) = InteractiveControlManager::new();
        let mut selection = SelectionManager::new(controls);
        let start = Instant::now() + Duration::from_millis(10);
        let mut frame = FrameContext {
            selection: &mut selection,
            now: start,
        };
        layer.prepare(&mut frame);
        assert_eq!(layer.table().lock().len(), 1);

        // Inside the prune period nothing is checked.
        layer.table().lock().apply(
            &Marker {
                lifetime: MsgDuration { secs: 0, nsecs: 1 },
                ..cube("a", 3)
            },
            start,
        );
        frame.now = start + Duration::from_millis(100);
        layer.prepare(&mut frame);
        assert_eq!(layer.table().lock().len(), 2);

        frame.now = start + Duration::from_millis(MARKER_PRUNE_PERIOD_MS);
        layer.prepare(&mut frame);
        assert_eq!(layer.table().lock().len(), 1);
    }
}
