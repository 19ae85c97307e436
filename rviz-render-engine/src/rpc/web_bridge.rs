use std::sync::Arc;

use bevy::prelude::*;
use parking_lot::Mutex;

use crate::messages::LocalBus;
use crate::messages::bridge::BridgeRouter;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsValue;

#[cfg(target_arch = "wasm32")]
use web_sys::{MessageEvent, window};

/// Router between bridge envelopes and the scene's bus.
#[derive(Resource)]
pub struct WebBridge {
    pub router: BridgeRouter,
}

/// Envelopes received from the host page, waiting for the next frame.
#[derive(Resource, Default, Clone)]
pub struct IncomingEnvelopes(Arc<Mutex<Vec<String>>>);

impl IncomingEnvelopes {
    pub fn push(&self, json: String) {
        self.0.lock().push(json);
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock())
    }
}

/// Plugin carrying bridge envelopes between the host page and the bus.
///
/// On WASM the page talks to the engine through `postMessage`; elsewhere
/// envelopes can be queued on [`IncomingEnvelopes`] directly.
pub struct WebBridgePlugin {
    bus: LocalBus,
}

impl WebBridgePlugin {
    pub fn new(bus: LocalBus) -> Self {
        Self { bus }
    }
}

impl Plugin for WebBridgePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(WebBridge {
            router: BridgeRouter::new(self.bus.clone()),
        })
        .init_resource::<IncomingEnvelopes>()
        .add_systems(
            Update,
            (process_incoming_envelopes, send_outgoing_envelopes).chain(),
        );

        #[cfg(target_arch = "wasm32")]
        app.add_systems(Startup, setup_message_listener);
    }
}

#[cfg(target_arch = "wasm32")]
fn setup_message_listener(incoming: Res<IncomingEnvelopes>) {
    let queue = incoming.clone();

    let closure = Closure::wrap(Box::new(move |event: MessageEvent| {
        // Only string payloads can be envelopes.
        if let Ok(data) = event.data().dyn_into::<js_sys::JsString>() {
            let message: String = data.into();
            if message.contains("\"op\"") {
                queue.push(message);
            }
        }
    }) as Box<dyn FnMut(MessageEvent)>);

    match window() {
        Some(window) => {
            if let Err(e) =
                window.add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
            {
                error!("Failed to register bridge message listener: {:?}", e);
            }
        }
        None => error!("Window object not available"),
    }

    // Ownership passes to JS for the life of the page.
    closure.forget();
}

fn process_incoming_envelopes(incoming: Res<IncomingEnvelopes>, mut bridge: ResMut<WebBridge>) {
    for envelope in incoming.take() {
        if let Err(e) = bridge.router.handle(&envelope) {
            warn!("Rejected bridge envelope: {}", e);
        }
    }
}

fn send_outgoing_envelopes(bridge: Res<WebBridge>) {
    for envelope in bridge.router.drain_outgoing() {
        send_message_to_parent(&envelope);
    }
}

/// Post a serialised envelope to the parent window.
fn send_message_to_parent(json: &str) {
    #[cfg(target_arch = "wasm32")]
    {
        if let Some(window) = window() {
            if let Some(parent) = window.parent().ok().flatten() {
                if let Err(e) = parent.post_message(&JsValue::from_str(json), "*") {
                    error!("Failed to send message to parent: {:?}", e);
                }
            } else {
                warn!("No parent window available for message transmission");
            }
        } else {
            error!("Window object not available");
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        trace!("Bridge envelope with no transport: {}", json);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::tf2_msgs::TFMessage;

    #[test]
    fn queued_envelopes_reach_the_bus() {
        let bus = LocalBus::new();
        let seen = Arc::new(Mutex::new(0usize));
        let sink = seen.clone();
        let _sub = bus
            .subscribe("/tf", 10, move |m: &TFMessage| {
                *sink.lock() += m.transforms.len();
            })
            .unwrap();

        let mut app = App::new();
        app.add_plugins(WebBridgePlugin::new(bus.clone()));
        app.world()
            .resource::<IncomingEnvelopes>()
            .push(
                r#"{"op": "publish", "topic": "/tf", "type": "tf2_msgs/TFMessage",
                    "msg": {"transforms": [{"child_frame_id": "a"}, {"child_frame_id": "b"}]}}"#
                    .to_string(),
            );
        app.update();
        bus.spin_once();

        assert_eq!(*seen.lock(), 2);
    }
}
