use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use bevy::log::{debug, error, info, warn};
use constants::interactive_markers::{
    QUEUE_DEPTH, UPDATE_FULL_SUFFIX, UPDATE_SUFFIX, UPDATE_TIMEOUT_MS, WATCHDOG_PERIOD_MS,
};
use crossbeam_channel::{Sender, select, tick};
use parking_lot::Mutex;
use web_time::Instant;

use crate::messages::visualization_msgs::{InteractiveMarkerInit, InteractiveMarkerUpdate};
use crate::messages::{BusError, LocalBus, Subscription};

/// Receives the marker state the update stream produces.
pub trait MarkerUpdateSink: Send + Sync {
    fn receive_init(&self, init: &InteractiveMarkerInit);
    fn receive_update(&self, update: &InteractiveMarkerUpdate);
    fn clear(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStage {
    WaitForInit,
    WaitForUpdate,
    ReceiveUpdates,
}

/// Side effects requested by [`UpdateStreamMachine`], to be carried out in
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamAction {
    SubscribeFull,
    UnsubscribeFull,
    SubscribeUpdates,
    UnsubscribeUpdates,
    /// Hand the snapshot that triggered the step to the sink.
    ApplyInit,
    /// Hand the update that triggered the step to the sink.
    ApplyUpdate,
    ClearMarkers,
}

/// Synchronisation of the snapshot and incremental marker streams.
///
/// The machine starts listening to snapshots only. A snapshot arms the
/// incremental stream and fixes the expected sequence number. The first
/// incremental message that continues the sequence retires the snapshot
/// stream, and from then on any gap or a second of silence throws the
/// client back to waiting for a snapshot.
///
/// ```text
///            snapshot                 update(seq == expected)
/// WaitForInit ──────▶ WaitForUpdate ─────────────────────────▶ ReceiveUpdates
///      ▲                   │ update(seq != expected)                │
///      └───────────────────┴────────── gap or timeout ──────────────┘
/// ```
///
/// The machine is pure: it reports what should happen as
/// [`StreamAction`]s and never touches the bus itself.
#[derive(Debug, Clone)]
pub struct UpdateStreamMachine {
    stage: StreamStage,
    expected: u64,
    last_update: Option<Instant>,
    updates_subscribed: bool,
    full_subscribed: bool,
}

impl Default for UpdateStreamMachine {
    fn default() -> Self {
        Self {
            stage: StreamStage::WaitForInit,
            expected: 0,
            last_update: None,
            updates_subscribed: false,
            full_subscribed: true,
        }
    }
}

impl UpdateStreamMachine {
    pub fn stage(&self) -> StreamStage {
        self.stage
    }

    pub fn expected_sequence(&self) -> u64 {
        self.expected
    }

    pub fn is_full_subscribed(&self) -> bool {
        self.full_subscribed
    }

    pub fn is_updates_subscribed(&self) -> bool {
        self.updates_subscribed
    }

    fn set_stage(&mut self, stage: StreamStage) {
        debug!("Update stream stage: {:?}", stage);
        self.stage = stage;
    }

    fn unsubscribe_updates(&mut self, actions: &mut Vec<StreamAction>) {
        if self.updates_subscribed {
            self.updates_subscribed = false;
            actions.push(StreamAction::UnsubscribeUpdates);
        }
    }

    fn subscribe_full(&mut self, actions: &mut Vec<StreamAction>) {
        if !self.full_subscribed {
            self.full_subscribed = true;
            actions.push(StreamAction::SubscribeFull);
        }
    }

    pub fn on_init(&mut self, seq_num: u64) -> Vec<StreamAction> {
        let mut actions = Vec::new();
        if self.stage == StreamStage::ReceiveUpdates {
            return actions;
        }
        if !self.updates_subscribed {
            self.updates_subscribed = true;
            actions.push(StreamAction::SubscribeUpdates);
        }
        self.set_stage(StreamStage::WaitForUpdate);
        self.expected = seq_num;
        actions.push(StreamAction::ApplyInit);
        actions
    }

    pub fn on_update(&mut self, seq_num: u64, update_type: u8, now: Instant) -> Vec<StreamAction> {
        let mut actions = Vec::new();
        self.last_update = Some(now);
        if update_type == InteractiveMarkerUpdate::UPDATE {
            self.expected = self.expected.wrapping_add(1);
        }

        match self.stage {
            StreamStage::WaitForInit => return actions,
            StreamStage::WaitForUpdate => {
                if seq_num != self.expected {
                    warn!(
                        "Update {} does not follow snapshot (expected {}), waiting for a new snapshot",
                        seq_num, self.expected
                    );
                    self.set_stage(StreamStage::WaitForInit);
                    self.unsubscribe_updates(&mut actions);
                    return actions;
                }
                if self.full_subscribed {
                    self.full_subscribed = false;
                    actions.push(StreamAction::UnsubscribeFull);
                }
                self.set_stage(StreamStage::ReceiveUpdates);
                info!("Marker update stream synchronised at {}", seq_num);
            }
            StreamStage::ReceiveUpdates => {
                if seq_num != self.expected {
                    warn!(
                        "Update sequence gap: got {}, expected {}. Resynchronising",
                        seq_num, self.expected
                    );
                    self.set_stage(StreamStage::WaitForInit);
                    self.unsubscribe_updates(&mut actions);
                    self.subscribe_full(&mut actions);
                    return actions;
                }
            }
        }

        if update_type == InteractiveMarkerUpdate::UPDATE {
            actions.push(StreamAction::ApplyUpdate);
        }
        actions
    }

    /// Periodic liveness check of the incremental stream.
    pub fn on_watchdog(&mut self, now: Instant) -> Vec<StreamAction> {
        let mut actions = Vec::new();
        if self.stage != StreamStage::ReceiveUpdates {
            return actions;
        }
        let timeout = Duration::from_millis(UPDATE_TIMEOUT_MS);
        let silent = self
            .last_update
            .is_none_or(|last| now.saturating_duration_since(last) > timeout);
        if !silent {
            return actions;
        }
        warn!("Interactive marker updates timed out, resynchronising");
        self.set_stage(StreamStage::WaitForInit);
        self.unsubscribe_updates(&mut actions);
        self.subscribe_full(&mut actions);
        actions.push(StreamAction::ClearMarkers);
        actions
    }

    /// Start over, for a new topic root. The snapshot stream is always
    /// (re)subscribed since its topic changed.
    pub fn reset(&mut self) -> Vec<StreamAction> {
        let mut actions = Vec::new();
        self.set_stage(StreamStage::WaitForInit);
        self.unsubscribe_updates(&mut actions);
        if self.full_subscribed {
            actions.push(StreamAction::UnsubscribeFull);
        }
        self.full_subscribed = true;
        actions.push(StreamAction::SubscribeFull);
        actions
    }
}

struct StreamState {
    machine: UpdateStreamMachine,
    topic_root: String,
    full: Option<Subscription>,
    updates: Option<Subscription>,
}

struct Inner {
    bus: LocalBus,
    sink: Arc<dyn MarkerUpdateSink>,
    state: Mutex<StreamState>,
    /// Held across sink calls, taken before `state` is released.
    delivery: Mutex<()>,
}

enum Trigger<'a> {
    Init(&'a InteractiveMarkerInit),
    Update(&'a InteractiveMarkerUpdate),
    Nothing,
}

impl Inner {
    fn subscribe_full(self: &Arc<Self>, state: &mut StreamState) -> Result<(), BusError> {
        let topic = format!("{}{}", state.topic_root, UPDATE_FULL_SUFFIX);
        let weak = Arc::downgrade(self);
        state.full = Some(self.bus.subscribe(
            &topic,
            QUEUE_DEPTH,
            move |init: &InteractiveMarkerInit| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_init(init);
                }
            },
        )?);
        debug!("Listening for marker snapshots on {}", topic);
        Ok(())
    }

    fn subscribe_updates(self: &Arc<Self>, state: &mut StreamState) -> Result<(), BusError> {
        let topic = format!("{}{}", state.topic_root, UPDATE_SUFFIX);
        let weak = Arc::downgrade(self);
        state.updates = Some(self.bus.subscribe(
            &topic,
            QUEUE_DEPTH,
            move |update: &InteractiveMarkerUpdate| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_update(update, Instant::now());
                }
            },
        )?);
        Ok(())
    }

    /// Advance the machine with `step` and carry out what it asks for.
    ///
    /// The step and the subscription changes it requests share one
    /// acquisition of the state lock, so no other trigger can observe the
    /// machine ahead of the bus. Sink calls run after the state lock is
    /// released but before the delivery lock is, keeping them in step order.
    fn advance(
        self: &Arc<Self>,
        step: impl FnOnce(&mut StreamState) -> Vec<StreamAction>,
        trigger: Trigger<'_>,
    ) {
        let mut deliver = Vec::new();
        let _delivery = {
            let mut state = self.state.lock();
            for action in step(&mut *state) {
                let result = match action {
                    StreamAction::SubscribeFull => self.subscribe_full(&mut state),
                    StreamAction::SubscribeUpdates => self.subscribe_updates(&mut state),
                    StreamAction::UnsubscribeFull => {
                        if let Some(subscription) = state.full.take() {
                            subscription.shutdown();
                        }
                        Ok(())
                    }
                    StreamAction::UnsubscribeUpdates => {
                        if let Some(subscription) = state.updates.take() {
                            subscription.shutdown();
                        }
                        Ok(())
                    }
                    sink_action => {
                        deliver.push(sink_action);
                        Ok(())
                    }
                };
                if let Err(e) = result {
                    error!("Marker stream subscription failed: {}", e);
                }
            }
            self.delivery.lock()
        };

        for action in deliver {
            match (action, &trigger) {
                (StreamAction::ApplyInit, Trigger::Init(init)) => self.sink.receive_init(init),
                (StreamAction::ApplyUpdate, Trigger::Update(update)) => {
                    self.sink.receive_update(update)
                }
                (StreamAction::ClearMarkers, _) => self.sink.clear(),
                _ => {}
            }
        }
    }

    fn on_init(self: &Arc<Self>, init: &InteractiveMarkerInit) {
        self.advance(
            |state| state.machine.on_init(init.seq_num),
            Trigger::Init(init),
        );
    }

    fn on_update(self: &Arc<Self>, update: &InteractiveMarkerUpdate, now: Instant) {
        self.advance(
            |state| {
                state
                    .machine
                    .on_update(update.seq_num, update.update_type, now)
            },
            Trigger::Update(update),
        );
    }

    fn on_watchdog(self: &Arc<Self>, now: Instant) {
        self.advance(|state| state.machine.on_watchdog(now), Trigger::Nothing);
    }
}

/// Drives [`UpdateStreamMachine`] from bus subscriptions under one topic
/// root, with a background watchdog thread ticking once per period.
pub struct InteractiveMarkerSubscriptionManager {
    inner: Arc<Inner>,
    shutdown: Option<Sender<()>>,
    watchdog: Option<JoinHandle<()>>,
}

impl InteractiveMarkerSubscriptionManager {
    pub fn new(
        bus: LocalBus,
        topic_root: &str,
        sink: Arc<dyn MarkerUpdateSink>,
    ) -> Result<Self, BusError> {
        let inner = Arc::new(Inner {
            bus,
            sink,
            state: Mutex::new(StreamState {
                machine: UpdateStreamMachine::default(),
                topic_root: topic_root.to_string(),
                full: None,
                updates: None,
            }),
            delivery: Mutex::new(()),
        });
        inner.subscribe_full(&mut inner.state.lock())?;
        info!("Interactive marker subscription manager on {}", topic_root);

        let (shutdown, stop) = crossbeam_channel::bounded::<()>(1);
        let watchdog = spawn_watchdog(Arc::downgrade(&inner), stop);

        Ok(Self {
            inner,
            shutdown: Some(shutdown),
            watchdog,
        })
    }

    pub fn stage(&self) -> StreamStage {
        self.inner.state.lock().machine.stage()
    }

    pub fn topic_root(&self) -> String {
        self.inner.state.lock().topic_root.clone()
    }

    /// Switch to another server. Drops the incremental subscription and
    /// waits for a snapshot on the new root.
    pub fn set_topic(&self, topic_root: &str) {
        self.inner.advance(
            |state| {
                state.topic_root = topic_root.to_string();
                state.machine.reset()
            },
            Trigger::Nothing,
        );
        info!("Interactive marker subscription moved to {}", topic_root);
    }

    /// Run the liveness check now, as if the watchdog ticked at `now`.
    pub fn check_watchdog(&self, now: Instant) {
        self.inner.on_watchdog(now);
    }
}

impl Drop for InteractiveMarkerSubscriptionManager {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.watchdog.take() {
            if handle.join().is_err() {
                error!("Marker stream watchdog panicked");
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn_watchdog(
    inner: Weak<Inner>,
    stop: crossbeam_channel::Receiver<()>,
) -> Option<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("marker-stream-watchdog".into())
        .spawn(move || watchdog_loop(inner, stop))
        .map_err(|e| error!("Could not start marker stream watchdog: {}", e))
        .ok()
}

/// No threads on the web; the layer polls [`InteractiveMarkerSubscriptionManager::check_watchdog`]
/// once per frame instead.
#[cfg(target_arch = "wasm32")]
fn spawn_watchdog(
    _inner: Weak<Inner>,
    _stop: crossbeam_channel::Receiver<()>,
) -> Option<JoinHandle<()>> {
    None
}

#[cfg_attr(target_arch = "wasm32", allow(dead_code))]
fn watchdog_loop(inner: Weak<Inner>, stop: crossbeam_channel::Receiver<()>) {
    let ticker = tick(Duration::from_millis(WATCHDOG_PERIOD_MS));
    loop {
        select! {
            recv(ticker) -> _ => {
                let Some(inner) = inner.upgrade() else {
                    return;
                };
                inner.on_watchdog(Instant::now());
            }
            recv(stop) -> _ => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(seq_num: u64) -> (u64, u8) {
        (seq_num, InteractiveMarkerUpdate::UPDATE)
    }

    #[test]
    fn sequence_gap_forces_one_resubscription() {
        let mut machine = UpdateStreamMachine::default();
        let now = Instant::now();
        assert_eq!(machine.stage(), StreamStage::WaitForInit);

        let actions = machine.on_init(5);
        assert_eq!(
            actions,
            vec![StreamAction::SubscribeUpdates, StreamAction::ApplyInit]
        );
        assert_eq!(machine.stage(), StreamStage::WaitForUpdate);

        let (seq, kind) = update(6);
        let actions = machine.on_update(seq, kind, now);
        assert_eq!(
            actions,
            vec![StreamAction::UnsubscribeFull, StreamAction::ApplyUpdate]
        );
        assert_eq!(machine.stage(), StreamStage::ReceiveUpdates);

        let (seq, kind) = update(8);
        let actions = machine.on_update(seq, kind, now);
        assert_eq!(machine.stage(), StreamStage::WaitForInit);
        let resubscribes = actions
            .iter()
            .filter(|a| **a == StreamAction::SubscribeFull)
            .count();
        assert_eq!(resubscribes, 1);
        assert!(actions.contains(&StreamAction::UnsubscribeUpdates));
        assert!(!actions.contains(&StreamAction::ApplyUpdate));
    }

    #[test]
    fn keep_alive_does_not_advance_sequence() {
        let mut machine = UpdateStreamMachine::default();
        let now = Instant::now();
        machine.on_init(3);
        machine.on_update(4, InteractiveMarkerUpdate::UPDATE, now);

        let actions = machine.on_update(4, InteractiveMarkerUpdate::KEEP_ALIVE, now);
        assert!(actions.is_empty());
        assert_eq!(machine.stage(), StreamStage::ReceiveUpdates);
        assert_eq!(machine.expected_sequence(), 4);
    }

    #[test]
    fn mismatch_while_waiting_drops_updates_but_keeps_snapshots() {
        let mut machine = UpdateStreamMachine::default();
        machine.on_init(10);
        let actions = machine.on_update(20, InteractiveMarkerUpdate::UPDATE, Instant::now());
        assert_eq!(actions, vec![StreamAction::UnsubscribeUpdates]);
        assert_eq!(machine.stage(), StreamStage::WaitForInit);
        assert!(machine.is_full_subscribed());
    }

    #[test]
    fn silence_times_out_and_clears() {
        let mut machine = UpdateStreamMachine::default();
        let start = Instant::now();
        machine.on_init(1);
        machine.on_update(2, InteractiveMarkerUpdate::UPDATE, start);

        assert!(machine.on_watchdog(start + Duration::from_millis(500)).is_empty());
        let actions = machine.on_watchdog(start + Duration::from_millis(1500));
        assert_eq!(
            actions,
            vec![
                StreamAction::UnsubscribeUpdates,
                StreamAction::SubscribeFull,
                StreamAction::ClearMarkers
            ]
        );
        assert_eq!(machine.stage(), StreamStage::WaitForInit);
    }

    #[test]
    fn snapshots_are_ignored_once_synchronised() {
        let mut machine = UpdateStreamMachine::default();
        machine.on_init(1);
        machine.on_update(2, InteractiveMarkerUpdate::UPDATE, Instant::now());
        assert!(machine.on_init(7).is_empty());
        assert_eq!(machine.expected_sequence(), 2);
    }

    #[derive(Default)]
    struct CountingSink {
        inits: Mutex<Vec<u64>>,
        updates: Mutex<Vec<u64>>,
        clears: Mutex<usize>,
    }

    impl MarkerUpdateSink for CountingSink {
        fn receive_init(&self, init: &InteractiveMarkerInit) {
            self.inits.lock().push(init.seq_num);
        }

        fn receive_update(&self, update: &InteractiveMarkerUpdate) {
            self.updates.lock().push(update.seq_num);
        }

        fn clear(&self) {
            *self.clears.lock() += 1;
        }
    }

    fn publish_update(bus: &LocalBus, root: &str, seq_num: u64) {
        bus.publish(
            &format!("{root}{UPDATE_SUFFIX}"),
            InteractiveMarkerUpdate {
                seq_num,
                update_type: InteractiveMarkerUpdate::UPDATE,
                ..Default::default()
            },
        )
        .unwrap();
    }

    fn publish_init(bus: &LocalBus, root: &str, seq_num: u64) {
        bus.publish(
            &format!("{root}{UPDATE_FULL_SUFFIX}"),
            InteractiveMarkerInit {
                seq_num,
                ..Default::default()
            },
        )
        .unwrap();
    }

    #[test]
    fn manager_follows_bus_traffic() {
        let bus = LocalBus::new();
        let sink = Arc::new(CountingSink::default());
        let manager =
            InteractiveMarkerSubscriptionManager::new(bus.clone(), "/im", sink.clone()).unwrap();
        assert_eq!(bus.subscriber_count("/im/update_full"), 1);
        assert_eq!(bus.subscriber_count("/im/update"), 0);

        publish_init(&bus, "/im", 5);
        bus.spin_once();
        assert_eq!(*sink.inits.lock(), vec![5]);
        assert_eq!(bus.subscriber_count("/im/update"), 1);

        publish_update(&bus, "/im", 6);
        bus.spin_once();
        assert_eq!(manager.stage(), StreamStage::ReceiveUpdates);
        assert_eq!(bus.subscriber_count("/im/update_full"), 0);
        assert_eq!(*sink.updates.lock(), vec![6]);

        manager.check_watchdog(Instant::now() + Duration::from_secs(5));
        assert_eq!(manager.stage(), StreamStage::WaitForInit);
        assert_eq!(*sink.clears.lock(), 1);
        assert_eq!(bus.subscriber_count("/im/update_full"), 1);
        assert_eq!(bus.subscriber_count("/im/update"), 0);
    }

    fn assert_bus_matches_machine(manager: &InteractiveMarkerSubscriptionManager, bus: &LocalBus) {
        let (full, updates) = {
            let state = manager.inner.state.lock();
            assert_eq!(state.full.is_some(), state.machine.is_full_subscribed());
            assert_eq!(state.updates.is_some(), state.machine.is_updates_subscribed());
            (state.full.is_some(), state.updates.is_some())
        };
        assert_eq!(bus.subscriber_count("/im/update_full"), usize::from(full));
        assert_eq!(bus.subscriber_count("/im/update"), usize::from(updates));
    }

    #[test]
    fn watchdog_racing_bus_traffic_keeps_subscriptions_in_step() {
        let bus = LocalBus::new();
        let sink = Arc::new(CountingSink::default());
        let manager = Arc::new(
            InteractiveMarkerSubscriptionManager::new(bus.clone(), "/im", sink.clone()).unwrap(),
        );

        let racer = manager.clone();
        let watchdog = std::thread::spawn(move || {
            let late = Instant::now() + Duration::from_secs(5);
            for _ in 0..2000 {
                racer.check_watchdog(late);
            }
        });
        for round in 0..200u64 {
            publish_init(&bus, "/im", round * 10);
            bus.spin_once();
            publish_update(&bus, "/im", round * 10 + 1);
            bus.spin_once();
        }
        watchdog.join().unwrap();

        assert_bus_matches_machine(&manager, &bus);
        assert!(!sink.inits.lock().is_empty());
    }

    #[test]
    fn topic_change_moves_subscriptions() {
        let bus = LocalBus::new();
        let sink = Arc::new(CountingSink::default());
        let manager =
            InteractiveMarkerSubscriptionManager::new(bus.clone(), "/a", sink.clone()).unwrap();
        publish_init(&bus, "/a", 1);
        bus.spin_once();

        manager.set_topic("/b");
        assert_eq!(manager.topic_root(), "/b");
        assert_eq!(manager.stage(), StreamStage::WaitForInit);
        assert_eq!(bus.subscriber_count("/a/update_full"), 0);
        assert_eq!(bus.subscriber_count("/a/update"), 0);
        assert_eq!(bus.subscriber_count("/b/update_full"), 1);

        publish_init(&bus, "/b", 9);
        bus.spin_once();
        assert_eq!(*sink.inits.lock(), vec![1, 9]);
    }
}
