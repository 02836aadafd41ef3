#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Last-write-wins mission state channel.
//!
//! The simulator publishes [`MissionState`] snapshots under a key and every
//! subscriber of that key is notified with the decoded value. Values are
//! stored as raw JSON because the channel is externally writable: readers
//! always go through [`decode_state`], which fills missing or malformed
//! fields with safe defaults instead of failing.

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, VecDeque},
    rc::Rc,
};

use crop_mission_core::{Drone, MissionMode, MissionState, StreamPoint};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

/// Callback invoked with the latest state of a key, or `None` when the key
/// holds no state.
pub type Listener = Box<dyn FnMut(Option<&MissionState>)>;

/// Handle identifying a single subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Publish/subscribe contract between the simulator and its consumers.
pub trait MissionChannel {
    /// Stores `state` under `key`, replacing any previous value, and notifies
    /// every subscriber of `key`.
    fn publish(&self, key: &str, state: &MissionState);

    /// Registers `listener` for `key`. The listener fires immediately with
    /// the current value and again after every publish.
    fn subscribe(&self, key: &str, listener: Listener) -> SubscriptionId;

    /// Removes a subscription. Unknown handles are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

impl<C: MissionChannel + ?Sized> MissionChannel for Rc<C> {
    fn publish(&self, key: &str, state: &MissionState) {
        (**self).publish(key, state);
    }

    fn subscribe(&self, key: &str, listener: Listener) -> SubscriptionId {
        (**self).subscribe(key, listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        (**self).unsubscribe(id);
    }
}

impl<C: MissionChannel + ?Sized> MissionChannel for &C {
    fn publish(&self, key: &str, state: &MissionState) {
        (**self).publish(key, state);
    }

    fn subscribe(&self, key: &str, listener: Listener) -> SubscriptionId {
        (**self).subscribe(key, listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        (**self).unsubscribe(id);
    }
}

struct Subscriber {
    id: SubscriptionId,
    key: String,
    listener: Listener,
}

#[derive(Debug)]
struct Entry {
    value: Value,
    revision: u64,
}

/// Single-threaded in-memory channel.
///
/// Listeners may subscribe, unsubscribe or publish from inside a callback.
/// A publish issued from inside a callback is stored immediately and queued;
/// once the outermost notification returns, every subscriber of that key is
/// notified again with the latest stored value.
#[derive(Default)]
pub struct MemoryChannel {
    entries: RefCell<HashMap<String, Entry>>,
    subscribers: RefCell<Vec<Subscriber>>,
    cancelled: RefCell<Vec<SubscriptionId>>,
    pending: RefCell<VecDeque<String>>,
    next_id: Cell<u64>,
    dispatch_depth: Cell<u32>,
}

impl std::fmt::Debug for MemoryChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryChannel")
            .field("entries", &self.entries.borrow())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl MemoryChannel {
    /// Creates an empty channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an arbitrary JSON payload under `key` and notifies subscribers.
    ///
    /// This is the entry point for external writers; the payload does not
    /// need to match the [`MissionState`] shape.
    pub fn publish_raw(&self, key: &str, value: Value) {
        if self.dispatch_depth.get() > 0 {
            self.store(key, value);
            let mut pending = self.pending.borrow_mut();
            if !pending.iter().any(|queued| queued == key) {
                pending.push_back(key.to_owned());
            }
            return;
        }

        let state = decode_state(&value);
        self.store(key, value);
        self.dispatch(key, state.as_ref());

        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(key) = next else {
                break;
            };
            let state = self.read(&key);
            self.dispatch(&key, state.as_ref());
        }
    }

    /// Reads and decodes the state stored under `key`.
    #[must_use]
    pub fn read(&self, key: &str) -> Option<MissionState> {
        self.entries
            .borrow()
            .get(key)
            .and_then(|entry| decode_state(&entry.value))
    }

    /// Number of writes accepted for `key`.
    #[must_use]
    pub fn revision(&self, key: &str) -> u64 {
        self.entries
            .borrow()
            .get(key)
            .map_or(0, |entry| entry.revision)
    }

    /// Number of live subscriptions across all keys.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let cancelled = self.cancelled.borrow();
        self.subscribers
            .borrow()
            .iter()
            .filter(|subscriber| !cancelled.contains(&subscriber.id))
            .count()
    }

    fn allocate_id(&self) -> SubscriptionId {
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1));
        SubscriptionId(id)
    }

    fn store(&self, key: &str, value: Value) {
        let mut entries = self.entries.borrow_mut();
        let entry = entries.entry(key.to_owned()).or_insert(Entry {
            value: Value::Null,
            revision: 0,
        });
        entry.value = value;
        entry.revision = entry.revision.saturating_add(1);
    }

    fn dispatch(&self, key: &str, state: Option<&MissionState>) {
        let mut active = std::mem::take(&mut *self.subscribers.borrow_mut());
        self.dispatch_depth.set(self.dispatch_depth.get() + 1);

        for subscriber in active.iter_mut().filter(|subscriber| subscriber.key == key) {
            if self.cancelled.borrow().contains(&subscriber.id) {
                continue;
            }
            (subscriber.listener)(state);
        }

        self.dispatch_depth.set(self.dispatch_depth.get() - 1);

        let mut subscribers = self.subscribers.borrow_mut();
        let added = std::mem::replace(&mut *subscribers, active);
        subscribers.extend(added);

        if self.dispatch_depth.get() == 0 {
            let cancelled = std::mem::take(&mut *self.cancelled.borrow_mut());
            subscribers.retain(|subscriber| !cancelled.contains(&subscriber.id));
        }
    }
}

impl MissionChannel for MemoryChannel {
    fn publish(&self, key: &str, state: &MissionState) {
        match serde_json::to_value(state) {
            Ok(value) => self.publish_raw(key, value),
            Err(error) => warn!(%key, %error, "dropping unserializable mission state"),
        }
    }

    fn subscribe(&self, key: &str, mut listener: Listener) -> SubscriptionId {
        let id = self.allocate_id();
        let current = self.read(key);
        listener(current.as_ref());
        self.subscribers.borrow_mut().push(Subscriber {
            id,
            key: key.to_owned(),
            listener,
        });
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        if self.dispatch_depth.get() > 0 {
            self.cancelled.borrow_mut().push(id);
        }
        self.subscribers
            .borrow_mut()
            .retain(|subscriber| subscriber.id != id);
    }
}

/// Decodes a channel payload into a [`MissionState`].
///
/// `null` means "no mission yet" and yields `None`, as does any payload that
/// is not a JSON object. Inside an object every field is decoded on its own:
/// a missing or malformed field falls back to its default and a malformed
/// stream entry is skipped, so one bad field never hides the rest.
#[must_use]
pub fn decode_state(value: &Value) -> Option<MissionState> {
    match value {
        Value::Null => None,
        Value::Object(object) => Some(decode_object(object)),
        other => {
            warn!(payload = %other, "ignoring non-object mission payload");
            None
        }
    }
}

fn decode_object(object: &Map<String, Value>) -> MissionState {
    let mode: MissionMode = field(object, "mode");
    let drone: Drone = field(object, "drone");
    let status: String = field(object, "status");

    let stream = match object.get("stream") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match serde_json::from_value::<StreamPoint>(item.clone()) {
                Ok(point) => Some(point),
                Err(error) => {
                    warn!(%error, "skipping malformed stream point");
                    None
                }
            })
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            warn!(payload = %other, "stream field is not an array; treating as empty");
            Vec::new()
        }
    };

    MissionState {
        mode,
        drone,
        stream,
        status,
    }
}

fn field<T>(object: &Map<String, Value>, name: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match object.get(name) {
        None | Some(Value::Null) => T::default(),
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|error| {
            warn!(field = name, %error, "defaulting malformed mission field");
            T::default()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const KEY: &str = "missions/current";

    fn recording_listener() -> (Rc<RefCell<Vec<Option<MissionState>>>>, Listener) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let listener: Listener = Box::new(move |state: Option<&MissionState>| {
            sink.borrow_mut().push(state.cloned());
        });
        (seen, listener)
    }

    #[test]
    fn subscribe_fires_with_none_before_any_publish() {
        let channel = MemoryChannel::new();
        let (seen, listener) = recording_listener();

        let _ = channel.subscribe(KEY, listener);

        assert_eq!(*seen.borrow(), vec![None]);
    }

    #[test]
    fn last_write_wins() {
        let channel = MemoryChannel::new();
        channel.publish(KEY, &MissionState::simulated(Drone::Scan, Vec::new(), "first"));
        channel.publish(KEY, &MissionState::simulated(Drone::Spray, Vec::new(), "second"));

        let state = channel.read(KEY).expect("state stored");
        assert_eq!(state.status, "second");
        assert_eq!(state.drone, Drone::Spray);
        assert_eq!(channel.revision(KEY), 2);
    }

    #[test]
    fn subscribers_only_hear_their_key() {
        let channel = MemoryChannel::new();
        let (seen, listener) = recording_listener();
        let _ = channel.subscribe(KEY, listener);

        channel.publish("missions/other", &MissionState::default());
        channel.publish(KEY, &MissionState::simulated(Drone::Scan, Vec::new(), "hit"));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].as_ref().map(|state| state.status.as_str()), Some("hit"));
    }

    #[test]
    fn unsubscribe_stops_delivery_and_tolerates_repeats() {
        let channel = MemoryChannel::new();
        let (seen, listener) = recording_listener();
        let id = channel.subscribe(KEY, listener);

        channel.unsubscribe(id);
        channel.unsubscribe(id);
        channel.publish(KEY, &MissionState::default());

        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[test]
    fn listener_may_unsubscribe_itself_during_dispatch() {
        let channel = Rc::new(MemoryChannel::new());
        let slot: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));
        let calls = Rc::new(Cell::new(0_u32));

        let inner_channel = Rc::clone(&channel);
        let inner_slot = Rc::clone(&slot);
        let inner_calls = Rc::clone(&calls);
        let id = channel.subscribe(
            KEY,
            Box::new(move |_state: Option<&MissionState>| {
                inner_calls.set(inner_calls.get() + 1);
                if let Some(id) = inner_slot.get() {
                    inner_channel.unsubscribe(id);
                }
            }),
        );
        slot.set(Some(id));

        channel.publish(KEY, &MissionState::default());
        channel.publish(KEY, &MissionState::default());

        assert_eq!(calls.get(), 2, "initial fire plus one publish");
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[test]
    fn publish_from_a_listener_reaches_every_subscriber() {
        let channel = Rc::new(MemoryChannel::new());
        let writer = Rc::clone(&channel);
        let _ = channel.subscribe(
            KEY,
            Box::new(move |state: Option<&MissionState>| {
                if matches!(state, Some(state) if state.status == "first") {
                    writer.publish(KEY, &MissionState::simulated(Drone::Spray, Vec::new(), "second"));
                }
            }),
        );
        let (seen, listener) = recording_listener();
        let _ = channel.subscribe(KEY, listener);

        channel.publish(KEY, &MissionState::simulated(Drone::Scan, Vec::new(), "first"));

        let statuses: Vec<Option<String>> = seen
            .borrow()
            .iter()
            .map(|state| state.as_ref().map(|state| state.status.clone()))
            .collect();
        assert_eq!(
            statuses,
            vec![None, Some("first".to_owned()), Some("second".to_owned())]
        );
        assert_eq!(
            channel.read(KEY).map(|state| state.status),
            Some("second".to_owned())
        );
        assert_eq!(channel.revision(KEY), 2);
    }

    #[test]
    fn malformed_fields_default_individually() {
        let state = decode_state(&json!({
            "mode": 42,
            "drone": "hover",
            "status": "still here",
            "stream": [
                {"timestamp": 1, "lat": 1.0, "lng": 2.0, "stressScore": 0.4, "imageUrl": "a"},
                "garbage",
                {"timestamp": 2, "lat": "north"}
            ]
        }))
        .expect("object payload decodes");

        assert_eq!(state.mode, MissionMode::Test);
        assert_eq!(state.drone, Drone::Scan);
        assert_eq!(state.status, "still here");
        assert_eq!(state.stream.len(), 1);
        assert_eq!(state.stream[0].timestamp, 1);
    }

    #[test]
    fn non_object_payloads_read_as_absent() {
        assert_eq!(decode_state(&Value::Null), None);
        assert_eq!(decode_state(&json!([1, 2, 3])), None);
        assert_eq!(decode_state(&json!("mission")), None);
    }

    #[test]
    fn raw_partial_payload_reaches_subscribers_with_defaults() {
        let channel = MemoryChannel::new();
        let (seen, listener) = recording_listener();
        let _ = channel.subscribe(KEY, listener);

        channel.publish_raw(KEY, json!({"status": "legacy"}));

        let seen = seen.borrow();
        let state = seen[1].as_ref().expect("object payload decodes");
        assert!(state.stream.is_empty());
        assert_eq!(state.status, "legacy");
    }
}
