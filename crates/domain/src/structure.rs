//! Structure: the device's in-memory graph of controls, rooms and states.
//!
//! The structure is the single source of truth for current state values.
//! Every value pushed through [`Structure::set_value_for_uuid`] is stored
//! and announced on a broadcast channel keyed by identifier.

mod control;
mod group;
mod parse;

pub use control::{Control, ControlKind, StateRef};
pub use group::{Category, Room};

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use crate::value::StateValue;

/// Structure handle shared between the device-side collaborator and the
/// component that maps it onto the bus.
pub type SharedStructure = Arc<Mutex<Structure>>;

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Identity of the device the structure was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Serial number, embedded in every topic to keep devices apart.
    pub serial: String,
    pub name: Option<String>,
}

impl DeviceInfo {
    #[must_use]
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            name: None,
        }
    }
}

/// Notification sent whenever a state value is written.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub uuid: String,
    pub value: StateValue,
}

/// The device graph.
#[derive(Debug)]
pub struct Structure {
    info: DeviceInfo,
    controls: BTreeMap<String, Control>,
    rooms: BTreeMap<String, Room>,
    categories: BTreeMap<String, Category>,
    global_states: BTreeMap<String, String>,
    values: HashMap<String, StateValue>,
    changes: broadcast::Sender<StateChange>,
}

impl Structure {
    /// Create an empty structure for the given device.
    #[must_use]
    pub fn new(info: DeviceInfo) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            info,
            controls: BTreeMap::new(),
            rooms: BTreeMap::new(),
            categories: BTreeMap::new(),
            global_states: BTreeMap::new(),
            values: HashMap::new(),
            changes,
        }
    }

    /// Wrap the structure for sharing.
    #[must_use]
    pub fn into_shared(self) -> SharedStructure {
        Arc::new(Mutex::new(self))
    }

    #[must_use]
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Device serial number.
    #[must_use]
    pub fn serial(&self) -> &str {
        &self.info.serial
    }

    /// Top-level controls keyed by their structure key.
    #[must_use]
    pub fn controls(&self) -> &BTreeMap<String, Control> {
        &self.controls
    }

    #[must_use]
    pub fn rooms(&self) -> &BTreeMap<String, Room> {
        &self.rooms
    }

    #[must_use]
    pub fn categories(&self) -> &BTreeMap<String, Category> {
        &self.categories
    }

    /// Global states: name → identifier.
    #[must_use]
    pub fn global_states(&self) -> &BTreeMap<String, String> {
        &self.global_states
    }

    /// Insert a top-level control under its action identifier.
    pub fn insert_control(&mut self, control: Control) {
        self.controls.insert(control.action_id.clone(), control);
    }

    pub fn insert_room(&mut self, room: Room) {
        self.rooms.insert(room.uuid.clone(), room);
    }

    pub fn insert_category(&mut self, category: Category) {
        self.categories.insert(category.uuid.clone(), category);
    }

    pub fn insert_global_state(&mut self, name: impl Into<String>, uuid: impl Into<String>) {
        self.global_states.insert(name.into(), uuid.into());
    }

    /// Store a value and notify subscribers.
    ///
    /// Values are stored for any identifier, known or not; the device may
    /// report signals the structure does not describe.
    pub fn set_value_for_uuid(&mut self, uuid: &str, value: StateValue) {
        self.values.insert(uuid.to_string(), value.clone());
        // Sending only fails when nobody listens.
        let _ = self.changes.send(StateChange {
            uuid: uuid.to_string(),
            value,
        });
    }

    /// Last value stored for an identifier.
    #[must_use]
    pub fn value(&self, uuid: &str) -> Option<&StateValue> {
        self.values.get(uuid)
    }

    /// Subscribe to value changes written *after* this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.changes.subscribe()
    }

    /// Detach every current subscriber.
    ///
    /// Existing receivers observe a closed channel once buffered changes are
    /// drained. New subscriptions made afterwards work normally.
    pub fn detach_listeners(&mut self) {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        self.changes = changes;
    }
}
