//! Routing tables derived from a structure.
//!
//! Built in one pass and never patched; a new structure means new tables.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use loxbridge_domain::structure::{Control, Structure};

use crate::topic::{GLOBAL_STATES_PATH, StateRoute, TopicPolicy};

/// What a command path addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CommandTarget {
    Control { action_id: String },
    /// Synthetic target for the global states; accepts no commands.
    GlobalStates,
}

#[derive(Debug, Default)]
pub(crate) struct RoutingTables {
    /// Command path → target.
    pub(crate) targets: HashMap<String, CommandTarget>,
    /// State identifier → publish route.
    pub(crate) routes: HashMap<String, StateRoute>,
    /// Per-device topic → `(field, identifier)` of every state sharing it.
    pub(crate) device_fields: HashMap<String, Vec<(String, String)>>,
    /// Identifiers belonging to momentary controls.
    pub(crate) pushbuttons: HashSet<String>,
    /// Action identifier → command path, for the catalog.
    pub(crate) control_paths: HashMap<String, String>,
    /// Deepest sub-control nesting seen; 0 when there are no sub-controls.
    pub(crate) max_depth: usize,
}

impl RoutingTables {
    pub(crate) fn build(structure: &Structure, policy: &TopicPolicy) -> Self {
        let mut tables = Self::default();

        for control in structure.controls().values() {
            let path = policy.control_path(structure.serial(), &control.action_id);
            tables.add_control(policy, control, path, 0);
        }

        tables.targets.insert(
            GLOBAL_STATES_PATH.to_string(),
            CommandTarget::GlobalStates,
        );
        for (name, uuid) in structure.global_states() {
            tables.add_route(uuid, policy.global_state_route(name));
        }

        tables
    }

    fn add_control(&mut self, policy: &TopicPolicy, control: &Control, path: String, depth: usize) {
        self.max_depth = self.max_depth.max(depth);

        let pushbutton = control.is_pushbutton();
        if pushbutton {
            self.pushbuttons.insert(control.action_id.clone());
        }

        for (name, state) in &control.states {
            for (index, uuid) in state.identifiers() {
                if pushbutton {
                    self.pushbuttons.insert(uuid.to_string());
                }
                self.add_route(uuid, policy.state_route(&path, name, index));
            }
        }

        for sub in &control.sub_controls {
            let sub_path = policy.sub_control_path(&path, &control.action_id, &sub.action_id);
            self.add_control(policy, sub, sub_path, depth + 1);
        }

        match self.targets.entry(path) {
            Entry::Occupied(entry) => {
                tracing::warn!(
                    path = %entry.key(),
                    action_id = %control.action_id,
                    "duplicate control path, keeping the first control"
                );
            }
            Entry::Vacant(entry) => {
                self.control_paths
                    .entry(control.action_id.clone())
                    .or_insert_with(|| entry.key().clone());
                entry.insert(CommandTarget::Control {
                    action_id: control.action_id.clone(),
                });
            }
        }
    }

    fn add_route(&mut self, uuid: &str, route: StateRoute) {
        match self.routes.entry(uuid.to_string()) {
            Entry::Occupied(entry) => {
                tracing::warn!(
                    uuid,
                    kept = %entry.get().topic(),
                    dropped = %route.topic(),
                    "identifier routed twice, keeping the first route"
                );
            }
            Entry::Vacant(entry) => {
                if let StateRoute::Field { topic, field } = &route {
                    self.device_fields
                        .entry(topic.clone())
                        .or_default()
                        .push((field.clone(), uuid.to_string()));
                }
                entry.insert(route);
            }
        }
    }
}
