//! Adaptor: bidirectional mapping between a structure and the topic bus.
//!
//! An adaptor is bound to exactly one structure. At construction it builds
//! its routing tables and subscribes to the structure's change channel;
//! both are dropped together by [`Adaptor::abort`], and a new structure
//! always gets a new adaptor. After `abort` every method is a silent no-op,
//! since device and bus callbacks can race the teardown.

pub(crate) mod routing;

use std::sync::{Mutex, MutexGuard, PoisonError};

use loxbridge_domain::structure::{SharedStructure, StateChange, Structure};
use loxbridge_domain::value::StateValue;
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::catalog::Catalog;
use crate::config::{AdaptorConfig, CatalogLayout};
use crate::ports::{Command, Publication, PublishSink};
use crate::topic::{StateRoute, TopicPolicy, device_payload};

use routing::{CommandTarget, RoutingTables};

/// Everything released by [`Adaptor::abort`], held in one place so the
/// tables and the structure reference always go away together.
struct Attached<P> {
    structure: SharedStructure,
    changes: Mutex<broadcast::Receiver<StateChange>>,
    tables: RoutingTables,
    sink: P,
}

impl<P: PublishSink> Attached<P> {
    fn publish_change(&self, change: &StateChange) {
        let Some(route) = self.tables.routes.get(&change.uuid) else {
            tracing::trace!(uuid = %change.uuid, "no route for identifier");
            return;
        };
        let payload = match route {
            StateRoute::Topic(_) => change.value.to_string(),
            StateRoute::Field { topic, .. } => {
                let structure = lock(&self.structure);
                let fields = self
                    .tables
                    .device_fields
                    .get(topic)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                device_payload(fields.iter().filter_map(|(field, uuid)| {
                    structure.value(uuid).map(|value| (field.as_str(), value))
                }))
            }
        };
        let retain = !self.tables.pushbuttons.contains(&change.uuid);
        let publication = Publication::new(route.topic(), payload, retain);
        tracing::debug!(
            topic = %publication.topic,
            payload = %publication.payload,
            retain,
            "publishing state"
        );
        self.sink.publish(publication);
    }
}

/// Maps structure state changes to publications and bus commands to
/// device commands.
pub struct Adaptor<P> {
    policy: TopicPolicy,
    icon_path: String,
    catalog_layout: CatalogLayout,
    attached: Option<Attached<P>>,
}

impl<P: PublishSink> Adaptor<P> {
    /// Build the routing tables for `structure`, subscribe to its changes
    /// and attach `sink`.
    ///
    /// Values written before this call are not published.
    pub fn new(structure: SharedStructure, config: &AdaptorConfig, sink: P) -> Self {
        let policy = TopicPolicy::from_config(config);
        let (tables, changes) = {
            let guard = lock(&structure);
            let tables = RoutingTables::build(&guard, &policy);
            tracing::info!(
                serial = %guard.serial(),
                controls = tables.control_paths.len(),
                states = tables.routes.len(),
                "routing tables built"
            );
            (tables, guard.subscribe())
        };

        Self {
            policy,
            icon_path: config.icon_path.clone(),
            catalog_layout: config.catalog_layout,
            attached: Some(Attached {
                structure,
                changes: Mutex::new(changes),
                tables,
                sink,
            }),
        }
    }

    /// Whether [`abort`](Self::abort) has not been called yet.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    /// Write a value into the structure, then publish the resulting change
    /// notifications.
    ///
    /// Values of momentary controls are published without retain.
    /// Unrouted identifiers still reach the structure.
    pub fn set_value_for_uuid(&self, uuid: &str, value: StateValue) {
        let Some(attached) = &self.attached else {
            tracing::trace!(uuid, "adaptor aborted, dropping value");
            return;
        };

        lock(&attached.structure).set_value_for_uuid(uuid, value);
        self.publish_pending_changes();
    }

    /// Publish every change notified by the structure since the previous
    /// call, whoever wrote the value.
    pub fn publish_pending_changes(&self) {
        let Some(attached) = &self.attached else {
            return;
        };

        let mut changes = attached
            .changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            match changes.try_recv() {
                Ok(change) => attached.publish_change(&change),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "state changes overflowed before publishing");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return,
            }
        }
    }

    /// Resolve a bus message into a device command.
    ///
    /// Returns `None` for anything this adaptor does not own: topics without
    /// the command suffix, unknown paths, the global-states target, and
    /// every topic once aborted.
    #[must_use]
    pub fn command_from_topic(&self, topic: &str, payload: &str) -> Option<Command> {
        let attached = self.attached.as_ref()?;
        let path = self.policy.command_path(topic)?;
        match attached.tables.targets.get(path) {
            Some(CommandTarget::Control { action_id }) => Some(Command {
                action_id: action_id.clone(),
                command: payload.to_string(),
            }),
            Some(CommandTarget::GlobalStates) | None => {
                tracing::trace!(topic, "topic is not a command for this adaptor");
                None
            }
        }
    }

    /// Wildcard patterns covering every command topic this adaptor resolves.
    ///
    /// Empty once aborted.
    #[must_use]
    pub fn topics_for_subscription(&self) -> Vec<String> {
        self.attached
            .as_ref()
            .map(|attached| self.policy.subscription_patterns(attached.tables.max_depth))
            .unwrap_or_default()
    }

    /// Action identifier registered under a command path.
    #[must_use]
    pub fn action_for_path(&self, path: &str) -> Option<&str> {
        match self.attached.as_ref()?.tables.targets.get(path)? {
            CommandTarget::Control { action_id } => Some(action_id),
            CommandTarget::GlobalStates => None,
        }
    }

    /// Publish route of a state identifier.
    #[must_use]
    pub fn route_for_uuid(&self, uuid: &str) -> Option<&StateRoute> {
        self.attached.as_ref()?.tables.routes.get(uuid)
    }

    /// Project the structure and routing tables into a catalog.
    #[must_use]
    pub fn catalog(&self) -> Option<Catalog> {
        let attached = self.attached.as_ref()?;
        let structure = lock(&attached.structure);
        Some(Catalog::build(&structure, &attached.tables, &self.icon_path))
    }

    /// Publish the catalog as one retained message on the catalog topic.
    pub fn publish_structure(&self) {
        let Some(attached) = &self.attached else {
            return;
        };
        let Some(catalog) = self.catalog() else {
            return;
        };

        let payload = catalog
            .to_document(self.catalog_layout)
            .and_then(|document| serde_json::to_string(&document));
        match payload {
            Ok(payload) => {
                let topic = self.policy.catalog_topic();
                tracing::info!(
                    %topic,
                    controls = catalog.controls.len(),
                    "publishing structure catalog"
                );
                attached.sink.publish(Publication::new(topic, payload, true));
            }
            Err(err) => tracing::error!(error = %err, "failed to serialize structure catalog"),
        }
    }

    /// Tear down: detach structure listeners (this adaptor's included),
    /// release the structure, and drop the routing tables and the sink. Safe
    /// to call more than once.
    pub fn abort(&mut self) {
        if let Some(attached) = self.attached.take() {
            lock(&attached.structure).detach_listeners();
            tracing::info!("adaptor aborted");
        }
    }
}

fn lock(structure: &SharedStructure) -> MutexGuard<'_, Structure> {
    structure.lock().unwrap_or_else(PoisonError::into_inner)
}
