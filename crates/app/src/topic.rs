//! Topic policy: folds the hierarchical structure into flat topic names.
//!
//! Every topic the adaptor publishes to, resolves commands from, or lists in
//! the catalog is produced here, so routing tables, subscription patterns and
//! the catalog cannot drift apart.
//!
//! ```text
//! hierarchical  <device>/<serial>/<control>[/<sub>]/states/<state>[/<index>]
//! flat          <device>/<serial>-<control>[/<sub>]/states/<state>[/<index>]
//! per-device    <path>/state        payload {"<state>[_<index>]": value}
//! commands      <path>/cmd
//! global        globalstates/<name>
//! catalog       <catalog>/structure
//! ```

use loxbridge_domain::naming::camel_to_snake;
use loxbridge_domain::value::StateValue;

use crate::config::{AdaptorConfig, Granularity, TopicLayout};

/// Suffix that marks a topic as a command.
pub const COMMAND_SUFFIX: &str = "/cmd";

/// Fixed path of the synthetic global-states target.
pub const GLOBAL_STATES_PATH: &str = "globalstates";

/// Replace characters that would split or wildcard a topic segment.
#[must_use]
pub fn sanitize_segment(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            '/' | '+' | '#' => '_',
            c => c,
        })
        .collect()
}

/// Where the value of one state identifier is published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateRoute {
    /// The raw value is published on its own topic.
    Topic(String),
    /// The value is one field of a JSON object published on a topic shared
    /// with the other states of the same control.
    Field { topic: String, field: String },
}

impl StateRoute {
    #[must_use]
    pub fn topic(&self) -> &str {
        match self {
            Self::Topic(topic) | Self::Field { topic, .. } => topic,
        }
    }
}

/// Render a per-device payload: one object with a field per known state of
/// the control, not only the one that changed.
#[must_use]
pub fn device_payload<'a>(fields: impl IntoIterator<Item = (&'a str, &'a StateValue)>) -> String {
    let object: serde_json::Map<String, serde_json::Value> = fields
        .into_iter()
        .map(|(field, value)| (field.to_string(), value.to_json()))
        .collect();
    serde_json::Value::Object(object).to_string()
}

/// Naming strategy selected at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPolicy {
    device_prefix: String,
    catalog_prefix: String,
    layout: TopicLayout,
    granularity: Granularity,
}

impl TopicPolicy {
    #[must_use]
    pub fn from_config(config: &AdaptorConfig) -> Self {
        Self {
            device_prefix: config.prefixes.device.clone(),
            catalog_prefix: config.prefixes.catalog().to_string(),
            layout: config.topic_layout,
            granularity: config.granularity,
        }
    }

    #[must_use]
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Path of a top-level control: the device serial keeps several devices
    /// apart, the action identifier names the control.
    #[must_use]
    pub fn control_path(&self, serial: &str, action_id: &str) -> String {
        let serial = sanitize_segment(serial);
        let id = sanitize_segment(action_id);
        match self.layout {
            TopicLayout::Hierarchical => format!("{}/{serial}/{id}", self.device_prefix),
            TopicLayout::Flat => format!("{}/{serial}-{id}", self.device_prefix),
        }
    }

    /// Path of a sub-control, one segment below its parent.
    ///
    /// Sub-control identifiers usually repeat the parent's identifier
    /// followed by `/`; that prefix is dropped from the segment.
    #[must_use]
    pub fn sub_control_path(&self, parent_path: &str, parent_id: &str, sub_id: &str) -> String {
        let local = sub_id
            .strip_prefix(parent_id)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|rest| !rest.is_empty())
            .unwrap_or(sub_id);
        format!("{parent_path}/{}", sanitize_segment(local))
    }

    /// Route for one state of a control, `index` set for list states.
    #[must_use]
    pub fn state_route(&self, path: &str, state_name: &str, index: Option<usize>) -> StateRoute {
        let name = sanitize_segment(&camel_to_snake(state_name));
        match (self.granularity, index) {
            (Granularity::PerState, None) => StateRoute::Topic(format!("{path}/states/{name}")),
            (Granularity::PerState, Some(i)) => {
                StateRoute::Topic(format!("{path}/states/{name}/{i}"))
            }
            (Granularity::PerDevice, None) => StateRoute::Field {
                topic: format!("{path}/state"),
                field: name,
            },
            (Granularity::PerDevice, Some(i)) => StateRoute::Field {
                topic: format!("{path}/state"),
                field: format!("{name}_{i}"),
            },
        }
    }

    /// Route for a global state; independent of layout and granularity.
    #[must_use]
    pub fn global_state_route(&self, name: &str) -> StateRoute {
        StateRoute::Topic(format!("{GLOBAL_STATES_PATH}/{}", sanitize_segment(name)))
    }

    #[must_use]
    pub fn command_topic(&self, path: &str) -> String {
        format!("{path}{COMMAND_SUFFIX}")
    }

    /// Strip the command suffix; `None` when the topic is not a command.
    #[must_use]
    pub fn command_path<'a>(&self, topic: &'a str) -> Option<&'a str> {
        topic
            .strip_suffix(COMMAND_SUFFIX)
            .filter(|path| !path.is_empty())
    }

    /// Wildcard patterns covering the command topic of every control nested
    /// up to `max_depth` levels below a top-level control.
    #[must_use]
    pub fn subscription_patterns(&self, max_depth: usize) -> Vec<String> {
        let base_segments = match self.layout {
            TopicLayout::Hierarchical => 2,
            TopicLayout::Flat => 1,
        };
        (0..=max_depth)
            .map(|depth| {
                let mut pattern = self.device_prefix.clone();
                for _ in 0..base_segments + depth {
                    pattern.push_str("/+");
                }
                pattern.push_str(COMMAND_SUFFIX);
                pattern
            })
            .collect()
    }

    /// Retained topic carrying the catalog.
    #[must_use]
    pub fn catalog_topic(&self) -> String {
        format!("{}/structure", self.catalog_prefix)
    }
}

/// MQTT-style wildcard match of `topic` against `pattern`.
#[must_use]
pub fn matches_pattern(pattern: &str, topic: &str) -> bool {
    let mut pattern_segments = pattern.split('/');
    let mut topic_segments = topic.split('/');
    loop {
        match (pattern_segments.next(), topic_segments.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(p), Some(t)) if p == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
