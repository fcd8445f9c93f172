//! Controls: addressable device functions and their named states.

use std::collections::BTreeMap;
use std::fmt;

/// Kind of a control, parsed from the structure's `type` tag.
///
/// Unknown tags are kept verbatim in [`Other`](Self::Other) so they reach
/// the catalog unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ControlKind {
    Pushbutton,
    Switch,
    TimedSwitch,
    Dimmer,
    EibDimmer,
    Jalousie,
    Gate,
    InfoOnlyAnalog,
    InfoOnlyDigital,
    LightControllerV2,
    IRoomControllerV2,
    Alarm,
    Meter,
    Other(String),
}

impl ControlKind {
    /// Parse a structure `type` tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "Pushbutton" => Self::Pushbutton,
            "Switch" => Self::Switch,
            "TimedSwitch" => Self::TimedSwitch,
            "Dimmer" => Self::Dimmer,
            "EIBDimmer" => Self::EibDimmer,
            "Jalousie" => Self::Jalousie,
            "Gate" => Self::Gate,
            "InfoOnlyAnalog" => Self::InfoOnlyAnalog,
            "InfoOnlyDigital" => Self::InfoOnlyDigital,
            "LightControllerV2" => Self::LightControllerV2,
            "IRoomControllerV2" => Self::IRoomControllerV2,
            "Alarm" => Self::Alarm,
            "Meter" => Self::Meter,
            other => Self::Other(other.to_string()),
        }
    }

    /// The original `type` tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::Pushbutton => "Pushbutton",
            Self::Switch => "Switch",
            Self::TimedSwitch => "TimedSwitch",
            Self::Dimmer => "Dimmer",
            Self::EibDimmer => "EIBDimmer",
            Self::Jalousie => "Jalousie",
            Self::Gate => "Gate",
            Self::InfoOnlyAnalog => "InfoOnlyAnalog",
            Self::InfoOnlyDigital => "InfoOnlyDigital",
            Self::LightControllerV2 => "LightControllerV2",
            Self::IRoomControllerV2 => "IRoomControllerV2",
            Self::Alarm => "Alarm",
            Self::Meter => "Meter",
            Self::Other(tag) => tag,
        }
    }

    /// Momentary controls whose values must never be retained on the bus.
    #[must_use]
    pub fn is_momentary(&self) -> bool {
        matches!(self, Self::Pushbutton)
    }
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Identifier(s) behind one named state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateRef {
    /// A state backed by a single identifier.
    Single(String),
    /// A state that fans out to several underlying signals, in order.
    Multi(Vec<String>),
}

impl StateRef {
    /// Every identifier with its position; `None` for single states.
    pub fn identifiers(&self) -> Box<dyn Iterator<Item = (Option<usize>, &str)> + '_> {
        match self {
            Self::Single(uuid) => Box::new(std::iter::once((None, uuid.as_str()))),
            Self::Multi(uuids) => Box::new(
                uuids
                    .iter()
                    .enumerate()
                    .map(|(index, uuid)| (Some(index), uuid.as_str())),
            ),
        }
    }
}

/// An addressable device function.
///
/// Sub-controls share this type; for them `room` and `category` are
/// always `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub action_id: String,
    pub name: String,
    pub kind: ControlKind,
    pub default_icon: Option<String>,
    pub room: Option<String>,
    pub category: Option<String>,
    pub is_secured: bool,
    /// Type-specific detail fields, kept as raw JSON.
    pub details: serde_json::Map<String, serde_json::Value>,
    pub states: BTreeMap<String, StateRef>,
    pub sub_controls: Vec<Control>,
}

impl Control {
    /// Create a control with no states, icon, or ownership.
    #[must_use]
    pub fn new(action_id: impl Into<String>, name: impl Into<String>, kind: ControlKind) -> Self {
        Self {
            action_id: action_id.into(),
            name: name.into(),
            kind,
            default_icon: None,
            room: None,
            category: None,
            is_secured: false,
            details: serde_json::Map::new(),
            states: BTreeMap::new(),
            sub_controls: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_state(mut self, name: impl Into<String>, state: StateRef) -> Self {
        self.states.insert(name.into(), state);
        self
    }

    #[must_use]
    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.default_icon = Some(icon.into());
        self
    }

    #[must_use]
    pub fn with_sub_control(mut self, sub: Control) -> Self {
        self.sub_controls.push(sub);
        self
    }

    /// Whether this control is a momentary button.
    #[must_use]
    pub fn is_pushbutton(&self) -> bool {
        self.kind.is_momentary()
    }
}
