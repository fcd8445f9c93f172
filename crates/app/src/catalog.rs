//! Structure catalog: the retained discovery document.
//!
//! The catalog lists categories, rooms and controls so bus subscribers can
//! find every topic without out-of-band knowledge. All topic pointers are
//! read from the adaptor's routing tables, never recomputed here.
//!
//! Entries are sorted alphabetically by name, case only breaking ties with
//! lowercase first, and carry a coarse `order` hint: the alphabet position
//! of the lowercased first character.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::{Map, Value};

use loxbridge_domain::naming::camel_to_snake;
use loxbridge_domain::structure::{Category, Control, Room, StateRef, Structure};

use crate::adaptor::routing::RoutingTables;
use crate::config::CatalogLayout;

const DEFAULT_ICON_EXTENSION: &str = "svg";

/// Icon reference of a catalog entry. Rooms may carry a color without an
/// image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Icon {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryEntry {
    pub hwid: String,
    pub uuid: String,
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    pub is_favorite: bool,
    pub is_visible: bool,
    pub is_protected: bool,
    pub order: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomEntry {
    pub hwid: String,
    pub uuid: String,
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    pub is_favorite: bool,
    pub is_visible: bool,
    pub is_protected: bool,
    pub order: i64,
}

/// Topic(s) a state is published on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StatePointer {
    Single(String),
    Multi(Vec<String>),
}

#[derive(Debug, Clone, Serialize)]
pub struct ControlEntry {
    pub hwid: String,
    pub uuid: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    /// Snake-cased control type tag.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub is_favorite: bool,
    pub is_visible: bool,
    pub is_protected: bool,
    /// `false` for momentary controls, whose values are never retained.
    pub retain: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_topic: Option<String>,
    pub details: Map<String, Value>,
    pub states: BTreeMap<String, StatePointer>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_controls: Vec<ControlEntry>,
    pub order: i64,
}

/// The full catalog, sections already sorted.
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    pub categories: Vec<CategoryEntry>,
    pub rooms: Vec<RoomEntry>,
    pub controls: Vec<ControlEntry>,
}

impl Catalog {
    pub(crate) fn build(structure: &Structure, tables: &RoutingTables, icon_path: &str) -> Self {
        let hwid = structure.serial();

        let mut categories: Vec<_> = structure
            .categories()
            .values()
            .map(|category| category_entry(hwid, category, icon_path))
            .collect();
        categories.sort_by(|a, b| {
            collate(&a.name, &b.name).then_with(|| a.uuid.cmp(&b.uuid))
        });

        let mut rooms: Vec<_> = structure
            .rooms()
            .values()
            .map(|room| room_entry(hwid, room, icon_path))
            .collect();
        rooms.sort_by(|a, b| collate(&a.name, &b.name).then_with(|| a.uuid.cmp(&b.uuid)));

        let category_icons: HashMap<&str, &Icon> = categories
            .iter()
            .filter_map(|c| c.icon.as_ref().map(|icon| (c.uuid.as_str(), icon)))
            .collect();

        let builder = ControlBuilder {
            hwid,
            icon_path,
            tables,
        };
        let mut controls: Vec<_> = structure
            .controls()
            .values()
            .map(|control| {
                let fallback = control
                    .category
                    .as_deref()
                    .and_then(|uuid| category_icons.get(uuid).copied());
                builder.entry(control, fallback)
            })
            .collect();
        sort_controls(&mut controls);

        Self {
            categories,
            rooms,
            controls,
        }
    }

    /// Render the catalog as JSON in the requested layout.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if an entry cannot be serialized.
    pub fn to_document(&self, layout: CatalogLayout) -> serde_json::Result<Value> {
        match layout {
            CatalogLayout::List => serde_json::to_value(self),
            CatalogLayout::Map => {
                let mut document = Map::new();
                document.insert(
                    "categories".to_string(),
                    keyed(&self.categories, |c| &c.uuid)?,
                );
                document.insert("rooms".to_string(), keyed(&self.rooms, |r| &r.uuid)?);
                document.insert("controls".to_string(), keyed(&self.controls, |c| &c.uuid)?);
                Ok(Value::Object(document))
            }
        }
    }
}

fn keyed<T: Serialize>(
    entries: &[T],
    key: impl Fn(&T) -> &String,
) -> serde_json::Result<Value> {
    let mut map = Map::new();
    for entry in entries {
        map.insert(key(entry).clone(), serde_json::to_value(entry)?);
    }
    Ok(Value::Object(map))
}

struct ControlBuilder<'a> {
    hwid: &'a str,
    icon_path: &'a str,
    tables: &'a RoutingTables,
}

impl ControlBuilder<'_> {
    fn entry(&self, control: &Control, fallback_icon: Option<&Icon>) -> ControlEntry {
        let icon = match &control.default_icon {
            Some(reference) => Some(Icon {
                href: Some(resolve_control_icon(self.icon_path, reference)),
                color: None,
            }),
            None => fallback_icon.cloned(),
        };

        let details = control
            .details
            .iter()
            .map(|(key, value)| (camel_to_snake(key), value.clone()))
            .collect();

        let states = control
            .states
            .iter()
            .filter_map(|(name, state)| {
                self.state_pointer(state)
                    .map(|pointer| (camel_to_snake(name), pointer))
            })
            .collect();

        let mut sub_controls: Vec<_> = control
            .sub_controls
            .iter()
            .map(|sub| self.entry(sub, icon.as_ref()))
            .collect();
        sort_controls(&mut sub_controls);

        let path = self.tables.control_paths.get(&control.action_id);

        ControlEntry {
            hwid: self.hwid.to_string(),
            uuid: control.action_id.clone(),
            name: control.name.clone(),
            default_icon: control.default_icon.clone(),
            icon,
            kind: camel_to_snake(control.kind.tag()),
            room: control.room.clone(),
            category: control.category.clone(),
            is_favorite: false,
            is_visible: true,
            is_protected: control.is_secured,
            retain: !control.is_pushbutton(),
            topic: path.cloned(),
            command_topic: path.map(|path| format!("{path}{}", crate::topic::COMMAND_SUFFIX)),
            details,
            states,
            sub_controls,
            order: order_hint(&control.name),
        }
    }

    fn state_pointer(&self, state: &StateRef) -> Option<StatePointer> {
        let topic = |uuid: &str| {
            self.tables
                .routes
                .get(uuid)
                .map(|route| route.topic().to_string())
        };
        match state {
            StateRef::Single(uuid) => topic(uuid).map(StatePointer::Single),
            StateRef::Multi(uuids) => {
                let topics: Vec<_> = uuids.iter().filter_map(|uuid| topic(uuid)).collect();
                (!topics.is_empty()).then_some(StatePointer::Multi(topics))
            }
        }
    }
}

fn sort_controls(controls: &mut [ControlEntry]) {
    controls.sort_by(|a, b| collate(&a.name, &b.name).then_with(|| a.uuid.cmp(&b.uuid)));
}

/// Name ordering of the catalog: case-insensitive first, then lowercase
/// before uppercase at the first differing letter.
#[must_use]
pub fn collate(a: &str, b: &str) -> Ordering {
    folded(a)
        .cmp(folded(b))
        .then_with(|| uppercase_marks(a).cmp(uppercase_marks(b)))
}

fn folded(name: &str) -> impl Iterator<Item = char> + '_ {
    name.chars().flat_map(char::to_lowercase)
}

fn uppercase_marks(name: &str) -> impl Iterator<Item = bool> + '_ {
    name.chars().map(char::is_uppercase)
}

fn category_entry(hwid: &str, category: &Category, icon_path: &str) -> CategoryEntry {
    CategoryEntry {
        hwid: hwid.to_string(),
        uuid: category.uuid.clone(),
        name: category.name.clone(),
        kind: category.kind.clone(),
        icon: category.image.as_deref().map(|image| Icon {
            href: Some(join_icon_path(icon_path, image)),
            color: None,
        }),
        is_favorite: category.is_favorite,
        is_visible: true,
        is_protected: category.is_secured,
        order: order_hint(&category.name),
    }
}

fn room_entry(hwid: &str, room: &Room, icon_path: &str) -> RoomEntry {
    RoomEntry {
        hwid: hwid.to_string(),
        uuid: room.uuid.clone(),
        name: room.name.clone(),
        kind: room.kind.clone(),
        icon: room_icon(room, icon_path),
        is_favorite: room.is_favorite,
        is_visible: true,
        is_protected: room.is_secured,
        order: order_hint(&room.name),
    }
}

fn room_icon(room: &Room, icon_path: &str) -> Option<Icon> {
    if room.image.is_none() && room.color.is_none() {
        return None;
    }
    Some(Icon {
        href: room
            .image
            .as_deref()
            .map(|image| join_icon_path(icon_path, image)),
        color: room.color.clone(),
    })
}

/// Alphabet position of the lowercased first character (`a` → 1).
///
/// Characters outside `a..=z` yield values outside `1..=26`; an empty name
/// yields 0.
#[must_use]
pub fn order_hint(name: &str) -> i64 {
    name.chars()
        .next()
        .and_then(|c| c.to_lowercase().next())
        .map_or(0, |c| i64::from(u32::from(c)) - 96)
}

fn join_icon_path(icon_path: &str, reference: &str) -> String {
    if icon_path.is_empty() {
        return reference.to_string();
    }
    format!(
        "{}/{}",
        icon_path.trim_end_matches('/'),
        reference.trim_start_matches('/')
    )
}

/// Resolve a control's own icon, appending `.svg` when the reference has no
/// extension.
#[must_use]
pub fn resolve_control_icon(icon_path: &str, reference: &str) -> String {
    let href = join_icon_path(icon_path, reference);
    let file_name = reference.rsplit('/').next().unwrap_or(reference);
    if file_name.contains('.') {
        href
    } else {
        format!("{href}.{DEFAULT_ICON_EXTENSION}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdaptorConfig;
    use crate::topic::TopicPolicy;
    use loxbridge_domain::structure::{ControlKind, DeviceInfo};
    use serde_json::json;

    fn single(uuid: &str) -> StateRef {
        StateRef::Single(uuid.to_string())
    }

    fn structure() -> Structure {
        let mut structure = Structure::new(DeviceInfo::new("SN1"));
        structure.insert_category(Category::new("k2", "lights").with_image("lights.svg"));
        structure.insert_category(Category::new("k1", "Shading").with_image("shade.svg"));
        structure.insert_category(Category::new("k3", "Audio"));
        structure.insert_room(Room::new("r1", "kitchen").with_image("kitchen.svg").with_color("#00ff00"));
        structure.insert_room(Room::new("r2", "Bath"));
        structure.insert_room(Room::new("r3", "attic").with_color("#ff0000"));

        let mut lamp = Control::new("c1", "Lamp", ControlKind::Switch)
            .with_category("k2")
            .with_room("r1")
            .with_state("activeMoods", single("s1"));
        lamp.details.insert("jLocked".to_string(), json!(true));
        structure.insert_control(lamp);

        structure.insert_control(
            Control::new("c2", "blinds", ControlKind::Jalousie)
                .with_category("k1")
                .with_icon("blinds")
                .with_state(
                    "position",
                    StateRef::Multi(vec!["p0".to_string(), "p1".to_string()]),
                ),
        );
        structure.insert_control(
            Control::new("c3", "Bell", ControlKind::Pushbutton)
                .with_category("k3")
                .with_sub_control(Control::new("c3/z", "Zeta", ControlKind::Switch))
                .with_sub_control(
                    Control::new("c3/a", "Alpha", ControlKind::Switch).with_icon("a.png"),
                ),
        );
        structure
    }

    fn catalog(icon_path: &str) -> Catalog {
        let structure = structure();
        let policy = TopicPolicy::from_config(&AdaptorConfig::default());
        let tables = RoutingTables::build(&structure, &policy);
        Catalog::build(&structure, &tables, icon_path)
    }

    fn names<T>(entries: &[T], name: impl Fn(&T) -> &str) -> Vec<&str> {
        entries.iter().map(name).collect()
    }

    #[test]
    fn should_sort_sections_alphabetically_regardless_of_case() {
        let catalog = catalog("/icons");
        assert_eq!(
            names(&catalog.categories, |c| c.name.as_str()),
            vec!["Audio", "lights", "Shading"]
        );
        assert_eq!(
            names(&catalog.rooms, |r| r.name.as_str()),
            vec!["attic", "Bath", "kitchen"]
        );
        assert_eq!(
            names(&catalog.controls, |c| c.name.as_str()),
            vec!["Bell", "blinds", "Lamp"]
        );
    }

    #[test]
    fn should_break_case_ties_with_lowercase_first() {
        let mut sorted = vec!["Lamp", "lamp", "LAMP", "lamps", "Lamb", "lAmp"];
        sorted.sort_by(|a, b| collate(a, b));
        assert_eq!(sorted, vec!["Lamb", "lamp", "lAmp", "Lamp", "LAMP", "lamps"]);
        assert_eq!(collate("a", "A"), Ordering::Less);
        assert_eq!(collate("b", "A"), Ordering::Greater);
        assert_eq!(collate("same", "same"), Ordering::Equal);
    }

    #[test]
    fn should_sort_sub_controls_regardless_of_case() {
        let mut structure = Structure::new(DeviceInfo::new("SN1"));
        structure.insert_control(
            Control::new("c1", "Meter", ControlKind::Meter)
                .with_sub_control(Control::new("c1/b", "Zone", ControlKind::Switch))
                .with_sub_control(Control::new("c1/a", "alarm", ControlKind::Switch)),
        );
        let policy = TopicPolicy::from_config(&AdaptorConfig::default());
        let tables = RoutingTables::build(&structure, &policy);
        let catalog = Catalog::build(&structure, &tables, "");
        assert_eq!(
            names(&catalog.controls[0].sub_controls, |c| c.name.as_str()),
            vec!["alarm", "Zone"]
        );
    }

    #[test]
    fn should_compute_order_hint_from_first_letter() {
        assert_eq!(order_hint("Alpha"), 1);
        assert_eq!(order_hint("lights"), 12);
        assert_eq!(order_hint("Zeta"), 26);
        assert_eq!(order_hint("1st floor"), i64::from(u32::from('1')) - 96);
        assert_eq!(order_hint(""), 0);
    }

    #[test]
    fn should_resolve_icons_against_icon_path() {
        assert_eq!(resolve_control_icon("/icons", "blinds"), "/icons/blinds.svg");
        assert_eq!(resolve_control_icon("/icons/", "a.png"), "/icons/a.png");
        assert_eq!(resolve_control_icon("", "x"), "x.svg");
    }

    #[test]
    fn should_fall_back_to_category_icon_and_omit_when_missing() {
        let catalog = catalog("/icons");
        let by_name = |name: &str| catalog.controls.iter().find(|c| c.name == name).unwrap();

        assert_eq!(
            by_name("blinds").icon.as_ref().unwrap().href.as_deref(),
            Some("/icons/blinds.svg")
        );
        assert_eq!(
            by_name("Lamp").icon.as_ref().unwrap().href.as_deref(),
            Some("/icons/lights.svg")
        );
        assert!(by_name("Bell").icon.is_none());
    }

    #[test]
    fn should_carry_room_color_in_icon() {
        let catalog = catalog("/icons");
        let kitchen = &catalog.rooms[2];
        assert_eq!(
            kitchen.icon,
            Some(Icon {
                href: Some("/icons/kitchen.svg".to_string()),
                color: Some("#00ff00".to_string()),
            })
        );
        assert!(catalog.rooms[1].icon.is_none());
    }

    #[test]
    fn should_keep_room_color_without_image() {
        let catalog = catalog("/icons");
        let attic = &catalog.rooms[0];
        assert_eq!(
            attic.icon,
            Some(Icon {
                href: None,
                color: Some("#ff0000".to_string()),
            })
        );
        let document = catalog.to_document(CatalogLayout::Map).unwrap();
        assert_eq!(document["rooms"]["r3"]["icon"], json!({ "color": "#ff0000" }));
    }

    #[test]
    fn should_normalize_type_state_and_detail_names() {
        let catalog = catalog("");
        let lamp = &catalog.controls[2];
        assert_eq!(lamp.kind, "switch");
        assert_eq!(lamp.details.get("j_locked"), Some(&json!(true)));
        assert_eq!(
            lamp.states.get("active_moods"),
            Some(&StatePointer::Single("lox/SN1/c1/states/active_moods".to_string()))
        );
    }

    #[test]
    fn should_point_at_routed_topics() {
        let catalog = catalog("");
        let blinds = &catalog.controls[1];
        assert_eq!(blinds.topic.as_deref(), Some("lox/SN1/c2"));
        assert_eq!(blinds.command_topic.as_deref(), Some("lox/SN1/c2/cmd"));
        assert_eq!(
            blinds.states["position"],
            StatePointer::Multi(vec![
                "lox/SN1/c2/states/position/0".to_string(),
                "lox/SN1/c2/states/position/1".to_string(),
            ])
        );
    }

    #[test]
    fn should_nest_sorted_sub_controls() {
        let catalog = catalog("/icons");
        let bell = &catalog.controls[0];
        assert!(!bell.retain);
        assert_eq!(names(&bell.sub_controls, |c| c.name.as_str()), vec!["Alpha", "Zeta"]);
        let alpha = &bell.sub_controls[0];
        assert_eq!(alpha.command_topic.as_deref(), Some("lox/SN1/c3/a/cmd"));
        assert_eq!(alpha.icon.as_ref().unwrap().href.as_deref(), Some("/icons/a.png"));
        assert!(alpha.retain);
    }

    #[test]
    fn should_render_list_layout() {
        let document = catalog("").to_document(CatalogLayout::List).unwrap();
        let controls = document["controls"].as_array().unwrap();
        assert_eq!(controls[0]["name"], "Bell");
        assert_eq!(controls[0]["type"], "pushbutton");
        assert_eq!(controls[0]["is_visible"], true);
        assert_eq!(controls[0]["hwid"], "SN1");
        assert!(controls[0].get("room").is_none());
    }

    #[test]
    fn should_render_map_layout_keyed_by_identifier() {
        let document = catalog("").to_document(CatalogLayout::Map).unwrap();
        assert_eq!(document["controls"]["c1"]["name"], "Lamp");
        assert_eq!(document["rooms"]["r2"]["name"], "Bath");
        assert_eq!(document["categories"]["k3"]["name"], "Audio");
    }
}
