//! Tolerant parsing of the device's structure document.
//!
//! Only a missing serial number or a non-object root is fatal. Any other
//! malformed field is reported through the validation callback; malformed
//! items are skipped and malformed optional fields are treated as absent.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::{Category, Control, ControlKind, DeviceInfo, Room, StateRef, Structure};
use crate::error::{InvalidField, StructureError};

type Report<'a> = &'a mut dyn FnMut(InvalidField);

impl Structure {
    /// Parse a structure document from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError`] when the bytes are not JSON or the document
    /// is unusable as a whole; see [`Structure::from_json`].
    pub fn from_slice(
        bytes: &[u8],
        on_invalid: impl FnMut(InvalidField),
    ) -> Result<Self, StructureError> {
        let doc: Value = serde_json::from_slice(bytes)?;
        Self::from_json(&doc, on_invalid)
    }

    /// Build a structure from a parsed document.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::NotAnObject`] when the root is not an
    /// object and [`StructureError::MissingSerial`] when
    /// `msInfo.serialNr` is absent or not a string.
    pub fn from_json(
        doc: &Value,
        mut on_invalid: impl FnMut(InvalidField),
    ) -> Result<Self, StructureError> {
        let report: Report<'_> = &mut on_invalid;
        let root = doc.as_object().ok_or(StructureError::NotAnObject)?;

        let ms_info = root.get("msInfo").and_then(Value::as_object);
        let serial = ms_info
            .and_then(|info| info.get("serialNr"))
            .and_then(Value::as_str)
            .ok_or(StructureError::MissingSerial)?;
        let mut info = DeviceInfo::new(serial);
        if let Some(ms_info) = ms_info {
            info.name = optional_str(ms_info, "msName", "msInfo", report);
        }

        let mut structure = Structure::new(info);

        for (key, value) in section(root, "controls", report).into_iter().flatten() {
            let path = format!("controls.{key}");
            if let Some(control) = parse_control(&path, value, true, report) {
                structure.controls.insert(key.clone(), control);
            }
        }

        for (key, value) in section(root, "rooms", report).into_iter().flatten() {
            let path = format!("rooms.{key}");
            if let Some(room) = parse_room(&path, key, value, report) {
                structure.rooms.insert(key.clone(), room);
            }
        }

        for (key, value) in section(root, "cats", report).into_iter().flatten() {
            let path = format!("cats.{key}");
            if let Some(category) = parse_category(&path, key, value, report) {
                structure.categories.insert(key.clone(), category);
            }
        }

        for (name, value) in section(root, "globalStates", report).into_iter().flatten() {
            let uuid = match value {
                Value::String(uuid) => Some(uuid.as_str()),
                Value::Object(obj) => obj.get("uuid").and_then(Value::as_str),
                _ => None,
            };
            match uuid {
                Some(uuid) => {
                    structure
                        .global_states
                        .insert(name.clone(), uuid.to_string());
                }
                None => report(InvalidField::new(
                    format!("globalStates.{name}"),
                    "an identifier string or an object with `uuid`",
                )),
            }
        }

        Ok(structure)
    }
}

/// Look up an optional object-valued section of the document.
fn section<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    report: Report<'_>,
) -> Option<&'a Map<String, Value>> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Object(items)) => Some(items),
        Some(_) => {
            report(InvalidField::new(key, "an object"));
            None
        }
    }
}

fn required_str(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    report: Report<'_>,
) -> Option<String> {
    if let Some(Value::String(s)) = obj.get(key) {
        Some(s.clone())
    } else {
        report(InvalidField::new(format!("{path}.{key}"), "a string"));
        None
    }
}

fn optional_str(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    report: Report<'_>,
) -> Option<String> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            report(InvalidField::new(format!("{path}.{key}"), "a string"));
            None
        }
    }
}

fn optional_bool(obj: &Map<String, Value>, key: &str, path: &str, report: Report<'_>) -> bool {
    match obj.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            report(InvalidField::new(format!("{path}.{key}"), "a boolean"));
            false
        }
    }
}

fn as_object<'a>(
    value: &'a Value,
    path: &str,
    report: Report<'_>,
) -> Option<&'a Map<String, Value>> {
    let obj = value.as_object();
    if obj.is_none() {
        report(InvalidField::new(path, "an object"));
    }
    obj
}

fn parse_control(
    path: &str,
    value: &Value,
    top_level: bool,
    report: Report<'_>,
) -> Option<Control> {
    let obj = as_object(value, path, report)?;

    let name = required_str(obj, "name", path, report);
    let action_id = required_str(obj, "uuidAction", path, report);
    let kind = required_str(obj, "type", path, report);
    let (Some(name), Some(action_id), Some(kind)) = (name, action_id, kind) else {
        return None;
    };

    let mut control = Control::new(action_id, name, ControlKind::from_tag(&kind));
    control.default_icon = optional_str(obj, "defaultIcon", path, report);
    control.is_secured = optional_bool(obj, "isSecured", path, report);
    if top_level {
        control.room = optional_str(obj, "room", path, report);
        control.category = optional_str(obj, "cat", path, report);
    }

    match obj.get("details") {
        None | Some(Value::Null) => {}
        Some(Value::Object(details)) => control.details = details.clone(),
        Some(_) => report(InvalidField::new(format!("{path}.details"), "an object")),
    }

    control.states = parse_states(&format!("{path}.states"), obj.get("states"), report);

    let sub_path = format!("{path}.subControls");
    match obj.get("subControls") {
        None | Some(Value::Null) => {}
        Some(Value::Object(subs)) => {
            for (key, sub) in subs {
                if let Some(sub) = parse_control(&format!("{sub_path}.{key}"), sub, false, report)
                {
                    control.sub_controls.push(sub);
                }
            }
        }
        Some(_) => report(InvalidField::new(sub_path, "an object")),
    }

    Some(control)
}

fn parse_states(
    path: &str,
    value: Option<&Value>,
    report: Report<'_>,
) -> BTreeMap<String, StateRef> {
    let mut states = BTreeMap::new();
    let items = match value {
        None | Some(Value::Null) => return states,
        Some(Value::Object(items)) => items,
        Some(_) => {
            report(InvalidField::new(path, "an object"));
            return states;
        }
    };

    for (name, value) in items {
        let state = match value {
            Value::String(uuid) => Some(StateRef::Single(uuid.clone())),
            Value::Array(uuids) => uuids
                .iter()
                .map(|uuid| uuid.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(StateRef::Multi),
            _ => None,
        };
        match state {
            Some(state) => {
                states.insert(name.clone(), state);
            }
            None => report(InvalidField::new(
                format!("{path}.{name}"),
                "an identifier string or a list of identifier strings",
            )),
        }
    }
    states
}

fn group_kind(obj: &Map<String, Value>) -> Option<Value> {
    obj.get("type").filter(|kind| !kind.is_null()).cloned()
}

fn group_uuid(obj: &Map<String, Value>, key: &str) -> String {
    obj.get("uuid")
        .and_then(Value::as_str)
        .unwrap_or(key)
        .to_string()
}

fn parse_room(path: &str, key: &str, value: &Value, report: Report<'_>) -> Option<Room> {
    let obj = as_object(value, path, report)?;
    let name = required_str(obj, "name", path, report)?;

    let mut room = Room::new(group_uuid(obj, key), name);
    room.kind = group_kind(obj);
    room.image = optional_str(obj, "image", path, report);
    room.color = optional_str(obj, "color", path, report);
    room.is_favorite = optional_bool(obj, "isFavorite", path, report);
    room.is_secured = optional_bool(obj, "isSecured", path, report);
    Some(room)
}

fn parse_category(path: &str, key: &str, value: &Value, report: Report<'_>) -> Option<Category> {
    let obj = as_object(value, path, report)?;
    let name = required_str(obj, "name", path, report)?;

    let mut category = Category::new(group_uuid(obj, key), name);
    category.kind = group_kind(obj);
    category.image = optional_str(obj, "image", path, report);
    category.is_favorite = optional_bool(obj, "isFavorite", path, report);
    category.is_secured = optional_bool(obj, "isSecured", path, report);
    Some(category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(doc: &Value) -> (Structure, Vec<InvalidField>) {
        let mut invalid = Vec::new();
        let structure = Structure::from_json(doc, |field| invalid.push(field)).unwrap();
        (structure, invalid)
    }

    fn sample() -> Value {
        json!({
            "msInfo": { "serialNr": "504F94A00000", "msName": "Home" },
            "controls": {
                "c1": {
                    "name": "Lamp",
                    "type": "Switch",
                    "uuidAction": "c1",
                    "room": "r1",
                    "cat": "k1",
                    "defaultIcon": null,
                    "isSecured": true,
                    "details": { "jLocked": false },
                    "states": { "active": "s1" }
                },
                "c2": {
                    "name": "Meter",
                    "type": "Meter",
                    "uuidAction": "c2",
                    "states": { "actual": ["m0", "m1"] },
                    "subControls": {
                        "c2/sub": {
                            "name": "Reset",
                            "type": "Pushbutton",
                            "uuidAction": "c2/sub",
                            "room": "r1",
                            "states": { "active": "p1" }
                        }
                    }
                }
            },
            "rooms": {
                "r1": { "uuid": "r1", "name": "Kitchen", "type": 0, "image": "room.svg", "color": "#ff0000", "isFavorite": true }
            },
            "cats": {
                "k1": { "uuid": "k1", "name": "Lights", "type": "lights", "image": "light.svg" }
            },
            "globalStates": { "sunrise": "g1", "sunset": { "uuid": "g2" } }
        })
    }

    #[test]
    fn should_parse_complete_document_without_reports() {
        let (structure, invalid) = parse(&sample());
        assert!(invalid.is_empty(), "unexpected reports: {invalid:?}");
        assert_eq!(structure.serial(), "504F94A00000");
        assert_eq!(structure.info().name.as_deref(), Some("Home"));
        assert_eq!(structure.controls().len(), 2);
        assert_eq!(structure.rooms().len(), 1);
        assert_eq!(structure.categories().len(), 1);
        assert_eq!(structure.global_states().len(), 2);
    }

    #[test]
    fn should_parse_control_fields() {
        let (structure, _) = parse(&sample());
        let lamp = &structure.controls()["c1"];
        assert_eq!(lamp.name, "Lamp");
        assert_eq!(lamp.kind, ControlKind::Switch);
        assert_eq!(lamp.room.as_deref(), Some("r1"));
        assert_eq!(lamp.category.as_deref(), Some("k1"));
        assert!(lamp.default_icon.is_none());
        assert!(lamp.is_secured);
        assert_eq!(lamp.details.get("jLocked"), Some(&json!(false)));
        assert_eq!(lamp.states["active"], StateRef::Single("s1".to_string()));
    }

    #[test]
    fn should_parse_list_states_and_sub_controls() {
        let (structure, _) = parse(&sample());
        let meter = &structure.controls()["c2"];
        assert_eq!(
            meter.states["actual"],
            StateRef::Multi(vec!["m0".to_string(), "m1".to_string()])
        );
        assert_eq!(meter.sub_controls.len(), 1);
        let sub = &meter.sub_controls[0];
        assert_eq!(sub.action_id, "c2/sub");
        assert!(sub.is_pushbutton());
        assert!(sub.room.is_none(), "sub-controls carry no room ownership");
    }

    #[test]
    fn should_parse_rooms_categories_and_global_states() {
        let (structure, _) = parse(&sample());
        let room = &structure.rooms()["r1"];
        assert_eq!(room.kind, Some(json!(0)));
        assert_eq!(room.color.as_deref(), Some("#ff0000"));
        assert!(room.is_favorite);
        let category = &structure.categories()["k1"];
        assert_eq!(category.image.as_deref(), Some("light.svg"));
        assert_eq!(structure.global_states()["sunset"], "g2");
    }

    #[test]
    fn should_fail_without_serial() {
        let result = Structure::from_json(&json!({ "controls": {} }), |_| {});
        assert!(matches!(result, Err(StructureError::MissingSerial)));
    }

    #[test]
    fn should_fail_when_root_is_not_object() {
        let result = Structure::from_json(&json!([1, 2]), |_| {});
        assert!(matches!(result, Err(StructureError::NotAnObject)));
    }

    #[test]
    fn should_fail_on_invalid_json_bytes() {
        let result = Structure::from_slice(b"{not json", |_| {});
        assert!(matches!(result, Err(StructureError::Json(_))));
    }

    #[test]
    fn should_report_and_skip_control_missing_required_fields() {
        let doc = json!({
            "msInfo": { "serialNr": "SN1" },
            "controls": {
                "bad": { "type": "Switch", "uuidAction": "bad" },
                "good": { "name": "Ok", "type": "Switch", "uuidAction": "good" }
            }
        });
        let (structure, invalid) = parse(&doc);
        assert_eq!(structure.controls().len(), 1);
        assert!(structure.controls().contains_key("good"));
        assert_eq!(invalid, vec![InvalidField::new("controls.bad.name", "a string")]);
    }

    #[test]
    fn should_report_malformed_optional_fields_and_keep_control() {
        let doc = json!({
            "msInfo": { "serialNr": "SN1" },
            "controls": {
                "c1": {
                    "name": "Lamp",
                    "type": "Switch",
                    "uuidAction": "c1",
                    "isSecured": "yes",
                    "details": [],
                    "states": { "active": 12, "value": "s2" }
                }
            }
        });
        let (structure, invalid) = parse(&doc);
        let control = &structure.controls()["c1"];
        assert!(!control.is_secured);
        assert!(control.details.is_empty());
        assert_eq!(control.states.len(), 1);
        assert_eq!(invalid.len(), 3);
        assert!(invalid.iter().any(|f| f.path == "controls.c1.states.active"));
    }

    #[test]
    fn should_report_non_object_section() {
        let doc = json!({ "msInfo": { "serialNr": "SN1" }, "rooms": "nope" });
        let (structure, invalid) = parse(&doc);
        assert!(structure.rooms().is_empty());
        assert_eq!(invalid, vec![InvalidField::new("rooms", "an object")]);
    }

    #[test]
    fn should_fall_back_to_key_when_room_has_no_uuid() {
        let doc = json!({
            "msInfo": { "serialNr": "SN1" },
            "rooms": { "r9": { "name": "Attic" } }
        });
        let (structure, _) = parse(&doc);
        assert_eq!(structure.rooms()["r9"].uuid, "r9");
    }
}
