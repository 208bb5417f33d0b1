//! Tag driven conversion of an [`Entity`] into an attribute map.

use std::collections::BTreeMap;

use crate::entity::{Entity, FieldSpec, OMIT_EMPTY, Value};

/// Attribute name to value mapping, ordered by attribute name
pub type AttributeMap = BTreeMap<String, Value>;

/// A parsed `name,modifier,...` tag value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TagValue<'a> {
    /// First comma separated segment
    pub name: &'a str,
    /// Whether the `omitempty` modifier is present
    pub omit_empty: bool,
}

impl<'a> TagValue<'a> {
    /// Split a raw tag value into its name and modifiers
    pub fn parse(raw: &'a str) -> Self {
        let mut segments = raw.split(',');
        let name = segments.next().unwrap_or_default();
        let omit_empty = segments.any(|modifier| modifier.trim() == OMIT_EMPTY);
        Self { name, omit_empty }
    }
}

/// Collect the fields of `entity` carrying `tag` into a map keyed by the tag's name
///
/// - fields carrying any of `exclude_tags` are skipped entirely
/// - unset fields are skipped when `omit_zero` is set or the tag has `omitempty`,
///   otherwise they map to [`Value::Null`]
pub fn to_map<E: Entity>(
    entity: &E,
    tag: &str,
    omit_zero: bool,
    exclude_tags: &[&str],
) -> AttributeMap {
    let mut map = AttributeMap::new();

    for field in E::FIELDS {
        if !exclude_tags.is_empty() && field.has_any_tag(exclude_tags) {
            continue;
        }

        let Some(raw) = field.tag(tag) else {
            continue;
        };
        let tag_value = TagValue::parse(raw);
        if tag_value.name.is_empty() {
            continue;
        }

        match entity.get_field(field.name) {
            Some(value) => {
                let _ = map.insert(tag_value.name.to_string(), value);
            }
            None if omit_zero || tag_value.omit_empty => {}
            None => {
                let _ = map.insert(tag_value.name.to_string(), Value::Null);
            }
        }
    }

    map
}

/// Read a field by name, `None` when unset or unknown
pub fn get_field<E: Entity>(entity: &E, name: &str) -> Option<Value> {
    entity.get_field(name)
}

/// Assign a field by name; unknown or read-only fields are left untouched
pub fn set_field<E: Entity>(entity: &mut E, name: &str, value: Value) -> bool {
    E::FIELDS.iter().any(|field| field.name == name) && entity.set_field(name, value)
}

/// First field whose `tag` name equals `name`
pub fn field_by_tag<E: Entity>(tag: &str, name: &str) -> Option<&'static FieldSpec> {
    E::FIELDS.iter().find(|field| {
        field
            .tag(tag)
            .is_some_and(|raw| TagValue::parse(raw).name == name)
    })
}
