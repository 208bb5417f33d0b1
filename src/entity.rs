//! The contract every persisted record type implements.
//!
//! An entity describes its fields with [`FieldSpec`]s carrying tags, the same way a
//! struct would carry field tags:
//!
//! - [`STORAGE_TAG`] names the stored attribute; an `omitempty` modifier after a comma
//!   drops the attribute while the field is unset.
//! - [`PARTITION_KEY_TAG`] and [`SORT_KEY_TAG`] mark fields composing the composite keys,
//!   the tag value being the key fragment prefix.
//!
//! ```rust
//! use dynamo_entity::entity::{Entity, FieldSpec, Value, PARTITION_KEY_TAG, STORAGE_TAG};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct Device {
//!     #[serde(rename = "PK", default)]
//!     pk: String,
//!     #[serde(rename = "deviceId", skip_serializing_if = "Option::is_none")]
//!     device_id: Option<String>,
//! }
//!
//! impl Entity for Device {
//!     const FIELDS: &'static [FieldSpec] = &[
//!         FieldSpec::new("pk", &[(STORAGE_TAG, "PK")]),
//!         FieldSpec::new(
//!             "device_id",
//!             &[(STORAGE_TAG, "deviceId,omitempty"), (PARTITION_KEY_TAG, "DID")],
//!         ),
//!     ];
//!
//!     fn table_name(&self) -> String {
//!         "devices".to_string()
//!     }
//!
//!     fn get_field(&self, name: &str) -> Option<Value> {
//!         match name {
//!             "pk" => Some(self.pk.clone().into()),
//!             "device_id" => self.device_id.clone().map(Value::from),
//!             _ => None,
//!         }
//!     }
//!
//!     fn set_field(&mut self, name: &str, value: Value) -> bool {
//!         match (name, value) {
//!             ("pk", Value::S(pk)) => {
//!                 self.pk = pk;
//!                 true
//!             }
//!             _ => false,
//!         }
//!     }
//! }
//! ```

use aws_sdk_dynamodb::types::AttributeValue;
use serde::{Serialize, de::DeserializeOwned};
use std::fmt;

/// Tag naming the stored attribute of a field
pub const STORAGE_TAG: &str = "dynamodbav";

/// Tag marking a field as a partition key component
pub const PARTITION_KEY_TAG: &str = "partitionKey";

/// Tag marking a field as a sort key component
pub const SORT_KEY_TAG: &str = "sortKey";

/// Stored attribute holding the composite partition key
pub const PARTITION_KEY_ATTRIBUTE: &str = "PK";

/// Stored attribute holding the composite sort key
pub const SORT_KEY_ATTRIBUTE: &str = "SK";

/// Tag modifier dropping unset fields from the stored record
pub const OMIT_EMPTY: &str = "omitempty";

/// A scalar field value
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// String
    S(String),
    /// Number, kept in its decimal string form
    N(String),
    /// Boolean
    Bool(bool),
    /// Explicit null
    Null,
}

impl Value {
    /// `true` when the value formats to an empty string
    pub fn is_empty(&self) -> bool {
        match self {
            Value::S(s) | Value::N(s) => s.is_empty(),
            Value::Bool(_) => false,
            Value::Null => true,
        }
    }

    /// Store representation of this value
    pub fn to_attribute_value(&self) -> AttributeValue {
        match self {
            Value::S(s) => AttributeValue::S(s.clone()),
            Value::N(n) => AttributeValue::N(n.clone()),
            Value::Bool(b) => AttributeValue::Bool(*b),
            Value::Null => AttributeValue::Null(true),
        }
    }

    /// Convert a store attribute back, `None` for non scalar attributes
    pub fn from_attribute_value(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::S(s) => Some(Value::S(s.clone())),
            AttributeValue::N(n) => Some(Value::N(n.clone())),
            AttributeValue::Bool(b) => Some(Value::Bool(*b)),
            AttributeValue::Null(_) => Some(Value::Null),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::S(s) | Value::N(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => Ok(()),
        }
    }
}

impl From<Value> for AttributeValue {
    fn from(value: Value) -> Self {
        value.to_attribute_value()
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::S(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::S(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! impl_numeric_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::N(value.to_string())
                }
            }

            impl TryFrom<Value> for $ty {
                type Error = Value;

                fn try_from(value: Value) -> Result<Self, Self::Error> {
                    match value {
                        Value::N(ref n) => n.parse().map_err(|_| value.clone()),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

impl_numeric_value!(i32, i64, u32, u64, usize, f64);

impl TryFrom<Value> for String {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::S(s) => Ok(s),
            other => Err(other),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(other),
        }
    }
}

/// Compile time description of one entity field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name, used by [`Entity::get_field`] and [`Entity::set_field`]
    pub name: &'static str,
    /// `(tag, value)` pairs attached to the field
    pub tags: &'static [(&'static str, &'static str)],
}

impl FieldSpec {
    /// Describe a field and its tags
    pub const fn new(name: &'static str, tags: &'static [(&'static str, &'static str)]) -> Self {
        Self { name, tags }
    }

    /// Raw value of `tag` on this field, if present and non-empty
    pub fn tag(&self, tag: &str) -> Option<&'static str> {
        self.tags
            .iter()
            .find(|(name, value)| *name == tag && !value.is_empty())
            .map(|(_, value)| *value)
    }

    /// `true` if the field carries any of `tags`
    pub fn has_any_tag(&self, tags: &[&str]) -> bool {
        tags.iter().any(|tag| self.tag(tag).is_some())
    }
}

/// A domain record persisted through a [`TableClient`](crate::TableClient)
///
/// Field values are read by name through [`Entity::get_field`]; `None` means the field
/// is unset and never takes part in keys, criteria or `omitempty` attributes.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    /// Ordered field descriptors
    const FIELDS: &'static [FieldSpec];

    /// Table holding this entity, resolved at runtime
    fn table_name(&self) -> String;

    /// Current value of the field `name`
    fn get_field(&self, name: &str) -> Option<Value>;

    /// Assign the field `name`; returns `false` when the field cannot be set
    fn set_field(&mut self, _name: &str, _value: Value) -> bool {
        false
    }
}
