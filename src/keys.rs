//! Composite partition/sort key synthesis.
//!
//! Every key-role field contributes a `"<tag>#<value>"` fragment, fragments are ordered by
//! tag name and joined with `#`. `{FirstAddr: 34 (FAD), LastAddr: 56 (LAD)}` becomes
//! `"FAD#34#LAD#56"` whatever the field declaration order.

use aws_sdk_dynamodb::types::AttributeValue;
use tracing::error;

use crate::driver::Item;
use crate::entity::{
    Entity, PARTITION_KEY_ATTRIBUTE, PARTITION_KEY_TAG, SORT_KEY_ATTRIBUTE, SORT_KEY_TAG,
    STORAGE_TAG, Value,
};
use crate::error::Error;
use crate::reflect::{self, AttributeMap};

/// Composite keys of one entity
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageKeys {
    /// Composite partition key, never empty
    pub partition_key: String,
    /// Composite sort key, empty when the entity has none
    pub sort_key: String,
}

impl StorageKeys {
    /// Sort key, `None` when empty
    pub fn sort_key(&self) -> Option<&str> {
        Some(self.sort_key.as_str()).filter(|sk| !sk.is_empty())
    }

    /// Primary key item: `PK`, plus `SK` when the sort key is not empty
    pub fn to_item(&self) -> Item {
        let mut item = Item::with_capacity(2);
        let _ = item.insert(
            PARTITION_KEY_ATTRIBUTE.to_string(),
            AttributeValue::S(self.partition_key.clone()),
        );
        if let Some(sort_key) = self.sort_key() {
            let _ = item.insert(
                SORT_KEY_ATTRIBUTE.to_string(),
                AttributeValue::S(sort_key.to_string()),
            );
        }
        item
    }
}

/// Build the composite key for the fields tagged `key_tag`
///
/// An empty partition key is an error, an empty sort key is returned as `""`.
pub fn derive_key<E: Entity>(entity: &E, key_tag: &str) -> Result<String, Error> {
    let fields = reflect::to_map(entity, key_tag, true, &[]);

    let key = fields
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(tag, value)| format!("{tag}#{value}"))
        .collect::<Vec<_>>()
        .join("#");

    if key.is_empty() && key_tag == PARTITION_KEY_TAG {
        return Err(Error::KeyMissing {
            tag: PARTITION_KEY_TAG,
            table: entity.table_name(),
        });
    }

    Ok(key)
}

/// Derive both composite keys
pub fn derive_keys<E: Entity>(entity: &E) -> Result<StorageKeys, Error> {
    Ok(StorageKeys {
        partition_key: derive_key(entity, PARTITION_KEY_TAG)?,
        sort_key: derive_key(entity, SORT_KEY_TAG)?,
    })
}

/// Derive both keys and write them into the entity's `PK`/`SK` fields, if it declares them
pub fn load_entity_keys<E: Entity>(entity: &mut E) -> Result<StorageKeys, Error> {
    let keys = derive_keys(entity)?;

    if let Some(field) = reflect::field_by_tag::<E>(STORAGE_TAG, PARTITION_KEY_ATTRIBUTE) {
        let _ = reflect::set_field(entity, field.name, Value::S(keys.partition_key.clone()));
    }
    if let Some(sort_key) = keys.sort_key() {
        if let Some(field) = reflect::field_by_tag::<E>(STORAGE_TAG, SORT_KEY_ATTRIBUTE) {
            let _ = reflect::set_field(entity, field.name, Value::S(sort_key.to_string()));
        }
    }

    Ok(keys)
}

/// Primary key item addressing `entity`
pub fn entity_key<E: Entity>(entity: &E) -> Result<Item, Error> {
    derive_keys(entity)
        .map(|keys| keys.to_item())
        .inspect_err(|err| error!(table = %entity.table_name(), error = %err, "key derivation failed"))
}

/// Load the keys, then collect the query-by-example criteria of `entity`
///
/// The result holds `PK`, `SK` when non-empty, and every populated stored attribute that
/// is not a key-role field.
pub fn load_keys_and_convert_to_map<E: Entity>(entity: &mut E) -> Result<AttributeMap, Error> {
    let keys = load_entity_keys(entity)?;

    let mut criteria = reflect::to_map(
        entity,
        STORAGE_TAG,
        true,
        &[PARTITION_KEY_TAG, SORT_KEY_TAG],
    );
    let _ = criteria.insert(
        PARTITION_KEY_ATTRIBUTE.to_string(),
        Value::S(keys.partition_key.clone()),
    );
    match keys.sort_key() {
        Some(sort_key) => {
            let _ = criteria.insert(SORT_KEY_ATTRIBUTE.to_string(), Value::from(sort_key));
        }
        None => {
            let _ = criteria.remove(SORT_KEY_ATTRIBUTE);
        }
    }

    Ok(criteria)
}
