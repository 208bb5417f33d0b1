//! Entity <-> stored item conversion.

use serde_dynamo::{from_item, from_items, to_item};

use crate::driver::Item;
use crate::entity::{Entity, SORT_KEY_ATTRIBUTE};
use crate::error::Error;
use crate::keys::StorageKeys;

/// Serialize `entity` into a stored item carrying literal `PK`/`SK` attributes
pub fn marshal_entity<E: Entity>(entity: &E, keys: &StorageKeys) -> Result<Item, Error> {
    let mut item: Item = to_item(entity)?;
    if keys.sort_key().is_none() {
        let _ = item.remove(SORT_KEY_ATTRIBUTE);
    }
    item.extend(keys.to_item());
    Ok(item)
}

/// Deserialize one stored item, attributes unknown to `E` are ignored
pub fn unmarshal_item<E: Entity>(item: Item) -> Result<E, Error> {
    Ok(from_item(item)?)
}

/// Deserialize a list of stored items in order
pub fn unmarshal_items<E: Entity>(items: Vec<Item>) -> Result<Vec<E>, Error> {
    if items.is_empty() {
        return Ok(Vec::new());
    }
    Ok(from_items(items)?)
}
