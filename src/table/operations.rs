use crate::driver::{
    DeleteItemRequest, Item, QueryRequest, ScanRequest, StoreDriver, UpdateItemRequest,
};
use crate::entity::{
    Entity, PARTITION_KEY_ATTRIBUTE, PARTITION_KEY_TAG, SORT_KEY_ATTRIBUTE, SORT_KEY_TAG,
    STORAGE_TAG,
};
use crate::error::Error;
use crate::expression::{
    Condition, Expression, ExpressionBuilder, Projection, condition_from_map, generate_expression,
    update_from_map,
};
use crate::keys::{derive_keys, entity_key, load_entity_keys, load_keys_and_convert_to_map};
use crate::marshal::{marshal_entity, unmarshal_item, unmarshal_items};
use crate::reflect;
use crate::table::TableClient;

impl<D: StoreDriver> TableClient<D> {
    /// Write `entity`, replacing any stored item with the same key
    ///
    /// The derived keys are loaded into the entity's `PK`/`SK` fields first.
    pub async fn add_record<E: Entity>(&self, entity: &mut E) -> Result<(), Error> {
        let keys = load_entity_keys(entity)?;
        let item = marshal_entity(entity, &keys)?;

        self.driver.put_item(&entity.table_name(), item).await
    }

    /// Read the item addressed by the entity's keys
    ///
    /// Returns `Ok(None)` when no such item exists. On a hit the stored item is
    /// deserialized into a new `E`; `entity` only supplies the key and is left untouched,
    /// so assign the returned value to refresh it.
    pub async fn get_record_by_key<E: Entity>(&self, entity: &E) -> Result<Option<E>, Error> {
        let key = entity_key(entity)?;

        let item = self
            .driver
            .get_item(&entity.table_name(), key, self.config.consistent_reads)
            .await?;

        item.map(unmarshal_item).transpose()
    }

    /// Every item matching the populated fields of `entity`, ascending
    pub async fn get_records_by_key_and_fields<E: Entity>(
        &self,
        entity: &mut E,
    ) -> Result<Vec<E>, Error> {
        self.get_records_by_key_and_fields_limit(entity, None, true)
            .await
    }

    /// Items matching the populated fields of `entity`
    ///
    /// `PK`/`SK` form the key condition, other populated attributes are equality filters.
    /// At most `limit` items are returned, in sort key order per `scan_forward`.
    pub async fn get_records_by_key_and_fields_limit<E: Entity>(
        &self,
        entity: &mut E,
        limit: Option<usize>,
        scan_forward: bool,
    ) -> Result<Vec<E>, Error> {
        self.get_records_by_key_and_expr_limit(entity, None, None, limit, scan_forward)
            .await
    }

    /// Like [`Self::get_records_by_key_and_fields_limit`] with an extra filter and projection
    pub async fn get_records_by_key_and_expr_limit<E: Entity>(
        &self,
        entity: &mut E,
        filter: Option<Condition>,
        projection: Option<Projection>,
        limit: Option<usize>,
        scan_forward: bool,
    ) -> Result<Vec<E>, Error> {
        let criteria = load_keys_and_convert_to_map(entity)?;
        let expression = generate_expression(Some(&criteria), filter, projection)?;

        let items = self
            .query_items(&entity.table_name(), expression, limit, scan_forward)
            .await?;

        unmarshal_items(items)
    }

    /// Scan the whole table of `entity`, optionally filtered and projected
    pub async fn get_all_records<E: Entity>(
        &self,
        entity: &E,
        filter: Option<Condition>,
        projection: Option<Projection>,
    ) -> Result<Vec<E>, Error> {
        let expression = match (filter, projection) {
            (None, None) => None,
            (filter, projection) => Some(generate_expression(None, filter, projection)?),
        };

        let table = entity.table_name();
        let mut items = Vec::new();
        let mut start_key = None;

        loop {
            let page = self
                .driver
                .scan(ScanRequest {
                    table: table.clone(),
                    expression: expression.clone(),
                    limit: None,
                    exclusive_start_key: start_key.take(),
                })
                .await?;

            items.extend(page.items);

            match page.last_evaluated_key {
                Some(key) => start_key = Some(key),
                None => break,
            }
        }

        unmarshal_items(items)
    }

    /// Update every populated non-key attribute, guarded by the entity's own keys
    ///
    /// The guard makes the update fail instead of creating a new item.
    pub async fn update_records_by_key<E: Entity>(&self, entity: &E) -> Result<(), Error> {
        let keys = derive_keys(entity)?;

        let mut condition = Condition::equal(PARTITION_KEY_ATTRIBUTE, keys.partition_key.as_str());
        if let Some(sort_key) = keys.sort_key() {
            condition = condition.and(Condition::equal(SORT_KEY_ATTRIBUTE, sort_key));
        }

        self.update_records_by_params(entity, Some(condition)).await
    }

    /// Update every stored non-key attribute of `entity`, optionally guarded by `condition`
    ///
    /// Key-role fields and `PK`/`SK` are never assigned. Unset attributes without
    /// `omitempty` are written as null.
    pub async fn update_records_by_params<E: Entity>(
        &self,
        entity: &E,
        condition: Option<Condition>,
    ) -> Result<(), Error> {
        let mut fields =
            reflect::to_map(entity, STORAGE_TAG, false, &[PARTITION_KEY_TAG, SORT_KEY_TAG]);
        let _ = fields.remove(PARTITION_KEY_ATTRIBUTE);
        let _ = fields.remove(SORT_KEY_ATTRIBUTE);

        let update = update_from_map(&fields).ok_or_else(|| {
            Error::InvalidExpression(format!(
                "{} has no attributes to update",
                entity.table_name()
            ))
        })?;

        let mut builder = ExpressionBuilder::new().with_update(update);
        if let Some(condition) = condition {
            builder = builder.with_condition(condition);
        }

        self.update_records_by_expression(entity, builder.build()?)
            .await
    }

    /// Apply a pre-built update/condition expression to the item addressed by `entity`
    pub async fn update_records_by_expression<E: Entity>(
        &self,
        entity: &E,
        expression: Expression,
    ) -> Result<(), Error> {
        let key = entity_key(entity)?;

        self.driver
            .update_item(UpdateItemRequest {
                table: entity.table_name(),
                key,
                expression,
            })
            .await
    }

    /// Delete the item addressed by `entity`; deleting a missing item is not an error
    pub async fn delete_record_by_key<E: Entity>(&self, entity: &E) -> Result<(), Error> {
        let key = entity_key(entity)?;

        self.driver
            .delete_item(DeleteItemRequest {
                table: entity.table_name(),
                key,
                expression: None,
            })
            .await
    }

    /// Delete the item addressed by `entity` only if every populated attribute matches
    ///
    /// A mismatch surfaces as a conditional check failure.
    pub async fn delete_record_by_key_and_fields<E: Entity>(
        &self,
        entity: &mut E,
    ) -> Result<(), Error> {
        let criteria = load_keys_and_convert_to_map(entity)?;
        let condition = condition_from_map(&criteria).ok_or_else(|| {
            Error::InvalidExpression(format!("{} has no delete criteria", entity.table_name()))
        })?;

        self.delete_record_by_key_and_expression(entity, condition)
            .await
    }

    /// Delete the item addressed by `entity` only if `condition` holds
    pub async fn delete_record_by_key_and_expression<E: Entity>(
        &self,
        entity: &E,
        condition: Condition,
    ) -> Result<(), Error> {
        let expression = ExpressionBuilder::new().with_condition(condition).build()?;
        let key = entity_key(entity)?;

        self.driver
            .delete_item(DeleteItemRequest {
                table: entity.table_name(),
                key,
                expression: Some(expression),
            })
            .await
    }

    /// Follow query pages until exhausted or `limit` items are collected
    pub(super) async fn query_items(
        &self,
        table: &str,
        expression: Expression,
        limit: Option<usize>,
        scan_forward: bool,
    ) -> Result<Vec<Item>, Error> {
        let limit = limit.filter(|limit| *limit > 0);
        let mut items: Vec<Item> = Vec::new();
        let mut start_key = None;

        loop {
            let remaining = limit.map(|limit| limit - items.len());
            let page = self
                .driver
                .query(QueryRequest {
                    table: table.to_string(),
                    expression: expression.clone(),
                    limit: remaining.map(|remaining| remaining.min(i32::MAX as usize) as i32),
                    scan_forward,
                    consistent_read: self.config.consistent_reads,
                    exclusive_start_key: start_key.take(),
                })
                .await?;

            match remaining {
                Some(remaining) if page.items.len() >= remaining => {
                    items.extend(page.items.into_iter().take(remaining));
                    break;
                }
                _ => items.extend(page.items),
            }

            match page.last_evaluated_key {
                Some(key) => start_key = Some(key),
                None => break,
            }
        }

        Ok(items)
    }
}
