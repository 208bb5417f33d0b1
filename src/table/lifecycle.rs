use aws_sdk_dynamodb::types::{
    AttributeDefinition, KeySchemaElement, KeyType, ScalarAttributeType, TableDescription,
    TableStatus,
};
use tokio::time::{Instant, sleep};

use crate::driver::{CreateTableRequest, StoreDriver};
use crate::entity::{Entity, PARTITION_KEY_ATTRIBUTE, SORT_KEY_ATTRIBUTE, SORT_KEY_TAG};
use crate::error::{Error, StoreErrorKind};
use crate::table::TableClient;

impl<D: StoreDriver> TableClient<D> {
    /// Create the table of `entity` unless it already exists
    ///
    /// The key schema is `PK` (hash) plus `SK` (range) when the entity declares sort key
    /// fields. Waits for the table to become active.
    pub async fn create_table_if_not_exists<E: Entity>(
        &self,
        entity: &E,
    ) -> Result<TableDescription, Error> {
        let mut key_schema = vec![key_schema_element(PARTITION_KEY_ATTRIBUTE, KeyType::Hash)?];
        let mut attribute_definitions = vec![string_attribute(PARTITION_KEY_ATTRIBUTE)?];

        if E::FIELDS.iter().any(|field| field.tag(SORT_KEY_TAG).is_some()) {
            key_schema.push(key_schema_element(SORT_KEY_ATTRIBUTE, KeyType::Range)?);
            attribute_definitions.push(string_attribute(SORT_KEY_ATTRIBUTE)?);
        }

        self.create_table_by_keys_if_not_exists(
            &entity.table_name(),
            key_schema,
            attribute_definitions,
        )
        .await
    }

    /// Create `table` with an explicit key schema unless it already exists
    ///
    /// Returns the existing description untouched, otherwise creates the table on demand
    /// billing and polls until it is active or
    /// [`ClientConfig::table_wait_timeout`](crate::ClientConfig) elapses.
    pub async fn create_table_by_keys_if_not_exists(
        &self,
        table: &str,
        key_schema: Vec<KeySchemaElement>,
        attribute_definitions: Vec<AttributeDefinition>,
    ) -> Result<TableDescription, Error> {
        if let Some(existing) = self.describe(table).await? {
            return Ok(existing);
        }

        let request = CreateTableRequest {
            table: table.to_string(),
            key_schema,
            attribute_definitions,
        };

        match self.driver.create_table(request).await {
            Ok(_) => {}
            // created concurrently, wait for it like our own
            Err(Error::Store {
                kind: StoreErrorKind::ResourceInUse,
                ..
            }) => {}
            Err(err) => {
                tracing::error!(table, error = %err, "couldn't create table");
                return Err(err);
            }
        }

        let description = self
            .wait_until_active(table)
            .await
            .inspect_err(|err| tracing::error!(table, error = %err, "wait for table exists failed"))?;

        tracing::info!(table, "table created successfully");
        Ok(description)
    }

    /// `true` when `table` exists
    pub async fn table_exists(&self, table: &str) -> Result<bool, Error> {
        Ok(self.describe(table).await?.is_some())
    }

    /// Names of every table
    pub async fn list_tables(&self) -> Result<Vec<String>, Error> {
        self.driver.list_tables().await
    }

    /// Delete `table`
    pub async fn delete_table(&self, table: &str) -> Result<(), Error> {
        self.driver.delete_table(table).await
    }

    async fn describe(&self, table: &str) -> Result<Option<TableDescription>, Error> {
        let description = self
            .driver
            .describe_table(table)
            .await
            .inspect_err(|err| {
                tracing::error!(table, error = %err, "couldn't determine existence of table")
            })?;

        if description.is_none() {
            tracing::warn!(table, "table does not exist");
        }
        Ok(description)
    }

    async fn wait_until_active(&self, table: &str) -> Result<TableDescription, Error> {
        let deadline = Instant::now() + self.config.table_wait_timeout;

        loop {
            if let Some(description) = self.driver.describe_table(table).await? {
                if description.table_status() == Some(&TableStatus::Active) {
                    return Ok(description);
                }
            }

            if Instant::now() + self.config.table_wait_interval > deadline {
                return Err(Error::TableLifecycle {
                    table: table.to_string(),
                    reason: format!(
                        "not active after {}s",
                        self.config.table_wait_timeout.as_secs()
                    ),
                });
            }

            sleep(self.config.table_wait_interval).await;
        }
    }
}

fn key_schema_element(name: &str, key_type: KeyType) -> Result<KeySchemaElement, Error> {
    Ok(KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()?)
}

fn string_attribute(name: &str) -> Result<AttributeDefinition, Error> {
    Ok(AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(ScalarAttributeType::S)
        .build()?)
}
