use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::{BillingMode, TableDescription, WriteRequest};

use super::{
    CreateTableRequest, DeleteItemRequest, Item, ItemPage, QueryRequest, ScanRequest,
    StoreDriver, UpdateItemRequest,
};
use crate::dynamodb_client;
use crate::error::{Error, IntoStoreError};

/// [`StoreDriver`] backed by the AWS SDK DynamoDB client
#[derive(Clone, Debug)]
pub struct DynamoDbDriver {
    client: Client,
}

impl DynamoDbDriver {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Use the process wide client, initializing it with defaults if needed
    pub async fn from_global() -> Self {
        Self::new(dynamodb_client().await.clone())
    }

    /// Underlying SDK client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl StoreDriver for DynamoDbDriver {
    async fn get_item(
        &self,
        table: &str,
        key: Item,
        consistent_read: bool,
    ) -> Result<Option<Item>, Error> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(key))
            .consistent_read(consistent_read)
            .send()
            .await
            .map_err(|e| e.into_store_error("GetItem"))?;

        Ok(output.item)
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<(), Error> {
        let _ = self
            .client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| e.into_store_error("PutItem"))?;

        Ok(())
    }

    async fn update_item(&self, request: UpdateItemRequest) -> Result<(), Error> {
        let UpdateItemRequest {
            table,
            key,
            expression,
        } = request;

        let _ = self
            .client
            .update_item()
            .table_name(table)
            .set_key(Some(key))
            .set_expression_attribute_names(expression.attribute_names())
            .set_expression_attribute_values(expression.attribute_values())
            .set_update_expression(expression.update)
            .set_condition_expression(expression.condition)
            .send()
            .await
            .map_err(|e| e.into_store_error("UpdateItem"))?;

        Ok(())
    }

    async fn delete_item(&self, request: DeleteItemRequest) -> Result<(), Error> {
        let mut builder = self
            .client
            .delete_item()
            .table_name(request.table)
            .set_key(Some(request.key));

        if let Some(expression) = request.expression {
            builder = builder
                .set_expression_attribute_names(expression.attribute_names())
                .set_expression_attribute_values(expression.attribute_values())
                .set_condition_expression(expression.condition);
        }

        let _ = builder
            .send()
            .await
            .map_err(|e| e.into_store_error("DeleteItem"))?;

        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> Result<ItemPage, Error> {
        let QueryRequest {
            table,
            expression,
            limit,
            scan_forward,
            consistent_read,
            exclusive_start_key,
        } = request;

        tracing::debug!(table = %table, ?limit, "query page");

        let output = self
            .client
            .query()
            .table_name(table)
            .set_expression_attribute_names(expression.attribute_names())
            .set_expression_attribute_values(expression.attribute_values())
            .set_key_condition_expression(expression.key_condition)
            .set_filter_expression(expression.filter)
            .set_projection_expression(expression.projection)
            .scan_index_forward(scan_forward)
            .consistent_read(consistent_read)
            .set_limit(limit)
            .set_exclusive_start_key(exclusive_start_key)
            .send()
            .await
            .map_err(|e| e.into_store_error("Query"))?;

        Ok(ItemPage {
            items: output.items.unwrap_or_default(),
            last_evaluated_key: output.last_evaluated_key.filter(|key| !key.is_empty()),
        })
    }

    async fn scan(&self, request: ScanRequest) -> Result<ItemPage, Error> {
        tracing::debug!(table = %request.table, limit = ?request.limit, "scan page");

        let mut builder = self
            .client
            .scan()
            .table_name(request.table)
            .set_limit(request.limit)
            .set_exclusive_start_key(request.exclusive_start_key);

        if let Some(expression) = request.expression {
            builder = builder
                .set_expression_attribute_names(expression.attribute_names())
                .set_expression_attribute_values(expression.attribute_values())
                .set_filter_expression(expression.filter)
                .set_projection_expression(expression.projection);
        }

        let output = builder
            .send()
            .await
            .map_err(|e| e.into_store_error("Scan"))?;

        Ok(ItemPage {
            items: output.items.unwrap_or_default(),
            last_evaluated_key: output.last_evaluated_key.filter(|key| !key.is_empty()),
        })
    }

    async fn batch_write_item(
        &self,
        table: &str,
        requests: Vec<WriteRequest>,
    ) -> Result<Vec<WriteRequest>, Error> {
        let output = self
            .client
            .batch_write_item()
            .request_items(table, requests)
            .send()
            .await
            .map_err(|e| e.into_store_error("BatchWriteItem"))?;

        Ok(output
            .unprocessed_items
            .and_then(|mut unprocessed| unprocessed.remove(table))
            .unwrap_or_default())
    }

    async fn describe_table(&self, table: &str) -> Result<Option<TableDescription>, Error> {
        match self.client.describe_table().table_name(table).send().await {
            Ok(output) => Ok(output.table),
            Err(e) => {
                let err = e.into_store_error("DescribeTable");
                if err.is_not_found() {
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn create_table(&self, request: CreateTableRequest) -> Result<TableDescription, Error> {
        let table = request.table;

        let output = self
            .client
            .create_table()
            .table_name(&table)
            .billing_mode(BillingMode::PayPerRequest)
            .set_key_schema(Some(request.key_schema))
            .set_attribute_definitions(Some(request.attribute_definitions))
            .send()
            .await
            .map_err(|e| e.into_store_error("CreateTable"))?;

        output
            .table_description
            .ok_or_else(|| Error::TableLifecycle {
                table,
                reason: "create table returned no description".to_string(),
            })
    }

    async fn delete_table(&self, table: &str) -> Result<(), Error> {
        let _ = self
            .client
            .delete_table()
            .table_name(table)
            .send()
            .await
            .map_err(|e| e.into_store_error("DeleteTable"))?;

        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<String>, Error> {
        let mut tables = Vec::new();
        let mut start_table = None;

        loop {
            let output = self
                .client
                .list_tables()
                .set_exclusive_start_table_name(start_table)
                .send()
                .await
                .map_err(|e| e.into_store_error("ListTables"))?;

            tables.extend(output.table_names.unwrap_or_default());

            match output.last_evaluated_table_name {
                Some(last) => start_table = Some(last),
                None => break,
            }
        }

        Ok(tables)
    }
}
