//! Store driver seam.
//!
//! [`TableClient`](crate::TableClient) talks to the store exclusively through
//! [`StoreDriver`]. [`DynamoDbDriver`] is the production implementation; tests supply an
//! in-memory one.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, KeySchemaElement, TableDescription, WriteRequest,
};
use std::collections::HashMap;
use std::fmt;

use crate::error::Error;
use crate::expression::Expression;

mod dynamodb;

pub use dynamodb::DynamoDbDriver;

/// Stored item: attribute name to typed value
pub type Item = HashMap<String, AttributeValue>;

/// One native query page request
#[derive(Clone, Debug)]
pub struct QueryRequest {
    /// Target table
    pub table: String,
    /// Key condition plus optional filter and projection
    pub expression: Expression,
    /// Native page size
    pub limit: Option<i32>,
    /// Ascending sort key order when `true`
    pub scan_forward: bool,
    /// Strongly consistent read
    pub consistent_read: bool,
    /// Resume after this key
    pub exclusive_start_key: Option<Item>,
}

/// One native scan page request
#[derive(Clone, Debug)]
pub struct ScanRequest {
    /// Target table
    pub table: String,
    /// Optional filter and projection
    pub expression: Option<Expression>,
    /// Native page size
    pub limit: Option<i32>,
    /// Resume after this key
    pub exclusive_start_key: Option<Item>,
}

/// One native page of items
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ItemPage {
    /// Items of this page
    pub items: Vec<Item>,
    /// Key to resume after, `None` when the listing is exhausted
    pub last_evaluated_key: Option<Item>,
}

/// Conditional update of one item
#[derive(Clone, Debug)]
pub struct UpdateItemRequest {
    /// Target table
    pub table: String,
    /// Primary key of the item
    pub key: Item,
    /// Update expression plus optional condition
    pub expression: Expression,
}

/// Delete of one item, optionally guarded by a condition
#[derive(Clone, Debug)]
pub struct DeleteItemRequest {
    /// Target table
    pub table: String,
    /// Primary key of the item
    pub key: Item,
    /// Condition guarding the delete
    pub expression: Option<Expression>,
}

/// Table creation request, billed on demand
#[derive(Clone, Debug)]
pub struct CreateTableRequest {
    /// Table name
    pub table: String,
    /// Hash and optional range key
    pub key_schema: Vec<KeySchemaElement>,
    /// Definitions of the key attributes
    pub attribute_definitions: Vec<AttributeDefinition>,
}

/// The capability set of a single-table key-value store
///
/// Implementations must be safe for concurrent use: the batch writer issues
/// `batch_write_item` calls from many chunks at once.
#[async_trait]
pub trait StoreDriver: Send + Sync + fmt::Debug {
    /// Fetch one item by primary key
    async fn get_item(
        &self,
        table: &str,
        key: Item,
        consistent_read: bool,
    ) -> Result<Option<Item>, Error>;

    /// Write one item, replacing any item with the same key
    async fn put_item(&self, table: &str, item: Item) -> Result<(), Error>;

    /// Update one item
    async fn update_item(&self, request: UpdateItemRequest) -> Result<(), Error>;

    /// Delete one item
    async fn delete_item(&self, request: DeleteItemRequest) -> Result<(), Error>;

    /// Fetch one native query page
    async fn query(&self, request: QueryRequest) -> Result<ItemPage, Error>;

    /// Fetch one native scan page
    async fn scan(&self, request: ScanRequest) -> Result<ItemPage, Error>;

    /// Issue one batch write, returning the requests the store left unprocessed
    async fn batch_write_item(
        &self,
        table: &str,
        requests: Vec<WriteRequest>,
    ) -> Result<Vec<WriteRequest>, Error>;

    /// Describe a table, `None` when it does not exist
    async fn describe_table(&self, table: &str) -> Result<Option<TableDescription>, Error>;

    /// Create a table
    async fn create_table(&self, request: CreateTableRequest) -> Result<TableDescription, Error>;

    /// Delete a table
    async fn delete_table(&self, table: &str) -> Result<(), Error>;

    /// Names of every table
    async fn list_tables(&self) -> Result<Vec<String>, Error>;
}
