//! The entity facing table client.
//!
//! [`TableClient`] composes key derivation, expression building and marshaling on top of a
//! [`StoreDriver`]. Single record operations run on the caller's task; only
//! [`TableClient::add_batch_records`] fans out, bounded by
//! [`ClientConfig::max_concurrency`].

use crate::config::ClientConfig;
use crate::driver::{DynamoDbDriver, StoreDriver};

mod batch;
mod lifecycle;
mod operations;
mod pagination;
mod types;

pub use types::{Cursor, Page};

/// CRUD, query, batch and table lifecycle operations for any [`Entity`](crate::Entity)
#[derive(Clone, Debug)]
pub struct TableClient<D = DynamoDbDriver> {
    driver: D,
    config: ClientConfig,
}

impl TableClient<DynamoDbDriver> {
    /// Client over the process wide DynamoDB client, configured from the environment
    pub async fn from_env() -> Self {
        Self::new(DynamoDbDriver::from_global().await, ClientConfig::from_env())
    }
}

impl<D: StoreDriver> TableClient<D> {
    /// Client over `driver` with the given configuration
    pub fn new(driver: D, config: ClientConfig) -> Self {
        Self { driver, config }
    }

    /// Client over `driver` with the default configuration
    pub fn with_driver(driver: D) -> Self {
        Self::new(driver, ClientConfig::default())
    }

    /// The store driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// The active configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}
