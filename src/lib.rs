//! # DynamoDB Entity Persistence
//!
//! Persist arbitrary typed records in single-table DynamoDB layouts without writing
//! per-record queries:
//! - Composite partition/sort keys synthesized from tagged fields
//! - Query-by-example: populated fields become key conditions and filters
//! - Conditional updates and deletes built from typed conditions
//! - Bounded-concurrency batch writes retrying unprocessed items
//! - Exact-size, cursor-resumable pagination
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dynamo_entity::entity::{PARTITION_KEY_TAG, SORT_KEY_TAG, STORAGE_TAG};
//! use dynamo_entity::{Entity, Error, FieldSpec, TableClient, Value};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct Device {
//!     #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
//!     user_id: Option<String>,
//!     #[serde(rename = "deviceId", skip_serializing_if = "Option::is_none")]
//!     device_id: Option<String>,
//!     #[serde(rename = "status", skip_serializing_if = "Option::is_none")]
//!     status: Option<String>,
//! }
//!
//! impl Entity for Device {
//!     const FIELDS: &'static [FieldSpec] = &[
//!         FieldSpec::new("user_id", &[(STORAGE_TAG, "userId,omitempty"), (PARTITION_KEY_TAG, "UID")]),
//!         FieldSpec::new("device_id", &[(STORAGE_TAG, "deviceId,omitempty"), (SORT_KEY_TAG, "DID")]),
//!         FieldSpec::new("status", &[(STORAGE_TAG, "status,omitempty")]),
//!     ];
//!
//!     fn table_name(&self) -> String {
//!         dynamo_entity::config::table_name_from_env("DEVICE_TABLE_NAME", "devices")
//!     }
//!
//!     fn get_field(&self, name: &str) -> Option<Value> {
//!         match name {
//!             "user_id" => self.user_id.clone().map(Value::from),
//!             "device_id" => self.device_id.clone().map(Value::from),
//!             "status" => self.status.clone().map(Value::from),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let client = TableClient::from_env().await;
//!
//!     let mut device = Device {
//!         user_id: Some("45".to_string()),
//!         device_id: Some("d-1".to_string()),
//!         status: Some("Pending".to_string()),
//!     };
//!     client.create_table_if_not_exists(&device).await?;
//!
//!     // stored under PK = "UID#45", SK = "DID#d-1"
//!     client.add_record(&mut device).await?;
//!
//!     // every device of user 45
//!     let mut example = Device {
//!         user_id: Some("45".to_string()),
//!         ..Default::default()
//!     };
//!     let devices = client.get_records_by_key_and_fields(&mut example).await?;
//!     assert_eq!(devices.len(), 1);
//!
//!     Ok(())
//! }
//! ```
#![deny(
    warnings,
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    unused_allocation,
    unused_comparisons,
    unused_parens,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results,
    deprecated,
    unknown_lints,
    unreachable_code,
    unused_mut
)]

mod error;
pub use error::{Error, StoreErrorKind};

/// Client configuration and environment helpers
pub mod config;

/// Store driver trait and its DynamoDB implementation
pub mod driver;

pub mod entity;

pub mod expression;

/// Composite key derivation
pub mod keys;

/// Stored item marshaling
pub mod marshal;

pub mod reflect;

/// Entity table client
pub mod table;

pub use config::{ClientConfig, RetryConfig};
pub use driver::{DynamoDbDriver, Item, StoreDriver};
pub use entity::{Entity, FieldSpec, Value};
pub use expression::{Condition, Expression, ExpressionBuilder, KeyCondition, Projection, Update};
pub use table::{Cursor, Page, TableClient};

// Re-export aws-config types for configuration
pub use aws_config::{
    BehaviorVersion, Region, SdkConfig, defaults,
    meta::region::{ProvideRegion, RegionProviderChain},
    timeout::TimeoutConfig,
};

// Re-export aws-types for advanced configuration
pub use aws_types::sdk_config::Builder as SdkConfigBuilder;

use aws_sdk_dynamodb::Client as DynamoDbClient;
use tokio::sync::OnceCell;

/// Global DynamoDB client instance
static GLOBAL_CLIENT: OnceCell<DynamoDbClient> = OnceCell::const_new();

/// Default SDK configuration
///
/// - Adaptive retry mode with 3 max attempts, backoff starting at 1 second
/// - Connect timeout: 3 seconds
/// - Read timeout: 20 seconds
/// - Operation timeout: 60 seconds
/// - LocalStack endpoint when `AWS_PROFILE=localstack`
async fn aws_config_defaults() -> SdkConfig {
    use aws_types::sdk_config::RetryConfig as SdkRetryConfig;
    use std::time::Duration;

    let timeout_config = TimeoutConfig::builder()
        .connect_timeout(Duration::from_secs(3))
        .read_timeout(Duration::from_secs(20))
        .operation_timeout(Duration::from_secs(60))
        .build();

    let mut loader = defaults(BehaviorVersion::latest())
        .retry_config(
            SdkRetryConfig::adaptive()
                .with_max_attempts(3)
                .with_initial_backoff(Duration::from_secs(1)),
        )
        .timeout_config(timeout_config);

    if std::env::var("AWS_PROFILE").unwrap_or_default() == "localstack" {
        loader = loader.endpoint_url("http://127.0.0.1:4566");
    }

    loader.load().await
}

/// Initialize the global DynamoDB client with a custom AWS config
///
/// Has no effect once the global client exists.
///
/// # Example
///
/// ```rust,no_run
/// #[tokio::main]
/// async fn main() {
///     let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
///         .region(aws_config::Region::new("us-west-2"))
///         .load()
///         .await;
///     dynamo_entity::init(&config).await;
/// }
/// ```
pub async fn init(config: &SdkConfig) {
    let _ = GLOBAL_CLIENT
        .get_or_init(|| async { DynamoDbClient::new(config) })
        .await;
}

/// Initialize the global DynamoDB client with a custom client instance
pub async fn init_with_client(client: DynamoDbClient) {
    let _ = GLOBAL_CLIENT.get_or_init(|| async { client }).await;
}

/// Get a reference to the global DynamoDB client
///
/// Initialized on first use with adaptive retries (3 attempts), 3s/20s/60s
/// connect/read/operation timeouts and the LocalStack endpoint when
/// `AWS_PROFILE=localstack`, unless [`init`] or [`init_with_client`] ran before.
///
/// ```rust,no_run
/// # async fn example() {
/// let driver = dynamo_entity::DynamoDbDriver::new(dynamo_entity::dynamodb_client().await.clone());
/// let client = dynamo_entity::TableClient::with_driver(driver);
/// # }
/// ```
pub async fn dynamodb_client() -> &'static DynamoDbClient {
    GLOBAL_CLIENT
        .get_or_init(|| async {
            let config = aws_config_defaults().await;
            DynamoDbClient::new(&config)
        })
        .await
}
