/// Test helpers and fixtures for table client integration tests
///
/// Fixtures, an in-memory store driver, and client constructors shared by all
/// integration tests.
pub mod fixtures;
pub mod mock_driver;

pub use dynamo_entity::{ClientConfig, Entity, Error, RetryConfig, TableClient, Value};
pub use serde::{Deserialize, Serialize};

pub use fixtures::{BookmarkDistribution, UserBookmarkEntry, UserBookmarks};
pub use mock_driver::{BatchOutcome, MockDriver};

use std::time::Duration;
use tokio::sync::OnceCell;

/// Ensure tracing and the DynamoDB client are initialized for tests
#[allow(dead_code)]
static TEST_INIT: OnceCell<()> = OnceCell::const_new();

/// Install a test subscriber honouring `RUST_LOG` (idempotent)
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Initialize the global DynamoDB client for LocalStack tests (idempotent)
#[allow(dead_code)]
pub async fn init_test_client() {
    TEST_INIT
        .get_or_init(|| async {
            init_tracing();
            let _ = dynamo_entity::dynamodb_client().await;
        })
        .await;
}

/// Configuration without retry or table wait delays
#[allow(dead_code)]
pub fn fast_config() -> ClientConfig {
    ClientConfig {
        batch_retry: RetryConfig {
            interval: Duration::ZERO,
            ..RetryConfig::default()
        },
        table_wait_interval: Duration::ZERO,
        table_wait_timeout: Duration::from_millis(50),
        ..ClientConfig::default()
    }
}

/// Table client over a fresh in-memory driver
#[allow(dead_code)]
pub fn mock_client(driver: MockDriver) -> TableClient<MockDriver> {
    init_tracing();
    TableClient::new(driver, fast_config())
}
