//! Client configuration and stage-aware environment helpers.

use std::env;
use std::time::Duration;

/// Maximum number of write requests DynamoDB accepts in one `BatchWriteItem` call
pub const MAX_BATCH_WRITE_SIZE: usize = 25;

/// Default number of batch chunks in flight at once
pub const DEFAULT_MAX_CONCURRENCY: usize = 40;

/// Default number of attempts for a batch chunk with unprocessed items
pub const DEFAULT_BATCH_RETRY_ATTEMPTS: usize = 100;

/// Retry configuration for batch operations
///
/// The interval is constant between attempts, there is no backoff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of batch write attempts per chunk, including the first one
    pub max_attempts: usize,
    /// Delay between two attempts
    pub interval: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_BATCH_RETRY_ATTEMPTS,
            interval: Duration::from_secs(1),
        }
    }
}

/// Tunables of a [`TableClient`](crate::TableClient)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Entities per batch write request, clamped to [`MAX_BATCH_WRITE_SIZE`]
    pub batch_size: usize,
    /// Maximum number of batch chunks processed concurrently
    pub max_concurrency: usize,
    /// Retry policy for unprocessed batch items
    pub batch_retry: RetryConfig,
    /// How long `create_table_if_not_exists` waits for the table to become active
    pub table_wait_timeout: Duration,
    /// Polling interval while waiting for a table to become active
    pub table_wait_interval: Duration,
    /// Use strongly consistent reads for key/field queries
    pub consistent_reads: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH_WRITE_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            batch_retry: RetryConfig::default(),
            table_wait_timeout: Duration::from_secs(120),
            table_wait_interval: Duration::from_secs(5),
            consistent_reads: true,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `DYNAMODB_BATCH_CONCURRENCY`, `DYNAMODB_BATCH_RETRY_ATTEMPTS`
    /// and `DYNAMODB_BATCH_RETRY_INTERVAL_MS` when they hold valid numbers
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(concurrency) = env_usize("DYNAMODB_BATCH_CONCURRENCY") {
            config.max_concurrency = concurrency;
        }
        if let Some(attempts) = env_usize("DYNAMODB_BATCH_RETRY_ATTEMPTS") {
            config.batch_retry.max_attempts = attempts;
        }
        if let Some(interval) = env_usize("DYNAMODB_BATCH_RETRY_INTERVAL_MS") {
            config.batch_retry.interval = Duration::from_millis(interval as u64);
        }

        config
    }

    /// Effective chunk size for batch writes
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_BATCH_WRITE_SIZE)
    }

    /// Effective concurrency cap, never zero
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}

fn env_usize(name: &str) -> Option<usize> {
    env::var(name).ok().and_then(|value| value.trim().parse().ok())
}

/// `true` when running locally or in the test stage (`STAGE` unset, empty or `testing`)
pub fn is_local_or_test_env() -> bool {
    stage_is_local_or_test(env::var("STAGE").ok().as_deref())
}

fn stage_is_local_or_test(stage: Option<&str>) -> bool {
    matches!(stage, None | Some("") | Some("testing"))
}

/// Resolve a table name from the environment variable `var`
///
/// Falls back to `default` only for local and test stages; deployed stages get an
/// empty name so a missing variable fails loudly at the store.
pub fn table_name_from_env(var: &str, default: &str) -> String {
    match env::var(var) {
        Ok(name) if !name.is_empty() => name,
        _ if is_local_or_test_env() => default.to_string(),
        _ => String::new(),
    }
}
