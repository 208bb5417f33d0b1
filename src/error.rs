use aws_sdk_dynamodb::error::BuildError;
use aws_sdk_dynamodb::operation::batch_write_item::BatchWriteItemError;
use aws_sdk_dynamodb::operation::create_table::CreateTableError;
use aws_sdk_dynamodb::operation::delete_item::DeleteItemError;
use aws_sdk_dynamodb::operation::delete_table::DeleteTableError;
use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;
use aws_sdk_dynamodb::operation::get_item::GetItemError;
use aws_sdk_dynamodb::operation::list_tables::ListTablesError;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::operation::query::QueryError;
use aws_sdk_dynamodb::operation::scan::ScanError;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_runtime_api::http::Response;
use serde_dynamo::Error as SerdeDynamoError;
use std::fmt;

use crate::table::Cursor;

/// Classification of a failed store call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// A condition expression evaluated to false
    ConditionalCheckFailed,
    /// The table (or index) does not exist
    ResourceNotFound,
    /// The table already exists or is being created/deleted
    ResourceInUse,
    /// Provisioned throughput or request rate exceeded
    Throttled,
    /// Anything else: network, validation, internal server errors
    Other,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreErrorKind::ConditionalCheckFailed => "conditional check failed",
            StoreErrorKind::ResourceNotFound => "resource not found",
            StoreErrorKind::ResourceInUse => "resource in use",
            StoreErrorKind::Throttled => "throttled",
            StoreErrorKind::Other => "store failure",
        };
        f.write_str(name)
    }
}

/// DynamoDB entity operation error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A mandatory composite key resolved to an empty string
    #[error("{tag} key for {table} is empty")]
    KeyMissing {
        /// Key role tag that produced no value (`partitionKey`)
        tag: &'static str,
        /// Table of the entity whose key is missing
        table: String,
    },

    /// Serde DynamoDB serialization/deserialization error
    #[error("DynamoDB serialization error: {0}")]
    Serialization(#[from] SerdeDynamoError),

    /// A store driver call failed
    #[error("DynamoDB {operation} operation failed ({kind}): {message}")]
    Store {
        /// Store operation name, e.g. `PutItem`
        operation: &'static str,
        /// Failure classification
        kind: StoreErrorKind,
        /// Driver supplied description
        message: String,
    },

    /// Items were still unprocessed after the retry budget was spent
    #[error("unable to process {unprocessed} items for table {table} after {attempts} attempts")]
    BatchPartialFailure {
        /// Target table
        table: String,
        /// Number of write requests still unprocessed
        unprocessed: usize,
        /// Number of batch write attempts made
        attempts: usize,
    },

    /// Table creation, deletion or waiting failed
    #[error("table {table} lifecycle failure: {reason}")]
    TableLifecycle {
        /// Target table
        table: String,
        /// What went wrong
        reason: String,
    },

    /// A batch write was requested with no entities
    #[error("entities to add are empty")]
    EmptyBatch,

    /// An expression could not be built from the supplied parts
    #[error("invalid expression: {0}")]
    InvalidExpression(String),

    /// DynamoDB request builder error
    #[error("DynamoDB request builder error: {0}")]
    Build(#[from] BuildError),

    /// Fetching a page failed; `cursor` is where the listing can be resumed from
    #[error("pagination failed: {source}")]
    Pagination {
        /// Best known resume point
        cursor: Option<Cursor>,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Build a store error from its parts
    pub fn store(operation: &'static str, kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Error::Store {
            operation,
            kind,
            message: message.into(),
        }
    }

    fn store_kind(&self) -> Option<StoreErrorKind> {
        match self {
            Error::Store { kind, .. } => Some(*kind),
            Error::Pagination { source, .. } => source.store_kind(),
            _ => None,
        }
    }

    /// Check if the error is a DynamoDB ConditionalCheckFailedException
    ///
    /// Conditional updates and deletes report a failed guard this way.
    pub fn is_conditional_check_failed(&self) -> bool {
        self.store_kind() == Some(StoreErrorKind::ConditionalCheckFailed)
    }

    /// Check if the error reports a missing table
    pub fn is_not_found(&self) -> bool {
        self.store_kind() == Some(StoreErrorKind::ResourceNotFound)
    }

    /// Check if repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        self.store_kind() == Some(StoreErrorKind::Throttled)
    }

    /// Check if the error is a serialization/deserialization error
    pub fn is_serialization_error(&self) -> bool {
        matches!(self, Error::Serialization(_))
    }
}

/// Maps an SDK failure of a single operation into [`Error::Store`].
pub(crate) trait IntoStoreError {
    fn into_store_error(self, operation: &'static str) -> Error;
}

fn sdk_message<E, R>(err: &SdkError<E, R>) -> String
where
    E: std::error::Error + 'static,
    R: fmt::Debug,
{
    match err.as_service_error() {
        Some(service) => service.to_string(),
        None => format!("{err:?}"),
    }
}

macro_rules! impl_into_store_error {
    ($error:ident { $($variant:ident => $kind:ident),* $(,)? }) => {
        impl IntoStoreError for SdkError<$error, Response> {
            fn into_store_error(self, operation: &'static str) -> Error {
                let message = sdk_message(&self);
                #[allow(unreachable_patterns)]
                let kind = match self.as_service_error() {
                    $(Some($error::$variant(_)) => StoreErrorKind::$kind,)*
                    _ => StoreErrorKind::Other,
                };
                Error::store(operation, kind, message)
            }
        }
    };
}

impl_into_store_error!(GetItemError {
    ResourceNotFoundException => ResourceNotFound,
    ProvisionedThroughputExceededException => Throttled,
    RequestLimitExceeded => Throttled,
});
impl_into_store_error!(PutItemError {
    ConditionalCheckFailedException => ConditionalCheckFailed,
    ResourceNotFoundException => ResourceNotFound,
    ProvisionedThroughputExceededException => Throttled,
    RequestLimitExceeded => Throttled,
});
impl_into_store_error!(UpdateItemError {
    ConditionalCheckFailedException => ConditionalCheckFailed,
    ResourceNotFoundException => ResourceNotFound,
    ProvisionedThroughputExceededException => Throttled,
    RequestLimitExceeded => Throttled,
});
impl_into_store_error!(DeleteItemError {
    ConditionalCheckFailedException => ConditionalCheckFailed,
    ResourceNotFoundException => ResourceNotFound,
    ProvisionedThroughputExceededException => Throttled,
    RequestLimitExceeded => Throttled,
});
impl_into_store_error!(QueryError {
    ResourceNotFoundException => ResourceNotFound,
    ProvisionedThroughputExceededException => Throttled,
    RequestLimitExceeded => Throttled,
});
impl_into_store_error!(ScanError {
    ResourceNotFoundException => ResourceNotFound,
    ProvisionedThroughputExceededException => Throttled,
    RequestLimitExceeded => Throttled,
});
impl_into_store_error!(BatchWriteItemError {
    ResourceNotFoundException => ResourceNotFound,
    ProvisionedThroughputExceededException => Throttled,
    RequestLimitExceeded => Throttled,
});
impl_into_store_error!(CreateTableError {
    ResourceInUseException => ResourceInUse,
    LimitExceededException => Throttled,
});
impl_into_store_error!(DescribeTableError {
    ResourceNotFoundException => ResourceNotFound,
});
impl_into_store_error!(DeleteTableError {
    ResourceNotFoundException => ResourceNotFound,
    ResourceInUseException => ResourceInUse,
    LimitExceededException => Throttled,
});
impl_into_store_error!(ListTablesError {});
