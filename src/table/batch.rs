use aws_sdk_dynamodb::types::{DeleteRequest, PutRequest, WriteRequest};
use futures_util::{StreamExt, TryStreamExt, future};
use tokio::time::sleep;
use tokio_stream::{self as stream};

use crate::driver::{ScanRequest, StoreDriver};
use crate::entity::{Entity, PARTITION_KEY_ATTRIBUTE, SORT_KEY_ATTRIBUTE};
use crate::error::Error;
use crate::expression::{Condition, ExpressionBuilder, Projection, condition_from_map};
use crate::keys::{load_entity_keys, load_keys_and_convert_to_map};
use crate::marshal::marshal_entity;
use crate::table::TableClient;

impl<D: StoreDriver> TableClient<D> {
    /// Write many entities with bounded concurrency
    ///
    /// Entities are split into chunks of [`ClientConfig::batch_size`](crate::ClientConfig)
    /// (at most 25) and at most [`ClientConfig::max_concurrency`](crate::ClientConfig)
    /// chunks are in flight at once. Unprocessed items of a chunk are retried at a constant
    /// interval until the retry budget is spent.
    ///
    /// The first fatal chunk error is returned and every chunk still in flight is
    /// cancelled. Chunks that already completed stay written.
    pub async fn add_batch_records<E: Entity>(&self, entities: Vec<E>) -> Result<(), Error> {
        if entities.is_empty() {
            return Err(Error::EmptyBatch);
        }

        let chunk_size = self.config.effective_batch_size();
        let mut chunks = Vec::with_capacity(entities.len().div_ceil(chunk_size));
        let mut entities = entities.into_iter().peekable();
        while entities.peek().is_some() {
            chunks.push(entities.by_ref().take(chunk_size).collect::<Vec<_>>());
        }

        stream::iter(chunks.into_iter().map(|chunk| self.process_entity_batch(chunk)))
            .buffer_unordered(self.config.effective_concurrency())
            .try_for_each(|()| future::ready(Ok(())))
            .await
            .inspect_err(|err| tracing::error!(error = %err, "entity batch processing failed"))
    }

    /// Delete every item matching the populated fields of `entity` and `filter`
    ///
    /// Matching keys are scanned in pages of at most one batch and each page is deleted
    /// with a batch write. Returns the number of items matched across all pages.
    pub async fn delete_batch_records<E: Entity>(
        &self,
        entity: &mut E,
        filter: Option<Condition>,
    ) -> Result<usize, Error> {
        let criteria = load_keys_and_convert_to_map(entity)?;
        let table = entity.table_name();

        let condition = match (condition_from_map(&criteria), filter) {
            (Some(criteria), Some(filter)) => criteria.and(filter),
            (criteria, filter) => criteria.or(filter).ok_or_else(|| {
                Error::InvalidExpression(format!("{table} has no delete criteria"))
            })?,
        };
        let expression = ExpressionBuilder::new()
            .with_filter(condition)
            .with_projection(Projection::names([
                PARTITION_KEY_ATTRIBUTE,
                SORT_KEY_ATTRIBUTE,
            ]))
            .build()?;

        let page_size = self.config.effective_batch_size() as i32;
        let mut matched = 0;
        let mut start_key = None;

        loop {
            let page = self
                .driver
                .scan(ScanRequest {
                    table: table.clone(),
                    expression: Some(expression.clone()),
                    limit: Some(page_size),
                    exclusive_start_key: start_key.take(),
                })
                .await?;

            matched += page.items.len();

            if !page.items.is_empty() {
                let requests = page
                    .items
                    .into_iter()
                    .map(|key| {
                        let delete = DeleteRequest::builder().set_key(Some(key)).build()?;
                        Ok(WriteRequest::builder().delete_request(delete).build())
                    })
                    .collect::<Result<Vec<_>, Error>>()?;

                self.write_with_retry(&table, requests).await?;
            }

            match page.last_evaluated_key {
                Some(key) => start_key = Some(key),
                None => break,
            }
        }

        Ok(matched)
    }

    async fn process_entity_batch<E: Entity>(&self, mut chunk: Vec<E>) -> Result<(), Error> {
        let Some(table) = chunk.first().map(Entity::table_name) else {
            return Ok(());
        };

        let mut requests = Vec::with_capacity(chunk.len());
        for entity in chunk.iter_mut() {
            let keys = load_entity_keys(entity)?;
            let item = marshal_entity(entity, &keys)?;
            let put = PutRequest::builder().set_item(Some(item)).build()?;
            requests.push(WriteRequest::builder().put_request(put).build());
        }

        self.write_with_retry(&table, requests).await
    }

    /// Issue a batch write, resubmitting only the unprocessed requests
    ///
    /// Throttling errors count as an attempt with nothing processed, any other error is
    /// returned immediately.
    async fn write_with_retry(
        &self,
        table: &str,
        requests: Vec<WriteRequest>,
    ) -> Result<(), Error> {
        let retry = &self.config.batch_retry;
        let max_attempts = retry.max_attempts.max(1);
        let mut pending = requests;
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.driver.batch_write_item(table, pending.clone()).await {
                Ok(unprocessed) if unprocessed.is_empty() => return Ok(()),
                Ok(unprocessed) => pending = unprocessed,
                Err(err) if err.is_retryable() => {
                    tracing::warn!(table, attempt, error = %err, "batch write throttled");
                }
                Err(err) => return Err(err),
            }

            if attempt >= max_attempts {
                tracing::error!(
                    table,
                    attempts = attempt,
                    unprocessed = pending.len(),
                    "batch write retries exhausted"
                );
                return Err(Error::BatchPartialFailure {
                    table: table.to_string(),
                    unprocessed: pending.len(),
                    attempts: attempt,
                });
            }

            sleep(retry.interval).await;
        }
    }
}
