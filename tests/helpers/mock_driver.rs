//! In-memory [`StoreDriver`] for tests that must not reach DynamoDB.
//!
//! Items live in per-table ordered maps keyed by `(PK, SK)`. Key conditions are honoured
//! for `PK`/`SK` equality. Filters and update/delete conditions are evaluated for `=` and
//! `>=` predicates after the native page limit, the way DynamoDB applies them, then
//! projections are applied.
//! Failures and unprocessed batch items are scripted per call.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, TableDescription, TableStatus, WriteRequest};
use dynamo_entity::driver::{
    CreateTableRequest, DeleteItemRequest, ItemPage, QueryRequest, ScanRequest,
    UpdateItemRequest,
};
use dynamo_entity::expression::Expression;
use dynamo_entity::{Error, Item, StoreDriver, StoreErrorKind};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type TableItems = BTreeMap<(String, String), Item>;

/// Scripted result of one `batch_write_item` call
#[derive(Clone, Copy, Debug)]
#[allow(dead_code)]
pub enum BatchOutcome {
    /// Leave the last `n` requests unprocessed
    Unprocessed(usize),
    /// Fail the call
    Fail(StoreErrorKind),
}

/// Everything the driver saw, plus the stored items
#[derive(Debug, Default)]
pub struct MockState {
    pub tables: BTreeMap<String, TableItems>,
    pub created_tables: Vec<CreateTableRequest>,
    pub puts: Vec<(String, Item)>,
    pub gets: Vec<(String, Item)>,
    pub updates: Vec<UpdateItemRequest>,
    pub deletes: Vec<DeleteItemRequest>,
    pub queries: Vec<QueryRequest>,
    pub scans: Vec<ScanRequest>,
    pub batch_sizes: Vec<usize>,
    pub describe_calls: usize,
    batch_script: VecDeque<BatchOutcome>,
    failures: HashMap<&'static str, StoreErrorKind>,
}

#[derive(Debug, Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
    native_page_size: Option<usize>,
    batch_delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    completed_batches: AtomicUsize,
}

#[allow(dead_code)]
impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap every query/scan page at `size` items regardless of the requested limit
    pub fn with_native_page_size(mut self, size: usize) -> Self {
        self.native_page_size = Some(size);
        self
    }

    /// Make every batch write take `delay` before it is applied
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = Some(delay);
        self
    }

    /// Register an existing, empty table
    pub fn with_table(self, table: &str) -> Self {
        let _ = self.state().tables.entry(table.to_string()).or_default();
        self
    }

    /// Store `item` directly, bypassing the recorded calls
    pub fn seed(&self, table: &str, item: Item) {
        let _ = self
            .state()
            .tables
            .entry(table.to_string())
            .or_default()
            .insert(item_key(&item), item);
    }

    /// Queue outcomes for the next batch writes, in call order
    pub fn script_batches(&self, outcomes: impl IntoIterator<Item = BatchOutcome>) {
        self.state().batch_script.extend(outcomes);
    }

    /// Fail the next call of `operation` (e.g. `"DeleteItem"`) with `kind`
    pub fn fail_next(&self, operation: &'static str, kind: StoreErrorKind) {
        let _ = self.state().failures.insert(operation, kind);
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn items(&self, table: &str) -> Vec<Item> {
        self.state()
            .tables
            .get(table)
            .map(|items| items.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn completed_batches(&self) -> usize {
        self.completed_batches.load(Ordering::SeqCst)
    }

    fn take_failure(&self, operation: &'static str) -> Result<(), Error> {
        match self.state().failures.remove(operation) {
            Some(kind) => Err(Error::store(operation, kind, "scripted failure")),
            None => Ok(()),
        }
    }

    /// One native page: `limit` items are evaluated, then filtered, then projected
    fn page(
        &self,
        candidates: Vec<Item>,
        limit: Option<i32>,
        exclusive_start_key: Option<Item>,
        forward: bool,
        expression: Option<&Expression>,
    ) -> ItemPage {
        // resume strictly after the start key, which may have been deleted meanwhile
        let start = match exclusive_start_key {
            Some(start) => {
                let start = item_key(&start);
                candidates
                    .iter()
                    .position(|item| {
                        if forward {
                            item_key(item) > start
                        } else {
                            item_key(item) < start
                        }
                    })
                    .unwrap_or(candidates.len())
            }
            None => 0,
        };

        let size = [limit.map(|limit| limit as usize), self.native_page_size]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(usize::MAX);

        let remaining = &candidates[start..];
        let evaluated: Vec<Item> = remaining.iter().take(size).cloned().collect();
        let last_evaluated_key = if remaining.len() > evaluated.len() {
            evaluated.last().map(key_only)
        } else {
            None
        };

        let filter = expression.and_then(|expression| {
            expression
                .filter
                .as_deref()
                .map(|filter| (filter, expression))
        });
        let items = evaluated
            .into_iter()
            .filter(|item| {
                filter.is_none_or(|(filter, expression)| matches(item, filter, expression))
            })
            .map(|item| match expression.and_then(projection_names) {
                Some(names) => item
                    .into_iter()
                    .filter(|(name, _)| names.contains(name))
                    .collect(),
                None => item,
            })
            .collect();

        ItemPage {
            items,
            last_evaluated_key,
        }
    }

    /// Fail with a conditional check failure unless the stored item satisfies `expression`
    fn check_condition(
        &self,
        operation: &'static str,
        table: &str,
        key: &Item,
        expression: &Expression,
    ) -> Result<(), Error> {
        let Some(condition) = expression.condition.as_deref() else {
            return Ok(());
        };
        let state = self.state();
        let stored = state
            .tables
            .get(table)
            .and_then(|items| items.get(&item_key(key)));
        match stored {
            Some(item) if matches(item, condition, expression) => Ok(()),
            _ => Err(Error::store(
                operation,
                StoreErrorKind::ConditionalCheckFailed,
                "The conditional request failed",
            )),
        }
    }
}

#[async_trait]
impl StoreDriver for MockDriver {
    async fn get_item(
        &self,
        table: &str,
        key: Item,
        _consistent_read: bool,
    ) -> Result<Option<Item>, Error> {
        self.take_failure("GetItem")?;
        let mut state = self.state();
        state.gets.push((table.to_string(), key.clone()));
        Ok(state
            .tables
            .get(table)
            .and_then(|items| items.get(&item_key(&key)))
            .cloned())
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<(), Error> {
        self.take_failure("PutItem")?;
        let mut state = self.state();
        state.puts.push((table.to_string(), item.clone()));
        let _ = state
            .tables
            .entry(table.to_string())
            .or_default()
            .insert(item_key(&item), item);
        Ok(())
    }

    async fn update_item(&self, request: UpdateItemRequest) -> Result<(), Error> {
        self.take_failure("UpdateItem")?;
        self.check_condition("UpdateItem", &request.table, &request.key, &request.expression)?;
        self.state().updates.push(request);
        Ok(())
    }

    async fn delete_item(&self, request: DeleteItemRequest) -> Result<(), Error> {
        self.take_failure("DeleteItem")?;
        if let Some(expression) = &request.expression {
            self.check_condition("DeleteItem", &request.table, &request.key, expression)?;
        }
        let mut state = self.state();
        if let Some(items) = state.tables.get_mut(&request.table) {
            let _ = items.remove(&item_key(&request.key));
        }
        state.deletes.push(request);
        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> Result<ItemPage, Error> {
        self.take_failure("Query")?;
        let expression = &request.expression;
        let key_condition = expression.key_condition.clone().unwrap_or_default();
        let pk = bound_value(&key_condition, expression, "PK");
        let sk = bound_value(&key_condition, expression, "SK");

        let mut candidates: Vec<Item> = {
            let mut state = self.state();
            state.queries.push(request.clone());
            state
                .tables
                .get(&request.table)
                .map(|items| {
                    items
                        .values()
                        .filter(|item| pk.is_none() || item.get("PK") == pk.as_ref())
                        .filter(|item| sk.is_none() || item.get("SK") == sk.as_ref())
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        };
        if !request.scan_forward {
            candidates.reverse();
        }

        Ok(self.page(
            candidates,
            request.limit,
            request.exclusive_start_key.clone(),
            request.scan_forward,
            Some(expression),
        ))
    }

    async fn scan(&self, request: ScanRequest) -> Result<ItemPage, Error> {
        self.take_failure("Scan")?;
        let candidates = {
            let mut state = self.state();
            state.scans.push(request.clone());
            state
                .tables
                .get(&request.table)
                .map(|items| items.values().cloned().collect())
                .unwrap_or_default()
        };

        Ok(self.page(
            candidates,
            request.limit,
            request.exclusive_start_key.clone(),
            true,
            request.expression.as_ref(),
        ))
    }

    async fn batch_write_item(
        &self,
        table: &str,
        requests: Vec<WriteRequest>,
    ) -> Result<Vec<WriteRequest>, Error> {
        let outcome = {
            let mut state = self.state();
            state.batch_sizes.push(requests.len());
            state.batch_script.pop_front()
        };

        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        if let Some(BatchOutcome::Fail(kind)) = outcome {
            let _ = self.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(Error::store("BatchWriteItem", kind, "scripted failure"));
        }

        match self.batch_delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }

        let unprocessed_count = match outcome {
            Some(BatchOutcome::Unprocessed(count)) => count.min(requests.len()),
            _ => 0,
        };
        let mut requests = requests;
        let unprocessed = requests.split_off(requests.len() - unprocessed_count);

        {
            let mut state = self.state();
            let items = state.tables.entry(table.to_string()).or_default();
            for request in requests {
                if let Some(put) = request.put_request() {
                    let _ = items.insert(item_key(put.item()), put.item().clone());
                }
                if let Some(delete) = request.delete_request() {
                    let _ = items.remove(&item_key(delete.key()));
                }
            }
        }

        let _ = self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let _ = self.completed_batches.fetch_add(1, Ordering::SeqCst);
        Ok(unprocessed)
    }

    async fn describe_table(&self, table: &str) -> Result<Option<TableDescription>, Error> {
        self.take_failure("DescribeTable")?;
        let mut state = self.state();
        state.describe_calls += 1;
        Ok(state.tables.contains_key(table).then(|| {
            TableDescription::builder()
                .table_name(table)
                .table_status(TableStatus::Active)
                .build()
        }))
    }

    async fn create_table(&self, request: CreateTableRequest) -> Result<TableDescription, Error> {
        self.take_failure("CreateTable")?;
        let mut state = self.state();
        if state.tables.contains_key(&request.table) {
            return Err(Error::store(
                "CreateTable",
                StoreErrorKind::ResourceInUse,
                "table already exists",
            ));
        }
        let _ = state.tables.entry(request.table.clone()).or_default();
        let description = TableDescription::builder()
            .table_name(&request.table)
            .table_status(TableStatus::Creating)
            .build();
        state.created_tables.push(request);
        Ok(description)
    }

    async fn delete_table(&self, table: &str) -> Result<(), Error> {
        self.take_failure("DeleteTable")?;
        match self.state().tables.remove(table) {
            Some(_) => Ok(()),
            None => Err(Error::store(
                "DeleteTable",
                StoreErrorKind::ResourceNotFound,
                "table not found",
            )),
        }
    }

    async fn list_tables(&self) -> Result<Vec<String>, Error> {
        self.take_failure("ListTables")?;
        Ok(self.state().tables.keys().cloned().collect())
    }
}

fn string_attribute(item: &Item, name: &str) -> String {
    match item.get(name) {
        Some(AttributeValue::S(value)) => value.clone(),
        _ => String::new(),
    }
}

fn item_key(item: &Item) -> (String, String) {
    (string_attribute(item, "PK"), string_attribute(item, "SK"))
}

fn key_only(item: &Item) -> Item {
    item.iter()
        .filter(|(name, _)| name.as_str() == "PK" || name.as_str() == "SK")
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Value bound to `attribute` by an equality in `rendered`
fn bound_value(rendered: &str, expression: &Expression, attribute: &str) -> Option<AttributeValue> {
    let (placeholder, _) = expression
        .names
        .iter()
        .find(|(_, name)| name.as_str() == attribute)?;
    let pattern = format!("{placeholder} = ");
    let start = rendered.find(&pattern)? + pattern.len();
    let value: String = rendered[start..]
        .chars()
        .take_while(|c| *c == ':' || c.is_ascii_digit())
        .collect();
    expression.values.get(&value).cloned()
}

/// Evaluate a rendered conjunction of `=`/`>=` predicates against `item`
fn matches(item: &Item, rendered: &str, expression: &Expression) -> bool {
    rendered.split(" AND ").all(|predicate| {
        let predicate = predicate.trim_start_matches('(').trim_end_matches(')');
        let (name, value, at_least) = match predicate.split_once(" >= ") {
            Some((name, value)) => (name, value, true),
            None => match predicate.split_once(" = ") {
                Some((name, value)) => (name, value, false),
                None => return false,
            },
        };
        let (Some(name), Some(expected)) = (expression.names.get(name), expression.values.get(value))
        else {
            return false;
        };
        match item.get(name) {
            Some(actual) if at_least => at_least_value(actual, expected),
            Some(actual) => actual == expected,
            None => false,
        }
    })
}

fn at_least_value(actual: &AttributeValue, expected: &AttributeValue) -> bool {
    match (actual, expected) {
        (AttributeValue::N(actual), AttributeValue::N(expected)) => {
            match (actual.parse::<f64>(), expected.parse::<f64>()) {
                (Ok(actual), Ok(expected)) => actual >= expected,
                _ => false,
            }
        }
        (AttributeValue::S(actual), AttributeValue::S(expected)) => actual >= expected,
        _ => false,
    }
}

fn projection_names(expression: &Expression) -> Option<Vec<String>> {
    let projection = expression.projection.as_ref()?;
    Some(
        projection
            .split(", ")
            .filter_map(|placeholder| expression.names.get(placeholder).cloned())
            .collect(),
    )
}
