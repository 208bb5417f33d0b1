use aws_sdk_dynamodb::types::AttributeValue;

use crate::driver::Item;
use crate::entity::{PARTITION_KEY_ATTRIBUTE, SORT_KEY_ATTRIBUTE};

/// Primary key of the last item handed out by a paged listing
///
/// Pass it back to resume the listing right after that item.
#[must_use = "cursor should be used for pagination to fetch the next page"]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Cursor {
    /// Composite partition key of the last item
    pub partition_key: String,
    /// Composite sort key of the last item, if the table has one
    pub sort_key: Option<String>,
}

impl Cursor {
    /// Cursor pointing at the given key
    pub fn new(partition_key: impl Into<String>, sort_key: Option<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key,
        }
    }

    /// Extract the cursor from a stored item, `None` without a string `PK`
    pub fn from_item(item: &Item) -> Option<Self> {
        let partition_key = match item.get(PARTITION_KEY_ATTRIBUTE) {
            Some(AttributeValue::S(pk)) => pk.clone(),
            _ => return None,
        };
        let sort_key = match item.get(SORT_KEY_ATTRIBUTE) {
            Some(AttributeValue::S(sk)) => Some(sk.clone()),
            _ => None,
        };
        Some(Self {
            partition_key,
            sort_key,
        })
    }

    /// The exclusive start key resuming after this cursor
    pub fn exclusive_start_key(&self) -> Item {
        let mut item = Item::with_capacity(2);
        let _ = item.insert(
            PARTITION_KEY_ATTRIBUTE.to_string(),
            AttributeValue::S(self.partition_key.clone()),
        );
        if let Some(sort_key) = &self.sort_key {
            let _ = item.insert(
                SORT_KEY_ATTRIBUTE.to_string(),
                AttributeValue::S(sort_key.clone()),
            );
        }
        item
    }
}

/// One page of a cursor paginated listing
#[must_use = "page results should be used or you'll lose the fetched data"]
#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    /// Exactly the requested page size, except on the final page
    pub items: Vec<T>,
    /// Resume point, `None` once the listing is exhausted
    pub next_cursor: Option<Cursor>,
}

impl<T> Page<T> {
    /// `true` when another page may follow
    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }
}
