//! Test entities shared across integration tests
//!
//! Field tags mirror the serde renames: `dynamodbav` is the stored attribute name,
//! `partitionKey`/`sortKey` declare the composite key fragments.

use super::{Deserialize, Serialize};
use dynamo_entity::config::table_name_from_env;
use dynamo_entity::entity::{PARTITION_KEY_TAG, SORT_KEY_TAG, STORAGE_TAG};
use dynamo_entity::{Entity, FieldSpec, Value};

fn non_empty(value: &str) -> Option<Value> {
    (!value.is_empty()).then(|| Value::from(value))
}

fn set_string(target: &mut String, value: Value) -> bool {
    match value {
        Value::S(value) => {
            *target = value;
            true
        }
        _ => false,
    }
}

/// Address range bookmark keyed by user and both range bounds
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Default)]
pub struct UserBookmarkEntry {
    #[serde(rename = "PK", default, skip_serializing_if = "String::is_empty")]
    pub pk: String,
    #[serde(rename = "SK", default, skip_serializing_if = "String::is_empty")]
    pub sk: String,
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "bookmarkEntry", default, skip_serializing_if = "Option::is_none")]
    pub bookmark_entry: Option<String>,
    #[serde(rename = "firstAddr", default, skip_serializing_if = "Option::is_none")]
    pub first_addr: Option<u32>,
    #[serde(rename = "lastAddr", default, skip_serializing_if = "Option::is_none")]
    pub last_addr: Option<u32>,
}

impl UserBookmarkEntry {
    pub fn new(user_id: &str, entry: &str, first_addr: u32, last_addr: u32) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            bookmark_entry: Some(entry.to_string()),
            first_addr: Some(first_addr),
            last_addr: Some(last_addr),
            ..Default::default()
        }
    }
}

impl Entity for UserBookmarkEntry {
    // sort key fields are declared LAD first to exercise tag ordering
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("pk", &[(STORAGE_TAG, "PK")]),
        FieldSpec::new("sk", &[(STORAGE_TAG, "SK")]),
        FieldSpec::new(
            "user_id",
            &[(STORAGE_TAG, "userId,omitempty"), (PARTITION_KEY_TAG, "UID")],
        ),
        FieldSpec::new("bookmark_entry", &[(STORAGE_TAG, "bookmarkEntry,omitempty")]),
        FieldSpec::new(
            "last_addr",
            &[(STORAGE_TAG, "lastAddr,omitempty"), (SORT_KEY_TAG, "LAD")],
        ),
        FieldSpec::new(
            "first_addr",
            &[(STORAGE_TAG, "firstAddr,omitempty"), (SORT_KEY_TAG, "FAD")],
        ),
    ];

    fn table_name(&self) -> String {
        "IPFiltering_Bookmarks".to_string()
    }

    fn get_field(&self, name: &str) -> Option<Value> {
        match name {
            "pk" => non_empty(&self.pk),
            "sk" => non_empty(&self.sk),
            "user_id" => self.user_id.clone().map(Value::from),
            "bookmark_entry" => self.bookmark_entry.clone().map(Value::from),
            "first_addr" => self.first_addr.map(Value::from),
            "last_addr" => self.last_addr.map(Value::from),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) -> bool {
        match name {
            "pk" => set_string(&mut self.pk, value),
            "sk" => set_string(&mut self.sk, value),
            _ => false,
        }
    }
}

/// Per-user bookmark sync state, partition key only
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Default)]
pub struct UserBookmarks {
    #[serde(rename = "PK", default, skip_serializing_if = "String::is_empty")]
    pub pk: String,
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "operationId", default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<i64>,
    #[serde(rename = "status", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "startTs", default, skip_serializing_if = "Option::is_none")]
    pub start_ts: Option<String>,
    #[serde(rename = "endTs", default, skip_serializing_if = "Option::is_none")]
    pub end_ts: Option<String>,
    #[serde(rename = "syncEnabled", default)]
    pub sync_enabled: Option<bool>,
    #[serde(rename = "latestVersion", default, skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
    #[serde(rename = "modifiedBookmarks", default)]
    pub modified_bookmarks: Option<bool>,
}

impl Entity for UserBookmarks {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("pk", &[(STORAGE_TAG, "PK")]),
        FieldSpec::new(
            "user_id",
            &[(STORAGE_TAG, "userId,omitempty"), (PARTITION_KEY_TAG, "UID")],
        ),
        FieldSpec::new("operation_id", &[(STORAGE_TAG, "operationId,omitempty")]),
        FieldSpec::new("status", &[(STORAGE_TAG, "status,omitempty")]),
        FieldSpec::new("start_ts", &[(STORAGE_TAG, "startTs,omitempty")]),
        FieldSpec::new("end_ts", &[(STORAGE_TAG, "endTs,omitempty")]),
        FieldSpec::new("sync_enabled", &[(STORAGE_TAG, "syncEnabled")]),
        FieldSpec::new("latest_version", &[(STORAGE_TAG, "latestVersion,omitempty")]),
        FieldSpec::new("modified_bookmarks", &[(STORAGE_TAG, "modifiedBookmarks")]),
    ];

    fn table_name(&self) -> String {
        table_name_from_env("USER_BOOKMARK_TABLE_NAME", "user_bookmarks")
    }

    fn get_field(&self, name: &str) -> Option<Value> {
        match name {
            "pk" => non_empty(&self.pk),
            "user_id" => self.user_id.clone().map(Value::from),
            "operation_id" => self.operation_id.map(Value::from),
            "status" => self.status.clone().map(Value::from),
            "start_ts" => self.start_ts.clone().map(Value::from),
            "end_ts" => self.end_ts.clone().map(Value::from),
            "sync_enabled" => self.sync_enabled.map(Value::from),
            "latest_version" => self.latest_version.clone().map(Value::from),
            "modified_bookmarks" => self.modified_bookmarks.map(Value::from),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) -> bool {
        match name {
            "pk" => set_string(&mut self.pk, value),
            _ => false,
        }
    }
}

/// Bookmark distribution to one device of a user
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Default)]
pub struct BookmarkDistribution {
    #[serde(rename = "PK", default, skip_serializing_if = "String::is_empty")]
    pub pk: String,
    #[serde(rename = "SK", default, skip_serializing_if = "String::is_empty")]
    pub sk: String,
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "deviceId", default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(rename = "status", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "statusMessage", default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(rename = "startTs", default, skip_serializing_if = "Option::is_none")]
    pub start_ts: Option<String>,
    #[serde(rename = "endTs", default)]
    pub end_ts: Option<String>,
}

impl Entity for BookmarkDistribution {
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new("pk", &[(STORAGE_TAG, "PK")]),
        FieldSpec::new("sk", &[(STORAGE_TAG, "SK")]),
        FieldSpec::new(
            "user_id",
            &[(STORAGE_TAG, "userId,omitempty"), (PARTITION_KEY_TAG, "UID")],
        ),
        FieldSpec::new(
            "device_id",
            &[(STORAGE_TAG, "deviceId,omitempty"), (SORT_KEY_TAG, "DID")],
        ),
        FieldSpec::new("status", &[(STORAGE_TAG, "status,omitempty")]),
        FieldSpec::new("status_message", &[(STORAGE_TAG, "statusMessage,omitempty")]),
        FieldSpec::new("start_ts", &[(STORAGE_TAG, "startTs,omitempty")]),
        FieldSpec::new("end_ts", &[(STORAGE_TAG, "endTs")]),
    ];

    fn table_name(&self) -> String {
        table_name_from_env("BOOKMARK_DISTRIBUTION_TABLE_NAME", "bookmark_distribution")
    }

    fn get_field(&self, name: &str) -> Option<Value> {
        match name {
            "pk" => non_empty(&self.pk),
            "sk" => non_empty(&self.sk),
            "user_id" => self.user_id.clone().map(Value::from),
            "device_id" => self.device_id.clone().map(Value::from),
            "status" => self.status.clone().map(Value::from),
            "status_message" => self.status_message.clone().map(Value::from),
            "start_ts" => self.start_ts.clone().map(Value::from),
            "end_ts" => self.end_ts.clone().map(Value::from),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) -> bool {
        match name {
            "pk" => set_string(&mut self.pk, value),
            "sk" => set_string(&mut self.sk, value),
            _ => false,
        }
    }
}
