//! Timestamped JSON dumps of store partitions.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::store::{StoreDir, StoreError, StoreOptions};

/// Partitions covered by [`generate_all_store_data`].
pub const DEFAULT_STORES: &[&str] = &["profiles", "users", "organizations"];

#[derive(Debug, Clone, Serialize)]
pub struct StoreSnapshot {
    pub store: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub data: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotEntry {
    pub key: String,
    pub value: Value,
}

/// [`StoreSnapshot`] with the data map flattened to a key/value list.
#[derive(Debug, Clone, Serialize)]
pub struct EntrySnapshot {
    pub store: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllStores {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub stores: Vec<StoreSnapshot>,
}

impl StoreSnapshot {
    #[must_use]
    pub fn into_entries(self) -> EntrySnapshot {
        EntrySnapshot {
            store: self.store,
            timestamp: self.timestamp,
            entries: self
                .data
                .into_iter()
                .map(|(key, value)| SnapshotEntry { key, value })
                .collect(),
        }
    }
}

/// Dump one partition. Values that are not JSON are kept as strings.
///
/// # Errors
///
/// Returns the store error if the partition cannot be opened.
pub async fn generate_store_data(dir: &StoreDir, name: &str) -> Result<StoreSnapshot, StoreError> {
    let store = dir
        .open(name, StoreOptions::auto_save())
        .await
        .inspect_err(|e| tracing::error!(error = %e, store = name, "Error generating store data"))?;

    let data = store
        .entries()
        .into_iter()
        .map(|(key, raw)| {
            let value = serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, store = name, key = %key, "Value is not JSON, keeping raw string");
                Value::String(raw)
            });
            (key, value)
        })
        .collect();

    Ok(StoreSnapshot {
        store: name.to_string(),
        timestamp: OffsetDateTime::now_utc(),
        data,
    })
}

/// Dump every partition in [`DEFAULT_STORES`].
///
/// # Errors
///
/// Returns the first store error hit.
pub async fn generate_all_store_data(dir: &StoreDir) -> Result<AllStores, StoreError> {
    let mut stores = Vec::with_capacity(DEFAULT_STORES.len());
    for name in DEFAULT_STORES {
        stores.push(generate_store_data(dir, name).await?);
    }
    Ok(AllStores {
        timestamp: OffsetDateTime::now_utc(),
        stores,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn parses_json_values_and_keeps_raw_strings() {
        let dir = tempfile::tempdir().unwrap();
        let stores = StoreDir::new(dir.path());
        let users = stores.open("users", StoreOptions::auto_save()).await.unwrap();
        users
            .set_json("a@example.com", &json!({"username": "a"}))
            .await
            .unwrap();
        users.set("legacy", "plain text").await.unwrap();

        let snapshot = generate_store_data(&stores, "users").await.unwrap();
        assert_eq!(snapshot.store, "users");
        assert_eq!(snapshot.data["a@example.com"], json!({"username": "a"}));
        assert_eq!(snapshot.data["legacy"], json!("plain text"));
    }

    #[tokio::test]
    async fn entries_preserve_order() {
        let dir = tempfile::tempdir().unwrap();
        let stores = StoreDir::new(dir.path());
        let orgs = stores
            .open("organizations", StoreOptions::auto_save())
            .await
            .unwrap();
        orgs.set("b", "1").await.unwrap();
        orgs.set("a", "2").await.unwrap();

        let entries = generate_store_data(&stores, "organizations")
            .await
            .unwrap()
            .into_entries();
        assert_eq!(
            entries.entries,
            [
                SnapshotEntry {
                    key: "b".into(),
                    value: json!(1)
                },
                SnapshotEntry {
                    key: "a".into(),
                    value: json!(2)
                },
            ]
        );
    }

    #[tokio::test]
    async fn all_stores_cover_defaults_even_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let all = generate_all_store_data(&StoreDir::new(dir.path()))
            .await
            .unwrap();
        let names: Vec<&str> = all.stores.iter().map(|s| s.store.as_str()).collect();
        assert_eq!(names, DEFAULT_STORES);
        assert!(all.stores.iter().all(|s| s.data.is_empty()));
    }

    #[tokio::test]
    async fn timestamp_serializes_as_rfc3339() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = generate_store_data(&StoreDir::new(dir.path()), "profiles")
            .await
            .unwrap();
        let json = serde_json::to_value(&snapshot).unwrap();
        let ts = json["timestamp"].as_str().unwrap();
        assert!(OffsetDateTime::parse(ts, &time::format_description::well_known::Rfc3339).is_ok());
    }
}
