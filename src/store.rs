//! Persistence collaborator
//!
//! A narrow create/list/update surface over a managed tabular store. Soft
//! failure discipline: errors are logged here and come back as `None` or an
//! empty list, never as an `Err` past this boundary.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

#[async_trait]
pub trait DataStore: Send + Sync {
    /// Insert a row, returning the stored row on success.
    async fn create(&self, table: &str, row: Value) -> Option<Value>;

    /// List rows matching all equality filters (empty filters = all rows).
    async fn list(&self, table: &str, filters: &[(String, String)]) -> Vec<Value>;

    /// Patch a row by id, returning the updated row on success.
    async fn update(&self, table: &str, id: &str, patch: Value) -> Option<Value>;
}

/// Supabase (PostgREST) backed store.
pub struct SupabaseStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SupabaseStore {
    pub fn new(url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        }
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Prefer", "return=representation")
    }

    fn first_row(mut rows: Vec<Value>) -> Option<Value> {
        if rows.is_empty() {
            None
        } else {
            Some(rows.remove(0))
        }
    }
}

#[async_trait]
impl DataStore for SupabaseStore {
    async fn create(&self, table: &str, row: Value) -> Option<Value> {
        let url = format!("{}/{}", self.base_url, table);
        let result = async {
            let response = self
                .request(reqwest::Method::POST, url)
                .json(&row)
                .send()
                .await?
                .error_for_status()?;
            response.json::<Vec<Value>>().await
        }
        .await;

        match result {
            Ok(rows) => Self::first_row(rows),
            Err(e) => {
                log::error!("Error creating row in {}: {}", table, e);
                None
            }
        }
    }

    async fn list(&self, table: &str, filters: &[(String, String)]) -> Vec<Value> {
        let mut url = format!("{}/{}?select=*", self.base_url, table);
        for (column, value) in filters {
            url.push_str(&format!("&{}=eq.{}", column, value));
        }

        let result = async {
            let response = self
                .request(reqwest::Method::GET, url)
                .send()
                .await?
                .error_for_status()?;
            response.json::<Vec<Value>>().await
        }
        .await;

        match result {
            Ok(rows) => rows,
            Err(e) => {
                log::error!("Error listing rows from {}: {}", table, e);
                Vec::new()
            }
        }
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Option<Value> {
        let url = format!("{}/{}?id=eq.{}", self.base_url, table, id);
        let result = async {
            let response = self
                .request(reqwest::Method::PATCH, url)
                .json(&patch)
                .send()
                .await?
                .error_for_status()?;
            response.json::<Vec<Value>>().await
        }
        .await;

        match result {
            Ok(rows) => Self::first_row(rows),
            Err(e) => {
                log::error!("Error updating row {} in {}: {}", id, table, e);
                None
            }
        }
    }
}

/// In-memory store used when no Supabase credentials are configured.
///
/// Keeps local development and the test suite independent of a live
/// backend; same soft-failure surface as the real store.
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    fn matches(row: &Value, filters: &[(String, String)]) -> bool {
        filters.iter().all(|(column, value)| {
            row.get(column)
                .map(|v| match v {
                    Value::String(s) => s == value,
                    other => other.to_string() == *value,
                })
                .unwrap_or(false)
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn create(&self, table: &str, row: Value) -> Option<Value> {
        if !row.is_object() {
            log::error!("Error creating row in {}: row must be an object", table);
            return None;
        }
        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default().push(row.clone());
        Some(row)
    }

    async fn list(&self, table: &str, filters: &[(String, String)]) -> Vec<Value> {
        let tables = self.tables.read().await;
        tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| Self::matches(row, filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Option<Value> {
        let mut tables = self.tables.write().await;
        let rows = tables.get_mut(table)?;
        let row = rows
            .iter_mut()
            .find(|row| row.get("id").and_then(Value::as_str) == Some(id))?;

        if let (Some(target), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
            for (key, value) in fields {
                target.insert(key.clone(), value.clone());
            }
        }
        Some(row.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_store_create_and_list() {
        let store = MemoryStore::new();
        store
            .create("competitors", json!({ "id": "c-1", "name": "Acme", "industry": "saas" }))
            .await
            .unwrap();
        store
            .create("competitors", json!({ "id": "c-2", "name": "Globex", "industry": "retail" }))
            .await
            .unwrap();

        let all = store.list("competitors", &[]).await;
        assert_eq!(all.len(), 2);

        let saas = store
            .list(
                "competitors",
                &[("industry".to_string(), "saas".to_string())],
            )
            .await;
        assert_eq!(saas.len(), 1);
        assert_eq!(saas[0]["name"], "Acme");
    }

    #[tokio::test]
    async fn test_memory_store_update() {
        let store = MemoryStore::new();
        store
            .create("competitors", json!({ "id": "c-1", "name": "Acme" }))
            .await
            .unwrap();

        let updated = store
            .update("competitors", "c-1", json!({ "name": "Acme Corp" }))
            .await
            .unwrap();
        assert_eq!(updated["name"], "Acme Corp");

        // Unknown id is a soft failure
        assert!(store.update("competitors", "c-9", json!({})).await.is_none());
    }

    #[tokio::test]
    async fn test_memory_store_unknown_table_is_empty() {
        let store = MemoryStore::new();
        assert!(store.list("reports", &[]).await.is_empty());
    }
}
