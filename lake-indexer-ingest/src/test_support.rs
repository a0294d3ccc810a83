//! In-memory collaborators for tests.
//!
//! [`MemoryIndex`] evaluates the handful of query shapes the pipeline issues
//! (max aggregation, range on a date field, match-all count). The other
//! mocks script the query engine, hold result objects and return constant
//! embeddings.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use lake_indexer_repository::{
    BulkItemFailure, BulkOperationSummary, IndexStats, SearchIndexClient, SearchIndexConfig,
    SearchIndexError, SearchIndexProvider,
};
use lake_indexer_shared::EMBEDDING_DIMENSION;

use crate::consumer::{JobState, JobStatus, ObjectStore, QueryEngine, QueryRequest};
use crate::errors::IngestError;
use crate::processor::EmbeddingModel;

#[derive(Default)]
struct StoredIndex {
    documents: Vec<(String, Value)>,
}

#[derive(Default)]
struct IndexState {
    indices: HashMap<String, StoredIndex>,
    created: Vec<String>,
    deleted: Vec<String>,
    bulk_calls: Vec<usize>,
    bulk_deletes: Vec<usize>,
    fail_writes: bool,
    reject_deletes: bool,
    failing_searches: usize,
    next_id: u64,
}

/// Search backend held in memory.
#[derive(Clone, Default)]
pub struct MemoryIndex {
    state: Arc<Mutex<IndexState>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client over this backend without a batch size limit.
    pub fn client(&self) -> SearchIndexClient {
        SearchIndexClient::with_config(Box::new(self.clone()), SearchIndexConfig::unlimited())
    }

    /// Create `index` (if needed) holding `documents`.
    pub async fn seed(&self, index: &str, documents: Vec<Value>) {
        let mut state = self.state.lock().await;
        let mut ids = Vec::new();
        for _ in &documents {
            state.next_id += 1;
            ids.push(format!("doc-{}", state.next_id));
        }
        let stored = state.indices.entry(index.to_string()).or_default();
        stored.documents.extend(ids.into_iter().zip(documents));
    }

    pub async fn documents(&self, index: &str) -> Vec<Value> {
        let state = self.state.lock().await;
        state
            .indices
            .get(index)
            .map(|i| i.documents.iter().map(|(_, d)| d.clone()).collect())
            .unwrap_or_default()
    }

    pub async fn exists(&self, index: &str) -> bool {
        self.state.lock().await.indices.contains_key(index)
    }

    /// Indices created through `create_index`, in order.
    pub async fn created(&self) -> Vec<String> {
        self.state.lock().await.created.clone()
    }

    pub async fn deleted(&self) -> Vec<String> {
        self.state.lock().await.deleted.clone()
    }

    /// Sizes of the bulk create requests received.
    pub async fn bulk_calls(&self) -> Vec<usize> {
        self.state.lock().await.bulk_calls.clone()
    }

    /// Sizes of the bulk delete requests received.
    pub async fn bulk_deletes(&self) -> Vec<usize> {
        self.state.lock().await.bulk_deletes.clone()
    }

    pub async fn fail_writes(&self, fail: bool) {
        self.state.lock().await.fail_writes = fail;
    }

    /// Answer every bulk delete with per-item rejections.
    pub async fn reject_deletes(&self, reject: bool) {
        self.state.lock().await.reject_deletes = reject;
    }

    /// Make the next `count` searches fail.
    pub async fn fail_searches(&self, count: usize) {
        self.state.lock().await.failing_searches = count;
    }
}

/// Resolve `now`, `now-Nd` and `now-Nd/d` style expressions or an RFC 3339 date.
fn resolve_bound(expr: &str) -> DateTime<Utc> {
    match expr.strip_prefix("now") {
        Some(rest) => {
            let (offset, round) = match rest.split_once('/') {
                Some((offset, _)) => (offset, true),
                None => (rest, false),
            };
            let days: i64 = offset
                .strip_prefix('-')
                .and_then(|d| d.strip_suffix('d'))
                .and_then(|d| d.parse().ok())
                .unwrap_or(0);
            let instant = Utc::now() - Duration::days(days);
            if round {
                instant
                    .date_naive()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
                    .and_utc()
            } else {
                instant
            }
        }
        None => DateTime::parse_from_rfc3339(expr)
            .unwrap()
            .with_timezone(&Utc),
    }
}

/// Whether `document` matches a `{"range": {field: {lt|gte: expr}}}` query.
fn matches_query(document: &Value, query: Option<&Value>) -> bool {
    let Some(range) = query.and_then(|q| q.get("range")).and_then(Value::as_object) else {
        return true;
    };
    range.iter().all(|(field, bound)| {
        let Some(value) = document[field.as_str()].as_str() else {
            return false;
        };
        let Ok(value) = DateTime::parse_from_rfc3339(value) else {
            return false;
        };
        let value = value.with_timezone(&Utc);
        if let Some(lt) = bound["lt"].as_str() {
            return value < resolve_bound(lt);
        }
        if let Some(gte) = bound["gte"].as_str() {
            return value >= resolve_bound(gte);
        }
        true
    })
}

#[async_trait]
impl SearchIndexProvider for MemoryIndex {
    async fn index_exists(&self, index: &str) -> Result<bool, SearchIndexError> {
        Ok(self.exists(index).await)
    }

    async fn create_index(&self, index: &str, _settings: &Value) -> Result<(), SearchIndexError> {
        let mut state = self.state.lock().await;
        if state.indices.contains_key(index) {
            return Err(SearchIndexError::index("resource_already_exists_exception"));
        }
        state.indices.insert(index.to_string(), StoredIndex::default());
        state.created.push(index.to_string());
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), SearchIndexError> {
        let mut state = self.state.lock().await;
        state.indices.remove(index);
        state.deleted.push(index.to_string());
        Ok(())
    }

    async fn create_document(&self, index: &str, document: &Value) -> Result<(), SearchIndexError> {
        let mut state = self.state.lock().await;
        if state.fail_writes {
            return Err(SearchIndexError::document("write rejected"));
        }
        state.next_id += 1;
        let id = format!("doc-{}", state.next_id);
        let stored = state.indices.entry(index.to_string()).or_default();
        stored.documents.push((id, document.clone()));
        Ok(())
    }

    async fn bulk_create(
        &self,
        index: &str,
        documents: &[Value],
    ) -> Result<BulkOperationSummary, SearchIndexError> {
        let mut state = self.state.lock().await;
        state.bulk_calls.push(documents.len());
        if state.fail_writes {
            return Err(SearchIndexError::bulk_operation("bulk rejected"));
        }
        for document in documents {
            state.next_id += 1;
            let id = format!("doc-{}", state.next_id);
            let stored = state.indices.entry(index.to_string()).or_default();
            stored.documents.push((id, document.clone()));
        }
        Ok(BulkOperationSummary {
            took_ms: 1,
            total: documents.len(),
            succeeded: documents.len(),
            ..Default::default()
        })
    }

    async fn bulk_delete(
        &self,
        index: &str,
        ids: &[String],
    ) -> Result<BulkOperationSummary, SearchIndexError> {
        let mut state = self.state.lock().await;
        state.bulk_deletes.push(ids.len());
        if state.reject_deletes {
            return Ok(BulkOperationSummary {
                took_ms: 1,
                total: ids.len(),
                failed: ids.len(),
                errors: true,
                failures: (0..ids.len())
                    .map(|position| BulkItemFailure {
                        position,
                        status: 409,
                        reason: Some("version conflict".to_string()),
                    })
                    .collect(),
                ..Default::default()
            });
        }
        if let Some(stored) = state.indices.get_mut(index) {
            stored.documents.retain(|(id, _)| !ids.contains(id));
        }
        Ok(BulkOperationSummary {
            took_ms: 1,
            total: ids.len(),
            succeeded: ids.len(),
            ..Default::default()
        })
    }

    async fn search(&self, index: &str, body: &Value) -> Result<Value, SearchIndexError> {
        let mut state = self.state.lock().await;
        if state.failing_searches > 0 {
            state.failing_searches -= 1;
            return Err(SearchIndexError::query("search timed out"));
        }
        let stored = state
            .indices
            .get(index)
            .ok_or_else(|| SearchIndexError::query(format!("no such index [{}]", index)))?;

        if let Some(field) = body["aggs"]["max_time"]["max"]["field"].as_str() {
            let max = stored
                .documents
                .iter()
                .filter_map(|(_, d)| d[field].as_f64())
                .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));
            return Ok(json!({ "aggregations": { "max_time": { "value": max } } }));
        }

        let matched: Vec<&String> = stored
            .documents
            .iter()
            .filter(|(_, d)| matches_query(d, body.get("query")))
            .map(|(id, _)| id)
            .collect();
        let size = body["size"].as_u64().unwrap_or(10) as usize;
        let hits: Vec<Value> = matched.iter().take(size).map(|id| json!({ "_id": id })).collect();
        Ok(json!({
            "hits": {
                "total": { "value": matched.len(), "relation": "eq" },
                "hits": hits
            }
        }))
    }

    async fn count(&self, index: &str, query: Option<&Value>) -> Result<u64, SearchIndexError> {
        let state = self.state.lock().await;
        let stored = state
            .indices
            .get(index)
            .ok_or_else(|| SearchIndexError::query(format!("no such index [{}]", index)))?;
        let query = query.and_then(|q| q.get("query"));
        Ok(stored
            .documents
            .iter()
            .filter(|(_, d)| matches_query(d, query))
            .count() as u64)
    }

    async fn list_indices(&self, pattern: Option<&str>) -> Result<Vec<IndexStats>, SearchIndexError> {
        let state = self.state.lock().await;
        let mut names: Vec<&String> = state
            .indices
            .keys()
            .filter(|name| match pattern {
                Some(p) => match p.strip_suffix('*') {
                    Some(prefix) => name.starts_with(prefix),
                    None => name.as_str() == p,
                },
                None => true,
            })
            .collect();
        names.sort();
        Ok(names
            .into_iter()
            .map(|name| IndexStats {
                name: name.clone(),
                docs_count: Some(state.indices[name].documents.len().to_string()),
                store_size: Some("1kb".to_string()),
            })
            .collect())
    }
}

/// Query engine that replays a fixed state sequence for every job.
pub struct ScriptedEngine {
    states: Vec<JobState>,
    polls: Mutex<usize>,
    pub requests: Mutex<Vec<QueryRequest>>,
}

impl ScriptedEngine {
    /// The last state repeats once the script runs out.
    pub fn new(states: Vec<JobState>) -> Self {
        Self {
            states,
            polls: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(vec![JobState::Running, JobState::Succeeded])
    }
}

#[async_trait]
impl QueryEngine for ScriptedEngine {
    async fn submit(&self, request: &QueryRequest) -> Result<String, IngestError> {
        let mut requests = self.requests.lock().await;
        requests.push(request.clone());
        *self.polls.lock().await = 0;
        Ok(format!("job-{}", requests.len()))
    }

    async fn status(&self, job_id: &str) -> Result<JobStatus, IngestError> {
        let mut polls = self.polls.lock().await;
        let state = self.states[(*polls).min(self.states.len() - 1)];
        *polls += 1;
        let mut status = JobStatus::new(state);
        if state == JobState::Succeeded {
            status.output_location = Some(format!("s3://bucket/prefix/{}.csv", job_id));
        }
        Ok(status)
    }
}

/// Object store holding result objects in memory.
#[derive(Default)]
pub struct MemoryStore {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    pub deleted: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub async fn put(&self, key: &str, body: &str) {
        self.objects
            .lock()
            .await
            .insert(key.to_string(), body.as_bytes().to_vec());
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, _bucket: &str, key: &str) -> Result<Vec<u8>, IngestError> {
        self.objects
            .lock()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| IngestError::object_store(format!("NoSuchKey: {}", key)))
    }

    async fn delete(&self, _bucket: &str, key: &str) -> Result<(), IngestError> {
        self.objects.lock().await.remove(key);
        self.deleted.lock().await.push(key.to_string());
        Ok(())
    }
}

/// Embedding model returning a constant unit-length vector.
#[derive(Default)]
pub struct ConstantModel {
    pub calls: Mutex<usize>,
}

#[async_trait]
impl EmbeddingModel for ConstantModel {
    async fn embed(
        &self,
        _text: &str,
        dimensions: usize,
        _normalize: bool,
    ) -> Result<Vec<f32>, IngestError> {
        *self.calls.lock().await += 1;
        let value = 1.0 / (EMBEDDING_DIMENSION as f32).sqrt();
        Ok(vec![value; dimensions])
    }
}
