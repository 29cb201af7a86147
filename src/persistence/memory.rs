//! In-process persistence adapter

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{MemoryQuery, MemoryRecord, NewMemory, PersistenceAdapter, PersistenceError, RecordKind};

/// Append-only memory store kept in process
///
/// Search matches records whose content contains any whitespace-separated
/// query term (case-insensitive); an empty query matches everything. Results
/// are ordered by the share of terms matched, then newest first, so a capped
/// search keeps the most recent versions of an aggregate.
#[derive(Debug)]
pub struct InMemoryPersistence {
    user_id: String,
    records: RwLock<Vec<MemoryRecord>>,
}

impl InMemoryPersistence {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            records: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of every stored record, oldest first
    pub async fn records(&self) -> Vec<MemoryRecord> {
        self.records.read().await.clone()
    }

    /// Number of stored records of one kind
    pub async fn count(&self, kind: RecordKind) -> usize {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.kind() == Some(kind))
            .count()
    }
}

impl Default for InMemoryPersistence {
    fn default() -> Self {
        Self::new("a2a-agent")
    }
}

#[async_trait]
impl PersistenceAdapter for InMemoryPersistence {
    async fn store(&self, memory: NewMemory) -> Result<MemoryRecord, PersistenceError> {
        let now = Utc::now().to_rfc3339();
        let metadata = match memory.metadata(&self.user_id) {
            Value::Object(map) => map,
            _ => Default::default(),
        };

        let record = MemoryRecord {
            id: Uuid::now_v7().to_string(),
            content: memory.content,
            metadata,
            user_id: self.user_id.clone(),
            created_at: now.clone(),
            updated_at: now,
            relevance_score: None,
        };

        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn search(&self, query: &MemoryQuery) -> Result<Vec<MemoryRecord>, PersistenceError> {
        let terms: Vec<String> = query
            .query
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();

        let records = self.records.read().await;
        let mut hits: Vec<(f64, usize, MemoryRecord)> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| query.kind.map_or(true, |kind| r.kind() == Some(kind)))
            .filter_map(|(position, record)| {
                let relevance = if terms.is_empty() {
                    1.0
                } else {
                    let content = record.content.to_lowercase();
                    let matched = terms.iter().filter(|t| content.contains(t.as_str())).count();
                    matched as f64 / terms.len() as f64
                };
                (relevance > 0.0).then(|| {
                    let mut record = record.clone();
                    record.relevance_score = Some(relevance);
                    (relevance, position, record)
                })
            })
            .collect();

        hits.sort_by(|a, b| b.0.total_cmp(&a.0).then(b.1.cmp(&a.1)));
        Ok(hits
            .into_iter()
            .take(query.limit)
            .map(|(_, _, record)| record)
            .collect())
    }
}
