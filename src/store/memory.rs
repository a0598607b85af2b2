//! In-memory [`RecordStore`] for tests and one-off runs.
//!
//! Records live in a `BTreeMap` behind `std::sync::RwLock`, so iteration is
//! already in record-id order.

use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::models::{DerivedFields, Document, DocumentRecord, KeywordEntry};

use super::{now_ts, RecordStore, StoreError};

pub struct InMemoryStore {
    records: RwLock<BTreeMap<String, DocumentRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }

    /// Insert a fully formed record, replacing any with the same id.
    pub fn insert(&self, record: DocumentRecord) {
        self.records
            .write()
            .unwrap()
            .insert(record.id.clone(), record);
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn create_record(
        &self,
        license_id: &str,
        documents: &[Document],
    ) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_ts();
        self.insert(DocumentRecord {
            id: id.clone(),
            license_id: license_id.to_string(),
            documents: documents.to_vec(),
            clean_text: None,
            keywords: Vec::new(),
            summary: None,
            metadata: Default::default(),
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    async fn load_record(&self, id: &str) -> Result<DocumentRecord, StoreError> {
        self.records
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn save_derived_fields(
        &self,
        id: &str,
        fields: &DerivedFields,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().unwrap();
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.clean_text = Some(fields.clean_text.clone());
        record.keywords = fields.keywords.clone();
        record.summary = Some(fields.summary.clone());
        record.metadata = fields.metadata.clone();
        record.updated_at = now_ts();
        Ok(())
    }

    async fn load_keyword_index(&self) -> Result<Vec<KeywordEntry>, StoreError> {
        Ok(self
            .records
            .read()
            .unwrap()
            .values()
            .map(|r| KeywordEntry {
                id: r.id.clone(),
                keywords: r.keywords.clone(),
            })
            .collect())
    }

    async fn load_keyword_index_matching(
        &self,
        terms: &[String],
    ) -> Result<Vec<KeywordEntry>, StoreError> {
        let wanted: HashSet<&str> = terms.iter().map(String::as_str).collect();
        Ok(self
            .records
            .read()
            .unwrap()
            .values()
            .filter(|r| r.keywords.iter().any(|k| wanted.contains(k.as_str())))
            .map(|r| KeywordEntry {
                id: r.id.clone(),
                keywords: r.keywords.clone(),
            })
            .collect())
    }

    async fn list_by_license(&self, license_id: &str) -> Result<Vec<DocumentRecord>, StoreError> {
        let mut records: Vec<DocumentRecord> = self
            .records
            .read()
            .unwrap()
            .values()
            .filter(|r| r.license_id == license_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }
}
