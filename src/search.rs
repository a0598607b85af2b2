//! Query-time orchestration: ranked search, autocomplete, and tenant
//! listings.
//!
//! Search flow:
//!
//! ```text
//! search key → (free text only) best-effort reformulation
//!   → decompose into ordered terms → load candidate keyword sets
//!   → rank → load the winning records
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{DocketError, Result};
use crate::models::{CaseMetadata, Document, DocumentRecord, SearchQuery};
use crate::query::QueryInput;
use crate::rank::{collect_candidates, rank};
use crate::service::Docket;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub search_key: Option<QueryInput>,
    #[serde(default)]
    pub top: Option<usize>,
    #[serde(default)]
    pub order_matters: Option<bool>,
}

/// One ranked record.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub score: u64,
    pub license_id: String,
    pub keywords: Vec<String>,
    pub summary: Option<String>,
    #[serde(flatten)]
    pub metadata: CaseMetadata,
    pub documents: Vec<Document>,
}

impl SearchHit {
    fn new(record: DocumentRecord, score: u64) -> Self {
        Self {
            id: record.id,
            score,
            license_id: record.license_id,
            keywords: record.keywords,
            summary: record.summary,
            metadata: record.metadata,
            documents: record.documents,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub terms: Vec<String>,
    pub results: Vec<SearchHit>,
}

pub async fn search_documents(docket: &Docket, request: &SearchRequest) -> Result<SearchResponse> {
    let input = request
        .search_key
        .as_ref()
        .ok_or_else(|| DocketError::BadQuery("search_key is required".to_string()))?;
    let top = request.top.unwrap_or(docket.config.search.default_top);
    if top == 0 {
        return Err(DocketError::BadQuery("top must be at least 1".to_string()));
    }
    let order_matters = request.order_matters.unwrap_or(true);

    let query = SearchQuery {
        terms: decompose(docket, input).await?,
        top,
        order_matters,
    };
    let candidates = collect_candidates(
        docket.store.load_keyword_index_matching(&query.terms).await?,
        &query.terms,
    );
    let ranked = rank(&query.terms, query.order_matters, query.top, &candidates)?;

    let mut results = Vec::with_capacity(ranked.len());
    for hit in ranked {
        let record = docket.store.load_record(&hit.id).await?;
        results.push(SearchHit::new(record, hit.score));
    }

    tracing::info!(terms = ?query.terms, order_matters, results = results.len(), "search complete");
    Ok(SearchResponse {
        terms: query.terms,
        results,
    })
}

/// Decompose, first trying the generator's reformulation of free text.
async fn decompose(docket: &Docket, input: &QueryInput) -> Result<Vec<String>> {
    if let QueryInput::Text(text) = input {
        if docket.generator.is_enabled() && !input.is_blank() {
            match docket.generator.reformulate_query(text).await {
                Ok(reformulated) => {
                    let rewritten = QueryInput::Text(reformulated);
                    match docket.decomposer().decompose(&rewritten) {
                        Ok(terms) => return Ok(terms),
                        Err(e) => tracing::warn!(error = %e, "reformulated query unusable"),
                    }
                }
                Err(e) => tracing::warn!(error = %e, "query reformulation failed"),
            }
        }
    }
    docket.decomposer().decompose(input)
}

/// Unique keywords across all records.
///
/// Unsorted output is in first-seen order over records in id order.
pub async fn autocomplete(docket: &Docket, limit: Option<usize>, sort: bool) -> Result<Vec<String>> {
    let index = docket.store.load_keyword_index().await?;
    let mut seen = HashSet::new();
    let mut keywords: Vec<String> = index
        .into_iter()
        .flat_map(|entry| entry.keywords)
        .filter(|k| seen.insert(k.clone()))
        .collect();
    if sort {
        keywords.sort();
    }
    if let Some(limit) = limit {
        keywords.truncate(limit);
    }
    Ok(keywords)
}

/// Every record owned by `license_id`.
pub async fn list_documents(docket: &Docket, license_id: &str) -> Result<Vec<DocumentRecord>> {
    let license_id = license_id.trim();
    if license_id.is_empty() {
        return Err(DocketError::InvalidInput("license_id is required".to_string()));
    }
    Ok(docket.store.list_by_license(license_id).await?)
}
