//! Core data models used throughout Docket.
//!
//! These types represent the uploaded files, the indexed records that own
//! them, and the query and ranking values that flow through search.

use serde::{Deserialize, Deserializer, Serialize};

/// One physical file held in object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub url: String,
    pub content_type: String,
}

impl Document {
    /// The object name used to fetch this file: the last path segment of its URL.
    pub fn object_name(&self) -> &str {
        object_name(&self.url)
    }
}

/// Returns the last path segment of a storage URL.
pub fn object_name(url: &str) -> &str {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url)
}

/// Case metadata produced by the text-generation collaborator.
///
/// Every field is empty when enrichment is disabled or fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "text_or_list")]
    pub parties: String,
    #[serde(default)]
    pub court: String,
    #[serde(default)]
    pub date: String,
}

/// Accepts a plain string or a list of strings, joining the list with "; ".
fn text_or_list<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrList {
        Text(String),
        List(Vec<String>),
    }

    Ok(match TextOrList::deserialize(deserializer)? {
        TextOrList::Text(text) => text,
        TextOrList::List(items) => items
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
    })
}

/// The indexed unit: a tenant-owned group of files plus derived fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub license_id: String,
    pub documents: Vec<Document>,
    pub clean_text: Option<String>,
    pub keywords: Vec<String>,
    pub summary: Option<String>,
    #[serde(flatten)]
    pub metadata: CaseMetadata,
    pub created_at: i64,
    pub updated_at: i64,
}

impl DocumentRecord {
    /// Whether the extraction pipeline has populated this record.
    pub fn is_indexed(&self) -> bool {
        self.clean_text.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Derived fields written back by the extraction pipeline in one step.
#[derive(Debug, Clone, Serialize)]
pub struct DerivedFields {
    pub clean_text: String,
    pub keywords: Vec<String>,
    pub summary: String,
    pub metadata: CaseMetadata,
}

/// A `(record id, keyword set)` pair read from the keyword index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordEntry {
    pub id: String,
    pub keywords: Vec<String>,
}

/// A decomposed search request.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Normalized terms; earlier terms matter more when `order_matters` is set.
    pub terms: Vec<String>,
    pub top: usize,
    pub order_matters: bool,
}

/// One ranked record identifier with its integer score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedDocument {
    pub id: String,
    pub score: u64,
}
