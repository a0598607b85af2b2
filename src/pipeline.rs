//! Upload and update orchestration.
//!
//! Upload stores a PDF and creates a record that owns it. Update runs the
//! extraction pipeline over every file of a record:
//!
//! ```text
//! load record → fetch files → extract (parallel, OCR fallback)
//!   → spell correction (optional) → curated + manual keywords
//!   → distill → select top-K → merge → summary + metadata → save
//! ```
//!
//! The derived fields are written in a single store call, so a failure at
//! any step leaves the record exactly as it was.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{DocketError, Result};
use crate::extract::{ExtractionFailure, SourceDocument, MIME_PDF};
use crate::keywords::merge_keywords;
use crate::models::{CaseMetadata, DerivedFields, Document};
use crate::service::Docket;
use crate::summary::summarize;

/// Words of clean text handed to the generator for metadata extraction.
const METADATA_INPUT_WORDS: usize = 300;
/// Words of clean text handed to the generator for summarization.
const SUMMARY_INPUT_WORDS: usize = 3000;

#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub record_id: String,
    pub document_id: String,
    pub url: String,
}

/// Store one PDF and create a record owning it.
pub async fn upload(
    docket: &Docket,
    license_id: &str,
    file_name: &str,
    bytes: Vec<u8>,
) -> Result<UploadReport> {
    let license_id = license_id.trim();
    if license_id.is_empty() {
        return Err(DocketError::InvalidInput("license_id is required".to_string()));
    }
    if !file_name.to_ascii_lowercase().ends_with(".pdf") {
        return Err(DocketError::InvalidInput(format!(
            "only PDF files are accepted: '{}'",
            file_name
        )));
    }
    if !bytes.starts_with(b"%PDF-") {
        return Err(DocketError::InvalidInput(format!(
            "'{}' is not a PDF document",
            file_name
        )));
    }
    let max = docket.config.extraction.max_file_bytes;
    if bytes.len() > max {
        return Err(DocketError::InvalidInput(format!(
            "'{}' is {} bytes; the limit is {}",
            file_name,
            bytes.len(),
            max
        )));
    }

    let document_id = Uuid::new_v4().to_string();
    let object = format!("{}-{}", &document_id[..8], sanitize_file_name(file_name));
    let url = docket.objects.put(&object, MIME_PDF, bytes).await?;

    let document = Document {
        id: document_id.clone(),
        url: url.clone(),
        content_type: MIME_PDF.to_string(),
    };
    let record_id = docket.store.create_record(license_id, &[document]).await?;

    tracing::info!(%record_id, %license_id, %url, "document uploaded");
    Ok(UploadReport {
        record_id,
        document_id,
        url,
    })
}

/// Keep the last path segment and replace anything outside `[A-Za-z0-9._-]`.
fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRequest {
    pub id: String,
    /// Run spell correction over the extracted text.
    #[serde(default)]
    pub spell: bool,
    /// Extra manual keywords, placed ahead of everything else.
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateReport {
    pub id: String,
    /// True iff OCR produced the text of at least one file.
    pub ocr: bool,
    pub keywords: Vec<String>,
    pub summary: String,
    #[serde(flatten)]
    pub metadata: CaseMetadata,
    pub extracted: usize,
    pub failures: Vec<ExtractionFailure>,
}

/// Run the extraction pipeline for one record and persist the result.
pub async fn run_update(docket: &Docket, request: &UpdateRequest) -> Result<UpdateReport> {
    let record = docket.store.load_record(&request.id).await?;

    let mut sources = Vec::with_capacity(record.documents.len());
    for doc in &record.documents {
        let bytes = docket.objects.fetch(&doc.url).await?;
        sources.push(SourceDocument {
            name: doc.object_name().to_string(),
            content_type: doc.content_type.clone(),
            bytes,
        });
    }

    let extractor = Arc::clone(&docket.extractor);
    let batch = tokio::task::spawn_blocking(move || extractor.extract_batch(&sources))
        .await
        .map_err(|e| DocketError::Internal(format!("extraction task failed: {}", e)))??;

    let text = if request.spell {
        docket.spell().correct(&batch.text)
    } else {
        batch.text
    };

    let mut manual: Vec<String> = request
        .keywords
        .iter()
        .flat_map(|k| docket.distiller().distill(k))
        .collect();
    manual.extend(docket.lexicon.curated.find_in(&text));

    let corpus = docket.distiller().distill(&text);
    let automatic = docket
        .selector()
        .select(&corpus, docket.config.keywords.cap);
    let keywords = merge_keywords(&manual, automatic);

    let summary = build_summary(docket, &text, &keywords).await;
    let metadata = build_metadata(docket, &text).await;

    let fields = DerivedFields {
        clean_text: text,
        keywords,
        summary,
        metadata,
    };
    docket.store.save_derived_fields(&record.id, &fields).await?;

    tracing::info!(
        id = %record.id,
        ocr = batch.ocr_used,
        keywords = fields.keywords.len(),
        failures = batch.failures.len(),
        "record updated"
    );

    Ok(UpdateReport {
        id: record.id,
        ocr: batch.ocr_used,
        keywords: fields.keywords,
        summary: fields.summary,
        metadata: fields.metadata,
        extracted: batch.extracted,
        failures: batch.failures,
    })
}

async fn build_summary(docket: &Docket, text: &str, keywords: &[String]) -> String {
    if docket.generator.is_enabled() {
        match docket
            .generator
            .summarize(&first_words(text, SUMMARY_INPUT_WORDS))
            .await
        {
            Ok(summary) => return summary,
            Err(e) => tracing::warn!(error = %e, "generated summary failed, using extractive"),
        }
    }
    summarize(text, keywords, docket.config.search.summary_sentences)
}

async fn build_metadata(docket: &Docket, text: &str) -> CaseMetadata {
    if !docket.generator.is_enabled() {
        return CaseMetadata::default();
    }
    match docket
        .generator
        .extract_case_metadata(&first_words(text, METADATA_INPUT_WORDS))
        .await
    {
        Ok(metadata) => metadata,
        Err(e) => {
            tracing::warn!(error = %e, "case metadata extraction failed");
            CaseMetadata::default()
        }
    }
}

fn first_words(text: &str, n: usize) -> String {
    text.split_whitespace().take(n).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("../cases/State v Khan (2019).pdf"), "State_v_Khan__2019_.pdf");
        assert_eq!(sanitize_file_name("C:\\scans\\order.pdf"), "order.pdf");
    }

    #[test]
    fn first_words_truncates_on_whitespace() {
        assert_eq!(first_words("a  b\nc d", 3), "a b c");
        assert_eq!(first_words("", 3), "");
    }
}
