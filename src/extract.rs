//! Text extraction for uploaded PDFs, with an OCR fallback.
//!
//! Each document is read through its embedded text layer. When the first
//! page carries no text the document is treated as a scan: every page is
//! rasterized and recognized by the [`OcrEngine`]. Otherwise every page's
//! text layer is used directly. In both cases newlines are collapsed to
//! spaces and page texts are concatenated without a separator.
//!
//! A record may own several documents. [`Extractor::extract_batch`] runs
//! them on a bounded rayon pool, keeps the original document order in the
//! output, and isolates failures: one broken file does not sink the others.

use rayon::prelude::*;

use crate::config::ExtractionConfig;
use crate::error::DocketError;
use crate::ocr::{collapse_newlines, create_ocr_engine, OcrEngine, OcrError};

pub const MIME_PDF: &str = "application/pdf";

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),
    #[error("malformed PDF: {0}")]
    MalformedDocument(String),
    #[error("PDF reports no pages")]
    MissingPageCount,
    #[error(transparent)]
    Ocr(#[from] OcrError),
    #[error("document produced no text")]
    NoText,
}

/// Text of one document, tagged with how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    DirectText(String),
    OcrText(String),
}

impl Extraction {
    pub fn text(&self) -> &str {
        match self {
            Extraction::DirectText(t) | Extraction::OcrText(t) => t,
        }
    }

    pub fn used_ocr(&self) -> bool {
        matches!(self, Extraction::OcrText(_))
    }
}

/// Reads the embedded per-page text layer of a PDF.
pub trait TextLayer: Send + Sync {
    /// One entry per page, in page order. An empty vector means the file
    /// declares no pages.
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>, ExtractError>;
}

/// Text layer backed by `lopdf` (structure and page count) and
/// `pdf-extract` (text).
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextLayer;

impl TextLayer for PdfTextLayer {
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>, ExtractError> {
        let doc = lopdf::Document::load_mem(pdf)
            .map_err(|e| ExtractError::MalformedDocument(e.to_string()))?;
        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Ok(Vec::new());
        }
        match pdf_extract::extract_text_from_mem_by_pages(pdf) {
            Ok(pages) => Ok(pages),
            Err(e) => {
                // Unreadable text layer: report blank pages so the scan path runs.
                tracing::warn!(error = %e, "text layer unreadable, treating as image-only");
                Ok(vec![String::new(); page_count])
            }
        }
    }
}

/// One file handed to the extractor.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Human-readable reference (object name) used in errors and logs.
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ExtractionFailure {
    pub document: String,
    pub error: String,
}

/// Combined result of extracting every document of a record.
#[derive(Debug, Clone)]
pub struct BatchExtraction {
    /// Text of the successful documents in their original order.
    pub text: String,
    /// True iff OCR produced the text of at least one document.
    pub ocr_used: bool,
    pub extracted: usize,
    pub failures: Vec<ExtractionFailure>,
}

pub struct Extractor {
    text_layer: Box<dyn TextLayer>,
    ocr: Box<dyn OcrEngine>,
    pool: rayon::ThreadPool,
}

impl Extractor {
    pub fn new(
        text_layer: Box<dyn TextLayer>,
        ocr: Box<dyn OcrEngine>,
        concurrency: usize,
    ) -> anyhow::Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(concurrency.max(1))
            .thread_name(|i| format!("docket-extract-{i}"))
            .build()?;
        Ok(Self {
            text_layer,
            ocr,
            pool,
        })
    }

    /// Extractor with the PDF text layer and the configured OCR backend.
    pub fn from_config(config: &ExtractionConfig) -> anyhow::Result<Self> {
        Self::new(
            Box::new(PdfTextLayer),
            create_ocr_engine(config),
            config.concurrency,
        )
    }

    /// Extract one document.
    pub fn extract(&self, content_type: &str, bytes: &[u8]) -> Result<Extraction, ExtractError> {
        if content_type != MIME_PDF {
            return Err(ExtractError::UnsupportedContentType(
                content_type.to_string(),
            ));
        }
        let pages = self.text_layer.page_texts(bytes)?;
        let Some(first) = pages.first() else {
            return Err(ExtractError::MissingPageCount);
        };

        if first.trim().is_empty() {
            tracing::debug!(pages = pages.len(), engine = self.ocr.name(), "running OCR");
            let text = self.ocr.recognize(bytes, pages.len())?;
            let text = collapse_newlines(&text);
            if text.trim().is_empty() {
                return Err(ExtractError::NoText);
            }
            return Ok(Extraction::OcrText(text));
        }

        let text: String = pages.iter().map(|p| collapse_newlines(p)).collect();
        Ok(Extraction::DirectText(text))
    }

    /// Extract every document, in parallel, preserving order.
    ///
    /// Fails only when no document produced text; the error then carries the
    /// first failing document.
    pub fn extract_batch(&self, documents: &[SourceDocument]) -> Result<BatchExtraction, DocketError> {
        let results: Vec<Result<Extraction, ExtractError>> = self.pool.install(|| {
            documents
                .par_iter()
                .map(|doc| self.extract(&doc.content_type, &doc.bytes))
                .collect()
        });

        let mut texts = Vec::new();
        let mut ocr_used = false;
        let mut failures = Vec::new();
        let mut first_error = None;

        for (doc, result) in documents.iter().zip(results) {
            match result {
                Ok(extraction) => {
                    ocr_used |= extraction.used_ocr();
                    texts.push(extraction.text().to_string());
                }
                Err(err) => {
                    tracing::warn!(document = %doc.name, error = %err, "extraction failed");
                    failures.push(ExtractionFailure {
                        document: doc.name.clone(),
                        error: err.to_string(),
                    });
                    first_error.get_or_insert((doc.name.clone(), err));
                }
            }
        }

        if texts.is_empty() {
            let (document, source) =
                first_error.unwrap_or_else(|| ("(no documents)".to_string(), ExtractError::NoText));
            return Err(DocketError::Extraction { document, source });
        }

        Ok(BatchExtraction {
            extracted: texts.len(),
            text: texts.join(" "),
            ocr_used,
            failures,
        })
    }
}
