//! Library-level tests: upload, update, and search wired through a real
//! `Docket` with in-memory collaborators.

use std::sync::Arc;
use tempfile::TempDir;

use docket::config::Config;
use docket::error::DocketError;
use docket::extract::{ExtractError, Extractor, TextLayer};
use docket::generation::DisabledGenerator;
use docket::models::DocumentRecord;
use docket::ocr::{OcrEngine, OcrError};
use docket::pipeline::{run_update, upload, UpdateRequest};
use docket::query::QueryInput;
use docket::reference::Lexicon;
use docket::search::{autocomplete, list_documents, search_documents, SearchRequest};
use docket::service::Docket;
use docket::storage::{LocalObjectStore, StorageError};
use docket::store::{InMemoryStore, RecordStore};

/// Reads everything after the `%PDF-` magic as `page|page|...`.
struct FakeLayer;

impl TextLayer for FakeLayer {
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>, ExtractError> {
        let body = pdf.strip_prefix(b"%PDF-").unwrap_or(pdf);
        let raw = std::str::from_utf8(body)
            .map_err(|e| ExtractError::MalformedDocument(e.to_string()))?;
        if raw == "BROKEN" {
            return Err(ExtractError::MalformedDocument("bad xref".to_string()));
        }
        Ok(raw.split('|').map(str::to_string).collect())
    }
}

struct FakeOcr;

impl OcrEngine for FakeOcr {
    fn name(&self) -> &str {
        "fake"
    }

    fn recognize(&self, _pdf: &[u8], _page_count: usize) -> Result<String, OcrError> {
        Ok("Scanned order.\nThe injunction against the tenant is dissolved on appeal.".to_string())
    }
}

struct Harness {
    _tmp: TempDir,
    store: Arc<InMemoryStore>,
    docket: Docket,
}

fn harness() -> Harness {
    let tmp = TempDir::new().unwrap();
    let config = Config::minimal(tmp.path().join("docket.sqlite"));
    let store = Arc::new(InMemoryStore::new());
    let docket = Docket::new(
        config,
        Arc::new(Lexicon::builtin().unwrap()),
        store.clone(),
        Arc::new(LocalObjectStore::new(tmp.path().join("objects"))),
        Arc::new(DisabledGenerator),
        Arc::new(Extractor::new(Box::new(FakeLayer), Box::new(FakeOcr), 2).unwrap()),
    );
    Harness {
        _tmp: tmp,
        store,
        docket,
    }
}

fn pdf(text: &str) -> Vec<u8> {
    format!("%PDF-{}", text).into_bytes()
}

fn indexed(id: &str, keywords: &[&str]) -> DocumentRecord {
    DocumentRecord {
        id: id.to_string(),
        license_id: "lic".to_string(),
        documents: Vec::new(),
        clean_text: Some("text".to_string()),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        summary: None,
        metadata: Default::default(),
        created_at: 0,
        updated_at: 0,
    }
}

fn terms(words: &[&str]) -> SearchRequest {
    SearchRequest {
        search_key: Some(QueryInput::Terms(
            words.iter().map(|w| w.to_string()).collect(),
        )),
        top: None,
        order_matters: None,
    }
}

const ORDER_TEXT: &str = "The court granted bail to the accused. \
                          The murder charge remains pending before the sessions court.";

#[tokio::test]
async fn upload_update_search_round_trip() {
    let h = harness();
    let uploaded = upload(&h.docket, "acme", "bail-order.pdf", pdf(ORDER_TEXT))
        .await
        .unwrap();
    assert!(uploaded.url.starts_with("file://"));

    let report = run_update(
        &h.docket,
        &UpdateRequest {
            id: uploaded.record_id.clone(),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert!(!report.ocr);
    assert_eq!(report.extracted, 1);
    assert!(report.keywords.contains(&"bail".to_string()));
    assert!(report.keywords.contains(&"murder".to_string()));
    assert!(!report.summary.is_empty());

    let record = h.store.load_record(&uploaded.record_id).await.unwrap();
    assert!(record.is_indexed());
    assert_eq!(record.keywords, report.keywords);

    // Every stored keyword, queried alone, finds its record.
    for keyword in &record.keywords {
        let response = search_documents(&h.docket, &terms(&[keyword.as_str()])).await.unwrap();
        assert!(
            response.results.iter().any(|r| r.id == record.id),
            "keyword '{}' did not find its record",
            keyword
        );
    }

    let response = search_documents(&h.docket, &terms(&["murder", "bail"]))
        .await
        .unwrap();
    assert_eq!(response.terms, vec!["murder", "bail"]);
    assert_eq!(response.results[0].score, 3);
    assert_eq!(response.results[0].license_id, "acme");
}

#[tokio::test]
async fn blank_text_layer_goes_through_ocr() {
    let h = harness();
    let uploaded = upload(&h.docket, "acme", "scan.pdf", pdf(" | \n"))
        .await
        .unwrap();
    let report = run_update(
        &h.docket,
        &UpdateRequest {
            id: uploaded.record_id,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert!(report.ocr);
    assert!(report.keywords.contains(&"injunction".to_string()));
}

#[tokio::test]
async fn manual_keywords_come_first() {
    let h = harness();
    let uploaded = upload(&h.docket, "acme", "order.pdf", pdf(ORDER_TEXT))
        .await
        .unwrap();
    let report = run_update(
        &h.docket,
        &UpdateRequest {
            id: uploaded.record_id,
            spell: false,
            keywords: vec!["Habeas Corpus".to_string(), "bail".to_string()],
        },
    )
    .await
    .unwrap();

    assert_eq!(&report.keywords[..3], ["habeas", "corpus", "bail"]);
    let bail_count = report.keywords.iter().filter(|k| *k == "bail").count();
    assert_eq!(bail_count, 1);
}

#[tokio::test]
async fn failed_extraction_leaves_record_untouched() {
    let h = harness();
    let uploaded = upload(&h.docket, "acme", "broken.pdf", pdf("BROKEN"))
        .await
        .unwrap();
    let err = run_update(
        &h.docket,
        &UpdateRequest {
            id: uploaded.record_id.clone(),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, DocketError::Extraction { .. }));
    let record = h.store.load_record(&uploaded.record_id).await.unwrap();
    assert!(!record.is_indexed());
    assert!(record.keywords.is_empty());
}

#[tokio::test]
async fn update_of_unknown_record_is_not_found() {
    let h = harness();
    let err = run_update(
        &h.docket,
        &UpdateRequest {
            id: "missing".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DocketError::NotFound(_)));
}

#[tokio::test]
async fn upload_rejects_non_pdf_input() {
    let h = harness();
    let wrong_name = upload(&h.docket, "acme", "notes.txt", pdf("x")).await;
    assert!(matches!(wrong_name, Err(DocketError::InvalidInput(_))));
    let wrong_magic = upload(&h.docket, "acme", "notes.pdf", b"hello".to_vec()).await;
    assert!(matches!(wrong_magic, Err(DocketError::InvalidInput(_))));
    let no_license = upload(&h.docket, "  ", "a.pdf", pdf("x")).await;
    assert!(matches!(no_license, Err(DocketError::InvalidInput(_))));
}

#[tokio::test]
async fn failed_put_is_a_storage_error() {
    let tmp = TempDir::new().unwrap();
    // A plain file where the object directory should be.
    let blocked = tmp.path().join("objects");
    std::fs::write(&blocked, b"").unwrap();
    let store = Arc::new(InMemoryStore::new());
    let docket = Docket::new(
        Config::minimal(tmp.path().join("docket.sqlite")),
        Arc::new(Lexicon::builtin().unwrap()),
        store.clone(),
        Arc::new(LocalObjectStore::new(blocked)),
        Arc::new(DisabledGenerator),
        Arc::new(Extractor::new(Box::new(FakeLayer), Box::new(FakeOcr), 1).unwrap()),
    );

    let err = upload(&docket, "acme", "order.pdf", pdf(ORDER_TEXT))
        .await
        .unwrap_err();
    assert!(matches!(err, DocketError::Storage(StorageError::Io(_))));
    assert!(!err.to_string().contains("fetch"));
    assert!(store.list_by_license("acme").await.unwrap().is_empty());
}

#[tokio::test]
async fn order_flag_changes_scores() {
    let h = harness();
    h.store.insert(indexed("d1", &["injunction", "appeal"]));
    h.store.insert(indexed("d2", &["appeal"]));

    let ordered = search_documents(&h.docket, &terms(&["injunction", "appeal"]))
        .await
        .unwrap();
    let scores: Vec<(&str, u64)> = ordered
        .results
        .iter()
        .map(|r| (r.id.as_str(), r.score))
        .collect();
    assert_eq!(scores, vec![("d1", 3), ("d2", 1)]);

    let mut request = terms(&["injunction", "appeal"]);
    request.order_matters = Some(false);
    let unordered = search_documents(&h.docket, &request).await.unwrap();
    let scores: Vec<u64> = unordered.results.iter().map(|r| r.score).collect();
    assert_eq!(scores, vec![2, 1]);
}

#[tokio::test]
async fn search_errors() {
    let h = harness();
    h.store.insert(indexed("d1", &["appeal"]));

    let unknown = search_documents(&h.docket, &terms(&["zymurgy"])).await;
    assert!(matches!(unknown, Err(DocketError::NoResults)));

    let stopwords = search_documents(&h.docket, &terms(&["the", "of"])).await;
    assert!(matches!(stopwords, Err(DocketError::BadQuery(_))));

    let missing = SearchRequest {
        search_key: None,
        top: None,
        order_matters: None,
    };
    assert!(matches!(
        search_documents(&h.docket, &missing).await,
        Err(DocketError::BadQuery(_))
    ));

    let mut zero_top = terms(&["appeal"]);
    zero_top.top = Some(0);
    assert!(matches!(
        search_documents(&h.docket, &zero_top).await,
        Err(DocketError::BadQuery(_))
    ));
}

#[tokio::test]
async fn autocomplete_and_listing() {
    let h = harness();
    h.store.insert(indexed("a", &["writ", "appeal"]));
    h.store.insert(indexed("b", &["appeal", "bail"]));

    assert_eq!(
        autocomplete(&h.docket, None, false).await.unwrap(),
        vec!["writ", "appeal", "bail"]
    );
    assert_eq!(
        autocomplete(&h.docket, Some(2), true).await.unwrap(),
        vec!["appeal", "bail"]
    );

    assert_eq!(list_documents(&h.docket, "lic").await.unwrap().len(), 2);
    assert!(list_documents(&h.docket, "other").await.unwrap().is_empty());
    assert!(matches!(
        list_documents(&h.docket, "").await,
        Err(DocketError::InvalidInput(_))
    ));
}
