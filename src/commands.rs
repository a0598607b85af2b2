//! CLI entry points. Each builds a [`Docket`] from the loaded config, runs
//! one operation, and prints the result to stdout.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::error::DocketError;
use crate::pipeline::{run_update, upload, UpdateRequest};
use crate::query::QueryInput;
use crate::search::{autocomplete, list_documents, search_documents, SearchRequest};
use crate::service::Docket;

pub async fn run_upload(config: &Config, file: &Path, license_id: &str) -> Result<()> {
    let bytes = std::fs::read(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let docket = Docket::from_config(config.clone()).await?;
    let report = upload(&docket, license_id, &file_name, bytes).await?;

    println!("record:   {}", report.record_id);
    println!("document: {}", report.document_id);
    println!("url:      {}", report.url);
    Ok(())
}

pub async fn run_update_cmd(
    config: &Config,
    id: &str,
    spell: bool,
    keywords: Vec<String>,
) -> Result<()> {
    let docket = Docket::from_config(config.clone()).await?;
    let request = UpdateRequest {
        id: id.to_string(),
        spell,
        keywords,
    };
    let report = run_update(&docket, &request).await?;

    println!("--- Record {} ---", report.id);
    println!("ocr:       {}", report.ocr);
    println!("extracted: {} file(s)", report.extracted);
    for failure in &report.failures {
        println!("failed:    {} ({})", failure.document, failure.error);
    }
    if !report.metadata.title.is_empty() {
        println!("title:     {}", report.metadata.title);
    }
    if !report.metadata.court.is_empty() {
        println!("court:     {}", report.metadata.court);
    }
    println!("keywords:  {}", report.keywords.join(", "));
    println!();
    println!("--- Summary ---");
    println!("{}", report.summary);
    Ok(())
}

pub async fn run_search(
    config: &Config,
    terms: Vec<String>,
    text: bool,
    top: Option<usize>,
    unordered: bool,
) -> Result<()> {
    let docket = Docket::from_config(config.clone()).await?;
    let search_key = if text {
        QueryInput::Text(terms.join(" "))
    } else {
        QueryInput::Terms(terms)
    };
    let request = SearchRequest {
        search_key: Some(search_key),
        top,
        order_matters: Some(!unordered),
    };

    let response = match search_documents(&docket, &request).await {
        Ok(r) => r,
        Err(DocketError::NoResults) => {
            println!("No results.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("terms: {}", response.terms.join(" "));
    println!();
    for (i, hit) in response.results.iter().enumerate() {
        println!("{}. [{}] {}", i + 1, hit.score, hit.id);
        if !hit.metadata.title.is_empty() {
            println!("    title:    {}", hit.metadata.title);
        }
        println!("    license:  {}", hit.license_id);
        println!("    keywords: {}", hit.keywords.join(", "));
        if let Some(summary) = &hit.summary {
            println!("    summary:  {}", summary);
        }
    }
    Ok(())
}

pub async fn run_autocomplete(config: &Config, limit: Option<usize>, sort: bool) -> Result<()> {
    let docket = Docket::from_config(config.clone()).await?;
    for keyword in autocomplete(&docket, limit, sort).await? {
        println!("{}", keyword);
    }
    Ok(())
}

pub async fn run_documents(config: &Config, license_id: &str) -> Result<()> {
    let docket = Docket::from_config(config.clone()).await?;
    let records = list_documents(&docket, license_id).await?;
    if records.is_empty() {
        println!("No documents for license '{}'.", license_id);
        return Ok(());
    }

    println!("{:<38} {:<6} {:<8} TITLE", "ID", "FILES", "INDEXED");
    for record in &records {
        let title = if record.metadata.title.is_empty() {
            "(untitled)"
        } else {
            record.metadata.title.as_str()
        };
        println!(
            "{:<38} {:<6} {:<8} {}",
            record.id,
            record.documents.len(),
            if record.is_indexed() { "yes" } else { "no" },
            title
        );
    }
    Ok(())
}
