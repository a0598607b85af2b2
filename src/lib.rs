//! # Docket
//!
//! Keyword indexing and ranked retrieval for scanned and digital legal
//! PDFs.
//!
//! Docket extracts text from uploaded PDFs (falling back to OCR when a
//! document has no text layer), distills it into a weighted keyword set,
//! and answers queries by decomposing them into terms and ranking stored
//! records by term-position agreement. Everything is exposed through a
//! CLI and a JSON HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌───────────────┐   ┌──────────┐
//! │  Upload  │──▶│  Extract   │──▶│ Distill+Select │──▶│  SQLite  │
//! │ (object) │   │ text / OCR │   │   keywords     │   │ records  │
//! └──────────┘   └────────────┘   └───────────────┘   └────┬─────┘
//!                                                         │
//!                  ┌──────────────────────────────────────┤
//!                  ▼                                      ▼
//!            ┌───────────┐                          ┌──────────┐
//!            │ Decompose │─────────── rank ────────▶│ Results  │
//!            │   query   │                          └──────────┘
//!            └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docket init                                  # create database
//! docket upload order.pdf --license acme       # store a PDF
//! docket update <record-id>                    # extract + index
//! docket search bail murder --top 3            # ranked retrieval
//! docket serve                                 # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Domain error enum |
//! | [`reference`] | Stopwords, reference frequencies, curated terms |
//! | [`distill`] | Tokenization and corpus distillation |
//! | [`spell`] | Dictionary spell correction |
//! | [`keywords`] | Keyword scoring and selection |
//! | [`query`] | Query decomposition |
//! | [`rank`] | Positional ranking |
//! | [`ocr`] | OCR engine abstraction |
//! | [`extract`] | PDF text extraction with OCR fallback |
//! | [`summary`] | Extractive summaries |
//! | [`generation`] | Optional LLM summaries, metadata, query rewriting |
//! | [`storage`] | Object storage (local, S3) |
//! | [`store`] | Record persistence |
//! | [`pipeline`] | Upload and update orchestration |
//! | [`search`] | Search, autocomplete, listings |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod commands;
pub mod config;
pub mod db;
pub mod distill;
pub mod error;
pub mod extract;
pub mod generation;
pub mod keywords;
pub mod migrate;
pub mod models;
pub mod ocr;
pub mod pipeline;
pub mod query;
pub mod rank;
pub mod reference;
pub mod search;
pub mod server;
pub mod service;
pub mod spell;
pub mod storage;
pub mod store;
pub mod summary;
