//! The assembled service: configuration, reference data, and every
//! collaborator the pipeline and search need.
//!
//! Built once per process (CLI command or server) and shared behind an
//! `Arc`. Tests assemble one from in-memory parts with [`Docket::new`].

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::Config;
use crate::db;
use crate::distill::Distiller;
use crate::extract::Extractor;
use crate::generation::{create_generator, TextGenerator};
use crate::keywords::KeywordSelector;
use crate::query::QueryDecomposer;
use crate::reference::Lexicon;
use crate::spell::SpellCorrector;
use crate::storage::{create_object_store, ObjectStore};
use crate::store::{RecordStore, SqliteStore};

pub struct Docket {
    pub config: Config,
    pub lexicon: Arc<Lexicon>,
    pub store: Arc<dyn RecordStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub generator: Arc<dyn TextGenerator>,
    pub extractor: Arc<Extractor>,
    distiller: Distiller,
    selector: KeywordSelector,
    spell: SpellCorrector,
    decomposer: QueryDecomposer,
}

impl Docket {
    pub fn new(
        config: Config,
        lexicon: Arc<Lexicon>,
        store: Arc<dyn RecordStore>,
        objects: Arc<dyn ObjectStore>,
        generator: Arc<dyn TextGenerator>,
        extractor: Arc<Extractor>,
    ) -> Self {
        let distiller = Distiller::new(Arc::clone(&lexicon), config.keywords.min_term_len);
        let selector = KeywordSelector::new(Arc::clone(&lexicon), &config.keywords);
        let spell = SpellCorrector::new(Arc::clone(&lexicon));
        let decomposer = QueryDecomposer::new(
            distiller.clone(),
            config.keywords.window,
            config.search.max_query_terms,
        );
        Self {
            config,
            lexicon,
            store,
            objects,
            generator,
            extractor,
            distiller,
            selector,
            spell,
            decomposer,
        }
    }

    /// Production wiring: SQLite store, configured storage backend,
    /// generator, and extractor.
    pub async fn from_config(config: Config) -> Result<Self> {
        let lexicon = Arc::new(
            Lexicon::from_config(&config.keywords).context("Failed to load reference data")?,
        );
        let pool = db::connect(&config).await?;
        let store: Arc<dyn RecordStore> = Arc::new(SqliteStore::new(pool));
        let objects = create_object_store(&config.storage)?;
        let generator: Arc<dyn TextGenerator> = Arc::from(create_generator(&config.generation)?);
        let extractor = Arc::new(Extractor::from_config(&config.extraction)?);

        tracing::info!(
            storage = objects.name(),
            generator = generator.name(),
            "docket initialized"
        );
        Ok(Self::new(
            config, lexicon, store, objects, generator, extractor,
        ))
    }

    pub fn distiller(&self) -> &Distiller {
        &self.distiller
    }

    pub fn selector(&self) -> &KeywordSelector {
        &self.selector
    }

    pub fn spell(&self) -> &SpellCorrector {
        &self.spell
    }

    pub fn decomposer(&self) -> &QueryDecomposer {
        &self.decomposer
    }
}
