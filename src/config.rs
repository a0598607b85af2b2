use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub keywords: KeywordsConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KeywordsConfig {
    /// Maximum number of automatically selected keywords per record.
    #[serde(default = "default_cap")]
    pub cap: usize,
    #[serde(default = "default_min_term_len")]
    pub min_term_len: usize,
    /// Co-occurrence window used by the salience graph.
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default)]
    pub weights: WeightsConfig,
    /// JSON file of the form `{"stopwords": [...]}`. Built-in list when absent.
    #[serde(default)]
    pub stopwords_path: Option<PathBuf>,
    /// TSV file of `word<TAB>zipf` rows. Built-in table when absent.
    #[serde(default)]
    pub reference_path: Option<PathBuf>,
    /// One curated term per line. Built-in legal vocabulary when absent.
    #[serde(default)]
    pub curated_path: Option<PathBuf>,
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            cap: default_cap(),
            min_term_len: default_min_term_len(),
            window: default_window(),
            weights: WeightsConfig::default(),
            stopwords_path: None,
            reference_path: None,
            curated_path: None,
        }
    }
}

fn default_cap() -> usize {
    30
}
fn default_min_term_len() -> usize {
    3
}
fn default_window() -> usize {
    2
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct WeightsConfig {
    #[serde(default = "default_tf_weight")]
    pub frequency: f64,
    #[serde(default = "default_rarity_weight")]
    pub rarity: f64,
    #[serde(default = "default_salience_weight")]
    pub salience: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            frequency: default_tf_weight(),
            rarity: default_rarity_weight(),
            salience: default_salience_weight(),
        }
    }
}

fn default_tf_weight() -> f64 {
    0.6
}
fn default_rarity_weight() -> f64 {
    0.25
}
fn default_salience_weight() -> f64 {
    0.15
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    /// Worker threads used to extract the documents of one record.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Set to false to fail image-only documents instead of running OCR.
    #[serde(default = "default_true")]
    pub ocr: bool,
    #[serde(default = "default_pdftoppm")]
    pub pdftoppm: PathBuf,
    #[serde(default = "default_tesseract")]
    pub tesseract: PathBuf,
    #[serde(default = "default_ocr_language")]
    pub ocr_language: String,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    /// Upper bound on an uploaded file's size.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            ocr: true,
            pdftoppm: default_pdftoppm(),
            tesseract: default_tesseract(),
            ocr_language: default_ocr_language(),
            dpi: default_dpi(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}
fn default_true() -> bool {
    true
}
fn default_pdftoppm() -> PathBuf {
    PathBuf::from("pdftoppm")
}
fn default_tesseract() -> PathBuf {
    PathBuf::from("tesseract")
}
fn default_ocr_language() -> String {
    "eng".to_string()
}
fn default_dpi() -> u32 {
    300
}
fn default_max_file_bytes() -> usize {
    50 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_top")]
    pub default_top: usize,
    #[serde(default = "default_max_query_terms")]
    pub max_query_terms: usize,
    /// Sentences kept by the extractive summary fallback.
    #[serde(default = "default_summary_sentences")]
    pub summary_sentences: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top: default_top(),
            max_query_terms: default_max_query_terms(),
            summary_sentences: default_summary_sentences(),
        }
    }
}

fn default_top() -> usize {
    5
}
fn default_max_query_terms() -> usize {
    10
}
fn default_summary_sentences() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// `"local"` or `"s3"`.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Directory for the local backend.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    #[serde(default)]
    pub s3: Option<S3StorageConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            root: default_storage_root(),
            s3: None,
        }
    }
}

fn default_backend() -> String {
    "local".to_string()
}
fn default_storage_root() -> PathBuf {
    PathBuf::from("./data/objects")
}

#[derive(Debug, Deserialize, Clone)]
pub struct S3StorageConfig {
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, LocalStack).
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: default_base_url(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    60
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

impl Config {
    /// Configuration used by tests and by commands run without a config file.
    pub fn minimal(db_path: PathBuf) -> Self {
        Self {
            db: DbConfig { path: db_path },
            keywords: KeywordsConfig::default(),
            extraction: ExtractionConfig::default(),
            search: SearchConfig::default(),
            storage: StorageConfig::default(),
            generation: GenerationConfig::default(),
            server: ServerConfig {
                bind: "127.0.0.1:5000".to_string(),
            },
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate keywords
    if config.keywords.cap == 0 {
        anyhow::bail!("keywords.cap must be > 0");
    }
    if config.keywords.min_term_len == 0 {
        anyhow::bail!("keywords.min_term_len must be > 0");
    }
    if config.keywords.window < 2 {
        anyhow::bail!("keywords.window must be >= 2");
    }
    let w = config.keywords.weights;
    if [w.frequency, w.rarity, w.salience].iter().any(|x| *x < 0.0) {
        anyhow::bail!("keywords.weights must be non-negative");
    }

    // Validate extraction
    if config.extraction.concurrency == 0 {
        anyhow::bail!("extraction.concurrency must be > 0");
    }
    if config.extraction.dpi == 0 {
        anyhow::bail!("extraction.dpi must be > 0");
    }

    // Validate search
    if config.search.default_top == 0 {
        anyhow::bail!("search.default_top must be >= 1");
    }
    if config.search.max_query_terms == 0 {
        anyhow::bail!("search.max_query_terms must be >= 1");
    }

    // Validate storage
    match config.storage.backend.as_str() {
        "local" => {}
        "s3" => {
            if config.storage.s3.is_none() {
                anyhow::bail!("storage.s3 must be configured when backend is 's3'");
            }
        }
        other => anyhow::bail!(
            "Unknown storage backend: '{}'. Must be local or s3.",
            other
        ),
    }

    // Validate generation
    match config.generation.provider.as_str() {
        "disabled" => {}
        "openai" => {
            if config.generation.model.is_none() {
                anyhow::bail!(
                    "generation.model must be specified when provider is '{}'",
                    config.generation.provider
                );
            }
        }
        other => anyhow::bail!(
            "Unknown generation provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    Ok(())
}
