//! OCR for image-only PDFs.
//!
//! The production backend shells out to Poppler and Tesseract:
//!
//! 1. `pdftoppm -r <dpi> -png <file.pdf> <dir>/page` rasterizes every page.
//! 2. `tesseract <page.png> stdout -l <lang>` recognizes each image.
//!
//! Page texts are returned in page order with newlines collapsed to spaces.
//! A missing binary is reported as [`OcrError::Unavailable`] rather than an
//! I/O failure so callers can tell "OCR is not installed" from "this file
//! is broken".

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::config::ExtractionConfig;

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR engine unavailable: {0}")]
    Unavailable(String),
    #[error("document could not be rasterized: {0}")]
    MalformedDocument(String),
    #[error("recognition failed on page {page}: {message}")]
    Recognition { page: usize, message: String },
    #[error("OCR I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Recognizes the text of every page of a PDF.
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Text of all `page_count` pages, concatenated in page order.
    fn recognize(&self, pdf: &[u8], page_count: usize) -> Result<String, OcrError>;
}

/// Poppler + Tesseract command-line backend.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    pdftoppm: PathBuf,
    tesseract: PathBuf,
    language: String,
    dpi: u32,
}

impl TesseractOcr {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            pdftoppm: config.pdftoppm.clone(),
            tesseract: config.tesseract.clone(),
            language: config.ocr_language.clone(),
            dpi: config.dpi,
        }
    }

    fn rasterize(&self, pdf_path: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
        let output = run(
            Command::new(&self.pdftoppm)
                .arg("-r")
                .arg(self.dpi.to_string())
                .arg("-png")
                .arg(pdf_path)
                .arg(out_dir.join("page")),
            &self.pdftoppm,
        )?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::MalformedDocument(stderr.trim().to_string()));
        }

        let mut pages: Vec<(u32, PathBuf)> = std::fs::read_dir(out_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter_map(|path| page_number(&path).map(|n| (n, path)))
            .collect();
        pages.sort_by_key(|(n, _)| *n);
        Ok(pages.into_iter().map(|(_, p)| p).collect())
    }

    fn recognize_image(&self, image: &Path, page: usize) -> Result<String, OcrError> {
        let output = run(
            Command::new(&self.tesseract)
                .arg(image)
                .arg("stdout")
                .arg("-l")
                .arg(&self.language),
            &self.tesseract,
        )?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Recognition {
                page,
                message: stderr.trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl OcrEngine for TesseractOcr {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, pdf: &[u8], page_count: usize) -> Result<String, OcrError> {
        let workdir = tempfile::tempdir()?;
        let pdf_path = workdir.path().join("input.pdf");
        std::fs::write(&pdf_path, pdf)?;

        let images = self.rasterize(&pdf_path, workdir.path())?;
        if images.len() != page_count {
            tracing::warn!(
                expected = page_count,
                rasterized = images.len(),
                "page count mismatch during rasterization"
            );
        }
        if images.is_empty() {
            return Err(OcrError::MalformedDocument(
                "rasterization produced no pages".to_string(),
            ));
        }

        let mut text = String::new();
        for (i, image) in images.iter().enumerate() {
            let page = self.recognize_image(image, i + 1)?;
            text.push_str(&collapse_newlines(&page));
        }
        tracing::debug!(pages = images.len(), chars = text.len(), "OCR complete");
        Ok(text)
    }
}

/// Engine used when `extraction.ocr = false`: every request is unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledOcr;

impl OcrEngine for DisabledOcr {
    fn name(&self) -> &str {
        "disabled"
    }

    fn recognize(&self, _pdf: &[u8], _page_count: usize) -> Result<String, OcrError> {
        Err(OcrError::Unavailable("OCR disabled in configuration".to_string()))
    }
}

/// Build the engine selected by `[extraction]`.
pub fn create_ocr_engine(config: &ExtractionConfig) -> Box<dyn OcrEngine> {
    if config.ocr {
        Box::new(TesseractOcr::from_config(config))
    } else {
        Box::new(DisabledOcr)
    }
}

/// Replace every line break with a single space.
pub fn collapse_newlines(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

fn run(cmd: &mut Command, program: &Path) -> Result<Output, OcrError> {
    cmd.output().map_err(|e| match e.kind() {
        ErrorKind::NotFound => OcrError::Unavailable(format!(
            "'{}' not found. Is it installed?",
            program.display()
        )),
        _ => OcrError::Io(e),
    })
}

/// `page-7.png` or `page-007.png` to 7.
fn page_number(path: &Path) -> Option<u32> {
    if path.extension()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix("page-")?.parse().ok()
}
