//! Source discovery and document loaders.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::traits::DocumentLoader;
use crate::types::{Document, PageText};

/// Plain text and markdown files, read as a single unnumbered page.
#[derive(Debug, Clone)]
pub struct TextLoader {
    extensions: Vec<String>,
}

impl Default for TextLoader {
    fn default() -> Self {
        Self { extensions: vec!["txt".into(), "md".into()] }
    }
}

impl TextLoader {
    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
        }
    }
}

impl DocumentLoader for TextLoader {
    fn supports(&self, path: &Path) -> bool {
        has_extension(path, &self.extensions)
    }

    fn load(&self, path: &Path) -> Result<Document> {
        let content = self.read_file_content(path).with_context(|| format!("reading {}", path.display()))?;
        Ok(Document::single_page(path.to_string_lossy(), title_of(path), content))
    }
}

/// PDF text extraction through poppler's `pdftotext`, one page per form feed.
#[derive(Debug, Clone)]
pub struct PdfLoader {
    binary: String,
}

impl Default for PdfLoader {
    fn default() -> Self {
        Self::new("pdftotext")
    }
}

impl PdfLoader {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

impl DocumentLoader for PdfLoader {
    fn supports(&self, path: &Path) -> bool {
        has_extension(path, &["pdf".to_string()])
    }

    fn load(&self, path: &Path) -> Result<Document> {
        let output = Command::new(&self.binary)
            .arg("-layout")
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .output()
            .with_context(|| format!("running {} (is poppler installed?)", self.binary))?;
        if !output.status.success() {
            return Err(anyhow!(
                "{} failed on {}: {}",
                self.binary,
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        let text = String::from_utf8_lossy(&output.stdout);
        Ok(Document { id: path.to_string_lossy().to_string(), title: title_of(path), pages: split_pages(&text) })
    }
}

/// Split `pdftotext` output on form feeds. Page numbers stay 0-based and keep
/// their position even when blank pages are dropped.
pub fn split_pages(text: &str) -> Vec<PageText> {
    text.split('\u{c}')
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(i, page)| PageText { number: Some(i as u32), text: page.to_string() })
        .collect()
}

pub fn default_loaders(pdftotext: &str) -> Vec<Box<dyn DocumentLoader>> {
    vec![Box::new(PdfLoader::new(pdftotext)), Box::new(TextLoader::default())]
}

/// Every file under `root` whose extension is in `extensions`, sorted by path.
pub fn collect_sources(root: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| has_extension(p, extensions))
        .collect();
    files.sort();
    files
}

/// Load every path with the first loader that supports it.
///
/// Missing files, unsupported files, failed extractions and blank documents
/// are logged and skipped; an empty result is not an error.
pub fn load_documents(paths: &[PathBuf], loaders: &[Box<dyn DocumentLoader>]) -> Vec<Document> {
    let mut docs = Vec::new();
    for (i, path) in paths.iter().enumerate() {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "source file not found");
            continue;
        }
        let Some(loader) = loaders.iter().find(|l| l.supports(path)) else {
            tracing::warn!(path = %path.display(), "no loader for file type");
            continue;
        };
        tracing::info!("Loading {}/{}: {}", i + 1, paths.len(), path.display());
        match loader.load(path) {
            Ok(doc) if doc.is_blank() => tracing::warn!(path = %path.display(), "no text extracted"),
            Ok(doc) => docs.push(doc),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to load document"),
        }
    }
    docs
}

fn has_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.as_ref().eq_ignore_ascii_case(ext)))
}

fn title_of(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_else(|| path.to_string_lossy().to_string())
}
