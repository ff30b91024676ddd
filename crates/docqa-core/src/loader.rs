//! Document discovery and raw text extraction for `.pdf` and `.txt` sources.

use anyhow::{anyhow, bail, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Text,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|s| s.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("pdf") => Some(FileKind::Pdf),
            Some("txt") => Some(FileKind::Text),
            _ => None,
        }
    }
}

/// Recursively lists every `.pdf`/`.txt` file under `root`, sorted.
///
/// A missing or empty directory yields an empty list.
pub fn discover(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => { warn!(root = %root.display(), error = %e, "skipping unreadable entry"); continue; }
        };
        if !entry.file_type().is_file() { continue; }
        if FileKind::from_path(entry.path()).is_some() { files.push(entry.path().to_path_buf()); }
    }
    files.sort();
    debug!(root = %root.display(), found = files.len(), "discovered documents");
    files
}

/// Reads a source document into pages of plain text. Text files are one page.
pub fn load_pages(path: &Path) -> Result<Vec<String>> {
    match FileKind::from_path(path) {
        Some(FileKind::Text) => Ok(vec![read_text(path)?]),
        Some(FileKind::Pdf) => read_pdf(path),
        None => bail!("unsupported file type (expected .pdf or .txt)"),
    }
}

fn read_text(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
            warn!(path = %path.display(), "file is not valid UTF-8, decoding lossily");
            Ok(String::from_utf8_lossy(&fs::read(path)?).to_string())
        }
        Err(e) => Err(e.into()),
    }
}

fn read_pdf(path: &Path) -> Result<Vec<String>> {
    let doc = lopdf::Document::load(path).map_err(|e| anyhow!("cannot parse PDF: {}", e))?;
    if doc.is_encrypted() { bail!("encrypted PDFs are not supported"); }
    let mut pages = Vec::new();
    for page_number in doc.get_pages().keys() {
        let text = doc
            .extract_text(&[*page_number])
            .map_err(|e| anyhow!("cannot extract text from page {}: {}", page_number, e))?;
        pages.push(text);
    }
    Ok(pages)
}
