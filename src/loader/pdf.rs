use std::path::Path;

use lopdf::Document;
use tracing::debug;

use super::{ExtractedUnit, LoadError};

/// Extract text from a PDF, one unit per page.
///
/// Pages whose text cannot be decoded are skipped; a file that cannot be
/// opened as a PDF at all is an error.
pub fn extract_pdf(path: &Path) -> Result<Vec<ExtractedUnit>, LoadError> {
    let doc = Document::load(path).map_err(|e| LoadError::Pdf(e.to_string()))?;
    if doc.is_encrypted() {
        return Err(LoadError::Pdf("document is encrypted".to_string()));
    }

    let pages = doc.get_pages();
    let mut units = Vec::with_capacity(pages.len());
    for &page_num in pages.keys() {
        match doc.extract_text(&[page_num]) {
            Ok(text) => units.push(ExtractedUnit::page(text, page_num)),
            Err(e) => debug!("Skipping page {page_num} of {}: {e}", path.display()),
        }
    }

    debug!("Extracted {} pages from {}", units.len(), path.display());
    Ok(units)
}
