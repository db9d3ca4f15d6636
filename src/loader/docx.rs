use std::fs;
use std::path::Path;

use docx_rs::{DocumentChild, ParagraphChild, RunChild};

use super::{ExtractedUnit, LoadError};

/// Extract body paragraphs from a Word document, joined by blank lines.
///
/// Only the OOXML format is readable; legacy binary `.doc` files fail here
/// and surface as a parse warning.
pub fn extract_docx(path: &Path) -> Result<Vec<ExtractedUnit>, LoadError> {
    let bytes = fs::read(path)?;
    let docx = docx_rs::read_docx(&bytes).map_err(|e| LoadError::Docx(e.to_string()))?;

    let mut paragraphs = Vec::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(paragraph) = child {
            let mut text = String::new();
            for pc in &paragraph.children {
                if let ParagraphChild::Run(run) = pc {
                    for rc in &run.children {
                        match rc {
                            RunChild::Text(t) => text.push_str(&t.text),
                            RunChild::Tab(_) => text.push('\t'),
                            RunChild::Break(_) => text.push('\n'),
                            _ => {}
                        }
                    }
                }
            }
            if !text.trim().is_empty() {
                paragraphs.push(text);
            }
        }
    }

    Ok(vec![ExtractedUnit::whole(paragraphs.join("\n\n"))])
}
