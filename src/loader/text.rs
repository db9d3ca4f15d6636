use std::fs;
use std::path::Path;

use super::{ExtractedUnit, LoadError};

/// Read a file as UTF-8 text. A leading byte-order mark is dropped.
pub fn extract_text(path: &Path) -> Result<Vec<ExtractedUnit>, LoadError> {
    let bytes = fs::read(path)?;
    let text = String::from_utf8(bytes).map_err(|e| LoadError::Encoding(e.utf8_error()))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    Ok(vec![ExtractedUnit::whole(text.to_string())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_reads_utf8() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("syllabus.txt");
        fs::write(&path, "\u{feff}Week 1: Introduction").unwrap();

        let units = extract_text(&path).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].text, "Week 1: Introduction");
        assert_eq!(units[0].page, None);
    }

    #[test]
    fn test_rejects_binary() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("image.png");
        fs::write(&path, [0x89, 0x50, 0x4e, 0x47, 0xff, 0xfe, 0x00]).unwrap();

        let err = extract_text(&path).unwrap_err();
        assert_eq!(err.category(), "encoding");
    }
}
