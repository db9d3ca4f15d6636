//! Content fingerprints for uploaded files.
//!
//! A [`Fingerprint`] is the SHA-256 digest of a file's bytes, hex encoded. It
//! depends on content only, never on the file name or timestamps, and is the
//! key the vector store deduplicates on.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Read size used while hashing. Memory use stays constant in file size.
const BLOCK_SIZE: usize = 8192;

/// Hex-encoded SHA-256 digest of a file's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hash the file at `path`, streaming it in fixed-size blocks.
    pub fn of_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        Self::of_reader(file)
    }

    /// Hash everything readable from `reader`.
    pub fn of_reader<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut hasher = Sha256::new();
        let mut block = [0u8; BLOCK_SIZE];
        loop {
            let n = match reader.read(&mut block) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&block[..n]);
        }
        Ok(Self(hex::encode(hasher.finalize())))
    }

    /// Parse a stored digest. Accepts exactly 64 hex characters.
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Self(s.to_ascii_lowercase()))
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_known_digest() {
        let fp = Fingerprint::of_reader(&b"abc"[..]).unwrap();
        assert_eq!(
            fp.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_same_content_different_names() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("week1.txt");
        let b = dir.path().join("copy of week1.md");
        fs::write(&a, "Photosynthesis converts light into chemical energy.").unwrap();
        fs::write(&b, "Photosynthesis converts light into chemical energy.").unwrap();

        assert_eq!(
            Fingerprint::of_file(&a).unwrap(),
            Fingerprint::of_file(&b).unwrap()
        );
    }

    #[test]
    fn test_single_byte_change() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let mut bytes = vec![b'a'; 3 * BLOCK_SIZE + 17];
        fs::write(&path, &bytes).unwrap();
        let before = Fingerprint::of_file(&path).unwrap();

        bytes[2 * BLOCK_SIZE + 5] = b'b';
        fs::write(&path, &bytes).unwrap();
        let after = Fingerprint::of_file(&path).unwrap();

        assert_ne!(before, after);
    }

    #[test]
    fn test_empty_file() {
        let fp = Fingerprint::of_reader(io::empty()).unwrap();
        assert_eq!(
            fp.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_from_hex() {
        let fp = Fingerprint::of_reader(&b"abc"[..]).unwrap();
        let upper = fp.as_str().to_ascii_uppercase();
        assert_eq!(Fingerprint::from_hex(&upper), Some(fp.clone()));
        assert_eq!(fp.short().len(), 12);
        assert!(Fingerprint::from_hex("abc").is_none());
        assert!(Fingerprint::from_hex(&"z".repeat(64)).is_none());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        assert!(Fingerprint::of_file(dir.path().join("nope.pdf")).is_err());
    }
}
