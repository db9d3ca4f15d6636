/// Splits extracted text into overlapping, size-bounded chunks.
///
/// Sizes are counted in `char`s. Each chunk ends on the best natural break
/// found near the end of its window, and the next chunk starts exactly
/// `chunk_overlap` characters before that end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    /// `chunk_overlap` is clamped below `chunk_size` so every step advances.
    #[must_use]
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    /// Split `text` into chunks. Whitespace-only text yields nothing.
    #[must_use]
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        if total <= self.chunk_size {
            return vec![text.to_string()];
        }

        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let window_end = (start + self.chunk_size).min(total);
            let end = if window_end == total {
                total
            } else {
                self.find_break(&chars, start, window_end)
            };

            chunks.push(chars[start..end].iter().collect());

            if end >= total {
                break;
            }
            start = end - self.chunk_overlap;
        }

        chunks
    }

    /// Pick the end of the chunk starting at `start`.
    ///
    /// Candidates lie in the last fifth of the window and always leave more
    /// than `chunk_overlap` characters in the chunk.
    fn find_break(&self, chars: &[char], start: usize, window_end: usize) -> usize {
        let min_end = start + self.chunk_overlap + 1;
        let search_from = window_end
            .saturating_sub(self.chunk_size / 5)
            .max(min_end);
        if search_from > window_end {
            return window_end;
        }

        // Paragraph break
        for i in (search_from..=window_end).rev() {
            if i >= start + 2 && chars[i - 1] == '\n' && chars[i - 2] == '\n' {
                return i;
            }
        }

        // Line break
        for i in (search_from..=window_end).rev() {
            if chars[i - 1] == '\n' {
                return i;
            }
        }

        // Sentence end followed by whitespace
        for i in (search_from..=window_end).rev() {
            let r = chars[i - 1];
            if matches!(r, '.' | '!' | '?' | '。') && i < chars.len() && chars[i].is_whitespace()
            {
                return i;
            }
        }

        // Any whitespace
        for i in (search_from..=window_end).rev() {
            if chars[i - 1].is_whitespace() {
                return i;
            }
        }

        window_end
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(1000, 200)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_exact_overlap(chunks: &[String], overlap: usize) {
        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].chars().collect();
            let next: Vec<char> = pair[1].chars().collect();
            let tail: String = prev[prev.len() - overlap..].iter().collect();
            let head: String = next[..overlap].iter().collect();
            assert_eq!(tail, head, "neighbouring chunks must share {overlap} chars");
        }
    }

    #[test]
    fn test_split_short_text() {
        let content = "Paragraph 1\n\nParagraph 2\n\nParagraph 3";
        let chunks = TextSplitter::default().split(content);
        assert_eq!(chunks, vec![content.to_string()]);
    }

    #[test]
    fn test_split_empty_text() {
        assert!(TextSplitter::default().split("").is_empty());
    }

    #[test]
    fn test_whitespace_only() {
        assert!(TextSplitter::default().split("   \n\n   \n\n   ").is_empty());
    }

    #[test]
    fn test_hard_cuts_without_breaks() {
        let text = "x".repeat(2500);
        let chunks = TextSplitter::new(1000, 200).split(&text);
        let lens: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
        assert_eq!(lens, vec![1000, 1000, 900]);
        assert_exact_overlap(&chunks, 200);
    }

    #[test]
    fn test_split_long_text() {
        let para = "Test paragraph about cell biology. ".repeat(50);
        let content = vec![para; 10].join("\n\n");
        let splitter = TextSplitter::new(1000, 200);
        let chunks = splitter.split(&content);

        assert!(chunks.len() >= 2);
        for (i, chunk) in chunks.iter().enumerate() {
            assert!(!chunk.trim().is_empty(), "Chunk {} is empty", i);
            assert!(chunk.chars().count() <= 1000, "Chunk {} too long", i);
        }
        assert_exact_overlap(&chunks, 200);
    }

    #[test]
    fn test_prefers_paragraph_break() {
        let first = "a".repeat(90);
        let second = "b".repeat(90);
        let text = format!("{first}\n\n{second}");
        let chunks = TextSplitter::new(100, 10).split(&text);
        assert!(chunks[0].ends_with("\n\n"));
        assert_eq!(chunks[0].chars().count(), 92);
        assert_exact_overlap(&chunks, 10);
    }

    #[test]
    fn test_covers_whole_text() {
        let text = "Word ".repeat(700);
        let splitter = TextSplitter::new(300, 50);
        let chunks = splitter.split(&text);

        let mut rebuilt: String = chunks[0].clone();
        for c in &chunks[1..] {
            rebuilt.extend(c.chars().skip(50));
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_split_japanese() {
        let text = "これは日本語のテストです。".repeat(200);
        let chunks = TextSplitter::new(500, 100).split(&text);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 500);
        }
        assert_exact_overlap(&chunks, 100);
    }

    #[test]
    fn test_overlap_clamped() {
        let chunks = TextSplitter::new(10, 50).split(&"y".repeat(30));
        assert_eq!(chunks.len(), 21);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_exact_overlap(&chunks, 9);
    }

    #[test]
    fn test_zero_overlap() {
        let chunks = TextSplitter::new(10, 0).split(&"z".repeat(25));
        let lens: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(lens, vec![10, 10, 5]);
    }
}
