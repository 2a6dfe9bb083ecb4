use std::collections::{HashMap, HashSet};
use std::path::Path;

use glyphmatch_core::{Lexicon, OcrError, Result};

/// Lowercase word list indexed by character length.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    words: HashSet<String>,
    by_len: HashMap<usize, Vec<String>>,
}

impl Dictionary {
    /// Words are trimmed and lowercased; blanks and duplicates are dropped.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dict = Self::default();
        for word in words {
            let word = word.as_ref().trim().to_lowercase();
            if word.is_empty() || dict.words.contains(&word) {
                continue;
            }
            dict.by_len
                .entry(word.chars().count())
                .or_default()
                .push(word.clone());
            dict.words.insert(word);
        }
        for bucket in dict.by_len.values_mut() {
            bucket.sort_unstable();
        }
        dict
    }

    /// Load a word list with one word per line.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let dict = Self::from_words(text.lines());
        if dict.words.is_empty() {
            return Err(OcrError::Dictionary(format!(
                "{} contains no words",
                path.display()
            )));
        }
        tracing::info!(path = %path.display(), words = dict.len(), "loaded dictionary");
        Ok(dict)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }
}

impl Lexicon for Dictionary {
    fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    fn words_with_len(&self, len: usize) -> &[String] {
        self.by_len.get(&len).map(Vec::as_slice).unwrap_or(&[])
    }

    fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_and_indexes() {
        let d = Dictionary::from_words(["Hello", " world ", "", "hello", "héllo"]);
        assert_eq!(d.len(), 3);
        assert!(d.contains("hello"));
        assert!(!d.contains("Hello"));
        assert_eq!(d.words_with_len(5), &["hello", "héllo", "world"]);
        assert!(d.words_with_len(9).is_empty());
    }

    #[test]
    fn load_reads_lines() {
        let path = std::env::temp_dir().join(format!("glyphmatch-dict-{}.txt", std::process::id()));
        std::fs::write(&path, "alpha\nbeta\n\ngamma\n").unwrap();
        let d = Dictionary::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(d.len(), 3);
        assert!(d.contains("beta"));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = Dictionary::load("/nonexistent/words.txt").unwrap_err();
        assert!(matches!(err, OcrError::Io(_)));
    }
}
