/// A read-only word list used for spelling correction.
///
/// Implementations hold lowercase words. The corrector only ever asks for
/// membership and for the words of a given character length.
pub trait Lexicon: Send + Sync {
    /// Whether `word` (already lowercased) is a known word.
    fn contains(&self, word: &str) -> bool;

    /// All known words with exactly `len` characters.
    fn words_with_len(&self, len: usize) -> &[String];

    fn is_empty(&self) -> bool;
}
