// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Cleans raw document text and splits it into word tokens.
//
// Cleaning:
//   - tabs, non-breaking / zero-width spaces and BOMs → space
//   - \r → \n
//   - other control characters → space
//
// Tokenising:
//   - split on whitespace
//   - lower-case
//   - strip punctuation from both ends of each word
//   - drop anything left empty
//
// Example:
//   "The cat sat, \"happily\"."  →  [the, cat, sat, happily]
//
// Reference: Rust Book §8 (Strings in Rust)

#[derive(Debug, Clone, Default)]
pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Normalise odd whitespace and control characters.
    pub fn clean(&self, text: &str) -> String {
        text.chars()
            .map(|c| match c {
                '\t' | '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
                '\r' => '\n',
                c if c.is_control() && c != '\n' => ' ',
                c => c,
            })
            .collect()
    }

    /// Clean `text` and split it into word tokens.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.clean(text)
            .split_whitespace()
            .filter_map(|word| {
                let word = word.trim_matches(|c: char| !c.is_alphanumeric());
                if word.is_empty() {
                    None
                } else {
                    Some(word.to_lowercase())
                }
            })
            .collect()
    }
}
