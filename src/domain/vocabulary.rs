// ============================================================
// Layer 3 — Vocabulary
// ============================================================
// A bounded, frequency-ranked mapping between token strings
// and dense integer ids.
//
// Build rules:
//   1. Count every token over the whole corpus
//   2. Drop tokens seen fewer than `rare_threshold` times
//   3. Rank the rest by descending count; equal counts keep
//      the order in which the tokens were first seen
//   4. Keep the top `max_size` and number them 0..k
//   5. Id k is reserved for "unknown"
//
// Example with max_size=2, rare_threshold=0:
//   tokens: a b b c c
//   counts: a=1 b=2 c=2
//   ids:    b=0 c=1 <unk>=2   (a is unknown)
//
// The vocabulary is immutable once built. It is passed by
// reference to everything that needs token → id translation.
//
// Reference: Rust Book §8 (Hash Maps)

use std::collections::HashMap;

use crate::domain::error::VocabError;

pub const DEFAULT_SIZE: usize = 10_000;
pub const DEFAULT_RARE_THRESHOLD: u64 = 0;

/// Printable name for the reserved unknown id.
pub const UNKNOWN_TOKEN: &str = "<unk>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    /// Retained tokens, indexed by id
    tokens: Vec<String>,
    /// Corpus counts, parallel to `tokens`
    counts: Vec<u64>,
    ids:    HashMap<String, u32>,
}

impl Vocabulary {
    /// Build a vocabulary from a full pass over the corpus tokens.
    pub fn build<I, S>(
        tokens:         I,
        max_size:       usize,
        rare_threshold: u64,
    ) -> Result<Self, VocabError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // token → (count, first-seen position)
        let mut freq: HashMap<String, (u64, usize)> = HashMap::new();
        let mut seen = 0usize;

        for token in tokens {
            let entry = freq
                .entry(token.as_ref().to_string())
                .or_insert((0, seen));
            entry.0 += 1;
            seen += 1;
        }

        if seen == 0 {
            return Err(VocabError::EmptyCorpus);
        }

        let mut ranked: Vec<(String, u64, usize)> = freq
            .into_iter()
            .filter(|(_, (count, _))| *count >= rare_threshold)
            .map(|(token, (count, first))| (token, count, first))
            .collect();

        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        ranked.truncate(max_size);

        let mut vocab = Self {
            tokens: Vec::with_capacity(ranked.len()),
            counts: Vec::with_capacity(ranked.len()),
            ids:    HashMap::with_capacity(ranked.len()),
        };
        for (token, count, _) in ranked {
            vocab.ids.insert(token.clone(), vocab.tokens.len() as u32);
            vocab.tokens.push(token);
            vocab.counts.push(count);
        }

        tracing::debug!(
            "Vocabulary built: {} tokens kept out of {} seen",
            vocab.tokens.len(),
            seen
        );
        Ok(vocab)
    }

    /// Rebuild a vocabulary from `(token, count)` pairs already in id order.
    /// Fails on duplicate tokens.
    pub(crate) fn from_entries<I>(entries: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (String, u64)>,
    {
        let mut tokens = Vec::new();
        let mut counts = Vec::new();
        let mut ids    = HashMap::new();

        for (token, count) in entries {
            let id = tokens.len() as u32;
            if ids.insert(token.clone(), id).is_some() {
                return Err(format!("duplicate token '{token}'"));
            }
            tokens.push(token);
            counts.push(count);
        }

        Ok(Self { tokens, counts, ids })
    }

    /// Map a token sequence to ids; anything outside the
    /// vocabulary becomes `unknown_id()`.
    pub fn to_ids<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<u32> {
        tokens.iter().map(|t| self.id_of(t.as_ref())).collect()
    }

    /// Id of a single token, or the unknown id
    pub fn id_of(&self, token: &str) -> u32 {
        self.ids.get(token).copied().unwrap_or_else(|| self.unknown_id())
    }

    /// Token for an id. The unknown id maps to `UNKNOWN_TOKEN`.
    pub fn token_of(&self, id: u32) -> Option<&str> {
        if id == self.unknown_id() {
            return Some(UNKNOWN_TOKEN);
        }
        self.tokens.get(id as usize).map(String::as_str)
    }

    /// Corpus count of a retained token
    pub fn frequency(&self, token: &str) -> Option<u64> {
        self.ids.get(token).map(|&id| self.counts[id as usize])
    }

    pub fn contains(&self, token: &str) -> bool {
        self.ids.contains_key(token)
    }

    /// The reserved id, one past the last retained token
    pub fn unknown_id(&self) -> u32 {
        self.tokens.len() as u32
    }

    /// Number of ids including the unknown id. This is the
    /// width of the model's output layer.
    pub fn size(&self) -> usize {
        self.tokens.len() + 1
    }

    /// `(token, count)` pairs in id order, without the unknown id.
    pub fn entries(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.tokens
            .iter()
            .zip(self.counts.iter())
            .map(|(t, &c)| (t.as_str(), c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_cat_dog_example() {
        let corpus = words("the cat sat the dog ran");
        let v      = Vocabulary::build(&corpus, 10, 0).unwrap();

        assert_eq!(v.size(), 6);
        for t in ["the", "cat", "sat", "dog", "ran"] {
            assert!(v.contains(t), "missing {t}");
        }
        // "the" is the only repeated token
        assert_eq!(v.id_of("the"), 0);
        assert_eq!(v.unknown_id(), 5);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let v = Vocabulary::build(&words("a b b c c"), 10, 0).unwrap();
        assert_eq!(v.id_of("b"), 0);
        assert_eq!(v.id_of("c"), 1);
        assert_eq!(v.id_of("a"), 2);
    }

    #[test]
    fn test_max_size_truncates() {
        let v = Vocabulary::build(&words("a b b c c"), 2, 0).unwrap();
        assert_eq!(v.size(), 3);
        assert_eq!(v.id_of("a"), v.unknown_id());
        assert_eq!(v.token_of(v.unknown_id()), Some(UNKNOWN_TOKEN));
    }

    #[test]
    fn test_rare_threshold_maps_to_unknown() {
        let v = Vocabulary::build(&words("a b b c c c"), 10, 2).unwrap();
        assert!(!v.contains("a"));
        assert_eq!(v.frequency("c"), Some(3));
        assert_eq!(v.to_ids(&["a", "c", "zzz"]), vec![2, 0, 2]);
    }

    #[test]
    fn test_build_is_deterministic() {
        let corpus = words("x y z x y q r s t x");
        let a = Vocabulary::build(&corpus, 4, 0).unwrap();
        let b = Vocabulary::build(&corpus, 4, 0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_corpus_is_an_error() {
        let empty: Vec<String> = Vec::new();
        let err = Vocabulary::build(&empty, 10, 0).unwrap_err();
        assert!(matches!(err, VocabError::EmptyCorpus));
    }

    #[test]
    fn test_everything_rare_leaves_only_unknown() {
        let v = Vocabulary::build(&words("a b c"), 10, 5).unwrap();
        assert_eq!(v.size(), 1);
        assert_eq!(v.to_ids(&["a"]), vec![0]);
    }
}
