// ============================================================
// Layer 3 — Document and Corpus Domain Types
// ============================================================
// A `Document` is what a loader hands us: a source name and
// its raw text. After tokenisation and vocabulary lookup it
// becomes an `EncodedDocument` inside a `Corpus`.
//
// The position of a document inside the corpus is its id.
// The document-embedding table is sized to `Corpus::len()`
// when a model is built, so the corpus must not change for
// the lifetime of that model.
//
// Reference: Rust Book §5 (Structs and Methods)

use serde::{Deserialize, Serialize};

use crate::domain::vocabulary::Vocabulary;

/// A raw document loaded from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// The file name the document came from
    pub source: String,

    /// The full extracted text content, before cleaning
    pub text: String,
}

impl Document {
    /// Create a new Document with a source name and text content.
    ///
    /// Example:
    ///   let doc = Document::new("cats.txt", "the cat sat");
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text:   text.into(),
        }
    }
}

/// One document after vocabulary lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedDocument {
    /// Dense document id, equal to the row in the doc-embedding table
    pub id: usize,

    /// Where the document came from, kept for the embedding export
    pub source: String,

    /// Token ids with unknown tokens already substituted
    pub token_ids: Vec<u32>,
}

/// All documents of one training or inference run, in id order.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<EncodedDocument>,
}

impl Corpus {
    /// Encode `(source, tokens)` pairs against a vocabulary.
    /// Ids are assigned in iteration order.
    pub fn encode<'a, I>(tokens_by_doc: I, vocab: &Vocabulary) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a Vec<String>)>,
    {
        let documents = tokens_by_doc
            .into_iter()
            .enumerate()
            .map(|(id, (source, tokens))| EncodedDocument {
                id,
                source:    source.clone(),
                token_ids: vocab.to_ids(tokens),
            })
            .collect();
        Self { documents }
    }

    /// Build a corpus straight from id sequences; sources are
    /// named after the document index.
    pub fn from_token_ids(docs: Vec<Vec<u32>>) -> Self {
        let documents = docs
            .into_iter()
            .enumerate()
            .map(|(id, token_ids)| EncodedDocument {
                id,
                source: format!("doc{id}"),
                token_ids,
            })
            .collect();
        Self { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&EncodedDocument> {
        self.documents.get(id)
    }

    pub fn documents(&self) -> &[EncodedDocument] {
        &self.documents
    }

    /// Source names in id order.
    pub fn sources(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.source.clone()).collect()
    }

    /// Total number of tokens across all documents
    pub fn token_count(&self) -> usize {
        self.documents.iter().map(|d| d.token_ids.len()).sum()
    }
}
