// ============================================================
// Layer 4 — Window Sample Generators
// ============================================================
// Turns an encoded corpus into an endless, lazy stream of
// training samples.
//
// DM (window_size = w):
//   Slide over each document; every position with w tokens on
//   both sides becomes a centre. A document of length L gives
//   max(0, L - 2w) samples.
//
//   doc:     the  cat  sat  on  mats
//   w = 1:   centres are cat, sat, on
//   first:   context=[the, sat]  target=cat
//
// DBOW:
//   Every position is a target and only the document id is
//   the input. A document of length L gives L samples.
//
// Restarting:
//   When the last document is used up the stream goes back to
//   document 0 and counts a completed pass. `restart()` does the
//   same thing on demand. If an entire pass produced nothing the
//   stream ends, so a corpus of too-short documents cannot spin.
//
// Reference: Rust Book §13 (Iterators)

use std::ops::Range;

use crate::domain::document::Corpus;
use crate::domain::sample::{DbowSample, DmSample};

/// How a variant turns one document into samples.
pub trait WindowScheme {
    type Sample;

    /// Target positions available in a document of length `len`
    fn positions(&self, len: usize) -> Range<usize>;

    /// The sample centred on `pos` in document `doc_id`
    fn sample(&self, doc_id: usize, tokens: &[u32], pos: usize) -> Self::Sample;
}

// ─── DM ───────────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy)]
pub struct DmWindow {
    pub window_size: usize,
}

impl WindowScheme for DmWindow {
    type Sample = DmSample;

    fn positions(&self, len: usize) -> Range<usize> {
        let w = self.window_size;
        if len < 2 * w + 1 {
            return 0..0;
        }
        w..len - w
    }

    fn sample(&self, doc_id: usize, tokens: &[u32], pos: usize) -> DmSample {
        let w = self.window_size;
        let mut context = Vec::with_capacity(2 * w);
        context.extend_from_slice(&tokens[pos - w..pos]);
        context.extend_from_slice(&tokens[pos + 1..=pos + w]);
        DmSample {
            context,
            doc_id: doc_id as u32,
            target: tokens[pos],
        }
    }
}

// ─── DBOW ─────────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, Default)]
pub struct DbowWindow;

impl WindowScheme for DbowWindow {
    type Sample = DbowSample;

    fn positions(&self, len: usize) -> Range<usize> {
        0..len
    }

    fn sample(&self, doc_id: usize, tokens: &[u32], pos: usize) -> DbowSample {
        DbowSample {
            doc_id: doc_id as u32,
            target: tokens[pos],
        }
    }
}

// ─── SampleStream ─────────────────────────────────────────────────────────────
/// Infinite iterator over the samples of a corpus.
pub struct SampleStream<'a, S> {
    corpus: &'a Corpus,
    scheme: S,
    /// Index of the current document
    doc: usize,
    /// Next position to emit inside the current document
    pos: usize,
    passes: usize,
    emitted_this_pass: bool,
}

pub type DmStream<'a>   = SampleStream<'a, DmWindow>;
pub type DbowStream<'a> = SampleStream<'a, DbowWindow>;

impl<'a, S: WindowScheme> SampleStream<'a, S> {
    pub fn new(corpus: &'a Corpus, scheme: S) -> Self {
        Self {
            corpus,
            scheme,
            doc: 0,
            pos: 0,
            passes: 0,
            emitted_this_pass: false,
        }
    }

    /// Go back to the first sample of the first document.
    pub fn restart(&mut self) {
        self.doc = 0;
        self.pos = 0;
        self.emitted_this_pass = false;
    }

    /// How many times the stream has wrapped around the corpus
    pub fn passes_completed(&self) -> usize {
        self.passes
    }

    /// Number of samples one full pass yields
    pub fn samples_per_pass(&self) -> usize {
        self.corpus
            .documents()
            .iter()
            .map(|d| self.scheme.positions(d.token_ids.len()).len())
            .sum()
    }
}

impl<'a> DmStream<'a> {
    pub fn dm(corpus: &'a Corpus, window_size: usize) -> Self {
        Self::new(corpus, DmWindow { window_size })
    }
}

impl<'a> DbowStream<'a> {
    pub fn dbow(corpus: &'a Corpus) -> Self {
        Self::new(corpus, DbowWindow)
    }
}

impl<'a, S: WindowScheme> Iterator for SampleStream<'a, S> {
    type Item = S::Sample;

    fn next(&mut self) -> Option<S::Sample> {
        let corpus = self.corpus;
        loop {
            let Some(doc) = corpus.get(self.doc) else {
                // End of the corpus
                if !self.emitted_this_pass {
                    return None;
                }
                self.passes += 1;
                tracing::debug!("Sample stream restarting (pass {} complete)", self.passes);
                self.restart();
                continue;
            };

            let range = self.scheme.positions(doc.token_ids.len());
            if self.pos < range.start {
                self.pos = range.start;
            }

            if self.pos < range.end {
                let sample = self.scheme.sample(doc.id, &doc.token_ids, self.pos);
                self.pos += 1;
                self.emitted_this_pass = true;
                return Some(sample);
            }

            self.doc += 1;
            self.pos = 0;
        }
    }
}
