// ============================================================
// Layer 4 — Sample Batcher
// ============================================================
// Groups the sample stream into fixed-size batches in the flat
// layout the model turns into tensors.
//
// How batching works here:
//   Input:  N samples pulled in stream order
//   Output: flat row-major arrays
//
//   DM:   contexts [N, 2w]   doc_ids [N]   targets [N]
//   DBOW:                    doc_ids [N]   targets [N]
//
//   contexts = [s1_c1, s1_c2, ..., s1_c2w, s2_c1, ..., sN_c2w]
//
// The batcher never decides when to stop: the stream under it
// is infinite and the training loop only pulls as many batches
// as its step budget allows. A finite source that runs out
// mid-batch has its partial tail dropped.
//
// Reference: Rust Book §13 (Iterators)

use crate::domain::sample::{DbowSample, DmSample};

/// Stacks a group of samples into one batch.
pub trait Collate: Sized {
    type Batch;

    fn collate(samples: Vec<Self>) -> Self::Batch;
}

// ─── DmBatch ──────────────────────────────────────────────────────────────────
/// A batch of DM samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmBatch {
    /// Context ids, shape: [batch_size, context_len]
    pub contexts: Vec<u32>,

    /// Width of every context row (2 × window size)
    pub context_len: usize,

    /// Owning document of each row, shape: [batch_size]
    pub doc_ids: Vec<u32>,

    /// Word to predict for each row, shape: [batch_size]
    pub targets: Vec<u32>,
}

impl DmBatch {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl Collate for DmSample {
    type Batch = DmBatch;

    fn collate(samples: Vec<Self>) -> DmBatch {
        let context_len = samples.first().map_or(0, |s| s.context.len());
        let mut batch = DmBatch {
            contexts: Vec::with_capacity(samples.len() * context_len),
            context_len,
            doc_ids:  Vec::with_capacity(samples.len()),
            targets:  Vec::with_capacity(samples.len()),
        };
        for s in samples {
            batch.contexts.extend_from_slice(&s.context);
            batch.doc_ids.push(s.doc_id);
            batch.targets.push(s.target);
        }
        batch
    }
}

// ─── DbowBatch ────────────────────────────────────────────────────────────────
/// A batch of DBOW samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbowBatch {
    /// Document of each row, shape: [batch_size]
    pub doc_ids: Vec<u32>,

    /// Word to predict for each row, shape: [batch_size]
    pub targets: Vec<u32>,
}

impl DbowBatch {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl Collate for DbowSample {
    type Batch = DbowBatch;

    fn collate(samples: Vec<Self>) -> DbowBatch {
        let (doc_ids, targets) = samples.into_iter().map(|s| (s.doc_id, s.target)).unzip();
        DbowBatch { doc_ids, targets }
    }
}

// ─── Batcher ──────────────────────────────────────────────────────────────────
/// Iterator adaptor turning a sample stream into batches.
pub struct Batcher<I> {
    samples:    I,
    batch_size: usize,
}

impl<I> Batcher<I> {
    /// # Panics
    /// Panics if `batch_size` is zero.
    pub fn new(samples: I, batch_size: usize) -> Self {
        assert!(batch_size > 0, "batch_size must be at least 1");
        Self { samples, batch_size }
    }
}

impl<I, S> Iterator for Batcher<I>
where
    I: Iterator<Item = S>,
    S: Collate,
{
    type Item = S::Batch;

    fn next(&mut self) -> Option<S::Batch> {
        let items: Vec<S> = self.samples.by_ref().take(self.batch_size).collect();
        if items.len() < self.batch_size {
            if !items.is_empty() {
                tracing::debug!(
                    "Dropping partial batch of {} samples at end of stream",
                    items.len()
                );
            }
            return None;
        }
        Some(S::collate(items))
    }
}
