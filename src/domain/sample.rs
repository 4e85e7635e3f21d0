// ============================================================
// Layer 3 — Training Samples
// ============================================================
// The two sample shapes produced by the window generators.
//
//   DM:   ( [c_1 .. c_2w], doc, target )
//         context words on both sides of the target plus the
//         owning document jointly predict the target word
//
//   DBOW: ( doc, target )
//         the document alone predicts each of its words
//
// Samples are produced lazily and consumed immediately by the
// batcher; they are never persisted.

/// One distributed-memory training example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmSample {
    /// `window_size` ids left of the target followed by
    /// `window_size` ids right of it
    pub context: Vec<u32>,
    pub doc_id:  u32,
    pub target:  u32,
}

/// One distributed-bag-of-words training example.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbowSample {
    pub doc_id: u32,
    pub target: u32,
}
