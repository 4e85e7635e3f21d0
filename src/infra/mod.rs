// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting file concerns used by several layers:
//
//   checkpoint.rs
//     `{epoch}` path templates, the model config sidecar and
//     the document embeddings export.
//
//   vocab_store.rs
//     Vocabulary persistence (JSON), so inference maps tokens
//     exactly as training did.
//
//   metrics.rs
//     Per-epoch loss CSV.
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Path templates, config sidecars, embedding export
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Vocabulary save and load
pub mod vocab_store;
