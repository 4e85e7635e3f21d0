// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for one run:
//
//   train: learn word and document embeddings from a corpus
//   infer: learn document embeddings for new documents with
//          the word-level layers of a trained model frozen
//
// Rules for this layer:
//   - No model math here (Layer 5)
//   - No printing here (Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow
pub mod train_use_case;

// The inference workflow
pub mod infer_use_case;
