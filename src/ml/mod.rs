// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn specific code lives here; the data layer hands over
// plain Vec batches and never touches tensors.
//
//   model.rs
//     DM and DBOW networks, the Doc2VecModel wrapper
//     implementing EmbeddingModel, and the Doc2VecConfig sidecar.
//
//   trainer.rs
//     The epoch loop: mean step loss, early stopping,
//     periodic and final saves. Generic over EmbeddingModel.
//
//   inferencer.rs
//     Seeds a fresh model from a trained one, freezes the
//     word-level layers and reuses the training loop for the
//     doc embeddings.
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Le & Mikolov (2014) Distributed Representations
//            of Sentences and Documents

/// Doc2Vec network topologies and model wrapper
pub mod model;

/// Training loop with early stopping and checkpointing
pub mod trainer;

/// Inference controller: seed, freeze, train doc embeddings
pub mod inferencer;

use burn::tensor::backend::Backend;

/// Autodiff CPU backend used by the application layer.
pub type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;

/// Seed weight initialisation for reproducible runs.
pub fn seed(seed: u64) {
    TrainBackend::seed(seed);
    tracing::debug!("Seeded backend RNG with {seed}");
}
