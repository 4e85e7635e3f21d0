// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between layers:
//
//   DocumentSource   where raw documents come from
//                    (implemented by data::loader::DirectoryLoader)
//   Persistable      state that round-trips through a file
//                    (implemented for Vocabulary in infra)
//   EmbeddingModel   the numeric model driven by the training
//                    loop (implemented on Burn in ml::model)
//
// The training loop and the inference controller only see
// EmbeddingModel, so they can be exercised with a scripted
// fake model in tests.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use std::path::Path;

use anyhow::Result;

use crate::domain::document::Document;
use crate::domain::variant::{LayerRole, ModelVariant};

// ─── DocumentSource ───────────────────────────────────────────────────────────
/// Any component that can load documents from a source.
pub trait DocumentSource {
    /// Load all available documents from this source.
    fn load_all(&self) -> Result<Vec<Document>>;
}

// ─── Persistable ──────────────────────────────────────────────────────────────
/// Any component whose state can be saved and restored from disk.
/// `load(save(x)) == x` must hold.
pub trait Persistable: Sized {
    type Error;

    fn save(&self, path: &Path) -> Result<(), Self::Error>;

    fn load(path: &Path) -> Result<Self, Self::Error>;
}

// ─── EmbeddingModel ───────────────────────────────────────────────────────────
/// The numeric model collaborator.
///
/// Construction plays the role of `build()`. Weights are opaque
/// and only addressed by `LayerRole`.
pub trait EmbeddingModel {
    /// The collated batch shape this model consumes
    type Batch;

    /// A detached snapshot of one layer's parameters
    type Weights;

    fn variant(&self) -> ModelVariant;

    /// Set up the optimiser over the currently trainable layers.
    /// Must be called after any `freeze_layer` and before training.
    fn compile(&mut self);

    /// One gradient update; returns the batch loss.
    fn train_step(&mut self, batch: Self::Batch) -> Result<f64>;

    fn save(&self, path: &Path) -> Result<()>;

    fn load(&mut self, path: &Path) -> Result<()>;

    /// Export only the document-embedding table.
    fn save_doc_embeddings(&self, path: &Path) -> Result<()>;

    fn get_weights(&self, layer: LayerRole) -> Result<Self::Weights>;

    fn replace_weights(&mut self, layer: LayerRole, weights: Self::Weights) -> Result<()>;

    /// Mark a layer non-trainable.
    fn freeze_layer(&mut self, layer: LayerRole) -> Result<()>;
}
