// ============================================================
// Layer 5 — Inference Controller
// ============================================================
// Learns document embeddings for documents the model never saw.
//
//   trained model ──get_weights──┐
//                                ▼
//   fresh model (same variant, same hyperparameters,
//                doc table sized to the new documents)
//     for each role in variant.frozen_layers():
//        replace_weights(role) then freeze_layer(role)
//     compile
//     train(...)   ← same loop as training mode
//
// Only the document-embedding table is left trainable.

use anyhow::{bail, Result};

use crate::domain::traits::EmbeddingModel;
use crate::infra::metrics::MetricsLogger;
use crate::ml::trainer::{self, History, TrainOptions};

/// Copy the word-level layers of `trained` into `fresh` and freeze them.
pub fn seed_and_freeze<M: EmbeddingModel>(trained: &M, fresh: &mut M) -> Result<()> {
    let variant = trained.variant();
    if fresh.variant() != variant {
        bail!(
            "cannot seed a {} model from a trained {} model",
            fresh.variant(),
            variant
        );
    }

    for &role in variant.frozen_layers() {
        let weights = trained.get_weights(role)?;
        fresh.replace_weights(role, weights)?;
        fresh.freeze_layer(role)?;
        tracing::debug!("Seeded and froze {role}");
    }
    Ok(())
}

/// Train only the document embeddings of `fresh`, with every
/// other layer taken from `trained`.
pub fn infer<M, I>(
    trained: &M,
    fresh:   &mut M,
    batches: I,
    opts:    &TrainOptions,
    metrics: Option<&MetricsLogger>,
) -> Result<History>
where
    M: EmbeddingModel,
    I: Iterator<Item = M::Batch>,
{
    seed_and_freeze(trained, fresh)?;
    fresh.compile();

    tracing::info!(
        "Inference: training {} doc embeddings with {:?} frozen",
        fresh.variant(),
        fresh.variant().frozen_layers()
    );
    trainer::train(fresh, batches, opts, metrics)
}
