// ============================================================
// Layer 2 — InferUseCase
// ============================================================
// Learns embeddings for new documents with a trained model:
//
//   Step 1: Load the training vocabulary    (Layer 6 - infra)
//   Step 2: Load, tokenise and encode docs  (Layer 4 → 3)
//   Step 3: Reopen the trained model        (Layer 5 - ml)
//   Step 4: Fresh model sized to new docs,
//           word layers seeded and frozen   (Layer 5 - ml)
//   Step 5: Train the doc embeddings        (Layer 5 - ml)
//
// Variant, window size and embedding size always come from the
// trained model's config sidecar.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::RunSummary;
use crate::data::{
    batcher::{Batcher, Collate},
    generator::{DbowStream, DmStream, SampleStream, WindowScheme},
    loader::{tokens_by_doc_id, DirectoryLoader},
    preprocessor::Preprocessor,
};
use crate::domain::{
    document::Corpus,
    traits::Persistable,
    variant::ModelVariant,
    vocabulary::Vocabulary,
};
use crate::infra::{checkpoint, metrics::MetricsLogger};
use crate::ml::{
    self,
    inferencer,
    model::{DbowNet, DmNet, Doc2VecConfig, Doc2VecModel, Doc2VecNet},
    trainer::{History, TrainOptions},
    TrainBackend,
};

// ─── Inference Configuration ─────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferConfig {
    pub docs_dir: String,

    /// Trained model to seed from
    pub load:       String,
    /// Vocabulary the model was trained with
    pub load_vocab: String,

    /// Checked against the trained model when given
    pub model: Option<ModelVariant>,

    pub save:        Option<String>,
    pub save_period: Option<usize>,

    pub save_doc_embeddings:        Option<String>,
    pub save_doc_embeddings_period: Option<usize>,

    pub early_stopping_patience: Option<usize>,

    pub num_epochs:      usize,
    pub steps_per_epoch: usize,
    pub batch_size:      usize,
    pub learning_rate:   f64,

    pub seed:    Option<u64>,
    pub metrics: Option<String>,
}

impl Default for InferConfig {
    fn default() -> Self {
        Self {
            docs_dir:                   "data".to_string(),
            load:                       "model".to_string(),
            load_vocab:                 "vocab.json".to_string(),
            model:                      None,
            save:                       None,
            save_period:                None,
            save_doc_embeddings:        None,
            save_doc_embeddings_period: None,
            early_stopping_patience:    None,
            num_epochs:                 20,
            steps_per_epoch:            1000,
            batch_size:                 32,
            learning_rate:              1e-3,
            seed:                       None,
            metrics:                    None,
        }
    }
}

impl InferConfig {
    /// Loop options for this run; `doc_sources` names each embedding row.
    pub fn train_options(&self, doc_sources: Vec<String>) -> TrainOptions {
        TrainOptions {
            epochs:                     self.num_epochs,
            steps_per_epoch:            self.steps_per_epoch,
            early_stopping_patience:    self.early_stopping_patience,
            save_path:                  self.save.clone(),
            save_period:                self.save_period,
            save_doc_embeddings_path:   self.save_doc_embeddings.clone(),
            save_doc_embeddings_period: self.save_doc_embeddings_period,
            doc_sources,
        }
    }
}

// ─── InferUseCase ─────────────────────────────────────────────────────────────
pub struct InferUseCase {
    config: InferConfig,
}

impl InferUseCase {
    pub fn new(config: InferConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<RunSummary> {
        let cfg = &self.config;
        if cfg.batch_size == 0 {
            bail!("batch size must be at least 1");
        }
        if let Some(seed) = cfg.seed {
            ml::seed(seed);
        }

        // ── Step 1: Vocabulary ────────────────────────────────────────────────
        let vocab = Vocabulary::load(Path::new(&cfg.load_vocab))?;

        // ── Step 2: Documents ─────────────────────────────────────────────────
        let loader = DirectoryLoader::new(&cfg.docs_dir);
        let tokens = tokens_by_doc_id(&loader, &Preprocessor::new())?;
        if tokens.is_empty() {
            bail!("No documents found in '{}'", cfg.docs_dir);
        }
        let corpus = Corpus::encode(&tokens, &vocab);
        tracing::info!("Encoded {} new documents", corpus.len());

        // ── Step 3: Trained model config ──────────────────────────────────────
        let trained = checkpoint::load_model_config(Path::new(&cfg.load))?;
        if let Some(expected) = cfg.model {
            if expected != trained.variant {
                bail!("'{}' is a {} model, not {}", cfg.load, trained.variant, expected);
            }
        }
        if trained.vocab_size != vocab.size() {
            bail!(
                "vocabulary '{}' has {} ids but model '{}' expects {}",
                cfg.load_vocab, vocab.size(), cfg.load, trained.vocab_size
            );
        }

        // ── Step 4: Fresh model config ────────────────────────────────────────
        let fresh = Doc2VecConfig {
            num_docs:      corpus.len(),
            learning_rate: cfg.learning_rate,
            ..trained.clone()
        };
        let variant = trained.variant;
        let window  = trained.window_size;

        // ── Step 5: Train the doc embeddings ──────────────────────────────────
        let opts    = cfg.train_options(corpus.sources());
        let metrics = cfg.metrics.as_deref().map(MetricsLogger::new).transpose()?;
        let history = match variant {
            ModelVariant::Dm => run::<DmNet<TrainBackend>, _>(
                cfg, fresh, DmStream::dm(&corpus, window), &opts, metrics.as_ref(),
            )?,
            ModelVariant::Dbow => run::<DbowNet<TrainBackend>, _>(
                cfg, fresh, DbowStream::dbow(&corpus), &opts, metrics.as_ref(),
            )?,
        };


        Ok(RunSummary {
            variant,
            num_docs:   corpus.len(),
            vocab_size: vocab.size(),
            history,
        })
    }
}

fn run<N, S>(
    cfg:     &InferConfig,
    fresh:   Doc2VecConfig,
    stream:  SampleStream<'_, S>,
    opts:    &TrainOptions,
    metrics: Option<&MetricsLogger>,
) -> Result<History>
where
    N: Doc2VecNet<TrainBackend>,
    S: WindowScheme,
    S::Sample: Collate<Batch = N::Batch>,
{
    if stream.samples_per_pass() == 0 {
        bail!(
            "no new document is long enough to produce a sample (window size {})",
            fresh.window_size
        );
    }

    let device  = Default::default();
    let trained = Doc2VecModel::<TrainBackend, N>::open(Path::new(&cfg.load), &device)
        .with_context(|| format!("Cannot open trained model '{}'", cfg.load))?;
    let mut model = Doc2VecModel::<TrainBackend, N>::new(fresh, &device)?;

    inferencer::infer(
        &trained,
        &mut model,
        Batcher::new(stream, cfg.batch_size),
        opts,
        metrics,
    )
}
