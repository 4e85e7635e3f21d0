// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the training pipeline in order:
//
//   Step 1: Load and tokenise documents   (Layer 4 - data)
//   Step 2: Load or build the vocabulary  (Layer 3 / 6)
//   Step 3: Encode the corpus             (Layer 3 - domain)
//   Step 4: Build or reopen the model     (Layer 5 - ml)
//   Step 5: Stream batches and train      (Layer 4 → 5)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::{Batcher, Collate},
    generator::{DbowStream, DmStream, SampleStream, WindowScheme},
    loader::{tokens_by_doc_id, DirectoryLoader},
    preprocessor::Preprocessor,
};
use crate::domain::{
    document::Corpus,
    traits::{EmbeddingModel, Persistable},
    variant::ModelVariant,
    vocabulary::{self, Vocabulary},
};
use crate::infra::{checkpoint, metrics::MetricsLogger};
use crate::ml::{
    self,
    model::{self as net, DbowNet, DmNet, Doc2VecConfig, Doc2VecModel, Doc2VecNet},
    trainer::{self, History, TrainOptions},
    TrainBackend,
};

// ─── Training Configuration ──────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub docs_dir: String,
    pub model:    ModelVariant,

    /// Model save path template (`{epoch}` is substituted)
    pub save:        Option<String>,
    pub save_period: Option<usize>,
    pub save_vocab:  Option<String>,

    pub save_doc_embeddings:        Option<String>,
    pub save_doc_embeddings_period: Option<usize>,

    /// Continue training a saved model; Adam restarts and
    /// `learning_rate` replaces the saved rate
    pub load:       Option<String>,
    pub load_vocab: Option<String>,

    pub early_stopping_patience: Option<usize>,

    pub vocab_size:           usize,
    pub vocab_rare_threshold: u64,
    pub window_size:          usize,
    pub embedding_size:       usize,
    pub num_epochs:           usize,
    pub steps_per_epoch:      usize,
    pub batch_size:           usize,
    pub learning_rate:        f64,

    pub seed:    Option<u64>,
    pub metrics: Option<String>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            docs_dir:                   "data".to_string(),
            model:                      ModelVariant::Dm,
            save:                       None,
            save_period:                None,
            save_vocab:                 None,
            save_doc_embeddings:        None,
            save_doc_embeddings_period: None,
            load:                       None,
            load_vocab:                 None,
            early_stopping_patience:    None,
            vocab_size:                 vocabulary::DEFAULT_SIZE,
            vocab_rare_threshold:       vocabulary::DEFAULT_RARE_THRESHOLD,
            window_size:                net::DEFAULT_WINDOW_SIZE,
            embedding_size:             net::DEFAULT_EMBEDDING_SIZE,
            num_epochs:                 20,
            steps_per_epoch:            1000,
            batch_size:                 32,
            learning_rate:              1e-3,
            seed:                       None,
            metrics:                    None,
        }
    }
}

impl TrainConfig {
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

/// What a finished run reports back to the CLI.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub variant:    ModelVariant,
    pub num_docs:   usize,
    pub vocab_size: usize,
    pub history:    History,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
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

        // ── Step 1: Load and tokenise documents ───────────────────────────────
        let loader = DirectoryLoader::new(&cfg.docs_dir);
        let tokens = tokens_by_doc_id(&loader, &Preprocessor::new())?;
        if tokens.is_empty() {
            bail!("No documents found in '{}'", cfg.docs_dir);
        }

        // ── Step 2: Vocabulary ────────────────────────────────────────────────
        let vocab = match &cfg.load_vocab {
            Some(path) => Vocabulary::load(Path::new(path))?,
            None => {
                let vocab = Vocabulary::build(
                    tokens.values().flatten(),
                    cfg.vocab_size,
                    cfg.vocab_rare_threshold,
                )?;
                tracing::info!("Built vocabulary: {} ids", vocab.size());
                vocab
            }
        };
        if let Some(path) = &cfg.save_vocab {
            vocab.save(Path::new(path))?;
        }

        // ── Step 3: Encode ────────────────────────────────────────────────────
        let corpus = Corpus::encode(&tokens, &vocab);
        tracing::info!(
            "Encoded {} documents, {} tokens",
            corpus.len(),
            corpus.token_count()
        );

        // ── Step 4: Model config (fresh or from a saved model) ────────────────
        let model_config = match &cfg.load {
            Some(path) => {
                let saved = checkpoint::load_model_config(Path::new(path))?;
                if saved.variant != cfg.model {
                    tracing::warn!(
                        "--model {} ignored: '{}' is a {} model",
                        cfg.model, path, saved.variant
                    );
                }
                if saved.vocab_size != vocab.size() || saved.num_docs != corpus.len() {
                    bail!(
                        "model '{}' was trained with {} vocabulary ids and {} documents, \
                         but this run has {} and {}; pass the same --load-vocab and documents",
                        path, saved.vocab_size, saved.num_docs, vocab.size(), corpus.len()
                    );
                }
                saved
            }
            None => Doc2VecConfig::new(cfg.model, vocab.size(), corpus.len(), cfg.window_size)
                .with_embedding_size(cfg.embedding_size)
                .with_learning_rate(cfg.learning_rate),
        };

        // ── Step 5: Train ─────────────────────────────────────────────────────
        let opts    = cfg.train_options(corpus.sources());
        let metrics = cfg.metrics.as_deref().map(MetricsLogger::new).transpose()?;
        let window  = model_config.window_size;
        let variant = model_config.variant;

        let history = match variant {
            ModelVariant::Dm => fit::<DmNet<TrainBackend>, _>(
                cfg, model_config, DmStream::dm(&corpus, window), &opts, metrics.as_ref(),
            )?,
            ModelVariant::Dbow => fit::<DbowNet<TrainBackend>, _>(
                cfg, model_config, DbowStream::dbow(&corpus), &opts, metrics.as_ref(),
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

fn fit<N, S>(
    cfg:          &TrainConfig,
    model_config: Doc2VecConfig,
    stream:       SampleStream<'_, S>,
    opts:         &TrainOptions,
    metrics:      Option<&MetricsLogger>,
) -> Result<History>
where
    N: Doc2VecNet<TrainBackend>,
    S: WindowScheme,
    S::Sample: Collate<Batch = N::Batch>,
{
    if stream.samples_per_pass() == 0 {
        bail!(
            "no document is long enough to produce a training sample \
             (window size {})",
            model_config.window_size
        );
    }

    let device = Default::default();
    let mut model = match &cfg.load {
        Some(path) => {
            let mut model = Doc2VecModel::<TrainBackend, N>::open(Path::new(path), &device)
                .with_context(|| format!("Cannot resume from '{path}'"))?;
            model.set_learning_rate(cfg.learning_rate);
            model
        }
        None => Doc2VecModel::<TrainBackend, N>::new(model_config, &device)?,
    };
    model.compile();

    tracing::info!(
        "Training {} for {} epochs x {} steps, batch size {}",
        model.variant(),
        cfg.num_epochs,
        cfg.steps_per_epoch,
        cfg.batch_size
    );
    trainer::train(&mut model, Batcher::new(stream, cfg.batch_size), opts, metrics)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_docs(dir: &Path) {
        fs::write(dir.join("a.txt"), "the cat sat on the mat and the cat slept").unwrap();
        fs::write(dir.join("b.txt"), "a dog ran in the park and the dog barked").unwrap();
        fs::write(dir.join("c.txt"), "the bird sang on the tree in the park").unwrap();
    }

    fn small(docs_dir: &Path, model: ModelVariant) -> TrainConfig {
        TrainConfig {
            docs_dir:        docs_dir.display().to_string(),
            model,
            window_size:     1,
            embedding_size:  4,
            num_epochs:      2,
            steps_per_epoch: 3,
            batch_size:      4,
            learning_rate:   0.01,
            seed:            Some(7),
            ..Default::default()
        }
    }

    #[test]
    fn test_train_writes_all_outputs() {
        let docs = tempdir().unwrap();
        let out  = tempdir().unwrap();
        write_docs(docs.path());

        let model = out.path().join("dm-{epoch}");
        let emb   = out.path().join("docs-{epoch}.txt");
        let cfg = TrainConfig {
            save:                Some(model.display().to_string()),
            save_vocab:          Some(out.path().join("vocab.json").display().to_string()),
            save_doc_embeddings: Some(emb.display().to_string()),
            metrics:             Some(out.path().join("metrics.csv").display().to_string()),
            ..small(docs.path(), ModelVariant::Dm)
        };

        let summary = TrainUseCase::new(cfg).execute().unwrap();
        assert_eq!(summary.num_docs, 3);
        assert_eq!(summary.history.elapsed_epochs(), 2);

        assert!(out.path().join("vocab.json").exists());
        assert!(out.path().join("dm-2.json").exists());
        assert!(out.path().join("metrics.csv").exists());

        let rows = checkpoint::read_embeddings(&out.path().join("docs-2.txt")).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.len() == 4));

        let index = fs::read_to_string(checkpoint::doc_index_path(&out.path().join("docs-2.txt"))).unwrap();
        assert!(index.contains("a.txt") && index.contains("c.txt"));
    }

    #[test]
    fn test_resume_from_saved_model() {
        let docs = tempdir().unwrap();
        let out  = tempdir().unwrap();
        write_docs(docs.path());

        let vocab = out.path().join("vocab.json").display().to_string();
        let first = TrainConfig {
            save:       Some(out.path().join("m").display().to_string()),
            save_vocab: Some(vocab.clone()),
            ..small(docs.path(), ModelVariant::Dbow)
        };
        TrainUseCase::new(first).execute().unwrap();

        let resumed = TrainConfig {
            load:          Some(out.path().join("m").display().to_string()),
            load_vocab:    Some(vocab),
            save:          Some(out.path().join("m2").display().to_string()),
            num_epochs:    1,
            learning_rate: 0.5,
            ..small(docs.path(), ModelVariant::Dbow)
        };
        let summary = TrainUseCase::new(resumed).execute().unwrap();
        assert_eq!(summary.history.elapsed_epochs(), 1);

        // --learning-rate replaces the rate stored with the loaded model
        let saved = checkpoint::load_model_config(&out.path().join("m2")).unwrap();
        assert_eq!(saved.learning_rate, 0.5);
    }

    #[test]
    fn test_dotted_save_template_keeps_every_epoch() {
        let docs = tempdir().unwrap();
        let out  = tempdir().unwrap();
        write_docs(docs.path());

        let cfg = TrainConfig {
            save:        Some(out.path().join("ckpt.{epoch}").display().to_string()),
            save_period: Some(1),
            num_epochs:  3,
            ..small(docs.path(), ModelVariant::Dbow)
        };
        TrainUseCase::new(cfg).execute().unwrap();

        for epoch in 1..=3 {
            let model = out.path().join(format!("ckpt.{epoch}"));
            assert!(checkpoint::weights_path(&model).exists(), "no weights for epoch {epoch}");
            assert!(checkpoint::config_path(&model).exists(), "no config for epoch {epoch}");
        }
        assert!(!out.path().join("ckpt.mpk.gz").exists());
    }

    #[test]
    fn test_periodic_doc_embeddings_get_an_index() {
        let docs = tempdir().unwrap();
        let out  = tempdir().unwrap();
        write_docs(docs.path());

        let emb = out.path().join("docs-{epoch}.txt");
        let cfg = TrainConfig {
            save_doc_embeddings:        Some(emb.display().to_string()),
            save_doc_embeddings_period: Some(1),
            ..small(docs.path(), ModelVariant::Dbow)
        };
        TrainUseCase::new(cfg).execute().unwrap();

        let index = checkpoint::doc_index_path(&out.path().join("docs-1.txt"));
        let names: Vec<String> = serde_json::from_str(&fs::read_to_string(index).unwrap()).unwrap();
        assert_eq!(names.len(), 3);
        assert!(names[0].ends_with("a.txt"));
    }

    #[test]
    fn test_window_too_wide_is_an_error() {
        let docs = tempdir().unwrap();
        write_docs(docs.path());
        let cfg = TrainConfig { window_size: 50, ..small(docs.path(), ModelVariant::Dm) };
        assert!(TrainUseCase::new(cfg).execute().is_err());
    }

    #[test]
    fn test_zero_window_for_dm_is_an_error() {
        let docs = tempdir().unwrap();
        write_docs(docs.path());
        let cfg = TrainConfig { window_size: 0, ..small(docs.path(), ModelVariant::Dm) };
        let err = TrainUseCase::new(cfg).execute().unwrap_err();
        assert!(format!("{err:#}").contains("window size"));
    }

    #[test]
    fn test_zero_embedding_size_is_an_error() {
        let docs = tempdir().unwrap();
        write_docs(docs.path());
        for variant in [ModelVariant::Dm, ModelVariant::Dbow] {
            let cfg = TrainConfig { embedding_size: 0, ..small(docs.path(), variant) };
            let err = TrainUseCase::new(cfg).execute().unwrap_err();
            assert!(format!("{err:#}").contains("embedding size"));
        }
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let docs = tempdir().unwrap();
        assert!(TrainUseCase::new(small(docs.path(), ModelVariant::Dbow)).execute().is_err());
    }
}
